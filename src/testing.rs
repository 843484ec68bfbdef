//! Simulated board for host tests.

use std::collections::VecDeque;

use crate::faults::DeviceFaults;
use crate::hal::FlightHal;
use crate::pid::PidTable;
use crate::state::{BatterySensor, DriftCorrection};

#[derive(Default)]
pub struct SimHal {
    pub now_ms: u32,
    pub ppm: Option<[u16; 4]>,
    pub primary: VecDeque<u8>,
    pub fallback: VecDeque<u8>,
    pub altitude: Option<f32>,
    pub altitude_reads: u32,
    pub faults: DeviceFaults,

    pub periods: Vec<u32>,
    pub pid: Option<PidTable>,
    pub drift: Option<DriftCorrection>,
    pub calibrations: u32,
    pub battery: Option<BatterySensor>,
}

impl SimHal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(ms);
    }

    /// Queues `line` plus newline on the primary uplink.
    pub fn send_line(&mut self, line: &str) {
        self.primary.extend(line.bytes());
        self.primary.push_back(b'\n');
    }

    pub fn send_fallback(&mut self, bytes: &[u8]) {
        self.fallback.extend(bytes.iter().copied());
    }
}

fn drain(queue: &mut VecDeque<u8>, buf: &mut [u8]) -> usize {
    let n = buf.len().min(queue.len());
    for (slot, b) in buf.iter_mut().zip(queue.drain(..n)) {
        *slot = b;
    }
    n
}

impl FlightHal for SimHal {
    fn millis(&self) -> u32 {
        self.now_ms
    }

    fn ppm_input(&mut self) -> Option<[u16; 4]> {
        self.ppm.take()
    }

    fn read_primary(&mut self, buf: &mut [u8]) -> usize {
        drain(&mut self.primary, buf)
    }

    fn read_fallback(&mut self, buf: &mut [u8]) -> usize {
        drain(&mut self.fallback, buf)
    }

    fn set_loop_period_ms(&mut self, period_ms: u32) {
        self.periods.push(period_ms);
    }

    fn altitude_m(&mut self) -> Option<f32> {
        self.altitude_reads += 1;
        self.altitude
    }

    fn device_faults(&self) -> DeviceFaults {
        self.faults
    }

    fn apply_pid_gains(&mut self, gains: &PidTable) {
        self.pid = Some(*gains);
    }

    fn set_drift_correction(&mut self, correction: DriftCorrection) {
        self.drift = Some(correction);
    }

    fn run_accel_calibration(&mut self) {
        self.calibrations += 1;
    }

    fn select_battery_sensor(&mut self, sensor: BatterySensor) {
        self.battery = Some(sensor);
    }
}
