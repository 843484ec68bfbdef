use core::cell::Cell;
use core::sync::atomic::Ordering;

use embassy_executor::task;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Instant, Timer};

use copter_fc::faults::DeviceFaults;
use copter_fc::pid::PidTable;
use copter_fc::state::{BatterySensor, DriftCorrection};
use copter_fc::telemetry::TelemetryRecord;
use copter_fc::{ControlLoop, FlightHal};

/// Altitude older than this is not trusted by the descent profile.
const SENSOR_STALE_MS: u32 = 200;

/// Sensor health and altitude, published by the attitude estimator.
#[derive(Clone, Copy)]
pub struct SensorReport {
    pub altitude_m: Option<f32>,
    pub faults: DeviceFaults,
    pub stamp_ms: u32,
}

impl SensorReport {
    pub const NONE: Self = Self { altitude_m: None, faults: DeviceFaults::empty(), stamp_ms: 0 };
}

pub type SensorCell = Mutex<CriticalSectionRawMutex, Cell<SensorReport>>;

// ── Board handle ──────────────────────────────────────────────────────────────

/// [`FlightHal`] over the firmware's shared statics.
pub struct BoardHal {
    pid_tx: Sender<'static, CriticalSectionRawMutex, PidTable, 1>,
}

impl BoardHal {
    pub fn new(pid_tx: Sender<'static, CriticalSectionRawMutex, PidTable, 1>) -> Self {
        Self { pid_tx }
    }

    fn sensors(&self) -> SensorReport {
        crate::SENSORS.lock(|c| c.get())
    }
}

impl FlightHal for BoardHal {
    fn millis(&self) -> u32 {
        Instant::now().as_millis() as u32
    }

    fn ppm_input(&mut self) -> Option<[u16; 4]> {
        crate::PPM_FRAME.try_take()
    }

    fn read_primary(&mut self, buf: &mut [u8]) -> usize {
        crate::PRIMARY_PIPE.try_read(buf).unwrap_or(0)
    }

    fn read_fallback(&mut self, buf: &mut [u8]) -> usize {
        crate::FALLBACK_PIPE.try_read(buf).unwrap_or(0)
    }

    fn set_loop_period_ms(&mut self, period_ms: u32) {
        crate::LOOP_PERIOD_MS.store(period_ms, Ordering::Relaxed);
    }

    fn altitude_m(&mut self) -> Option<f32> {
        let report = self.sensors();
        if self.millis().wrapping_sub(report.stamp_ms) > SENSOR_STALE_MS {
            return None;
        }
        report.altitude_m
    }

    fn device_faults(&self) -> DeviceFaults {
        self.sensors().faults
    }

    fn apply_pid_gains(&mut self, gains: &PidTable) {
        crate::PID_GAINS.lock(|c| c.set(*gains));
        let _ = self.pid_tx.try_send(*gains);
    }

    fn set_drift_correction(&mut self, correction: DriftCorrection) {
        crate::DRIFT_CORRECTION.lock(|c| c.set(correction));
    }

    fn run_accel_calibration(&mut self) {
        crate::ACCEL_CALIBRATION.signal(());
    }

    fn select_battery_sensor(&mut self, sensor: BatterySensor) {
        crate::BATTERY_SENSOR.store(sensor as u8, Ordering::Relaxed);
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// Runs the control loop at the period chosen by ingestion (10 ms on the
/// primary link, 20 ms on the fallback radio).
#[task]
pub async fn control_task(
    mut fc: ControlLoop<BoardHal>,
    telemetry_tx: Sender<'static, CriticalSectionRawMutex, TelemetryRecord, 1>,
) {
    loop {
        let started = Instant::now();

        let record = fc.tick();
        let _ = telemetry_tx.try_send(record);

        let period_ms = crate::LOOP_PERIOD_MS.load(Ordering::Relaxed);
        Timer::at(started + Duration::from_millis(u64::from(period_ms))).await;
    }
}
