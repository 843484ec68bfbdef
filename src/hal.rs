//! Hardware access handle.
//!
//! Everything the safety core needs from the board goes through [`FlightHal`].
//! The control loop owns the implementation and lends it to ingestion and the
//! governor once per tick, so a simulated board can stand in for tests.

use crate::faults::DeviceFaults;
use crate::pid::PidTable;
use crate::state::{BatterySensor, DriftCorrection};

pub trait FlightHal {
    /// Monotonic milliseconds since boot. Wraps.
    fn millis(&self) -> u32;

    /// Latest PPM pulse widths (µs) in roll, pitch, throttle, yaw order, or
    /// `None` if no new frame arrived since the last call.
    fn ppm_input(&mut self) -> Option<[u16; 4]>;

    /// Copies pending primary-uplink bytes into `buf` without blocking.
    /// Returns how many were copied.
    fn read_primary(&mut self, buf: &mut [u8]) -> usize;

    /// Same as [`read_primary`](Self::read_primary) for the fallback radio.
    fn read_fallback(&mut self, buf: &mut [u8]) -> usize;

    fn set_loop_period_ms(&mut self, period_ms: u32);

    /// Best altitude estimate above ground in metres, `None` if no healthy
    /// sensor can provide one.
    fn altitude_m(&mut self) -> Option<f32>;

    fn device_faults(&self) -> DeviceFaults;

    fn apply_pid_gains(&mut self, gains: &PidTable);

    fn set_drift_correction(&mut self, correction: DriftCorrection);

    /// Blocking accelerometer calibration. Only requested with motors idle.
    fn run_accel_calibration(&mut self);

    fn select_battery_sensor(&mut self, sensor: BatterySensor);
}
