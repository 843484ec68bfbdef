//! Fault governor.
//!
//! Inspects the fault flags once per tick. While a takeover fault is active it
//! owns the output vector and flies a controlled descent from the throttle
//! captured at onset; otherwise the pilot command passes through untouched.
//!
//! Precedence, first match wins:
//!
//! | fault                  | effect                         |
//! |------------------------|--------------------------------|
//! | gyrometer              | device descent                 |
//! | accelerometer          | device descent                 |
//! | barometer              | altitude hold disabled only    |
//! | current low (battery)  | device descent                 |
//! | link timeout           | link descent                   |
//!
//! Compass, GPS, voltage and current-high faults are reported only.

use crate::config::{Config, DescentConfig, Limits};
use crate::faults::{DeviceFaults, FaultFlags, LinkFaults};
use crate::hal::FlightHal;
use crate::math::LowPass;
use crate::state::{Authority, CommandVector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GovernorState {
    #[default]
    Normal,
    DeviceFaultDescent,
    LinkFaultDescent,
    AltitudeHoldDisabled,
}

impl GovernorState {
    pub fn is_descent(self) -> bool {
        matches!(self, GovernorState::DeviceFaultDescent | GovernorState::LinkFaultDescent)
    }

    /// Classifies the fault flags of one tick.
    pub fn from_faults(faults: &FaultFlags) -> Self {
        let device = faults.device;
        if device.intersects(DeviceFaults::GYROMETER | DeviceFaults::ACCELEROMETER) {
            GovernorState::DeviceFaultDescent
        } else if device.contains(DeviceFaults::BAROMETER) {
            GovernorState::AltitudeHoldDisabled
        } else if device.contains(DeviceFaults::CURRENT_LOW) {
            GovernorState::DeviceFaultDescent
        } else if faults.link.contains(LinkFaults::LINK_TIMEOUT) {
            GovernorState::LinkFaultDescent
        } else {
            GovernorState::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GovernorOutput {
    pub command: CommandVector,
    pub authority: Authority,
    pub state: GovernorState,
    /// Whether the external altitude controller may hold altitude.
    pub altitude_hold: bool,
}

// ── Descent ───────────────────────────────────────────────────────────────────

/// One fault episode. Created on the first takeover tick and dropped on the
/// first clear tick.
#[derive(Debug, Clone, Copy)]
struct DescentState {
    onset_ms: u32,
    last_tick_ms: u32,
    snapshot: i16,

    /// Milliseconds per `thr_step` of throttle reduction.
    step_ms: f32,
    /// Throttle units removed so far.
    decay: f32,
    /// Anti-freefall correction, grows while falling too fast.
    penalty: f32,

    last_sample_ms: Option<u32>,
    last_altitude_m: Option<f32>,
    fall_rate: LowPass,

    /// Set once below minimum spin. Motors stay off for the rest of the episode.
    grounded: bool,
}

impl DescentState {
    fn new(now_ms: u32, snapshot: i16, config: &DescentConfig) -> Self {
        Self {
            onset_ms: now_ms,
            last_tick_ms: now_ms,
            snapshot,
            step_ms: config.default_step_ms,
            decay: 0.0,
            penalty: 0.0,
            last_sample_ms: None,
            last_altitude_m: None,
            fall_rate: LowPass::new(config.fall_rate_smoothing),
            grounded: false,
        }
    }

    /// Time to ground at the target rate spread over the throttle distance to
    /// take-off, in ms per `thr_step`.
    fn step_for_altitude(&self, altitude_m: f32, config: &DescentConfig) -> f32 {
        let altitude_m = if altitude_m > config.min_altitude_m { altitude_m } else { config.min_altitude_m };
        let time_to_ground_ms = altitude_m / config.target_fall_speed * 1000.0;
        let thr = f32::from(self.snapshot);
        let take_off = f32::from(config.thr_take_off);
        let delta = if thr > take_off { thr - take_off } else { thr };
        let steps = (delta / config.thr_step).max(1.0);
        let step = time_to_ground_ms / steps;
        if step.is_finite() && step > 0.0 {
            step
        } else {
            config.default_step_ms
        }
    }

    fn sample_altitude<H: FlightHal>(&mut self, hal: &mut H, now_ms: u32, config: &DescentConfig) {
        let due = match self.last_sample_ms {
            None => true,
            Some(t) => now_ms.wrapping_sub(t) >= config.altitude_sample_ms,
        };
        if !due {
            return;
        }

        let altitude = hal.altitude_m().filter(|m| m.is_finite());
        match altitude {
            Some(alt) => {
                self.step_ms = self.step_for_altitude(alt, config);
                if let (Some(prev), Some(t)) = (self.last_altitude_m, self.last_sample_ms) {
                    let dt_s = now_ms.wrapping_sub(t) as f32 / 1000.0;
                    if dt_s > 0.0 {
                        let rate = self.fall_rate.filter((prev - alt) / dt_s);
                        if rate > config.target_fall_speed + config.fall_speed_margin {
                            self.penalty += config.penalty_step;
                            debug!("falling too fast, penalty {}", self.penalty);
                        }
                    }
                }
            }
            None => {
                self.step_ms = config.default_step_ms;
                self.fall_rate.reset();
            }
        }
        self.last_altitude_m = altitude;
        self.last_sample_ms = Some(now_ms);
    }

    fn throttle<H: FlightHal>(&mut self, hal: &mut H, now_ms: u32, config: &DescentConfig, limits: &Limits) -> i16 {
        if self.grounded {
            return limits.thr_off;
        }

        self.sample_altitude(hal, now_ms, config);

        let dt_ms = now_ms.wrapping_sub(self.last_tick_ms) as f32;
        self.last_tick_ms = now_ms;
        self.decay += config.thr_step * dt_ms / self.step_ms;

        let reduction = (self.decay - self.penalty).max(0.0);
        let throttle = (f32::from(self.snapshot) - reduction) as i32;
        let throttle = throttle.min(i32::from(self.snapshot));

        if throttle < i32::from(limits.thr_min) {
            self.grounded = true;
            info!("descent complete, motors off after {} ms", now_ms.wrapping_sub(self.onset_ms));
            return limits.thr_off;
        }
        throttle.clamp(i32::from(limits.thr_off), i32::from(limits.thr_max)) as i16
    }
}

// ── Governor ──────────────────────────────────────────────────────────────────

pub struct Governor {
    limits: Limits,
    config: DescentConfig,
    state: GovernorState,
    descent: Option<DescentState>,
}

impl Governor {
    pub fn new(config: &Config) -> Self {
        Self {
            limits: config.limits,
            config: config.descent,
            state: GovernorState::Normal,
            descent: None,
        }
    }

    pub fn state(&self) -> GovernorState {
        self.state
    }

    /// Milliseconds since the current descent started.
    pub fn descent_elapsed_ms(&self, now_ms: u32) -> Option<u32> {
        self.descent.map(|d| now_ms.wrapping_sub(d.onset_ms))
    }

    /// Runs one tick. `pilot` is the command ingestion committed this tick.
    pub fn update<H: FlightHal>(&mut self, hal: &mut H, faults: FaultFlags, pilot: CommandVector) -> GovernorOutput {
        let state = GovernorState::from_faults(&faults);
        if state != self.state {
            if state.is_descent() {
                warn!("governor {:?} -> {:?}, faults {} / {}", self.state, state, faults.device.bits(), faults.link.bits());
            } else {
                info!("governor {:?} -> {:?}", self.state, state);
            }
            self.state = state;
        }

        if !state.is_descent() {
            self.descent = None;
            return GovernorOutput {
                command: pilot,
                authority: Authority::Pilot,
                state,
                altitude_hold: state == GovernorState::Normal,
            };
        }

        let now = hal.millis();
        let descent = self
            .descent
            .get_or_insert_with(|| DescentState::new(now, pilot.throttle(), &self.config));
        let throttle = descent.throttle(hal, now, &self.config, &self.limits);

        GovernorOutput {
            command: CommandVector::new(0, 0, throttle, 0),
            authority: Authority::Governor,
            state,
            altitude_hold: false,
        }
    }
}
