//! Compile-time tuning and the config structs built from it.

// ── Command bounds ────────────────────────────────────────────────────────────

/// Motors stopped.
pub const THR_OFF: i16 = 1000;
/// Idle / minimum spin. Above this the motors are considered running.
pub const THR_MIN: i16 = 1100;
/// Throttle at which the airframe roughly hovers off the ground.
pub const THR_TAKE_OFF: i16 = 1300;
pub const THR_MAX: i16 = 1900;

pub const ROL_MAX_DEG: i16 = 45;
pub const PIT_MAX_DEG: i16 = 45;
pub const YAW_MAX_DEG: i16 = 180;

// ── Link timing ───────────────────────────────────────────────────────────────

/// Loop period while a primary or PPM link is alive.
pub const MAIN_PERIOD_MS: u32 = 10;
/// Slower loop period while flying on the fallback binary uplink.
pub const FALLBACK_PERIOD_MS: u32 = 20;
/// Primary uplink silence after which the fallback uplink is polled.
pub const PRIMARY_TIMEOUT_MS: u32 = 250;
/// Silence on every path after which the link-timeout fault is raised.
pub const LINK_TIMEOUT_MS: u32 = 500;

// ── PPM ───────────────────────────────────────────────────────────────────────

pub const PPM_MIN_US: u16 = 1100;
pub const PPM_MID_US: u16 = 1500;
pub const PPM_MAX_US: u16 = 1900;
/// Pulses outside this band are glitches or signal loss, not stick positions.
pub const PPM_PULSE_MIN_US: u16 = 800;
pub const PPM_PULSE_MAX_US: u16 = 2200;
/// Weight of a fresh PPM sample on the attitude channels.
pub const PPM_SMOOTHING: f32 = 0.6;

// ── Uplink commands ───────────────────────────────────────────────────────────

/// Drift correction limit, degrees.
pub const DRIFT_CORRECTION_MAX: f32 = 10.0;
/// Largest gain magnitude a `PID` command may carry. Keeps the echoed
/// `pid_cnf` line inside one telemetry line.
pub const PID_GAIN_MAX: f32 = 1000.0;

// ── Descent profile ───────────────────────────────────────────────────────────

/// Target descent rate (m/s).
pub const MAX_FALL_SPEED_MS: f32 = 0.833;
/// Excess over the target descent rate tolerated before the penalty grows.
pub const FALL_SPEED_MARGIN_MS: f32 = 0.25;
/// Throttle units removed per descent step.
pub const THR_STEP: f32 = 1.0;
/// Conservative step length (ms) used without a healthy altitude.
pub const DEFAULT_STEP_MS: f32 = 15.0;
/// Penalty added per altitude sample while falling too fast.
pub const FALL_PENALTY_STEP: f32 = 5.0;
/// Altitude sampling interval during a descent.
pub const ALTITUDE_SAMPLE_MS: u32 = 100;
/// Floor applied to altitude before any division.
pub const MIN_ALTITUDE_M: f32 = 1.0;
/// Low-pass weight applied to the observed fall rate.
pub const FALL_RATE_SMOOTHING: f32 = 0.7;

// ── Config structs ────────────────────────────────────────────────────────────

/// Physical bounds every committed command must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Limits {
    pub thr_off: i16,
    pub thr_min: i16,
    pub thr_max: i16,
    pub roll_max: i16,
    pub pitch_max: i16,
    pub yaw_max: i16,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            thr_off: THR_OFF,
            thr_min: THR_MIN,
            thr_max: THR_MAX,
            roll_max: ROL_MAX_DEG,
            pitch_max: PIT_MAX_DEG,
            yaw_max: YAW_MAX_DEG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IngestConfig {
    pub ppm_enabled: bool,
    pub primary_enabled: bool,
    pub fallback_enabled: bool,
    /// Keeps the loop at full rate on the fallback uplink.
    pub bench_override: bool,
    pub main_period_ms: u32,
    pub fallback_period_ms: u32,
    pub primary_timeout_ms: u32,
    pub link_timeout_ms: u32,
    pub ppm_smoothing: f32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            ppm_enabled: cfg!(feature = "ppm"),
            primary_enabled: true,
            fallback_enabled: true,
            bench_override: cfg!(feature = "bench"),
            main_period_ms: MAIN_PERIOD_MS,
            fallback_period_ms: FALLBACK_PERIOD_MS,
            primary_timeout_ms: PRIMARY_TIMEOUT_MS,
            link_timeout_ms: LINK_TIMEOUT_MS,
            ppm_smoothing: PPM_SMOOTHING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DescentConfig {
    pub target_fall_speed: f32,
    pub fall_speed_margin: f32,
    pub thr_step: f32,
    pub thr_take_off: i16,
    pub default_step_ms: f32,
    pub penalty_step: f32,
    pub altitude_sample_ms: u32,
    pub min_altitude_m: f32,
    pub fall_rate_smoothing: f32,
}

impl Default for DescentConfig {
    fn default() -> Self {
        Self {
            target_fall_speed: MAX_FALL_SPEED_MS,
            fall_speed_margin: FALL_SPEED_MARGIN_MS,
            thr_step: THR_STEP,
            thr_take_off: THR_TAKE_OFF,
            default_step_ms: DEFAULT_STEP_MS,
            penalty_step: FALL_PENALTY_STEP,
            altitude_sample_ms: ALTITUDE_SAMPLE_MS,
            min_altitude_m: MIN_ALTITUDE_M,
            fall_rate_smoothing: FALL_RATE_SMOOTHING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub limits: Limits,
    pub ingest: IngestConfig,
    pub descent: DescentConfig,
}
