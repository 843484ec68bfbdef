//! Shared state types passed between ingestion, the governor and telemetry.
//!
//! All types are `Copy` so they can be handed through channels by value.

use core::ops::{Index, IndexMut};

use crate::config::Limits;
use crate::error::RangeError;

// ── Command vector ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Roll = 0,
    Pitch = 1,
    Throttle = 2,
    Yaw = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Roll, Channel::Pitch, Channel::Throttle, Channel::Yaw];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Roll, pitch and yaw in degrees, throttle in PWM-style units
/// (`THR_OFF..=THR_MAX`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandVector {
    channels: [i16; 4],
}

impl CommandVector {
    pub const fn new(roll: i16, pitch: i16, throttle: i16, yaw: i16) -> Self {
        Self { channels: [roll, pitch, throttle, yaw] }
    }

    /// Level attitude with the motors off.
    pub const fn idle(limits: &Limits) -> Self {
        Self::new(0, 0, limits.thr_off, 0)
    }

    /// Builds a vector from decoded values, or reports the first channel out of
    /// bounds. Nothing is constructed on failure.
    pub fn checked(roll: i32, pitch: i32, throttle: i32, yaw: i32, limits: &Limits) -> Result<Self, RangeError> {
        let bounds = [
            (Channel::Roll, roll, -(limits.roll_max as i32), limits.roll_max as i32),
            (Channel::Pitch, pitch, -(limits.pitch_max as i32), limits.pitch_max as i32),
            (Channel::Throttle, throttle, limits.thr_off as i32, limits.thr_max as i32),
            (Channel::Yaw, yaw, -(limits.yaw_max as i32), limits.yaw_max as i32),
        ];
        for (channel, value, lo, hi) in bounds {
            if value < lo || value > hi {
                return Err(RangeError { channel, value });
            }
        }
        Ok(Self::new(roll as i16, pitch as i16, throttle as i16, yaw as i16))
    }

    pub fn roll(&self) -> i16 {
        self[Channel::Roll]
    }

    pub fn pitch(&self) -> i16 {
        self[Channel::Pitch]
    }

    pub fn throttle(&self) -> i16 {
        self[Channel::Throttle]
    }

    pub fn yaw(&self) -> i16 {
        self[Channel::Yaw]
    }
}

impl Index<Channel> for CommandVector {
    type Output = i16;

    fn index(&self, ch: Channel) -> &i16 {
        &self.channels[ch.index()]
    }
}

impl IndexMut<Channel> for CommandVector {
    fn index_mut(&mut self, ch: Channel) -> &mut i16 {
        &mut self.channels[ch.index()]
    }
}

/// Who wrote the output vector this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Authority {
    #[default]
    Pilot,
    Governor,
}

// ── Links ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkPath {
    /// Pulse-position RC receiver.
    Ppm = 0,
    /// Text uplink (`TYPE#payload*chk`).
    Primary = 1,
    /// 7-byte binary radio uplink.
    Fallback = 2,
}

impl LinkPath {
    pub const ALL: [LinkPath; 3] = [LinkPath::Ppm, LinkPath::Primary, LinkPath::Fallback];

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkState {
    pub last_valid_ms: u32,
}

impl LinkState {
    pub const fn new(now_ms: u32) -> Self {
        Self { last_valid_ms: now_ms }
    }

    pub fn age(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_valid_ms)
    }

    pub fn mark_valid(&mut self, now_ms: u32) {
        self.last_valid_ms = now_ms;
    }
}

// ── Uplink payloads ───────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Navigation mode requested with a waypoint.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WaypointMode: u8 {
        /// Replace the commanded altitude with the altitude at reception.
        const HOLD_ALTITUDE  = 1 << 0;
        /// Autonomous GPS navigation towards the waypoint.
        const GPS_NAVIGATION = 1 << 1;
    }
}

/// Latched navigation target. Latitude/longitude in 1e-7 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Waypoint {
    pub lat: i32,
    pub lon: i32,
    pub alt_cm: i32,
    pub mode: WaypointMode,
}

/// Gyro drift correction in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriftCorrection {
    pub roll: f32,
    pub pitch: f32,
}

/// Battery monitor source, numbered like the usual autopilot battery monitor
/// types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatterySensor {
    Disabled = 0,
    AnalogVoltage = 3,
    AnalogVoltageCurrent = 4,
}

impl TryFrom<u8> for BatterySensor {
    type Error = ();

    fn try_from(v: u8) -> Result<Self, ()> {
        match v {
            0 => Ok(BatterySensor::Disabled),
            3 => Ok(BatterySensor::AnalogVoltage),
            4 => Ok(BatterySensor::AnalogVoltageCurrent),
            _ => Err(()),
        }
    }
}
