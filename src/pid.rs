//! Gain table pushed to the attitude/altitude controllers by the `PID` command.

use core::ops::{Index, IndexMut};

/// Controller loops in the order the uplink sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PidLoop {
    Pitch = 0,
    Roll = 1,
    Yaw = 2,
    Throttle = 3,
    Accel = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub imax: f32,
}

/// One rate controller and one stabilise P gain per loop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidTable {
    pub rate: [RateGains; 5],
    pub stab_kp: [f32; 5],
}

impl Index<PidLoop> for PidTable {
    type Output = RateGains;

    fn index(&self, l: PidLoop) -> &RateGains {
        &self.rate[l as usize]
    }
}

impl IndexMut<PidLoop> for PidTable {
    fn index_mut(&mut self, l: PidLoop) -> &mut RateGains {
        &mut self.rate[l as usize]
    }
}

impl RateGains {
    pub const ZERO: Self = Self { kp: 0.0, ki: 0.0, kd: 0.0, imax: 0.0 };
}

impl PidTable {
    pub const ZERO: Self = Self { rate: [RateGains::ZERO; 5], stab_kp: [0.0; 5] };

    pub fn stab(&self, l: PidLoop) -> f32 {
        self.stab_kp[l as usize]
    }
}
