//! Fault bitmasks. Recomputed every tick from collaborator state, never latched.

bitflags::bitflags! {
    /// Sensor and power faults reported by the board.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeviceFaults: u16 {
        const GYROMETER     = 1 << 0;
        const ACCELEROMETER = 1 << 1;
        const BAROMETER     = 1 << 2;
        const COMPASS       = 1 << 3;
        const GPS           = 1 << 4;
        const VOLTAGE_HIGH  = 1 << 5;
        const VOLTAGE_LOW   = 1 << 6;
        const CURRENT_HIGH  = 1 << 7;
        /// Battery depleted.
        const CURRENT_LOW   = 1 << 8;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LinkFaults: u8 {
        /// No validated command on any path within the link timeout.
        const LINK_TIMEOUT = 1 << 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaultFlags {
    pub device: DeviceFaults,
    pub link: LinkFaults,
}

impl FaultFlags {
    pub const fn none() -> Self {
        Self { device: DeviceFaults::empty(), link: LinkFaults::empty() }
    }
}
