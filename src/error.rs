use core::fmt;

use crate::state::Channel;

/// A frame that could not be decoded. The command is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// No `#` between type and payload.
    MissingType,
    UnknownType,
    /// No `*` before the checksum trailer.
    MissingChecksum,
    /// Trailer is not a hex number.
    BadChecksumHex,
    ChecksumMismatch { expected: u8, received: u8 },
    /// A payload token is missing, superfluous or not a number.
    MalformedField,
    /// Byte count before the binary sentinel was not the frame length.
    FrameLength { len: usize },
    /// Line longer than the receive buffer.
    Overflow,
    NotUtf8,
}

/// A decoded value outside its physical bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RangeError {
    pub channel: Channel,
    pub value: i32,
}

/// Command refused by a guard although it decoded cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Guard {
    /// Throttle is above idle.
    MotorsRunning,
    UnknownBatterySensor,
    UnknownWaypointMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    Parse(ParseError),
    Range(RangeError),
    Rejected(Guard),
}

impl From<ParseError> for CommandError {
    fn from(e: ParseError) -> Self {
        CommandError::Parse(e)
    }
}

impl From<RangeError> for CommandError {
    fn from(e: RangeError) -> Self {
        CommandError::Range(e)
    }
}

impl From<Guard> for CommandError {
    fn from(g: Guard) -> Self {
        CommandError::Rejected(g)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingType => f.write_str("missing command type"),
            ParseError::UnknownType => f.write_str("unknown command type"),
            ParseError::MissingChecksum => f.write_str("missing checksum trailer"),
            ParseError::BadChecksumHex => f.write_str("checksum trailer is not hex"),
            ParseError::ChecksumMismatch { expected, received } => {
                write!(f, "checksum mismatch: expected {expected:#04x}, got {received:#04x}")
            }
            ParseError::MalformedField => f.write_str("malformed payload field"),
            ParseError::FrameLength { len } => write!(f, "bad frame length {len}"),
            ParseError::Overflow => f.write_str("frame overflows receive buffer"),
            ParseError::NotUtf8 => f.write_str("frame is not valid text"),
        }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} value {} out of range", self.channel, self.value)
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::MotorsRunning => f.write_str("refused while motors are running"),
            Guard::UnknownBatterySensor => f.write_str("unknown battery sensor"),
            Guard::UnknownWaypointMode => f.write_str("unknown waypoint mode"),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(e) => e.fmt(f),
            CommandError::Range(e) => e.fmt(f),
            CommandError::Rejected(g) => g.fmt(f),
        }
    }
}
