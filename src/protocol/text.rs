use core::str::FromStr;

use super::checksum;
use super::ParseError;
use crate::config::PID_GAIN_MAX;
use crate::pid::{PidTable, RateGains};

pub const LINE_CAPACITY: usize = 256;

pub type Line = heapless::Vec<u8, LINE_CAPACITY>;

// ── Line accumulator ──────────────────────────────────────────────────────────

/// Splits the primary byte stream into lines. `\r` is dropped. A line that
/// outgrows the buffer is reported once and then skipped up to its newline.
#[derive(Default)]
pub struct LineReader {
    buffer: Line,
    discarding: bool,
}

impl LineReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_byte(&mut self, b: u8) -> Option<Result<Line, ParseError>> {
        match b {
            b'\n' => {
                if core::mem::take(&mut self.discarding) || self.buffer.is_empty() {
                    return None;
                }
                Some(Ok(core::mem::take(&mut self.buffer)))
            }
            b'\r' => None,
            _ if self.discarding => None,
            _ => {
                if self.buffer.push(b).is_err() {
                    self.buffer.clear();
                    self.discarding = true;
                    return Some(Err(ParseError::Overflow));
                }
                None
            }
        }
    }
}

// ── Frame ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandType {
    /// Stick command.
    Rc,
    /// Gain table.
    Pid,
    /// Gyro drift compensation.
    Cmp,
    /// Accelerometer calibration.
    Gyr,
    /// Battery sensor selection.
    Bat,
    /// Waypoint.
    Uav,
}

impl CommandType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "RC" => CommandType::Rc,
            "PID" => CommandType::Pid,
            "CMP" => CommandType::Cmp,
            "GYR" => CommandType::Gyr,
            "BAT" => CommandType::Bat,
            "UAV" => CommandType::Uav,
            _ => return None,
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            CommandType::Rc => "RC",
            CommandType::Pid => "PID",
            CommandType::Cmp => "CMP",
            CommandType::Gyr => "GYR",
            CommandType::Bat => "BAT",
            CommandType::Uav => "UAV",
        }
    }
}

/// A checksum-verified frame borrowing from the received line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub kind: CommandType,
    pub payload: &'a str,
}

/// Splits `TYPE#payload*chk` and verifies the checksum over `payload`.
pub fn split_frame(line: &str) -> Result<Frame<'_>, ParseError> {
    let (tag, rest) = line.split_once('#').ok_or(ParseError::MissingType)?;
    let kind = CommandType::from_tag(tag.trim()).ok_or(ParseError::UnknownType)?;
    let (payload, trailer) = rest.split_once('*').ok_or(ParseError::MissingChecksum)?;
    checksum::verify(payload.as_bytes(), trailer)?;
    Ok(Frame { kind, payload })
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Decoded but not yet range-checked or guarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextCommand {
    Rc { roll: i32, pitch: i32, throttle: i32, yaw: i32 },
    Pid(PidTable),
    Cmp { roll: f32, pitch: f32 },
    Gyr { calibrate: bool },
    Bat { sensor: u8 },
    Uav { lat: i32, lon: i32, alt_cm: i32, mode: u8 },
}

pub fn parse(line: &str) -> Result<TextCommand, ParseError> {
    let frame = split_frame(line)?;
    parse_payload(frame.kind, frame.payload)
}

pub fn parse_payload(kind: CommandType, payload: &str) -> Result<TextCommand, ParseError> {
    Ok(match kind {
        CommandType::Rc => {
            let [roll, pitch, throttle, yaw] = numbers::<i32, 4>(payload, ',')?;
            TextCommand::Rc { roll, pitch, throttle, yaw }
        }
        CommandType::Pid => TextCommand::Pid(parse_pid_table(payload)?),
        CommandType::Cmp => {
            let [roll, pitch] = numbers::<f32, 2>(payload, ',')?;
            if !roll.is_finite() || !pitch.is_finite() {
                return Err(ParseError::MalformedField);
            }
            TextCommand::Cmp { roll, pitch }
        }
        CommandType::Gyr => {
            let [flag] = numbers::<i32, 1>(payload, ',')?;
            TextCommand::Gyr { calibrate: flag != 0 }
        }
        CommandType::Bat => {
            let [sensor] = numbers::<u8, 1>(payload, ',')?;
            TextCommand::Bat { sensor }
        }
        CommandType::Uav => {
            let (position, mode) = payload.rsplit_once(',').ok_or(ParseError::MalformedField)?;
            let [lat, lon, alt_cm] = numbers::<i32, 3>(position, ',')?;
            let [mode] = numbers::<u8, 1>(mode, ',')?;
            TextCommand::Uav { lat, lon, alt_cm, mode }
        }
    })
}

/// Five rate groups `kP,kI,kD,iMax` then one group of five stabilise gains,
/// separated by `;`. Every gain must lie within `±PID_GAIN_MAX`.
fn parse_pid_table(payload: &str) -> Result<PidTable, ParseError> {
    let mut table = PidTable::default();
    let mut groups = payload.split(';');
    for gains in table.rate.iter_mut() {
        let group = groups.next().ok_or(ParseError::MalformedField)?;
        let [kp, ki, kd, imax] = numbers::<f32, 4>(group, ',')?;
        *gains = RateGains { kp, ki, kd, imax };
    }
    let group = groups.next().ok_or(ParseError::MalformedField)?;
    table.stab_kp = numbers::<f32, 5>(group, ',')?;
    if groups.next().is_some() {
        return Err(ParseError::MalformedField);
    }
    let in_bounds = table
        .rate
        .iter()
        .flat_map(|g| [g.kp, g.ki, g.kd, g.imax])
        .chain(table.stab_kp)
        .all(|v| (-PID_GAIN_MAX..=PID_GAIN_MAX).contains(&v));
    if !in_bounds {
        return Err(ParseError::MalformedField);
    }
    Ok(table)
}

/// Exactly `N` `sep`-separated numbers, surrounding whitespace ignored.
fn numbers<T: FromStr + Copy + Default, const N: usize>(s: &str, sep: char) -> Result<[T; N], ParseError> {
    let mut out = [T::default(); N];
    let mut tokens = s.split(sep);
    for slot in out.iter_mut() {
        let token = tokens.next().ok_or(ParseError::MalformedField)?;
        *slot = token.trim().parse().map_err(|_| ParseError::MalformedField)?;
    }
    if tokens.next().is_some() {
        return Err(ParseError::MalformedField);
    }
    Ok(out)
}
