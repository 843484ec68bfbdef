use super::checksum::checksum;
use super::ParseError;

/// Terminates every fallback frame. Never a legal payload byte.
pub const SENTINEL: u8 = 0xFE;

/// Six data bytes plus checksum.
pub const FRAME_LEN: usize = 7;

pub type RawFrame = [u8; FRAME_LEN];

/// Decoded stick values, not yet range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSticks {
    pub roll: i32,
    pub pitch: i32,
    pub throttle: i32,
    pub yaw: i32,
}

// ── Frame reader ──────────────────────────────────────────────────────────────

/// Byte-wise framer for the fallback uplink.
///
/// Bytes accumulate until [`SENTINEL`]. A sentinel after exactly
/// [`FRAME_LEN`] bytes yields the frame; any other count is a length error.
/// Overlong runs are reported once and skipped until the next sentinel.
#[derive(Default)]
pub struct FrameReader {
    buffer: heapless::Vec<u8, FRAME_LEN>,
    overrun: bool,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_byte(&mut self, b: u8) -> Option<Result<RawFrame, ParseError>> {
        if b == SENTINEL {
            let len = self.buffer.len();
            let result = if core::mem::take(&mut self.overrun) {
                None
            } else if len == FRAME_LEN {
                let mut frame = [0u8; FRAME_LEN];
                frame.copy_from_slice(&self.buffer);
                Some(Ok(frame))
            } else {
                Some(Err(ParseError::FrameLength { len }))
            };
            self.buffer.clear();
            return result;
        }
        if self.overrun {
            return None;
        }
        if self.buffer.push(b).is_err() {
            self.buffer.clear();
            self.overrun = true;
            return Some(Err(ParseError::FrameLength { len: FRAME_LEN + 1 }));
        }
        None
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overrun = false;
    }
}

// ── Codec ─────────────────────────────────────────────────────────────────────

/// Layout, all bytes unsigned:
///
/// | byte | meaning                           |
/// |------|-----------------------------------|
/// | 0    | throttle hundreds above 1000      |
/// | 1    | throttle remainder                |
/// | 2    | pitch + 127                       |
/// | 3    | roll + 127                        |
/// | 4    | yaw sign + 127 (126, 127 or 128)  |
/// | 5    | yaw magnitude                     |
/// | 6    | checksum over bytes 0..6          |
pub fn decode(frame: &RawFrame) -> Result<RawSticks, ParseError> {
    let expected = checksum(&frame[..6]);
    if frame[6] != expected {
        return Err(ParseError::ChecksumMismatch {
            expected,
            received: frame[6],
        });
    }
    let b = frame.map(i32::from);
    Ok(RawSticks {
        throttle: 1000 + b[0] * 100 + b[1],
        pitch: b[2] - 127,
        roll: b[3] - 127,
        yaw: b[5] * (b[4] - 127),
    })
}

/// Builds a sentinel-terminated frame. `None` when a value does not fit the
/// layout or a byte, checksum included, would collide with [`SENTINEL`].
pub fn encode(sticks: RawSticks) -> Option<[u8; FRAME_LEN + 1]> {
    let thr = u32::try_from(sticks.throttle.checked_sub(1000)?).ok()?;
    let byte = |v: i32| u8::try_from(v).ok().filter(|&b| b != SENTINEL);
    let mut out = [0u8; FRAME_LEN + 1];
    out[0] = byte(i32::try_from(thr / 100).ok()?)?;
    out[1] = byte((thr % 100) as i32)?;
    out[2] = byte(sticks.pitch + 127)?;
    out[3] = byte(sticks.roll + 127)?;
    out[4] = byte(sticks.yaw.signum() + 127)?;
    out[5] = byte(sticks.yaw.abs())?;
    out[6] = byte(i32::from(checksum(&out[..6])))?;
    out[7] = SENTINEL;
    Some(out)
}
