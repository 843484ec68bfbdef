/// Rotate-and-sum integrity code shared by both uplinks:
/// `acc = (acc + byte) << 1`, truncated to 8 bits at every step.
///
/// Each step shifts the earlier bytes one bit further out of the accumulator,
/// so only the low bits of early bytes in long payloads still contribute.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b) << 1)
}

/// Parses a hex trailer (one or more digits, optional `0x`, surrounding
/// whitespace allowed) and compares it with the checksum of `payload`.
pub fn verify(payload: &[u8], trailer: &str) -> Result<(), super::ParseError> {
    let hex = trailer.trim();
    let hex = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(hex);
    let received = u32::from_str_radix(hex, 16).map_err(|_| super::ParseError::BadChecksumHex)?;
    let expected = checksum(payload);
    if received != expected as u32 {
        return Err(super::ParseError::ChecksumMismatch {
            expected,
            received: received as u8,
        });
    }
    Ok(())
}
