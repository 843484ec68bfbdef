//! Uplink wire formats.
//!
//! * primary uplink: newline-terminated text `TYPE#payload*chk`
//! * fallback uplink: 7 payload bytes closed by [`binary::SENTINEL`]
//!
//! Both share the rotate-and-sum [`checksum`](checksum::checksum).

pub mod binary;
pub mod checksum;
pub mod text;

pub use crate::error::ParseError;
