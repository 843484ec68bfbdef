//! Safety core of the copter flight controller.
//!
//! Pilot commands arrive over PPM, a text uplink or a binary fallback radio
//! and are merged by the [`receiver`]. The [`governor`] replaces them with a
//! controlled descent while a sensor or the link is faulted. [`control`] runs
//! both once per tick against a [`hal::FlightHal`] board handle.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod control;
pub mod error;
pub mod faults;
pub mod governor;
pub mod hal;
pub mod math;
pub mod pid;
pub mod protocol;
pub mod receiver;
pub mod state;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use control::ControlLoop;
pub use hal::FlightHal;
