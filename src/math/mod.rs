//! Stateless numeric helpers shared by ingestion and the governor.

pub mod angle;
pub mod filter;
pub mod sigmoid;

pub use angle::{delta_deg, wrap_180, wrap_180_axes, wrap_360, wrap_360_axes};
pub use filter::{low_pass, low_pass_axes, low_pass_pct, LowPass};
pub use sigmoid::{anneal, anneal_axes, anneal_i32, sigmoid_attitude, sigmoid_climb, Transfer};
