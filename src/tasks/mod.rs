pub mod control_task;
pub mod telemetry_task;
pub mod uplink_task;
