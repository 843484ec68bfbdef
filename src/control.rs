//! Per-tick orchestration: ingestion, fault collection, governor, snapshot.

use crate::config::Config;
use crate::faults::FaultFlags;
use crate::governor::{Governor, GovernorOutput, GovernorState};
use crate::hal::FlightHal;
use crate::receiver::Receiver;
use crate::state::{Authority, CommandVector};
use crate::telemetry::TelemetryRecord;

pub struct ControlLoop<H> {
    hal: H,
    receiver: Receiver,
    governor: Governor,
    output: GovernorOutput,
    ticks: u32,
}

impl<H: FlightHal> ControlLoop<H> {
    pub fn new(hal: H, config: &Config) -> Self {
        let receiver = Receiver::new(config, hal.millis());
        let output = GovernorOutput {
            command: CommandVector::idle(&config.limits),
            authority: Authority::Pilot,
            state: GovernorState::Normal,
            altitude_hold: true,
        };
        Self { hal, receiver, governor: Governor::new(config), output, ticks: 0 }
    }

    /// One control tick. The returned record describes the output that the
    /// motor stage should use until the next tick.
    pub fn tick(&mut self) -> TelemetryRecord {
        self.receiver.set_motors_throttle(self.output.command.throttle());
        self.receiver.ingest(&mut self.hal);

        let faults = FaultFlags {
            device: self.hal.device_faults(),
            link: self.receiver.link_faults(),
        };
        self.output = self.governor.update(&mut self.hal, faults, self.receiver.command());
        self.ticks = self.ticks.wrapping_add(1);

        let now = self.hal.millis();
        trace!("tick {} thr {} {:?}", self.ticks, self.output.command.throttle(), self.output.authority);
        TelemetryRecord {
            tick_ms: now,
            command: self.output.command,
            authority: self.output.authority,
            state: self.output.state,
            ages_ms: self.receiver.freshness(now),
            device: faults.device.bits(),
            link: faults.link.bits(),
            stats: self.receiver.stats(),
        }
    }

    pub fn output(&self) -> &GovernorOutput {
        &self.output
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn loop_period_ms(&self) -> u32 {
        self.receiver.loop_period_ms()
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn governor(&self) -> &Governor {
        &self.governor
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }
}

#[cfg(test)]
mod tests;
