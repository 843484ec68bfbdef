//! Command ingestion.
//!
//! One [`Receiver`] owns the pilot command and everything needed to refresh it
//! from the three transport paths. Every tick [`Receiver::ingest`] tries them
//! in priority order:
//!
//! 1. PPM, when enabled.
//! 2. The primary text uplink. It is read every tick; while PPM delivered a
//!    frame this tick its `RC` sticks are validated but not committed.
//! 3. The fallback binary uplink, once nothing was accepted and the primary
//!    path has been silent for longer than `primary_timeout_ms`. Otherwise
//!    its pending bytes are discarded.
//!
//! Frames are validated on a scratch value and committed whole, so the pilot
//! command is never partially written. Rejected frames only bump a counter in
//! [`ReceiverStats`].

use crate::config::{
    Config, IngestConfig, Limits, DRIFT_CORRECTION_MAX, PPM_MAX_US, PPM_MID_US, PPM_MIN_US, PPM_PULSE_MAX_US,
    PPM_PULSE_MIN_US,
};
use crate::error::{CommandError, Guard, ParseError, RangeError};
use crate::faults::LinkFaults;
use crate::hal::FlightHal;
use crate::math::low_pass;
use crate::protocol::binary::{self, FrameReader, RawFrame};
use crate::protocol::text::{self, LineReader, TextCommand};
use crate::state::{
    BatterySensor, Channel, CommandVector, DriftCorrection, LinkPath, LinkState, Waypoint, WaypointMode,
};

/// Bytes pulled from a uplink per read call.
const READ_CHUNK: usize = 64;
/// Read calls per path and tick. Anything beyond waits for the next tick.
const MAX_READS_PER_TICK: usize = 8;

/// Wrapping diagnostic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReceiverStats {
    pub text_frames: u32,
    pub binary_frames: u32,
    pub ppm_frames: u32,
    pub checksum_errors: u32,
    pub frame_errors: u32,
    pub range_errors: u32,
    /// Decoded cleanly but refused by a guard.
    pub rejected: u32,
}

pub struct Receiver {
    limits: Limits,
    config: IngestConfig,

    pilot: CommandVector,
    waypoint: Waypoint,

    /// Throttle the motors were last driven with, as reported by the owner.
    motors_throttle: i16,
    /// PPM committed the sticks this tick.
    ppm_owns_sticks: bool,

    links: [LinkState; 3],
    last_valid_ms: u32,
    link_faults: LinkFaults,
    period_ms: u32,

    lines: LineReader,
    frames: FrameReader,
    stats: ReceiverStats,
}

impl Receiver {
    /// All paths count as fresh at `now_ms`, so the link timeout only fires
    /// after a full `link_timeout_ms` of silence.
    pub fn new(config: &Config, now_ms: u32) -> Self {
        Self {
            limits: config.limits,
            config: config.ingest,
            pilot: CommandVector::idle(&config.limits),
            waypoint: Waypoint::default(),
            motors_throttle: config.limits.thr_off,
            ppm_owns_sticks: false,
            links: [LinkState::new(now_ms); 3],
            last_valid_ms: now_ms,
            link_faults: LinkFaults::empty(),
            period_ms: config.ingest.main_period_ms,
            lines: LineReader::new(),
            frames: FrameReader::new(),
            stats: ReceiverStats::default(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// The last committed pilot command.
    pub fn command(&self) -> CommandVector {
        self.pilot
    }

    pub fn waypoint(&self) -> Waypoint {
        self.waypoint
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    pub fn link_faults(&self) -> LinkFaults {
        self.link_faults
    }

    pub fn loop_period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Age of each path in [`LinkPath::ALL`] order.
    pub fn freshness(&self, now_ms: u32) -> [u32; 3] {
        self.links.map(|link| link.age(now_ms))
    }

    pub fn link(&self, path: LinkPath) -> LinkState {
        self.links[path.index()]
    }

    /// Reports the throttle actually sent to the motors, which differs from
    /// the pilot command while the governor has authority. Idle-only commands
    /// are refused while either is above idle.
    pub fn set_motors_throttle(&mut self, throttle: i16) {
        self.motors_throttle = throttle;
    }

    // ── Tick ──────────────────────────────────────────────────────────────────

    /// Runs the ingestion cascade once. Returns whether any command was
    /// accepted this tick.
    pub fn ingest<H: FlightHal>(&mut self, hal: &mut H) -> bool {
        self.ppm_owns_sticks = self.config.ppm_enabled && self.poll_ppm(hal);
        let mut accepted = self.ppm_owns_sticks;

        if self.config.primary_enabled {
            accepted |= self.poll_primary(hal);
        }
        self.ppm_owns_sticks = false;
        if accepted {
            self.set_cadence(hal, self.config.main_period_ms);
        }

        let now = hal.millis();
        if !accepted
            && self.config.fallback_enabled
            && self.links[LinkPath::Primary.index()].age(now) > self.config.primary_timeout_ms
        {
            let navigating = self.waypoint.mode.contains(WaypointMode::GPS_NAVIGATION);
            if !navigating && !self.config.bench_override {
                self.set_cadence(hal, self.config.fallback_period_ms);
            }
            accepted = self.poll_fallback(hal);
        } else {
            self.discard_fallback(hal);
        }

        self.update_link_faults(hal.millis());
        accepted
    }

    fn set_cadence<H: FlightHal>(&mut self, hal: &mut H, period_ms: u32) {
        if self.period_ms == period_ms {
            return;
        }
        self.period_ms = period_ms;
        hal.set_loop_period_ms(period_ms);
        info!("loop period now {} ms", period_ms);
    }

    fn update_link_faults(&mut self, now_ms: u32) {
        let stale = now_ms.wrapping_sub(self.last_valid_ms) > self.config.link_timeout_ms;
        if stale != self.link_faults.contains(LinkFaults::LINK_TIMEOUT) {
            if stale {
                warn!("link timeout: no valid command for {} ms", now_ms.wrapping_sub(self.last_valid_ms));
            } else {
                info!("link restored");
            }
        }
        self.link_faults.set(LinkFaults::LINK_TIMEOUT, stale);
    }

    fn mark_valid(&mut self, path: LinkPath, now_ms: u32) {
        self.links[path.index()].mark_valid(now_ms);
        self.last_valid_ms = now_ms;
    }

    fn record(&mut self, path: LinkPath, e: CommandError) {
        let counter = match e {
            CommandError::Parse(ParseError::ChecksumMismatch { .. }) => &mut self.stats.checksum_errors,
            CommandError::Parse(_) => &mut self.stats.frame_errors,
            CommandError::Range(_) => &mut self.stats.range_errors,
            CommandError::Rejected(_) => &mut self.stats.rejected,
        };
        *counter = counter.wrapping_add(1);
        warn!("{:?} command dropped: {:?}", path, e);
    }

    // ── PPM ───────────────────────────────────────────────────────────────────

    fn poll_ppm<H: FlightHal>(&mut self, hal: &mut H) -> bool {
        let Some(pulses) = hal.ppm_input() else {
            return false;
        };
        match self.decode_ppm(pulses) {
            Ok(command) => {
                self.pilot = command;
                self.stats.ppm_frames = self.stats.ppm_frames.wrapping_add(1);
                self.mark_valid(LinkPath::Ppm, hal.millis());
                true
            }
            Err(e) => {
                self.record(LinkPath::Ppm, e.into());
                false
            }
        }
    }

    /// Maps pulse widths onto the command bounds and blends the attitude
    /// channels with the previous command.
    fn decode_ppm(&self, pulses: [u16; 4]) -> Result<CommandVector, RangeError> {
        for channel in Channel::ALL {
            let us = pulses[channel.index()];
            if !(PPM_PULSE_MIN_US..=PPM_PULSE_MAX_US).contains(&us) {
                return Err(RangeError { channel, value: i32::from(us) });
            }
        }
        let us = |c: Channel| i32::from(pulses[c.index()].clamp(PPM_MIN_US, PPM_MAX_US));
        let half_span = i32::from(PPM_MAX_US - PPM_MID_US);
        let span = i32::from(PPM_MAX_US - PPM_MIN_US);
        let l = &self.limits;

        let angle = |c: Channel, max: i16| (us(c) - i32::from(PPM_MID_US)) * i32::from(max) / half_span;
        let smooth = |c: Channel, max: i16| {
            low_pass(angle(c, max) as f32, f32::from(self.pilot[c]), self.config.ppm_smoothing) as i32
        };
        let throttle =
            i32::from(l.thr_off) + (us(Channel::Throttle) - i32::from(PPM_MIN_US)) * i32::from(l.thr_max - l.thr_off) / span;

        CommandVector::checked(
            smooth(Channel::Roll, l.roll_max),
            smooth(Channel::Pitch, l.pitch_max),
            throttle,
            smooth(Channel::Yaw, l.yaw_max),
            l,
        )
    }

    // ── Primary uplink ────────────────────────────────────────────────────────

    fn poll_primary<H: FlightHal>(&mut self, hal: &mut H) -> bool {
        let mut accepted = false;
        let mut chunk = [0u8; READ_CHUNK];
        for _ in 0..MAX_READS_PER_TICK {
            let n = hal.read_primary(&mut chunk).min(READ_CHUNK);
            if n == 0 {
                break;
            }
            for &b in &chunk[..n] {
                match self.lines.push_byte(b) {
                    Some(Ok(line)) => accepted |= self.parse_text_command(hal, &line).is_ok(),
                    Some(Err(e)) => self.record(LinkPath::Primary, e.into()),
                    None => {}
                }
            }
        }
        accepted
    }

    /// Parses and applies one complete `TYPE#payload*chk` line (no newline).
    pub fn parse_text_command<H: FlightHal>(&mut self, hal: &mut H, line: &[u8]) -> Result<(), CommandError> {
        let result = self.decode_text(hal, line);
        match result {
            Ok(()) => {
                self.stats.text_frames = self.stats.text_frames.wrapping_add(1);
                self.mark_valid(LinkPath::Primary, hal.millis());
            }
            Err(e) => self.record(LinkPath::Primary, e),
        }
        result
    }

    fn decode_text<H: FlightHal>(&mut self, hal: &mut H, line: &[u8]) -> Result<(), CommandError> {
        let line = core::str::from_utf8(line).map_err(|_| ParseError::NotUtf8)?;
        let command = text::parse(line)?;
        self.apply(hal, command)
    }

    fn require_idle(&self) -> Result<(), Guard> {
        if self.pilot.throttle().max(self.motors_throttle) > self.limits.thr_min {
            return Err(Guard::MotorsRunning);
        }
        Ok(())
    }

    fn apply<H: FlightHal>(&mut self, hal: &mut H, command: TextCommand) -> Result<(), CommandError> {
        match command {
            TextCommand::Rc { roll, pitch, throttle, yaw } => {
                let command = CommandVector::checked(roll, pitch, throttle, yaw, &self.limits)?;
                if !self.ppm_owns_sticks {
                    self.pilot = command;
                }
            }
            TextCommand::Pid(table) => {
                self.require_idle()?;
                hal.apply_pid_gains(&table);
                info!("PID gains updated");
            }
            TextCommand::Cmp { roll, pitch } => {
                let correction = DriftCorrection {
                    roll: roll.clamp(-DRIFT_CORRECTION_MAX, DRIFT_CORRECTION_MAX),
                    pitch: pitch.clamp(-DRIFT_CORRECTION_MAX, DRIFT_CORRECTION_MAX),
                };
                hal.set_drift_correction(correction);
                debug!("drift correction {:?}", correction);
            }
            TextCommand::Gyr { calibrate } => {
                if calibrate {
                    self.require_idle()?;
                    info!("accelerometer calibration requested");
                    hal.run_accel_calibration();
                }
            }
            TextCommand::Bat { sensor } => {
                let sensor = BatterySensor::try_from(sensor).map_err(|_| Guard::UnknownBatterySensor)?;
                hal.select_battery_sensor(sensor);
                info!("battery sensor {:?}", sensor);
            }
            TextCommand::Uav { lat, lon, alt_cm, mode } => {
                let mut mode = WaypointMode::from_bits(mode).ok_or(Guard::UnknownWaypointMode)?;
                let mut alt_cm = alt_cm;
                if mode.contains(WaypointMode::HOLD_ALTITUDE) {
                    match hal.altitude_m().filter(|m| m.is_finite()) {
                        Some(m) => alt_cm = (m * 100.0) as i32,
                        None => {
                            warn!("no altitude for hold-altitude waypoint, mode cleared");
                            mode = WaypointMode::empty();
                        }
                    }
                }
                self.waypoint = Waypoint { lat, lon, alt_cm, mode };
                debug!("waypoint {} {} {} cm, mode {}", lat, lon, alt_cm, mode.bits());
            }
        }
        Ok(())
    }

    // ── Fallback uplink ───────────────────────────────────────────────────────

    fn poll_fallback<H: FlightHal>(&mut self, hal: &mut H) -> bool {
        let mut accepted = false;
        let mut chunk = [0u8; READ_CHUNK];
        for _ in 0..MAX_READS_PER_TICK {
            let n = hal.read_fallback(&mut chunk).min(READ_CHUNK);
            if n == 0 {
                break;
            }
            for &b in &chunk[..n] {
                match self.frames.push_byte(b) {
                    Some(Ok(frame)) => accepted |= self.parse_binary_command(hal, &frame).is_ok(),
                    Some(Err(e)) => self.record(LinkPath::Fallback, e.into()),
                    None => {}
                }
            }
        }
        accepted
    }

    /// Drops fallback bytes that arrived while the path was not selected, so a
    /// later takeover starts from fresh frames.
    fn discard_fallback<H: FlightHal>(&mut self, hal: &mut H) {
        let mut chunk = [0u8; READ_CHUNK];
        let mut dropped = 0usize;
        for _ in 0..MAX_READS_PER_TICK {
            let n = hal.read_fallback(&mut chunk).min(READ_CHUNK);
            if n == 0 {
                break;
            }
            dropped += n;
        }
        if dropped > 0 {
            self.frames.reset();
            trace!("discarded {} idle fallback bytes", dropped);
        }
    }

    /// Decodes and commits the bytes received before one sentinel.
    pub fn parse_binary_command<H: FlightHal>(&mut self, hal: &mut H, buffer: &[u8]) -> Result<(), CommandError> {
        match self.decode_binary(buffer) {
            Ok(command) => {
                self.pilot = command;
                self.stats.binary_frames = self.stats.binary_frames.wrapping_add(1);
                self.mark_valid(LinkPath::Fallback, hal.millis());
                Ok(())
            }
            Err(e) => {
                self.record(LinkPath::Fallback, e);
                Err(e)
            }
        }
    }

    fn decode_binary(&self, buffer: &[u8]) -> Result<CommandVector, CommandError> {
        let frame: RawFrame = buffer
            .try_into()
            .map_err(|_| ParseError::FrameLength { len: buffer.len() })?;
        let sticks = binary::decode(&frame)?;
        Ok(CommandVector::checked(sticks.roll, sticks.pitch, sticks.throttle, sticks.yaw, &self.limits)?)
    }
}

#[cfg(test)]
mod tests;
