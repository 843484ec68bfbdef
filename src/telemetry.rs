//! Telemetry snapshot and its line encoding.
//!
//! Lines are newline-terminated JSON objects the ground station already
//! understands:
//!
//! ```text
//! {"type":"rc_in","r":10,"p":-5,"t":1200,"y":0}
//! {"type":"fault","state":"link_descent","auth":"gov","dev":0,"link":1,"age_ms":[0,512,512]}
//! {"type":"pid_cnf","pit_rkp":0.70,"pit_rki":1.00,"pit_rimax":50.00,...}
//! ```

use core::fmt::{self, Write};

use crate::faults::{DeviceFaults, LinkFaults};
use crate::governor::GovernorState;
use crate::pid::{PidLoop, PidTable};
use crate::receiver::ReceiverStats;
use crate::state::{Authority, CommandVector};

pub const LINE_CAPACITY: usize = 256;

pub type TelemetryLine = heapless::String<LINE_CAPACITY>;

/// Everything published after one control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    pub tick_ms: u32,
    pub command: CommandVector,
    pub authority: Authority,
    pub state: GovernorState,
    /// Per-path age in `LinkPath::ALL` order.
    pub ages_ms: [u32; 3],
    pub device: u16,
    pub link: u8,
    pub stats: ReceiverStats,
}

impl TelemetryRecord {
    pub fn device_faults(&self) -> DeviceFaults {
        DeviceFaults::from_bits_truncate(self.device)
    }

    pub fn link_faults(&self) -> LinkFaults {
        LinkFaults::from_bits_truncate(self.link)
    }

    /// Fault line is only worth sending when something is wrong.
    pub fn has_fault(&self) -> bool {
        self.device != 0 || self.link != 0 || self.state != GovernorState::Normal
    }

    pub fn write_rc_line<W: Write>(&self, out: &mut W) -> fmt::Result {
        let c = &self.command;
        writeln!(
            out,
            "{{\"type\":\"rc_in\",\"r\":{},\"p\":{},\"t\":{},\"y\":{}}}",
            c.roll(),
            c.pitch(),
            c.throttle(),
            c.yaw()
        )
    }

    pub fn write_fault_line<W: Write>(&self, out: &mut W) -> fmt::Result {
        let [ppm, primary, fallback] = self.ages_ms;
        writeln!(
            out,
            "{{\"type\":\"fault\",\"state\":\"{}\",\"auth\":\"{}\",\"dev\":{},\"link\":{},\"age_ms\":[{},{},{}]}}",
            state_name(self.state),
            authority_name(self.authority),
            self.device,
            self.link,
            ppm,
            primary,
            fallback
        )
    }

    pub fn rc_line(&self) -> Result<TelemetryLine, fmt::Error> {
        let mut line = TelemetryLine::new();
        self.write_rc_line(&mut line)?;
        Ok(line)
    }

    pub fn fault_line(&self) -> Result<TelemetryLine, fmt::Error> {
        let mut line = TelemetryLine::new();
        self.write_fault_line(&mut line)?;
        Ok(line)
    }
}

// ── Gain table echo ───────────────────────────────────────────────────────────

fn write_pid_line<W: Write>(table: &PidTable, loops: &[(PidLoop, &str)], out: &mut W) -> fmt::Result {
    out.write_str("{\"type\":\"pid_cnf\"")?;
    for &(l, name) in loops {
        let g = &table[l];
        write!(out, ",\"{name}_rkp\":{:.2},\"{name}_rki\":{:.2},\"{name}_rimax\":{:.2}", g.kp, g.ki, g.imax)?;
    }
    for &(l, name) in loops {
        write!(out, ",\"{name}_skp\":{:.2}", table.stab(l))?;
    }
    out.write_str("}\n")
}

/// Echoes an applied gain table as two lines, attitude loops then altitude
/// loops.
pub fn pid_lines(table: &PidTable) -> Result<[TelemetryLine; 2], fmt::Error> {
    let mut attitude = TelemetryLine::new();
    write_pid_line(
        table,
        &[(PidLoop::Pitch, "pit"), (PidLoop::Roll, "rol"), (PidLoop::Yaw, "yaw")],
        &mut attitude,
    )?;
    let mut altitude = TelemetryLine::new();
    write_pid_line(table, &[(PidLoop::Throttle, "thr"), (PidLoop::Accel, "acc")], &mut altitude)?;
    Ok([attitude, altitude])
}

fn state_name(state: GovernorState) -> &'static str {
    match state {
        GovernorState::Normal => "normal",
        GovernorState::DeviceFaultDescent => "device_descent",
        GovernorState::LinkFaultDescent => "link_descent",
        GovernorState::AltitudeHoldDisabled => "alt_hold_off",
    }
}

fn authority_name(authority: Authority) -> &'static str {
    match authority {
        Authority::Pilot => "pilot",
        Authority::Governor => "gov",
    }
}
