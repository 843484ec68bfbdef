use embassy_executor::task;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::{Duration, Ticker};

use copter_fc::pid::PidTable;
use copter_fc::telemetry::{self, TelemetryRecord};

use crate::usb::{self, UsbSerial};

/// Telemetry task — 20 Hz.
/// Takes the latest control-loop record and streams JSON lines over USB:
/// `rc_in` at 10 Hz, `fault` at 2 Hz while anything is flagged, `pid_cnf`
/// whenever a gain table was applied.
#[task]
pub async fn telemetry_task(
    mut usb_serial: UsbSerial<'static>,
    telemetry_rx: Receiver<'static, CriticalSectionRawMutex, TelemetryRecord, 1>,
    pid_rx: Receiver<'static, CriticalSectionRawMutex, PidTable, 1>,
) {
    let mut tick: u32 = 0;
    let mut record: Option<TelemetryRecord> = None;
    let mut last_state = None;

    let mut ticker = Ticker::every(Duration::from_hz(20));

    loop {
        ticker.next().await;
        tick = tick.wrapping_add(1);

        if let Ok(r) = telemetry_rx.try_receive() {
            if last_state != Some(r.state) {
                defmt::info!("governor {:?}, authority {:?}", r.state, r.authority);
                last_state = Some(r.state);
            }
            record = Some(r);
        }

        if !usb_serial.dtr() {
            continue;
        }

        if let Ok(table) = pid_rx.try_receive() {
            match telemetry::pid_lines(&table) {
                Ok(lines) => {
                    for line in &lines {
                        usb::write_all(&mut usb_serial, line.as_bytes()).await;
                    }
                }
                Err(_) => defmt::warn!("pid_cnf echo dropped: line too long"),
            }
        }

        let Some(rec) = record else { continue };

        if tick % 2 == 0 {
            if let Ok(line) = rec.rc_line() {
                usb::write_all(&mut usb_serial, line.as_bytes()).await;
            }
        }

        if rec.has_fault() && tick % 10 == 0 {
            if let Ok(line) = rec.fault_line() {
                usb::write_all(&mut usb_serial, line.as_bytes()).await;
            }
        }

        // ── Link diagnostics (every 5 s) ─────────────────────────────────────
        if tick % 100 == 0 {
            let s = rec.stats;
            defmt::debug!(
                "rx text={} bin={} ppm={} chk_err={} frame_err={} range_err={} rejected={}",
                s.text_frames, s.binary_frames, s.ppm_frames,
                s.checksum_errors, s.frame_errors, s.range_errors, s.rejected
            );
        }
    }
}
