use super::*;
use crate::config::{Config, FALLBACK_PERIOD_MS, MAIN_PERIOD_MS};
use crate::protocol::binary::SENTINEL;
use crate::testing::SimHal;

fn config() -> Config {
    let mut config = Config::default();
    config.ingest.ppm_enabled = false;
    config.ingest.bench_override = false;
    config
}

fn setup() -> (Receiver, SimHal) {
    (Receiver::new(&config(), 0), SimHal::new())
}

fn idle() -> CommandVector {
    CommandVector::idle(&Limits::default())
}

const FALLBACK_FRAME: [u8; 8] = [3, 0, 130, 123, 126, 20, 216, SENTINEL];

// ── Primary uplink ────────────────────────────────────────────────────────────

#[test]
fn rc_line_commits_and_refreshes_primary() {
    let (mut rx, mut hal) = setup();
    hal.advance(40);
    hal.send_line("RC#10,-5,1200,0*10");

    assert!(rx.ingest(&mut hal));
    assert_eq!(rx.command(), CommandVector::new(10, -5, 1200, 0));
    assert_eq!(rx.link(LinkPath::Primary).last_valid_ms, 40);
    assert_eq!(rx.stats().text_frames, 1);
    assert!(rx.link_faults().is_empty());
}

#[test]
fn bad_checksum_leaves_command_untouched() {
    let (mut rx, mut hal) = setup();
    hal.send_line("RC#10,-5,1200,1*10");

    assert!(!rx.ingest(&mut hal));
    assert_eq!(rx.command(), idle());
    assert_eq!(rx.stats().checksum_errors, 1);
    assert_eq!(rx.stats().text_frames, 0);
}

#[test]
fn out_of_range_throttle_is_dropped() {
    let (mut rx, mut hal) = setup();
    hal.send_line("RC#0,0,1950,0*40");

    assert!(!rx.ingest(&mut hal));
    assert_eq!(rx.command(), idle());
    assert_eq!(rx.stats().range_errors, 1);
}

#[test]
fn lines_in_one_tick_apply_in_order() {
    let (mut rx, mut hal) = setup();
    hal.send_line("RC#10,-5,1200,0*10");
    hal.send_line("RC#5,5,1300,0*30");

    assert!(rx.ingest(&mut hal));
    assert_eq!(rx.command(), CommandVector::new(5, 5, 1300, 0));
    assert_eq!(rx.stats().text_frames, 2);
}

#[test]
fn overflowing_line_does_not_poison_the_next() {
    let (mut rx, mut hal) = setup();
    hal.primary.extend(core::iter::repeat(b'7').take(300));
    hal.send_line("");
    hal.send_line("RC#10,-5,1200,0*10");

    assert!(rx.ingest(&mut hal));
    assert_eq!(rx.command(), CommandVector::new(10, -5, 1200, 0));
    assert_eq!(rx.stats().frame_errors, 1);
}

#[test]
fn non_text_line_is_a_frame_error() {
    let (mut rx, mut hal) = setup();
    let result = rx.parse_text_command(&mut hal, b"RC#\xff*00");
    assert_eq!(result, Err(CommandError::Parse(ParseError::NotUtf8)));
    assert_eq!(rx.stats().frame_errors, 1);
}

// ── Configuration commands ────────────────────────────────────────────────────

#[test]
fn pid_refused_while_motors_run() {
    let (mut rx, mut hal) = setup();
    let pid = "PID#1,1,1,1;1,1,1,1;1,1,1,1;1,1,1,1;1,1,1,1;1,1,1,1,1*FA";

    hal.send_line("RC#0,0,1500,0*70");
    hal.send_line(pid);
    rx.ingest(&mut hal);
    assert_eq!(hal.pid, None);
    assert_eq!(rx.stats().rejected, 1);

    hal.send_line("RC#0,0,1000,0*D0");
    hal.send_line(pid);
    rx.ingest(&mut hal);
    let table = hal.pid.expect("gains applied at idle");
    assert_eq!(table.stab_kp, [1.0; 5]);
}

#[test]
fn gyr_calibrates_only_at_idle() {
    let (mut rx, mut hal) = setup();
    hal.send_line("GYR#1*62");
    assert!(rx.ingest(&mut hal));
    assert_eq!(hal.calibrations, 1);

    hal.send_line("RC#0,0,1500,0*70");
    hal.send_line("GYR#1*62");
    rx.ingest(&mut hal);
    assert_eq!(hal.calibrations, 1);
    assert_eq!(rx.stats().rejected, 1);

    // `0` is a no-op even in flight
    assert_eq!(rx.parse_text_command(&mut hal, b"GYR#0*60"), Ok(()));
    assert_eq!(hal.calibrations, 1);
}

#[test]
fn drift_correction_is_clamped() {
    let (mut rx, mut hal) = setup();
    hal.send_line("CMP#25,-3*0A");
    assert!(rx.ingest(&mut hal));
    assert_eq!(hal.drift, Some(DriftCorrection { roll: 10.0, pitch: -3.0 }));
}

#[test]
fn battery_sensor_selection() {
    let (mut rx, mut hal) = setup();
    hal.send_line("BAT#4*68");
    hal.send_line("BAT#9*72");
    rx.ingest(&mut hal);
    assert_eq!(hal.battery, Some(BatterySensor::AnalogVoltageCurrent));
    assert_eq!(rx.stats().rejected, 1);
}

#[test]
fn hold_altitude_waypoint_takes_live_altitude() {
    let (mut rx, mut hal) = setup();
    hal.altitude = Some(12.5);
    hal.send_line("UAV#470000000,80000000,1500,1*72");
    assert!(rx.ingest(&mut hal));

    let wp = rx.waypoint();
    assert_eq!((wp.lat, wp.lon, wp.alt_cm), (470_000_000, 80_000_000, 1250));
    assert_eq!(wp.mode, WaypointMode::HOLD_ALTITUDE);
}

#[test]
fn hold_altitude_without_sample_downgrades_mode() {
    let (mut rx, mut hal) = setup();
    hal.send_line("UAV#470000000,80000000,1500,1*72");
    assert!(rx.ingest(&mut hal));

    let wp = rx.waypoint();
    assert_eq!(wp.alt_cm, 1500);
    assert!(wp.mode.is_empty());
}

#[test]
fn unknown_waypoint_mode_is_rejected() {
    let (mut rx, mut hal) = setup();
    hal.send_line("UAV#470000000,80000000,1500,4*78");
    assert!(!rx.ingest(&mut hal));
    assert_eq!(rx.waypoint(), Waypoint::default());
    assert_eq!(rx.stats().rejected, 1);
}

// ── Fallback uplink and cadence ───────────────────────────────────────────────

#[test]
fn fallback_ignored_while_primary_is_fresh() {
    let (mut rx, mut hal) = setup();
    hal.advance(100);
    hal.send_fallback(&FALLBACK_FRAME);

    assert!(!rx.ingest(&mut hal));
    assert_eq!(rx.command(), idle());
    assert!(hal.periods.is_empty());
}

#[test]
fn fallback_takes_over_and_slows_the_loop() {
    let (mut rx, mut hal) = setup();
    hal.advance(300);
    hal.send_fallback(&FALLBACK_FRAME);

    assert!(rx.ingest(&mut hal));
    assert_eq!(rx.command(), CommandVector::new(-4, 3, 1300, -20));
    assert_eq!(rx.link(LinkPath::Fallback).last_valid_ms, 300);
    assert_eq!(hal.periods, vec![FALLBACK_PERIOD_MS]);
    assert_eq!(rx.loop_period_ms(), FALLBACK_PERIOD_MS);

    hal.advance(20);
    hal.send_line("RC#10,-5,1200,0*10");
    assert!(rx.ingest(&mut hal));
    assert_eq!(hal.periods, vec![FALLBACK_PERIOD_MS, MAIN_PERIOD_MS]);
}

#[test]
fn gps_navigation_keeps_full_rate_on_fallback() {
    let (mut rx, mut hal) = setup();
    hal.send_line("UAV#470000000,80000000,1500,2*74");
    rx.ingest(&mut hal);

    hal.advance(300);
    hal.send_fallback(&FALLBACK_FRAME);
    assert!(rx.ingest(&mut hal));
    assert!(hal.periods.is_empty());
}

#[test]
fn bench_override_keeps_full_rate_on_fallback() {
    let mut config = config();
    config.ingest.bench_override = true;
    let mut rx = Receiver::new(&config, 0);
    let mut hal = SimHal::new();

    hal.advance(300);
    hal.send_fallback(&FALLBACK_FRAME);
    assert!(rx.ingest(&mut hal));
    assert!(hal.periods.is_empty());
}

#[test]
fn corrupted_fallback_checksum_is_not_committed() {
    let (mut rx, mut hal) = setup();
    hal.advance(300);
    hal.send_fallback(&[3, 0, 130, 123, 126, 20, 217, SENTINEL]);

    assert!(!rx.ingest(&mut hal));
    assert_eq!(rx.command(), idle());
    assert_eq!(rx.stats().checksum_errors, 1);
    assert_eq!(rx.link(LinkPath::Fallback).last_valid_ms, 0);

    hal.send_fallback(&[4, 0, 127, 137, 128, 30, 116, SENTINEL]);
    assert!(rx.ingest(&mut hal));
    assert_eq!(rx.command(), CommandVector::new(10, 0, 1400, 30));
}

#[test]
fn idle_fallback_bytes_are_discarded() {
    let (mut rx, mut hal) = setup();
    hal.send_fallback(&FALLBACK_FRAME);
    hal.advance(100);
    rx.ingest(&mut hal);
    assert!(hal.fallback.is_empty());

    hal.advance(200);
    assert!(!rx.ingest(&mut hal));
    assert_eq!(rx.command(), idle());
    assert_eq!(rx.stats().binary_frames, 0);
}

#[test]
fn short_fallback_frame_is_rejected() {
    let (mut rx, mut hal) = setup();
    assert_eq!(
        rx.parse_binary_command(&mut hal, &[1, 2, 3]),
        Err(CommandError::Parse(ParseError::FrameLength { len: 3 }))
    );
    assert_eq!(rx.stats().frame_errors, 1);
}

// ── Link faults ───────────────────────────────────────────────────────────────

#[test]
fn link_timeout_raised_and_cleared() {
    let (mut rx, mut hal) = setup();
    hal.advance(500);
    rx.ingest(&mut hal);
    assert!(rx.link_faults().is_empty());

    hal.advance(1);
    rx.ingest(&mut hal);
    assert!(rx.link_faults().contains(LinkFaults::LINK_TIMEOUT));

    hal.send_line("RC#10,-5,1200,0*10");
    assert!(rx.ingest(&mut hal));
    assert!(rx.link_faults().is_empty());
    assert_eq!(rx.command(), CommandVector::new(10, -5, 1200, 0));
}

#[test]
fn freshness_reports_per_path_age() {
    let (mut rx, mut hal) = setup();
    hal.advance(30);
    hal.send_line("GYR#0*60");
    rx.ingest(&mut hal);
    assert_eq!(rx.freshness(100), [100, 70, 100]);
}

// ── PPM ───────────────────────────────────────────────────────────────────────

fn ppm_setup() -> (Receiver, SimHal) {
    let mut config = config();
    config.ingest.ppm_enabled = true;
    (Receiver::new(&config, 0), SimHal::new())
}

#[test]
fn ppm_maps_and_smooths() {
    let (mut rx, mut hal) = ppm_setup();
    hal.ppm = Some([1500, 1500, 1500, 1500]);
    assert!(rx.ingest(&mut hal));
    assert_eq!(rx.command(), CommandVector::new(0, 0, 1450, 0));

    hal.ppm = Some([1900, 1100, 1900, 1500]);
    assert!(rx.ingest(&mut hal));
    assert_eq!(rx.command(), CommandVector::new(27, -27, 1900, 0));
    assert_eq!(rx.stats().ppm_frames, 2);
    assert_eq!(rx.link(LinkPath::Ppm).last_valid_ms, 0);
}

#[test]
fn ppm_glitch_falls_through_to_primary() {
    let (mut rx, mut hal) = ppm_setup();
    hal.ppm = Some([1500, 1500, 500, 1500]);
    hal.send_line("RC#10,-5,1200,0*10");

    assert!(rx.ingest(&mut hal));
    assert_eq!(rx.command(), CommandVector::new(10, -5, 1200, 0));
    assert_eq!(rx.stats().range_errors, 1);
}

#[test]
fn primary_commands_apply_while_ppm_is_live() {
    let (mut rx, mut hal) = ppm_setup();
    for _ in 0..5 {
        hal.advance(10);
        hal.ppm = Some([1500, 1500, 1500, 1500]);
        hal.send_line("BAT#4*68");
        hal.send_line("RC#10,-5,1200,0*10");
        assert!(rx.ingest(&mut hal));
    }
    assert_eq!(hal.battery, Some(BatterySensor::AnalogVoltageCurrent));
    assert!(hal.primary.is_empty());
    // PPM keeps the sticks
    assert_eq!(rx.command(), CommandVector::new(0, 0, 1450, 0));
    assert_eq!(rx.stats().text_frames, 10);
    assert_eq!(rx.link(LinkPath::Primary).last_valid_ms, 50);
}

#[test]
fn ppm_restores_full_rate_after_fallback() {
    let (mut rx, mut hal) = ppm_setup();
    hal.advance(300);
    hal.send_fallback(&FALLBACK_FRAME);
    assert!(rx.ingest(&mut hal));
    assert_eq!(rx.loop_period_ms(), FALLBACK_PERIOD_MS);

    hal.advance(20);
    hal.ppm = Some([1500, 1500, 1500, 1500]);
    assert!(rx.ingest(&mut hal));
    assert_eq!(hal.periods, vec![FALLBACK_PERIOD_MS, MAIN_PERIOD_MS]);
}
