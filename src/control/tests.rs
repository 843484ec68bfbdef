use super::*;
use crate::faults::{DeviceFaults, LinkFaults};
use crate::protocol::binary::SENTINEL;
use crate::testing::SimHal;

fn config() -> Config {
    let mut config = Config::default();
    config.ingest.ppm_enabled = false;
    config.ingest.bench_override = false;
    config
}

fn control() -> ControlLoop<SimHal> {
    ControlLoop::new(SimHal::new(), &config())
}

#[test]
fn constant_input_gives_constant_output() {
    let mut fc = control();
    let mut records = Vec::new();
    for _ in 0..10 {
        fc.hal_mut().send_line("RC#10,-5,1200,0*10");
        fc.hal_mut().advance(10);
        records.push(fc.tick());
    }
    assert!(records.windows(2).all(|w| w[0].command == w[1].command && w[0].state == w[1].state));
    assert_eq!(fc.output().command, CommandVector::new(10, -5, 1200, 0));
    assert_eq!(fc.ticks(), 10);
}

#[test]
fn valid_rc_ends_a_link_descent() {
    let mut fc = control();
    fc.hal_mut().advance(600);
    let rec = fc.tick();
    assert_eq!(rec.state, GovernorState::LinkFaultDescent);
    assert_eq!(rec.link, LinkFaults::LINK_TIMEOUT.bits());
    assert_eq!(rec.authority, Authority::Governor);

    fc.hal_mut().advance(20);
    fc.hal_mut().send_line("RC#10,-5,1200,0*10");
    let rec = fc.tick();
    assert_eq!(rec.link, 0);
    assert_eq!(rec.state, GovernorState::Normal);
    assert_eq!(rec.authority, Authority::Pilot);
    assert_eq!(rec.command, CommandVector::new(10, -5, 1200, 0));
}

#[test]
fn corrupted_fallback_frame_keeps_last_command() {
    let mut fc = control();
    fc.hal_mut().send_line("RC#10,-5,1200,0*10");
    fc.tick();

    fc.hal_mut().advance(300);
    fc.hal_mut().send_fallback(&[3, 0, 130, 123, 126, 20, 217, SENTINEL]);
    let rec = fc.tick();
    assert_eq!(rec.command, CommandVector::new(10, -5, 1200, 0));
    assert_eq!(rec.stats.checksum_errors, 1);
    assert_eq!(fc.loop_period_ms(), crate::config::FALLBACK_PERIOD_MS);
}

#[test]
fn governor_releases_on_the_first_clear_tick() {
    let mut fc = control();
    fc.hal_mut().altitude = Some(2.0);
    fc.hal_mut().send_line("RC#0,0,1500,0*70");
    fc.tick();
    fc.hal_mut().faults = DeviceFaults::ACCELEROMETER;

    let mut throttles = Vec::new();
    for _ in 0..5 {
        fc.hal_mut().advance(50);
        fc.hal_mut().send_line("RC#0,0,1500,0*70");
        let rec = fc.tick();
        assert_eq!(rec.authority, Authority::Governor);
        throttles.push(rec.command.throttle());
    }
    assert_eq!(throttles[0], 1500);
    assert!(throttles.windows(2).all(|w| w[1] < w[0]), "{throttles:?}");

    fc.hal_mut().faults = DeviceFaults::empty();
    fc.hal_mut().advance(50);
    fc.hal_mut().send_line("RC#10,-5,1200,0*10");
    let rec = fc.tick();
    assert_eq!(rec.authority, Authority::Pilot);
    assert_eq!(rec.command, CommandVector::new(10, -5, 1200, 0));
    assert_eq!(fc.governor().descent_elapsed_ms(fc.hal().now_ms), None);
}

#[test]
fn record_carries_fault_bits_and_ages() {
    let mut fc = control();
    fc.hal_mut().faults = DeviceFaults::COMPASS;
    fc.hal_mut().advance(40);
    let rec = fc.tick();
    assert_eq!(rec.tick_ms, 40);
    assert_eq!(rec.device, DeviceFaults::COMPASS.bits());
    assert_eq!(rec.state, GovernorState::Normal);
    assert_eq!(rec.ages_ms, [40, 40, 40]);
    assert!(rec.has_fault());
}

#[test]
fn idle_only_commands_refused_while_governor_flies() {
    let pid = "PID#1,1,1,1;1,1,1,1;1,1,1,1;1,1,1,1;1,1,1,1;1,1,1,1,1*FA";
    let mut fc = control();
    fc.hal_mut().altitude = Some(5.0);
    fc.hal_mut().send_line("RC#0,0,1500,0*70");
    fc.tick();

    fc.hal_mut().faults = DeviceFaults::GYROMETER;
    fc.hal_mut().advance(10);
    assert_eq!(fc.tick().authority, Authority::Governor);

    // a pilot idle frame must not unlock calibration while the motors spin
    fc.hal_mut().advance(10);
    fc.hal_mut().send_line("RC#0,0,1000,0*D0");
    fc.hal_mut().send_line("GYR#1*62");
    fc.hal_mut().send_line(pid);
    let rec = fc.tick();

    assert!(rec.command.throttle() > crate::config::THR_MIN);
    assert_eq!(fc.hal().calibrations, 0);
    assert_eq!(fc.hal().pid, None);
    assert_eq!(rec.stats.rejected, 2);
}
