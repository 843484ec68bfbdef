#![no_std]
#![no_main]

mod board;
mod tasks;
mod usb;

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, AtomicU8};

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::pipe::Pipe;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use copter_fc::config::{Config, MAIN_PERIOD_MS};
use copter_fc::pid::PidTable;
use copter_fc::state::DriftCorrection;
use copter_fc::telemetry::TelemetryRecord;
use copter_fc::ControlLoop;

use crate::board::Board;
use crate::tasks::control_task::{control_task, BoardHal, SensorCell, SensorReport};
use crate::tasks::telemetry_task::telemetry_task;
use crate::tasks::uplink_task::{
    fallback_uplink_task, primary_uplink_task, UplinkPipe, FALLBACK_PIPE_LEN, PRIMARY_PIPE_LEN,
};

// ── Uplink bytes (reader tasks → control loop) ────────────────────────────────
pub static PRIMARY_PIPE: UplinkPipe<PRIMARY_PIPE_LEN> = Pipe::new();
pub static FALLBACK_PIPE: UplinkPipe<FALLBACK_PIPE_LEN> = Pipe::new();

// ── Shared with the estimator / controller side ──────────────────────────────
/// Latest decoded PPM frame, µs in roll, pitch, throttle, yaw order.
pub static PPM_FRAME: Signal<CriticalSectionRawMutex, [u16; 4]> = Signal::new();
pub static SENSORS: SensorCell = Mutex::new(Cell::new(SensorReport::NONE));
/// Gain table last accepted from the uplink, read by the rate controllers.
pub static PID_GAINS: Mutex<CriticalSectionRawMutex, Cell<PidTable>> = Mutex::new(Cell::new(PidTable::ZERO));
pub static DRIFT_CORRECTION: Mutex<CriticalSectionRawMutex, Cell<DriftCorrection>> =
    Mutex::new(Cell::new(DriftCorrection { roll: 0.0, pitch: 0.0 }));
pub static BATTERY_SENSOR: AtomicU8 = AtomicU8::new(0);
pub static ACCEL_CALIBRATION: Signal<CriticalSectionRawMutex, ()> = Signal::new();
pub static LOOP_PERIOD_MS: AtomicU32 = AtomicU32::new(MAIN_PERIOD_MS);

// ── Inter-task channels ───────────────────────────────────────────────────────
//  Cap=1: telemetry only cares about the most recent record.
static TELEMETRY_CHAN: Channel<CriticalSectionRawMutex, TelemetryRecord, 1> = Channel::new();
static PID_CHAN: Channel<CriticalSectionRawMutex, PidTable, 1> = Channel::new();

// ── Main ──────────────────────────────────────────────────────────────────────
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // 1. Clocks, uplink UARTs, LED
    let Ok(board) = Board::init() else {
        defmt::panic!("uplink UART configuration rejected");
    };
    let Board { primary, fallback, usb: usb_pins, mut led } = board;

    // 2. USB CDC-ACM telemetry
    let (usb_dev, usb_serial) = usb::init(usb_pins);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();

    // 3. Uplink readers. TX halves stay idle.
    let (_primary_tx, primary_rx) = primary.split();
    let (_fallback_tx, fallback_rx) = fallback.split();
    spawner.spawn(primary_uplink_task(primary_rx, &PRIMARY_PIPE)).unwrap();
    spawner.spawn(fallback_uplink_task(fallback_rx, &FALLBACK_PIPE)).unwrap();

    // 4. Control loop
    let config = Config::default();
    defmt::info!(
        "copter-fc: ppm={} fallback={} bench={} period={}ms",
        config.ingest.ppm_enabled,
        config.ingest.fallback_enabled,
        config.ingest.bench_override,
        config.ingest.main_period_ms
    );
    let fc = ControlLoop::new(BoardHal::new(PID_CHAN.sender()), &config);
    spawner.spawn(control_task(fc, TELEMETRY_CHAN.sender())).unwrap();

    spawner.spawn(telemetry_task(
        usb_serial,
        TELEMETRY_CHAN.receiver(),
        PID_CHAN.receiver(),
    )).unwrap();

    // 5. Main task: LED heartbeat @ 1 Hz
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
