use embassy_executor::task;
use embassy_stm32::peripherals::{DMA1_CH1, DMA1_CH2, UART4, USART3};
use embassy_stm32::usart::{BasicInstance, RxDma, UartRx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_time::{Duration, Timer};
use embassy_futures::select::{select, Either};

/// Several text lines per control tick.
pub const PRIMARY_PIPE_LEN: usize = 512;
/// A handful of 8-byte binary frames.
pub const FALLBACK_PIPE_LEN: usize = 128;

/// Quiet time after which a reader reports its link as silent.
const SILENCE_MS: u64 = 1000;

pub type UplinkPipe<const N: usize> = Pipe<CriticalSectionRawMutex, N>;

/// Moves received bytes into `pipe` for the control loop to poll. Bytes that
/// do not fit are dropped; the framers resynchronise on the next newline or
/// sentinel.
async fn pump<T: BasicInstance, D: RxDma<T>, const N: usize>(
    rx: &mut UartRx<'static, T, D>,
    pipe: &'static UplinkPipe<N>,
    name: &'static str,
) -> ! {
    let mut buf = [0u8; 32];
    let mut dropped: u32 = 0;
    let mut silent = false;
    loop {
        match select(rx.read_until_idle(&mut buf), Timer::after(Duration::from_millis(SILENCE_MS))).await {
            Either::First(Ok(n)) => {
                if silent {
                    defmt::info!("{} uplink receiving", name);
                    silent = false;
                }
                let written = pipe.try_write(&buf[..n]).unwrap_or(0);
                if written < n {
                    dropped = dropped.wrapping_add((n - written) as u32);
                    defmt::warn!("{} uplink overrun, {} bytes dropped so far", name, dropped);
                }
            }
            Either::First(Err(e)) => defmt::warn!("{} uplink: {}", name, defmt::Debug2Format(&e)),
            Either::Second(_) => {
                if !silent {
                    defmt::info!("{} uplink silent", name);
                    silent = true;
                }
            }
        }
    }
}

/// Text uplink reader (USART3).
#[task]
pub async fn primary_uplink_task(
    mut rx: UartRx<'static, USART3, DMA1_CH1>,
    pipe: &'static UplinkPipe<PRIMARY_PIPE_LEN>,
) {
    pump(&mut rx, pipe, "primary").await
}

/// Binary radio reader (UART4).
#[task]
pub async fn fallback_uplink_task(
    mut rx: UartRx<'static, UART4, DMA1_CH2>,
    pipe: &'static UplinkPipe<FALLBACK_PIPE_LEN>,
) {
    pump(&mut rx, pipe, "fallback").await
}
