use embassy_stm32::gpio::{AnyPin, Level, Output, Pin, Speed};
use embassy_stm32::peripherals::{DMA1_CH1, DMA1_CH2, DMA1_CH3, DMA1_CH4, PA11, PA12, UART4, USART3, USB_OTG_FS};
use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::usart::{self, Config as UsartConfig, Uart};
use embassy_stm32::{bind_interrupts, peripherals, Config};

/// Text uplink (companion computer / Wi-Fi bridge).
const PRIMARY_BAUD: u32 = 115_200;
/// Binary telemetry radio.
const FALLBACK_BAUD: u32 = 57_600;

bind_interrupts!(struct Irqs {
    UART4  => usart::InterruptHandler<peripherals::UART4>;
    USART3 => usart::InterruptHandler<peripherals::USART3>;
});

pub type PrimaryUart = Uart<'static, USART3, DMA1_CH3, DMA1_CH1>;
pub type FallbackUart = Uart<'static, UART4, DMA1_CH4, DMA1_CH2>;

pub struct UsbPins {
    pub otg: USB_OTG_FS,
    pub dp: PA12,
    pub dm: PA11,
}

pub struct Board {
    /// USART3, RX=PB11 TX=PB10.
    pub primary: PrimaryUart,
    /// UART4, RX=PA1 TX=PA0.
    pub fallback: FallbackUart,
    pub usb: UsbPins,
    pub led: Output<'static, AnyPin>,
}

impl Board {
    pub fn init() -> Result<Self, usart::ConfigError> {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: TimeHertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL168,
            divp: Some(PllPDiv::DIV2), // 168 MHz
            divq: Some(PllQDiv::DIV7), // 48 MHz USB
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;

        let p = embassy_stm32::init(config);

        let mut primary_config = UsartConfig::default();
        primary_config.baudrate = PRIMARY_BAUD;
        let primary = Uart::new(p.USART3, p.PB11, p.PB10, Irqs, p.DMA1_CH3, p.DMA1_CH1, primary_config)?;

        let mut fallback_config = UsartConfig::default();
        fallback_config.baudrate = FALLBACK_BAUD;
        let fallback = Uart::new(p.UART4, p.PA1, p.PA0, Irqs, p.DMA1_CH4, p.DMA1_CH2, fallback_config)?;

        Ok(Self {
            primary,
            fallback,
            usb: UsbPins { otg: p.USB_OTG_FS, dp: p.PA12, dm: p.PA11 },
            led: Output::new(p.PC13.degrade(), Level::High, Speed::Low),
        })
    }
}
