use embassy_stm32::usb_otg::{self, Driver};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

use crate::board::UsbPins;

bind_interrupts!(pub struct Irqs {
    OTG_FS => usb_otg::InterruptHandler<peripherals::USB_OTG_FS>;
});

pub type UsbDriver = Driver<'static, peripherals::USB_OTG_FS>;
pub type UsbSerial<'a> = CdcAcmClass<'a, UsbDriver>;

/// Full-speed bulk packet size.
pub const MAX_PACKET: usize = 64;

struct UsbBuffers {
    config_desc: [u8; 256],
    bos_desc: [u8; 256],
    control_buf: [u8; 64],
    ep_out: [u8; 256],
}

static BUFFERS: StaticCell<UsbBuffers> = StaticCell::new();
static CDC_STATE: StaticCell<State<'static>> = StaticCell::new();

#[embassy_executor::task]
pub async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    device.run().await
}

/// Brings up the OTG_FS peripheral as a single CDC-ACM port. Call once.
pub fn init(pins: UsbPins) -> (UsbDevice<'static, UsbDriver>, UsbSerial<'static>) {
    let UsbBuffers { config_desc, bos_desc, control_buf, ep_out } = BUFFERS.init(UsbBuffers {
        config_desc: [0; 256],
        bos_desc: [0; 256],
        control_buf: [0; 64],
        ep_out: [0; 256],
    });

    let mut usb_config = usb_otg::Config::default();
    usb_config.vbus_detection = false;
    let driver = Driver::new_fs(pins.otg, Irqs, pins.dp, pins.dm, ep_out, usb_config);

    let mut config = Config::new(0xc0de, 0xcafe);
    config.manufacturer = Some("copter-fc");
    config.product = Some("copter-fc telemetry");
    config.serial_number = Some("00000001");

    let mut builder = Builder::new(driver, config, config_desc, bos_desc, &mut [], control_buf);
    let class = CdcAcmClass::new(&mut builder, CDC_STATE.init(State::new()), MAX_PACKET as u16);
    (builder.build(), class)
}

/// Writes `bytes` as a sequence of bulk packets. Stops at the first error
/// (host gone).
pub async fn write_all(serial: &mut UsbSerial<'static>, bytes: &[u8]) {
    for chunk in bytes.chunks(MAX_PACKET) {
        if serial.write_packet(chunk).await.is_err() {
            return;
        }
    }
}
