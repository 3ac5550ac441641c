//! l4bsp - STM32L4R9I-EVAL bring-up firmware
//!
//! Brings up every on-board device through the l4bsp drivers and runs a
//! short self test on each, logging over RTT. A failing step lights the
//! status LED and parks the MCU; when everything passes the LED blinks.

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::exti::{self, ExtiInput};
use embassy_stm32::flash::Flash;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::ospi::{self, MemorySize, MemoryType, Ospi};
use embassy_stm32::rng::{self, Rng};
use embassy_stm32::sdmmc::{self, Sdmmc};
use embassy_stm32::time::Hertz;
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::NoopMutex;
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use l4bsp_core::config::TouchCalibration;
use l4bsp_core::{BspError, BspResult};
use l4bsp_hal::crc::CrcConfig;
use l4bsp_hal::gpio::{ActiveLevel, Led};
use l4bsp_hal_stm32l4::{L4Crc, L4Ospi, L4Output, L4PageFlash, L4Rng, L4SdHost};

use crate::board::BOARD;
use crate::selftest::SharedI2c;

mod board;
mod calibration;
mod selftest;

bind_interrupts!(struct Irqs {
    RNG => rng::InterruptHandler<peripherals::RNG>;
    SDMMC1 => sdmmc::InterruptHandler<peripherals::SDMMC1>;
    EXTI1 => exti::InterruptHandler<embassy_stm32::interrupt::typelevel::EXTI1>;
});

// Board I2C bus (must live forever for the device handles)
static I2C_BUS: StaticCell<SharedI2c> = StaticCell::new();

type StatusLed = Led<L4Output<'static>>;

/// Light the LED and stop
fn error_handler(led: &mut StatusLed) -> ! {
    led.on();
    loop {
        cortex_m::asm::wfi();
    }
}

/// MFX IRQ_OUT (active low) raises the IDD completion flag
#[embassy_executor::task]
async fn mfx_irq_task(mut irq: ExtiInput<'static>) {
    loop {
        irq.wait_for_falling_edge().await;
        selftest::IDD_DONE.signal();
    }
}

/// Log the outcome of a step, parking on failure
fn check<T>(step: &str, result: BspResult<T>, led: &mut StatusLed) -> T {
    match result {
        Ok(value) => {
            info!("{=str}: OK", step);
            value
        }
        Err(e) => {
            error!("{=str} failed: {:?}", step, e);
            error_handler(led)
        }
    }
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("l4bsp self test starting...");

    let mut config = embassy_stm32::Config::default();
    {
        use embassy_stm32::rcc::*;
        // RNG and SDMMC kernel clock
        config.rcc.hsi48 = Some(Hsi48Config {
            sync_from_usb: false,
        });
        config.rcc.mux.clk48sel = mux::Clk48sel::HSI48;
    }
    let p = embassy_stm32::init(config);
    info!("Peripherals initialized");

    let mut led: StatusLed = Led::new(
        L4Output::new(Output::new(p.PH4, Level::Low, Speed::Low)),
        ActiveLevel::High,
    );

    if let Err(e) = BOARD.validate() {
        error!("Board config invalid: {:?}", e);
        error_handler(&mut led);
    }

    // FMC pins are claimed through the PAC before anything else
    let sram_memory = board::init_sram();

    // Crypto blocks first: the RNG seeds the flash test stamp
    let mut crc = check(
        "CRC init",
        L4Crc::new(p.CRC, CrcConfig::crc32_ieee()).map_err(|_| BspError::InvalidParameter),
        &mut led,
    );
    check("CRC", selftest::crc_unit(&mut crc), &mut led);

    let rng = L4Rng::new(Rng::new(p.RNG, Irqs));
    let stamp = check("RNG + RSA", selftest::rng_and_rsa(rng), &mut led);

    // Internal flash: scratch page rewrite, then the calibration store
    let layout = BOARD.flash;
    let page_flash = check(
        "Flash window",
        L4PageFlash::new(
            Flash::new_blocking(p.FLASH),
            layout.user_page * layout.page_size,
            layout.page_size as usize,
            1,
        )
        .map_err(Into::into),
        &mut led,
    );
    let page_flash = check("Flash page", selftest::page_rewrite(page_flash, stamp), &mut led);

    let mut storage = page_flash.into_storage(layout.storage_range());
    let calibration = match calibration::load_calibration(&mut storage).await {
        Some(cal) => cal,
        None => {
            let cal = TouchCalibration::identity(BOARD.touch.width, BOARD.touch.height);
            if let Err(e) = calibration::save_calibration(&mut storage, &cal).await {
                warn!("Could not store default calibration: {:?}", e);
            }
            cal
        }
    };

    // I2C devices
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = Hertz(BOARD.i2c.frequency);
    i2c_config.timeout = Duration::from_millis(100);
    let i2c = I2c::new_blocking(p.I2C1, p.PG14, p.PG13, i2c_config);
    let bus = I2C_BUS.init(NoopMutex::new(RefCell::new(i2c)));

    // MFX IRQ_OUT on PA1
    let mfx_irq = ExtiInput::new(p.PA1, p.EXTI1, Pull::None, Irqs);
    spawner.spawn(mfx_irq_task(mfx_irq)).unwrap();

    check("EEPROM", selftest::eeprom(bus), &mut led);
    check("NFC tag", selftest::nfc(bus), &mut led);
    let mut mfx = check("MFX", selftest::mfx(bus), &mut led);
    check("IDD", selftest::idd(&mut mfx).await, &mut led);
    check("Touch", selftest::touch(bus, Some(calibration)), &mut led);

    // SD card behind the MFX detect pin
    let sdmmc = Sdmmc::new_4bit(
        p.SDMMC1,
        Irqs,
        p.PC12,
        p.PD2,
        p.PC8,
        p.PC9,
        p.PC10,
        p.PC11,
        Default::default(),
    );
    check("SD", selftest::sd(&mut mfx, L4SdHost::new(sdmmc)), &mut led);

    // OctoSPI NOR flash and PSRAM
    let nor_config = ospi::Config {
        memory_type: MemoryType::Macronix,
        device_size: MemorySize::_64MiB,
        clock_prescaler: 2,
        ..Default::default()
    };
    let nor = Ospi::new_blocking_octospi(
        p.OCTOSPI1, p.PA3, p.PB1, p.PB0, p.PA7, p.PA6, p.PC1, p.PC2, p.PC3, p.PC4, p.PA4,
        nor_config,
    );
    check("NOR flash", selftest::nor(L4Ospi::new(nor)), &mut led);

    let psram_config = ospi::Config {
        memory_type: MemoryType::ApMemory,
        device_size: MemorySize::_8MiB,
        clock_prescaler: 2,
        ..Default::default()
    };
    let psram = Ospi::new_blocking_octospi(
        p.OCTOSPI2, p.PI6, p.PI11, p.PI10, p.PI9, p.PH8, p.PH9, p.PH10, p.PG9, p.PG10, p.PI5,
        psram_config,
    );
    check("PSRAM", selftest::psram(L4Ospi::new(psram)), &mut led);

    check("SRAM", selftest::sram(sram_memory), &mut led);

    info!("All self tests passed");
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
