//! STM32L4R9I-EVAL wiring
//!
//! The board description comes from `board.toml` via the build script.
//! Pin assignments that embassy takes by peripheral type live in `main`;
//! the FMC SRAM bank has no embassy driver and is set up here.

use embassy_stm32::pac;
use embassy_stm32::pac::fmc::vals::{Mtyp, Mwid};
use embassy_stm32::pac::gpio::vals::{Moder, Ospeedr};
use embassy_stm32::pac::gpio::Gpio;

use l4bsp_core::config::*;
use l4bsp_hal_stm32l4::memory::{FmcMemory, FMC_BANK1_NE1};

include!(concat!(env!("OUT_DIR"), "/board_config.rs"));

/// Alternate function of the FMC signals
const FMC_AF: u8 = 12;

/// FMC pins for the 16-bit SRAM: A0-A19, D0-D15, NOE, NWE, NE1, NBL0-1
const SRAM_PINS: [(Gpio, &[usize]); 4] = [
    (pac::GPIOD, &[0, 1, 4, 5, 7, 8, 9, 10, 11, 12, 13, 14, 15]),
    (pac::GPIOE, &[0, 1, 3, 7, 8, 9, 10, 11, 12, 13, 14, 15]),
    (pac::GPIOF, &[0, 1, 2, 3, 4, 5, 12, 13, 14, 15]),
    (pac::GPIOG, &[0, 1, 2, 3, 4, 5]),
];

/// SRAM timing at 120 MHz HCLK, in HCLK cycles
const SRAM_ADDRESS_SETUP: u8 = 2;
const SRAM_DATA_SETUP: u8 = 3;
const SRAM_BUS_TURNAROUND: u8 = 1;

/// Configure FMC bank 1 / NE1 for the IS61WV102416 SRAM and map it
///
/// Must run once, before anything else claims ports D-G pins listed in
/// [`SRAM_PINS`].
pub fn init_sram() -> FmcMemory {
    pac::RCC.ahb2enr().modify(|w| {
        w.set_gpioden(true);
        w.set_gpioeen(true);
        w.set_gpiofen(true);
        w.set_gpiogen(true);
    });
    pac::RCC.ahb3enr().modify(|w| w.set_fmcen(true));

    for (port, pins) in SRAM_PINS {
        for &pin in pins {
            port.afr(pin / 8).modify(|w| w.set_afr(pin % 8, FMC_AF));
            port.ospeedr().modify(|w| w.set_ospeedr(pin, Ospeedr::VERY_HIGH_SPEED));
            port.moder().modify(|w| w.set_moder(pin, Moder::ALTERNATE));
        }
    }

    pac::FMC.btr(0).write(|w| {
        w.set_addset(SRAM_ADDRESS_SETUP);
        w.set_datast(SRAM_DATA_SETUP);
        w.set_busturn(SRAM_BUS_TURNAROUND);
    });
    pac::FMC.bcr1().modify(|w| {
        w.set_muxen(false);
        w.set_mtyp(Mtyp::SRAM);
        w.set_mwid(Mwid::BITS16);
        w.set_wren(true);
        w.set_mbken(true);
    });

    // SAFETY: bank 1 / NE1 was configured above and is only accessed
    // through this window
    unsafe { FmcMemory::new(FMC_BANK1_NE1, BOARD.memory.sram_size as usize) }
}
