//! Board self test
//!
//! One function per on-board device. Each exercises the driver end to end
//! and logs what it found; the first failing step stops bring-up.

use core::cell::RefCell;

use defmt::*;
use embassy_embedded_hal::shared_bus::blocking::i2c::I2cDevice;
use embassy_stm32::i2c::{I2c, Master};
use embassy_stm32::mode::Blocking;
use embassy_stm32::peripherals::{OCTOSPI1, OCTOSPI2, RNG, SDMMC1};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::NoopMutex;
use embassy_time::{with_timeout, Delay, Duration, Timer};
use embedded_sdmmc::VolumeManager;

use l4bsp_core::config::{SdDetect, TouchCalibration};
use l4bsp_core::traits::eeprom::Eeprom;
use l4bsp_core::traits::io_expander::IoExpander;
use l4bsp_core::{BspError, BspResult};
use l4bsp_drivers::crypto::{crc, Pka, RandomGenerator, SoftwarePka};
use l4bsp_drivers::eeprom::M24lr64;
use l4bsp_drivers::flash_page::PageWriter;
use l4bsp_drivers::io::{IddConfig, Mfx};
use l4bsp_drivers::irq::IrqFlag;
use l4bsp_drivers::nfc_tag::NfcTag;
use l4bsp_drivers::ospi::{Aps6408, Interface, Mx25lm51245g};
use l4bsp_drivers::sd::fat::{write_then_verify, FixedTimeSource};
use l4bsp_drivers::sd::{DetectFn, SdBlockDevice, SdCard};
use l4bsp_drivers::sram::ExternalSram;
use l4bsp_drivers::touch::{Ft3x67, TouchScreen};
use l4bsp_hal::crc::SoftwareCrc;
use l4bsp_hal::flash::PageFlash;
use l4bsp_hal_stm32l4::{EhI2c, FmcMemory, L4Crc, L4Ospi, L4Rng, L4SdHost};
use l4bsp_ndef::{MessageReader, NdefError, Record, Uri};

use crate::board::BOARD;

/// The board I2C bus, shared by the EEPROM, MFX and touch controller
pub type SharedI2c = NoopMutex<RefCell<I2c<'static, Blocking, Master>>>;

/// One device's handle onto the shared bus
pub type BoardI2c = EhI2c<I2cDevice<'static, NoopRawMutex, I2c<'static, Blocking, Master>>>;

pub fn board_i2c(bus: &'static SharedI2c) -> BoardI2c {
    EhI2c::new(I2cDevice::new(bus))
}

/// Signalled from the MFX IRQ_OUT line
pub static IDD_DONE: IrqFlag = IrqFlag::new();

/// User EEPROM area clear of the NFC tag data
const EEPROM_TEST_OFFSET: u16 = 0x1F00;
const NFC_URI: &str = "http://www.st.com";
const IDD_TIMEOUT_MS: u64 = 5_000;
const SD_TEST_FILE: &str = "STM32.TXT";
const SRAM_TEST_LEN: usize = 64 * 1024;

fn pattern<const N: usize>(seed: u8) -> [u8; N] {
    core::array::from_fn(|i| (i as u8).wrapping_mul(31) ^ seed)
}

fn ndef(e: NdefError) -> BspError {
    error!("NDEF: {:?}", e);
    BspError::Error
}

fn expect_equal(what: &str, expected: &[u8], read: &[u8]) -> BspResult<()> {
    match expected.iter().zip(read).position(|(a, b)| a != b) {
        Some(offset) => {
            error!("{}: mismatch at byte {}", what, offset);
            Err(BspError::Error)
        }
        None => Ok(()),
    }
}

/// M24LR64 user memory write and read back
pub fn eeprom(bus: &'static SharedI2c) -> BspResult<()> {
    let mut eeprom = M24lr64::new(board_i2c(bus), BOARD.i2c.eeprom)
        .with_system_address(BOARD.i2c.eeprom_system);
    if !eeprom.is_ready() {
        return Err(BspError::NotPresent);
    }
    info!("EEPROM UID {=u64:016x}", eeprom.uid()?);

    let data: [u8; 48] = pattern(0xA5);
    Eeprom::write(&mut eeprom, EEPROM_TEST_OFFSET, &data)?;
    let mut read = [0u8; 48];
    Eeprom::read(&mut eeprom, EEPROM_TEST_OFFSET, &mut read)?;
    expect_equal("EEPROM", &data, &read)
}

/// Store a URI as an NDEF message and read it back as a phone would
pub fn nfc(bus: &'static SharedI2c) -> BspResult<()> {
    let eeprom = M24lr64::new(board_i2c(bus), BOARD.i2c.eeprom)
        .with_system_address(BOARD.i2c.eeprom_system);
    let mut tag = NfcTag::new(eeprom);

    let mut payload = [0u8; 64];
    let n = Uri::new(NFC_URI)
        .and_then(|uri| uri.encode_payload(&mut payload))
        .map_err(ndef)?;
    tag.write_records(&[Record::well_known(b"U", &payload[..n])])?;

    let mut message = [0u8; 128];
    let len = tag.read_message(&mut message)?;
    let record = MessageReader::new(&message[..len])
        .next()
        .ok_or(BspError::Error)?
        .map_err(ndef)?;
    let uri = Uri::from_record(&record).map_err(ndef)?;
    info!("NFC tag holds {=str}", uri.as_str());
    if uri.as_str() != NFC_URI {
        return Err(BspError::Error);
    }
    Ok(())
}

/// Reset and identify the MFX
pub fn mfx(bus: &'static SharedI2c) -> BspResult<Mfx<BoardI2c>> {
    let mut mfx = Mfx::new(board_i2c(bus), BOARD.i2c.io_expander);
    mfx.reset(&mut Delay)?;
    mfx.init()?;
    let version = mfx.firmware_version()?;
    info!(
        "MFX id 0x{:02x}, firmware {}.{}",
        mfx.chip_id()?,
        version >> 8,
        version & 0xFF
    );
    Ok(mfx)
}

/// One IDD measurement, completed by the MFX IRQ_OUT edge
pub async fn idd(mfx: &mut Mfx<BoardI2c>) -> BspResult<u32> {
    mfx.idd_configure(&IddConfig::from_settings(&BOARD.idd))?;
    IDD_DONE.clear();
    mfx.idd_start()?;

    let edge = async {
        while !IDD_DONE.is_set() {
            Timer::after(Duration::from_millis(1)).await;
        }
    };
    if with_timeout(Duration::from_millis(IDD_TIMEOUT_MS), edge).await.is_err() {
        warn!("IDD: no IRQ_OUT edge, checking the MFX pending register");
    }
    let na = mfx.idd_wait(&IDD_DONE, &mut Delay, 0)?;
    info!(
        "IDD {} uA (shunt {})",
        na / 1000,
        mfx.idd_shunt_used()?
    );
    Ok(na)
}

/// Touch controller presence and one state read
pub fn touch(bus: &'static SharedI2c, calibration: Option<TouchCalibration>) -> BspResult<()> {
    let mut controller = Ft3x67::new(board_i2c(bus), BOARD.i2c.touch);
    controller.init()?;
    info!("Touch firmware id 0x{:02x}", controller.firmware_id()?);

    let mut screen = TouchScreen::new(controller, BOARD.touch);
    screen.init()?;
    screen.set_calibration(calibration);
    let state = screen.get_state()?;
    for point in state.touches() {
        info!("Touch at ({}, {})", point.x, point.y);
    }
    Ok(())
}

/// Mount the first FAT volume and write then verify a file
pub fn sd(mfx: &mut Mfx<BoardI2c>, host: L4SdHost<'static, SDMMC1>) -> BspResult<()> {
    let detect = DetectFn(|| match BOARD.sd_detect {
        // Detect switch pulls low when a card is inserted
        SdDetect::Expander(pin) => {
            let mask = 1u32 << pin;
            mfx.read_pins(mask).map(|level| level & mask == 0).unwrap_or(false)
        }
        SdDetect::Pin(_) | SdDetect::None => true,
    });

    let mut card = SdCard::new(host, detect);
    let info = card.init()?;
    info!(
        "SD card: {} blocks of {} bytes",
        info.logical_block_count, info.logical_block_size
    );

    let volume_mgr: VolumeManager<_, _, 4, 4, 1> =
        VolumeManager::new_with_limits(SdBlockDevice::new(card), FixedTimeSource, 0);
    let data: [u8; 1024] = pattern(0x3C);
    let mut scratch = [0u8; 512];
    let n = write_then_verify(&volume_mgr, SD_TEST_FILE, &data, &mut scratch)?;
    info!("SD: {} bytes verified in {=str}", n, SD_TEST_FILE);
    Ok(())
}

/// Switch the NOR flash to octal mode, then erase, program and read its
/// last sector
pub fn nor(ospi: L4Ospi<'static, OCTOSPI1>) -> BspResult<()> {
    use l4bsp_drivers::ospi::mx25lm51245g::SECTOR_SIZE;

    let mut nor = Mx25lm51245g::new(ospi);
    nor.reset()?;
    nor.check_id()?;
    let mode = if BOARD.memory.nor_dtr {
        Interface::OctalDtr
    } else {
        Interface::OctalStr
    };
    nor.enter_octal(mode)?;
    info!("NOR in {} mode", mode);

    let addr = BOARD.memory.nor_size - SECTOR_SIZE;
    nor.erase_sector(addr)?;
    let data: [u8; 600] = pattern(0x69);
    nor.write(addr, &data)?;
    let mut read = [0u8; 600];
    nor.read(addr, &mut read)?;
    expect_equal("NOR", &data, &read)
}

/// Program the PSRAM latency and check a row-crossing transfer
pub fn psram(ospi: L4Ospi<'static, OCTOSPI2>) -> BspResult<()> {
    let mut psram = Aps6408::new(ospi);
    psram.configure(BOARD.memory.psram_latency)?;

    let addr = 1000;
    let data: [u8; 256] = pattern(0x11);
    psram.write(addr, &data)?;
    let mut read = [0u8; 256];
    psram.read(addr, &mut read)?;
    expect_equal("PSRAM", &data, &read)
}

/// Counting pattern over the start of the FMC SRAM
pub fn sram(memory: FmcMemory) -> BspResult<()> {
    let mut sram = ExternalSram::new(memory);
    let len = SRAM_TEST_LEN.min(sram.size_bytes());
    match sram.pattern_test(0, len, 0x1234)? {
        None => {
            info!("SRAM: {} bytes OK", len);
            Ok(())
        }
        Some(offset) => {
            error!("SRAM: bad data at 0x{:08x}", offset);
            Err(BspError::Error)
        }
    }
}

/// Hardware CRC against the software model
pub fn crc_unit(unit: &mut L4Crc<'static>) -> BspResult<()> {
    let data = b"123456789";
    let hw = crc::checksum(unit, data);
    let mut reference = SoftwareCrc::new(*unit.config());
    let sw = crc::checksum(&mut reference, data);
    info!("CRC 0x{:08x}", hw);
    if hw != sw {
        error!("CRC: hardware 0x{:08x}, software 0x{:08x}", hw, sw);
        return Err(BspError::Error);
    }
    Ok(())
}

/// Random words, then an RSA round trip on a random message
///
/// Returns one unused random word for later steps.
pub fn rng_and_rsa(rng: L4Rng<'static, RNG>) -> BspResult<u32> {
    let mut rng = RandomGenerator::new(rng);
    let mut words = [0u32; 4];
    rng.fill_u32(&mut words)?;
    info!(
        "RNG {:08x} {:08x} {:08x} {:08x}",
        words[0], words[1], words[2], words[3]
    );

    // n = 61 * 53, e = 17, d = 2753
    let n = 3233u16.to_be_bytes();
    let message = ((words[0] % 3232) as u16 + 1).to_be_bytes();
    let mut pka = Pka::new(SoftwarePka::new());
    let mut cipher = [0u8; 2];
    pka.rsa_public(&message, &[17], &n, &mut cipher)?;
    let mut plain = [0u8; 2];
    pka.rsa_private(&cipher, &2753u16.to_be_bytes(), &n, &mut plain)?;
    expect_equal("RSA", &message, &plain)?;
    Ok(words[3])
}

/// Rewrite a few bytes across a double-word boundary of the scratch page
pub fn page_rewrite<F: PageFlash>(flash: F, stamp: u32) -> BspResult<F> {
    let mut writer = PageWriter::new(flash)?;
    let offset = 100;
    let data = stamp.to_le_bytes();
    let stats = writer.rewrite(offset, &data)?;
    let mut read = [0u8; 4];
    writer.read(offset, &mut read)?;
    expect_equal("Flash page", &data, &read)?;
    info!(
        "Flash page: {} written, {} unchanged",
        stats.pages_written, stats.pages_skipped
    );
    Ok(writer.release())
}
