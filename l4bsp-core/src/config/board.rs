//! Board description
//!
//! Everything the drivers need to know about how devices are wired on a
//! given board: I2C addresses, panel geometry, flash layout, memory sizes.
//! The firmware build script generates a [`BoardConfig`] constant from
//! `board.toml`; [`BoardConfig::L4R9I_EVAL`] is the built-in default.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// GPIO port letter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
}

impl Port {
    /// Parse a port letter
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'A' => Port::A,
            'B' => Port::B,
            'C' => Port::C,
            'D' => Port::D,
            'E' => Port::E,
            'F' => Port::F,
            'G' => Port::G,
            'H' => Port::H,
            'I' => Port::I,
            _ => return None,
        })
    }
}

/// MCU pin reference such as `PC13`, optionally inverted (`!PC13`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinId {
    pub port: Port,
    pub pin: u8,
    /// Signal is active-low
    pub inverted: bool,
}

impl PinId {
    /// Parse a pin string
    ///
    /// Supports formats:
    /// - "PA0" -> (Port A, Pin 0, not inverted)
    /// - "!PB1" -> (Port B, Pin 1, inverted)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (s, inverted) = match s.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (s, false),
        };

        let rest = s.strip_prefix('P')?;
        let mut chars = rest.chars();
        let port = Port::from_char(chars.next()?)?;
        let pin: u8 = chars.as_str().parse().ok()?;
        if pin > 15 {
            return None;
        }

        Some(Self {
            port,
            pin,
            inverted,
        })
    }
}

/// How the SD card detect switch is wired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SdDetect {
    /// MCU GPIO
    Pin(PinId),
    /// IO expander pin number
    Expander(u8),
    /// No detect switch, assume present
    None,
}

/// Display panel orientation relative to the touch controller axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
    PortraitFlipped,
    LandscapeFlipped,
}

impl Orientation {
    /// (swap x/y, mirror x, mirror y) applied to raw controller coordinates
    pub fn transform(self) -> (bool, bool, bool) {
        match self {
            Orientation::Portrait => (false, false, false),
            Orientation::Landscape => (true, false, true),
            Orientation::PortraitFlipped => (false, true, true),
            Orientation::LandscapeFlipped => (true, true, false),
        }
    }
}

/// I2C devices on the shared board bus (7-bit addresses)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I2cDevices {
    /// Bus frequency in Hz
    pub frequency: u32,
    /// EEPROM user memory
    pub eeprom: u8,
    /// EEPROM system area
    pub eeprom_system: u8,
    /// IO expander / IDD measurement MCU
    pub io_expander: u8,
    /// Touch controller
    pub touch: u8,
}

/// Touch panel geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TouchConfig {
    /// Panel width in pixels
    pub width: u16,
    /// Panel height in pixels
    pub height: u16,
    pub orientation: Orientation,
}

/// Internal flash layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlashLayout {
    /// Total flash size in bytes
    pub size: u32,
    /// Page size in bytes
    pub page_size: u32,
    /// Page reserved for the page-rewrite helper
    pub user_page: u32,
    /// Pages at the end of flash used for key-value storage
    pub storage_pages: u32,
}

impl FlashLayout {
    /// Number of pages
    pub const fn page_count(&self) -> u32 {
        self.size / self.page_size
    }

    /// First page of the storage partition
    pub const fn storage_first_page(&self) -> u32 {
        self.page_count() - self.storage_pages
    }

    /// Byte range of the storage partition
    pub const fn storage_range(&self) -> core::ops::Range<u32> {
        (self.storage_first_page() * self.page_size)..self.size
    }
}

/// External memories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryConfig {
    /// OctoSPI NOR flash size in bytes
    pub nor_size: u32,
    /// Use octal DTR mode for the NOR flash
    pub nor_dtr: bool,
    /// OctoSPI PSRAM size in bytes
    pub psram_size: u32,
    /// PSRAM read latency code (3-7 clocks)
    pub psram_latency: u8,
    /// FMC SRAM size in bytes
    pub sram_size: u32,
}

/// IDD measurement settings for the MFX
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IddSettings {
    /// Delay before the first measurement (ms)
    pub pre_delay_ms: u16,
    /// Number of averaged measurements
    pub measurements: u8,
    /// Delay between measurements (ms)
    pub delta_delay_ms: u16,
    /// Number of shunt resistors fitted
    pub shunts_on_board: u8,
    /// Minimum VDD for a valid measurement (mV)
    pub vdd_min_mv: u16,
}

/// Complete board description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoardConfig {
    pub i2c: I2cDevices,
    pub touch: TouchConfig,
    pub flash: FlashLayout,
    pub sd_detect: SdDetect,
    pub memory: MemoryConfig,
    pub idd: IddSettings,
}

/// Board configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// I2C address outside the 7-bit range or reserved
    InvalidI2cAddress(u8),
    /// Two devices share an I2C address
    I2cAddressConflict(u8),
    /// I2C frequency above fast-mode plus
    InvalidI2cFrequency,
    /// Touch panel has a zero dimension
    InvalidPanel,
    /// Flash layout is inconsistent
    InvalidFlashLayout,
    /// Memory sizes are inconsistent
    InvalidMemory,
    /// IDD settings out of range
    InvalidIdd,
}

impl BoardConfig {
    /// STM32L4R9I evaluation board
    pub const L4R9I_EVAL: Self = Self {
        i2c: I2cDevices {
            frequency: 400_000,
            eeprom: 0x50,
            eeprom_system: 0x54,
            io_expander: 0x42,
            touch: 0x38,
        },
        touch: TouchConfig {
            width: 390,
            height: 390,
            orientation: Orientation::Portrait,
        },
        flash: FlashLayout {
            size: 2 * 1024 * 1024,
            page_size: 4096,
            user_page: 255,
            storage_pages: 4,
        },
        sd_detect: SdDetect::Expander(8),
        memory: MemoryConfig {
            nor_size: 64 * 1024 * 1024,
            nor_dtr: true,
            psram_size: 8 * 1024 * 1024,
            psram_latency: 5,
            sram_size: 2 * 1024 * 1024,
        },
        idd: IddSettings {
            pre_delay_ms: 100,
            measurements: 10,
            delta_delay_ms: 100,
            shunts_on_board: 5,
            vdd_min_mv: 2000,
        },
    };

    /// Check the description for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let addrs = [
            self.i2c.eeprom,
            self.i2c.eeprom_system,
            self.i2c.io_expander,
            self.i2c.touch,
        ];
        for (i, &addr) in addrs.iter().enumerate() {
            // 0x00-0x07 and 0x78-0x7F are reserved by the I2C specification
            if !(0x08..=0x77).contains(&addr) {
                return Err(ConfigError::InvalidI2cAddress(addr));
            }
            if addrs[i + 1..].contains(&addr) {
                return Err(ConfigError::I2cAddressConflict(addr));
            }
        }
        if self.i2c.frequency == 0 || self.i2c.frequency > 1_000_000 {
            return Err(ConfigError::InvalidI2cFrequency);
        }

        if self.touch.width == 0 || self.touch.height == 0 {
            return Err(ConfigError::InvalidPanel);
        }

        let flash = &self.flash;
        if !flash.page_size.is_power_of_two()
            || flash.page_size < 8
            || flash.size % flash.page_size != 0
            || flash.storage_pages < 2
            || flash.storage_pages >= flash.page_count()
            || flash.user_page >= flash.storage_first_page()
        {
            return Err(ConfigError::InvalidFlashLayout);
        }

        let mem = &self.memory;
        if !(3..=7).contains(&mem.psram_latency) || mem.sram_size % 2 != 0 {
            return Err(ConfigError::InvalidMemory);
        }

        if self.idd.measurements == 0 || self.idd.shunts_on_board == 0 || self.idd.shunts_on_board > 5
        {
            return Err(ConfigError::InvalidIdd);
        }

        Ok(())
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::L4R9I_EVAL
    }
}
