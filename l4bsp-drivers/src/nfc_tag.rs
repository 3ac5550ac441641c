//! NDEF storage on a dual-interface EEPROM
//!
//! The EEPROM is laid out as an NFC Forum Type 5 tag so a phone reading it
//! over RF sees the message the MCU wrote over I2C:
//!
//! ```text
//! 0x0000  CC   E1 40 FF 00
//! 0x0004  TLV  03 <len> <NDEF message> FE
//! ```
//!
//! The 4-byte CC can describe at most 2040 bytes, which is the area used on
//! larger parts too.

use l4bsp_core::traits::eeprom::Eeprom;
use l4bsp_core::BspError;
use l4bsp_ndef::record::{NdefError, Record};
use l4bsp_ndef::tlv::{self, CapabilityContainer};
use l4bsp_ndef::{encode_message, MessageReader};

/// Largest data area a 4-byte CC can describe
pub const MAX_AREA: usize = 0xFF * 8;

/// Size of the CC in the layout used here
pub const CC_LEN: usize = 4;

/// NFC tag errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TagError<E> {
    /// EEPROM access failed
    Eeprom(E),
    /// Malformed message or TLV
    Ndef(NdefError),
    /// Message does not fit the data area
    TooLarge,
    /// No valid CC at offset 0
    NotFormatted,
}

impl<E> From<NdefError> for TagError<E> {
    fn from(e: NdefError) -> Self {
        TagError::Ndef(e)
    }
}

impl<E> From<TagError<E>> for BspError {
    fn from(e: TagError<E>) -> Self {
        match e {
            TagError::Eeprom(_) => BspError::Bus,
            TagError::Ndef(_) => BspError::Error,
            TagError::TooLarge => BspError::InvalidParameter,
            TagError::NotFormatted => BspError::NotPresent,
        }
    }
}

/// Type 5 tag view of an EEPROM
pub struct NfcTag<E> {
    eeprom: E,
    cc: CapabilityContainer,
    scratch: [u8; CC_LEN + MAX_AREA],
}

impl<E: Eeprom> NfcTag<E> {
    /// The data area is the EEPROM after the CC, capped at [`MAX_AREA`] and
    /// rounded down to 8 bytes
    pub fn new(eeprom: E) -> Self {
        let area = eeprom.capacity().saturating_sub(CC_LEN).min(MAX_AREA) / 8 * 8;
        Self {
            eeprom,
            cc: CapabilityContainer::new(area),
            scratch: [0; CC_LEN + MAX_AREA],
        }
    }

    pub fn release(self) -> E {
        self.eeprom
    }

    /// Data area size in bytes
    pub fn capacity(&self) -> usize {
        self.cc.memory_size
    }

    /// Largest NDEF message that fits
    pub fn max_message_len(&self) -> usize {
        let area = self.capacity();
        // TLV overhead: tag, length field, terminator
        if area >= tlv::wrapped_len(0xFF) {
            area - 5
        } else {
            area.saturating_sub(3).min(0xFE)
        }
    }

    /// Write the CC and a message holding one empty record
    pub fn format(&mut self) -> Result<(), TagError<E::Error>> {
        self.write_records(&[])
    }

    /// Store an encoded NDEF message
    pub fn write_message(&mut self, message: &[u8]) -> Result<(), TagError<E::Error>> {
        if message.len() > self.max_message_len() {
            return Err(TagError::TooLarge);
        }
        let cc_len = self.cc.encode(&mut self.scratch)?;
        let tlv_len = tlv::wrap_message(message, &mut self.scratch[cc_len..])?;
        self.eeprom
            .write(0, &self.scratch[..cc_len + tlv_len])
            .map_err(TagError::Eeprom)
    }

    /// Encode `records` as one message and store it
    pub fn write_records(&mut self, records: &[Record<'_>]) -> Result<(), TagError<E::Error>> {
        let mut message = [0u8; MAX_AREA];
        let len = encode_message(records, &mut message)?;
        self.write_message(&message[..len])
    }

    /// Read the stored NDEF message into `buf`, returning its length
    ///
    /// The message is checked to be a well-formed record sequence. An empty
    /// NDEF TLV reads as a zero-length message.
    pub fn read_message(&mut self, buf: &mut [u8]) -> Result<usize, TagError<E::Error>> {
        let head = &mut self.scratch[..CC_LEN];
        self.eeprom.read(0, head).map_err(TagError::Eeprom)?;
        let cc = CapabilityContainer::decode(head).map_err(|_| TagError::NotFormatted)?;
        if cc.len() != CC_LEN {
            return Err(TagError::NotFormatted);
        }

        let area_len = cc.memory_size.min(self.eeprom.capacity().saturating_sub(CC_LEN));
        let area = &mut self.scratch[CC_LEN..CC_LEN + area_len.min(MAX_AREA)];
        self.eeprom.read(CC_LEN as u16, area).map_err(TagError::Eeprom)?;

        let message = tlv::find_message(area)?;
        if message.is_empty() {
            return Ok(0);
        }
        for record in MessageReader::new(message) {
            record?;
        }
        let out = buf.get_mut(..message.len()).ok_or(TagError::Ndef(NdefError::BufferTooSmall))?;
        out.copy_from_slice(message);
        Ok(message.len())
    }
}
