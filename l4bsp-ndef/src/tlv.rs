//! Type 5 tag memory layout: capability container followed by TLV blocks
//!
//! TLV length encoding:
//! - `0x00..=0xFE`: one byte
//! - `0xFF` followed by a big-endian u16: three bytes

/// NULL TLV, padding
pub const TLV_NULL: u8 = 0x00;
/// Lock control TLV
pub const TLV_LOCK_CONTROL: u8 = 0x01;
/// Memory control TLV
pub const TLV_MEMORY_CONTROL: u8 = 0x02;
/// NDEF message TLV
pub const TLV_NDEF: u8 = 0x03;
/// Proprietary TLV
pub const TLV_PROPRIETARY: u8 = 0xFD;
/// Terminator TLV
pub const TLV_TERMINATOR: u8 = 0xFE;

/// CC magic, 1-byte memory size field
pub const CC_MAGIC: u8 = 0xE1;
/// CC magic for tags that need the 8-byte CC form
pub const CC_MAGIC_EXTENDED: u8 = 0xE2;
/// Mapping version 1.0, read and write access granted
pub const CC_VERSION_ACCESS: u8 = 0x40;

/// Largest value of the 3-byte length form
pub const MAX_TLV_LENGTH: usize = 0xFFFE;

use crate::record::NdefError;

/// Type 5 capability container
///
/// The 4-byte form stores the data area size divided by 8 in byte 2. Tags
/// larger than 2040 bytes use the 8-byte form with byte 2 zero and the size
/// in bytes 6..8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapabilityContainer {
    /// Version and access conditions byte
    pub version_access: u8,
    /// Data area size in bytes (multiple of 8)
    pub memory_size: usize,
    /// Additional feature flags
    pub features: u8,
}

impl CapabilityContainer {
    /// CC for a tag with `memory_size` bytes, read/write, no features
    pub const fn new(memory_size: usize) -> Self {
        Self {
            version_access: CC_VERSION_ACCESS,
            memory_size,
            features: 0,
        }
    }

    /// Encoded size
    pub const fn len(&self) -> usize {
        if self.memory_size / 8 > 0xFF {
            8
        } else {
            4
        }
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Encode into `buffer`, returning the bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, NdefError> {
        let len = self.len();
        if buffer.len() < len {
            return Err(NdefError::BufferTooSmall);
        }
        let mlen = self.memory_size / 8;
        if len == 4 {
            buffer[..4].copy_from_slice(&[CC_MAGIC, self.version_access, mlen as u8, self.features]);
        } else {
            let mlen = u16::try_from(mlen).map_err(|_| NdefError::InvalidCapabilityContainer)?;
            let [hi, lo] = mlen.to_be_bytes();
            buffer[..8].copy_from_slice(&[
                CC_MAGIC_EXTENDED,
                self.version_access,
                0x00,
                self.features,
                0x00,
                0x00,
                hi,
                lo,
            ]);
        }
        Ok(len)
    }

    /// Decode from the start of tag memory
    pub fn decode(bytes: &[u8]) -> Result<Self, NdefError> {
        let head = bytes.get(..4).ok_or(NdefError::Truncated)?;
        match head[0] {
            CC_MAGIC | CC_MAGIC_EXTENDED => {}
            _ => return Err(NdefError::InvalidCapabilityContainer),
        }
        // Major version must be 1
        if head[1] >> 6 != 0x01 {
            return Err(NdefError::InvalidCapabilityContainer);
        }

        let memory_size = if head[2] == 0 {
            let ext = bytes.get(4..8).ok_or(NdefError::Truncated)?;
            u16::from_be_bytes([ext[2], ext[3]]) as usize * 8
        } else {
            head[2] as usize * 8
        };

        Ok(Self {
            version_access: head[1],
            memory_size,
            features: head[3],
        })
    }
}

/// Bytes needed to wrap a `message_len`-byte message in an NDEF TLV plus
/// terminator
pub const fn wrapped_len(message_len: usize) -> usize {
    let length_field = if message_len < 0xFF { 1 } else { 3 };
    1 + length_field + message_len + 1
}

/// Write an NDEF message TLV followed by the terminator
pub fn wrap_message(message: &[u8], buffer: &mut [u8]) -> Result<usize, NdefError> {
    if message.len() > MAX_TLV_LENGTH {
        return Err(NdefError::InvalidPayload);
    }
    let total = wrapped_len(message.len());
    if buffer.len() < total {
        return Err(NdefError::BufferTooSmall);
    }

    buffer[0] = TLV_NDEF;
    let mut pos = 1;
    if message.len() < 0xFF {
        buffer[pos] = message.len() as u8;
        pos += 1;
    } else {
        buffer[pos] = 0xFF;
        buffer[pos + 1..pos + 3].copy_from_slice(&(message.len() as u16).to_be_bytes());
        pos += 3;
    }
    buffer[pos..pos + message.len()].copy_from_slice(message);
    pos += message.len();
    buffer[pos] = TLV_TERMINATOR;
    Ok(pos + 1)
}

/// Read a TLV length field at `bytes[0]`, returning (length, field size)
fn read_length(bytes: &[u8]) -> Result<(usize, usize), NdefError> {
    match bytes.first() {
        Some(0xFF) => {
            let field = bytes.get(1..3).ok_or(NdefError::Truncated)?;
            Ok((u16::from_be_bytes([field[0], field[1]]) as usize, 3))
        }
        Some(&len) => Ok((len as usize, 1)),
        None => Err(NdefError::Truncated),
    }
}

/// Find the first NDEF message in a TLV area (the bytes after the CC)
///
/// NULL, lock control, memory control and proprietary TLVs are skipped.
pub fn find_message(area: &[u8]) -> Result<&[u8], NdefError> {
    let mut pos = 0;
    while let Some(&tag) = area.get(pos) {
        match tag {
            TLV_NULL => pos += 1,
            TLV_TERMINATOR => break,
            _ => {
                let (len, field) = read_length(&area[pos + 1..])?;
                let start = pos + 1 + field;
                let value = area.get(start..start + len).ok_or(NdefError::Truncated)?;
                if tag == TLV_NDEF {
                    return Ok(value);
                }
                pos = start + len;
            }
        }
    }
    Err(NdefError::NoMessage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cc_short_form() {
        let cc = CapabilityContainer::new(2040);
        let mut buffer = [0u8; 8];
        assert_eq!(cc.encode(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer[..4], &[0xE1, 0x40, 0xFF, 0x00]);
        assert_eq!(CapabilityContainer::decode(&buffer).unwrap(), cc);
    }

    #[test]
    fn test_cc_extended_form() {
        // M24LR64: 8 KiB user memory
        let cc = CapabilityContainer::new(8192);
        let mut buffer = [0u8; 8];
        assert_eq!(cc.encode(&mut buffer).unwrap(), 8);
        assert_eq!(&buffer, &[0xE2, 0x40, 0x00, 0x00, 0x00, 0x00, 0x04, 0x00]);
        assert_eq!(CapabilityContainer::decode(&buffer).unwrap(), cc);
    }

    #[test]
    fn test_cc_rejects_blank_memory() {
        assert_eq!(
            CapabilityContainer::decode(&[0xFF; 8]),
            Err(NdefError::InvalidCapabilityContainer)
        );
        assert_eq!(
            CapabilityContainer::decode(&[0xE1, 0x80, 0x10, 0x00]),
            Err(NdefError::InvalidCapabilityContainer)
        );
    }

    #[test]
    fn test_short_tlv() {
        let mut buffer = [0u8; 16];
        let len = wrap_message(&[0xD0, 0x00, 0x00], &mut buffer).unwrap();
        assert_eq!(&buffer[..len], &[0x03, 0x03, 0xD0, 0x00, 0x00, 0xFE]);
        assert_eq!(find_message(&buffer[..len]).unwrap(), &[0xD0, 0x00, 0x00]);
    }

    #[test]
    fn test_long_tlv_boundary() {
        let message = [0xAAu8; 0xFF];
        let mut buffer = [0u8; 0x110];
        let len = wrap_message(&message, &mut buffer).unwrap();
        assert_eq!(len, wrapped_len(message.len()));
        assert_eq!(&buffer[..4], &[0x03, 0xFF, 0x00, 0xFF]);
        assert_eq!(buffer[len - 1], TLV_TERMINATOR);
        assert_eq!(find_message(&buffer[..len]).unwrap(), &message[..]);

        let message = [0xAAu8; 0xFE];
        let len = wrap_message(&message, &mut buffer).unwrap();
        assert_eq!(&buffer[..2], &[0x03, 0xFE]);
        assert_eq!(len, 0xFE + 3);
    }

    #[test]
    fn test_find_skips_other_tlvs() {
        let area = [
            0x00, // NULL
            0x01, 0x03, 0xA0, 0x10, 0x44, // lock control
            0xFD, 0x01, 0x99, // proprietary
            0x03, 0x02, 0xAB, 0xCD, // NDEF
            0xFE,
        ];
        assert_eq!(find_message(&area).unwrap(), &[0xAB, 0xCD]);
    }

    #[test]
    fn test_find_no_message() {
        assert_eq!(find_message(&[0xFE, 0x03]), Err(NdefError::NoMessage));
        assert_eq!(find_message(&[]), Err(NdefError::NoMessage));
        assert_eq!(find_message(&[0x03, 0x05, 0x01]), Err(NdefError::Truncated));
    }
}
