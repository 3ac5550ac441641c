//! NDEF record header and record encoding/decoding.
//!
//! Header byte:
//! - bit 7 MB: message begin
//! - bit 6 ME: message end
//! - bit 5 CF: chunk flag (chunked payloads are rejected)
//! - bit 4 SR: short record, payload length is 1 byte instead of 4
//! - bit 3 IL: ID length field present
//! - bits 2..0 TNF: type name format

/// Message begin flag
pub const FLAG_MB: u8 = 0x80;
/// Message end flag
pub const FLAG_ME: u8 = 0x40;
/// Chunk flag
pub const FLAG_CF: u8 = 0x20;
/// Short record flag
pub const FLAG_SR: u8 = 0x10;
/// ID length present flag
pub const FLAG_IL: u8 = 0x08;
/// Type name format mask
pub const TNF_MASK: u8 = 0x07;

/// Largest payload a short record can carry
pub const MAX_SHORT_PAYLOAD: usize = 255;

/// Errors that can occur while building or parsing NDEF data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NdefError {
    /// Output buffer too small
    BufferTooSmall,
    /// Input ended in the middle of a record or TLV
    Truncated,
    /// Header fields are inconsistent
    InvalidHeader,
    /// Chunked records are not supported
    ChunkedNotSupported,
    /// Type or ID longer than 255 bytes
    FieldTooLong,
    /// Record is not of the expected type
    UnexpectedType,
    /// Payload is not valid for its record type
    InvalidPayload,
    /// URI prefix code outside the abbreviation table
    UnknownUriPrefix,
    /// Text is not valid UTF-8 or uses UTF-16
    InvalidText,
    /// Decoded content does not fit the fixed-capacity string
    Overflow,
    /// No NDEF message TLV found in the tag memory
    NoMessage,
    /// Capability container is not a Type 5 CC
    InvalidCapabilityContainer,
}

/// Type name format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Tnf {
    Empty = 0x00,
    /// NFC Forum well-known type (URI, Text, ...)
    WellKnown = 0x01,
    /// RFC 2046 media type
    Media = 0x02,
    AbsoluteUri = 0x03,
    /// NFC Forum external type
    External = 0x04,
    Unknown = 0x05,
    Unchanged = 0x06,
    Reserved = 0x07,
}

impl Tnf {
    /// Decode from the low 3 bits of a header byte
    pub const fn from_bits(bits: u8) -> Self {
        match bits & TNF_MASK {
            0x00 => Tnf::Empty,
            0x01 => Tnf::WellKnown,
            0x02 => Tnf::Media,
            0x03 => Tnf::AbsoluteUri,
            0x04 => Tnf::External,
            0x05 => Tnf::Unknown,
            0x06 => Tnf::Unchanged,
            _ => Tnf::Reserved,
        }
    }
}

/// Decoded header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header(pub u8);

impl Header {
    pub const fn message_begin(self) -> bool {
        self.0 & FLAG_MB != 0
    }

    pub const fn message_end(self) -> bool {
        self.0 & FLAG_ME != 0
    }

    pub const fn chunked(self) -> bool {
        self.0 & FLAG_CF != 0
    }

    pub const fn short_record(self) -> bool {
        self.0 & FLAG_SR != 0
    }

    pub const fn id_present(self) -> bool {
        self.0 & FLAG_IL != 0
    }

    pub const fn tnf(self) -> Tnf {
        Tnf::from_bits(self.0)
    }
}

/// A record borrowing its type, ID and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Record<'a> {
    pub tnf: Tnf,
    pub record_type: &'a [u8],
    pub id: &'a [u8],
    pub payload: &'a [u8],
}

impl<'a> Record<'a> {
    /// Well-known record without an ID
    pub const fn well_known(record_type: &'a [u8], payload: &'a [u8]) -> Self {
        Self {
            tnf: Tnf::WellKnown,
            record_type,
            id: &[],
            payload,
        }
    }

    /// Media-type record, e.g. `text/plain`
    pub const fn media(mime: &'a [u8], payload: &'a [u8]) -> Self {
        Self {
            tnf: Tnf::Media,
            record_type: mime,
            id: &[],
            payload,
        }
    }

    /// Whether this record fits the short-record form
    pub fn is_short(&self) -> bool {
        self.payload.len() <= MAX_SHORT_PAYLOAD
    }

    /// Bytes needed to encode this record
    pub fn encoded_len(&self) -> usize {
        let payload_len_field = if self.is_short() { 1 } else { 4 };
        let id_len_field = if self.id.is_empty() { 0 } else { 1 };
        2 + payload_len_field
            + id_len_field
            + self.record_type.len()
            + self.id.len()
            + self.payload.len()
    }

    /// Encode this record into `buffer` with the given MB/ME flags
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, begin: bool, end: bool, buffer: &mut [u8]) -> Result<usize, NdefError> {
        if self.record_type.len() > u8::MAX as usize || self.id.len() > u8::MAX as usize {
            return Err(NdefError::FieldTooLong);
        }
        if self.payload.len() > u32::MAX as usize {
            return Err(NdefError::InvalidPayload);
        }
        let total = self.encoded_len();
        if buffer.len() < total {
            return Err(NdefError::BufferTooSmall);
        }

        let mut header = self.tnf as u8;
        if begin {
            header |= FLAG_MB;
        }
        if end {
            header |= FLAG_ME;
        }
        if self.is_short() {
            header |= FLAG_SR;
        }
        if !self.id.is_empty() {
            header |= FLAG_IL;
        }

        buffer[0] = header;
        buffer[1] = self.record_type.len() as u8;
        let mut pos = 2;
        if self.is_short() {
            buffer[pos] = self.payload.len() as u8;
            pos += 1;
        } else {
            buffer[pos..pos + 4].copy_from_slice(&(self.payload.len() as u32).to_be_bytes());
            pos += 4;
        }
        if !self.id.is_empty() {
            buffer[pos] = self.id.len() as u8;
            pos += 1;
        }
        for field in [self.record_type, self.id, self.payload] {
            buffer[pos..pos + field.len()].copy_from_slice(field);
            pos += field.len();
        }

        Ok(pos)
    }

    /// Decode one record from the start of `bytes`
    ///
    /// Returns the record, its header and the number of bytes consumed
    pub fn decode(bytes: &'a [u8]) -> Result<(Self, Header, usize), NdefError> {
        let header = Header(*bytes.first().ok_or(NdefError::Truncated)?);
        if header.chunked() {
            return Err(NdefError::ChunkedNotSupported);
        }

        let type_len = *bytes.get(1).ok_or(NdefError::Truncated)? as usize;
        let mut pos = 2;
        let payload_len = if header.short_record() {
            let len = *bytes.get(pos).ok_or(NdefError::Truncated)? as usize;
            pos += 1;
            len
        } else {
            let field = bytes.get(pos..pos + 4).ok_or(NdefError::Truncated)?;
            pos += 4;
            u32::from_be_bytes([field[0], field[1], field[2], field[3]]) as usize
        };
        let id_len = if header.id_present() {
            let len = *bytes.get(pos).ok_or(NdefError::Truncated)? as usize;
            pos += 1;
            len
        } else {
            0
        };

        let tnf = header.tnf();
        if tnf == Tnf::Empty && (type_len != 0 || id_len != 0 || payload_len != 0) {
            return Err(NdefError::InvalidHeader);
        }
        if matches!(tnf, Tnf::Unknown | Tnf::Unchanged) && type_len != 0 {
            return Err(NdefError::InvalidHeader);
        }

        let mut take = |len: usize| -> Result<&'a [u8], NdefError> {
            let end = pos.checked_add(len).ok_or(NdefError::Truncated)?;
            let field = bytes.get(pos..end).ok_or(NdefError::Truncated)?;
            pos = end;
            Ok(field)
        };
        let record_type = take(type_len)?;
        let id = take(id_len)?;
        let payload = take(payload_len)?;

        Ok((
            Self {
                tnf,
                record_type,
                id,
                payload,
            },
            header,
            pos,
        ))
    }

    /// Check for a well-known record of the given type
    pub fn is_well_known(&self, record_type: &[u8]) -> bool {
        self.tnf == Tnf::WellKnown && self.record_type == record_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_record_layout() {
        let record = Record::well_known(b"U", &[0x04, b'a', b'.', b'b']);
        let mut buffer = [0u8; 16];
        let len = record.encode(true, true, &mut buffer).unwrap();

        assert_eq!(len, 8);
        assert_eq!(buffer[0], FLAG_MB | FLAG_ME | FLAG_SR | 0x01); // 0xD1
        assert_eq!(buffer[1], 1); // type length
        assert_eq!(buffer[2], 4); // payload length
        assert_eq!(buffer[3], b'U');
        assert_eq!(&buffer[4..8], &[0x04, b'a', b'.', b'b']);
    }

    #[test]
    fn test_long_record_layout() {
        let payload = [0x55u8; 300];
        let record = Record::media(b"application/octet-stream", &payload);
        let mut buffer = [0u8; 400];
        let len = record.encode(true, false, &mut buffer).unwrap();

        assert_eq!(len, record.encoded_len());
        assert_eq!(buffer[0] & FLAG_SR, 0);
        assert_eq!(buffer[0] & TNF_MASK, Tnf::Media as u8);
        assert_eq!(&buffer[2..6], &300u32.to_be_bytes());

        let (decoded, header, used) = Record::decode(&buffer[..len]).unwrap();
        assert_eq!(used, len);
        assert!(header.message_begin());
        assert!(!header.message_end());
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_record_with_id() {
        let record = Record {
            tnf: Tnf::External,
            record_type: b"st.com:m24",
            id: b"1",
            payload: b"x",
        };
        let mut buffer = [0u8; 32];
        let len = record.encode(false, false, &mut buffer).unwrap();
        assert_ne!(buffer[0] & FLAG_IL, 0);

        let (decoded, _, _) = Record::decode(&buffer[..len]).unwrap();
        assert_eq!(decoded.id, b"1");
        assert_eq!(decoded.record_type, b"st.com:m24");
    }

    #[test]
    fn test_decode_truncated() {
        let record = Record::well_known(b"T", b"\x02enHello");
        let mut buffer = [0u8; 32];
        let len = record.encode(true, true, &mut buffer).unwrap();

        for cut in 0..len {
            assert_eq!(
                Record::decode(&buffer[..cut]).map(|(_, _, n)| n),
                Err(NdefError::Truncated)
            );
        }
    }

    #[test]
    fn test_decode_rejects_chunked() {
        let bytes = [FLAG_MB | FLAG_CF | FLAG_SR | 0x01, 1, 0, b'T'];
        assert_eq!(
            Record::decode(&bytes).map(|(_, _, n)| n),
            Err(NdefError::ChunkedNotSupported)
        );
    }

    #[test]
    fn test_empty_record_must_be_empty() {
        let bytes = [FLAG_MB | FLAG_ME | FLAG_SR, 1, 0, b'X'];
        assert_eq!(
            Record::decode(&bytes).map(|(_, _, n)| n),
            Err(NdefError::InvalidHeader)
        );

        let bytes = [FLAG_MB | FLAG_ME | FLAG_SR, 0, 0];
        let (record, _, used) = Record::decode(&bytes).unwrap();
        assert_eq!(record.tnf, Tnf::Empty);
        assert_eq!(used, 3);
    }

    #[test]
    fn test_buffer_too_small() {
        let record = Record::well_known(b"U", b"\x00abc");
        let mut buffer = [0u8; 4];
        assert_eq!(
            record.encode(true, true, &mut buffer),
            Err(NdefError::BufferTooSmall)
        );
    }
}
