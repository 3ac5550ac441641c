//! Text record (well-known type "T")
//!
//! Payload: status byte, IANA language code, then the text. Bit 7 of the
//! status byte selects UTF-16 (unsupported here), bits 5..0 hold the
//! language code length.

use heapless::String;

use crate::record::{NdefError, Record};

/// Well-known type of a Text record
pub const TEXT_TYPE: &[u8] = b"T";

/// Longest decoded text
pub const MAX_TEXT_LEN: usize = 256;

/// Longest language code (6-bit length field)
pub const MAX_LANG_LEN: usize = 63;

const STATUS_UTF16: u8 = 0x80;
const STATUS_LANG_MASK: u8 = 0x3F;

/// Text record with its language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    pub language: String<8>,
    pub text: String<MAX_TEXT_LEN>,
}

impl Text {
    pub fn new(language: &str, text: &str) -> Result<Self, NdefError> {
        let mut lang = String::new();
        lang.push_str(language).map_err(|_| NdefError::Overflow)?;
        let mut body = String::new();
        body.push_str(text).map_err(|_| NdefError::Overflow)?;
        Ok(Self {
            language: lang,
            text: body,
        })
    }

    /// Encode the record payload into `buffer`
    pub fn encode_payload(&self, buffer: &mut [u8]) -> Result<usize, NdefError> {
        encode_payload(&self.language, &self.text, buffer)
    }

    /// Parse a Text record payload
    pub fn from_payload(payload: &[u8]) -> Result<Self, NdefError> {
        let (&status, rest) = payload.split_first().ok_or(NdefError::InvalidPayload)?;
        if status & STATUS_UTF16 != 0 {
            return Err(NdefError::InvalidText);
        }
        let lang_len = (status & STATUS_LANG_MASK) as usize;
        if rest.len() < lang_len {
            return Err(NdefError::Truncated);
        }
        let (lang, text) = rest.split_at(lang_len);
        let lang = core::str::from_utf8(lang).map_err(|_| NdefError::InvalidText)?;
        let text = core::str::from_utf8(text).map_err(|_| NdefError::InvalidText)?;
        Self::new(lang, text)
    }

    /// Decode from a Text record
    pub fn from_record(record: &Record<'_>) -> Result<Self, NdefError> {
        if !record.is_well_known(TEXT_TYPE) {
            return Err(NdefError::UnexpectedType);
        }
        Self::from_payload(record.payload)
    }
}

/// Encode a UTF-8 Text payload without building a `Text`
pub fn encode_payload(language: &str, text: &str, buffer: &mut [u8]) -> Result<usize, NdefError> {
    if language.len() > MAX_LANG_LEN || !language.is_ascii() {
        return Err(NdefError::InvalidText);
    }
    let len = 1 + language.len() + text.len();
    if buffer.len() < len {
        return Err(NdefError::BufferTooSmall);
    }
    buffer[0] = language.len() as u8;
    buffer[1..1 + language.len()].copy_from_slice(language.as_bytes());
    buffer[1 + language.len()..len].copy_from_slice(text.as_bytes());
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload_layout() {
        let mut buffer = [0u8; 32];
        let len = encode_payload("en", "Hello", &mut buffer).unwrap();
        assert_eq!(&buffer[..len], b"\x02enHello");
    }

    #[test]
    fn test_text_decode() {
        let text = Text::from_payload("\x05fr-FRbonjour été".as_bytes()).unwrap();
        assert_eq!(text.language.as_str(), "fr-FR");
        assert_eq!(text.text.as_str(), "bonjour été");
    }

    #[test]
    fn test_text_rejects_utf16() {
        assert_eq!(
            Text::from_payload(b"\x82en\x00H"),
            Err(NdefError::InvalidText)
        );
    }

    #[test]
    fn test_text_language_length_past_end() {
        assert_eq!(Text::from_payload(b"\x09en"), Err(NdefError::Truncated));
    }

    #[test]
    fn test_text_encode_decode() {
        let text = Text::new("de", "Grüße aus dem Labor").unwrap();
        let mut buffer = [0u8; 64];
        let len = text.encode_payload(&mut buffer).unwrap();
        let record = Record::well_known(TEXT_TYPE, &buffer[..len]);
        assert_eq!(Text::from_record(&record).unwrap(), text);
    }
}
