//! SMS record: a URI record of the form `sms:<number>?body=<message>`
//!
//! The message is percent-encoded so spaces and reserved characters survive
//! the URI.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::record::{NdefError, Record};
use crate::uri::URI_TYPE;

/// URI scheme of an SMS record
pub const SMS_SCHEME: &str = "sms:";

/// Separator between number and message
pub const SMS_BODY: &str = "?body=";

/// Longest phone number
pub const MAX_NUMBER_LEN: usize = 32;

/// Longest message (one SMS)
pub const MAX_SMS_LEN: usize = 160;

/// Encoded payload upper bound: code byte, scheme, number, separator and a
/// fully percent-encoded message
pub const MAX_SMS_PAYLOAD: usize =
    1 + SMS_SCHEME.len() + MAX_NUMBER_LEN + SMS_BODY.len() + 3 * MAX_SMS_LEN;

/// SMS to send to `number`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sms {
    pub number: String<MAX_NUMBER_LEN>,
    pub message: String<MAX_SMS_LEN>,
}

fn is_phone_char(c: char) -> bool {
    c.is_ascii_digit() || c == '+'
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn percent_decode<const N: usize>(input: &str) -> Result<String<N>, NdefError> {
    let mut bytes: Vec<u8, N> = Vec::new();
    let mut iter = input.bytes();
    while let Some(b) = iter.next() {
        let decoded = if b == b'%' {
            let hi = iter.next().and_then(hex_value);
            let lo = iter.next().and_then(hex_value);
            match (hi, lo) {
                (Some(hi), Some(lo)) => hi << 4 | lo,
                _ => return Err(NdefError::InvalidPayload),
            }
        } else {
            b
        };
        bytes.push(decoded).map_err(|_| NdefError::Overflow)?;
    }
    String::from_utf8(bytes).map_err(|_| NdefError::InvalidText)
}

impl Sms {
    pub fn new(number: &str, message: &str) -> Result<Self, NdefError> {
        if number.is_empty() || !number.chars().all(is_phone_char) {
            return Err(NdefError::InvalidPayload);
        }
        let mut n = String::new();
        n.push_str(number).map_err(|_| NdefError::Overflow)?;
        let mut m = String::new();
        m.push_str(message).map_err(|_| NdefError::Overflow)?;
        Ok(Self {
            number: n,
            message: m,
        })
    }

    /// Encode the URI record payload into `buffer`
    pub fn encode_payload(&self, buffer: &mut [u8]) -> Result<usize, NdefError> {
        let mut uri: String<MAX_SMS_PAYLOAD> = String::new();
        uri.push_str(SMS_SCHEME).map_err(|_| NdefError::Overflow)?;
        uri.push_str(&self.number).map_err(|_| NdefError::Overflow)?;
        uri.push_str(SMS_BODY).map_err(|_| NdefError::Overflow)?;
        for b in self.message.bytes() {
            if is_unreserved(b) {
                uri.push(b as char).map_err(|_| NdefError::Overflow)?;
            } else {
                write!(uri, "%{:02X}", b).map_err(|_| NdefError::Overflow)?;
            }
        }
        crate::uri::encode_payload(&uri, buffer)
    }

    /// Parse a URI record payload
    pub fn from_payload(payload: &[u8]) -> Result<Self, NdefError> {
        let (&code, rest) = payload.split_first().ok_or(NdefError::InvalidPayload)?;
        // No identifier code abbreviates "sms:"
        if code != 0 {
            return Err(NdefError::UnexpectedType);
        }
        let uri = core::str::from_utf8(rest).map_err(|_| NdefError::InvalidPayload)?;
        let rest = uri
            .strip_prefix(SMS_SCHEME)
            .ok_or(NdefError::UnexpectedType)?;

        let (number, message) = match rest.split_once(SMS_BODY) {
            Some((number, body)) => (number, percent_decode::<MAX_SMS_LEN>(body)?),
            None => (rest, String::new()),
        };
        Self::new(number, &message)
    }

    /// Decode from a URI record
    pub fn from_record(record: &Record<'_>) -> Result<Self, NdefError> {
        if !record.is_well_known(URI_TYPE) {
            return Err(NdefError::UnexpectedType);
        }
        Self::from_payload(record.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sms_payload_layout() {
        let sms = Sms::new("+33612345678", "Hi there!").unwrap();
        let mut buffer = [0u8; MAX_SMS_PAYLOAD];
        let len = sms.encode_payload(&mut buffer).unwrap();

        assert_eq!(buffer[0], 0x00);
        assert_eq!(&buffer[1..len], b"sms:+33612345678?body=Hi%20there%21");
    }

    #[test]
    fn test_sms_decode() {
        let sms = Sms::from_payload(b"\x00sms:0123?body=Call%20me%3F").unwrap();
        assert_eq!(sms.number.as_str(), "0123");
        assert_eq!(sms.message.as_str(), "Call me?");
    }

    #[test]
    fn test_sms_without_body() {
        let sms = Sms::from_payload(b"\x00sms:0123").unwrap();
        assert_eq!(sms.message.as_str(), "");
    }

    #[test]
    fn test_sms_rejects_other_schemes() {
        assert_eq!(
            Sms::from_payload(b"\x00geo:1,2"),
            Err(NdefError::UnexpectedType)
        );
        assert_eq!(
            Sms::from_payload(b"\x05+331234"),
            Err(NdefError::UnexpectedType)
        );
    }

    #[test]
    fn test_sms_rejects_bad_escape() {
        assert_eq!(
            Sms::from_payload(b"\x00sms:1?body=%G1"),
            Err(NdefError::InvalidPayload)
        );
    }

    #[test]
    fn test_sms_rejects_bad_number() {
        assert_eq!(Sms::new("call me", "x"), Err(NdefError::InvalidPayload));
    }

    proptest::proptest! {
        #[test]
        fn prop_sms_message_survives_encoding(message in "\\PC{0,40}") {
            let sms = Sms::new("+441234567", &message).unwrap();
            let mut buffer = [0u8; MAX_SMS_PAYLOAD];
            let len = sms.encode_payload(&mut buffer).unwrap();
            let decoded = Sms::from_payload(&buffer[..len]).unwrap();
            proptest::prop_assert_eq!(decoded, sms);
        }
    }
}
