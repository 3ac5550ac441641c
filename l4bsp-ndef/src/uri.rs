//! URI record (well-known type "U").
//!
//! The payload is one identifier code followed by the rest of the URI. The
//! code abbreviates a common prefix from the NFC Forum table below.

use heapless::String;

use crate::record::{NdefError, Record};

/// Well-known type of a URI record
pub const URI_TYPE: &[u8] = b"U";

/// Longest URI a decoded record may hold
pub const MAX_URI_LEN: usize = 256;

/// URI identifier codes, indexed by code
pub const URI_PREFIXES: [&str; 36] = [
    "",
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

/// Pick the identifier code with the longest prefix of `uri`
///
/// Returns the code and the remaining suffix.
pub fn abbreviate(uri: &str) -> (u8, &str) {
    let mut best = (0u8, uri);
    let mut best_len = 0;
    for (code, prefix) in URI_PREFIXES.iter().enumerate().skip(1) {
        if prefix.len() > best_len {
            if let Some(rest) = uri.strip_prefix(prefix) {
                best = (code as u8, rest);
                best_len = prefix.len();
            }
        }
    }
    best
}

/// Encode a URI record payload (code + suffix) into `buffer`
pub fn encode_payload(uri: &str, buffer: &mut [u8]) -> Result<usize, NdefError> {
    let (code, rest) = abbreviate(uri);
    let len = 1 + rest.len();
    if buffer.len() < len {
        return Err(NdefError::BufferTooSmall);
    }
    buffer[0] = code;
    buffer[1..len].copy_from_slice(rest.as_bytes());
    Ok(len)
}

/// Decoded URI record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    uri: String<MAX_URI_LEN>,
}

impl Uri {
    /// Build from a full URI string
    pub fn new(uri: &str) -> Result<Self, NdefError> {
        let mut s = String::new();
        s.push_str(uri).map_err(|_| NdefError::Overflow)?;
        Ok(Self { uri: s })
    }

    /// The expanded URI
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Expand a URI record payload
    pub fn from_payload(payload: &[u8]) -> Result<Self, NdefError> {
        let (&code, rest) = payload.split_first().ok_or(NdefError::InvalidPayload)?;
        let prefix = URI_PREFIXES
            .get(code as usize)
            .ok_or(NdefError::UnknownUriPrefix)?;
        let rest = core::str::from_utf8(rest).map_err(|_| NdefError::InvalidPayload)?;

        let mut uri = String::new();
        uri.push_str(prefix).map_err(|_| NdefError::Overflow)?;
        uri.push_str(rest).map_err(|_| NdefError::Overflow)?;
        Ok(Self { uri })
    }

    /// Decode from a URI record
    pub fn from_record(record: &Record<'_>) -> Result<Self, NdefError> {
        if !record.is_well_known(URI_TYPE) {
            return Err(NdefError::UnexpectedType);
        }
        Self::from_payload(record.payload)
    }

    /// Encode the record payload into `buffer`
    pub fn encode_payload(&self, buffer: &mut [u8]) -> Result<usize, NdefError> {
        encode_payload(&self.uri, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviate_prefers_longest() {
        assert_eq!(abbreviate("https://www.st.com"), (0x02, "st.com"));
        assert_eq!(abbreviate("https://st.com"), (0x04, "st.com"));
        assert_eq!(abbreviate("urn:epc:id:sgtin"), (0x1E, "sgtin"));
        assert_eq!(abbreviate("urn:epc:x"), (0x22, "x"));
        assert_eq!(abbreviate("geo:1,2"), (0x00, "geo:1,2"));
    }

    #[test]
    fn test_encode_payload() {
        let mut buffer = [0u8; 32];
        let len = encode_payload("tel:+33612345678", &mut buffer).unwrap();
        assert_eq!(buffer[0], 0x05);
        assert_eq!(&buffer[1..len], b"+33612345678");
    }

    #[test]
    fn test_from_payload_expands_prefix() {
        let uri = Uri::from_payload(b"\x01st.com/stm32").unwrap();
        assert_eq!(uri.as_str(), "http://www.st.com/stm32");
    }

    #[test]
    fn test_from_payload_rejects_unknown_code() {
        assert_eq!(
            Uri::from_payload(b"\x24abc"),
            Err(NdefError::UnknownUriPrefix)
        );
        assert_eq!(Uri::from_payload(b""), Err(NdefError::InvalidPayload));
    }

    #[test]
    fn test_from_record_checks_type() {
        let record = Record::well_known(b"T", b"\x02enhi");
        assert_eq!(Uri::from_record(&record), Err(NdefError::UnexpectedType));
    }

    proptest::proptest! {
        #[test]
        fn prop_uri_survives_abbreviation(
            code in 0usize..URI_PREFIXES.len(),
            rest in "[a-z0-9./]{0,40}",
        ) {
            let mut full: String<128> = String::new();
            full.push_str(URI_PREFIXES[code]).unwrap();
            full.push_str(&rest).unwrap();

            let mut buffer = [0u8; 128];
            let len = encode_payload(&full, &mut buffer).unwrap();
            let decoded = Uri::from_payload(&buffer[..len]).unwrap();
            proptest::prop_assert_eq!(decoded.as_str(), full.as_str());
        }
    }
}
