//! NDEF messages: a sequence of records framed by the MB and ME flags

use crate::record::{NdefError, Record};

/// Encode `records` as one message, setting MB on the first record and ME
/// on the last
///
/// An empty slice encodes a single empty record, which is how an empty
/// message is written to a tag.
pub fn encode_message(records: &[Record<'_>], buffer: &mut [u8]) -> Result<usize, NdefError> {
    if records.is_empty() {
        let empty = Record {
            tnf: crate::record::Tnf::Empty,
            record_type: &[],
            id: &[],
            payload: &[],
        };
        return empty.encode(true, true, buffer);
    }

    let last = records.len() - 1;
    let mut pos = 0;
    for (index, record) in records.iter().enumerate() {
        pos += record.encode(index == 0, index == last, &mut buffer[pos..])?;
    }
    Ok(pos)
}

/// Bytes needed to encode `records` as a message
pub fn message_len(records: &[Record<'_>]) -> usize {
    if records.is_empty() {
        3
    } else {
        records.iter().map(Record::encoded_len).sum()
    }
}

/// Iterator over the records of an encoded message
///
/// Stops after the record carrying ME. Yields an error (once) if the
/// framing is broken.
#[derive(Debug, Clone)]
pub struct MessageReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    first: bool,
    done: bool,
}

impl<'a> MessageReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            first: true,
            done: false,
        }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for MessageReader<'a> {
    type Item = Result<Record<'a>, NdefError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.pos >= self.bytes.len() {
            self.done = true;
            // Ran out of bytes before a record with ME
            return Some(Err(NdefError::Truncated));
        }

        match Record::decode(&self.bytes[self.pos..]) {
            Ok((record, header, used)) => {
                if header.message_begin() != self.first {
                    self.done = true;
                    return Some(Err(NdefError::InvalidHeader));
                }
                self.first = false;
                self.pos += used;
                if header.message_end() {
                    self.done = true;
                }
                Some(Ok(record))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FLAG_MB, FLAG_ME, Tnf};

    #[test]
    fn test_message_flags() {
        let records = [
            Record::well_known(b"U", b"\x04st.com"),
            Record::well_known(b"T", b"\x02enA"),
            Record::well_known(b"T", b"\x02enB"),
        ];
        let mut buffer = [0u8; 64];
        let len = encode_message(&records, &mut buffer).unwrap();
        assert_eq!(len, message_len(&records));

        let first = buffer[0];
        assert_ne!(first & FLAG_MB, 0);
        assert_eq!(first & FLAG_ME, 0);

        let decoded: heapless::Vec<Record<'_>, 4> = MessageReader::new(&buffer[..len])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded.as_slice(), &records);
    }

    #[test]
    fn test_single_record_has_both_flags() {
        let mut buffer = [0u8; 16];
        encode_message(&[Record::well_known(b"U", b"\x00x")], &mut buffer).unwrap();
        assert_eq!(buffer[0] & (FLAG_MB | FLAG_ME), FLAG_MB | FLAG_ME);
    }

    #[test]
    fn test_empty_message() {
        let mut buffer = [0u8; 8];
        let len = encode_message(&[], &mut buffer).unwrap();
        assert_eq!(&buffer[..len], &[0xD0, 0x00, 0x00]);

        let mut reader = MessageReader::new(&buffer[..len]);
        assert_eq!(reader.next().unwrap().unwrap().tnf, Tnf::Empty);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_reader_stops_at_message_end() {
        let mut buffer = [0u8; 32];
        let len = encode_message(&[Record::well_known(b"U", b"\x00x")], &mut buffer).unwrap();
        // Trailing junk after ME is not read
        buffer[len] = 0xFF;

        let mut reader = MessageReader::new(&buffer[..len + 1]);
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().is_none());
        assert_eq!(reader.position(), len);
    }

    #[test]
    fn test_reader_missing_message_end() {
        let mut buffer = [0u8; 16];
        let record = Record::well_known(b"U", b"\x00x");
        let len = record.encode(true, false, &mut buffer).unwrap();

        let mut reader = MessageReader::new(&buffer[..len]);
        assert!(reader.next().unwrap().is_ok());
        assert_eq!(reader.next(), Some(Err(NdefError::Truncated)));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_reader_rejects_missing_begin() {
        let mut buffer = [0u8; 16];
        let record = Record::well_known(b"U", b"\x00x");
        let len = record.encode(false, true, &mut buffer).unwrap();

        let mut reader = MessageReader::new(&buffer[..len]);
        assert_eq!(reader.next(), Some(Err(NdefError::InvalidHeader)));
    }
}
