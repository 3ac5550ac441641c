//! NDEF (NFC Data Exchange Format) for the board NFC EEPROM
//!
//! The dual-interface EEPROM on the evaluation board is an NFC Forum Type 5
//! tag. A phone reads its memory as:
//!
//! ```text
//! ┌──────────────────┬──────┬────────┬──────────────────────┬──────┐
//! │ CAPABILITY CONT. │ 0x03 │ LENGTH │ NDEF MESSAGE         │ 0xFE │
//! │ 4 or 8 B         │ 1B   │ 1B/3B  │ records...           │ 1B   │
//! └──────────────────┴──────┴────────┴──────────────────────┴──────┘
//! ```
//!
//! Each record in the message:
//!
//! ```text
//! ┌────────┬──────────┬─────────────┬─────────┬──────┬────┬─────────┐
//! │ HEADER │ TYPE LEN │ PAYLOAD LEN │ ID LEN  │ TYPE │ ID │ PAYLOAD │
//! │ 1B     │ 1B       │ 1B (SR)/4B  │ 0/1B    │ ...  │... │ ...     │
//! └────────┴──────────┴─────────────┴─────────┴──────┴────┴─────────┘
//! ```
//!
//! Supported well-known payloads: URI (with prefix abbreviation), Text,
//! and the SMS and Geo forms of URI records.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod geo;
pub mod message;
pub mod record;
pub mod sms;
pub mod text;
pub mod tlv;
pub mod uri;

pub use geo::Geo;
pub use message::{encode_message, MessageReader};
pub use record::{NdefError, Record, Tnf};
pub use sms::Sms;
pub use text::Text;
pub use tlv::CapabilityContainer;
pub use uri::Uri;
