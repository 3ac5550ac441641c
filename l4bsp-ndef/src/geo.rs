//! Geo record: a URI record of the form `geo:<latitude>,<longitude>`
//!
//! Coordinates are kept in millionths of a degree so they print with exactly
//! six decimal places and survive a round trip without floating point.

use core::fmt::Write;

use heapless::String;

use crate::record::{NdefError, Record};
use crate::uri::URI_TYPE;

/// URI scheme of a geo record
pub const GEO_SCHEME: &str = "geo:";

/// Encoded payload upper bound
pub const MAX_GEO_PAYLOAD: usize = 48;

const MICRO: i64 = 1_000_000;

/// A WGS-84 position in microdegrees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geo {
    pub latitude_e6: i32,
    pub longitude_e6: i32,
}

fn write_fixed<const N: usize>(out: &mut String<N>, value: i32) -> Result<(), NdefError> {
    let sign = if value < 0 { "-" } else { "" };
    let abs = (value as i64).abs();
    write!(out, "{}{}.{:06}", sign, abs / MICRO, abs % MICRO).map_err(|_| NdefError::Overflow)
}

/// Parse a decimal degree string into microdegrees, ignoring digits past
/// the sixth decimal place
fn parse_fixed(s: &str) -> Result<i64, NdefError> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) || whole.len() > 3 {
        return Err(NdefError::InvalidPayload);
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NdefError::InvalidPayload);
    }

    let mut value: i64 = 0;
    for b in whole.bytes() {
        value = value * 10 + (b - b'0') as i64;
    }
    let mut scale = MICRO;
    let mut fraction: i64 = 0;
    for b in frac.bytes().take(6) {
        scale /= 10;
        fraction += (b - b'0') as i64 * scale;
    }
    let micro = value * MICRO + fraction;
    Ok(if negative { -micro } else { micro })
}

impl Geo {
    /// Position from microdegrees, checking the coordinate ranges
    pub fn new(latitude_e6: i32, longitude_e6: i32) -> Result<Self, NdefError> {
        if latitude_e6.unsigned_abs() > 90_000_000 || longitude_e6.unsigned_abs() > 180_000_000 {
            return Err(NdefError::InvalidPayload);
        }
        Ok(Self {
            latitude_e6,
            longitude_e6,
        })
    }

    /// Encode the URI record payload into `buffer`
    pub fn encode_payload(&self, buffer: &mut [u8]) -> Result<usize, NdefError> {
        let mut uri: String<MAX_GEO_PAYLOAD> = String::new();
        uri.push_str(GEO_SCHEME).map_err(|_| NdefError::Overflow)?;
        write_fixed(&mut uri, self.latitude_e6)?;
        uri.push(',').map_err(|_| NdefError::Overflow)?;
        write_fixed(&mut uri, self.longitude_e6)?;
        crate::uri::encode_payload(&uri, buffer)
    }

    /// Parse a URI record payload
    ///
    /// URI parameters after `;` or `?` (uncertainty, labels) are ignored.
    pub fn from_payload(payload: &[u8]) -> Result<Self, NdefError> {
        let (&code, rest) = payload.split_first().ok_or(NdefError::InvalidPayload)?;
        if code != 0 {
            return Err(NdefError::UnexpectedType);
        }
        let uri = core::str::from_utf8(rest).map_err(|_| NdefError::InvalidPayload)?;
        let coords = uri
            .strip_prefix(GEO_SCHEME)
            .ok_or(NdefError::UnexpectedType)?;
        let coords = coords.split([';', '?']).next().unwrap_or(coords);

        let mut parts = coords.split(',');
        let lat = parts.next().ok_or(NdefError::InvalidPayload)?;
        let long = parts.next().ok_or(NdefError::InvalidPayload)?;
        // An optional altitude may follow

        let lat = i32::try_from(parse_fixed(lat)?).map_err(|_| NdefError::InvalidPayload)?;
        let long = i32::try_from(parse_fixed(long)?).map_err(|_| NdefError::InvalidPayload)?;
        Self::new(lat, long)
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
    fn test_geo_six_decimals() {
        let geo = Geo::new(43_604_652, 1_444_209).unwrap();
        let mut buffer = [0u8; MAX_GEO_PAYLOAD];
        let len = geo.encode_payload(&mut buffer).unwrap();
        assert_eq!(buffer[0], 0x00);
        assert_eq!(&buffer[1..len], b"geo:43.604652,1.444209");
    }

    #[test]
    fn test_geo_negative_small_values() {
        let geo = Geo::new(-500, -122_419_416).unwrap();
        let mut buffer = [0u8; MAX_GEO_PAYLOAD];
        let len = geo.encode_payload(&mut buffer).unwrap();
        assert_eq!(&buffer[1..len], b"geo:-0.000500,-122.419416");
    }

    #[test]
    fn test_geo_parse_short_fraction_and_params() {
        let geo = Geo::from_payload(b"\x00geo:48.85,2.35;u=30").unwrap();
        assert_eq!(geo.latitude_e6, 48_850_000);
        assert_eq!(geo.longitude_e6, 2_350_000);

        let geo = Geo::from_payload(b"\x00geo:-33.8688197,151.2092955,12").unwrap();
        assert_eq!(geo.latitude_e6, -33_868_819);
        assert_eq!(geo.longitude_e6, 151_209_295);
    }

    #[test]
    fn test_geo_rejects_out_of_range() {
        assert_eq!(
            Geo::from_payload(b"\x00geo:91.0,0.0"),
            Err(NdefError::InvalidPayload)
        );
        assert_eq!(Geo::new(0, 180_000_001), Err(NdefError::InvalidPayload));
    }

    #[test]
    fn test_geo_rejects_garbage() {
        assert_eq!(
            Geo::from_payload(b"\x00geo:north,east"),
            Err(NdefError::InvalidPayload)
        );
        assert_eq!(
            Geo::from_payload(b"\x00geo:1.0"),
            Err(NdefError::InvalidPayload)
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_geo_position_survives_encoding(
            lat in -90_000_000i32..=90_000_000,
            long in -180_000_000i32..=180_000_000,
        ) {
            let geo = Geo::new(lat, long).unwrap();
            let mut buffer = [0u8; MAX_GEO_PAYLOAD];
            let len = geo.encode_payload(&mut buffer).unwrap();
            proptest::prop_assert_eq!(Geo::from_payload(&buffer[..len]).unwrap(), geo);
        }
    }
}
