//! One-shot CRC helpers

use l4bsp_hal::crc::CrcUnit;

/// CRC of `data` from the unit's initial value
pub fn checksum<C: CrcUnit>(unit: &mut C, data: &[u8]) -> u32 {
    unit.reset();
    unit.feed_bytes(data)
}

/// CRC of 32-bit words, each fed most significant byte first
pub fn checksum_words<C: CrcUnit>(unit: &mut C, data: &[u32]) -> u32 {
    unit.reset();
    unit.feed_words(data)
}

/// CRC over several buffers as if they were contiguous
pub fn checksum_chunks<'a, C, I>(unit: &mut C, chunks: I) -> u32
where
    C: CrcUnit,
    I: IntoIterator<Item = &'a [u8]>,
{
    unit.reset();
    let mut crc = unit.feed_bytes(&[]);
    for chunk in chunks {
        crc = unit.feed_bytes(chunk);
    }
    crc
}
