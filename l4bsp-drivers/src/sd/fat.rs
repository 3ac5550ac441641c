//! FAT file helpers over `embedded-sdmmc`

use embedded_sdmmc::{BlockDevice, Mode, TimeSource, Timestamp, VolumeIdx, VolumeManager};
use l4bsp_core::BspError;

/// Fixed timestamp for boards without a running RTC
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 54, // 2024
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// FAT round-trip errors
#[derive(Debug)]
pub enum FatError<E: core::fmt::Debug> {
    /// Filesystem or block device failure
    Fs(embedded_sdmmc::Error<E>),
    /// Read-back differs from what was written
    Mismatch {
        /// Offset of the first differing byte
        offset: usize,
    },
    /// Scratch buffer is empty
    NoScratch,
}

impl<E: core::fmt::Debug> From<embedded_sdmmc::Error<E>> for FatError<E> {
    fn from(e: embedded_sdmmc::Error<E>) -> Self {
        FatError::Fs(e)
    }
}

impl<E: core::fmt::Debug> From<FatError<E>> for BspError {
    fn from(e: FatError<E>) -> Self {
        match e {
            FatError::Fs(embedded_sdmmc::Error::DeviceError(_)) => BspError::Bus,
            FatError::Fs(embedded_sdmmc::Error::NotFound) => BspError::NotPresent,
            FatError::NoScratch => BspError::InvalidParameter,
            _ => BspError::Error,
        }
    }
}

/// First offset where `read` differs from `expected`
pub fn first_mismatch(expected: &[u8], read: &[u8]) -> Option<usize> {
    expected
        .iter()
        .zip(read)
        .position(|(a, b)| a != b)
        .or_else(|| (expected.len() != read.len()).then(|| expected.len().min(read.len())))
}

/// Create (or truncate) `name` in the root directory of the first volume,
/// write `data`, then read it back through `scratch` and compare
///
/// Returns the number of bytes verified.
pub fn write_then_verify<D, T, const DIRS: usize, const FILES: usize, const VOLS: usize>(
    volume_mgr: &VolumeManager<D, T, DIRS, FILES, VOLS>,
    name: &str,
    data: &[u8],
    scratch: &mut [u8],
) -> Result<usize, FatError<D::Error>>
where
    D: BlockDevice,
    T: TimeSource,
{
    if scratch.is_empty() {
        return Err(FatError::NoScratch);
    }

    let volume = volume_mgr.open_volume(VolumeIdx(0))?;
    let root = volume.open_root_dir()?;

    {
        let file = root.open_file_in_dir(name, Mode::ReadWriteCreateOrTruncate)?;
        file.write(data)?;
        file.close()?;
    }

    let file = root.open_file_in_dir(name, Mode::ReadOnly)?;
    let mut offset = 0;
    while !file.is_eof() {
        let n = file.read(scratch)?;
        if n == 0 {
            break;
        }
        let expected = data.get(offset..offset + n).unwrap_or(&data[offset.min(data.len())..]);
        if let Some(pos) = first_mismatch(expected, &scratch[..n]) {
            return Err(FatError::Mismatch {
                offset: offset + pos,
            });
        }
        offset += n;
    }
    file.close()?;

    if offset != data.len() {
        return Err(FatError::Mismatch { offset });
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sd::card::tests::MockHost;
    use crate::sd::card::NoDetect;
    use crate::sd::{SdBlockDevice, SdCard};
    use embedded_sdmmc::{Block, BlockCount, BlockIdx};

    const PART_START: usize = 1;
    const PART_BLOCKS: u16 = 4200;
    const FAT_BLOCKS: u16 = 17;
    const ROOT_ENTRIES: u16 = 512;

    const MARKER: &[u8; 8] = b"L4BSP-SD";

    /// MBR plus a FAT16 volume with one block per cluster and an empty root
    fn fat16_card() -> SdBlockDevice<MockHost, NoDetect> {
        let mut host = MockHost::new(PART_START + PART_BLOCKS as usize);
        host.busy_polls = 0;

        let mbr = &mut host.blocks[0];
        mbr[446 + 4] = 0x06;
        mbr[446 + 8..446 + 12].copy_from_slice(&(PART_START as u32).to_le_bytes());
        mbr[446 + 12..446 + 16].copy_from_slice(&u32::from(PART_BLOCKS).to_le_bytes());
        mbr[510..512].copy_from_slice(&[0x55, 0xAA]);

        let bpb = &mut host.blocks[PART_START];
        bpb[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        bpb[3..11].copy_from_slice(b"L4BSP   ");
        bpb[11..13].copy_from_slice(&512u16.to_le_bytes());
        bpb[13] = 1;
        bpb[14..16].copy_from_slice(&1u16.to_le_bytes());
        bpb[16] = 2;
        bpb[17..19].copy_from_slice(&ROOT_ENTRIES.to_le_bytes());
        bpb[19..21].copy_from_slice(&PART_BLOCKS.to_le_bytes());
        bpb[21] = 0xF8;
        bpb[22..24].copy_from_slice(&FAT_BLOCKS.to_le_bytes());
        bpb[43..54].copy_from_slice(b"NO NAME    ");
        bpb[510..512].copy_from_slice(&[0x55, 0xAA]);

        for fat in 0..2 {
            let first = PART_START + 1 + fat * FAT_BLOCKS as usize;
            host.blocks[first][0..4].copy_from_slice(&[0xF8, 0xFF, 0xFF, 0xFF]);
        }

        let mut card = SdCard::new(host, NoDetect);
        card.init().unwrap();
        SdBlockDevice::new(card)
    }

    /// Flips one byte of every block read back that starts with [`MARKER`]
    struct CorruptingReads<D> {
        inner: D,
        at: usize,
    }

    impl<D: BlockDevice> BlockDevice for CorruptingReads<D> {
        type Error = D::Error;

        fn read(&self, blocks: &mut [Block], start: BlockIdx) -> Result<(), Self::Error> {
            self.inner.read(blocks, start)?;
            for block in blocks.iter_mut() {
                if block.contents.starts_with(MARKER) {
                    block.contents[self.at] ^= 0xFF;
                }
            }
            Ok(())
        }

        fn write(&self, blocks: &[Block], start: BlockIdx) -> Result<(), Self::Error> {
            self.inner.write(blocks, start)
        }

        fn num_blocks(&self) -> Result<BlockCount, Self::Error> {
            self.inner.num_blocks()
        }
    }

    fn payload() -> std::vec::Vec<u8> {
        let mut data: std::vec::Vec<u8> = (0..700u32).map(|i| (i * 7 + 3) as u8).collect();
        data[..MARKER.len()].copy_from_slice(MARKER);
        data
    }

    #[test]
    fn test_first_mismatch() {
        assert_eq!(first_mismatch(b"abc", b"abc"), None);
        assert_eq!(first_mismatch(b"abc", b"abd"), Some(2));
        assert_eq!(first_mismatch(b"abc", b"ab"), Some(2));
        assert_eq!(first_mismatch(b"ab", b"abc"), Some(2));
    }

    #[test]
    fn test_timestamp_is_2024() {
        assert_eq!(FixedTimeSource.get_timestamp().year_since_1970, 54);
    }

    #[test]
    fn test_write_then_verify_on_fat16() {
        let volume_mgr = VolumeManager::new(fat16_card(), FixedTimeSource);
        let data = payload();
        let mut scratch = [0u8; 64];

        let n = write_then_verify(&volume_mgr, "CHECK.TXT", &data, &mut scratch).unwrap();
        assert_eq!(n, data.len());

        // Rewriting truncates the old contents
        let n = write_then_verify(&volume_mgr, "CHECK.TXT", &data[..100], &mut scratch).unwrap();
        assert_eq!(n, 100);
    }

    #[test]
    fn test_corrupted_read_back_reports_offset() {
        let device = CorruptingReads {
            inner: fat16_card(),
            at: 10,
        };
        let volume_mgr = VolumeManager::new(device, FixedTimeSource);
        let mut scratch = [0u8; 64];

        let result = write_then_verify(&volume_mgr, "CHECK.TXT", &payload(), &mut scratch);
        assert!(matches!(result, Err(FatError::Mismatch { offset: 10 })));
    }

    #[test]
    fn test_empty_scratch_rejected() {
        let volume_mgr = VolumeManager::new(fat16_card(), FixedTimeSource);
        let result = write_then_verify(&volume_mgr, "CHECK.TXT", b"x", &mut []);
        assert!(matches!(result, Err(FatError::NoScratch)));
    }

    #[test]
    fn test_error_mapping() {
        let e: FatError<BspError> = FatError::Fs(embedded_sdmmc::Error::DeviceError(BspError::Timeout));
        assert_eq!(BspError::from(e), BspError::Bus);
        let e: FatError<BspError> = FatError::Mismatch { offset: 3 };
        assert_eq!(BspError::from(e), BspError::Error);
    }
}
