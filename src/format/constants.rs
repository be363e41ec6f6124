/// D64 geometry and layout constants

/// Bytes per sector
pub const SECTOR_SIZE: usize = 256;

/// Data bytes carried by each sector of a file chain
pub const DATA_BYTES_PER_SECTOR: usize = SECTOR_SIZE - 2;

/// Track holding the BAM and the directory
pub const DIRECTORY_TRACK: u8 = 18;

/// Sector holding the BAM and disk header
pub const BAM_SECTOR: u8 = 0;

/// First directory sector
pub const FIRST_DIRECTORY_SECTOR: u8 = 1;

/// Tracks on a standard disk
pub const STANDARD_TRACKS: u8 = 35;

/// Tracks on an extended disk
pub const EXTENDED_TRACKS: u8 = 40;

/// Sector step between consecutive directory sectors
pub const DIRECTORY_INTERLEAVE: u8 = 3;

/// Sector step between consecutive file sectors (1541 default)
pub const DATA_INTERLEAVE: u8 = 10;

/// Size of a directory entry
pub const DIR_ENTRY_SIZE: usize = 32;

/// Directory entries per sector
pub const DIR_ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIR_ENTRY_SIZE;

/// Maximum filename length
pub const FILENAME_LENGTH: usize = 16;

/// Padding byte used for names (shifted space)
pub const PAD_BYTE: u8 = 0xA0;

/// DOS version byte written to the BAM
pub const DOS_VERSION: u8 = b'A';

/// DOS type written to the header
pub const DOS_TYPE: &[u8; 2] = b"2A";

/// BAM offsets
pub mod bam {
    /// Start of the per-track entries for tracks 1-35
    pub const ENTRIES: usize = 0x04;
    /// Start of the SpeedDOS entries for tracks 36-40
    pub const EXTENDED_ENTRIES: usize = 0xC0;
    /// Size of one BAM entry (free count + 3 bitmap bytes)
    pub const ENTRY_SIZE: usize = 4;
    /// Disk name
    pub const DISK_NAME: usize = 0x90;
    /// Disk ID
    pub const DISK_ID: usize = 0xA2;
    /// DOS type
    pub const DOS_TYPE: usize = 0xA5;
}

/// Directory entry field offsets
pub mod entry {
    /// Link to the next directory sector (first entry of a sector only)
    pub const NEXT_TRACK: usize = 0x00;
    /// File type byte
    pub const FILE_TYPE: usize = 0x02;
    /// First track of the file
    pub const FIRST_TRACK: usize = 0x03;
    /// First sector of the file
    pub const FIRST_SECTOR: usize = 0x04;
    /// Filename
    pub const NAME: usize = 0x05;
    /// First side sector (REL files)
    pub const SIDE_TRACK: usize = 0x15;
    /// Record length (REL files)
    pub const RECORD_LENGTH: usize = 0x17;
    /// Size in blocks (little endian)
    pub const BLOCKS: usize = 0x1E;
}

/// Number of sectors on a track (1-based track numbers)
#[inline]
pub fn sectors_per_track(track: u8) -> u8 {
    match track {
        1..=17 => 21,
        18..=24 => 19,
        25..=30 => 18,
        _ => 17,
    }
}

/// Index of the first sector of a track, counted from track 1 sector 0
pub fn track_start(track: u8) -> usize {
    (1..track).map(|t| sectors_per_track(t) as usize).sum()
}

/// Byte offset of a track within the image
#[inline]
pub fn track_offset(track: u8) -> usize {
    track_start(track) * SECTOR_SIZE
}

/// Total sectors on an image with the given number of tracks
#[inline]
pub fn total_sectors(num_tracks: u8) -> usize {
    track_start(num_tracks + 1)
}

/// Blocks needed to store a file of the given length
///
/// An empty file still occupies one block.
pub fn blocks_for_length(len: usize) -> usize {
    len.div_ceil(DATA_BYTES_PER_SECTOR).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sectors_per_track_zones() {
        assert_eq!(sectors_per_track(1), 21);
        assert_eq!(sectors_per_track(17), 21);
        assert_eq!(sectors_per_track(18), 19);
        assert_eq!(sectors_per_track(24), 19);
        assert_eq!(sectors_per_track(25), 18);
        assert_eq!(sectors_per_track(30), 18);
        assert_eq!(sectors_per_track(31), 17);
        assert_eq!(sectors_per_track(40), 17);
    }

    #[test]
    fn test_total_sectors() {
        assert_eq!(total_sectors(35), 683);
        assert_eq!(total_sectors(40), 768);
    }

    #[test]
    fn test_track_offset() {
        assert_eq!(track_offset(1), 0);
        assert_eq!(track_offset(2), 21 * 256);
        // BAM lives at 0x16500 on every D64
        assert_eq!(track_offset(18), 0x16500);
    }

    #[test]
    fn test_blocks_for_length() {
        assert_eq!(blocks_for_length(0), 1);
        assert_eq!(blocks_for_length(1), 1);
        assert_eq!(blocks_for_length(254), 1);
        assert_eq!(blocks_for_length(255), 2);
        assert_eq!(blocks_for_length(254 * 10), 10);
    }
}
