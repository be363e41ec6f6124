/// D64 format variants and constants

/// Format constants
pub mod constants;

pub use constants::*;

/// D64 image variant, identified by file size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskImageFormat {
    /// 35 tracks, no error information
    D64,
    /// 35 tracks with one error byte per sector appended
    D64WithErrors,
    /// 40 tracks, no error information
    D64Extended,
    /// 40 tracks with one error byte per sector appended
    D64ExtendedWithErrors,
}

impl DiskImageFormat {
    /// Every supported variant
    pub const ALL: [DiskImageFormat; 4] = [
        DiskImageFormat::D64,
        DiskImageFormat::D64WithErrors,
        DiskImageFormat::D64Extended,
        DiskImageFormat::D64ExtendedWithErrors,
    ];

    /// Get the number of tracks
    pub fn num_tracks(&self) -> u8 {
        match self {
            DiskImageFormat::D64 | DiskImageFormat::D64WithErrors => STANDARD_TRACKS,
            DiskImageFormat::D64Extended | DiskImageFormat::D64ExtendedWithErrors => {
                EXTENDED_TRACKS
            }
        }
    }

    /// Does the image carry an error-info table?
    pub fn has_error_info(&self) -> bool {
        matches!(
            self,
            DiskImageFormat::D64WithErrors | DiskImageFormat::D64ExtendedWithErrors
        )
    }

    /// Total sectors on the image
    pub fn total_sectors(&self) -> usize {
        total_sectors(self.num_tracks())
    }

    /// Size of the image file in bytes
    pub fn image_size(&self) -> usize {
        let sectors = self.total_sectors();
        if self.has_error_info() {
            sectors * SECTOR_SIZE + sectors
        } else {
            sectors * SECTOR_SIZE
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            DiskImageFormat::D64 => "D64 (35 tracks)",
            DiskImageFormat::D64WithErrors => "D64 (35 tracks, error info)",
            DiskImageFormat::D64Extended => "D64 (40 tracks)",
            DiskImageFormat::D64ExtendedWithErrors => "D64 (40 tracks, error info)",
        }
    }

    /// Plain variant with the given number of tracks
    pub fn for_tracks(num_tracks: u8) -> Option<Self> {
        match num_tracks {
            STANDARD_TRACKS => Some(DiskImageFormat::D64),
            EXTENDED_TRACKS => Some(DiskImageFormat::D64Extended),
            _ => None,
        }
    }
}

/// Detect the D64 variant from the image length
pub fn detect_format(len: usize) -> Option<DiskImageFormat> {
    DiskImageFormat::ALL
        .into_iter()
        .find(|format| format.image_size() == len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_sizes() {
        assert_eq!(DiskImageFormat::D64.image_size(), 174_848);
        assert_eq!(DiskImageFormat::D64WithErrors.image_size(), 175_531);
        assert_eq!(DiskImageFormat::D64Extended.image_size(), 196_608);
        assert_eq!(DiskImageFormat::D64ExtendedWithErrors.image_size(), 197_376);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(174_848), Some(DiskImageFormat::D64));
        assert_eq!(detect_format(175_531), Some(DiskImageFormat::D64WithErrors));
        assert_eq!(detect_format(196_608), Some(DiskImageFormat::D64Extended));
        assert_eq!(
            detect_format(197_376),
            Some(DiskImageFormat::D64ExtendedWithErrors)
        );
    }

    #[test]
    fn test_detect_invalid_format() {
        assert_eq!(detect_format(0), None);
        assert_eq!(detect_format(174_847), None);
        assert_eq!(detect_format(819_200), None);
    }

    #[test]
    fn test_for_tracks() {
        assert_eq!(DiskImageFormat::for_tracks(35), Some(DiskImageFormat::D64));
        assert_eq!(
            DiskImageFormat::for_tracks(40),
            Some(DiskImageFormat::D64Extended)
        );
        assert_eq!(DiskImageFormat::for_tracks(80), None);
    }
}
