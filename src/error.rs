use thiserror::Error;

/// Result type alias for disk image operations
pub type Result<T> = std::result::Result<T, DiskError>;

/// Errors that can occur when working with D64 images
#[derive(Debug, Error)]
pub enum DiskError {
    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unrecognized image format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Track number outside the image geometry
    #[error("Invalid track {track} (valid: 1-{max})")]
    InvalidTrack {
        /// Track number
        track: u8,
        /// Highest track on the image
        max: u8,
    },

    /// Sector number outside the track
    #[error("Invalid sector {sector} on track {track} (max: {max})")]
    InvalidSector {
        /// Track number
        track: u8,
        /// Sector number
        sector: u8,
        /// Highest sector on the track
        max: u8,
    },

    /// Broken sector chain or directory structure
    #[error("Parse error at {track}/{sector}: {message}")]
    ParseError {
        /// Track where the error was found
        track: u8,
        /// Sector where the error was found
        sector: u8,
        /// Error message
        message: String,
    },

    /// File not found in the directory
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A file with the same name already exists
    #[error("File exists: {0}")]
    FileExists(String),

    /// File is locked against scratching or replacing
    #[error("File locked: {0}")]
    FileLocked(String),

    /// Not enough free blocks for the file
    #[error("Disk full: {needed} blocks needed, {free} free")]
    DiskFull {
        /// Blocks required
        needed: usize,
        /// Blocks available
        free: usize,
    },

    /// No free directory slot and no room on the directory track
    #[error("Directory full")]
    DirectoryFull,

    /// Filename cannot be encoded
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

impl DiskError {
    /// Create a parse error at a sector
    pub fn parse<S: Into<String>>(track: u8, sector: u8, message: S) -> Self {
        DiskError::ParseError {
            track,
            sector,
            message: message.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        DiskError::InvalidFormat(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiskError::InvalidTrack { track: 41, max: 35 };
        assert_eq!(err.to_string(), "Invalid track 41 (valid: 1-35)");
    }

    #[test]
    fn test_parse_error() {
        let err = DiskError::parse(17, 3, "Sector chain loops");
        assert_eq!(err.to_string(), "Parse error at 17/3: Sector chain loops");
    }

    #[test]
    fn test_disk_full_display() {
        let err = DiskError::DiskFull { needed: 700, free: 664 };
        assert_eq!(err.to_string(), "Disk full: 700 blocks needed, 664 free");
    }
}
