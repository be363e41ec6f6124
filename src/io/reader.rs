/// D64 file reader

use crate::error::Result;
use crate::image::DiskImage;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read a D64 file from disk
pub fn read_d64<P: AsRef<Path>>(path: P) -> Result<DiskImage> {
    let path = path.as_ref();
    let mut file = File::open(path)?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    debug!(path = %path.display(), len = bytes.len(), "read disk image");

    let mut image = DiskImage::from_bytes(bytes)?;
    image.filename = Some(path.display().to_string());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiskError;
    use crate::format::DiskImageFormat;

    #[test]
    fn test_read_missing_file() {
        let result = read_d64("/nonexistent/disk.d64");
        assert!(matches!(result, Err(DiskError::Io(_))));
    }

    #[test]
    fn test_read_records_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.d64");
        std::fs::write(&path, vec![0u8; 174_848]).unwrap();

        let image = read_d64(&path).unwrap();
        assert_eq!(image.format(), DiskImageFormat::D64);
        assert_eq!(image.filename(), Some(path.display().to_string().as_str()));
    }

    #[test]
    fn test_read_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.d64");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        assert!(matches!(read_d64(&path), Err(DiskError::InvalidFormat(_))));
    }
}
