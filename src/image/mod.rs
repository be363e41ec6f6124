/// D64 image data structures

/// Block Availability Map
pub mod bam;

pub use bam::Bam;

use crate::error::{DiskError, Result};
use crate::format::{
    detect_format, sectors_per_track, track_start, DiskImageFormat, BAM_SECTOR, DIRECTORY_TRACK,
    FIRST_DIRECTORY_SECTOR, SECTOR_SIZE,
};
use crate::petscii;
use std::path::Path;
use tracing::debug;

/// In-memory D64 image
#[derive(Debug, Clone)]
pub struct DiskImage {
    /// Image variant
    pub(crate) format: DiskImageFormat,
    /// Sector data, track 1 sector 0 first
    pub(crate) data: Vec<u8>,
    /// One error byte per sector, if the image carries them
    pub(crate) error_info: Option<Vec<u8>>,
    /// Has the image been modified?
    pub(crate) changed: bool,
    /// Original filename if loaded from disk
    pub(crate) filename: Option<String>,
}

impl DiskImage {
    /// Open a D64 file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::io::reader::read_d64(path)
    }

    /// Build an image from raw file contents
    ///
    /// The variant is detected from the length.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self> {
        let format = detect_format(bytes.len()).ok_or_else(|| {
            DiskError::invalid_format(format!("{} bytes is not a valid D64 size", bytes.len()))
        })?;

        let error_info = if format.has_error_info() {
            Some(bytes.split_off(format.total_sectors() * SECTOR_SIZE))
        } else {
            None
        };

        debug!(format = format.name(), "parsed disk image");

        Ok(Self {
            format,
            data: bytes,
            error_info,
            changed: false,
            filename: None,
        })
    }

    /// Create a freshly formatted image
    ///
    /// `name` and `id` are ASCII; the name is truncated to 16 characters
    /// and the ID to 2.
    pub fn create(format: DiskImageFormat, name: &str, id: &str) -> Result<Self> {
        let name = petscii::from_ascii(name)?;
        let id = petscii::from_ascii(id)?;

        let sectors = format.total_sectors();
        let mut image = Self {
            format,
            data: vec![0u8; sectors * SECTOR_SIZE],
            error_info: format.has_error_info().then(|| vec![0u8; sectors]),
            changed: true,
            filename: None,
        };

        let bam = Bam::formatted(&name, &id, format.num_tracks());
        image.write_bam(&bam)?;

        // Empty directory sector: end of chain, nothing used
        let mut dir = [0u8; SECTOR_SIZE];
        dir[1] = 0xFF;
        image.write_sector(DIRECTORY_TRACK, FIRST_DIRECTORY_SECTOR, &dir)?;

        debug!(format = format.name(), "formatted new disk image");
        Ok(image)
    }

    /// Get the image variant
    pub fn format(&self) -> DiskImageFormat {
        self.format
    }

    /// Get the number of tracks
    pub fn num_tracks(&self) -> u8 {
        self.format.num_tracks()
    }

    /// Get the path the image was loaded from
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Validate a track/sector pair and return the sector index
    fn sector_index(&self, track: u8, sector: u8) -> Result<usize> {
        let num_tracks = self.num_tracks();
        if track == 0 || track > num_tracks {
            return Err(DiskError::InvalidTrack {
                track,
                max: num_tracks,
            });
        }

        let count = sectors_per_track(track);
        if sector >= count {
            return Err(DiskError::InvalidSector {
                track,
                sector,
                max: count - 1,
            });
        }

        Ok(track_start(track) + sector as usize)
    }

    /// Check whether a track/sector pair exists on this image
    pub fn is_valid_sector(&self, track: u8, sector: u8) -> bool {
        self.sector_index(track, sector).is_ok()
    }

    /// Read sector data
    pub fn read_sector(&self, track: u8, sector: u8) -> Result<&[u8]> {
        let offset = self.sector_index(track, sector)? * SECTOR_SIZE;
        Ok(&self.data[offset..offset + SECTOR_SIZE])
    }

    /// Write sector data
    ///
    /// Shorter data is zero-filled to the sector size; longer data is an
    /// error.
    pub fn write_sector(&mut self, track: u8, sector: u8, data: &[u8]) -> Result<()> {
        if data.len() > SECTOR_SIZE {
            return Err(DiskError::invalid_format(format!(
                "sector data is {} bytes (max: {})",
                data.len(),
                SECTOR_SIZE
            )));
        }

        let offset = self.sector_index(track, sector)? * SECTOR_SIZE;
        let target = &mut self.data[offset..offset + SECTOR_SIZE];
        target[..data.len()].copy_from_slice(data);
        target[data.len()..].fill(0);

        self.changed = true;
        Ok(())
    }

    /// Error byte recorded for a sector, if the image carries error info
    pub fn error_info(&self, track: u8, sector: u8) -> Option<u8> {
        let index = self.sector_index(track, sector).ok()?;
        self.error_info.as_ref()?.get(index).copied()
    }

    /// Read the BAM
    pub fn bam(&self) -> Result<Bam> {
        let sector = self.read_sector(DIRECTORY_TRACK, BAM_SECTOR)?;
        Bam::from_sector(sector, self.num_tracks())
    }

    /// Write the BAM back to 18/0
    pub fn write_bam(&mut self, bam: &Bam) -> Result<()> {
        self.write_sector(DIRECTORY_TRACK, BAM_SECTOR, bam.as_bytes())
    }

    /// Disk name as ASCII
    pub fn disk_name(&self) -> Result<String> {
        Ok(self.bam()?.disk_name())
    }

    /// Free blocks as reported in a directory listing
    pub fn blocks_free(&self) -> Result<usize> {
        Ok(self.bam()?.blocks_free())
    }

    /// Serialize the image to file contents
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.data.clone();
        if let Some(errors) = &self.error_info {
            bytes.extend_from_slice(errors);
        }
        bytes
    }

    /// Save the image to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        crate::io::writer::write_d64(self, path)?;
        self.changed = false;
        Ok(())
    }

    /// Check if the image has been modified
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Mark the image as unchanged
    pub fn mark_unchanged(&mut self) {
        self.changed = false;
    }

    /// Total size of the image in bytes
    pub fn total_size(&self) -> usize {
        self.format.image_size()
    }
}
