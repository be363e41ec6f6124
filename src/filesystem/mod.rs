/// Filesystem implementations

pub mod cbm;

pub use cbm::{matches_pattern, CbmFileSystem};

use crate::error::{DiskError, Result};
use crate::format::constants::entry;
use crate::format::FILENAME_LENGTH;
use crate::petscii;
use std::fmt;
use std::str::FromStr;

/// File type codes (low nibble of the directory type byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Deleted (0)
    Del,
    /// Sequential (1)
    Seq,
    /// Program (2)
    Prg,
    /// User (3)
    Usr,
    /// Relative (4)
    Rel,
    /// Unknown/other type
    Other(u8),
}

impl FileType {
    /// Parse the file type from the directory type byte
    pub fn from_type_byte(byte: u8) -> Self {
        match byte & 0x0F {
            0 => FileType::Del,
            1 => FileType::Seq,
            2 => FileType::Prg,
            3 => FileType::Usr,
            4 => FileType::Rel,
            other => FileType::Other(other),
        }
    }

    /// Get type code
    pub fn type_code(&self) -> u8 {
        match self {
            FileType::Del => 0,
            FileType::Seq => 1,
            FileType::Prg => 2,
            FileType::Usr => 3,
            FileType::Rel => 4,
            FileType::Other(code) => *code & 0x0F,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Del => write!(f, "DEL"),
            FileType::Seq => write!(f, "SEQ"),
            FileType::Prg => write!(f, "PRG"),
            FileType::Usr => write!(f, "USR"),
            FileType::Rel => write!(f, "REL"),
            FileType::Other(_) => write!(f, "???"),
        }
    }
}

impl FromStr for FileType {
    type Err = DiskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DEL" => Ok(FileType::Del),
            "SEQ" => Ok(FileType::Seq),
            "PRG" => Ok(FileType::Prg),
            "USR" => Ok(FileType::Usr),
            "REL" => Ok(FileType::Rel),
            _ => Err(DiskError::InvalidFilename(format!("unknown file type: {}", s))),
        }
    }
}

/// Directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Slot index in the directory chain (8 per sector)
    pub index: usize,
    /// Filename as ASCII
    pub name: String,
    /// Filename as stored (PETSCII, padded)
    pub raw_name: [u8; FILENAME_LENGTH],
    /// File type
    pub file_type: FileType,
    /// Closed flag (unset marks a "splat" file)
    pub closed: bool,
    /// Locked flag
    pub locked: bool,
    /// First data track
    pub first_track: u8,
    /// First data sector
    pub first_sector: u8,
    /// First side sector track (REL files)
    pub side_track: u8,
    /// First side sector (REL files)
    pub side_sector: u8,
    /// Size in blocks as recorded in the directory
    pub blocks: u16,
}

impl DirEntry {
    /// Parse a 32-byte directory slot, returning None for empty slots
    pub fn parse(index: usize, data: &[u8]) -> Option<Self> {
        if data.len() < crate::format::DIR_ENTRY_SIZE {
            return None;
        }

        let type_byte = data[entry::FILE_TYPE];
        if type_byte == 0 {
            return None;
        }

        let mut raw_name = [0u8; FILENAME_LENGTH];
        raw_name.copy_from_slice(&data[entry::NAME..entry::NAME + FILENAME_LENGTH]);

        Some(Self {
            index,
            name: petscii::to_ascii(&raw_name),
            raw_name,
            file_type: FileType::from_type_byte(type_byte),
            closed: type_byte & 0x80 != 0,
            locked: type_byte & 0x40 != 0,
            first_track: data[entry::FIRST_TRACK],
            first_sector: data[entry::FIRST_SECTOR],
            side_track: data[entry::SIDE_TRACK],
            side_sector: data[entry::SIDE_TRACK + 1],
            blocks: u16::from_le_bytes([data[entry::BLOCKS], data[entry::BLOCKS + 1]]),
        })
    }

    /// Type column as a 1541 shows it: `*` for unclosed, `<` for locked
    pub fn type_label(&self) -> String {
        format!(
            "{}{}{}",
            if self.closed { "" } else { "*" },
            self.file_type,
            if self.locked { "<" } else { "" }
        )
    }
}

/// Filesystem information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemInfo {
    /// Disk name
    pub disk_name: String,
    /// Disk ID
    pub disk_id: String,
    /// DOS type
    pub dos_type: String,
    /// Tracks on the image
    pub num_tracks: u8,
    /// Blocks usable by files
    pub total_blocks: usize,
    /// Free blocks
    pub free_blocks: usize,
}

/// Filesystem trait for accessing files on disk images
pub trait FileSystem {
    /// List directory entries in directory order
    fn read_dir(&self) -> Result<Vec<DirEntry>>;

    /// Find the first entry matching a name or wildcard pattern
    fn find(&self, pattern: &str) -> Result<Option<DirEntry>>;

    /// Read a file's contents
    fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    /// Write a new file, returning its directory entry
    fn write_file(
        &mut self,
        name: &str,
        file_type: FileType,
        data: &[u8],
        replace: bool,
    ) -> Result<DirEntry>;

    /// Delete a file, returning the number of blocks freed
    fn delete_file(&mut self, name: &str) -> Result<usize>;

    /// Get filesystem information
    fn info(&self) -> Result<FileSystemInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(type_byte: u8, name: &[u8]) -> [u8; 32] {
        let mut data = [0u8; 32];
        data[entry::FILE_TYPE] = type_byte;
        data[entry::FIRST_TRACK] = 17;
        data[entry::FIRST_SECTOR] = 0;
        data[entry::NAME..entry::NAME + 16].copy_from_slice(&petscii::pad_name(name));
        data[entry::BLOCKS] = 0x2C;
        data[entry::BLOCKS + 1] = 0x01;
        data
    }

    #[test]
    fn test_parse_dir_entry() {
        let entry = DirEntry::parse(3, &slot(0x82, b"HELLO")).unwrap();
        assert_eq!(entry.index, 3);
        assert_eq!(entry.name, "HELLO");
        assert_eq!(entry.file_type, FileType::Prg);
        assert!(entry.closed);
        assert!(!entry.locked);
        assert_eq!(entry.first_track, 17);
        assert_eq!(entry.blocks, 300);
        assert_eq!(entry.type_label(), "PRG");
    }

    #[test]
    fn test_parse_empty_slot() {
        assert!(DirEntry::parse(0, &[0u8; 32]).is_none());
        assert!(DirEntry::parse(0, &[0u8; 10]).is_none());
    }

    #[test]
    fn test_type_label_flags() {
        let splat = DirEntry::parse(0, &slot(0x01, b"LOG")).unwrap();
        assert_eq!(splat.type_label(), "*SEQ");

        let locked = DirEntry::parse(0, &slot(0xC2, b"BOOT")).unwrap();
        assert_eq!(locked.type_label(), "PRG<");
    }

    #[test]
    fn test_file_type_from_str() {
        assert_eq!("prg".parse::<FileType>().unwrap(), FileType::Prg);
        assert_eq!("SEQ".parse::<FileType>().unwrap(), FileType::Seq);
        assert!("EXE".parse::<FileType>().is_err());
        assert_eq!(FileType::from_type_byte(0x87).to_string(), "???");
    }
}
