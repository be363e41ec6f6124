/// Block Availability Map
///
/// The BAM lives on 18/0 and holds, for each track, a free-sector count
/// followed by a 24-bit bitmap where a set bit marks a free sector. The
/// same sector carries the disk name, ID and DOS type. Tracks 36-40 of
/// extended images use the SpeedDOS layout at `0xC0`.

use crate::error::{DiskError, Result};
use crate::format::constants::bam;
use crate::format::{
    sectors_per_track, BAM_SECTOR, DIRECTORY_TRACK, DOS_TYPE, DOS_VERSION, FIRST_DIRECTORY_SECTOR,
    PAD_BYTE, SECTOR_SIZE, STANDARD_TRACKS,
};
use crate::petscii;

/// Parsed copy of the BAM sector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bam {
    data: [u8; SECTOR_SIZE],
    num_tracks: u8,
}

impl Bam {
    /// Parse the BAM from the raw 18/0 sector
    pub fn from_sector(sector: &[u8], num_tracks: u8) -> Result<Self> {
        let data: [u8; SECTOR_SIZE] = sector.try_into().map_err(|_| {
            DiskError::parse(DIRECTORY_TRACK, BAM_SECTOR, "BAM sector has the wrong size")
        })?;

        Ok(Self { data, num_tracks })
    }

    /// Build the BAM of a freshly formatted disk
    ///
    /// Every sector is free except the BAM itself and the first directory
    /// sector. `name` and `id` are PETSCII bytes.
    pub fn formatted(name: &[u8], id: &[u8], num_tracks: u8) -> Self {
        let mut data = [0u8; SECTOR_SIZE];
        data[0] = DIRECTORY_TRACK;
        data[1] = FIRST_DIRECTORY_SECTOR;
        data[2] = DOS_VERSION;

        data[bam::DISK_NAME..bam::DISK_NAME + 16].copy_from_slice(&petscii::pad_name(name));
        data[0xA0] = PAD_BYTE;
        data[0xA1] = PAD_BYTE;
        data[bam::DISK_ID] = id.first().copied().unwrap_or(b'0');
        data[bam::DISK_ID + 1] = id.get(1).copied().unwrap_or(b'0');
        data[0xA4] = PAD_BYTE;
        data[bam::DOS_TYPE..bam::DOS_TYPE + 2].copy_from_slice(DOS_TYPE);
        data[0xA7..=0xAA].fill(PAD_BYTE);

        let mut bam = Self { data, num_tracks };
        for track in 1..=num_tracks {
            for sector in 0..sectors_per_track(track) {
                bam.set_bit(track, sector, true);
            }
            bam.recount(track);
        }

        bam.allocate(DIRECTORY_TRACK, BAM_SECTOR);
        bam.allocate(DIRECTORY_TRACK, FIRST_DIRECTORY_SECTOR);
        bam
    }

    /// Raw sector bytes
    pub fn as_bytes(&self) -> &[u8; SECTOR_SIZE] {
        &self.data
    }

    /// Number of tracks covered by this BAM
    pub fn num_tracks(&self) -> u8 {
        self.num_tracks
    }

    fn entry_offset(&self, track: u8) -> Option<usize> {
        if track == 0 || track > self.num_tracks {
            None
        } else if track <= STANDARD_TRACKS {
            Some(bam::ENTRIES + (track as usize - 1) * bam::ENTRY_SIZE)
        } else {
            Some(bam::EXTENDED_ENTRIES + (track - STANDARD_TRACKS - 1) as usize * bam::ENTRY_SIZE)
        }
    }

    fn bit_position(&self, track: u8, sector: u8) -> Option<(usize, u8)> {
        if sector >= sectors_per_track(track) {
            return None;
        }
        let offset = self.entry_offset(track)?;
        Some((offset + 1 + sector as usize / 8, 1 << (sector % 8)))
    }

    fn set_bit(&mut self, track: u8, sector: u8, free: bool) {
        if let Some((byte, mask)) = self.bit_position(track, sector) {
            if free {
                self.data[byte] |= mask;
            } else {
                self.data[byte] &= !mask;
            }
        }
    }

    /// Recompute the free count of a track from its bitmap
    fn recount(&mut self, track: u8) {
        if let Some(offset) = self.entry_offset(track) {
            self.data[offset] = self.bitmap_free(track);
        }
    }

    /// Count free sectors from the bitmap of a track
    fn bitmap_free(&self, track: u8) -> u8 {
        (0..sectors_per_track(track))
            .filter(|&s| self.is_free(track, s))
            .count() as u8
    }

    /// Check whether a sector is marked free
    pub fn is_free(&self, track: u8, sector: u8) -> bool {
        match self.bit_position(track, sector) {
            Some((byte, mask)) => self.data[byte] & mask != 0,
            None => false,
        }
    }

    /// Mark a sector as used. Returns false if it was not free.
    pub fn allocate(&mut self, track: u8, sector: u8) -> bool {
        if !self.is_free(track, sector) {
            return false;
        }
        self.set_bit(track, sector, false);
        if let Some(offset) = self.entry_offset(track) {
            self.data[offset] = self.data[offset].saturating_sub(1);
        }
        true
    }

    /// Mark a sector as free. Returns false if it was already free or invalid.
    pub fn free(&mut self, track: u8, sector: u8) -> bool {
        if self.bit_position(track, sector).is_none() || self.is_free(track, sector) {
            return false;
        }
        self.set_bit(track, sector, true);
        if let Some(offset) = self.entry_offset(track) {
            self.data[offset] = self.data[offset].saturating_add(1);
        }
        true
    }

    /// Stored free count for a track
    pub fn free_on_track(&self, track: u8) -> u8 {
        self.entry_offset(track).map_or(0, |offset| self.data[offset])
    }

    /// Free blocks available to files (the directory track is excluded)
    pub fn blocks_free(&self) -> usize {
        (1..=self.num_tracks)
            .filter(|&t| t != DIRECTORY_TRACK)
            .map(|t| self.free_on_track(t) as usize)
            .sum()
    }

    /// Blocks usable by files on an empty disk
    pub fn total_blocks(&self) -> usize {
        (1..=self.num_tracks)
            .filter(|&t| t != DIRECTORY_TRACK)
            .map(|t| sectors_per_track(t) as usize)
            .sum()
    }

    /// Check that every stored free count matches its bitmap
    pub fn is_consistent(&self) -> bool {
        (1..=self.num_tracks).all(|t| self.free_on_track(t) == self.bitmap_free(t))
    }

    /// Raw PETSCII disk name (16 bytes, padded)
    pub fn disk_name_raw(&self) -> &[u8] {
        &self.data[bam::DISK_NAME..bam::DISK_NAME + 16]
    }

    /// Disk name as ASCII
    pub fn disk_name(&self) -> String {
        petscii::to_ascii(self.disk_name_raw())
    }

    /// Set the disk name from PETSCII bytes
    pub fn set_disk_name(&mut self, name: &[u8]) {
        self.data[bam::DISK_NAME..bam::DISK_NAME + 16].copy_from_slice(&petscii::pad_name(name));
    }

    /// Disk ID as ASCII
    pub fn disk_id(&self) -> String {
        self.data[bam::DISK_ID..bam::DISK_ID + 2]
            .iter()
            .map(|&b| petscii::petscii_to_char(b))
            .collect()
    }

    /// DOS type as ASCII (normally "2A")
    pub fn dos_type(&self) -> String {
        self.data[bam::DOS_TYPE..bam::DOS_TYPE + 2]
            .iter()
            .map(|&b| petscii::petscii_to_char(b))
            .collect()
    }
}
