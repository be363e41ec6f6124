/// CBM DOS filesystem implementation
///
/// Directory on track 18 starting at sector 1, eight 32-byte entries per
/// sector, files stored as sector chains of 254 data bytes each.

use crate::error::{DiskError, Result};
use crate::filesystem::{DirEntry, FileSystem, FileSystemInfo, FileType};
use crate::format::constants::entry;
use crate::format::{
    blocks_for_length, sectors_per_track, BAM_SECTOR, DATA_BYTES_PER_SECTOR, DATA_INTERLEAVE,
    DIRECTORY_INTERLEAVE, DIRECTORY_TRACK, DIR_ENTRIES_PER_SECTOR, DIR_ENTRY_SIZE,
    FILENAME_LENGTH, FIRST_DIRECTORY_SECTOR, SECTOR_SIZE,
};
use crate::image::{Bam, DiskImage};
use crate::petscii;
use std::borrow::{Borrow, BorrowMut};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Location of a directory slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    track: u8,
    sector: u8,
    offset: usize,
    used: bool,
}

/// Match a name against a CBM DOS pattern
///
/// `?` matches any single character and `*` matches the rest of the name.
/// Comparison ignores ASCII case.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    let mut name_chars = name.chars();

    for p in pattern.chars() {
        match p {
            '*' => return true,
            '?' => {
                if name_chars.next().is_none() {
                    return false;
                }
            }
            _ => match name_chars.next() {
                Some(n) if n.eq_ignore_ascii_case(&p) => {}
                _ => return false,
            },
        }
    }

    name_chars.next().is_none()
}

/// Order in which tracks are tried for the first block of a file:
/// outward from the directory track, below before above
fn first_block_tracks(num_tracks: u8) -> Vec<u8> {
    let mut order = Vec::with_capacity(num_tracks as usize);
    for distance in 1..num_tracks {
        if distance < DIRECTORY_TRACK {
            order.push(DIRECTORY_TRACK - distance);
        }
        if DIRECTORY_TRACK + distance <= num_tracks {
            order.push(DIRECTORY_TRACK + distance);
        }
    }
    order
}

/// Order in which tracks are tried after `current` fills up: keep moving
/// away from the directory track, then the other half, then whatever is
/// left between `current` and the directory
fn next_block_tracks(current: u8, num_tracks: u8) -> Vec<u8> {
    let above = (DIRECTORY_TRACK + 1)..=num_tracks;
    let below = (1..DIRECTORY_TRACK).rev();

    let mut order = vec![current];
    if current < DIRECTORY_TRACK {
        order.extend((1..current).rev());
        order.extend(above);
        order.extend((current + 1)..DIRECTORY_TRACK);
    } else {
        order.extend((current + 1)..=num_tracks);
        order.extend(below);
        order.extend((DIRECTORY_TRACK + 1)..current);
    }
    order
}

/// First free sector on a track, scanning cyclically from `start`
fn free_sector_from(bam: &Bam, track: u8, start: u8) -> Option<u8> {
    let count = sectors_per_track(track);
    (0..count)
        .map(|i| (start % count + i) % count)
        .find(|&s| bam.is_free(track, s))
}

/// Allocate a chain of blocks for a file
fn allocate_chain(bam: &mut Bam, count: usize) -> Result<Vec<(u8, u8)>> {
    let free = bam.blocks_free();
    if count > free {
        return Err(DiskError::DiskFull {
            needed: count,
            free,
        });
    }

    let num_tracks = bam.num_tracks();
    let mut chain: Vec<(u8, u8)> = Vec::with_capacity(count);

    while chain.len() < count {
        let next = match chain.last() {
            None => first_block_tracks(num_tracks)
                .into_iter()
                .find_map(|t| free_sector_from(bam, t, 0).map(|s| (t, s))),
            Some(&(track, sector)) => next_block_tracks(track, num_tracks)
                .into_iter()
                .filter(|&t| t != DIRECTORY_TRACK)
                .find_map(|t| {
                    let start = if t == track { sector + DATA_INTERLEAVE } else { 0 };
                    free_sector_from(bam, t, start).map(|s| (t, s))
                }),
        };

        let (track, sector) = next.ok_or(DiskError::DiskFull {
            needed: count,
            free: chain.len(),
        })?;
        bam.allocate(track, sector);
        trace!(track, sector, "allocated block");
        chain.push((track, sector));
    }

    Ok(chain)
}

/// CBM DOS filesystem over a D64 image
///
/// Read operations work on any borrow of the image; writes need a mutable
/// one. Writes are applied to a working copy and only committed once they
/// have fully succeeded.
pub struct CbmFileSystem<I> {
    image: I,
}

impl<I: Borrow<DiskImage>> CbmFileSystem<I> {
    /// Mount the filesystem of an image
    pub fn new(image: I) -> Self {
        Self { image }
    }

    /// Get the underlying image
    pub fn image(&self) -> &DiskImage {
        self.image.borrow()
    }

    /// Release the underlying image
    pub fn into_inner(self) -> I {
        self.image
    }

    /// Read the directory chain starting at 18/1
    fn directory_sectors(image: &DiskImage) -> Result<Vec<(u8, u8)>> {
        let mut sectors = Vec::new();
        let mut visited = HashSet::new();
        let (mut track, mut sector) = (DIRECTORY_TRACK, FIRST_DIRECTORY_SECTOR);

        loop {
            if !image.is_valid_sector(track, sector) {
                return Err(DiskError::parse(
                    track,
                    sector,
                    "directory chain points outside the disk",
                ));
            }
            if !visited.insert((track, sector)) {
                return Err(DiskError::parse(track, sector, "directory chain loops"));
            }

            sectors.push((track, sector));
            let data = image.read_sector(track, sector)?;
            if data[0] == 0 {
                break;
            }
            (track, sector) = (data[0], data[1]);
        }

        Ok(sectors)
    }

    /// Every slot of the directory chain, in order
    fn slots(image: &DiskImage) -> Result<Vec<Slot>> {
        let mut slots = Vec::new();

        for (track, sector) in Self::directory_sectors(image)? {
            let data = image.read_sector(track, sector)?;
            for i in 0..DIR_ENTRIES_PER_SECTOR {
                let offset = i * DIR_ENTRY_SIZE;
                slots.push(Slot {
                    track,
                    sector,
                    offset,
                    used: data[offset + entry::FILE_TYPE] != 0,
                });
            }
        }

        Ok(slots)
    }

    fn read_entries(image: &DiskImage) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();

        for (index, slot) in Self::slots(image)?.into_iter().enumerate() {
            if !slot.used {
                continue;
            }
            let data = image.read_sector(slot.track, slot.sector)?;
            let bytes = &data[slot.offset..slot.offset + DIR_ENTRY_SIZE];
            if let Some(entry) = DirEntry::parse(index, bytes) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    /// Find an entry: exact name first, then ignoring case, then as a
    /// wildcard pattern
    fn find_in(entries: Vec<DirEntry>, pattern: &str) -> Option<DirEntry> {
        if let Some(pos) = entries.iter().position(|e| e.name == pattern) {
            return entries.into_iter().nth(pos);
        }
        if let Some(pos) = entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(pattern))
        {
            return entries.into_iter().nth(pos);
        }
        if pattern.contains(['*', '?']) {
            return entries
                .into_iter()
                .find(|e| matches_pattern(&e.name, pattern));
        }
        None
    }

    /// Follow a sector chain, returning the visited sectors and the data
    fn follow_chain(image: &DiskImage, track: u8, sector: u8) -> Result<(Vec<(u8, u8)>, Vec<u8>)> {
        let mut sectors = Vec::new();
        let mut data = Vec::new();
        let mut visited = HashSet::new();
        let (mut track, mut sector) = (track, sector);

        loop {
            if !image.is_valid_sector(track, sector) {
                return Err(DiskError::parse(
                    track,
                    sector,
                    "file chain points outside the disk",
                ));
            }
            if !visited.insert((track, sector)) {
                return Err(DiskError::parse(track, sector, "file chain loops"));
            }

            sectors.push((track, sector));
            let block = image.read_sector(track, sector)?;
            if block[0] == 0 {
                // Last block: byte 1 is the index of the last used byte
                let end = (block[1] as usize + 1).clamp(2, SECTOR_SIZE);
                data.extend_from_slice(&block[2..end]);
                break;
            }
            data.extend_from_slice(&block[2..]);
            (track, sector) = (block[0], block[1]);
        }

        Ok((sectors, data))
    }

    /// List directory entries in directory order
    pub fn read_dir(&self) -> Result<Vec<DirEntry>> {
        Self::read_entries(self.image())
    }

    /// Find the first entry matching a name or wildcard pattern
    pub fn find(&self, pattern: &str) -> Result<Option<DirEntry>> {
        Ok(Self::find_in(self.read_dir()?, pattern))
    }

    /// Read a file's contents, including any load address
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .find(name)?
            .ok_or_else(|| DiskError::FileNotFound(name.to_string()))?;
        self.read_entry(&entry)
    }

    /// Read the contents of a directory entry
    pub fn read_entry(&self, entry: &DirEntry) -> Result<Vec<u8>> {
        let (sectors, data) =
            Self::follow_chain(self.image(), entry.first_track, entry.first_sector)?;
        debug!(name = %entry.name, blocks = sectors.len(), bytes = data.len(), "read file");
        Ok(data)
    }

    /// Get filesystem information
    pub fn info(&self) -> Result<FileSystemInfo> {
        let image = self.image();
        let bam = image.bam()?;
        Ok(FileSystemInfo {
            disk_name: bam.disk_name(),
            disk_id: bam.disk_id(),
            dos_type: bam.dos_type(),
            num_tracks: image.num_tracks(),
            total_blocks: bam.total_blocks(),
            free_blocks: bam.blocks_free(),
        })
    }
}

impl<I: BorrowMut<DiskImage>> CbmFileSystem<I> {
    /// Scratch an entry on a working image, returning the blocks freed
    fn scratch(working: &mut DiskImage, bam: &mut Bam, entry: &DirEntry) -> Result<usize> {
        if entry.locked {
            return Err(DiskError::FileLocked(entry.name.clone()));
        }

        let mut freed = 0;
        if entry.file_type != FileType::Del || entry.first_track != 0 {
            let (sectors, _) =
                Self::follow_chain(working, entry.first_track, entry.first_sector)?;
            freed += sectors.iter().filter(|&&(t, s)| bam.free(t, s)).count();
        }
        if entry.file_type == FileType::Rel && entry.side_track != 0 {
            let (sectors, _) = Self::follow_chain(working, entry.side_track, entry.side_sector)?;
            freed += sectors.iter().filter(|&&(t, s)| bam.free(t, s)).count();
        }

        let slot = Self::slots(working)?
            .get(entry.index)
            .copied()
            .ok_or_else(|| DiskError::FileNotFound(entry.name.clone()))?;
        let mut data = working.read_sector(slot.track, slot.sector)?.to_vec();
        data[slot.offset + entry::FILE_TYPE] = 0;
        working.write_sector(slot.track, slot.sector, &data)?;

        Ok(freed)
    }

    /// Pick the slot for a new entry: the first free slot after the last
    /// used one, extending the directory chain when none is left. A full
    /// track 18 falls back to the earliest scratched slot.
    fn claim_slot(working: &mut DiskImage, bam: &mut Bam) -> Result<Slot> {
        let slots = Self::slots(working)?;
        let first_candidate = slots.iter().rposition(|s| s.used).map_or(0, |pos| pos + 1);
        if let Some(slot) = slots.get(first_candidate) {
            return Ok(*slot);
        }

        if let Some(slot) = Self::extend_directory(working, bam)? {
            return Ok(slot);
        }
        slots
            .into_iter()
            .find(|s| !s.used)
            .ok_or(DiskError::DirectoryFull)
    }

    /// Link a fresh sector on track 18 onto the end of the directory chain
    ///
    /// Sectors already in the chain and the BAM sector are never reused,
    /// whatever the BAM says about them.
    fn extend_directory(working: &mut DiskImage, bam: &mut Bam) -> Result<Option<Slot>> {
        let chain = Self::directory_sectors(working)?;
        let Some(&(last_track, last_sector)) = chain.last() else {
            return Ok(None);
        };

        let count = sectors_per_track(DIRECTORY_TRACK);
        let start = last_sector % count + DIRECTORY_INTERLEAVE;
        let candidate = (0..count).map(|i| (start + i) % count).find(|&s| {
            s != BAM_SECTOR
                && bam.is_free(DIRECTORY_TRACK, s)
                && !chain.contains(&(DIRECTORY_TRACK, s))
        });
        let Some(new_sector) = candidate else {
            return Ok(None);
        };
        bam.allocate(DIRECTORY_TRACK, new_sector);

        let mut fresh = [0u8; SECTOR_SIZE];
        fresh[1] = 0xFF;
        working.write_sector(DIRECTORY_TRACK, new_sector, &fresh)?;

        let mut previous = working.read_sector(last_track, last_sector)?.to_vec();
        previous[0] = DIRECTORY_TRACK;
        previous[1] = new_sector;
        working.write_sector(last_track, last_sector, &previous)?;

        debug!(sector = new_sector, "extended directory");
        Ok(Some(Slot {
            track: DIRECTORY_TRACK,
            sector: new_sector,
            offset: 0,
            used: false,
        }))
    }

    /// Write a new file
    ///
    /// The name is truncated to 16 characters. An existing file of the same
    /// name is an error unless `replace` is set, in which case it is
    /// scratched first. The new entry is placed after the last existing one.
    pub fn write_file(
        &mut self,
        name: &str,
        file_type: FileType,
        data: &[u8],
        replace: bool,
    ) -> Result<DirEntry> {
        let mut encoded = petscii::from_ascii(name)?;
        encoded.truncate(FILENAME_LENGTH);
        if encoded.is_empty() {
            return Err(DiskError::InvalidFilename("empty filename".to_string()));
        }
        let raw_name = petscii::pad_name(&encoded);

        let mut working = self.image.borrow().clone();
        let mut bam = working.bam()?;

        let existing = Self::read_entries(&working)?
            .into_iter()
            .find(|e| e.raw_name == raw_name);
        if let Some(existing) = existing {
            if !replace {
                return Err(DiskError::FileExists(existing.name));
            }
            Self::scratch(&mut working, &mut bam, &existing)?;
        }

        let chain = allocate_chain(&mut bam, blocks_for_length(data.len()))?;
        let slot = Self::claim_slot(&mut working, &mut bam)?;

        let chunks: Vec<&[u8]> = if data.is_empty() {
            vec![data]
        } else {
            data.chunks(DATA_BYTES_PER_SECTOR).collect()
        };

        for (i, (chunk, &(track, sector))) in chunks.iter().zip(&chain).enumerate() {
            let mut block = [0u8; SECTOR_SIZE];
            match chain.get(i + 1) {
                Some(&(next_track, next_sector)) => {
                    block[0] = next_track;
                    block[1] = next_sector;
                }
                None => {
                    block[0] = 0;
                    block[1] = (chunk.len() + 1) as u8;
                }
            }
            block[2..2 + chunk.len()].copy_from_slice(chunk);
            working.write_sector(track, sector, &block)?;
        }

        let (first_track, first_sector) = chain[0];
        let mut dir = working.read_sector(slot.track, slot.sector)?.to_vec();
        let slot_bytes = &mut dir[slot.offset..slot.offset + DIR_ENTRY_SIZE];
        // Bytes 0-1 hold the chain link of the first slot; leave them alone
        slot_bytes[entry::FILE_TYPE..].fill(0);
        slot_bytes[entry::FILE_TYPE] = 0x80 | file_type.type_code();
        slot_bytes[entry::FIRST_TRACK] = first_track;
        slot_bytes[entry::FIRST_SECTOR] = first_sector;
        slot_bytes[entry::NAME..entry::NAME + FILENAME_LENGTH].copy_from_slice(&raw_name);
        slot_bytes[entry::BLOCKS..entry::BLOCKS + 2]
            .copy_from_slice(&(chain.len() as u16).to_le_bytes());
        let new_entry = DirEntry::parse(0, slot_bytes);
        working.write_sector(slot.track, slot.sector, &dir)?;
        working.write_bam(&bam)?;

        let index = Self::slots(&working)?
            .iter()
            .position(|s| {
                s.track == slot.track && s.sector == slot.sector && s.offset == slot.offset
            })
            .unwrap_or_default();
        let new_entry = new_entry
            .map(|e| DirEntry { index, ..e })
            .ok_or_else(|| DiskError::parse(slot.track, slot.sector, "new entry unreadable"))?;

        debug!(
            name = %new_entry.name,
            blocks = chain.len(),
            track = first_track,
            sector = first_sector,
            "wrote file"
        );

        *self.image.borrow_mut() = working;
        Ok(new_entry)
    }

    /// Delete a file, returning the number of blocks freed
    pub fn delete_file(&mut self, name: &str) -> Result<usize> {
        let mut working = self.image.borrow().clone();
        let mut bam = working.bam()?;

        let entry = Self::find_in(Self::read_entries(&working)?, name)
            .ok_or_else(|| DiskError::FileNotFound(name.to_string()))?;
        let freed = Self::scratch(&mut working, &mut bam, &entry)?;
        working.write_bam(&bam)?;

        debug!(name = %entry.name, freed, "scratched file");
        *self.image.borrow_mut() = working;
        Ok(freed)
    }
}

impl<I: BorrowMut<DiskImage>> FileSystem for CbmFileSystem<I> {
    fn read_dir(&self) -> Result<Vec<DirEntry>> {
        CbmFileSystem::read_dir(self)
    }

    fn find(&self, pattern: &str) -> Result<Option<DirEntry>> {
        CbmFileSystem::find(self, pattern)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        CbmFileSystem::read_file(self, name)
    }

    fn write_file(
        &mut self,
        name: &str,
        file_type: FileType,
        data: &[u8],
        replace: bool,
    ) -> Result<DirEntry> {
        CbmFileSystem::write_file(self, name, file_type, data, replace)
    }

    fn delete_file(&mut self, name: &str) -> Result<usize> {
        CbmFileSystem::delete_file(self, name)
    }

    fn info(&self) -> Result<FileSystemInfo> {
        CbmFileSystem::info(self)
    }
}
