/// Directory listings
///
/// Two renderings of the same directory: plain text lines for the command
/// line, and the BASIC program a drive sends back for `LOAD "$",8`.

use crate::error::Result;
use crate::filesystem::{CbmFileSystem, DirEntry};
use crate::format::constants::bam as offsets;
use crate::format::{FILENAME_LENGTH, PAD_BYTE};
use crate::image::DiskImage;

/// Load address of a directory program
pub const BASIC_START: u16 = 0x0801;

/// PETSCII reverse-video on
const RVS_ON: u8 = 0x12;

/// Format one directory entry as a text line
pub fn format_entry(entry: &DirEntry) -> String {
    format!(
        "{}  \"{}\"  {}",
        entry.blocks,
        entry.name.trim(),
        entry.type_label()
    )
}

/// Format the directory as text lines: header, one line per entry, and the
/// blocks-free trailer
pub fn format_directory(image: &DiskImage) -> Result<Vec<String>> {
    let bam = image.bam()?;
    let entries = CbmFileSystem::new(image).read_dir()?;

    let mut lines = Vec::with_capacity(entries.len() + 2);
    lines.push(format!("0 \"{}\" 2a", bam.disk_name()));
    lines.extend(entries.iter().map(format_entry));
    lines.push(format!("{} BLOCKS FREE.", bam.blocks_free()));
    Ok(lines)
}

/// Replace name padding with plain spaces for display
fn display_bytes(raw: &[u8]) -> Vec<u8> {
    raw.iter()
        .map(|&b| if b == PAD_BYTE { b' ' } else { b })
        .collect()
}

fn entry_text(entry: &DirEntry) -> Vec<u8> {
    let name: Vec<u8> = entry
        .raw_name
        .iter()
        .copied()
        .take_while(|&b| b != PAD_BYTE)
        .collect();
    let digits = entry.blocks.to_string().len();

    let mut text = vec![b' '; 4usize.saturating_sub(digits)];
    text.push(b'"');
    text.extend_from_slice(&name);
    text.push(b'"');
    text.extend(std::iter::repeat(b' ').take(FILENAME_LENGTH - name.len()));
    text.push(if entry.closed { b' ' } else { b'*' });
    text.extend_from_slice(entry.file_type.to_string().as_bytes());
    text.push(if entry.locked { b'<' } else { b' ' });
    text
}

/// Build the directory as a C64 BASIC program loadable at `$0801`
///
/// The header line is shown in reverse video with the padded disk name,
/// ID and DOS type; each file is a line numbered with its block count; the
/// last line carries the blocks-free count.
pub fn directory_prg(image: &DiskImage) -> Result<Vec<u8>> {
    let bam = image.bam()?;
    let entries = CbmFileSystem::new(image).read_dir()?;

    let raw = bam.as_bytes();
    let raw_id = &raw[offsets::DISK_ID..offsets::DISK_ID + 2];
    let raw_dos = &raw[offsets::DOS_TYPE..offsets::DOS_TYPE + 2];
    let mut header = vec![RVS_ON, b'"'];
    header.extend(display_bytes(bam.disk_name_raw()));
    header.push(b'"');
    header.push(b' ');
    header.extend(display_bytes(raw_id));
    header.push(b' ');
    header.extend(display_bytes(raw_dos));

    let mut lines: Vec<(u16, Vec<u8>)> = Vec::with_capacity(entries.len() + 2);
    lines.push((0, header));
    lines.extend(entries.iter().map(|e| (e.blocks, entry_text(e))));

    let mut trailer = b"BLOCKS FREE.".to_vec();
    trailer.extend(std::iter::repeat(b' ').take(13));
    lines.push((bam.blocks_free().min(u16::MAX as usize) as u16, trailer));

    let mut prg = BASIC_START.to_le_bytes().to_vec();
    let mut address = BASIC_START;
    for (number, text) in lines {
        let next = address.wrapping_add((2 + 2 + text.len() + 1) as u16);
        prg.extend_from_slice(&next.to_le_bytes());
        prg.extend_from_slice(&number.to_le_bytes());
        prg.extend_from_slice(&text);
        prg.push(0);
        address = next;
    }
    prg.extend_from_slice(&[0, 0]);

    Ok(prg)
}
