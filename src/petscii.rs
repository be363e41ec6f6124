/// PETSCII filename conversion
///
/// Names on a D64 are stored as 16 PETSCII bytes padded with shifted
/// spaces (`0xA0`). Directory listings render them in the uppercase
/// character set, so both unshifted (`0x41-0x5A`) and shifted
/// (`0xC1-0xDA`) letters come out as `A-Z`.

use crate::error::{DiskError, Result};
use crate::format::{FILENAME_LENGTH, PAD_BYTE};

/// Character used for bytes with no ASCII rendering
pub const UNPRINTABLE: char = '?';

/// Render a single PETSCII byte as ASCII
pub fn petscii_to_char(byte: u8) -> char {
    match byte {
        0x20..=0x5F => byte as char,
        0xC1..=0xDA => (byte - 0x80) as char,
        PAD_BYTE => ' ',
        _ => UNPRINTABLE,
    }
}

/// Convert a PETSCII name to ASCII, stopping at the padding
pub fn to_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != PAD_BYTE)
        .map(|&b| petscii_to_char(b))
        .collect()
}

/// Encode an ASCII name as PETSCII
///
/// Letters of either case fold to the unshifted range. Characters outside
/// printable ASCII, and the ASCII symbols with no PETSCII counterpart
/// (`` ` { | } ~ ``), are rejected.
pub fn from_ascii(name: &str) -> Result<Vec<u8>> {
    name.chars()
        .map(|c| match c {
            'a'..='z' => Ok(c.to_ascii_uppercase() as u8),
            ' '..='_' => Ok(c as u8),
            _ => Err(DiskError::InvalidFilename(format!(
                "{:?} contains unsupported character {:?}",
                name, c
            ))),
        })
        .collect()
}

/// Pad a PETSCII name to the on-disk width, truncating longer names
pub fn pad_name(bytes: &[u8]) -> [u8; FILENAME_LENGTH] {
    let mut padded = [PAD_BYTE; FILENAME_LENGTH];
    let len = bytes.len().min(FILENAME_LENGTH);
    padded[..len].copy_from_slice(&bytes[..len]);
    padded
}
