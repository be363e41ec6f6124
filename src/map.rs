/// Block allocation map visualization

use crate::error::Result;
use crate::format::{sectors_per_track, DIRECTORY_TRACK};
use crate::image::DiskImage;
use std::io::Write;

/// ANSI color codes for the block map
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
    pub const DARK_WHITE: &str = "\x1b[37m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
    pub const DARK_YELLOW: &str = "\x1b[2;33m";
    pub const BRIGHT_RED: &str = "\x1b[91m";
}

const BLOCK_FREE: &str = "\u{2591}"; // ░
const BLOCK_USED: &str = "\u{2593}"; // ▓

/// Draw the BAM as a grid: one row per sector position, one column per track
///
/// Directory track cells are yellow; sectors flagged in the error-info
/// table are red.
pub fn draw_block_map(image: &DiskImage, out: &mut dyn Write) -> Result<()> {
    let bam = image.bam()?;
    let num_tracks = image.num_tracks();
    let max_sectors = sectors_per_track(1);

    writeln!(out, "=== Block Map ===")?;
    writeln!(
        out,
        "Legend: {}Used{} {}Free{} {}Directory{} {}Error{}",
        colors::BRIGHT_WHITE,
        colors::RESET,
        colors::DARK_WHITE,
        colors::RESET,
        colors::BRIGHT_YELLOW,
        colors::RESET,
        colors::BRIGHT_RED,
        colors::RESET
    )?;
    writeln!(out)?;

    // Sector 0 at the bottom
    for sector in (0..max_sectors).rev() {
        write!(out, "{:>2} ", sector)?;

        for track in 1..=num_tracks {
            if sector >= sectors_per_track(track) {
                write!(out, " ")?;
                continue;
            }

            let free = bam.is_free(track, sector);
            let block = if free { BLOCK_FREE } else { BLOCK_USED };
            // Error codes 0 and 1 both mean "no error"
            let has_error = image.error_info(track, sector).is_some_and(|e| e > 1);

            let color = if has_error {
                colors::BRIGHT_RED
            } else if track == DIRECTORY_TRACK {
                if free {
                    colors::DARK_YELLOW
                } else {
                    colors::BRIGHT_YELLOW
                }
            } else if free {
                colors::DARK_WHITE
            } else {
                colors::BRIGHT_WHITE
            };

            write!(out, "{}{}{}", color, block, colors::RESET)?;
        }
        writeln!(out)?;
    }

    // Track axis: numbers every 5 tracks, printed across their columns
    write!(out, "   ")?;
    let mut column = 1u8;
    while column <= num_tracks {
        if column % 5 == 0 || column == 1 {
            let label = column.to_string();
            let room = (num_tracks - column + 1) as usize;
            let label = &label[..label.len().min(room)];
            write!(out, "{}", label)?;
            column += label.len() as u8;
        } else {
            write!(out, " ")?;
            column += 1;
        }
    }
    writeln!(out)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DiskImageFormat;

    fn render(image: &DiskImage) -> String {
        let mut out = Vec::new();
        draw_block_map(image, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_map_dimensions() {
        let image = DiskImage::create(DiskImageFormat::D64, "MAP", "01").unwrap();
        let text = render(&image);
        let lines: Vec<&str> = text.lines().collect();

        // title, legend, blank, 21 sector rows, axis
        assert_eq!(lines.len(), 3 + 21 + 1);
        assert!(lines[3].starts_with("20 "));
        assert!(lines[23].starts_with(" 0 "));
        assert!(lines[24].starts_with("   1   5"));
    }

    #[test]
    fn test_map_marks_used_blocks() {
        let image = DiskImage::create(DiskImageFormat::D64, "MAP", "01").unwrap();
        let text = render(&image);
        let bottom = text.lines().nth(23).unwrap();

        // Only the BAM sector on track 18 is used in row 0
        assert_eq!(bottom.matches(BLOCK_USED).count(), 1);
        assert_eq!(bottom.matches(BLOCK_FREE).count(), 34);
    }
}
