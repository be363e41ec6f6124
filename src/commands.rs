/// Command-line operations
///
/// Each operation opens the image, performs one library call and prints
/// the outcome. Output goes to a caller-supplied writer so the same code
/// serves the one-shot CLI, the interactive shell and tests.

use crate::error::{DiskError, Result};
use crate::filesystem::{CbmFileSystem, FileType};
use crate::format::{DiskImageFormat, FILENAME_LENGTH};
use crate::image::DiskImage;
use crate::listing;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Usage line printed when too few arguments are given
pub const USAGE: &str = "Usage: cbmdisk [dir|load|save] disk.d64 [filename]";

/// Message printed for unknown commands or missing arguments
pub const INVALID_COMMAND: &str = "Invalid command or missing arguments.";

/// Print an operation's failure without propagating it
///
/// The message goes to `out` as `"<context>: <error>"`. The error's debug
/// form and its chain of underlying causes go to `err`.
pub fn report(context: &str, result: Result<()>, out: &mut dyn Write, err: &mut dyn Write) {
    if let Err(e) = result {
        let _ = writeln!(out, "{}: {}", context, e);
        let _ = writeln!(err, "{}: {:?}", context, e);
        let mut source = e.source();
        while let Some(cause) = source {
            let _ = writeln!(err, "  caused by: {}", cause);
            source = cause.source();
        }
    }
}

/// Name a host file gets on disk: its basename, uppercased and truncated
/// to 16 characters
pub fn disk_name_for(path: &Path) -> Result<String> {
    let base = path
        .file_name()
        .ok_or_else(|| DiskError::InvalidFilename(path.display().to_string()))?;
    Ok(base
        .to_string_lossy()
        .to_uppercase()
        .chars()
        .take(FILENAME_LENGTH)
        .collect())
}

/// Host filename for an extracted entry, with path separators replaced
fn host_file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{}.prg", safe)
}

/// Print the directory listing, optionally writing it as a BASIC program
pub fn list_dir(disk_path: &Path, prg_out: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    let image = DiskImage::open(disk_path)?;

    for line in listing::format_directory(&image)? {
        writeln!(out, "{}", line)?;
    }

    if let Some(prg_path) = prg_out {
        std::fs::write(prg_path, listing::directory_prg(&image)?)?;
        info!(path = %prg_path.display(), "wrote directory program");
    }

    Ok(())
}

/// Extract a file to `<filename>.prg`, or to `output` if given
///
/// A missing file is reported on `out`, not as an error.
pub fn load_file(
    disk_path: &Path,
    filename: &str,
    output: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    let image = DiskImage::open(disk_path)?;
    let fs = CbmFileSystem::new(&image);

    let Some(entry) = fs.find(filename)? else {
        writeln!(out, "File \"{}\" not found.", filename)?;
        return Ok(());
    };

    let data = fs.read_entry(&entry)?;

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        // A pattern makes a poor host filename; use the matched entry
        None if filename.contains(['*', '?']) => PathBuf::from(host_file_name(&entry.name)),
        None => PathBuf::from(format!("{}.prg", filename)),
    };
    std::fs::write(&output_path, &data)?;

    let absolute = if output_path.is_absolute() {
        output_path
    } else {
        std::env::current_dir()?.join(output_path)
    };
    info!(name = %entry.name, bytes = data.len(), "loaded file");
    writeln!(out, "Loaded: {}", absolute.display())?;
    Ok(())
}

/// Store a host file on the image as a new entry and rewrite the image
pub fn save_file(
    disk_path: &Path,
    filepath: &Path,
    file_type: FileType,
    replace: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let mut image = DiskImage::open(disk_path)?;
    let name = disk_name_for(filepath)?;
    let data = std::fs::read(filepath)?;

    let entry = CbmFileSystem::new(&mut image).write_file(&name, file_type, &data, replace)?;
    image.save(disk_path)?;

    info!(name = %entry.name, blocks = entry.blocks, "saved file");
    writeln!(
        out,
        "Saved: {} into {}",
        filepath.display(),
        disk_path.display()
    )?;
    Ok(())
}

/// Create a blank, formatted image
pub fn format_disk(
    disk_path: &Path,
    name: &str,
    id: &str,
    tracks: u8,
    out: &mut dyn Write,
) -> Result<()> {
    let format = DiskImageFormat::for_tracks(tracks).ok_or_else(|| {
        DiskError::invalid_format(format!("{} tracks (expected 35 or 40)", tracks))
    })?;

    let mut image = DiskImage::create(format, name, id)?;
    image.save(disk_path)?;

    writeln!(
        out,
        "Formatted: {} ({})",
        disk_path.display(),
        format.name()
    )?;
    Ok(())
}

/// Scratch a file from the image
pub fn delete_file(disk_path: &Path, filename: &str, out: &mut dyn Write) -> Result<()> {
    let mut image = DiskImage::open(disk_path)?;
    let freed = CbmFileSystem::new(&mut image).delete_file(filename)?;
    image.save(disk_path)?;

    writeln!(out, "Deleted: {} ({} blocks freed)", filename, freed)?;
    Ok(())
}

/// Print image geometry and BAM summary
pub fn show_info(disk_path: &Path, out: &mut dyn Write) -> Result<()> {
    let image = DiskImage::open(disk_path)?;
    let info = CbmFileSystem::new(&image).info()?;

    writeln!(out, "Filename: {}", disk_path.display())?;
    writeln!(out, "Format: {}", image.format().name())?;
    writeln!(out, "Size: {} bytes", image.total_size())?;
    writeln!(out, "Tracks: {}", info.num_tracks)?;
    writeln!(out, "Disk name: {}", info.disk_name)?;
    writeln!(out, "Disk ID: {}", info.disk_id)?;
    writeln!(out, "DOS type: {}", info.dos_type)?;
    writeln!(out, "Total blocks: {}", info.total_blocks)?;
    writeln!(out, "Free blocks: {}", info.free_blocks)?;
    writeln!(
        out,
        "BAM consistent: {}",
        if image.bam()?.is_consistent() { "Yes" } else { "No" }
    )?;
    Ok(())
}

/// Print the block allocation map
pub fn show_map(disk_path: &Path, out: &mut dyn Write) -> Result<()> {
    let image = DiskImage::open(disk_path)?;
    crate::map::draw_block_map(&image, out)
}
