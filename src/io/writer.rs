/// D64 file writer

use crate::error::Result;
use crate::image::DiskImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Write a D64 file to disk
///
/// Images with an error-info table are written with the table appended,
/// so the variant survives a load/save cycle.
pub fn write_d64<P: AsRef<Path>>(image: &DiskImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path)?;

    file.write_all(&image.data)?;
    if let Some(errors) = &image.error_info {
        file.write_all(errors)?;
    }
    file.flush()?;

    debug!(path = %path.display(), format = image.format().name(), "wrote disk image");
    Ok(())
}
