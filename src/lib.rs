/*!
# cbmdisk

A Rust library for reading and writing Commodore D64 disk images.

## Features

- Read and write 35 and 40 track D64 images, with or without error info
- BAM (block availability map) access and 1541-style block allocation
- CBM DOS directory listing, file extraction, insertion and scratching
- PETSCII filename conversion
- Directory listings as text or as the BASIC program a drive returns

## Quick Start

```rust,no_run
use cbmdisk::{CbmFileSystem, DiskImage, DiskImageFormat, FileType};

// Open an existing image
let mut image = DiskImage::open("disk.d64")?;

// List the directory
let fs = CbmFileSystem::new(&image);
for entry in fs.read_dir()? {
    println!("{}  \"{}\"  {}", entry.blocks, entry.name, entry.file_type);
}
println!("{} BLOCKS FREE.", image.blocks_free()?);

// Read a file
let contents = CbmFileSystem::new(&image).read_file("HELLO")?;

// Store a file and save the image
CbmFileSystem::new(&mut image).write_file("COPY", FileType::Prg, &contents, false)?;
image.save("disk.d64")?;

// Create a blank image
let blank = DiskImage::create(DiskImageFormat::D64, "NEW DISK", "01")?;
# Ok::<(), cbmdisk::DiskError>(())
```

## Modules

- `format`: D64 geometry and constants
- `image`: the image container and its BAM
- `filesystem`: CBM DOS directory and file chains
- `listing`: directory listings
- `commands`: the operations behind the command-line tool
- `error`: Error types and Result alias
*/

#![warn(missing_docs)]

/// Command-line operations
pub mod commands;
/// Error types and Result alias
pub mod error;
/// Filesystem implementations (CBM DOS)
pub mod filesystem;
/// D64 format variants and constants
pub mod format;
/// Core image data structures (DiskImage, Bam)
pub mod image;
/// I/O operations for reading and writing D64 files
pub mod io;
/// Directory listings
pub mod listing;
/// Block allocation map visualization
pub mod map;
/// PETSCII filename conversion
pub mod petscii;

// Re-export common types
pub use error::{DiskError, Result};
pub use filesystem::{CbmFileSystem, DirEntry, FileSystem, FileSystemInfo, FileType};
pub use format::{detect_format, DiskImageFormat};
pub use image::{Bam, DiskImage};
pub use listing::{directory_prg, format_directory};
