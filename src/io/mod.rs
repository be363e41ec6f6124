/// I/O operations for reading and writing D64 files

/// Reader implementation for D64 files
pub mod reader;
/// Writer implementation for D64 files
pub mod writer;

pub use reader::read_d64;
pub use writer::write_d64;
