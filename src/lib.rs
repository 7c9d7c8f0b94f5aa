//! # fs-stream
//!
//! Layered readers for large, possibly gzip-compressed text files.
//!
//! A file is opened as a [`ByteSource`], optionally wrapped in a
//! decompression layer and optionally in read-ahead [`pump::Pump`]s:
//!
//! ```no_run
//! use std::io::Read;
//! use fs_stream::{open_read_file_and_pump, text, ByteSource};
//!
//! let mut source = open_read_file_and_pump("events.csv.gz")?;
//! let mut head = [0u8; 4096];
//! let n = source.read(&mut head)?;
//! if !text::classify(&head[..n]).is_text() {
//!     log::warn!("events.csv.gz does not look like text");
//! }
//! source.close()?;
//! # Ok::<(), fs_stream::StreamError>(())
//! ```
//!
//! Every layer owns the one beneath it and `close` releases the whole
//! chain, innermost last.

pub mod config;
pub mod decompress;
pub mod errors;
pub mod gzip;
pub mod open;
pub mod pump;
pub mod source;
pub mod text;
pub mod write;

#[cfg(test)]
mod testing;

pub use config::PipelineConfig;
pub use errors::{Result, StreamError};
pub use open::{open_read_file, open_read_file_and_pump, FileOpener};
pub use source::{ByteSource, FileSource};
pub use write::{write_fragments, CountingSink};
