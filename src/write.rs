use std::fs::OpenOptions;
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::{Result, StreamError};

/// Write `fragments` back to back into `path`, creating or truncating it.
///
/// Each fragment goes out in a single `write` call; a partial write stops
/// the whole operation with [`StreamError::ShortWrite`]. The file is
/// always synced and released afterwards, and a failure there is only
/// reported when nothing failed before it.
pub fn write_fragments<P, F>(path: P, fragments: &[F], mode: u32) -> Result<()>
where
    P: AsRef<Path>,
    F: AsRef<[u8]>,
{
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let file = options.open(path.as_ref())?;
    let written = write_all_fragments(&mut &file, fragments);
    let released = file.sync_all().map_err(StreamError::from);
    drop(file);
    written.and(released)
}

fn write_all_fragments<W: Write, F: AsRef<[u8]>>(
    writer: &mut W,
    fragments: &[F],
) -> Result<()> {
    for fragment in fragments.iter().map(AsRef::as_ref) {
        if fragment.is_empty() {
            continue;
        }
        let written = writer.write(fragment)?;
        if written != fragment.len() {
            return Err(StreamError::ShortWrite {
                written,
                expected: fragment.len(),
            });
        }
    }
    Ok(())
}

/// A [`Write`] that discards everything and counts the bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountingSink(u64);

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> u64 {
        self.0
    }
}

impl Write for CountingSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0 += data.len() as u64;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
