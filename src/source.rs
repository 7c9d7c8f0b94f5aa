use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::{Result, StreamError};

/// A sequential byte stream that owns whatever it reads from.
///
/// Every layer of a reading chain (raw file, decompression, prefetch)
/// implements this trait and exclusively owns the layer beneath it.
/// Dropping a source releases it as well, but only [`ByteSource::close`]
/// reports release failures.
pub trait ByteSource: Read + Send {
    /// Release this source and everything it owns.
    ///
    /// Calling `close` again after the first call is a no-op returning
    /// `Ok(())`. Reading from a closed source fails.
    fn close(&mut self) -> Result<()>;
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

pub(crate) fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "read from a closed source")
}

/// Raw file handle opened for reading.
#[derive(Debug)]
pub struct FileSource {
    file: Option<File>,
    path: PathBuf,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| StreamError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            file: Some(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Err(closed_error()),
        }
    }
}

impl ByteSource for FileSource {
    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            log::trace!("Closed {}", self.path.display());
        }
        Ok(())
    }
}
