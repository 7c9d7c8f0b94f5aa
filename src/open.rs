use std::path::Path;

use crate::decompress::{decompress, Codec, Rejected};
use crate::gzip::Gzip;
use crate::pump::Pump;
use crate::{ByteSource, FileSource, PipelineConfig, Result};

/// Opens files for reading, decompressing those whose name carries the
/// configured suffix.
#[derive(Debug, Clone, Default)]
pub struct FileOpener<C = Gzip> {
    config: PipelineConfig,
    codec: C,
}

impl FileOpener<Gzip> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_codec(config, Gzip)
    }
}

impl<C: Codec> FileOpener<C> {
    pub fn with_codec(config: PipelineConfig, codec: C) -> Self {
        Self { config, codec }
    }

    /// Open `path` and return its logical content, without read-ahead.
    ///
    /// # Errors
    /// [`crate::StreamError::Open`] when the file cannot be opened and
    /// [`crate::StreamError::InvalidHeader`] when a compressed file does
    /// not start with a valid header. Nothing stays open on failure.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Box<dyn ByteSource>> {
        let path = path.as_ref();
        let raw = FileSource::open(path)?;
        let compressed = self.config.is_compressed(path);
        let source = self.wrap(raw, compressed).map_err(|err| {
            log::warn!("Unable to decompress {}: {}", path.display(), err);
            err
        })?;
        if compressed {
            log::debug!("Opened compressed file for reading: {}", path.display());
        } else {
            log::debug!("Opened file for reading: {}", path.display());
        }
        Ok(source)
    }

    /// Like [`FileOpener::open`], but raw reads (and decompression, for
    /// compressed files) run ahead of the caller on background threads.
    pub fn open_prefetched(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Box<dyn ByteSource>> {
        let path = path.as_ref();
        self.config.validate()?;
        let raw = FileSource::open(path)?;
        let compressed = self.config.is_compressed(path);
        let source =
            self.wrap_prefetched(raw, compressed).map_err(|err| {
                log::warn!("Unable to prefetch {}: {}", path.display(), err);
                err
            })?;
        log::debug!(
            "Opened {} for prefetched reading (compressed: {})",
            path.display(),
            compressed
        );
        Ok(source)
    }

    /// Put the decompression layer, if any, over an already open source.
    pub fn wrap<S>(&self, raw: S, compressed: bool) -> Result<Box<dyn ByteSource>>
    where
        S: ByteSource + 'static,
    {
        if !compressed {
            return Ok(Box::new(raw));
        }
        let reader = decompress(&self.codec, raw).map_err(Rejected::release)?;
        Ok(Box::new(reader))
    }

    /// Build the prefetching chain over an already open source.
    ///
    /// Plain: `Pump(raw)`. Compressed: `Pump(Decompressed(Pump(raw)))`, the
    /// inner pump getting half of the blocks so that raw reads and
    /// decompression both run ahead of the caller.
    pub fn wrap_prefetched<S>(
        &self,
        raw: S,
        compressed: bool,
    ) -> Result<Box<dyn ByteSource>>
    where
        S: ByteSource + 'static,
    {
        let block_size = self.config.block_size;
        if !compressed {
            let pump = Pump::spawn(raw, block_size, self.config.block_count)?;
            return Ok(Box::new(pump));
        }
        let raw = Pump::spawn(raw, block_size, self.config.raw_block_count())?;
        let reader = decompress(&self.codec, raw).map_err(Rejected::release)?;
        let pump = Pump::spawn(reader, block_size, self.config.block_count)?;
        Ok(Box::new(pump))
    }
}

/// Open `path` with the default configuration, see [`FileOpener::open`].
pub fn open_read_file(path: impl AsRef<Path>) -> Result<Box<dyn ByteSource>> {
    FileOpener::new(PipelineConfig::default()).open(path)
}

/// Open `path` with the default configuration and read-ahead, see
/// [`FileOpener::open_prefetched`].
pub fn open_read_file_and_pump(
    path: impl AsRef<Path>,
) -> Result<Box<dyn ByteSource>> {
    FileOpener::new(PipelineConfig::default()).open_prefetched(path)
}
