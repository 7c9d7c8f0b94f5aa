use std::fmt;
use std::io::{self, Read};

use crate::source::closed_error;
use crate::{ByteSource, Result, StreamError};

/// Decompression engine state bound to the source it reads from.
pub trait Decoder: Read + Send {
    type Source: ByteSource;

    /// Release the engine state. Must not touch the wrapped source.
    fn finish(&mut self) -> Result<()>;

    fn source_mut(&mut self) -> &mut Self::Source;
}

/// Constructs decoders over byte sources.
pub trait Codec {
    type Reader<S: ByteSource + 'static>: Decoder<Source = S> + 'static;

    /// Build a decoder over `source`, handing the source back inside
    /// [`Rejected`] when its leading bytes are not a compressed stream.
    fn decoder<S: ByteSource + 'static>(
        &self,
        source: S,
    ) -> std::result::Result<Self::Reader<S>, Rejected<S>>;
}

/// A source that a [`Codec`] refused to wrap, together with the reason.
///
/// The source is still open and the holder is responsible for it.
pub struct Rejected<S> {
    pub source: S,
    pub error: StreamError,
}

impl<S: ByteSource> Rejected<S> {
    /// Close the rejected source and return the construction error.
    pub fn release(mut self) -> StreamError {
        if let Err(err) = self.source.close() {
            log::warn!("Failed to close rejected source: {}", err);
        }
        self.error
    }
}

impl<S> fmt::Debug for Rejected<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Byte source exposing the decompressed content of another source.
pub struct Decompressed<D: Decoder> {
    decoder: D,
    closed: bool,
}

impl<D: Decoder> Decompressed<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            closed: false,
        }
    }
}

/// Wrap `source` in the decompression decorator produced by `codec`.
pub fn decompress<C, S>(
    codec: &C,
    source: S,
) -> std::result::Result<Decompressed<C::Reader<S>>, Rejected<S>>
where
    C: Codec,
    S: ByteSource + 'static,
{
    codec.decoder(source).map(Decompressed::new)
}

impl<D: Decoder> Read for Decompressed<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(closed_error());
        }
        self.decoder.read(buf)
    }
}

impl<D: Decoder> ByteSource for Decompressed<D> {
    /// Releases the engine first, then the wrapped source even when the
    /// engine fails. The engine error takes precedence.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let engine = self.decoder.finish();
        let source = self.decoder.source_mut().close();
        engine.and(source)
    }
}
