//! Gzip engine built on [`flate2`].
//!
//! The fixed part of the gzip header is checked while the decoder is
//! constructed, so a file that merely carries a `.gz` name is rejected up
//! front instead of on the first read. Concatenated members are decoded as
//! one stream.

use std::io::{self, Chain, Cursor, Read};

use flate2::read::MultiGzDecoder;

use crate::decompress::{Codec, Decoder, Rejected};
use crate::{ByteSource, Result, StreamError};

const HEADER_LEN: usize = 10;
const MAGIC: [u8; 2] = [0x1f, 0x8b];
const METHOD_DEFLATE: u8 = 8;
const RESERVED_FLAGS: u8 = 0xE0;

#[derive(Debug, Clone, Copy, Default)]
pub struct Gzip;

impl Codec for Gzip {
    type Reader<S: ByteSource + 'static> = GzipDecoder<S>;

    fn decoder<S: ByteSource + 'static>(
        &self,
        source: S,
    ) -> std::result::Result<GzipDecoder<S>, Rejected<S>> {
        GzipDecoder::new(source)
    }
}

pub struct GzipDecoder<S> {
    inner: MultiGzDecoder<Chain<Cursor<Vec<u8>>, S>>,
    failure: Option<String>,
}

impl<S: ByteSource> GzipDecoder<S> {
    pub fn new(mut source: S) -> std::result::Result<Self, Rejected<S>> {
        let header = match read_header(&mut source) {
            Ok(header) => header,
            Err(err) => {
                return Err(Rejected {
                    source,
                    error: err.into(),
                })
            }
        };
        if let Err(reason) = check_header(&header) {
            return Err(Rejected {
                source,
                error: StreamError::InvalidHeader(reason),
            });
        }
        // The header bytes are replayed so flate2 parses the whole header,
        // including the optional fields.
        let inner = MultiGzDecoder::new(Cursor::new(header).chain(source));
        Ok(Self {
            inner,
            failure: None,
        })
    }
}

fn read_header<R: Read>(source: &mut R) -> io::Result<Vec<u8>> {
    let mut header = vec![0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        match source.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    header.truncate(filled);
    Ok(header)
}

fn check_header(header: &[u8]) -> std::result::Result<(), String> {
    if header.len() >= MAGIC.len() && header[..MAGIC.len()] != MAGIC {
        return Err(format!(
            "missing gzip magic, found {:02x} {:02x}",
            header[0], header[1]
        ));
    }
    if header.len() < HEADER_LEN {
        return Err(format!("truncated gzip header of {} bytes", header.len()));
    }
    if header[2] != METHOD_DEFLATE {
        return Err(format!("unsupported compression method {}", header[2]));
    }
    if header[3] & RESERVED_FLAGS != 0 {
        return Err(format!("reserved header flags set: {:#04x}", header[3]));
    }
    Ok(())
}

impl<S: ByteSource> Read for GzipDecoder<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(err) if err.kind() != io::ErrorKind::Interrupted => {
                if self.failure.is_none() {
                    self.failure = Some(err.to_string());
                }
                Err(err)
            }
            other => other,
        }
    }
}

impl<S: ByteSource> Decoder for GzipDecoder<S> {
    type Source = S;

    fn finish(&mut self) -> Result<()> {
        match self.failure.take() {
            Some(reason) => Err(StreamError::Decompress(reason)),
            None => Ok(()),
        }
    }

    fn source_mut(&mut self) -> &mut S {
        self.inner.get_mut().get_mut().1
    }
}
