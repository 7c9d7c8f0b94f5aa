//! In-memory stand-ins for raw sources and decompression engines.

use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use crate::decompress::{Codec, Decoder, Rejected};
use crate::{ByteSource, Result, StreamError};

static LOGGER: Once = Once::new();

pub(crate) fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Observes what happened to a [`FakeSource`] after it was moved away.
#[derive(Clone, Default)]
pub(crate) struct Probe {
    closes: Arc<AtomicUsize>,
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl Probe {
    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

pub(crate) struct FakeSource {
    data: Cursor<Vec<u8>>,
    probe: Probe,
    fail_close: bool,
    closed: bool,
}

impl FakeSource {
    pub(crate) fn new(data: &[u8]) -> (Self, Probe) {
        Self::build(data, false)
    }

    pub(crate) fn failing_close(data: &[u8]) -> (Self, Probe) {
        Self::build(data, true)
    }

    fn build(data: &[u8], fail_close: bool) -> (Self, Probe) {
        let probe = Probe::default();
        let source = Self {
            data: Cursor::new(data.to_vec()),
            probe: probe.clone(),
            fail_close,
            closed: false,
        };
        (source, probe)
    }
}

impl Read for FakeSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(crate::source::closed_error());
        }
        self.data.read(buf)
    }
}

impl ByteSource for FakeSource {
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.probe.record("close");
        if self.fail_close {
            return Err(io::Error::new(io::ErrorKind::Other, "close failed")
                .into());
        }
        Ok(())
    }
}

pub(crate) const FAKE_MAGIC: &[u8; 4] = b"DATA";

/// Codec whose streams start with [`FAKE_MAGIC`] and carry the payload
/// verbatim after it.
#[derive(Clone, Default)]
pub(crate) struct FakeCodec {
    probe: Option<Probe>,
    fail_finish: bool,
}

impl FakeCodec {
    pub(crate) fn recording(probe: &Probe) -> Self {
        Self {
            probe: Some(probe.clone()),
            fail_finish: false,
        }
    }

    pub(crate) fn failing_finish() -> Self {
        Self {
            probe: None,
            fail_finish: true,
        }
    }
}

pub(crate) struct FakeDecoder<S> {
    source: S,
    probe: Option<Probe>,
    fail_finish: bool,
}

impl<S: ByteSource> Read for FakeDecoder<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.source.read(buf)
    }
}

impl<S: ByteSource> Decoder for FakeDecoder<S> {
    type Source = S;

    fn finish(&mut self) -> Result<()> {
        if let Some(probe) = &self.probe {
            probe.record("finish");
        }
        if self.fail_finish {
            return Err(StreamError::Decompress("finish failed".to_owned()));
        }
        Ok(())
    }

    fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl Codec for FakeCodec {
    type Reader<S: ByteSource + 'static> = FakeDecoder<S>;

    fn decoder<S: ByteSource + 'static>(
        &self,
        mut source: S,
    ) -> std::result::Result<FakeDecoder<S>, Rejected<S>> {
        let mut magic = [0u8; 4];
        if let Err(err) = source.read_exact(&mut magic) {
            return Err(Rejected {
                source,
                error: StreamError::InvalidHeader(err.to_string()),
            });
        }
        if &magic != FAKE_MAGIC {
            return Err(Rejected {
                source,
                error: StreamError::InvalidHeader("bad magic".to_owned()),
            });
        }
        Ok(FakeDecoder {
            source,
            probe: self.probe.clone(),
            fail_finish: self.fail_finish,
        })
    }
}
