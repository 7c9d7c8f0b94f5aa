//! Read-ahead over a [`ByteSource`] on a background thread.
//!
//! A fixed set of `block_count` buffers of `block_size` bytes circulates
//! between the worker and the reader: the worker takes a free block, fills
//! it with one read of the wrapped source and sends it over; the reader
//! drains it and hands it back. The worker never runs more than
//! `block_count` blocks ahead.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use anyhow::anyhow;
use crossbeam_channel::{bounded, Receiver, Sender};

use crate::source::closed_error;
use crate::{ByteSource, Result, StreamError};

pub struct Pump {
    filled: Option<Receiver<io::Result<Vec<u8>>>>,
    free: Option<Sender<Vec<u8>>>,
    worker: Option<JoinHandle<Result<()>>>,
    current: Vec<u8>,
    pos: usize,
    failure: Option<(io::ErrorKind, String)>,
    eof: bool,
}

impl Pump {
    /// Move `source` onto a worker thread and start reading ahead.
    pub fn spawn<S>(
        mut source: S,
        block_size: usize,
        block_count: usize,
    ) -> Result<Self>
    where
        S: ByteSource + 'static,
    {
        if block_size == 0 || block_count == 0 {
            // Nothing was spawned, the source is still ours to release.
            if let Err(err) = source.close() {
                log::warn!("Failed to close source of rejected pump: {}", err);
            }
            return Err(StreamError::Config(format!(
                "pump needs a positive block size and count, got {} x {}",
                block_size, block_count
            )));
        }

        let (filled_tx, filled_rx) = bounded(block_count);
        let (free_tx, free_rx) = bounded(block_count);
        for _ in 0..block_count {
            free_tx
                .send(Vec::with_capacity(block_size))
                .map_err(|_| anyhow!("pump free list closed during setup"))?;
        }

        let worker = thread::Builder::new()
            .name("fs-stream-pump".to_owned())
            .spawn(move || {
                pump_blocks(&mut source, block_size, &free_rx, filled_tx);
                source.close()
            })?;

        log::trace!(
            "Started pump with {} blocks of {} bytes",
            block_count,
            block_size
        );
        Ok(Self {
            filled: Some(filled_rx),
            free: Some(free_tx),
            worker: Some(worker),
            current: Vec::new(),
            pos: 0,
            failure: None,
            eof: false,
        })
    }

    /// Stop the worker and collect the result of closing its source.
    fn shutdown(&mut self) -> Result<()> {
        // Disconnecting both channels unblocks a worker waiting on either.
        self.filled.take();
        self.free.take();
        match self.worker.take() {
            Some(worker) => match worker.join() {
                Ok(result) => result,
                Err(_) => Err(anyhow!("pump worker panicked").into()),
            },
            None => Ok(()),
        }
    }

    fn next_block(&mut self) -> io::Result<bool> {
        let filled = match self.filled.as_ref() {
            Some(filled) => filled,
            None => return Err(closed_error()),
        };
        let spent = std::mem::take(&mut self.current);
        self.pos = 0;
        // Only pool blocks go back; the initial placeholder has no capacity.
        if let (Some(free), true) = (self.free.as_ref(), spent.capacity() > 0) {
            // The worker may already be gone after hitting the end.
            let _ = free.send(spent);
        }
        match filled.recv() {
            Ok(Ok(block)) => {
                self.current = block;
                Ok(true)
            }
            Ok(Err(err)) => {
                self.failure = Some((err.kind(), err.to_string()));
                Err(err)
            }
            Err(_) => {
                self.eof = true;
                Ok(false)
            }
        }
    }
}

fn pump_blocks<S: Read>(
    source: &mut S,
    block_size: usize,
    free: &Receiver<Vec<u8>>,
    filled: Sender<io::Result<Vec<u8>>>,
) {
    while let Ok(mut block) = free.recv() {
        block.resize(block_size, 0);
        let read = loop {
            match source.read(&mut block) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                other => break other,
            }
        };
        match read {
            Ok(0) => break,
            Ok(n) => {
                block.truncate(n);
                if filled.send(Ok(block)).is_err() {
                    break;
                }
            }
            Err(err) => {
                log::debug!("Pump worker stopped on read error: {}", err);
                let _ = filled.send(Err(err));
                break;
            }
        }
    }
}

impl Read for Pump {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.worker.is_none() {
            return Err(closed_error());
        }
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos == self.current.len() {
            if let Some((kind, msg)) = &self.failure {
                return Err(io::Error::new(*kind, msg.clone()));
            }
            if self.eof || !self.next_block()? {
                return Ok(0);
            }
        }
        let available = &self.current[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl ByteSource for Pump {
    /// Stops the worker, which closes the wrapped source on its way out.
    fn close(&mut self) -> Result<()> {
        self.shutdown()
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::warn!("Error while dropping pump: {}", err);
        }
    }
}
