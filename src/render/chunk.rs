//! Re-chunking of rendered output.
//!
//! [`ChunkBuffer`] turns irregular fragments into chunks of exactly
//! `chunk_size` bytes; [`pump`] drives it from a channel and adds the idle
//! flush: when the buffer holds bytes and nothing new arrives within the idle
//! window, whatever is buffered goes out as a short chunk.
//!
//! The idle timer is the receive timeout of the source channel, so there is
//! nothing to cancel when the pump returns, whichever way it exits.

use super::error::RenderError;
use may::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

/// Delivery chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Idle window after which a partial chunk is flushed.
pub const DEFAULT_FLUSH_IDLE: Duration = Duration::from_millis(1);

/// Accumulates bytes and hands them out in `chunk_size` units.
#[derive(Debug)]
pub struct ChunkBuffer {
    chunk_size: usize,
    buf: Vec<u8>,
}

impl ChunkBuffer {
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            buf: Vec::with_capacity(chunk_size),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append `bytes` and return every complete chunk now available.
    /// Overflow past the last complete chunk stays buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(bytes);
        let full = self.buf.len() / self.chunk_size * self.chunk_size;
        if full == 0 {
            return Vec::new();
        }
        let chunks = self.buf[..full]
            .chunks_exact(self.chunk_size)
            .map(<[u8]>::to_vec)
            .collect();
        self.buf.drain(..full);
        chunks
    }

    /// Take whatever is buffered, if anything.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::replace(&mut self.buf, Vec::with_capacity(self.chunk_size)))
        }
    }
}

/// Why [`pump`] stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpEnd {
    /// The source finished and every byte was emitted
    Finished,
    /// The source reported an error; bytes received before it were emitted
    SourceFailed(RenderError),
    /// The consumer went away
    SinkClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpOutcome {
    pub end: PumpEnd,
    pub chunks: usize,
    pub bytes: usize,
    pub idle_flushes: usize,
}

/// Move fragments from `source` through `buffer` into `emit` until the source
/// closes, fails, or `emit` reports the consumer is gone (returns `false`).
pub fn pump<F>(
    source: &mpsc::Receiver<Result<Vec<u8>, RenderError>>,
    buffer: &mut ChunkBuffer,
    idle: Duration,
    mut emit: F,
) -> PumpOutcome
where
    F: FnMut(Vec<u8>) -> bool,
{
    let mut outcome = PumpOutcome {
        end: PumpEnd::Finished,
        chunks: 0,
        bytes: 0,
        idle_flushes: 0,
    };
    let mut send = |chunk: Vec<u8>, outcome: &mut PumpOutcome| {
        outcome.chunks += 1;
        outcome.bytes += chunk.len();
        emit(chunk)
    };

    loop {
        let next = if buffer.is_empty() {
            source.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            source.recv_timeout(idle)
        };
        match next {
            Ok(Ok(bytes)) => {
                for chunk in buffer.push(&bytes) {
                    if !send(chunk, &mut outcome) {
                        outcome.end = PumpEnd::SinkClosed;
                        return outcome;
                    }
                }
            }
            Ok(Err(err)) => {
                if let Some(rest) = buffer.flush() {
                    if !send(rest, &mut outcome) {
                        outcome.end = PumpEnd::SinkClosed;
                        return outcome;
                    }
                }
                outcome.end = PumpEnd::SourceFailed(err);
                return outcome;
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(partial) = buffer.flush() {
                    outcome.idle_flushes += 1;
                    if !send(partial, &mut outcome) {
                        outcome.end = PumpEnd::SinkClosed;
                        return outcome;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Some(rest) = buffer.flush() {
        if !send(rest, &mut outcome) {
            outcome.end = PumpEnd::SinkClosed;
        }
    }
    outcome
}
