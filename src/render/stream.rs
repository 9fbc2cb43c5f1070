//! Output byte stream of a render job.
//!
//! Built on the same `may` channel pairing as the SSE module: the assembler
//! coroutine holds a [`ByteSink`], the HTTP side reads the [`ByteStream`].
//! Dropping the stream before it is exhausted aborts the job.

use super::context::AbortController;
use may::sync::mpsc;
use std::io::{self, Write};

/// Producer half, owned by the assembler coroutine.
pub(crate) struct ByteSink {
    tx: mpsc::Sender<io::Result<Vec<u8>>>,
}

impl ByteSink {
    /// Queue a chunk; `false` once the consumer has gone away.
    pub(crate) fn send(&self, chunk: Vec<u8>) -> bool {
        self.tx.send(Ok(chunk)).is_ok()
    }

    /// Terminate the stream with an error.
    pub(crate) fn fail(self, err: io::Error) {
        let _ = self.tx.send(Err(err));
    }
}

/// Ordered chunks of one HTML document.
///
/// Yields `Ok` chunks until the document is complete, or a single `Err`
/// after which the stream is over.
pub struct ByteStream {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    abort: Option<AbortController>,
    done: bool,
}

pub(crate) fn byte_channel(abort: AbortController) -> (ByteSink, ByteStream) {
    let (tx, rx) = mpsc::channel();
    (
        ByteSink { tx },
        ByteStream {
            rx,
            abort: Some(abort),
            done: false,
        },
    )
}

impl ByteStream {
    /// Read every chunk into one buffer.
    pub fn collect_bytes(self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        for chunk in self {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    /// Write each chunk to `writer` as it arrives, flushing after every chunk.
    /// Returns the number of bytes written.
    pub fn pipe_to<W: Write>(self, writer: &mut W) -> io::Result<usize> {
        let mut written = 0;
        for chunk in self {
            let chunk = chunk?;
            writer.write_all(&chunk)?;
            writer.flush()?;
            written += chunk.len();
        }
        Ok(written)
    }
}

impl Iterator for ByteStream {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.rx.recv() {
            Ok(Ok(chunk)) => Some(Ok(chunk)),
            Ok(Err(err)) => {
                self.done = true;
                Some(Err(err))
            }
            Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

impl Drop for ByteStream {
    fn drop(&mut self) {
        if !self.done {
            if let Some(abort) = self.abort.take() {
                abort.abort();
            }
        }
    }
}
