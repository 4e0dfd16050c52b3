//! Host-side serial link over arbitrary byte streams (stdin/stdout by default).

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::thread;

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use loadnode_traits::{BoxError, SerialLink};

use crate::error::HwError;

/// Inbound chunks buffered between the reader thread and the loop.
pub const INBOUND_CAPACITY: usize = 64;

/// Serial link backed by a reader thread and a writer.
///
/// The reader thread blocks on the input stream and forwards each read, as
/// one chunk, through a bounded channel; `poll_byte` only ever does a
/// `try_recv`. A command line written in one piece is therefore seen whole. Once the input
/// reaches EOF the link stays quiet instead of erroring, so piping a finite
/// command script keeps the loop running.
pub struct StdioLink<W: Write = std::io::Stdout> {
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    out: W,
    closed: bool,
}

impl StdioLink<std::io::Stdout> {
    /// Commands from stdin, frames to stdout.
    pub fn stdio() -> crate::error::Result<Self> {
        Self::from_parts(std::io::stdin(), std::io::stdout())
    }
}

impl<W: Write> StdioLink<W> {
    pub fn from_parts<R: Read + Send + 'static>(reader: R, out: W) -> crate::error::Result<Self> {
        let (tx, rx) = bounded::<Vec<u8>>(INBOUND_CAPACITY);
        thread::Builder::new()
            .name("loadnode-serial-rx".into())
            .spawn(move || {
                let mut reader = reader;
                let mut buf = [0u8; 256];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                return;
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "serial reader stopped");
                            break;
                        }
                    }
                }
                tracing::debug!("serial input closed");
            })?;
        Ok(Self {
            rx,
            pending: VecDeque::new(),
            out,
            closed: false,
        })
    }

    /// True once the input stream ended and every buffered chunk was taken.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: Write> SerialLink for StdioLink<W> {
    fn poll_byte(&mut self) -> Result<Option<u8>, BoxError> {
        if self.pending.is_empty() && !self.closed {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend(chunk),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.closed = true,
            }
        }
        Ok(self.pending.pop_front())
    }

    fn write_line(&mut self, line: &str) -> Result<(), BoxError> {
        self.out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.write_all(b"\r\n"))
            .and_then(|()| self.out.flush())
            .map_err(|e| -> BoxError {
                if e.kind() == std::io::ErrorKind::BrokenPipe {
                    Box::new(HwError::Disconnected)
                } else {
                    Box::new(HwError::Io(e))
                }
            })
    }
}

impl<W: Write> std::fmt::Debug for StdioLink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioLink")
            .field("pending", &self.pending.len())
            .field("queued_chunks", &self.rx.len())
            .field("closed", &self.closed)
            .finish()
    }
}
