//! Blocking in-memory duplex pipes for exercising connections without
//! sockets, standing in for the loopback the sample binaries use.

use std::io::{self, Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender};

/// One end of an in-memory duplex byte stream.
///
/// Writes never block (the channel is unbounded); reads block until the
/// peer writes or hangs up. Dropping an end is a clean EOF for the peer.
pub struct PipeEnd {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
}

/// Create a connected pair of pipe ends.
pub fn pipe() -> (PipeEnd, PipeEnd) {
    let (a_tx, b_rx) = channel();
    let (b_tx, a_rx) = channel();
    let a = PipeEnd {
        tx: a_tx,
        rx: a_rx,
        pending: Vec::new(),
        offset: 0,
    };
    let b = PipeEnd {
        tx: b_tx,
        rx: b_rx,
        pending: Vec::new(),
        offset: 0,
    };
    (a, b)
}

impl Read for PipeEnd {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.offset == self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                // Peer hung up: clean EOF.
                Err(_) => return Ok(0),
            }
        }
        let n = (self.pending.len() - self.offset).min(out.len());
        out[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
        self.offset += n;
        Ok(n)
    }
}

impl Write for PipeEnd {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
