//! Established connections: the blocking byte-stream surface over the
//! record layer, plus ratchet bookkeeping.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use rand_core::OsRng;
use zeroize::Zeroize;

use crate::crypto::kem::{self, CT_LEN};
use crate::error::Error;
use crate::keys::{PublicKey, StaticSecret};
use crate::record::{self, HEADER_LEN, MAX_MESSAGE_LEN, RATCHET_BODY_LEN};
use crate::transcript::{Transcript, TAG_LEN};

/// Ratchet thresholds for one connection, immutable once it exists.
///
/// A value of zero means "ratchet at the next opportunity".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Ratchet after this many bytes have been written.
    pub ratchet_after_bytes: u64,
    /// Ratchet after this much time has passed since the last ratchet.
    pub ratchet_after_time: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ratchet_after_bytes: 1024 * 1024 * 1024, // 1 GiB
            ratchet_after_time: Duration::from_secs(15 * 60),
        }
    }
}

/// An established yrgourd channel over a blocking transport.
///
/// Implements [`Read`] and [`Write`]. The two directions share nothing but
/// the transport: use [`Connection::into_split`] for full-duplex use from
/// one reading and one writing thread.
pub struct Connection<S> {
    transport: S,
    reader: ReadState,
    writer: WriteState,
}

impl<S> Connection<S> {
    pub(crate) fn new(
        transport: S,
        recv: Transcript,
        send: Transcript,
        local: StaticSecret,
        remote: PublicKey,
        config: Config,
    ) -> Self {
        Self {
            transport,
            reader: ReadState {
                recv,
                local,
                recv_buf: Vec::new(),
                msg_buf: Vec::new(),
            },
            writer: WriteState {
                send,
                remote,
                send_buf: Vec::new(),
                sent_bytes: 0,
                last_ratchet: Instant::now(),
                config,
            },
        }
    }

    /// A reference to the underlying transport.
    pub fn get_ref(&self) -> &S {
        &self.transport
    }

    #[cfg(test)]
    pub(crate) fn transcripts(&mut self) -> (&mut Transcript, &mut Transcript) {
        (&mut self.writer.send, &mut self.reader.recv)
    }
}

impl<S: TryClone> Connection<S> {
    /// Split into independently owned halves for full-duplex use.
    ///
    /// The read half owns the receive transcript, buffers, and the local
    /// static secret; the write half owns the send transcript and ratchet
    /// state. Each half gets its own transport handle.
    pub fn into_split(self) -> io::Result<(ReadHalf<S>, WriteHalf<S>)> {
        let read_transport = self.transport.try_clone()?;
        Ok((
            ReadHalf {
                transport: read_transport,
                state: self.reader,
            },
            WriteHalf {
                transport: self.transport,
                state: self.writer,
            },
        ))
    }
}

impl<S: Read> Read for Connection<S> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.reader.read(&mut self.transport, out)
    }
}

impl<S: Write> Write for Connection<S> {
    /// Frame and send `buf` as one record, ratcheting first if a threshold
    /// has tripped.
    ///
    /// Zero-length writes return `Ok(0)` without emitting anything: on the
    /// wire an empty record would be indistinguishable from a ratchet
    /// signal.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is `2^24` bytes or longer; callers needing larger
    /// payloads must chunk.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(&mut self.transport, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.transport.flush()
    }
}

/// A transport that can produce a second handle to the same stream.
pub trait TryClone: Sized {
    /// Create a new independently owned handle to the same stream.
    fn try_clone(&self) -> io::Result<Self>;
}

impl TryClone for TcpStream {
    fn try_clone(&self) -> io::Result<Self> {
        TcpStream::try_clone(self)
    }
}

/// The read half of a split [`Connection`].
pub struct ReadHalf<S> {
    transport: S,
    state: ReadState,
}

impl<S> ReadHalf<S> {
    /// A reference to this half's transport handle.
    pub fn get_ref(&self) -> &S {
        &self.transport
    }
}

impl<S: Read> Read for ReadHalf<S> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.state.read(&mut self.transport, out)
    }
}

/// The write half of a split [`Connection`].
pub struct WriteHalf<S> {
    transport: S,
    state: WriteState,
}

impl<S> WriteHalf<S> {
    /// A reference to this half's transport handle.
    pub fn get_ref(&self) -> &S {
        &self.transport
    }
}

impl<S: Write> Write for WriteHalf<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.write(&mut self.transport, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.transport.flush()
    }
}

struct ReadState {
    recv: Transcript,
    local: StaticSecret,
    recv_buf: Vec<u8>,
    msg_buf: Vec<u8>,
}

impl ReadState {
    fn read(&mut self, transport: &mut impl Read, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            // Satisfy the read from carried-over plaintext first.
            if !self.msg_buf.is_empty() {
                let n = self.msg_buf.len().min(out.len());
                out[..n].copy_from_slice(&self.msg_buf[..n]);
                self.msg_buf.drain(..n);
                return Ok(n);
            }

            // Read and decrypt the next header. A clean EOF at a record
            // boundary ends the stream; there is no close record.
            let mut header = [0u8; HEADER_LEN];
            if !read_exact_or_eof(transport, &mut header)? {
                return Ok(0);
            }
            let len = record::decode_header(&mut self.recv, &header);

            if len == 0 {
                // Ratchet frame: recover the peer's fresh KEM secret with
                // our static key and fold it into the receive direction.
                self.fill(transport, RATCHET_BODY_LEN)?;
                let ct = record::decode_body(&mut self.recv, &self.recv_buf)
                    .map_err(io::Error::from)?;
                let ct: [u8; CT_LEN] = ct
                    .as_slice()
                    .try_into()
                    .map_err(|_| io::Error::from(Error::InvalidRecord))?;
                let ss = kem::decapsulate(self.local.seed(), &ct)
                    .ok_or_else(|| io::Error::from(Error::InvalidRecord))?;
                self.recv.mix("ratchet-ss", ss.as_bytes());
                continue;
            }

            self.fill(transport, len + TAG_LEN)?;
            let plaintext =
                record::decode_body(&mut self.recv, &self.recv_buf).map_err(io::Error::from)?;
            self.msg_buf = plaintext;
        }
    }

    fn fill(&mut self, transport: &mut impl Read, n: usize) -> io::Result<()> {
        self.recv_buf.clear();
        self.recv_buf.resize(n, 0);
        transport.read_exact(&mut self.recv_buf)
    }
}

impl Drop for ReadState {
    fn drop(&mut self) {
        // msg_buf holds live plaintext.
        self.msg_buf.zeroize();
        self.recv_buf.zeroize();
    }
}

struct WriteState {
    send: Transcript,
    remote: PublicKey,
    send_buf: Vec<u8>,
    sent_bytes: u64,
    last_ratchet: Instant,
    config: Config,
}

impl WriteState {
    fn write(&mut self, transport: &mut impl Write, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        assert!(
            buf.len() < MAX_MESSAGE_LEN,
            "record plaintext must be shorter than 2^24 bytes"
        );

        self.sent_bytes += buf.len() as u64;
        let now = Instant::now();
        if self.sent_bytes > self.config.ratchet_after_bytes
            || now.duration_since(self.last_ratchet) > self.config.ratchet_after_time
        {
            self.sent_bytes = 0;
            self.last_ratchet = now;
            self.ratchet(transport)?;
        }

        self.send_buf.clear();
        record::encode_record(&mut self.send, &mut self.send_buf, buf)
            .map_err(io::Error::from)?;
        transport.write_all(&self.send_buf)?;
        Ok(buf.len())
    }

    /// Emit a ratchet frame with a fresh KEM secret encapsulated against
    /// the peer's static key, then fold the secret into the send direction.
    fn ratchet(&mut self, transport: &mut impl Write) -> io::Result<()> {
        let (ct, ss) = kem::encapsulate(self.remote.as_bytes(), &mut OsRng)
            .ok_or_else(|| io::Error::from(Error::InvalidRecord))?;
        self.send_buf.clear();
        record::encode_ratchet(&mut self.send, &mut self.send_buf, &ct)
            .map_err(io::Error::from)?;
        transport.write_all(&self.send_buf)?;
        self.send.mix("ratchet-ss", ss.as_bytes());
        Ok(())
    }
}

/// Read exactly `buf.len()` bytes, distinguishing a clean EOF before the
/// first byte (`Ok(false)`) from a mid-record truncation (an error).
fn read_exact_or_eof(transport: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match transport.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(true)
}
