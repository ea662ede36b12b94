use std::{fmt, io};

/// Errors produced by the yrgourd handshake and record layers.
///
/// Every error is terminal for its connection: there are no retries and no
/// partial successes.
#[derive(Debug)]
pub enum Error {
    /// The two-message handshake failed: a malformed message, a bad key, or
    /// a failed authenticator.
    InvalidHandshake,
    /// The responder's policy rejected the initiator's static public key.
    InitiatorNotAllowed,
    /// A record failed authentication or framing after the handshake.
    InvalidRecord,
    /// An error from the underlying transport, passed through verbatim.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandshake => f.write_str("invalid handshake"),
            Self::InitiatorNotAllowed => f.write_str("initiator not allowed"),
            Self::InvalidRecord => f.write_str("invalid record"),
            Self::Io(err) => write!(f, "transport error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}
