#![deny(unsafe_code)]

//! # yrgourd
//!
//! Mutually authenticated, forward-secret channels over any blocking byte
//! stream, built on ML-KEM-768 and a keyed transcript.
//!
//! A connection has two roles. The *initiator* knows the responder's static
//! public key ahead of time; the *responder* holds the matching static secret
//! and a policy deciding which initiator keys it will talk to. A two-message
//! handshake authenticates both sides and conceals the initiator's identity
//! from passive observers, after which both peers exchange length-prefixed,
//! authenticated records. Connections periodically ratchet fresh KEM-derived
//! secrets into their key state for forward secrecy.
//!
//! ## Security properties
//!
//! - Mutual authentication from long-term ML-KEM-768 keys
//! - Initiator identity hidden from passive observers
//! - Periodic in-band ratcheting (by bytes written and by time)
//! - All secret material zeroized on drop
//! - No panics on network input
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::{Read, Write};
//! use std::net::TcpStream;
//!
//! use rand_core::OsRng;
//! use yrgourd::{initiate, KeyPair};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // The responder's public key, distributed out of band.
//! let remote: yrgourd::PublicKey = "…hex…".parse()?;
//! let local = KeyPair::generate(&mut OsRng);
//!
//! let transport = TcpStream::connect("127.0.0.1:4040")?;
//! let mut conn = initiate(transport, &local.secret, &remote, None)?;
//! conn.write_all(b"hello")?;
//! let mut reply = [0u8; 5];
//! conn.read_exact(&mut reply)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod keys;

mod connection;
mod crypto;
mod handshake;
mod record;
#[cfg(test)]
mod testutil;
mod transcript;

pub use connection::{Config, Connection, ReadHalf, TryClone, WriteHalf};
pub use error::Error;
pub use handshake::{
    allow_all, initiate, initiate_with_rng, respond, respond_with_rng, REQ_LEN, RESP_LEN,
};
pub use keys::{KeyPair, PublicKey, StaticSecret};

/// The protocol domain string, and the sole version indicator on the wire.
pub const PROTOCOL_NAME: &str = transcript::PROTOCOL_NAME;
