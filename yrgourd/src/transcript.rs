//! The keyed transcript underlying the handshake and record layers.
//!
//! A [`Transcript`] is a stateful object absorbing a sequence of labeled
//! inputs. Both peers must apply the same labeled operations, in the same
//! order, bit-for-bit; any divergence makes every later authenticated
//! operation fail.
//!
//! The state is a single 32-byte chaining key. Every operation absorbs its
//! label via HMAC-BLAKE2s, and keyed operations then ratchet the chain with
//! a two-output HKDF to obtain a one-use operation key. Stream operations
//! XOR an HKDF-Expand keystream; sealing operations use one-shot
//! ChaCha20Poly1305 under the operation key.

use zeroize::Zeroizing;

use crate::crypto::aead;
use crate::crypto::hash::{self, HASH_LEN};
use crate::error::Error;

/// The domain string transcripts are initialized with.
pub const PROTOCOL_NAME: &str = "yrgourd.v1";

/// Length of the authenticator tag appended by [`Transcript::seal`].
pub const TAG_LEN: usize = aead::TAG_LEN;

/// A keyed transcript of every labeled protocol step so far.
///
/// Cloning forks the transcript; the copies evolve independently.
///
/// Inputs to the stream operations (`encrypt`, `decrypt`, `derive`) must
/// stay within [`hash::MAX_KEYSTREAM_LEN`]; protocol messages never exceed
/// an encapsulation key's 1184 bytes. `seal`/`open` are unbounded.
#[derive(Clone)]
pub struct Transcript {
    /// Chaining key, ratcheted by every operation.
    ck: Zeroizing<[u8; HASH_LEN]>,
}

impl Transcript {
    /// Initialize a transcript from a domain string.
    pub fn new(domain: &str) -> Self {
        // Short domain strings are zero-padded into the initial chaining key.
        let bytes = domain.as_bytes();
        debug_assert!(bytes.len() <= HASH_LEN);
        let mut ck = Zeroizing::new([0u8; HASH_LEN]);
        ck[..bytes.len()].copy_from_slice(bytes);
        Self { ck }
    }

    fn absorb(&mut self, data: &[u8]) {
        self.ck = hash::hmac(&self.ck, data);
    }

    /// Absorb the label, then ratchet the chain into a one-use operation key.
    fn operation_key(&mut self, label: &str) -> Zeroizing<[u8; HASH_LEN]> {
        self.absorb(label.as_bytes());
        let (next, key) = hash::chain(&self.ck, &[]);
        self.ck = next;
        key
    }

    /// Absorb `data` under `label`. Produces no output.
    pub fn mix(&mut self, label: &str, data: &[u8]) {
        self.absorb(label.as_bytes());
        self.absorb(data);
    }

    /// Encrypt `plaintext` with a keystream bound to the transcript state.
    ///
    /// Not authenticated on its own; integrity comes from a later `seal` or
    /// `open` over the same transcript.
    pub fn encrypt(&mut self, label: &str, plaintext: &[u8]) -> Vec<u8> {
        let key = self.operation_key(label);
        let mut out = plaintext.to_vec();
        hash::xor_keystream(&key, &mut out);
        self.absorb(&out);
        out
    }

    /// Invert [`Transcript::encrypt`]. Succeeds on any byte string;
    /// correctness is established by a later authenticated operation.
    pub fn decrypt(&mut self, label: &str, ciphertext: &[u8]) -> Vec<u8> {
        let key = self.operation_key(label);
        let mut out = ciphertext.to_vec();
        hash::xor_keystream(&key, &mut out);
        self.absorb(ciphertext);
        out
    }

    /// Encrypt and authenticate `plaintext`, appending [`TAG_LEN`] bytes of
    /// authenticator over the transcript so far.
    pub fn seal(&mut self, label: &str, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let key = self.operation_key(label);
        let mut out = vec![0u8; plaintext.len() + TAG_LEN];
        out[..plaintext.len()].copy_from_slice(plaintext);
        aead::seal_in_place(&key, &mut out, plaintext.len())?;
        self.absorb(&out);
        Ok(out)
    }

    /// Invert [`Transcript::seal`], verifying the authenticator.
    ///
    /// Fails if the input or any prior transcript state was tampered with;
    /// no plaintext is exposed on failure.
    pub fn open(&mut self, label: &str, sealed: &[u8]) -> Result<Vec<u8>, Error> {
        let key = self.operation_key(label);
        let mut out = sealed.to_vec();
        let plaintext_len = aead::open_in_place(&key, &mut out)?;
        self.absorb(sealed);
        out.truncate(plaintext_len);
        Ok(out)
    }

    /// Extract `n` bytes of keyed output, absorbing them back into the
    /// transcript. Not idempotent: successive calls yield distinct output.
    pub fn derive(&mut self, label: &str, n: usize) -> Vec<u8> {
        let key = self.operation_key(label);
        let mut out = vec![0u8; n];
        hash::xor_keystream(&key, &mut out);
        self.absorb(&out);
        out
    }
}
