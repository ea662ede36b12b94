//! Long-term and ephemeral key material.
//!
//! Both kinds of key are ML-KEM-768 keypairs; "static" and "ephemeral" are
//! roles, not types. Secrets are held in 64-byte seed form and zeroized on
//! drop. Keys serialize to fixed-size byte strings with no framing, and to
//! hex for configuration surfaces.

use core::fmt;
use core::str::FromStr;

use rand_core::CryptoRngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::kem::{self, ENC_KEY_LEN, SEED_LEN};

/// An ML-KEM-768 decapsulation key, identifying a peer across sessions.
///
/// Held as the 64-byte generation seed; zeroized on drop.
#[derive(Clone)]
pub struct StaticSecret {
    seed: Zeroizing<[u8; SEED_LEN]>,
}

impl StaticSecret {
    /// The length of a serialized secret key in bytes.
    pub const LEN: usize = SEED_LEN;

    /// Generate a new random secret key.
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        let (seed, _ek) = kem::generate(rng);
        Self { seed }
    }

    /// Deserialize from a byte slice.
    ///
    /// Returns `None` if the slice is not exactly [`Self::LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let seed: [u8; SEED_LEN] = bytes.try_into().ok()?;
        Some(Self {
            seed: Zeroizing::new(seed),
        })
    }

    /// Export the raw 64-byte seed.
    pub fn to_bytes(&self) -> [u8; SEED_LEN] {
        *self.seed
    }

    /// Hex-encode the seed, the form the CLI surfaces accept.
    pub fn to_hex(&self) -> String {
        hex::encode(self.seed.as_slice())
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: kem::encapsulation_key(&self.seed),
        }
    }

    pub(crate) fn seed(&self) -> &[u8; SEED_LEN] {
        &self.seed
    }
}

impl fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticSecret([REDACTED])")
    }
}

impl FromStr for StaticSecret {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = hex::decode(s).map_err(|_| ParseKeyError)?;
        let parsed = Self::from_bytes(&bytes).ok_or(ParseKeyError);
        bytes.zeroize();
        parsed
    }
}

/// An ML-KEM-768 encapsulation key (1184 bytes).
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    bytes: [u8; ENC_KEY_LEN],
}

impl PublicKey {
    /// The length of a serialized public key in bytes.
    pub const LEN: usize = ENC_KEY_LEN;

    /// Deserialize from a byte slice.
    ///
    /// Returns `None` if the slice is not exactly [`Self::LEN`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; ENC_KEY_LEN] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }

    /// Access the raw encapsulation key bytes.
    pub fn as_bytes(&self) -> &[u8; ENC_KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PublicKey([{:02x}{:02x}..{}B])",
            self.bytes[0],
            self.bytes[1],
            ENC_KEY_LEN,
        )
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.bytes))
    }
}

impl FromStr for PublicKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ParseKeyError)?;
        Self::from_bytes(&bytes).ok_or(ParseKeyError)
    }
}

/// A secret key and its corresponding public key.
pub struct KeyPair {
    pub secret: StaticSecret,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        let (seed, ek) = kem::generate(rng);
        Self {
            secret: StaticSecret { seed },
            public: PublicKey { bytes: ek },
        }
    }

    /// Reconstruct a keypair from a secret key.
    pub fn from_secret(secret: StaticSecret) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }
}

/// Error parsing a hex-encoded key of fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseKeyError;

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("malformed hex-encoded key")
    }
}

impl std::error::Error for ParseKeyError {}
