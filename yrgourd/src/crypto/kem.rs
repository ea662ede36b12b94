//! ML-KEM-768 key encapsulation.
//!
//! Thin wrapper around the `ml-kem` crate. Secrets are held and stored in
//! 64-byte seed form (`d || z` per FIPS 203 §7.1); the full decapsulation
//! key is expanded on demand and dropped after use.
//!
//! # RNG bridging
//!
//! The `ml-kem` crate uses `rand_core` 0.10 while this crate uses 0.6.
//! Rather than depending on two incompatible versions, entropy is drawn from
//! the caller's `CryptoRngCore` (0.6) and fed into ml-kem's deterministic
//! APIs. This keeps a single caller-controlled entropy source and makes the
//! output fully deterministic for a given RNG state.

use ml_kem::kem::{Decapsulate, KeyExport};
use ml_kem::{B32, MlKem768, Seed};
use rand_core::CryptoRngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// ML-KEM-768 encapsulation key (public) size in bytes.
pub const ENC_KEY_LEN: usize = 1184;

/// ML-KEM-768 decapsulation key seed size in bytes.
pub const SEED_LEN: usize = 64;

/// ML-KEM-768 ciphertext size in bytes.
pub const CT_LEN: usize = 1088;

/// ML-KEM-768 shared secret size in bytes.
pub const SS_LEN: usize = 32;

/// A shared secret resulting from an encapsulation or decapsulation.
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SS_LEN]);

impl SharedSecret {
    /// Access the raw 32-byte shared secret.
    pub fn as_bytes(&self) -> &[u8; SS_LEN] {
        &self.0
    }
}

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// Generate a new ML-KEM-768 keypair.
///
/// Draws 64 bytes from `rng` as the deterministic generation seed and
/// returns `(seed, encapsulation_key_bytes)`.
pub fn generate(rng: &mut impl CryptoRngCore) -> (Zeroizing<[u8; SEED_LEN]>, [u8; ENC_KEY_LEN]) {
    let mut seed_bytes = Zeroizing::new([0u8; SEED_LEN]);
    rng.fill_bytes(&mut *seed_bytes);

    let ek_bytes = encapsulation_key(&seed_bytes);
    (seed_bytes, ek_bytes)
}

/// Derive the encapsulation key from a decapsulation key seed.
pub fn encapsulation_key(seed_bytes: &[u8; SEED_LEN]) -> [u8; ENC_KEY_LEN] {
    let mut seed_copy = Zeroizing::new(*seed_bytes);
    let seed: Seed = (*seed_copy).into();
    seed_copy.zeroize();

    let dk = ml_kem::DecapsulationKey::<MlKem768>::from_seed(seed);
    let ek = dk.encapsulation_key();
    let ek_exported = ek.to_bytes();
    let mut ek_bytes = [0u8; ENC_KEY_LEN];
    ek_bytes.copy_from_slice(ek_exported.as_slice());
    ek_bytes
}

/// Encapsulate a fresh shared secret against a remote encapsulation key.
///
/// Draws 32 bytes of encapsulation randomness from `rng`. Returns `None`
/// when the key bytes do not encode a valid encapsulation key.
pub fn encapsulate(
    remote_ek: &[u8; ENC_KEY_LEN],
    rng: &mut impl CryptoRngCore,
) -> Option<([u8; CT_LEN], SharedSecret)> {
    let ek = ml_kem::EncapsulationKey::<MlKem768>::new(remote_ek.into()).ok()?;

    // 32 bytes for the encapsulation message `m`.
    let mut m_bytes = Zeroizing::new([0u8; 32]);
    rng.fill_bytes(&mut *m_bytes);
    let m: &B32 = (&*m_bytes).into();

    let (ct, ss) = ek.encapsulate_deterministic(m);

    let mut ct_bytes = [0u8; CT_LEN];
    ct_bytes.copy_from_slice(ct.as_slice());

    let mut ss_bytes = [0u8; SS_LEN];
    ss_bytes.copy_from_slice(ss.as_slice());
    let shared = SharedSecret(ss_bytes);
    ss_bytes.zeroize();

    Some((ct_bytes, shared))
}

/// Decapsulate a ciphertext with the local decapsulation key seed.
///
/// ML-KEM uses implicit rejection: a forged ciphertext of the right length
/// yields a pseudorandom shared secret rather than an error, so success is
/// only observable through a later authenticated operation.
pub fn decapsulate(seed_bytes: &[u8; SEED_LEN], ct_bytes: &[u8; CT_LEN]) -> Option<SharedSecret> {
    let mut seed_copy = Zeroizing::new(*seed_bytes);
    let seed: Seed = (*seed_copy).into();
    seed_copy.zeroize();

    // NOTE: expanded decapsulation key material lives on the stack until
    // function exit and may not be explicitly zeroized by the ml-kem crate.
    // Pinned to ml-kem 0.3.0-rc.0; verify zeroization on upgrades.
    let dk = ml_kem::DecapsulationKey::<MlKem768>::from_seed(seed);
    let ct = ml_kem::kem::Ciphertext::<MlKem768>::try_from(ct_bytes.as_slice()).ok()?;
    let ss = dk.decapsulate(&ct);

    let mut ss_bytes = [0u8; SS_LEN];
    ss_bytes.copy_from_slice(ss.as_slice());
    let shared = SharedSecret(ss_bytes);
    ss_bytes.zeroize();

    Some(shared)
}
