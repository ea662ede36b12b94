//! Primitive adapters: BLAKE2s keying, one-shot ChaCha20Poly1305, and the
//! ML-KEM-768 key encapsulation mechanism.

pub mod aead;
pub mod hash;
pub mod kem;
