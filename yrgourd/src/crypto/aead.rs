//! One-shot ChaCha20Poly1305 for transcript seal/open.
//!
//! Every call takes a key derived freshly from the transcript and used for
//! exactly one message, so a fixed all-zero nonce never repeats under a key.

use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce, Tag};

use crate::error::Error;

/// AEAD key length in bytes.
pub const KEY_LEN: usize = 32;
/// Authenticator tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Seal `buffer[..plaintext_len]` in place, appending the 16-byte tag.
///
/// `buffer` must be exactly `plaintext_len + TAG_LEN` bytes.
pub fn seal_in_place(
    key: &[u8; KEY_LEN],
    buffer: &mut [u8],
    plaintext_len: usize,
) -> Result<(), Error> {
    debug_assert_eq!(buffer.len(), plaintext_len + TAG_LEN);

    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce = Nonce::from([0u8; 12]);
    let tag = cipher
        .encrypt_in_place_detached(&nonce, &[], &mut buffer[..plaintext_len])
        .map_err(|_| Error::InvalidRecord)?;
    buffer[plaintext_len..].copy_from_slice(&tag);
    Ok(())
}

/// Open sealed `buffer` (ciphertext + tag) in place, verifying the tag.
///
/// Returns the plaintext length. The tag is verified before any byte is
/// decrypted, so `buffer` still holds ciphertext on failure.
pub fn open_in_place(key: &[u8; KEY_LEN], buffer: &mut [u8]) -> Result<usize, Error> {
    if buffer.len() < TAG_LEN {
        return Err(Error::InvalidRecord);
    }
    let plaintext_len = buffer.len() - TAG_LEN;

    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce = Nonce::from([0u8; 12]);
    let (ciphertext, tag_bytes) = buffer.split_at_mut(plaintext_len);
    let tag = Tag::from_slice(tag_bytes);
    cipher
        .decrypt_in_place_detached(&nonce, &[], ciphertext, tag)
        .map_err(|_| Error::InvalidRecord)?;

    Ok(plaintext_len)
}
