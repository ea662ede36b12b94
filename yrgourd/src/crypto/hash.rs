//! BLAKE2s-based keying for the transcript: HMAC, chaining-key ratchets, and
//! bounded keystream expansion.

use blake2::{Blake2s256, Digest};
use zeroize::Zeroizing;

/// Hash and chaining-key length (BLAKE2s-256 = 32 bytes).
pub const HASH_LEN: usize = 32;

/// Maximum keystream length a single operation key can produce
/// (255 blocks, per RFC 5869).
pub const MAX_KEYSTREAM_LEN: usize = 255 * HASH_LEN;

/// Compute HMAC-BLAKE2s per [RFC 2104](https://datatracker.ietf.org/doc/html/rfc2104).
///
/// Uses the standard HMAC construction rather than BLAKE2's built-in keyed
/// mode, so the transcript's keying discipline matches the widely reviewed
/// extract-then-expand shape.
pub fn hmac(key: &[u8; HASH_LEN], data: &[u8]) -> Zeroizing<[u8; HASH_LEN]> {
    hmac_multi(key, &[data])
}

/// HMAC-BLAKE2s over multiple data slices, fed sequentially to the hasher.
fn hmac_multi(key: &[u8; HASH_LEN], parts: &[&[u8]]) -> Zeroizing<[u8; HASH_LEN]> {
    const BLOCK_SIZE: usize = 64; // BLAKE2s block size
    const IPAD: u8 = 0x36;
    const OPAD: u8 = 0x5c;

    // The key always fits within a block (32 <= 64), no pre-hashing needed.
    let mut ipad_key = Zeroizing::new([0u8; BLOCK_SIZE]);
    let mut opad_key = Zeroizing::new([0u8; BLOCK_SIZE]);

    for i in 0..HASH_LEN {
        ipad_key[i] = key[i] ^ IPAD;
        opad_key[i] = key[i] ^ OPAD;
    }
    for i in HASH_LEN..BLOCK_SIZE {
        ipad_key[i] = IPAD;
        opad_key[i] = OPAD;
    }

    let mut inner_hasher = Blake2s256::new();
    inner_hasher.update(ipad_key.as_slice());
    for part in parts {
        inner_hasher.update(part);
    }
    let inner_hash = inner_hasher.finalize();

    let mut outer_hasher = Blake2s256::new();
    outer_hasher.update(opad_key.as_slice());
    outer_hasher.update(inner_hash);
    let outer_hash = outer_hasher.finalize();

    let mut result = Zeroizing::new([0u8; HASH_LEN]);
    result.copy_from_slice(&outer_hash);
    result
}

/// Ratchet a chaining key, yielding the next chaining key and a one-use
/// operation key.
///
/// `(next, key) = (HMAC(tmp, 0x01), HMAC(tmp, next || 0x02))` with
/// `tmp = HMAC(ck, ikm)`, the two-output HKDF shape.
pub fn chain(
    ck: &[u8; HASH_LEN],
    ikm: &[u8],
) -> (Zeroizing<[u8; HASH_LEN]>, Zeroizing<[u8; HASH_LEN]>) {
    let tmp = hmac(ck, ikm);
    let next = hmac(&tmp, &[0x01]);

    let mut input = Zeroizing::new([0u8; HASH_LEN + 1]);
    input[..HASH_LEN].copy_from_slice(next.as_slice());
    input[HASH_LEN] = 0x02;
    let key = hmac(&tmp, input.as_slice());

    (next, key)
}

/// XOR an HKDF-Expand keystream derived from `key` into `buf`.
///
/// Panics if `buf` exceeds [`MAX_KEYSTREAM_LEN`]; transcript operations keep
/// their stream inputs far below that bound.
pub fn xor_keystream(key: &[u8; HASH_LEN], buf: &mut [u8]) {
    if buf.is_empty() {
        return;
    }
    assert!(
        buf.len() <= MAX_KEYSTREAM_LEN,
        "keystream request exceeds the expand bound"
    );

    let mut prev = Zeroizing::new([0u8; HASH_LEN]);
    for (i, chunk) in buf.chunks_mut(HASH_LEN).enumerate() {
        // T(i) = HMAC(key, T(i-1) || i), RFC 5869 with an empty info string.
        let counter = [(i + 1) as u8];
        prev = if i == 0 {
            hmac_multi(key, &[&counter])
        } else {
            hmac_multi(key, &[prev.as_slice(), &counter])
        };
        for (b, k) in chunk.iter_mut().zip(prev.iter()) {
            *b ^= k;
        }
    }
}
