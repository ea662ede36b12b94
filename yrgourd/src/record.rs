//! Record framing on top of the forked transcripts.
//!
//! A record is a 3-byte stream-encrypted big-endian length followed by a
//! body sealed as one unit. A decrypted length of zero marks a ratchet
//! frame, whose body is a sealed KEM ciphertext rather than user data.

use crate::crypto::kem::CT_LEN;
use crate::error::Error;
use crate::transcript::{Transcript, TAG_LEN};

/// Exclusive upper bound on a record's plaintext length; the header carries
/// only three bytes of big-endian length.
pub const MAX_MESSAGE_LEN: usize = 1 << 24;

/// On-wire length of the encrypted record header.
pub const HEADER_LEN: usize = 3;

/// On-wire length of a ratchet frame's body: a sealed KEM ciphertext.
pub const RATCHET_BODY_LEN: usize = CT_LEN + TAG_LEN;

/// Append an encrypted header for a body of `len` plaintext bytes.
///
/// A length of zero announces a ratchet frame.
fn encode_header(send: &mut Transcript, out: &mut Vec<u8>, len: usize) {
    debug_assert!(len < MAX_MESSAGE_LEN);
    // Only the low three bytes travel; the top byte is implicitly zero.
    let be = (len as u32).to_be_bytes();
    out.extend_from_slice(&send.encrypt("header", &be[1..]));
}

/// Append a full data record, header plus sealed body, for `plaintext`.
pub fn encode_record(
    send: &mut Transcript,
    out: &mut Vec<u8>,
    plaintext: &[u8],
) -> Result<(), Error> {
    encode_header(send, out, plaintext.len());
    out.extend_from_slice(&send.seal("message", plaintext)?);
    Ok(())
}

/// Append a ratchet frame carrying the KEM ciphertext `ct`.
pub fn encode_ratchet(
    send: &mut Transcript,
    out: &mut Vec<u8>,
    ct: &[u8; CT_LEN],
) -> Result<(), Error> {
    encode_header(send, out, 0);
    out.extend_from_slice(&send.seal("message", ct)?);
    Ok(())
}

/// Decrypt a header read off the wire, returning the body's plaintext
/// length. Zero means the next body is a ratchet frame.
pub fn decode_header(recv: &mut Transcript, wire: &[u8; HEADER_LEN]) -> usize {
    // A zero top byte is prepended so the length reads directly as a 32-bit
    // big-endian integer.
    let mut scratch = [0u8; 4];
    scratch[1..].copy_from_slice(&recv.decrypt("header", wire));
    u32::from_be_bytes(scratch) as usize
}

/// Open a sealed record body.
pub fn decode_body(recv: &mut Transcript, wire: &[u8]) -> Result<Vec<u8>, Error> {
    recv.open("message", wire)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched_pair() -> (Transcript, Transcript) {
        let mut send = Transcript::new("framing test");
        send.mix("sender", b"a");
        let recv = send.clone();
        (send, recv)
    }

    fn header(wire: &[u8]) -> &[u8; HEADER_LEN] {
        wire[..HEADER_LEN].try_into().unwrap()
    }

    #[test]
    fn data_record_round_trips() {
        let (mut send, mut recv) = matched_pair();
        let mut wire = Vec::new();
        encode_record(&mut send, &mut wire, b"hello yrgourd").unwrap();
        assert_eq!(wire.len(), HEADER_LEN + b"hello yrgourd".len() + TAG_LEN);

        let len = decode_header(&mut recv, header(&wire));
        assert_eq!(len, b"hello yrgourd".len());
        let body = decode_body(&mut recv, &wire[HEADER_LEN..]).unwrap();
        assert_eq!(body, b"hello yrgourd");
    }

    #[test]
    fn successive_records_stay_congruent() {
        let (mut send, mut recv) = matched_pair();
        for i in 0..10usize {
            let message = vec![i as u8; i * 7 + 1];
            let mut wire = Vec::new();
            encode_record(&mut send, &mut wire, &message).unwrap();
            let len = decode_header(&mut recv, header(&wire));
            assert_eq!(len, message.len());
            assert_eq!(decode_body(&mut recv, &wire[HEADER_LEN..]).unwrap(), message);
        }
    }

    #[test]
    fn ratchet_frame_decodes_as_zero_length() {
        let (mut send, mut recv) = matched_pair();
        let ct = [0x5Au8; CT_LEN];
        let mut wire = Vec::new();
        encode_ratchet(&mut send, &mut wire, &ct).unwrap();
        assert_eq!(wire.len(), HEADER_LEN + RATCHET_BODY_LEN);

        assert_eq!(decode_header(&mut recv, header(&wire)), 0);
        let body = decode_body(&mut recv, &wire[HEADER_LEN..]).unwrap();
        assert_eq!(body, ct);
    }

    #[test]
    fn header_encodes_the_maximum_length() {
        let (mut send, mut recv) = matched_pair();
        let mut wire = Vec::new();
        encode_header(&mut send, &mut wire, MAX_MESSAGE_LEN - 1);
        assert_eq!(wire.len(), HEADER_LEN);
        assert_eq!(decode_header(&mut recv, header(&wire)), MAX_MESSAGE_LEN - 1);
    }

    #[test]
    fn tampered_body_is_rejected() {
        let (mut send, mut recv) = matched_pair();
        let mut wire = Vec::new();
        encode_record(&mut send, &mut wire, b"payload").unwrap();
        decode_header(&mut recv, header(&wire));

        let mut body = wire[HEADER_LEN..].to_vec();
        body[0] ^= 0x01;
        assert!(decode_body(&mut recv, &body).is_err());
    }

    #[test]
    fn desynchronized_reader_is_rejected() {
        let (mut send, _) = matched_pair();
        let mut wire = Vec::new();
        encode_record(&mut send, &mut wire, b"payload").unwrap();

        // A reader that missed the header decrypt cannot open the body.
        let (_, mut stale) = matched_pair();
        assert!(decode_body(&mut stale, &wire[HEADER_LEN..]).is_err());
    }
}
