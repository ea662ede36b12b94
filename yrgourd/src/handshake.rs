//! The two-message authenticated key exchange.
//!
//! The initiator encapsulates against the responder's long-term key first,
//! which gives the responder an immediately usable secret and lets the
//! initiator's own identity travel encrypted. The sealed ephemeral key
//! authenticates the request as a whole; the response carries one ciphertext
//! encrypted and one sealed, binding it to the entire prior transcript with
//! a single tag.
//!
//! Wire sizes are deterministic and known before the first byte is sent.

use std::io::{Read, Write};

use rand_core::{CryptoRngCore, OsRng};

use crate::connection::{Config, Connection};
use crate::crypto::kem::{self, CT_LEN, ENC_KEY_LEN};
use crate::error::Error;
use crate::keys::{KeyPair, PublicKey, StaticSecret};
use crate::transcript::{Transcript, PROTOCOL_NAME, TAG_LEN};

/// Exact size of the initiator's request on the wire.
pub const REQ_LEN: usize = CT_LEN + ENC_KEY_LEN + ENC_KEY_LEN + TAG_LEN;

/// Exact size of the responder's response on the wire.
pub const RESP_LEN: usize = CT_LEN + CT_LEN + TAG_LEN;

/// A policy predicate admitting every initiator.
pub fn allow_all(_: &PublicKey) -> bool {
    true
}

/// Initiate a handshake as the client side, returning an established
/// connection on success.
///
/// `remote` is the responder's static public key, obtained out of band.
/// `config` falls back to [`Config::default`] when `None`.
pub fn initiate<S: Read + Write>(
    transport: S,
    local: &StaticSecret,
    remote: &PublicKey,
    config: Option<Config>,
) -> Result<Connection<S>, Error> {
    initiate_with_rng(transport, local, remote, config, &mut OsRng)
}

/// [`initiate`] with a caller-provided RNG.
pub fn initiate_with_rng<S, R>(
    mut transport: S,
    local: &StaticSecret,
    remote: &PublicKey,
    config: Option<Config>,
    rng: &mut R,
) -> Result<Connection<S>, Error>
where
    S: Read + Write,
    R: CryptoRngCore,
{
    let config = config.unwrap_or_default();

    // Fresh ephemeral key pair for this handshake.
    let ie = KeyPair::generate(rng);

    let mut yr = Transcript::new(PROTOCOL_NAME);

    // Bind the responder's advertised static identity.
    yr.mix("rs", remote.as_bytes());

    // Encapsulate against the responder's long-term key, giving it an
    // immediately usable secret.
    let (rs_ct, rs_ss) =
        kem::encapsulate(remote.as_bytes(), rng).ok_or(Error::InvalidHandshake)?;
    let mut req = Vec::with_capacity(REQ_LEN);
    req.extend_from_slice(&rs_ct);
    yr.mix("rs_ct", &rs_ct);
    yr.mix("rs_ss", rs_ss.as_bytes());

    // Our static identity travels encrypted, concealed from passive
    // observers and bound to the transcript.
    let is_public = local.public_key();
    req.extend_from_slice(&yr.encrypt("is", is_public.as_bytes()));

    // The sealed ephemeral key authenticates the request as a whole.
    let ie_sealed = yr
        .seal("ie", ie.public.as_bytes())
        .map_err(|_| Error::InvalidHandshake)?;
    req.extend_from_slice(&ie_sealed);
    debug_assert_eq!(req.len(), REQ_LEN);

    transport.write_all(&req)?;
    transport.flush()?;

    // Read the exact-size response.
    let mut resp = [0u8; RESP_LEN];
    transport.read_exact(&mut resp)?;
    let (is_ct_enc, ie_ct_sealed) = resp.split_at(CT_LEN);

    // Recover the secret the responder encapsulated to our static key.
    let is_ct = yr.decrypt("is_ct", is_ct_enc);
    let is_ct: [u8; CT_LEN] = is_ct
        .as_slice()
        .try_into()
        .map_err(|_| Error::InvalidHandshake)?;
    let is_ss = kem::decapsulate(local.seed(), &is_ct).ok_or(Error::InvalidHandshake)?;
    yr.mix("is_ss", is_ss.as_bytes());

    // And the one it encapsulated to our ephemeral key, authenticating the
    // response.
    let ie_ct = yr
        .open("ie_ct", ie_ct_sealed)
        .map_err(|_| Error::InvalidHandshake)?;
    let ie_ct: [u8; CT_LEN] = ie_ct
        .as_slice()
        .try_into()
        .map_err(|_| Error::InvalidHandshake)?;
    let ie_ss = kem::decapsulate(ie.secret.seed(), &ie_ct).ok_or(Error::InvalidHandshake)?;
    yr.mix("ie_ss", ie_ss.as_bytes());

    // Fork the transcript into the two directions.
    let mut recv = yr.clone();
    let mut send = yr;
    send.mix("sender", b"initiator");
    recv.mix("sender", b"responder");

    Ok(Connection::new(
        transport,
        recv,
        send,
        local.clone(),
        remote.clone(),
        config,
    ))
}

/// Respond to a handshake as the server side, returning an established
/// connection on success.
///
/// `policy` is consulted exactly once, after the initiator's static key is
/// decrypted and before any response byte is written; a rejection fails the
/// handshake with [`Error::InitiatorNotAllowed`].
pub fn respond<S, P>(
    transport: S,
    local: &StaticSecret,
    config: Option<Config>,
    policy: P,
) -> Result<Connection<S>, Error>
where
    S: Read + Write,
    P: FnOnce(&PublicKey) -> bool,
{
    respond_with_rng(transport, local, config, policy, &mut OsRng)
}

/// [`respond`] with a caller-provided RNG.
pub fn respond_with_rng<S, P, R>(
    mut transport: S,
    local: &StaticSecret,
    config: Option<Config>,
    policy: P,
    rng: &mut R,
) -> Result<Connection<S>, Error>
where
    S: Read + Write,
    P: FnOnce(&PublicKey) -> bool,
    R: CryptoRngCore,
{
    let config = config.unwrap_or_default();

    let mut yr = Transcript::new(PROTOCOL_NAME);
    yr.mix("rs", local.public_key().as_bytes());

    // Read the exact-size request.
    let mut req = [0u8; REQ_LEN];
    transport.read_exact(&mut req)?;
    let (rs_ct, rest) = req.split_at(CT_LEN);
    let (is_enc, ie_sealed) = rest.split_at(ENC_KEY_LEN);

    yr.mix("rs_ct", rs_ct);
    let rs_ct: [u8; CT_LEN] = rs_ct.try_into().map_err(|_| Error::InvalidHandshake)?;
    let rs_ss = kem::decapsulate(local.seed(), &rs_ct).ok_or(Error::InvalidHandshake)?;
    yr.mix("rs_ss", rs_ss.as_bytes());

    // Recover and vet the initiator's static identity.
    let is_bytes = yr.decrypt("is", is_enc);
    let is = PublicKey::from_bytes(&is_bytes).ok_or(Error::InvalidHandshake)?;
    if !policy(&is) {
        return Err(Error::InitiatorNotAllowed);
    }

    let ie_bytes = yr.open("ie", ie_sealed).map_err(|_| Error::InvalidHandshake)?;
    let ie = PublicKey::from_bytes(&ie_bytes).ok_or(Error::InvalidHandshake)?;

    // Compose the full response before any byte leaves.
    let mut resp = Vec::with_capacity(RESP_LEN);

    let (is_ct, is_ss) = kem::encapsulate(is.as_bytes(), rng).ok_or(Error::InvalidHandshake)?;
    resp.extend_from_slice(&yr.encrypt("is_ct", &is_ct));
    yr.mix("is_ss", is_ss.as_bytes());

    let (ie_ct, ie_ss) = kem::encapsulate(ie.as_bytes(), rng).ok_or(Error::InvalidHandshake)?;
    let ie_ct_sealed = yr
        .seal("ie_ct", &ie_ct)
        .map_err(|_| Error::InvalidHandshake)?;
    resp.extend_from_slice(&ie_ct_sealed);
    yr.mix("ie_ss", ie_ss.as_bytes());
    debug_assert_eq!(resp.len(), RESP_LEN);

    transport.write_all(&resp)?;
    transport.flush()?;

    // Fork the transcript into the two directions.
    let mut recv = yr.clone();
    let mut send = yr;
    recv.mix("sender", b"initiator");
    send.mix("sender", b"responder");

    Ok(Connection::new(transport, recv, send, local.clone(), is, config))
}
