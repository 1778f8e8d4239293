//! Timelock encryption inside the age file format.
//!
//! Encryption seals a payload under a fresh file key with the STREAM
//! construction, wraps that key to a future beacon round in a `tlock`
//! recipient stanza, and authenticates the header with an HMAC derived from
//! the file key. Once the network publishes the round's signature, anyone
//! holding it can unwrap the stanza and open the payload.

pub mod armor;
pub mod chain;

mod age;
mod error;
mod format;
mod stream;
mod tle_age;

use std::io::{Read, Write};

use rand_core::CryptoRngCore;
use tracing::info_span;

use crate::chain::{ChainClient, ChainInfo};
use crate::tle_age::{TlockIdentity, TlockRecipient};

pub use crate::age::{Identity, Recipient};
pub use crate::error::TLockAgeError;

/// Stanza-level building blocks for wiring tlock into other age tooling.
pub mod internal {
    pub use crate::format::{FileKey, Stanza};
    pub use crate::tle_age::{
        NoOpIdentity, NoOpRecipient, TlockIdentity, TlockRecipient, STANZA_TAG,
    };
}

/// Encrypt using the tlock encryption scheme and the age container.
///
/// `round` and the chain hash are stored in the age header; the chain's
/// scheme decides the IBE variant. No network access happens here, the
/// caller supplies [`ChainInfo`] however it likes.
///
/// To make the output ASCII printable, wrap `dst` in an
/// [`armor::ArmoredWriter`].
///
/// Example locking a message to round 1000 of a chain:
///
/// ```rust
/// use tlock_age::chain::ChainInfo;
///
/// let chain_hash = hex::decode("7672797f548f3f4748ac4bf3352fc6c6b6468c9ad40ad456a397545c6e2df5bf").unwrap();
/// let pk = hex::decode("8200fc249deb0148eb918d6e213980c5d01acd7fc251900d9260136da3b54836ce125172399ddc69c4e3e11429b62c11").unwrap();
/// let info = ChainInfo::new("pedersen-bls-unchained", 30, 1595431050, &chain_hash, &pk);
///
/// let mut encrypted = vec![];
/// tlock_age::encrypt(&mut encrypted, &b"hello tlock"[..], &info, 1000).unwrap();
/// ```
pub fn encrypt<W: Write, R: Read>(
    dst: W,
    src: R,
    info: &ChainInfo,
    round: u64,
) -> Result<(), TLockAgeError> {
    encrypt_with_rng(&mut rand::thread_rng(), dst, src, info, round)
}

/// [`encrypt`] with a caller-provided rng, so tests and reproducible
/// pipelines can inject a seeded one.
pub fn encrypt_with_rng<RNG, W, R>(
    rng: &mut RNG,
    mut dst: W,
    mut src: R,
    info: &ChainInfo,
    round: u64,
) -> Result<(), TLockAgeError>
where
    RNG: CryptoRngCore,
    W: Write,
    R: Read,
{
    let recipient = TlockRecipient::new(info, round)?;

    let mut plaintext = Vec::new();
    src.read_to_end(&mut plaintext)?;

    let encrypted =
        info_span!("tlock_age::encrypt").in_scope(|| age::encrypt(rng, &plaintext, &recipient))?;
    dst.write_all(&encrypted)?;
    Ok(())
}

/// Information stored in a tlock age header.
pub struct Header {
    round: u64,
    hash: Vec<u8>,
}

impl Header {
    fn new(round: u64, hash: &[u8]) -> Self {
        Self {
            round,
            hash: hash.to_vec(),
        }
    }

    /// Round the message is encrypted to.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Hash of the chain used to encrypt the message.
    pub fn hash(&self) -> Vec<u8> {
        self.hash.clone()
    }
}

/// Decrypt a tlock age header.
///
/// The round a message is locked to, and the chain that will sign it, have
/// to be known before the matching beacon can be retrieved; both sit in the
/// header in the clear. `src` can be armored or not.
pub fn decrypt_header<R: Read>(mut src: R) -> Result<Header, TLockAgeError> {
    let mut data = Vec::new();
    src.read_to_end(&mut data)?;

    let header = age::parse_header(&data)?;
    let (round, hash) = tle_age::header_info(header.stanzas())?;
    Ok(Header::new(round, &hash))
}

/// Decrypt using the tlock encryption scheme and the age container.
///
/// `signature` must be the beacon signature for the round in the header, and
/// `chain_hash` the chain it came from. `src` can be armored or not,
/// decryption supports both. This path is fully offline.
///
/// ```rust
/// use tlock_age::chain::ChainInfo;
///
/// let chain_hash = hex::decode("7672797f548f3f4748ac4bf3352fc6c6b6468c9ad40ad456a397545c6e2df5bf").unwrap();
/// let pk = hex::decode("8200fc249deb0148eb918d6e213980c5d01acd7fc251900d9260136da3b54836ce125172399ddc69c4e3e11429b62c11").unwrap();
/// let info = ChainInfo::new("pedersen-bls-unchained", 30, 1595431050, &chain_hash, &pk);
///
/// let mut encrypted = vec![];
/// tlock_age::encrypt(&mut encrypted, &b"hello tlock"[..], &info, 1000).unwrap();
///
/// // the network's signature for round 1000
/// let signature = hex::decode("a4721e6c3eafcd823f138cd29c6c82e8c5149101d0bb4bafddbac1c2d1fe3738895e4e21dd4b8b41bf007046440220910bb1cdb91f50a84a0d7f33ff2e8577aa62ac64b35a291a728a9db5ac91e06d1312b48a376138d77b4d6ad27c24221afe").unwrap();
///
/// let mut decrypted = vec![];
/// tlock_age::decrypt(&mut decrypted, encrypted.as_slice(), &chain_hash, &signature).unwrap();
/// assert_eq!(decrypted, b"hello tlock");
/// ```
pub fn decrypt<W: Write, R: Read>(
    mut dst: W,
    mut src: R,
    chain_hash: &[u8],
    signature: &[u8],
) -> Result<(), TLockAgeError> {
    let identity = TlockIdentity::new(chain_hash, signature)?;

    let mut data = Vec::new();
    src.read_to_end(&mut data)?;

    let plaintext =
        info_span!("tlock_age::decrypt").in_scope(|| age::decrypt(&data, &identity))?;
    dst.write_all(&plaintext)?;
    Ok(())
}

/// Decrypt by asking a beacon client for the round's signature.
///
/// The header names the round and chain; the client provides chain metadata
/// and the beacon. Decryption before the round's scheduled time fails with
/// [`TLockAgeError::TooEarly`] without contacting the network for the
/// signature.
pub fn decrypt_with_client<W, R, C>(dst: W, mut src: R, client: &C) -> Result<(), TLockAgeError>
where
    W: Write,
    R: Read,
    C: ChainClient,
{
    let mut data = Vec::new();
    src.read_to_end(&mut data)?;

    let header = decrypt_header(data.as_slice())?;
    let info = client.chain_info()?;
    if info.hash() != header.hash() {
        return Err(TLockAgeError::Protocol(
            "ciphertext is locked to a different chain".to_string(),
        ));
    }
    let scheme = info.scheme()?;

    let unlock_at = chain::time_for_round(&info, header.round());
    if unlock_at > chain::unix_now() {
        return Err(TLockAgeError::TooEarly {
            round: header.round(),
            unlock_at,
        });
    }

    let beacon = client.beacon(header.round())?;
    let signature = beacon.signature();
    if signature.len() != scheme.signature_size() {
        return Err(TLockAgeError::InvalidCiphertext(format!(
            "beacon signature is {} bytes, scheme {} expects {}",
            signature.len(),
            scheme,
            scheme.signature_size()
        )));
    }

    decrypt(dst, data.as_slice(), &header.hash(), &signature)
}
