//! Timelock encryption against a threshold randomness beacon.
//!
//! A message is encrypted to a future beacon round using identity-based
//! encryption over BLS12-381; the round's BLS signature, once published, is
//! the decryption key. This crate is the curve-level core; the age file
//! container lives in `tlock-age`.

pub mod ibe;
pub mod scheme;

use bls12_381_plus::ExpandMsgXmd;
use bls12_381_plus::{G1Projective, G2Projective};
use group::Curve;
use rand_core::CryptoRngCore;
use sha2::{Digest, Sha256};
use thiserror::Error as ThisError;
use tracing::info_span;

pub use crate::ibe::{Ciphertext, GAffine, G1_SIZE, G2_SIZE, MESSAGE_SIZE};
pub use crate::scheme::Scheme;

#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    /// Bytes that do not decode to a point on the curve, or decode to a
    /// point outside the prime-order subgroup.
    #[error("invalid compressed group element")]
    InvalidPoint,
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),
    /// The Fujisaki-Okamoto consistency check rejected the ciphertext, e.g.
    /// because the signature is for a different round.
    #[error("ciphertext rejected by the consistency check")]
    Decryption,
    #[error("unsupported beacon scheme: {0}")]
    UnsupportedScheme(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Message the network signs for a round: `SHA-256(be_u64(round))`.
pub fn round_identity(round_number: u64) -> [u8; 32] {
    let mut hash = Sha256::new();
    hash.update(round_number.to_be_bytes());
    hash.finalize().into()
}

/// Point the network signs for `round`, on the scheme's signature group.
///
/// Mostly useful for verification and tests; encryption hashes the identity
/// internally.
pub fn identity_point(scheme: Scheme, round_number: u64) -> GAffine {
    let id = round_identity(round_number);
    match scheme {
        Scheme::PedersenBlsUnchained => {
            G2Projective::hash::<ExpandMsgXmd<Sha256>>(&id, scheme.identity_dst())
                .to_affine()
                .into()
        }
        Scheme::BlsUnchainedOnG1 | Scheme::BlsUnchainedG1Rfc9380 => {
            G1Projective::hash::<ExpandMsgXmd<Sha256>>(&id, scheme.identity_dst())
                .to_affine()
                .into()
        }
    }
}

/// Encrypts `message` so it can only be read once `round_number` is signed.
///
/// `public_key_bytes` is the chain's compressed master key, whose size must
/// match the scheme.
pub fn time_lock<R, M>(
    rng: &mut R,
    scheme: Scheme,
    public_key_bytes: &[u8],
    round_number: u64,
    message: M,
) -> Result<Ciphertext, Error>
where
    R: CryptoRngCore + ?Sized,
    M: AsRef<[u8]>,
{
    if public_key_bytes.len() != scheme.public_key_size() {
        return Err(Error::InvalidCiphertext(format!(
            "public key is {} bytes, scheme {} expects {}",
            public_key_bytes.len(),
            scheme,
            scheme.public_key_size()
        )));
    }
    let public_key = GAffine::try_from(public_key_bytes)?;
    let id = round_identity(round_number);

    info_span!("ibe::encryption")
        .in_scope(|| ibe::encrypt(rng, &public_key, id, scheme.identity_dst(), message))
}

/// Decrypts a ciphertext with the signature of the round it was locked to.
pub fn time_unlock(signature: &[u8], c: &Ciphertext) -> Result<Vec<u8>, Error> {
    let private = GAffine::try_from(signature)?;

    info_span!("ibe::decryption").in_scope(|| ibe::decrypt(&private, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::ops::Mul;

    // drand testnet unchained public key, and the signature it published for
    // round 1000.
    const PK_HEX: &str = "8200fc249deb0148eb918d6e213980c5d01acd7fc251900d9260136da3b54836ce125172399ddc69c4e3e11429b62c11";
    const SIG_HEX: &str = "a4721e6c3eafcd823f138cd29c6c82e8c5149101d0bb4bafddbac1c2d1fe3738895e4e21dd4b8b41bf007046440220910bb1cdb91f50a84a0d7f33ff2e8577aa62ac64b35a291a728a9db5ac91e06d1312b48a376138d77b4d6ad27c24221afe";

    #[test]
    fn test_e2e() {
        let pk_bytes = hex::decode(PK_HEX).unwrap();
        let signature = hex::decode(SIG_HEX).unwrap();

        let msg = [8u8; MESSAGE_SIZE];
        let ct = time_lock(
            &mut rand::thread_rng(),
            Scheme::PedersenBlsUnchained,
            &pk_bytes,
            1000,
            msg,
        )
        .unwrap();

        let pt = time_unlock(&signature, &ct).unwrap();
        assert_eq!(pt, msg);
    }

    #[test]
    fn test_wrong_round_signature_rejected() {
        let s = bls12_381_plus::Scalar::from_raw([42, 0, 0, 1]);
        let scheme = Scheme::BlsUnchainedG1Rfc9380;
        let pk = bls12_381_plus::G2Affine::generator()
            .mul(s)
            .to_affine()
            .to_compressed();

        let ct = time_lock(
            &mut rand::thread_rng(),
            scheme,
            &pk,
            100,
            [3u8; MESSAGE_SIZE],
        )
        .unwrap();

        let sig_101 = identity_point(scheme, 101).mul(s).to_compressed();
        assert_eq!(time_unlock(&sig_101, &ct).unwrap_err(), Error::Decryption);

        let sig_100 = identity_point(scheme, 100).mul(s).to_compressed();
        assert_eq!(time_unlock(&sig_100, &ct).unwrap(), [3u8; MESSAGE_SIZE]);
    }

    #[test]
    fn test_lock_unlock_all_schemes() {
        let s = bls12_381_plus::Scalar::from_raw([7, 5, 3, 2]);
        for scheme in [
            Scheme::PedersenBlsUnchained,
            Scheme::BlsUnchainedOnG1,
            Scheme::BlsUnchainedG1Rfc9380,
        ] {
            let pk = match scheme {
                Scheme::PedersenBlsUnchained => bls12_381_plus::G1Affine::generator()
                    .mul(s)
                    .to_affine()
                    .to_compressed()
                    .to_vec(),
                _ => bls12_381_plus::G2Affine::generator()
                    .mul(s)
                    .to_affine()
                    .to_compressed()
                    .to_vec(),
            };

            let msg = [0xa5u8; MESSAGE_SIZE];
            let ct = time_lock(&mut rand::thread_rng(), scheme, &pk, 12345, msg).unwrap();
            assert_eq!(ct.to_bytes().len(), scheme.ciphertext_size());

            let sig = identity_point(scheme, 12345).mul(s).to_compressed();
            assert_eq!(sig.len(), scheme.signature_size());
            assert_eq!(time_unlock(&sig, &ct).unwrap(), msg);
        }
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let pk_bytes = hex::decode(PK_HEX).unwrap();
        let msg = *b"hello world 16by";

        let lock = || {
            let mut rng = ChaCha20Rng::from_seed([0u8; 32]);
            time_lock(
                &mut rng,
                Scheme::PedersenBlsUnchained,
                &pk_bytes,
                100,
                msg,
            )
            .unwrap()
            .to_bytes()
        };
        assert_eq!(lock(), lock());
    }

    #[test]
    fn test_public_key_size_checked() {
        let pk_bytes = hex::decode(PK_HEX).unwrap();
        // a 48-byte key cannot serve a scheme whose master key is on G2
        let err = time_lock(
            &mut rand::thread_rng(),
            Scheme::BlsUnchainedG1Rfc9380,
            &pk_bytes,
            1,
            [0u8; MESSAGE_SIZE],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidCiphertext(_)));
    }
}
