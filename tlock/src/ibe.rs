use bls12_381_plus::ExpandMsgXmd;
use bls12_381_plus::{G1Affine, G1Projective, G2Affine, G2Projective, Gt, Scalar};
use group::Curve;
use itertools::Itertools;
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ops::Mul;

use crate::Error;

pub const G1_SIZE: usize = 48;
pub const G2_SIZE: usize = 96;

/// Size of the random seed `sigma`, and therefore of `V`, `W`, and the
/// message itself.
pub const SIGMA_SIZE: usize = 16;
pub const MESSAGE_SIZE: usize = 16;

const FP_CHUNK_SIZE: usize = 48;

/// A point on either pairing group, compressed per the IETF BLS encoding.
///
/// The two scheme layouts are mirror images of each other; carrying the group
/// in the value lets one encrypt/decrypt path serve both.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum GAffine {
    G1Affine(G1Affine),
    G2Affine(G2Affine),
}

impl GAffine {
    /// `e(self, H(id))`, hashing the identity onto the opposite group with
    /// the given domain separation tag.
    pub fn projective_pairing(&self, id: &[u8], dst: &[u8]) -> Gt {
        match self {
            GAffine::G1Affine(g) => {
                let qid = G2Projective::hash::<ExpandMsgXmd<Sha256>>(id, dst).to_affine();
                bls12_381_plus::pairing(g, &qid)
            }
            GAffine::G2Affine(g) => {
                let qid = G1Projective::hash::<ExpandMsgXmd<Sha256>>(id, dst).to_affine();
                bls12_381_plus::pairing(&qid, g)
            }
        }
    }

    pub fn pairing(&self, other: &GAffine) -> Result<Gt, Error> {
        match (self, other) {
            (GAffine::G1Affine(s), GAffine::G2Affine(o)) => Ok(bls12_381_plus::pairing(s, o)),
            (GAffine::G2Affine(s), GAffine::G1Affine(o)) => Ok(bls12_381_plus::pairing(o, s)),
            _ => Err(Error::InvalidCiphertext(
                "pairing requires points on opposite groups".to_string(),
            )),
        }
    }

    pub fn generator(&self) -> Self {
        match self {
            GAffine::G1Affine(_) => G1Affine::generator().into(),
            GAffine::G2Affine(_) => G2Affine::generator().into(),
        }
    }

    pub fn mul(&self, s: Scalar) -> Self {
        match self {
            GAffine::G1Affine(g) => g.mul(s).to_affine().into(),
            GAffine::G2Affine(g) => g.mul(s).to_affine().into(),
        }
    }

    pub fn to_compressed(&self) -> Vec<u8> {
        match self {
            GAffine::G1Affine(g) => g.to_compressed().to_vec(),
            GAffine::G2Affine(g) => g.to_compressed().to_vec(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            GAffine::G1Affine(_) => G1_SIZE,
            GAffine::G2Affine(_) => G2_SIZE,
        }
    }
}

impl From<G1Affine> for GAffine {
    fn from(g1: G1Affine) -> Self {
        GAffine::G1Affine(g1)
    }
}

impl From<G2Affine> for GAffine {
    fn from(g2: G2Affine) -> Self {
        GAffine::G2Affine(g2)
    }
}

impl TryFrom<&[u8]> for GAffine {
    type Error = Error;

    /// Deserializes a compressed point, inferring the group from the length.
    /// Rejects encodings that are off-curve or outside the prime-order
    /// subgroup.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() == G1_SIZE {
            let bytes: &[u8; G1_SIZE] = bytes.try_into().expect("length checked above");
            let p = G1Affine::from_compressed(bytes);
            if p.is_some().unwrap_u8() == 1u8 {
                Ok(p.unwrap().into())
            } else {
                Err(Error::InvalidPoint)
            }
        } else if bytes.len() == G2_SIZE {
            let bytes: &[u8; G2_SIZE] = bytes.try_into().expect("length checked above");
            let p = G2Affine::from_compressed(bytes);
            if p.is_some().unwrap_u8() == 1u8 {
                Ok(p.unwrap().into())
            } else {
                Err(Error::InvalidPoint)
            }
        } else {
            Err(Error::InvalidPoint)
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ciphertext {
    pub u: GAffine,
    pub v: Vec<u8>,
    pub w: Vec<u8>,
}

impl Ciphertext {
    /// Wire form `U || V || W`: 80 bytes with `U` on G1, 128 with `U` on G2.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.u.size() + self.v.len() + self.w.len());
        out.extend_from_slice(&self.u.to_compressed());
        out.extend_from_slice(&self.v);
        out.extend_from_slice(&self.w);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let point_size = match bytes.len() {
            n if n == G1_SIZE + SIGMA_SIZE + MESSAGE_SIZE => G1_SIZE,
            n if n == G2_SIZE + SIGMA_SIZE + MESSAGE_SIZE => G2_SIZE,
            n => {
                return Err(Error::InvalidCiphertext(format!(
                    "unexpected ciphertext length {n}"
                )))
            }
        };
        let u = GAffine::try_from(&bytes[..point_size])?;
        Ok(Self {
            u,
            v: bytes[point_size..point_size + SIGMA_SIZE].to_vec(),
            w: bytes[point_size + SIGMA_SIZE..].to_vec(),
        })
    }
}

/// Encrypts a 16-byte message to an identity under the chain's master key.
///
/// The Fujisaki-Okamoto seed `sigma` is drawn from `rng`; everything else is
/// deterministic, so a seeded rng yields stable ciphertext bytes.
pub fn encrypt<R, I, M>(
    rng: &mut R,
    master: &GAffine,
    id: I,
    dst: &[u8],
    msg: M,
) -> Result<Ciphertext, Error>
where
    R: CryptoRngCore + ?Sized,
    I: AsRef<[u8]>,
    M: AsRef<[u8]>,
{
    let msg = msg.as_ref();
    if msg.len() != MESSAGE_SIZE {
        return Err(Error::Internal(format!(
            "message must be {MESSAGE_SIZE} bytes, got {}",
            msg.len()
        )));
    }

    // 1. Compute Gid = e(master, Q_id)
    let gid = master.projective_pairing(id.as_ref(), dst);

    // 2. Derive random sigma
    let mut sigma = [0u8; SIGMA_SIZE];
    rng.fill_bytes(&mut sigma);

    // 3. Derive r from sigma and msg
    let r = h3(&sigma, msg)?;

    // 4. Compute U = G^r
    let u = master.generator().mul(r);

    // 5. Compute V = sigma XOR H2(r * Gid)
    let v = {
        let r_gid = gid.mul(r);
        xor(&sigma, &h2(&r_gid))
    };

    // 6. Compute W = M XOR H4(sigma)
    let w = xor(msg, &h4(&sigma));

    Ok(Ciphertext { u, v, w })
}

/// Decrypts with the round's signature, i.e. the identity's private key.
///
/// The Fujisaki-Okamoto check recomputes the commitment `U` from the
/// recovered seed and message; any mismatch rejects the ciphertext without
/// revealing the candidate plaintext.
pub fn decrypt(private: &GAffine, c: &Ciphertext) -> Result<Vec<u8>, Error> {
    if c.v.len() != SIGMA_SIZE || c.w.len() != MESSAGE_SIZE {
        return Err(Error::InvalidCiphertext(format!(
            "unexpected component lengths v={} w={}",
            c.v.len(),
            c.w.len()
        )));
    }

    // 1. Compute sigma = V XOR H2(e(private, U))
    let sigma = {
        let r_gid = private.pairing(&c.u)?;
        xor(&c.v, &h2(&r_gid))
    };

    // 2. Compute M = W XOR H4(sigma)
    let msg = xor(&c.w, &h4(&sigma));

    // 3. Check U = G^r
    let r = h3(&sigma, &msg)?;
    if c.u.generator().mul(r) != c.u {
        return Err(Error::Decryption);
    }

    Ok(msg)
}

fn h2(gt: &Gt) -> [u8; SIGMA_SIZE] {
    // The wire order of the Fp12 is top-coefficient-first at every tower
    // level, the 48-byte-chunk reversal of the library's encoding.
    let hash = Sha256::new()
        .chain(b"IBE-H2")
        .chain(rev_chunks(&gt.to_bytes(), FP_CHUNK_SIZE))
        .finalize();
    let mut out = [0u8; SIGMA_SIZE];
    out.copy_from_slice(&hash[0..SIGMA_SIZE]);
    out
}

/// Scalar derivation shared with the beacon network: hash `sigma || msg`
/// under the H3 tag, then iterate `H(le_u16(i) || digest)` with the top bit
/// cleared until the little-endian value is a canonical nonzero scalar.
fn h3(sigma: &[u8], msg: &[u8]) -> Result<Scalar, Error> {
    let digest = Sha256::new()
        .chain(b"IBE-H3")
        .chain(sigma)
        .chain(msg)
        .finalize();

    for i in 1..u16::MAX {
        let mut h = Sha256::new()
            .chain(i.to_le_bytes())
            .chain(&digest)
            .finalize()
            .to_vec();
        *h.first_mut().expect("sha256 output is not empty") >>= 1;
        let le: [u8; 32] = h
            .iter()
            .copied()
            .rev()
            .collect_vec()
            .try_into()
            .expect("sha256 output is 32 bytes");
        let r = Scalar::from_bytes(&le);
        if r.is_some().unwrap_u8() == 1u8 {
            let r = r.unwrap();
            if r != Scalar::zero() {
                return Ok(r);
            }
        }
    }
    Err(Error::Internal("scalar derivation exhausted".to_string()))
}

fn h4(sigma: &[u8]) -> [u8; SIGMA_SIZE] {
    let hash = Sha256::new().chain(b"IBE-H4").chain(sigma).finalize();
    let mut out = [0u8; SIGMA_SIZE];
    out.copy_from_slice(&hash[0..SIGMA_SIZE]);
    out
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    if a.len() != b.len() {
        panic!("array length should be the same");
    }
    a.iter().zip(b.iter()).map(|(a, b)| a ^ b).collect()
}

// Reverse a u8 array, chunks at a time
fn rev_chunks(a: &[u8], chunk_size: usize) -> Vec<u8> {
    a.chunks(chunk_size).rev().collect_vec().concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scheme;

    fn master_secret() -> Scalar {
        Scalar::from_raw([0x9d1c_7bd3, 0x3f2a, 0x5eb1, 0x11])
    }

    fn identity_key(scheme: Scheme, id: &[u8]) -> GAffine {
        let s = master_secret();
        match scheme {
            Scheme::PedersenBlsUnchained => {
                G2Projective::hash::<ExpandMsgXmd<Sha256>>(id, scheme.identity_dst())
                    .to_affine()
                    .mul(s)
                    .to_affine()
                    .into()
            }
            _ => G1Projective::hash::<ExpandMsgXmd<Sha256>>(id, scheme.identity_dst())
                .to_affine()
                .mul(s)
                .to_affine()
                .into(),
        }
    }

    fn master_public(scheme: Scheme) -> GAffine {
        let s = master_secret();
        match scheme {
            Scheme::PedersenBlsUnchained => G1Affine::generator().mul(s).to_affine().into(),
            _ => G2Affine::generator().mul(s).to_affine().into(),
        }
    }

    #[test]
    fn test_roundtrip_all_schemes() {
        for scheme in [
            Scheme::PedersenBlsUnchained,
            Scheme::BlsUnchainedOnG1,
            Scheme::BlsUnchainedG1Rfc9380,
        ] {
            let id = b"some round identity hash no. 01s";
            let msg = [0x42u8; MESSAGE_SIZE];

            let ct = encrypt(
                &mut rand::thread_rng(),
                &master_public(scheme),
                id,
                scheme.identity_dst(),
                msg,
            )
            .unwrap();
            assert_eq!(ct.to_bytes().len(), scheme.ciphertext_size());

            let pt = decrypt(&identity_key(scheme, id), &ct).unwrap();
            assert_eq!(pt, msg);
        }
    }

    #[test]
    fn test_wrong_identity_key_rejected() {
        let scheme = Scheme::PedersenBlsUnchained;
        let ct = encrypt(
            &mut rand::thread_rng(),
            &master_public(scheme),
            b"identity a",
            scheme.identity_dst(),
            [7u8; MESSAGE_SIZE],
        )
        .unwrap();

        let err = decrypt(&identity_key(scheme, b"identity b"), &ct).unwrap_err();
        assert_eq!(err, Error::Decryption);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let scheme = Scheme::BlsUnchainedG1Rfc9380;
        let ct = encrypt(
            &mut rand::thread_rng(),
            &master_public(scheme),
            b"identity",
            scheme.identity_dst(),
            [1u8; MESSAGE_SIZE],
        )
        .unwrap();

        let parsed = Ciphertext::from_bytes(&ct.to_bytes()).unwrap();
        assert_eq!(parsed, ct);
    }

    #[test]
    fn test_bad_lengths_rejected() {
        assert!(matches!(
            Ciphertext::from_bytes(&[0u8; 81]),
            Err(Error::InvalidCiphertext(_))
        ));

        // a compressed-point length filled with garbage is not a point
        let bytes = vec![0xffu8; 80];
        assert_eq!(
            Ciphertext::from_bytes(&bytes).unwrap_err(),
            Error::InvalidPoint
        );
    }

    #[test]
    fn test_xor_extended_truth_table() {
        let a = vec![0b00000000u8, 0b11111111, 0b00000000, 0b11111111];
        let b = vec![0b11111111u8, 0b00000000, 0b00000000, 0b11111111];
        let x = vec![0b11111111u8, 0b11111111, 0b00000000, 0b00000000];
        assert_eq!(xor(&a, &b), x);
    }

    #[test]
    fn test_xor_empty() {
        let a = vec![];
        let b = vec![];
        let x: Vec<u8> = vec![];
        assert_eq!(xor(&a, &b), x);
    }

    #[test]
    fn test_rev_chunks() {
        let a = vec![1, 2, 3, 4];
        assert_eq!(rev_chunks(&a, 2), vec![3, 4, 1, 2]);
    }
}
