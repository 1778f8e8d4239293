use std::fmt;
use std::str::FromStr;

use crate::ibe::{G1_SIZE, G2_SIZE, SIGMA_SIZE};
use crate::Error;

// RFC 9380 hash-to-curve tags. The networks that sign on G1 historically kept
// the G2-labelled tag, so both tags must remain available for G1 hashing.
const DST_G1: &[u8] = b"BLS_SIG_BLS12381G1_XMD:SHA-256_SSWU_RO_NUL_";
const DST_G2: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// Beacon signature scheme, as advertised in a chain's metadata.
///
/// Three identifiers map onto two curve layouts: either the master public key
/// is on G1 and rounds are signed on G2, or the reverse. The layout decides
/// which group the IBE commitment `U` lives on, and therefore every wire size
/// downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
    /// Master key on G1 (48 bytes), signatures on G2 (96 bytes).
    PedersenBlsUnchained,
    /// Master key on G2, signatures on G1, with the legacy G2-labelled
    /// identity tag. Kept so old ciphertexts and chains stay readable.
    BlsUnchainedOnG1,
    /// Master key on G2, signatures on G1, RFC 9380 identity tag.
    BlsUnchainedG1Rfc9380,
}

impl Scheme {
    pub fn from_id(id: &str) -> Result<Self, Error> {
        match id {
            "pedersen-bls-unchained" => Ok(Scheme::PedersenBlsUnchained),
            "bls-unchained-on-g1" => Ok(Scheme::BlsUnchainedOnG1),
            "bls-unchained-g1-rfc9380" => Ok(Scheme::BlsUnchainedG1Rfc9380),
            _ => Err(Error::UnsupportedScheme(id.to_string())),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Scheme::PedersenBlsUnchained => "pedersen-bls-unchained",
            Scheme::BlsUnchainedOnG1 => "bls-unchained-on-g1",
            Scheme::BlsUnchainedG1Rfc9380 => "bls-unchained-g1-rfc9380",
        }
    }

    /// Tag used to hash round identities onto the signature group.
    pub(crate) fn identity_dst(&self) -> &'static [u8] {
        match self {
            Scheme::PedersenBlsUnchained => DST_G2,
            Scheme::BlsUnchainedOnG1 => DST_G2,
            Scheme::BlsUnchainedG1Rfc9380 => DST_G1,
        }
    }

    /// Compressed size of the chain's master public key.
    pub fn public_key_size(&self) -> usize {
        match self {
            Scheme::PedersenBlsUnchained => G1_SIZE,
            Scheme::BlsUnchainedOnG1 | Scheme::BlsUnchainedG1Rfc9380 => G2_SIZE,
        }
    }

    /// Compressed size of a round signature, on the group opposite the
    /// master key.
    pub fn signature_size(&self) -> usize {
        match self {
            Scheme::PedersenBlsUnchained => G2_SIZE,
            Scheme::BlsUnchainedOnG1 | Scheme::BlsUnchainedG1Rfc9380 => G1_SIZE,
        }
    }

    /// Size of a serialized ciphertext: `U` shares the master key's group.
    pub fn ciphertext_size(&self) -> usize {
        self.public_key_size() + 2 * SIGMA_SIZE
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scheme::from_id(s)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
