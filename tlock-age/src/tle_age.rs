//! Stanza interpreters: the `tlock` wrapper and a `no-op` debug wrapper.

use rand_core::CryptoRngCore;
use tlock::Scheme;

use crate::age::{Identity, Recipient};
use crate::chain::ChainInfo;
use crate::error::TLockAgeError;
use crate::format::{FileKey, Stanza};

pub const STANZA_TAG: &str = "tlock";
const NOOP_TAG: &str = "no-op";

/// Wraps file keys for one beacon round of one chain.
pub struct TlockRecipient {
    hash: Vec<u8>,
    public_key_bytes: Vec<u8>,
    scheme: Scheme,
    round: u64,
}

impl TlockRecipient {
    pub fn new(info: &ChainInfo, round: u64) -> Result<Self, TLockAgeError> {
        if round == 0 {
            return Err(TLockAgeError::Protocol(
                "round numbers start at 1".to_string(),
            ));
        }
        let scheme = info.scheme()?;
        let public_key_bytes = info.public_key();
        if public_key_bytes.len() != scheme.public_key_size() {
            return Err(TLockAgeError::InputValidation(format!(
                "chain public key is {} bytes, scheme {} expects {}",
                public_key_bytes.len(),
                scheme,
                scheme.public_key_size()
            )));
        }
        Ok(Self {
            hash: info.hash(),
            public_key_bytes,
            scheme,
            round,
        })
    }
}

impl Recipient for TlockRecipient {
    fn wrap_file_key(
        &self,
        file_key: &FileKey,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Vec<Stanza>, TLockAgeError> {
        let ct = tlock::time_lock(
            rng,
            self.scheme,
            &self.public_key_bytes,
            self.round,
            file_key.as_ref(),
        )?;
        let stanza = Stanza::new(
            STANZA_TAG,
            vec![self.round.to_string(), hex::encode(&self.hash)],
            ct.to_bytes(),
        )?;
        Ok(vec![stanza])
    }
}

/// Unwraps a `tlock` stanza with the signature of its round.
pub struct TlockIdentity {
    hash: Vec<u8>,
    signature: Vec<u8>,
}

impl TlockIdentity {
    pub fn new(hash: &[u8], signature: &[u8]) -> Result<Self, TLockAgeError> {
        if signature.len() != tlock::G1_SIZE && signature.len() != tlock::G2_SIZE {
            return Err(TLockAgeError::InvalidCiphertext(format!(
                "unexpected signature length {}",
                signature.len()
            )));
        }
        Ok(Self {
            hash: hash.to_vec(),
            signature: signature.to_vec(),
        })
    }

    // U lives on the group opposite the signature.
    fn expected_body_size(&self) -> usize {
        if self.signature.len() == tlock::G1_SIZE {
            tlock::G2_SIZE + 2 * tlock::MESSAGE_SIZE
        } else {
            tlock::G1_SIZE + 2 * tlock::MESSAGE_SIZE
        }
    }
}

impl Identity for TlockIdentity {
    fn unwrap_stanzas(&self, stanzas: &[Stanza]) -> Result<FileKey, TLockAgeError> {
        let stanza = single_tlock_stanza(stanzas)?;
        let (_, hash) = parse_tlock_args(stanza)?;
        if hash != self.hash {
            return Err(TLockAgeError::Protocol(
                "stanza chain hash does not match the identity".to_string(),
            ));
        }
        if stanza.body.len() != self.expected_body_size() {
            return Err(TLockAgeError::InvalidCiphertext(format!(
                "stanza body is {} bytes, expected {} for this signature",
                stanza.body.len(),
                self.expected_body_size()
            )));
        }

        let ct = tlock::Ciphertext::from_bytes(&stanza.body)?;
        let file_key = tlock::time_unlock(&self.signature, &ct)?;
        FileKey::from_bytes(&file_key)
    }
}

/// Debug wrapper that stores the file key verbatim in a `no-op` stanza.
/// Useful for exercising the container without a beacon; never for
/// protecting anything.
pub struct NoOpRecipient;

impl Recipient for NoOpRecipient {
    fn wrap_file_key(
        &self,
        file_key: &FileKey,
        _rng: &mut dyn CryptoRngCore,
    ) -> Result<Vec<Stanza>, TLockAgeError> {
        Ok(vec![Stanza::new(
            NOOP_TAG,
            vec![],
            file_key.as_ref().to_vec(),
        )?])
    }
}

pub struct NoOpIdentity;

impl Identity for NoOpIdentity {
    fn unwrap_stanzas(&self, stanzas: &[Stanza]) -> Result<FileKey, TLockAgeError> {
        match stanzas {
            [stanza] if stanza.tag == NOOP_TAG => FileKey::from_bytes(&stanza.body),
            _ => Err(TLockAgeError::Protocol(
                "expected exactly one no-op stanza".to_string(),
            )),
        }
    }
}

/// The unwrap contract: exactly one stanza, and it must be a `tlock` one.
fn single_tlock_stanza(stanzas: &[Stanza]) -> Result<&Stanza, TLockAgeError> {
    match stanzas {
        [stanza] if stanza.tag == STANZA_TAG => Ok(stanza),
        [stanza] => Err(TLockAgeError::Protocol(format!(
            "unexpected stanza tag {:?}",
            stanza.tag
        ))),
        _ => Err(TLockAgeError::Protocol(format!(
            "expected exactly one stanza, found {}",
            stanzas.len()
        ))),
    }
}

/// Reads `(round, chain hash)` out of a header's stanzas without unwrapping.
pub(crate) fn header_info(stanzas: &[Stanza]) -> Result<(u64, Vec<u8>), TLockAgeError> {
    parse_tlock_args(single_tlock_stanza(stanzas)?)
}

fn parse_tlock_args(stanza: &Stanza) -> Result<(u64, Vec<u8>), TLockAgeError> {
    let [round, hash] = stanza.args.as_slice() else {
        return Err(TLockAgeError::Protocol(format!(
            "tlock stanza carries {} arguments, expected 2",
            stanza.args.len()
        )));
    };
    Ok((parse_round(round)?, parse_chain_hash(hash)?))
}

fn parse_round(arg: &str) -> Result<u64, TLockAgeError> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TLockAgeError::Protocol(format!(
            "round {arg:?} is not a decimal number"
        )));
    }
    let round: u64 = arg
        .parse()
        .map_err(|_| TLockAgeError::Protocol(format!("round {arg:?} is out of range")))?;
    if round == 0 {
        return Err(TLockAgeError::Protocol(
            "round numbers start at 1".to_string(),
        ));
    }
    Ok(round)
}

fn parse_chain_hash(arg: &str) -> Result<Vec<u8>, TLockAgeError> {
    if arg.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(TLockAgeError::Protocol(
            "chain hash must be lowercase hex".to_string(),
        ));
    }
    hex::decode(arg)
        .map_err(|_| TLockAgeError::Protocol(format!("chain hash {arg:?} is not hex")))
}
