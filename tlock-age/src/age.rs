//! The encrypt/decrypt pipelines tying header, stanzas, and payload together.

use rand_core::CryptoRngCore;

use crate::armor;
use crate::error::TLockAgeError;
use crate::format::{self, FileKey, Header, Stanza};
use crate::stream;

pub(crate) const PAYLOAD_NONCE_SIZE: usize = 16;

/// Wraps a fresh file key into recipient stanzas.
pub trait Recipient {
    fn wrap_file_key(
        &self,
        file_key: &FileKey,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Vec<Stanza>, TLockAgeError>;
}

/// Recovers the file key from the stanzas of a parsed header.
pub trait Identity {
    fn unwrap_stanzas(&self, stanzas: &[Stanza]) -> Result<FileKey, TLockAgeError>;
}

/// Builds a complete age file: header, MAC, payload nonce, sealed payload.
/// Returns the whole file or nothing.
pub(crate) fn encrypt<R: CryptoRngCore>(
    rng: &mut R,
    plaintext: &[u8],
    recipient: &dyn Recipient,
) -> Result<Vec<u8>, TLockAgeError> {
    let file_key = FileKey::generate(rng);
    let stanzas = recipient.wrap_file_key(&file_key, rng)?;
    if stanzas.is_empty() {
        return Err(TLockAgeError::Protocol(
            "recipient produced no stanzas".to_string(),
        ));
    }
    let mac = format::compute_mac(&file_key, &stanzas);
    let header = Header::new(stanzas, mac);

    let mut nonce = [0u8; PAYLOAD_NONCE_SIZE];
    rng.fill_bytes(&mut nonce);
    let payload_key = format::payload_key(&file_key, &nonce);

    let mut out = header.encode();
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&stream::seal(&payload_key, plaintext)?);
    Ok(out)
}

/// Opens an age file, armored or binary. The header MAC is verified before
/// any payload byte is touched; nothing partial is ever returned.
pub(crate) fn decrypt(
    ciphertext: &[u8],
    identity: &dyn Identity,
) -> Result<Vec<u8>, TLockAgeError> {
    let dearmored;
    let input = if armor::is_armored(ciphertext) {
        dearmored = armor::dearmor(ciphertext)?;
        &dearmored
    } else {
        ciphertext
    };

    let (header, header_len) = Header::parse(input)?;
    let file_key = identity.unwrap_stanzas(header.stanzas())?;
    format::verify_mac(&file_key, &header)?;

    let rest = &input[header_len..];
    if rest.len() < PAYLOAD_NONCE_SIZE {
        return Err(TLockAgeError::InputValidation(
            "payload too short for its nonce".to_string(),
        ));
    }
    let (nonce, payload) = rest.split_at(PAYLOAD_NONCE_SIZE);
    let payload_key = format::payload_key(&file_key, nonce);
    stream::open(&payload_key, payload)
}

/// Parses just the header, dearmoring if needed.
pub(crate) fn parse_header(ciphertext: &[u8]) -> Result<Header, TLockAgeError> {
    if armor::is_armored(ciphertext) {
        let dearmored = armor::dearmor(ciphertext)?;
        Ok(Header::parse(&dearmored)?.0)
    } else {
        Ok(Header::parse(ciphertext)?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tle_age::{NoOpIdentity, NoOpRecipient};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::from_seed([0u8; 32])
    }

    #[test]
    fn test_noop_roundtrip() {
        for len in [0usize, 11, 65536] {
            let plaintext = vec![0x61u8; len];
            let encrypted = encrypt(&mut rng(), &plaintext, &NoOpRecipient).unwrap();
            assert_eq!(decrypt(&encrypted, &NoOpIdentity).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_deterministic_rng_means_stable_bytes() {
        let a = encrypt(&mut rng(), b"hello world", &NoOpRecipient).unwrap();
        let b = encrypt(&mut rng(), b"hello world", &NoOpRecipient).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_header_tamper_fails_authentication() {
        let encrypted = encrypt(&mut rng(), b"hello world", &NoOpRecipient).unwrap();

        // flip one base64 character inside the stanza body line
        let body_start = encrypted
            .windows(2)
            .position(|w| w == b"\n-")
            .map(|i| {
                let line_end = encrypted[i + 1..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .unwrap();
                i + 1 + line_end + 1
            })
            .unwrap();
        let mut tampered = encrypted.clone();
        tampered[body_start] = if tampered[body_start] == b'A' { b'B' } else { b'A' };

        assert!(matches!(
            decrypt(&tampered, &NoOpIdentity),
            Err(TLockAgeError::Authentication)
        ));
    }

    #[test]
    fn test_payload_tamper_fails_authentication() {
        let encrypted = encrypt(&mut rng(), b"hello world", &NoOpRecipient).unwrap();
        let mut tampered = encrypted.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x80;
        assert!(matches!(
            decrypt(&tampered, &NoOpIdentity),
            Err(TLockAgeError::Authentication)
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let encrypted = encrypt(&mut rng(), b"hello world", &NoOpRecipient).unwrap();
        let (header, header_len) = Header::parse(&encrypted).unwrap();
        drop(header);
        let truncated = &encrypted[..header_len + PAYLOAD_NONCE_SIZE - 1];
        assert!(matches!(
            decrypt(truncated, &NoOpIdentity),
            Err(TLockAgeError::InputValidation(_))
        ));
    }

    #[test]
    fn test_armored_input_auto_detected() {
        let encrypted = encrypt(&mut rng(), b"hello world", &NoOpRecipient).unwrap();
        let armored = armor::armor(&encrypted);
        assert_eq!(
            decrypt(armored.as_bytes(), &NoOpIdentity).unwrap(),
            b"hello world"
        );
    }
}
