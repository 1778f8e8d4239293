//! Chunked ChaCha20-Poly1305 payload, the age STREAM construction.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};

use crate::error::TLockAgeError;

/// Plaintext bytes per chunk.
pub(crate) const CHUNK_SIZE: usize = 65_536;
pub(crate) const TAG_SIZE: usize = 16;
const NONCE_SIZE: usize = 12;

// 11 bytes of big-endian counter fit in front of the last-chunk flag.
const COUNTER_LIMIT: u128 = 1 << 88;

fn nonce(counter: u128, last: bool) -> Result<[u8; NONCE_SIZE], TLockAgeError> {
    if counter >= COUNTER_LIMIT {
        return Err(TLockAgeError::Internal(
            "stream chunk counter overflow".to_string(),
        ));
    }
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..11].copy_from_slice(&counter.to_be_bytes()[5..]);
    nonce[11] = last as u8;
    Ok(nonce)
}

/// Seals `plaintext` under `key`, one tag per chunk.
///
/// A plaintext whose length is a multiple of the chunk size, the empty
/// plaintext included, ends with an empty chunk that only carries the
/// last-chunk flag.
pub(crate) fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, TLockAgeError> {
    let cipher = ChaCha20Poly1305::new_from_slice(key).expect("key is 32 bytes");

    let mut chunks: Vec<&[u8]> = plaintext.chunks(CHUNK_SIZE).collect();
    if plaintext.len() % CHUNK_SIZE == 0 {
        chunks.push(&[]);
    }

    let mut out = Vec::with_capacity(plaintext.len() + chunks.len() * TAG_SIZE);
    let last_index = chunks.len() - 1;
    for (i, chunk) in chunks.into_iter().enumerate() {
        let nonce = nonce(i as u128, i == last_index)?;
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), chunk)
            .map_err(|_| TLockAgeError::Internal("chunk encryption failed".to_string()))?;
        out.extend_from_slice(&sealed);
    }
    Ok(out)
}

/// Opens a sealed payload, verifying every chunk tag.
///
/// The final ciphertext piece is opened with the last-chunk flag whatever
/// its size, so payloads whose encoder flagged a full final chunk instead of
/// appending an empty one open as well.
pub(crate) fn open(key: &[u8; 32], ciphertext: &[u8]) -> Result<Vec<u8>, TLockAgeError> {
    if ciphertext.is_empty() {
        return Err(TLockAgeError::InputValidation(
            "empty payload".to_string(),
        ));
    }
    let cipher = ChaCha20Poly1305::new_from_slice(key).expect("key is 32 bytes");

    let chunks: Vec<&[u8]> = ciphertext.chunks(CHUNK_SIZE + TAG_SIZE).collect();
    let last_index = chunks.len() - 1;
    let mut out = Vec::with_capacity(ciphertext.len());
    for (i, chunk) in chunks.into_iter().enumerate() {
        if chunk.len() < TAG_SIZE {
            return Err(TLockAgeError::InputValidation(
                "truncated payload chunk".to_string(),
            ));
        }
        let nonce = nonce(i as u128, i == last_index)?;
        let opened = cipher
            .decrypt(Nonce::from_slice(&nonce), chunk)
            .map_err(|_| TLockAgeError::Authentication)?;
        out.extend_from_slice(&opened);
    }
    Ok(out)
}
