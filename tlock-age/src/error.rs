use thiserror::Error;

/// Everything the container can fail with, in the shape callers dispatch on.
#[derive(Debug, Error)]
pub enum TLockAgeError {
    /// Malformed file material: bad base64, non-printable stanza tokens,
    /// unexpected line shapes, truncated payload.
    #[error("invalid input: {0}")]
    InputValidation(String),
    /// The file parses but does not follow the tlock protocol: wrong stanza
    /// tag or count, wrong argument count, version line mismatch.
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("unsupported beacon scheme: {0}")]
    UnsupportedScheme(String),
    /// Decryption attempted before the network signs the round.
    #[error("round {round} is not published yet, unlocks at unix time {unlock_at}")]
    TooEarly { round: u64, unlock_at: u64 },
    /// Failure reported by the beacon client, passed through verbatim.
    #[error("beacon network error")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Header MAC mismatch, payload chunk tag failure, or an IBE ciphertext
    /// rejected by its consistency check.
    #[error("message authentication failed")]
    Authentication,
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<tlock::Error> for TLockAgeError {
    fn from(e: tlock::Error) -> Self {
        match e {
            tlock::Error::Decryption => TLockAgeError::Authentication,
            tlock::Error::InvalidPoint => {
                TLockAgeError::InvalidCiphertext("invalid group element".to_string())
            }
            tlock::Error::InvalidCiphertext(m) => TLockAgeError::InvalidCiphertext(m),
            tlock::Error::UnsupportedScheme(s) => TLockAgeError::UnsupportedScheme(s),
            tlock::Error::Internal(m) => TLockAgeError::Internal(m),
        }
    }
}
