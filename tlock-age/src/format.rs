//! The age v1 header: version line, recipient stanzas, HMAC footer.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand_core::CryptoRngCore;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::error::TLockAgeError;

pub(crate) const FILE_KEY_SIZE: usize = 16;
const MAC_SIZE: usize = 32;
const WRAP_COLUMNS: usize = 64;

const VERSION_LINE: &str = "age-encryption.org/v1";
const STANZA_PREFIX: &str = "-> ";
const MAC_PREFIX: &str = "--- ";

type HmacSha256 = Hmac<Sha256>;

/// Per-file symmetric secret. Every recipient stanza wraps it; the payload
/// key and the header MAC key are both derived from it. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct FileKey([u8; FILE_KEY_SIZE]);

impl FileKey {
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        let mut key = [0u8; FILE_KEY_SIZE];
        rng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TLockAgeError> {
        let key: [u8; FILE_KEY_SIZE] = bytes.try_into().map_err(|_| {
            TLockAgeError::InvalidCiphertext(format!(
                "file key must be {FILE_KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }
}

impl AsRef<[u8]> for FileKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FileKey(..)")
    }
}

/// `HKDF-SHA256(ikm = file key, salt = none, info = "header")`.
pub(crate) fn header_mac_key(file_key: &FileKey) -> [u8; 32] {
    let mut key = [0u8; 32];
    Hkdf::<Sha256>::new(None, file_key.as_ref())
        .expand(b"header", &mut key)
        .expect("32 bytes is a valid hkdf-sha256 output length");
    key
}

/// `HKDF-SHA256(ikm = file key, salt = payload nonce, info = "payload")`.
pub(crate) fn payload_key(file_key: &FileKey, nonce: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    Hkdf::<Sha256>::new(Some(nonce), file_key.as_ref())
        .expand(b"payload", &mut key)
        .expect("32 bytes is a valid hkdf-sha256 output length");
    key
}

/// One recipient record: a tag, printable-ASCII arguments, and an opaque
/// binary body carried as wrapped unpadded base64.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stanza {
    pub tag: String,
    pub args: Vec<String>,
    pub body: Vec<u8>,
}

impl Stanza {
    pub fn new(tag: &str, args: Vec<String>, body: Vec<u8>) -> Result<Self, TLockAgeError> {
        validate_token(tag)?;
        for arg in &args {
            validate_token(arg)?;
        }
        Ok(Self {
            tag: tag.to_string(),
            args,
            body,
        })
    }
}

// Tags and arguments may only carry the printable ASCII range, and may not
// be empty: anything else is ambiguous on the line-oriented wire.
fn validate_token(token: &str) -> Result<(), TLockAgeError> {
    if token.is_empty() {
        return Err(TLockAgeError::InputValidation(
            "empty stanza token".to_string(),
        ));
    }
    if !token.bytes().all(|b| (33..=126).contains(&b)) {
        return Err(TLockAgeError::InputValidation(format!(
            "stanza token {token:?} contains non-printable characters"
        )));
    }
    Ok(())
}

/// Parsed age header: the stanzas and the HMAC that covers them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    stanzas: Vec<Stanza>,
    mac: [u8; MAC_SIZE],
}

impl Header {
    pub(crate) fn new(stanzas: Vec<Stanza>, mac: [u8; MAC_SIZE]) -> Self {
        Self { stanzas, mac }
    }

    pub fn stanzas(&self) -> &[Stanza] {
        &self.stanzas
    }

    /// Canonical bytes, version line through the MAC line inclusive.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = mac_input(&self.stanzas);
        out.push(b' ');
        out.extend_from_slice(STANDARD_NO_PAD.encode(self.mac).as_bytes());
        out.push(b'\n');
        out
    }

    /// Parses a header off the front of `input`, returning it together with
    /// the number of bytes consumed (the payload starts right after).
    pub fn parse(input: &[u8]) -> Result<(Self, usize), TLockAgeError> {
        let mut lines = Lines { input, pos: 0 };

        let version = lines.next_line()?;
        if version != VERSION_LINE {
            return Err(TLockAgeError::Protocol(format!(
                "unexpected version line {version:?}"
            )));
        }

        let mut stanzas = Vec::new();
        let mac = loop {
            let line = lines.next_line()?;
            if let Some(rest) = line.strip_prefix(STANZA_PREFIX) {
                stanzas.push(parse_stanza(rest, &mut lines)?);
            } else if let Some(rest) = line.strip_prefix(MAC_PREFIX) {
                let mac = b64_decode(rest)?;
                break <[u8; MAC_SIZE]>::try_from(mac.as_slice()).map_err(|_| {
                    TLockAgeError::InputValidation(format!(
                        "header mac must be {MAC_SIZE} bytes, got {}",
                        mac.len()
                    ))
                })?;
            } else {
                return Err(TLockAgeError::InputValidation(format!(
                    "unexpected header line {line:?}"
                )));
            }
        };

        if stanzas.is_empty() {
            return Err(TLockAgeError::Protocol(
                "header carries no recipient stanzas".to_string(),
            ));
        }

        Ok((Self { stanzas, mac }, lines.pos))
    }
}

fn parse_stanza(first_line: &str, lines: &mut Lines<'_>) -> Result<Stanza, TLockAgeError> {
    let mut tokens = first_line.split(' ');
    let tag = tokens.next().unwrap_or_default();
    let args: Vec<String> = tokens.map(str::to_string).collect();

    let mut body_b64 = String::new();
    loop {
        let line = lines.next_line()?;
        if line.len() > WRAP_COLUMNS {
            return Err(TLockAgeError::InputValidation(
                "stanza body line longer than 64 characters".to_string(),
            ));
        }
        body_b64.push_str(line);
        // a short line, including an empty one, ends the body
        if line.len() < WRAP_COLUMNS {
            break;
        }
    }
    let body = b64_decode(&body_b64)?;

    Stanza::new(tag, args, body)
}

/// MAC input: version line and stanzas, terminated by a bare `---`.
pub(crate) fn mac_input(stanzas: &[Stanza]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(VERSION_LINE.as_bytes());
    out.push(b'\n');
    for stanza in stanzas {
        write_stanza(&mut out, stanza);
    }
    out.extend_from_slice(b"---");
    out
}

fn write_stanza(out: &mut Vec<u8>, stanza: &Stanza) {
    out.extend_from_slice(STANZA_PREFIX.as_bytes());
    out.extend_from_slice(stanza.tag.as_bytes());
    for arg in &stanza.args {
        out.push(b' ');
        out.extend_from_slice(arg.as_bytes());
    }
    out.push(b'\n');

    let body = STANDARD_NO_PAD.encode(&stanza.body);
    for chunk in body.as_bytes().chunks(WRAP_COLUMNS) {
        out.extend_from_slice(chunk);
        out.push(b'\n');
    }
    // a body whose encoding fills its last line needs an explicit empty line
    // so parsers can see where it ends
    if body.len() % WRAP_COLUMNS == 0 {
        out.push(b'\n');
    }
}

pub(crate) fn compute_mac(file_key: &FileKey, stanzas: &[Stanza]) -> [u8; MAC_SIZE] {
    let key = header_mac_key(file_key);
    let mut mac = HmacSha256::new_from_slice(&key).expect("hmac accepts any key size");
    mac.update(&mac_input(stanzas));
    mac.finalize().into_bytes().into()
}

pub(crate) fn verify_mac(file_key: &FileKey, header: &Header) -> Result<(), TLockAgeError> {
    let key = header_mac_key(file_key);
    let mut mac = HmacSha256::new_from_slice(&key).expect("hmac accepts any key size");
    mac.update(&mac_input(&header.stanzas));
    mac.verify_slice(&header.mac)
        .map_err(|_| TLockAgeError::Authentication)
}

fn b64_decode(s: &str) -> Result<Vec<u8>, TLockAgeError> {
    STANDARD_NO_PAD
        .decode(s)
        .map_err(|e| TLockAgeError::InputValidation(format!("invalid base64: {e}")))
}

struct Lines<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lines<'a> {
    fn next_line(&mut self) -> Result<&'a str, TLockAgeError> {
        let rest = &self.input[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| TLockAgeError::InputValidation("truncated header".to_string()))?;
        self.pos += end + 1;
        std::str::from_utf8(&rest[..end])
            .map_err(|_| TLockAgeError::InputValidation("header is not valid utf-8".to_string()))
    }
}
