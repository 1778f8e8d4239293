//! ASCII armor: a printable envelope around the binary age file.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io::{self, Write};

use crate::error::TLockAgeError;

pub(crate) const ARMOR_BEGIN: &str = "-----BEGIN AGE ENCRYPTED FILE-----";
pub(crate) const ARMOR_END: &str = "-----END AGE ENCRYPTED FILE-----";
const WRAP_COLUMNS: usize = 64;

/// Wraps binary age bytes into the armor envelope.
pub fn armor(data: &[u8]) -> String {
    let body = STANDARD.encode(data);
    let mut out = String::with_capacity(body.len() + body.len() / WRAP_COLUMNS + 72);
    out.push_str(ARMOR_BEGIN);
    out.push('\n');
    for chunk in body.as_bytes().chunks(WRAP_COLUMNS) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 is ascii"));
        out.push('\n');
    }
    out.push_str(ARMOR_END);
    out.push('\n');
    out
}

/// True when `input` starts with the armor begin marker, ignoring leading
/// whitespace.
pub fn is_armored(input: &[u8]) -> bool {
    input
        .iter()
        .position(|b| !b" \t\r\n".contains(b))
        .map(|i| input[i..].starts_with(ARMOR_BEGIN.as_bytes()))
        .unwrap_or(false)
}

/// Strips the armor envelope and decodes the body.
///
/// Boundary lines tolerate CR/LF and trailing whitespace; body lines are
/// held to the 64-column wrapping and the strict base64 alphabet.
pub fn dearmor(input: &[u8]) -> Result<Vec<u8>, TLockAgeError> {
    let text = std::str::from_utf8(input)
        .map_err(|_| TLockAgeError::InputValidation("armor is not valid utf-8".to_string()))?;
    let mut lines = text.lines();

    let begin = loop {
        match lines.next() {
            None => {
                return Err(TLockAgeError::InputValidation(
                    "missing armor begin marker".to_string(),
                ))
            }
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => break line,
        }
    };
    if begin.trim_end() != ARMOR_BEGIN {
        return Err(TLockAgeError::InputValidation(
            "malformed armor begin marker".to_string(),
        ));
    }

    let mut body = String::new();
    let mut short_line_seen = false;
    loop {
        let line = lines.next().ok_or_else(|| {
            TLockAgeError::InputValidation("missing armor end marker".to_string())
        })?;
        if line.trim_end() == ARMOR_END {
            break;
        }
        if line.len() > WRAP_COLUMNS {
            return Err(TLockAgeError::InputValidation(
                "armor line longer than 64 characters".to_string(),
            ));
        }
        if short_line_seen {
            return Err(TLockAgeError::InputValidation(
                "short armor line before the end marker".to_string(),
            ));
        }
        short_line_seen = line.len() < WRAP_COLUMNS;
        body.push_str(line);
    }

    for rest in lines {
        if !rest.trim().is_empty() {
            return Err(TLockAgeError::InputValidation(
                "data after armor end marker".to_string(),
            ));
        }
    }

    STANDARD
        .decode(body)
        .map_err(|e| TLockAgeError::InputValidation(format!("invalid armor base64: {e}")))
}

/// Writer that applies the age ASCII armor format.
pub struct ArmoredWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: Write> ArmoredWriter<W> {
    /// Wraps the given output in an ArmoredWriter.
    pub fn wrap_output(w: W) -> Self {
        Self {
            inner: w,
            buffer: Vec::new(),
        }
    }

    /// Writes the armored payload and the end marker.
    ///
    /// You MUST call finish when you are done writing. Failing to call
    /// `finish` will result in a truncated file that will fail to decrypt.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.write_all(armor(&self.buffer).as_bytes())?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for ArmoredWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
