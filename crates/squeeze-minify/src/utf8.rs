//! Incremental UTF-8 decoding for byte-oriented writes
//!
//! A multi-byte character may be split across two `write` calls. The decoder
//! holds back an incomplete trailing sequence (at most 3 bytes) until the
//! rest arrives; anything that can never become valid UTF-8 is an error.

use squeeze_core::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode `bytes`, appending every complete character to `out`
    ///
    /// On invalid input the valid prefix is still appended before the error
    /// is returned, and the held-back bytes are discarded.
    pub(crate) fn decode(&mut self, bytes: &[u8], out: &mut String) -> Result<()> {
        let joined;
        let input: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            let mut buf = std::mem::take(&mut self.pending);
            buf.extend_from_slice(bytes);
            joined = buf;
            &joined
        };

        match std::str::from_utf8(input) {
            Ok(text) => {
                out.push_str(text);
                Ok(())
            }
            Err(err) => {
                let (valid, rest) = input.split_at(err.valid_up_to());
                out.push_str(std::str::from_utf8(valid)?);
                match err.error_len() {
                    None => {
                        self.pending = rest.to_vec();
                        Ok(())
                    }
                    Some(_) => Err(Error::Encoding(format!(
                        "invalid UTF-8 sequence {:02x?}",
                        &rest[..rest.len().min(4)]
                    ))),
                }
            }
        }
    }

    /// Number of bytes held back waiting for the rest of a character
    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Fail if a character was left incomplete
    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let n = std::mem::take(&mut self.pending).len();
        Err(Error::Encoding(format!(
            "output ended inside a multi-byte character ({n} bytes)"
        )))
    }
}
