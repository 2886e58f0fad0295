//! Text encodings for converting between secret bytes and secret characters.
//!
//! Decoding runs incrementally so the same routine can consume a whole slice
//! or a stream read in small chunks. Nothing here allocates; output always
//! lands in a caller-provided secure buffer.

use crate::error::{Result, SecretError};
use zeroize::Zeroize;

/// Encodings supported for `SecretBytes` ↔ `SecretString` conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// Each byte masked to its low seven bits. Lossy for bytes above `0x7F`.
    Ascii,
    /// Standard UTF-8.
    Utf8,
    /// UTF-16, big-endian byte pairs. Input length must be even.
    Utf16,
}

impl TextEncoding {
    /// Upper bound on the characters `byte_len` input bytes can decode to.
    pub fn max_char_count(self, byte_len: usize) -> usize {
        match self {
            TextEncoding::Ascii | TextEncoding::Utf8 => byte_len,
            TextEncoding::Utf16 => byte_len / 2,
        }
    }

    /// Exact number of bytes `chars` occupy once encoded.
    pub fn encoded_len(self, chars: &[char]) -> usize {
        match self {
            TextEncoding::Ascii => chars.len(),
            TextEncoding::Utf8 => chars.iter().map(|c| c.len_utf8()).sum(),
            TextEncoding::Utf16 => chars.iter().map(|c| c.len_utf16() * 2).sum(),
        }
    }

    /// Rejects input lengths the encoding can never decode.
    pub(crate) fn check_input_len(self, byte_len: usize) -> Result<()> {
        if self == TextEncoding::Utf16 && byte_len % 2 != 0 {
            return Err(SecretError::Format(format!(
                "UTF-16 input must have an even length, got {} bytes",
                byte_len
            )));
        }
        Ok(())
    }

    pub(crate) fn decoder(self) -> Decoder {
        Decoder {
            encoding: self,
            pending: [0; 4],
            pending_len: 0,
            expected: 0,
            high_surrogate: None,
            consumed: 0,
        }
    }

    /// Encodes `chars` into `out`, which must hold at least
    /// [`encoded_len`](Self::encoded_len) bytes. Returns the bytes written.
    ///
    /// Characters outside ASCII encode as `?` under [`TextEncoding::Ascii`].
    pub(crate) fn encode_into(self, chars: &[char], out: &mut [u8]) -> Result<usize> {
        let needed = self.encoded_len(chars);
        if out.len() < needed {
            return Err(SecretError::Range(format!(
                "encoding needs {} bytes, buffer holds {}",
                needed,
                out.len()
            )));
        }

        let mut written = 0;
        match self {
            TextEncoding::Ascii => {
                for (dst, &c) in out.iter_mut().zip(chars) {
                    *dst = if c.is_ascii() { c as u8 } else { b'?' };
                }
                written = chars.len();
            }
            TextEncoding::Utf8 => {
                for &c in chars {
                    written += c.encode_utf8(&mut out[written..]).len();
                }
            }
            TextEncoding::Utf16 => {
                let mut units = [0u16; 2];
                for &c in chars {
                    for unit in c.encode_utf16(&mut units).iter() {
                        out[written..written + 2].copy_from_slice(&unit.to_be_bytes());
                        written += 2;
                    }
                }
                units.zeroize();
            }
        }
        Ok(written)
    }
}

/// Incremental decoder state. Holds at most one partial character.
pub(crate) struct Decoder {
    encoding: TextEncoding,
    pending: [u8; 4],
    pending_len: usize,
    expected: usize,
    high_surrogate: Option<u16>,
    consumed: usize,
}

impl Decoder {
    /// Decodes `input` into `out[*written..]`, advancing `written`.
    pub(crate) fn decode(&mut self, input: &[u8], out: &mut [char], written: &mut usize) -> Result<()> {
        for &byte in input {
            if let Some(c) = self.push(byte)? {
                let slot = out.get_mut(*written).ok_or_else(|| {
                    SecretError::Range("decoded text exceeds the destination buffer".to_string())
                })?;
                *slot = c;
                *written += 1;
            }
            self.consumed += 1;
        }
        Ok(())
    }

    /// Fails if the input ended in the middle of a character.
    pub(crate) fn finish(&mut self) -> Result<()> {
        if self.pending_len != 0 || self.high_surrogate.is_some() {
            return Err(SecretError::Format(format!(
                "{:?} input ends with an incomplete character",
                self.encoding
            )));
        }
        Ok(())
    }

    fn push(&mut self, byte: u8) -> Result<Option<char>> {
        match self.encoding {
            TextEncoding::Ascii => Ok(Some(char::from(byte & 0x7F))),
            TextEncoding::Utf8 => self.push_utf8(byte),
            TextEncoding::Utf16 => self.push_utf16(byte),
        }
    }

    fn push_utf8(&mut self, byte: u8) -> Result<Option<char>> {
        if self.pending_len == 0 {
            self.expected = match byte {
                0x00..=0x7F => return Ok(Some(char::from(byte))),
                0xC2..=0xDF => 2,
                0xE0..=0xEF => 3,
                0xF0..=0xF4 => 4,
                _ => return Err(self.invalid_utf8()),
            };
        } else if byte & 0xC0 != 0x80 {
            return Err(self.invalid_utf8());
        }

        self.pending[self.pending_len] = byte;
        self.pending_len += 1;
        if self.pending_len < self.expected {
            return Ok(None);
        }

        // Rejects overlong forms and encoded surrogates.
        let decoded = std::str::from_utf8(&self.pending[..self.pending_len])
            .ok()
            .and_then(|s| s.chars().next());
        self.pending.zeroize();
        self.pending_len = 0;
        decoded.map(Some).ok_or_else(|| self.invalid_utf8())
    }

    fn push_utf16(&mut self, byte: u8) -> Result<Option<char>> {
        if self.pending_len == 0 {
            self.pending[0] = byte;
            self.pending_len = 1;
            return Ok(None);
        }

        let unit = u16::from_be_bytes([self.pending[0], byte]);
        self.pending.zeroize();
        self.pending_len = 0;

        match (self.high_surrogate.take(), unit) {
            (None, 0xD800..=0xDBFF) => {
                self.high_surrogate = Some(unit);
                Ok(None)
            }
            (Some(high), 0xDC00..=0xDFFF) => {
                let code = 0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(unit) - 0xDC00);
                char::from_u32(code).map(Some).ok_or_else(|| self.unpaired_surrogate())
            }
            (None, _) => char::from_u32(u32::from(unit))
                .map(Some)
                .ok_or_else(|| self.unpaired_surrogate()),
            (Some(_), _) => Err(self.unpaired_surrogate()),
        }
    }

    fn invalid_utf8(&self) -> SecretError {
        SecretError::Format(format!("invalid UTF-8 sequence at byte {}", self.consumed))
    }

    fn unpaired_surrogate(&self) -> SecretError {
        SecretError::Format(format!("unpaired UTF-16 surrogate at byte {}", self.consumed))
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.pending.zeroize();
        self.high_surrogate = None;
    }
}
