//! Reversible short key encoding for record ids.
//!
//! Keys use the Crockford base32 alphabet: digits and uppercase letters
//! without `I`, `L`, `O` and `U`. Decoding is case-insensitive and forgives
//! the usual transcription slips (`O` read as `0`, `I`/`L` read as `1`) as
//! well as hyphens inserted as visual separators.
//!
//! The key is a pure function of the id. It compacts the id, it does not
//! hide it: keys are trivially enumerable.

use thiserror::Error;

/// Symbols used for the positional encoding, in value order.
pub const SYMBOLS: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Extra symbols only valid as a trailing check symbol (values 32..=36).
const CHECK_SYMBOLS: &[u8; 5] = b"*~$=U";

const BASE: u64 = 32;
const CHECK_BASE: u64 = 37;

/// Reasons a key fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyDecodeError {
    #[error("identifier is empty")]
    Empty,

    #[error("invalid symbol '{0}' in identifier")]
    InvalidSymbol(char),

    #[error("check symbol does not match identifier")]
    ChecksumMismatch,

    #[error("identifier exceeds the supported range")]
    Overflow,
}

/// Encoder/decoder for short keys.
///
/// With `checksum` enabled every key carries one trailing check symbol
/// (`id mod 37`) and decoding rejects keys whose check symbol does not match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyCodec {
    checksum: bool,
}

impl KeyCodec {
    pub const fn new(checksum: bool) -> Self {
        Self { checksum }
    }

    pub const fn has_checksum(&self) -> bool {
        self.checksum
    }

    /// Encodes an id as its shortest key, most significant symbol first.
    pub fn encode(&self, id: u64) -> String {
        let mut symbols = Vec::with_capacity(14);
        let mut remaining = id;

        loop {
            symbols.push(SYMBOLS[(remaining % BASE) as usize]);
            remaining /= BASE;
            if remaining == 0 {
                break;
            }
        }
        symbols.reverse();

        if self.checksum {
            symbols.push(check_symbol(id));
        }

        symbols.into_iter().map(char::from).collect()
    }

    /// Decodes a key back into the id it was produced from.
    ///
    /// # Errors
    ///
    /// - [`KeyDecodeError::Empty`] if nothing is left after removing hyphens
    /// - [`KeyDecodeError::InvalidSymbol`] for characters outside the alphabet
    /// - [`KeyDecodeError::ChecksumMismatch`] if the check symbol is wrong
    /// - [`KeyDecodeError::Overflow`] if the value does not fit in `u64`
    pub fn decode(&self, key: &str) -> Result<u64, KeyDecodeError> {
        let normalized: Vec<char> = key.chars().filter(|c| *c != '-').map(normalize).collect();

        let (payload, check) = match (self.checksum, normalized.split_last()) {
            (_, None) => return Err(KeyDecodeError::Empty),
            (true, Some((last, rest))) => (rest, Some(*last)),
            (false, Some(_)) => (normalized.as_slice(), None),
        };

        if payload.is_empty() {
            return Err(KeyDecodeError::Empty);
        }

        let mut value: u64 = 0;
        for &symbol in payload {
            let digit = symbol_value(symbol).ok_or(KeyDecodeError::InvalidSymbol(symbol))?;
            value = value
                .checked_mul(BASE)
                .and_then(|v| v.checked_add(digit))
                .ok_or(KeyDecodeError::Overflow)?;
        }

        if let Some(check) = check {
            let expected = check_value(check).ok_or(KeyDecodeError::InvalidSymbol(check))?;
            if expected != value % CHECK_BASE {
                return Err(KeyDecodeError::ChecksumMismatch);
            }
        }

        Ok(value)
    }
}

fn normalize(c: char) -> char {
    match c {
        'I' | 'i' | 'L' | 'l' => '1',
        'O' | 'o' => '0',
        other => other.to_ascii_uppercase(),
    }
}

fn symbol_value(c: char) -> Option<u64> {
    if !c.is_ascii() {
        return None;
    }
    SYMBOLS
        .iter()
        .position(|&s| s == c as u8)
        .map(|p| p as u64)
}

fn check_value(c: char) -> Option<u64> {
    symbol_value(c).or_else(|| {
        if !c.is_ascii() {
            return None;
        }
        CHECK_SYMBOLS
            .iter()
            .position(|&s| s == c as u8)
            .map(|p| BASE + p as u64)
    })
}

fn check_symbol(id: u64) -> u8 {
    let value = (id % CHECK_BASE) as usize;
    if value < SYMBOLS.len() {
        SYMBOLS[value]
    } else {
        CHECK_SYMBOLS[value - SYMBOLS.len()]
    }
}
