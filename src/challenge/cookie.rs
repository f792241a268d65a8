//! `acw_sc__v2` cookie derivation.
//!
//! The upstream's challenge script shuffles the 40-character `arg1` token
//! through a fixed permutation ("unsbox") and XORs the result byte-wise with a
//! fixed key. Both constants are reproduced verbatim; any change breaks the
//! derived cookie.

use std::fmt;

use thiserror::Error;

/// Name of the cookie the upstream expects.
pub const COOKIE_NAME: &str = "acw_sc__v2";

/// Length of a challenge token in hex characters.
pub const TOKEN_LEN: usize = 40;

/// One-based source positions: output character `i` is `token[UNSBOX_TABLE[i] - 1]`.
const UNSBOX_TABLE: [usize; TOKEN_LEN] = [
    0xf, 0x23, 0x1d, 0x18, 0x21, 0x10, 0x1, 0x26, 0xa, 0x9, 0x13, 0x1f, 0x28, 0x1b, 0x16, 0x17,
    0x19, 0xd, 0x6, 0xb, 0x27, 0x12, 0x14, 0x8, 0xe, 0x15, 0x20, 0x1a, 0x2, 0x1e, 0x7, 0x4, 0x11,
    0x5, 0x3, 0x1c, 0x22, 0x25, 0xc, 0x24,
];

/// `3000176000856006061501533003690027800375` as raw bytes.
const XOR_KEY: [u8; TOKEN_LEN / 2] = [
    0x30, 0x00, 0x17, 0x60, 0x00, 0x85, 0x60, 0x06, 0x06, 0x15, 0x01, 0x53, 0x30, 0x03, 0x69, 0x00,
    0x27, 0x80, 0x03, 0x75,
];

/// A validated challenge token: exactly 40 ASCII hex digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeToken(String);

impl ChallengeToken {
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        if raw.len() != TOKEN_LEN {
            return Err(TokenError::Length(raw.len()));
        }
        if let Some(bad) = raw.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(TokenError::NotHex(bad));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("challenge token must be {TOKEN_LEN} characters, got {0}")]
    Length(usize),
    #[error("challenge token contains non-hex character {0:?}")]
    NotHex(char),
}

/// Cookie computed from a challenge token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedCookie {
    value: String,
}

impl DerivedCookie {
    pub fn name(&self) -> &'static str {
        COOKIE_NAME
    }

    /// The 40 lowercase hex characters after `acw_sc__v2=`.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// `name=value` form, ready for a `Cookie` header.
    pub fn header_pair(&self) -> String {
        format!("{COOKIE_NAME}={}", self.value)
    }
}

impl fmt::Display for DerivedCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COOKIE_NAME}={}", self.value)
    }
}

/// Derive the `acw_sc__v2` cookie from a challenge token.
pub fn derive_cookie(token: &ChallengeToken) -> DerivedCookie {
    let source = token.as_str().as_bytes();
    let unsboxed: Vec<u8> = UNSBOX_TABLE
        .iter()
        .map(|&position| source[position - 1])
        .collect();

    let mut bytes = [0u8; TOKEN_LEN / 2];
    hex::decode_to_slice(&unsboxed, &mut bytes)
        .expect("ChallengeToken holds exactly 40 hex digits");
    for (byte, key) in bytes.iter_mut().zip(XOR_KEY) {
        *byte ^= key;
    }

    DerivedCookie {
        value: hex::encode(bytes),
    }
}
