//! Order keys
//!
//! An order key is a base-62 string whose byte-wise lexicographic order is the
//! display order of a collection. A key is an *integer part* followed by an
//! optional *fraction*:
//!
//! ```text
//!   a 0 V
//!   │ │ └─ fraction (never ends in '0')
//!   │ └─── integer digits
//!   └───── head: 'a'..'z' = positive (1..26 digits), 'A'..'Z' = negative (26..1 digits)
//! ```
//!
//! Appending at either end walks the integer part (`a0`, `a1`, … `az`, `b00`),
//! so keys stay short for lists that grow at the edges. Inserting between two
//! neighbours bisects the fraction, which grows by roughly one character per
//! six insertions into the same gap.

mod algebra;

pub use algebra::{key_between, keys_between};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Digits in ascending order; ASCII order matches digit order.
pub const BASE_62_DIGITS: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub(crate) const DIGITS: &[u8] = BASE_62_DIGITS.as_bytes();

/// Integer part of the first key in a fresh collection
pub(crate) const INTEGER_ZERO: &str = "a0";

/// Reserved: nothing may sort before it, so it is never a valid key
pub(crate) const SMALLEST_INTEGER: &str = "A00000000000000000000000000";

/// Key algebra failures
///
/// These never reach the user: the safe key generator recovers from all of
/// them by reindexing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("bounds are not ordered: {prev} >= {next}")]
    Unordered { prev: String, next: String },

    #[error("invalid order key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("no key can be produced between the bounds")]
    Exhausted,
}

impl KeyError {
    pub(crate) fn invalid(key: &[u8], reason: &'static str) -> Self {
        KeyError::InvalidKey {
            key: String::from_utf8_lossy(key).into_owned(),
            reason,
        }
    }
}

/// Sortable key of one item within its collection
///
/// Keys read back from storage are wrapped as-is with [`OrderKey::from_raw`];
/// a damaged key is detected when it is next used as a bound and repaired by
/// reindexing instead of failing the load.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(String);

impl OrderKey {
    /// Parse and validate a key
    pub fn parse(key: impl Into<String>) -> Result<Self, KeyError> {
        let key = key.into();
        validate_order_key(key.as_bytes())?;
        Ok(Self(key))
    }

    /// Wrap stored text without validation
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        // Only ever called with bytes drawn from DIGITS.
        Self(bytes.into_iter().map(char::from).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        validate_order_key(self.0.as_bytes()).is_ok()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OrderKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub(crate) fn digit_value(c: u8) -> Option<usize> {
    match c {
        b'0'..=b'9' => Some((c - b'0') as usize),
        b'A'..=b'Z' => Some((c - b'A') as usize + 10),
        b'a'..=b'z' => Some((c - b'a') as usize + 36),
        _ => None,
    }
}

/// Length of the integer part announced by its head character
pub(crate) fn integer_length(head: u8) -> Option<usize> {
    match head {
        b'a'..=b'z' => Some((head - b'a') as usize + 2),
        b'A'..=b'Z' => Some((b'Z' - head) as usize + 2),
        _ => None,
    }
}

pub(crate) fn integer_part(key: &[u8]) -> Result<&[u8], KeyError> {
    let head = *key
        .first()
        .ok_or_else(|| KeyError::invalid(key, "empty key"))?;
    let len = integer_length(head).ok_or_else(|| KeyError::invalid(key, "invalid head"))?;
    if len > key.len() {
        return Err(KeyError::invalid(key, "integer part is truncated"));
    }
    Ok(&key[..len])
}

pub(crate) fn validate_order_key(key: &[u8]) -> Result<(), KeyError> {
    if key == SMALLEST_INTEGER.as_bytes() {
        return Err(KeyError::invalid(key, "reserved smallest integer"));
    }
    let int = integer_part(key)?;
    if key[1..].iter().any(|&c| digit_value(c).is_none()) {
        return Err(KeyError::invalid(key, "non base-62 digit"));
    }
    if key.len() > int.len() && key.last() == Some(&b'0') {
        return Err(KeyError::invalid(key, "fraction ends in '0'"));
    }
    Ok(())
}
