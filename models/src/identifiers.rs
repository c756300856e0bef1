// models/src/identifiers.rs

use core::ops::Deref;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};

const MAX_ID_LEN: usize = 64;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(rand::thread_rng().r#gen()));

/// A CUID-style primary key shared by every table.
///
/// Generated ids start with `c`, followed by the base-36 millisecond
/// timestamp, a base-36 process counter and eight random base-36 characters.
/// They sort roughly by creation time and never repeat within a process.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Validates and wraps an existing id.
    ///
    /// # Errors
    /// Returns a `ValidationError` if `value` is empty, longer than 64 bytes,
    /// or contains anything other than ASCII alphanumerics, `-` and `_`.
    pub fn new(value: String) -> ValidationResult<Self> {
        if value.is_empty() || value.len() > MAX_ID_LEN {
            return Err(ValidationError::InvalidIdentifierLength);
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(ValidationError::InvalidIdentifier(value));
        }
        Ok(Self(value))
    }

    /// Generates a fresh id.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) as u64;

        let mut id = String::with_capacity(25);
        id.push('c');
        id.push_str(&to_base36(millis));
        id.push_str(&pad_left(to_base36(count % 36u64.pow(4)), 4));

        let mut rng = rand::thread_rng();
        for _ in 0..8 {
            id.push(BASE36[rng.gen_range(0..BASE36.len())] as char);
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

fn pad_left(value: String, width: usize) -> String {
    format!("{:0>width$}", value, width = width)
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for EntityId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for EntityId {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for EntityId {
    type Error = ValidationError;

    fn try_from(value: String) -> ValidationResult<Self> {
        Self::new(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}
