//! Record identifiers.
//!
//! Identifiers are 24-character hexadecimal strings laid out like a BSON
//! `ObjectId`: a 4-byte big-endian seconds timestamp, 5 random bytes drawn
//! once per process, and a 3-byte counter seeded randomly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{LazyLock, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use regex::Regex;

use crate::types::Value;

/// Length of the hexadecimal identifier string.
pub const OBJECT_ID_LEN: usize = 24;

static HEX_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[0-9a-fA-F]{24}$").expect("identifier pattern is valid")
});

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();

static COUNTER: LazyLock<AtomicU32> =
    LazyLock::new(|| AtomicU32::new(rand::rng().random_range(0..0x00FF_FFFF)));

/// Generates a fresh lowercase identifier.
///
/// # Examples
///
/// ```
/// use formwork_core::object_id::{generate, is_valid_str};
///
/// let id = generate();
/// assert_eq!(id.len(), 24);
/// assert!(is_valid_str(&id));
/// ```
#[must_use]
pub fn generate() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    #[allow(clippy::cast_possible_truncation)]
    let seconds = seconds as u32;
    let unique = PROCESS_UNIQUE.get_or_init(|| rand::rng().random());
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;

    let mut bytes = [0u8; 12];
    bytes[..4].copy_from_slice(&seconds.to_be_bytes());
    bytes[4..9].copy_from_slice(unique);
    bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
    hex::encode(bytes)
}

/// Whether a string is a well-formed 24-character hex identifier.
#[must_use]
pub fn is_valid_str(candidate: &str) -> bool {
    HEX_ID.is_match(candidate)
}

/// Whether a value may be submitted as an identifier: an integer, an
/// integral float, or a 24-character hex string.
#[must_use]
pub fn is_valid(value: &Value) -> bool {
    match value {
        Value::Int(_) => true,
        Value::Float(f) => f.is_finite() && f.fract() == 0.0,
        Value::String(s) => is_valid_str(s),
        _ => false,
    }
}
