// ============================================
// File: crates/ooband-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Main Functionality
//! - `CorrelationId`: the 20-character key a client registers under and
//!   that prefixes every identifier it mints
//!
//! ## Main Logical Flow
//! 1. Client generates a `CorrelationId` once per session
//! 2. It travels in register/deregister/poll requests as a plain string
//! 3. Listeners recover it as the first 20 chars of a matched label
//!
//! ## ⚠️ Important Note for Next Developer
//! - Accepted IDs must stay valid DNS label content: lowercase ASCII
//!   letters and digits only, since listeners lowercase inbound names
//! - Generated IDs use z-base-32, but any conforming 20-char string
//!   registered by a client is accepted

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CommonError;
use crate::time::unix_seconds;
use crate::zbase32;

/// Length of a correlation ID in characters.
pub const CORRELATION_ID_LEN: usize = 20;

/// Number of random bytes mixed into a generated ID.
const RANDOM_BYTES: usize = 8;

// ============================================
// CorrelationId
// ============================================

/// Identifier binding a client session to the interactions it receives.
///
/// # Layout of generated IDs
/// ```text
/// ┌──────────────────┬──────────────────────────┐
/// │ unix secs (4 B)  │ OS random (8 B)          │
/// └──────────────────┴──────────────────────────┘
///        z-base-32 ──► 20 characters
/// ```
///
/// # Example
/// ```
/// use ooband_common::types::{CorrelationId, CORRELATION_ID_LEN};
///
/// let id = CorrelationId::generate();
/// assert_eq!(id.as_str().len(), CORRELATION_ID_LEN);
/// let parsed: CorrelationId = id.as_str().parse().unwrap();
/// assert_eq!(parsed, id);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a fresh, globally unique ID.
    #[must_use]
    pub fn generate() -> Self {
        let mut raw = [0u8; 4 + RANDOM_BYTES];
        raw[..4].copy_from_slice(&unix_seconds().to_be_bytes());
        rand::rngs::OsRng.fill_bytes(&mut raw[4..]);
        Self(zbase32::encode(&raw))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), CommonError> {
        if value.len() != CORRELATION_ID_LEN {
            return Err(CommonError::invalid_length(CORRELATION_ID_LEN, value.len()));
        }
        if !value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(CommonError::invalid_input(
                "correlation_id",
                "must contain only lowercase letters and digits",
            ));
        }
        Ok(())
    }
}

impl FromStr for CorrelationId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::validate(&value)?;
        Ok(Self(value))
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by `CorrelationId` be queried with a label slice.
impl Borrow<str> for CorrelationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationId({})", self.0)
    }
}

impl Serialize for CorrelationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}
