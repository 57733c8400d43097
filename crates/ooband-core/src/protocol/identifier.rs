// ============================================
// File: crates/ooband-core/src/protocol/identifier.rs
// ============================================
//! # Identifier Codec
//!
//! ## Creation Reason
//! Every request a client plants carries a DNS label that the listeners
//! can map back to the client's session. This module mints those labels
//! and pulls them back out of inbound addressing.
//!
//! ## Label Layout
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────┐
//! │ correlation ID (20)  │ z-base-32 suffix (12 or 13)              │
//! └──────────────────────┴──────────────────────────────────────────┘
//!                          suffix bytes:
//!                          ┌──────────────┬─────────────┬──────────┐
//!                          │ unix secs (4)│ counter (3) │ rand (1) │
//!                          └──────────────┴─────────────┴──────────┘
//!                                                  Extended only ──┘
//! ```
//!
//! ## Main Functionality
//! - `mint`: correlation ID + fresh suffix
//! - `extract_identifier`: find the matching label in a hostname
//! - `extract_from_recipients`: same, for SMTP envelope recipients
//! - `url_reflection`: reverse the 32-char label (payload reflection)
//!
//! ## ⚠️ Important Note for Next Developer
//! - The counter is process-wide, seeded once from the OS RNG and only
//!   ever advanced with `fetch_add`; there is no reset
//! - Server and clients must agree on the `IdentifierVariant`

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use ooband_common::time::unix_seconds;
use ooband_common::types::{CorrelationId, CORRELATION_ID_LEN};
use ooband_common::zbase32;

/// Label length [`url_reflection`] looks for.
pub const REFLECTION_LABEL_LEN: usize = 32;

/// Mask keeping the low 24 bits of the counter.
const COUNTER_MASK: u32 = 0x00FF_FFFF;

// ============================================
// IdentifierVariant
// ============================================

/// Suffix layout shared by clients and listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierVariant {
    /// 7 suffix bytes, 32-character identifiers.
    Compact,
    /// 7 suffix bytes plus one random nonce byte, 33-character identifiers.
    #[default]
    Extended,
}

impl IdentifierVariant {
    /// Raw bytes encoded in the suffix.
    #[must_use]
    pub const fn suffix_bytes(self) -> usize {
        match self {
            Self::Compact => 7,
            Self::Extended => 8,
        }
    }

    /// Suffix length in characters.
    #[must_use]
    pub const fn suffix_len(self) -> usize {
        zbase32::encoded_len(self.suffix_bytes())
    }

    /// Full identifier label length in characters.
    #[must_use]
    pub const fn identifier_len(self) -> usize {
        CORRELATION_ID_LEN + self.suffix_len()
    }
}

// ============================================
// Minting
// ============================================

fn counter() -> &'static AtomicU32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER.get_or_init(|| AtomicU32::new(rand::random::<u32>() & COUNTER_MASK))
}

fn next_count() -> u32 {
    counter().fetch_add(1, Ordering::Relaxed) & COUNTER_MASK
}

/// Builds a fresh suffix for `variant`.
#[must_use]
pub fn mint_suffix(variant: IdentifierVariant) -> String {
    let mut raw = [0u8; 8];
    raw[..4].copy_from_slice(&unix_seconds().to_be_bytes());
    raw[4..7].copy_from_slice(&next_count().to_be_bytes()[1..]);
    if variant == IdentifierVariant::Extended {
        raw[7] = rand::random::<u8>();
    }
    zbase32::encode(&raw[..variant.suffix_bytes()])
}

/// Mints a new identifier label for `correlation_id`.
///
/// Lock-free; two calls in one process never return the same label
/// within 2^24 mints per second.
///
/// # Example
/// ```
/// use ooband_common::CorrelationId;
/// use ooband_core::protocol::identifier::{mint, IdentifierVariant};
///
/// let id = CorrelationId::generate();
/// let label = mint(&id, IdentifierVariant::Extended);
/// assert_eq!(label.len(), 33);
/// assert!(label.starts_with(id.as_str()));
/// ```
#[must_use]
pub fn mint(correlation_id: &CorrelationId, variant: IdentifierVariant) -> String {
    let mut label = String::with_capacity(variant.identifier_len());
    label.push_str(correlation_id.as_str());
    label.push_str(&mint_suffix(variant));
    label
}

// ============================================
// Extraction
// ============================================

/// Identifier recovered from inbound addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedIdentifier {
    /// The matched label.
    pub unique_id: String,
    /// First 20 characters of the matched label.
    pub correlation_id: String,
    /// Labels up to and including the matched one, dot-joined.
    pub full_id: String,
}

/// Finds the last label of exactly `expected_len` characters in `address`.
///
/// Every label is scanned and a later match replaces an earlier one.
/// The address is lowercased first. Returns `None` when no label matches;
/// callers treat that as "not ours" and move on.
#[must_use]
pub fn extract_identifier(address: &str, expected_len: usize) -> Option<ExtractedIdentifier> {
    if expected_len < CORRELATION_ID_LEN {
        return None;
    }

    let lowered = address.trim().trim_end_matches('.').to_ascii_lowercase();
    let labels: Vec<&str> = lowered.split('.').collect();
    let index = labels
        .iter()
        .rposition(|label| label.len() == expected_len && label.is_ascii())?;
    let unique_id = labels[index];

    Some(ExtractedIdentifier {
        unique_id: unique_id.to_owned(),
        correlation_id: unique_id[..CORRELATION_ID_LEN].to_owned(),
        full_id: labels[..=index].join("."),
    })
}

/// Runs extraction over SMTP envelope recipients.
///
/// Only recipients containing `@` with at least `expected_len` characters
/// after it are considered; their host part is searched. Every recipient
/// is visited and the last one that yields a match wins.
pub fn extract_from_recipients<'a, I>(recipients: I, expected_len: usize) -> Option<ExtractedIdentifier>
where
    I: IntoIterator<Item = &'a str>,
{
    recipients
        .into_iter()
        .filter_map(|recipient| {
            let address = recipient.trim().trim_start_matches('<').trim_end_matches('>');
            let (_, host) = address.rsplit_once('@')?;
            if host.len() < expected_len {
                return None;
            }
            extract_identifier(host, expected_len)
        })
        .last()
}

// ============================================
// Reflection
// ============================================

/// Reverses the last label of `label_len` characters in `address`.
///
/// Returns an empty string when no label has that length.
#[must_use]
pub fn reflect_label(address: &str, label_len: usize) -> String {
    address
        .split('.')
        .filter(|label| label.chars().count() == label_len)
        .last()
        .map(|label| label.chars().rev().collect())
        .unwrap_or_default()
}

/// Payload reflection: the 32-character label of `address`, reversed.
///
/// # Example
/// ```
/// use ooband_core::protocol::identifier::url_reflection;
///
/// let host = "abcdefghijklmnopqrstuvwxyz012345.oast.example";
/// assert_eq!(url_reflection(host), "543210zyxwvutsrqponmlkjihgfedcba");
/// ```
#[must_use]
pub fn url_reflection(address: &str) -> String {
    reflect_label(address, REFLECTION_LABEL_LEN)
}
