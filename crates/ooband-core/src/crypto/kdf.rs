// ============================================
// File: crates/ooband-core/src/crypto/kdf.rs
// ============================================
//! # Key Derivation
//!
//! Turns an X25519 shared secret into a ChaCha20-Poly1305 key, bound to
//! both public keys that produced it.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{SealingKey, CHACHA20_KEY_SIZE, HKDF_INFO_PREFIX, HKDF_SALT, X25519_PUBLIC_KEY_SIZE};
use crate::error::{CoreError, Result};

/// Derives the payload key for one sealed box.
///
/// ```text
/// key = HKDF-SHA256(
///     ikm:  shared_secret,
///     salt: HKDF_SALT,
///     info: HKDF_INFO_PREFIX || ephemeral_public || recipient_public
/// )
/// ```
///
/// # Errors
/// Returns `KeyDerivation` if HKDF expansion fails.
pub fn derive_sealing_key(
    shared_secret: &[u8; 32],
    ephemeral_public: &[u8; X25519_PUBLIC_KEY_SIZE],
    recipient_public: &[u8; X25519_PUBLIC_KEY_SIZE],
) -> Result<SealingKey> {
    let mut info = Vec::with_capacity(HKDF_INFO_PREFIX.len() + X25519_PUBLIC_KEY_SIZE * 2);
    info.extend_from_slice(HKDF_INFO_PREFIX);
    info.extend_from_slice(ephemeral_public);
    info.extend_from_slice(recipient_public);

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared_secret);
    let mut key_bytes = [0u8; CHACHA20_KEY_SIZE];
    let expanded = hk.expand(&info, &mut key_bytes);
    info.zeroize();

    expanded.map_err(|_| CoreError::KeyDerivation {
        reason: "HKDF expansion failed".into(),
    })?;

    Ok(SealingKey::from_bytes(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let secret = [7u8; 32];
        let a = derive_sealing_key(&secret, &[1; 32], &[2; 32]).unwrap();
        let b = derive_sealing_key(&secret, &[1; 32], &[2; 32]).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_derivation_binds_public_keys() {
        let secret = [7u8; 32];
        let a = derive_sealing_key(&secret, &[1; 32], &[2; 32]).unwrap();
        let swapped = derive_sealing_key(&secret, &[2; 32], &[1; 32]).unwrap();
        assert_ne!(a.as_bytes(), swapped.as_bytes());
    }
}
