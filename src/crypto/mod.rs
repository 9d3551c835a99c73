/// Cryptographic utilities: keyed email digests and metadata sealing
pub mod token;

use crate::error::{AuthError, AuthResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Deterministic keyed digest of a verified email address.
///
/// The email is lowercased before hashing so lookups are case-insensitive.
pub fn hash_email(email: &str, key: &str) -> AuthResult<String> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|e| AuthError::Internal(format!("HMAC init failed: {e}")))?;
    mac.update(email.to_lowercase().as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Seals and opens client metadata blobs with ChaCha20-Poly1305.
///
/// Envelope format: `base64(nonce):base64(ciphertext)` with a fresh random
/// 12-byte nonce per seal.
#[derive(Clone)]
pub struct MetadataCipher {
    key: [u8; 32],
}

impl MetadataCipher {
    /// Key is hex-encoded, 32 bytes once decoded.
    pub fn from_hex(key_hex: &str) -> AuthResult<Self> {
        let raw = hex::decode(key_hex)
            .map_err(|_| AuthError::Validation("ENCRYPT_KEY must be hex".to_string()))?;
        let key: [u8; 32] = raw.try_into().map_err(|_| {
            AuthError::Validation("ENCRYPT_KEY must decode to 32 bytes".to_string())
        })?;
        Ok(Self { key })
    }

    pub fn encrypt(&self, plaintext: &str) -> AuthResult<String> {
        let mut nonce_raw = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_raw);
        let nonce = Nonce::from_slice(&nonce_raw);

        let aead = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| AuthError::Internal(format!("cipher init failed: {e}")))?;
        let ciphertext = aead
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| AuthError::Internal(format!("metadata encryption failed: {e}")))?;

        Ok(format!(
            "{}:{}",
            URL_SAFE_NO_PAD.encode(nonce_raw),
            URL_SAFE_NO_PAD.encode(ciphertext)
        ))
    }

    pub fn decrypt(&self, sealed: &str) -> AuthResult<String> {
        let (nonce_b64, ciphertext_b64) = sealed
            .split_once(':')
            .ok_or_else(|| AuthError::Internal("metadata envelope is malformed".to_string()))?;

        let nonce_raw = URL_SAFE_NO_PAD
            .decode(nonce_b64)
            .map_err(|_| AuthError::Internal("metadata nonce is not valid base64".to_string()))?;
        if nonce_raw.len() != 12 {
            return Err(AuthError::Internal(
                "metadata nonce length is invalid".to_string(),
            ));
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(ciphertext_b64)
            .map_err(|_| AuthError::Internal("metadata payload is not valid base64".to_string()))?;

        let aead = ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| AuthError::Internal(format!("cipher init failed: {e}")))?;
        let plaintext = aead
            .decrypt(Nonce::from_slice(&nonce_raw), ciphertext.as_ref())
            .map_err(|_| AuthError::Internal("metadata decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| AuthError::Internal("metadata plaintext is not valid utf8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher_with(byte: u8) -> MetadataCipher {
        MetadataCipher::from_hex(&hex::encode([byte; 32])).unwrap()
    }

    #[test]
    fn metadata_round_trip() {
        let cipher = cipher_with(1);
        let original = r#"{"device":"pixel-8","os":"android"}"#;

        let sealed = cipher.encrypt(original).unwrap();
        assert_ne!(sealed, original);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), original);
    }

    #[test]
    fn fresh_nonce_per_seal() {
        let cipher = cipher_with(1);
        let a = cipher.encrypt("payload").unwrap();
        let b = cipher.encrypt("payload").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_instead_of_corrupting() {
        let sealed = cipher_with(1).encrypt("secret").unwrap();
        let result = cipher_with(2).decrypt(&sealed);
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }

    #[test]
    fn tampered_envelope_fails() {
        let cipher = cipher_with(1);
        let sealed = cipher.encrypt("secret").unwrap();

        let mut tampered = sealed.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();

        assert!(cipher.decrypt(&tampered).is_err());
        assert!(cipher.decrypt("not-an-envelope").is_err());
    }

    #[test]
    fn email_hash_is_case_insensitive_and_key_sensitive() {
        let a = hash_email("User@Example.com", "key-1").unwrap();
        let b = hash_email("user@example.com", "key-1").unwrap();
        let c = hash_email("user@example.com", "key-2").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64); // hex-encoded SHA-256 width
    }
}
