//! AES-256-GCM encryption for setting values at rest.
//!
//! Every value gets its own random 96-bit nonce. Ciphertext and nonce are
//! stored base64-encoded next to each other.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

/// Decodes a base64 master key and checks it is exactly 32 bytes.
pub fn validate_key(key_base64: &str) -> Result<Vec<u8>> {
    let key_bytes = BASE64
        .decode(key_base64.trim())
        .context("Failed to decode base64 encryption key")?;

    if key_bytes.len() != KEY_SIZE {
        return Err(anyhow!(
            "Encryption key must be {} bytes (256 bits), got {} bytes",
            KEY_SIZE,
            key_bytes.len()
        ));
    }

    Ok(key_bytes)
}

/// Cipher bound to the master key for the lifetime of a store.
pub struct SettingCipher {
    cipher: Aes256Gcm,
}

impl SettingCipher {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_SIZE {
            return Err(anyhow!("Encryption key must be {} bytes", KEY_SIZE));
        }
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| anyhow!("Failed to create cipher: {}", e))?;
        Ok(Self { cipher })
    }

    pub fn from_base64_key(key_base64: &str) -> Result<Self> {
        Self::new(&validate_key(key_base64)?)
    }

    /// Returns `(ciphertext, nonce)`, both base64.
    pub fn encrypt(&self, plaintext: &str) -> Result<(String, String)> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("Encryption failed: {}", e))?;

        Ok((BASE64.encode(&ciphertext), BASE64.encode(nonce)))
    }

    pub fn decrypt(&self, ciphertext: &str, nonce: &str) -> Result<String> {
        let ciphertext = BASE64
            .decode(ciphertext)
            .context("Failed to decode ciphertext")?;
        let nonce = BASE64.decode(nonce).context("Failed to decode nonce")?;

        if nonce.len() != NONCE_SIZE {
            return Err(anyhow!(
                "Invalid nonce size: expected {}, got {}",
                NONCE_SIZE,
                nonce.len()
            ));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|e| anyhow!("Decryption failed (wrong key or corrupted data): {}", e))?;

        String::from_utf8(plaintext).context("Decrypted value is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(validate_key(&BASE64.encode([0u8; 32])).is_ok());
        assert!(validate_key(&BASE64.encode([0u8; 16])).is_err());
        assert!(validate_key(&BASE64.encode([0u8; 64])).is_err());
        assert!(validate_key("not-valid-base64!@#$").is_err());
    }

    #[test]
    fn test_encrypt_then_decrypt() {
        let cipher = SettingCipher::new(&[7u8; 32]).unwrap();

        let (ciphertext, nonce) = cipher.encrypt("gho_secret_token").unwrap();
        assert_ne!(ciphertext, "gho_secret_token");
        assert_eq!(cipher.decrypt(&ciphertext, &nonce).unwrap(), "gho_secret_token");
    }

    #[test]
    fn test_nonce_differs_per_value() {
        let cipher = SettingCipher::new(&[0u8; 32]).unwrap();

        let (c1, n1) = cipher.encrypt("same").unwrap();
        let (c2, n2) = cipher.encrypt("same").unwrap();
        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_wrong_key_fails() {
        let (ciphertext, nonce) = SettingCipher::new(&[0u8; 32])
            .unwrap()
            .encrypt("secret")
            .unwrap();

        let other = SettingCipher::new(&[1u8; 32]).unwrap();
        assert!(other.decrypt(&ciphertext, &nonce).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = SettingCipher::new(&[0u8; 32]).unwrap();
        let (mut ciphertext, nonce) = cipher.encrypt("secret").unwrap();
        ciphertext.push('X');

        assert!(cipher.decrypt(&ciphertext, &nonce).is_err());
    }
}
