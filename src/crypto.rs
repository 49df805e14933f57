//! Sealed-box encryption for remote secret values.
//!
//! Values are sealed for the repository's X25519 public key using the
//! anonymous "sealed box" construction (ephemeral X25519 keypair, XSalsa20-Poly1305),
//! byte-compatible with libsodium's `crypto_box_seal`. The ephemeral public key
//! is prepended to the ciphertext so only the recipient can open it.
//!
//! Sealing is one-way from this process: only the remote store holds the private key.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use crypto_box::PublicKey;
use rand::rngs::OsRng;
use thiserror::Error;

/// Recipient public key length in bytes (X25519).
pub const RECIPIENT_KEY_LENGTH: usize = 32;

/// Bytes a sealed box adds on top of the plaintext (ephemeral key + MAC tag).
pub const SEAL_OVERHEAD: usize = RECIPIENT_KEY_LENGTH + 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid recipient key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("Refusing to seal an empty value")]
    EmptyInput,

    #[error("Sealing failed")]
    Seal,
}

/// Decode raw recipient key bytes into a public key.
fn recipient_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    let key: [u8; RECIPIENT_KEY_LENGTH] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidKeyEncoding(format!(
            "expected {} bytes, got {}",
            RECIPIENT_KEY_LENGTH,
            bytes.len()
        ))
    })?;
    Ok(PublicKey::from(key))
}

/// Seal `plaintext` for the holder of the private key matching `recipient_public_key`.
///
/// Output is `ephemeral_pk || ciphertext`. Two calls with the same inputs
/// produce different bytes.
pub fn seal(plaintext: &[u8], recipient_public_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let recipient = recipient_key(recipient_public_key)?;
    if plaintext.is_empty() {
        return Err(CryptoError::EmptyInput);
    }

    recipient
        .seal(&mut OsRng, plaintext)
        .map_err(|_| CryptoError::Seal)
}

/// Seal a string value for a base64-encoded recipient key, returning base64 ciphertext.
///
/// This is the wire form the remote store expects for `encrypted_value`.
pub fn seal_base64(value: &str, recipient_key_b64: &str) -> Result<String, CryptoError> {
    let key_bytes = BASE64
        .decode(recipient_key_b64.trim())
        .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;
    let sealed = seal(value.as_bytes(), &key_bytes)?;
    Ok(BASE64.encode(sealed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_box::SecretKey;

    fn test_keypair() -> (SecretKey, Vec<u8>) {
        let secret = SecretKey::generate(&mut OsRng);
        let public = secret.public_key().as_bytes().to_vec();
        (secret, public)
    }

    #[test]
    fn test_seal_opens_with_recipient_key() {
        let (secret, public) = test_keypair();

        let sealed = seal(b"s3cr3t", &public).unwrap();
        assert_eq!(sealed.len(), b"s3cr3t".len() + SEAL_OVERHEAD);

        let opened = secret.unseal(&sealed).unwrap();
        assert_eq!(opened, b"s3cr3t");
    }

    #[test]
    fn test_seal_is_non_deterministic() {
        let (secret, public) = test_keypair();

        let first = seal(b"same-data", &public).unwrap();
        let second = seal(b"same-data", &public).unwrap();
        assert_ne!(first, second);

        assert_eq!(secret.unseal(&first).unwrap(), b"same-data");
        assert_eq!(secret.unseal(&second).unwrap(), b"same-data");
    }

    #[test]
    fn test_wrong_recipient_cannot_open() {
        let (_, public) = test_keypair();
        let (other_secret, _) = test_keypair();

        let sealed = seal(b"for-someone-else", &public).unwrap();
        assert!(other_secret.unseal(&sealed).is_err());
    }

    #[test]
    fn test_rejects_wrong_key_length() {
        let result = seal(b"value", &[7u8; 31]);
        assert!(matches!(result, Err(CryptoError::InvalidKeyEncoding(_))));

        let result = seal(b"value", &[7u8; 33]);
        assert!(matches!(result, Err(CryptoError::InvalidKeyEncoding(_))));
    }

    #[test]
    fn test_rejects_empty_plaintext() {
        let (_, public) = test_keypair();
        assert!(matches!(seal(b"", &public), Err(CryptoError::EmptyInput)));
    }

    #[test]
    fn test_seal_base64_roundtrip() {
        let (secret, public) = test_keypair();
        let key_b64 = BASE64.encode(&public);

        let sealed_b64 = seal_base64("hunter2", &key_b64).unwrap();
        let sealed = BASE64.decode(sealed_b64).unwrap();
        assert_eq!(secret.unseal(&sealed).unwrap(), b"hunter2");
    }

    #[test]
    fn test_seal_base64_rejects_bad_encoding() {
        let result = seal_base64("value", "not base64!!");
        assert!(matches!(result, Err(CryptoError::InvalidKeyEncoding(_))));

        let short = BASE64.encode([1u8; 16]);
        let result = seal_base64("value", &short);
        assert!(matches!(result, Err(CryptoError::InvalidKeyEncoding(_))));
    }
}
