// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Symmetric encryption for OAuth refresh tokens at rest.
//!
//! Uses AES-256-GCM with a random nonce per encryption. The stored form is
//! base64(nonce || ciphertext || tag). The key is loaded once at startup
//! from configuration.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

/// Token encryption service.
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; 32],
}

impl SecretCipher {
    /// Create a cipher from a 32-byte AES-256 key.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    fn sealing_key(&self) -> Result<LessSafeKey, AppError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.key)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid AES key length")))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypt a plaintext token.
    /// Returns base64-encoded nonce-prefixed ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        if plaintext.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Cannot encrypt empty data"
            )));
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate nonce")))?;

        let key = self.sealing_key()?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Encryption failed")))?;

        let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&in_out);

        Ok(BASE64.encode(out))
    }

    /// Decrypt a stored token.
    ///
    /// Fails with `AppError::Decryption` on malformed input, a wrong key, or
    /// a tampered ciphertext.
    pub fn decrypt(&self, ciphertext_b64: &str) -> Result<String, AppError> {
        let data = BASE64
            .decode(ciphertext_b64)
            .map_err(|_| AppError::Decryption)?;

        if data.len() <= NONCE_LEN {
            return Err(AppError::Decryption);
        }

        let (nonce_bytes, sealed) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AppError::Decryption)?;

        let key = self.sealing_key()?;
        let mut in_out = sealed.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| AppError::Decryption)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| AppError::Decryption)
    }
}
