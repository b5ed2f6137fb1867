//! services/api/src/adapters/crypto.rs
//!
//! The field cipher: ChaCha20-Poly1305 with a per-field random nonce,
//! serialized as `hex(nonce):hex(ciphertext)`. Implements the `FieldCipher`
//! port. The same key is shared with the analysis worker, which encrypts the
//! text fields before sending them to the webhook.

use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use journal_core::ports::FieldCipher;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, error};

/// Nonce length for ChaCha20-Poly1305 (12 bytes).
const NONCE_LEN: usize = 12;

pub struct ChaChaFieldCipher {
    cipher: ChaCha20Poly1305,
}

impl ChaChaFieldCipher {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }
}

impl FieldCipher for ChaChaFieldCipher {
    fn encrypt(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        match self.cipher.encrypt(nonce, plaintext.as_bytes()) {
            Ok(ciphertext) => format!("{}:{}", hex::encode(nonce_bytes), hex::encode(ciphertext)),
            Err(e) => {
                error!("field encryption failed: {e}");
                String::new()
            }
        }
    }

    /// Tolerant decryption: any malformed input yields an empty string so a
    /// single bad field never aborts a whole response.
    fn decrypt(&self, ciphertext: &str) -> String {
        if ciphertext.is_empty() {
            return String::new();
        }

        let Some((nonce_hex, body_hex)) = ciphertext.split_once(':') else {
            debug!("field ciphertext missing nonce separator");
            return String::new();
        };
        let (Ok(nonce_bytes), Ok(body)) = (hex::decode(nonce_hex), hex::decode(body_hex)) else {
            debug!("field ciphertext is not valid hex");
            return String::new();
        };
        if nonce_bytes.len() != NONCE_LEN {
            debug!("field ciphertext has a bad nonce length");
            return String::new();
        }

        match self.cipher.decrypt(Nonce::from_slice(&nonce_bytes), body.as_ref()) {
            Ok(plaintext) => String::from_utf8(plaintext).unwrap_or_else(|_| {
                debug!("decrypted field is not valid UTF-8");
                String::new()
            }),
            Err(_) => {
                debug!("field ciphertext failed authentication");
                String::new()
            }
        }
    }
}
