//! Passphrase-based AES-256-GCM encryption
//!
//! A 256-bit key is derived from the passphrase with Argon2id and a random
//! salt; each encryption uses a fresh random nonce. Salt, nonce and
//! ciphertext travel together base64-encoded.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// Size of the Argon2 salt in bytes
const SALT_SIZE: usize = 16;

/// Current envelope version
const VERSION: u8 = 1;

/// Minimum accepted passphrase length
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Encrypted payload with everything needed to decrypt it except the passphrase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SealedData {
    pub version: u8,
    /// Argon2 salt (base64)
    pub salt: String,
    /// AES-GCM nonce (base64)
    pub nonce: String,
    /// Ciphertext with authentication tag (base64)
    pub ciphertext: String,
}

/// Fill a buffer of `len` bytes from the OS random number generator
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<[u8; 32]> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;
    Ok(key)
}

fn check_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(Error::InvalidData(format!(
            "passphrase must be at least {} characters",
            MIN_PASSPHRASE_LEN
        )));
    }
    Ok(())
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| Error::Encryption(format!("Invalid {} encoding: {}", field, e)))
}

/// Encrypt `plaintext` under a key derived from `passphrase`
pub fn seal(plaintext: &[u8], passphrase: &str) -> Result<SealedData> {
    check_passphrase(passphrase)?;

    let salt = random_bytes(SALT_SIZE);
    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| Error::Encryption(format!("Failed to create cipher: {}", e)))?;

    let nonce_bytes = random_bytes(NONCE_SIZE);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| Error::Encryption(format!("Encryption failed: {}", e)))?;

    Ok(SealedData {
        version: VERSION,
        salt: STANDARD.encode(&salt),
        nonce: STANDARD.encode(&nonce_bytes),
        ciphertext: STANDARD.encode(&ciphertext),
    })
}

/// Decrypt data produced by [`seal`]
pub fn open(sealed: &SealedData, passphrase: &str) -> Result<Vec<u8>> {
    if sealed.version != VERSION {
        return Err(Error::Encryption(format!(
            "Unsupported encryption version: {}",
            sealed.version
        )));
    }

    let salt = decode("salt", &sealed.salt)?;
    let nonce_bytes = decode("nonce", &sealed.nonce)?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(Error::Encryption(format!(
            "Invalid nonce size: expected {}, got {}",
            NONCE_SIZE,
            nonce_bytes.len()
        )));
    }
    let ciphertext = decode("ciphertext", &sealed.ciphertext)?;

    let key = derive_key(passphrase, &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| Error::Encryption(format!("Failed to create cipher: {}", e)))?;

    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| {
            Error::Encryption("Decryption failed: invalid passphrase or corrupted data".to_string())
        })
}
