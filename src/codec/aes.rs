//! The standard `aes128-sha512` encryptor: AES-128-GCM keyed by a password
//! run through PBKDF2-HMAC-SHA512. Wire layout is `[salt:16][nonce:12]
//! [ciphertext+tag]`; a fresh random salt and nonce are drawn per call, so
//! encrypting the same plaintext under the same password twice produces
//! different bytes both times.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes128Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;

use crate::error::{Error, Result};
use crate::framing::{Encryptor, EncryptorId};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const PBKDF2_ROUNDS: u32 = 210_000;

pub(crate) struct Aes128Sha512Encryptor;

fn derive_key(password: &[u8], salt: &[u8]) -> [u8; 16] {
    let mut key = [0u8; 16];
    pbkdf2_hmac::<Sha512>(password, salt, PBKDF2_ROUNDS, &mut key);
    key
}

impl Encryptor for Aes128Sha512Encryptor {
    fn id(&self) -> EncryptorId {
        EncryptorId::Aes128Sha512
    }

    fn encrypt(&self, password: &[u8], body: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LEN];
        aes_gcm::aead::rand_core::RngCore::fill_bytes(&mut OsRng, &mut salt);
        let key = derive_key(password, &salt);
        let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&key));
        let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, body)
            .map_err(|e| Error::CodecFailed(format!("aes-gcm encrypt failed: {e}")))?;

        let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, password: &[u8], body: &[u8]) -> Result<Vec<u8>> {
        if body.len() < SALT_LEN + NONCE_LEN {
            return Err(Error::CodecFailed("encrypted body too short".into()));
        }
        let (salt, rest) = body.split_at(SALT_LEN);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

        let key = derive_key(password, salt);
        let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&key));
        let nonce = Nonce::from_slice(nonce_bytes);
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::CodecFailed("authentication failed (wrong password or corrupt data)".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_correct_password() {
        let enc = Aes128Sha512Encryptor;
        let body = b"top secret".to_vec();
        let ciphertext = enc.encrypt(b"correct horse", &body).unwrap();
        assert_eq!(enc.decrypt(b"correct horse", &ciphertext).unwrap(), body);
    }

    #[test]
    fn wrong_password_fails() {
        let enc = Aes128Sha512Encryptor;
        let ciphertext = enc.encrypt(b"correct horse", b"top secret").unwrap();
        assert!(enc.decrypt(b"battery staple", &ciphertext).is_err());
    }
}
