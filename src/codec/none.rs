use crate::error::{Error, Result};
use crate::framing::{Compressor, CompressorId, Encryptor, EncryptorId};

pub(crate) struct NoneCompressor;

impl Compressor for NoneCompressor {
    fn id(&self) -> CompressorId {
        CompressorId::None
    }
    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }
    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>> {
        Ok(body.to_vec())
    }
}

/// Stands in for the AES-128+SHA-512 encryptor when the `crypto` feature is
/// disabled, so `standard_encryptor()` still type-checks; any actual use
/// fails loudly rather than silently skipping encryption.
#[allow(dead_code)]
pub(crate) struct UnavailableEncryptor;

impl Encryptor for UnavailableEncryptor {
    fn id(&self) -> EncryptorId {
        EncryptorId::Aes128Sha512
    }
    fn encrypt(&self, _password: &[u8], _body: &[u8]) -> Result<Vec<u8>> {
        Err(Error::CodecFailed(
            "AES-128+SHA-512 support was not compiled in (enable the `crypto` feature)".into(),
        ))
    }
    fn decrypt(&self, _password: &[u8], _body: &[u8]) -> Result<Vec<u8>> {
        Err(Error::CodecFailed(
            "AES-128+SHA-512 support was not compiled in (enable the `crypto` feature)".into(),
        ))
    }
}
