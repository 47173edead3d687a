//! Concrete [`crate::framing::Compressor`]/[`crate::framing::Encryptor`]
//! implementations satisfying the header table's standard ids, each behind
//! its own Cargo feature so a consumer only pulls in the algorithms it
//! needs — the same shape as the teacher's own `zstd` dependency sitting
//! behind `compress.rs`'s narrow trait seam, just with more than one
//! concrete algorithm on the other side of it.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::framing::{Compressor, CompressorId, Encryptor};

#[cfg(feature = "lz4")]
mod lz4;
#[cfg(feature = "snappy")]
mod snappy;
#[cfg(feature = "lzma2")]
mod lzma2;
#[cfg(feature = "crypto")]
mod aes;

mod none;

/// The built-in `Compressor` for a standard (non-custom) header id.
pub(crate) fn standard(id: CompressorId) -> Result<Arc<dyn Compressor>> {
    match id {
        CompressorId::None => Ok(Arc::new(none::NoneCompressor)),
        #[cfg(feature = "lz4")]
        CompressorId::Lz4 => Ok(Arc::new(lz4::Lz4Compressor)),
        #[cfg(not(feature = "lz4"))]
        CompressorId::Lz4 => Err(unsupported("lz4")),
        #[cfg(feature = "snappy")]
        CompressorId::Snappy => Ok(Arc::new(snappy::SnappyCompressor)),
        #[cfg(not(feature = "snappy"))]
        CompressorId::Snappy => Err(unsupported("snappy")),
        #[cfg(feature = "lzma2")]
        CompressorId::Lzma2 => Ok(Arc::new(lzma2::Lzma2Compressor)),
        #[cfg(not(feature = "lzma2"))]
        CompressorId::Lzma2 => Err(unsupported("lzma2")),
        CompressorId::Custom => Err(Error::CodecFailed(
            "`custom` is not a standard compressor id".into(),
        )),
    }
}

/// The built-in `Encryptor` for the standard AES-128 + SHA-512 header id.
pub(crate) fn standard_encryptor() -> Arc<dyn Encryptor> {
    #[cfg(feature = "crypto")]
    {
        Arc::new(aes::Aes128Sha512Encryptor)
    }
    #[cfg(not(feature = "crypto"))]
    {
        Arc::new(none::UnavailableEncryptor)
    }
}

#[allow(dead_code)]
fn unsupported(name: &'static str) -> Error {
    Error::CodecFailed(format!(
        "`{name}` support was not compiled in (enable the `{name}` feature)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_compressor_is_identity() {
        let c = standard(CompressorId::None).unwrap();
        let raw = b"some bytes".to_vec();
        let compressed = c.compress(&raw).unwrap();
        assert_eq!(c.decompress(&compressed).unwrap(), raw);
    }
}
