use crate::error::{Error, Result};
use crate::framing::{Compressor, CompressorId};

pub(crate) struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn id(&self) -> CompressorId {
        CompressorId::Lz4
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(lz4_flex::block::compress_prepend_size(raw))
    }

    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>> {
        lz4_flex::block::decompress_size_prepended(body)
            .map_err(|e| Error::CodecFailed(format!("lz4 decompress failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let c = Lz4Compressor;
        let raw = vec![0u8; 10_000];
        let compressed = c.compress(&raw).unwrap();
        assert!(compressed.len() < raw.len());
        assert_eq!(c.decompress(&compressed).unwrap(), raw);
    }
}
