use snap::raw::{Decoder, Encoder};

use crate::error::{Error, Result};
use crate::framing::{Compressor, CompressorId};

pub(crate) struct SnappyCompressor;

impl Compressor for SnappyCompressor {
    fn id(&self) -> CompressorId {
        CompressorId::Snappy
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Encoder::new()
            .compress_vec(raw)
            .map_err(|e| Error::CodecFailed(format!("snappy compress failed: {e}")))
    }

    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>> {
        Decoder::new()
            .decompress_vec(body)
            .map_err(|e| Error::CodecFailed(format!("snappy decompress failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let c = SnappyCompressor;
        let raw = b"hello hello hello hello".to_vec();
        let compressed = c.compress(&raw).unwrap();
        assert_eq!(c.decompress(&compressed).unwrap(), raw);
    }
}
