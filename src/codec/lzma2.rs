//! LZMA2 via `xz2`. Unlike `lz4`/`snap`'s one-shot buffer APIs, `xz2::stream`
//! exposes a genuinely expensive-to-create filter chain, so each call's
//! working buffer is pulled from a thread-local scratch `Vec<u8>` rather
//! than reallocated — the same shape as the teacher's `ZSTD_CCTX`/`ZSTD_DCTX`
//! thread-locals in `compress.rs`, just holding a scratch buffer instead of
//! the codec object itself, since a `xz2::stream::Stream` can't be resumed
//! across unrelated calls the way a zstd context can.

use std::cell::RefCell;

use xz2::stream::{Action, Status, Stream};

use crate::error::{Error, Result};
use crate::framing::{Compressor, CompressorId};

const PRESET: u32 = 6;
const MEMLIMIT: u64 = 256 * 1024 * 1024;

thread_local! {
    static SCRATCH: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(8192));
}

pub(crate) struct Lzma2Compressor;

impl Compressor for Lzma2Compressor {
    fn id(&self) -> CompressorId {
        CompressorId::Lzma2
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let mut stream = Stream::new_easy_encoder(PRESET, xz2::stream::Check::None)
            .map_err(|e| Error::CodecFailed(format!("lzma2 encoder init failed: {e}")))?;
        SCRATCH.with(|scratch| {
            let mut out = scratch.borrow_mut();
            out.clear();
            run_to_completion(&mut stream, raw, &mut out, Action::Finish)?;
            Ok(out.clone())
        })
    }

    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>> {
        let mut stream = Stream::new_stream_decoder(MEMLIMIT, 0)
            .map_err(|e| Error::CodecFailed(format!("lzma2 decoder init failed: {e}")))?;
        SCRATCH.with(|scratch| {
            let mut out = scratch.borrow_mut();
            out.clear();
            run_to_completion(&mut stream, body, &mut out, Action::Finish)?;
            Ok(out.clone())
        })
    }
}

fn run_to_completion(
    stream: &mut Stream,
    input: &[u8],
    out: &mut Vec<u8>,
    action: Action,
) -> Result<()> {
    loop {
        let before_in = stream.total_in();
        let before_out = out.len();
        let status = stream
            .process_vec(&input[(before_in as usize).min(input.len())..], out, action)
            .map_err(|e| Error::CodecFailed(format!("lzma2 processing failed: {e}")))?;
        let made_progress = out.len() > before_out || stream.total_in() > before_in;
        match status {
            Status::StreamEnd => return Ok(()),
            Status::Ok | Status::MemNeeded if made_progress => continue,
            _ => {
                return Err(Error::CodecFailed(
                    "lzma2 stream ended without reaching StreamEnd".into(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let c = Lzma2Compressor;
        let raw = vec![7u8; 5000];
        let compressed = c.compress(&raw).unwrap();
        assert_eq!(c.decompress(&compressed).unwrap(), raw);
    }
}
