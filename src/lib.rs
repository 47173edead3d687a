//! `coldstore` is a self-describing binary serialization format and
//! reference codec: a tagged, size-classed wire encoding for scalars,
//! strings, collections, and user-defined records, with optional stream
//! framing (header, compression, authenticated encryption).
//!
//! The typed entry points, [`freeze`]/[`thaw`], drive [`ser`]/[`de`]'s
//! `serde::Serializer`/`Deserializer` bridge directly over `T`, writing
//! the tagged encoding without first allocating a [`Value`] tree. `Value`
//! itself stays available for dynamic/introspective use — the fallback
//! chain's native-serializable path, [`inspect`], and anything that needs
//! to inspect or construct a value at runtime rather than through a typed
//! `Serialize`/`Deserialize` impl.
#![allow(dead_code)]

pub mod codec;
pub mod config;
pub mod de;
pub mod depth;
pub mod error;
pub mod fallback;
pub mod framing;
pub mod primitive;
pub mod reader;
pub mod registry;
pub mod ser;
pub mod tag;
pub mod value;
pub mod writer;

use std::io::Write;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use crate::error::{Error, Result};
pub use crate::fallback::FallbackPolicy;
pub use crate::framing::{Compression, Encryption, Inspection, Options};
pub use crate::registry::Registry;
pub use crate::value::Value;

/// Serialize `value` to a framed byte stream: `encode -> compress? ->
/// encrypt? -> header-prefix`, per `opts`.
pub fn freeze<T: Serialize>(value: &T, opts: &Options) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(64);
    ser::to_writer(&mut body, value)?;
    framing::frame(body, opts)
}

/// Invert [`freeze`]: undo the header/compression/encryption framing, then
/// deserialize `T` from the resulting body.
pub fn thaw<T: DeserializeOwned>(bytes: &[u8], opts: &Options) -> Result<T> {
    let body = framing::unframe(bytes, opts)?;
    de::from_slice(&body)
}

/// Low-level variant of [`freeze`] with no header, compression, or
/// encryption: just the tagged encoding, written straight to `sink`.
pub fn freeze_to_sink<T: Serialize, W: Write>(sink: &mut W, value: &T) -> Result<()> {
    let mut body = Vec::with_capacity(64);
    ser::to_writer(&mut body, value)?;
    sink.write_all(&body).map_err(Error::Io)
}

/// Low-level variant of [`thaw`] with no framing to undo: deserializes `T`
/// directly from an unframed tagged encoding.
pub fn thaw_from_source<T: DeserializeOwned>(source: &[u8]) -> Result<T> {
    de::from_slice(source)
}

/// Dynamic counterpart to [`freeze`]: writes an already-constructed
/// [`Value`] through the registry named by `opts`, rather than a typed
/// `Serialize` impl. This is the entry point custom-type registration
/// actually reaches, since the typed [`ser`] bridge has no slot for a
/// registry override.
pub fn freeze_value(value: &Value, opts: &Options) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(64);
    writer::freeze_value(&mut body, value, opts.registry(), 0)?;
    framing::frame(body, opts)
}

/// Dynamic counterpart to [`thaw`]: reads a [`Value`] through the registry
/// named by `opts`.
pub fn thaw_value(bytes: &[u8], opts: &Options) -> Result<Value> {
    let body = framing::unframe(bytes, opts)?;
    let mut src = &body[..];
    reader::thaw_value(&mut src, opts.registry(), 0)
}

/// Register an encoder for a custom type on the process-wide default
/// registry. See [`Registry::extend_freeze`].
pub fn extend_freeze<F>(type_name: impl Into<String>, id: registry::CustomId, encode: F) -> Result<()>
where
    F: Fn(&Value, &mut Vec<u8>) -> Result<()> + Send + Sync + 'static,
{
    registry::registry().extend_freeze(type_name, id, encode)
}

/// Register a decoder for a custom type on the process-wide default
/// registry. See [`Registry::extend_thaw`].
pub fn extend_thaw<F>(id: registry::CustomId, decode: F) -> Result<()>
where
    F: Fn(&mut &[u8]) -> Result<Value> + Send + Sync + 'static,
{
    registry::registry().extend_thaw(id, decode)
}

/// Install the process-wide fallback policy consulted when no concrete
/// `Value` dispatch applies. See [`config::set_freeze_fallback`].
pub fn set_freeze_fallback(policy: FallbackPolicy) {
    config::set_freeze_fallback(policy)
}

/// Install a process-wide hook choosing a compressor by inspecting the raw
/// (pre-compression) body. See [`config::set_auto_compressor`].
pub fn set_auto_compressor(f: impl Fn(&[u8]) -> framing::CompressorId + Send + Sync + 'static) {
    config::set_auto_compressor(f)
}

/// Inspect a byte stream without fully decoding it: whether a recognized
/// header is present, what it names, the payload's offset/length within
/// `bytes`, and whether it thaws as a [`Value`] at all.
pub fn inspect(bytes: &[u8], opts: &Options) -> Inspection {
    let header_present = bytes.len() >= 4 && bytes[0..3] == framing::MAGIC;
    let meta_byte = header_present.then(|| bytes[3]);
    let (compressor, encryptor) = meta_byte
        .and_then(framing::from_meta_byte)
        .map(|(c, e)| (Some(c), Some(e)))
        .unwrap_or((None, None));
    let payload_offset = if header_present { 4 } else { 0 };
    let payload_len = bytes.len().saturating_sub(payload_offset);
    let thaws_as_value = thaw_value(bytes, opts).is_ok();

    Inspection {
        header_present,
        meta_byte,
        compressor,
        encryptor,
        payload_offset,
        payload_len,
        thaws_as_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn freeze_thaw_round_trips_a_struct() {
        let p = Point { x: 3, y: -7 };
        let bytes = freeze(&p, &Options::default()).unwrap();
        let back: Point = thaw(&bytes, &Options::default()).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn unframed_round_trip() {
        let mut sink = Vec::new();
        freeze_to_sink(&mut sink, &42i64).unwrap();
        let n: i64 = thaw_from_source(&sink).unwrap();
        assert_eq!(n, 42);
    }

    #[test]
    fn inspect_reports_no_header_when_suppressed() {
        let opts = Options { no_header: true, ..Options::default() };
        let bytes = freeze(&42i64, &opts).unwrap();
        let report = inspect(&bytes, &opts);
        assert!(!report.header_present);
    }

    #[test]
    fn inspect_reports_header_metadata() {
        let bytes = freeze(&"hello".to_string(), &Options::default()).unwrap();
        let report = inspect(&bytes, &Options::default());
        assert!(report.header_present);
        assert!(report.thaws_as_value);
    }
}
