//! Stream framing: the optional 4-byte header plus the
//! `encode -> compress? -> encrypt? -> header-prefix` pipeline and its
//! inverse.
//!
//! The header table (`meta_byte_for`/`from_meta_byte`) is a closed,
//! permanent 14-entry mapping — new entries are never inserted into gaps,
//! only appended, mirroring the append-only discipline `crate::tag` applies
//! to its own byte table.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::registry::Registry;

/// Which compressor a header byte (or an explicit `Options`) names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressorId {
    None,
    Snappy,
    Lz4,
    Lzma2,
    /// A non-standard compressor. The source format maps any compressor
    /// outside the standard four to this id; see the open question in
    /// `DESIGN.md` about the resulting read-side ambiguity.
    Custom,
}

/// Which encryptor a header byte (or an explicit `Options`) names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptorId {
    None,
    Aes128Sha512,
    Custom,
}

const HEADER_TABLE: [(u8, CompressorId, EncryptorId); 14] = [
    (0, CompressorId::None, EncryptorId::None),
    (1, CompressorId::Snappy, EncryptorId::None),
    (2, CompressorId::None, EncryptorId::Aes128Sha512),
    (3, CompressorId::Snappy, EncryptorId::Aes128Sha512),
    (4, CompressorId::None, EncryptorId::Custom),
    (5, CompressorId::Custom, EncryptorId::None),
    (6, CompressorId::Custom, EncryptorId::Custom),
    (7, CompressorId::Snappy, EncryptorId::Custom),
    (8, CompressorId::Lz4, EncryptorId::None),
    (9, CompressorId::Lz4, EncryptorId::Aes128Sha512),
    (10, CompressorId::Lz4, EncryptorId::Custom),
    (11, CompressorId::Lzma2, EncryptorId::None),
    (12, CompressorId::Lzma2, EncryptorId::Aes128Sha512),
    (13, CompressorId::Lzma2, EncryptorId::Custom),
];

/// The leading three bytes of every framed stream.
pub const MAGIC: [u8; 3] = *b"NPY";

fn meta_byte_for(compressor: CompressorId, encryptor: EncryptorId) -> u8 {
    HEADER_TABLE
        .iter()
        .find(|(_, c, e)| *c == compressor && *e == encryptor)
        .map(|(b, ..)| *b)
        .unwrap_or_else(|| {
            unreachable!("every (compressor, encryptor) pair the pipeline can produce has a header entry")
        })
}

pub(crate) fn from_meta_byte(b: u8) -> Option<(CompressorId, EncryptorId)> {
    HEADER_TABLE
        .iter()
        .find(|(byte, ..)| *byte == b)
        .map(|(_, c, e)| (*c, *e))
}

/// A pluggable compression algorithm: an opaque, stably-identified
/// byte-array-to-byte-array transform.
pub trait Compressor: Send + Sync {
    fn id(&self) -> CompressorId;
    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, body: &[u8]) -> Result<Vec<u8>>;
}

/// A pluggable authenticated, password-keyed encryption algorithm.
pub trait Encryptor: Send + Sync {
    fn id(&self) -> EncryptorId;
    fn encrypt(&self, password: &[u8], body: &[u8]) -> Result<Vec<u8>>;
    fn decrypt(&self, password: &[u8], body: &[u8]) -> Result<Vec<u8>>;
}

/// How `Options` picks a compressor for `freeze`.
#[derive(Clone)]
pub enum Compression {
    /// `header-disabled` -> LZ4; else the installed `auto_compressor` hook;
    /// else LZ4 when the raw body exceeds 8192 bytes; else none.
    Auto,
    None,
    Instance(Arc<dyn Compressor>),
    /// Invoked with the raw (pre-compression) bytes to pick a compressor —
    /// useful for "compress only if large" policies scoped to one call.
    Callable(Arc<dyn Fn(&[u8]) -> Arc<dyn Compressor> + Send + Sync>),
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Auto
    }
}

/// How `Options` picks an encryptor for `freeze`.
#[derive(Clone)]
pub enum Encryption {
    /// The standard AES-128 + SHA-512 encryptor, used only when a password
    /// is supplied; otherwise no encryption.
    Auto,
    None,
    Instance(Arc<dyn Encryptor>),
}

impl Default for Encryption {
    fn default() -> Self {
        Encryption::Auto
    }
}

/// Per-call configuration for `freeze`/`thaw`.
#[derive(Clone, Default)]
pub struct Options {
    pub compressor: Compression,
    pub encryptor: Encryption,
    pub password: Option<Vec<u8>>,
    /// On `thaw`, if no header is found (or `no_header` is set), retry a
    /// legacy Snappy-then-raw decode on failure.
    pub v1_compatibility: bool,
    /// Suppress the 4-byte header entirely; caller manages
    /// compressor/encryptor identity out of band.
    pub no_header: bool,
    /// Use this registry instead of the process default for custom-type
    /// dispatch.
    pub registry: Option<Arc<Registry>>,
}

impl Options {
    pub(crate) fn registry(&self) -> &Registry {
        self.registry.as_deref().unwrap_or_else(crate::registry::registry)
    }
}

const AUTO_COMPRESS_THRESHOLD: usize = 8192;

fn resolve_compressor(opts: &Options, raw: &[u8]) -> Result<Option<Arc<dyn Compressor>>> {
    match &opts.compressor {
        Compression::None => Ok(None),
        Compression::Instance(c) => Ok(Some(c.clone())),
        Compression::Callable(f) => Ok(Some(f(raw))),
        Compression::Auto => {
            if opts.no_header {
                return Ok(Some(crate::codec::standard(CompressorId::Lz4)?));
            }
            if let Some(hook) = crate::config::auto_compressor() {
                let id = hook(raw);
                return Ok(if id == CompressorId::None {
                    None
                } else {
                    Some(crate::codec::standard(id)?)
                });
            }
            if raw.len() > AUTO_COMPRESS_THRESHOLD {
                Ok(Some(crate::codec::standard(CompressorId::Lz4)?))
            } else {
                Ok(None)
            }
        }
    }
}

fn resolve_encryptor(opts: &Options) -> Result<Option<Arc<dyn Encryptor>>> {
    match &opts.encryptor {
        Encryption::None => Ok(None),
        Encryption::Instance(e) => Ok(Some(e.clone())),
        Encryption::Auto => {
            if opts.password.is_some() {
                Ok(Some(crate::codec::standard_encryptor()))
            } else {
                Ok(None)
            }
        }
    }
}

/// Run the full `encode -> compress? -> encrypt? -> header-prefix` pipeline
/// over an already-serialized body.
pub(crate) fn frame(mut body: Vec<u8>, opts: &Options) -> Result<Vec<u8>> {
    let compressor = resolve_compressor(opts, &body)?;
    if let Some(c) = &compressor {
        body = c.compress(&body)?;
    }

    let encryptor = resolve_encryptor(opts)?;
    if let Some(e) = &encryptor {
        let password = opts.password.as_deref().unwrap_or(&[]);
        body = e.encrypt(password, &body)?;
    }

    if opts.no_header {
        return Ok(body);
    }

    let compressor_id = compressor.as_ref().map(|c| c.id()).unwrap_or(CompressorId::None);
    let encryptor_id = encryptor.as_ref().map(|e| e.id()).unwrap_or(EncryptorId::None);
    let meta = meta_byte_for(compressor_id, encryptor_id);

    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&MAGIC);
    out.push(meta);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Invert [`frame`], returning the deserializable body.
pub(crate) fn unframe(bytes: &[u8], opts: &Options) -> Result<Vec<u8>> {
    if opts.no_header {
        return unframe_headerless(bytes, opts);
    }

    let has_header = bytes.len() >= 4 && bytes[0..3] == MAGIC;
    if !has_header {
        return unframe_headerless(bytes, opts);
    }

    let meta = bytes[3];
    let (compressor_id, encryptor_id) = from_meta_byte(meta)
        .ok_or(Error::UnrecognizedHeader { meta_byte: meta })?;
    let mut body = bytes[4..].to_vec();

    if encryptor_id != EncryptorId::None {
        let password = opts
            .password
            .as_deref()
            .ok_or(Error::PasswordRequired)?;
        let encryptor = resolve_named_encryptor(encryptor_id, opts)?;
        body = encryptor
            .decrypt(password, &body)
            .map_err(|e| e.at_tag(meta))?;
    }

    if compressor_id != CompressorId::None {
        let compressor = resolve_named_compressor(compressor_id, opts)?;
        body = compressor.decompress(&body).map_err(|e| e.at_tag(meta))?;
    }

    Ok(body)
}

fn unframe_headerless(bytes: &[u8], opts: &Options) -> Result<Vec<u8>> {
    let compressor = resolve_compressor_for_read(opts)?;
    let encryptor = resolve_encryptor_for_read(opts)?;

    let decode_once = |body: &[u8]| -> Result<Vec<u8>> {
        let mut buf = body.to_vec();
        if let Some(e) = &encryptor {
            let password = opts.password.as_deref().ok_or(Error::PasswordRequired)?;
            buf = e.decrypt(password, &buf)?;
        }
        if let Some(c) = &compressor {
            buf = c.decompress(&buf)?;
        }
        Ok(buf)
    };

    match decode_once(bytes) {
        Ok(v) => Ok(v),
        Err(e) if opts.v1_compatibility => {
            let snappy = crate::codec::standard(CompressorId::Snappy)?;
            snappy.decompress(bytes).or(Err(e))
        }
        Err(e) => Err(e),
    }
}

fn resolve_compressor_for_read(opts: &Options) -> Result<Option<Arc<dyn Compressor>>> {
    match &opts.compressor {
        Compression::None | Compression::Auto => Ok(None),
        Compression::Instance(c) => Ok(Some(c.clone())),
        Compression::Callable(_) => Ok(None),
    }
}

fn resolve_encryptor_for_read(opts: &Options) -> Result<Option<Arc<dyn Encryptor>>> {
    match &opts.encryptor {
        Encryption::None => Ok(None),
        Encryption::Instance(e) => Ok(Some(e.clone())),
        Encryption::Auto => {
            if opts.password.is_some() {
                Ok(Some(crate::codec::standard_encryptor()))
            } else {
                Ok(None)
            }
        }
    }
}

fn resolve_named_compressor(id: CompressorId, opts: &Options) -> Result<Arc<dyn Compressor>> {
    if id == CompressorId::Custom {
        if let Compression::Instance(c) = &opts.compressor {
            return Ok(c.clone());
        }
        return Err(Error::CodecFailed(
            "header names a custom compressor; caller must supply Options::compressor explicitly"
                .into(),
        ));
    }
    crate::codec::standard(id)
}

fn resolve_named_encryptor(id: EncryptorId, opts: &Options) -> Result<Arc<dyn Encryptor>> {
    if id == EncryptorId::Custom {
        if let Encryption::Instance(e) = &opts.encryptor {
            return Ok(e.clone());
        }
        return Err(Error::CodecFailed(
            "header names a custom encryptor; caller must supply Options::encryptor explicitly"
                .into(),
        ));
    }
    Ok(crate::codec::standard_encryptor())
}

/// Diagnostic report produced by [`crate::inspect`].
#[derive(Debug)]
pub struct Inspection {
    pub header_present: bool,
    pub meta_byte: Option<u8>,
    pub compressor: Option<CompressorId>,
    pub encryptor: Option<EncryptorId>,
    pub payload_offset: usize,
    pub payload_len: usize,
    pub thaws_as_value: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_table_round_trips() {
        for (byte, c, e) in HEADER_TABLE {
            assert_eq!(from_meta_byte(byte), Some((c, e)));
            assert_eq!(meta_byte_for(c, e), byte);
        }
    }

    #[test]
    fn unknown_meta_byte_is_unrecognized() {
        assert_eq!(from_meta_byte(200), None);
    }
}
