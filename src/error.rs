//! Library error types.
use std::fmt;

use serde::{de, ser};

/// A coldstore Result, normally returning a coldstore [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A coldstore error. Encompasses any issue that can happen while freezing a
/// value, thawing a buffer, or configuring the codec.
#[derive(Debug)]
pub enum Error {
    /// No encoder was found for a value, and the configured fallback policy
    /// declined to produce a marker in its place.
    Unfreezable {
        /// Best-effort name of the offending value's type.
        type_name: String,
    },
    /// A low-level decode failure. Carries the tag byte being decoded, if
    /// one had been read yet, and the chained cause.
    ThawFailed {
        tag: Option<u8>,
        cause: Box<Error>,
    },
    /// A stream header was present but its metadata byte doesn't name a
    /// known `(compressor, encryptor)` pair.
    UnrecognizedHeader { meta_byte: u8 },
    /// The header names an encryptor but no password was supplied.
    PasswordRequired,
    /// Ran out of input before a length-prefixed field's declared length.
    LengthTooShort {
        /// What step of the decoding we were on when it failed.
        step: &'static str,
        /// The actual remaining length.
        actual: usize,
        /// The length we needed.
        expected: usize,
    },
    /// A length-prefixed field's length doesn't fit the size class that
    /// encoded it. Only reachable from a hand-crafted or corrupt buffer.
    BadSizeClass { step: &'static str, len: usize },
    /// Recursion went deeper than the configured limit.
    DepthLimitExceeded,
    /// A string field contained invalid UTF-8.
    InvalidUtf8,
    /// Occurs when serde serialization or deserialization fails.
    SerdeFail(String),
    /// The textual (JSON) fallback failed to encode or decode.
    Textual(serde_json::Error),
    /// A registered custom type's writer or reader reported a failure.
    CustomTypeFailed(String),
    /// A custom-type byte id fell in the reserved band (`1..=128`).
    ReservedByteId(u8),
    /// The configured compressor or encryptor failed.
    CodecFailed(String),
    /// The reader encountered a tag byte with no registered meaning.
    UnknownTag,
    /// A write to a caller-supplied sink failed (`freeze_to_sink`). Never
    /// produced by the in-memory `freeze`/`thaw` path, which only ever
    /// reads/writes a `Vec<u8>`.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Unfreezable { type_name } => write!(f, "no encoder for type `{type_name}`"),
            Error::ThawFailed { tag, cause } => match tag {
                Some(tag) => write!(f, "failed to thaw tag 0x{tag:02x}: {cause}"),
                None => write!(f, "failed to thaw: {cause}"),
            },
            Error::UnrecognizedHeader { meta_byte } => write!(
                f,
                "header meta byte {meta_byte} does not name a known compressor/encryptor pair"
            ),
            Error::PasswordRequired => {
                write!(f, "header names an encryptor but no password was supplied")
            }
            Error::LengthTooShort {
                step,
                actual,
                expected,
            } => write!(
                f,
                "expected data length {}, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::BadSizeClass { step, len } => {
                write!(f, "length {len} does not fit the size class on step [{step}]")
            }
            Error::DepthLimitExceeded => write!(f, "nesting depth limit exceeded"),
            Error::InvalidUtf8 => write!(f, "invalid UTF-8 in string field"),
            Error::SerdeFail(msg) => f.write_str(msg),
            Error::Textual(e) => write!(f, "textual fallback failure: {e}"),
            Error::CustomTypeFailed(msg) => write!(f, "custom type failure: {msg}"),
            Error::ReservedByteId(id) => {
                write!(f, "byte id {id} falls in the reserved 1..=128 band")
            }
            Error::CodecFailed(msg) => write!(f, "compression/encryption failure: {msg}"),
            Error::UnknownTag => write!(f, "unrecognized tag byte"),
            Error::Io(e) => write!(f, "sink I/O failure: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ThawFailed { cause, .. } => Some(cause),
            Error::Textual(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl Error {
    /// Wrap this error as the cause of a [`Error::ThawFailed`] at the given
    /// tag byte, so the breadcrumb trail grows outward as the error
    /// propagates up through nested containers.
    pub fn at_tag(self, tag: u8) -> Error {
        Error::ThawFailed {
            tag: Some(tag),
            cause: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Textual(e)
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

impl From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Self {
        Error::LengthTooShort {
            step: "read",
            actual: 0,
            expected: 1,
        }
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::SerdeFail(msg.to_string())
    }
}
