//! The dynamic value model.
//!
//! [`Value`] is the one type every tag in [`crate::tag`] decodes into (or
//! encodes from) when going through the introspective path rather than the
//! `serde` bridge. Unlike the teacher's `Value`/`ValueRef` pair, there is no
//! borrowed twin here: nothing in this format is read zero-copy, so one
//! owned enum covers both directions.

use num_bigint::BigInt;
use uuid::Uuid;

use crate::registry::CustomId;

/// A keyword or symbol name: an optional namespace and a name, conventionally
/// rendered on the wire and in `Display` as `namespace/name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Name {
    pub namespace: Option<String>,
    pub name: String,
}

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Name {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Name {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// An unscaled arbitrary-precision integer plus a base-10 scale, i.e.
/// `unscaled * 10^-scale`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BigDecimal {
    pub unscaled: BigInt,
    pub scale: i32,
}

/// An arbitrary-precision ratio. Not reduced to lowest terms on construction;
/// the writer and reader carry whatever numerator/denominator were given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ratio {
    pub numer: BigInt,
    pub denom: BigInt,
}

/// The dynamic, self-describing value every tag maps to.
///
/// Integer size classes (`Byte`/`Short`/`Int`/`Long`) are not separate
/// variants here; [`crate::primitive`] picks the narrowest wire class for
/// whatever `i64` a `Value::Int` holds. Likewise `Vector`/`List`/`Seq`/`Set`/
/// `SortedSet`/`Queue` share the same in-memory shape (an ordered `Vec`) and
/// differ only in which tag they're written and read with — this format
/// carries no comparator over the wire, so a `SortedSet`/`SortedMap` is
/// simply read back in the order it was written.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    /// One UTF-16 code unit. May be half of a surrogate pair; this format
    /// does not guarantee its `Char` values are valid Unicode scalars on
    /// their own.
    Char(u16),
    Int(i64),
    Float(f32),
    Double(f64),
    BigInt(BigInt),
    BigDecimal(BigDecimal),
    Ratio(Ratio),
    String(String),
    Keyword(Name),
    Symbol(Name),
    /// A regular expression's pattern source. Two `Regex` values with the
    /// same source are not guaranteed comparable beyond their source text.
    Regex(String),
    Bytes(Vec<u8>),
    Vector(Vec<Value>),
    List(Vec<Value>),
    Seq(Vec<Value>),
    Set(Vec<Value>),
    SortedSet(Vec<Value>),
    Queue(Vec<Value>),
    Map(Vec<(Value, Value)>),
    SortedMap(Vec<(Value, Value)>),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    Uuid(Uuid),
    /// A named typed map: a fully-qualified type name plus its field map.
    Record { name: String, fields: Vec<(Value, Value)> },
    /// Any value carrying an associated metadata map. The wire form is a
    /// `META_TAG` prefix, not a wrapper container, but the in-memory model
    /// needs something to hold the association, so it gets a variant here.
    Meta { metadata: Box<Value>, value: Box<Value> },
    /// A user-registered custom type, decoded through its registered reader
    /// into whatever `Value` shape that reader produced.
    Custom { id: CustomId, value: Box<Value> },
    /// Host-native serializable fallback: an arbitrary `serde`-representable
    /// value that had no direct tag, reduced to a nested `Value`.
    Serializable(Box<Value>),
    /// Textual ("EDN-like") fallback: the last resort before `Unfreezable`.
    Readable(String),
    /// A record or fallback payload that failed to re-materialize on
    /// decode. Returned in place of a hard error so surrounding data in the
    /// same read isn't lost; see `thaw_value` in [`crate::reader`]. Carries
    /// the original tag byte and raw payload so `freeze_value` can write it
    /// straight back out unchanged if this value is round-tripped.
    Unthawable {
        tag: u8,
        kind: &'static str,
        cause: String,
        class_name: Option<String>,
        raw_content: Vec<u8>,
    },
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// The value with any associated metadata stripped, recursively
    /// unwrapping nested `Meta` layers.
    pub fn without_metadata(&self) -> &Value {
        let mut v = self;
        while let Value::Meta { value, .. } = v {
            v = value;
        }
        v
    }

    /// The metadata attached to this value, if any.
    pub fn metadata(&self) -> Option<&Value> {
        match self {
            Value::Meta { metadata, .. } => Some(metadata),
            _ => None,
        }
    }
}
