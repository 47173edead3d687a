//! The polymorphic reader: `thaw_value` decodes a [`Value`] tree.
//!
//! Mirrors `crate::writer` tag for tag. A tag byte in the reserved custom
//! band (`0x80..=0xFF`, see [`crate::tag::CUSTOM_BYTE_ID_BAND_START`])
//! dispatches straight to the registry rather than through [`Tag::from_u8`];
//! everything else goes through the dense tag match, the inverse of
//! `freeze_value`'s dispatch. Deprecated tags decode using their documented
//! historical layout and are never reachable from `freeze_value`.
//!
//! A record or fallback payload that fails to re-materialize doesn't
//! propagate as a hard error — it comes back as [`Value::Unthawable`] so
//! the caller doesn't lose the rest of whatever document it was embedded
//! in.

use byteorder::{BigEndian, ReadBytesExt};
use num_bigint::BigInt;
use uuid::Uuid;

use crate::depth::descend;
use crate::error::{Error, Result};
use crate::primitive::{self, families, SizeClass, SizeClassTags};
use crate::registry::{CustomId, Registry};
use crate::tag::{DeprecatedTag, Tag, CUSTOM_BYTE_ID_BAND_START};
use crate::value::{BigDecimal, Name, Ratio, Value};

/// Decode one value from the front of `src`, advancing it past whatever was
/// consumed. `depth` is the caller's current nesting depth.
pub fn thaw_value(src: &mut &[u8], registry: &Registry, depth: u32) -> Result<Value> {
    let tag_byte = src.read_u8()?;

    if tag_byte >= CUSTOM_BYTE_ID_BAND_START {
        let id = CustomId::Byte((256 - tag_byte as u16) as u8);
        return dispatch_custom(src, registry, id, depth).map_err(|e| e.at_tag(tag_byte));
    }

    let tag = Tag::from_u8(tag_byte).ok_or(Error::UnknownTag).map_err(|e| e.at_tag(tag_byte))?;
    thaw_tagged(src, registry, tag, tag_byte, depth).map_err(|e| e.at_tag(tag_byte))
}

fn thaw_tagged(
    src: &mut &[u8],
    registry: &Registry,
    tag: Tag,
    tag_byte: u8,
    depth: u32,
) -> Result<Value> {
    Ok(match tag {
        Tag::Nil => Value::Nil,
        Tag::True => Value::Bool(true),
        Tag::False => Value::Bool(false),
        Tag::Char => Value::Char(src.read_u16::<BigEndian>()?),

        Tag::LongZero | Tag::LongSm | Tag::LongMd | Tag::LongLg | Tag::LongXl => {
            Value::Int(primitive::read_long(src, tag)?)
        }

        Tag::Float => Value::Float(src.read_f32::<BigEndian>()?),
        Tag::Double => Value::Double(src.read_f64::<BigEndian>()?),

        Tag::BigInt => Value::BigInt(read_bigint(src)?),
        Tag::BigDecimal => {
            let unscaled = read_bigint(src)?;
            let scale = src.read_i32::<BigEndian>()?;
            Value::BigDecimal(BigDecimal { unscaled, scale })
        }
        Tag::Ratio => {
            let numer = read_bigint(src)?;
            let denom = read_bigint(src)?;
            Value::Ratio(Ratio { numer, denom })
        }

        Tag::KwSm | Tag::KwMd => Value::Keyword(read_name(src, tag, Tag::KwSm)?),
        Tag::SymSm | Tag::SymMd => Value::Symbol(read_name(src, tag, Tag::SymSm)?),

        Tag::Regex => {
            let bytes = read_lg_bytes(src)?;
            Value::Regex(String::from_utf8(bytes).map_err(|e| e.utf8_error())?)
        }

        Tag::Bytes0 | Tag::BytesSm | Tag::BytesMd | Tag::BytesLg => {
            Value::Bytes(read_family_bytes(src, tag, &families::BYTES, "bytes")?.to_vec())
        }

        Tag::Vec2 => Value::Vector(read_n(src, registry, 2, depth)?),
        Tag::Vec3 => Value::Vector(read_n(src, registry, 3, depth)?),
        Tag::Vec0 | Tag::VecSm | Tag::VecMd | Tag::VecLg => {
            let len = read_family_len(src, tag, &families::VEC, "vector")?;
            Value::Vector(read_n(src, registry, len, depth)?)
        }

        Tag::List0 | Tag::ListSm | Tag::ListMd | Tag::ListLg => {
            let len = read_family_len(src, tag, &families::LIST, "list")?;
            Value::List(read_n(src, registry, len, depth)?)
        }
        Tag::Seq0 | Tag::SeqSm | Tag::SeqMd | Tag::SeqLg => {
            let len = read_family_len(src, tag, &families::SEQ, "seq")?;
            Value::Seq(read_n(src, registry, len, depth)?)
        }
        Tag::Set0 | Tag::SetSm | Tag::SetMd | Tag::SetLg => {
            let len = read_family_len(src, tag, &families::SET, "set")?;
            Value::Set(read_n(src, registry, len, depth)?)
        }
        Tag::SortedSet0 | Tag::SortedSetSm | Tag::SortedSetMd | Tag::SortedSetLg => {
            let len = read_family_len(src, tag, &families::SORTED_SET, "sorted-set")?;
            Value::SortedSet(read_n(src, registry, len, depth)?)
        }
        Tag::Queue0 | Tag::QueueSm | Tag::QueueMd | Tag::QueueLg => {
            let len = read_family_len(src, tag, &families::QUEUE, "queue")?;
            Value::Queue(read_n(src, registry, len, depth)?)
        }

        Tag::Map0 | Tag::MapSm | Tag::MapMd | Tag::MapLg => {
            let len = read_family_len(src, tag, &families::MAP, "map")?;
            Value::Map(read_pairs(src, registry, len, depth)?)
        }
        Tag::SortedMap0 | Tag::SortedMapSm | Tag::SortedMapMd | Tag::SortedMapLg => {
            let len = read_family_len(src, tag, &families::SORTED_MAP, "sorted-map")?;
            Value::SortedMap(read_pairs(src, registry, len, depth)?)
        }

        Tag::Date => Value::Date(src.read_i64::<BigEndian>()?),
        Tag::Uuid => {
            let hi = src.read_u64::<BigEndian>()?;
            let lo = src.read_u64::<BigEndian>()?;
            Value::Uuid(Uuid::from_u64_pair(hi, lo))
        }

        Tag::RecordSm | Tag::RecordMd => {
            let depth = descend(depth)?;
            let name = read_name_str(src, tag, Tag::RecordSm)?;
            let fields = match thaw_value(src, registry, depth) {
                Ok(Value::Map(fields)) => fields,
                Ok(other) => {
                    return Ok(Value::Unthawable {
                        tag: tag_byte,
                        kind: "record",
                        cause: format!("record body decoded as {other:?}, not a map"),
                        class_name: Some(name),
                        raw_content: Vec::new(),
                    })
                }
                Err(e) => {
                    return Ok(Value::Unthawable {
                        tag: tag_byte,
                        kind: "record",
                        cause: e.to_string(),
                        class_name: Some(name),
                        raw_content: Vec::new(),
                    })
                }
            };
            Value::Record { name, fields }
        }

        Tag::Meta => {
            let depth = descend(depth)?;
            let metadata = thaw_value(src, registry, depth)?;
            let value = thaw_value(src, registry, depth)?;
            Value::Meta {
                metadata: Box::new(metadata),
                value: Box::new(value),
            }
        }

        // Never emitted by freeze_value; treated as a stringified marker on
        // read, the same shape as ReadableFallback.
        Tag::Unfreezable => Value::Readable(read_lg_string(src)?),

        Tag::ReadableFallback => Value::Readable(read_lg_string(src)?),

        Tag::SerializableFallback => {
            let depth = descend(depth)?;
            let bytes = read_lg_bytes(src)?;
            let mut inner_src: &[u8] = &bytes;
            match thaw_value(&mut inner_src, registry, depth) {
                Ok(inner) => Value::Serializable(Box::new(inner)),
                Err(e) => Value::Unthawable {
                    tag: tag_byte,
                    kind: "serializable",
                    cause: e.to_string(),
                    class_name: None,
                    raw_content: bytes,
                },
            }
        }

        Tag::Str0 | Tag::StrSm | Tag::StrMd | Tag::StrLg => {
            let bytes = read_family_bytes(src, tag, &families::STR, "string")?;
            Value::String(std::str::from_utf8(bytes)?.to_owned())
        }

        Tag::PrefixedCustom => {
            let hash = src.read_i16::<BigEndian>()?;
            dispatch_custom(src, registry, CustomId::Hash(hash), depth)?
        }

        Tag::Deprecated(DeprecatedTag::BoolOld) => Value::Bool(src.read_u8()? != 0),
        Tag::Deprecated(DeprecatedTag::Utf8Old) => {
            let len = src.read_u32::<BigEndian>()? as usize;
            let bytes = primitive::read_exact(src, len, "deprecated-utf8")?;
            Value::String(std::str::from_utf8(bytes)?.to_owned())
        }
        Tag::Deprecated(DeprecatedTag::MapDepr2) => {
            let doubled = src.read_u32::<BigEndian>()? as usize;
            Value::Map(read_pairs(src, registry, doubled / 2, depth)?)
        }
        Tag::Deprecated(DeprecatedTag::VecDepr2) => {
            let doubled = src.read_u32::<BigEndian>()? as usize;
            Value::Vector(read_n(src, registry, doubled / 2, depth)?)
        }
    })
}

fn dispatch_custom(src: &mut &[u8], registry: &Registry, id: CustomId, depth: u32) -> Result<Value> {
    let _ = descend(depth)?;
    let reader = registry
        .reader_for(id)
        .ok_or_else(|| Error::CustomTypeFailed(format!("no reader registered for {id:?}")))?;
    let inner = reader(src)?;
    Ok(Value::Custom {
        id,
        value: Box::new(inner),
    })
}

fn read_n(src: &mut &[u8], registry: &Registry, len: usize, depth: u32) -> Result<Vec<Value>> {
    let depth = descend(depth)?;
    let mut items = Vec::with_capacity(len.min(1 << 16));
    if len > 10 {
        items.reserve(len.saturating_sub(items.capacity()).min(1 << 20));
    }
    for _ in 0..len {
        items.push(thaw_value(src, registry, depth)?);
    }
    Ok(items)
}

fn read_pairs(
    src: &mut &[u8],
    registry: &Registry,
    len: usize,
    depth: u32,
) -> Result<Vec<(Value, Value)>> {
    let depth = descend(depth)?;
    let mut pairs = Vec::with_capacity(len.min(1 << 16));
    for _ in 0..len {
        let k = thaw_value(src, registry, depth)?;
        let v = thaw_value(src, registry, depth)?;
        pairs.push((k, v));
    }
    Ok(pairs)
}

fn read_family_len(
    src: &mut &[u8],
    tag: Tag,
    tags: &SizeClassTags,
    step: &'static str,
) -> Result<usize> {
    let class = primitive::class_of(tag, tags);
    primitive::read_len(src, class, step)
}

fn read_family_bytes<'a>(
    src: &mut &'a [u8],
    tag: Tag,
    tags: &SizeClassTags,
    step: &'static str,
) -> Result<&'a [u8]> {
    let class = primitive::class_of(tag, tags);
    let len = primitive::read_len(src, class, step)?;
    primitive::read_exact(src, len, step)
}

fn read_bigint(src: &mut &[u8]) -> Result<BigInt> {
    let bytes = read_lg_bytes(src)?;
    Ok(BigInt::from_signed_bytes_be(&bytes))
}

fn read_lg_bytes(src: &mut &[u8]) -> Result<Vec<u8>> {
    let len = src.read_i32::<BigEndian>()? as usize;
    Ok(primitive::read_exact(src, len, "read_lg_bytes")?.to_vec())
}

fn read_lg_string(src: &mut &[u8]) -> Result<String> {
    let bytes = read_lg_bytes(src)?;
    Ok(String::from_utf8(bytes).map_err(|e| e.utf8_error())?)
}

/// Read a keyword/symbol name written by `write_name`: a `_sm`/`_md`
/// length-prefixed UTF-8 string, split on the last `/` into an optional
/// namespace and a name.
fn read_name(src: &mut &[u8], tag: Tag, sm: Tag) -> Result<Name> {
    let rendered = read_name_str(src, tag, sm)?;
    Ok(match rendered.rsplit_once('/') {
        Some((ns, name)) => Name::namespaced(ns, name),
        None => Name::new(rendered),
    })
}

fn read_name_str(src: &mut &[u8], tag: Tag, sm: Tag) -> Result<String> {
    let class = if tag == sm { SizeClass::Sm } else { SizeClass::Md };
    let len = primitive::read_len(src, class, "name")?;
    let bytes = primitive::read_exact(src, len, "name")?;
    Ok(std::str::from_utf8(bytes)?.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::freeze_value;

    fn roundtrip(v: &Value) -> Value {
        let registry = Registry::new();
        let mut buf = Vec::new();
        freeze_value(&mut buf, v, &registry, 0).unwrap();
        let mut src = buf.as_slice();
        thaw_value(&mut src, &registry, 0).unwrap()
    }

    #[test]
    fn scalars_roundtrip() {
        assert_eq!(roundtrip(&Value::Nil), Value::Nil);
        assert_eq!(roundtrip(&Value::Bool(true)), Value::Bool(true));
        assert_eq!(roundtrip(&Value::Int(-129)), Value::Int(-129));
        assert_eq!(roundtrip(&Value::Double(3.25)), Value::Double(3.25));
        assert_eq!(
            roundtrip(&Value::String("hello".into())),
            Value::String("hello".into())
        );
    }

    #[test]
    fn vector_sizes_roundtrip() {
        for len in [0usize, 1, 2, 3, 4, 127, 128, 200] {
            let items: Vec<Value> = (0..len as i64).map(Value::Int).collect();
            assert_eq!(roundtrip(&Value::Vector(items.clone())), Value::Vector(items));
        }
    }

    #[test]
    fn map_roundtrips() {
        let pairs = vec![
            (Value::Keyword(Name::new("a")), Value::Int(1)),
            (Value::Keyword(Name::new("b")), Value::Int(2)),
        ];
        assert_eq!(roundtrip(&Value::Map(pairs.clone())), Value::Map(pairs));
    }

    #[test]
    fn unknown_tag_fails() {
        let bytes = [68u8]; // not assigned in the tag table
        let mut src = &bytes[..];
        let err = thaw_value(&mut src, &Registry::new(), 0).unwrap_err();
        assert!(matches!(err, Error::ThawFailed { tag: Some(68), .. }));
    }
}
