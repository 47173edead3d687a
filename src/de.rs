//! The `serde::Deserializer` bridge: reads wire bytes straight into a
//! `T: DeserializeOwned` without first materializing a `Value`. Mirrors the
//! teacher's `FogDeserializer`: `deserialize_any` does the real work of
//! reading one tagged value and driving the matching `Visitor` method;
//! every other `deserialize_*` forwards to it via
//! `forward_to_deserialize_any!`, since this format is fully
//! self-describing and a visitor already knows which shape it expects.
//!
//! Unit-variant-as-keyword and the one-entry-map encoding for the other
//! three enum shapes mirror `crate::ser`'s write side exactly.

use byteorder::{BigEndian, ReadBytesExt};
use serde::de::{self, Deserialize, DeserializeSeed, IgnoredAny, IntoDeserializer, Visitor};

use crate::depth::descend;
use crate::error::{Error, Result};
use crate::primitive::{self, families};
use crate::registry::Registry;
use crate::tag::Tag;

/// Deserialize `T` directly from wire bytes, with no framing.
pub fn from_slice<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T> {
    let mut de = Deserializer {
        src: bytes,
        registry: crate::registry::registry(),
        depth: 0,
    };
    let value = T::deserialize(&mut de)?;
    Ok(value)
}

struct Deserializer<'de> {
    src: &'de [u8],
    registry: &'de Registry,
    depth: u32,
}

impl<'de> Deserializer<'de> {
    fn peek_tag(&self) -> Result<u8> {
        self.src.first().copied().ok_or(Error::LengthTooShort {
            step: "peek_tag",
            actual: 0,
            expected: 1,
        })
    }

    fn read_tag(&mut self) -> Result<u8> {
        self.src.read_u8().map_err(Error::from)
    }

    fn descend(&mut self) -> Result<()> {
        self.depth = descend(self.depth)?;
        Ok(())
    }

    fn read_bigint(&mut self) -> Result<num_bigint::BigInt> {
        let len = self.src.read_i32::<BigEndian>()? as usize;
        let bytes = primitive::read_exact(&mut self.src, len, "bigint")?;
        Ok(num_bigint::BigInt::from_signed_bytes_be(bytes))
    }
}

impl<'de, 'a> serde::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let tag_byte = self.read_tag()?;
        if tag_byte >= crate::tag::CUSTOM_BYTE_ID_BAND_START {
            // Custom-band values carry an application-defined shape that a
            // generic Visitor has no way to receive; callers who need them
            // go through `crate::reader::thaw_value` and the `Value` model
            // instead of the typed serde bridge.
            return Err(Error::CustomTypeFailed(
                "custom types are not deserializable through the typed bridge; use thaw_value".into(),
            )
            .at_tag(tag_byte));
        }
        let tag = Tag::from_u8(tag_byte).ok_or(Error::UnknownTag).map_err(|e| e.at_tag(tag_byte))?;
        self.visit_tag(tag, tag_byte, visitor).map_err(|e| e.at_tag(tag_byte))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.peek_tag()? == Tag::Nil.to_u8() {
            self.read_tag()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let tag_byte = self.peek_tag()?;
        if tag_byte == Tag::KwSm.to_u8() || tag_byte == Tag::KwMd.to_u8() {
            // Unit variant: a bare keyword naming it.
            self.read_tag()?;
            let class = if tag_byte == Tag::KwSm.to_u8() {
                primitive::SizeClass::Sm
            } else {
                primitive::SizeClass::Md
            };
            let len = primitive::read_len(&mut self.src, class, "enum/unit")?;
            let bytes = primitive::read_exact(&mut self.src, len, "enum/unit")?;
            let name = std::str::from_utf8(bytes)?.to_owned();
            visitor.visit_enum(name.into_deserializer())
        } else {
            // Newtype/tuple/struct variant: a one-entry map.
            self.read_tag()?;
            let class = family_class(tag_byte, &families::MAP)?;
            let len = primitive::read_len(&mut self.src, class, "enum/map")?;
            if len != 1 {
                return Err(Error::SerdeFail(format!(
                    "expected a one-entry map for an enum variant, found {len} entries"
                )));
            }
            self.descend()?;
            visitor.visit_enum(VariantAccess { de: self })
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

fn family_class(tag_byte: u8, tags: &crate::primitive::SizeClassTags) -> Result<primitive::SizeClass> {
    let tag = Tag::from_u8(tag_byte).ok_or(Error::UnknownTag)?;
    map_class_of(tag).ok_or_else(|| Error::SerdeFail("expected a map-shaped value for an enum variant".into()))
}

/// Like [`primitive::class_of`] for the map family, but reports a decode
/// error instead of panicking when `tag` isn't actually one of its four
/// tags — reachable from corrupt or adversarial input, unlike the writer
/// side's internal uses of `class_of` where the tag is always known-good.
fn map_class_of(tag: Tag) -> Option<primitive::SizeClass> {
    if tag == families::MAP.empty {
        Some(primitive::SizeClass::Empty)
    } else if tag == families::MAP.sm {
        Some(primitive::SizeClass::Sm)
    } else if tag == families::MAP.md {
        Some(primitive::SizeClass::Md)
    } else if tag == families::MAP.lg {
        Some(primitive::SizeClass::Lg)
    } else {
        None
    }
}

impl<'de> Deserializer<'de> {
    fn visit_tag<V: Visitor<'de>>(&mut self, tag: Tag, tag_byte: u8, visitor: V) -> Result<V::Value> {
        use crate::tag::DeprecatedTag;
        match tag {
            Tag::Nil => visitor.visit_unit(),
            Tag::True => visitor.visit_bool(true),
            Tag::False => visitor.visit_bool(false),
            Tag::Char => visitor.visit_u32(self.src.read_u16::<BigEndian>()? as u32),

            Tag::LongZero | Tag::LongSm | Tag::LongMd | Tag::LongLg | Tag::LongXl => {
                visitor.visit_i64(primitive::read_long(&mut self.src, tag)?)
            }

            Tag::Float => visitor.visit_f32(self.src.read_f32::<BigEndian>()?),
            Tag::Double => visitor.visit_f64(self.src.read_f64::<BigEndian>()?),

            Tag::BigInt => visitor.visit_string(self.read_bigint()?.to_string()),
            Tag::BigDecimal => {
                let unscaled = self.read_bigint()?;
                let scale = self.src.read_i32::<BigEndian>()?;
                visitor.visit_string(format!("{unscaled}e{scale}"))
            }
            Tag::Ratio => {
                let numer = self.read_bigint()?;
                let denom = self.read_bigint()?;
                visitor.visit_string(format!("{numer}/{denom}"))
            }

            Tag::Str0 | Tag::StrSm | Tag::StrMd | Tag::StrLg => {
                let class = primitive::class_of(tag, &families::STR);
                let len = primitive::read_len(&mut self.src, class, "string")?;
                let bytes = primitive::read_exact(&mut self.src, len, "string")?;
                visitor.visit_borrowed_str(std::str::from_utf8(bytes)?)
            }

            Tag::KwSm | Tag::KwMd | Tag::SymSm | Tag::SymMd => {
                let sm = matches!(tag, Tag::KwSm | Tag::SymSm);
                let class = if sm { primitive::SizeClass::Sm } else { primitive::SizeClass::Md };
                let len = primitive::read_len(&mut self.src, class, "name")?;
                let bytes = primitive::read_exact(&mut self.src, len, "name")?;
                visitor.visit_borrowed_str(std::str::from_utf8(bytes)?)
            }

            Tag::Regex => {
                let len = self.src.read_i32::<BigEndian>()? as usize;
                let bytes = primitive::read_exact(&mut self.src, len, "regex")?;
                visitor.visit_borrowed_str(std::str::from_utf8(bytes)?)
            }

            Tag::Bytes0 | Tag::BytesSm | Tag::BytesMd | Tag::BytesLg => {
                let class = primitive::class_of(tag, &families::BYTES);
                let len = primitive::read_len(&mut self.src, class, "bytes")?;
                let bytes = primitive::read_exact(&mut self.src, len, "bytes")?;
                visitor.visit_borrowed_bytes(bytes)
            }

            Tag::Vec2 => self.visit_seq_of(2, visitor),
            Tag::Vec3 => self.visit_seq_of(3, visitor),
            Tag::Vec0 | Tag::VecSm | Tag::VecMd | Tag::VecLg => {
                let len = primitive::read_len(&mut self.src, primitive::class_of(tag, &families::VEC), "vec")?;
                self.visit_seq_of(len, visitor)
            }
            Tag::List0 | Tag::ListSm | Tag::ListMd | Tag::ListLg => {
                let len = primitive::read_len(&mut self.src, primitive::class_of(tag, &families::LIST), "list")?;
                self.visit_seq_of(len, visitor)
            }
            Tag::Seq0 | Tag::SeqSm | Tag::SeqMd | Tag::SeqLg => {
                let len = primitive::read_len(&mut self.src, primitive::class_of(tag, &families::SEQ), "seq")?;
                self.visit_seq_of(len, visitor)
            }
            Tag::Set0 | Tag::SetSm | Tag::SetMd | Tag::SetLg => {
                let len = primitive::read_len(&mut self.src, primitive::class_of(tag, &families::SET), "set")?;
                self.visit_seq_of(len, visitor)
            }
            Tag::SortedSet0 | Tag::SortedSetSm | Tag::SortedSetMd | Tag::SortedSetLg => {
                let len = primitive::read_len(&mut self.src, primitive::class_of(tag, &families::SORTED_SET), "sorted-set")?;
                self.visit_seq_of(len, visitor)
            }
            Tag::Queue0 | Tag::QueueSm | Tag::QueueMd | Tag::QueueLg => {
                let len = primitive::read_len(&mut self.src, primitive::class_of(tag, &families::QUEUE), "queue")?;
                self.visit_seq_of(len, visitor)
            }

            Tag::Map0 | Tag::MapSm | Tag::MapMd | Tag::MapLg => {
                let len = primitive::read_len(&mut self.src, primitive::class_of(tag, &families::MAP), "map")?;
                self.visit_map_of(len, visitor)
            }
            Tag::SortedMap0 | Tag::SortedMapSm | Tag::SortedMapMd | Tag::SortedMapLg => {
                let len = primitive::read_len(&mut self.src, primitive::class_of(tag, &families::SORTED_MAP), "sorted-map")?;
                self.visit_map_of(len, visitor)
            }

            Tag::Date => visitor.visit_i64(self.src.read_i64::<BigEndian>()?),
            Tag::Uuid => {
                let hi = self.src.read_u64::<BigEndian>()?;
                let lo = self.src.read_u64::<BigEndian>()?;
                visitor.visit_string(uuid::Uuid::from_u64_pair(hi, lo).to_string())
            }

            Tag::RecordSm | Tag::RecordMd => {
                self.descend()?;
                let sm = matches!(tag, Tag::RecordSm);
                let class = if sm { primitive::SizeClass::Sm } else { primitive::SizeClass::Md };
                let len = primitive::read_len(&mut self.src, class, "record-name")?;
                let _name = primitive::read_exact(&mut self.src, len, "record-name")?;
                let next = self.read_tag()?;
                let next_tag = Tag::from_u8(next).ok_or(Error::UnknownTag)?;
                let body_class = map_class_of(next_tag).ok_or_else(|| {
                    Error::SerdeFail("record body was not a map".into())
                })?;
                let body_len = primitive::read_len(&mut self.src, body_class, "record-body")?;
                self.visit_map_of(body_len, visitor)
            }

            Tag::Meta => {
                self.descend()?;
                // Skip the metadata value entirely; serde callers have no
                // slot to receive it.
                self.skip_value()?;
                let tag_byte = self.read_tag()?;
                let tag = Tag::from_u8(tag_byte).ok_or(Error::UnknownTag)?;
                self.visit_tag(tag, tag_byte, visitor)
            }

            Tag::Unfreezable | Tag::ReadableFallback => {
                let len = self.src.read_i32::<BigEndian>()? as usize;
                let bytes = primitive::read_exact(&mut self.src, len, "readable")?;
                visitor.visit_borrowed_str(std::str::from_utf8(bytes)?)
            }

            Tag::SerializableFallback => {
                self.descend()?;
                let len = self.src.read_i32::<BigEndian>()? as usize;
                let bytes = primitive::read_exact(&mut self.src, len, "serializable")?;
                let mut inner = Deserializer { src: bytes, registry: self.registry, depth: self.depth };
                let tag_byte = inner.read_tag()?;
                let tag = Tag::from_u8(tag_byte).ok_or(Error::UnknownTag)?;
                inner.visit_tag(tag, tag_byte, visitor)
            }

            Tag::PrefixedCustom => Err(Error::CustomTypeFailed(
                "custom types are not deserializable through the typed bridge; use thaw_value".into(),
            ))
            .map_err(|e: Error| e.at_tag(tag_byte)),

            Tag::Deprecated(DeprecatedTag::BoolOld) => visitor.visit_bool(self.src.read_u8()? != 0),
            Tag::Deprecated(DeprecatedTag::Utf8Old) => {
                let len = self.src.read_u32::<BigEndian>()? as usize;
                let bytes = primitive::read_exact(&mut self.src, len, "deprecated-utf8")?;
                visitor.visit_borrowed_str(std::str::from_utf8(bytes)?)
            }
            Tag::Deprecated(DeprecatedTag::MapDepr2) => {
                let doubled = self.src.read_u32::<BigEndian>()? as usize;
                self.visit_map_of(doubled / 2, visitor)
            }
            Tag::Deprecated(DeprecatedTag::VecDepr2) => {
                let doubled = self.src.read_u32::<BigEndian>()? as usize;
                self.visit_seq_of(doubled / 2, visitor)
            }
        }
    }

    fn visit_seq_of<V: Visitor<'de>>(&mut self, len: usize, visitor: V) -> Result<V::Value> {
        self.descend()?;
        visitor.visit_seq(Seq { de: self, remaining: len })
    }

    fn visit_map_of<V: Visitor<'de>>(&mut self, len: usize, visitor: V) -> Result<V::Value> {
        self.descend()?;
        visitor.visit_map(Map { de: self, remaining: len })
    }

    /// Consume and discard one value's bytes, used to skip metadata.
    fn skip_value(&mut self) -> Result<()> {
        serde::Deserializer::deserialize_any(&mut *self, IgnoredAny)?;
        Ok(())
    }
}

struct Seq<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
}

impl<'de, 'a> de::SeqAccess<'de> for Seq<'a, 'de> {
    type Error = Error;
    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }
    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

struct Map<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
}

impl<'de, 'a> de::MapAccess<'de> for Map<'a, 'de> {
    type Error = Error;
    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        self.remaining -= 1;
        seed.deserialize(&mut *self.de)
    }
    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

struct VariantAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'de, 'a> de::EnumAccess<'de> for VariantAccess<'a, 'de> {
    type Error = Error;
    type Variant = Self;
    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self)> {
        let tag_byte = self.de.peek_tag()?;
        let name_owned;
        let name: &str = if tag_byte == Tag::KwSm.to_u8() || tag_byte == Tag::KwMd.to_u8() {
            self.de.read_tag()?;
            let class = if tag_byte == Tag::KwSm.to_u8() {
                primitive::SizeClass::Sm
            } else {
                primitive::SizeClass::Md
            };
            let len = primitive::read_len(&mut self.de.src, class, "enum/key")?;
            let bytes = primitive::read_exact(&mut self.de.src, len, "enum/key")?;
            name_owned = std::str::from_utf8(bytes)?.to_owned();
            &name_owned
        } else {
            return Err(Error::SerdeFail("expected a keyword variant name".into()));
        };
        let value = seed.deserialize(name.to_owned().into_deserializer())?;
        Ok((value, self))
    }
}

impl<'de, 'a> de::VariantAccess<'de> for VariantAccess<'a, 'de> {
    type Error = Error;
    fn unit_variant(self) -> Result<()> {
        serde::Deserializer::deserialize_any(self.de, IgnoredAny).map(|_| ())
    }
    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self.de)
    }
    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        serde::Deserializer::deserialize_tuple(self.de, len, visitor)
    }
    fn struct_variant<V: Visitor<'de>>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value> {
        serde::Deserializer::deserialize_struct(self.de, "", fields, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::freeze_value;
    use crate::value::Value;

    #[test]
    fn round_trips_primitives() {
        let mut out = Vec::new();
        freeze_value(&mut out, &Value::Int(7), crate::registry::registry(), 0).unwrap();
        let n: i64 = from_slice(&out).unwrap();
        assert_eq!(n, 7);
    }

    #[test]
    fn round_trips_vec() {
        let mut out = Vec::new();
        freeze_value(
            &mut out,
            &Value::Vector(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            crate::registry::registry(),
            0,
        )
        .unwrap();
        let v: Vec<i64> = from_slice(&out).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn round_trips_string() {
        let mut out = Vec::new();
        freeze_value(&mut out, &Value::String("hi".into()), crate::registry::registry(), 0).unwrap();
        let s: String = from_slice(&out).unwrap();
        assert_eq!(s, "hi");
    }
}
