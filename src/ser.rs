//! The `serde::Serializer` bridge: writes a `T: Serialize` straight to the
//! wire without first allocating a `Value` tree, the same division of
//! labor as the teacher's `FogSerializer` vs. `Value`/`ValueRef` — `Value`
//! stays reserved for dynamic/introspective use (registry payloads, the
//! fallback chain, round-trip tests).
//!
//! Enum variants follow the teacher's own convention: unit variants
//! serialize as their name (a `Keyword`); newtype/tuple/struct variants as
//! a one-entry map from variant name to the payload.

use byteorder::{BigEndian, WriteBytesExt};
use num_bigint::BigInt;
use serde::ser::{self, Serialize};

use crate::config;
use crate::depth::descend;
use crate::error::{Error, Result};
use crate::fallback::FallbackPolicy;
use crate::primitive::{self, families};
use crate::tag::Tag;
use crate::value::Name;

/// Serialize `value` directly to wire bytes, with no framing.
pub fn to_writer<T: Serialize + ?Sized>(out: &mut Vec<u8>, value: &T) -> Result<()> {
    value.serialize(Serializer { out, depth: 0 })
}

struct Serializer<'a> {
    out: &'a mut Vec<u8>,
    depth: u32,
}

fn write_i64(out: &mut Vec<u8>, n: i64) -> Result<()> {
    primitive::write_long(out, n)
}

fn write_u64(out: &mut Vec<u8>, n: u64) -> Result<()> {
    match i64::try_from(n) {
        Ok(n) => primitive::write_long(out, n),
        Err(_) => write_bigint_or_fallback(out, BigInt::from(n), "u64"),
    }
}

fn write_bigint(out: &mut Vec<u8>, n: &BigInt) -> Result<()> {
    out.push(Tag::BigInt.to_u8());
    primitive::write_bytes_lg(out, &n.to_signed_bytes_be())
}

/// `i128`/`u128` magnitudes outside `i64`'s range are the one case where
/// serde's data model has no single wire tag to dispatch to directly: they
/// *can* always be widened losslessly into `BigInt`, but whether that's what
/// actually happens is the process-wide [`config::freeze_fallback`] policy's
/// call, not a foregone conclusion. `Strict`, the default, takes the native
/// widening; other policies get routed through `FallbackPolicy::apply` and
/// whatever `Value` they produce instead.
fn write_bigint_or_fallback(out: &mut Vec<u8>, n: BigInt, type_name: &'static str) -> Result<()> {
    match &*config::freeze_fallback() {
        FallbackPolicy::Strict => write_bigint(out, &n),
        policy => {
            let textual = n.to_string();
            let value = policy.apply(type_name, Some(&textual))?;
            crate::writer::freeze_value(out, &value, crate::registry::registry(), 0)
        }
    }
}

impl<'a> ser::Serializer for Serializer<'a> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Collector<'a>;
    type SerializeTuple = Collector<'a>;
    type SerializeTupleStruct = Collector<'a>;
    type SerializeTupleVariant = Collector<'a>;
    type SerializeMap = PairCollector<'a>;
    type SerializeStruct = PairCollector<'a>;
    type SerializeStructVariant = PairCollector<'a>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.out.push(if v { Tag::True.to_u8() } else { Tag::False.to_u8() });
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> { write_i64(self.out, v as i64) }
    fn serialize_i16(self, v: i16) -> Result<()> { write_i64(self.out, v as i64) }
    fn serialize_i32(self, v: i32) -> Result<()> { write_i64(self.out, v as i64) }
    fn serialize_i64(self, v: i64) -> Result<()> { write_i64(self.out, v) }
    fn serialize_i128(self, v: i128) -> Result<()> { write_bigint_or_fallback(self.out, BigInt::from(v), "i128") }

    fn serialize_u8(self, v: u8) -> Result<()> { write_u64(self.out, v as u64) }
    fn serialize_u16(self, v: u16) -> Result<()> { write_u64(self.out, v as u64) }
    fn serialize_u32(self, v: u32) -> Result<()> { write_u64(self.out, v as u64) }
    fn serialize_u64(self, v: u64) -> Result<()> { write_u64(self.out, v) }
    fn serialize_u128(self, v: u128) -> Result<()> { write_bigint_or_fallback(self.out, BigInt::from(v), "u128") }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.out.push(Tag::Float.to_u8());
        self.out.write_f32::<BigEndian>(v).expect("Vec<u8> writes are infallible");
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        self.out.push(Tag::Double.to_u8());
        self.out.write_f64::<BigEndian>(v).expect("Vec<u8> writes are infallible");
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.out.push(Tag::Char.to_u8());
        self.out.write_u16::<BigEndian>(v as u16).expect("Vec<u8> writes are infallible");
        Ok(())
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        primitive::write_sized_tag(self.out, &families::STR, v.len())?;
        self.out.extend_from_slice(v.as_bytes());
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        primitive::write_sized_tag(self.out, &families::BYTES, v.len())?;
        self.out.extend_from_slice(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<()> {
        self.out.push(Tag::Nil.to_u8());
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.out.push(Tag::Nil.to_u8());
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(self, _name: &'static str, _idx: u32, variant: &'static str) -> Result<()> {
        write_keyword(self.out, variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(self, _name: &'static str, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _idx: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()> {
        let depth = descend(self.depth)?;
        primitive::write_sized_tag(self.out, &families::MAP, 1)?;
        write_keyword(self.out, variant)?;
        value.serialize(Serializer { out: self.out, depth })
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Collector<'a>> {
        Ok(Collector::new(self.out, self.depth, len))
    }

    fn serialize_tuple(self, len: usize) -> Result<Collector<'a>> {
        Ok(Collector::new(self.out, self.depth, Some(len)))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<Collector<'a>> {
        self.serialize_tuple(len)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _idx: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Collector<'a>> {
        let depth = descend(self.depth)?;
        primitive::write_sized_tag(self.out, &families::MAP, 1)?;
        write_keyword(self.out, variant)?;
        Ok(Collector::new(self.out, depth, Some(len)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<PairCollector<'a>> {
        Ok(PairCollector::new(self.out, self.depth, len))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<PairCollector<'a>> {
        Ok(PairCollector::new(self.out, self.depth, Some(len)))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _idx: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<PairCollector<'a>> {
        let depth = descend(self.depth)?;
        primitive::write_sized_tag(self.out, &families::MAP, 1)?;
        write_keyword(self.out, variant)?;
        Ok(PairCollector::new(self.out, depth, Some(len)))
    }
}

fn write_keyword(out: &mut Vec<u8>, name: &str) -> Result<()> {
    let value = crate::value::Value::Keyword(Name::new(name));
    crate::writer::freeze_value(out, &value, crate::registry::registry(), 0)
}

/// Buffers a sequence's elements into a scratch buffer while counting them,
/// exactly the "uncounted" path spec'd for sources that can't reveal their
/// length in O(1) — used unconditionally here since serde's `len` hint is
/// advisory, not authoritative (a hand-written `Serialize` impl can lie).
struct Collector<'a> {
    out: &'a mut Vec<u8>,
    depth: u32,
    scratch: Vec<u8>,
    count: usize,
}

impl<'a> Collector<'a> {
    fn new(out: &'a mut Vec<u8>, depth: u32, len_hint: Option<usize>) -> Self {
        Collector {
            out,
            depth,
            scratch: Vec::with_capacity(len_hint.map(|l| l * 4).unwrap_or(32)),
            count: 0,
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let depth = descend(self.depth)?;
        value.serialize(Serializer { out: &mut self.scratch, depth })?;
        self.count += 1;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        primitive::write_sized_tag(self.out, &families::VEC, self.count)?;
        self.out.extend_from_slice(&self.scratch);
        Ok(())
    }
}

impl<'a> ser::SerializeSeq for Collector<'a> {
    type Ok = ();
    type Error = Error;
    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> { self.push(value) }
    fn end(self) -> Result<()> { self.finish() }
}

impl<'a> ser::SerializeTuple for Collector<'a> {
    type Ok = ();
    type Error = Error;
    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> { self.push(value) }
    fn end(self) -> Result<()> { self.finish() }
}

impl<'a> ser::SerializeTupleStruct for Collector<'a> {
    type Ok = ();
    type Error = Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> { self.push(value) }
    fn end(self) -> Result<()> { self.finish() }
}

impl<'a> ser::SerializeTupleVariant for Collector<'a> {
    type Ok = ();
    type Error = Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> { self.push(value) }
    fn end(self) -> Result<()> { self.finish() }
}

/// The map/struct analogue of [`Collector`]: buffers alternating key/value
/// pairs while counting entries.
struct PairCollector<'a> {
    out: &'a mut Vec<u8>,
    depth: u32,
    scratch: Vec<u8>,
    count: usize,
}

impl<'a> PairCollector<'a> {
    fn new(out: &'a mut Vec<u8>, depth: u32, len_hint: Option<usize>) -> Self {
        PairCollector {
            out,
            depth,
            scratch: Vec::with_capacity(len_hint.map(|l| l * 8).unwrap_or(32)),
            count: 0,
        }
    }

    fn push_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        let depth = descend(self.depth)?;
        key.serialize(Serializer { out: &mut self.scratch, depth })
    }

    fn push_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let depth = descend(self.depth)?;
        value.serialize(Serializer { out: &mut self.scratch, depth })?;
        self.count += 1;
        Ok(())
    }

    fn push_field<T: Serialize + ?Sized>(&mut self, name: &'static str, value: &T) -> Result<()> {
        write_keyword(&mut self.scratch, name)?;
        self.push_value(value)
    }

    fn finish(self) -> Result<()> {
        primitive::write_sized_tag(self.out, &families::MAP, self.count)?;
        self.out.extend_from_slice(&self.scratch);
        Ok(())
    }
}

impl<'a> ser::SerializeMap for PairCollector<'a> {
    type Ok = ();
    type Error = Error;
    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> { self.push_key(key) }
    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> { self.push_value(value) }
    fn end(self) -> Result<()> { self.finish() }
}

impl<'a> ser::SerializeStruct for PairCollector<'a> {
    type Ok = ();
    type Error = Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.push_field(key, value)
    }
    fn end(self) -> Result<()> { self.finish() }
}

impl<'a> ser::SerializeStructVariant for PairCollector<'a> {
    type Ok = ();
    type Error = Error;
    fn serialize_field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        self.push_field(key, value)
    }
    fn end(self) -> Result<()> { self.finish() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::thaw_value;
    use crate::registry::Registry;
    use crate::value::Value;

    fn thaw(bytes: &[u8]) -> Value {
        let mut src = bytes;
        thaw_value(&mut src, &Registry::new(), 0).unwrap()
    }

    #[test]
    fn primitives_match_value_encoding() {
        let mut out = Vec::new();
        to_writer(&mut out, &42i32).unwrap();
        assert_eq!(thaw(&out), Value::Int(42));
    }

    #[test]
    fn vec_round_trips() {
        let mut out = Vec::new();
        to_writer(&mut out, &vec![1u8, 2, 3]).unwrap();
        assert_eq!(
            thaw(&out),
            Value::Vector(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn u128_overflowing_i64_becomes_bigint() {
        let mut out = Vec::new();
        to_writer(&mut out, &(u64::MAX as u128 + 1)).unwrap();
        match thaw(&out) {
            Value::BigInt(n) => assert_eq!(n, BigInt::from(u64::MAX as u128 + 1)),
            other => panic!("expected BigInt, got {other:?}"),
        }
    }
}
