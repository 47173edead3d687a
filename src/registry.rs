//! The runtime-extensible custom-type registry.
//!
//! Two wire dispatch schemes share one registry: a byte id in `1..=128`
//! (stored as its negation directly in the tag slot — no `PREFIXED_CUSTOM`
//! wrapper, cheapest overhead, collision-prone between unrelated users) and
//! a keyword id (an arbitrary name, hashed into a 16-bit value and written
//! under [`crate::tag::Tag::PrefixedCustom`]). Both schemes are mutated by
//! atomic whole-map replacement (`arc_swap`) so a `freeze`/`thaw` running on
//! one thread never observes a torn registry while another thread
//! registers a new type, mirroring the teacher's `Dictionary`/compression
//! state handling in `compress.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::value::{Name, Value};

/// The reserved band `[-128, -1]`, read from a raw tag byte `128..=255` as
/// `byte as i8`. Keyword-id hashes must never land here; it's reserved for
/// unprefixed byte ids.
const RESERVED_LOW: i16 = -128;
const RESERVED_HIGH: i16 = -1;

/// Which of the two custom-id schemes a registration uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CustomId {
    /// Unprefixed byte id in `1..=128`, stored on the wire as its negation.
    Byte(u8),
    /// A keyword name's 16-bit hash, written after
    /// [`crate::tag::Tag::PrefixedCustom`].
    Hash(i16),
}

/// Hash a keyword/symbol name into the 16-bit space reserved for
/// [`CustomId::Hash`]: `[-32768, -129] ∪ [0, 32767]`, explicitly excluding
/// `[-128, -1]` so a hashed id can never be confused with a byte id.
pub fn hash_keyword(name: &Name) -> i16 {
    let full = format!("{name}");
    let mut hash: u32 = 0x811c_9dc5;
    for b in full.as_bytes() {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    const BAND_SIZE: u32 = 65536 - 128;
    let offset = hash % BAND_SIZE;
    if offset < 32768 {
        offset as i16
    } else {
        let offset2 = offset - 32768;
        -32768 + offset2 as i16
    }
}

type FreezeFn = Arc<dyn Fn(&Value, &mut Vec<u8>) -> Result<()> + Send + Sync>;
type ThawFn = Arc<dyn Fn(&mut &[u8]) -> Result<Value> + Send + Sync>;

#[derive(Clone, Default)]
struct Writers {
    by_name: HashMap<String, (CustomId, FreezeFn)>,
    by_id: HashMap<CustomId, FreezeFn>,
}
#[derive(Clone)]
struct Readers(HashMap<CustomId, ThawFn>);

/// A table of user-registered custom-type encoders and decoders.
///
/// A process-wide default lives behind [`registry()`]; construct an
/// explicit `Registry::new()` instead when a caller wants isolation (tests,
/// multi-tenant hosts) rather than sharing the process default.
pub struct Registry {
    writers: ArcSwap<Writers>,
    readers: ArcSwap<Readers>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            writers: ArcSwap::from_pointee(Writers::default()),
            readers: ArcSwap::from_pointee(Readers(HashMap::new())),
        }
    }

    /// Register an encoder for `type_name` under `id`. Re-registering a
    /// `type_name` or `id` already in use is allowed, replacing the prior
    /// entry, and logs a warning: silently shadowing a previously-registered
    /// custom type is the kind of bug that stays invisible until
    /// production.
    pub fn extend_freeze(
        &self,
        type_name: impl Into<String>,
        id: CustomId,
        writer: impl Fn(&Value, &mut Vec<u8>) -> Result<()> + Send + Sync + 'static,
    ) -> Result<()> {
        check_id(id)?;
        let type_name = type_name.into();
        let mut map = (*self.writers.load_full()).clone();
        let encoder: FreezeFn = Arc::new(writer);
        if let Some((old_id, _)) = map.by_name.insert(type_name.clone(), (id, encoder.clone())) {
            tracing::warn!(
                type_name = %type_name,
                ?old_id,
                new_id = ?id,
                "re-registering freeze encoder for already-registered type"
            );
        }
        map.by_id.insert(id, encoder);
        self.writers.store(Arc::new(map));
        Ok(())
    }

    /// Register a decoder for `id`. Re-registration is allowed and logs a
    /// warning, same as [`Registry::extend_freeze`].
    pub fn extend_thaw(
        &self,
        id: CustomId,
        reader: impl Fn(&mut &[u8]) -> Result<Value> + Send + Sync + 'static,
    ) -> Result<()> {
        check_id(id)?;
        let mut map = (*self.readers.load_full()).clone();
        if map.0.insert(id, Arc::new(reader)).is_some() {
            tracing::warn!(id = ?id, "re-registering thaw decoder for already-registered id");
        }
        self.readers.store(Arc::new(map));
        Ok(())
    }

    /// Look up a registered writer by logical type name, for a
    /// [`crate::value::Value::Record`] whose `name` should dispatch through
    /// its custom encoder rather than the generic name-then-fields record
    /// encoding.
    pub(crate) fn writer_for(&self, type_name: &str) -> Option<(CustomId, FreezeFn)> {
        self.writers.load().by_name.get(type_name).cloned()
    }

    /// Look up a registered writer by wire id, for encoding a [`Value::Custom`]
    /// whose payload should go through its custom encoder rather than the
    /// generic recursive dispatch.
    pub(crate) fn writer_for_id(&self, id: CustomId) -> Option<FreezeFn> {
        self.writers.load().by_id.get(&id).cloned()
    }

    pub(crate) fn reader_for(&self, id: CustomId) -> Option<ThawFn> {
        self.readers.load().0.get(&id).cloned()
    }
}

fn check_id(id: CustomId) -> Result<()> {
    match id {
        CustomId::Byte(b) if (1..=128).contains(&b) => Ok(()),
        CustomId::Byte(b) => Err(Error::ReservedByteId(b)),
        CustomId::Hash(h) if (RESERVED_LOW..=RESERVED_HIGH).contains(&h) => {
            Err(Error::ReservedByteId(h.unsigned_abs() as u8))
        }
        CustomId::Hash(_) => Ok(()),
    }
}

/// The process-wide default registry, created on first use.
pub static DEFAULT: Lazy<Registry> = Lazy::new(Registry::new);

/// The process-wide default registry. Equivalent to `&*DEFAULT`; provided
/// as a function so call sites read `registry().extend_freeze(...)` rather
/// than dereferencing a `static` by hand.
pub fn registry() -> &'static Registry {
    &DEFAULT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_excludes_reserved_band() {
        for name in ["a", "my/t", "", "a-very-long-keyword-name/with-ns"] {
            let h = hash_keyword(&Name::new(name));
            assert!(!(RESERVED_LOW..=RESERVED_HIGH).contains(&h), "{name} hashed into reserved band");
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let a = hash_keyword(&Name::namespaced("my", "t"));
        let b = hash_keyword(&Name::namespaced("my", "t"));
        assert_eq!(a, b);
    }

    #[test]
    fn byte_id_out_of_range_rejected() {
        let reg = Registry::new();
        assert!(reg.extend_freeze("x", CustomId::Byte(0), |_, _| Ok(())).is_err());
        assert!(reg.extend_freeze("x", CustomId::Byte(200), |_, _| Ok(())).is_err());
    }

    #[test]
    fn reserved_hash_rejected() {
        let reg = Registry::new();
        assert!(reg.extend_thaw(CustomId::Hash(-50), |_| Ok(Value::Nil)).is_err());
    }
}
