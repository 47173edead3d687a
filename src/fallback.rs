//! The fallback chain consulted when a typed `T: Serialize` value is being
//! reduced to a [`Value`] and serde's data model offers no single wire tag
//! for it — today that's `i128`/`u128` magnitudes outside `i64`'s range:
//! `crate::ser` can always widen those losslessly into `BigInt`, but the
//! policy installed via [`crate::config::set_freeze_fallback`] gets first
//! say over whether that widening happens or the value is instead reduced
//! to a textual/marker representation. Every other Rust type serde hands
//! the bridge maps onto a `Value` variant directly and never reaches this
//! module. A custom type registered by name (`crate::registry`) is tried
//! first and is not part of this chain; this is what runs after that
//! lookup misses.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::value::{Name, Value};

/// What to do with a value that has no direct wire encoding and no
/// registered custom writer.
#[derive(Clone)]
pub enum FallbackPolicy {
    /// Reduce the value through `serde_json` into [`Value::Readable`], and
    /// fail only if that also errors. The default.
    Strict,
    /// Skip the textual reduction and always write [`Value::Readable`]
    /// carrying a placeholder description, even if JSON encoding of the
    /// real value would have succeeded. Useful for producing deterministic
    /// fixtures that don't depend on a value's `Serialize` impl succeeding.
    WriteUnfreezable,
    /// Fully override: call `f` with the value already reduced to a
    /// generic `Value` tree via `serde_json`, and use whatever it returns.
    Custom(Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>),
}

impl fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FallbackPolicy::Strict => f.write_str("Strict"),
            FallbackPolicy::WriteUnfreezable => f.write_str("WriteUnfreezable"),
            FallbackPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        FallbackPolicy::Strict
    }
}

impl FallbackPolicy {
    /// Apply this policy to a value that had no direct encoding, given its
    /// best-effort textual rendering (typically produced by serializing
    /// through `serde_json` first).
    pub fn apply(&self, type_name: &str, textual: Option<&str>) -> Result<Value> {
        match self {
            FallbackPolicy::Strict => match textual {
                Some(text) => Ok(Value::Readable(text.to_owned())),
                None => Err(crate::error::Error::Unfreezable {
                    type_name: type_name.to_owned(),
                }),
            },
            FallbackPolicy::WriteUnfreezable => Ok(Value::Map(vec![
                (Value::Keyword(Name::new("type")), Value::String(type_name.to_owned())),
                (
                    Value::Keyword(Name::new("unfreezable")),
                    Value::String(textual.unwrap_or_default().to_owned()),
                ),
            ])),
            FallbackPolicy::Custom(f) => {
                let placeholder = Value::Readable(textual.unwrap_or_default().to_owned());
                f(&placeholder)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_uses_textual_when_present() {
        let policy = FallbackPolicy::Strict;
        let v = policy.apply("my::Type", Some("42")).unwrap();
        assert_eq!(v, Value::Readable("42".into()));
    }

    #[test]
    fn strict_fails_without_textual() {
        let policy = FallbackPolicy::Strict;
        assert!(policy.apply("my::Type", None).is_err());
    }

    #[test]
    fn write_unfreezable_builds_two_key_marker_map() {
        let policy = FallbackPolicy::WriteUnfreezable;
        let v = policy.apply("my::Type", Some("42")).unwrap();
        assert_eq!(
            v,
            Value::Map(vec![
                (Value::Keyword(Name::new("type")), Value::String("my::Type".into())),
                (Value::Keyword(Name::new("unfreezable")), Value::String("42".into())),
            ])
        );
    }
}
