//! Process-wide configuration cells.
//!
//! Mirrors `crate::registry`'s atomic-replacement story: the fallback policy
//! is consulted whenever `crate::ser` meets a value with no single wire tag
//! (today, `i128`/`u128` magnitudes outside `i64`'s range), and the `auto`
//! compressor hook is consulted on every `freeze` call whose `Options`
//! selects `Compression::Auto`. Both are mutated rarely, so each lives
//! behind its own `ArcSwap` rather than a mutex. Per-call `Options` always
//! wins over these defaults; they only supply the zero-config ergonomic
//! path the teacher's `NoSchema`/`Schema` injectable-context pattern leaves
//! room for.

use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

use crate::fallback::FallbackPolicy;
use crate::framing::CompressorId;

/// A user hook invoked with the raw (pre-compression) body to pick a
/// compressor, installed via [`set_auto_compressor`]. Consulted only when
/// `Options::compressor` is `Compression::Auto` and no per-call override
/// took precedence.
pub type AutoCompressorFn = Arc<dyn Fn(&[u8]) -> CompressorId + Send + Sync>;

static FALLBACK: Lazy<ArcSwap<FallbackPolicy>> =
    Lazy::new(|| ArcSwap::from_pointee(FallbackPolicy::default()));

static AUTO_COMPRESSOR: Lazy<ArcSwap<Option<AutoCompressorFn>>> =
    Lazy::new(|| ArcSwap::from_pointee(None));

/// Install the process-wide fallback policy used when `Options::fallback`
/// doesn't override it.
pub fn set_freeze_fallback(policy: FallbackPolicy) {
    FALLBACK.store(Arc::new(policy));
}

/// The process-wide fallback policy.
pub fn freeze_fallback() -> Arc<FallbackPolicy> {
    FALLBACK.load_full()
}

/// Install the process-wide `auto` compressor hook.
pub fn set_auto_compressor(f: impl Fn(&[u8]) -> CompressorId + Send + Sync + 'static) {
    AUTO_COMPRESSOR.store(Arc::new(Some(Arc::new(f))));
}

/// Clear a previously installed `auto` compressor hook, reverting to the
/// built-in size-threshold heuristic.
pub fn clear_auto_compressor() {
    AUTO_COMPRESSOR.store(Arc::new(None));
}

/// The process-wide `auto` compressor hook, if one was installed.
pub fn auto_compressor() -> Option<AutoCompressorFn> {
    (*AUTO_COMPRESSOR.load_full()).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_compressor_round_trips_through_the_cell() {
        clear_auto_compressor();
        assert!(auto_compressor().is_none());
        set_auto_compressor(|raw| if raw.len() > 4 { CompressorId::Lz4 } else { CompressorId::None });
        let hook = auto_compressor().expect("hook installed");
        assert_eq!(hook(&[0u8; 10]), CompressorId::Lz4);
        clear_auto_compressor();
    }
}
