//! The wire type-ID registry.
//!
//! Every encoded value begins with one tag byte. [`Tag`] enumerates the
//! complete, fixed mapping from byte to logical variant (and, where a
//! variant has more than one size class, from byte to variant *and* size
//! class). Byte assignments are permanent: once shipped, a tag is never
//! reused for a different meaning, and new variants take a previously
//! unused byte. A handful of bytes are kept around as decode-only
//! [`DeprecatedTag`] entries for backward compatibility; `freeze` never
//! emits them.
//!
//! Tag bytes 1..=128, read as a signed byte, are reserved for
//! [`crate::registry`]'s unprefixed custom-type ids: a user byte id `n` in
//! `1..=128` is stored on the wire as `-n`, so any negative tag byte that
//! doesn't otherwise decode as a standard negative tag is a custom-type
//! dispatch rather than a parse error. That space is disjoint from this
//! table, which only ever assigns non-negative bytes.

/// A single wire tag byte, decoded into its logical meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    Nil,
    True,
    False,
    Char,

    LongZero,
    LongSm,
    LongMd,
    LongLg,
    LongXl,

    Float,
    Double,

    BigInt,
    BigDecimal,
    Ratio,

    KwSm,
    KwMd,
    SymSm,
    SymMd,

    Regex,

    Bytes0,
    BytesSm,
    BytesMd,
    BytesLg,

    Vec0,
    Vec2,
    Vec3,
    VecSm,
    VecMd,
    VecLg,

    List0,
    ListSm,
    ListMd,
    ListLg,

    Seq0,
    SeqSm,
    SeqMd,
    SeqLg,

    Set0,
    SetSm,
    SetMd,
    SetLg,

    SortedSet0,
    SortedSetSm,
    SortedSetMd,
    SortedSetLg,

    Queue0,
    QueueSm,
    QueueMd,
    QueueLg,

    Map0,
    MapSm,
    MapMd,
    MapLg,

    SortedMap0,
    SortedMapSm,
    SortedMapMd,
    SortedMapLg,

    Date,
    Uuid,

    RecordSm,
    RecordMd,

    Meta,

    Unfreezable,
    ReadableFallback,
    SerializableFallback,

    Str0,
    StrSm,
    StrMd,
    StrLg,

    PrefixedCustom,

    /// Decode-only tags kept for backward compatibility. `freeze` never
    /// emits these.
    Deprecated(DeprecatedTag),
}

/// Legacy, decode-only tags. See [`Tag::Deprecated`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeprecatedTag {
    /// Old boolean encoding: a single tag byte followed by an explicit 0/1
    /// payload byte, rather than folding true/false into the tag itself.
    BoolOld,
    /// Old UTF-8 string writer: always 4-byte length-prefixed, regardless
    /// of string length.
    Utf8Old,
    /// Old "large map" encoding whose 32-bit count field is *twice* the
    /// actual entry count (it counted key and value separately).
    MapDepr2,
    /// Old "large vector" encoding, doubled the same way as `MapDepr2` for
    /// symmetry with the map format of that era.
    VecDepr2,
}

macro_rules! tag_table {
    ($($byte:expr => $variant:expr),* $(,)?) => {
        impl Tag {
            /// Encode this tag to its wire byte.
            pub const fn to_u8(self) -> u8 {
                match self {
                    $($variant => $byte,)*
                }
            }

            /// Decode a wire byte into a tag, if it names one.
            ///
            /// Returns `None` for bytes in the reserved custom-type band
            /// (`1..=128`, read as negative); callers must check for that
            /// band themselves before falling back to this lookup, since a
            /// plain `u8` can't distinguish "negative custom id" from
            /// "positive tag" the way the on-wire signed byte can.
            pub const fn from_u8(b: u8) -> Option<Tag> {
                match b {
                    $($byte => Some($variant),)*
                    _ => None,
                }
            }
        }
    };
}

tag_table! {
    0 => Tag::Nil,
    1 => Tag::True,
    2 => Tag::False,
    3 => Tag::Char,

    4 => Tag::LongZero,
    5 => Tag::LongSm,
    6 => Tag::LongMd,
    7 => Tag::LongLg,
    8 => Tag::LongXl,

    9 => Tag::Float,
    10 => Tag::Double,

    11 => Tag::BigInt,
    12 => Tag::BigDecimal,
    13 => Tag::Ratio,

    14 => Tag::KwSm,
    15 => Tag::KwMd,
    16 => Tag::SymSm,
    18 => Tag::SymMd,

    19 => Tag::Regex,

    20 => Tag::Bytes0,
    21 => Tag::BytesSm,
    22 => Tag::BytesMd,
    23 => Tag::BytesLg,

    17 => Tag::Vec0,
    24 => Tag::Vec2,
    25 => Tag::Vec3,
    26 => Tag::VecSm,
    27 => Tag::VecMd,
    28 => Tag::VecLg,

    29 => Tag::List0,
    30 => Tag::ListSm,
    31 => Tag::ListMd,
    32 => Tag::ListLg,

    33 => Tag::Seq0,
    34 => Tag::SeqSm,
    35 => Tag::SeqMd,
    36 => Tag::SeqLg,

    37 => Tag::Set0,
    38 => Tag::SetSm,
    39 => Tag::SetMd,
    40 => Tag::SetLg,

    41 => Tag::SortedSet0,
    42 => Tag::SortedSetSm,
    43 => Tag::SortedSetMd,
    44 => Tag::SortedSetLg,

    45 => Tag::Queue0,
    46 => Tag::QueueSm,
    47 => Tag::QueueMd,
    48 => Tag::QueueLg,

    49 => Tag::Map0,
    112 => Tag::MapSm,
    50 => Tag::MapMd,
    51 => Tag::MapLg,

    52 => Tag::SortedMap0,
    53 => Tag::SortedMapSm,
    54 => Tag::SortedMapMd,
    55 => Tag::SortedMapLg,

    56 => Tag::Date,
    57 => Tag::Uuid,

    58 => Tag::RecordSm,
    59 => Tag::RecordMd,

    60 => Tag::Meta,

    61 => Tag::Unfreezable,
    62 => Tag::ReadableFallback,
    63 => Tag::SerializableFallback,

    104 => Tag::Str0,
    105 => Tag::StrSm,
    106 => Tag::StrMd,
    107 => Tag::StrLg,

    82 => Tag::PrefixedCustom,

    64 => Tag::Deprecated(DeprecatedTag::BoolOld),
    65 => Tag::Deprecated(DeprecatedTag::Utf8Old),
    66 => Tag::Deprecated(DeprecatedTag::MapDepr2),
    67 => Tag::Deprecated(DeprecatedTag::VecDepr2),
}

/// Lower bound (inclusive) of the reserved unprefixed-custom-id band, read
/// as a raw `u8`: bytes `128..=255` decode, as a signed `i8`, to `-128..=-1`.
pub const CUSTOM_BYTE_ID_BAND_START: u8 = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_wire_values_from_spec() {
        assert_eq!(Tag::StrSm.to_u8(), 105);
        assert_eq!(Tag::Vec0.to_u8(), 17);
        assert_eq!(Tag::MapSm.to_u8(), 112);
        assert_eq!(Tag::PrefixedCustom.to_u8(), 82);
    }

    #[test]
    fn round_trips() {
        for b in 0u8..=255 {
            if let Some(tag) = Tag::from_u8(b) {
                assert_eq!(tag.to_u8(), b);
            }
        }
    }

    #[test]
    fn no_byte_claims_two_tags() {
        let mut seen = [false; 256];
        for b in 0u8..=255 {
            if let Some(tag) = Tag::from_u8(b) {
                let wire = tag.to_u8() as usize;
                assert!(!seen[wire], "byte {wire} assigned twice");
                seen[wire] = true;
            }
        }
    }
}
