//! Length-prefixed I/O helpers shared by every size-classed variant, plus
//! the narrowest-fit signed-long writer.
//!
//! All multi-byte integers on the wire are big-endian — unlike the
//! teacher's MessagePack-derived little-endian scheme, this format's wire
//! convention is big-endian throughout (spec-mandated, not a stylistic
//! choice carried from the teacher).

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::tag::Tag;

/// Which length-prefix width a collection/string/bytes value was (or will
/// be) written with. Chosen as the narrowest that fits the value's length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeClass {
    Empty,
    Sm,
    Md,
    Lg,
}

/// Classify `len` into the narrowest size class that can hold it.
pub fn classify_len(len: usize) -> SizeClass {
    if len == 0 {
        SizeClass::Empty
    } else if len <= 127 {
        SizeClass::Sm
    } else if len <= 32767 {
        SizeClass::Md
    } else {
        SizeClass::Lg
    }
}

/// The four tags a size-classed family defines, in `(empty, sm, md, lg)`
/// order, matching [`classify_len`]'s classes.
pub struct SizeClassTags {
    pub empty: Tag,
    pub sm: Tag,
    pub md: Tag,
    pub lg: Tag,
}

/// The fixed `(empty, sm, md, lg)` tag quadruple for each size-classed
/// collection/string/bytes family, shared by `crate::writer` and
/// `crate::reader` so the two sides can't drift apart.
pub mod families {
    use super::SizeClassTags;
    use crate::tag::Tag;

    pub const BYTES: SizeClassTags = SizeClassTags {
        empty: Tag::Bytes0,
        sm: Tag::BytesSm,
        md: Tag::BytesMd,
        lg: Tag::BytesLg,
    };
    pub const STR: SizeClassTags = SizeClassTags {
        empty: Tag::Str0,
        sm: Tag::StrSm,
        md: Tag::StrMd,
        lg: Tag::StrLg,
    };
    pub const VEC: SizeClassTags = SizeClassTags {
        empty: Tag::Vec0,
        sm: Tag::VecSm,
        md: Tag::VecMd,
        lg: Tag::VecLg,
    };
    pub const LIST: SizeClassTags = SizeClassTags {
        empty: Tag::List0,
        sm: Tag::ListSm,
        md: Tag::ListMd,
        lg: Tag::ListLg,
    };
    pub const SEQ: SizeClassTags = SizeClassTags {
        empty: Tag::Seq0,
        sm: Tag::SeqSm,
        md: Tag::SeqMd,
        lg: Tag::SeqLg,
    };
    pub const SET: SizeClassTags = SizeClassTags {
        empty: Tag::Set0,
        sm: Tag::SetSm,
        md: Tag::SetMd,
        lg: Tag::SetLg,
    };
    pub const SORTED_SET: SizeClassTags = SizeClassTags {
        empty: Tag::SortedSet0,
        sm: Tag::SortedSetSm,
        md: Tag::SortedSetMd,
        lg: Tag::SortedSetLg,
    };
    pub const QUEUE: SizeClassTags = SizeClassTags {
        empty: Tag::Queue0,
        sm: Tag::QueueSm,
        md: Tag::QueueMd,
        lg: Tag::QueueLg,
    };
    pub const MAP: SizeClassTags = SizeClassTags {
        empty: Tag::Map0,
        sm: Tag::MapSm,
        md: Tag::MapMd,
        lg: Tag::MapLg,
    };
    pub const SORTED_MAP: SizeClassTags = SizeClassTags {
        empty: Tag::SortedMap0,
        sm: Tag::SortedMapSm,
        md: Tag::SortedMapMd,
        lg: Tag::SortedMapLg,
    };
}

/// Write the tag byte and length prefix for `len` bytes/elements, picking
/// whichever of `tags`'s four entries matches [`classify_len`]. Returns the
/// chosen tag so callers that need it for logging/testing don't have to
/// re-derive it.
pub fn write_sized_tag(out: &mut Vec<u8>, tags: &SizeClassTags, len: usize) -> Result<Tag> {
    let class = classify_len(len);
    let tag = match class {
        SizeClass::Empty => tags.empty,
        SizeClass::Sm => tags.sm,
        SizeClass::Md => tags.md,
        SizeClass::Lg => tags.lg,
    };
    out.push(tag.to_u8());
    match class {
        SizeClass::Empty => {}
        SizeClass::Sm => out.push(len as u8),
        SizeClass::Md => out
            .write_i16::<BigEndian>(len as i16)
            .expect("Vec<u8> writes are infallible"),
        SizeClass::Lg => out
            .write_i32::<BigEndian>(len as i32)
            .expect("Vec<u8> writes are infallible"),
    }
    Ok(tag)
}

/// Which of `tags`'s four entries `tag` is, the inverse of the selection
/// [`write_sized_tag`] makes. Panics if `tag` isn't one of `tags`'s four
/// entries; callers only ever pass a tag already matched against the same
/// family.
pub fn class_of(tag: Tag, tags: &SizeClassTags) -> SizeClass {
    if tag == tags.empty {
        SizeClass::Empty
    } else if tag == tags.sm {
        SizeClass::Sm
    } else if tag == tags.md {
        SizeClass::Md
    } else if tag == tags.lg {
        SizeClass::Lg
    } else {
        unreachable!("tag {:?} does not belong to this size-class family", tag)
    }
}

/// Read a length prefix matching `class`, the size class the already-read
/// tag byte named. `step` names the caller for error context.
pub fn read_len(src: &mut &[u8], class: SizeClass, step: &'static str) -> Result<usize> {
    let len = match class {
        SizeClass::Empty => 0,
        SizeClass::Sm => need(src, 1, step)?.read_u8()? as usize,
        SizeClass::Md => need(src, 2, step)?.read_i16::<BigEndian>()? as usize,
        SizeClass::Lg => need(src, 4, step)?.read_i32::<BigEndian>()? as usize,
    };
    Ok(len)
}

/// 1-byte unsigned length (`0..=127`) then payload.
pub fn write_bytes_sm(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    if bytes.len() > 127 {
        return Err(Error::BadSizeClass {
            step: "write_bytes_sm",
            len: bytes.len(),
        });
    }
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    Ok(())
}

/// 2-byte big-endian signed length then payload.
pub fn write_bytes_md(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    if bytes.len() > i16::MAX as usize {
        return Err(Error::BadSizeClass {
            step: "write_bytes_md",
            len: bytes.len(),
        });
    }
    out.write_i16::<BigEndian>(bytes.len() as i16)
        .expect("Vec<u8> writes are infallible");
    out.extend_from_slice(bytes);
    Ok(())
}

/// 4-byte big-endian signed length then payload.
pub fn write_bytes_lg(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    if bytes.len() > i32::MAX as usize {
        return Err(Error::BadSizeClass {
            step: "write_bytes_lg",
            len: bytes.len(),
        });
    }
    out.write_i32::<BigEndian>(bytes.len() as i32)
        .expect("Vec<u8> writes are infallible");
    out.extend_from_slice(bytes);
    Ok(())
}

/// Read exactly `len` bytes, advancing `src`.
pub fn read_exact<'a>(src: &mut &'a [u8], len: usize, step: &'static str) -> Result<&'a [u8]> {
    if src.len() < len {
        return Err(Error::LengthTooShort {
            step,
            actual: src.len(),
            expected: len,
        });
    }
    let (head, tail) = src.split_at(len);
    *src = tail;
    Ok(head)
}

/// Write the narrowest `{byte, short, int, long}` representation of `n`
/// that faithfully holds it, tagging with `LONG_SM/MD/LG/XL`; `0` always
/// writes `LONG_ZERO`. This is purely a space optimization: readers widen
/// to `i64` unconditionally.
pub fn write_long(out: &mut Vec<u8>, n: i64) -> Result<()> {
    if n == 0 {
        out.push(Tag::LongZero.to_u8());
    } else if let Ok(b) = i8::try_from(n) {
        out.push(Tag::LongSm.to_u8());
        out.write_i8(b).expect("Vec<u8> writes are infallible");
    } else if let Ok(s) = i16::try_from(n) {
        out.push(Tag::LongMd.to_u8());
        out.write_i16::<BigEndian>(s).expect("Vec<u8> writes are infallible");
    } else if let Ok(i) = i32::try_from(n) {
        out.push(Tag::LongLg.to_u8());
        out.write_i32::<BigEndian>(i).expect("Vec<u8> writes are infallible");
    } else {
        out.push(Tag::LongXl.to_u8());
        out.write_i64::<BigEndian>(n).expect("Vec<u8> writes are infallible");
    }
    Ok(())
}

/// Read the payload following one of the `LONG_*` tags, widening to `i64`.
pub fn read_long(src: &mut &[u8], tag: Tag) -> Result<i64> {
    Ok(match tag {
        Tag::LongZero => 0,
        Tag::LongSm => need(src, 1, "read_long/sm")?.read_i8()? as i64,
        Tag::LongMd => need(src, 2, "read_long/md")?.read_i16::<BigEndian>()? as i64,
        Tag::LongLg => need(src, 4, "read_long/lg")?.read_i32::<BigEndian>()? as i64,
        Tag::LongXl => need(src, 8, "read_long/xl")?.read_i64::<BigEndian>()?,
        _ => unreachable!("read_long called with a non-long tag"),
    })
}

fn need<'a, 'b>(src: &'b mut &'a [u8], len: usize, step: &'static str) -> Result<&'b mut &'a [u8]> {
    if src.len() < len {
        return Err(Error::LengthTooShort {
            step,
            actual: src.len(),
            expected: len,
        });
    }
    Ok(src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_class_boundaries() {
        assert_eq!(classify_len(0), SizeClass::Empty);
        assert_eq!(classify_len(1), SizeClass::Sm);
        assert_eq!(classify_len(127), SizeClass::Sm);
        assert_eq!(classify_len(128), SizeClass::Md);
        assert_eq!(classify_len(32767), SizeClass::Md);
        assert_eq!(classify_len(32768), SizeClass::Lg);
    }

    #[test]
    fn long_zero_is_special() {
        let mut out = Vec::new();
        write_long(&mut out, 0).unwrap();
        assert_eq!(out, vec![Tag::LongZero.to_u8()]);
    }

    #[test]
    fn long_widths_are_minimal() {
        for (n, expect) in [
            (1i64, Tag::LongSm),
            (127, Tag::LongSm),
            (128, Tag::LongMd),
            (32767, Tag::LongMd),
            (32768, Tag::LongLg),
            (i64::from(i32::MAX), Tag::LongLg),
            (i64::from(i32::MAX) + 1, Tag::LongXl),
            (-129, Tag::LongMd),
        ] {
            let mut out = Vec::new();
            write_long(&mut out, n).unwrap();
            assert_eq!(out[0], expect.to_u8(), "n={n}");
            let mut src = &out[1..];
            assert_eq!(read_long(&mut src, expect).unwrap(), n);
            assert!(src.is_empty());
        }
    }
}
