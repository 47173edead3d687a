use coldstore::registry::{hash_keyword, CustomId};
use coldstore::value::{Name, Value};
use coldstore::{freeze, freeze_value, set_freeze_fallback, thaw, thaw_value, FallbackPolicy, Options, Registry};

#[test]
fn s1_plain_string_is_header_plus_str_sm() {
    let bytes = freeze(&"hello".to_string(), &Options::default()).unwrap();
    assert_eq!(&bytes[0..4], &[0x4E, 0x50, 0x59, 0x00]);
    assert_eq!(&bytes[4..], &[105, 0x05, b'h', b'e', b'l', b'l', b'o']);

    let back: String = thaw(&bytes, &Options::default()).unwrap();
    assert_eq!(back, "hello");
}

#[test]
fn s2_empty_vec_is_header_plus_vec0() {
    let bytes = freeze(&Vec::<i64>::new(), &Options::default()).unwrap();
    assert_eq!(&bytes[0..4], &[0x4E, 0x50, 0x59, 0x00]);
    assert_eq!(&bytes[4..], &[17]);

    let back: Vec<i64> = thaw(&bytes, &Options::default()).unwrap();
    assert!(back.is_empty());
}

#[test]
fn s3_keyword_map_matches_wire_layout() {
    let value = Value::Map(vec![
        (Value::Keyword(Name::new("a")), Value::Int(1)),
        (Value::Keyword(Name::new("b")), Value::Int(2)),
    ]);
    let bytes = freeze_value(&value, &Options::default()).unwrap();

    assert_eq!(&bytes[0..4], &[0x4E, 0x50, 0x59, 0x00]);
    assert_eq!(
        &bytes[4..],
        &[
            112, 0x02, // MAP_SM, 2 entries
            14, 0x01, b'a', 5, 0x01, // KW_SM "a" -> LONG_SM 1
            14, 0x01, b'b', 5, 0x02, // KW_SM "b" -> LONG_SM 2
        ]
    );

    let back = thaw_value(&bytes, &Options::default()).unwrap();
    assert_eq!(back, value);
}

#[test]
fn s4_large_body_auto_compresses_with_lz4() {
    let bytes = freeze_value(&Value::Bytes(vec![0u8; 10_000]), &Options::default()).unwrap();
    assert_eq!(&bytes[0..3], b"NPY");
    assert_eq!(bytes[3], 8);

    let back = thaw_value(&bytes, &Options::default()).unwrap();
    assert_eq!(back, Value::Bytes(vec![0u8; 10_000]));
}

#[test]
fn s5_password_protected_uses_aes_header_and_rejects_wrong_password() {
    let opts = Options {
        password: Some(b"pw".to_vec()),
        ..Options::default()
    };
    let bytes = freeze_value(&Value::String("secret".to_string()), &opts).unwrap();
    assert_eq!(bytes[3], 2);

    let back = thaw_value(&bytes, &opts).unwrap();
    assert_eq!(back, Value::String("secret".to_string()));

    let wrong = Options {
        password: Some(b"nope".to_vec()),
        ..Options::default()
    };
    assert!(thaw_value(&bytes, &wrong).is_err());
}

#[test]
fn s6_keyword_custom_type_round_trips_through_prefixed_custom() {
    let name = Name::namespaced("my", "t");
    let id = CustomId::Hash(hash_keyword(&name));

    let registry = Registry::new();
    registry
        .extend_freeze(name.to_string(), id, |value, out| {
            let s = value.as_str().expect("custom writer expects a string payload");
            out.extend_from_slice(s.as_bytes());
            Ok(())
        })
        .unwrap();
    registry
        .extend_thaw(id, |src| {
            let s = std::str::from_utf8(src).map_err(|_| coldstore::Error::InvalidUtf8)?.to_string();
            *src = &src[src.len()..];
            Ok(Value::String(s))
        })
        .unwrap();

    let opts = Options {
        registry: Some(std::sync::Arc::new(registry)),
        ..Options::default()
    };
    let value = Value::Custom {
        id,
        value: Box::new(Value::String("payload".to_string())),
    };
    let bytes = freeze_value(&value, &opts).unwrap();

    assert_eq!(bytes[4], 82); // PREFIXED_CUSTOM
    let expected_hash = hash_keyword(&name).to_be_bytes();
    assert_eq!(&bytes[5..7], &expected_hash);

    let back = thaw_value(&bytes, &opts).unwrap();
    assert_eq!(
        back,
        Value::Custom {
            id,
            value: Box::new(Value::String("payload".to_string())),
        }
    );
}

#[test]
fn s7_byte_custom_type_round_trips_through_unprefixed_custom() {
    let id = CustomId::Byte(7);

    let registry = Registry::new();
    registry
        .extend_freeze("my::ByteThing", id, |value, out| {
            let n = value.as_i64().expect("custom writer expects an int payload");
            out.extend_from_slice(&n.to_be_bytes());
            Ok(())
        })
        .unwrap();
    registry
        .extend_thaw(id, |src| {
            let bytes: [u8; 8] = src[..8].try_into().map_err(|_| coldstore::Error::InvalidUtf8)?;
            *src = &src[8..];
            Ok(Value::Int(i64::from_be_bytes(bytes)))
        })
        .unwrap();

    let opts = Options {
        registry: Some(std::sync::Arc::new(registry)),
        ..Options::default()
    };
    let value = Value::Custom {
        id,
        value: Box::new(Value::Int(99)),
    };
    let bytes = freeze_value(&value, &opts).unwrap();

    assert_eq!(bytes[4], (256 - 7u16) as u8);

    let back = thaw_value(&bytes, &opts).unwrap();
    assert_eq!(
        back,
        Value::Custom {
            id,
            value: Box::new(Value::Int(99)),
        }
    );
}

#[test]
fn s8_write_unfreezable_fallback_policy_reaches_real_freeze_calls() {
    set_freeze_fallback(FallbackPolicy::WriteUnfreezable);

    let huge: i128 = i128::from(i64::MAX) + 1;
    let bytes = freeze(&huge, &Options::default()).unwrap();
    let back = thaw_value(&bytes, &Options::default()).unwrap();

    set_freeze_fallback(FallbackPolicy::default());

    match back {
        Value::Map(pairs) => {
            assert_eq!(pairs[0].0, Value::Keyword(Name::new("type")));
            assert_eq!(pairs[0].1, Value::String("i128".to_string()));
            assert_eq!(pairs[1].0, Value::Keyword(Name::new("unfreezable")));
            assert_eq!(pairs[1].1, Value::String(huge.to_string()));
        }
        other => panic!("expected a two-key marker map, got {other:?}"),
    }
}

#[test]
fn s9_record_dispatches_through_a_by_name_registered_writer() {
    let registry = Registry::new();
    let id = CustomId::Hash(hash_keyword(&Name::new("my.pkg.Widget")));
    registry
        .extend_freeze("my.pkg.Widget", id, |value, out| {
            coldstore::writer::freeze_value(out, value, coldstore::registry::registry(), 0)
        })
        .unwrap();
    registry
        .extend_thaw(id, |src| coldstore::reader::thaw_value(src, &Registry::new(), 0))
        .unwrap();

    let opts = Options {
        registry: Some(std::sync::Arc::new(registry)),
        ..Options::default()
    };
    let value = Value::Record {
        name: "my.pkg.Widget".to_string(),
        fields: vec![(Value::Keyword(Name::new("n")), Value::Int(3))],
    };
    let bytes = freeze_value(&value, &opts).unwrap();

    assert_eq!(bytes[4], 82); // PREFIXED_CUSTOM, the by-name dispatch's wire slot

    let back = thaw_value(&bytes, &opts).unwrap();
    assert_eq!(
        back,
        Value::Custom {
            id,
            value: Box::new(Value::Map(vec![(Value::Keyword(Name::new("n")), Value::Int(3))])),
        }
    );
}
