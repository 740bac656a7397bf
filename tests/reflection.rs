//! Reflection and the binary codec working together on one schema.

use protodyn::decoding::DecodeErrorKind;
use protodyn::google::protobuf::FileDescriptorProto;
use protodyn::test_utils::{assert_roundtrip, build_pool, file_from_text};
use protodyn::text_format;
use protodyn::{
    DecodeOptions, DescriptorPool, DynamicMessage, FieldDescriptor, Message, MessageDescriptor,
    UnknownValue, Value,
};

const UNITTEST: &str = r#"
    name: "unittest.proto" package: "pkg"
    message_type { name: "TestAll"
      field { name: "optional_int32" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
      field { name: "optional_sint64" number: 2 label: LABEL_OPTIONAL type: TYPE_SINT64 }
      field { name: "optional_string" number: 3 label: LABEL_OPTIONAL type: TYPE_STRING }
      field { name: "optional_bytes" number: 4 label: LABEL_OPTIONAL type: TYPE_BYTES }
      field { name: "optional_double" number: 5 label: LABEL_OPTIONAL type: TYPE_DOUBLE }
      field { name: "optional_enum" number: 6 label: LABEL_OPTIONAL type: TYPE_ENUM type_name: ".pkg.Color" }
      field { name: "repeated_int32" number: 7 label: LABEL_REPEATED type: TYPE_INT32 }
      field { name: "packed_int32" number: 8 label: LABEL_REPEATED type: TYPE_INT32 options { packed: true } }
      field { name: "child" number: 9 label: LABEL_OPTIONAL type: TYPE_MESSAGE type_name: ".pkg.TestAll" }
      field { name: "optionalgroup" number: 10 label: LABEL_OPTIONAL type: TYPE_GROUP type_name: ".pkg.TestAll.OptionalGroup" }
      nested_type { name: "OptionalGroup"
        field { name: "a" number: 11 label: LABEL_OPTIONAL type: TYPE_INT32 }
      }
      extension_range { start: 100 end: 200 }
    }
    message_type { name: "Required"
      field { name: "a" number: 1 label: LABEL_REQUIRED type: TYPE_INT32 }
      field { name: "b" number: 2 label: LABEL_REQUIRED type: TYPE_INT32 }
    }
    message_type { name: "Node"
      field { name: "child" number: 1 label: LABEL_OPTIONAL type: TYPE_MESSAGE type_name: ".pkg.Node" }
      field { name: "value" number: 2 label: LABEL_OPTIONAL type: TYPE_INT32 }
    }
    message_type { name: "MessageSet"
      extension_range { start: 4 end: 2147483647 }
      options { message_set_wire_format: true }
    }
    message_type { name: "SetItem"
      field { name: "i" number: 15 label: LABEL_OPTIONAL type: TYPE_INT32 }
      extension { name: "item" number: 1547769 label: LABEL_OPTIONAL type: TYPE_MESSAGE
                  type_name: ".pkg.SetItem" extendee: ".pkg.MessageSet" }
    }
    enum_type { name: "Color"
      value { name: "RED" number: 0 }
      value { name: "GREEN" number: 1 }
    }
    extension { name: "ext_int" number: 100 label: LABEL_OPTIONAL type: TYPE_INT32 extendee: ".pkg.TestAll" }
    extension { name: "ext_required" number: 101 label: LABEL_OPTIONAL type: TYPE_MESSAGE
                type_name: ".pkg.Required" extendee: ".pkg.TestAll" }
"#;

fn pool() -> DescriptorPool {
    build_pool(&[UNITTEST])
}

fn message(pool: &DescriptorPool, name: &str) -> MessageDescriptor {
    pool.find_message_by_name(name).unwrap()
}

fn field(desc: &MessageDescriptor, name: &str) -> FieldDescriptor {
    desc.get_field_by_name(name).unwrap()
}

fn decode_err(desc: MessageDescriptor, bytes: &[u8]) -> DecodeErrorKind {
    DynamicMessage::decode_partial(desc, bytes).unwrap_err().kind().clone()
}

#[test]
fn scalars_and_groups_encode_canonically() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    let mut msg = DynamicMessage::new(desc.clone());
    msg.set_field_by_name("optional_int32", Value::I32(150)).unwrap();
    msg.set_field_by_name("optional_sint64", Value::I64(-1)).unwrap();
    msg.get_message_mut(&field(&desc, "optionalgroup"))
        .unwrap()
        .set_field_by_name("a", Value::I32(5))
        .unwrap();
    assert_eq!(
        msg.encode_to_vec(),
        [0x08, 0x96, 0x01, 0x10, 0x01, 0x53, 0x58, 0x05, 0x54]
    );
    assert_roundtrip(&msg);

    msg.set_field_by_name("optional_string", Value::String("héllo".into())).unwrap();
    msg.set_field_by_name("optional_bytes", Value::Bytes(vec![0, 0xff])).unwrap();
    msg.set_field_by_name("optional_double", Value::F64(-2.5)).unwrap();
    msg.set_field_by_name("optional_enum", Value::EnumNumber(1)).unwrap();
    msg.get_message_mut(&field(&desc, "child"))
        .unwrap()
        .set_field_by_name("optional_int32", Value::I32(-7))
        .unwrap();
    assert_roundtrip(&msg);
}

#[test]
fn packed_and_unpacked_are_both_accepted() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    // repeated_int32 arrives packed, packed_int32 arrives one tag per element
    let msg = DynamicMessage::decode(desc.clone(), &[0x3a, 0x02, 0x03, 0x04, 0x40, 0x01, 0x40, 0x02]).unwrap();
    assert_eq!(
        msg.get_field_by_name("repeated_int32").unwrap().as_list(),
        Some(&[Value::I32(3), Value::I32(4)][..])
    );
    assert_eq!(msg.field_size(&field(&desc, "packed_int32")), 2);
    assert_eq!(
        msg.encode_to_vec(),
        [0x38, 0x03, 0x38, 0x04, 0x42, 0x02, 0x01, 0x02]
    );
}

#[test]
fn unknown_fields_survive_a_roundtrip() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    // 1: 1, 50: 7, 51: fixed32 1, child { 60: "x" }
    let bytes = [
        0x08, 0x01, 0x90, 0x03, 0x07, 0x9d, 0x03, 0x01, 0x00, 0x00, 0x00, 0x4a, 0x04, 0xe2, 0x03,
        0x01, b'x',
    ];
    let mut msg = DynamicMessage::decode(desc.clone(), &bytes).unwrap();
    assert_eq!(msg.unknown_fields().len(), 2);
    assert_eq!(msg.unknown_fields().get(0).unwrap().value(), &UnknownValue::Varint(7));
    assert_eq!(msg.unknown_fields().get(1).unwrap().value(), &UnknownValue::Fixed32(1));
    let child = msg.get_field(&field(&desc, "child"));
    assert_eq!(child.as_message().unwrap().unknown_fields().len(), 1);

    msg.discard_unknown_fields();
    assert!(msg.unknown_fields().is_empty());
    assert_eq!(msg.encode_to_vec(), [0x08, 0x01, 0x4a, 0x00]);
}

#[test]
fn mismatched_wire_types_are_kept_as_unknown() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    let bytes = [0x0d, 0x01, 0x00, 0x00, 0x00];
    let msg = DynamicMessage::decode(desc.clone(), &bytes).unwrap();
    assert!(!msg.has_field(&field(&desc, "optional_int32")));
    assert_eq!(msg.unknown_fields().get(0).unwrap().value(), &UnknownValue::Fixed32(1));
    assert_eq!(msg.encode_to_vec(), bytes);
}

#[test]
fn closed_enums_divert_undeclared_values() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    let msg = DynamicMessage::decode(desc.clone(), &[0x30, 0x05]).unwrap();
    assert!(!msg.has_field(&field(&desc, "optional_enum")));
    let unknown = msg.unknown_fields().get(0).unwrap();
    assert_eq!((unknown.number(), unknown.value()), (6, &UnknownValue::Varint(5)));
    assert_eq!(msg.encode_to_vec(), [0x30, 0x05]);
}

#[test]
fn malformed_input() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    assert_eq!(decode_err(desc.clone(), &[0x08]), DecodeErrorKind::Truncated);
    assert!(matches!(
        decode_err(desc.clone(), &[0x4a, 0x05, 0x08]),
        DecodeErrorKind::LengthOutOfBounds(5)
    ));
    assert_eq!(decode_err(desc.clone(), &[0x0c]), DecodeErrorKind::UnexpectedEndGroup(1));
    assert_eq!(
        decode_err(desc.clone(), &[0x53, 0x5c]),
        DecodeErrorKind::MismatchedEndGroup { expected: 10, found: 11 }
    );
    assert_eq!(decode_err(desc.clone(), &[0x53]), DecodeErrorKind::MissingEndGroup(10));

    let err = DynamicMessage::decode(desc, &[0x1a, 0x01, 0xff]).unwrap_err();
    assert_eq!(
        err.kind(),
        &DecodeErrorKind::InvalidUtf8("pkg.TestAll.optional_string".to_owned())
    );
    assert_eq!(err.offset(), 1);
}

#[test]
fn required_fields() {
    let pool = pool();
    let required = message(&pool, "pkg.Required");
    let err = DynamicMessage::decode(required.clone(), &[0x08, 0x01]).unwrap_err();
    assert_eq!(
        err.kind(),
        &DecodeErrorKind::MissingRequiredFields(vec!["b".to_owned()])
    );
    let partial = DynamicMessage::decode_partial(required, &[0x08, 0x01]).unwrap();
    assert!(!partial.is_initialized());

    let desc = message(&pool, "pkg.TestAll");
    let ext = pool.find_extension_by_name("pkg.ext_required").unwrap();
    let mut msg = DynamicMessage::new(desc.clone());
    msg.get_message_mut(&ext).unwrap();
    msg.get_message_mut(&field(&desc, "child"))
        .unwrap()
        .get_message_mut(&ext)
        .unwrap()
        .set_field_by_name("a", Value::I32(1))
        .unwrap();
    assert_eq!(
        msg.find_initialization_errors(),
        ["child.(pkg.ext_required).b", "(pkg.ext_required).a", "(pkg.ext_required).b"]
    );
}

#[test]
fn extensions_live_beside_fields() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    let ext = pool.find_extension_by_name("pkg.ext_int").unwrap();
    assert_eq!(desc.find_extension_by_number(100), Some(ext.clone()));

    // 100: 7
    let mut msg = DynamicMessage::decode(desc.clone(), &[0xa0, 0x06, 0x07]).unwrap();
    assert_eq!(msg.get_field(&ext).as_i32(), Some(7));
    assert!(msg.unknown_fields().is_empty());
    msg.set_field_by_name("optional_int32", Value::I32(1)).unwrap();
    assert_eq!(
        msg.list_fields().iter().map(|f| f.full_name().to_owned()).collect::<Vec<_>>(),
        ["pkg.TestAll.optional_int32", "pkg.ext_int"]
    );
    assert_eq!(msg.to_string(), "optional_int32: 1\n[pkg.ext_int]: 7\n");
    assert_roundtrip(&msg);

    msg.clear_field(&ext);
    assert!(!msg.has_field(&ext));
}

#[test]
fn extensions_added_after_the_handle_was_taken() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    pool.add_file(&file_from_text(
        r#"name: "late.proto" package: "pkg" dependency: "unittest.proto"
           extension { name: "late" number: 105 label: LABEL_OPTIONAL type: TYPE_INT32 extendee: ".pkg.TestAll" }"#,
    ))
    .unwrap();
    let late = pool.find_extension_by_name("pkg.late").unwrap();
    assert_eq!(desc.find_extension_by_number(105), Some(late.clone()));
    assert_eq!(desc.find_extension_by_name("pkg.late"), Some(late.clone()));

    // 105: 7
    let msg = DynamicMessage::decode(desc.clone(), &[0xc8, 0x06, 0x07]).unwrap();
    assert_eq!(msg.get_field(&late).as_i32(), Some(7));
    assert!(msg.unknown_fields().is_empty());

    let mut parsed = desc.new_message();
    text_format::parse_from_str("[pkg.late]: 7", &mut parsed).unwrap();
    assert_eq!(parsed, msg);
}

#[test]
fn message_set_items() {
    let pool = pool();
    let set = message(&pool, "pkg.MessageSet");
    let item = pool.find_extension_by_name("pkg.SetItem.item").unwrap();
    let mut msg = DynamicMessage::new(set.clone());
    msg.get_message_mut(&item)
        .unwrap()
        .set_field_by_name("i", Value::I32(3))
        .unwrap();
    let bytes = msg.encode_to_vec();
    assert_eq!(bytes[0], 0x0b);
    assert_eq!(bytes.last(), Some(&0x0c));
    assert_roundtrip(&msg);

    // Item { type_id: 1000 message: { 1: 1 } }
    let unknown_item = [0x0b, 0x10, 0xe8, 0x07, 0x1a, 0x02, 0x08, 0x01, 0x0c];
    let msg = DynamicMessage::decode(set, &unknown_item).unwrap();
    assert_eq!(
        msg.unknown_fields().get(0).unwrap().value(),
        &UnknownValue::LengthDelimited(vec![0x08, 0x01])
    );
    assert_eq!(msg.encode_to_vec(), unknown_item);
}

fn nested(desc: &MessageDescriptor, depth: usize) -> Vec<u8> {
    let child = field(desc, "child");
    let mut root = DynamicMessage::new(desc.clone());
    let mut current = &mut root;
    for _ in 0..depth {
        current = current.get_message_mut(&child).unwrap();
    }
    current.set_field_by_name("value", Value::I32(1)).unwrap();
    root.encode_to_vec()
}

#[test]
fn recursion_limit() {
    let pool = pool();
    let node = message(&pool, "pkg.Node");
    assert!(DynamicMessage::decode(node.clone(), &nested(&node, 100)).is_ok());
    assert_eq!(
        decode_err(node.clone(), &nested(&node, 101)),
        DecodeErrorKind::RecursionLimitExceeded
    );

    let options = DecodeOptions {
        recursion_limit: 5,
        ..Default::default()
    };
    assert!(DynamicMessage::decode_with_options(node.clone(), &nested(&node, 5), &options).is_ok());
    assert!(DynamicMessage::decode_with_options(node.clone(), &nested(&node, 6), &options).is_err());
}

#[test]
fn merging_bytes_appends_and_overwrites() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    let mut msg = DynamicMessage::decode(desc.clone(), &[0x08, 0x01, 0x38, 0x01]).unwrap();
    msg.merge_from_bytes(&[0x08, 0x02, 0x38, 0x02]).unwrap();
    assert_eq!(msg.get_field_by_name("optional_int32").unwrap().as_i32(), Some(2));
    assert_eq!(msg.field_size(&field(&desc, "repeated_int32")), 2);

    let mut copy = DynamicMessage::new(desc);
    copy.copy_from(&msg).unwrap();
    assert_eq!(copy, msg);
}

#[test]
fn compiled_and_dynamic_messages_agree() {
    let proto = file_from_text(UNITTEST);
    let desc = DescriptorPool::bootstrap()
        .find_message_by_name("google.protobuf.FileDescriptorProto")
        .unwrap();
    let dynamic = DynamicMessage::from_message(desc, &proto).unwrap();
    assert_eq!(dynamic.encode_to_vec(), proto.encode_to_vec());
    assert!(dynamic.unknown_fields().is_empty());
    assert_eq!(dynamic.transcode_to::<FileDescriptorProto>().unwrap(), proto);
}

#[test]
fn streaming_decode() {
    let pool = pool();
    let desc = message(&pool, "pkg.TestAll");
    let mut source = DynamicMessage::new(desc.clone());
    source.set_field_by_name("optional_string", Value::String("x".repeat(10_000))).unwrap();
    let bytes = source.encode_to_vec();

    let mut from_read = DynamicMessage::new(desc.clone());
    from_read
        .decode_from_read(&mut std::io::Cursor::new(&bytes), DecodeOptions::default())
        .unwrap();
    assert_eq!(from_read, source);

    let mut from_async = DynamicMessage::new(desc.clone());
    futures::executor::block_on(
        from_async.decode_from_async_read(&mut futures::io::Cursor::new(&bytes), DecodeOptions::default()),
    )
    .unwrap();
    assert_eq!(from_async, source);

    let small = DecodeOptions {
        size_limit: 100,
        ..Default::default()
    };
    let mut too_large = DynamicMessage::new(desc.clone());
    let err = too_large
        .decode_from_read(&mut std::io::Cursor::new(&bytes), small)
        .unwrap_err();
    assert!(matches!(
        err,
        protodyn::Error::Decode(ref e) if matches!(e.kind(), DecodeErrorKind::TooLarge(_))
    ));
    assert!(DynamicMessage::decode_with_options(desc, &bytes, &small).is_err());
}
