//! Build-time validation: each rule reports one stably worded error at the
//! offending element, and a failed build leaves the pool untouched.

use protodyn::DescriptorPool;
use protodyn::google::protobuf::descriptor_file_proto;
use protodyn::test_utils::{MockErrorCollector, file_from_text};
use protodyn::unknown_fields::UnknownValue;

/// Builds `text` into `pool` and returns what the collector saw.
fn build_errors(pool: &DescriptorPool, text: &str) -> String {
    let mut collector = MockErrorCollector::new();
    let built = pool.add_file_with_collector(&file_from_text(text), &mut collector);
    let errors = collector.text();
    assert_eq!(built.is_none(), !errors.is_empty() && !errors.contains("WARNING"), "{errors}");
    errors
}

fn errors_in_fresh_pool(text: &str) -> String {
    build_errors(&DescriptorPool::new(), text)
}

fn build_ok(pool: &DescriptorPool, text: &str) {
    if let Err(err) = pool.add_file(&file_from_text(text)) {
        panic!("{err}");
    }
}

#[test]
fn duplicate_symbols() {
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo" }
               message_type { name: "Foo" }"#
        ),
        "foo.proto: Foo: NAME: \"Foo\" is already defined.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto" package: "pkg"
               message_type { name: "Foo" nested_type { name: "Bar" } nested_type { name: "Bar" } }"#
        ),
        "foo.proto: pkg.Foo.Bar: NAME: \"Bar\" is already defined in \"pkg.Foo\".\n"
    );

    let pool = DescriptorPool::new();
    build_ok(&pool, r#"name: "bar.proto" message_type { name: "Foo" } message_type { name: "foo" }"#);
    assert_eq!(
        build_errors(&pool, r#"name: "foo.proto" message_type { name: "Foo" }"#),
        "foo.proto: Foo: NAME: \"Foo\" is already defined in file \"bar.proto\".\n"
    );
    assert_eq!(
        build_errors(&pool, r#"name: "foo.proto" package: "foo""#),
        "foo.proto: foo: NAME: \"foo\" is already defined (as something other than a package) in file \
         \"bar.proto\".\n"
    );
}

#[test]
fn enum_values_are_siblings_of_their_type() {
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto" package: "pkg"
               enum_type { name: "A" value { name: "FOO" number: 0 } }
               enum_type { name: "B" value { name: "FOO" number: 0 } }"#
        ),
        "foo.proto: pkg.FOO: NAME: \"FOO\" is already defined in \"pkg\".\n\
         foo.proto: pkg.FOO: NAME: Note that enum values use C++ scoping rules, meaning that enum values are \
         siblings of their type, not children of it.  Therefore, \"FOO\" must be unique within \"pkg\", not just \
         within \"B\".\n"
    );
}

#[test]
fn names_must_be_identifiers() {
    assert_eq!(
        errors_in_fresh_pool(r#"name: "foo.proto" message_type { name: "$" }"#),
        "foo.proto: $: NAME: \"$\" is not a valid identifier.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(r#"package: "foo""#),
        ": : OTHER: Missing field: FileDescriptorProto.name.\n"
    );
}

#[test]
fn imports() {
    assert_eq!(
        errors_in_fresh_pool(r#"name: "foo.proto" dependency: "bar.proto""#),
        "foo.proto: foo.proto: OTHER: Import \"bar.proto\" has not been loaded.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(r#"name: "foo.proto" dependency: "foo.proto""#),
        "foo.proto: foo.proto: OTHER: File recursively imports itself: foo.proto -> foo.proto\n"
    );

    let pool = DescriptorPool::new();
    build_ok(&pool, r#"name: "bar.proto""#);
    assert_eq!(
        build_errors(
            &pool,
            r#"name: "foo.proto" dependency: "bar.proto" dependency: "bar.proto""#
        ),
        "foo.proto: foo.proto: OTHER: Import \"bar.proto\" was listed twice.\n"
    );
    assert_eq!(
        build_errors(
            &pool,
            r#"name: "foo.proto" dependency: "bar.proto" public_dependency: 1"#
        ),
        "foo.proto: foo.proto: OTHER: Invalid public dependency index.\n"
    );
}

#[test]
fn unimported_types_get_a_hint() {
    let pool = DescriptorPool::new();
    build_ok(&pool, r#"name: "bar.proto" message_type { name: "Bar" }"#);
    assert_eq!(
        build_errors(
            &pool,
            r#"name: "foo.proto"
               message_type { name: "Foo" field { name: "bar" number: 1 label: LABEL_OPTIONAL type_name: "Bar" } }"#
        ),
        "foo.proto: Foo.bar: TYPE: \"Bar\" seems to be defined in \"bar.proto\", which is not imported by \
         \"foo.proto\".  To use it here, please add the necessary import.\n"
    );
    build_ok(
        &pool,
        r#"name: "foo.proto" dependency: "bar.proto"
           message_type { name: "Foo" field { name: "bar" number: 1 label: LABEL_OPTIONAL type_name: "Bar" } }"#,
    );
    let bar = pool.find_message_by_name("Foo").unwrap().get_field_by_name("bar").unwrap();
    assert_eq!(bar.message_type().unwrap().full_name(), "Bar");
}

#[test]
fn public_imports_are_transitive() {
    let pool = DescriptorPool::new();
    build_ok(&pool, r#"name: "base.proto" message_type { name: "Base" }"#);
    build_ok(&pool, r#"name: "forward.proto" dependency: "base.proto" public_dependency: 0"#);
    build_ok(
        &pool,
        r#"name: "user.proto" dependency: "forward.proto"
           message_type { name: "User" field { name: "b" number: 1 label: LABEL_OPTIONAL type_name: "Base" } }"#,
    );
}

#[test]
fn inner_scopes_shadow_outer_ones() {
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto" package: "outer.inner"
               message_type { name: "Bar" }
               message_type { name: "Foo"
                 field { name: "bar" number: 1 label: LABEL_OPTIONAL type_name: "inner.Baz" }
               }"#
        ),
        "foo.proto: outer.inner.Foo.bar: TYPE: \"inner.Baz\" is resolved to \"outer.inner.Baz\", which is not \
         defined. The innermost scope is searched first in name resolution. Consider using a leading \
         '.'(i.e., \".inner.Baz\") to start from the outermost scope.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo" field { name: "bar" number: 1 label: LABEL_OPTIONAL type_name: "Bar" } }"#
        ),
        "foo.proto: Foo.bar: TYPE: \"Bar\" is not defined.\n"
    );
}

#[test]
fn field_numbers() {
    let cases = [
        ("0", "Field numbers must be positive integers."),
        ("536870912", "Field numbers cannot be greater than 536870911."),
        (
            "19000",
            "Field numbers 19000 through 19999 are reserved for the protocol buffer library implementation.",
        ),
    ];
    for (number, message) in cases {
        let text = format!(
            r#"name: "foo.proto"
               message_type {{ name: "Foo" field {{ name: "foo" number: {number} label: LABEL_OPTIONAL type: TYPE_INT32 }} }}"#
        );
        assert_eq!(errors_in_fresh_pool(&text), format!("foo.proto: Foo.foo: NUMBER: {message}\n"));
    }

    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo"
                 field { name: "foo" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
                 field { name: "bar" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
               }"#
        ),
        "foo.proto: Foo.bar: NUMBER: Field number 1 has already been used in \"Foo\" by field \"foo\".\n"
    );
}

#[test]
fn extension_ranges() {
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo"
                 field { name: "foo" number: 10 label: LABEL_OPTIONAL type: TYPE_INT32 }
                 extension_range { start: 10 end: 20 }
               }"#
        ),
        "foo.proto: Foo.foo: NUMBER: Extension range 10 to 19 includes field \"foo\" (10).\n"
    );
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo"
                 extension_range { start: 10 end: 20 }
                 extension_range { start: 19 end: 21 }
               }"#
        ),
        "foo.proto: Foo: NUMBER: Extension range 19 to 20 overlaps with already-defined range 10 to 19.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo" extension_range { start: 10 end: 20 } }
               extension { name: "bar" number: 5 label: LABEL_OPTIONAL type: TYPE_INT32 extendee: "Foo" }"#
        ),
        "foo.proto: bar: NUMBER: \"Foo\" does not declare 5 as an extension number.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo" extension_range { start: 10 end: 20 } }
               extension { name: "bar" number: 10 label: LABEL_REQUIRED type: TYPE_INT32 extendee: "Foo" }"#
        ),
        "foo.proto: bar: TYPE: Message extensions cannot have required fields.\n"
    );
}

#[test]
fn oneofs() {
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo"
                 field { name: "a" number: 1 label: LABEL_REPEATED type: TYPE_INT32 oneof_index: 0 }
                 oneof_decl { name: "o" }
               }"#
        ),
        "foo.proto: Foo.a: NAME: Fields of oneofs must themselves have label LABEL_OPTIONAL.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo"
                 field { name: "a" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 oneof_index: 1 }
                 oneof_decl { name: "o" }
               }"#
        ),
        "foo.proto: Foo.a: OTHER: FieldDescriptorProto.oneof_index 1 is out of range for type \"Foo\".\n\
         foo.proto: Foo.o: NAME: Oneof must have at least one field.\n"
    );
}

#[test]
fn default_values() {
    let cases = [
        ("TYPE_INT32", "abc", "Couldn't parse default value \"abc\"."),
        ("TYPE_BOOL", "yes", "Boolean default must be true or false."),
    ];
    for (ty, default, message) in cases {
        let text = format!(
            r#"name: "foo.proto"
               message_type {{ name: "Foo"
                 field {{ name: "a" number: 1 label: LABEL_OPTIONAL type: {ty} default_value: "{default}" }}
               }}"#
        );
        assert_eq!(errors_in_fresh_pool(&text), format!("foo.proto: Foo.a: DEFAULT_VALUE: {message}\n"));
    }

    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               enum_type { name: "E" value { name: "A" number: 0 } }
               message_type { name: "Foo"
                 field { name: "e" number: 1 label: LABEL_OPTIONAL type: TYPE_ENUM type_name: "E" default_value: "B" }
               }"#
        ),
        "foo.proto: Foo.e: DEFAULT_VALUE: Enum type \"E\" has no value named \"B\".\n"
    );

    let pool = DescriptorPool::new();
    build_ok(
        &pool,
        r#"name: "foo.proto"
           enum_type { name: "E" value { name: "A" number: 0 } value { name: "B" number: 7 } }
           message_type { name: "Foo"
             field { name: "e" number: 1 label: LABEL_OPTIONAL type: TYPE_ENUM type_name: "E" default_value: "B" }
             field { name: "h" number: 2 label: LABEL_OPTIONAL type: TYPE_INT32 default_value: "0x10" }
           }"#,
    );
    let foo = pool.find_message_by_name("Foo").unwrap();
    assert_eq!(foo.get_field_by_name("e").unwrap().default_value().as_enum_number(), Some(7));
    assert_eq!(foo.get_field_by_name("h").unwrap().default_value().as_i32(), Some(16));
}

#[test]
fn enums() {
    assert_eq!(
        errors_in_fresh_pool(r#"name: "foo.proto" enum_type { name: "E" }"#),
        "foo.proto: E: NAME: Enums must contain at least one value.\n"
    );
    let aliased = r#"name: "foo.proto"
        enum_type { name: "E" value { name: "A" number: 0 } value { name: "B" number: 0 } }"#;
    assert_eq!(
        errors_in_fresh_pool(aliased),
        "foo.proto: E: NUMBER: \"B\" uses the same enum value as \"A\". If this is intended, set \
         'option allow_alias = true;' to the enum definition.\n"
    );
    build_ok(
        &DescriptorPool::new(),
        r#"name: "foo.proto"
           enum_type { name: "E" value { name: "A" number: 0 } value { name: "B" number: 0 }
                       options { allow_alias: true } }"#,
    );
}

#[test]
fn field_shapes() {
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo"
                 field { name: "a" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 options { packed: true } }
               }"#
        ),
        "foo.proto: Foo.a: TYPE: [packed = true] can only be specified for repeated primitive fields.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo" field { name: "a" number: 1 label: LABEL_OPTIONAL type: TYPE_MESSAGE } }"#
        ),
        "foo.proto: Foo.a: TYPE: Field with message or enum type missing type_name.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo"
                 field { name: "a" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 type_name: "Foo" }
               }"#
        ),
        "foo.proto: Foo.a: TYPE: Field with primitive type has type_name.\n"
    );
}

#[test]
fn message_sets() {
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo"
                 field { name: "a" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
                 extension_range { start: 4 end: 2147483647 }
                 options { message_set_wire_format: true }
               }"#
        ),
        "foo.proto: Foo.a: NAME: MessageSets cannot have fields, only extensions.\n"
    );
    assert_eq!(
        errors_in_fresh_pool(
            r#"name: "foo.proto"
               message_type { name: "Foo"
                 extension_range { start: 4 end: 2147483647 }
                 options { message_set_wire_format: true }
               }
               extension { name: "bar" number: 5 label: LABEL_OPTIONAL type: TYPE_INT32 extendee: "Foo" }"#
        ),
        "foo.proto: bar: TYPE: Extensions of MessageSets must be optional messages.\n"
    );
}

#[test]
fn lite_files() {
    let pool = DescriptorPool::new();
    build_ok(&pool, r#"name: "bar.proto" options { optimize_for: LITE_RUNTIME }"#);
    assert_eq!(
        build_errors(&pool, r#"name: "foo.proto" dependency: "bar.proto""#),
        "foo.proto: foo.proto: OTHER: Files that do not use optimize_for = LITE_RUNTIME cannot import files \
         which do use this option.  This file is not lite, but it imports \"bar.proto\" which is.\n"
    );
    build_ok(
        &pool,
        r#"name: "foo.proto" dependency: "bar.proto" options { optimize_for: LITE_RUNTIME }"#,
    );
}

#[test]
fn custom_options_land_in_unknown_fields() {
    let pool = DescriptorPool::new();
    pool.add_file(&descriptor_file_proto()).unwrap();
    build_ok(
        &pool,
        r#"name: "custom.proto" dependency: "google/protobuf/descriptor.proto"
           extension { name: "my_opt" number: 50000 label: LABEL_OPTIONAL type: TYPE_INT32
                       extendee: ".google.protobuf.MessageOptions" }
           message_type { name: "Foo"
             options {
               uninterpreted_option { name { name_part: "my_opt" is_extension: true } positive_int_value: 42 }
               uninterpreted_option { name { name_part: "deprecated" is_extension: false } identifier_value: "true" }
             }
           }"#,
    );
    let options = pool.find_message_by_name("Foo").unwrap().options().clone();
    assert!(options.uninterpreted_option.is_empty());
    assert!(options.deprecated());
    let fields: Vec<_> = options.unknown_fields.iter().collect();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].number(), 50000);
    assert_eq!(fields[0].value(), &UnknownValue::Varint(42));

    assert_eq!(
        build_errors(
            &pool,
            r#"name: "bad.proto" dependency: "google/protobuf/descriptor.proto"
               message_type { name: "Bad"
                 options { uninterpreted_option { name { name_part: "baaz.bar" is_extension: true } identifier_value: "x" } }
               }"#
        ),
        "bad.proto: Bad: OPTION_NAME: Option \"(baaz.bar)\" unknown.\n"
    );
}

#[test]
fn failed_build_can_be_retried() {
    let pool = DescriptorPool::new();
    let errors = build_errors(
        &pool,
        r#"name: "foo.proto" package: "pkg"
           message_type { name: "Foo" field { name: "x" number: 1 label: LABEL_OPTIONAL type_name: "Missing" } }"#,
    );
    assert!(!errors.is_empty());
    assert!(pool.find_file_by_name("foo.proto").is_none());
    assert!(pool.find_message_by_name("pkg.Foo").is_none());
    assert!(pool.files().is_empty());
    build_ok(
        &pool,
        r#"name: "foo.proto" package: "pkg"
           message_type { name: "Foo" field { name: "x" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 } }"#,
    );
    assert!(pool.find_field_by_name("pkg.Foo.x").is_some());
}

#[test]
fn unknown_dependencies_become_placeholders() {
    let pool = DescriptorPool::new();
    pool.allow_unknown_dependencies();
    build_ok(
        &pool,
        r#"name: "foo.proto" dependency: "missing.proto"
           message_type { name: "Foo"
             field { name: "ext" number: 1 label: LABEL_OPTIONAL type: TYPE_MESSAGE type_name: ".other.Thing" }
           }"#,
    );
    let foo = pool.find_message_by_name("Foo").unwrap();
    let thing = foo.get_field_by_name("ext").unwrap().message_type().unwrap();
    assert!(thing.is_placeholder());
    assert_eq!(thing.full_name(), "other.Thing");
    assert_eq!(pool.files().len(), 1);
}
