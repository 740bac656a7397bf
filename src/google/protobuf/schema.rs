//! `google/protobuf/descriptor.proto` as a [`FileDescriptorProto`], so a pool
//! can describe its own option messages. Only the subset mirrored by the
//! structs in the parent module is listed.

use super::descriptor_proto::ExtensionRange;
use super::field_descriptor_proto::{Label, Type};
use super::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto,
};

const OPTIONAL: Label = Label::Optional;
const REQUIRED: Label = Label::Required;
const REPEATED: Label = Label::Repeated;

fn scalar(name: &str, number: i32, label: Label, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(label),
        r#type: Some(ty),
        ..Default::default()
    }
}

fn typed(name: &str, number: i32, label: Label, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(format!(".google.protobuf.{type_name}")),
        ..scalar(name, number, label, ty)
    }
}

fn message(name: &str, number: i32, label: Label, type_name: &str) -> FieldDescriptorProto {
    typed(name, number, label, Type::Message, type_name)
}

fn enumeration(
    name: &str,
    number: i32,
    type_name: &str,
    default_value: &str,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        default_value: Some(default_value.to_owned()),
        ..typed(name, number, OPTIONAL, Type::Enum, type_name)
    }
}

fn string(name: &str, number: i32) -> FieldDescriptorProto {
    scalar(name, number, OPTIONAL, Type::String)
}

fn boolean(name: &str, number: i32) -> FieldDescriptorProto {
    FieldDescriptorProto {
        default_value: Some("false".to_owned()),
        ..scalar(name, number, OPTIONAL, Type::Bool)
    }
}

fn message_type(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field,
        ..Default::default()
    }
}

fn enum_type(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_owned()),
        value: values
            .iter()
            .map(|&(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_owned()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// Options messages: the listed fields, `uninterpreted_option = 999` and an
/// extension range covering everything from 1000 up.
fn options_type(name: &str, mut field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    field.push(message("uninterpreted_option", 999, REPEATED, "UninterpretedOption"));
    DescriptorProto {
        extension_range: vec![ExtensionRange {
            start: Some(1000),
            end: Some(crate::wire::MAX_FIELD_NUMBER + 1),
            ..Default::default()
        }],
        ..message_type(name, field)
    }
}

fn range_type(name: &str) -> DescriptorProto {
    message_type(
        name,
        vec![
            scalar("start", 1, OPTIONAL, Type::Int32),
            scalar("end", 2, OPTIONAL, Type::Int32),
        ],
    )
}

pub fn descriptor_file_proto() -> FileDescriptorProto {
    let file_descriptor_set = message_type(
        "FileDescriptorSet",
        vec![message("file", 1, REPEATED, "FileDescriptorProto")],
    );

    let file_descriptor_proto = message_type(
        "FileDescriptorProto",
        vec![
            string("name", 1),
            string("package", 2),
            scalar("dependency", 3, REPEATED, Type::String),
            scalar("public_dependency", 10, REPEATED, Type::Int32),
            scalar("weak_dependency", 11, REPEATED, Type::Int32),
            message("message_type", 4, REPEATED, "DescriptorProto"),
            message("enum_type", 5, REPEATED, "EnumDescriptorProto"),
            message("service", 6, REPEATED, "ServiceDescriptorProto"),
            message("extension", 7, REPEATED, "FieldDescriptorProto"),
            message("options", 8, OPTIONAL, "FileOptions"),
            string("syntax", 12),
        ],
    );

    let descriptor_proto = DescriptorProto {
        nested_type: vec![range_type("ExtensionRange"), range_type("ReservedRange")],
        ..message_type(
            "DescriptorProto",
            vec![
                string("name", 1),
                message("field", 2, REPEATED, "FieldDescriptorProto"),
                message("extension", 6, REPEATED, "FieldDescriptorProto"),
                message("nested_type", 3, REPEATED, "DescriptorProto"),
                message("enum_type", 4, REPEATED, "EnumDescriptorProto"),
                message("extension_range", 5, REPEATED, "DescriptorProto.ExtensionRange"),
                message("oneof_decl", 8, REPEATED, "OneofDescriptorProto"),
                message("options", 7, OPTIONAL, "MessageOptions"),
                message("reserved_range", 9, REPEATED, "DescriptorProto.ReservedRange"),
                scalar("reserved_name", 10, REPEATED, Type::String),
            ],
        )
    };

    let field_descriptor_proto = DescriptorProto {
        enum_type: vec![
            enum_type(
                "Type",
                &[
                    ("TYPE_DOUBLE", 1),
                    ("TYPE_FLOAT", 2),
                    ("TYPE_INT64", 3),
                    ("TYPE_UINT64", 4),
                    ("TYPE_INT32", 5),
                    ("TYPE_FIXED64", 6),
                    ("TYPE_FIXED32", 7),
                    ("TYPE_BOOL", 8),
                    ("TYPE_STRING", 9),
                    ("TYPE_GROUP", 10),
                    ("TYPE_MESSAGE", 11),
                    ("TYPE_BYTES", 12),
                    ("TYPE_UINT32", 13),
                    ("TYPE_ENUM", 14),
                    ("TYPE_SFIXED32", 15),
                    ("TYPE_SFIXED64", 16),
                    ("TYPE_SINT32", 17),
                    ("TYPE_SINT64", 18),
                ],
            ),
            enum_type(
                "Label",
                &[("LABEL_OPTIONAL", 1), ("LABEL_REQUIRED", 2), ("LABEL_REPEATED", 3)],
            ),
        ],
        ..message_type(
            "FieldDescriptorProto",
            vec![
                string("name", 1),
                scalar("number", 3, OPTIONAL, Type::Int32),
                typed("label", 4, OPTIONAL, Type::Enum, "FieldDescriptorProto.Label"),
                typed("type", 5, OPTIONAL, Type::Enum, "FieldDescriptorProto.Type"),
                string("type_name", 6),
                string("extendee", 2),
                string("default_value", 7),
                scalar("oneof_index", 9, OPTIONAL, Type::Int32),
                string("json_name", 10),
                message("options", 8, OPTIONAL, "FieldOptions"),
            ],
        )
    };

    let oneof_descriptor_proto = message_type(
        "OneofDescriptorProto",
        vec![string("name", 1), message("options", 2, OPTIONAL, "OneofOptions")],
    );

    let enum_descriptor_proto = message_type(
        "EnumDescriptorProto",
        vec![
            string("name", 1),
            message("value", 2, REPEATED, "EnumValueDescriptorProto"),
            message("options", 3, OPTIONAL, "EnumOptions"),
        ],
    );

    let enum_value_descriptor_proto = message_type(
        "EnumValueDescriptorProto",
        vec![
            string("name", 1),
            scalar("number", 2, OPTIONAL, Type::Int32),
            message("options", 3, OPTIONAL, "EnumValueOptions"),
        ],
    );

    let service_descriptor_proto = message_type(
        "ServiceDescriptorProto",
        vec![
            string("name", 1),
            message("method", 2, REPEATED, "MethodDescriptorProto"),
            message("options", 3, OPTIONAL, "ServiceOptions"),
        ],
    );

    let method_descriptor_proto = message_type(
        "MethodDescriptorProto",
        vec![
            string("name", 1),
            string("input_type", 2),
            string("output_type", 3),
            message("options", 4, OPTIONAL, "MethodOptions"),
            boolean("client_streaming", 5),
            boolean("server_streaming", 6),
        ],
    );

    let file_options = DescriptorProto {
        enum_type: vec![enum_type(
            "OptimizeMode",
            &[("SPEED", 1), ("CODE_SIZE", 2), ("LITE_RUNTIME", 3)],
        )],
        ..options_type(
            "FileOptions",
            vec![
                string("java_package", 1),
                string("java_outer_classname", 8),
                boolean("java_multiple_files", 10),
                string("go_package", 11),
                enumeration("optimize_for", 9, "FileOptions.OptimizeMode", "SPEED"),
                boolean("cc_generic_services", 16),
                boolean("java_generic_services", 17),
                boolean("py_generic_services", 18),
                boolean("deprecated", 23),
                boolean("cc_enable_arenas", 31),
                string("objc_class_prefix", 36),
                string("csharp_namespace", 37),
            ],
        )
    };

    let message_options = options_type(
        "MessageOptions",
        vec![
            boolean("message_set_wire_format", 1),
            boolean("no_standard_descriptor_accessor", 2),
            boolean("deprecated", 3),
            boolean("map_entry", 7),
        ],
    );

    let field_options = DescriptorProto {
        enum_type: vec![
            enum_type("CType", &[("STRING", 0), ("CORD", 1), ("STRING_PIECE", 2)]),
            enum_type("JSType", &[("JS_NORMAL", 0), ("JS_STRING", 1), ("JS_NUMBER", 2)]),
        ],
        ..options_type(
            "FieldOptions",
            vec![
                enumeration("ctype", 1, "FieldOptions.CType", "STRING"),
                boolean("packed", 2),
                enumeration("jstype", 6, "FieldOptions.JSType", "JS_NORMAL"),
                boolean("lazy", 5),
                boolean("deprecated", 3),
                boolean("weak", 10),
            ],
        )
    };

    let oneof_options = options_type("OneofOptions", Vec::new());
    let enum_options = options_type(
        "EnumOptions",
        vec![boolean("allow_alias", 2), boolean("deprecated", 3)],
    );
    let enum_value_options = options_type("EnumValueOptions", vec![boolean("deprecated", 1)]);
    let service_options = options_type("ServiceOptions", vec![boolean("deprecated", 33)]);
    let method_options = options_type("MethodOptions", vec![boolean("deprecated", 33)]);

    let uninterpreted_option = DescriptorProto {
        nested_type: vec![message_type(
            "NamePart",
            vec![
                scalar("name_part", 1, REQUIRED, Type::String),
                scalar("is_extension", 2, REQUIRED, Type::Bool),
            ],
        )],
        ..message_type(
            "UninterpretedOption",
            vec![
                message("name", 2, REPEATED, "UninterpretedOption.NamePart"),
                string("identifier_value", 3),
                scalar("positive_int_value", 4, OPTIONAL, Type::Uint64),
                scalar("negative_int_value", 5, OPTIONAL, Type::Int64),
                scalar("double_value", 6, OPTIONAL, Type::Double),
                scalar("string_value", 7, OPTIONAL, Type::Bytes),
                string("aggregate_value", 8),
            ],
        )
    };

    FileDescriptorProto {
        name: Some("google/protobuf/descriptor.proto".to_owned()),
        package: Some("google.protobuf".to_owned()),
        message_type: vec![
            file_descriptor_set,
            file_descriptor_proto,
            descriptor_proto,
            field_descriptor_proto,
            oneof_descriptor_proto,
            enum_descriptor_proto,
            enum_value_descriptor_proto,
            service_descriptor_proto,
            method_descriptor_proto,
            file_options,
            message_options,
            field_options,
            oneof_options,
            enum_options,
            enum_value_options,
            service_options,
            method_options,
            uninterpreted_option,
        ],
        ..Default::default()
    }
}
