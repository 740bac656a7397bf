//! The schema-describing messages from `google/protobuf/descriptor.proto`,
//! hand written against [`Message`].
//!
//! Every message keeps the fields it does not know in `unknown_fields`;
//! interpreted custom options end up there as well.

use crate::Message;
use crate::decoding::{CodedReader, DecodeError};
use crate::encoding::CodedWriter;
use crate::unknown_fields::UnknownFieldSet;
use crate::wire::{Tag, WireType};

mod schema;

pub use schema::descriptor_file_proto;

macro_rules! proto_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal => $text:literal,)* }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i32)]
        pub enum $name {
            $($variant = $value,)*
        }

        impl TryFrom<i32> for $name {
            type Error = i32;

            fn try_from(value: i32) -> Result<Self, i32> {
                match value {
                    $($value => Ok($name::$variant),)*
                    other => Err(other),
                }
            }
        }

        impl $name {
            /// The value name as written in `.proto` files.
            pub fn as_str_name(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)*
                }
            }

            pub fn from_str_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some($name::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

macro_rules! accessors {
    () => {};
    ($field:ident: &str, $($rest:tt)*) => {
        pub fn $field(&self) -> &str {
            self.$field.as_deref().unwrap_or_default()
        }
        accessors!($($rest)*);
    };
    ($field:ident: $ty:ty = $default:expr, $($rest:tt)*) => {
        pub fn $field(&self) -> $ty {
            self.$field.unwrap_or($default)
        }
        accessors!($($rest)*);
    };
}

/// Stores a decoded enum number, or keeps it as unknown when the value is
/// not declared.
fn merge_enum<E: TryFrom<i32>>(
    slot: &mut Option<E>,
    unknown: &mut UnknownFieldSet,
    number: u32,
    raw: u64,
) {
    match E::try_from(raw as i32) {
        Ok(value) => *slot = Some(value),
        Err(_) => unknown.add_varint(number, raw),
    }
}

const LEN: WireType = WireType::LengthDelimited;
const VARINT: WireType = WireType::Varint;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileDescriptorSet {
    pub file: Vec<FileDescriptorProto>,
    pub unknown_fields: UnknownFieldSet,
}

impl Message for FileDescriptorSet {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => r.read_message(push_default(&mut self.file))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        for file in &self.file {
            w.write_message_field(1, file);
        }
        self.unknown_fields.encode(w);
    }
}

fn push_default<T: Default>(items: &mut Vec<T>) -> &mut T {
    items.push(T::default());
    let last = items.len() - 1;
    &mut items[last]
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileDescriptorProto {
    pub name: Option<String>,
    pub package: Option<String>,
    pub dependency: Vec<String>,
    pub message_type: Vec<DescriptorProto>,
    pub enum_type: Vec<EnumDescriptorProto>,
    pub service: Vec<ServiceDescriptorProto>,
    pub extension: Vec<FieldDescriptorProto>,
    pub options: Option<FileOptions>,
    pub public_dependency: Vec<i32>,
    pub weak_dependency: Vec<i32>,
    pub syntax: Option<String>,
    pub unknown_fields: UnknownFieldSet,
}

impl FileDescriptorProto {
    accessors!(name: &str, package: &str, syntax: &str,);
}

impl Message for FileDescriptorProto {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => self.name = Some(r.read_string()?),
            (2, LEN) => self.package = Some(r.read_string()?),
            (3, LEN) => self.dependency.push(r.read_string()?),
            (4, LEN) => r.read_message(push_default(&mut self.message_type))?,
            (5, LEN) => r.read_message(push_default(&mut self.enum_type))?,
            (6, LEN) => r.read_message(push_default(&mut self.service))?,
            (7, LEN) => r.read_message(push_default(&mut self.extension))?,
            (8, LEN) => r.read_message(self.options.get_or_insert_with(Default::default))?,
            (10, VARINT) => self.public_dependency.push(r.read_int32()?),
            (10, LEN) => r.read_packed(|r| {
                self.public_dependency.push(r.read_int32()?);
                Ok(())
            })?,
            (11, VARINT) => self.weak_dependency.push(r.read_int32()?),
            (11, LEN) => r.read_packed(|r| {
                self.weak_dependency.push(r.read_int32()?);
                Ok(())
            })?,
            (12, LEN) => self.syntax = Some(r.read_string()?),
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = &self.name {
            w.write_string_field(1, v);
        }
        if let Some(v) = &self.package {
            w.write_string_field(2, v);
        }
        for v in &self.dependency {
            w.write_string_field(3, v);
        }
        for v in &self.message_type {
            w.write_message_field(4, v);
        }
        for v in &self.enum_type {
            w.write_message_field(5, v);
        }
        for v in &self.service {
            w.write_message_field(6, v);
        }
        for v in &self.extension {
            w.write_message_field(7, v);
        }
        if let Some(v) = &self.options {
            w.write_message_field(8, v);
        }
        for v in &self.public_dependency {
            w.write_int32_field(10, *v);
        }
        for v in &self.weak_dependency {
            w.write_int32_field(11, *v);
        }
        if let Some(v) = &self.syntax {
            w.write_string_field(12, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DescriptorProto {
    pub name: Option<String>,
    pub field: Vec<FieldDescriptorProto>,
    pub nested_type: Vec<DescriptorProto>,
    pub enum_type: Vec<EnumDescriptorProto>,
    pub extension_range: Vec<descriptor_proto::ExtensionRange>,
    pub extension: Vec<FieldDescriptorProto>,
    pub options: Option<MessageOptions>,
    pub oneof_decl: Vec<OneofDescriptorProto>,
    pub reserved_range: Vec<descriptor_proto::ReservedRange>,
    pub reserved_name: Vec<String>,
    pub unknown_fields: UnknownFieldSet,
}

impl DescriptorProto {
    accessors!(name: &str,);
}

impl Message for DescriptorProto {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => self.name = Some(r.read_string()?),
            (2, LEN) => r.read_message(push_default(&mut self.field))?,
            (3, LEN) => r.read_message(push_default(&mut self.nested_type))?,
            (4, LEN) => r.read_message(push_default(&mut self.enum_type))?,
            (5, LEN) => r.read_message(push_default(&mut self.extension_range))?,
            (6, LEN) => r.read_message(push_default(&mut self.extension))?,
            (7, LEN) => r.read_message(self.options.get_or_insert_with(Default::default))?,
            (8, LEN) => r.read_message(push_default(&mut self.oneof_decl))?,
            (9, LEN) => r.read_message(push_default(&mut self.reserved_range))?,
            (10, LEN) => self.reserved_name.push(r.read_string()?),
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = &self.name {
            w.write_string_field(1, v);
        }
        for v in &self.field {
            w.write_message_field(2, v);
        }
        for v in &self.nested_type {
            w.write_message_field(3, v);
        }
        for v in &self.enum_type {
            w.write_message_field(4, v);
        }
        for v in &self.extension_range {
            w.write_message_field(5, v);
        }
        for v in &self.extension {
            w.write_message_field(6, v);
        }
        if let Some(v) = &self.options {
            w.write_message_field(7, v);
        }
        for v in &self.oneof_decl {
            w.write_message_field(8, v);
        }
        for v in &self.reserved_range {
            w.write_message_field(9, v);
        }
        for v in &self.reserved_name {
            w.write_string_field(10, v);
        }
        self.unknown_fields.encode(w);
    }
}

pub mod descriptor_proto {
    use super::*;

    /// `[start, end)` of field numbers open to extensions.
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct ExtensionRange {
        pub start: Option<i32>,
        pub end: Option<i32>,
        pub unknown_fields: UnknownFieldSet,
    }

    impl ExtensionRange {
        accessors!(start: i32 = 0, end: i32 = 0,);
    }

    impl Message for ExtensionRange {
        fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
            match (tag.field_number(), tag.wire_type()) {
                (1, VARINT) => self.start = Some(r.read_int32()?),
                (2, VARINT) => self.end = Some(r.read_int32()?),
                _ => self.unknown_fields.merge_field(tag, r)?,
            }
            Ok(())
        }

        fn encode_raw(&self, w: &mut CodedWriter) {
            if let Some(v) = self.start {
                w.write_int32_field(1, v);
            }
            if let Some(v) = self.end {
                w.write_int32_field(2, v);
            }
            self.unknown_fields.encode(w);
        }
    }

    /// `[start, end)` of field numbers that may not be used.
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct ReservedRange {
        pub start: Option<i32>,
        pub end: Option<i32>,
        pub unknown_fields: UnknownFieldSet,
    }

    impl ReservedRange {
        accessors!(start: i32 = 0, end: i32 = 0,);
    }

    impl Message for ReservedRange {
        fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
            match (tag.field_number(), tag.wire_type()) {
                (1, VARINT) => self.start = Some(r.read_int32()?),
                (2, VARINT) => self.end = Some(r.read_int32()?),
                _ => self.unknown_fields.merge_field(tag, r)?,
            }
            Ok(())
        }

        fn encode_raw(&self, w: &mut CodedWriter) {
            if let Some(v) = self.start {
                w.write_int32_field(1, v);
            }
            if let Some(v) = self.end {
                w.write_int32_field(2, v);
            }
            self.unknown_fields.encode(w);
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldDescriptorProto {
    pub name: Option<String>,
    pub extendee: Option<String>,
    pub number: Option<i32>,
    pub label: Option<field_descriptor_proto::Label>,
    pub r#type: Option<field_descriptor_proto::Type>,
    pub type_name: Option<String>,
    pub default_value: Option<String>,
    pub options: Option<FieldOptions>,
    pub oneof_index: Option<i32>,
    pub json_name: Option<String>,
    pub unknown_fields: UnknownFieldSet,
}

impl FieldDescriptorProto {
    accessors!(
        name: &str,
        extendee: &str,
        number: i32 = 0,
        label: field_descriptor_proto::Label = field_descriptor_proto::Label::Optional,
        r#type: field_descriptor_proto::Type = field_descriptor_proto::Type::Double,
        type_name: &str,
        default_value: &str,
        json_name: &str,
    );
}

impl Message for FieldDescriptorProto {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => self.name = Some(r.read_string()?),
            (2, LEN) => self.extendee = Some(r.read_string()?),
            (3, VARINT) => self.number = Some(r.read_int32()?),
            (4, VARINT) => {
                let raw = r.read_varint()?;
                merge_enum(&mut self.label, &mut self.unknown_fields, 4, raw);
            }
            (5, VARINT) => {
                let raw = r.read_varint()?;
                merge_enum(&mut self.r#type, &mut self.unknown_fields, 5, raw);
            }
            (6, LEN) => self.type_name = Some(r.read_string()?),
            (7, LEN) => self.default_value = Some(r.read_string()?),
            (8, LEN) => r.read_message(self.options.get_or_insert_with(Default::default))?,
            (9, VARINT) => self.oneof_index = Some(r.read_int32()?),
            (10, LEN) => self.json_name = Some(r.read_string()?),
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = &self.name {
            w.write_string_field(1, v);
        }
        if let Some(v) = &self.extendee {
            w.write_string_field(2, v);
        }
        if let Some(v) = self.number {
            w.write_int32_field(3, v);
        }
        if let Some(v) = self.label {
            w.write_int32_field(4, v as i32);
        }
        if let Some(v) = self.r#type {
            w.write_int32_field(5, v as i32);
        }
        if let Some(v) = &self.type_name {
            w.write_string_field(6, v);
        }
        if let Some(v) = &self.default_value {
            w.write_string_field(7, v);
        }
        if let Some(v) = &self.options {
            w.write_message_field(8, v);
        }
        if let Some(v) = self.oneof_index {
            w.write_int32_field(9, v);
        }
        if let Some(v) = &self.json_name {
            w.write_string_field(10, v);
        }
        self.unknown_fields.encode(w);
    }
}

pub mod field_descriptor_proto {
    proto_enum! {
        /// Declared type of a field.
        Type {
            Double = 1 => "TYPE_DOUBLE",
            Float = 2 => "TYPE_FLOAT",
            Int64 = 3 => "TYPE_INT64",
            Uint64 = 4 => "TYPE_UINT64",
            Int32 = 5 => "TYPE_INT32",
            Fixed64 = 6 => "TYPE_FIXED64",
            Fixed32 = 7 => "TYPE_FIXED32",
            Bool = 8 => "TYPE_BOOL",
            String = 9 => "TYPE_STRING",
            Group = 10 => "TYPE_GROUP",
            Message = 11 => "TYPE_MESSAGE",
            Bytes = 12 => "TYPE_BYTES",
            Uint32 = 13 => "TYPE_UINT32",
            Enum = 14 => "TYPE_ENUM",
            Sfixed32 = 15 => "TYPE_SFIXED32",
            Sfixed64 = 16 => "TYPE_SFIXED64",
            Sint32 = 17 => "TYPE_SINT32",
            Sint64 = 18 => "TYPE_SINT64",
        }
    }

    proto_enum! {
        Label {
            Optional = 1 => "LABEL_OPTIONAL",
            Required = 2 => "LABEL_REQUIRED",
            Repeated = 3 => "LABEL_REPEATED",
        }
    }

    impl Type {
        /// Lowercase keyword used in `.proto` source, e.g. `sint32`.
        pub fn keyword(self) -> &'static str {
            match self {
                Type::Double => "double",
                Type::Float => "float",
                Type::Int64 => "int64",
                Type::Uint64 => "uint64",
                Type::Int32 => "int32",
                Type::Fixed64 => "fixed64",
                Type::Fixed32 => "fixed32",
                Type::Bool => "bool",
                Type::String => "string",
                Type::Group => "group",
                Type::Message => "message",
                Type::Bytes => "bytes",
                Type::Uint32 => "uint32",
                Type::Enum => "enum",
                Type::Sfixed32 => "sfixed32",
                Type::Sfixed64 => "sfixed64",
                Type::Sint32 => "sint32",
                Type::Sint64 => "sint64",
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OneofDescriptorProto {
    pub name: Option<String>,
    pub options: Option<OneofOptions>,
    pub unknown_fields: UnknownFieldSet,
}

impl OneofDescriptorProto {
    accessors!(name: &str,);
}

impl Message for OneofDescriptorProto {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => self.name = Some(r.read_string()?),
            (2, LEN) => r.read_message(self.options.get_or_insert_with(Default::default))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = &self.name {
            w.write_string_field(1, v);
        }
        if let Some(v) = &self.options {
            w.write_message_field(2, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumDescriptorProto {
    pub name: Option<String>,
    pub value: Vec<EnumValueDescriptorProto>,
    pub options: Option<EnumOptions>,
    pub unknown_fields: UnknownFieldSet,
}

impl EnumDescriptorProto {
    accessors!(name: &str,);
}

impl Message for EnumDescriptorProto {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => self.name = Some(r.read_string()?),
            (2, LEN) => r.read_message(push_default(&mut self.value))?,
            (3, LEN) => r.read_message(self.options.get_or_insert_with(Default::default))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = &self.name {
            w.write_string_field(1, v);
        }
        for v in &self.value {
            w.write_message_field(2, v);
        }
        if let Some(v) = &self.options {
            w.write_message_field(3, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumValueDescriptorProto {
    pub name: Option<String>,
    pub number: Option<i32>,
    pub options: Option<EnumValueOptions>,
    pub unknown_fields: UnknownFieldSet,
}

impl EnumValueDescriptorProto {
    accessors!(name: &str, number: i32 = 0,);
}

impl Message for EnumValueDescriptorProto {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => self.name = Some(r.read_string()?),
            (2, VARINT) => self.number = Some(r.read_int32()?),
            (3, LEN) => r.read_message(self.options.get_or_insert_with(Default::default))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = &self.name {
            w.write_string_field(1, v);
        }
        if let Some(v) = self.number {
            w.write_int32_field(2, v);
        }
        if let Some(v) = &self.options {
            w.write_message_field(3, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceDescriptorProto {
    pub name: Option<String>,
    pub method: Vec<MethodDescriptorProto>,
    pub options: Option<ServiceOptions>,
    pub unknown_fields: UnknownFieldSet,
}

impl ServiceDescriptorProto {
    accessors!(name: &str,);
}

impl Message for ServiceDescriptorProto {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => self.name = Some(r.read_string()?),
            (2, LEN) => r.read_message(push_default(&mut self.method))?,
            (3, LEN) => r.read_message(self.options.get_or_insert_with(Default::default))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = &self.name {
            w.write_string_field(1, v);
        }
        for v in &self.method {
            w.write_message_field(2, v);
        }
        if let Some(v) = &self.options {
            w.write_message_field(3, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MethodDescriptorProto {
    pub name: Option<String>,
    pub input_type: Option<String>,
    pub output_type: Option<String>,
    pub options: Option<MethodOptions>,
    pub client_streaming: Option<bool>,
    pub server_streaming: Option<bool>,
    pub unknown_fields: UnknownFieldSet,
}

impl MethodDescriptorProto {
    accessors!(
        name: &str,
        input_type: &str,
        output_type: &str,
        client_streaming: bool = false,
        server_streaming: bool = false,
    );
}

impl Message for MethodDescriptorProto {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => self.name = Some(r.read_string()?),
            (2, LEN) => self.input_type = Some(r.read_string()?),
            (3, LEN) => self.output_type = Some(r.read_string()?),
            (4, LEN) => r.read_message(self.options.get_or_insert_with(Default::default))?,
            (5, VARINT) => self.client_streaming = Some(r.read_bool()?),
            (6, VARINT) => self.server_streaming = Some(r.read_bool()?),
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = &self.name {
            w.write_string_field(1, v);
        }
        if let Some(v) = &self.input_type {
            w.write_string_field(2, v);
        }
        if let Some(v) = &self.output_type {
            w.write_string_field(3, v);
        }
        if let Some(v) = &self.options {
            w.write_message_field(4, v);
        }
        if let Some(v) = self.client_streaming {
            w.write_bool_field(5, v);
        }
        if let Some(v) = self.server_streaming {
            w.write_bool_field(6, v);
        }
        self.unknown_fields.encode(w);
    }
}

/// Options messages all carry `uninterpreted_option = 999` and accept
/// extensions from 1000 upward; the shared codec lives here.
pub trait OptionsMessage: Message {
    /// Fully-qualified name of the options message type.
    const TYPE_NAME: &'static str;

    fn uninterpreted_option(&self) -> &[UninterpretedOption];
    fn uninterpreted_option_mut(&mut self) -> &mut Vec<UninterpretedOption>;
    fn unknown_fields(&self) -> &UnknownFieldSet;
    fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet;
}

macro_rules! options_message {
    ($name:ident, $type_name:literal) => {
        impl OptionsMessage for $name {
            const TYPE_NAME: &'static str = $type_name;

            fn uninterpreted_option(&self) -> &[UninterpretedOption] {
                &self.uninterpreted_option
            }

            fn uninterpreted_option_mut(&mut self) -> &mut Vec<UninterpretedOption> {
                &mut self.uninterpreted_option
            }

            fn unknown_fields(&self) -> &UnknownFieldSet {
                &self.unknown_fields
            }

            fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet {
                &mut self.unknown_fields
            }
        }
    };
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileOptions {
    pub java_package: Option<String>,
    pub java_outer_classname: Option<String>,
    pub optimize_for: Option<file_options::OptimizeMode>,
    pub java_multiple_files: Option<bool>,
    pub go_package: Option<String>,
    pub cc_generic_services: Option<bool>,
    pub java_generic_services: Option<bool>,
    pub py_generic_services: Option<bool>,
    pub deprecated: Option<bool>,
    pub cc_enable_arenas: Option<bool>,
    pub objc_class_prefix: Option<String>,
    pub csharp_namespace: Option<String>,
    pub uninterpreted_option: Vec<UninterpretedOption>,
    pub unknown_fields: UnknownFieldSet,
}

impl FileOptions {
    accessors!(
        java_package: &str,
        java_outer_classname: &str,
        optimize_for: file_options::OptimizeMode = file_options::OptimizeMode::Speed,
        java_multiple_files: bool = false,
        go_package: &str,
        deprecated: bool = false,
        cc_enable_arenas: bool = false,
        objc_class_prefix: &str,
        csharp_namespace: &str,
    );
}

options_message!(FileOptions, "google.protobuf.FileOptions");

impl Message for FileOptions {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, LEN) => self.java_package = Some(r.read_string()?),
            (8, LEN) => self.java_outer_classname = Some(r.read_string()?),
            (9, VARINT) => {
                let raw = r.read_varint()?;
                merge_enum(&mut self.optimize_for, &mut self.unknown_fields, 9, raw);
            }
            (10, VARINT) => self.java_multiple_files = Some(r.read_bool()?),
            (11, LEN) => self.go_package = Some(r.read_string()?),
            (16, VARINT) => self.cc_generic_services = Some(r.read_bool()?),
            (17, VARINT) => self.java_generic_services = Some(r.read_bool()?),
            (18, VARINT) => self.py_generic_services = Some(r.read_bool()?),
            (23, VARINT) => self.deprecated = Some(r.read_bool()?),
            (31, VARINT) => self.cc_enable_arenas = Some(r.read_bool()?),
            (36, LEN) => self.objc_class_prefix = Some(r.read_string()?),
            (37, LEN) => self.csharp_namespace = Some(r.read_string()?),
            (999, LEN) => r.read_message(push_default(&mut self.uninterpreted_option))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = &self.java_package {
            w.write_string_field(1, v);
        }
        if let Some(v) = &self.java_outer_classname {
            w.write_string_field(8, v);
        }
        if let Some(v) = self.optimize_for {
            w.write_int32_field(9, v as i32);
        }
        if let Some(v) = self.java_multiple_files {
            w.write_bool_field(10, v);
        }
        if let Some(v) = &self.go_package {
            w.write_string_field(11, v);
        }
        if let Some(v) = self.cc_generic_services {
            w.write_bool_field(16, v);
        }
        if let Some(v) = self.java_generic_services {
            w.write_bool_field(17, v);
        }
        if let Some(v) = self.py_generic_services {
            w.write_bool_field(18, v);
        }
        if let Some(v) = self.deprecated {
            w.write_bool_field(23, v);
        }
        if let Some(v) = self.cc_enable_arenas {
            w.write_bool_field(31, v);
        }
        if let Some(v) = &self.objc_class_prefix {
            w.write_string_field(36, v);
        }
        if let Some(v) = &self.csharp_namespace {
            w.write_string_field(37, v);
        }
        for v in &self.uninterpreted_option {
            w.write_message_field(999, v);
        }
        self.unknown_fields.encode(w);
    }
}

pub mod file_options {
    proto_enum! {
        OptimizeMode {
            Speed = 1 => "SPEED",
            CodeSize = 2 => "CODE_SIZE",
            LiteRuntime = 3 => "LITE_RUNTIME",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageOptions {
    pub message_set_wire_format: Option<bool>,
    pub no_standard_descriptor_accessor: Option<bool>,
    pub deprecated: Option<bool>,
    pub map_entry: Option<bool>,
    pub uninterpreted_option: Vec<UninterpretedOption>,
    pub unknown_fields: UnknownFieldSet,
}

impl MessageOptions {
    accessors!(
        message_set_wire_format: bool = false,
        no_standard_descriptor_accessor: bool = false,
        deprecated: bool = false,
        map_entry: bool = false,
    );
}

options_message!(MessageOptions, "google.protobuf.MessageOptions");

impl Message for MessageOptions {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, VARINT) => self.message_set_wire_format = Some(r.read_bool()?),
            (2, VARINT) => self.no_standard_descriptor_accessor = Some(r.read_bool()?),
            (3, VARINT) => self.deprecated = Some(r.read_bool()?),
            (7, VARINT) => self.map_entry = Some(r.read_bool()?),
            (999, LEN) => r.read_message(push_default(&mut self.uninterpreted_option))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = self.message_set_wire_format {
            w.write_bool_field(1, v);
        }
        if let Some(v) = self.no_standard_descriptor_accessor {
            w.write_bool_field(2, v);
        }
        if let Some(v) = self.deprecated {
            w.write_bool_field(3, v);
        }
        if let Some(v) = self.map_entry {
            w.write_bool_field(7, v);
        }
        for v in &self.uninterpreted_option {
            w.write_message_field(999, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldOptions {
    pub ctype: Option<field_options::CType>,
    pub packed: Option<bool>,
    pub deprecated: Option<bool>,
    pub lazy: Option<bool>,
    pub jstype: Option<field_options::JsType>,
    pub weak: Option<bool>,
    pub uninterpreted_option: Vec<UninterpretedOption>,
    pub unknown_fields: UnknownFieldSet,
}

impl FieldOptions {
    accessors!(
        ctype: field_options::CType = field_options::CType::String,
        packed: bool = false,
        deprecated: bool = false,
        lazy: bool = false,
        jstype: field_options::JsType = field_options::JsType::JsNormal,
        weak: bool = false,
    );
}

options_message!(FieldOptions, "google.protobuf.FieldOptions");

impl Message for FieldOptions {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, VARINT) => {
                let raw = r.read_varint()?;
                merge_enum(&mut self.ctype, &mut self.unknown_fields, 1, raw);
            }
            (2, VARINT) => self.packed = Some(r.read_bool()?),
            (3, VARINT) => self.deprecated = Some(r.read_bool()?),
            (5, VARINT) => self.lazy = Some(r.read_bool()?),
            (6, VARINT) => {
                let raw = r.read_varint()?;
                merge_enum(&mut self.jstype, &mut self.unknown_fields, 6, raw);
            }
            (10, VARINT) => self.weak = Some(r.read_bool()?),
            (999, LEN) => r.read_message(push_default(&mut self.uninterpreted_option))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = self.ctype {
            w.write_int32_field(1, v as i32);
        }
        if let Some(v) = self.packed {
            w.write_bool_field(2, v);
        }
        if let Some(v) = self.deprecated {
            w.write_bool_field(3, v);
        }
        if let Some(v) = self.lazy {
            w.write_bool_field(5, v);
        }
        if let Some(v) = self.jstype {
            w.write_int32_field(6, v as i32);
        }
        if let Some(v) = self.weak {
            w.write_bool_field(10, v);
        }
        for v in &self.uninterpreted_option {
            w.write_message_field(999, v);
        }
        self.unknown_fields.encode(w);
    }
}

pub mod field_options {
    proto_enum! {
        CType {
            String = 0 => "STRING",
            Cord = 1 => "CORD",
            StringPiece = 2 => "STRING_PIECE",
        }
    }

    proto_enum! {
        JsType {
            JsNormal = 0 => "JS_NORMAL",
            JsString = 1 => "JS_STRING",
            JsNumber = 2 => "JS_NUMBER",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OneofOptions {
    pub uninterpreted_option: Vec<UninterpretedOption>,
    pub unknown_fields: UnknownFieldSet,
}

options_message!(OneofOptions, "google.protobuf.OneofOptions");

impl Message for OneofOptions {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (999, LEN) => r.read_message(push_default(&mut self.uninterpreted_option))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        for v in &self.uninterpreted_option {
            w.write_message_field(999, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumOptions {
    pub allow_alias: Option<bool>,
    pub deprecated: Option<bool>,
    pub uninterpreted_option: Vec<UninterpretedOption>,
    pub unknown_fields: UnknownFieldSet,
}

impl EnumOptions {
    accessors!(allow_alias: bool = false, deprecated: bool = false,);
}

options_message!(EnumOptions, "google.protobuf.EnumOptions");

impl Message for EnumOptions {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (2, VARINT) => self.allow_alias = Some(r.read_bool()?),
            (3, VARINT) => self.deprecated = Some(r.read_bool()?),
            (999, LEN) => r.read_message(push_default(&mut self.uninterpreted_option))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = self.allow_alias {
            w.write_bool_field(2, v);
        }
        if let Some(v) = self.deprecated {
            w.write_bool_field(3, v);
        }
        for v in &self.uninterpreted_option {
            w.write_message_field(999, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumValueOptions {
    pub deprecated: Option<bool>,
    pub uninterpreted_option: Vec<UninterpretedOption>,
    pub unknown_fields: UnknownFieldSet,
}

impl EnumValueOptions {
    accessors!(deprecated: bool = false,);
}

options_message!(EnumValueOptions, "google.protobuf.EnumValueOptions");

impl Message for EnumValueOptions {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (1, VARINT) => self.deprecated = Some(r.read_bool()?),
            (999, LEN) => r.read_message(push_default(&mut self.uninterpreted_option))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = self.deprecated {
            w.write_bool_field(1, v);
        }
        for v in &self.uninterpreted_option {
            w.write_message_field(999, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServiceOptions {
    pub deprecated: Option<bool>,
    pub uninterpreted_option: Vec<UninterpretedOption>,
    pub unknown_fields: UnknownFieldSet,
}

impl ServiceOptions {
    accessors!(deprecated: bool = false,);
}

options_message!(ServiceOptions, "google.protobuf.ServiceOptions");

impl Message for ServiceOptions {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (33, VARINT) => self.deprecated = Some(r.read_bool()?),
            (999, LEN) => r.read_message(push_default(&mut self.uninterpreted_option))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = self.deprecated {
            w.write_bool_field(33, v);
        }
        for v in &self.uninterpreted_option {
            w.write_message_field(999, v);
        }
        self.unknown_fields.encode(w);
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MethodOptions {
    pub deprecated: Option<bool>,
    pub uninterpreted_option: Vec<UninterpretedOption>,
    pub unknown_fields: UnknownFieldSet,
}

impl MethodOptions {
    accessors!(deprecated: bool = false,);
}

options_message!(MethodOptions, "google.protobuf.MethodOptions");

impl Message for MethodOptions {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (33, VARINT) => self.deprecated = Some(r.read_bool()?),
            (999, LEN) => r.read_message(push_default(&mut self.uninterpreted_option))?,
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        if let Some(v) = self.deprecated {
            w.write_bool_field(33, v);
        }
        for v in &self.uninterpreted_option {
            w.write_message_field(999, v);
        }
        self.unknown_fields.encode(w);
    }
}

/// An option as written in source, before the pool resolves its name and
/// checks its value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UninterpretedOption {
    pub name: Vec<uninterpreted_option::NamePart>,
    pub identifier_value: Option<String>,
    pub positive_int_value: Option<u64>,
    pub negative_int_value: Option<i64>,
    pub double_value: Option<f64>,
    pub string_value: Option<Vec<u8>>,
    pub aggregate_value: Option<String>,
    pub unknown_fields: UnknownFieldSet,
}

impl UninterpretedOption {
    accessors!(
        identifier_value: &str,
        positive_int_value: u64 = 0,
        negative_int_value: i64 = 0,
        double_value: f64 = 0.0,
        aggregate_value: &str,
    );

    pub fn string_value(&self) -> &[u8] {
        self.string_value.as_deref().unwrap_or_default()
    }
}

impl Message for UninterpretedOption {
    fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        match (tag.field_number(), tag.wire_type()) {
            (2, LEN) => r.read_message(push_default(&mut self.name))?,
            (3, LEN) => self.identifier_value = Some(r.read_string()?),
            (4, VARINT) => self.positive_int_value = Some(r.read_varint()?),
            (5, VARINT) => self.negative_int_value = Some(r.read_int64()?),
            (6, WireType::Fixed64) => self.double_value = Some(r.read_double()?),
            (7, LEN) => self.string_value = Some(r.read_bytes()?),
            (8, LEN) => self.aggregate_value = Some(r.read_string()?),
            _ => self.unknown_fields.merge_field(tag, r)?,
        }
        Ok(())
    }

    fn encode_raw(&self, w: &mut CodedWriter) {
        for v in &self.name {
            w.write_message_field(2, v);
        }
        if let Some(v) = &self.identifier_value {
            w.write_string_field(3, v);
        }
        if let Some(v) = self.positive_int_value {
            w.write_uint64_field(4, v);
        }
        if let Some(v) = self.negative_int_value {
            w.write_int64_field(5, v);
        }
        if let Some(v) = self.double_value {
            w.write_double_field(6, v);
        }
        if let Some(v) = &self.string_value {
            w.write_bytes_field(7, v);
        }
        if let Some(v) = &self.aggregate_value {
            w.write_string_field(8, v);
        }
        self.unknown_fields.encode(w);
    }
}

pub mod uninterpreted_option {
    use super::*;

    /// One dot-separated component of an option name. Extension components
    /// are written in parentheses in source.
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct NamePart {
        pub name_part: String,
        pub is_extension: bool,
        pub unknown_fields: UnknownFieldSet,
    }

    impl NamePart {
        pub fn new(name_part: impl Into<String>, is_extension: bool) -> Self {
            NamePart {
                name_part: name_part.into(),
                is_extension,
                unknown_fields: UnknownFieldSet::default(),
            }
        }
    }

    impl Message for NamePart {
        fn merge_field(&mut self, tag: Tag, r: &mut CodedReader<'_>) -> Result<(), DecodeError> {
            match (tag.field_number(), tag.wire_type()) {
                (1, LEN) => self.name_part = r.read_string()?,
                (2, VARINT) => self.is_extension = r.read_bool()?,
                _ => self.unknown_fields.merge_field(tag, r)?,
            }
            Ok(())
        }

        fn encode_raw(&self, w: &mut CodedWriter) {
            w.write_string_field(1, &self.name_part);
            w.write_bool_field(2, self.is_extension);
            self.unknown_fields.encode(w);
        }
    }
}
