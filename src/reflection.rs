//! Runtime reflection for protobuf messages.
//!
//! A [`DynamicMessage`] is bound to a [`MessageDescriptor`] and stores every
//! field, extensions included, as a [`Value`] keyed by field number. All
//! operations are driven by [`FieldDescriptor`]s, so the same code serves
//! any schema loaded into a [`DescriptorPool`](crate::DescriptorPool).
//!
//! # Example
//!
//! ```
//! use protodyn::test_utils::build_pool;
//! use protodyn::{DynamicMessage, Value};
//!
//! let pool = build_pool(&[r#"
//!     name: "point.proto"
//!     message_type {
//!       name: "Point"
//!       field { name: "x" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
//!     }
//! "#]);
//! let desc = pool.find_message_by_name("Point").unwrap();
//! let mut point = DynamicMessage::new(desc);
//! point.set_field_by_name("x", Value::I32(3)).unwrap();
//! assert_eq!(point.to_string(), "x: 3\n");
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::Message;
use crate::decoding::DecodeError;
use crate::descriptor::{FieldDescriptor, Kind, MessageDescriptor, OneofDescriptor};
use crate::encoding::{CodedWriter, encode_message, encoded_len};
use crate::repeated_field::RepeatedField;
use crate::unknown_fields::UnknownFieldSet;

/// A field value, one variant per C++ type category.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    EnumNumber(i32),
    Message(DynamicMessage),
    /// All elements of a repeated field.
    List(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum_number(&self) -> Option<i32> {
        match self {
            Value::EnumNumber(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_message_mut(&mut self) -> Option<&mut DynamicMessage> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::U32(_) => "uint32",
            Value::U64(_) => "uint64",
            Value::F32(_) => "float",
            Value::F64(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::EnumNumber(_) => "enum",
            Value::Message(_) => "message",
            Value::List(_) => "list",
        }
    }

    /// Whether this value can be stored as one element of `field`.
    pub fn is_valid_for_field(&self, field: &FieldDescriptor) -> bool {
        match (field.kind(), self) {
            (Kind::Double, Value::F64(_)) | (Kind::Float, Value::F32(_)) => true,
            (Kind::Int32 | Kind::Sint32 | Kind::Sfixed32, Value::I32(_)) => true,
            (Kind::Int64 | Kind::Sint64 | Kind::Sfixed64, Value::I64(_)) => true,
            (Kind::Uint32 | Kind::Fixed32, Value::U32(_)) => true,
            (Kind::Uint64 | Kind::Fixed64, Value::U64(_)) => true,
            (Kind::Bool, Value::Bool(_)) => true,
            (Kind::String, Value::String(_)) => true,
            (Kind::Bytes, Value::Bytes(_)) => true,
            (Kind::Enum(_), Value::EnumNumber(_)) => true,
            (Kind::Message(ty), Value::Message(m)) => m.descriptor() == &ty,
            _ => false,
        }
    }

    /// Zero value with implicit presence: such fields count as unset.
    fn is_implicit_default(&self) -> bool {
        match self {
            Value::Bool(v) => !*v,
            Value::I32(v) | Value::EnumNumber(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::U32(v) => *v == 0,
            Value::U64(v) => *v == 0,
            Value::F32(v) => v.to_bits() == 0,
            Value::F64(v) => v.to_bits() == 0,
            Value::String(v) => v.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::Message(_) | Value::List(_) => false,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident,)*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v.into())
            }
        })*
    };
}

value_from! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    DynamicMessage => Message,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReflectError {
    #[error("field \"{field}\" does not belong to message type \"{message}\"")]
    WrongContainingType { field: String, message: String },
    #[error("{found} value does not match field \"{field}\" of type {expected}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },
    #[error("index {index} out of range for field \"{field}\" with {len} elements")]
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
    #[error("message type \"{found}\" does not match \"{expected}\"")]
    DescriptorMismatch { expected: String, found: String },
    #[error("field \"{0}\" is not repeated")]
    NotRepeated(String),
    #[error("field \"{0}\" is repeated")]
    Repeated(String),
    #[error("field \"{0}\" is not a message field")]
    NotAMessage(String),
    #[error("message type \"{message}\" has no field named \"{name}\"")]
    NoSuchField { message: String, name: String },
}

/// Per-field storage. Cleared singular messages keep their allocation with
/// `present` unset; repeated messages retire elements instead of dropping.
#[derive(Clone, Debug)]
pub(crate) enum FieldStorage {
    Singular { value: Value, present: bool },
    Repeated(RepeatedField<Value>),
}

/// A message of any type known to a pool.
#[derive(Clone)]
pub struct DynamicMessage {
    desc: MessageDescriptor,
    fields: BTreeMap<u32, (FieldDescriptor, FieldStorage)>,
    unknown_fields: UnknownFieldSet,
}

impl DynamicMessage {
    pub fn new(desc: MessageDescriptor) -> Self {
        DynamicMessage {
            desc,
            fields: BTreeMap::new(),
            unknown_fields: UnknownFieldSet::new(),
        }
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.desc
    }

    /// Stored fields in ascending number order, set or not.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldStorage)> {
        self.fields.values().map(|(field, storage)| (field, storage))
    }

    /// Set fields in ascending number order.
    pub(crate) fn present_entries(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldStorage)> {
        self.entries()
            .filter(|(field, storage)| storage_is_set(field, storage))
    }

    fn storage(&self, field: &FieldDescriptor) -> Option<&FieldStorage> {
        match self.fields.get(&field.number()) {
            Some((stored, storage)) if stored == field => Some(storage),
            _ => None,
        }
    }

    fn storage_mut(&mut self, field: &FieldDescriptor) -> &mut FieldStorage {
        let slot = self
            .fields
            .entry(field.number())
            .or_insert_with(|| (field.clone(), empty_storage(field)));
        if slot.0 != *field {
            *slot = (field.clone(), empty_storage(field));
        }
        &mut slot.1
    }

    fn check_field(&self, field: &FieldDescriptor) -> Result<(), ReflectError> {
        if field.containing_type() != self.desc {
            return Err(ReflectError::WrongContainingType {
                field: field.full_name().to_owned(),
                message: self.desc.full_name().to_owned(),
            });
        }
        Ok(())
    }

    fn check_repeated(&self, field: &FieldDescriptor) -> Result<(), ReflectError> {
        self.check_field(field)?;
        if !field.is_list() {
            return Err(ReflectError::NotRepeated(field.full_name().to_owned()));
        }
        Ok(())
    }

    fn check_singular(&self, field: &FieldDescriptor) -> Result<(), ReflectError> {
        self.check_field(field)?;
        if field.is_list() {
            return Err(ReflectError::Repeated(field.full_name().to_owned()));
        }
        Ok(())
    }

    fn check_value(field: &FieldDescriptor, value: &Value) -> Result<(), ReflectError> {
        if value.is_valid_for_field(field) {
            return Ok(());
        }
        Err(ReflectError::TypeMismatch {
            field: field.full_name().to_owned(),
            expected: kind_name(field),
            found: value.type_name(),
        })
    }

    /// Repeated fields are set when non-empty. Singular fields without
    /// explicit presence are set when they differ from zero.
    pub fn has_field(&self, field: &FieldDescriptor) -> bool {
        self.storage(field)
            .is_some_and(|storage| storage_is_set(field, storage))
    }

    /// Element count of a repeated field; 0 or 1 for singular fields.
    pub fn field_size(&self, field: &FieldDescriptor) -> usize {
        match self.storage(field) {
            Some(FieldStorage::Repeated(values)) => values.len(),
            Some(_) => usize::from(self.has_field(field)),
            None => 0,
        }
    }

    /// Current value, or the field's default when unset. Repeated fields
    /// come back as a [`Value::List`].
    pub fn get_field(&self, field: &FieldDescriptor) -> Cow<'_, Value> {
        match self.storage(field) {
            Some(FieldStorage::Singular { value, present: true }) => Cow::Borrowed(value),
            Some(FieldStorage::Singular { value, .. }) if !field.supports_presence() => {
                Cow::Borrowed(value)
            }
            Some(FieldStorage::Repeated(values)) => Cow::Owned(Value::List(values.to_vec())),
            _ if field.is_list() => Cow::Owned(Value::List(Vec::new())),
            _ => Cow::Owned(field.default_value()),
        }
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<Cow<'_, Value>> {
        let field = self.desc.get_field_by_name(name)?;
        Some(self.get_field(&field))
    }

    pub fn get_repeated(&self, field: &FieldDescriptor, index: usize) -> Option<&Value> {
        match self.storage(field)? {
            FieldStorage::Repeated(values) => values.get(index),
            FieldStorage::Singular { .. } => None,
        }
    }

    /// Replaces the value. Repeated fields take a [`Value::List`]. Setting a
    /// oneof member clears the other members.
    pub fn set_field(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), ReflectError> {
        self.check_field(field)?;
        if field.is_list() {
            let Value::List(items) = value else {
                return Err(ReflectError::TypeMismatch {
                    field: field.full_name().to_owned(),
                    expected: "list".to_owned(),
                    found: value.type_name(),
                });
            };
            for item in &items {
                Self::check_value(field, item)?;
            }
            *self.storage_mut(field) = FieldStorage::Repeated(items.into());
            return Ok(());
        }
        Self::check_value(field, &value)?;
        self.store_singular(field, value);
        Ok(())
    }

    pub fn set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), ReflectError> {
        let field = self.field_named(name)?;
        self.set_field(&field, value)
    }

    fn field_named(&self, name: &str) -> Result<FieldDescriptor, ReflectError> {
        self.desc
            .get_field_by_name(name)
            .ok_or_else(|| ReflectError::NoSuchField {
                message: self.desc.full_name().to_owned(),
                name: name.to_owned(),
            })
    }

    fn store_singular(&mut self, field: &FieldDescriptor, value: Value) {
        self.clear_oneof_siblings(field);
        *self.storage_mut(field) = FieldStorage::Singular {
            value,
            present: true,
        };
    }

    pub fn set_repeated(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        value: Value,
    ) -> Result<(), ReflectError> {
        self.check_repeated(field)?;
        Self::check_value(field, &value)?;
        let len = self.field_size(field);
        match self.storage_mut(field) {
            FieldStorage::Repeated(values) if index < values.len() => {
                values[index] = value;
                Ok(())
            }
            _ => Err(ReflectError::IndexOutOfRange {
                field: field.full_name().to_owned(),
                index,
                len,
            }),
        }
    }

    pub fn add_repeated(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), ReflectError> {
        self.check_repeated(field)?;
        Self::check_value(field, &value)?;
        if let FieldStorage::Repeated(values) = self.storage_mut(field) {
            values.push(value);
        }
        Ok(())
    }

    /// Mutable singular sub-message, created empty if unset. Marks the field
    /// present.
    pub fn get_message_mut(&mut self, field: &FieldDescriptor) -> Result<&mut DynamicMessage, ReflectError> {
        self.check_singular(field)?;
        if field.message_type().is_none() {
            return Err(ReflectError::NotAMessage(field.full_name().to_owned()));
        }
        Ok(self.singular_message_slot(field))
    }

    fn singular_message_slot(&mut self, field: &FieldDescriptor) -> &mut DynamicMessage {
        if !self.has_field(field) {
            self.clear_oneof_siblings(field);
        }
        let storage = self.storage_mut(field);
        if !matches!(storage, FieldStorage::Singular { value: Value::Message(_), .. }) {
            *storage = empty_storage(field);
        }
        match storage {
            FieldStorage::Singular {
                value: Value::Message(message),
                present,
            } => {
                *present = true;
                message
            }
            // empty_storage of a message field is always a message slot.
            _ => unreachable!("message field without message storage"),
        }
    }

    /// Appends an empty element to a repeated message field, reusing a
    /// previously removed element when one is available.
    pub fn add_message(&mut self, field: &FieldDescriptor) -> Result<&mut DynamicMessage, ReflectError> {
        self.check_repeated(field)?;
        let Some(message_type) = field.message_type() else {
            return Err(ReflectError::NotAMessage(field.full_name().to_owned()));
        };
        Ok(self.repeated_message_slot(field, message_type))
    }

    fn repeated_message_slot(&mut self, field: &FieldDescriptor, message_type: MessageDescriptor) -> &mut DynamicMessage {
        let FieldStorage::Repeated(values) = self.storage_mut(field) else {
            unreachable!("repeated field without repeated storage")
        };
        if values.reuse_retired().is_none() {
            values.push(Value::Message(DynamicMessage::new(message_type.clone())));
        }
        let Some(slot) = values.last_mut() else {
            unreachable!("element was just appended")
        };
        if !matches!(slot, Value::Message(_)) {
            *slot = Value::Message(DynamicMessage::new(message_type));
        }
        let Value::Message(message) = slot else {
            unreachable!("slot holds a message")
        };
        message.clear();
        message
    }

    /// Mutable element of a repeated message field.
    pub fn get_repeated_message_mut(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
    ) -> Result<&mut DynamicMessage, ReflectError> {
        self.check_repeated(field)?;
        let len = self.field_size(field);
        let out_of_range = ReflectError::IndexOutOfRange {
            field: field.full_name().to_owned(),
            index,
            len,
        };
        match self.storage_mut(field) {
            FieldStorage::Repeated(values) => match values.get_mut(index) {
                Some(Value::Message(message)) => Ok(message),
                Some(_) => Err(ReflectError::NotAMessage(field.full_name().to_owned())),
                None => Err(out_of_range),
            },
            FieldStorage::Singular { .. } => Err(out_of_range),
        }
    }

    /// Clears a field. Message storage is kept for reuse; reading the
    /// field afterwards yields a fresh default instance.
    pub fn clear_field(&mut self, field: &FieldDescriptor) {
        let Some(number) = self.storage(field).map(|_| field.number()) else {
            return;
        };
        let mut remove = false;
        if let Some((_, storage)) = self.fields.get_mut(&number) {
            match storage {
                FieldStorage::Singular {
                    value: Value::Message(message),
                    present,
                } => {
                    message.clear();
                    *present = false;
                }
                FieldStorage::Singular { .. } => remove = true,
                FieldStorage::Repeated(values) if field.message_type().is_some() => values.retire_all(),
                FieldStorage::Repeated(values) => values.clear(),
            }
        }
        if remove {
            self.fields.remove(&number);
        }
    }

    pub fn clear_field_by_name(&mut self, name: &str) -> Result<(), ReflectError> {
        let field = self.field_named(name)?;
        self.clear_field(&field);
        Ok(())
    }

    /// Removes the last element; message elements are kept for reuse.
    pub fn remove_last(&mut self, field: &FieldDescriptor) -> Result<(), ReflectError> {
        self.check_repeated(field)?;
        let is_message = field.message_type().is_some();
        if let Some((_, FieldStorage::Repeated(values))) = self.fields.get_mut(&field.number()) {
            if is_message {
                values.retire_last();
            } else {
                values.remove_last();
            }
        }
        Ok(())
    }

    /// Removes the last element and hands it to the caller.
    pub fn release_last(&mut self, field: &FieldDescriptor) -> Result<Option<Value>, ReflectError> {
        self.check_repeated(field)?;
        match self.fields.get_mut(&field.number()) {
            Some((_, FieldStorage::Repeated(values))) => Ok(values.pop()),
            _ => Ok(None),
        }
    }

    pub fn swap_elements(&mut self, field: &FieldDescriptor, a: usize, b: usize) -> Result<(), ReflectError> {
        self.check_repeated(field)?;
        let len = self.field_size(field);
        let swapped = match self.fields.get_mut(&field.number()) {
            Some((_, FieldStorage::Repeated(values))) => values.swap_elements(a, b),
            _ => false,
        };
        if swapped {
            Ok(())
        } else {
            Err(ReflectError::IndexOutOfRange {
                field: field.full_name().to_owned(),
                index: a.max(b),
                len,
            })
        }
    }

    /// Set fields and extensions, ordered by number.
    pub fn list_fields(&self) -> Vec<FieldDescriptor> {
        self.present_entries()
            .map(|(field, _)| field.clone())
            .collect()
    }

    pub fn which_oneof(&self, oneof: &OneofDescriptor) -> Option<FieldDescriptor> {
        oneof.fields().into_iter().find(|field| self.has_field(field))
    }

    pub fn has_oneof(&self, oneof: &OneofDescriptor) -> bool {
        self.which_oneof(oneof).is_some()
    }

    pub fn clear_oneof(&mut self, oneof: &OneofDescriptor) {
        for field in oneof.fields() {
            self.clear_field(&field);
        }
    }

    fn clear_oneof_siblings(&mut self, field: &FieldDescriptor) {
        let Some(oneof) = field.containing_oneof() else {
            return;
        };
        for sibling in oneof.fields() {
            if sibling != *field {
                self.clear_field(&sibling);
            }
        }
    }

    /// Merges `other` into `self`: singular scalars overwrite, singular
    /// messages merge recursively, repeated fields concatenate.
    pub fn merge_from(&mut self, other: &DynamicMessage) -> Result<(), ReflectError> {
        self.check_same_type(other)?;
        for (field, storage) in other.present_entries() {
            match storage {
                FieldStorage::Singular {
                    value: Value::Message(source),
                    ..
                } => {
                    self.singular_message_slot(field).merge_from(source)?;
                }
                FieldStorage::Singular { value, .. } => self.store_singular(field, value.clone()),
                FieldStorage::Repeated(source) => {
                    if let FieldStorage::Repeated(values) = self.storage_mut(field) {
                        values.extend(source.iter().cloned());
                    }
                }
            }
        }
        self.unknown_fields.merge_from(&other.unknown_fields);
        Ok(())
    }

    /// Replaces the contents with a copy of `other`.
    pub fn copy_from(&mut self, other: &DynamicMessage) -> Result<(), ReflectError> {
        self.check_same_type(other)?;
        self.clear();
        self.merge_from(other)
    }

    pub fn swap(&mut self, other: &mut DynamicMessage) -> Result<(), ReflectError> {
        self.check_same_type(other)?;
        std::mem::swap(&mut self.fields, &mut other.fields);
        std::mem::swap(&mut self.unknown_fields, &mut other.unknown_fields);
        Ok(())
    }

    fn check_same_type(&self, other: &DynamicMessage) -> Result<(), ReflectError> {
        if self.desc != other.desc {
            return Err(ReflectError::DescriptorMismatch {
                expected: self.desc.full_name().to_owned(),
                found: other.desc.full_name().to_owned(),
            });
        }
        Ok(())
    }

    /// Clears every field and the unknown fields, keeping message storage.
    pub fn clear(&mut self) {
        self.fields.retain(|_, (field, storage)| match storage {
            FieldStorage::Singular {
                value: Value::Message(message),
                present,
            } => {
                message.clear();
                *present = false;
                true
            }
            FieldStorage::Singular { .. } => false,
            FieldStorage::Repeated(values) => {
                if field.message_type().is_some() {
                    values.retire_all();
                } else {
                    values.clear();
                }
                true
            }
        });
        self.unknown_fields.clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.find_initialization_errors().is_empty()
    }

    /// Paths of missing required fields, e.g. `a.b`, `rep[1].x` or
    /// `(pkg.ext).y`.
    pub fn find_initialization_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        self.collect_initialization_errors("", &mut errors);
        errors
    }

    fn collect_initialization_errors(&self, prefix: &str, errors: &mut Vec<String>) {
        for field in self.desc.fields() {
            if field.is_required() && !self.has_field(&field) {
                errors.push(format!("{prefix}{}", field.name()));
            }
        }
        for (field, storage) in self.present_entries() {
            match storage {
                FieldStorage::Singular {
                    value: Value::Message(message),
                    ..
                } => {
                    message.collect_initialization_errors(&sub_message_prefix(prefix, field, None), errors);
                }
                FieldStorage::Repeated(values) => {
                    for (i, value) in values.iter().enumerate() {
                        if let Value::Message(message) = value {
                            message.collect_initialization_errors(&sub_message_prefix(prefix, field, Some(i)), errors);
                        }
                    }
                }
                FieldStorage::Singular { .. } => {}
            }
        }
    }

    pub fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.unknown_fields
    }

    pub fn unknown_fields_mut(&mut self) -> &mut UnknownFieldSet {
        &mut self.unknown_fields
    }

    /// Drops unknown fields here and in every sub-message.
    pub fn discard_unknown_fields(&mut self) {
        self.unknown_fields.clear();
        for (_, storage) in self.fields.values_mut() {
            match storage {
                FieldStorage::Singular {
                    value: Value::Message(message),
                    ..
                } => message.discard_unknown_fields(),
                FieldStorage::Repeated(values) => {
                    for value in values.iter_mut() {
                        if let Value::Message(message) = value {
                            message.discard_unknown_fields();
                        }
                    }
                }
                FieldStorage::Singular { .. } => {}
            }
        }
    }

    /// Appends the binary encoding to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        let mut writer = CodedWriter::new();
        encode_message(self, &mut writer);
        buf.extend_from_slice(writer.as_slice());
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut writer = CodedWriter::new();
        encode_message(self, &mut writer);
        writer.into_inner()
    }

    pub fn encoded_len(&self) -> usize {
        encoded_len(self)
    }

    /// Converts a compiled message into a dynamic one of type `desc` by
    /// way of the wire format.
    pub fn from_message<M: Message>(desc: MessageDescriptor, message: &M) -> Result<Self, DecodeError> {
        DynamicMessage::decode_partial(desc, &message.encode_to_vec())
    }

    /// Converts into a compiled message type by way of the wire format.
    pub fn transcode_to<M: Message>(&self) -> Result<M, DecodeError> {
        M::decode(&self.encode_to_vec())
    }

    /// Single-line text format.
    pub fn short_debug_string(&self) -> String {
        let mut text = crate::text_format::Printer::new()
            .single_line_mode(true)
            .print_to_string(self);
        text.truncate(text.trim_end().len());
        text
    }

    /// Multi-line text format with UTF-8 strings left unescaped.
    pub fn utf8_debug_string(&self) -> String {
        crate::text_format::Printer::new()
            .utf8_strings(true)
            .print_to_string(self)
    }

    /// Slot the decoder merges a sub-message into: the singular message, or
    /// a new element of a repeated field.
    pub(crate) fn decoded_message_slot(&mut self, field: &FieldDescriptor) -> &mut DynamicMessage {
        match field.message_type() {
            Some(message_type) if field.is_list() => self.repeated_message_slot(field, message_type),
            _ => self.singular_message_slot(field),
        }
    }

    /// Stores a decoded scalar without type checks.
    pub(crate) fn store_decoded(&mut self, field: &FieldDescriptor, value: Value) {
        if field.is_list() {
            if let FieldStorage::Repeated(values) = self.storage_mut(field) {
                values.push(value);
            }
        } else {
            self.store_singular(field, value);
        }
    }
}

fn storage_is_set(field: &FieldDescriptor, storage: &FieldStorage) -> bool {
    match storage {
        FieldStorage::Repeated(values) => !values.is_empty(),
        FieldStorage::Singular { present, .. } if field.supports_presence() => *present,
        FieldStorage::Singular { value, present } => *present && !value.is_implicit_default(),
    }
}

fn empty_storage(field: &FieldDescriptor) -> FieldStorage {
    if field.is_list() {
        return FieldStorage::Repeated(RepeatedField::new());
    }
    let value = match field.message_type() {
        Some(message_type) => Value::Message(DynamicMessage::new(message_type)),
        None => field.default_value(),
    };
    FieldStorage::Singular {
        value,
        present: false,
    }
}

fn sub_message_prefix(prefix: &str, field: &FieldDescriptor, index: Option<usize>) -> String {
    let mut result = prefix.to_owned();
    if field.is_extension() {
        result.push('(');
        result.push_str(field.full_name());
        result.push(')');
    } else {
        result.push_str(field.name());
    }
    if let Some(index) = index {
        result.push_str(&format!("[{index}]"));
    }
    result.push('.');
    result
}

fn kind_name(field: &FieldDescriptor) -> String {
    match field.kind() {
        Kind::Message(m) => m.full_name().to_owned(),
        Kind::Enum(e) => e.full_name().to_owned(),
        _ => field.field_type().keyword().to_owned(),
    }
}

impl PartialEq for DynamicMessage {
    fn eq(&self, other: &Self) -> bool {
        if self.desc != other.desc || self.unknown_fields != other.unknown_fields {
            return false;
        }
        let mut left = self.present_entries();
        let mut right = other.present_entries();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some((fa, sa)), Some((fb, sb))) => {
                    if fa != fb || !storage_eq(sa, sb) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

fn storage_eq(a: &FieldStorage, b: &FieldStorage) -> bool {
    match (a, b) {
        (FieldStorage::Singular { value: va, .. }, FieldStorage::Singular { value: vb, .. }) => va == vb,
        (FieldStorage::Repeated(va), FieldStorage::Repeated(vb)) => va == vb,
        _ => false,
    }
}

impl fmt::Display for DynamicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::text_format::Printer::new().print_to_string(self))
    }
}

impl fmt::Debug for DynamicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ {} }}", self.desc.full_name(), self.short_debug_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::build_pool;

    fn pool() -> crate::DescriptorPool {
        build_pool(&[r#"
            name: "unittest.proto"
            package: "test"
            message_type {
              name: "Nested"
              field { name: "bb" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
              field { name: "req" number: 2 label: LABEL_REQUIRED type: TYPE_INT32 }
            }
            message_type {
              name: "All"
              field { name: "i" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
              field { name: "s" number: 2 label: LABEL_OPTIONAL type: TYPE_STRING default_value: "hi" }
              field { name: "rep" number: 3 label: LABEL_REPEATED type: TYPE_INT64 }
              field { name: "child" number: 4 label: LABEL_OPTIONAL type: TYPE_MESSAGE type_name: ".test.Nested" }
              field { name: "children" number: 5 label: LABEL_REPEATED type: TYPE_MESSAGE type_name: ".test.Nested" }
              field { name: "o1" number: 6 label: LABEL_OPTIONAL type: TYPE_INT32 oneof_index: 0 }
              field { name: "o2" number: 7 label: LABEL_OPTIONAL type: TYPE_MESSAGE type_name: ".test.Nested" oneof_index: 0 }
              oneof_decl { name: "choice" }
            }
        "#])
    }

    fn field(msg: &MessageDescriptor, name: &str) -> FieldDescriptor {
        msg.get_field_by_name(name).unwrap()
    }

    #[test]
    fn unset_fields_read_as_defaults() {
        let desc = pool().find_message_by_name("test.All").unwrap();
        let msg = DynamicMessage::new(desc.clone());
        assert!(!msg.has_field(&field(&desc, "s")));
        assert_eq!(msg.get_field(&field(&desc, "s")).as_str(), Some("hi"));
        assert_eq!(msg.get_field(&field(&desc, "rep")).as_list(), Some(&[][..]));
        let child = msg.get_field(&field(&desc, "child"));
        assert!(child.as_message().unwrap().list_fields().is_empty());
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let desc = pool().find_message_by_name("test.All").unwrap();
        let mut msg = DynamicMessage::new(desc.clone());
        let err = msg.set_field(&field(&desc, "i"), Value::I64(1)).unwrap_err();
        assert!(matches!(err, ReflectError::TypeMismatch { .. }));
        let nested = pool().find_message_by_name("test.Nested").unwrap();
        let err = msg.set_field(&field(&nested, "bb"), Value::I32(1)).unwrap_err();
        assert!(matches!(err, ReflectError::WrongContainingType { .. }));
    }

    #[test]
    fn oneof_last_set_wins() {
        let desc = pool().find_message_by_name("test.All").unwrap();
        let choice = desc.get_oneof_by_name("choice").unwrap();
        let mut msg = DynamicMessage::new(desc.clone());
        msg.get_message_mut(&field(&desc, "o2")).unwrap();
        assert_eq!(msg.which_oneof(&choice), Some(field(&desc, "o2")));
        msg.set_field(&field(&desc, "o1"), Value::I32(5)).unwrap();
        assert_eq!(msg.which_oneof(&choice), Some(field(&desc, "o1")));
        assert!(!msg.has_field(&field(&desc, "o2")));
        msg.clear_oneof(&choice);
        assert!(!msg.has_oneof(&choice));
    }

    #[test]
    fn cleared_message_reads_as_fresh_default() {
        let desc = pool().find_message_by_name("test.All").unwrap();
        let child = field(&desc, "child");
        let mut msg = DynamicMessage::new(desc.clone());
        msg.get_message_mut(&child)
            .unwrap()
            .set_field_by_name("bb", Value::I32(7))
            .unwrap();
        msg.clear_field(&child);
        assert!(!msg.has_field(&child));
        let fresh = msg.get_message_mut(&child).unwrap();
        assert!(fresh.list_fields().is_empty());
    }

    #[test]
    fn repeated_message_slots_are_reused() {
        let desc = pool().find_message_by_name("test.All").unwrap();
        let children = field(&desc, "children");
        let mut msg = DynamicMessage::new(desc.clone());
        msg.add_message(&children).unwrap().set_field_by_name("bb", Value::I32(1)).unwrap();
        msg.add_message(&children).unwrap();
        msg.remove_last(&children).unwrap();
        assert_eq!(msg.field_size(&children), 1);
        let reused = msg.add_message(&children).unwrap();
        assert!(reused.list_fields().is_empty());
        assert_eq!(msg.field_size(&children), 2);
        let released = msg.release_last(&children).unwrap().unwrap();
        assert!(released.as_message().is_some());
        assert_eq!(msg.field_size(&children), 1);
    }

    #[test]
    fn merge_concatenates_and_overwrites() {
        let desc = pool().find_message_by_name("test.All").unwrap();
        let mut a = DynamicMessage::new(desc.clone());
        a.set_field_by_name("i", Value::I32(1)).unwrap();
        a.set_field_by_name("rep", Value::List(vec![Value::I64(1)])).unwrap();
        let mut b = DynamicMessage::new(desc.clone());
        b.set_field_by_name("i", Value::I32(2)).unwrap();
        b.set_field_by_name("rep", Value::List(vec![Value::I64(2), Value::I64(3)])).unwrap();
        b.merge_from(&a).unwrap();
        assert_eq!(b.get_field_by_name("i").unwrap().as_i32(), Some(1));
        assert_eq!(b.field_size(&field(&desc, "rep")), 3);

        let mut empty = DynamicMessage::new(desc);
        empty.merge_from(&a).unwrap();
        assert_eq!(empty, a);
    }

    #[test]
    fn initialization_error_paths() {
        let desc = pool().find_message_by_name("test.All").unwrap();
        let mut msg = DynamicMessage::new(desc.clone());
        msg.get_message_mut(&field(&desc, "child")).unwrap();
        msg.add_message(&field(&desc, "children")).unwrap();
        msg.add_message(&field(&desc, "children"))
            .unwrap()
            .set_field_by_name("req", Value::I32(1))
            .unwrap();
        assert_eq!(msg.find_initialization_errors(), vec!["child.req", "children[0].req"]);
        assert!(!msg.is_initialized());
    }

    #[test]
    fn swap_and_copy_check_types() {
        let pool = pool();
        let all = pool.find_message_by_name("test.All").unwrap();
        let nested = pool.find_message_by_name("test.Nested").unwrap();
        let mut a = DynamicMessage::new(all.clone());
        a.set_field_by_name("i", Value::I32(9)).unwrap();
        let mut b = DynamicMessage::new(all);
        b.swap(&mut a).unwrap();
        assert_eq!(b.get_field_by_name("i").unwrap().as_i32(), Some(9));
        assert!(a.list_fields().is_empty());
        let mut other = DynamicMessage::new(nested);
        assert!(matches!(
            other.copy_from(&b),
            Err(ReflectError::DescriptorMismatch { .. })
        ));
    }

    #[test]
    fn swap_elements_bounds() {
        let desc = pool().find_message_by_name("test.All").unwrap();
        let rep = field(&desc, "rep");
        let mut msg = DynamicMessage::new(desc);
        msg.add_repeated(&rep, Value::I64(1)).unwrap();
        msg.add_repeated(&rep, Value::I64(2)).unwrap();
        msg.swap_elements(&rep, 0, 1).unwrap();
        assert_eq!(msg.get_repeated(&rep, 0), Some(&Value::I64(2)));
        assert!(msg.swap_elements(&rep, 0, 5).is_err());
        msg.set_repeated(&rep, 1, Value::I64(10)).unwrap();
        assert_eq!(msg.get_repeated(&rep, 1), Some(&Value::I64(10)));
    }
}
