//! proto3 JSON output for [`DynamicMessage`].
//!
//! Fields are keyed by their JSON name and extensions by `"[full.name]"`.
//! 64-bit integers and non-finite floats are written as strings, bytes as
//! standard base64, enums by value name (or number when the value is
//! unknown), map fields as objects and other repeated fields as arrays.
//!
//! ```
//! use protodyn::test_utils::build_pool;
//! use protodyn::Value;
//!
//! let pool = build_pool(&[r#"
//!     name: "t.proto" package: "t" syntax: "proto3"
//!     message_type { name: "M"
//!       field { name: "big_id" number: 1 label: LABEL_OPTIONAL type: TYPE_INT64 }
//!     }
//! "#]);
//! let mut message = pool.find_message_by_name("t.M").unwrap().new_message();
//! message.set_field_by_name("big_id", Value::I64(7)).unwrap();
//! assert_eq!(serde_json::to_string(&message).unwrap(), r#"{"bigId":"7"}"#);
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::descriptor::{FieldDescriptor, MessageDescriptor};
use crate::reflection::{DynamicMessage, FieldStorage, Value};

/// Compact JSON text of `message`.
pub fn to_json_string(message: &DynamicMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Indented JSON text of `message`.
pub fn to_json_string_pretty(message: &DynamicMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(message)
}

impl Serialize for DynamicMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<_> = self.present_entries().collect();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (field, storage) in entries {
            let key: Cow<'_, str> = if field.is_extension() {
                Cow::Owned(format!("[{}]", field.full_name()))
            } else {
                Cow::Borrowed(field.json_name())
            };
            match storage {
                FieldStorage::Singular { value, .. } => {
                    map.serialize_entry(key.as_ref(), &FieldValue { field, value })?
                }
                FieldStorage::Repeated(values) => match map_entry_type(field) {
                    Some(entry) => map.serialize_entry(
                        key.as_ref(),
                        &MapEntries {
                            entry,
                            entries: values,
                        },
                    )?,
                    None => map.serialize_entry(key.as_ref(), &RepeatedValues { field, values })?,
                },
            }
        }
        map.end()
    }
}

fn map_entry_type(field: &FieldDescriptor) -> Option<MessageDescriptor> {
    field.message_type().filter(MessageDescriptor::is_map_entry)
}

/// One value of `field`, typed by the field's declaration.
struct FieldValue<'a> {
    field: &'a FieldDescriptor,
    value: &'a Value,
}

impl Serialize for FieldValue<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.value {
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::I64(v) => serializer.collect_str(v),
            Value::U64(v) => serializer.collect_str(v),
            Value::F32(v) if v.is_finite() => serializer.serialize_f32(*v),
            Value::F32(v) => serializer.serialize_str(non_finite_name(f64::from(*v))),
            Value::F64(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::F64(v) => serializer.serialize_str(non_finite_name(*v)),
            Value::String(v) => serializer.serialize_str(v),
            Value::Bytes(v) => serializer.serialize_str(&STANDARD.encode(v)),
            Value::EnumNumber(number) => {
                let name = self
                    .field
                    .enum_type()
                    .and_then(|enum_type| enum_type.get_value(*number));
                match name {
                    Some(value) => serializer.serialize_str(value.name()),
                    None => serializer.serialize_i32(*number),
                }
            }
            Value::Message(message) => message.serialize(serializer),
            Value::List(values) => RepeatedValues {
                field: self.field,
                values,
            }
            .serialize(serializer),
        }
    }
}

fn non_finite_name(v: f64) -> &'static str {
    if v.is_nan() {
        "NaN"
    } else if v.is_sign_negative() {
        "-Infinity"
    } else {
        "Infinity"
    }
}

struct RepeatedValues<'a> {
    field: &'a FieldDescriptor,
    values: &'a [Value],
}

impl Serialize for RepeatedValues<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.values.len()))?;
        for value in self.values {
            seq.serialize_element(&FieldValue {
                field: self.field,
                value,
            })?;
        }
        seq.end()
    }
}

/// A map field written as a JSON object. When a key repeats, the last
/// entry wins, matching how the binary format merges maps.
struct MapEntries<'a> {
    entry: MessageDescriptor,
    entries: &'a [Value],
}

impl Serialize for MapEntries<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let key_field = self
            .entry
            .get_field(1)
            .ok_or_else(|| S::Error::custom("Map entry missing key field"))?;
        let value_field = self
            .entry
            .get_field(2)
            .ok_or_else(|| S::Error::custom("Map entry missing value field"))?;

        let mut keyed = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            let message = entry
                .as_message()
                .ok_or_else(|| S::Error::custom("Map entry is not a message"))?;
            let key = map_key(&message.get_field(&key_field))
                .ok_or_else(|| S::Error::custom("Invalid map key type; must be scalar"))?;
            keyed.push((key, message));
        }
        let last: HashMap<&str, usize> = keyed
            .iter()
            .enumerate()
            .map(|(index, (key, _))| (key.as_str(), index))
            .collect();

        let mut map = serializer.serialize_map(Some(last.len()))?;
        for (index, (key, message)) in keyed.iter().enumerate() {
            if last.get(key.as_str()) != Some(&index) {
                continue;
            }
            let value = message.get_field(&value_field);
            map.serialize_entry(
                key,
                &FieldValue {
                    field: &value_field,
                    value: &value,
                },
            )?;
        }
        map.end()
    }
}

fn map_key(value: &Value) -> Option<String> {
    match value {
        Value::Bool(v) => Some(v.to_string()),
        Value::I32(v) => Some(v.to_string()),
        Value::I64(v) => Some(v.to_string()),
        Value::U32(v) => Some(v.to_string()),
        Value::U64(v) => Some(v.to_string()),
        Value::String(v) => Some(v.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::DescriptorPool;
    use crate::test_utils::build_pool;

    fn pool() -> DescriptorPool {
        build_pool(&[
            r#"
            name: "json.proto" package: "json" syntax: "proto3"
            enum_type { name: "Color"
              value { name: "COLOR_UNSPECIFIED" number: 0 }
              value { name: "RED" number: 1 }
            }
            message_type { name: "Inner"
              field { name: "label" number: 1 label: LABEL_OPTIONAL type: TYPE_STRING }
            }
            message_type { name: "Outer"
              field { name: "small_int" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
              field { name: "big_int" number: 2 label: LABEL_OPTIONAL type: TYPE_INT64 }
              field { name: "big_uint" number: 3 label: LABEL_OPTIONAL type: TYPE_UINT64 }
              field { name: "ratio" number: 4 label: LABEL_OPTIONAL type: TYPE_DOUBLE }
              field { name: "blob" number: 5 label: LABEL_OPTIONAL type: TYPE_BYTES }
              field { name: "color" number: 6 label: LABEL_OPTIONAL type: TYPE_ENUM type_name: ".json.Color" }
              field { name: "inner" number: 7 label: LABEL_OPTIONAL type: TYPE_MESSAGE type_name: ".json.Inner" }
              field { name: "scores" number: 8 label: LABEL_REPEATED type: TYPE_FLOAT }
              field { name: "counts" number: 9 label: LABEL_REPEATED type: TYPE_MESSAGE type_name: ".json.Outer.CountsEntry" }
              field { name: "renamed" number: 10 label: LABEL_OPTIONAL type: TYPE_BOOL json_name: "customName" }
              nested_type { name: "CountsEntry"
                field { name: "key" number: 1 label: LABEL_OPTIONAL type: TYPE_STRING }
                field { name: "value" number: 2 label: LABEL_OPTIONAL type: TYPE_INT32 }
                options { map_entry: true }
              }
            }
            "#,
            r#"
            name: "ext.proto" package: "ext"
            message_type { name: "Base"
              field { name: "id" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
              extension_range { start: 100 end: 200 }
            }
            extension { name: "note" number: 100 label: LABEL_OPTIONAL type: TYPE_STRING extendee: ".ext.Base" }
            "#,
        ])
    }

    fn json_of(message: &DynamicMessage) -> serde_json::Value {
        serde_json::to_value(message).unwrap()
    }

    #[test]
    fn scalar_mapping() {
        let pool = pool();
        let mut msg = pool.find_message_by_name("json.Outer").unwrap().new_message();
        msg.set_field_by_name("small_int", Value::I32(-4)).unwrap();
        msg.set_field_by_name("big_int", Value::I64(-9_000_000_000)).unwrap();
        msg.set_field_by_name("big_uint", Value::U64(u64::MAX)).unwrap();
        msg.set_field_by_name("ratio", Value::F64(0.5)).unwrap();
        msg.set_field_by_name("blob", Value::Bytes(b"hi!".to_vec())).unwrap();
        msg.set_field_by_name("color", Value::EnumNumber(1)).unwrap();
        msg.set_field_by_name("renamed", Value::Bool(true)).unwrap();
        assert_eq!(
            json_of(&msg),
            json!({
                "smallInt": -4,
                "bigInt": "-9000000000",
                "bigUint": "18446744073709551615",
                "ratio": 0.5,
                "blob": "aGkh",
                "color": "RED",
                "customName": true,
            })
        );
    }

    #[test]
    fn unknown_enum_numbers_and_non_finite_floats() {
        let pool = pool();
        let mut msg = pool.find_message_by_name("json.Outer").unwrap().new_message();
        msg.set_field_by_name("color", Value::EnumNumber(42)).unwrap();
        msg.set_field_by_name("ratio", Value::F64(f64::NEG_INFINITY)).unwrap();
        msg.set_field_by_name(
            "scores",
            Value::List(vec![Value::F32(1.5), Value::F32(f32::NAN), Value::F32(f32::INFINITY)]),
        )
        .unwrap();
        assert_eq!(
            json_of(&msg),
            json!({
                "ratio": "-Infinity",
                "color": 42,
                "scores": [1.5, "NaN", "Infinity"],
            })
        );
    }

    #[test]
    fn nested_messages_and_maps() {
        let pool = pool();
        let outer = pool.find_message_by_name("json.Outer").unwrap();
        let counts = outer.get_field_by_name("counts").unwrap();
        let mut msg = outer.new_message();
        msg.get_message_mut(&outer.get_field_by_name("inner").unwrap())
            .unwrap()
            .set_field_by_name("label", Value::String("x".into()))
            .unwrap();
        for (key, value) in [("a", 1), ("b", 2), ("a", 3)] {
            let entry = msg.add_message(&counts).unwrap();
            entry.set_field_by_name("key", Value::String(key.into())).unwrap();
            entry.set_field_by_name("value", Value::I32(value)).unwrap();
        }
        assert_eq!(
            json_of(&msg),
            json!({
                "inner": { "label": "x" },
                "counts": { "b": 2, "a": 3 },
            })
        );
    }

    #[test]
    fn extensions_use_bracketed_full_names() {
        let pool = pool();
        let base = pool.find_message_by_name("ext.Base").unwrap();
        let note = pool.find_extension_by_name("ext.note").unwrap();
        let mut msg = base.new_message();
        msg.set_field_by_name("id", Value::I32(1)).unwrap();
        msg.set_field(&note, Value::String("hello".into())).unwrap();
        assert_eq!(to_json_string(&msg).unwrap(), r#"{"id":1,"[ext.note]":"hello"}"#);
    }

    #[test]
    fn empty_message_is_empty_object() {
        let pool = pool();
        let msg = pool.find_message_by_name("json.Inner").unwrap().new_message();
        assert_eq!(to_json_string(&msg).unwrap(), "{}");
        assert_eq!(to_json_string_pretty(&msg).unwrap(), "{}");
    }
}
