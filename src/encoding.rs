use crate::Message;
use crate::descriptor::FieldDescriptor;
use crate::google::protobuf::field_descriptor_proto::Type;
use crate::reflection::{DynamicMessage, FieldStorage, Value};
use crate::unknown_fields::{UnknownField, UnknownFieldSet, UnknownValue};
use crate::wire::{WireType, encode_varint, varint_len, zigzag_encode32, zigzag_encode64};

/// Append-only output buffer for the binary wire format.
#[derive(Clone, Debug, Default)]
pub struct CodedWriter {
    buf: Vec<u8>,
}

impl CodedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CodedWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    pub fn write_tag(&mut self, field_number: u32, wire_type: WireType) {
        self.write_varint(u64::from((field_number << 3) | wire_type as u32));
    }

    #[inline]
    pub fn write_varint(&mut self, value: u64) {
        encode_varint(value, &mut self.buf);
    }

    pub fn write_fixed32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Length prefix followed by the bytes.
    pub fn write_length_delimited(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a length-delimited field whose body is produced by `body`.
    /// The body goes straight into this buffer behind a one-byte length
    /// slot, which widens in place when the body reaches 128 bytes.
    pub fn write_nested(&mut self, field_number: u32, body: impl FnOnce(&mut CodedWriter)) {
        self.write_tag(field_number, WireType::LengthDelimited);
        let slot = self.buf.len();
        self.buf.push(0);
        body(self);
        let len = self.buf.len() - slot - 1;
        let mut prefix = Vec::with_capacity(varint_len(len as u64));
        encode_varint(len as u64, &mut prefix);
        self.buf.splice(slot..slot + 1, prefix);
    }

    pub fn write_string_field(&mut self, field_number: u32, value: &str) {
        self.write_bytes_field(field_number, value.as_bytes());
    }

    pub fn write_bytes_field(&mut self, field_number: u32, value: &[u8]) {
        self.write_tag(field_number, WireType::LengthDelimited);
        self.write_length_delimited(value);
    }

    /// Negative values are sign extended to ten bytes.
    pub fn write_int32_field(&mut self, field_number: u32, value: i32) {
        self.write_tag(field_number, WireType::Varint);
        self.write_varint(value as i64 as u64);
    }

    pub fn write_int64_field(&mut self, field_number: u32, value: i64) {
        self.write_tag(field_number, WireType::Varint);
        self.write_varint(value as u64);
    }

    pub fn write_uint64_field(&mut self, field_number: u32, value: u64) {
        self.write_tag(field_number, WireType::Varint);
        self.write_varint(value);
    }

    pub fn write_bool_field(&mut self, field_number: u32, value: bool) {
        self.write_tag(field_number, WireType::Varint);
        self.write_varint(value as u64);
    }

    pub fn write_double_field(&mut self, field_number: u32, value: f64) {
        self.write_tag(field_number, WireType::Fixed64);
        self.write_fixed64(value.to_bits());
    }

    pub fn write_message_field<M: Message>(&mut self, field_number: u32, message: &M) {
        self.write_nested(field_number, |w| message.encode_raw(w));
    }
}

/// Byte sink shared by the sizing and writing passes over a dynamic message.
trait Output {
    fn tag(&mut self, number: u32, wire_type: WireType);
    fn varint(&mut self, value: u64);
    fn fixed32(&mut self, value: u32);
    fn fixed64(&mut self, value: u64);
    fn raw(&mut self, bytes: &[u8]);
    /// Tag and length prefix, then whatever `body` emits.
    fn nested(&mut self, number: u32, body: impl FnOnce(&mut Self));

    fn bytes_field(&mut self, number: u32, bytes: &[u8]) {
        self.tag(number, WireType::LengthDelimited);
        self.varint(bytes.len() as u64);
        self.raw(bytes);
    }
}

/// First pass. Records the length of every nested body in the order the
/// second pass reaches them.
#[derive(Debug, Default)]
struct Sizer {
    len: usize,
    sizes: Vec<usize>,
}

impl Output for Sizer {
    fn tag(&mut self, number: u32, wire_type: WireType) {
        self.len += varint_len(u64::from((number << 3) | wire_type as u32));
    }

    fn varint(&mut self, value: u64) {
        self.len += varint_len(value);
    }

    fn fixed32(&mut self, _: u32) {
        self.len += 4;
    }

    fn fixed64(&mut self, _: u64) {
        self.len += 8;
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.len += bytes.len();
    }

    fn nested(&mut self, number: u32, body: impl FnOnce(&mut Self)) {
        let slot = self.sizes.len();
        self.sizes.push(0);
        let start = self.len;
        body(self);
        let size = self.len - start;
        self.sizes[slot] = size;
        self.varint(size as u64);
        self.tag(number, WireType::LengthDelimited);
    }
}

/// Second pass. Every length prefix comes from the sizer.
struct Emitter<'a> {
    writer: &'a mut CodedWriter,
    sizes: std::slice::Iter<'a, usize>,
}

impl Output for Emitter<'_> {
    fn tag(&mut self, number: u32, wire_type: WireType) {
        self.writer.write_tag(number, wire_type);
    }

    fn varint(&mut self, value: u64) {
        self.writer.write_varint(value);
    }

    fn fixed32(&mut self, value: u32) {
        self.writer.write_fixed32(value);
    }

    fn fixed64(&mut self, value: u64) {
        self.writer.write_fixed64(value);
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.writer.write_raw(bytes);
    }

    fn nested(&mut self, number: u32, body: impl FnOnce(&mut Self)) {
        let size = self.sizes.next().copied();
        debug_assert!(size.is_some(), "sizing pass missed a nested body");
        self.writer.write_tag(number, WireType::LengthDelimited);
        self.writer.write_varint(size.unwrap_or_default() as u64);
        body(self);
    }
}

/// Writes `message` in canonical order: known fields and extensions by
/// ascending number, then unknown fields.
pub(crate) fn encode_message(message: &DynamicMessage, writer: &mut CodedWriter) {
    let mut sizer = Sizer::default();
    emit_message(message, &mut sizer);
    writer.buf.reserve(sizer.len);
    let mut emitter = Emitter {
        writer,
        sizes: sizer.sizes.iter(),
    };
    emit_message(message, &mut emitter);
}

/// Length of the encoding `encode_message` would produce.
pub(crate) fn encoded_len(message: &DynamicMessage) -> usize {
    let mut sizer = Sizer::default();
    emit_message(message, &mut sizer);
    sizer.len
}

fn emit_message<O: Output>(message: &DynamicMessage, out: &mut O) {
    let message_set = message.descriptor().is_message_set();
    for (field, storage) in message.entries() {
        if message_set && field.is_extension() && !field.is_list() {
            if let FieldStorage::Singular {
                value: Value::Message(item),
                present: true,
            } = storage
            {
                emit_message_set_item(out, field.number(), |o| emit_message(item, o));
                continue;
            }
        }
        emit_field(message, field, storage, out);
    }
    if message_set {
        emit_message_set_unknown(message.unknown_fields(), out);
    } else {
        emit_unknown_fields(message.unknown_fields(), out);
    }
}

fn emit_field<O: Output>(
    message: &DynamicMessage,
    field: &FieldDescriptor,
    storage: &FieldStorage,
    out: &mut O,
) {
    let number = field.number();
    let ty = field.field_type();
    match storage {
        FieldStorage::Singular { value, .. } => {
            if message.has_field(field) {
                emit_value(number, ty, value, out);
            }
        }
        FieldStorage::Repeated(values) if values.is_empty() => {}
        FieldStorage::Repeated(values) if field.is_packed() => {
            out.nested(number, |o| {
                for value in values.iter() {
                    emit_scalar(ty, value, o);
                }
            });
        }
        FieldStorage::Repeated(values) => {
            for value in values.iter() {
                emit_value(number, ty, value, out);
            }
        }
    }
}

/// Tag plus value for one element.
fn emit_value<O: Output>(number: u32, ty: Type, value: &Value, out: &mut O) {
    match (ty, value) {
        (Type::Message, Value::Message(message)) => {
            out.nested(number, |o| emit_message(message, o));
        }
        (Type::Group, Value::Message(message)) => {
            out.tag(number, WireType::StartGroup);
            emit_message(message, out);
            out.tag(number, WireType::EndGroup);
        }
        (Type::String, Value::String(s)) => out.bytes_field(number, s.as_bytes()),
        (Type::Bytes, Value::Bytes(b)) => out.bytes_field(number, b),
        _ => {
            out.tag(number, crate::wire::wire_type_for(ty));
            emit_scalar(ty, value, out);
        }
    }
}

/// Value without a tag, as it appears inside a packed run.
fn emit_scalar<O: Output>(ty: Type, value: &Value, out: &mut O) {
    match (ty, value) {
        (Type::Double, Value::F64(v)) => out.fixed64(v.to_bits()),
        (Type::Float, Value::F32(v)) => out.fixed32(v.to_bits()),
        (Type::Int64, Value::I64(v)) => out.varint(*v as u64),
        (Type::Uint64, Value::U64(v)) => out.varint(*v),
        (Type::Int32, Value::I32(v)) => out.varint(*v as i64 as u64),
        (Type::Fixed64, Value::U64(v)) => out.fixed64(*v),
        (Type::Fixed32, Value::U32(v)) => out.fixed32(*v),
        (Type::Bool, Value::Bool(v)) => out.varint(*v as u64),
        (Type::Uint32, Value::U32(v)) => out.varint(u64::from(*v)),
        (Type::Enum, Value::EnumNumber(v)) => out.varint(*v as i64 as u64),
        (Type::Sfixed32, Value::I32(v)) => out.fixed32(*v as u32),
        (Type::Sfixed64, Value::I64(v)) => out.fixed64(*v as u64),
        (Type::Sint32, Value::I32(v)) => out.varint(u64::from(zigzag_encode32(*v))),
        (Type::Sint64, Value::I64(v)) => out.varint(zigzag_encode64(*v)),
        // set_field rejects mismatched values, so this is unreachable through
        // the public API
        (ty, value) => debug_assert!(false, "value {value:?} stored for field of type {ty:?}"),
    }
}

fn emit_unknown_fields<O: Output>(unknown: &UnknownFieldSet, out: &mut O) {
    for field in unknown.iter() {
        emit_unknown_field(field, out);
    }
}

fn emit_unknown_field<O: Output>(field: &UnknownField, out: &mut O) {
    let number = field.number();
    match field.value() {
        UnknownValue::Varint(v) => {
            out.tag(number, WireType::Varint);
            out.varint(*v);
        }
        UnknownValue::Fixed32(v) => {
            out.tag(number, WireType::Fixed32);
            out.fixed32(*v);
        }
        UnknownValue::Fixed64(v) => {
            out.tag(number, WireType::Fixed64);
            out.fixed64(*v);
        }
        UnknownValue::LengthDelimited(bytes) => out.bytes_field(number, bytes),
        UnknownValue::Group(group) => {
            out.tag(number, WireType::StartGroup);
            emit_unknown_fields(group, out);
            out.tag(number, WireType::EndGroup);
        }
    }
}

fn emit_message_set_item<O: Output>(out: &mut O, type_id: u32, body: impl FnOnce(&mut O)) {
    out.tag(1, WireType::StartGroup);
    out.tag(2, WireType::Varint);
    out.varint(u64::from(type_id));
    out.nested(3, body);
    out.tag(1, WireType::EndGroup);
}

/// Unknown length-delimited entries of a MessageSet are items whose type id
/// was not recognized; they go back out in item framing.
fn emit_message_set_unknown<O: Output>(unknown: &UnknownFieldSet, out: &mut O) {
    for field in unknown.iter() {
        match field.value() {
            UnknownValue::LengthDelimited(bytes) => {
                emit_message_set_item(out, field.number(), |o| o.raw(bytes));
            }
            _ => emit_unknown_field(field, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_helpers_produce_canonical_bytes() {
        let mut w = CodedWriter::new();
        w.write_int32_field(1, 150);
        assert_eq!(w.as_slice(), [0x08, 0x96, 0x01]);

        let mut w = CodedWriter::new();
        w.write_string_field(2, "testing");
        assert_eq!(w.as_slice(), b"\x12\x07testing");

        let mut w = CodedWriter::new();
        w.write_int32_field(1, -1);
        assert_eq!(w.len(), 11);
    }

    #[test]
    fn nested_body_is_length_prefixed() {
        let mut w = CodedWriter::new();
        w.write_nested(3, |inner| inner.write_int32_field(1, 150));
        assert_eq!(w.as_slice(), [0x1a, 0x03, 0x08, 0x96, 0x01]);
    }

    #[test]
    fn nested_body_widens_its_length_slot() {
        let mut w = CodedWriter::new();
        w.write_nested(1, |inner| inner.write_bytes_field(2, &[7; 200]));
        let bytes = w.into_inner();
        assert_eq!(&bytes[..3], [0x0a, 0xcb, 0x01]);
        assert_eq!(bytes.len(), 3 + 203);
        assert_eq!(&bytes[3..6], [0x12, 0xc8, 0x01]);
    }

    #[test]
    fn message_set_item_framing() {
        let mut sizer = Sizer::default();
        emit_message_set_item(&mut sizer, 1547769, |o| o.raw(b"\x08\x01"));
        let mut w = CodedWriter::new();
        let mut emitter = Emitter {
            writer: &mut w,
            sizes: sizer.sizes.iter(),
        };
        emit_message_set_item(&mut emitter, 1547769, |o| o.raw(b"\x08\x01"));
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), sizer.len);
        assert_eq!(sizer.sizes, [2]);
        // START_GROUP(1), type_id(2), message(3), END_GROUP(1)
        assert_eq!(bytes[0], 0x0b);
        assert_eq!(bytes[1], 0x10);
        assert_eq!(*bytes.last().unwrap(), 0x0c);
    }

    const NODE: &str = r#"
        name: "node.proto" package: "n"
        message_type { name: "Node"
          field { name: "child" number: 1 label: LABEL_OPTIONAL type: TYPE_MESSAGE type_name: ".n.Node" }
          field { name: "v" number: 2 label: LABEL_REPEATED type: TYPE_INT32 options { packed: true } }
        }
    "#;

    #[test]
    fn deep_messages_are_sized_once_per_level() {
        let pool = crate::test_utils::build_pool(&[NODE]);
        let node = pool.find_message_by_name("n.Node").unwrap();
        let child = node.get_field_by_name("child").unwrap();
        let v = node.get_field_by_name("v").unwrap();

        let depth = 500;
        let mut root = node.new_message();
        let mut current = &mut root;
        for _ in 0..depth {
            current = current.get_message_mut(&child).unwrap();
        }
        current.add_repeated(&v, Value::I32(300)).unwrap();

        let mut sizer = Sizer::default();
        emit_message(&root, &mut sizer);
        // One slot per message level plus the packed run.
        assert_eq!(sizer.sizes.len(), depth + 1);
        assert!(sizer.sizes.windows(2).all(|pair| pair[0] > pair[1]));
        assert_eq!(*sizer.sizes.last().unwrap(), 2);

        let bytes = root.encode_to_vec();
        assert_eq!(bytes.len(), sizer.len);
        assert_eq!(root.encoded_len(), bytes.len());
        assert_eq!(&bytes[bytes.len() - 4..], [0x12, 0x02, 0xac, 0x02]);
        // Innermost length prefixes are single bytes.
        assert_eq!(&bytes[bytes.len() - 6..bytes.len() - 4], [0x0a, 0x04]);
    }
}
