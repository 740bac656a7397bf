//! Fields that were present on the wire but not described by the schema.

use crate::decoding::{CodedReader, DecodeError, DecodeErrorKind};
use crate::encoding::CodedWriter;
use crate::wire::{Tag, WireType};

#[derive(Clone, Debug, PartialEq)]
pub enum UnknownValue {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    LengthDelimited(Vec<u8>),
    Group(UnknownFieldSet),
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnknownField {
    number: u32,
    value: UnknownValue,
}

impl UnknownField {
    pub fn new(number: u32, value: UnknownValue) -> Self {
        UnknownField { number, value }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn value(&self) -> &UnknownValue {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut UnknownValue {
        &mut self.value
    }

    pub fn wire_type(&self) -> WireType {
        match self.value {
            UnknownValue::Varint(_) => WireType::Varint,
            UnknownValue::Fixed32(_) => WireType::Fixed32,
            UnknownValue::Fixed64(_) => WireType::Fixed64,
            UnknownValue::LengthDelimited(_) => WireType::LengthDelimited,
            UnknownValue::Group(_) => WireType::StartGroup,
        }
    }

    pub(crate) fn encode(&self, writer: &mut CodedWriter) {
        match &self.value {
            UnknownValue::Varint(v) => {
                writer.write_tag(self.number, WireType::Varint);
                writer.write_varint(*v);
            }
            UnknownValue::Fixed32(v) => {
                writer.write_tag(self.number, WireType::Fixed32);
                writer.write_fixed32(*v);
            }
            UnknownValue::Fixed64(v) => {
                writer.write_tag(self.number, WireType::Fixed64);
                writer.write_fixed64(*v);
            }
            UnknownValue::LengthDelimited(bytes) => writer.write_bytes_field(self.number, bytes),
            UnknownValue::Group(group) => {
                writer.write_tag(self.number, WireType::StartGroup);
                group.encode(writer);
                writer.write_tag(self.number, WireType::EndGroup);
            }
        }
    }
}

/// Ordered list of unknown fields. Order of arrival is preserved so that
/// re-encoding reproduces the input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnknownFieldSet {
    fields: Vec<UnknownField>,
}

impl UnknownFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnknownField> {
        self.fields.iter()
    }

    pub fn get(&self, index: usize) -> Option<&UnknownField> {
        self.fields.get(index)
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn add_varint(&mut self, number: u32, value: u64) {
        self.fields.push(UnknownField::new(number, UnknownValue::Varint(value)));
    }

    pub fn add_fixed32(&mut self, number: u32, value: u32) {
        self.fields.push(UnknownField::new(number, UnknownValue::Fixed32(value)));
    }

    pub fn add_fixed64(&mut self, number: u32, value: u64) {
        self.fields.push(UnknownField::new(number, UnknownValue::Fixed64(value)));
    }

    pub fn add_length_delimited(&mut self, number: u32, value: Vec<u8>) {
        self.fields
            .push(UnknownField::new(number, UnknownValue::LengthDelimited(value)));
    }

    /// Appends an empty group and returns it for filling.
    pub fn add_group(&mut self, number: u32) -> &mut UnknownFieldSet {
        self.fields
            .push(UnknownField::new(number, UnknownValue::Group(UnknownFieldSet::new())));
        match self.fields.last_mut().map(UnknownField::value_mut) {
            Some(UnknownValue::Group(group)) => group,
            _ => unreachable!(),
        }
    }

    pub fn add_field(&mut self, field: UnknownField) {
        self.fields.push(field);
    }

    pub fn merge_from(&mut self, other: &UnknownFieldSet) {
        self.fields.extend(other.fields.iter().cloned());
    }

    /// Removes every field with the given number.
    pub fn delete_by_number(&mut self, number: u32) {
        self.fields.retain(|f| f.number != number);
    }

    /// Parses a complete buffer. Fails on malformed input or a stray
    /// END_GROUP tag.
    pub fn parse(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut set = UnknownFieldSet::new();
        let mut reader = CodedReader::new(bytes);
        while let Some(tag) = reader.read_tag()? {
            if tag.wire_type() == WireType::EndGroup {
                return Err(reader.error(DecodeErrorKind::UnexpectedEndGroup(tag.field_number())));
            }
            set.merge_field(tag, &mut reader)?;
        }
        Ok(set)
    }

    /// Reads the value for `tag` and appends it.
    pub fn merge_field(&mut self, tag: Tag, reader: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        let number = tag.field_number();
        match tag.wire_type() {
            WireType::Varint => self.add_varint(number, reader.read_varint()?),
            WireType::Fixed32 => self.add_fixed32(number, reader.read_fixed32()?),
            WireType::Fixed64 => self.add_fixed64(number, reader.read_fixed64()?),
            WireType::LengthDelimited => {
                let bytes = reader.read_length_delimited()?;
                self.add_length_delimited(number, bytes.to_vec());
            }
            WireType::StartGroup => {
                reader.enter_recursion()?;
                let group = self.add_group(number);
                loop {
                    let Some(inner) = reader.read_tag()? else {
                        return Err(reader.error(DecodeErrorKind::MissingEndGroup(number)));
                    };
                    if inner.wire_type() == WireType::EndGroup {
                        if inner.field_number() != number {
                            return Err(reader.error(DecodeErrorKind::MismatchedEndGroup {
                                expected: number,
                                found: inner.field_number(),
                            }));
                        }
                        break;
                    }
                    group.merge_field(inner, reader)?;
                }
                reader.exit_recursion();
            }
            WireType::EndGroup => {
                return Err(reader.error(DecodeErrorKind::UnexpectedEndGroup(number)));
            }
        }
        Ok(())
    }

    pub fn encode(&self, writer: &mut CodedWriter) {
        for field in &self.fields {
            field.encode(writer);
        }
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut writer = CodedWriter::new();
        self.encode(&mut writer);
        writer.into_inner()
    }
}

impl<'a> IntoIterator for &'a UnknownFieldSet {
    type Item = &'a UnknownField;
    type IntoIter = std::slice::Iter<'a, UnknownField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_preserves_order_and_bytes() {
        // 5: varint 1, 3: fixed32, 5: "hi", 7: group { 1: 2 }
        let input = b"\x28\x01\x1d\x02\x00\x00\x00\x2a\x02hi\x3b\x08\x02\x3c";
        let set = UnknownFieldSet::parse(input).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.get(0).unwrap().value(), &UnknownValue::Varint(1));
        assert_eq!(set.get(1).unwrap().value(), &UnknownValue::Fixed32(2));
        match set.get(3).unwrap().value() {
            UnknownValue::Group(group) => assert_eq!(group.len(), 1),
            other => panic!("expected group, got {other:?}"),
        }
        assert_eq!(set.encode_to_vec(), input);
    }

    #[test]
    fn stray_end_group_is_rejected() {
        assert!(UnknownFieldSet::parse(b"def").is_err());
        assert!(UnknownFieldSet::parse(b"\x3b\x08\x02\x44").is_err());
    }

    #[test]
    fn delete_by_number_removes_all_occurrences() {
        let mut set = UnknownFieldSet::new();
        set.add_varint(1, 1);
        set.add_fixed64(2, 2);
        set.add_varint(1, 3);
        set.delete_by_number(1);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0).unwrap().number(), 2);
    }

    #[test]
    fn nested_groups_respect_recursion_limit() {
        let mut input = Vec::new();
        for _ in 0..150 {
            input.push(0x0b);
        }
        for _ in 0..150 {
            input.push(0x0c);
        }
        let err = UnknownFieldSet::parse(&input).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::RecursionLimitExceeded);
    }
}
