//! Dynamic protobuf: the binary wire format, descriptors built at runtime
//! from `FileDescriptorProto`s, reflective messages, and the text format.

pub mod wire;

pub mod decoding;
pub mod encoding;
pub mod unknown_fields;

pub mod google;

pub mod descriptor;
pub mod descriptor_database;
pub mod descriptor_pool;

pub mod reflection;
pub mod repeated_field;

pub mod text_format;

#[cfg(feature = "serde_support")]
pub mod serde;

pub mod test_utils;

pub use decoding::{CodedReader, DecodeError, DecodeErrorKind, DecodeOptions};
pub use descriptor::{
    EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FileDescriptor, Kind, MessageDescriptor,
    MethodDescriptor, OneofDescriptor, ServiceDescriptor, Syntax,
};
pub use descriptor_database::{
    DescriptorDatabase, DescriptorPoolDatabase, EncodedDescriptorDatabase,
    MergedDescriptorDatabase, SimpleDescriptorDatabase,
};
pub use descriptor_pool::{BuildError, DescriptorError, DescriptorPool, ErrorCollector, ErrorLocation};
pub use encoding::CodedWriter;
pub use reflection::{DynamicMessage, ReflectError, Value};
pub use unknown_fields::{UnknownField, UnknownFieldSet, UnknownValue};

use wire::{Tag, WireType};

/// Any failure surfaced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    TextFormat(#[from] text_format::ParseError),
    #[error(transparent)]
    Reflect(#[from] ReflectError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A message type with a compiled, field-by-field codec.
pub trait Message: Default {
    /// Consumes the value for `tag`, storing it or keeping it as unknown.
    fn merge_field(&mut self, tag: Tag, reader: &mut CodedReader<'_>) -> Result<(), DecodeError>;

    /// Writes every set field without a length prefix.
    fn encode_raw(&self, writer: &mut CodedWriter);

    fn merge_from_reader(&mut self, reader: &mut CodedReader<'_>) -> Result<(), DecodeError> {
        while let Some(tag) = reader.read_tag()? {
            if tag.wire_type() == WireType::EndGroup {
                return Err(reader.error(DecodeErrorKind::UnexpectedEndGroup(tag.field_number())));
            }
            self.merge_field(tag, reader)?;
        }
        Ok(())
    }

    fn merge_from_bytes(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        self.merge_from_reader(&mut CodedReader::new(bytes))
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        message.merge_from_bytes(bytes)?;
        Ok(message)
    }

    /// Reads a varint length prefix and then that many bytes of message.
    fn decode_length_delimited(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = CodedReader::new(bytes);
        let body = reader.read_length_delimited()?;
        Self::decode(body)
    }

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut writer = CodedWriter::new();
        self.encode_raw(&mut writer);
        writer.into_inner()
    }

    fn encode_length_delimited_to_vec(&self) -> Vec<u8> {
        let body = self.encode_to_vec();
        let mut writer = CodedWriter::with_capacity(body.len() + wire::MAX_VARINT_LEN);
        writer.write_length_delimited(&body);
        writer.into_inner()
    }

    fn encoded_len(&self) -> usize {
        self.encode_to_vec().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::protobuf::FileDescriptorProto;

    #[test]
    fn length_delimited_framing() {
        let file = FileDescriptorProto {
            name: Some("a.proto".into()),
            ..Default::default()
        };
        let framed = file.encode_length_delimited_to_vec();
        assert_eq!(framed[0] as usize, file.encoded_len());
        assert_eq!(FileDescriptorProto::decode_length_delimited(&framed).unwrap(), file);
    }

    #[test]
    fn stray_end_group_is_an_error() {
        // END_GROUP for field 1
        let err = FileDescriptorProto::decode(&[0x0c]).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::UnexpectedEndGroup(1));
    }
}
