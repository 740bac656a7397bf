use crate::Message;
use crate::descriptor::FieldDescriptor;
use crate::google::protobuf::field_descriptor_proto::Type;
use crate::reflection::{DynamicMessage, Value};
use crate::wire::{
    MAX_VARINT_LEN, Tag, WireType, decode_varint, is_packable, wire_type_for, zigzag_decode32,
    zigzag_decode64,
};

/// Nesting depth accepted before parsing gives up.
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeErrorKind {
    #[error("unexpected end of input")]
    Truncated,
    #[error("malformed varint")]
    MalformedVarint,
    #[error("invalid tag {0:#x}")]
    InvalidTag(u64),
    #[error("END_GROUP for field {0} without a matching START_GROUP")]
    UnexpectedEndGroup(u32),
    #[error("END_GROUP for field {found} inside group {expected}")]
    MismatchedEndGroup { expected: u32, found: u32 },
    #[error("group {0} is not terminated")]
    MissingEndGroup(u32),
    #[error("length {0} runs past the end of the enclosing message")]
    LengthOutOfBounds(u64),
    #[error("message nesting exceeds the recursion limit")]
    RecursionLimitExceeded,
    #[error("string field \"{0}\" contains invalid UTF-8")]
    InvalidUtf8(String),
    #[error("input of {0} bytes exceeds the size limit")]
    TooLarge(usize),
    #[error("message is missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),
}

/// A parse failure and the byte offset at which it was detected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} (at byte {offset})")]
pub struct DecodeError {
    kind: DecodeErrorKind,
    offset: usize,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, offset: usize) -> Self {
        DecodeError { kind, offset }
    }

    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Knobs for dynamic parsing.
#[derive(Clone, Copy, Debug)]
pub struct DecodeOptions {
    pub recursion_limit: u32,
    /// Skip the required-field check after parsing.
    pub allow_partial: bool,
    /// Largest total input accepted by the chunked and streaming decoders.
    pub size_limit: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            allow_partial: false,
            size_limit: i32::MAX as usize,
        }
    }
}

/// Cursor over a complete buffer with a movable end limit and a nesting
/// budget.
#[derive(Debug)]
pub struct CodedReader<'a> {
    buf: &'a [u8],
    pos: usize,
    limit: usize,
    recursion_budget: u32,
}

impl<'a> CodedReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_recursion_limit(buf, DEFAULT_RECURSION_LIMIT)
    }

    pub fn with_recursion_limit(buf: &'a [u8], recursion_limit: u32) -> Self {
        CodedReader {
            buf,
            pos: 0,
            limit: buf.len(),
            recursion_budget: recursion_limit,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_limit(&self) -> bool {
        self.pos >= self.limit
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    pub fn recursion_budget(&self) -> u32 {
        self.recursion_budget
    }

    pub fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(kind, self.pos)
    }

    /// `Ok(None)` at the current limit.
    pub fn read_tag(&mut self) -> Result<Option<Tag>, DecodeError> {
        if self.is_at_limit() {
            return Ok(None);
        }
        let start = self.pos;
        let raw = self.read_varint()?;
        if raw > u64::from(u32::MAX) {
            return Err(DecodeError::new(DecodeErrorKind::InvalidTag(raw), start));
        }
        Tag::decode(raw as u32)
            .map(Some)
            .ok_or_else(|| DecodeError::new(DecodeErrorKind::InvalidTag(raw), start))
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let window = &self.buf[self.pos..self.limit];
        match decode_varint(window) {
            Some((value, len)) => {
                self.pos += len;
                Ok(value)
            }
            None if window.len() < MAX_VARINT_LEN && window.iter().all(|b| b & 0x80 != 0) => {
                Err(self.error(DecodeErrorKind::Truncated))
            }
            None => Err(self.error(DecodeErrorKind::MalformedVarint)),
        }
    }

    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_raw(4)?;
        let mut le = [0u8; 4];
        le.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(le))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.read_raw(8)?;
        let mut le = [0u8; 8];
        le.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(le))
    }

    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(self.error(DecodeErrorKind::Truncated));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_length_delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_varint()?;
        if len > self.remaining() as u64 {
            return Err(self.error(DecodeErrorKind::LengthOutOfBounds(len)));
        }
        self.read_raw(len as usize)
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let start = self.pos;
        let bytes = self.read_length_delimited()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| DecodeError::new(DecodeErrorKind::InvalidUtf8(String::new()), start))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        Ok(self.read_length_delimited()?.to_vec())
    }

    pub fn read_int32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_varint()? as i32)
    }

    pub fn read_int64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.read_varint()? as i64)
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_varint()? != 0)
    }

    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    /// Narrows the readable window to the next `len` bytes and returns the
    /// previous limit for [`pop_limit`](Self::pop_limit).
    pub fn push_limit(&mut self, len: u64) -> Result<usize, DecodeError> {
        if len > self.remaining() as u64 {
            return Err(self.error(DecodeErrorKind::LengthOutOfBounds(len)));
        }
        let old = self.limit;
        self.limit = self.pos + len as usize;
        Ok(old)
    }

    pub fn pop_limit(&mut self, old: usize) {
        debug_assert!(self.pos == self.limit);
        self.limit = old;
    }

    pub fn enter_recursion(&mut self) -> Result<(), DecodeError> {
        if self.recursion_budget == 0 {
            return Err(self.error(DecodeErrorKind::RecursionLimitExceeded));
        }
        self.recursion_budget -= 1;
        Ok(())
    }

    pub fn exit_recursion(&mut self) {
        self.recursion_budget += 1;
    }

    /// Runs `read_one` until the length-delimited run is consumed.
    pub fn read_packed(
        &mut self,
        mut read_one: impl FnMut(&mut Self) -> Result<(), DecodeError>,
    ) -> Result<(), DecodeError> {
        let len = self.read_varint()?;
        let old = self.push_limit(len)?;
        while !self.is_at_limit() {
            read_one(self)?;
        }
        self.pop_limit(old);
        Ok(())
    }

    /// Merges a length-delimited sub-message into `message`.
    pub fn read_message<M: Message>(&mut self, message: &mut M) -> Result<(), DecodeError> {
        let len = self.read_varint()?;
        let old = self.push_limit(len)?;
        self.enter_recursion()?;
        message.merge_from_reader(self)?;
        self.exit_recursion();
        self.pop_limit(old);
        Ok(())
    }

    /// Discards the value for `tag`.
    pub fn skip_field(&mut self, tag: Tag) -> Result<(), DecodeError> {
        match tag.wire_type() {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed32 => {
                self.read_raw(4)?;
            }
            WireType::Fixed64 => {
                self.read_raw(8)?;
            }
            WireType::LengthDelimited => {
                self.read_length_delimited()?;
            }
            WireType::StartGroup => {
                self.enter_recursion()?;
                loop {
                    let inner = self
                        .read_tag()?
                        .ok_or_else(|| self.error(DecodeErrorKind::MissingEndGroup(tag.field_number())))?;
                    if inner.wire_type() == WireType::EndGroup {
                        if inner.field_number() != tag.field_number() {
                            return Err(self.error(DecodeErrorKind::MismatchedEndGroup {
                                expected: tag.field_number(),
                                found: inner.field_number(),
                            }));
                        }
                        break;
                    }
                    self.skip_field(inner)?;
                }
                self.exit_recursion();
            }
            WireType::EndGroup => {
                return Err(self.error(DecodeErrorKind::UnexpectedEndGroup(tag.field_number())));
            }
        }
        Ok(())
    }
}

/// Merges fields from `reader` into `message` until the reader's limit, or
/// until the END_GROUP tag for `end_group` when parsing a group body.
pub(crate) fn merge_message(
    message: &mut DynamicMessage,
    reader: &mut CodedReader<'_>,
    end_group: Option<u32>,
) -> Result<(), DecodeError> {
    let descriptor = message.descriptor().clone();
    let message_set = descriptor.is_message_set();
    loop {
        let Some(tag) = reader.read_tag()? else {
            return match end_group {
                Some(number) => Err(reader.error(DecodeErrorKind::MissingEndGroup(number))),
                None => Ok(()),
            };
        };
        if tag.wire_type() == WireType::EndGroup {
            return match end_group {
                Some(number) if number == tag.field_number() => Ok(()),
                Some(number) => Err(reader.error(DecodeErrorKind::MismatchedEndGroup {
                    expected: number,
                    found: tag.field_number(),
                })),
                None => Err(reader.error(DecodeErrorKind::UnexpectedEndGroup(tag.field_number()))),
            };
        }
        if message_set && tag.field_number() == 1 && tag.wire_type() == WireType::StartGroup {
            merge_message_set_item(message, reader)?;
            continue;
        }
        let field = descriptor
            .get_field(tag.field_number())
            .or_else(|| descriptor.find_extension_by_number(tag.field_number()));
        match field {
            Some(field) => merge_field(message, &field, tag, reader)?,
            None => message.unknown_fields_mut().merge_field(tag, reader)?,
        }
    }
}

fn merge_field(
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
    tag: Tag,
    reader: &mut CodedReader<'_>,
) -> Result<(), DecodeError> {
    let ty = field.field_type();
    if tag.wire_type() == wire_type_for(ty) {
        match ty {
            Type::Message => {
                let len = reader.read_varint()?;
                let old = reader.push_limit(len)?;
                reader.enter_recursion()?;
                merge_message(message.decoded_message_slot(field), reader, None)?;
                reader.exit_recursion();
                reader.pop_limit(old);
            }
            Type::Group => {
                reader.enter_recursion()?;
                merge_message(message.decoded_message_slot(field), reader, Some(tag.field_number()))?;
                reader.exit_recursion();
            }
            _ => {
                let value = read_scalar(reader, field, ty)?;
                store_scalar(message, field, value);
            }
        }
    } else if field.is_list() && is_packable(ty) && tag.wire_type() == WireType::LengthDelimited {
        reader.read_packed(|r| {
            let value = read_scalar(r, field, ty)?;
            store_scalar(message, field, value);
            Ok(())
        })?;
    } else {
        // Wire type does not match the declaration; keep the bytes verbatim.
        message.unknown_fields_mut().merge_field(tag, reader)?;
    }
    Ok(())
}

/// Closed enums divert values they do not declare into the unknown set.
fn store_scalar(message: &mut DynamicMessage, field: &FieldDescriptor, value: Value) {
    if let Value::EnumNumber(number) = value {
        if let Some(enum_type) = field.enum_type() {
            if enum_type.is_closed() && enum_type.get_value(number).is_none() {
                message
                    .unknown_fields_mut()
                    .add_varint(field.number(), number as i64 as u64);
                return;
            }
        }
    }
    message.store_decoded(field, value);
}

fn read_scalar(
    reader: &mut CodedReader<'_>,
    field: &FieldDescriptor,
    ty: Type,
) -> Result<Value, DecodeError> {
    Ok(match ty {
        Type::Double => Value::F64(f64::from_bits(reader.read_fixed64()?)),
        Type::Float => Value::F32(f32::from_bits(reader.read_fixed32()?)),
        Type::Int64 => Value::I64(reader.read_varint()? as i64),
        Type::Uint64 => Value::U64(reader.read_varint()?),
        Type::Int32 => Value::I32(reader.read_varint()? as i32),
        Type::Fixed64 => Value::U64(reader.read_fixed64()?),
        Type::Fixed32 => Value::U32(reader.read_fixed32()?),
        Type::Bool => Value::Bool(reader.read_varint()? != 0),
        Type::Uint32 => Value::U32(reader.read_varint()? as u32),
        Type::Enum => Value::EnumNumber(reader.read_varint()? as i32),
        Type::Sfixed32 => Value::I32(reader.read_fixed32()? as i32),
        Type::Sfixed64 => Value::I64(reader.read_fixed64()? as i64),
        Type::Sint32 => Value::I32(zigzag_decode32(reader.read_varint()? as u32)),
        Type::Sint64 => Value::I64(zigzag_decode64(reader.read_varint()?)),
        Type::Bytes => Value::Bytes(reader.read_bytes()?),
        Type::String => {
            let start = reader.position();
            let bytes = reader.read_length_delimited()?;
            match std::str::from_utf8(bytes) {
                Ok(s) => Value::String(s.to_owned()),
                Err(_) => {
                    return Err(DecodeError::new(
                        DecodeErrorKind::InvalidUtf8(field.full_name().to_owned()),
                        start,
                    ));
                }
            }
        }
        Type::Message | Type::Group => unreachable!("sub-messages are handled by merge_field"),
    })
}

/// One `group Item = 1 { uint32 type_id = 2; bytes message = 3; }` entry.
/// The two members may arrive in either order.
fn merge_message_set_item(
    message: &mut DynamicMessage,
    reader: &mut CodedReader<'_>,
) -> Result<(), DecodeError> {
    reader.enter_recursion()?;
    let mut type_id = None;
    let mut payload: Option<&[u8]> = None;
    loop {
        let tag = reader
            .read_tag()?
            .ok_or_else(|| reader.error(DecodeErrorKind::MissingEndGroup(1)))?;
        match (tag.field_number(), tag.wire_type()) {
            (1, WireType::EndGroup) => break,
            (found, WireType::EndGroup) => {
                return Err(reader.error(DecodeErrorKind::MismatchedEndGroup { expected: 1, found }));
            }
            (2, WireType::Varint) => type_id = Some(reader.read_varint()? as u32),
            (3, WireType::LengthDelimited) => payload = Some(reader.read_length_delimited()?),
            _ => reader.skip_field(tag)?,
        }
    }
    let (Some(type_id), Some(payload)) = (type_id, payload) else {
        reader.exit_recursion();
        return Ok(());
    };
    let extension = message
        .descriptor()
        .find_extension_by_number(type_id)
        .filter(|ext| ext.field_type() == Type::Message && !ext.is_list());
    match extension {
        Some(extension) => {
            let offset = reader.position();
            let mut nested = CodedReader::with_recursion_limit(payload, reader.recursion_budget());
            merge_message(message.decoded_message_slot(&extension), &mut nested, None)
                .map_err(|e| DecodeError::new(e.kind, offset))?;
        }
        None => message
            .unknown_fields_mut()
            .add_length_delimited(type_id, payload.to_vec()),
    }
    reader.exit_recursion();
    Ok(())
}

/// Accumulates input delivered in pieces and parses once all of it has
/// arrived.
pub struct ChunkedDecoder {
    message: DynamicMessage,
    buffer: Vec<u8>,
    options: DecodeOptions,
}

impl ChunkedDecoder {
    pub fn new(message: DynamicMessage, options: DecodeOptions) -> Self {
        ChunkedDecoder {
            message,
            buffer: Vec::new(),
            options,
        }
    }

    pub fn resume(&mut self, chunk: &[u8]) -> Result<(), DecodeError> {
        let total = self.buffer.len() + chunk.len();
        if total > self.options.size_limit {
            return Err(DecodeError::new(DecodeErrorKind::TooLarge(total), self.buffer.len()));
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    pub fn finish(mut self) -> Result<DynamicMessage, DecodeError> {
        self.message.merge_from_bytes_with(&self.buffer, &self.options)?;
        Ok(self.message)
    }
}

impl DynamicMessage {
    /// Parses a complete message of type `descriptor`, requiring all
    /// required fields to be present.
    pub fn decode(
        descriptor: crate::descriptor::MessageDescriptor,
        bytes: &[u8],
    ) -> Result<Self, DecodeError> {
        let mut message = DynamicMessage::new(descriptor);
        message.merge_from_bytes_with(bytes, &DecodeOptions::default())?;
        Ok(message)
    }

    /// Like [`decode`](Self::decode) but tolerates missing required fields.
    pub fn decode_partial(
        descriptor: crate::descriptor::MessageDescriptor,
        bytes: &[u8],
    ) -> Result<Self, DecodeError> {
        let mut message = DynamicMessage::new(descriptor);
        let options = DecodeOptions {
            allow_partial: true,
            ..Default::default()
        };
        message.merge_from_bytes_with(bytes, &options)?;
        Ok(message)
    }

    pub fn decode_with_options(
        descriptor: crate::descriptor::MessageDescriptor,
        bytes: &[u8],
        options: &DecodeOptions,
    ) -> Result<Self, DecodeError> {
        if bytes.len() > options.size_limit {
            return Err(DecodeError::new(DecodeErrorKind::TooLarge(bytes.len()), 0));
        }
        let mut message = DynamicMessage::new(descriptor);
        message.merge_from_bytes_with(bytes, options)?;
        Ok(message)
    }

    pub fn merge_from_bytes(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        self.merge_from_bytes_with(bytes, &DecodeOptions::default())
    }

    pub fn merge_from_bytes_with(
        &mut self,
        bytes: &[u8],
        options: &DecodeOptions,
    ) -> Result<(), DecodeError> {
        let mut reader = CodedReader::with_recursion_limit(bytes, options.recursion_limit);
        merge_message(self, &mut reader, None)?;
        if !options.allow_partial {
            let missing = self.find_initialization_errors();
            if !missing.is_empty() {
                return Err(DecodeError::new(
                    DecodeErrorKind::MissingRequiredFields(missing),
                    bytes.len(),
                ));
            }
        }
        Ok(())
    }

    pub fn decode_from_bufread(
        &mut self,
        reader: &mut impl std::io::BufRead,
        options: DecodeOptions,
    ) -> Result<(), crate::Error> {
        let mut decoder = ChunkedDecoder::new(self.clone_empty(), options);
        loop {
            let buffer = reader.fill_buf()?;
            let len = buffer.len();
            if len == 0 {
                break;
            }
            decoder.resume(buffer)?;
            reader.consume(len);
        }
        *self = decoder.finish()?;
        Ok(())
    }

    pub fn decode_from_read(
        &mut self,
        reader: &mut impl std::io::Read,
        options: DecodeOptions,
    ) -> Result<(), crate::Error> {
        let mut buf_reader = std::io::BufReader::new(reader);
        self.decode_from_bufread(&mut buf_reader, options)
    }

    #[cfg(feature = "async")]
    pub async fn decode_from_async_bufread(
        &mut self,
        reader: &mut (impl futures::io::AsyncBufRead + Unpin),
        options: DecodeOptions,
    ) -> Result<(), crate::Error> {
        use futures::io::AsyncBufReadExt;

        let mut decoder = ChunkedDecoder::new(self.clone_empty(), options);
        loop {
            let buffer = reader.fill_buf().await?;
            let len = buffer.len();
            if len == 0 {
                break;
            }
            decoder.resume(buffer)?;
            reader.consume_unpin(len);
        }
        *self = decoder.finish()?;
        Ok(())
    }

    #[cfg(feature = "async")]
    pub async fn decode_from_async_read(
        &mut self,
        reader: &mut (impl futures::io::AsyncRead + Unpin),
        options: DecodeOptions,
    ) -> Result<(), crate::Error> {
        let mut buf_reader = futures::io::BufReader::new(reader);
        self.decode_from_async_bufread(&mut buf_reader, options).await
    }

    /// Empty message of the same type; decoding into it then replaces `self`.
    fn clone_empty(&self) -> DynamicMessage {
        DynamicMessage::new(self.descriptor().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_limits_nest() {
        let data = [0x08, 0x96, 0x01, 0x10, 0x01];
        let mut reader = CodedReader::new(&data);
        let old = reader.push_limit(3).unwrap();
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::new(1, WireType::Varint)));
        assert_eq!(reader.read_varint().unwrap(), 150);
        assert_eq!(reader.read_tag().unwrap(), None);
        reader.pop_limit(old);
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::new(2, WireType::Varint)));
    }

    #[test]
    fn truncated_and_oversized_lengths() {
        let mut reader = CodedReader::new(&[0x96]);
        assert_eq!(reader.read_varint().unwrap_err().kind(), &DecodeErrorKind::Truncated);

        let mut reader = CodedReader::new(&[0x0a, 0x05, b'a']);
        reader.read_tag().unwrap();
        assert_eq!(
            reader.read_length_delimited().unwrap_err().kind(),
            &DecodeErrorKind::LengthOutOfBounds(5)
        );

        let mut reader = CodedReader::new(&[0x02, 0x00]);
        assert!(matches!(
            reader.read_tag().unwrap_err().kind(),
            DecodeErrorKind::InvalidTag(2)
        ));
    }

    #[test]
    fn skip_field_handles_nested_groups() {
        // group 1 { group 2 { 3: 1 } } followed by 4: 7
        let data = [0x0b, 0x13, 0x18, 0x01, 0x14, 0x0c, 0x20, 0x07];
        let mut reader = CodedReader::new(&data);
        let tag = reader.read_tag().unwrap().unwrap();
        reader.skip_field(tag).unwrap();
        assert_eq!(reader.read_tag().unwrap(), Some(Tag::new(4, WireType::Varint)));
    }

    #[test]
    fn recursion_budget_is_restored() {
        let mut reader = CodedReader::with_recursion_limit(&[], 1);
        reader.enter_recursion().unwrap();
        assert!(reader.enter_recursion().is_err());
        reader.exit_recursion();
        reader.enter_recursion().unwrap();
    }
}
