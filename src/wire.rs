//! Varint, zigzag and tag primitives shared by the reader and writer.

use crate::google::protobuf::field_descriptor_proto::Type;

/// Largest field number a tag can carry (2^29 - 1).
pub const MAX_FIELD_NUMBER: i32 = 536_870_911;
/// First number of the range reserved for the protobuf implementation.
pub const FIRST_RESERVED_FIELD_NUMBER: i32 = 19000;
/// Last number of the range reserved for the protobuf implementation.
pub const LAST_RESERVED_FIELD_NUMBER: i32 = 19999;

/// Longest encoding of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// The low three bits of every tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    StartGroup = 3,
    EndGroup = 4,
    Fixed32 = 5,
}

impl TryFrom<u32> for WireType {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => WireType::Varint,
            1 => WireType::Fixed64,
            2 => WireType::LengthDelimited,
            3 => WireType::StartGroup,
            4 => WireType::EndGroup,
            5 => WireType::Fixed32,
            other => return Err(other),
        })
    }
}

impl WireType {
    /// Wire types that may appear inside a packed run.
    pub const fn is_packable(self) -> bool {
        matches!(self, WireType::Varint | WireType::Fixed32 | WireType::Fixed64)
    }
}

/// A decoded field tag. The field number is always in `1..=MAX_FIELD_NUMBER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    field_number: u32,
    wire_type: WireType,
}

impl Tag {
    /// Panics in debug builds if `field_number` is out of range.
    pub fn new(field_number: u32, wire_type: WireType) -> Self {
        debug_assert!(field_number >= 1 && field_number <= MAX_FIELD_NUMBER as u32);
        Tag {
            field_number,
            wire_type,
        }
    }

    /// Splits a raw tag, rejecting wire types 6 and 7 and field number zero.
    pub fn decode(raw: u32) -> Option<Self> {
        let wire_type = WireType::try_from(raw & 7).ok()?;
        let field_number = raw >> 3;
        if field_number == 0 {
            return None;
        }
        Some(Tag {
            field_number,
            wire_type,
        })
    }

    pub const fn encode(self) -> u32 {
        (self.field_number << 3) | self.wire_type as u32
    }

    pub const fn field_number(self) -> u32 {
        self.field_number
    }

    pub const fn wire_type(self) -> WireType {
        self.wire_type
    }
}

#[inline]
pub const fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub const fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

#[inline]
pub const fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub const fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Appends the base-128 encoding of `value`, least significant group first.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Decodes a varint from the front of `buf`, returning the value and the
/// number of bytes consumed. `None` if the buffer ends mid-varint or the
/// encoding is longer than ten bytes or overflows 64 bits.
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut result = 0u64;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return None;
        }
        result |= u64::from(byte & 0x7f) << (7 * i);
        if byte < 0x80 {
            return Some((result, i + 1));
        }
    }
    None
}

#[inline]
pub const fn varint_len(value: u64) -> usize {
    // (highest set bit * 9 + 73) / 64 == ceil(bits / 7)
    let highest = 63 - (value | 1).leading_zeros() as usize;
    (highest * 9 + 73) / 64
}

/// Wire type used for a single (non-packed) value of a declared field type.
pub const fn wire_type_for(ty: Type) -> WireType {
    match ty {
        Type::Double | Type::Fixed64 | Type::Sfixed64 => WireType::Fixed64,
        Type::Float | Type::Fixed32 | Type::Sfixed32 => WireType::Fixed32,
        Type::String | Type::Bytes | Type::Message => WireType::LengthDelimited,
        Type::Group => WireType::StartGroup,
        Type::Int32
        | Type::Int64
        | Type::Uint32
        | Type::Uint64
        | Type::Sint32
        | Type::Sint64
        | Type::Bool
        | Type::Enum => WireType::Varint,
    }
}

/// Scalar numeric types may use packed encoding.
pub const fn is_packable(ty: Type) -> bool {
    wire_type_for(ty).is_packable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundaries() {
        for value in [0u64, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            assert_eq!(buf.len(), varint_len(value), "len of {value}");
            assert_eq!(decode_varint(&buf), Some((value, buf.len())));
        }
        assert_eq!(varint_len(u64::MAX), MAX_VARINT_LEN);
    }

    #[test]
    fn varint_known_encodings() {
        let mut buf = Vec::new();
        encode_varint(300, &mut buf);
        assert_eq!(buf, [0xac, 0x02]);

        // -1 as int32 is sign extended to ten bytes
        buf.clear();
        encode_varint(-1i32 as i64 as u64, &mut buf);
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn varint_rejects_truncated_and_overlong() {
        assert_eq!(decode_varint(&[0x80, 0x80]), None);
        assert_eq!(decode_varint(&[0xff; 10]), None);
        let mut eleven = vec![0x80; 10];
        eleven.push(0);
        assert_eq!(decode_varint(&eleven), None);
    }

    #[test]
    fn zigzag_extremes() {
        assert_eq!(zigzag_encode32(0), 0);
        assert_eq!(zigzag_encode32(-1), 1);
        assert_eq!(zigzag_encode32(1), 2);
        assert_eq!(zigzag_encode32(i32::MAX), u32::MAX - 1);
        assert_eq!(zigzag_encode32(i32::MIN), u32::MAX);
        for n in [i32::MIN, -2, -1, 0, 1, 2, i32::MAX] {
            assert_eq!(zigzag_decode32(zigzag_encode32(n)), n);
        }
        for n in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(zigzag_decode64(zigzag_encode64(n)), n);
        }
        assert_eq!(zigzag_encode64(i64::MIN), u64::MAX);
    }

    #[test]
    fn tag_validation() {
        let tag = Tag::decode((5 << 3) | 5).unwrap();
        assert_eq!(tag.field_number(), 5);
        assert_eq!(tag.wire_type(), WireType::Fixed32);
        assert_eq!(tag.encode(), (5 << 3) | 5);

        assert!(Tag::decode(2).is_none(), "field number zero");
        assert!(Tag::decode((1 << 3) | 6).is_none());
        assert!(Tag::decode((1 << 3) | 7).is_none());
    }

    #[test]
    fn wire_types_per_field_type() {
        assert_eq!(wire_type_for(Type::Sint64), WireType::Varint);
        assert_eq!(wire_type_for(Type::Sfixed32), WireType::Fixed32);
        assert_eq!(wire_type_for(Type::Group), WireType::StartGroup);
        assert!(is_packable(Type::Enum));
        assert!(!is_packable(Type::Bytes));
    }
}
