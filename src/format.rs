//! Tag bytes: every one of the 256 possible first bytes maps to exactly one [`Format`].

/// Wire format selected by a tag byte. Fix* variants carry the value or length
/// packed into the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    PositiveFixInt(u8),
    FixMap(u8),
    FixArray(u8),
    FixStr(u8),
    Nil,
    /// 0xc1, never valid.
    NeverUsed,
    False,
    True,
    Bin8,
    Bin16,
    Bin32,
    Ext8,
    Ext16,
    Ext32,
    Float32,
    Float64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    FixExt1,
    FixExt2,
    FixExt4,
    FixExt8,
    FixExt16,
    Str8,
    Str16,
    Str32,
    Array16,
    Array32,
    Map16,
    Map32,
    NegativeFixInt(i8),
}

pub const FIXMAP_MAX: usize = 0x0f;
pub const FIXARRAY_MAX: usize = 0x0f;
pub const FIXSTR_MAX: usize = 0x1f;
pub const POSITIVE_FIXINT_MAX: i64 = 0x7f;
pub const NEGATIVE_FIXINT_MIN: i64 = -32;

impl Format {
    pub fn from_byte(b: u8) -> Format {
        match b {
            0x00..=0x7f => Format::PositiveFixInt(b),
            0x80..=0x8f => Format::FixMap(b & 0x0f),
            0x90..=0x9f => Format::FixArray(b & 0x0f),
            0xa0..=0xbf => Format::FixStr(b & 0x1f),
            0xc0 => Format::Nil,
            0xc1 => Format::NeverUsed,
            0xc2 => Format::False,
            0xc3 => Format::True,
            0xc4 => Format::Bin8,
            0xc5 => Format::Bin16,
            0xc6 => Format::Bin32,
            0xc7 => Format::Ext8,
            0xc8 => Format::Ext16,
            0xc9 => Format::Ext32,
            0xca => Format::Float32,
            0xcb => Format::Float64,
            0xcc => Format::UInt8,
            0xcd => Format::UInt16,
            0xce => Format::UInt32,
            0xcf => Format::UInt64,
            0xd0 => Format::Int8,
            0xd1 => Format::Int16,
            0xd2 => Format::Int32,
            0xd3 => Format::Int64,
            0xd4 => Format::FixExt1,
            0xd5 => Format::FixExt2,
            0xd6 => Format::FixExt4,
            0xd7 => Format::FixExt8,
            0xd8 => Format::FixExt16,
            0xd9 => Format::Str8,
            0xda => Format::Str16,
            0xdb => Format::Str32,
            0xdc => Format::Array16,
            0xdd => Format::Array32,
            0xde => Format::Map16,
            0xdf => Format::Map32,
            0xe0..=0xff => Format::NegativeFixInt(b as i8),
        }
    }

    /// Inverse of [`Format::from_byte`]. Packed payloads are masked to their field width.
    pub fn to_byte(self) -> u8 {
        match self {
            Format::PositiveFixInt(v) => v & 0x7f,
            Format::FixMap(n) => 0x80 | (n & 0x0f),
            Format::FixArray(n) => 0x90 | (n & 0x0f),
            Format::FixStr(n) => 0xa0 | (n & 0x1f),
            Format::Nil => 0xc0,
            Format::NeverUsed => 0xc1,
            Format::False => 0xc2,
            Format::True => 0xc3,
            Format::Bin8 => 0xc4,
            Format::Bin16 => 0xc5,
            Format::Bin32 => 0xc6,
            Format::Ext8 => 0xc7,
            Format::Ext16 => 0xc8,
            Format::Ext32 => 0xc9,
            Format::Float32 => 0xca,
            Format::Float64 => 0xcb,
            Format::UInt8 => 0xcc,
            Format::UInt16 => 0xcd,
            Format::UInt32 => 0xce,
            Format::UInt64 => 0xcf,
            Format::Int8 => 0xd0,
            Format::Int16 => 0xd1,
            Format::Int32 => 0xd2,
            Format::Int64 => 0xd3,
            Format::FixExt1 => 0xd4,
            Format::FixExt2 => 0xd5,
            Format::FixExt4 => 0xd6,
            Format::FixExt8 => 0xd7,
            Format::FixExt16 => 0xd8,
            Format::Str8 => 0xd9,
            Format::Str16 => 0xda,
            Format::Str32 => 0xdb,
            Format::Array16 => 0xdc,
            Format::Array32 => 0xdd,
            Format::Map16 => 0xde,
            Format::Map32 => 0xdf,
            Format::NegativeFixInt(v) => (v as u8) | 0xe0,
        }
    }
}
