//! The DLMS `Data` type
//!
//! [`DataType`] is the one-byte choice tag that precedes every encoded
//! value; [`DataValue`] is the decoded value itself.

use crate::datatypes::bit_string::BitString;
use crate::datatypes::compact_array::CompactArray;
use crate::datatypes::date_time::CosemDateTime;
use crate::tree::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Choice tag of a `Data` value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    NullData = 0,
    Array = 1,
    Structure = 2,
    Boolean = 3,
    BitString = 4,
    DoubleLong = 5,
    DoubleLongUnsigned = 6,
    OctetString = 9,
    VisibleString = 10,
    Utf8String = 12,
    Bcd = 13,
    Integer = 15,
    Long = 16,
    Unsigned = 17,
    LongUnsigned = 18,
    CompactArray = 19,
    Long64 = 20,
    Long64Unsigned = 21,
    Enum = 22,
    Float32 = 23,
    Float64 = 24,
    DateTime = 25,
    Date = 26,
    Time = 27,
    DontCare = 255,
}

impl DataType {
    /// Get type from tag value
    pub fn from_tag(tag: u8) -> Option<Self> {
        let data_type = match tag {
            0 => DataType::NullData,
            1 => DataType::Array,
            2 => DataType::Structure,
            3 => DataType::Boolean,
            4 => DataType::BitString,
            5 => DataType::DoubleLong,
            6 => DataType::DoubleLongUnsigned,
            9 => DataType::OctetString,
            10 => DataType::VisibleString,
            12 => DataType::Utf8String,
            13 => DataType::Bcd,
            15 => DataType::Integer,
            16 => DataType::Long,
            17 => DataType::Unsigned,
            18 => DataType::LongUnsigned,
            19 => DataType::CompactArray,
            20 => DataType::Long64,
            21 => DataType::Long64Unsigned,
            22 => DataType::Enum,
            23 => DataType::Float32,
            24 => DataType::Float64,
            25 => DataType::DateTime,
            26 => DataType::Date,
            27 => DataType::Time,
            255 => DataType::DontCare,
            _ => return None,
        };
        Some(data_type)
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Encoded size of the value (after the tag) for fixed-width types
    ///
    /// Returns `None` for length-prefixed and composite types.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            DataType::NullData | DataType::DontCare => Some(0),
            DataType::Boolean
            | DataType::Bcd
            | DataType::Integer
            | DataType::Unsigned
            | DataType::Enum => Some(1),
            DataType::Long | DataType::LongUnsigned => Some(2),
            DataType::DoubleLong
            | DataType::DoubleLongUnsigned
            | DataType::Float32
            | DataType::Time => Some(4),
            DataType::Date => Some(5),
            DataType::Long64 | DataType::Long64Unsigned | DataType::Float64 => Some(8),
            DataType::DateTime => Some(12),
            DataType::Array
            | DataType::Structure
            | DataType::BitString
            | DataType::OctetString
            | DataType::VisibleString
            | DataType::Utf8String
            | DataType::CompactArray => None,
        }
    }

    pub fn is_composite(self) -> bool {
        matches!(
            self,
            DataType::Array | DataType::Structure | DataType::CompactArray
        )
    }

    /// ASN.1 name of the choice
    pub fn name(self) -> &'static str {
        match self {
            DataType::NullData => "null-data",
            DataType::Array => "array",
            DataType::Structure => "structure",
            DataType::Boolean => "boolean",
            DataType::BitString => "bit-string",
            DataType::DoubleLong => "double-long",
            DataType::DoubleLongUnsigned => "double-long-unsigned",
            DataType::OctetString => "octet-string",
            DataType::VisibleString => "visible-string",
            DataType::Utf8String => "utf8-string",
            DataType::Bcd => "bcd",
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::Unsigned => "unsigned",
            DataType::LongUnsigned => "long-unsigned",
            DataType::CompactArray => "compact-array",
            DataType::Long64 => "long64",
            DataType::Long64Unsigned => "long64-unsigned",
            DataType::Enum => "enum",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::DateTime => "date-time",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DontCare => "dont-care",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded `Data` value
///
/// Composite values keep their elements in wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Null,
    Array(Vec<DataValue>),
    Structure(Vec<DataValue>),
    Boolean(bool),
    BitString(BitString),
    DoubleLong(i32),
    DoubleLongUnsigned(u32),
    OctetString(Vec<u8>),
    VisibleString(Vec<u8>),
    Utf8String(Vec<u8>),
    Bcd(u8),
    Integer(i8),
    Long(i16),
    Unsigned(u8),
    LongUnsigned(u16),
    CompactArray(CompactArray),
    Long64(i64),
    Long64Unsigned(u64),
    Enum(u8),
    Float32(f32),
    Float64(f64),
    DateTime([u8; 12]),
    Date([u8; 5]),
    Time([u8; 4]),
    DontCare,
}

impl DataValue {
    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::Null => DataType::NullData,
            DataValue::Array(_) => DataType::Array,
            DataValue::Structure(_) => DataType::Structure,
            DataValue::Boolean(_) => DataType::Boolean,
            DataValue::BitString(_) => DataType::BitString,
            DataValue::DoubleLong(_) => DataType::DoubleLong,
            DataValue::DoubleLongUnsigned(_) => DataType::DoubleLongUnsigned,
            DataValue::OctetString(_) => DataType::OctetString,
            DataValue::VisibleString(_) => DataType::VisibleString,
            DataValue::Utf8String(_) => DataType::Utf8String,
            DataValue::Bcd(_) => DataType::Bcd,
            DataValue::Integer(_) => DataType::Integer,
            DataValue::Long(_) => DataType::Long,
            DataValue::Unsigned(_) => DataType::Unsigned,
            DataValue::LongUnsigned(_) => DataType::LongUnsigned,
            DataValue::CompactArray(_) => DataType::CompactArray,
            DataValue::Long64(_) => DataType::Long64,
            DataValue::Long64Unsigned(_) => DataType::Long64Unsigned,
            DataValue::Enum(_) => DataType::Enum,
            DataValue::Float32(_) => DataType::Float32,
            DataValue::Float64(_) => DataType::Float64,
            DataValue::DateTime(_) => DataType::DateTime,
            DataValue::Date(_) => DataType::Date,
            DataValue::Time(_) => DataType::Time,
            DataValue::DontCare => DataType::DontCare,
        }
    }

    /// Elements of an array, structure or compact array
    pub fn elements(&self) -> Option<&[DataValue]> {
        match self {
            DataValue::Array(items) | DataValue::Structure(items) => Some(items),
            DataValue::CompactArray(array) => Some(array.elements()),
            _ => None,
        }
    }

    pub fn as_octet_string(&self) -> Option<&[u8]> {
        match self {
            DataValue::OctetString(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Widened unsigned value of integer-like variants
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            DataValue::Unsigned(v) | DataValue::Enum(v) | DataValue::Bcd(v) => Some(v.into()),
            DataValue::LongUnsigned(v) => Some(v.into()),
            DataValue::DoubleLongUnsigned(v) => Some(v.into()),
            DataValue::Long64Unsigned(v) => Some(v),
            _ => None,
        }
    }

    /// Date-time carried by this value, if it looks like one
    ///
    /// Both the `date-time` type and 12-byte octet strings are tried.
    pub fn date_time(&self) -> Option<CosemDateTime> {
        match self {
            DataValue::DateTime(bytes) => CosemDateTime::recognize(bytes),
            DataValue::OctetString(bytes) => CosemDateTime::recognize(bytes),
            _ => None,
        }
    }

    /// Primitive value for the field tree; `None` for composites and null
    pub fn to_field_value(&self) -> Option<FieldValue> {
        let value = match self {
            DataValue::Null
            | DataValue::DontCare
            | DataValue::Array(_)
            | DataValue::Structure(_)
            | DataValue::CompactArray(_) => return None,
            DataValue::Boolean(v) => FieldValue::from(*v),
            DataValue::BitString(bits) => FieldValue::from(bits.as_bytes()),
            DataValue::DoubleLong(v) => FieldValue::from(*v),
            DataValue::DoubleLongUnsigned(v) => FieldValue::from(*v),
            DataValue::OctetString(b) | DataValue::Utf8String(b) => FieldValue::from(b.as_slice()),
            DataValue::VisibleString(b) => FieldValue::from(String::from_utf8_lossy(b).into_owned()),
            DataValue::Bcd(v) | DataValue::Unsigned(v) | DataValue::Enum(v) => FieldValue::from(*v),
            DataValue::Integer(v) => FieldValue::from(*v),
            DataValue::Long(v) => FieldValue::from(*v),
            DataValue::LongUnsigned(v) => FieldValue::from(*v),
            DataValue::Long64(v) => FieldValue::from(*v),
            DataValue::Long64Unsigned(v) => FieldValue::from(*v),
            DataValue::Float32(v) => FieldValue::from(*v),
            DataValue::Float64(v) => FieldValue::from(*v),
            DataValue::DateTime(b) => FieldValue::from(&b[..]),
            DataValue::Date(b) => FieldValue::from(&b[..]),
            DataValue::Time(b) => FieldValue::from(&b[..]),
        };
        Some(value)
    }
}

/// One-line label in the style of a protocol analyzer tree
impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => f.write_str("Null"),
            DataValue::Array(items) => write!(f, "Array (length {})", items.len()),
            DataValue::Structure(items) => write!(f, "Structure (length {})", items.len()),
            DataValue::Boolean(v) => write!(f, "Boolean: {}", v),
            DataValue::BitString(bits) => write!(
                f,
                "Bit-string (bits: {}, bytes: {}): {}",
                bits.num_bits(),
                bits.as_bytes().len(),
                bits
            ),
            DataValue::DoubleLong(v) => write!(f, "Double Long: {}", v),
            DataValue::DoubleLongUnsigned(v) => write!(f, "Double Long Unsigned: {}", v),
            DataValue::OctetString(bytes) => {
                write!(f, "Octet String (length {})", bytes.len())?;
                match CosemDateTime::recognize(bytes) {
                    Some(dt) => write!(f, " ({})", dt),
                    None => Ok(()),
                }
            }
            DataValue::VisibleString(bytes) => write!(
                f,
                "Visible String (length {}): \"{}\"",
                bytes.len(),
                String::from_utf8_lossy(bytes)
            ),
            DataValue::Utf8String(bytes) => write!(
                f,
                "UTF8 String (length {}): \"{}\"",
                bytes.len(),
                String::from_utf8_lossy(bytes)
            ),
            DataValue::Bcd(v) => write!(f, "BCD: 0x{:02x}", v),
            DataValue::Integer(v) => write!(f, "Integer: {}", v),
            DataValue::Long(v) => write!(f, "Long: {}", v),
            DataValue::Unsigned(v) => write!(f, "Unsigned: {}", v),
            DataValue::LongUnsigned(v) => write!(f, "Long Unsigned: {}", v),
            DataValue::CompactArray(array) => write!(
                f,
                "Compact Array ({} of {})",
                array.len(),
                array.description()
            ),
            DataValue::Long64(v) => write!(f, "Long64: {}", v),
            DataValue::Long64Unsigned(v) => write!(f, "Long64 Unsigned: {}", v),
            DataValue::Enum(v) => write!(f, "Enum: {}", v),
            DataValue::Float32(v) => write!(f, "Float32: {:.6}", v),
            DataValue::Float64(v) => write!(f, "Float64: {:.6}", v),
            DataValue::DateTime(bytes) => {
                f.write_str("Date Time")?;
                match CosemDateTime::recognize(bytes) {
                    Some(dt) => write!(f, " ({})", dt),
                    None => Ok(()),
                }
            }
            DataValue::Date(_) => f.write_str("Date"),
            DataValue::Time(_) => f.write_str("Time"),
            DataValue::DontCare => f.write_str("Don't Care"),
        }
    }
}
