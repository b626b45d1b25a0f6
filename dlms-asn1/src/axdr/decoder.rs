//! A-XDR decoder for DLMS/COSEM

use crate::axdr::type_description::type_description_length;
use crate::axdr::types::LengthEncoding;
use dlms_core::datatypes::{BitString, CompactArray, DataType, DataValue, TypeDescription};
use dlms_core::{DlmsError, DlmsResult, Field};

/// Deepest nesting of composite values and type descriptions accepted
pub const MAX_NESTING_DEPTH: usize = 64;

/// A-XDR decoder for decoding DLMS/COSEM data types
///
/// The decoder is a cursor over an immutable buffer. Every `decode_*`
/// call consumes a prefix of the remaining bytes and advances the
/// position; reading past the end is a [`DlmsError::Truncated`] error and
/// leaves the position where the failing read started.
///
/// Positions are absolute offsets into the buffer given to [`new`](Self::new)
/// or [`at`](Self::at), so spans of produced [`Field`]s can be used
/// directly against that buffer.
#[derive(Debug, Clone)]
pub struct AxdrDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> AxdrDecoder<'a> {
    /// Create a new decoder
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::at(buffer, 0)
    }

    /// Create a decoder that starts reading at `position`
    pub fn at(buffer: &'a [u8], position: usize) -> Self {
        Self { buffer, position }
    }

    /// Get current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get remaining bytes
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Next byte without consuming it
    pub fn peek_u8(&self) -> DlmsResult<u8> {
        self.buffer
            .get(self.position)
            .copied()
            .ok_or_else(|| DlmsError::truncated(self.position, 1, self.buffer.len()))
    }

    /// Read `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> DlmsResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.buffer.len())
            .ok_or_else(|| DlmsError::truncated(self.position, len, self.buffer.len()))?;
        let bytes = &self.buffer[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a fixed-size byte array
    pub fn read_array<const N: usize>(&mut self) -> DlmsResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    pub fn skip(&mut self, len: usize) -> DlmsResult<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Decode a u8
    pub fn decode_u8(&mut self) -> DlmsResult<u8> {
        let byte = self.peek_u8()?;
        self.position += 1;
        Ok(byte)
    }

    /// Decode an i8
    pub fn decode_i8(&mut self) -> DlmsResult<i8> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    /// Decode a u16 (big-endian)
    pub fn decode_u16(&mut self) -> DlmsResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Decode an i16 (big-endian)
    pub fn decode_i16(&mut self) -> DlmsResult<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    /// Decode a u32 (big-endian)
    pub fn decode_u32(&mut self) -> DlmsResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Decode an i32 (big-endian)
    pub fn decode_i32(&mut self) -> DlmsResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Decode a u64 (big-endian)
    pub fn decode_u64(&mut self) -> DlmsResult<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Decode an i64 (big-endian)
    pub fn decode_i64(&mut self) -> DlmsResult<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Decode an f32 (IEEE 754 big-endian)
    pub fn decode_f32(&mut self) -> DlmsResult<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    /// Decode an f64 (IEEE 754 big-endian)
    pub fn decode_f64(&mut self) -> DlmsResult<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Read a BER definite-form length
    ///
    /// # Returns
    ///
    /// The length and the number of bytes consumed
    pub fn read_length(&mut self) -> DlmsResult<(u64, usize)> {
        let (length, consumed) = LengthEncoding::decode_at(self.buffer, self.position)?;
        self.position += consumed;
        Ok((length.value(), consumed))
    }

    /// Read a BER length that must fit in `usize`
    pub fn decode_length(&mut self) -> DlmsResult<usize> {
        let start = self.position;
        let (length, _) = self.read_length()?;
        usize::try_from(length).map_err(|_| DlmsError::InvalidLength {
            offset: start,
            reason: format!("length {} does not fit in memory", length),
        })
    }

    /// Decode a length-prefixed octet string
    pub fn decode_octet_string(&mut self) -> DlmsResult<&'a [u8]> {
        let len = self.decode_length()?;
        self.read_bytes(len)
    }

    /// Decode one `Data` value
    pub fn decode_data(&mut self) -> DlmsResult<DataValue> {
        let mut scratch = Vec::new();
        self.decode_data_into("Data", &mut scratch)
    }

    /// Decode one `Data` value and append its field to `tree`
    ///
    /// On error the field of the value is still appended with whatever
    /// children were decoded before the failure, unless the tag itself
    /// could not be read or recognized.
    pub fn decode_data_into(&mut self, name: &str, tree: &mut Vec<Field>) -> DlmsResult<DataValue> {
        self.decode_value(name.to_string(), 0, tree)
    }

    fn decode_value(
        &mut self,
        name: String,
        depth: usize,
        tree: &mut Vec<Field>,
    ) -> DlmsResult<DataValue> {
        check_depth(depth, self.position)?;
        let start = self.position;
        let tag = self.decode_u8()?;
        let data_type = DataType::from_tag(tag).ok_or(DlmsError::UnknownDataTag { tag, offset: start })?;
        log::trace!("data {} at {}", data_type, start);

        let mut children = Vec::new();
        let result = match data_type {
            DataType::Array => self
                .decode_elements(depth, &mut children)
                .map(DataValue::Array),
            DataType::Structure => self
                .decode_elements(depth, &mut children)
                .map(DataValue::Structure),
            DataType::CompactArray => self
                .decode_compact_array(depth, &mut children)
                .map(DataValue::CompactArray),
            planar => self.decode_planar(planar),
        };
        tree.push(value_field(name, start..self.position, data_type, &result, children));
        result
    }

    /// BER element count followed by that many tagged values
    fn decode_elements(&mut self, depth: usize, children: &mut Vec<Field>) -> DlmsResult<Vec<DataValue>> {
        let count = self.decode_length()?;
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for i in 1..=count {
            items.push(self.decode_value(format!("[{}]", i), depth + 1, children)?);
        }
        Ok(items)
    }

    /// Untagged value of a planar (non-composite) type
    fn decode_planar(&mut self, data_type: DataType) -> DlmsResult<DataValue> {
        let value = match data_type {
            DataType::NullData => DataValue::Null,
            DataType::Boolean => DataValue::Boolean(self.decode_u8()? != 0),
            DataType::BitString => {
                let bits = self.decode_length()?;
                let bytes = self.read_bytes(BitString::byte_len(bits))?;
                DataValue::BitString(BitString::new(bytes.to_vec(), bits)?)
            }
            DataType::DoubleLong => DataValue::DoubleLong(self.decode_i32()?),
            DataType::DoubleLongUnsigned => DataValue::DoubleLongUnsigned(self.decode_u32()?),
            DataType::OctetString => DataValue::OctetString(self.decode_octet_string()?.to_vec()),
            DataType::VisibleString => DataValue::VisibleString(self.decode_octet_string()?.to_vec()),
            DataType::Utf8String => DataValue::Utf8String(self.decode_octet_string()?.to_vec()),
            DataType::Bcd => DataValue::Bcd(self.decode_u8()?),
            DataType::Integer => DataValue::Integer(self.decode_i8()?),
            DataType::Long => DataValue::Long(self.decode_i16()?),
            DataType::Unsigned => DataValue::Unsigned(self.decode_u8()?),
            DataType::LongUnsigned => DataValue::LongUnsigned(self.decode_u16()?),
            DataType::Long64 => DataValue::Long64(self.decode_i64()?),
            DataType::Long64Unsigned => DataValue::Long64Unsigned(self.decode_u64()?),
            DataType::Enum => DataValue::Enum(self.decode_u8()?),
            DataType::Float32 => DataValue::Float32(self.decode_f32()?),
            DataType::Float64 => DataValue::Float64(self.decode_f64()?),
            DataType::DateTime => DataValue::DateTime(self.read_array()?),
            DataType::Date => DataValue::Date(self.read_array()?),
            DataType::Time => DataValue::Time(self.read_array()?),
            DataType::DontCare => DataValue::DontCare,
            DataType::Array | DataType::Structure | DataType::CompactArray => {
                return Err(DlmsError::InvalidData(format!(
                    "{} is not a planar type",
                    data_type
                )));
            }
        };
        Ok(value)
    }

    /// Type description, BER content length, then elements until the
    /// content is used up
    fn decode_compact_array(
        &mut self,
        depth: usize,
        children: &mut Vec<Field>,
    ) -> DlmsResult<CompactArray> {
        let description_start = self.position;
        let description_end = description_start + type_description_length(self.buffer, description_start)?;
        let description = self.decode_type_description()?;
        if self.position != description_end {
            return Err(DlmsError::InvalidData(format!(
                "type description at offset {} is malformed",
                description_start
            )));
        }
        children.push(
            Field::new("Type Description", description_start..description_end)
                .with_text(description.to_string()),
        );

        let length_start = self.position;
        let content_length = self.decode_length()?;
        let content_start = self.position;
        children.push(Field::new("Contents Length", length_start..content_start).with_value(content_length));

        let buffer = self.buffer;
        let content_end = content_start
            .checked_add(content_length)
            .filter(|&end| end <= buffer.len())
            .ok_or_else(|| DlmsError::truncated(content_start, content_length, buffer.len()))?;

        let mut content = AxdrDecoder::at(&buffer[..content_end], content_start);
        let mut elements = Vec::new();
        while content.has_remaining() {
            let element_start = content.position;
            let name = format!("[{}]", elements.len() + 1);
            let element = content
                .decode_described(&description, name, depth + 1, children)
                .map_err(|err| match err {
                    DlmsError::Truncated { .. } => DlmsError::CompactArrayOverrun {
                        element_start,
                        content_end,
                    },
                    other => other,
                });
            self.position = content.position;
            elements.push(element?);
            if content.position == element_start {
                return Err(DlmsError::InvalidData(
                    "compact array element description has zero width".to_string(),
                ));
            }
        }

        Ok(CompactArray::new(description, elements))
    }

    /// Decode one untagged value shaped by `description`
    fn decode_described(
        &mut self,
        description: &TypeDescription,
        name: String,
        depth: usize,
        tree: &mut Vec<Field>,
    ) -> DlmsResult<DataValue> {
        check_depth(depth, self.position)?;
        let start = self.position;
        let mut children = Vec::new();
        let (data_type, result) = match description {
            TypeDescription::Planar(t) => (*t, self.decode_planar(*t)),
            TypeDescription::Array { count, element } => {
                let members = std::iter::repeat_n(element.as_ref(), usize::from(*count));
                (
                    DataType::Array,
                    self.decode_described_members(members, depth, &mut children)
                        .map(DataValue::Array),
                )
            }
            TypeDescription::Structure(members) => (
                DataType::Structure,
                self.decode_described_members(members.iter(), depth, &mut children)
                    .map(DataValue::Structure),
            ),
        };
        tree.push(value_field(name, start..self.position, data_type, &result, children));
        result
    }

    fn decode_described_members<'d>(
        &mut self,
        members: impl Iterator<Item = &'d TypeDescription>,
        depth: usize,
        children: &mut Vec<Field>,
    ) -> DlmsResult<Vec<DataValue>> {
        let mut items = Vec::new();
        for (i, member) in members.enumerate() {
            items.push(self.decode_described(member, format!("[{}]", i + 1), depth + 1, children)?);
        }
        Ok(items)
    }
}

pub(crate) fn check_depth(depth: usize, offset: usize) -> DlmsResult<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DlmsError::InvalidData(format!(
            "nesting deeper than {} at offset {}",
            MAX_NESTING_DEPTH, offset
        )));
    }
    Ok(())
}

fn value_field(
    name: String,
    span: std::ops::Range<usize>,
    data_type: DataType,
    result: &DlmsResult<DataValue>,
    children: Vec<Field>,
) -> Field {
    let field = Field::new(name, span).with_children(children);
    match result {
        Ok(value) => {
            let field = field.with_text(value.to_string());
            match value.to_field_value() {
                Some(v) => field.with_value(v),
                None => field,
            }
        }
        Err(_) => field.with_text(format!("{} [malformed]", data_type.name())),
    }
}
