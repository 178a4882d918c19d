//! Addressable process variables.
//!
//! A [`Tag`] names a run of `element_count` elements of one [`DataType`]
//! starting at a byte (and, for booleans, bit) address inside a
//! [`MemoryArea`]. Tags are immutable: fragmentation derives narrower tags
//! with [`Tag::narrowed`] instead of mutating the original, and
//! [`Tag::element_index_of`] maps a narrowed piece back to its position.

mod area;
mod data_type;

use std::fmt;

pub use area::MemoryArea;
pub use data_type::{DEFAULT_STRING_LENGTH, DataType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing or narrowing a [`Tag`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TagError {
    /// A tag must address at least one element.
    #[error("tag element count must be at least 1")]
    ZeroElements,
    /// Bit offsets address bits 0 to 7 of a byte.
    #[error("bit offset {0} is out of range 0..=7")]
    BitOffsetOutOfRange(u8),
    /// Only boolean tags may carry a bit offset.
    #[error("bit offset {bit} is not allowed on {data_type} tags")]
    UnexpectedBitOffset { data_type: DataType, bit: u8 },
    /// Only string kinds carry a declared length.
    #[error("string length is not allowed on {0} tags")]
    UnexpectedStringLength(DataType),
    /// Declared string lengths must be positive.
    #[error("string length must be at least 1")]
    ZeroStringLength,
    /// The requested element range does not lie within the tag.
    #[error("elements {start}..{end} exceed tag of {count} elements")]
    RangeOutOfBounds { start: u32, end: u32, count: u16 },
    /// The derived address does not fit the address space.
    #[error("address overflow at byte offset {0}")]
    AddressOverflow(u32),
}

/// Immutable reference to one or more contiguous process variable elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TagFields", into = "TagFields")]
pub struct Tag {
    area: MemoryArea,
    data_type: DataType,
    element_count: u16,
    byte_offset: u32,
    bit_offset: u8,
    string_length: Option<u16>,
}

impl Tag {
    /// Start building a tag of `data_type` in `area`.
    #[must_use]
    pub fn builder(area: MemoryArea, data_type: DataType) -> TagBuilder {
        TagBuilder::new(area, data_type)
    }

    /// Memory area the tag lives in.
    #[must_use]
    pub const fn area(&self) -> MemoryArea { self.area }

    /// Element kind.
    #[must_use]
    pub const fn data_type(&self) -> DataType { self.data_type }

    /// Number of elements addressed; always at least one.
    #[must_use]
    pub const fn element_count(&self) -> u16 { self.element_count }

    /// Byte address of the first element.
    #[must_use]
    pub const fn byte_offset(&self) -> u32 { self.byte_offset }

    /// Bit address of the first element; zero for non-boolean tags.
    #[must_use]
    pub const fn bit_offset(&self) -> u8 { self.bit_offset }

    /// Declared string length for string kinds.
    #[must_use]
    pub fn string_length(&self) -> Option<u16> {
        if self.data_type.is_string() {
            Some(self.string_length.unwrap_or(DEFAULT_STRING_LENGTH))
        } else {
            None
        }
    }

    /// Whether the tag addresses more than one element.
    #[must_use]
    pub const fn is_array(&self) -> bool { self.element_count > 1 }

    /// Width in bytes of one element as transferred on a read.
    #[must_use]
    pub fn element_width(&self) -> u32 {
        match self.data_type.fixed_width() {
            Some(width) => width,
            None => {
                let declared = u32::from(self.string_length().unwrap_or(DEFAULT_STRING_LENGTH));
                declared * self.data_type.char_width() + self.data_type.string_prefix()
            }
        }
    }

    fn bit_address(&self) -> u64 {
        u64::from(self.byte_offset) * 8 + u64::from(self.bit_offset)
    }

    /// Derive the tag covering `count` elements starting at element `start`.
    ///
    /// Boolean tags advance bit by bit and carry into the byte offset; all
    /// other kinds advance by [`Tag::element_width`] bytes per element.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::RangeOutOfBounds`] if the range is empty or does
    /// not lie within this tag, or [`TagError::AddressOverflow`] if the
    /// derived address does not fit in 32 bits.
    pub fn narrowed(&self, start: u16, count: u16) -> Result<Self, TagError> {
        let end = u32::from(start) + u32::from(count);
        if count == 0 || end > u32::from(self.element_count) {
            return Err(TagError::RangeOutOfBounds {
                start: u32::from(start),
                end,
                count: self.element_count,
            });
        }
        let (byte_offset, bit_offset) = if self.data_type == DataType::Bool {
            let bit = self.bit_address() + u64::from(start);
            let byte = u32::try_from(bit / 8)
                .map_err(|_| TagError::AddressOverflow(self.byte_offset))?;
            #[expect(clippy::cast_possible_truncation, reason = "value is below 8")]
            let bit_in_byte = (bit % 8) as u8;
            (byte, bit_in_byte)
        } else {
            let advance = u32::from(start)
                .checked_mul(self.element_width())
                .and_then(|delta| self.byte_offset.checked_add(delta))
                .ok_or(TagError::AddressOverflow(self.byte_offset))?;
            (advance, 0)
        };
        Ok(Self {
            element_count: count,
            byte_offset,
            bit_offset,
            ..*self
        })
    }

    /// Position of `part`'s first element within this tag.
    ///
    /// Returns `None` if `part` is not an element-aligned piece of this tag.
    #[must_use]
    pub fn element_index_of(&self, part: &Tag) -> Option<u16> {
        if part.area != self.area || part.data_type != self.data_type {
            return None;
        }
        let index = if self.data_type == DataType::Bool {
            part.bit_address().checked_sub(self.bit_address())?
        } else {
            let delta = u64::from(part.byte_offset.checked_sub(self.byte_offset)?);
            let width = u64::from(self.element_width());
            if delta % width != 0 {
                return None;
            }
            delta / width
        };
        let index = u16::try_from(index).ok()?;
        let end = u32::from(index) + u32::from(part.element_count);
        (end <= u32::from(self.element_count)).then_some(index)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}.{}", self.area, self.byte_offset)?;
        if self.data_type == DataType::Bool {
            write!(f, ".{}", self.bit_offset)?;
        }
        write!(f, ":{}", self.data_type)?;
        if let Some(len) = self.string_length {
            write!(f, "({len})")?;
        }
        if self.is_array() {
            write!(f, "[{}]", self.element_count)?;
        }
        Ok(())
    }
}

/// Builder for [`Tag`] validating its invariants on [`TagBuilder::build`].
#[derive(Clone, Copy, Debug)]
pub struct TagBuilder {
    area: MemoryArea,
    data_type: DataType,
    element_count: u16,
    byte_offset: u32,
    bit_offset: u8,
    string_length: Option<u16>,
}

impl TagBuilder {
    fn new(area: MemoryArea, data_type: DataType) -> Self {
        Self {
            area,
            data_type,
            element_count: 1,
            byte_offset: 0,
            bit_offset: 0,
            string_length: None,
        }
    }

    /// Set the byte address of the first element.
    #[must_use]
    pub fn byte_offset(mut self, offset: u32) -> Self {
        self.byte_offset = offset;
        self
    }

    /// Set the bit address of the first element (boolean tags only).
    #[must_use]
    pub fn bit_offset(mut self, bit: u8) -> Self {
        self.bit_offset = bit;
        self
    }

    /// Set the number of elements.
    #[must_use]
    pub fn elements(mut self, count: u16) -> Self {
        self.element_count = count;
        self
    }

    /// Set the declared length of a string tag.
    #[must_use]
    pub fn string_length(mut self, len: u16) -> Self {
        self.string_length = Some(len);
        self
    }

    /// Validate and produce the tag.
    ///
    /// # Errors
    ///
    /// Returns a [`TagError`] when the element count is zero, the bit offset
    /// is invalid for the kind, or a string length is given for a non-string
    /// kind.
    pub fn build(self) -> Result<Tag, TagError> {
        if self.element_count == 0 {
            return Err(TagError::ZeroElements);
        }
        if self.bit_offset > 7 {
            return Err(TagError::BitOffsetOutOfRange(self.bit_offset));
        }
        if self.bit_offset != 0 && self.data_type != DataType::Bool {
            return Err(TagError::UnexpectedBitOffset {
                data_type: self.data_type,
                bit: self.bit_offset,
            });
        }
        match self.string_length {
            Some(_) if !self.data_type.is_string() => {
                return Err(TagError::UnexpectedStringLength(self.data_type));
            }
            Some(0) => return Err(TagError::ZeroStringLength),
            _ => {}
        }
        Ok(Tag {
            area: self.area,
            data_type: self.data_type,
            element_count: self.element_count,
            byte_offset: self.byte_offset,
            bit_offset: self.bit_offset,
            string_length: self.string_length,
        })
    }
}

/// Serialised form of a [`Tag`]; validated through the builder on load.
#[derive(Serialize, Deserialize)]
struct TagFields {
    area: MemoryArea,
    data_type: DataType,
    #[serde(default = "one")]
    element_count: u16,
    #[serde(default)]
    byte_offset: u32,
    #[serde(default)]
    bit_offset: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_length: Option<u16>,
}

const fn one() -> u16 { 1 }

impl TryFrom<TagFields> for Tag {
    type Error = TagError;

    fn try_from(fields: TagFields) -> Result<Self, Self::Error> {
        let mut builder = Tag::builder(fields.area, fields.data_type)
            .elements(fields.element_count)
            .byte_offset(fields.byte_offset)
            .bit_offset(fields.bit_offset);
        if let Some(len) = fields.string_length {
            builder = builder.string_length(len);
        }
        builder.build()
    }
}

impl From<Tag> for TagFields {
    fn from(tag: Tag) -> Self {
        Self {
            area: tag.area,
            data_type: tag.data_type,
            element_count: tag.element_count,
            byte_offset: tag.byte_offset,
            bit_offset: tag.bit_offset,
            string_length: tag.string_length,
        }
    }
}
