//! Element values carried by write requests and read responses.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::tag::{DataType, Tag};

/// A process value: one element, a raw byte buffer, or a typed array.
///
/// Byte and character arrays travel as [`PlcValue::Bytes`]; arrays of every
/// other kind travel as [`PlcValue::List`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlcValue {
    Bool(bool),
    Byte(u8),
    Word(u16),
    DWord(u32),
    LWord(u64),
    SInt(i8),
    Int(i16),
    DInt(i32),
    LInt(i64),
    USInt(u8),
    UInt(u16),
    UDInt(u32),
    ULInt(u64),
    Real(f32),
    LReal(f64),
    Char(char),
    WChar(char),
    String(String),
    Bytes(Bytes),
    List(Vec<PlcValue>),
}

impl PlcValue {
    /// Number of elements the value holds.
    #[must_use]
    pub fn element_count(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::List(items) => items.len(),
            _ => 1,
        }
    }

    /// Extract element `index` as a scalar of `data_type`.
    ///
    /// Raw buffers yield [`PlcValue::Char`] for character tags and
    /// [`PlcValue::Byte`] otherwise. A scalar is its own element zero.
    #[must_use]
    pub fn element(&self, index: usize, data_type: DataType) -> Option<PlcValue> {
        match self {
            Self::Bytes(bytes) => bytes.get(index).map(|&b| {
                if data_type == DataType::Char {
                    Self::Char(char::from(b))
                } else {
                    Self::Byte(b)
                }
            }),
            Self::List(items) => items.get(index).cloned(),
            scalar => (index == 0).then(|| scalar.clone()),
        }
    }

    /// Raw byte buffer, if the value is one.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Typed array elements, if the value is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[PlcValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Check that the value has exactly the shape `tag` addresses.
    #[must_use]
    pub fn conforms_to(&self, tag: &Tag) -> bool {
        let data_type = tag.data_type();
        let count = usize::from(tag.element_count());
        match self {
            Self::Bytes(bytes) => data_type.is_raw_bytes() && bytes.len() == count,
            Self::List(items) => {
                items.len() == count && items.iter().all(|item| data_type.accepts(item))
            }
            scalar => count == 1 && data_type.accepts(scalar),
        }
    }

    /// Byte value of a single raw element, used to rebuild byte buffers.
    pub(crate) fn as_raw_byte(&self) -> Option<u8> {
        match self {
            Self::Byte(b) | Self::USInt(b) => Some(*b),
            Self::Char(c) => u8::try_from(*c).ok(),
            Self::Bytes(bytes) if bytes.len() == 1 => bytes.first().copied(),
            _ => None,
        }
    }
}

impl From<bool> for PlcValue {
    fn from(value: bool) -> Self { Self::Bool(value) }
}

impl From<String> for PlcValue {
    fn from(value: String) -> Self { Self::String(value) }
}

impl From<&str> for PlcValue {
    fn from(value: &str) -> Self { Self::String(value.to_owned()) }
}

impl From<Bytes> for PlcValue {
    fn from(value: Bytes) -> Self { Self::Bytes(value) }
}

impl From<Vec<PlcValue>> for PlcValue {
    fn from(value: Vec<PlcValue>) -> Self { Self::List(value) }
}
