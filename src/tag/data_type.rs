//! Element kinds and their transport widths.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::PlcValue;

/// Declared length assumed for string tags that do not state one.
pub const DEFAULT_STRING_LENGTH: u16 = 254;

/// Closed set of element kinds a tag may hold.
///
/// Every kind except [`DataType::String`] and [`DataType::WString`] has a
/// fixed width on the wire. Time and date kinds carry their raw encoded
/// integer as the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Bool,
    Byte,
    Word,
    DWord,
    LWord,
    SInt,
    Int,
    DInt,
    LInt,
    USInt,
    UInt,
    UDInt,
    ULInt,
    Real,
    LReal,
    Char,
    WChar,
    String,
    WString,
    Date,
    Time,
    LTime,
    TimeOfDay,
    DateAndTime,
}

impl DataType {
    /// Width of one element in bytes, or `None` for string kinds whose
    /// width depends on the declared length.
    #[must_use]
    pub const fn fixed_width(self) -> Option<u32> {
        match self {
            Self::Bool | Self::Byte | Self::SInt | Self::USInt | Self::Char => Some(1),
            Self::Word | Self::Int | Self::UInt | Self::WChar | Self::Date => Some(2),
            Self::DWord | Self::DInt | Self::UDInt | Self::Real | Self::Time | Self::TimeOfDay => {
                Some(4)
            }
            Self::LWord
            | Self::LInt
            | Self::ULInt
            | Self::LReal
            | Self::LTime
            | Self::DateAndTime => Some(8),
            Self::String | Self::WString => None,
        }
    }

    /// Whether the kind is a length-prefixed string.
    #[must_use]
    pub const fn is_string(self) -> bool { matches!(self, Self::String | Self::WString) }

    /// Whether arrays of this kind reassemble into a raw byte buffer.
    #[must_use]
    pub const fn is_raw_bytes(self) -> bool { matches!(self, Self::Byte | Self::Char) }

    /// Length prefix in bytes for string kinds, zero otherwise.
    #[must_use]
    pub const fn string_prefix(self) -> u32 {
        match self {
            Self::String => 2,
            Self::WString => 4,
            _ => 0,
        }
    }

    /// Bytes per character for string kinds.
    pub(crate) const fn char_width(self) -> u32 {
        match self {
            Self::WString => 2,
            _ => 1,
        }
    }

    /// Check that `value` is a single element of this kind.
    #[must_use]
    pub fn accepts(self, value: &PlcValue) -> bool {
        matches!(
            (self, value),
            (Self::Bool, PlcValue::Bool(_))
                | (Self::Byte, PlcValue::Byte(_))
                | (Self::Word, PlcValue::Word(_))
                | (Self::DWord, PlcValue::DWord(_))
                | (Self::LWord | Self::DateAndTime, PlcValue::LWord(_))
                | (Self::SInt, PlcValue::SInt(_))
                | (Self::Int, PlcValue::Int(_))
                | (Self::DInt | Self::Time, PlcValue::DInt(_))
                | (Self::LInt | Self::LTime, PlcValue::LInt(_))
                | (Self::USInt, PlcValue::USInt(_))
                | (Self::UInt | Self::Date, PlcValue::UInt(_))
                | (Self::UDInt | Self::TimeOfDay, PlcValue::UDInt(_))
                | (Self::ULInt, PlcValue::ULInt(_))
                | (Self::Real, PlcValue::Real(_))
                | (Self::LReal, PlcValue::LReal(_))
                | (Self::Char, PlcValue::Char(_))
                | (Self::WChar, PlcValue::WChar(_))
                | (Self::String | Self::WString, PlcValue::String(_))
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "BOOL",
            Self::Byte => "BYTE",
            Self::Word => "WORD",
            Self::DWord => "DWORD",
            Self::LWord => "LWORD",
            Self::SInt => "SINT",
            Self::Int => "INT",
            Self::DInt => "DINT",
            Self::LInt => "LINT",
            Self::USInt => "USINT",
            Self::UInt => "UINT",
            Self::UDInt => "UDINT",
            Self::ULInt => "ULINT",
            Self::Real => "REAL",
            Self::LReal => "LREAL",
            Self::Char => "CHAR",
            Self::WChar => "WCHAR",
            Self::String => "STRING",
            Self::WString => "WSTRING",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::LTime => "LTIME",
            Self::TimeOfDay => "TIME_OF_DAY",
            Self::DateAndTime => "DATE_AND_TIME",
        };
        f.write_str(name)
    }
}
