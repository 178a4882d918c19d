//! Deterministic process values derived from addresses.
//!
//! Every element's value depends only on its absolute address, so a value
//! reassembled from chunks equals the value of the whole tag.

use bytes::Bytes;
use tagframe::{DataType, PlcValue, Tag};

/// Address of element `index` of `tag`: a bit address for booleans, a byte
/// address otherwise.
fn element_address(tag: &Tag, index: u32) -> u64 {
    if tag.data_type() == DataType::Bool {
        u64::from(tag.byte_offset()) * 8 + u64::from(tag.bit_offset()) + u64::from(index)
    } else {
        u64::from(tag.byte_offset()) + u64::from(index) * u64::from(tag.element_width())
    }
}

/// Value stored at `address` for an element of `data_type`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    reason = "synthetic values only need to be deterministic"
)]
#[must_use]
pub fn synthetic_element(data_type: DataType, address: u64) -> PlcValue {
    match data_type {
        DataType::Bool => PlcValue::Bool(address % 3 == 0),
        DataType::Byte => PlcValue::Byte(address as u8),
        DataType::USInt => PlcValue::USInt(address as u8),
        DataType::SInt => PlcValue::SInt(address as i8),
        DataType::Char => PlcValue::Char(char::from(b'A' + (address % 26) as u8)),
        DataType::WChar => PlcValue::WChar(char::from(b'a' + (address % 26) as u8)),
        DataType::Word => PlcValue::Word(address as u16),
        DataType::Int => PlcValue::Int(address as i16),
        DataType::UInt | DataType::Date => PlcValue::UInt(address as u16),
        DataType::DWord => PlcValue::DWord(address as u32),
        DataType::DInt | DataType::Time => PlcValue::DInt(address as i32),
        DataType::UDInt | DataType::TimeOfDay => PlcValue::UDInt(address as u32),
        DataType::LWord | DataType::DateAndTime => PlcValue::LWord(address),
        DataType::LInt | DataType::LTime => PlcValue::LInt(address as i64),
        DataType::ULInt => PlcValue::ULInt(address),
        DataType::Real => PlcValue::Real(address as f32),
        DataType::LReal => PlcValue::LReal(address as f64),
        DataType::String | DataType::WString => PlcValue::String(format!("s{address}")),
    }
}

/// Value a read of the whole of `tag` returns.
///
/// Byte and character arrays come back as raw buffers, other arrays as
/// lists, and single elements as scalars.
#[must_use]
pub fn synthetic_value(tag: &Tag) -> PlcValue {
    let data_type = tag.data_type();
    let count = u32::from(tag.element_count());
    if count == 1 {
        return synthetic_element(data_type, element_address(tag, 0));
    }
    let elements = (0..count).map(|i| synthetic_element(data_type, element_address(tag, i)));
    if data_type.is_raw_bytes() {
        let raw: Vec<u8> = elements
            .map(|element| match element {
                PlcValue::Byte(b) => b,
                PlcValue::Char(c) => u8::try_from(c).unwrap_or(b'?'),
                _ => 0,
            })
            .collect();
        PlcValue::Bytes(Bytes::from(raw))
    } else {
        PlcValue::List(elements.collect())
    }
}
