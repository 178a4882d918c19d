//! Byte-size estimates for request and response items.
//!
//! Estimates are conservative: they include every framing byte the
//! protocol adds and round payloads up to the word boundary the wire
//! format pads to. All arithmetic is done in `u64` so that large string
//! arrays cannot overflow before they are compared with the budget.

use crate::{
    budget::Framing,
    request::RequestKind,
    tag::{DataType, Tag},
    value::PlcValue,
};

/// Round `len` up to the next even number.
#[must_use]
pub const fn pad_even(len: u64) -> u64 { len + (len & 1) }

/// Pure size estimator bound to one protocol's [`Framing`].
#[derive(Clone, Copy, Debug)]
pub struct SizeEstimator {
    framing: Framing,
}

impl SizeEstimator {
    #[must_use]
    pub const fn new(framing: Framing) -> Self { Self { framing } }

    /// Size of a request carrying no items.
    #[must_use]
    pub fn empty_request(&self, kind: RequestKind) -> u64 {
        u64::from(match kind {
            RequestKind::Read => self.framing.empty_read_request,
            RequestKind::Write => self.framing.empty_write_request,
        })
    }

    /// Size of a response carrying no items.
    #[must_use]
    pub fn empty_response(&self, kind: RequestKind) -> u64 {
        u64::from(match kind {
            RequestKind::Read => self.framing.empty_read_response,
            RequestKind::Write => self.framing.empty_write_response,
        })
    }

    /// Bytes one item adds to a request.
    ///
    /// Reads cost a fixed address specification. Writes add the encoded
    /// value, padded to even.
    #[must_use]
    pub fn request_item(&self, kind: RequestKind, tag: &Tag, value: Option<&PlcValue>) -> u64 {
        match kind {
            RequestKind::Read => u64::from(self.framing.read_request_item),
            RequestKind::Write => pad_even(
                u64::from(self.framing.write_request_item_header) + write_payload_len(tag, value),
            ),
        }
    }

    /// Bytes one item adds to a response.
    #[must_use]
    pub fn response_item(&self, kind: RequestKind, tag: &Tag) -> u64 {
        match kind {
            RequestKind::Read => {
                self.read_response_for(u64::from(tag.element_count()), tag.element_width())
            }
            RequestKind::Write => u64::from(self.framing.write_response_item),
        }
    }

    /// Response bytes of a read returning `elements` elements of `width` bytes.
    pub(crate) fn read_response_for(&self, elements: u64, width: u32) -> u64 {
        pad_even(u64::from(self.framing.response_item_header) + elements * u64::from(width))
    }

    pub(crate) const fn framing(&self) -> &Framing { &self.framing }
}

/// Encoded length of the value written to `tag`.
///
/// Booleans are bit-packed. Strings with a known value are sent at their
/// actual length plus prefix; without one they are sized at their declared
/// length.
#[must_use]
pub fn write_payload_len(tag: &Tag, value: Option<&PlcValue>) -> u64 {
    let count = u64::from(tag.element_count());
    let data_type = tag.data_type();
    if data_type == DataType::Bool {
        return count.div_ceil(8);
    }
    if !data_type.is_string() {
        return count * u64::from(tag.element_width());
    }
    let declared = u64::from(tag.string_length().unwrap_or_default());
    let prefix = u64::from(data_type.string_prefix());
    let char_width = u64::from(data_type.char_width());
    let sized = |text: &str| {
        let chars = if data_type == DataType::WString {
            text.encode_utf16().count()
        } else {
            text.chars().count()
        };
        prefix + (chars as u64).min(declared) * char_width
    };
    match value {
        Some(PlcValue::String(text)) => sized(text),
        Some(PlcValue::List(items)) if items.len() as u64 == count => items
            .iter()
            .map(|item| match item {
                PlcValue::String(text) => sized(text),
                _ => prefix + declared * char_width,
            })
            .sum(),
        _ => count * (prefix + declared * char_width),
    }
}
