//! Reassembles fragment outcomes into one response.
//!
//! Outcomes may arrive in any order; the merged response follows the
//! request's tag order, and pieces of a split tag are placed by address.
//! A split tag succeeds only if every piece succeeded. Otherwise it reports
//! the first failure in address order and its partial data is dropped.

use std::collections::HashMap;

use bytes::BytesMut;
use log::debug;

use crate::{
    fragment::Fragment,
    request::{LogicalRequest, RequestEntry, RequestKind},
    response::{FragmentOutcome, MergedResponse, ResponseCode, TagResult},
    tag::Tag,
    value::PlcValue,
};

/// A fragment paired with its resolution.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedFragment<'a> {
    pub fragment: &'a Fragment,
    pub outcome: &'a FragmentOutcome,
}

impl<'a> ResolvedFragment<'a> {
    #[must_use]
    pub fn new(fragment: &'a Fragment, outcome: &'a FragmentOutcome) -> Self {
        Self { fragment, outcome }
    }
}

/// One resolved item of a fragment, attributed to its parent tag.
struct Piece<'a> {
    tag: &'a Tag,
    code: ResponseCode,
    value: Option<&'a PlcValue>,
}

/// Build the response to `request` from its resolved fragments.
///
/// Tags for which no piece was resolved report
/// [`ResponseCode::InternalError`].
#[must_use]
pub fn merge(request: &LogicalRequest, resolved: &[ResolvedFragment<'_>]) -> MergedResponse {
    let mut pieces: HashMap<&str, Vec<Piece<'_>>> = HashMap::with_capacity(request.len());
    for resolution in resolved {
        for (index, item) in resolution.fragment.items().iter().enumerate() {
            let (code, value) = resolution.outcome.item(index);
            pieces.entry(&**item.name()).or_default().push(Piece {
                tag: item.tag(),
                code,
                value,
            });
        }
    }

    let mut response = MergedResponse::with_capacity(request.len());
    for entry in request.entries() {
        let result = match pieces.remove(&**entry.name()) {
            Some(parts) => merge_entry(request.kind(), entry, parts),
            None => failed(ResponseCode::InternalError),
        };
        response.push(entry.name().clone(), result);
    }
    response
}

fn merge_entry(kind: RequestKind, entry: &RequestEntry, parts: Vec<Piece<'_>>) -> TagResult {
    let original = entry.tag();
    if let [only] = parts.as_slice() {
        if only.tag == original {
            return TagResult {
                code: only.code,
                value: only.value.cloned(),
            };
        }
    }

    let mut placed = Vec::with_capacity(parts.len());
    for part in parts {
        let Some(index) = original.element_index_of(part.tag) else {
            debug!("piece {} does not belong to `{}` ({original})", part.tag, entry.name());
            return failed(ResponseCode::InternalError);
        };
        placed.push((index, part));
    }
    placed.sort_by_key(|(index, _)| *index);

    if let Some((_, failure)) = placed.iter().find(|(_, part)| !part.code.is_ok()) {
        return failed(failure.code);
    }
    let mut next = 0u16;
    for (index, part) in &placed {
        if *index != next {
            return failed(ResponseCode::InternalError);
        }
        next += part.tag.element_count();
    }
    if next != original.element_count() {
        return failed(ResponseCode::InternalError);
    }

    let value = match kind {
        RequestKind::Write => None,
        RequestKind::Read if original.data_type().is_raw_bytes() => {
            match reassemble_bytes(original, &placed) {
                Some(value) => Some(value),
                None => return failed(ResponseCode::InvalidData),
            }
        }
        RequestKind::Read => match reassemble_list(original, &placed) {
            Some(value) => Some(value),
            None => return failed(ResponseCode::InvalidData),
        },
    };
    TagResult {
        code: ResponseCode::Ok,
        value,
    }
}

/// Copy each piece's bytes to its offset within the original tag.
fn reassemble_bytes(original: &Tag, placed: &[(u16, Piece<'_>)]) -> Option<PlcValue> {
    let mut buffer = BytesMut::zeroed(usize::from(original.element_count()));
    for (_, part) in placed {
        let at = usize::try_from(part.tag.byte_offset() - original.byte_offset()).ok()?;
        let len = usize::from(part.tag.element_count());
        let target = buffer.get_mut(at..at + len)?;
        match part.value? {
            PlcValue::Bytes(bytes) if bytes.len() == len => target.copy_from_slice(bytes),
            PlcValue::List(items) if items.len() == len => {
                for (slot, item) in target.iter_mut().zip(items) {
                    *slot = item.as_raw_byte()?;
                }
            }
            scalar if len == 1 => target[0] = scalar.as_raw_byte()?,
            _ => return None,
        }
    }
    Some(PlcValue::Bytes(buffer.freeze()))
}

/// Place each piece's elements at their index within the original tag.
fn reassemble_list(original: &Tag, placed: &[(u16, Piece<'_>)]) -> Option<PlcValue> {
    let data_type = original.data_type();
    let mut elements = Vec::with_capacity(usize::from(original.element_count()));
    for (_, part) in placed {
        let value = part.value?;
        if !value.conforms_to(part.tag) {
            return None;
        }
        for i in 0..usize::from(part.tag.element_count()) {
            elements.push(value.element(i, data_type)?);
        }
    }
    Some(PlcValue::List(elements))
}

fn failed(code: ResponseCode) -> TagResult { TagResult { code, value: None } }
