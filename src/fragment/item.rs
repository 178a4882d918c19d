//! The transport-sized unit produced by the splitter.

use std::sync::Arc;

use super::{Allocation, CorrelationId};
use crate::{request::RequestKind, tag::Tag, value::PlcValue};

/// One (possibly narrowed) tag carried by a [`Fragment`].
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentItem {
    name: Arc<str>,
    tag: Tag,
    value: Option<PlcValue>,
}

impl FragmentItem {
    pub(crate) fn new(name: Arc<str>, tag: Tag, value: Option<PlcValue>) -> Self {
        Self { name, tag, value }
    }

    /// Name of the parent request entry.
    #[must_use]
    pub fn name(&self) -> &Arc<str> { &self.name }

    /// Tag addressed by this item; narrower than the parent's if split.
    #[must_use]
    pub fn tag(&self) -> &Tag { &self.tag }

    /// Value to write, covering exactly [`FragmentItem::tag`].
    #[must_use]
    pub fn value(&self) -> Option<&PlcValue> { self.value.as_ref() }
}

/// Self-contained sub-request whose request and response both fit the
/// transport budget.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    correlation_id: CorrelationId,
    cycle: u64,
    kind: RequestKind,
    items: Vec<FragmentItem>,
    estimated_request_bytes: u32,
    estimated_response_bytes: u32,
}

impl Fragment {
    pub(crate) fn new(allocation: Allocation, plan: FragmentPlan) -> Self {
        Self {
            correlation_id: allocation.id,
            cycle: allocation.cycle,
            kind: plan.kind,
            items: plan.items,
            estimated_request_bytes: saturate(plan.request_bytes),
            estimated_response_bytes: saturate(plan.response_bytes),
        }
    }

    #[must_use]
    pub const fn correlation_id(&self) -> CorrelationId { self.correlation_id }

    pub(crate) const fn cycle(&self) -> u64 { self.cycle }

    #[must_use]
    pub const fn kind(&self) -> RequestKind { self.kind }

    /// Items in wire order.
    #[must_use]
    pub fn items(&self) -> &[FragmentItem] { &self.items }

    #[must_use]
    pub fn len(&self) -> usize { self.items.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Estimated size of the request message in bytes.
    #[must_use]
    pub const fn estimated_request_bytes(&self) -> u32 { self.estimated_request_bytes }

    /// Estimated size of the response message in bytes.
    #[must_use]
    pub const fn estimated_response_bytes(&self) -> u32 { self.estimated_response_bytes }
}

/// A fragment before its correlation id is assigned.
#[derive(Debug)]
pub(crate) struct FragmentPlan {
    pub(crate) kind: RequestKind,
    pub(crate) items: Vec<FragmentItem>,
    pub(crate) request_bytes: u64,
    pub(crate) response_bytes: u64,
}

fn saturate(bytes: u64) -> u32 { u32::try_from(bytes).unwrap_or(u32::MAX) }
