//! Errors raised while splitting a logical request.

use std::sync::Arc;

use thiserror::Error;

use super::CorrelationExhausted;
use crate::{
    request::RequestKind,
    tag::{Tag, TagError},
};

/// Errors produced by [`Splitter`](super::Splitter).
///
/// Every variant except [`SplitError::Exhausted`] is a configuration error:
/// the request can never be sent with the current budget, and it is raised
/// before any fragment is dispatched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SplitError {
    /// The budget cannot carry even an empty message with a single item.
    #[error("a {max_pdu}-byte budget cannot carry a single-item {kind} request ({required} bytes)")]
    BudgetTooSmall {
        kind: RequestKind,
        max_pdu: u32,
        required: u64,
    },
    /// One element of a tag does not fit the budget on its own.
    #[error("tag `{name}` ({tag}) needs {required} bytes for one element, budget is {max_pdu}")]
    ElementExceedsBudget {
        name: Arc<str>,
        tag: Tag,
        required: u64,
        max_pdu: u32,
    },
    /// Narrowing a tag produced an invalid address.
    #[error("cannot narrow tag `{name}`: {source}")]
    Narrow {
        name: Arc<str>,
        #[source]
        source: TagError,
    },
    /// No correlation id could be allocated.
    #[error(transparent)]
    Exhausted(#[from] CorrelationExhausted),
}

impl SplitError {
    /// Whether the error is a configuration problem rather than id exhaustion.
    #[must_use]
    pub fn is_configuration(&self) -> bool { !matches!(self, Self::Exhausted(_)) }
}
