//! Logical batch requests submitted by callers.
//!
//! A [`LogicalRequest`] is an ordered, name-unique list of tags that are all
//! read or all written. The entry order is the order of the merged
//! response.

use std::{collections::HashSet, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{tag::Tag, value::PlcValue};

/// Direction of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Read,
    Write,
}

impl RequestKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Errors raised while assembling a [`LogicalRequest`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequestError {
    /// Tag names must be unique within one request.
    #[error("duplicate tag name `{0}`")]
    DuplicateName(Arc<str>),
    /// A request must name at least one tag.
    #[error("request contains no tags")]
    Empty,
    /// The value written to a tag does not match its type or element count.
    #[error("value for `{name}` does not match tag {tag}")]
    ValueMismatch { name: Arc<str>, tag: Tag },
}

/// One named tag within a request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestEntry {
    name: Arc<str>,
    tag: Tag,
    value: Option<PlcValue>,
}

impl RequestEntry {
    /// Caller-chosen name of the tag.
    #[must_use]
    pub fn name(&self) -> &Arc<str> { &self.name }

    #[must_use]
    pub fn tag(&self) -> &Tag { &self.tag }

    /// Value to write; `None` for reads.
    #[must_use]
    pub fn value(&self) -> Option<&PlcValue> { self.value.as_ref() }
}

/// Ordered batch of tags to read or write in one logical operation.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicalRequest {
    kind: RequestKind,
    entries: Vec<RequestEntry>,
}

impl LogicalRequest {
    /// Start a read request.
    #[must_use]
    pub fn read() -> ReadRequestBuilder { ReadRequestBuilder::default() }

    /// Start a write request.
    #[must_use]
    pub fn write() -> WriteRequestBuilder { WriteRequestBuilder::default() }

    #[must_use]
    pub const fn kind(&self) -> RequestKind { self.kind }

    /// Entries in caller order.
    #[must_use]
    pub fn entries(&self) -> &[RequestEntry] { &self.entries }

    /// Look up an entry by tag name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&RequestEntry> {
        self.entries.iter().find(|entry| &*entry.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    fn from_entries(kind: RequestKind, entries: Vec<RequestEntry>) -> Result<Self, RequestError> {
        if entries.is_empty() {
            return Err(RequestError::Empty);
        }
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.name.clone()) {
                return Err(RequestError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(Self { kind, entries })
    }
}

/// Builder for read requests.
#[derive(Debug, Default)]
pub struct ReadRequestBuilder {
    entries: Vec<RequestEntry>,
}

impl ReadRequestBuilder {
    /// Append a tag to read under `name`.
    #[must_use]
    pub fn tag(mut self, name: impl Into<Arc<str>>, tag: Tag) -> Self {
        self.entries.push(RequestEntry {
            name: name.into(),
            tag,
            value: None,
        });
        self
    }

    /// Finish the request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Empty`] if no tags were added or
    /// [`RequestError::DuplicateName`] if a name repeats.
    pub fn build(self) -> Result<LogicalRequest, RequestError> {
        LogicalRequest::from_entries(RequestKind::Read, self.entries)
    }
}

/// Builder for write requests.
#[derive(Debug, Default)]
pub struct WriteRequestBuilder {
    entries: Vec<RequestEntry>,
}

impl WriteRequestBuilder {
    /// Append a tag to write `value` to under `name`.
    #[must_use]
    pub fn tag(mut self, name: impl Into<Arc<str>>, tag: Tag, value: impl Into<PlcValue>) -> Self {
        self.entries.push(RequestEntry {
            name: name.into(),
            tag,
            value: Some(value.into()),
        });
        self
    }

    /// Finish the request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Empty`] if no tags were added,
    /// [`RequestError::DuplicateName`] if a name repeats, or
    /// [`RequestError::ValueMismatch`] if a value does not fit its tag.
    pub fn build(self) -> Result<LogicalRequest, RequestError> {
        for entry in &self.entries {
            let fits = entry
                .value
                .as_ref()
                .is_some_and(|value| value.conforms_to(&entry.tag));
            if !fits {
                return Err(RequestError::ValueMismatch {
                    name: entry.name.clone(),
                    tag: entry.tag,
                });
            }
        }
        LogicalRequest::from_entries(RequestKind::Write, self.entries)
    }
}
