//! Fragment outcomes and the merged response handed back to callers.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::value::PlcValue;

/// Per-tag status of a read or write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ResponseCode {
    Ok,
    NotFound,
    AccessDenied,
    InvalidAddress,
    InvalidDataType,
    InvalidData,
    InternalError,
    RemoteBusy,
    RemoteError,
    Unsupported,
    Timeout,
    Cancelled,
}

impl ResponseCode {
    #[must_use]
    pub const fn is_ok(self) -> bool { matches!(self, Self::Ok) }

    /// Map an S7 data transport return code.
    ///
    /// ```
    /// use tagframe::ResponseCode;
    /// assert_eq!(ResponseCode::from_s7_return_code(0xFF), ResponseCode::Ok);
    /// assert_eq!(ResponseCode::from_s7_return_code(0x0A), ResponseCode::NotFound);
    /// ```
    #[must_use]
    pub const fn from_s7_return_code(code: u8) -> Self {
        match code {
            0xFF => Self::Ok,
            0x03 => Self::AccessDenied,
            0x05 => Self::InvalidAddress,
            0x06 | 0x07 => Self::InvalidDataType,
            0x0A => Self::NotFound,
            _ => Self::InternalError,
        }
    }

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotFound => "not_found",
            Self::AccessDenied => "access_denied",
            Self::InvalidAddress => "invalid_address",
            Self::InvalidDataType => "invalid_data_type",
            Self::InvalidData => "invalid_data",
            Self::InternalError => "internal_error",
            Self::RemoteBusy => "remote_busy",
            Self::RemoteError => "remote_error",
            Self::Unsupported => "unsupported",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Result of one item inside a successful fragment round trip.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemResponse {
    pub code: ResponseCode,
    pub value: Option<PlcValue>,
}

impl ItemResponse {
    /// Successful read item carrying `value`.
    #[must_use]
    pub fn ok(value: PlcValue) -> Self {
        Self {
            code: ResponseCode::Ok,
            value: Some(value),
        }
    }

    /// Successful write item.
    #[must_use]
    pub fn written() -> Self {
        Self {
            code: ResponseCode::Ok,
            value: None,
        }
    }

    /// Failed item.
    #[must_use]
    pub fn failed(code: ResponseCode) -> Self { Self { code, value: None } }
}

/// Why a whole fragment failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// No response arrived in time.
    Timeout,
    /// The transport could not deliver the fragment.
    Transport(String),
    /// The remote rejected the whole message.
    Protocol(ResponseCode),
    /// The parent request was cancelled before the fragment resolved.
    Cancelled,
}

impl FailureReason {
    /// Code reported for every item of the failed fragment.
    #[must_use]
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::Timeout => ResponseCode::Timeout,
            Self::Transport(_) => ResponseCode::RemoteError,
            Self::Protocol(code) => *code,
            Self::Cancelled => ResponseCode::Cancelled,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::Protocol(_) => "protocol",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport failure: {msg}"),
            Self::Protocol(code) => write!(f, "protocol failure: {code}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Resolution of one fragment round trip.
///
/// Item responses are positional: the i-th response belongs to the i-th
/// item of the fragment.
#[derive(Clone, Debug, PartialEq)]
pub enum FragmentOutcome {
    Success(Vec<ItemResponse>),
    Failure(FailureReason),
}

impl FragmentOutcome {
    /// Code and value for item `index` of the fragment.
    ///
    /// A success carrying fewer responses than items reports the missing
    /// ones as [`ResponseCode::InternalError`].
    #[must_use]
    pub fn item(&self, index: usize) -> (ResponseCode, Option<&PlcValue>) {
        match self {
            Self::Success(items) => items.get(index).map_or(
                (ResponseCode::InternalError, None),
                |item| (item.code, item.value.as_ref()),
            ),
            Self::Failure(reason) => (reason.response_code(), None),
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool { matches!(self, Self::Failure(_)) }
}

/// Final status and value of one requested tag.
#[derive(Clone, Debug, PartialEq)]
pub struct TagResult {
    pub code: ResponseCode,
    pub value: Option<PlcValue>,
}

/// Unified response to a logical request, in request order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergedResponse {
    results: Vec<(Arc<str>, TagResult)>,
}

impl MergedResponse {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: Arc<str>, result: TagResult) {
        self.results.push((name, result));
    }

    /// Result for the tag called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TagResult> {
        self.results
            .iter()
            .find_map(|(n, result)| (&**n == name).then_some(result))
    }

    /// Code for the tag called `name`.
    #[must_use]
    pub fn code(&self, name: &str) -> Option<ResponseCode> { self.get(name).map(|r| r.code) }

    /// Value for the tag called `name`, if it succeeded with one.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&PlcValue> {
        self.get(name).and_then(|r| r.value.as_ref())
    }

    /// Iterate over `(name, result)` pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagResult)> {
        self.results.iter().map(|(name, result)| (&**name, result))
    }

    /// Tag names in request order.
    pub fn names(&self) -> impl Iterator<Item = &str> { self.results.iter().map(|(n, _)| &**n) }

    #[must_use]
    pub fn len(&self) -> usize { self.results.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.results.is_empty() }

    /// Whether every tag succeeded.
    #[must_use]
    pub fn all_ok(&self) -> bool { self.results.iter().all(|(_, r)| r.code.is_ok()) }
}
