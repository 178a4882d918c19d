//! Metric helpers for `tagframe`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate. Without the `metrics`
//! feature the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::{request::RequestKind, response::FailureReason};

/// Name of the counter tracking fragments handed to the transport.
pub const FRAGMENTS_DISPATCHED: &str = "tagframe_fragments_dispatched_total";
/// Name of the counter tracking fragments that failed as a whole.
pub const FRAGMENT_FAILURES: &str = "tagframe_fragment_failures_total";
/// Name of the counter tracking outcomes the tracker discarded.
pub const OUTCOMES_DISCARDED: &str = "tagframe_outcomes_discarded_total";
/// Name of the counter tracking logical requests merged.
pub const REQUESTS_MERGED: &str = "tagframe_requests_merged_total";
/// Name of the counter tracking logical requests cancelled.
pub const REQUESTS_CANCELLED: &str = "tagframe_requests_cancelled_total";

/// Why the tracker discarded an outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discard {
    /// The fragment had already resolved.
    Duplicate,
    /// The correlation id is not (or no longer) tracked.
    Unknown,
}

impl Discard {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Discard::Duplicate => "duplicate",
            Discard::Unknown => "unknown",
        }
    }
}

/// Record a fragment handed to the transport.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_fragments_dispatched(kind: RequestKind) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_DISPATCHED, "kind" => kind.as_str()).increment(1);
}

/// Record a whole-fragment failure.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_fragment_failures(reason: &FailureReason) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENT_FAILURES, "reason" => reason.as_str()).increment(1);
}

/// Record a discarded outcome.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_outcomes_discarded(discard: Discard) {
    #[cfg(feature = "metrics")]
    counter!(OUTCOMES_DISCARDED, "reason" => discard.as_str()).increment(1);
}

/// Record a merged logical request.
pub fn inc_requests_merged() {
    #[cfg(feature = "metrics")]
    counter!(REQUESTS_MERGED).increment(1);
}

/// Record a cancelled logical request.
pub fn inc_requests_cancelled() {
    #[cfg(feature = "metrics")]
    counter!(REQUESTS_CANCELLED).increment(1);
}
