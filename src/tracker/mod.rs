//! Concurrent correlation table for in-flight fragments.
//!
//! [`FragmentTracker`] maps each outstanding [`CorrelationId`] to its parent
//! request and records the fragment's outcome exactly once. The task that
//! records the last outstanding outcome of a request merges the response
//! and delivers it on the request's completion channel. A per-request
//! compare-and-set guards the merge so that racing recorders and
//! cancellation produce it only once.
//!
//! The tracker is also the session's [`CorrelationSource`]: it knows which
//! identifiers are still in flight, so wrapping the 16-bit id space while
//! fragments of the previous pass are outstanding is detected and reported
//! as fatal.

use std::sync::{
    Arc,
    Mutex,
    OnceLock,
    PoisonError,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use log::{debug, warn};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::{
    fragment::{
        Allocation,
        CorrelationExhausted,
        CorrelationId,
        CorrelationSource,
        Fragment,
        RequestId,
        id::allocation_for,
    },
    merge::{ResolvedFragment, merge},
    metrics::{self, Discard},
    request::LogicalRequest,
    response::{FailureReason, FragmentOutcome, MergedResponse},
};

/// Largest correlation id handed out by default. S7 TPDU references wrap
/// back to 1 before `0xFFFF`.
pub const DEFAULT_MAX_CORRELATION_ID: u16 = 0xFFFE;

/// Errors raised when registering fragments.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackerError {
    /// A correlation id is already in flight; the session must be reset.
    #[error(transparent)]
    CorrelationExhausted(#[from] CorrelationExhausted),
    /// A request must be registered with at least one fragment.
    #[error("cannot register a request without fragments")]
    NoFragments,
}

/// Result of recording a fragment outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordStatus {
    /// The outcome was stored; `remaining` fragments are still outstanding.
    Pending { remaining: usize },
    /// The outcome completed its request, which has been merged.
    Completed { request_id: RequestId },
    /// The fragment had already resolved; the outcome was discarded.
    Duplicate,
    /// The correlation id is not tracked, typically because its request was
    /// already merged or cancelled; the outcome was discarded.
    Unknown,
}

/// Handle returned by [`FragmentTracker::register`].
#[derive(Debug)]
pub struct Registration {
    pub request_id: RequestId,
    /// Fragments to dispatch, in splitter order.
    pub fragments: Vec<Arc<Fragment>>,
    /// Resolves with the merged response once every fragment resolved or the
    /// request was cancelled.
    pub completion: oneshot::Receiver<MergedResponse>,
}

#[derive(Debug)]
struct TrackedFragment {
    parent: RequestId,
    fragment: Arc<Fragment>,
    outcome: OnceLock<FragmentOutcome>,
}

#[derive(Debug)]
struct ParentEntry {
    request: Arc<LogicalRequest>,
    children: Vec<Arc<TrackedFragment>>,
    pending: AtomicUsize,
    merged: AtomicBool,
    completion: Mutex<Option<oneshot::Sender<MergedResponse>>>,
}

/// Correlation table shared by every task of one session.
#[derive(Debug)]
pub struct FragmentTracker {
    max_correlation_id: u16,
    next_sequence: AtomicU64,
    next_request: AtomicU64,
    exhausted: AtomicBool,
    fragments: DashMap<CorrelationId, Arc<TrackedFragment>>,
    requests: DashMap<RequestId, Arc<ParentEntry>>,
}

impl Default for FragmentTracker {
    fn default() -> Self { Self::new(DEFAULT_MAX_CORRELATION_ID) }
}

impl FragmentTracker {
    /// Create a tracker handing out correlation ids in `1..=max_correlation_id`.
    #[must_use]
    pub fn new(max_correlation_id: u16) -> Self {
        Self {
            max_correlation_id: max_correlation_id.max(1),
            next_sequence: AtomicU64::new(0),
            next_request: AtomicU64::new(1),
            exhausted: AtomicBool::new(false),
            fragments: DashMap::new(),
            requests: DashMap::new(),
        }
    }

    /// Number of fragments awaiting an outcome or a merge.
    #[must_use]
    pub fn outstanding(&self) -> usize { self.fragments.len() }

    /// Number of requests not yet merged.
    #[must_use]
    pub fn outstanding_requests(&self) -> usize { self.requests.len() }

    /// Whether a correlation id is currently tracked.
    #[must_use]
    pub fn is_tracked(&self, id: CorrelationId) -> bool { self.fragments.contains_key(&id) }

    /// Track `fragments` of `request` until they all resolve.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::CorrelationExhausted`] if a fragment's id is
    /// already in flight; nothing is registered in that case. Returns
    /// [`TrackerError::NoFragments`] for an empty fragment list.
    pub fn register(
        &self,
        request: Arc<LogicalRequest>,
        fragments: Vec<Fragment>,
    ) -> Result<Registration, TrackerError> {
        if fragments.is_empty() {
            return Err(TrackerError::NoFragments);
        }
        let request_id = RequestId::new(self.next_request.fetch_add(1, Ordering::Relaxed));
        let fragments: Vec<Arc<Fragment>> = fragments.into_iter().map(Arc::new).collect();
        let children: Vec<Arc<TrackedFragment>> = fragments
            .iter()
            .map(|fragment| {
                Arc::new(TrackedFragment {
                    parent: request_id,
                    fragment: Arc::clone(fragment),
                    outcome: OnceLock::new(),
                })
            })
            .collect();

        for (inserted, child) in children.iter().enumerate() {
            let id = child.fragment.correlation_id();
            let vacant = match self.fragments.entry(id) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(child));
                    true
                }
            };
            if !vacant {
                for earlier in &children[..inserted] {
                    self.fragments.remove(&earlier.fragment.correlation_id());
                }
                self.exhausted.store(true, Ordering::Release);
                warn!("correlation id {id} is already in flight");
                return Err(CorrelationExhausted {
                    id,
                    cycle: child.fragment.cycle(),
                }
                .into());
            }
        }

        let (tx, rx) = oneshot::channel();
        let parent = ParentEntry {
            request,
            pending: AtomicUsize::new(children.len()),
            children,
            merged: AtomicBool::new(false),
            completion: Mutex::new(Some(tx)),
        };
        self.requests.insert(request_id, Arc::new(parent));
        debug!(
            "registered request {request_id} with {} fragments",
            fragments.len()
        );
        Ok(Registration {
            request_id,
            fragments,
            completion: rx,
        })
    }

    /// Record the outcome of fragment `id`.
    ///
    /// The first outcome for a fragment wins; later ones are discarded with
    /// a warning. Recording the last outstanding outcome of a request merges
    /// it and resolves its completion channel.
    pub fn record(&self, id: CorrelationId, outcome: FragmentOutcome) -> RecordStatus {
        let Some(tracked) = self.fragments.get(&id).map(|entry| Arc::clone(entry.value())) else {
            warn!("discarding outcome for unknown correlation id {id}");
            metrics::inc_outcomes_discarded(Discard::Unknown);
            return RecordStatus::Unknown;
        };
        if tracked.outcome.set(outcome).is_err() {
            warn!("discarding duplicate outcome for correlation id {id}");
            metrics::inc_outcomes_discarded(Discard::Duplicate);
            return RecordStatus::Duplicate;
        }
        if let Some(FragmentOutcome::Failure(reason)) = tracked.outcome.get() {
            metrics::inc_fragment_failures(reason);
        }
        let Some(parent) = self
            .requests
            .get(&tracked.parent)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return RecordStatus::Unknown;
        };
        let remaining = parent.pending.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining > 0 {
            return RecordStatus::Pending { remaining };
        }
        if parent
            .merged
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.finish(tracked.parent, &parent);
            return RecordStatus::Completed {
                request_id: tracked.parent,
            };
        }
        // Cancellation merged the request first.
        RecordStatus::Duplicate
    }

    /// Cancel request `request_id`.
    ///
    /// Fragments that have not resolved are marked
    /// [`FailureReason::Cancelled`] and the request is merged immediately.
    /// Returns `false` if the request is unknown or already merged.
    pub fn cancel(&self, request_id: RequestId) -> bool {
        let Some(parent) = self
            .requests
            .get(&request_id)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return false;
        };
        if parent
            .merged
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        for child in &parent.children {
            let _ = child
                .outcome
                .set(FragmentOutcome::Failure(FailureReason::Cancelled));
        }
        debug!("cancelled request {request_id}");
        metrics::inc_requests_cancelled();
        self.finish(request_id, &parent);
        true
    }

    /// Cancel every outstanding request and restart the id sequence.
    ///
    /// Call after the session has been re-established, for example after
    /// correlation id exhaustion.
    pub fn reset(&self) {
        let pending: Vec<RequestId> = self.requests.iter().map(|entry| *entry.key()).collect();
        for request_id in pending {
            self.cancel(request_id);
        }
        self.fragments.clear();
        self.requests.clear();
        self.next_sequence.store(0, Ordering::Release);
        self.exhausted.store(false, Ordering::Release);
    }

    fn finish(&self, request_id: RequestId, parent: &ParentEntry) {
        let resolved: Vec<ResolvedFragment<'_>> = parent
            .children
            .iter()
            .filter_map(|child| {
                child
                    .outcome
                    .get()
                    .map(|outcome| ResolvedFragment::new(&child.fragment, outcome))
            })
            .collect();
        let response = merge(&parent.request, &resolved);

        for child in &parent.children {
            self.fragments
                .remove_if(&child.fragment.correlation_id(), |_, tracked| {
                    Arc::ptr_eq(tracked, child)
                });
        }
        self.requests.remove(&request_id);
        metrics::inc_requests_merged();

        let sender = parent
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            if tx.send(response).is_err() {
                debug!("request {request_id} merged after its caller went away");
            }
        }
    }
}

impl CorrelationSource for FragmentTracker {
    fn allocate(&self) -> Result<Allocation, CorrelationExhausted> {
        let seq = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let allocation = allocation_for(seq, self.max_correlation_id);
        let exhausted = CorrelationExhausted {
            id: allocation.id,
            cycle: allocation.cycle,
        };
        if self.exhausted.load(Ordering::Acquire) {
            return Err(exhausted);
        }
        let wrapping = allocation.cycle > 0 && allocation.id.get() == 1;
        let stale = wrapping
            && self
                .fragments
                .iter()
                .any(|entry| entry.fragment.cycle() < allocation.cycle);
        if stale || self.fragments.contains_key(&allocation.id) {
            self.exhausted.store(true, Ordering::Release);
            warn!(
                "correlation id space exhausted at id {} (cycle {})",
                allocation.id, allocation.cycle
            );
            return Err(exhausted);
        }
        Ok(allocation)
    }
}
