//! Asynchronous request execution.
//!
//! A [`Dispatcher`] owns one session's transport and [`FragmentTracker`].
//! For each logical request it snapshots the current budget, splits the
//! request, registers the fragments and sends them with bounded
//! concurrency. Each send is subject to a timeout and an optional rate
//! limit. The merged response arrives on the completion channel once the
//! last fragment resolves or the request is cancelled.

mod transport;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use futures::{StreamExt, stream};
use leaky_bucket::RateLimiter;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
pub use transport::FragmentTransport;

use crate::{
    budget::{Framing, TransportBudget},
    config::{ConfigError, DispatchConfig},
    fragment::{CorrelationExhausted, Fragment, RequestId, SplitError, Splitter, SplitterConfig},
    metrics,
    request::LogicalRequest,
    response::{FailureReason, FragmentOutcome, MergedResponse},
    tracker::{FragmentTracker, Registration, TrackerError},
};

/// Errors returned by [`Dispatcher::execute`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// The request can never be sent with the current budget.
    #[error(transparent)]
    Split(SplitError),
    /// Correlation ids ran out while fragments were in flight; the session
    /// must be reset before further requests are sent.
    #[error("session reset required: {0}")]
    SessionReset(#[source] CorrelationExhausted),
    /// The tracker refused the registration.
    #[error(transparent)]
    Tracker(TrackerError),
    /// The completion channel closed without a response.
    #[error("request {0} completed without a response")]
    CompletionDropped(RequestId),
}

impl DispatchError {
    /// Whether the session must be torn down and re-established.
    #[must_use]
    pub fn is_session_fatal(&self) -> bool { matches!(self, Self::SessionReset(_)) }
}

impl From<SplitError> for DispatchError {
    fn from(err: SplitError) -> Self {
        match err {
            SplitError::Exhausted(exhausted) => Self::SessionReset(exhausted),
            other => Self::Split(other),
        }
    }
}

impl From<TrackerError> for DispatchError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::CorrelationExhausted(exhausted) => Self::SessionReset(exhausted),
            other => Self::Tracker(other),
        }
    }
}

/// Executes logical requests over a [`FragmentTransport`].
pub struct Dispatcher<T> {
    transport: T,
    tracker: Arc<FragmentTracker>,
    splitter: Splitter,
    max_pdu: AtomicU32,
    framing: Framing,
    fragment_timeout: Duration,
    max_in_flight: usize,
    limiter: Option<RateLimiter>,
}

impl<T: FragmentTransport> Dispatcher<T> {
    /// Start configuring a dispatcher for `transport`.
    #[must_use]
    pub fn builder(transport: T) -> DispatcherBuilder<T> { DispatcherBuilder::new(transport) }

    /// Create a dispatcher from a complete configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` is invalid.
    pub fn new(transport: T, config: DispatchConfig) -> Result<Self, ConfigError> {
        Self::builder(transport).config(config).build()
    }

    /// Budget applied to requests submitted from now on.
    #[must_use]
    pub fn budget(&self) -> TransportBudget {
        TransportBudget::new(self.max_pdu.load(Ordering::Acquire), self.framing)
    }

    /// Apply a renegotiated PDU size.
    ///
    /// Requests already split keep the budget they were split with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PduTooSmall`] if the size cannot carry the
    /// framing.
    pub fn renegotiate(&self, max_pdu_bytes: u32) -> Result<(), ConfigError> {
        let probe = DispatchConfig {
            max_pdu_bytes,
            framing: self.framing,
            ..DispatchConfig::default()
        };
        probe.validate()?;
        let previous = self.max_pdu.swap(max_pdu_bytes, Ordering::AcqRel);
        debug!(previous, max_pdu_bytes, "transport budget renegotiated");
        Ok(())
    }

    /// Tracker shared by this dispatcher's requests.
    #[must_use]
    pub fn tracker(&self) -> &Arc<FragmentTracker> { &self.tracker }

    /// Execute `request` and wait for its merged response.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::execute_with_cancel`].
    pub async fn execute(&self, request: LogicalRequest) -> Result<MergedResponse, DispatchError> {
        self.execute_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Execute `request`, cancelling outstanding fragments when `cancel`
    /// fires.
    ///
    /// A cancelled request still yields a response: tags whose fragments
    /// had not resolved report
    /// [`ResponseCode::Cancelled`](crate::response::ResponseCode::Cancelled).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Split`] before anything is sent if the
    /// request cannot fit the budget, and [`DispatchError::SessionReset`]
    /// if correlation ids are exhausted.
    pub async fn execute_with_cancel(
        &self,
        request: LogicalRequest,
        cancel: CancellationToken,
    ) -> Result<MergedResponse, DispatchError> {
        let budget = self.budget();
        let fragments = self.splitter.split(&request, &budget, &*self.tracker)?;
        let Registration {
            request_id,
            fragments,
            completion,
        } = self.tracker.register(Arc::new(request), fragments)?;
        debug!(
            request_id = request_id.get(),
            fragments = fragments.len(),
            max_pdu = budget.max_pdu_bytes(),
            "dispatching request"
        );

        let _abandon = AbandonGuard {
            tracker: &self.tracker,
            request_id,
        };

        let sends = stream::iter(fragments)
            .for_each_concurrent(self.max_in_flight, |fragment| self.send_one(fragment));
        let mut completion = completion;
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if self.tracker.cancel(request_id) {
                    debug!(request_id = request_id.get(), "request cancelled");
                }
            }
            // Resolves early when the tracker cancels the request, e.g. on reset.
            merged = &mut completion => {
                return merged.map_err(|_| DispatchError::CompletionDropped(request_id));
            }
            () = sends => {}
        }

        completion
            .await
            .map_err(|_| DispatchError::CompletionDropped(request_id))
    }

    async fn send_one(&self, fragment: Arc<Fragment>) {
        if let Some(limiter) = &self.limiter {
            limiter.acquire_one().await;
        }
        metrics::inc_fragments_dispatched(fragment.kind());
        let id = fragment.correlation_id();
        let send = self.transport.send(&fragment);
        let outcome = match tokio::time::timeout(self.fragment_timeout, send).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    correlation_id = id.get(),
                    timeout = ?self.fragment_timeout,
                    "fragment timed out"
                );
                FragmentOutcome::Failure(FailureReason::Timeout)
            }
        };
        if let FragmentOutcome::Failure(reason) = &outcome {
            debug!(correlation_id = id.get(), %reason, "fragment failed");
        }
        self.tracker.record(id, outcome);
    }
}

/// Cancels a request whose caller stopped waiting before it was merged.
struct AbandonGuard<'a> {
    tracker: &'a FragmentTracker,
    request_id: RequestId,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) { self.tracker.cancel(self.request_id); }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder<T> {
    transport: T,
    config: DispatchConfig,
    tracker: Option<Arc<FragmentTracker>>,
}

impl<T: FragmentTransport> DispatcherBuilder<T> {
    fn new(transport: T) -> Self {
        Self {
            transport,
            config: DispatchConfig::default(),
            tracker: None,
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the negotiated PDU size.
    #[must_use]
    pub fn max_pdu(mut self, max_pdu_bytes: u32) -> Self {
        self.config.max_pdu_bytes = max_pdu_bytes;
        self
    }

    /// Set the protocol framing.
    #[must_use]
    pub fn framing(mut self, framing: Framing) -> Self {
        self.config.framing = framing;
        self
    }

    /// Set the time allowed for one fragment round trip.
    #[must_use]
    pub fn fragment_timeout(mut self, timeout: Duration) -> Self {
        self.config.fragment_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set how many fragments of one request may be in flight at once.
    #[must_use]
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.config.max_in_flight = max_in_flight;
        self
    }

    /// Limit dispatch to `rate` fragments per second.
    #[must_use]
    pub fn rate_per_second(mut self, rate: usize) -> Self {
        self.config.rate_per_second = Some(rate);
        self
    }

    /// Set the splitter options.
    #[must_use]
    pub fn splitter(mut self, splitter: SplitterConfig) -> Self {
        self.config.splitter = splitter;
        self
    }

    /// Share an existing tracker instead of creating one.
    #[must_use]
    pub fn tracker(mut self, tracker: Arc<FragmentTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Validate the configuration and build the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn build(self) -> Result<Dispatcher<T>, ConfigError> {
        let config = self.config;
        config.validate()?;
        let limiter = config.rate_per_second.map(|r| {
            RateLimiter::builder()
                .initial(r)
                .refill(r)
                .interval(Duration::from_secs(1))
                .max(r)
                .build()
        });
        let tracker = self
            .tracker
            .unwrap_or_else(|| Arc::new(FragmentTracker::new(config.max_correlation_id)));
        Ok(Dispatcher {
            transport: self.transport,
            tracker,
            splitter: Splitter::new(config.splitter),
            max_pdu: AtomicU32::new(config.max_pdu_bytes),
            framing: config.framing,
            fragment_timeout: config.fragment_timeout(),
            max_in_flight: config.max_in_flight,
            limiter,
        })
    }
}
