//! In-memory [`FragmentTransport`] with fault injection.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tagframe::{
    FailureReason,
    Fragment,
    FragmentOutcome,
    FragmentTransport,
    ItemResponse,
    RequestKind,
    ResponseCode,
};

use crate::synthetic_value;

type Predicate = Box<dyn Fn(&Fragment) -> bool + Send + Sync>;

enum Fault {
    Fail(FailureReason),
    Stall,
}

/// Transport answering reads with [`synthetic_value`]s and acknowledging
/// writes.
///
/// Fault rules are checked in the order they were added; the first match
/// decides the fragment's fate.
#[derive(Default)]
pub struct EchoTransport {
    delay: Option<Duration>,
    faults: Vec<(Predicate, Fault)>,
    rejected: HashMap<String, ResponseCode>,
    sent: Mutex<Vec<Fragment>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: AtomicUsize,
}

impl EchoTransport {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Wait `delay` before answering each fragment.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail fragments matching `predicate` with `reason`.
    #[must_use]
    pub fn fail_when<F>(mut self, predicate: F, reason: FailureReason) -> Self
    where
        F: Fn(&Fragment) -> bool + Send + Sync + 'static,
    {
        self.faults.push((Box::new(predicate), Fault::Fail(reason)));
        self
    }

    /// Never answer fragments matching `predicate`.
    #[must_use]
    pub fn stall_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Fragment) -> bool + Send + Sync + 'static,
    {
        self.faults.push((Box::new(predicate), Fault::Stall));
        self
    }

    /// Answer every item of the tag called `name` with `code`.
    #[must_use]
    pub fn reject_tag(mut self, name: &str, code: ResponseCode) -> Self {
        self.rejected.insert(name.to_owned(), code);
        self
    }

    /// Fragments received so far, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if a sender panicked while recording a fragment.
    #[must_use]
    pub fn sent(&self) -> Vec<Fragment> { self.sent.lock().expect("sent log poisoned").clone() }

    /// Largest number of fragments awaiting an answer at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize { self.peak_in_flight.load(Ordering::SeqCst) }

    fn answer(&self, fragment: &Fragment) -> FragmentOutcome {
        let items = fragment
            .items()
            .iter()
            .map(|item| {
                if let Some(code) = self.rejected.get(&**item.name()) {
                    return ItemResponse::failed(*code);
                }
                match fragment.kind() {
                    RequestKind::Read => ItemResponse::ok(synthetic_value(item.tag())),
                    RequestKind::Write => ItemResponse::written(),
                }
            })
            .collect();
        FragmentOutcome::Success(items)
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

#[async_trait]
impl FragmentTransport for EchoTransport {
    async fn send(&self, fragment: &Fragment) -> FragmentOutcome {
        self.sent
            .lock()
            .expect("sent log poisoned")
            .push(fragment.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(Arc::clone(&self.in_flight));
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.faults.iter().find(|(predicate, _)| predicate(fragment)) {
            Some((_, Fault::Fail(reason))) => FragmentOutcome::Failure(reason.clone()),
            Some((_, Fault::Stall)) => std::future::pending().await,
            None => self.answer(fragment),
        }
    }
}
