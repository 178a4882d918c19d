//! Seam between the dispatcher and the wire.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{fragment::Fragment, response::FragmentOutcome};

/// Sends one fragment and resolves with its outcome.
///
/// Implementations encode the fragment for the wire, await the matching
/// response and decode it into per-item results. Failures are reported as
/// [`FragmentOutcome::Failure`] rather than errors so that they stay scoped
/// to the fragment's tags.
#[async_trait]
pub trait FragmentTransport: Send + Sync {
    async fn send(&self, fragment: &Fragment) -> FragmentOutcome;
}

#[async_trait]
impl<T> FragmentTransport for Arc<T>
where
    T: FragmentTransport + ?Sized,
{
    async fn send(&self, fragment: &Fragment) -> FragmentOutcome { (**self).send(fragment).await }
}
