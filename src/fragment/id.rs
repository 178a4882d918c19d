//! Identifiers tying fragments to their round trips and parent requests.

use std::sync::atomic::{AtomicU64, Ordering};

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire-level identifier of one fragment round trip.
///
/// The S7 TPDU reference is 16 bits wide, so identifiers are reused once
/// the id space has been cycled through.
///
/// # Examples
///
/// ```
/// use tagframe::fragment::CorrelationId;
/// let id = CorrelationId::new(42);
/// assert_eq!(id.get(), 42);
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize,
    Deserialize,
)]
#[display("{_0}")]
pub struct CorrelationId(u16);

impl CorrelationId {
    #[must_use]
    pub const fn new(value: u16) -> Self { Self(value) }

    #[must_use]
    pub const fn get(self) -> u16 { self.0 }
}

/// Identity of a logical request registered with a tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct RequestId(u64);

impl RequestId {
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

/// A freshly allocated correlation id and the pass through the id space it
/// was drawn in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub id: CorrelationId,
    pub cycle: u64,
}

/// The correlation id space wrapped while identifiers were still in use.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("correlation id {id} cannot be reused in cycle {cycle}: earlier fragments are outstanding")]
pub struct CorrelationExhausted {
    pub id: CorrelationId,
    pub cycle: u64,
}

/// Source of correlation ids for new fragments.
pub trait CorrelationSource {
    /// Allocate the next identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationExhausted`] when no identifier can be handed out
    /// without colliding with one still in flight.
    fn allocate(&self) -> Result<Allocation, CorrelationExhausted>;
}

/// Untracked sequential ids in `1..=max`, wrapping without checks.
///
/// Suitable for planning and tests; sessions should allocate through a
/// [`FragmentTracker`](crate::tracker::FragmentTracker), which knows which
/// ids are outstanding.
#[derive(Debug)]
pub struct SequentialIds {
    max: u16,
    next: AtomicU64,
}

impl SequentialIds {
    /// Create a source handing out `1..=max`, starting at 1.
    #[must_use]
    pub const fn new(max: u16) -> Self {
        Self {
            max: if max == 0 { 1 } else { max },
            next: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self { Self::new(u16::MAX - 1) }
}

impl CorrelationSource for SequentialIds {
    fn allocate(&self) -> Result<Allocation, CorrelationExhausted> {
        Ok(allocation_for(self.next.fetch_add(1, Ordering::Relaxed), self.max))
    }
}

/// Map a position in the 64-bit sequence onto the wire id range `1..=max`.
pub(crate) fn allocation_for(seq: u64, max: u16) -> Allocation {
    let span = u64::from(max);
    #[expect(clippy::cast_possible_truncation, reason = "remainder is below u16::MAX")]
    let id = CorrelationId::new((seq % span) as u16 + 1);
    Allocation {
        id,
        cycle: seq / span,
    }
}
