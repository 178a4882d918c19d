//! Budget-bounded request fragmentation.
//!
//! The [`Splitter`] turns one [`LogicalRequest`](crate::request::LogicalRequest)
//! into [`Fragment`]s whose estimated request and response sizes both fit a
//! [`TransportBudget`](crate::budget::TransportBudget). Each fragment carries
//! a [`CorrelationId`] drawn from a [`CorrelationSource`] once planning has
//! succeeded.

pub mod error;
pub mod id;
pub mod item;
pub mod splitter;

pub use error::SplitError;
pub use id::{
    Allocation,
    CorrelationExhausted,
    CorrelationId,
    CorrelationSource,
    RequestId,
    SequentialIds,
};
pub use item::{Fragment, FragmentItem};
pub use splitter::{Splitter, SplitterConfig};

#[cfg(test)]
mod tests;
