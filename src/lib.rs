#![doc(html_root_url = "https://docs.rs/tagframe/latest")]
//! Public API for the `tagframe` library.
//!
//! This crate splits batch read and write requests for programmable
//! controllers into fragments that fit a negotiated PDU size, tracks the
//! fragments while they are in flight, and merges their outcomes back into
//! one response in request order.

pub mod budget;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod estimate;
pub mod fragment;
pub mod merge;
pub mod metrics;
pub mod prelude;
pub mod request;
pub mod response;
pub mod tag;
pub mod tracker;
pub mod value;

pub use budget::{Framing, TransportBudget};
pub use config::{ConfigError, DispatchConfig};
pub use dispatch::{DispatchError, Dispatcher, DispatcherBuilder, FragmentTransport};
pub use error::{Result, TagframeError};
pub use estimate::SizeEstimator;
pub use fragment::{
    CorrelationId,
    CorrelationSource,
    Fragment,
    FragmentItem,
    RequestId,
    SequentialIds,
    SplitError,
    Splitter,
    SplitterConfig,
};
pub use merge::{ResolvedFragment, merge};
pub use request::{LogicalRequest, RequestEntry, RequestError, RequestKind};
pub use response::{
    FailureReason,
    FragmentOutcome,
    ItemResponse,
    MergedResponse,
    ResponseCode,
    TagResult,
};
pub use tag::{DataType, MemoryArea, Tag, TagError};
pub use tracker::{FragmentTracker, RecordStatus, Registration, TrackerError};
pub use value::PlcValue;
