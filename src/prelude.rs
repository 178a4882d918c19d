//! Optional convenience imports for common `tagframe` workflows.
//!
//! Prefer importing specialised APIs directly from their owning modules.
//!
//! # Examples
//!
//! ```rust
//! use tagframe::prelude::*;
//!
//! fn plan() -> Result<Vec<Fragment>> {
//!     let tag = Tag::builder(MemoryArea::DataBlock(1), DataType::Byte)
//!         .elements(500)
//!         .build()?;
//!     let request = LogicalRequest::read().tag("buffer", tag).build()?;
//!     let fragments =
//!         Splitter::default().split(&request, &TransportBudget::s7(240), &SequentialIds::default())?;
//!     Ok(fragments)
//! }
//! # assert_eq!(plan().unwrap().len(), 3);
//! ```

pub use crate::{
    budget::{Framing, TransportBudget},
    dispatch::{DispatchError, Dispatcher, FragmentTransport},
    error::{Result, TagframeError},
    fragment::{Fragment, SequentialIds, Splitter},
    request::LogicalRequest,
    response::{FailureReason, FragmentOutcome, ItemResponse, MergedResponse, ResponseCode},
    tag::{DataType, MemoryArea, Tag},
    value::PlcValue,
};
