//! Test doubles for driving a [`Dispatcher`](tagframe::Dispatcher) without
//! a controller.
//!
//! [`EchoTransport`] answers every fragment with values derived from the
//! addresses it reads, so a merged response can be compared against
//! [`synthetic_value`] for the original tag no matter how the request was
//! split. Failures, stalls and delays can be injected per fragment.
//!
//! ```rust
//! use tagframe::{DataType, Dispatcher, LogicalRequest, MemoryArea, Tag};
//! use tagframe_testing::{EchoTransport, synthetic_value};
//!
//! # async fn example() {
//! let tag = Tag::builder(MemoryArea::DataBlock(1), DataType::Byte)
//!     .elements(500)
//!     .build()
//!     .unwrap();
//! let dispatcher = Dispatcher::builder(EchoTransport::new()).build().unwrap();
//! let request = LogicalRequest::read().tag("buf", tag).build().unwrap();
//! let response = dispatcher.execute(request).await.unwrap();
//! assert_eq!(response.value("buf"), Some(&synthetic_value(&tag)));
//! # }
//! ```

pub mod logging;
pub mod synthetic;
pub mod transport;

pub use logging::{LoggerHandle, logger};
pub use synthetic::{synthetic_element, synthetic_value};
pub use transport::EchoTransport;
