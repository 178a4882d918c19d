//! Dispatcher configuration.
//!
//! [`DispatchConfig`] can be built in code or deserialised from a driver
//! configuration file; every field has a default, so partial documents are
//! accepted. Call [`DispatchConfig::validate`] (the dispatcher builder does)
//! before use.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{budget::Framing, fragment::SplitterConfig, tracker::DEFAULT_MAX_CORRELATION_ID};

/// Smallest PDU an S7 controller negotiates.
pub const DEFAULT_MAX_PDU_BYTES: u32 = 240;
/// Upper bound for the fragment rate limit.
pub const MAX_FRAGMENT_RATE: usize = 10_000;

/// Errors returned by [`DispatchConfig::validate`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The PDU size cannot carry an empty message.
    #[error("max PDU of {0} bytes is smaller than the message framing")]
    PduTooSmall(u32),
    /// Fragments must be given time to resolve.
    #[error("fragment timeout must be positive")]
    ZeroTimeout,
    /// At least one fragment must be allowed in flight.
    #[error("max in-flight fragments must be positive")]
    ZeroInFlight,
    /// The rate limit is zero or above [`MAX_FRAGMENT_RATE`].
    #[error("fragment rate {0} is outside 1..={MAX_FRAGMENT_RATE}")]
    InvalidRate(usize),
    /// Correlation ids start at 1.
    #[error("max correlation id must be positive")]
    ZeroCorrelationRange,
}

/// Settings for a [`Dispatcher`](crate::dispatch::Dispatcher).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// PDU size negotiated at connection time.
    pub max_pdu_bytes: u32,
    /// Protocol framing overheads.
    pub framing: Framing,
    /// Time allowed for one fragment round trip.
    pub fragment_timeout_ms: u64,
    /// Fragments of one request sent concurrently.
    pub max_in_flight: usize,
    /// Optional cap on fragments sent per second.
    pub rate_per_second: Option<usize>,
    /// Largest correlation id before the sequence wraps.
    pub max_correlation_id: u16,
    pub splitter: SplitterConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_pdu_bytes: DEFAULT_MAX_PDU_BYTES,
            framing: Framing::S7,
            fragment_timeout_ms: 4_000,
            max_in_flight: 8,
            rate_per_second: None,
            max_correlation_id: DEFAULT_MAX_CORRELATION_ID,
            splitter: SplitterConfig::default(),
        }
    }
}

impl DispatchConfig {
    /// Fragment timeout as a [`Duration`].
    #[must_use]
    pub fn fragment_timeout(&self) -> Duration { Duration::from_millis(self.fragment_timeout_ms) }

    /// Check the configuration for values the dispatcher cannot honour.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let framing = &self.framing;
        let smallest = framing
            .empty_read_request
            .max(framing.empty_read_response)
            .max(framing.empty_write_request)
            .max(framing.empty_write_response);
        if self.max_pdu_bytes <= smallest {
            return Err(ConfigError::PduTooSmall(self.max_pdu_bytes));
        }
        if self.fragment_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroInFlight);
        }
        if let Some(rate) = self.rate_per_second {
            if rate == 0 || rate > MAX_FRAGMENT_RATE {
                return Err(ConfigError::InvalidRate(rate));
            }
        }
        if self.max_correlation_id == 0 {
            return Err(ConfigError::ZeroCorrelationRange);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_are_valid() { assert_eq!(DispatchConfig::default().validate(), Ok(())); }

    #[rstest]
    #[case(DispatchConfig { max_pdu_bytes: 14, ..DispatchConfig::default() }, ConfigError::PduTooSmall(14))]
    #[case(DispatchConfig { fragment_timeout_ms: 0, ..DispatchConfig::default() }, ConfigError::ZeroTimeout)]
    #[case(DispatchConfig { max_in_flight: 0, ..DispatchConfig::default() }, ConfigError::ZeroInFlight)]
    #[case(DispatchConfig { rate_per_second: Some(0), ..DispatchConfig::default() }, ConfigError::InvalidRate(0))]
    #[case(DispatchConfig { max_correlation_id: 0, ..DispatchConfig::default() }, ConfigError::ZeroCorrelationRange)]
    fn invalid_values_are_rejected(#[case] config: DispatchConfig, #[case] expected: ConfigError) {
        assert_eq!(config.validate(), Err(expected));
    }
}
