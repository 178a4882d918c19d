//! Controller memory areas a [`Tag`](super::Tag) can address.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Memory area of a programmable controller.
///
/// Data blocks carry their block number; the remaining areas are global.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryArea {
    /// Process image of the inputs (`I`).
    Inputs,
    /// Process image of the outputs (`Q`).
    Outputs,
    /// Bit memory (`M`).
    Flags,
    /// Shared data block (`DB<n>`).
    DataBlock(u16),
    /// Instance data block (`DI<n>`).
    InstanceData(u16),
    /// Counter area (`C`).
    Counters,
    /// Timer area (`T`).
    Timers,
    /// Direct peripheral access (`P`).
    Peripheral,
    /// Local data of the running block (`L`).
    Local,
}

impl fmt::Display for MemoryArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inputs => f.write_str("I"),
            Self::Outputs => f.write_str("Q"),
            Self::Flags => f.write_str("M"),
            Self::DataBlock(n) => write!(f, "DB{n}"),
            Self::InstanceData(n) => write!(f, "DI{n}"),
            Self::Counters => f.write_str("C"),
            Self::Timers => f.write_str("T"),
            Self::Peripheral => f.write_str("P"),
            Self::Local => f.write_str("L"),
        }
    }
}
