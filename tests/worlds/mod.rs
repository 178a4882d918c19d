//! Cucumber world implementations.

pub mod fragmentation;

pub use fragmentation::FragmentationWorld;
