//! Step definitions for behavioural tests.

mod fragmentation_steps;
