//! Unit tests for request fragmentation.
//!
//! Tests are split into focused submodules to keep each file short and easy
//! to navigate.

mod budget_property_tests;
mod read_split_tests;

use super::SequentialIds;
use crate::tag::{DataType, MemoryArea, Tag};

pub(super) fn ids() -> SequentialIds { SequentialIds::default() }

pub(super) fn db_tag(data_type: DataType, offset: u32, count: u16) -> Tag {
    Tag::builder(MemoryArea::DataBlock(1), data_type)
        .byte_offset(offset)
        .elements(count)
        .build()
        .expect("valid tag")
}
