//! Tests for read request splitting.

use rstest::rstest;

use super::{db_tag, ids};
use crate::{
    budget::TransportBudget,
    fragment::{CorrelationId, SplitError, Splitter},
    request::LogicalRequest,
    tag::{DataType, MemoryArea, Tag},
};

fn names(fragment: &crate::fragment::Fragment) -> Vec<&str> {
    fragment.items().iter().map(|item| &**item.name()).collect()
}

#[test]
fn twenty_single_bytes_fill_two_fragments() {
    let mut builder = LogicalRequest::read();
    for i in 0..20 {
        builder = builder.tag(format!("t{i}"), db_tag(DataType::Byte, i, 1));
    }
    let request = builder.build().expect("valid request");

    let fragments = Splitter::default()
        .split(&request, &TransportBudget::s7(250), &ids())
        .expect("split");

    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].len(), 19);
    assert_eq!(fragments[1].len(), 1);
    assert_eq!(fragments[0].estimated_request_bytes(), 12 + 19 * 12);
    assert_eq!(names(&fragments[1]), ["t19"]);
}

#[test]
fn large_arrays_travel_in_separate_fragments() {
    let request = LogicalRequest::read()
        .tag("a", db_tag(DataType::Byte, 0, 200))
        .tag("b", db_tag(DataType::Byte, 200, 200))
        .build()
        .expect("valid request");

    let fragments = Splitter::default()
        .split(&request, &TransportBudget::s7(256), &ids())
        .expect("split");

    assert_eq!(fragments.len(), 2);
    for (fragment, name) in fragments.iter().zip(["a", "b"]) {
        assert_eq!(names(fragment), [name]);
        assert_eq!(fragment.items()[0].tag().element_count(), 200);
        assert_eq!(fragment.estimated_response_bytes(), 14 + 204);
    }
}

#[test]
fn oversized_byte_array_is_chunked_in_address_order() {
    let request = LogicalRequest::read()
        .tag("small", db_tag(DataType::Word, 0, 1))
        .tag("big", db_tag(DataType::Byte, 10, 500))
        .tag("tail", db_tag(DataType::Word, 600, 1))
        .build()
        .expect("valid request");

    let fragments = Splitter::default()
        .split(&request, &TransportBudget::s7(240), &ids())
        .expect("split");

    // (240 - 14 - 4) / 1 = 222 elements per chunk.
    let big: Vec<_> = fragments
        .iter()
        .filter(|f| names(f) == ["big"])
        .map(|f| *f.items()[0].tag())
        .collect();
    assert_eq!(big.len(), 3);
    assert_eq!(
        big.iter().map(Tag::element_count).collect::<Vec<_>>(),
        [222, 222, 56]
    );
    assert_eq!(
        big.iter().map(Tag::byte_offset).collect::<Vec<_>>(),
        [10, 232, 454]
    );
    assert_eq!(names(&fragments[0]), ["small"]);
    assert_eq!(names(fragments.last().expect("fragments")), ["tail"]);
    assert!(fragments.iter().all(|f| f.estimated_response_bytes() <= 240));
}

#[test]
fn odd_width_chunks_respect_padding() {
    // 4 + 3 * 77 = 235 pads to 236; with 14 bytes of framing 77 elements
    // would need 250 bytes, so the chunk shrinks by one.
    let tag = Tag::builder(MemoryArea::DataBlock(2), DataType::String)
        .string_length(1)
        .elements(200)
        .build()
        .expect("valid tag");
    let request = LogicalRequest::read()
        .tag("s", tag)
        .build()
        .expect("valid request");

    let fragments = Splitter::default()
        .split(&request, &TransportBudget::s7(249), &ids())
        .expect("split");

    assert_eq!(fragments[0].items()[0].tag().element_count(), 76);
    assert!(fragments.iter().all(|f| f.estimated_response_bytes() <= 249));
    let total: u32 = fragments
        .iter()
        .map(|f| u32::from(f.items()[0].tag().element_count()))
        .sum();
    assert_eq!(total, 200);
}

#[test]
fn bool_arrays_split_on_bit_addresses() {
    let tag = Tag::builder(MemoryArea::Flags, DataType::Bool)
        .byte_offset(4)
        .bit_offset(3)
        .elements(40)
        .build()
        .expect("valid tag");
    let request = LogicalRequest::read()
        .tag("bits", tag)
        .build()
        .expect("valid request");

    // 14 + 4 + 18 = 36 leaves room for 18 one-byte bool elements.
    let fragments = Splitter::default()
        .split(&request, &TransportBudget::s7(36), &ids())
        .expect("split");

    let parts: Vec<_> = fragments.iter().map(|f| *f.items()[0].tag()).collect();
    assert_eq!(parts.len(), 3);
    assert_eq!((parts[1].byte_offset(), parts[1].bit_offset()), (6, 5));
    assert_eq!((parts[2].byte_offset(), parts[2].bit_offset()), (8, 7));
    assert_eq!(parts[2].element_count(), 4);
}

#[rstest]
#[case(23)]
#[case(12)]
fn budget_too_small_for_one_item_is_fatal(#[case] max_pdu: u32) {
    let request = LogicalRequest::read()
        .tag("t", db_tag(DataType::Byte, 0, 1))
        .build()
        .expect("valid request");
    let source = ids();

    let err = Splitter::default()
        .split(&request, &TransportBudget::s7(max_pdu), &source)
        .expect_err("budget too small");

    assert!(matches!(err, SplitError::BudgetTooSmall { .. }));
    assert!(err.is_configuration());
}

#[test]
fn element_wider_than_budget_is_fatal_and_consumes_no_ids() {
    let request = LogicalRequest::read()
        .tag("ok", db_tag(DataType::Byte, 0, 1))
        .tag("wide", db_tag(DataType::LReal, 0, 2))
        .build()
        .expect("valid request");
    let source = ids();

    let err = Splitter::default()
        .split(&request, &TransportBudget::s7(25), &source)
        .expect_err("element exceeds budget");
    assert!(matches!(err, SplitError::ElementExceedsBudget { ref name, .. } if &**name == "wide"));

    let next = crate::fragment::CorrelationSource::allocate(&source).expect("allocate");
    assert_eq!(next.id, CorrelationId::new(1));
}

#[test]
fn correlation_ids_follow_fragment_order() {
    let request = LogicalRequest::read()
        .tag("a", db_tag(DataType::Byte, 0, 200))
        .tag("b", db_tag(DataType::Byte, 200, 200))
        .build()
        .expect("valid request");

    let fragments = Splitter::default()
        .split(&request, &TransportBudget::s7(256), &ids())
        .expect("split");

    let ids: Vec<u16> = fragments.iter().map(|f| f.correlation_id().get()).collect();
    assert_eq!(ids, [1, 2]);
}
