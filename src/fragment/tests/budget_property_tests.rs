//! Generated checks that fragments respect the budget and cover every
//! requested element exactly once.

use std::collections::HashMap;

use proptest::{
    collection::vec,
    prelude::{Strategy, prop_oneof, Just},
    prop_assert,
    prop_assert_eq,
    test_runner::{Config as ProptestConfig, RngAlgorithm, TestCaseError, TestRng, TestRunner},
};
use rstest::rstest;

use super::{db_tag, ids};
use crate::{
    budget::TransportBudget,
    fragment::Splitter,
    request::{LogicalRequest, RequestKind},
    tag::DataType,
    value::PlcValue,
};

fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

fn data_type_strategy() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::Bool),
        Just(DataType::Byte),
        Just(DataType::Int),
        Just(DataType::Real),
        Just(DataType::LReal),
    ]
}

fn tags_strategy() -> impl Strategy<Value = Vec<(DataType, u16)>> {
    vec((data_type_strategy(), 1u16..400), 1..24)
}

fn scalar_for(data_type: DataType) -> PlcValue {
    match data_type {
        DataType::Bool => PlcValue::Bool(true),
        DataType::Byte => PlcValue::Byte(1),
        DataType::Int => PlcValue::Int(1),
        DataType::Real => PlcValue::Real(1.0),
        _ => PlcValue::LReal(1.0),
    }
}

fn build(kind: RequestKind, tags: &[(DataType, u16)]) -> LogicalRequest {
    match kind {
        RequestKind::Read => tags
            .iter()
            .enumerate()
            .fold(LogicalRequest::read(), |b, (i, (ty, n))| {
                b.tag(format!("t{i}"), db_tag(*ty, 0, *n))
            })
            .build(),
        RequestKind::Write => tags
            .iter()
            .enumerate()
            .fold(LogicalRequest::write(), |b, (i, (ty, n))| {
                let value = if *n == 1 {
                    scalar_for(*ty)
                } else {
                    PlcValue::List(vec![scalar_for(*ty); usize::from(*n)])
                };
                b.tag(format!("t{i}"), db_tag(*ty, 0, *n), value)
            })
            .build(),
    }
    .expect("generated request is valid")
}

#[rstest]
#[case(RequestKind::Read, 96)]
#[case(RequestKind::Write, 48)]
fn fragments_fit_budget_and_cover_every_element(#[case] kind: RequestKind, #[case] cases: u32) {
    let mut runner = deterministic_runner(cases);
    let strategy = (tags_strategy(), 40u32..1000);

    runner
        .run(&strategy, |(tags, max_pdu)| {
            let request = build(kind, &tags);
            let budget = TransportBudget::s7(max_pdu);
            let fragments = Splitter::default()
                .split(&request, &budget, &ids())
                .map_err(|err| TestCaseError::fail(format!("split failed: {err}")))?;

            let mut covered: HashMap<&str, u32> = HashMap::new();
            let mut next_element: HashMap<&str, u16> = HashMap::new();
            for fragment in &fragments {
                prop_assert!(fragment.estimated_request_bytes() <= max_pdu);
                prop_assert!(fragment.estimated_response_bytes() <= max_pdu);
                prop_assert!(!fragment.is_empty());
                for item in fragment.items() {
                    let original = request.entry(item.name()).expect("known name").tag();
                    let index = original
                        .element_index_of(item.tag())
                        .ok_or_else(|| TestCaseError::fail("piece outside its tag"))?;
                    let expected = next_element.entry(&**item.name()).or_default();
                    prop_assert_eq!(index, *expected);
                    *expected += item.tag().element_count();
                    *covered.entry(&**item.name()).or_default() +=
                        u32::from(item.tag().element_count());
                }
            }
            for entry in request.entries() {
                prop_assert_eq!(
                    covered.get(&**entry.name()).copied(),
                    Some(u32::from(entry.tag().element_count()))
                );
            }
            Ok(())
        })
        .expect("fragments respect the budget and cover every element");
}
