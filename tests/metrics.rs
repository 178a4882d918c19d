#![cfg(feature = "metrics")]
//! Tests for `tagframe` metrics helpers.
//!
//! These tests verify that counters update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.
use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;
use tagframe::{
    DataType,
    Dispatcher,
    FailureReason,
    FragmentOutcome,
    FragmentTracker,
    LogicalRequest,
    MemoryArea,
    RequestKind,
    Splitter,
    Tag,
    TransportBudget,
    metrics as tf_metrics,
};
use tagframe_testing::EchoTransport;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn counter_with_label(snapshotter: &Snapshotter, name: &str, label: (&str, &str)) -> u64 {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(k, _, _, _)| {
            k.key().name() == name
                && k.key()
                    .labels()
                    .any(|l| l.key() == label.0 && l.value() == label.1)
        })
        .map(|(_, _, _, v)| match v {
            DebugValue::Counter(c) => c,
            _ => 0,
        })
        .sum()
}

fn assert_counter_eq(snapshotter: &Snapshotter, name: &str, expected: u64) {
    let metrics = snapshotter.snapshot().into_vec();
    assert!(
        metrics.iter().any(|(key, _, _, value)| {
            key.key().name() == name && matches!(value, DebugValue::Counter(c) if *c == expected)
        }),
        "expected {name} == {expected}, got {metrics:#?}"
    );
}

fn byte_read(count: u16) -> LogicalRequest {
    let tag = Tag::builder(MemoryArea::DataBlock(3), DataType::Byte)
        .elements(count)
        .build()
        .expect("valid tag");
    LogicalRequest::read()
        .tag("buffer", tag)
        .build()
        .expect("valid request")
}

#[rstest]
#[case(RequestKind::Read, "read")]
#[case(RequestKind::Write, "write")]
fn dispatched_metric_is_labelled_by_kind(#[case] kind: RequestKind, #[case] label: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        tf_metrics::inc_fragments_dispatched(kind);
    });

    assert_eq!(
        counter_with_label(&snapshotter, tf_metrics::FRAGMENTS_DISPATCHED, ("kind", label)),
        1
    );
}

#[test]
fn failure_metric_is_labelled_by_reason() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        tf_metrics::inc_fragment_failures(&FailureReason::Timeout);
        tf_metrics::inc_fragment_failures(&FailureReason::Transport("reset".into()));
    });

    assert_eq!(
        counter_with_label(&snapshotter, tf_metrics::FRAGMENT_FAILURES, ("reason", "timeout")),
        1
    );
    assert_eq!(
        counter_with_label(&snapshotter, tf_metrics::FRAGMENT_FAILURES, ("reason", "transport")),
        1
    );
}

#[rstest]
#[case(1)]
#[case(3)]
fn cancelled_requests_are_counted(#[case] expected: u64) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        (0..expected).for_each(|_| tf_metrics::inc_requests_cancelled());
    });

    assert_counter_eq(&snapshotter, tf_metrics::REQUESTS_CANCELLED, expected);
}

#[test]
fn tracker_counts_discarded_outcomes() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let tracker = FragmentTracker::default();
        let request = Arc::new(byte_read(500));
        let fragments = Splitter::default()
            .split(&request, &TransportBudget::s7(240), &tracker)
            .expect("split");
        let registration = tracker.register(request, fragments).expect("register");
        let first = registration.fragments[0].correlation_id();

        tracker.record(first, FragmentOutcome::Failure(FailureReason::Timeout));
        tracker.record(first, FragmentOutcome::Failure(FailureReason::Timeout));
        tracker.record(
            tagframe::CorrelationId::new(999),
            FragmentOutcome::Failure(FailureReason::Timeout),
        );
    });

    let discarded = |reason| {
        counter_with_label(
            &snapshotter,
            tf_metrics::OUTCOMES_DISCARDED,
            ("reason", reason),
        )
    };
    assert_eq!(discarded("duplicate"), 1);
    assert_eq!(discarded("unknown"), 1);
    assert_eq!(
        counter_with_label(&snapshotter, tf_metrics::FRAGMENT_FAILURES, ("reason", "timeout")),
        1
    );
}

#[test]
fn dispatcher_records_fragments_and_merges() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(async {
            let dispatcher = Dispatcher::builder(EchoTransport::new())
                .build()
                .expect("dispatcher");
            let response = dispatcher.execute(byte_read(500)).await.expect("execute");
            assert!(response.all_ok());
        });
    });

    assert_eq!(
        counter_with_label(&snapshotter, tf_metrics::FRAGMENTS_DISPATCHED, ("kind", "read")),
        3
    );
    assert_counter_eq(&snapshotter, tf_metrics::REQUESTS_MERGED, 1);
}
