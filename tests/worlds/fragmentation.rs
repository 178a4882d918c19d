//! Test world driving fragmentation and reassembly scenarios.

use std::sync::Arc;

use cucumber::World;
use tagframe::{
    DataType,
    Dispatcher,
    FailureReason,
    Fragment,
    FragmentOutcome,
    FragmentTracker,
    LogicalRequest,
    MemoryArea,
    MergedResponse,
    PlcValue,
    RecordStatus,
    RequestKind,
    Tag,
};
use tagframe_testing::{EchoTransport, synthetic_value};

#[derive(Debug)]
struct PlannedTag {
    name: String,
    tag: Tag,
    value: Option<PlcValue>,
}

#[derive(Debug, Default, World)]
pub struct FragmentationWorld {
    max_pdu: u32,
    kind: Option<RequestKind>,
    tags: Vec<PlannedTag>,
    timed_out: Vec<String>,
    sent: Vec<Fragment>,
    response: Option<MergedResponse>,
    tracker: Option<Arc<FragmentTracker>>,
    late: Option<RecordStatus>,
}

impl FragmentationWorld {
    pub fn set_max_pdu(&mut self, max_pdu: u32) { self.max_pdu = max_pdu; }

    fn push(&mut self, kind: RequestKind, name: String, tag: Tag, value: Option<PlcValue>) {
        assert!(
            self.kind.is_none_or(|k| k == kind),
            "scenario mixes reads and writes"
        );
        self.kind = Some(kind);
        self.tags.push(PlannedTag { name, tag, value });
    }

    /// Add `count` adjacent single-byte reads.
    pub fn add_byte_reads(&mut self, count: u32) {
        for offset in 0..count {
            let tag = Tag::builder(MemoryArea::DataBlock(1), DataType::Byte)
                .byte_offset(offset)
                .build()
                .expect("valid tag");
            self.push(RequestKind::Read, format!("byte{offset}"), tag, None);
        }
    }

    /// Add `count` adjacent byte arrays named `array0`, `array1`, ...
    pub fn add_array_reads(&mut self, count: u32, elements: u16) {
        for index in 0..count {
            let tag = Tag::builder(MemoryArea::DataBlock(1), DataType::Byte)
                .byte_offset(index * u32::from(elements))
                .elements(elements)
                .build()
                .expect("valid tag");
            self.push(RequestKind::Read, format!("array{index}"), tag, None);
        }
    }

    /// Add a write of `count` alternating booleans.
    pub fn add_bool_write(&mut self, count: u16) {
        let tag = Tag::builder(MemoryArea::Outputs, DataType::Bool)
            .elements(count)
            .build()
            .expect("valid tag");
        let values = (0..count).map(|i| PlcValue::Bool(i % 2 == 0)).collect();
        self.push(
            RequestKind::Write,
            "switches".to_owned(),
            tag,
            Some(PlcValue::List(values)),
        );
    }

    pub fn time_out(&mut self, name: String) { self.timed_out.push(name); }

    fn request(&self) -> LogicalRequest {
        match self.kind.expect("no tags configured") {
            RequestKind::Read => self
                .tags
                .iter()
                .fold(LogicalRequest::read(), |b, t| b.tag(t.name.as_str(), t.tag))
                .build()
                .expect("valid read"),
            RequestKind::Write => self
                .tags
                .iter()
                .fold(LogicalRequest::write(), |b, t| {
                    b.tag(
                        t.name.as_str(),
                        t.tag,
                        t.value.clone().expect("write value"),
                    )
                })
                .build()
                .expect("valid write"),
        }
    }

    /// Execute the configured request against an echoing transport.
    ///
    /// # Panics
    /// Panics if the dispatcher rejects the request.
    pub async fn execute(&mut self) {
        let timed_out = self.timed_out.clone();
        let transport = Arc::new(EchoTransport::new().fail_when(
            move |fragment| {
                fragment
                    .items()
                    .iter()
                    .any(|item| timed_out.iter().any(|n| **item.name() == **n))
            },
            FailureReason::Timeout,
        ));
        let dispatcher = Dispatcher::builder(Arc::clone(&transport))
            .max_pdu(self.max_pdu)
            .build()
            .expect("dispatcher");
        let response = dispatcher
            .execute(self.request())
            .await
            .expect("execute");
        self.sent = transport.sent();
        self.response = Some(response);
        self.tracker = Some(Arc::clone(dispatcher.tracker()));
    }

    /// Replay an outcome for the first fragment after the request merged.
    pub fn replay_first(&mut self) {
        let tracker = self.tracker.as_ref().expect("request not executed");
        let first = self.sent.first().expect("no fragments sent");
        let status = tracker.record(
            first.correlation_id(),
            FragmentOutcome::Failure(FailureReason::Timeout),
        );
        self.late = Some(status);
    }

    #[must_use]
    pub fn sent_count(&self) -> usize { self.sent.len() }

    #[must_use]
    pub fn response(&self) -> &MergedResponse {
        self.response.as_ref().expect("request not executed")
    }

    /// Check that every successful tag carries the expected value.
    pub fn verify_values(&self) {
        let response = self.response();
        for planned in &self.tags {
            let result = response.get(&planned.name).expect("missing tag");
            if !result.code.is_ok() {
                continue;
            }
            match self.kind {
                Some(RequestKind::Read) => {
                    assert_eq!(result.value, Some(synthetic_value(&planned.tag)));
                }
                _ => assert_eq!(result.value, None),
            }
        }
    }

    #[must_use]
    pub fn late(&self) -> Option<RecordStatus> { self.late }
}
