//! Steps for fragmentation behavioural tests.
use cucumber::{given, then, when};
use tagframe::RecordStatus;

use crate::worlds::FragmentationWorld;

#[given(expr = "a PDU budget of {int} bytes")]
fn given_budget(world: &mut FragmentationWorld, max_pdu: u32) { world.set_max_pdu(max_pdu); }

#[given(expr = "{int} single-byte read tags")]
fn given_byte_reads(world: &mut FragmentationWorld, count: u32) { world.add_byte_reads(count); }

#[given(expr = "{int} byte arrays of {int} elements to read")]
fn given_arrays(world: &mut FragmentationWorld, count: u32, elements: u16) {
    world.add_array_reads(count, elements);
}

#[given(expr = "a write of {int} booleans")]
fn given_bool_write(world: &mut FragmentationWorld, count: u16) { world.add_bool_write(count); }

#[given(expr = "fragments carrying {string} time out")]
fn given_timeout(world: &mut FragmentationWorld, name: String) { world.time_out(name); }

#[when("the request is executed")]
async fn when_executed(world: &mut FragmentationWorld) { world.execute().await; }

#[when("a late outcome arrives for the first fragment")]
fn when_late(world: &mut FragmentationWorld) { world.replay_first(); }

#[then(expr = "{int} fragments are sent")]
fn then_sent(world: &mut FragmentationWorld, count: usize) {
    assert_eq!(world.sent_count(), count);
}

#[then("every tag result is OK")]
fn then_all_ok(world: &mut FragmentationWorld) {
    assert!(world.response().all_ok(), "{:?}", world.response());
    world.verify_values();
}

#[then(expr = "tag {string} reports {word}")]
fn then_code(world: &mut FragmentationWorld, name: String, code: String) {
    let actual = world.response().code(&name).expect("missing tag");
    assert!(
        actual.to_string().eq_ignore_ascii_case(&code),
        "expected {code}, got {actual}"
    );
}

#[then(expr = "{int} tag results are OK")]
fn then_ok_count(world: &mut FragmentationWorld, count: usize) {
    let ok = world.response().iter().filter(|(_, r)| r.code.is_ok()).count();
    assert_eq!(ok, count);
    world.verify_values();
}

#[then("the late outcome is discarded")]
fn then_discarded(world: &mut FragmentationWorld) {
    assert_eq!(world.late(), Some(RecordStatus::Unknown));
}
