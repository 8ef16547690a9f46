//! Row-buffer policy tests (§4.5).

use dram_core::controller::{ReqBuffer, RowPolicy};
use dram_core::dram::Level;

use crate::common::{addr_vec, ddr4_device};

#[test]
fn open_policy_never_injects_a_close_row() {
    let device = ddr4_device();
    let mut policy = RowPolicy::Open;
    let mut priority = ReqBuffer::unbounded();
    let rd = device.spec.command_id("RD").unwrap();
    let addr = addr_vec(&device, 0, 0);

    for _ in 0..100 {
        policy.on_issue(&device, rd, &addr, 0, &mut priority).unwrap();
    }
    assert!(priority.requests.is_empty());
}

#[test]
fn closed_policy_injects_close_row_once_the_cap_is_hit() {
    let device = ddr4_device();
    let close_row = device.spec.final_command_for("close-row").unwrap();
    let mut policy = RowPolicy::closed(4, close_row);
    let mut priority = ReqBuffer::unbounded();
    let rd = device.spec.command_id("RD").unwrap();
    let addr = addr_vec(&device, 0, 0);

    for _ in 0..3 {
        policy.on_issue(&device, rd, &addr, 0, &mut priority).unwrap();
    }
    assert!(priority.requests.is_empty());

    policy.on_issue(&device, rd, &addr, 0, &mut priority).unwrap();
    assert_eq!(priority.requests.len(), 1);
    assert_eq!(priority.requests[0].addr_vec, addr);
}

#[test]
fn closed_policy_counter_resets_on_an_explicit_close() {
    let device = ddr4_device();
    let close_row = device.spec.final_command_for("close-row").unwrap();
    let mut policy = RowPolicy::closed(4, close_row);
    let mut priority = ReqBuffer::unbounded();
    let rd = device.spec.command_id("RD").unwrap();
    let pre = device.spec.command_id("PRE").unwrap();
    let addr = addr_vec(&device, 0, 0);

    for _ in 0..3 {
        policy.on_issue(&device, rd, &addr, 0, &mut priority).unwrap();
    }
    policy.on_issue(&device, pre, &addr, 0, &mut priority).unwrap();
    // Counter reset; three more accesses alone shouldn't trip the cap.
    for _ in 0..3 {
        policy.on_issue(&device, rd, &addr, 0, &mut priority).unwrap();
    }
    assert!(priority.requests.is_empty());
}

#[test]
fn closed_policy_resets_every_bank_on_precharge_all() {
    let device = ddr4_device();
    let close_row = device.spec.final_command_for("close-row").unwrap();
    let mut policy = RowPolicy::closed(2, close_row);
    let mut priority = ReqBuffer::unbounded();
    let rd = device.spec.command_id("RD").unwrap();
    let prea = device.spec.command_id("PREA").unwrap();
    let bank0 = addr_vec(&device, 0, 0);
    let bank1 = addr_vec(&device, 1, 0);

    policy.on_issue(&device, rd, &bank0, 0, &mut priority).unwrap();
    policy.on_issue(&device, rd, &bank1, 0, &mut priority).unwrap();
    let wildcard_addr = dram_core::dram::AddrVec::wildcard(device.spec.org.levels.len());
    policy.on_issue(&device, prea, &wildcard_addr, 0, &mut priority).unwrap();

    // One more access to each bank shouldn't trip a cap of 2 since both
    // were reset by PREA.
    policy.on_issue(&device, rd, &bank0, 0, &mut priority).unwrap();
    policy.on_issue(&device, rd, &bank1, 0, &mut priority).unwrap();
    assert!(priority.requests.is_empty());
}

#[test]
fn closed_policy_same_bank_refresh_resets_only_the_addressed_bank() {
    let device = ddr4_device();
    let close_row = device.spec.final_command_for("close-row").unwrap();
    let mut policy = RowPolicy::closed(2, close_row);
    let mut priority = ReqBuffer::unbounded();
    let rd = device.spec.command_id("RD").unwrap();
    let refsb = device.spec.command_id("REFsb").unwrap();
    let bank0 = addr_vec(&device, 0, 0);
    let bank1 = addr_vec(&device, 1, 0);

    policy.on_issue(&device, rd, &bank0, 0, &mut priority).unwrap();
    policy.on_issue(&device, rd, &bank1, 0, &mut priority).unwrap();
    // A same-bank refresh addressed at bank 0 should only reset bank 0's
    // counter, not bank 1's.
    policy.on_issue(&device, refsb, &bank0, 0, &mut priority).unwrap();

    // Bank 0 was reset: one more access doesn't trip the cap of 2.
    policy.on_issue(&device, rd, &bank0, 0, &mut priority).unwrap();
    assert!(priority.requests.is_empty());

    // Bank 1 was untouched: one more access does trip the cap of 2.
    policy.on_issue(&device, rd, &bank1, 0, &mut priority).unwrap();
    assert_eq!(priority.requests.len(), 1);
    assert_eq!(priority.requests[0].addr_vec, bank1);
}

#[test]
fn flatten_bank_index_distinguishes_different_banks() {
    let device = ddr4_device();
    let bank0 = addr_vec(&device, 0, 0);
    let bank1 = addr_vec(&device, 1, 0);
    assert_ne!(
        dram_core::controller::flatten_bank_index(&device, &bank0),
        dram_core::controller::flatten_bank_index(&device, &bank1)
    );
}

#[test]
fn flatten_bank_index_ignores_row_and_column() {
    let device = ddr4_device();
    let row_pos = device.spec.org.levels.iter().position(|l| *l == Level::Row).unwrap();
    let mut a = addr_vec(&device, 0, 5);
    let mut b = addr_vec(&device, 0, 5);
    a.0[row_pos] = 5;
    b.0[row_pos] = 900;
    assert_eq!(
        dram_core::controller::flatten_bank_index(&device, &a),
        dram_core::controller::flatten_bank_index(&device, &b)
    );
}
