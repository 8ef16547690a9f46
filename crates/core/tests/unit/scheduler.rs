//! Scheduler variant tests (§4.3): comparator ordering and the
//! active-buffer collision rule.

use dram_core::controller::{collides_with_active, PluginChain, ReqBuffer, Request, Scheduler};
use dram_core::dram::AddrVec;

use crate::common::{addr_vec, ddr4_device};

fn push_read(buffer: &mut ReqBuffer, device: &dram_core::dram::Device, bank: i64, row: i64, arrive: i64, source: i64) {
    let final_rd = device.spec.command_id("RD").unwrap();
    let addr = addr_vec(device, bank, row);
    let mut req = Request::new(buffer.requests.len() as u64, addr, "read".to_string(), final_rd, source, arrive, true);
    req.command = final_rd;
    buffer.requests.push(req);
}

#[test]
fn default_scheduler_prefers_ready_over_not_ready() {
    let device = ddr4_device();
    let mut buffer = ReqBuffer::unbounded();
    let active = ReqBuffer::unbounded();
    let plugins = PluginChain::new();

    // Bank 0 is untouched (ACT needed = not ready this cycle); bank 1 gets
    // opened first so its read is immediately ready.
    let mut device = device;
    let act = device.spec.command_id("ACT").unwrap();
    let bank1 = addr_vec(&device, 1, 0);
    device.issue_command(act, &bank1, 0).unwrap();

    push_read(&mut buffer, &device, 0, 0, 0, 1);
    push_read(&mut buffer, &device, 1, 0, 1, 2);

    let selection = Scheduler::Default.select(&mut buffer, &device, 100, &plugins, &active).unwrap();
    assert_eq!(buffer.requests[selection.index].source_id, 2);
}

#[test]
fn default_scheduler_breaks_ties_by_arrival_order() {
    let device = ddr4_device();
    let mut buffer = ReqBuffer::unbounded();
    let active = ReqBuffer::unbounded();
    let plugins = PluginChain::new();

    // Neither bank is open: both candidates need ACT, so both are
    // equally "not ready" and FCFS decides.
    push_read(&mut buffer, &device, 0, 0, 5, 1);
    push_read(&mut buffer, &device, 1, 0, 2, 2);

    let selection = Scheduler::Default.select(&mut buffer, &device, 0, &plugins, &active).unwrap();
    assert_eq!(buffer.requests[selection.index].source_id, 2);
}

#[test]
fn bliss_scheduler_deprioritizes_a_blacklisted_source() {
    let device = ddr4_device();
    let mut buffer = ReqBuffer::unbounded();
    let active = ReqBuffer::unbounded();
    let mut plugins = PluginChain::new();
    plugins.register(Box::new(
        dram_core::plugins::Bliss::new(
            &device,
            &dram_core::config::PluginConfig { r#impl: "bliss".to_string(), params: std::collections::HashMap::new() },
        )
        .unwrap(),
    ));

    push_read(&mut buffer, &device, 0, 0, 0, 1);
    push_read(&mut buffer, &device, 1, 0, 10, 2);

    // Source 1 streaks past the default threshold (4): blacklist it by
    // hand-driving several `update` calls with the same source id first.
    let mut dummy = ReqBuffer::unbounded();
    push_read(&mut dummy, &device, 0, 0, 0, 1);
    let mut rit = dram_core::mapper::RowIndirectionTable::new(8, 4);
    for _ in 0..6 {
        plugins.update_all(true, Some(&mut dummy.requests[0]), &device, 0, &mut Vec::new(), &mut rit);
    }
    assert!(plugins.is_blacklisted(1));

    let selection = Scheduler::Bliss.select(&mut buffer, &device, 0, &plugins, &active).unwrap();
    assert_eq!(buffer.requests[selection.index].source_id, 2);
}

#[test]
fn closing_command_is_rejected_while_active_buffer_holds_the_same_bank() {
    let device = ddr4_device();
    let candidate = addr_vec(&device, 0, 0);

    let mut active = ReqBuffer::unbounded();
    let act = device.spec.command_id("ACT").unwrap();
    let mut pending = Request::new(0, addr_vec(&device, 0, 1), "read".to_string(), act, -1, 0, true);
    pending.command = act;
    active.requests.push(pending);

    // Scope len = channel+rank+bankgroup+bank (everything up to, and
    // including, Bank) for a bank-scoped command like PRE.
    let scope_len = device.spec.org.levels.iter().position(|l| *l == dram_core::dram::Level::Bank).unwrap() + 1;
    assert!(collides_with_active(&active, &candidate, scope_len));
}

#[test]
fn closing_command_is_allowed_once_the_active_entry_is_a_different_bank() {
    let device = ddr4_device();
    let candidate = addr_vec(&device, 0, 0);

    let mut active = ReqBuffer::unbounded();
    let act = device.spec.command_id("ACT").unwrap();
    let mut pending = Request::new(0, addr_vec(&device, 3, 1), "read".to_string(), act, -1, 0, true);
    pending.command = act;
    active.requests.push(pending);

    let scope_len = device.spec.org.levels.iter().position(|l| *l == dram_core::dram::Level::Bank).unwrap() + 1;
    assert!(!collides_with_active(&active, &candidate, scope_len));
}

#[test]
fn wildcards_in_the_active_buffer_count_as_a_match() {
    let device = ddr4_device();
    let candidate = addr_vec(&device, 0, 0);
    let addr_len = device.spec.org.levels.len();

    let mut active = ReqBuffer::unbounded();
    let prea = device.spec.command_id("PREA").unwrap();
    let mut pending = Request::new(0, AddrVec::wildcard(addr_len), "refresh".to_string(), prea, -1, 0, false);
    pending.command = prea;
    active.requests.push(pending);

    let scope_len = device.spec.org.levels.iter().position(|l| *l == dram_core::dram::Level::Rank).unwrap() + 1;
    assert!(collides_with_active(&active, &candidate, scope_len));
}
