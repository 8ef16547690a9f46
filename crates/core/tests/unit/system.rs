//! End-to-end `MemorySystem` tests (§5, §8): the lock-step tick loop
//! driven by a real configuration document and trace file.

use dram_core::config::Config;
use dram_core::stats::Stats;
use dram_core::system::MemorySystem;

use crate::common::{minimal_yaml, write_trace};

fn build_system(lines: &[&str]) -> MemorySystem {
    let trace = write_trace(lines);
    // Keep the trace file alive for the system's lifetime by leaking the
    // handle; tests are short-lived processes so this is fine.
    let path = trace.path().display().to_string();
    std::mem::forget(trace);
    let yaml = minimal_yaml(&path);
    let config = Config::from_yaml_str(&yaml, std::path::Path::new(".")).unwrap();
    MemorySystem::new(&config).unwrap()
}

#[test]
fn a_single_read_request_runs_to_completion() {
    let mut system = build_system(&["R 0,0,0,0,0"]);
    system.run().unwrap();

    let stats = system.stats();
    assert_eq!(stats.values.get("requests_admitted"), Some(&1.0));
    assert_eq!(stats.values.get("reads_completed"), Some(&1.0));
}

#[test]
fn reads_and_writes_both_complete_exactly_once() {
    let mut system = build_system(&["R 0,0,0,0,0", "W 0,0,0,1,0", "R 0,0,0,2,0"]);
    system.run().unwrap();

    let stats = system.stats();
    assert_eq!(stats.values.get("requests_admitted"), Some(&3.0));
    assert_eq!(stats.values.get("reads_completed"), Some(&2.0));
    assert_eq!(stats.values.get("writes_completed"), Some(&1.0));
}

#[test]
fn the_clock_advances_past_the_last_request_before_the_run_drains() {
    let mut system = build_system(&["R 0,0,0,0,0"]);
    system.run().unwrap();
    assert!(system.clock() > 0);
}

#[test]
fn an_external_request_bypasses_the_configured_frontend() {
    let mut system = build_system(&[]);
    assert!(system.admit_external(true, 4096));
    system.run().unwrap();

    let stats = system.stats();
    assert_eq!(stats.values.get("requests_admitted"), Some(&1.0));
    assert_eq!(stats.values.get("reads_completed"), Some(&1.0));
}

#[test]
fn the_system_stat_block_nests_one_child_per_controller() {
    let mut system = build_system(&["R 0,0,0,0,0"]);
    system.run().unwrap();

    let stats = system.stats();
    assert_eq!(stats.ifce, "system");
    assert_eq!(stats.children.len(), 1);
    assert_eq!(stats.children[0].ifce, "controller");
}

#[test]
fn an_empty_trace_drains_immediately_with_nothing_admitted() {
    let mut system = build_system(&[]);
    system.run().unwrap();

    let stats = system.stats();
    assert_eq!(stats.values.get("requests_admitted"), Some(&0.0));
}
