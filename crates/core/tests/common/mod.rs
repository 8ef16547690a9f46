//! Shared test infrastructure for the DRAM simulator test suite.
//!
//! Provides small fixture builders so individual unit tests don't each
//! re-derive a `DeviceSpec` or hand-write a trace file: a couple of
//! ready-built devices (DDR4, LPDDR5), a scratch trace-file writer, and a
//! minimal YAML configuration document for end-to-end `MemorySystem` runs.

use std::io::Write as _;

use dram_core::dram::{standards, Device, DeviceSpec, Level};
use dram_core::plugins::DeviceTopology;

/// Build a `DDR4_8Gb_x8 @ 2133` device: bank groups, no pseudo-channel,
/// single-phase `ACT`. The default fixture for most timing-engine tests.
pub fn ddr4_device() -> Device {
    Device::new(ddr4_spec())
}

pub fn ddr4_spec() -> DeviceSpec {
    let (standard, org, speed) = standards::resolve_preset("DDR4_8Gb_x8", "2133").expect("known preset");
    standards::build(standard, org, speed).expect("valid organization")
}

/// Build an `LPDDR5_6Gb_x16 @ 6400` device: two-phase activate and
/// CAS-sync, the standard the rank-level prerequisite walk most exercises.
pub fn lpddr5_device() -> Device {
    let (standard, org, speed) = standards::resolve_preset("LPDDR5_6Gb_x16", "6400").expect("known preset");
    let spec = standards::build(standard, org, speed).expect("valid organization");
    Device::new(spec)
}

/// A fully-specified address vector for `device`'s organization: rank 0,
/// bank group 0 (if present), bank `bank`, row `row`, column 0, with every
/// other dimension pinned to 0.
pub fn addr_vec(device: &Device, bank: i64, row: i64) -> dram_core::dram::AddrVec {
    let mut idx = vec![0i64; device.spec.org.levels.len()];
    for (i, level) in device.spec.org.levels.iter().enumerate() {
        match level {
            Level::Bank => idx[i] = bank,
            Level::Row => idx[i] = row,
            _ => {}
        }
    }
    dram_core::dram::AddrVec(idx)
}

/// Topology helper for a device, for plugin tests that need bank/rank counts.
pub fn topology(device: &Device) -> DeviceTopology {
    DeviceTopology::from_device(device)
}

/// Write `lines` (already newline-free) to a fresh temp file and return
/// its handle; the file is deleted when the handle drops.
pub fn write_trace(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp trace file");
    for line in lines {
        writeln!(file, "{line}").expect("write trace line");
    }
    file.flush().expect("flush temp trace file");
    file
}

/// A minimal `Config`-shaped YAML document: a read-write trace frontend
/// pointed at `trace_path`, single channel, DDR4 2133, open-row policy,
/// default scheduler/refresh, no plugins.
pub fn minimal_yaml(trace_path: &str) -> String {
    format!(
        r#"
frontend:
  impl: read-write-trace
  path: "{trace_path}"
dram:
  organization: DDR4_8Gb_x8
  speed: "2133"
"#
    )
}
