//! Graphene-style counter-based row tracker (§4.7.1): a bounded
//! per-bank map from row id to activation count, with spillover eviction
//! when the table is full, and a periodic wall-clock reset.

use std::collections::HashMap;

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{Clock, Device};
use crate::error::ConfigError;

use super::{bare_request, is_activate, DeviceTopology};

/// Per-bank bounded row-activation counter table with spillover eviction,
/// shared by [`super::twice::Twice`] and [`super::oracle::Oracle`], which
/// layer their own trigger/reset policy on top of the same table shape.
#[derive(Debug, Clone)]
pub(crate) struct RowCounterTable {
    tables: Vec<HashMap<i64, u64>>,
    spillover: Vec<u64>,
    capacity: usize,
}

impl RowCounterTable {
    pub(crate) fn new(num_banks: usize, capacity: usize) -> Self {
        Self {
            tables: vec![HashMap::new(); num_banks],
            spillover: vec![0; num_banks],
            capacity,
        }
    }

    /// Record one activation of `row` in `bank`; returns the row's count
    /// after this activation.
    pub(crate) fn observe(&mut self, bank: usize, row: i64) -> u64 {
        let table = &mut self.tables[bank];
        if let Some(count) = table.get_mut(&row) {
            *count += 1;
            return *count;
        }
        if table.len() < self.capacity {
            let _ = table.insert(row, 1);
            return 1;
        }
        let spill = self.spillover[bank];
        if let Some(victim) = table.iter().find(|(_, c)| **c == spill).map(|(r, _)| *r) {
            let _ = table.remove(&victim);
        } else {
            self.spillover[bank] += 1;
        }
        let count = self.spillover[bank] + 1;
        let _ = table.insert(row, count);
        count
    }

    /// Reset a single row's count to the bank's current spillover baseline
    /// after it has been refreshed, keeping it tracked rather than evicting
    /// it back to the "new row" insert path.
    pub(crate) fn reset_to_spillover(&mut self, bank: usize, row: i64) {
        let spill = self.spillover[bank];
        let _ = self.tables[bank].insert(row, spill);
    }

    /// Clear every table and spillover counter (a reset-period boundary).
    pub(crate) fn reset_all(&mut self) {
        for table in &mut self.tables {
            table.clear();
        }
        self.spillover.iter_mut().for_each(|s| *s = 0);
    }

    pub(crate) fn len(&self) -> usize {
        self.tables.iter().map(HashMap::len).sum()
    }
}

/// Graphene tracker: fixed activation threshold, reset on a configured
/// wall-clock cycle period.
#[derive(Debug)]
pub struct Graphene {
    topology: DeviceTopology,
    table: RowCounterTable,
    threshold: u64,
    reset_interval: Clock,
    last_reset: Clock,
    vrr_command: usize,
    next_id: u64,
    injections: u64,
}

impl Graphene {
    /// Build from a device and its configuration entry. Reads
    /// `activation_threshold` (required), `capacity_per_bank` (default 8),
    /// and `reset_interval_cycles` (default ~64ms-equivalent at a 2GHz
    /// memory clock).
    pub fn new(device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let topology = DeviceTopology::from_device(device);
        let threshold = cfg.require_u64("activation_threshold")?;
        let capacity_per_bank = cfg.u64_or("capacity_per_bank", 8) as usize;
        let reset_interval = cfg.u64_or("reset_interval_cycles", 128_000_000) as Clock;
        let vrr_command = device.spec.final_command_for("victim-row-refresh")?;
        Ok(Self {
            table: RowCounterTable::new(topology.num_banks, capacity_per_bank),
            topology,
            threshold,
            reset_interval,
            last_reset: 0,
            vrr_command,
            next_id: 0,
            injections: 0,
        })
    }

    fn next_request(&mut self, addr_vec: crate::dram::AddrVec, clk: Clock) -> Request {
        self.next_id += 1;
        bare_request(self.next_id, addr_vec, "graphene-vrr", self.vrr_command, clk, false)
    }
}

impl ControllerPlugin for Graphene {
    fn name(&self) -> &'static str {
        "graphene"
    }

    fn tick(&mut self, clk: Clock) {
        if clk - self.last_reset >= self.reset_interval {
            self.table.reset_all();
            self.last_reset = clk;
        }
    }

    fn update(&mut self, request_found: bool, req: Option<&mut Request>, ctx: &mut PluginContext<'_>) {
        if !request_found {
            return;
        }
        let Some(req) = req else { return };
        if !is_activate(ctx.device, req.command) {
            return;
        }
        let bank = self.topology.flatten_bank(&req.addr_vec);
        let row = self.topology.row_of(&req.addr_vec);
        let count = self.table.observe(bank, row);
        if count >= self.threshold {
            self.table.reset_to_spillover(bank, row);
            self.injections += 1;
            ctx.injected.push(self.next_request(req.addr_vec.clone(), ctx.clk));
        }
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        vec![("tracked_rows", self.table.len() as f64), ("vrr_injections", self.injections as f64)]
    }
}
