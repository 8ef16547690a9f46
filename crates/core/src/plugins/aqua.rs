//! AQUA: row-swap defense with a quarantine zone (§4.7.3). Like RRS, but
//! hot rows migrate into a reserved low-row-id quarantine range per bank
//! (round-robin across its `N_q` slots) instead of a uniformly random
//! destination, and the reservation is tracked so the rest of the system
//! treats it as off-limits to ordinary page assignment.

use std::collections::HashMap;

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{AddrVec, Clock, Device};
use crate::error::ConfigError;

use super::{bare_request, is_activate, DeviceTopology};

/// Row-swap RowHammer defense with a dedicated quarantine zone.
#[derive(Debug)]
pub struct Aqua {
    topology: DeviceTopology,
    counters: Vec<HashMap<i64, u64>>,
    threshold: u64,
    quarantine_size: i64,
    next_slot: Vec<i64>,
    read_command: usize,
    write_command: usize,
    next_id: u64,
    swaps: u64,
}

impl Aqua {
    /// Build from a device and its configuration entry. `swap_threshold`
    /// (default 128) is the hot-row count that triggers a migration;
    /// `quarantine_size` (default 64) is the number of reserved rows `N_q`
    /// per bank, at the low end of the row address space.
    pub fn new(device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let topology = DeviceTopology::from_device(device);
        let threshold = cfg.u64_or("swap_threshold", 128);
        let quarantine_size = cfg.u64_or("quarantine_size", 64) as i64;
        let read_command = device.spec.final_command_for("read")?;
        let write_command = device.spec.final_command_for("write")?;
        Ok(Self {
            counters: vec![HashMap::new(); topology.num_banks],
            next_slot: vec![0; topology.num_banks],
            topology,
            threshold,
            quarantine_size,
            read_command,
            write_command,
            next_id: 0,
            swaps: 0,
        })
    }

    fn migrate(&mut self, bank: usize, logical_row: i64, addr_vec: &AddrVec, clk: Clock, ctx: &mut PluginContext<'_>) {
        if ctx.rit.is_full(bank) {
            match ctx.rit.any_evictable(bank) {
                Some(victim) => ctx.rit.remove_entry(bank, victim),
                None => return,
            }
        }
        let dest = self.next_slot[bank];
        self.next_slot[bank] = (dest + 1) % self.quarantine_size.max(1);
        if dest == logical_row {
            return;
        }
        if ctx.rit.insert_entry(bank, logical_row, dest).is_err() {
            return;
        }

        let row_pos = self.topology.row_position();
        self.next_id += 1;
        ctx.injected.push(bare_request(self.next_id, addr_vec.clone(), "aqua-migrate-read", self.read_command, clk, true));
        let mut write_addr = addr_vec.clone();
        write_addr.0[row_pos] = dest;
        self.next_id += 1;
        ctx.injected.push(bare_request(self.next_id, write_addr, "aqua-migrate-write", self.write_command, clk, false));
        self.swaps += 1;
    }
}

impl ControllerPlugin for Aqua {
    fn name(&self) -> &'static str {
        "aqua"
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
        if row < self.quarantine_size {
            // Already in the quarantine zone; not itself a migration target.
            return;
        }
        let count = self.counters[bank].entry(row).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            self.counters[bank].remove(&row);
            let addr_vec = req.addr_vec.clone();
            let clk = ctx.clk;
            self.migrate(bank, row, &addr_vec, clk, ctx);
        }
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        vec![("swaps", self.swaps as f64)]
    }

    fn tick(&mut self, _clk: Clock) {}
}
