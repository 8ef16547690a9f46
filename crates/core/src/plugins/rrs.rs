//! RRS: Randomized Row Swap defense (§4.7.3). Tracks a Graphene-style
//! hot-row counter; when a row crosses the swap threshold, migrates it to
//! a uniformly random destination row in the same bank via a
//! priority read-then-write pair, and records the remap in the shared
//! row-indirection table.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{AddrVec, Clock, Device};
use crate::error::ConfigError;

use super::{bare_request, is_activate, DeviceTopology};

/// Randomized row-swap RowHammer defense.
#[derive(Debug)]
pub struct Rrs {
    topology: DeviceTopology,
    counters: Vec<HashMap<i64, u64>>,
    threshold: u64,
    rows_per_bank: i64,
    rng: StdRng,
    read_command: usize,
    write_command: usize,
    next_id: u64,
    swaps: u64,
}

impl Rrs {
    /// Build from a device and its configuration entry. `swap_threshold`
    /// (default 128) is the hot-row count that triggers a migration;
    /// `seed` (default 7) seeds the destination-row RNG.
    pub fn new(device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let topology = DeviceTopology::from_device(device);
        let threshold = cfg.u64_or("swap_threshold", 128);
        let seed = cfg.u64_or("seed", 7);
        let rows_per_bank = topology.rows_per_bank.unwrap_or(65536);
        let read_command = device.spec.final_command_for("read")?;
        let write_command = device.spec.final_command_for("write")?;
        Ok(Self {
            counters: vec![HashMap::new(); topology.num_banks],
            topology,
            threshold,
            rows_per_bank,
            rng: StdRng::seed_from_u64(seed),
            read_command,
            write_command,
            next_id: 0,
            swaps: 0,
        })
    }

    /// Choose a random destination row distinct from `logical_row` and
    /// migrate it, unless the bank's RIT is full and has no evictable
    /// victim (in which case the migration is skipped this cycle).
    fn migrate(&mut self, bank: usize, logical_row: i64, addr_vec: &AddrVec, clk: Clock, ctx: &mut PluginContext<'_>) {
        if ctx.rit.is_full(bank) {
            match ctx.rit.any_evictable(bank) {
                Some(victim) => ctx.rit.remove_entry(bank, victim),
                None => return,
            }
        }
        let dest = self.rng.gen_range(0..self.rows_per_bank.max(1));
        if dest == logical_row {
            return;
        }
        if ctx.rit.insert_entry(bank, logical_row, dest).is_err() {
            return;
        }

        let row_pos = self.topology.row_position();
        self.next_id += 1;
        ctx.injected.push(bare_request(self.next_id, addr_vec.clone(), "rrs-migrate-read", self.read_command, clk, true));
        let mut write_addr = addr_vec.clone();
        write_addr.0[row_pos] = dest;
        self.next_id += 1;
        ctx.injected.push(bare_request(self.next_id, write_addr, "rrs-migrate-write", self.write_command, clk, false));
        self.swaps += 1;
    }
}

impl ControllerPlugin for Rrs {
    fn name(&self) -> &'static str {
        "rrs"
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
