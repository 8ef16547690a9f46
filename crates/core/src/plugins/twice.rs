//! TWiCe: Graphene's counter table plus a pruned `life` counter per entry
//! (§4.7.1). At each refresh-boundary tick, entries whose
//! `act / life` ratio falls under a pruning threshold are discarded,
//! bounding the table to rows that are actually trending hot.

use std::collections::HashMap;

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{Clock, Device};
use crate::error::ConfigError;

use super::{bare_request, is_activate, DeviceTopology};

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    act: u64,
    life: u64,
}

/// TWiCe tracker: per-bank bounded row table with `act`/`life` pruning at
/// each refresh-interval boundary.
#[derive(Debug)]
pub struct Twice {
    topology: DeviceTopology,
    tables: Vec<HashMap<i64, Entry>>,
    threshold: u64,
    prune_ratio: f64,
    refresh_interval: Clock,
    last_tick: Clock,
    vrr_command: usize,
    next_id: u64,
    injections: u64,
}

impl Twice {
    /// Build from a device and its configuration entry. `activation_threshold`
    /// (required) trips the victim-row-refresh; `prune_ratio` (default
    /// 1/8) discards entries whose `act/life` falls below it;
    /// `refresh_interval_cycles` (default ~64ms-equivalent) is how often
    /// pruning runs.
    pub fn new(device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let topology = DeviceTopology::from_device(device);
        let threshold = cfg.require_u64("activation_threshold")?;
        let prune_ratio = cfg.f64_or("prune_ratio", 0.125);
        let refresh_interval = cfg.u64_or("refresh_interval_cycles", 128_000_000) as Clock;
        let vrr_command = device.spec.final_command_for("victim-row-refresh")?;
        Ok(Self {
            tables: vec![HashMap::new(); topology.num_banks],
            topology,
            threshold,
            prune_ratio,
            refresh_interval,
            last_tick: 0,
            vrr_command,
            next_id: 0,
            injections: 0,
        })
    }
}

impl ControllerPlugin for Twice {
    fn name(&self) -> &'static str {
        "twice"
    }

    fn tick(&mut self, clk: Clock) {
        for table in &mut self.tables {
            table.values_mut().for_each(|e| e.life += 1);
        }
        if clk - self.last_tick >= self.refresh_interval {
            let ratio = self.prune_ratio;
            for table in &mut self.tables {
                table.retain(|_, e| (e.act as f64) / (e.life.max(1) as f64) >= ratio);
            }
            self.last_tick = clk;
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
        let entry = self.tables[bank].entry(row).or_insert(Entry { act: 0, life: 1 });
        entry.act += 1;
        if entry.act >= self.threshold {
            let _ = self.tables[bank].remove(&row);
            self.injections += 1;
            self.next_id += 1;
            ctx.injected.push(bare_request(
                self.next_id,
                req.addr_vec.clone(),
                "twice-vrr",
                self.vrr_command,
                ctx.clk,
                false,
            ));
        }
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        let tracked: usize = self.tables.iter().map(HashMap::len).sum();
        vec![("tracked_rows", tracked as f64), ("vrr_injections", self.injections as f64)]
    }
}
