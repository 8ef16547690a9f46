//! Oracle: an omniscient, unbounded-table counter tracker (§4.7.1), reset
//! on every all-bank-refresh boundary rather than a fixed wall-clock
//! period — the idealized upper bound the bounded trackers (Graphene,
//! TWiCe) are compared against.

use std::collections::HashMap;

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{Clock, Device};
use crate::error::ConfigError;

use super::{bare_request, is_activate, DeviceTopology};

/// Unbounded per-bank row-activation counter, reset whenever an
/// all-bank-refresh is observed.
#[derive(Debug)]
pub struct Oracle {
    topology: DeviceTopology,
    tables: Vec<HashMap<i64, u64>>,
    threshold: u64,
    vrr_command: usize,
    next_id: u64,
    injections: u64,
}

impl Oracle {
    /// Build from a device and its configuration entry. `activation_threshold`
    /// (required) is the RowHammer tolerance count.
    pub fn new(device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let topology = DeviceTopology::from_device(device);
        let threshold = cfg.require_u64("activation_threshold")?;
        let vrr_command = device.spec.final_command_for("victim-row-refresh")?;
        Ok(Self {
            tables: vec![HashMap::new(); topology.num_banks],
            topology,
            threshold,
            vrr_command,
            next_id: 0,
            injections: 0,
        })
    }
}

impl ControllerPlugin for Oracle {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn update(&mut self, request_found: bool, req: Option<&mut Request>, ctx: &mut PluginContext<'_>) {
        if !request_found {
            return;
        }
        let Some(req) = req else { return };
        let wk = ctx.device.well_known;
        if Some(req.command) == wk.refab {
            self.tables.iter_mut().for_each(HashMap::clear);
            return;
        }
        if !is_activate(ctx.device, req.command) {
            return;
        }
        let bank = self.topology.flatten_bank(&req.addr_vec);
        let row = self.topology.row_of(&req.addr_vec);
        let count = self.tables[bank].entry(row).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            self.tables[bank].remove(&row);
            self.injections += 1;
            self.next_id += 1;
            ctx.injected.push(bare_request(
                self.next_id,
                req.addr_vec.clone(),
                "oracle-vrr",
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

    fn tick(&mut self, _clk: Clock) {}
}
