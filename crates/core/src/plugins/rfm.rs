//! Periodic RFM issuer (§4.7.5's "Future variants"): issues an
//! all-bank `RFMab` per rank on a fixed cadence, independent of PRAC's
//! alert-driven bursts — the baseline refresh-management policy some
//! standards require regardless of whether any row is known to be hot.

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{AddrVec, Clock, Device};
use crate::error::ConfigError;

use super::DeviceTopology;

/// Fixed-cadence `RFMab` issuer, one request per rank per interval.
#[derive(Debug)]
pub struct Rfm {
    topology: DeviceTopology,
    interval: Clock,
    next_due: Clock,
    rfmab_command: usize,
    addr_len: usize,
    rank_pos: usize,
    next_id: u64,
    total_issued: u64,
}

impl Rfm {
    /// Build from a device and its configuration entry. `interval_cycles`
    /// (required) is the cadence between successive `RFMab` rounds.
    pub fn new(device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let topology = DeviceTopology::from_device(device);
        let interval = cfg.require_u64("interval_cycles")? as Clock;
        let rfmab_command = device.spec.final_command_for("rfm")?;
        let rank_pos = device
            .spec
            .org
            .levels
            .iter()
            .position(|l| *l == crate::dram::Level::Rank)
            .unwrap_or(0);
        Ok(Self {
            topology,
            interval,
            next_due: interval,
            rfmab_command,
            addr_len: device.spec.org.levels.len(),
            rank_pos,
            next_id: 0,
            total_issued: 0,
        })
    }
}

impl ControllerPlugin for Rfm {
    fn name(&self) -> &'static str {
        "rfm"
    }

    fn tick(&mut self, clk: Clock) {
        let _ = clk;
    }

    fn update(&mut self, _request_found: bool, _req: Option<&mut Request>, ctx: &mut PluginContext<'_>) {
        if ctx.clk < self.next_due {
            return;
        }
        for rank in 0..self.topology.num_ranks.max(1) {
            let mut addr_vec = AddrVec::wildcard(self.addr_len);
            addr_vec.0[self.rank_pos] = rank as i64;
            self.next_id += 1;
            ctx.injected.push(super::bare_request(
                self.next_id,
                addr_vec,
                "rfm-periodic",
                self.rfmab_command,
                ctx.clk,
                false,
            ));
            self.total_issued += 1;
        }
        self.next_due += self.interval;
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        vec![("total_issued", self.total_issued as f64)]
    }
}
