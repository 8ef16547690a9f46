//! BLISS scheduling hint (§4.7.5): blacklists a source id that issues
//! `blacklist_thresh` consecutive commands without another source
//! interleaving, and un-blacklists everyone every `unblacklist_cycles`.

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{Clock, Device};
use crate::error::ConfigError;

/// Consecutive-streak-based scheduling blacklist.
#[derive(Debug)]
pub struct Bliss {
    blacklist: Vec<bool>,
    prev_source: i64,
    streak: u64,
    blacklist_thresh: u64,
    unblacklist_cycles: Clock,
    clk: Clock,
    total_blacklisted: u64,
}

impl Bliss {
    /// Build from configuration. `blacklist_thresh` (default 4) is the
    /// consecutive-issue streak that triggers blacklisting;
    /// `unblacklist_cycles` (default 10000) is how often every source is
    /// cleared; `num_sources` sizes the blacklist vector.
    pub fn new(_device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let blacklist_thresh = cfg.u64_or("blacklist_thresh", 4);
        let unblacklist_cycles = cfg.u64_or("unblacklist_cycles", 10_000) as Clock;
        let num_sources = cfg.u64_or("num_sources", 64) as usize;
        Ok(Self {
            blacklist: vec![false; num_sources],
            prev_source: -1,
            streak: 0,
            blacklist_thresh,
            unblacklist_cycles,
            clk: 0,
            total_blacklisted: 0,
        })
    }
}

impl ControllerPlugin for Bliss {
    fn name(&self) -> &'static str {
        "bliss"
    }

    fn update(&mut self, request_found: bool, req: Option<&mut Request>, _ctx: &mut PluginContext<'_>) {
        self.clk += 1;
        if self.unblacklist_cycles > 0 && self.clk % self.unblacklist_cycles == 0 {
            self.blacklist.iter_mut().for_each(|b| *b = false);
        }
        if !request_found {
            return;
        }
        let Some(req) = req else { return };
        if req.source_id < 0 {
            return;
        }
        if req.source_id == self.prev_source {
            self.streak += 1;
        } else {
            self.prev_source = req.source_id;
            self.streak = 0;
        }
        if self.streak >= self.blacklist_thresh {
            let idx = req.source_id as usize;
            if idx < self.blacklist.len() && !self.blacklist[idx] {
                self.blacklist[idx] = true;
                self.total_blacklisted += 1;
            }
        }
    }

    fn is_blacklisted(&self, source_id: i64) -> bool {
        source_id < 0 || self.blacklist.get(source_id as usize).copied().unwrap_or(false)
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        vec![("blacklist_count", self.total_blacklisted as f64)]
    }

    fn tick(&mut self, _clk: Clock) {}
}
