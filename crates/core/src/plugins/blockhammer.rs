//! BlockHammer throttling (§4.7.4): per bank, `k` counting-Bloom filters
//! with staggered epochs test whether a row is being hammered; a
//! per-rank time-windowed history buffer corroborates the test before an
//! activation is refused via [`super::super::ControllerPlugin::is_act_safe`].

use std::collections::{HashMap, VecDeque};

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, PluginContext, Request};
use crate::dram::{Clock, Device};
use crate::error::ConfigError;

use super::{is_activate, DeviceTopology};

#[derive(Debug, Clone)]
struct CountingBloom {
    slots: Vec<u32>,
    epoch_start: Clock,
}

impl CountingBloom {
    fn new(width: usize, epoch_start: Clock) -> Self {
        Self { slots: vec![0; width], epoch_start }
    }

    fn hash(&self, row: i64, seed: u64) -> usize {
        let mixed = (row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(seed);
        (mixed % self.slots.len() as u64) as usize
    }

    fn insert(&mut self, row: i64, num_hashes: usize) {
        for h in 0..num_hashes {
            let idx = self.hash(row, h as u64 * 0x1000_0001);
            self.slots[idx] = self.slots[idx].saturating_add(1);
        }
    }

    fn estimate(&self, row: i64, num_hashes: usize) -> u32 {
        (0..num_hashes).map(|h| self.slots[self.hash(row, h as u64 * 0x1000_0001)]).min().unwrap_or(0)
    }

    fn reset(&mut self, clk: Clock) {
        self.slots.iter_mut().for_each(|s| *s = 0);
        self.epoch_start = clk;
    }
}

/// BlockHammer RowHammer-likelihood throttler.
#[derive(Debug)]
pub struct BlockHammer {
    topology: DeviceTopology,
    filters: Vec<Vec<CountingBloom>>,
    active: Vec<usize>,
    epoch_length: Clock,
    num_hashes: usize,
    row_threshold: u32,
    history: Vec<VecDeque<(i64, Clock)>>,
    history_window: Clock,
    attack_threshold: u64,
    suspicious_counts: HashMap<(i64, usize), u64>,
}

impl BlockHammer {
    /// Build from a device and its configuration entry. `num_filters`
    /// (default 4) sets `k`; `filter_width` (default 1024) sizes each
    /// filter; `num_hashes` (default 2); `row_threshold` (default 16)
    /// trips the per-filter test; `epoch_cycles` (default 100,000)
    /// staggers filter rotation; `history_window_cycles` (default
    /// 10,000) bounds the per-rank corroborating history;
    /// `attack_threshold` (default 1000) normalizes `rhli`.
    pub fn new(device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let topology = DeviceTopology::from_device(device);
        let num_filters = cfg.u64_or("num_filters", 4) as usize;
        let filter_width = cfg.u64_or("filter_width", 1024) as usize;
        let num_hashes = cfg.u64_or("num_hashes", 2) as usize;
        let row_threshold = cfg.u64_or("row_threshold", 16) as u32;
        let epoch_length = cfg.u64_or("epoch_cycles", 100_000) as Clock;
        let history_window = cfg.u64_or("history_window_cycles", 10_000) as Clock;
        let attack_threshold = cfg.u64_or("attack_threshold", 1000);

        let filters: Vec<Vec<CountingBloom>> = (0..topology.num_banks)
            .map(|_| {
                (0..num_filters)
                    .map(|i| CountingBloom::new(filter_width, (i as Clock) * epoch_length / num_filters.max(1) as Clock))
                    .collect()
            })
            .collect();
        let active = vec![0usize; topology.num_banks];
        let history = (0..topology.num_ranks).map(|_| VecDeque::new()).collect();

        Ok(Self {
            topology,
            filters,
            active,
            epoch_length,
            num_hashes,
            row_threshold,
            history,
            history_window,
            attack_threshold,
            suspicious_counts: HashMap::new(),
        })
    }
}

impl ControllerPlugin for BlockHammer {
    fn name(&self) -> &'static str {
        "blockhammer"
    }

    fn tick(&mut self, clk: Clock) {
        for (bank, bank_filters) in self.filters.iter_mut().enumerate() {
            let num_filters = bank_filters.len();
            for (i, filter) in bank_filters.iter_mut().enumerate() {
                if clk - filter.epoch_start >= self.epoch_length {
                    filter.reset(clk);
                    if i == self.active[bank] && num_filters > 0 {
                        self.active[bank] = (self.active[bank] + 1) % num_filters;
                    }
                }
            }
        }
        for rank_history in &mut self.history {
            while rank_history.front().is_some_and(|(_, t)| clk - t > self.history_window) {
                rank_history.pop_front();
            }
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
        let rank = self.topology.rank_of(&req.addr_vec);
        let row = self.topology.row_of(&req.addr_vec);

        for filter in &mut self.filters[bank] {
            filter.insert(row, self.num_hashes);
        }
        self.history[rank].push_back((row, ctx.clk));

        let active_idx = self.active[bank];
        let suspect = self.filters[bank][active_idx].estimate(row, self.num_hashes) >= self.row_threshold
            && self.history[rank].iter().filter(|(r, _)| *r == row).count() > 1;
        if suspect && req.source_id >= 0 {
            *self.suspicious_counts.entry((req.source_id, bank)).or_insert(0) += 1;
        }
    }

    fn is_act_safe(&self, req: &Request, device: &Device) -> bool {
        if !is_activate(device, req.command) {
            return true;
        }
        let bank = self.topology.flatten_bank(&req.addr_vec);
        let row = self.topology.row_of(&req.addr_vec);
        let active_idx = self.active[bank];
        self.filters[bank][active_idx].estimate(row, self.num_hashes) < self.row_threshold
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        let max_count = self.suspicious_counts.values().copied().max().unwrap_or(0);
        let rhli = (max_count as f64 / self.attack_threshold.max(1) as f64).min(1.0);
        vec![("max_rhli", rhli), ("flagged_sources", self.suspicious_counts.len() as f64)]
    }
}
