//! Row-buffer management policy.

use std::collections::HashMap;

use crate::dram::{AddrVec, Device, Level};
use crate::error::SimError;
use crate::stats::{StatBlock, Stats};

use super::request::{ReqBuffer, Request};

/// Row-buffer policy strategy.
#[derive(Debug, Clone)]
pub enum RowPolicy {
    /// Leave rows open until some other pressure closes them (no-op hook).
    Open,
    /// Close a bank's row after `cap` column accesses.
    Closed {
        /// Column-access cap before a `close-row` is injected.
        cap: u32,
        /// Per-bank access counters, keyed by flattened bank index.
        col_accesses: HashMap<usize, u32>,
        /// Final command id for `"close-row"`.
        final_command: usize,
        /// Next synthesized-request id.
        next_id: u64,
        /// Total `close-row` injections since construction, for stats.
        total_closed: u64,
    },
}

impl RowPolicy {
    /// Construct a closed-row policy with the given column-access cap.
    #[must_use]
    pub fn closed(cap: u32, final_command: usize) -> Self {
        RowPolicy::Closed {
            cap,
            col_accesses: HashMap::new(),
            final_command,
            next_id: 0,
            total_closed: 0,
        }
    }

    /// Observe an issued command; under the closed policy, reset or
    /// increment per-bank counters and inject `close-row` when the cap is hit.
    pub fn on_issue(
        &mut self,
        device: &Device,
        cmd: usize,
        addr_vec: &AddrVec,
        clk: i64,
        priority: &mut ReqBuffer,
    ) -> Result<(), SimError> {
        let RowPolicy::Closed { cap, col_accesses, final_command, next_id, total_closed } = self else {
            return Ok(());
        };
        let meta = device.spec.command_meta[cmd];
        let wk = device.well_known;
        let bank_pos = device
            .spec
            .org
            .levels
            .iter()
            .position(|l| *l == Level::Bank)
            .unwrap_or(0);

        let is_same_bank_refresh = Some(cmd) == wk.refsb
            || Some(cmd) == wk.rfmsb
            || Some(cmd) == wk.drfmsb
            || Some(cmd) == wk.rrfmsb;

        if Some(cmd) == wk.prea || (meta.is_refreshing && !is_same_bank_refresh) {
            // PREA or an all-bank refresh-family command resets every
            // counter it touches; conservatively clear all banks under this
            // channel, since this policy only tracks a single channel's
            // counters.
            col_accesses.clear();
            return Ok(());
        }
        if Some(cmd) == wk.presb || is_same_bank_refresh {
            // Same-bank-across-bankgroups reset: `flatten_bank_index` packs
            // the bank component last, so `flat % bank_fanout` recovers it
            // regardless of which bank-group the entry belongs to.
            let bank_idx = addr_vec.0.get(bank_pos).copied().unwrap_or(-1);
            let bank_fanout = device.spec.org.fanout_at(Level::Bank).max(1);
            col_accesses.retain(|flat, _| (*flat % bank_fanout) as i64 != bank_idx);
            return Ok(());
        }

        let flat_bank = flatten_bank_index(device, addr_vec);
        if meta.is_closing {
            let _ = col_accesses.remove(&flat_bank);
            return Ok(());
        }
        if meta.is_accessing {
            let count = col_accesses.entry(flat_bank).or_insert(0);
            *count += 1;
            if *count >= *cap {
                *count = 0;
                let req = Request::new(
                    *next_id,
                    addr_vec.clone(),
                    "close-row".to_string(),
                    *final_command,
                    -1,
                    clk,
                    false,
                );
                *next_id += 1;
                if !priority.push(req) {
                    return Err(SimError::PriorityBufferFull {
                        channel: 0,
                        capacity: priority.capacity.unwrap_or(0),
                    });
                }
                *total_closed += 1;
            }
        }
        Ok(())
    }
}

impl Stats for RowPolicy {
    fn stats(&self) -> StatBlock {
        match self {
            RowPolicy::Open => StatBlock::new("row_policy", "open", None),
            RowPolicy::Closed { cap, total_closed, .. } => StatBlock::new("row_policy", "closed", None)
                .with("cap", f64::from(*cap))
                .with("total_closed", *total_closed as f64),
        }
    }
}

/// Flatten an address vector's rank/bank-group/pseudo-channel/bank indices
/// into a single bank-scoped integer key, for use as a `HashMap` key by
/// policies and plugins that track per-bank state.
#[must_use]
pub fn flatten_bank_index(device: &Device, addr_vec: &AddrVec) -> usize {
    let mut flat = 0usize;
    for (level, fanout) in device.spec.org.levels.iter().zip(&device.spec.org.fanout) {
        if matches!(level, Level::Row | Level::Column) {
            break;
        }
        let pos = device.spec.org.levels.iter().position(|l| l == level).unwrap();
        let idx = addr_vec.0.get(pos).copied().unwrap_or(0).max(0) as usize;
        flat = flat * fanout.max(1) + idx;
    }
    flat
}
