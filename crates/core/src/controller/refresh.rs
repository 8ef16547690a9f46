//! Refresh manager variants.

use crate::dram::{AddrVec, Clock};
use crate::error::SimError;
use crate::stats::{StatBlock, Stats};

use super::request::{ReqBuffer, Request};

/// Refresh manager strategy.
#[derive(Debug, Clone)]
pub enum RefreshManager {
    /// All-bank periodic refresh: every rank is sent an all-bank-refresh
    /// every `nrefi` cycles.
    AllBank {
        /// Interval, in memory cycles.
        nrefi: i64,
        /// Cycle of the next scheduled refresh.
        next_refresh: i64,
        /// Number of ranks under this channel (one request per rank per round).
        num_ranks: usize,
        /// Final command id for `"all-bank-refresh"`.
        final_command: usize,
        /// Levels count (address-vector length) for constructing wildcarded requests.
        addr_len: usize,
        /// Position of the rank level within the address vector.
        rank_pos: usize,
        /// Monotonic id counter for synthesized requests.
        next_id: u64,
        /// Total refresh requests injected since construction, for stats.
        total_issued: u64,
    },
}

impl RefreshManager {
    /// Construct an all-bank periodic refresh manager.
    #[must_use]
    pub fn all_bank(nrefi: i64, num_ranks: usize, final_command: usize, addr_len: usize, rank_pos: usize) -> Self {
        Self::AllBank {
            nrefi,
            next_refresh: nrefi,
            num_ranks,
            final_command,
            addr_len,
            rank_pos,
            next_id: 0,
            total_issued: 0,
        }
    }

    /// Advance by one cycle; if due, enqueue one all-bank-refresh per rank
    /// into `priority`. The priority buffer is documented as effectively
    /// unbounded; a failed enqueue here is a fatal invariant violation.
    pub fn tick(&mut self, clk: Clock, priority: &mut ReqBuffer) -> Result<(), SimError> {
        match self {
            RefreshManager::AllBank {
                nrefi,
                next_refresh,
                num_ranks,
                final_command,
                addr_len,
                rank_pos,
                next_id,
                total_issued,
            } => {
                if clk < *next_refresh {
                    return Ok(());
                }
                for rank in 0..*num_ranks {
                    let mut addr_vec = AddrVec::wildcard(*addr_len);
                    addr_vec.0[*rank_pos] = rank as i64;
                    let req = Request::new(
                        *next_id,
                        addr_vec,
                        "all-bank-refresh".to_string(),
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
                    *total_issued += 1;
                }
                *next_refresh += *nrefi;
                Ok(())
            }
        }
    }
}

impl Stats for RefreshManager {
    fn stats(&self) -> StatBlock {
        match self {
            RefreshManager::AllBank { nrefi, next_refresh, total_issued, .. } => {
                StatBlock::new("refresh_manager", "all_bank", None)
                    .with("nrefi", *nrefi as f64)
                    .with("next_refresh", *next_refresh as f64)
                    .with("total_issued", *total_issued as f64)
            }
        }
    }
}
