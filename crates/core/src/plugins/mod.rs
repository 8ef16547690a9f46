//! RowHammer mitigation and passive observer plugins (§4.7), plus the
//! shared [`DeviceTopology`] helper every counter-based plugin uses to
//! resolve rank/bank counts and flatten a request's address vector into a
//! per-channel bank index.

use crate::config::PluginConfig;
use crate::controller::{ControllerPlugin, Request};
use crate::dram::{AddrVec, Device, Level};
use crate::error::ConfigError;

/// Probabilistic row refresh.
pub mod para;
/// Graphene-style counter-based row tracker.
pub mod graphene;
/// TWiCe: Graphene plus a pruned `life` counter.
pub mod twice;
/// Oracle: Graphene-style tracker reset on refresh boundaries.
pub mod oracle;
/// BLISS scheduling hint.
pub mod bliss;
/// BlockHammer throttling.
pub mod blockhammer;
/// PRAC per-row activation counting.
pub mod prac;
/// RRS row swap defense.
pub mod rrs;
/// AQUA row swap defense with a quarantine zone.
pub mod aqua;
/// Periodic RFM issuer independent of PRAC.
pub mod rfm;
/// Passive command-issue counter.
pub mod cmd_counter;
/// Passive issue trace recorder.
pub mod trace_recorder;

pub use blockhammer::BlockHammer;
pub use bliss::Bliss;
pub use cmd_counter::CommandCounter;
pub use graphene::Graphene;
pub use oracle::Oracle;
pub use para::Para;
pub use prac::Prac;
pub use rfm::Rfm;
pub use rrs::Rrs;
pub use aqua::Aqua;
pub use trace_recorder::TraceRecorder;
pub use twice::Twice;

/// Factors out the repeated "resolve rank/bankgroup/bank counts and
/// flatten an address vector to a per-channel bank index" boilerplate
/// every counter-based tracker and row-swap plugin needs.
#[derive(Debug, Clone)]
pub struct DeviceTopology {
    bank_scope_fanout: Vec<usize>,
    row_pos: usize,
    rank_pos: usize,
    /// Number of ranks under this channel.
    pub num_ranks: usize,
    /// Flattened bank count (product of every level's fanout from
    /// `Channel` down to, but excluding, `Row`).
    pub num_banks: usize,
    /// Row count per bank, if the organization declares one; `None` if the
    /// standard doesn't expose a fixed row count (the organization only
    /// states fanout down to `Bank`).
    pub rows_per_bank: Option<i64>,
}

impl DeviceTopology {
    /// Derive topology facts from a device's organization.
    #[must_use]
    pub fn from_device(device: &Device) -> Self {
        let org = &device.spec.org;
        let row_pos = org.levels.iter().position(|l| *l == Level::Row).unwrap_or(org.levels.len());
        let rank_pos = org.levels.iter().position(|l| *l == Level::Rank).unwrap_or(0);
        let bank_scope_fanout: Vec<usize> = org.fanout.iter().copied().take(row_pos).collect();
        let num_banks = bank_scope_fanout.iter().product::<usize>().max(1);
        let num_ranks = org.fanout_at(Level::Rank);
        let rows_per_bank = org.levels.get(row_pos).map(|_| org.fanout[row_pos] as i64);
        Self { bank_scope_fanout, row_pos, rank_pos, num_ranks, num_banks, rows_per_bank }
    }

    /// Flatten `addr_vec`'s rank/bankgroup/pseudochannel/bank indices into
    /// a single per-channel bank index.
    #[must_use]
    pub fn flatten_bank(&self, addr_vec: &AddrVec) -> usize {
        let mut flat = 0usize;
        for (i, fanout) in self.bank_scope_fanout.iter().enumerate() {
            let idx = addr_vec.0.get(i).copied().unwrap_or(0).max(0) as usize;
            flat = flat * (*fanout).max(1) + idx;
        }
        flat
    }

    /// The row component of an address vector, or `-1` if this
    /// organization has no row level.
    #[must_use]
    pub fn row_of(&self, addr_vec: &AddrVec) -> i64 {
        addr_vec.0.get(self.row_pos).copied().unwrap_or(-1)
    }

    /// The rank component of an address vector.
    #[must_use]
    pub fn rank_of(&self, addr_vec: &AddrVec) -> usize {
        addr_vec.0.get(self.rank_pos).copied().unwrap_or(0).max(0) as usize
    }

    /// Index of the row level within an address vector, for plugins that
    /// need to write a new row index (RRS, AQUA migrations).
    #[must_use]
    pub fn row_position(&self) -> usize {
        self.row_pos
    }
}

/// Whether `cmd` is an activation (the row-opening event RowHammer
/// trackers count): `ACT`, or `ACT-1` for LPDDR5's two-phase activate,
/// since that is the phase that names the target row.
#[must_use]
pub(crate) fn is_activate(device: &Device, cmd: usize) -> bool {
    let wk = device.well_known;
    Some(cmd) == wk.act || Some(cmd) == wk.act1
}

/// Build a bare priority request with no callback, the shape every
/// injecting plugin in this module needs (victim-row-refresh, swap
/// migration reads/writes, directed RFM).
pub(crate) fn bare_request(
    id: u64,
    addr_vec: AddrVec,
    type_id: &str,
    final_command: usize,
    clk: crate::dram::Clock,
    is_read: bool,
) -> Request {
    Request::new(id, addr_vec, type_id.to_string(), final_command, -1, clk, is_read)
}

/// Resolve one [`PluginConfig`] entry into its concrete implementation,
/// the single place a plugin name from the configuration document is
/// matched against a constructor (§6's "`impl:` names the implementation").
pub fn build_plugin(device: &Device, cfg: &PluginConfig) -> Result<Box<dyn ControllerPlugin>, ConfigError> {
    match cfg.r#impl.as_str() {
        "graphene" => Ok(Box::new(Graphene::new(device, cfg)?)),
        "twice" => Ok(Box::new(Twice::new(device, cfg)?)),
        "oracle" => Ok(Box::new(Oracle::new(device, cfg)?)),
        "para" => Ok(Box::new(Para::new(device, cfg)?)),
        "bliss" => Ok(Box::new(Bliss::new(device, cfg)?)),
        "blockhammer" => Ok(Box::new(BlockHammer::new(device, cfg)?)),
        "prac" => Ok(Box::new(Prac::new(device, cfg)?)),
        "rrs" => Ok(Box::new(Rrs::new(device, cfg)?)),
        "aqua" => Ok(Box::new(Aqua::new(device, cfg)?)),
        "rfm" => Ok(Box::new(Rfm::new(device, cfg)?)),
        "cmd_counter" => Ok(Box::new(CommandCounter::new(device, cfg)?)),
        "trace_recorder" => Ok(Box::new(TraceRecorder::new(device, cfg)?)),
        other => Err(ConfigError::Unregistered { kind: "plugin", name: other.to_string() }),
    }
}
