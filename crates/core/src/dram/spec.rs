//! Per-standard static data: organization, command table, and the 3-D
//! timing constraint table. These are plain `const`-friendly structs built
//! once at startup by `dram::standards`; no string-keyed lookup survives
//! past construction.

use std::collections::HashMap;

use crate::error::ConfigError;

use super::types::{Level, NameTable};

/// Per-level fanout counts plus the chip's declared density, the Rust
/// analog of the original's `Organization` struct.
#[derive(Debug, Clone)]
pub struct Organization {
    /// Levels present in this standard's hierarchy, in root-to-leaf order.
    /// Always starts `[Channel, Rank, ...(BankGroup)?, ...(PseudoChannel)?,
    /// Bank, Row, Column]`.
    pub levels: Vec<Level>,
    /// Fanout (child count) at each entry of `levels`. Same length and
    /// order as `levels`; the `Channel` entry is always `1`.
    pub fanout: Vec<usize>,
    /// Data bus width in bits.
    pub dq_width: u32,
    /// Declared chip density in megabits.
    pub density_mb: u64,
}

impl Organization {
    /// Fanout at a given level, or `1` if the level is absent from this
    /// standard's hierarchy (e.g. `BankGroup` on DDR3).
    #[must_use]
    pub fn fanout_at(&self, level: Level) -> usize {
        self.levels
            .iter()
            .position(|l| *l == level)
            .map_or(1, |i| self.fanout[i])
    }

    /// Validate the chip-density invariant: product of per-level fanout
    /// below `rank` times DQ width must equal the declared density.
    pub fn validate_density(&self) -> Result<(), ConfigError> {
        let below_rank: u64 = self
            .levels
            .iter()
            .zip(&self.fanout)
            .skip_while(|(l, _)| **l != Level::Rank)
            .skip(1)
            .map(|(_, f)| *f as u64)
            .product();
        let computed_mb = (below_rank * u64::from(self.dq_width)) >> 20;
        if computed_mb == self.density_mb {
            Ok(())
        } else {
            Err(ConfigError::DensityMismatch {
                computed_mb,
                declared_mb: self.density_mb,
            })
        }
    }

    /// Ordered list of levels that own an arena node (excludes `Row`/`Column`).
    #[must_use]
    pub fn node_levels(&self) -> Vec<Level> {
        self.levels.iter().copied().filter(|l| l.is_tree_node()).collect()
    }
}

/// Behavioral flags for one command, the Rust analog of the original's
/// per-command meta flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandMeta {
    /// The level at whose nodes this command's state effect applies.
    pub scope: Level,
    /// Opens a row (or, for two-phase activate, begins opening it).
    pub is_opening: bool,
    /// Closes a row or bank.
    pub is_closing: bool,
    /// Transfers data (`RD`/`WR` family).
    pub is_accessing: bool,
    /// Refreshes one or more banks.
    pub is_refreshing: bool,
    /// First half of an LPDDR5 two-phase activate (`ACT-1`); the second
    /// half (`ACT-2`) is `is_opening` but not `is_two_phase_first`.
    pub is_two_phase_first: bool,
    /// A command whose state effect is deferred `duration` cycles past
    /// issue (DDR5-family refresh/RFM/VRR commands), processed by
    /// `Device::tick` rather than immediately in `issue_command`.
    pub deferred_duration: Option<i64>,
}

impl CommandMeta {
    /// Construct accessing (RD/WR-family) command meta.
    #[must_use]
    pub fn accessing(scope: Level) -> Self {
        Self { scope, is_accessing: true, ..Default::default() }
    }

    /// Construct opening (ACT-family) command meta.
    #[must_use]
    pub fn opening(scope: Level) -> Self {
        Self { scope, is_opening: true, ..Default::default() }
    }

    /// Construct closing (PRE-family) command meta.
    #[must_use]
    pub fn closing(scope: Level) -> Self {
        Self { scope, is_closing: true, ..Default::default() }
    }

    /// Construct refreshing-family command meta, optionally with a
    /// deferred state-effect duration (DDR5 family).
    #[must_use]
    pub fn refreshing(scope: Level, deferred_duration: Option<i64>) -> Self {
        Self { scope, is_refreshing: true, deferred_duration, ..Default::default() }
    }
}

/// One entry of the timing constraint table: issuing `preceding` triggers
/// this effect on `following`.
#[derive(Debug, Clone, Copy)]
pub struct TimingConstraint {
    /// Command id this constraint updates the readiness of.
    pub following: usize,
    /// Cycles added after the constraining issue.
    pub latency: i64,
    /// How many issues back in `preceding`'s history to look (1 = most
    /// recent). `> 1` models constraints such as `nFAW` (4th most recent
    /// `ACT`).
    pub window: usize,
    /// If true, the constraint is applied to sibling nodes at the same
    /// level rather than the node that received `preceding`.
    pub is_sibling: bool,
}

/// `T[level][preceding_cmd] -> constraints on other commands`.
#[derive(Debug, Clone, Default)]
pub struct TimingTable {
    // Indexed first by a small level slot, then by command id.
    table: HashMap<(Level, usize), Vec<TimingConstraint>>,
    /// Maximum window seen for each command id; used to size ring buffers.
    max_window: Vec<usize>,
}

impl TimingTable {
    /// Build an empty table sized for `num_commands`.
    #[must_use]
    pub fn new(num_commands: usize) -> Self {
        Self { table: HashMap::new(), max_window: vec![1; num_commands] }
    }

    /// Register a constraint: issuing `preceding` at `level` affects `constraint.following`.
    pub fn add(&mut self, level: Level, preceding: usize, constraint: TimingConstraint) {
        if constraint.window > self.max_window[preceding] {
            self.max_window[preceding] = constraint.window;
        }
        self.table.entry((level, preceding)).or_default().push(constraint);
    }

    /// Constraints triggered by issuing `preceding` at `level`.
    #[must_use]
    pub fn constraints(&self, level: Level, preceding: usize) -> &[TimingConstraint] {
        self.table.get(&(level, preceding)).map_or(&[], Vec::as_slice)
    }

    /// Ring-buffer capacity needed for `cmd`'s history (the largest window
    /// any constraint anywhere references for it).
    #[must_use]
    pub fn window_cap(&self, cmd: usize) -> usize {
        self.max_window[cmd]
    }
}

/// The complete static description of one DRAM standard instance:
/// organization, command names/meta, timing table, and the request→command
/// translation table.
#[derive(Debug, Clone)]
pub struct DeviceSpec {
    /// Human-readable standard name (e.g. `"DDR4"`).
    pub name: String,
    /// Organization (fanout, density, DQ width).
    pub org: Organization,
    /// Command name↔id table.
    pub commands: NameTable,
    /// Per-command behavioral flags, indexed by command id.
    pub command_meta: Vec<CommandMeta>,
    /// Timing constraint table.
    pub timing: TimingTable,
    /// Maps an abstract request-kind name (`"read"`, `"write"`,
    /// `"all-bank-refresh"`, `"victim-row-refresh"`, `"rfm"`,
    /// `"directed-rfm"`, `"open-row"`, `"close-row"`, …) to the final
    /// command id the controller must reach for it.
    pub request_translations: HashMap<String, usize>,
}

impl DeviceSpec {
    /// Resolve a command name to its id, or a configuration error.
    pub fn command_id(&self, name: &str) -> Result<usize, ConfigError> {
        self.commands
            .id(name)
            .ok_or_else(|| ConfigError::UnknownPreset(format!("command {name}")))
    }

    /// Resolve an abstract request-kind name to its final command id.
    pub fn final_command_for(&self, request_kind: &str) -> Result<usize, ConfigError> {
        self.request_translations
            .get(request_kind)
            .copied()
            .ok_or_else(|| ConfigError::UnknownPreset(format!("request kind {request_kind}")))
    }

    /// Resolve the fixed set of JEDEC mnemonics the prerequisite-derivation
    /// and action logic in `dram::device` dispatches on by name, once, at
    /// construction time. Names absent from this standard (e.g. `PREsb` on
    /// a standard with no bank groups) resolve to `None` and the walk
    /// falls back to the coarser equivalent (`PREA`).
    #[must_use]
    pub fn well_known(&self) -> WellKnownCommands {
        let id = |n: &str| self.commands.id(n);
        WellKnownCommands {
            act: id("ACT"),
            act1: id("ACT-1"),
            act2: id("ACT-2"),
            pre: id("PRE"),
            prea: id("PREA"),
            presb: id("PREsb"),
            rd: id("RD"),
            wr: id("WR"),
            rda: id("RDA"),
            wra: id("WRA"),
            vrr: id("VRR"),
            rvrr: id("RVRR"),
            refab: id("REFab"),
            refab_end: id("REFab_end"),
            refsb: id("REFsb"),
            refsb_end: id("REFsb_end"),
            rfmab: id("RFMab"),
            rfmsb: id("RFMsb"),
            drfmab: id("DRFMab"),
            drfmsb: id("DRFMsb"),
            rrfmsb: id("RRFMsb"),
            casrd: id("CASRD"),
            caswr: id("CASWR"),
        }
    }
}

/// Cached ids for the fixed set of JEDEC mnemonics the generic
/// prerequisite-derivation and action logic needs to special-case by
/// name. Resolved once per `DeviceSpec`; every other lookup on the hot
/// path is by integer id.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellKnownCommands {
    /// Single-phase (or DDR-family) row activate.
    pub act: Option<usize>,
    /// LPDDR5 two-phase activate, first half.
    pub act1: Option<usize>,
    /// LPDDR5 two-phase activate, second half.
    pub act2: Option<usize>,
    /// Precharge single bank.
    pub pre: Option<usize>,
    /// Precharge all banks in rank.
    pub prea: Option<usize>,
    /// Precharge same bank across all bank groups.
    pub presb: Option<usize>,
    /// Column read.
    pub rd: Option<usize>,
    /// Column write.
    pub wr: Option<usize>,
    /// Column read with auto-precharge.
    pub rda: Option<usize>,
    /// Column write with auto-precharge.
    pub wra: Option<usize>,
    /// Victim-row refresh.
    pub vrr: Option<usize>,
    /// Reduced victim-row refresh.
    pub rvrr: Option<usize>,
    /// All-bank refresh.
    pub refab: Option<usize>,
    /// Deferred end-of-refresh action for `REFab`.
    pub refab_end: Option<usize>,
    /// Same-bank refresh.
    pub refsb: Option<usize>,
    /// Deferred end-of-refresh action for `REFsb`.
    pub refsb_end: Option<usize>,
    /// All-bank refresh management.
    pub rfmab: Option<usize>,
    /// Same-bank refresh management.
    pub rfmsb: Option<usize>,
    /// Directed all-bank RFM.
    pub drfmab: Option<usize>,
    /// Directed same-bank RFM.
    pub drfmsb: Option<usize>,
    /// Reduced same-bank RFM.
    pub rrfmsb: Option<usize>,
    /// LPDDR5 CAS-sync preceding a read.
    pub casrd: Option<usize>,
    /// LPDDR5 CAS-sync preceding a write.
    pub caswr: Option<usize>,
}
