//! Per-standard preset tables: organization and timing constants for
//! DDR3/4/5, LPDDR5, HBM2, and GDDR6, assembled into a [`DeviceSpec`].
//!
//! DDR4 and DDR5 carry the most detailed presets since they're the two
//! standards exercised by the concrete end-to-end scenarios; DDR3,
//! LPDDR5, HBM2, and GDDR6 are deliberately simplified approximations
//! (documented per preset) rather than full JEDEC-faithful tables.

use std::collections::HashMap;

use crate::error::ConfigError;

use super::spec::{CommandMeta, DeviceSpec, Organization, TimingConstraint, TimingTable};
use super::types::{Level, NameTable};

/// Which DRAM standard a [`DeviceSpec`] was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Standard {
    /// DDR3.
    Ddr3,
    /// DDR4.
    Ddr4,
    /// DDR5.
    Ddr5,
    /// LPDDR5 (two-phase activate, CAS-sync).
    Lpddr5,
    /// HBM2 (pseudo-channel).
    Hbm2,
    /// GDDR6 (bank group + pseudo-channel).
    Gddr6,
}

impl Standard {
    /// Parse a standard name as it appears in configuration documents.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "DDR3" => Ok(Standard::Ddr3),
            "DDR4" => Ok(Standard::Ddr4),
            "DDR5" => Ok(Standard::Ddr5),
            "LPDDR5" => Ok(Standard::Lpddr5),
            "HBM2" => Ok(Standard::Hbm2),
            "GDDR6" => Ok(Standard::Gddr6),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    fn has_bankgroup(self) -> bool {
        matches!(self, Standard::Ddr4 | Standard::Ddr5 | Standard::Gddr6)
    }

    fn has_pseudochannel(self) -> bool {
        matches!(self, Standard::Hbm2 | Standard::Gddr6)
    }

    fn two_phase_act(self) -> bool {
        matches!(self, Standard::Lpddr5)
    }

    fn cas_sync(self) -> bool {
        matches!(self, Standard::Lpddr5)
    }

    /// Whether refresh/RFM state effects are time-deferred (true for every
    /// standard modeled here; DDR3/DDR4 collapse the deferred window to
    /// their `nRFC`, same as DDR5's explicit split).
    fn deferred_refresh(self) -> bool {
        true
    }
}

/// Per-level fanout and density for one organization preset.
#[derive(Debug, Clone, Copy)]
pub struct OrgPreset {
    /// Ranks per channel.
    pub ranks: usize,
    /// Bank groups per rank (ignored if the standard has none).
    pub bankgroups: usize,
    /// Pseudo-channels per rank (ignored if the standard has none).
    pub pseudochannels: usize,
    /// Banks per bank-group/pseudo-channel/rank (whichever is the direct parent).
    pub banks: usize,
    /// Rows per bank.
    pub rows: usize,
    /// Columns per row.
    pub columns: usize,
    /// DQ width in bits.
    pub dq_width: u32,
    /// Declared chip density in megabits.
    pub density_mb: u64,
}

/// JEDEC timing constants, in memory cycles (except `nREFI` which is
/// nanoseconds and converted using `tck_ps`).
#[derive(Debug, Clone, Copy)]
pub struct SpeedParams {
    /// Tck, in picoseconds (used only to convert `nrefi_ns` to cycles).
    pub tck_ps: u32,
    /// Row-activate to column-access delay.
    pub n_rcd: i64,
    /// Row precharge time.
    pub n_rp: i64,
    /// Row active time (ACT to PRE minimum).
    pub n_ras: i64,
    /// Column-to-column delay, same bank group.
    pub n_ccd_l: i64,
    /// Column-to-column delay, different bank group.
    pub n_ccd_s: i64,
    /// Row-to-row activate delay, same bank group.
    pub n_rrd_l: i64,
    /// Row-to-row activate delay, different bank group.
    pub n_rrd_s: i64,
    /// Four-activate window.
    pub n_faw: i64,
    /// CAS latency.
    pub n_cl: i64,
    /// CAS write latency.
    pub n_cwl: i64,
    /// Write recovery time.
    pub n_wr: i64,
    /// Write-to-read turnaround.
    pub n_wtr: i64,
    /// Burst length in cycles.
    pub n_bl: i64,
    /// Average refresh interval, nanoseconds.
    pub nrefi_ns: f64,
    /// All-bank refresh cycle time.
    pub n_rfc: i64,
    /// Same-bank refresh cycle time (standards with bank groups).
    pub n_rfcsb: i64,
    /// Refresh-management cycle time.
    pub n_rfm: i64,
    /// Data-out latency after the final column command completes.
    pub read_latency: i64,
}

impl SpeedParams {
    fn nrefi_cycles(self) -> i64 {
        let tck_ns = f64::from(self.tck_ps) / 1000.0;
        (self.nrefi_ns / tck_ns).round() as i64
    }
}

/// Assemble a [`DeviceSpec`] for `standard` from an organization and speed preset.
pub fn build(
    standard: Standard,
    org_preset: OrgPreset,
    speed: SpeedParams,
) -> Result<DeviceSpec, ConfigError> {
    let mut levels = vec![Level::Channel, Level::Rank];
    let mut fanout = vec![1usize, org_preset.ranks];
    if standard.has_bankgroup() {
        levels.push(Level::BankGroup);
        fanout.push(org_preset.bankgroups);
    }
    if standard.has_pseudochannel() {
        levels.push(Level::PseudoChannel);
        fanout.push(org_preset.pseudochannels);
    }
    levels.push(Level::Bank);
    fanout.push(org_preset.banks);
    levels.push(Level::Row);
    fanout.push(org_preset.rows);
    levels.push(Level::Column);
    fanout.push(org_preset.columns);

    let org = Organization {
        levels,
        fanout,
        dq_width: org_preset.dq_width,
        density_mb: org_preset.density_mb,
    };
    org.validate_density()?;

    let mut names: Vec<&str> = vec!["PRE", "PREA", "RD", "WR", "RDA", "WRA", "REFab", "REFab_end"];
    if standard.two_phase_act() {
        names.extend(["ACT-1", "ACT-2"]);
    } else {
        names.push("ACT");
    }
    names.extend(["VRR", "RVRR", "RFMab", "RFMab_end", "DRFMab", "DRFMab_end"]);
    if standard.has_bankgroup() {
        names.extend([
            "PREsb", "REFsb", "REFsb_end", "RFMsb", "RFMsb_end", "DRFMsb", "DRFMsb_end", "RRFMsb",
            "RRFMsb_end",
        ]);
    }
    if standard.cas_sync() {
        names.extend(["CASRD", "CASWR"]);
    }

    let commands = NameTable::new(&names);
    let num_commands = commands.len();
    let id = |n: &str| commands.id(n).expect("name just registered above");

    let refresh_duration = if standard.deferred_refresh() { Some(speed.n_rfc) } else { None };
    let refresh_duration_sb =
        if standard.deferred_refresh() { Some(speed.n_rfcsb) } else { None };
    let rfm_duration = if standard.deferred_refresh() { Some(speed.n_rfm) } else { None };

    let mut command_meta = vec![CommandMeta::default(); num_commands];
    command_meta[id("PRE")] = CommandMeta::closing(Level::Bank);
    command_meta[id("PREA")] = CommandMeta::closing(Level::Rank);
    command_meta[id("RD")] = CommandMeta::accessing(Level::Bank);
    command_meta[id("WR")] = CommandMeta::accessing(Level::Bank);
    command_meta[id("RDA")] = CommandMeta { is_closing: true, ..CommandMeta::accessing(Level::Bank) };
    command_meta[id("WRA")] = CommandMeta { is_closing: true, ..CommandMeta::accessing(Level::Bank) };
    command_meta[id("REFab")] = CommandMeta::refreshing(Level::Rank, refresh_duration);
    command_meta[id("REFab_end")] = CommandMeta::default();
    if standard.two_phase_act() {
        command_meta[id("ACT-1")] =
            CommandMeta { is_two_phase_first: true, ..CommandMeta::opening(Level::Bank) };
        command_meta[id("ACT-2")] = CommandMeta::opening(Level::Bank);
    } else {
        command_meta[id("ACT")] = CommandMeta::opening(Level::Bank);
    }
    command_meta[id("VRR")] = CommandMeta::refreshing(Level::Bank, refresh_duration);
    command_meta[id("RVRR")] = CommandMeta::refreshing(Level::Bank, refresh_duration);
    command_meta[id("RFMab")] = CommandMeta::refreshing(Level::Rank, rfm_duration);
    command_meta[id("RFMab_end")] = CommandMeta::default();
    command_meta[id("DRFMab")] = CommandMeta::refreshing(Level::Rank, rfm_duration);
    command_meta[id("DRFMab_end")] = CommandMeta::default();
    if standard.has_bankgroup() {
        command_meta[id("PREsb")] = CommandMeta::closing(Level::Rank);
        command_meta[id("REFsb")] = CommandMeta::refreshing(Level::Rank, refresh_duration_sb);
        command_meta[id("REFsb_end")] = CommandMeta::default();
        command_meta[id("RFMsb")] = CommandMeta::refreshing(Level::Rank, rfm_duration);
        command_meta[id("RFMsb_end")] = CommandMeta::default();
        command_meta[id("DRFMsb")] = CommandMeta::refreshing(Level::Rank, rfm_duration);
        command_meta[id("DRFMsb_end")] = CommandMeta::default();
        command_meta[id("RRFMsb")] = CommandMeta::refreshing(Level::Rank, rfm_duration);
        command_meta[id("RRFMsb_end")] = CommandMeta::default();
    }
    if standard.cas_sync() {
        command_meta[id("CASRD")] = CommandMeta::accessing(Level::Rank);
        command_meta[id("CASWR")] = CommandMeta::accessing(Level::Rank);
    }

    let mut timing = TimingTable::new(num_commands);
    let act_id = if standard.two_phase_act() { id("ACT-2") } else { id("ACT") };
    let act_issue_id = if standard.two_phase_act() { id("ACT-1") } else { id("ACT") };

    // ACT -> RD/WR (nRCD), ACT -> PRE (nRAS), ACT -> ACT same bank (nRC, approximated as nRAS+nRP).
    timing.add(
        Level::Bank,
        act_id,
        TimingConstraint { following: id("RD"), latency: speed.n_rcd, window: 1, is_sibling: false },
    );
    timing.add(
        Level::Bank,
        act_id,
        TimingConstraint { following: id("WR"), latency: speed.n_rcd, window: 1, is_sibling: false },
    );
    timing.add(
        Level::Bank,
        act_id,
        TimingConstraint { following: id("PRE"), latency: speed.n_ras, window: 1, is_sibling: false },
    );
    timing.add(
        Level::Bank,
        act_id,
        TimingConstraint {
            following: act_issue_id,
            latency: speed.n_ras + speed.n_rp,
            window: 1,
            is_sibling: false,
        },
    );
    // PRE -> ACT (nRP).
    timing.add(
        Level::Bank,
        id("PRE"),
        TimingConstraint { following: act_issue_id, latency: speed.n_rp, window: 1, is_sibling: false },
    );
    timing.add(
        Level::Rank,
        id("PREA"),
        TimingConstraint {
            following: act_issue_id,
            latency: speed.n_rp,
            window: 1,
            is_sibling: true,
        },
    );
    // RD/WR -> next RD/WR (nCCD), sibling banks different group get nCCDS.
    for cas in ["RD", "WR"] {
        timing.add(
            Level::Bank,
            id(cas),
            TimingConstraint { following: id("RD"), latency: speed.n_ccd_l, window: 1, is_sibling: false },
        );
        timing.add(
            Level::Bank,
            id(cas),
            TimingConstraint { following: id("WR"), latency: speed.n_ccd_l, window: 1, is_sibling: false },
        );
        timing.add(
            Level::Rank,
            id(cas),
            TimingConstraint { following: id("RD"), latency: speed.n_ccd_s, window: 1, is_sibling: true },
        );
        timing.add(
            Level::Rank,
            id(cas),
            TimingConstraint { following: id("WR"), latency: speed.n_ccd_s, window: 1, is_sibling: true },
        );
    }
    // WR -> RD turnaround (nWTR) and RD/WR -> PRE (auto-precharge handled by RDA/WRA scope).
    timing.add(
        Level::Bank,
        id("WR"),
        TimingConstraint { following: id("RD"), latency: speed.n_wtr, window: 1, is_sibling: false },
    );
    timing.add(
        Level::Bank,
        id("RD"),
        TimingConstraint {
            following: id("PRE"),
            latency: speed.n_cl + speed.n_bl,
            window: 1,
            is_sibling: false,
        },
    );
    timing.add(
        Level::Bank,
        id("WR"),
        TimingConstraint {
            following: id("PRE"),
            latency: speed.n_cwl + speed.n_bl + speed.n_wr,
            window: 1,
            is_sibling: false,
        },
    );
    // nFAW: the 4th most recent ACT on this rank gates the next sibling ACT.
    timing.add(
        Level::Rank,
        act_issue_id,
        TimingConstraint { following: act_issue_id, latency: speed.n_faw, window: 4, is_sibling: true },
    );
    // nRRD: same-bank-group vs different-bank-group ACT spacing.
    timing.add(
        Level::Bank,
        act_issue_id,
        TimingConstraint { following: act_issue_id, latency: speed.n_rrd_l, window: 1, is_sibling: false },
    );
    timing.add(
        Level::Rank,
        act_issue_id,
        TimingConstraint { following: act_issue_id, latency: speed.n_rrd_s, window: 1, is_sibling: true },
    );
    if standard.cas_sync() {
        timing.add(
            Level::Rank,
            id("CASRD"),
            TimingConstraint { following: id("RD"), latency: 2, window: 1, is_sibling: false },
        );
        timing.add(
            Level::Rank,
            id("CASWR"),
            TimingConstraint { following: id("WR"), latency: 2, window: 1, is_sibling: false },
        );
        // Open Question #2: CASRD/CASWR block a same-rank refresh until
        // the sync completes — modeled as an ordinary constraint.
        timing.add(
            Level::Rank,
            id("CASRD"),
            TimingConstraint { following: id("REFab"), latency: 2, window: 1, is_sibling: false },
        );
        timing.add(
            Level::Rank,
            id("CASWR"),
            TimingConstraint { following: id("REFab"), latency: 2, window: 1, is_sibling: false },
        );
    }

    // Refresh/RFM family -> next ACT: the rank stays busy for the refresh's
    // own duration (nRFC/nRFM) before any activate in its scope may issue.
    timing.add(
        Level::Rank,
        id("REFab"),
        TimingConstraint { following: act_issue_id, latency: speed.n_rfc, window: 1, is_sibling: false },
    );
    timing.add(
        Level::Rank,
        id("RFMab"),
        TimingConstraint { following: act_issue_id, latency: speed.n_rfm, window: 1, is_sibling: false },
    );
    timing.add(
        Level::Rank,
        id("DRFMab"),
        TimingConstraint { following: act_issue_id, latency: speed.n_rfm, window: 1, is_sibling: false },
    );
    if standard.has_bankgroup() {
        timing.add(
            Level::Rank,
            id("REFsb"),
            TimingConstraint {
                following: act_issue_id,
                latency: speed.n_rfcsb,
                window: 1,
                is_sibling: false,
            },
        );
        timing.add(
            Level::Rank,
            id("RFMsb"),
            TimingConstraint { following: act_issue_id, latency: speed.n_rfm, window: 1, is_sibling: false },
        );
        timing.add(
            Level::Rank,
            id("DRFMsb"),
            TimingConstraint { following: act_issue_id, latency: speed.n_rfm, window: 1, is_sibling: false },
        );
        timing.add(
            Level::Rank,
            id("RRFMsb"),
            TimingConstraint { following: act_issue_id, latency: speed.n_rfm, window: 1, is_sibling: false },
        );
    }

    let mut request_translations = HashMap::new();
    let _ = request_translations.insert("read".to_string(), id("RD"));
    let _ = request_translations.insert("write".to_string(), id("WR"));
    let _ = request_translations.insert("all-bank-refresh".to_string(), id("REFab"));
    let _ = request_translations.insert("victim-row-refresh".to_string(), id("VRR"));
    let _ = request_translations.insert("rfm".to_string(), id("RFMab"));
    let _ = request_translations.insert("directed-rfm".to_string(), id("DRFMab"));
    let _ = request_translations.insert("open-row".to_string(), act_issue_id);
    let _ = request_translations.insert("close-row".to_string(), id("PRE"));
    if standard.has_bankgroup() {
        let _ = request_translations.insert("same-bank-refresh".to_string(), id("REFsb"));
        let _ = request_translations.insert("rfm-same-bank".to_string(), id("RFMsb"));
        let _ = request_translations.insert("directed-rfm-same-bank".to_string(), id("DRFMsb"));
        let _ = request_translations.insert("reduced-rfm-same-bank".to_string(), id("RRFMsb"));
    }

    let _ = speed.nrefi_cycles(); // surfaced via RefreshManager construction, not stored here.

    Ok(DeviceSpec {
        name: format!("{standard:?}"),
        org,
        commands,
        command_meta,
        timing,
        request_translations,
    })
}

/// `nREFI`, in memory cycles, for a given speed preset — exposed
/// separately since the refresh manager (not the device spec) owns the
/// periodic-injection clock.
#[must_use]
pub fn nrefi_cycles(speed: SpeedParams) -> i64 {
    speed.nrefi_cycles()
}

/// DDR4_8Gb_x8 organization.
#[must_use]
pub fn ddr4_8gb_x8_org() -> OrgPreset {
    OrgPreset {
        ranks: 1,
        bankgroups: 4,
        pseudochannels: 1,
        banks: 4,
        rows: 65536,
        columns: 1024,
        dq_width: 8,
        density_mb: 8192,
    }
}

/// DDR4 @ 2133 MT/s (1066 MHz clock, tCK ≈ 938 ps) speed preset, timings
/// per standard DDR4-2133 JEDEC values in memory cycles.
#[must_use]
pub fn ddr4_2133() -> SpeedParams {
    SpeedParams {
        tck_ps: 938,
        n_rcd: 15,
        n_rp: 15,
        n_ras: 35,
        n_ccd_l: 6,
        n_ccd_s: 4,
        n_rrd_l: 6,
        n_rrd_s: 4,
        n_faw: 26,
        n_cl: 15,
        n_cwl: 11,
        n_wr: 16,
        n_wtr: 8,
        n_bl: 4,
        nrefi_ns: 7800.0,
        n_rfc: 350,
        n_rfcsb: 160,
        n_rfm: 0,
        read_latency: 15 + 4,
    }
}

/// DDR4 @ 3200 MT/s (tCK = 625 ps), used by the nCCDS boundary-behavior scenario.
#[must_use]
pub fn ddr4_3200() -> SpeedParams {
    SpeedParams {
        tck_ps: 625,
        n_rcd: 22,
        n_rp: 22,
        n_ras: 52,
        n_ccd_l: 8,
        n_ccd_s: 8,
        n_rrd_l: 8,
        n_rrd_s: 6,
        n_faw: 32,
        n_cl: 22,
        n_cwl: 16,
        n_wr: 24,
        n_wtr: 12,
        n_bl: 4,
        nrefi_ns: 7800.0,
        n_rfc: 528,
        n_rfcsb: 240,
        n_rfm: 0,
        read_latency: 22 + 4,
    }
}

/// DDR5_8Gb_x4 organization (bank groups of 8, 4 banks each).
#[must_use]
pub fn ddr5_8gb_x4_org() -> OrgPreset {
    OrgPreset {
        ranks: 1,
        bankgroups: 8,
        pseudochannels: 1,
        banks: 4,
        rows: 131072,
        columns: 1024,
        dq_width: 4,
        density_mb: 8192,
    }
}

/// DDR5 @ 4800 MT/s speed preset.
#[must_use]
pub fn ddr5_4800() -> SpeedParams {
    SpeedParams {
        tck_ps: 417,
        n_rcd: 34,
        n_rp: 34,
        n_ras: 76,
        n_ccd_l: 8,
        n_ccd_s: 6,
        n_rrd_l: 8,
        n_rrd_s: 6,
        n_faw: 32,
        n_cl: 34,
        n_cwl: 30,
        n_wr: 48,
        n_wtr: 12,
        n_bl: 4,
        nrefi_ns: 3900.0,
        n_rfc: 410,
        n_rfcsb: 210,
        n_rfm: 196,
        read_latency: 34 + 4,
    }
}

/// DDR3_8Gb_x8 organization — simplified (no bank groups).
#[must_use]
pub fn ddr3_8gb_x8_org() -> OrgPreset {
    OrgPreset {
        ranks: 1,
        bankgroups: 1,
        pseudochannels: 1,
        banks: 8,
        rows: 65536,
        columns: 1024,
        dq_width: 8,
        density_mb: 8192,
    }
}

/// DDR3 @ 1600 MT/s speed preset — approximate, for regression/smoke
/// testing rather than JEDEC-certified fidelity.
#[must_use]
pub fn ddr3_1600() -> SpeedParams {
    SpeedParams {
        tck_ps: 1250,
        n_rcd: 11,
        n_rp: 11,
        n_ras: 28,
        n_ccd_l: 4,
        n_ccd_s: 4,
        n_rrd_l: 5,
        n_rrd_s: 5,
        n_faw: 20,
        n_cl: 11,
        n_cwl: 8,
        n_wr: 12,
        n_wtr: 6,
        n_bl: 4,
        nrefi_ns: 7800.0,
        n_rfc: 208,
        n_rfcsb: 208,
        n_rfm: 0,
        read_latency: 11 + 4,
    }
}

/// LPDDR5_6Gb_x16 organization — simplified, no bank groups.
#[must_use]
pub fn lpddr5_6gb_x16_org() -> OrgPreset {
    OrgPreset {
        ranks: 1,
        bankgroups: 1,
        pseudochannels: 1,
        banks: 8,
        rows: 32768,
        columns: 2048,
        dq_width: 16,
        density_mb: 6144,
    }
}

/// LPDDR5 @ 6400 MT/s speed preset — approximate; two-phase activate and
/// CAS-sync are modeled (see `Standard::two_phase_act`/`cas_sync`), but
/// the exact per-phase timing split is a reasonable approximation rather
/// than a JEDEC-certified figure.
#[must_use]
pub fn lpddr5_6400() -> SpeedParams {
    SpeedParams {
        tck_ps: 312,
        n_rcd: 18,
        n_rp: 18,
        n_ras: 42,
        n_ccd_l: 8,
        n_ccd_s: 8,
        n_rrd_l: 8,
        n_rrd_s: 8,
        n_faw: 48,
        n_cl: 17,
        n_cwl: 4,
        n_wr: 24,
        n_wtr: 10,
        n_bl: 16,
        nrefi_ns: 3900.0,
        n_rfc: 280,
        n_rfcsb: 280,
        n_rfm: 0,
        read_latency: 17 + 4,
    }
}

/// HBM2_8Gb organization — two pseudo-channels per rank, no bank groups.
#[must_use]
pub fn hbm2_8gb_org() -> OrgPreset {
    OrgPreset {
        ranks: 1,
        bankgroups: 1,
        pseudochannels: 2,
        banks: 8,
        rows: 16384,
        columns: 1024,
        dq_width: 128,
        density_mb: 8192,
    }
}

/// HBM2 @ 2000 MT/s speed preset — approximate.
#[must_use]
pub fn hbm2_2000() -> SpeedParams {
    SpeedParams {
        tck_ps: 1000,
        n_rcd: 14,
        n_rp: 14,
        n_ras: 33,
        n_ccd_l: 2,
        n_ccd_s: 2,
        n_rrd_l: 4,
        n_rrd_s: 4,
        n_faw: 16,
        n_cl: 14,
        n_cwl: 4,
        n_wr: 14,
        n_wtr: 4,
        n_bl: 2,
        nrefi_ns: 3900.0,
        n_rfc: 160,
        n_rfcsb: 160,
        n_rfm: 0,
        read_latency: 14 + 2,
    }
}

/// GDDR6_8Gb organization — bank groups plus pseudo-channel, per-device.
#[must_use]
pub fn gddr6_8gb_org() -> OrgPreset {
    OrgPreset {
        ranks: 1,
        bankgroups: 4,
        pseudochannels: 2,
        banks: 4,
        rows: 65536,
        columns: 512,
        dq_width: 16,
        density_mb: 8192,
    }
}

/// GDDR6 @ 16000 MT/s speed preset — approximate.
#[must_use]
pub fn gddr6_16000() -> SpeedParams {
    SpeedParams {
        tck_ps: 125,
        n_rcd: 36,
        n_rp: 36,
        n_ras: 76,
        n_ccd_l: 4,
        n_ccd_s: 2,
        n_rrd_l: 8,
        n_rrd_s: 6,
        n_faw: 40,
        n_cl: 36,
        n_cwl: 18,
        n_wr: 40,
        n_wtr: 8,
        n_bl: 4,
        nrefi_ns: 3900.0,
        n_rfc: 420,
        n_rfcsb: 210,
        n_rfm: 0,
        read_latency: 36 + 4,
    }
}

/// Resolve a `"<standard>_<density>"` organization name (e.g.
/// `"DDR4_8Gb_x8"`) and a `"<speed> MT/s"` name (e.g. `"2133"`) to the
/// `(Standard, OrgPreset, SpeedParams)` triple `build` needs. This is the
/// one string-keyed lookup in the whole module: it runs once, at
/// configuration time, never on a per-cycle path.
pub fn resolve_preset(org_name: &str, speed_name: &str) -> Result<(Standard, OrgPreset, SpeedParams), ConfigError> {
    let (standard, org) = match org_name {
        "DDR3_8Gb_x8" => (Standard::Ddr3, ddr3_8gb_x8_org()),
        "DDR4_8Gb_x8" => (Standard::Ddr4, ddr4_8gb_x8_org()),
        "DDR5_8Gb_x4" => (Standard::Ddr5, ddr5_8gb_x4_org()),
        "LPDDR5_6Gb_x16" => (Standard::Lpddr5, lpddr5_6gb_x16_org()),
        "HBM2_8Gb" => (Standard::Hbm2, hbm2_8gb_org()),
        "GDDR6_8Gb" => (Standard::Gddr6, gddr6_8gb_org()),
        other => return Err(ConfigError::UnknownPreset(other.to_string())),
    };
    let speed = match (standard, speed_name) {
        (Standard::Ddr3, "1600") => ddr3_1600(),
        (Standard::Ddr4, "2133") => ddr4_2133(),
        (Standard::Ddr4, "3200") => ddr4_3200(),
        (Standard::Ddr5, "4800") => ddr5_4800(),
        (Standard::Lpddr5, "6400") => lpddr5_6400(),
        (Standard::Hbm2, "2000") => hbm2_2000(),
        (Standard::Gddr6, "16000") => gddr6_16000(),
        (_, other) => return Err(ConfigError::UnknownPreset(format!("{org_name} @ {other}"))),
    };
    Ok((standard, org, speed))
}
