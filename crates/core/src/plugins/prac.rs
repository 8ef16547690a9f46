//! PRAC: Per-Row Activation Counting with alert-back-off (§4.7.6). Tracks
//! per-row activation counts per bank; when any row crosses
//! `abo_threshold`, the controller is walked through a
//! normal → pre-recovery → recovery → delay → normal state machine that
//! injects a `PREA` and a burst of `RFMab` via the ABO buffer and then
//! holds off the next `abo_delay_acts` activates.

use std::collections::HashMap;

use crate::config::PluginConfig;
use crate::controller::{AboInjection, ControllerPlugin, PluginContext, Request};
use crate::dram::{Clock, Device};
use crate::error::ConfigError;

use super::{is_activate, DeviceTopology};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AboState {
    Normal,
    PreRecovery,
    Recovery,
    Delay,
}

#[derive(Debug, Default, Clone)]
struct BankCounters {
    counts: HashMap<i64, u32>,
    critical: HashMap<i64, u32>,
}

impl BankCounters {
    fn is_critical(&self) -> bool {
        !self.critical.is_empty()
    }

    fn on_act(&mut self, row: i64, threshold: u32) -> bool {
        let count = self.counts.entry(row).or_insert(0);
        *count += 1;
        if *count >= threshold {
            let _ = self.critical.insert(row, *count);
            return true;
        }
        false
    }

    fn on_rfm(&mut self) {
        let Some((&row, _)) = self.counts.iter().max_by_key(|(_, c)| **c) else { return };
        let _ = self.counts.insert(row, 0);
        let _ = self.critical.remove(&row);
    }
}

/// Per-row activation counter with alert-driven back-off recovery.
#[derive(Debug)]
pub struct Prac {
    topology: DeviceTopology,
    banks: Vec<BankCounters>,
    abo_threshold: u32,
    abo_recovery_refs: u32,
    abo_delay_acts: u32,
    abo_act_cycles: Clock,
    state: AboState,
    recovery_start: Option<Clock>,
    recov_rem_refs: u32,
    delay_rem_acts: u32,
    is_abo_needed: bool,
    pending_injection: bool,
    total_recoveries: u64,
}

impl Prac {
    /// Build from a device and its configuration entry. `abo_threshold`
    /// (default 512) is the per-row activation count that trips the
    /// alert; `abo_recovery_refs` (default 4) is the `RFMab` burst size
    /// per rank; `abo_delay_acts` (default 4) is the post-recovery
    /// activate count before re-arming; `abo_act_ns` (default 180) sets
    /// the pre-recovery window in nanoseconds, converted via `tck_ps`.
    pub fn new(device: &Device, cfg: &PluginConfig) -> Result<Self, ConfigError> {
        let topology = DeviceTopology::from_device(device);
        let abo_threshold = cfg.u64_or("abo_threshold", 512) as u32;
        let abo_recovery_refs = cfg.u64_or("abo_recovery_refs", 4) as u32;
        let abo_delay_acts = cfg.u64_or("abo_delay_acts", 4) as u32;
        let abo_act_ns = cfg.f64_or("abo_act_ns", 180.0);
        let tck_ps = cfg.f64_or("tck_ps", 500.0);
        let abo_act_cycles = (abo_act_ns * 1000.0 / tck_ps) as Clock;
        Ok(Self {
            banks: vec![BankCounters::default(); topology.num_banks],
            topology,
            abo_threshold,
            abo_recovery_refs,
            abo_delay_acts,
            abo_act_cycles,
            state: AboState::Normal,
            recovery_start: None,
            recov_rem_refs: 0,
            delay_rem_acts: 0,
            is_abo_needed: false,
            pending_injection: false,
            total_recoveries: 0,
        })
    }

    fn advance_state(&mut self, clk: Clock) {
        match self.state {
            AboState::Normal => {
                if self.is_abo_needed {
                    self.state = AboState::PreRecovery;
                    self.recovery_start = Some(clk + self.abo_act_cycles);
                    self.pending_injection = true;
                    self.total_recoveries += 1;
                }
            }
            AboState::PreRecovery => {
                if self.recovery_start == Some(clk) {
                    self.state = AboState::Recovery;
                    self.recovery_start = None;
                    self.recov_rem_refs = self.abo_recovery_refs * self.topology.num_ranks.max(1) as u32;
                }
            }
            AboState::Recovery | AboState::Delay => {}
        }
    }
}

impl ControllerPlugin for Prac {
    fn name(&self) -> &'static str {
        "prac"
    }

    fn tick(&mut self, clk: Clock) {
        self.advance_state(clk);
    }

    fn update(&mut self, request_found: bool, req: Option<&mut Request>, ctx: &mut PluginContext<'_>) {
        if request_found {
            if let Some(req) = &req {
                let wk = ctx.device.well_known;
                match self.state {
                    AboState::Recovery if Some(req.command) == wk.rfmab || Some(req.command) == wk.rfmsb => {
                        self.recov_rem_refs = self.recov_rem_refs.saturating_sub(1);
                        if self.recov_rem_refs == 0 {
                            self.state = AboState::Delay;
                            self.delay_rem_acts = self.abo_delay_acts;
                        }
                    }
                    AboState::Delay if Some(req.command) == wk.act || Some(req.command) == wk.act1 => {
                        self.delay_rem_acts = self.delay_rem_acts.saturating_sub(1);
                        if self.delay_rem_acts == 0 {
                            self.is_abo_needed = self.banks.iter().any(BankCounters::is_critical);
                            self.state = AboState::Normal;
                        }
                    }
                    _ => {}
                }
            }
        }

        let Some(req) = req else { return };
        if !request_found {
            return;
        }
        let wk = ctx.device.well_known;
        let is_rfm = Some(req.command) == wk.rfmab || Some(req.command) == wk.rfmsb;
        if is_activate(ctx.device, req.command) {
            let bank = self.topology.flatten_bank(&req.addr_vec);
            let row = self.topology.row_of(&req.addr_vec);
            if self.banks[bank].on_act(row, self.abo_threshold) {
                self.is_abo_needed = true;
            }
        } else if is_rfm {
            let bank = self.topology.flatten_bank(&req.addr_vec);
            self.banks[bank].on_rfm();
        }
    }

    fn next_recovery_cycle(&self) -> Option<Clock> {
        self.recovery_start
    }

    fn take_abo_injection(&mut self) -> Option<AboInjection> {
        if self.pending_injection {
            self.pending_injection = false;
            Some(AboInjection { rfmab_count: self.abo_recovery_refs as usize })
        } else {
            None
        }
    }

    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        vec![("num_recovery", self.total_recoveries as f64)]
    }
}
