//! Plugin contract and the registration-ordered chain the controller
//! drives each cycle.
//!
//! Per the redesign notes, the plugin chain stays a small dyn-dispatched
//! list — unlike scheduler/refresh-manager/row-policy, which collapsed to
//! tagged unions, the mitigation schemes are numerous, independently
//! developed, and genuinely heterogeneous in state shape, so a trait
//! object list is the right fit here. The chain lives outside the
//! scheduler's hot path: side-channel queries (`is_act_safe`,
//! `next_recovery_cycle`, `is_blacklisted`) are resolved once per
//! candidate scan, not re-derived per plugin per candidate.

use crate::dram::Device;
use crate::mapper::RowIndirectionTable;

use super::request::Request;

/// One pluggable RowHammer mitigation scheme or passive observer.
///
/// Every plugin implements `update`; the side-channel methods default to
/// "no opinion" and are overridden only by the plugins that offer that
/// particular scheduler hint (BlockHammer, PRAC, BLISS respectively).
pub trait ControllerPlugin: std::fmt::Debug + Send {
    /// Human-readable implementation name, used in stats emission.
    fn name(&self) -> &'static str;

    /// Called once per cycle, after scheduling and before issue. `req` is
    /// the candidate about to be issued (if `request_found`); the plugin
    /// may mutate only its scratchpad, observe state, or enqueue new
    /// priority requests via `sink`.
    fn update(&mut self, request_found: bool, req: Option<&mut Request>, ctx: &mut PluginContext<'_>);

    /// Called once at the end of the simulation; passive plugins flush to
    /// a file here.
    fn finalize(&mut self) {}

    /// BlockHammer safety side-channel: whether activating `req` right now
    /// is safe. Default: always safe (every plugin that isn't BlockHammer
    /// has no opinion).
    fn is_act_safe(&self, _req: &Request, _device: &Device) -> bool {
        true
    }

    /// PRAC side-channel: the next cycle at which an alert-driven recovery
    /// window begins, if one is pending.
    fn next_recovery_cycle(&self) -> Option<i64> {
        None
    }

    /// BLISS side-channel: whether `source_id` is currently blacklisted.
    fn is_blacklisted(&self, _source_id: i64) -> bool {
        false
    }

    /// Per-cycle bookkeeping independent of whether a request was
    /// scheduled this cycle (BLISS streak decay, PRAC's state-machine
    /// advance). Called once per cycle, before scheduling.
    fn tick(&mut self, _clk: i64) {}

    /// PRAC's alert back-off request: when the internal alert state
    /// machine enters `PRE_RECOVERY`, this returns the injection the
    /// controller must place directly into the ABO buffer (a `PREA`
    /// followed by a configured number of `RFMab`), bypassing the normal
    /// priority-buffer path. Default: never requests ABO injection.
    fn take_abo_injection(&mut self) -> Option<AboInjection> {
        None
    }

    /// Stat key/value pairs this plugin contributes to its `StatBlock` at
    /// finalize (e.g. total injections, current blacklist size). Default:
    /// no extra values beyond the plugin's name.
    fn extra_stats(&self) -> Vec<(&'static str, f64)> {
        Vec::new()
    }
}

/// A PRAC alert-driven ABO-buffer injection: one `PREA` per rank followed
/// by `rfmab_count` `RFMab` commands.
#[derive(Debug, Clone, Copy)]
pub struct AboInjection {
    /// Number of `RFMab` commands to follow the `PREA`.
    pub rfmab_count: usize,
}

/// What a plugin's `update` is given access to beyond the candidate
/// request: the device (read-only observation) and a sink for
/// priority-buffer injection.
pub struct PluginContext<'a> {
    /// Device, for read-only state observation (e.g. row-buffer state for
    /// counter-based trackers).
    pub device: &'a Device,
    /// Current memory-domain clock.
    pub clk: i64,
    /// Requests this plugin wants injected into the priority buffer this
    /// cycle. Each must successfully enqueue or the controller raises a
    /// fatal priority-buffer overflow (§4.7 plugin failure policy).
    pub injected: &'a mut Vec<Request>,
    /// This channel's row-indirection table, shared with the address
    /// mapper: row-swap plugins (RRS, AQUA) mutate it directly here; the
    /// mapper only ever reads it.
    pub rit: &'a mut RowIndirectionTable,
}

/// The registration-ordered list of plugins a controller drives.
#[derive(Debug, Default)]
pub struct PluginChain {
    plugins: Vec<Box<dyn ControllerPlugin>>,
}

impl PluginChain {
    /// An empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    /// Register a plugin; registration order is the `update` invocation order.
    pub fn register(&mut self, plugin: Box<dyn ControllerPlugin>) {
        self.plugins.push(plugin);
    }

    /// Drive every plugin's `update` in registration order.
    pub fn update_all(
        &mut self,
        request_found: bool,
        mut req: Option<&mut Request>,
        device: &Device,
        clk: i64,
        injected: &mut Vec<Request>,
        rit: &mut RowIndirectionTable,
    ) {
        for plugin in &mut self.plugins {
            let mut ctx = PluginContext { device, clk, injected, rit };
            plugin.update(request_found, req.as_deref_mut(), &mut ctx);
        }
    }

    /// Run every plugin's `finalize`.
    pub fn finalize_all(&mut self) {
        for plugin in &mut self.plugins {
            plugin.finalize();
        }
    }

    /// Drive every plugin's per-cycle bookkeeping tick.
    pub fn tick_all(&mut self, clk: i64) {
        for plugin in &mut self.plugins {
            plugin.tick(clk);
        }
    }

    /// Collect any pending PRAC ABO injections (ordinarily at most one).
    pub fn drain_abo_injections(&mut self) -> Vec<AboInjection> {
        self.plugins.iter_mut().filter_map(|p| p.take_abo_injection()).collect()
    }

    /// Whether every plugin agrees `req` is safe to activate (BlockHammer's gate).
    #[must_use]
    pub fn is_act_safe(&self, req: &Request, device: &Device) -> bool {
        self.plugins.iter().all(|p| p.is_act_safe(req, device))
    }

    /// Earliest pending recovery cycle across every plugin that has one.
    #[must_use]
    pub fn next_recovery_cycle(&self) -> Option<i64> {
        self.plugins.iter().filter_map(|p| p.next_recovery_cycle()).min()
    }

    /// Whether any plugin blacklists `source_id`.
    #[must_use]
    pub fn is_blacklisted(&self, source_id: i64) -> bool {
        self.plugins.iter().any(|p| p.is_blacklisted(source_id))
    }

    /// Iterate registered plugins for stats emission.
    pub fn iter(&self) -> impl Iterator<Item = &Box<dyn ControllerPlugin>> {
        self.plugins.iter()
    }
}
