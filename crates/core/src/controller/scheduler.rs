//! Scheduler variants.
//!
//! Per the redesign notes, the interface/implementation duality for
//! schedulers collapses to one tagged union: each variant's comparison is
//! a plain function over two candidate indices, not a virtual dispatch.

use crate::dram::{AddrVec, Clock, Device};

use super::plugin::PluginChain;
use super::request::{ReqBuffer, Request};

/// Scheduler strategy. The active variant recomputes each candidate's
/// `command` via `Device::get_preq_command`, then picks the best by the
/// variant's comparison order (§4.3).
#[derive(Debug, Clone, Copy, Default)]
pub enum Scheduler {
    /// `ready > !ready`, tie-break FCFS by `arrive`.
    #[default]
    Default,
    /// `safe > !safe` (BLISS blacklist), then `ready`, then FCFS.
    Bliss,
    /// BlockHammer safety filter, then default ordering.
    Blocking,
    /// PRAC: `fits_before_next_alert > !fits`, then `ready`, then FCFS.
    Prac,
}

/// Outcome of scanning a buffer for the best candidate.
pub struct Selection {
    /// Index into the buffer's `requests` vector.
    pub index: usize,
}

impl Scheduler {
    /// Recompute `command` for every request in `buffer` against the
    /// current device state, then select the best candidate per this
    /// scheduler's comparison order. Returns `None` if the buffer is
    /// empty or (for `Blocking`) every candidate is unsafe.
    #[must_use]
    pub fn select(
        &self,
        buffer: &mut ReqBuffer,
        device: &Device,
        clk: Clock,
        plugins: &PluginChain,
        active: &ReqBuffer,
    ) -> Option<Selection> {
        for req in &mut buffer.requests {
            req.command = device.get_preq_command(req.final_command, &req.addr_vec);
        }

        let mut best: Option<usize> = None;
        for (i, req) in buffer.requests.iter().enumerate() {
            if matches!(self, Scheduler::Blocking) && !plugins.is_act_safe(req, device) {
                continue;
            }
            if is_closing_command(device, req.command)
                && collides_with_active(active, &req.addr_vec, scope_len(device, req.command))
            {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => self.is_better(req, &buffer.requests[b], device, clk, plugins),
            };
            if better {
                best = Some(i);
            }
        }
        best.map(|index| Selection { index })
    }

    fn is_better(
        &self,
        a: &Request,
        b: &Request,
        device: &Device,
        clk: Clock,
        plugins: &PluginChain,
    ) -> bool {
        match self {
            Scheduler::Default | Scheduler::Blocking => {
                let ra = device.check_ready(a.command, &a.addr_vec, clk);
                let rb = device.check_ready(b.command, &b.addr_vec, clk);
                if ra != rb {
                    return ra;
                }
                a.arrive < b.arrive
            }
            Scheduler::Bliss => {
                let sa = !plugins.is_blacklisted(a.source_id);
                let sb = !plugins.is_blacklisted(b.source_id);
                if sa != sb {
                    return sa;
                }
                let ra = device.check_ready(a.command, &a.addr_vec, clk);
                let rb = device.check_ready(b.command, &b.addr_vec, clk);
                if ra != rb {
                    return ra;
                }
                a.arrive < b.arrive
            }
            Scheduler::Prac => {
                let fits_a = fits_before_next_alert(a, device, clk, plugins);
                let fits_b = fits_before_next_alert(b, device, clk, plugins);
                if fits_a != fits_b {
                    return fits_a;
                }
                let ra = device.check_ready(a.command, &a.addr_vec, clk);
                let rb = device.check_ready(b.command, &b.addr_vec, clk);
                if ra != rb {
                    return ra;
                }
                a.arrive < b.arrive
            }
        }
    }
}

fn fits_before_next_alert(req: &Request, device: &Device, clk: Clock, plugins: &PluginChain) -> bool {
    let Some(next_alert) = plugins.next_recovery_cycle() else { return true };
    let meta = device.spec.command_meta[req.command];
    let min_cycles = meta.deferred_duration.unwrap_or(1).max(1);
    clk + min_cycles < next_alert
}

/// Active-buffer collision rule (§4.2): a closing command is rejected this
/// cycle if any request in `active` shares an address prefix up to the
/// closing command's scope, wildcards counting as a match.
#[must_use]
pub fn collides_with_active(
    active: &ReqBuffer,
    candidate_addr: &AddrVec,
    scope_len: usize,
) -> bool {
    active
        .requests
        .iter()
        .any(|r| r.addr_vec.matches_upto(candidate_addr, scope_len))
}

fn is_closing_command(device: &Device, cmd: usize) -> bool {
    device.spec.command_meta[cmd].is_closing
}

/// Address-vector length spanning channel down to (and including)
/// `cmd`'s scope level, for collision-rule prefix matching.
fn scope_len(device: &Device, cmd: usize) -> usize {
    let scope = device.spec.command_meta[cmd].scope;
    device
        .spec
        .org
        .levels
        .iter()
        .position(|l| *l == scope)
        .map_or(device.spec.org.levels.len(), |i| i + 1)
}
