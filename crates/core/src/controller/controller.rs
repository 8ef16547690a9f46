//! The per-channel memory controller: request admission, write-forwarding,
//! the per-cycle scheduling algorithm (§4.2), and finalize stats.

use std::collections::VecDeque;

use crate::dram::{AddrVec, Clock, Device, Level};
use crate::error::SimError;
use crate::mapper::RowIndirectionTable;
use crate::stats::{StatBlock, Stats};

use super::plugin::{AboInjection, PluginChain};
use super::refresh::RefreshManager;
use super::request::{Callback, ReqBuffer, Request};
use super::rowpolicy::RowPolicy;
use super::scheduler::Scheduler;

/// Which request buffer a scheduled command was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    Active,
    Abo,
    Priority,
    Read,
    Write,
}

/// The five request buffers a controller juggles each cycle, grouped so
/// that selecting one by [`BufferKind`] only ever borrows this struct, not
/// the device/scheduler/plugin state sitting alongside it on [`Controller`].
#[derive(Debug, Default)]
struct Buffers {
    active: ReqBuffer,
    abo: ReqBuffer,
    priority: ReqBuffer,
    read: ReqBuffer,
    write: ReqBuffer,
}

impl Buffers {
    fn get(&self, kind: BufferKind) -> &ReqBuffer {
        match kind {
            BufferKind::Active => &self.active,
            BufferKind::Abo => &self.abo,
            BufferKind::Priority => &self.priority,
            BufferKind::Read => &self.read,
            BufferKind::Write => &self.write,
        }
    }

    fn get_mut(&mut self, kind: BufferKind) -> &mut ReqBuffer {
        match kind {
            BufferKind::Active => &mut self.active,
            BufferKind::Abo => &mut self.abo,
            BufferKind::Priority => &mut self.priority,
            BufferKind::Read => &mut self.read,
            BufferKind::Write => &mut self.write,
        }
    }
}

/// One channel's memory controller: owns the device, the request buffers,
/// and the pluggable scheduler/refresh-manager/row-policy/plugin-chain
/// quartet, and drives all of it through one `tick` per memory cycle.
#[derive(Debug)]
pub struct Controller {
    /// Channel index this controller serves, for stats and error reporting.
    pub channel: usize,
    /// The device tree and timing engine.
    pub device: Device,
    buffers: Buffers,
    /// Reads that have been issued and are waiting out their access latency
    /// before their callback fires; ordered by `depart` since requests
    /// complete in issue order.
    pending: VecDeque<Request>,
    /// Scheduling strategy.
    pub scheduler: Scheduler,
    /// Refresh strategy.
    pub refresh: RefreshManager,
    /// Row-buffer management strategy.
    pub row_policy: RowPolicy,
    /// Registered mitigation/observer plugins.
    pub plugins: PluginChain,
    /// This channel's row-indirection table, shared between the address
    /// mapper (reader, outside this struct) and row-swap plugins (writer).
    pub rit: RowIndirectionTable,
    is_write_mode: bool,
    watermark_low: usize,
    watermark_high: usize,
    read_latency: Clock,
    final_read: usize,
    final_write: usize,
    next_id: u64,
}

impl Controller {
    /// Build a controller. `read_capacity`/`write_capacity` bound the read
    /// and write buffers; the priority and active buffers are effectively
    /// unbounded (the scheduler only ever holds one in-flight row per bank
    /// in the active buffer in practice). `watermark_low`/`watermark_high`
    /// are absolute request counts in the write buffer at which write mode
    /// turns off/on (§4.2).
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel: usize,
        device: Device,
        scheduler: Scheduler,
        refresh: RefreshManager,
        row_policy: RowPolicy,
        plugins: PluginChain,
        rit: RowIndirectionTable,
        read_capacity: usize,
        write_capacity: usize,
        watermark_low: usize,
        watermark_high: usize,
        read_latency: Clock,
    ) -> Result<Self, SimError> {
        let final_read = device
            .spec
            .request_translations
            .get("read")
            .copied()
            .unwrap_or(0);
        let final_write = device
            .spec
            .request_translations
            .get("write")
            .copied()
            .unwrap_or(0);
        Ok(Self {
            channel,
            device,
            buffers: Buffers {
                active: ReqBuffer::unbounded(),
                abo: ReqBuffer::unbounded(),
                priority: ReqBuffer::unbounded(),
                read: ReqBuffer::bounded(read_capacity),
                write: ReqBuffer::bounded(write_capacity),
            },
            pending: VecDeque::new(),
            scheduler,
            refresh,
            row_policy,
            plugins,
            rit,
            is_write_mode: false,
            watermark_low,
            watermark_high,
            read_latency,
            final_read,
            final_write,
            next_id: 0,
        })
    }

    /// Whether the write buffer currently has room for another request.
    #[must_use]
    pub fn can_accept_write(&self) -> bool {
        self.buffers.write.has_room()
    }

    /// Whether the read buffer currently has room for another request.
    #[must_use]
    pub fn can_accept_read(&self) -> bool {
        self.buffers.read.has_room()
    }

    /// Whether every buffer and the pending-read queue is empty: no more
    /// work is in flight on this channel.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
            && self.buffers.read.requests.is_empty()
            && self.buffers.write.requests.is_empty()
            && self.buffers.priority.requests.is_empty()
            && self.buffers.active.requests.is_empty()
            && self.buffers.abo.requests.is_empty()
    }

    /// Admit an external request. Returns `false` (not an error) if the
    /// target buffer has no room — the simulated-world backpressure
    /// condition the frontend retries against next cycle.
    ///
    /// A read whose address exactly matches a request already sitting in
    /// the write buffer is forwarded directly: it departs next cycle
    /// without ever touching the device, since the write it would read
    /// back has not yet been issued either.
    pub fn send(
        &mut self,
        is_read: bool,
        addr_vec: AddrVec,
        source_id: i64,
        clk: Clock,
        callback: Option<Callback>,
    ) -> bool {
        if is_read {
            if self.buffers.write.requests.iter().any(|r| r.addr_vec == addr_vec) {
                let id = self.next_id;
                self.next_id += 1;
                let mut req = Request::new(id, addr_vec, "read".to_string(), self.final_read, source_id, clk, true);
                req.depart = Some(clk + 1);
                req.callback = callback;
                self.pending.push_back(req);
                return true;
            }
            if !self.buffers.read.has_room() {
                return false;
            }
            let id = self.next_id;
            self.next_id += 1;
            let mut req = Request::new(id, addr_vec, "read".to_string(), self.final_read, source_id, clk, true);
            req.callback = callback;
            self.buffers.read.push(req)
        } else {
            if !self.buffers.write.has_room() {
                return false;
            }
            let id = self.next_id;
            self.next_id += 1;
            let mut req = Request::new(id, addr_vec, "write".to_string(), self.final_write, source_id, clk, false);
            req.callback = callback;
            self.buffers.write.push(req)
        }
    }

    /// Advance the controller by one memory cycle: the full §4.2 algorithm.
    pub fn tick(&mut self, clk: Clock) -> Result<(), SimError> {
        self.device.tick(clk);
        self.serve_completed_reads(clk);

        self.refresh.tick(clk, &mut self.buffers.priority)?;
        self.plugins.tick_all(clk);

        for injection in self.plugins.drain_abo_injections() {
            self.inject_abo(injection, clk);
        }

        self.update_write_mode();

        let chosen = self.select_candidate(clk);
        let (request_found, committed) = match chosen {
            Some((kind, idx)) => {
                let req = &self.buffers.get(kind).requests[idx];
                let ready = self.device.check_ready(req.command, &req.addr_vec, clk);
                (ready, ready.then_some((kind, idx)))
            }
            None => (false, None),
        };

        let mut injected = Vec::new();
        {
            let req_mut = committed.map(|(kind, idx)| &mut self.buffers.get_mut(kind).requests[idx]);
            self.plugins.update_all(request_found, req_mut, &self.device, clk, &mut injected, &mut self.rit);
        }
        for req in injected {
            if !self.buffers.priority.push(req) {
                return Err(SimError::PriorityBufferFull {
                    channel: self.channel,
                    capacity: self.buffers.priority.capacity.unwrap_or(0),
                });
            }
        }

        let Some((kind, idx)) = committed else { return Ok(()) };
        self.issue_selected(kind, idx, clk)
    }

    fn serve_completed_reads(&mut self, clk: Clock) {
        while let Some(req) = self.pending.front() {
            if req.depart.is_none_or(|d| d > clk) {
                break;
            }
            let mut req = self.pending.pop_front().expect("front checked Some above");
            if let Some(mut cb) = req.callback.take() {
                cb(&req);
            }
        }
    }

    fn update_write_mode(&mut self) {
        let writes = self.buffers.write.requests.len();
        let reads_empty = self.buffers.read.requests.is_empty();
        if writes >= self.watermark_high || reads_empty {
            self.is_write_mode = true;
        } else if writes < self.watermark_low {
            self.is_write_mode = false;
        }
    }

    fn select_candidate(&mut self, clk: Clock) -> Option<(BufferKind, usize)> {
        let scheduler = self.scheduler;
        let empty = ReqBuffer::unbounded();

        if !self.buffers.active.requests.is_empty() {
            if let Some(sel) = scheduler.select(&mut self.buffers.active, &self.device, clk, &self.plugins, &empty) {
                return Some((BufferKind::Active, sel.index));
            }
        }
        if !self.buffers.abo.requests.is_empty() {
            if let Some(sel) = scheduler.select(&mut self.buffers.abo, &self.device, clk, &self.plugins, &self.buffers.active) {
                return Some((BufferKind::Abo, sel.index));
            }
        }
        if !self.buffers.priority.requests.is_empty() {
            if let Some(sel) = scheduler.select(&mut self.buffers.priority, &self.device, clk, &self.plugins, &self.buffers.active) {
                return Some((BufferKind::Priority, sel.index));
            }
        }

        let order = if self.is_write_mode {
            [BufferKind::Write, BufferKind::Read]
        } else {
            [BufferKind::Read, BufferKind::Write]
        };
        for kind in order {
            let sel = match kind {
                BufferKind::Read if !self.buffers.read.requests.is_empty() => {
                    scheduler.select(&mut self.buffers.read, &self.device, clk, &self.plugins, &self.buffers.active)
                }
                BufferKind::Write if !self.buffers.write.requests.is_empty() => {
                    scheduler.select(&mut self.buffers.write, &self.device, clk, &self.plugins, &self.buffers.active)
                }
                _ => None,
            };
            if let Some(sel) = sel {
                return Some((kind, sel.index));
            }
        }
        None
    }

    fn issue_selected(&mut self, kind: BufferKind, idx: usize, clk: Clock) -> Result<(), SimError> {
        let cmd = self.buffers.get(kind).requests[idx].command;
        let addr_vec = self.buffers.get(kind).requests[idx].addr_vec.clone();
        let final_command = self.buffers.get(kind).requests[idx].final_command;
        let is_opening = self.device.spec.command_meta[cmd].is_opening;

        self.device.issue_command(cmd, &addr_vec, clk)?;
        self.row_policy.on_issue(&self.device, cmd, &addr_vec, clk, &mut self.buffers.priority)?;

        if cmd == final_command {
            let mut req = self.buffers.get_mut(kind).remove(idx);
            if req.is_read {
                req.depart = Some(clk + self.read_latency);
                self.pending.push_back(req);
            } else if let Some(mut cb) = req.callback.take() {
                req.depart = Some(clk);
                cb(&req);
            }
        } else if is_opening && kind != BufferKind::Active {
            let req = self.buffers.get_mut(kind).remove(idx);
            let _ = self.buffers.active.push(req);
        } else {
            self.buffers.get_mut(kind).requests[idx].command = cmd;
        }
        Ok(())
    }

    /// Per §4.7.5: one `PREA` per rank followed by `rfmab_count` `RFMab`
    /// commands for that same rank, placed directly into the ABO buffer.
    fn inject_abo(&mut self, injection: AboInjection, clk: Clock) {
        let wk = self.device.well_known;
        let addr_len = self.device.spec.org.levels.len();
        let rank_pos = self.device.spec.org.levels.iter().position(|l| *l == Level::Rank);
        let num_ranks = self.device.spec.org.fanout_at(Level::Rank);

        for rank in 0..num_ranks {
            let mut addr_vec = AddrVec::wildcard(addr_len);
            if let Some(pos) = rank_pos {
                addr_vec.0[pos] = rank as i64;
            }
            if let Some(prea) = wk.prea {
                let id = self.next_id;
                self.next_id += 1;
                let req = Request::new(id, addr_vec.clone(), "prac-prea".to_string(), prea, -1, clk, false);
                let _ = self.buffers.abo.push(req);
            }
            if let Some(rfmab) = wk.rfmab {
                for _ in 0..injection.rfmab_count {
                    let id = self.next_id;
                    self.next_id += 1;
                    let req = Request::new(id, addr_vec.clone(), "prac-rfmab".to_string(), rfmab, -1, clk, false);
                    let _ = self.buffers.abo.push(req);
                }
            }
        }
    }
}

impl Stats for Controller {
    fn stats(&self) -> StatBlock {
        let mut block = StatBlock::new("controller", "generic_dram_controller", Some(self.channel))
            .with("read_buffer_len", self.buffers.read.requests.len() as f64)
            .with("write_buffer_len", self.buffers.write.requests.len() as f64)
            .with("priority_buffer_len", self.buffers.priority.requests.len() as f64)
            .with("active_buffer_len", self.buffers.active.requests.len() as f64)
            .with("pending_len", self.pending.len() as f64)
            .with("is_write_mode", f64::from(u8::from(self.is_write_mode)));
        block.push_child(self.device.stats());
        block.push_child(self.refresh.stats());
        block.push_child(self.row_policy.stats());
        for plugin in self.plugins.iter() {
            let mut child = StatBlock::new("plugin", plugin.name(), None);
            for (key, value) in plugin.extra_stats() {
                child.set(key, value);
            }
            block.push_child(child);
        }
        block
    }
}
