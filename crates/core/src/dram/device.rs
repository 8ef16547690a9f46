//! The device tree and timing engine: arena construction, prerequisite
//! derivation, readiness checks, and command issue with its timing and
//! state effects.

use tracing::trace;

use crate::error::SimError;
use crate::stats::{StatBlock, Stats};

use super::node::{Node, NodeId, NodeState, RowState};
use super::spec::{DeviceSpec, WellKnownCommands};
use super::types::{AddrVec, Clock, Level};

/// A state-effect deferred past the issuing cycle (DDR5-family refresh and
/// RFM commands, whose "end" action fires `duration` cycles later).
#[derive(Debug, Clone)]
struct FutureAction {
    at: Clock,
    end_cmd: usize,
    addr_vec: AddrVec,
}

/// One DRAM device instance for a single channel: its arena of nodes plus
/// the deferred-action queue described in the timing engine design.
#[derive(Debug, Clone)]
pub struct Device {
    /// Static per-standard description (organization, commands, timing).
    pub spec: DeviceSpec,
    /// Cached ids of well-known JEDEC mnemonics.
    pub well_known: WellKnownCommands,
    /// Node arena; index 0 is always the channel root.
    pub nodes: Vec<Node>,
    /// Levels that own arena nodes, root-to-leaf.
    node_levels: Vec<Level>,
    /// Position of each level within `spec.org.levels` (for addr-vec indexing).
    level_pos: Vec<(Level, usize)>,
    /// Current memory-domain clock.
    pub clk: Clock,
    /// Pending deferred state effects, unordered; scanned each `tick`.
    future_actions: Vec<FutureAction>,
    /// Total commands issued since construction, for stats emission.
    total_issued: u64,
}

impl Device {
    /// Build a device for `spec`, constructing the arena from its organization.
    #[must_use]
    pub fn new(spec: DeviceSpec) -> Self {
        let well_known = spec.well_known();
        let node_levels = spec.org.node_levels();
        let level_pos: Vec<(Level, usize)> = spec
            .org
            .levels
            .iter()
            .enumerate()
            .map(|(i, l)| (*l, i))
            .collect();
        let num_commands = spec.commands.len();

        let mut nodes = vec![Node::new(node_levels[0], 0, num_commands, None)];
        build_children(&mut nodes, NodeId(0), &node_levels, 1, &spec, num_commands);

        Self {
            spec,
            well_known,
            nodes,
            node_levels,
            level_pos,
            clk: 0,
            future_actions: Vec::new(),
            total_issued: 0,
        }
    }

    fn index_of(&self, level: Level) -> Option<usize> {
        self.level_pos.iter().find(|(l, _)| *l == level).map(|(_, i)| *i)
    }

    fn row_of(&self, addr_vec: &AddrVec) -> i64 {
        self.index_of(Level::Row).map_or(-1, |i| addr_vec.0[i])
    }

    fn bank_index_of(&self, addr_vec: &AddrVec) -> i64 {
        self.index_of(Level::Bank).map_or(-1, |i| addr_vec.0[i])
    }

    /// Node ids from the channel root down to (and including) `scope`,
    /// selected by `addr_vec`. `addr_vec` must be fully specified (no
    /// wildcards) from channel down to `scope`.
    fn path_to_scope(&self, addr_vec: &AddrVec, scope: Level) -> Vec<NodeId> {
        let mut path = vec![NodeId(0)];
        let mut current = NodeId(0);
        for level in self.node_levels.iter().skip(1) {
            let pos = self.index_of(*level).expect("tree-node level always present in org.levels");
            let idx = addr_vec.0[pos].max(0) as usize;
            let child_start = self.nodes[current.0].children.start;
            current = NodeId(child_start + idx);
            path.push(current);
            if *level == scope {
                break;
            }
        }
        path
    }

    fn banks_under(&self, node_id: NodeId) -> Vec<NodeId> {
        let node = &self.nodes[node_id.0];
        if node.level == Level::Bank {
            return vec![node_id];
        }
        node.children
            .clone()
            .flat_map(|c| self.banks_under(NodeId(c)))
            .collect()
    }

    fn same_bank_across_bankgroups(&self, rank_id: NodeId, bank_idx: i64) -> Vec<NodeId> {
        self.banks_under(rank_id)
            .into_iter()
            .filter(|b| self.nodes[b.0].index == bank_idx)
            .collect()
    }

    /// Derive the prerequisite command for `cmd` at `addr_vec`: either
    /// `cmd` itself (ready to issue once timing allows) or a replacement
    /// that must be issued first.
    #[must_use]
    pub fn get_preq_command(&self, cmd: usize, addr_vec: &AddrVec) -> usize {
        let meta = self.spec.command_meta[cmd];
        let path = self.path_to_scope(addr_vec, meta.scope);
        for node_id in path {
            let replacement = self.preq_at_node(node_id, cmd, addr_vec);
            if replacement != cmd {
                return replacement;
            }
        }
        cmd
    }

    fn preq_at_node(&self, node_id: NodeId, cmd: usize, addr_vec: &AddrVec) -> usize {
        let node = &self.nodes[node_id.0];
        let meta = self.spec.command_meta[cmd];
        let wk = &self.well_known;
        match node.level {
            Level::Bank => {
                if meta.is_accessing {
                    return match node.state {
                        NodeState::Closed | NodeState::Refreshing => {
                            wk.act1.or(wk.act).unwrap_or(cmd)
                        }
                        NodeState::PreOpened => wk.act2.unwrap_or(cmd),
                        NodeState::Opened => {
                            let row = self.row_of(addr_vec);
                            if node.row_state.contains_key(&row) {
                                cmd
                            } else {
                                wk.pre.unwrap_or(cmd)
                            }
                        }
                        NodeState::PowerUp | NodeState::NotApplicable => cmd,
                    };
                }
                if meta.is_refreshing && node.state == NodeState::Opened {
                    return wk.pre.unwrap_or(cmd);
                }
                cmd
            }
            Level::Rank => {
                if meta.is_accessing && wk.casrd.is_some() {
                    let want_read = Some(cmd) == wk.rd || Some(cmd) == wk.rda;
                    let synced = node.cas_synced_for == Some(want_read);
                    if !synced {
                        return if want_read {
                            wk.casrd.unwrap_or(cmd)
                        } else {
                            wk.caswr.unwrap_or(cmd)
                        };
                    }
                }
                if meta.is_refreshing {
                    let is_all_bank =
                        Some(cmd) == wk.refab || Some(cmd) == wk.rfmab || Some(cmd) == wk.drfmab;
                    let is_same_bank = Some(cmd) == wk.refsb
                        || Some(cmd) == wk.rfmsb
                        || Some(cmd) == wk.drfmsb
                        || Some(cmd) == wk.rrfmsb;
                    if is_all_bank {
                        let all_clear = self.banks_under(node_id).iter().all(|b| {
                            matches!(
                                self.nodes[b.0].state,
                                NodeState::Closed | NodeState::Refreshing
                            )
                        });
                        if !all_clear {
                            return wk.prea.unwrap_or(cmd);
                        }
                    } else if is_same_bank {
                        let bank_idx = self.bank_index_of(addr_vec);
                        let target_clear = self
                            .same_bank_across_bankgroups(node_id, bank_idx)
                            .iter()
                            .all(|b| {
                                matches!(
                                    self.nodes[b.0].state,
                                    NodeState::Closed | NodeState::Refreshing
                                )
                            });
                        if !target_clear {
                            return wk.presb.or(wk.prea).unwrap_or(cmd);
                        }
                    }
                }
                cmd
            }
            _ => cmd,
        }
    }

    /// Whether `cmd` at `addr_vec` may be issued at `clk`: every node from
    /// the root down to the command's scope must have already reached its
    /// `cmd_ready_clk` for `cmd`.
    #[must_use]
    pub fn check_ready(&self, cmd: usize, addr_vec: &AddrVec, clk: Clock) -> bool {
        let meta = self.spec.command_meta[cmd];
        self.path_to_scope(addr_vec, meta.scope)
            .iter()
            .all(|n| clk >= self.nodes[n.0].cmd_ready_clk[cmd])
    }

    /// Whether the bank at `addr_vec` is open to the row named in `addr_vec`.
    #[must_use]
    pub fn check_rowbuffer_hit(&self, addr_vec: &AddrVec) -> bool {
        let path = self.path_to_scope(addr_vec, Level::Bank);
        let Some(bank) = path.last() else { return false };
        let node = &self.nodes[bank.0];
        node.state == NodeState::Opened && node.row_state.contains_key(&self.row_of(addr_vec))
    }

    /// Whether the node named by `addr_vec` at `level` is open (for
    /// `Bank`) or mid-access otherwise.
    #[must_use]
    pub fn check_node_open(&self, addr_vec: &AddrVec, level: Level) -> bool {
        let path = self.path_to_scope(addr_vec, level);
        path.last().is_some_and(|n| self.nodes[n.0].is_open())
    }

    /// Issue `cmd` at `addr_vec` at cycle `clk`: applies timing effects to
    /// every node on the path (and siblings, for sibling-scoped
    /// constraints), then state effects, then enqueues any deferred
    /// end-of-refresh action.
    pub fn issue_command(
        &mut self,
        cmd: usize,
        addr_vec: &AddrVec,
        clk: Clock,
    ) -> Result<(), SimError> {
        let meta = self.spec.command_meta[cmd];
        let path = self.path_to_scope(addr_vec, meta.scope);
        trace!(command = %self.spec.commands.name(cmd), addr_vec = ?addr_vec.0, clk, "issuing command");
        self.total_issued += 1;

        for &node_id in &path {
            self.update_timing(node_id, cmd, clk);
        }

        if let Some(&scope_node) = path.last() {
            self.update_states(scope_node, cmd, addr_vec, clk)?;
        }

        Ok(())
    }

    fn update_timing(&mut self, node_id: NodeId, cmd: usize, clk: Clock) {
        let level = self.nodes[node_id.0].level;
        let window_cap = self.spec.timing.window_cap(cmd);
        self.nodes[node_id.0].record_issue(cmd, clk, window_cap);

        let constraints = self.spec.timing.constraints(level, cmd).to_vec();
        for c in constraints {
            if c.is_sibling {
                let Some(parent) = self.nodes[node_id.0].parent else { continue };
                let siblings: Vec<usize> = self.nodes[parent.0].children.clone().collect();
                let future = clk + c.latency;
                for sib in siblings {
                    if sib == node_id.0 {
                        continue;
                    }
                    let entry = &mut self.nodes[sib].cmd_ready_clk[c.following];
                    *entry = (*entry).max(future);
                }
            } else {
                let hist = &self.nodes[node_id.0].cmd_history[cmd];
                if hist.len() >= c.window {
                    let past = hist[hist.len() - c.window];
                    let next_ready = past + c.latency;
                    let entry = &mut self.nodes[node_id.0].cmd_ready_clk[c.following];
                    *entry = (*entry).max(next_ready);
                }
            }
        }
    }

    fn update_states(
        &mut self,
        node_id: NodeId,
        cmd: usize,
        addr_vec: &AddrVec,
        clk: Clock,
    ) -> Result<(), SimError> {
        let wk = self.well_known;
        let meta = self.spec.command_meta[cmd];

        match self.nodes[node_id.0].level {
            Level::Bank => {
                if Some(cmd) == wk.act1 {
                    self.nodes[node_id.0].state = NodeState::PreOpened;
                } else if meta.is_opening {
                    let row = self.row_of(addr_vec);
                    let node = &mut self.nodes[node_id.0];
                    node.state = NodeState::Opened;
                    let _ = node.row_state.insert(row, RowState::Open);
                } else if meta.is_closing {
                    let node = &mut self.nodes[node_id.0];
                    node.state = NodeState::Closed;
                    node.row_state.clear();
                } else if meta.is_refreshing {
                    self.nodes[node_id.0].state = NodeState::Refreshing;
                    self.schedule_deferred(cmd, addr_vec, clk);
                }
            }
            Level::Rank => {
                if Some(cmd) == wk.casrd {
                    self.nodes[node_id.0].cas_synced_for = Some(true);
                } else if Some(cmd) == wk.caswr {
                    self.nodes[node_id.0].cas_synced_for = Some(false);
                } else if Some(cmd) == wk.prea {
                    for bank in self.banks_under(node_id) {
                        let b = &mut self.nodes[bank.0];
                        b.state = NodeState::Closed;
                        b.row_state.clear();
                    }
                } else if Some(cmd) == wk.presb {
                    let bank_idx = self.bank_index_of(addr_vec);
                    for bank in self.same_bank_across_bankgroups(node_id, bank_idx) {
                        let b = &mut self.nodes[bank.0];
                        b.state = NodeState::Closed;
                        b.row_state.clear();
                    }
                } else if meta.is_refreshing {
                    self.nodes[node_id.0].cas_synced_for = None;
                    let is_all_bank =
                        Some(cmd) == wk.refab || Some(cmd) == wk.rfmab || Some(cmd) == wk.drfmab;
                    if is_all_bank {
                        self.nodes[node_id.0].state = NodeState::Refreshing;
                        for bank in self.banks_under(node_id) {
                            self.nodes[bank.0].state = NodeState::Refreshing;
                        }
                    } else {
                        let bank_idx = self.bank_index_of(addr_vec);
                        for bank in self.same_bank_across_bankgroups(node_id, bank_idx) {
                            self.nodes[bank.0].state = NodeState::Refreshing;
                        }
                    }
                    self.schedule_deferred(cmd, addr_vec, clk);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn schedule_deferred(&mut self, cmd: usize, addr_vec: &AddrVec, clk: Clock) {
        let meta = self.spec.command_meta[cmd];
        let Some(duration) = meta.deferred_duration else { return };
        let Some(end_cmd) = self.spec.commands.id(&format!("{}_end", self.spec.commands.name(cmd)))
        else {
            return;
        };
        self.future_actions.push(FutureAction {
            at: clk + duration - 1,
            end_cmd,
            addr_vec: addr_vec.clone(),
        });
    }

    /// Advance the device's deferred-action queue: any `FutureAction` whose
    /// cycle has arrived fires its end-of-refresh state transition.
    pub fn tick(&mut self, clk: Clock) {
        self.clk = clk;
        let due: Vec<FutureAction> = {
            let mut due = Vec::new();
            self.future_actions.retain(|fa| {
                if fa.at <= clk {
                    due.push(fa.clone());
                    false
                } else {
                    true
                }
            });
            due
        };
        for fa in due {
            self.apply_end_action(fa.end_cmd, &fa.addr_vec);
        }
    }

    /// Apply the deferred end-of-refresh transition for `end_cmd` (a
    /// command named `"<original>_end"`), restoring the affected node(s)
    /// to their pre-refresh state. Dispatches on the original command's
    /// scope and whether it targeted all banks or one bank across bank
    /// groups, mirroring the logic in `preq_at_node`/`update_states`.
    fn apply_end_action(&mut self, end_cmd: usize, addr_vec: &AddrVec) {
        let wk = self.well_known;
        let original_name = self.spec.commands.name(end_cmd).trim_end_matches("_end").to_string();
        let Some(original) = self.spec.commands.id(&original_name) else { return };

        let is_all_bank =
            Some(original) == wk.refab || Some(original) == wk.rfmab || Some(original) == wk.drfmab;
        let is_same_bank = Some(original) == wk.refsb
            || Some(original) == wk.rfmsb
            || Some(original) == wk.drfmsb
            || Some(original) == wk.rrfmsb;

        if is_all_bank {
            if let Some(rank) = self.path_to_scope(addr_vec, Level::Rank).last().copied() {
                self.nodes[rank.0].state = NodeState::PowerUp;
                for bank in self.banks_under(rank) {
                    self.nodes[bank.0].state = NodeState::Closed;
                }
            }
        } else if is_same_bank {
            if let Some(rank) = self.path_to_scope(addr_vec, Level::Rank).last().copied() {
                let bank_idx = self.bank_index_of(addr_vec);
                for bank in self.same_bank_across_bankgroups(rank, bank_idx) {
                    self.nodes[bank.0].state = NodeState::Closed;
                }
            }
        } else if let Some(bank) = self.path_to_scope(addr_vec, Level::Bank).last().copied() {
            // Bank-scope refreshing commands (VRR/RVRR) simply return the
            // bank to Closed.
            self.nodes[bank.0].state = NodeState::Closed;
        }
    }
}

fn build_children(
    arena: &mut Vec<Node>,
    parent: NodeId,
    node_levels: &[Level],
    depth: usize,
    spec: &DeviceSpec,
    num_commands: usize,
) {
    if depth >= node_levels.len() {
        return;
    }
    let level = node_levels[depth];
    let fanout = spec.org.fanout_at(level);
    let start = arena.len();
    for i in 0..fanout {
        arena.push(Node::new(level, i as i64, num_commands, Some(parent)));
    }
    let end = arena.len();
    arena[parent.0].children = start..end;
    for idx in start..end {
        build_children(arena, NodeId(idx), node_levels, depth + 1, spec, num_commands);
    }
}

impl Stats for Device {
    fn stats(&self) -> StatBlock {
        let open_banks = self
            .nodes
            .iter()
            .filter(|n| n.level == Level::Bank && n.is_open())
            .count();
        StatBlock::new("device", self.spec.name.clone(), None)
            .with("total_issued", self.total_issued as f64)
            .with("open_banks", open_banks as f64)
            .with("pending_future_actions", self.future_actions.len() as f64)
    }
}
