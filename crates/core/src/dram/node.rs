//! Arena-based device tree.
//!
//! The original implementation built a pointer graph: each node was
//! heap-allocated and held raw pointers to its parent and children. Here
//! the tree is a single `Vec<Node>` per `Device`, addressed by `NodeId` (a
//! plain index). Parent and children are backreferences into the same
//! arena, which makes the tree trivially cloneable and immune to the
//! lifetime/ownership tangles a pointer graph invites.

use std::collections::{HashMap, VecDeque};

use super::types::{Clock, Level};

/// Index into a `Device`'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Per-level legal node states. Not every state is reachable at every
/// level; which ones are is enforced by the action handlers in
/// `dram::spec`, not by the type itself (a single enum keeps the arena
/// homogeneous across levels, matching the original's single node-state
/// field, just without the CRTP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Bank: no row open.
    Closed,
    /// Bank: a row is open (see `Node::row_state`).
    Opened,
    /// Bank: LPDDR5 two-phase activate, between `ACT-1` and `ACT-2`.
    PreOpened,
    /// Rank: not currently refreshing.
    PowerUp,
    /// Bank or rank: mid-refresh.
    Refreshing,
    /// Levels with no meaningful state of their own (e.g. bank group acting
    /// purely as an addressing/timing scope).
    NotApplicable,
}

/// Row-level bookkeeping tracked inside the owning bank node. Rows are not
/// arena nodes (see `Level::is_tree_node`); only open rows appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// The row is open (activated) and is the bank's current row-buffer hit target.
    Open,
}

/// One node of the device tree: channel, rank, bank-group, pseudo-channel,
/// or bank. Mirrors the original's `DRAMNodeBase<T>` minus the CRTP: state,
/// per-command readiness clocks, and per-command issue history, plus arena
/// parent/child links instead of pointers.
#[derive(Debug, Clone)]
pub struct Node {
    /// Which hierarchy level this node occupies.
    pub level: Level,
    /// Index among siblings at this level (for addressing/debugging).
    pub index: i64,
    /// Current state.
    pub state: NodeState,
    /// Open rows, keyed by row id. Only populated on `Bank` nodes.
    pub row_state: HashMap<i64, RowState>,
    /// Earliest cycle each command (by id) may next be issued at this node.
    pub cmd_ready_clk: Vec<Clock>,
    /// Ring buffer of recent issue cycles per command (by id), sized to the
    /// maximum `window` any timing constraint references for that command.
    pub cmd_history: Vec<VecDeque<Clock>>,
    /// Parent node, `None` only for the channel root.
    pub parent: Option<NodeId>,
    /// Contiguous range of this node's children in the owning arena.
    pub children: std::ops::Range<usize>,
    /// LPDDR5 CAS-sync state at the rank level: `None` means the rank
    /// needs a `CASRD`/`CASWR` before its next column command; `Some(true)`
    /// means synced for reads, `Some(false)` for writes. Unused on
    /// standards without a CAS-sync command. Cleared by `REFab`/`REFsb`.
    pub cas_synced_for: Option<bool>,
}

impl Node {
    pub(crate) fn new(level: Level, index: i64, num_commands: usize, parent: Option<NodeId>) -> Self {
        let state = match level {
            Level::Bank => NodeState::Closed,
            Level::Rank => NodeState::PowerUp,
            _ => NodeState::NotApplicable,
        };
        Self {
            level,
            index,
            state,
            row_state: HashMap::new(),
            cmd_ready_clk: vec![0; num_commands],
            cmd_history: vec![VecDeque::new(); num_commands],
            parent,
            children: 0..0,
            cas_synced_for: None,
        }
    }

    /// Whether this node is a `Bank` currently open to some row.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == NodeState::Opened && !self.row_state.is_empty()
    }

    /// Push an issue into this node's history for `cmd`, keeping at most
    /// `window` entries (the maximum window any constraint needs; older
    /// entries are dropped since no constraint can reference them).
    pub(crate) fn record_issue(&mut self, cmd: usize, clk: Clock, window_cap: usize) {
        let hist = &mut self.cmd_history[cmd];
        hist.push_back(clk);
        while hist.len() > window_cap.max(1) {
            let _ = hist.pop_front();
        }
    }
}
