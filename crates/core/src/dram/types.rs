//! Shared small types: level enumeration, address vectors, and the
//! bidirectional name↔id table used everywhere a command or level is
//! looked up by its JEDEC-ish name.

use std::collections::HashMap;
use std::fmt;

/// A clock value, in memory cycles.
pub type Clock = i64;

/// One level of the device-tree hierarchy. `Row` and `Column` are
/// addressing dimensions only — they do not get their own arena nodes;
/// `Row` state is tracked in the owning `Bank` node's `row_state` map, and
/// `Column` carries no state at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Level {
    /// Root of the tree; one per controller/device instance.
    #[default]
    Channel,
    /// DRAM rank.
    Rank,
    /// Bank group (DDR4/DDR5/GDDR6).
    BankGroup,
    /// Pseudo-channel (HBM2/GDDR6 style split ranks).
    PseudoChannel,
    /// Bank.
    Bank,
    /// Row within a bank. Not a tree node; see `Bank::row_state`.
    Row,
    /// Column within a row. Not a tree node; carries no state.
    Column,
}

impl Level {
    /// Whether this level owns an arena `Node` (as opposed to being a
    /// pure addressing dimension tracked elsewhere).
    #[must_use]
    pub fn is_tree_node(self) -> bool {
        !matches!(self, Level::Row | Level::Column)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Channel => "channel",
            Level::Rank => "rank",
            Level::BankGroup => "bankgroup",
            Level::PseudoChannel => "pseudochannel",
            Level::Bank => "bank",
            Level::Row => "row",
            Level::Column => "column",
        };
        f.write_str(s)
    }
}

/// A fully- or partially-resolved address: one index per level present in
/// the organization, in hierarchy order. A value of `-1` at any position
/// is a wildcard meaning "every child at that level".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddrVec(pub Vec<i64>);

impl AddrVec {
    /// A vector of the given length, fully wildcarded.
    #[must_use]
    pub fn wildcard(len: usize) -> Self {
        Self(vec![-1; len])
    }

    /// Whether `self` matches `other` up to and including `upto_level`,
    /// where a `-1` at either side counts as matching anything. Used by
    /// the controller's active-buffer collision rule.
    #[must_use]
    pub fn matches_upto(&self, other: &Self, upto_len: usize) -> bool {
        let n = upto_len.min(self.0.len()).min(other.0.len());
        (0..n).all(|i| self.0[i] == -1 || other.0[i] == -1 || self.0[i] == other.0[i])
    }
}

/// Bidirectional name↔id lookup, the Rust replacement for the original's
/// string-keyed `ImplDef`/`SpecDef` template machinery: a plain `Vec` plus
/// a `HashMap` built once at standard-construction time, with no further
/// hashing on any hot path.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl NameTable {
    /// Build a table from an ordered list of names; the position in the
    /// list is the assigned id.
    #[must_use]
    pub fn new(names: &[&str]) -> Self {
        let names: Vec<String> = names.iter().map(|s| (*s).to_string()).collect();
        let by_name = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, by_name }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a name to its id, if registered.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Resolve an id back to its name.
    #[must_use]
    pub fn name(&self, id: usize) -> &str {
        &self.names[id]
    }
}
