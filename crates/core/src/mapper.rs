//! Address mapper (§4.6): translates a linear physical address into a
//! fully-resolved per-level address vector, with an optional row
//! indirection table (RIT) through which row-swap defenses (RRS, AQUA)
//! remap logical rows to physical rows.
//!
//! Per §4.6 this is documented as an external collaborator specified only
//! at its interface; the controller never interprets the RIT itself, it
//! only requires `addr_vec` to be populated before a request reaches the
//! scheduler. `LinearMapper` is the one concrete implementation this crate
//! ships, built directly from the organization's per-level fanout counts.

use std::collections::{HashMap, HashSet};

use crate::dram::{AddrVec, Level, Organization};
use crate::error::SimError;

/// Translates a linear physical address into a per-level [`AddrVec`],
/// optionally consulting a [`RowIndirectionTable`] to remap rows.
pub trait AddressMapper: std::fmt::Debug + Send {
    /// Resolve `addr` to a fully-specified address vector. `rit`, if
    /// present, is consulted to replace the row index derived from the
    /// raw address with its remapped physical row, if one is recorded.
    fn apply(&self, addr: u64, rit: Option<&RowIndirectionTable>) -> AddrVec;

    /// Number of memory channels this mapper distributes addresses across.
    fn channels(&self) -> usize;
}

/// Bit-sliced linear address mapper: each hierarchy level consumes
/// `ceil(log2(fanout))` bits, least-significant levels first (`Column`,
/// then `Row`, up to `Channel`), so that sequential addresses stay within
/// one row for as long as the column width allows.
#[derive(Debug, Clone)]
pub struct LinearMapper {
    levels: Vec<Level>,
    fanout: Vec<usize>,
    channels: usize,
}

impl LinearMapper {
    /// Build a mapper from an organization's level/fanout lists.
    #[must_use]
    pub fn from_org(org: &Organization) -> Self {
        let channels = org.fanout_at(Level::Channel).max(1);
        Self { levels: org.levels.clone(), fanout: org.fanout.clone(), channels }
    }

    fn bits_for(fanout: usize) -> u32 {
        if fanout <= 1 { 0 } else { usize::BITS - (fanout - 1).leading_zeros() }
    }

    /// Total address bits this mapper consumes per channel: the sum of
    /// `bits_for(fanout)` across every level. Bits of a raw linear address
    /// above this width are unused by `apply` (the `Channel` level always
    /// has fanout 1) and are free for `MemorySystem` to use as the
    /// external channel-select field.
    #[must_use]
    pub fn address_bits(&self) -> u32 {
        self.fanout.iter().map(|f| Self::bits_for((*f).max(1))).sum()
    }

    fn row_position(&self) -> Option<usize> {
        self.levels.iter().position(|l| *l == Level::Row)
    }

    fn bank_position(&self) -> Option<usize> {
        self.levels.iter().position(|l| *l == Level::Bank)
    }
}

impl AddressMapper for LinearMapper {
    fn apply(&self, addr: u64, rit: Option<&RowIndirectionTable>) -> AddrVec {
        let mut remaining = addr;
        let mut idx = vec![0i64; self.levels.len()];
        for i in (0..self.levels.len()).rev() {
            let bits = Self::bits_for(self.fanout[i].max(1));
            let mask = if bits == 0 { 0 } else { (1u64 << bits) - 1 };
            idx[i] = (remaining & mask) as i64;
            remaining >>= bits;
        }
        let mut addr_vec = AddrVec(idx);
        if let (Some(rit), Some(row_pos), Some(bank_pos)) = (rit, self.row_position(), self.bank_position()) {
            let bank = flatten_bank(&self.levels, &self.fanout, &addr_vec, bank_pos);
            if let Some(physical_row) = rit.check(bank, addr_vec.0[row_pos]) {
                addr_vec.0[row_pos] = physical_row;
            }
        }
        addr_vec
    }

    fn channels(&self) -> usize {
        self.channels
    }
}

fn flatten_bank(levels: &[Level], fanout: &[usize], addr_vec: &AddrVec, bank_pos: usize) -> usize {
    let mut flat = 0usize;
    for i in 0..=bank_pos {
        if matches!(levels[i], Level::Row | Level::Column) {
            continue;
        }
        flat = flat * fanout[i].max(1) + addr_vec.0[i].max(0) as usize;
    }
    flat
}

/// One recorded row-swap: `logical_row` (the address the rest of the
/// system still computes) now lives at `physical_row`.
#[derive(Debug, Clone, Copy)]
struct RitEntry {
    physical_row: i64,
}

/// Per-bank row-indirection table: a bounded map from logical row id to
/// physical row id, consulted by [`LinearMapper::apply`] and mutated by
/// swap-defense plugins (RRS, AQUA) as they migrate hot rows.
#[derive(Debug, Clone)]
pub struct RowIndirectionTable {
    capacity: usize,
    entries: Vec<HashMap<i64, RitEntry>>,
    locked: Vec<HashSet<i64>>,
}

impl RowIndirectionTable {
    /// Build an empty table sized for `num_banks` flattened banks, each
    /// holding at most `capacity` remapped rows.
    #[must_use]
    pub fn new(num_banks: usize, capacity: usize) -> Self {
        Self {
            capacity,
            entries: vec![HashMap::new(); num_banks],
            locked: vec![HashSet::new(); num_banks],
        }
    }

    /// The remapped physical row for (`bank`, `logical_row`), if recorded.
    #[must_use]
    pub fn check(&self, bank: usize, logical_row: i64) -> Option<i64> {
        self.entries.get(bank).and_then(|m| m.get(&logical_row)).map(|e| e.physical_row)
    }

    /// Whether `bank`'s table has no free slot for a new entry.
    #[must_use]
    pub fn is_full(&self, bank: usize) -> bool {
        self.entries.get(bank).is_some_and(|m| m.len() >= self.capacity)
    }

    /// Insert a remapping, failing if the bank's table is full. Swap
    /// plugins that observe `is_full` first evict a victim (`remove_entry`)
    /// before retrying.
    pub fn insert_entry(&mut self, bank: usize, logical_row: i64, physical_row: i64) -> Result<(), SimError> {
        if self.is_full(bank) {
            return Err(SimError::RitExhausted { bank });
        }
        let _ = self.entries[bank].insert(logical_row, RitEntry { physical_row });
        Ok(())
    }

    /// Remove a recorded remapping (undoing a swap).
    pub fn remove_entry(&mut self, bank: usize, logical_row: i64) {
        let _ = self.entries[bank].remove(&logical_row);
        let _ = self.locked[bank].remove(&logical_row);
    }

    /// Lock an entry in place for the duration of an in-progress migration,
    /// so a second swap plugin doesn't pick the same row as a victim.
    pub fn lock(&mut self, bank: usize, logical_row: i64) {
        let _ = self.locked[bank].insert(logical_row);
    }

    /// Release a lock taken by [`Self::lock`] once a migration completes.
    pub fn unlock(&mut self, bank: usize, logical_row: i64) {
        let _ = self.locked[bank].remove(&logical_row);
    }

    /// Whether `logical_row` is currently locked against eviction.
    #[must_use]
    pub fn is_locked(&self, bank: usize, logical_row: i64) -> bool {
        self.locked.get(bank).is_some_and(|s| s.contains(&logical_row))
    }

    /// Any unlocked entry in `bank`'s table, suitable as an eviction victim.
    #[must_use]
    pub fn any_evictable(&self, bank: usize) -> Option<i64> {
        self.entries
            .get(bank)?
            .keys()
            .find(|row| !self.is_locked(bank, **row))
            .copied()
    }
}
