//! Trace-driven request frontends (§6 "Trace format").
//!
//! Three grammars are supported, one per [`Frontend`] implementation:
//! - **Read-write trace**: `{"R"|"W"} <addr-level0>,<addr-level1>,…` — a
//!   fully-resolved per-level address, bypassing the address mapper.
//! - **Load-store trace**: `{"LD"|"ST"} <addr>` — a linear address that
//!   still needs mapping; an optional trailing payload size is accepted
//!   and ignored (this crate models no data payload beyond an opaque
//!   buffer, per spec §1's Non-goals).
//! - **O3-core trace**: `<bubble_count> <load_addr> [<store_addr>]` — a
//!   non-memory-instruction bubble count precedes each load (and optional
//!   co-issued store), pacing frontend-clock admission the way an
//!   out-of-order core's reorder buffer would.
//!
//! Every frontend yields a [`RawRequest`]: either an address vector
//! already resolved (read-write trace) or a linear address still bound
//! for the address mapper (the other two).

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::dram::AddrVec;
use crate::error::ConfigError;

/// One request as produced by a frontend, before it reaches
/// [`crate::system::MemorySystem::admit`].
#[derive(Debug, Clone)]
pub enum RawRequest {
    /// A linear physical address still bound for the address mapper.
    Linear {
        /// Whether this is a read (`true`) or write (`false`).
        is_read: bool,
        /// Linear physical address.
        addr: u64,
    },
    /// A fully-resolved per-level address vector (read-write trace format;
    /// bypasses the address mapper entirely).
    Resolved {
        /// Whether this is a read (`true`) or write (`false`).
        is_read: bool,
        /// Per-level address vector.
        addr_vec: AddrVec,
    },
}

/// A source of memory requests, driven once per frontend-clock tick by
/// [`crate::system::MemorySystem`].
pub trait Frontend: std::fmt::Debug + Send {
    /// Produce the next request ready to admit this frontend tick, or
    /// `None` if nothing is ready yet (an O3-core bubble still counting
    /// down) or the trace is exhausted.
    fn next_request(&mut self) -> Option<RawRequest>;

    /// Whether the trace is exhausted and no further requests will ever
    /// be produced (used to decide when a run can terminate cleanly).
    fn is_exhausted(&self) -> bool;
}

fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Include {
        path: path.display().to_string(),
        source,
    })?;
    Ok(BufReader::new(file).lines())
}

/// Parses `{"R"|"W"} <addr-level0>,<addr-level1>,…` lines into
/// already-resolved [`AddrVec`]s.
#[derive(Debug)]
pub struct ReadWriteTraceFrontend {
    lines: Lines<BufReader<File>>,
    exhausted: bool,
}

impl ReadWriteTraceFrontend {
    /// Open a read-write trace file.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self { lines: open_lines(path)?, exhausted: false })
    }
}

impl Frontend for ReadWriteTraceFrontend {
    fn next_request(&mut self) -> Option<RawRequest> {
        loop {
            let Some(line) = self.lines.next() else {
                self.exhausted = true;
                return None;
            };
            let Ok(line) = line else { continue };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(tag) = parts.next() else { continue };
            let is_read = match tag {
                "R" => true,
                "W" => false,
                _ => continue,
            };
            let Some(rest) = parts.next() else { continue };
            let indices: Vec<i64> = rest.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if indices.is_empty() {
                continue;
            }
            return Some(RawRequest::Resolved { is_read, addr_vec: AddrVec(indices) });
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Parses `{"LD"|"ST"} <addr>` lines (an optional payload size and byte
/// list may trail the address; both are accepted and ignored).
#[derive(Debug)]
pub struct LoadStoreTraceFrontend {
    lines: Lines<BufReader<File>>,
    exhausted: bool,
}

impl LoadStoreTraceFrontend {
    /// Open a load-store trace file.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self { lines: open_lines(path)?, exhausted: false })
    }

    fn parse_addr(token: &str) -> Option<u64> {
        token
            .strip_prefix("0x")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok())
            .or_else(|| token.parse().ok())
    }
}

impl Frontend for LoadStoreTraceFrontend {
    fn next_request(&mut self) -> Option<RawRequest> {
        loop {
            let Some(line) = self.lines.next() else {
                self.exhausted = true;
                return None;
            };
            let line = line.ok()?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(tag) = parts.next() else { continue };
            let is_read = match tag {
                "LD" => true,
                "ST" => false,
                _ => continue,
            };
            let Some(addr_tok) = parts.next() else { continue };
            let Some(addr) = Self::parse_addr(addr_tok) else { continue };
            return Some(RawRequest::Linear { is_read, addr });
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Parses `<bubble_count> <load_addr> [<store_addr>]` lines, pacing
/// admission by `bubble_count` frontend cycles of nothing before the load
/// (and a trailing co-issued store, if present) become ready. Order per
/// line: bubbles elapse, then the load is admitted, then the store (if
/// any) is admitted on the following call.
#[derive(Debug)]
pub struct O3CoreTraceFrontend {
    lines: Lines<BufReader<File>>,
    countdown: u64,
    pending_load: Option<u64>,
    armed_store: Option<u64>,
    exhausted: bool,
}

impl O3CoreTraceFrontend {
    /// Open an O3-core trace file.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            lines: open_lines(path)?,
            countdown: 0,
            pending_load: None,
            armed_store: None,
            exhausted: false,
        })
    }

    fn parse_line(line: &str) -> Option<(u64, u64, Option<u64>)> {
        let mut parts = line.split_whitespace();
        let bubbles: u64 = parts.next()?.parse().ok()?;
        let load_addr: u64 = parts.next()?.parse().ok()?;
        let store_addr: Option<u64> = parts.next().and_then(|s| s.parse().ok());
        Some((bubbles, load_addr, store_addr))
    }
}

impl Frontend for O3CoreTraceFrontend {
    fn next_request(&mut self) -> Option<RawRequest> {
        if let Some(load_addr) = self.pending_load {
            if self.countdown > 0 {
                self.countdown -= 1;
                return None;
            }
            self.pending_load = None;
            return Some(RawRequest::Linear { is_read: true, addr: load_addr });
        }
        if let Some(addr) = self.armed_store.take() {
            return Some(RawRequest::Linear { is_read: false, addr });
        }
        loop {
            let Some(line) = self.lines.next() else {
                self.exhausted = true;
                return None;
            };
            let Ok(line) = line else { continue };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((bubbles, load_addr, store_addr)) = Self::parse_line(line) else { continue };
            self.armed_store = store_addr;
            if bubbles > 0 {
                self.countdown = bubbles;
                self.pending_load = Some(load_addr);
                return None;
            }
            return Some(RawRequest::Linear { is_read: true, addr: load_addr });
        }
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
