//! Fatal error types.
//!
//! The simulator recognizes exactly two families of fatal condition (see
//! the crate-level error handling notes): configuration errors, surfaced
//! during initialization, and runtime invariant violations, surfaced while
//! ticking. Neither is ever caught inside the tick loop — both propagate to
//! the caller (the CLI prints and exits non-zero). Simulated-world
//! conditions such as "buffer full" or "command not ready" are *not*
//! errors; those are plain return values callers retry next cycle.

use thiserror::Error;

/// Failures that can occur while building a [`crate::config::Config`] into
/// a runnable simulation, or while parsing the configuration document
/// itself.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A named DRAM standard or preset does not exist.
    #[error("unknown DRAM standard or preset: {0}")]
    UnknownPreset(String),

    /// A required configuration field was absent and has no default.
    #[error("missing required configuration field: {0}")]
    MissingField(String),

    /// The organization's per-level fanout times DQ width does not equal
    /// the declared chip density.
    #[error(
        "density mismatch: organization implies {computed_mb} Mb but {declared_mb} Mb was declared"
    )]
    DensityMismatch {
        /// Density computed from the organization's fanout counts and DQ width.
        computed_mb: u64,
        /// Density declared in the configuration document.
        declared_mb: u64,
    },

    /// A scheduler, refresh-manager, row-policy, or plugin name in the
    /// configuration document has no matching implementation.
    #[error("unregistered {kind}: {name}")]
    Unregistered {
        /// Which pluggable role was being resolved (`"scheduler"`, `"plugin"`, …).
        kind: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// A configuration value could not be coerced to the expected type.
    #[error("failed to coerce field {field} to the expected type: {reason}")]
    TypeCoerce {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable reason the coercion failed.
        reason: String,
    },

    /// The configuration document itself failed to parse.
    #[error("failed to parse configuration document: {0}")]
    Parse(String),

    /// An `!include` directive referenced a file that could not be read.
    #[error("failed to read included configuration file {path}: {source}")]
    Include {
        /// Path named by the `!include` directive.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Runtime invariant violations. Every variant here indicates a modeling
/// bug, never a condition a well-formed trace can trigger through normal
/// operation.
#[derive(Debug, Error)]
pub enum SimError {
    /// A plugin or the refresh manager attempted to enqueue into a full
    /// priority buffer. The priority buffer is documented as effectively
    /// unbounded; reaching capacity is a fatal mis-sizing.
    #[error("priority buffer overflow on channel {channel} (capacity {capacity})")]
    PriorityBufferFull {
        /// Channel index whose priority buffer overflowed.
        channel: usize,
        /// Configured capacity of the buffer.
        capacity: usize,
    },

    /// A command was issued at a device-tree level with no matching entry
    /// in that level's command-meta or timing tables.
    #[error("no timing-table entry for command {command} at level {level}")]
    UnknownCommandAtLevel {
        /// Command id that had no table entry.
        command: String,
        /// Level name at which it was attempted.
        level: String,
    },

    /// An address vector referenced a level index outside the device
    /// tree's configured bounds.
    #[error("address-vector index {index} out of range for level {level} (fanout {fanout})")]
    AddrVecOutOfRange {
        /// Level name whose bound was exceeded.
        level: String,
        /// Offending index.
        index: i64,
        /// Configured fanout for that level.
        fanout: usize,
    },

    /// A row-indirection table swap plugin could not find any entry to
    /// evict even though the table reported itself full.
    #[error("row indirection table exhausted with no evictable entry (bank {bank})")]
    RitExhausted {
        /// Flattened bank index whose RIT is exhausted.
        bank: usize,
    },
}
