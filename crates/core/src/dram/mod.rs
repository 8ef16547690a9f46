//! Hierarchical DRAM device model: the arena-backed device tree, its
//! per-standard static description, and the timing engine operating over
//! both.

/// Device tree construction, prerequisite derivation, readiness checks,
/// and command issue.
pub mod device;
/// Arena node and node-id types.
pub mod node;
/// Per-standard static description: organization, command table, timing table.
pub mod spec;
/// Per-standard preset tables (DDR3/4/5, LPDDR5, HBM2, GDDR6).
pub mod standards;
/// Shared small types: levels, address vectors, name tables.
pub mod types;

pub use device::Device;
pub use node::{Node, NodeId, NodeState, RowState};
pub use spec::{CommandMeta, DeviceSpec, Organization, TimingConstraint, TimingTable, WellKnownCommands};
pub use standards::Standard;
pub use types::{AddrVec, Clock, Level, NameTable};
