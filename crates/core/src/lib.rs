//! Cycle-accurate DRAM simulator core.
//!
//! This crate implements a memory-controller engine coupled to a
//! hierarchical DRAM device timing model, parameterized over DRAM
//! standards (DDR3/4/5, LPDDR5, HBM2, GDDR6) and extended with RowHammer
//! mitigation plugins. It provides:
//! 1. **`dram`:** the device tree (arena-based), per-standard static
//!    description, and the timing engine (prerequisite derivation,
//!    readiness checks, command issue).
//! 2. **`controller`:** per-channel request buffers, the scheduler, refresh
//!    manager, row policy, and plugin chain that together decide the one
//!    command issued per channel per cycle.
//! 3. **`plugins`:** RowHammer mitigation schemes and passive observers
//!    implementing the `ControllerPlugin` contract.
//! 4. **`mapper`:** the address mapper interface (linear bit-slicing plus
//!    an optional row-indirection table for swap-based defenses).
//! 5. **`frontend`:** trace-driven request sources.
//! 6. **`system`:** the top-level two-clock-domain simulation loop tying
//!    frontends, the address mapper, and per-channel controllers together.

/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Per-channel controller: request buffers, scheduler, refresh, row policy, plugin chain.
pub mod controller;
/// Hierarchical DRAM device tree and its per-standard timing engine.
pub mod dram;
/// Fatal error types (configuration errors and runtime invariant violations).
pub mod error;
/// Trace-driven request frontends.
pub mod frontend;
/// Address mapper interface: linear bit-slicing and row-indirection table.
pub mod mapper;
/// RowHammer mitigation plugins and passive observers.
pub mod plugins;
/// Simulation statistics collection and nested reporting.
pub mod stats;
/// Top-level two-clock-domain simulation loop.
pub mod system;

/// Root configuration type; deserialize from a YAML-shaped document or use `Config::default()`.
pub use crate::config::Config;
/// Top-level simulator; owns the frontend, address mapper, and per-channel controllers.
pub use crate::system::MemorySystem;
