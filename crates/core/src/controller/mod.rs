//! Per-channel memory controller: request buffers, scheduler, refresh
//! manager, row policy, and plugin chain, tied together by the per-cycle
//! algorithm in §4.2.

/// The `Controller` type and its per-cycle tick.
pub mod controller;
/// Plugin contract and the registration-ordered chain.
pub mod plugin;
/// Refresh manager variants.
pub mod refresh;
/// Request and per-channel buffers.
pub mod request;
/// Row-buffer management policy.
pub mod rowpolicy;
/// Scheduler variants.
pub mod scheduler;

pub use controller::Controller;
pub use plugin::{AboInjection, ControllerPlugin, PluginChain, PluginContext};
pub use refresh::RefreshManager;
pub use request::{Callback, ReqBuffer, Request, SCRATCHPAD_SIZE};
pub use rowpolicy::{flatten_bank_index, RowPolicy};
pub use scheduler::{collides_with_active, Scheduler, Selection};
