//! Request and its per-channel buffers.

use crate::dram::{AddrVec, Clock};

/// Number of scratchpad slots a request carries for scheduler/plugin use.
pub const SCRATCHPAD_SIZE: usize = 4;

/// A completion callback, the Rust replacement for the original's
/// heap-allocated closure owned by the request: per the redesign notes,
/// completion is represented by a token (the request's `id`) indexing into
/// the controller's pending queue, rather than a closure tangled up with
/// the issuing core's lifetime. The callback itself stays a boxed `FnMut`
/// since call sites (the frontend) are still most naturally expressed that
/// way; only the *completion bookkeeping* moved to the token scheme.
pub type Callback = Box<dyn FnMut(&Request) + Send>;

/// One in-flight memory request.
pub struct Request {
    /// Monotonically increasing id, assigned on `send`, used as the
    /// completion token in the pending queue.
    pub id: u64,
    /// Fully-resolved address vector (populated by the address mapper
    /// before the request reaches the scheduler).
    pub addr_vec: AddrVec,
    /// Index into the device spec's request-translation table.
    pub type_id: String,
    /// Current prerequisite command, recomputed by the scheduler each cycle.
    pub command: usize,
    /// Final target command for this request's `type_id`.
    pub final_command: usize,
    /// Originating core id, or `-1` for controller/plugin-synthesized requests.
    pub source_id: i64,
    /// Optional completion hook, invoked exactly once.
    pub callback: Option<Callback>,
    /// Cycle the request was enqueued.
    pub arrive: Clock,
    /// Cycle the request completed (reads: pending-queue release; writes:
    /// issue cycle). `None` until completion.
    pub depart: Option<Clock>,
    /// Small fixed-size scratchpad for scheduler/plugin bookkeeping
    /// (e.g. BLISS's streak counter, PRAC's fits-before-alert flag).
    pub scratchpad: [i64; SCRATCHPAD_SIZE],
    /// Whether this request is a read (drives pending-queue vs. immediate
    /// completion semantics).
    pub is_read: bool,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("addr_vec", &self.addr_vec)
            .field("type_id", &self.type_id)
            .field("command", &self.command)
            .field("final_command", &self.final_command)
            .field("source_id", &self.source_id)
            .field("arrive", &self.arrive)
            .field("depart", &self.depart)
            .field("scratchpad", &self.scratchpad)
            .field("is_read", &self.is_read)
            .finish_non_exhaustive()
    }
}

impl Request {
    /// Build a new request. `command` starts equal to `final_command`; the
    /// scheduler recomputes it via `get_preq_command` before first issue.
    #[must_use]
    pub fn new(
        id: u64,
        addr_vec: AddrVec,
        type_id: String,
        final_command: usize,
        source_id: i64,
        arrive: Clock,
        is_read: bool,
    ) -> Self {
        Self {
            id,
            addr_vec,
            type_id,
            command: final_command,
            final_command,
            source_id,
            callback: None,
            arrive,
            depart: None,
            scratchpad: [0; SCRATCHPAD_SIZE],
            is_read,
        }
    }

    /// Whether `command` is this request's terminal command.
    #[must_use]
    pub fn at_final_command(&self) -> bool {
        self.command == self.final_command
    }
}

/// A FIFO-ish buffer of in-flight requests. Not a true FIFO: the scheduler
/// may select any element, but insertion order is preserved for FCFS
/// tie-breaking via `arrive`.
#[derive(Debug, Default)]
pub struct ReqBuffer {
    /// Requests currently held.
    pub requests: Vec<Request>,
    /// Maximum number of requests this buffer accepts, or `None` for
    /// effectively unbounded (the priority buffer).
    pub capacity: Option<usize>,
}

impl ReqBuffer {
    /// A buffer bounded to `capacity` entries.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self { requests: Vec::with_capacity(capacity), capacity: Some(capacity) }
    }

    /// An effectively unbounded buffer (used for the priority buffer, per
    /// the refresh manager's "never fails to enqueue" contract).
    #[must_use]
    pub fn unbounded() -> Self {
        Self { requests: Vec::new(), capacity: None }
    }

    /// Whether the buffer has room for one more request.
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.capacity.is_none_or(|cap| self.requests.len() < cap)
    }

    /// Push a request if there's room; returns `false` (not an error) if
    /// the buffer is full — the simulated-world "buffer full" condition.
    pub fn push(&mut self, req: Request) -> bool {
        if !self.has_room() {
            return false;
        }
        self.requests.push(req);
        true
    }

    /// Remove and return the request at `idx`.
    pub fn remove(&mut self, idx: usize) -> Request {
        self.requests.remove(idx)
    }
}
