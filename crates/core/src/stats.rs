//! Simulation statistics collection and nested reporting.
//!
//! Per §6, on finalize every component recursively prints a nested map of
//! `{ifce, impl, id, <stat_key>: <value>, ...}` followed by its children's
//! maps. The original achieves this via virtual dispatch on a shared base;
//! here every stateful component returns an owned [`StatBlock`] tree via
//! the [`Stats`] trait, and the tree itself carries the recursion — no
//! dispatch needed once the tree is built.

use std::collections::BTreeMap;

use serde::Serialize;

/// One node of the nested stats tree: the interface role, the concrete
/// implementation name, an optional instance id (e.g. channel index), a
/// flat map of numeric values, and child blocks (e.g. one per plugin under
/// a controller, one per channel under the top-level system).
#[derive(Debug, Clone, Serialize)]
pub struct StatBlock {
    /// Interface role (`"device"`, `"controller"`, `"scheduler"`,
    /// `"refresh_manager"`, `"row_policy"`, `"plugin"`, `"system"`, …).
    pub ifce: &'static str,
    /// Concrete implementation name (`"DDR4"`, `"AllBank"`, `"Graphene"`, …).
    pub implementation: String,
    /// Instance identifier, e.g. channel index. `None` for singleton components.
    pub id: Option<usize>,
    /// Flat `stat_key -> value` map, sorted for stable output.
    pub values: BTreeMap<String, f64>,
    /// Nested component stat blocks.
    pub children: Vec<StatBlock>,
}

impl StatBlock {
    /// Start a new block with no values or children yet.
    #[must_use]
    pub fn new(ifce: &'static str, implementation: impl Into<String>, id: Option<usize>) -> Self {
        Self { ifce, implementation: implementation.into(), id, values: BTreeMap::new(), children: Vec::new() }
    }

    /// Record one numeric stat, builder-style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<f64>) -> Self {
        let _ = self.values.insert(key.into(), value.into());
        self
    }

    /// Attach a child block, builder-style.
    #[must_use]
    pub fn with_child(mut self, child: StatBlock) -> Self {
        self.children.push(child);
        self
    }

    /// Record one numeric stat in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<f64>) {
        let _ = self.values.insert(key.into(), value.into());
    }

    /// Attach a child block in place.
    pub fn push_child(&mut self, child: StatBlock) {
        self.children.push(child);
    }

    /// Render this block and its descendants as indented text, matching
    /// the shape of the teacher's flat `SimStats::print`, generalized to
    /// the recursive tree this system needs.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let id_suffix = self.id.map(|i| format!("[{i}]")).unwrap_or_default();
        out.push_str(&format!("{indent}{} ({}){id_suffix}\n", self.ifce, self.implementation));
        for (key, value) in &self.values {
            out.push_str(&format!("{indent}  {key} = {value}\n"));
        }
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

/// Implemented by every stateful component that contributes to the §6
/// finalize stats dump: the device tree, the controller, the scheduler,
/// the refresh manager, the row policy, and every plugin.
pub trait Stats {
    /// Produce this component's stat block, including any children.
    fn stats(&self) -> StatBlock;
}
