//! Developer tooling: read-only views over a running stage.
//!
//! # Invariants
//! - Inspection never mutates the stage or its registries.

mod inspector;

pub use inspector::{NodeInfo, ResourceEntry, StageInspector, StageSummary};

pub fn crate_info() -> &'static str {
    "stagecraft-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
