//! Shared value types for the stagecraft crates.

mod types;

pub use types::{NodeId, Transform2D};
