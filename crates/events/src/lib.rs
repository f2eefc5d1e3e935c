//! Event bus: in-process publish/subscribe with two delivery lanes.
//!
//! # Invariants
//! - `High` events reach every subscriber, in subscription order, before `post` returns.
//! - `Normal` events are queued per handler and delivered FIFO by `drain`.
//! - A handler appears at most once in the subscriber list of a code.

mod bus;
mod event;

pub use bus::{DEFAULT_DRAIN_BUDGET, EventBus};
pub use event::{Event, EventHandler, EventSource, HandlerRef, Priority, same_handler};
