//! The node arena and the evaluator that renders it.
//!
//! Units are handles; the nodes they stand for live here. A graph is a set of
//! primitive kernels joined by edges, rendered one sample at a time in
//! topological order. Loops are only allowed through explicit feedback edges,
//! which read their source one sample late and must pass through a filter.

/// Node storage, connection rules and the per-block render loop.
pub mod arena;
/// Parameter changes queued for the next block.
pub mod message;
/// Node ids, ports and per-sample kernels.
pub mod node;
/// Topological ordering of the arena.
mod schedule;

pub use arena::Graph;
pub use message::{control_channel, ControlMessage, ControlSink, Controller};
pub use node::{NodeId, Port, RenderCtx, MAX_PORTS, MAX_SELECTOR_INPUTS};
