//! Task lifecycle: the parent/child graph, per-task status machine, live
//! executor handles, and the orchestrator that composes them into the
//! hierarchical control surface.

pub mod executor;
pub mod graph;
pub mod orchestrator;
pub mod status;
