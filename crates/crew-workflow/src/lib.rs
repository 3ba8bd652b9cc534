//! Crew orchestration for stock-crew
//!
//! This crate schedules a graph of [`crew_core::Task`]s: it validates the
//! dependency graph, fixes a deterministic execution order, and runs each
//! task exactly once through a shared capability provider.

pub mod crew;
pub mod plan;
pub mod state;

// Re-export for convenience
pub use crew::{Crew, CrewBuilder, CrewConfig, CrewOutput, Process};
pub use plan::ExecutionPlan;
pub use state::TaskState;
