//! Periodic orchestration of fetch, search, sync, processing and push.
//!
//! A cycle is run by [`Orchestrator::run_cycle`]; [`Scheduler`] repeats
//! cycles with a fixed pause in between until shutdown is signalled.

mod config;
mod cycle;
mod scheduler;
mod types;
mod workspace;

pub use config::SchedulerConfig;
pub use cycle::{Components, Orchestrator, StorePrefixes};
pub use scheduler::Scheduler;
pub use types::{CycleReport, OrchestratorError, SchedulerStatus};
pub use workspace::CycleWorkspace;
