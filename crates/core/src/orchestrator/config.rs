//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Pause between the end of one cycle and the start of the next (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Parent of the per-cycle `input`, `output` and `data` directories.
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// Key segments considered when listing completed output sets.
    #[serde(default = "default_depth")]
    pub completeness_depth: usize,

    /// Start the first cycle right away instead of after one interval.
    #[serde(default)]
    pub run_immediately: bool,
}

fn default_interval() -> u64 {
    100
}

fn default_scratch_root() -> PathBuf {
    PathBuf::from("/dev/shm/gps")
}

fn default_depth() -> usize {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            scratch_root: default_scratch_root(),
            completeness_depth: default_depth(),
            run_immediately: false,
        }
    }
}
