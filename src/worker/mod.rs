//! Worker pool for parallel vanity key search.
//!
//! This module provides:
//! - Multi-threaded CPU workers
//! - A GPU worker driving a batch engine
//! - First-result-wins coordination with shared cancellation
//! - Progress tracking and reporting

mod cancel;
mod cpu;
mod gpu;
mod pool;
mod slot;
mod stats;

pub use cancel::CancelToken;
pub use cpu::CpuWorker;
pub use gpu::GpuWorker;
pub use pool::{FoundResult, WorkerPool};
pub use slot::{PublishMode, ResultSlot};
pub use stats::{format_eta, format_seconds, StatsReporter, StatsSample, TrialCounter};

use crate::crypto::KeyError;
use crate::gpu::GpuError;

/// Fatal errors that end a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Key generation failed: {0}")]
    Key(#[from] KeyError),

    #[error("GPU engine failed: {0}")]
    Gpu(#[from] GpuError),

    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}
