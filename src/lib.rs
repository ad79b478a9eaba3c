//! # sleipnir
//!
//! High-performance vanity ed25519 SSH key generator.
//!
//! ## Architecture
//!
//! - `crypto`: Key generation, wire encoding and private key export
//! - `matcher`: Pattern matching and difficulty estimation
//! - `worker`: CPU/GPU workers, cancellation and the worker pool
//! - `gpu`: Batched search on compute devices
//! - `output`: Rendering and persisting found keys
//! - `config`: Runtime configuration

pub mod config;
pub mod crypto;
pub mod gpu;
pub mod matcher;
pub mod output;
pub mod worker;

pub use config::{Config, ConfigError, SearchConfig};
pub use crypto::{KeyError, Keypair, WireFormatter};
pub use gpu::{ComputeDevice, GpuBatchEngine, GpuError};
pub use matcher::{ExpectedTrials, Location, MatchResult, PatternSet};
pub use worker::{CancelToken, FoundResult, SearchError, WorkerPool};
