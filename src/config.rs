//! Runtime configuration for the vanity key generator.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::crypto::wire::{ENCODED_LEN, PAYLOAD_LEN};
use crate::matcher::{Location, PatternSet};

/// Default number of seeds per GPU batch.
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Default stats reporting interval.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Sleipnir - Vanity SSH Key Generator
///
/// Searches for ed25519 SSH keys whose public key contains a pattern.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Pattern(s) to match in the public key, comma separated
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub pattern: Vec<String>,

    /// Where to match: anywhere, start or end of the public key
    #[arg(short, long, default_value = "anywhere")]
    pub location: Location,

    /// Case sensitive matching
    #[arg(short = 'c', long, default_value = "false")]
    pub case_sensitive: bool,

    /// Number of CPU worker threads (default: number of CPU cores, 0 with --gpu)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Keep finding matches until interrupted
    #[arg(short = 's', long, default_value = "false")]
    pub stream: bool,

    /// Append found keys to this file
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Verbose logging, also shows the PKCS#8 private key
    #[arg(short = 'v', long, default_value = "false")]
    pub verbose: bool,

    /// Progress report interval in seconds
    #[arg(short = 'r', long, default_value = "5")]
    pub report_interval: u64,

    /// Enable GPU acceleration (requires OpenCL)
    #[cfg(feature = "gpu")]
    #[arg(long, default_value = "false")]
    pub gpu: bool,

    /// GPU device index to use
    #[cfg(feature = "gpu")]
    #[arg(long, default_value = "0")]
    pub gpu_device: usize,

    /// Number of seeds per GPU batch
    #[cfg(feature = "gpu")]
    #[arg(long, default_value = "16384")]
    pub gpu_batch_size: usize,

    /// Path to the OpenCL kernel source
    #[cfg(feature = "gpu")]
    #[arg(long, default_value = "kernels/ed25519_vanity.cl")]
    pub gpu_kernel: PathBuf,
}

impl Config {
    /// Returns the number of CPU workers.
    ///
    /// Defaults to the CPU count, or to zero when the GPU is enabled.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            if self.gpu_enabled() {
                0
            } else {
                num_cpus::get()
            }
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern.is_empty() {
            return Err(ConfigError::InvalidPattern("Pattern cannot be empty".into()));
        }

        let max_len = match self.location {
            Location::Start => PAYLOAD_LEN,
            Location::Anywhere | Location::End => ENCODED_LEN,
        };

        for pattern in &self.pattern {
            if pattern.is_empty() {
                return Err(ConfigError::InvalidPattern("Pattern cannot be empty".into()));
            }

            if let Some(c) = pattern.chars().find(|&c| !is_base64_char(c)) {
                return Err(ConfigError::InvalidPattern(format!(
                    "'{}' contains '{}', which never appears in a public key \
                     (use A-Z, a-z, 0-9, + and /)",
                    pattern, c
                )));
            }

            if pattern.len() > max_len {
                return Err(ConfigError::InvalidPattern(format!(
                    "'{}' is longer than {} characters",
                    pattern, max_len
                )));
            }
        }

        if self.report_interval == 0 {
            return Err(ConfigError::InvalidValue(
                "Report interval must be at least 1 second".into(),
            ));
        }

        if self.gpu_batch_size() == 0 {
            return Err(ConfigError::InvalidValue(
                "GPU batch size must be greater than zero".into(),
            ));
        }

        if self.worker_count() == 0 && !self.gpu_enabled() {
            return Err(ConfigError::NoEngine);
        }

        Ok(())
    }

    /// Builds the immutable search configuration.
    pub fn search_config(&self) -> Result<SearchConfig, ConfigError> {
        Ok(SearchConfig::new(
            self.pattern.clone(),
            self.location,
            self.case_sensitive,
            self.worker_count(),
            self.stream,
        )?
        .with_report_interval(Duration::from_secs(self.report_interval))
        .with_batch_size(self.gpu_batch_size()))
    }

    /// Returns whether GPU acceleration is enabled.
    pub fn gpu_enabled(&self) -> bool {
        #[cfg(feature = "gpu")]
        {
            self.gpu
        }
        #[cfg(not(feature = "gpu"))]
        {
            false
        }
    }

    /// Returns the GPU device index.
    pub fn gpu_device_index(&self) -> usize {
        #[cfg(feature = "gpu")]
        {
            self.gpu_device
        }
        #[cfg(not(feature = "gpu"))]
        {
            0
        }
    }

    /// Returns the GPU batch size.
    pub fn gpu_batch_size(&self) -> usize {
        #[cfg(feature = "gpu")]
        {
            self.gpu_batch_size
        }
        #[cfg(not(feature = "gpu"))]
        {
            DEFAULT_BATCH_SIZE
        }
    }
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '/'
}

/// Search parameters shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Target patterns, lowercased when matching is case insensitive
    pub patterns: Vec<String>,
    pub location: Location,
    pub case_sensitive: bool,
    /// Number of CPU workers
    pub workers: usize,
    /// Seeds per device call (GPU only)
    pub batch_size: usize,
    /// Keep searching after a match
    pub streaming: bool,
    pub report_interval: Duration,
}

impl SearchConfig {
    /// Creates a search configuration; the pattern set must be non-empty.
    pub fn new(
        patterns: Vec<String>,
        location: Location,
        case_sensitive: bool,
        workers: usize,
        streaming: bool,
    ) -> Result<Self, ConfigError> {
        if patterns.is_empty() || patterns.iter().any(String::is_empty) {
            return Err(ConfigError::InvalidPattern("Pattern cannot be empty".into()));
        }

        let patterns = if case_sensitive {
            patterns
        } else {
            patterns.iter().map(|p| p.to_lowercase()).collect()
        };

        Ok(Self {
            patterns,
            location,
            case_sensitive,
            workers,
            batch_size: DEFAULT_BATCH_SIZE,
            streaming,
            report_interval: DEFAULT_REPORT_INTERVAL,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Compiles the patterns into a matcher.
    pub fn pattern_set(&self) -> PatternSet {
        PatternSet::new(self.patterns.iter().cloned(), self.location, self.case_sensitive)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("No search engine enabled: use --workers with a value above 0 or --gpu")]
    NoEngine,
}
