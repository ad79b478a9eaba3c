//! Trial accounting and the periodic throughput reporter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick};
use log::{debug, info};

use crate::matcher::ExpectedTrials;

use super::CancelToken;

/// Counters shared by every worker of one search run.
///
/// Advisory only: nothing depends on the exact values for correctness.
#[derive(Debug, Default)]
pub struct TrialCounter {
    trials: AtomicU64,
    matches: AtomicU64,
}

impl TrialCounter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_trials(&self, n: u64) {
        self.trials.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_match(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total candidates examined.
    pub fn trials(&self) -> u64 {
        self.trials.load(Ordering::Relaxed)
    }

    /// Returns the total matches found.
    pub fn matches(&self) -> u64 {
        self.matches.load(Ordering::Relaxed)
    }
}

/// Formats seconds as `1d 02h 03m 04s`, or `∞`.
pub fn format_seconds(secs: f64) -> String {
    if !secs.is_finite() {
        return "∞".into();
    }

    let total = secs.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let mins = (total % 3_600) / 60;
    let secs = total % 60;
    format!("{}d {:02}h {:02}m {:02}s", days, hours, mins, secs)
}

/// Formats an optional duration, `None` rendering as infinite.
pub fn format_eta(eta: Option<Duration>) -> String {
    format_seconds(eta.map_or(f64::INFINITY, |d| d.as_secs_f64()))
}

/// One observation taken by the reporter.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSample {
    pub keys_per_second: f64,
    pub total: u64,
    pub elapsed: Duration,
    pub eta: Option<Duration>,
}

impl StatsSample {
    /// Builds a sample from the counter delta over `interval`.
    pub fn from_delta(
        delta: u64,
        interval: Duration,
        total: u64,
        elapsed: Duration,
        expected: ExpectedTrials,
    ) -> Self {
        let secs = interval.as_secs_f64();
        let keys_per_second = if secs > 0.0 { delta as f64 / secs } else { 0.0 };

        Self {
            keys_per_second,
            total,
            elapsed,
            eta: expected.eta(keys_per_second),
        }
    }
}

impl fmt::Display for StatsSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "|Average keys per second: {:.0}| |Total tries: {}| |Calculated wait time: {}/{}|",
            self.keys_per_second,
            self.total,
            format_seconds(self.elapsed.as_secs_f64()),
            format_eta(self.eta),
        )
    }
}

/// Periodically logs throughput and the expected waiting time.
pub struct StatsReporter {
    counter: Arc<TrialCounter>,
    expected: ExpectedTrials,
    interval: Duration,
    cancel: CancelToken,
    start: Instant,
    /// Counter value at the previous sample
    last: u64,
}

impl StatsReporter {
    pub fn new(
        counter: Arc<TrialCounter>,
        expected: ExpectedTrials,
        interval: Duration,
        cancel: CancelToken,
    ) -> Self {
        let last = counter.trials();
        Self {
            counter,
            expected,
            interval,
            cancel,
            start: Instant::now(),
            last,
        }
    }

    /// Runs the reporter on its own thread until the token is cancelled.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("sleipnir-stats".into())
            .spawn(move || self.run())
    }

    /// Runs the reporter loop on the current thread.
    pub fn run(mut self) {
        let ticker = tick(self.interval);
        let cancelled = self.cancel.cancelled().clone();

        info!("Expected tries: {}", self.expected);

        loop {
            select! {
                recv(cancelled) -> _ => {
                    debug!("stopping stats loop");
                    return;
                }
                recv(ticker) -> _ => {
                    let sample = self.sample();
                    info!("{}", sample);
                }
            }
        }
    }

    /// Takes one observation covering the trials since the previous one.
    pub fn sample(&mut self) -> StatsSample {
        let total = self.counter.trials();
        let sample = StatsSample::from_delta(
            total.saturating_sub(self.last),
            self.interval,
            total,
            self.start.elapsed(),
            self.expected,
        );
        self.last = total;
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "0d 00h 00m 00s");
        assert_eq!(format_seconds(90061.5), "1d 01h 01m 01s");
        assert_eq!(format_seconds(f64::INFINITY), "∞");
    }

    #[test]
    fn test_sample_rate_and_eta() {
        let sample = StatsSample::from_delta(
            5_000,
            Duration::from_secs(5),
            20_000,
            Duration::from_secs(20),
            ExpectedTrials::Finite(10_000.0),
        );
        assert_eq!(sample.keys_per_second, 1_000.0);
        assert_eq!(sample.eta, Some(Duration::from_secs(10)));
        assert!(sample.to_string().contains("0d 00h 00m 10s"));
    }

    #[test]
    fn test_zero_throughput_is_infinite() {
        let sample = StatsSample::from_delta(
            0,
            Duration::from_secs(5),
            0,
            Duration::from_secs(5),
            ExpectedTrials::Finite(10.0),
        );
        assert_eq!(sample.eta, None);
        assert!(sample.to_string().ends_with("/∞|"));
    }

    #[test]
    fn test_unbounded_is_infinite() {
        let sample = StatsSample::from_delta(
            100,
            Duration::from_secs(1),
            100,
            Duration::from_secs(1),
            ExpectedTrials::Unbounded,
        );
        assert_eq!(sample.eta, None);
    }

    #[test]
    fn test_reporter_stops_on_cancel() {
        let cancel = CancelToken::new();
        let reporter = StatsReporter::new(
            Arc::new(TrialCounter::new()),
            ExpectedTrials::Unbounded,
            Duration::from_secs(60),
            cancel.clone(),
        );
        let handle = reporter.spawn().unwrap();
        cancel.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn test_samples_are_per_interval() {
        let counter = Arc::new(TrialCounter::new());
        counter.add_trials(40);
        let mut reporter = StatsReporter::new(
            counter.clone(),
            ExpectedTrials::Finite(1_000.0),
            Duration::from_secs(2),
            CancelToken::new(),
        );

        counter.add_trials(200);
        let first = reporter.sample();
        assert_eq!(first.total, 240);
        assert_eq!(first.keys_per_second, 100.0);
        assert_eq!(first.eta, Some(Duration::from_secs(10)));

        counter.add_trials(50);
        let second = reporter.sample();
        assert_eq!(second.total, 290);
        assert_eq!(second.keys_per_second, 25.0);

        let idle = reporter.sample();
        assert_eq!(idle.keys_per_second, 0.0);
        assert_eq!(idle.eta, None);
    }

    #[test]
    fn test_counter() {
        let counter = TrialCounter::new();
        counter.add_trials(3);
        counter.add_trials(4);
        counter.record_match();
        assert_eq!(counter.trials(), 7);
        assert_eq!(counter.matches(), 1);
    }
}
