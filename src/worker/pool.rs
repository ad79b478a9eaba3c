//! Worker pool management.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver};
use log::{debug, error};

use crate::config::SearchConfig;
use crate::crypto::wire::authorized_key_line;
use crate::crypto::{KeyError, Keypair};
use crate::gpu::{ComputeDevice, GpuBatchEngine};

use super::cpu::CpuWorker;
use super::gpu::GpuWorker;
use super::stats::{StatsReporter, TrialCounter};
use super::{CancelToken, PublishMode, ResultSlot, SearchError};

/// A matching keypair, fully exported.
#[derive(Debug, Clone)]
pub struct FoundResult {
    /// Base64 wire encoding of the public key (without the algorithm name)
    pub public_key: String,
    /// OpenSSH private key
    pub private_key_openssh: String,
    /// PKCS#8 PEM private key
    pub private_key_pkcs8: String,
    /// The ID of the worker that found this result
    pub worker_id: usize,
}

impl FoundResult {
    /// Exports `keypair` in both private key formats.
    pub fn from_keypair(
        keypair: &Keypair,
        public_key: String,
        worker_id: usize,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            private_key_openssh: keypair.to_openssh("")?,
            private_key_pkcs8: keypair.to_pkcs8_pem()?,
            public_key,
            worker_id,
        })
    }

    /// Returns the public key as an authorized_keys line.
    pub fn authorized_key(&self) -> String {
        authorized_key_line(&self.public_key)
    }
}

/// Races CPU (and optionally GPU) workers to matching keys.
///
/// Dropping the pool cancels the search and joins every thread.
pub struct WorkerPool {
    /// Number of workers
    num_workers: usize,
    /// Worker thread handles
    handles: Vec<JoinHandle<()>>,
    /// Stats reporter thread
    reporter: Option<JoinHandle<()>>,
    /// Producer side handed to each worker
    slot: ResultSlot,
    /// Channel receiver for results
    result_rx: Receiver<FoundResult>,
    /// Shared cancellation token
    cancel: CancelToken,
    /// Shared statistics
    counter: Arc<TrialCounter>,
    /// First fatal worker error
    failure: Arc<Mutex<Option<SearchError>>>,
    /// Start time
    start_time: Instant,
    /// Set once every thread has been joined
    finished: Option<Instant>,
}

impl WorkerPool {
    /// Starts the stats reporter and `config.workers` CPU workers.
    ///
    /// `cancel` is the external cancellation source (e.g. a signal handler).
    pub fn start(config: &SearchConfig, cancel: CancelToken) -> Result<Self, SearchError> {
        let patterns = config.pattern_set();
        let mode = if config.streaming {
            PublishMode::Streaming
        } else {
            PublishMode::SingleShot
        };
        let (slot, result_rx) = ResultSlot::new(mode, cancel.clone());
        let counter = Arc::new(TrialCounter::new());

        let mut pool = Self {
            num_workers: 0,
            handles: Vec::with_capacity(config.workers + 1),
            reporter: None,
            slot,
            result_rx,
            cancel,
            counter,
            failure: Arc::new(Mutex::new(None)),
            start_time: Instant::now(),
            finished: None,
        };

        let reporter = StatsReporter::new(
            pool.counter.clone(),
            patterns.expected_trials(),
            config.report_interval,
            pool.cancel.clone(),
        );
        pool.reporter = Some(reporter.spawn()?);

        for _ in 0..config.workers {
            let worker = CpuWorker::new(
                pool.num_workers,
                patterns.clone(),
                pool.slot.clone(),
                pool.cancel.clone(),
                pool.counter.clone(),
            );
            pool.spawn(format!("sleipnir-worker-{}", worker.id()), move || {
                worker.run()
            })?;
        }

        Ok(pool)
    }

    /// Adds a GPU worker driving `engine`, racing the CPU workers.
    pub fn spawn_gpu<D>(&mut self, engine: GpuBatchEngine<D>) -> Result<(), SearchError>
    where
        D: ComputeDevice + Send + 'static,
        D::Buffer: Send,
    {
        let worker = GpuWorker::new(
            self.num_workers,
            engine,
            self.slot.clone(),
            self.cancel.clone(),
            self.counter.clone(),
        );
        self.spawn("sleipnir-gpu-worker".into(), move || worker.run())
    }

    /// Spawns a worker thread; a returned error cancels the whole search.
    fn spawn<F>(&mut self, name: String, work: F) -> Result<(), SearchError>
    where
        F: FnOnce() -> Result<(), SearchError> + Send + 'static,
    {
        let failure = self.failure.clone();
        let cancel = self.cancel.clone();

        let handle = thread::Builder::new().name(name).spawn(move || {
            if let Err(e) = work() {
                error!("aborting search: {}", e);
                failure
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert(e);
                cancel.cancel();
            }
        })?;

        self.handles.push(handle);
        self.num_workers += 1;
        Ok(())
    }

    /// Single-shot mode: blocks until the first result or cancellation.
    ///
    /// Every worker and the reporter have exited when this returns.
    pub fn wait(&mut self) -> Result<Option<FoundResult>, SearchError> {
        let found = select! {
            recv(self.result_rx) -> msg => msg.ok(),
            recv(self.cancel.cancelled()) -> _ => self.result_rx.try_recv().ok(),
        };

        self.shutdown();

        match (found, self.take_failure()) {
            (Some(result), _) => Ok(Some(result)),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(None),
        }
    }

    /// Streaming mode: hands every result to `on_match` until cancelled.
    ///
    /// Returns the number of results delivered.
    pub fn stream<F>(&mut self, mut on_match: F) -> Result<u64, SearchError>
    where
        F: FnMut(FoundResult),
    {
        let mut delivered = 0;

        loop {
            select! {
                recv(self.result_rx) -> msg => match msg {
                    Ok(result) => {
                        delivered += 1;
                        on_match(result);
                    }
                    Err(_) => break,
                },
                recv(self.cancel.cancelled()) -> _ => break,
            }
        }

        self.shutdown();
        for result in self.result_rx.try_iter() {
            delivered += 1;
            on_match(result);
        }

        match self.take_failure() {
            Some(e) => Err(e),
            None => Ok(delivered),
        }
    }

    /// Cancels the search and joins all threads.
    fn shutdown(&mut self) {
        if self.finished.is_some() {
            return;
        }
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        if let Some(reporter) = self.reporter.take() {
            let _ = reporter.join();
        }
        self.finished = Some(Instant::now());
        debug!("all workers stopped");
    }

    fn take_failure(&self) -> Option<SearchError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Returns the number of workers.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Returns the shared trial counter.
    pub fn counter(&self) -> Arc<TrialCounter> {
        self.counter.clone()
    }

    /// Returns the search duration, frozen once the pool has shut down.
    pub fn elapsed(&self) -> Duration {
        let end = self.finished.unwrap_or_else(Instant::now);
        end.duration_since(self.start_time)
    }

    /// Returns the average generation rate (keys per second).
    pub fn keys_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.counter.trials() as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
