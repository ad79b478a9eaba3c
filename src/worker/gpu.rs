//! Worker that drives a [`GpuBatchEngine`] until cancelled.

use std::sync::Arc;

use log::{debug, info};

use crate::gpu::{ComputeDevice, GpuBatchEngine};

use super::{CancelToken, ResultSlot, SearchError, TrialCounter};

/// Runs device batches back to back, one batch being one trial group.
pub struct GpuWorker<D: ComputeDevice> {
    id: usize,
    engine: GpuBatchEngine<D>,
    slot: ResultSlot,
    cancel: CancelToken,
    counter: Arc<TrialCounter>,
}

impl<D: ComputeDevice> GpuWorker<D> {
    pub fn new(
        id: usize,
        engine: GpuBatchEngine<D>,
        slot: ResultSlot,
        cancel: CancelToken,
        counter: Arc<TrialCounter>,
    ) -> Self {
        Self {
            id,
            engine: engine.with_worker_id(id),
            slot,
            cancel,
            counter,
        }
    }

    /// Runs the batch loop. Device errors end the loop and are returned.
    pub fn run(mut self) -> Result<(), SearchError> {
        info!(
            "GPU worker {}: {} seeds per batch on {}",
            self.id,
            self.engine.batch_size(),
            self.engine.device().name()
        );
        let batch = self.engine.batch_size() as u64;

        while !self.cancel.is_cancelled() {
            let found = self.engine.run_batch()?;
            self.counter.add_trials(batch);

            if let Some(result) = found {
                self.counter.record_match();
                if !self.slot.publish(result) {
                    break;
                }
            }
        }

        debug!("stopping gpu worker {}", self.id);
        Ok(())
    }
}
