//! CPU-based worker for vanity key generation.

use std::sync::Arc;

use log::debug;

use crate::crypto::wire::ENCODED_LEN;
use crate::crypto::{Keypair, WireFormatter};
use crate::matcher::PatternSet;

use super::{CancelToken, FoundResult, ResultSlot, SearchError, TrialCounter};

/// A CPU worker that generates and tests keypairs.
pub struct CpuWorker {
    /// Worker ID
    id: usize,
    /// The patterns to match against
    patterns: PatternSet,
    /// Where results are published
    slot: ResultSlot,
    /// Shared cancellation token
    cancel: CancelToken,
    /// Shared trial counter
    counter: Arc<TrialCounter>,
}

impl CpuWorker {
    /// Creates a new CPU worker.
    pub fn new(
        id: usize,
        patterns: PatternSet,
        slot: ResultSlot,
        cancel: CancelToken,
        counter: Arc<TrialCounter>,
    ) -> Self {
        Self {
            id,
            patterns,
            slot,
            cancel,
            counter,
        }
    }

    /// Runs the worker loop.
    ///
    /// Generates keypairs and tests them against the patterns until:
    /// - The token is cancelled
    /// - A match is published (single-shot mode)
    /// - Key generation or export fails (returned as an error)
    pub fn run(&self) -> Result<(), SearchError> {
        let mut formatter = WireFormatter::new();
        let mut scratch = String::with_capacity(ENCODED_LEN);

        while !self.cancel.is_cancelled() {
            let keypair = Keypair::generate()?;
            let encoded = formatter.encode(&keypair.public_key_bytes());

            if !self.patterns.matches_with(encoded, &mut scratch).is_match() {
                self.counter.add_trials(1);
                continue;
            }

            let result = FoundResult::from_keypair(&keypair, encoded.to_owned(), self.id)?;
            self.counter.record_match();
            debug!(
                "worker {} found a match after {} tries",
                self.id,
                self.counter.trials()
            );

            if !self.slot.publish(result) {
                break;
            }
        }

        debug!("stopping cpu worker {}", self.id);
        Ok(())
    }

    /// Returns the worker ID.
    pub fn id(&self) -> usize {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::wire::{authorized_key_line, PAYLOAD_OFFSET};
    use crate::matcher::Location;
    use crate::worker::PublishMode;

    #[test]
    fn test_worker_publishes_matching_key() {
        let cancel = CancelToken::new();
        let counter = Arc::new(TrialCounter::new());
        let (slot, rx) = ResultSlot::new(PublishMode::SingleShot, cancel.clone());
        let patterns = PatternSet::new(["a"], Location::Start, false);

        let worker = CpuWorker::new(3, patterns, slot, cancel, counter.clone());
        worker.run().unwrap();

        let result = rx.try_recv().unwrap();
        assert_eq!(result.worker_id, 3);
        assert!(result.public_key[PAYLOAD_OFFSET..]
            .to_lowercase()
            .starts_with('a'));
        assert!(ssh_key::PublicKey::from_openssh(&authorized_key_line(&result.public_key)).is_ok());
        assert_eq!(counter.matches(), 1);
    }

    #[test]
    fn test_worker_exits_when_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let (slot, rx) = ResultSlot::new(PublishMode::SingleShot, cancel.clone());
        let counter = Arc::new(TrialCounter::new());
        let patterns = PatternSet::new(["a"], Location::Anywhere, false);

        CpuWorker::new(0, patterns, slot, cancel, counter.clone())
            .run()
            .unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(counter.trials(), 0);
    }
}
