//! Single-slot result hand-off between workers and the coordinator.

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use log::debug;

use super::{CancelToken, FoundResult};

/// How workers behave once they hold a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Try once without blocking, then stop searching.
    SingleShot,
    /// Wait for the slot to drain (or cancellation), then keep searching.
    Streaming,
}

/// Producer side of the one-element result channel.
#[derive(Debug, Clone)]
pub struct ResultSlot {
    tx: Sender<FoundResult>,
    mode: PublishMode,
    cancel: CancelToken,
}

impl ResultSlot {
    /// Creates the slot and the coordinator's receiving end.
    pub fn new(mode: PublishMode, cancel: CancelToken) -> (Self, Receiver<FoundResult>) {
        let (tx, rx) = bounded(1);
        (Self { tx, mode, cancel }, rx)
    }

    /// Publishes a result. Returns whether the caller should keep searching.
    pub fn publish(&self, result: FoundResult) -> bool {
        match self.mode {
            PublishMode::SingleShot => {
                match self.tx.try_send(result) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!("result slot already filled, dropping late match");
                    }
                    Err(TrySendError::Disconnected(_)) => {}
                }
                false
            }
            PublishMode::Streaming => {
                select! {
                    send(self.tx, result) -> _ => {}
                    recv(self.cancel.cancelled()) -> _ => {}
                }
                !self.cancel.is_cancelled()
            }
        }
    }
}
