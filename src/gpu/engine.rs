//! Batched key search on a compute device.
//!
//! 1. Host fills a batch of 32-byte seeds from the OS CSPRNG
//! 2. Device expands every seed into a keypair and matches its wire encoding
//! 3. Host reads back the match count and the first result slot
//! 4. Host rebuilds and re-checks the keypair before exposing it

use log::{debug, warn};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::wire::PUBLIC_KEY_LEN;
use crate::crypto::{Keypair, WireFormatter, KEYPAIR_LEN, SEED_LEN};
use crate::matcher::PatternSet;
use crate::worker::FoundResult;

use super::device::{
    global_work_size, BufferAccess, ComputeDevice, DeviceBuffers, KernelArgs, LOCAL_WORK_SIZE,
};
use super::GpuError;

/// Size of the match counter in bytes.
const COUNT_LEN: usize = 4;

/// A device session with buffers sized for one batch size and pattern.
///
/// Changing either requires a new engine. Device resources are released
/// when the engine is dropped.
pub struct GpuBatchEngine<D: ComputeDevice> {
    device: D,
    buffers: DeviceBuffers<D::Buffer>,
    args: KernelArgs,
    batch_size: usize,
    /// Pattern bytes uploaded to the device
    pattern: Vec<u8>,
    /// Full pattern set, used to re-check device results
    patterns: PatternSet,
    /// Host seed buffer, refilled on every call
    seeds: Vec<u8>,
    /// Worker ID reported with results
    worker_id: usize,
}

impl<D: ComputeDevice> GpuBatchEngine<D> {
    /// Allocates the session buffers on `device`.
    ///
    /// The device kernel takes a single pattern; only the first one of
    /// `patterns` is uploaded.
    pub fn new(device: D, batch_size: usize, patterns: PatternSet) -> Result<Self, GpuError> {
        let first = patterns
            .patterns()
            .first()
            .ok_or_else(|| GpuError::InitFailed("pattern set is empty".into()))?;
        if batch_size == 0 || batch_size > u32::MAX as usize {
            return Err(GpuError::InitFailed(format!(
                "invalid batch size {}",
                batch_size
            )));
        }
        if patterns.patterns().len() > 1 {
            warn!(
                "GPU engine only searches for '{}'; CPU workers search all patterns",
                first
            );
        }

        let pattern = first.as_bytes().to_vec();
        let args = KernelArgs {
            batch_size: batch_size as u32,
            pattern_len: pattern.len() as u32,
            location: patterns.location().device_code(),
            ignore_case: u32::from(!patterns.case_sensitive()),
        };

        let buffers = DeviceBuffers {
            seeds: device.allocate(BufferAccess::ReadOnly, batch_size * SEED_LEN)?,
            public_keys: device.allocate(BufferAccess::WriteOnly, batch_size * PUBLIC_KEY_LEN)?,
            private_keys: device.allocate(BufferAccess::WriteOnly, batch_size * KEYPAIR_LEN)?,
            match_count: device.allocate(BufferAccess::ReadWrite, COUNT_LEN)?,
            pattern: device.allocate(BufferAccess::ReadOnly, pattern.len())?,
        };

        Ok(Self {
            device,
            buffers,
            args,
            batch_size,
            pattern,
            patterns,
            seeds: vec![0u8; batch_size * SEED_LEN],
            worker_id: 0,
        })
    }

    /// Sets the worker ID attached to results.
    pub fn with_worker_id(mut self, worker_id: usize) -> Self {
        self.worker_id = worker_id;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Seeds generated by the most recent call.
    pub fn host_seeds(&self) -> &[u8] {
        &self.seeds
    }

    /// Runs one batch. `Ok(None)` means the batch held no (valid) match.
    pub fn run_batch(&mut self) -> Result<Option<FoundResult>, GpuError> {
        OsRng
            .try_fill_bytes(&mut self.seeds)
            .map_err(|e| GpuError::Random(e.to_string()))?;

        self.device
            .write(&mut self.buffers.match_count, &[0u8; COUNT_LEN])?;
        self.device.write(&mut self.buffers.seeds, &self.seeds)?;
        self.device.write(&mut self.buffers.pattern, &self.pattern)?;

        self.device.launch(
            &mut self.buffers,
            &self.args,
            global_work_size(self.batch_size),
            LOCAL_WORK_SIZE,
        )?;

        let mut count = [0u8; COUNT_LEN];
        self.device.read(&self.buffers.match_count, &mut count)?;
        let count = u32::from_ne_bytes(count);
        if count == 0 {
            return Ok(None);
        }
        if count > 1 {
            debug!(
                "batch produced {} matches, only the first slot is read back",
                count
            );
        }

        let mut public = [0u8; PUBLIC_KEY_LEN];
        let mut private = [0u8; KEYPAIR_LEN];
        self.device.read(&self.buffers.public_keys, &mut public)?;
        self.device.read(&self.buffers.private_keys, &mut private)?;

        self.reconstruct(&public, &private)
    }

    /// Rebuilds a result from the first slot, rejecting inconsistent data.
    fn reconstruct(
        &self,
        public: &[u8; PUBLIC_KEY_LEN],
        private: &[u8; KEYPAIR_LEN],
    ) -> Result<Option<FoundResult>, GpuError> {
        let keypair = match Keypair::from_keypair_bytes(private) {
            Ok(keypair) => keypair,
            Err(e) => {
                warn!("discarding device result: {}", e);
                return Ok(None);
            }
        };
        if keypair.public_key_bytes() != *public {
            warn!("discarding device result: public key slot does not match private key");
            return Ok(None);
        }
        if !self.seeds.chunks_exact(SEED_LEN).any(|s| s == &private[..SEED_LEN]) {
            warn!("discarding device result: seed was not part of this batch");
            return Ok(None);
        }

        let mut formatter = WireFormatter::new();
        let encoded = formatter.encode(public);
        if !self.patterns.matches(encoded).is_match() {
            warn!("discarding device result: {} does not match", encoded);
            return Ok(None);
        }

        let result = FoundResult::from_keypair(&keypair, encoded.to_owned(), self.worker_id)?;
        Ok(Some(result))
    }
}
