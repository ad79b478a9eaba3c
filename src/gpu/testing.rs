//! In-process device that emulates the kernel contract on the host.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::crypto::wire::PUBLIC_KEY_LEN;
use crate::crypto::{Keypair, WireFormatter, KEYPAIR_LEN, SEED_LEN};
use crate::matcher::{Location, PatternSet};

use super::device::{BufferAccess, ComputeDevice, DeviceBuffers, KernelArgs};
use super::GpuError;

#[derive(Debug)]
pub struct EmulatedBuffer {
    pub access: BufferAccess,
    pub data: Vec<u8>,
}

/// Runs the matching kernel semantics with the CPU implementation.
#[derive(Debug, Default)]
pub struct EmulatedDevice {
    allocations: Mutex<Vec<usize>>,
    launches: AtomicUsize,
    suppress_matches: AtomicBool,
    corrupt_results: AtomicBool,
    fail_launch: bool,
}

impl EmulatedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device whose every launch fails.
    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    /// Buffer sizes in allocation order.
    pub fn allocations(&self) -> Vec<usize> {
        self.allocations.lock().unwrap().clone()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// When set, launches report no matches at all.
    pub fn set_suppress_matches(&self, suppress: bool) {
        self.suppress_matches.store(suppress, Ordering::SeqCst);
    }

    /// When set, the first result slot holds a mismatching public key.
    pub fn set_corrupt_results(&self, corrupt: bool) {
        self.corrupt_results.store(corrupt, Ordering::SeqCst);
    }
}

impl ComputeDevice for EmulatedDevice {
    type Buffer = EmulatedBuffer;

    fn name(&self) -> String {
        "emulated".into()
    }

    fn allocate(&self, access: BufferAccess, len: usize) -> Result<EmulatedBuffer, GpuError> {
        self.allocations.lock().unwrap().push(len);
        Ok(EmulatedBuffer {
            access,
            data: vec![0xEE; len],
        })
    }

    fn write(&self, buffer: &mut EmulatedBuffer, data: &[u8]) -> Result<(), GpuError> {
        if data.len() > buffer.data.len() {
            return Err(GpuError::BufferError("write past end of buffer".into()));
        }
        buffer.data[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, buffer: &EmulatedBuffer, out: &mut [u8]) -> Result<(), GpuError> {
        if out.len() > buffer.data.len() {
            return Err(GpuError::BufferError("read past end of buffer".into()));
        }
        out.copy_from_slice(&buffer.data[..out.len()]);
        Ok(())
    }

    fn launch(
        &self,
        buffers: &mut DeviceBuffers<EmulatedBuffer>,
        args: &KernelArgs,
        _global_work_size: usize,
        _local_work_size: usize,
    ) -> Result<(), GpuError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(GpuError::KernelExec("emulated failure".into()));
        }

        let pattern = String::from_utf8_lossy(&buffers.pattern.data[..args.pattern_len as usize])
            .into_owned();
        let location = Location::from_device_code(args.location)
            .ok_or_else(|| GpuError::KernelExec("bad location code".into()))?;
        let patterns = PatternSet::new([pattern], location, args.ignore_case == 0);

        let mut count_bytes = [0u8; 4];
        count_bytes.copy_from_slice(&buffers.match_count.data[..4]);
        let mut count = u32::from_ne_bytes(count_bytes) as usize;

        let mut formatter = WireFormatter::new();
        for i in 0..args.batch_size as usize {
            if self.suppress_matches.load(Ordering::SeqCst) {
                break;
            }
            let mut seed = [0u8; SEED_LEN];
            seed.copy_from_slice(&buffers.seeds.data[i * SEED_LEN..(i + 1) * SEED_LEN]);
            let keypair = Keypair::from_seed(&seed);
            let public = keypair.public_key_bytes();
            if !patterns.matches(formatter.encode(&public)).is_match() {
                continue;
            }

            let pub_slot = count * PUBLIC_KEY_LEN;
            let priv_slot = count * KEYPAIR_LEN;
            buffers.public_keys.data[pub_slot..pub_slot + PUBLIC_KEY_LEN].copy_from_slice(&public);
            buffers.private_keys.data[priv_slot..priv_slot + SEED_LEN].copy_from_slice(&seed);
            buffers.private_keys.data[priv_slot + SEED_LEN..priv_slot + KEYPAIR_LEN]
                .copy_from_slice(&public);
            count += 1;
        }

        if self.corrupt_results.load(Ordering::SeqCst) && count > 0 {
            buffers.public_keys.data[0] ^= 0x01;
        }

        buffers.match_count.data[..4].copy_from_slice(&(count as u32).to_ne_bytes());
        Ok(())
    }
}
