//! Host-side view of a compute device.

use super::GpuError;

/// Name of the kernel entry point.
pub const KERNEL_NAME: &str = "sleipnir_ed25519_keygen";

/// Work-group size used for every launch.
pub const LOCAL_WORK_SIZE: usize = 256;

/// How the kernel accesses a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Scalar kernel parameters, passed after the five buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelArgs {
    pub batch_size: u32,
    pub pattern_len: u32,
    /// See [`crate::matcher::Location::device_code`]
    pub location: u32,
    pub ignore_case: u32,
}

/// The five buffers of a batch session, in kernel argument order.
#[derive(Debug)]
pub struct DeviceBuffers<B> {
    pub seeds: B,
    pub public_keys: B,
    pub private_keys: B,
    pub match_count: B,
    pub pattern: B,
}

/// A device able to run the vanity kernel.
///
/// Implementations compile the kernel when they are created. Buffers are
/// released when dropped.
pub trait ComputeDevice {
    type Buffer;

    /// Human readable device name.
    fn name(&self) -> String;

    /// Allocates a byte buffer of `len` bytes.
    fn allocate(&self, access: BufferAccess, len: usize) -> Result<Self::Buffer, GpuError>;

    /// Blocking host-to-device copy starting at offset 0.
    fn write(&self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<(), GpuError>;

    /// Blocking device-to-host copy of `out.len()` bytes starting at offset 0.
    fn read(&self, buffer: &Self::Buffer, out: &mut [u8]) -> Result<(), GpuError>;

    /// Runs the kernel and waits for it to finish.
    fn launch(
        &self,
        buffers: &mut DeviceBuffers<Self::Buffer>,
        args: &KernelArgs,
        global_work_size: usize,
        local_work_size: usize,
    ) -> Result<(), GpuError>;
}

/// Rounds `batch_size` up to a whole number of work groups.
pub fn global_work_size(batch_size: usize) -> usize {
    batch_size.div_ceil(LOCAL_WORK_SIZE) * LOCAL_WORK_SIZE
}
