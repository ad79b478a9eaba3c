//! Batched key search on compute devices.
//!
//! The engine is generic over [`ComputeDevice`]; the OpenCL backend is
//! available with the `gpu` feature.

mod device;
mod engine;
#[cfg(feature = "gpu")]
mod opencl;
#[cfg(test)]
pub(crate) mod testing;

pub use device::{
    global_work_size, BufferAccess, ComputeDevice, DeviceBuffers, KernelArgs, KERNEL_NAME,
    LOCAL_WORK_SIZE,
};
pub use engine::GpuBatchEngine;
#[cfg(feature = "gpu")]
pub use opencl::{list_devices, OpenClDevice};

use crate::crypto::KeyError;

/// Errors that can occur during GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No GPU device found")]
    DeviceNotFound,

    #[error("GPU initialization failed: {0}")]
    InitFailed(String),

    #[error("Failed to read kernel source {path}: {source}")]
    KernelSource {
        path: String,
        source: std::io::Error,
    },

    #[error("Kernel compilation failed: {0}")]
    KernelCompile(String),

    #[error("Buffer operation failed: {0}")]
    BufferError(String),

    #[error("Kernel execution failed: {0}")]
    KernelExec(String),

    #[error("Seed generation failed: {0}")]
    Random(String),

    #[error("Result export failed: {0}")]
    Key(#[from] KeyError),
}
