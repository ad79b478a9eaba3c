//! OpenCL implementation of [`ComputeDevice`].

use std::path::Path;
use std::ptr;

use log::info;
use opencl3::command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE};
use opencl3::context::Context;
use opencl3::device::{get_all_devices, Device, CL_DEVICE_TYPE_GPU};
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY};
use opencl3::program::Program;
use opencl3::types::{cl_uchar, CL_BLOCKING};

use super::device::{BufferAccess, ComputeDevice, DeviceBuffers, KernelArgs, KERNEL_NAME};
use super::GpuError;

/// Lists available OpenCL GPU devices.
pub fn list_devices() -> Vec<String> {
    match get_all_devices(CL_DEVICE_TYPE_GPU) {
        Ok(device_ids) => device_ids
            .iter()
            .filter_map(|&id| {
                let dev = Device::new(id);
                dev.name().ok()
            })
            .collect(),
        Err(_) => vec![],
    }
}

/// An OpenCL GPU with the vanity kernel compiled for it.
///
/// All OpenCL objects are released on drop.
pub struct OpenClDevice {
    name: String,
    kernel: Kernel,
    queue: CommandQueue,
    context: Context,
}

impl OpenClDevice {
    /// Opens GPU `device_index` and compiles the kernel found at `kernel_path`.
    pub fn new(device_index: usize, kernel_path: &Path) -> Result<Self, GpuError> {
        let device_ids =
            get_all_devices(CL_DEVICE_TYPE_GPU).map_err(|e| GpuError::InitFailed(e.to_string()))?;

        let Some(&device_id) = device_ids.get(device_index) else {
            return Err(GpuError::DeviceNotFound);
        };

        let device = Device::new(device_id);
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        info!("Using OpenCL device: {}", name);

        let context =
            Context::from_device(&device).map_err(|e| GpuError::InitFailed(e.to_string()))?;

        let queue =
            CommandQueue::create_default_with_properties(&context, CL_QUEUE_PROFILING_ENABLE, 0)
                .map_err(|e| GpuError::InitFailed(e.to_string()))?;

        let source =
            std::fs::read_to_string(kernel_path).map_err(|source| GpuError::KernelSource {
                path: kernel_path.display().to_string(),
                source,
            })?;

        info!("Compiling OpenCL kernel {}...", kernel_path.display());
        let program = Program::create_and_build_from_source(&context, &source, "")
            .map_err(|e| GpuError::KernelCompile(e.to_string()))?;
        let kernel = Kernel::create(&program, KERNEL_NAME)
            .map_err(|e| GpuError::KernelCompile(e.to_string()))?;
        info!("Kernel compiled successfully");

        Ok(Self {
            name,
            kernel,
            queue,
            context,
        })
    }
}

impl ComputeDevice for OpenClDevice {
    type Buffer = Buffer<cl_uchar>;

    fn name(&self) -> String {
        self.name.clone()
    }

    fn allocate(&self, access: BufferAccess, len: usize) -> Result<Self::Buffer, GpuError> {
        let flags = match access {
            BufferAccess::ReadOnly => CL_MEM_READ_ONLY,
            BufferAccess::WriteOnly => CL_MEM_WRITE_ONLY,
            BufferAccess::ReadWrite => CL_MEM_READ_WRITE,
        };
        unsafe {
            Buffer::<cl_uchar>::create(&self.context, flags, len, ptr::null_mut())
                .map_err(|e| GpuError::BufferError(e.to_string()))
        }
    }

    fn write(&self, buffer: &mut Self::Buffer, data: &[u8]) -> Result<(), GpuError> {
        unsafe {
            self.queue
                .enqueue_write_buffer(buffer, CL_BLOCKING, 0, data, &[])
                .map_err(|e| GpuError::BufferError(e.to_string()))?;
        }
        Ok(())
    }

    fn read(&self, buffer: &Self::Buffer, out: &mut [u8]) -> Result<(), GpuError> {
        unsafe {
            self.queue
                .enqueue_read_buffer(buffer, CL_BLOCKING, 0, out, &[])
                .map_err(|e| GpuError::BufferError(e.to_string()))?;
        }
        Ok(())
    }

    fn launch(
        &self,
        buffers: &mut DeviceBuffers<Self::Buffer>,
        args: &KernelArgs,
        global_work_size: usize,
        local_work_size: usize,
    ) -> Result<(), GpuError> {
        let kernel_event = unsafe {
            ExecuteKernel::new(&self.kernel)
                .set_arg(&buffers.seeds)
                .set_arg(&mut buffers.public_keys)
                .set_arg(&mut buffers.private_keys)
                .set_arg(&mut buffers.match_count)
                .set_arg(&buffers.pattern)
                .set_arg(&args.batch_size)
                .set_arg(&args.pattern_len)
                .set_arg(&args.location)
                .set_arg(&args.ignore_case)
                .set_global_work_size(global_work_size)
                .set_local_work_size(local_work_size)
                .enqueue_nd_range(&self.queue)
                .map_err(|e| GpuError::KernelExec(e.to_string()))?
        };

        kernel_event
            .wait()
            .map_err(|e| GpuError::KernelExec(e.to_string()))
    }
}
