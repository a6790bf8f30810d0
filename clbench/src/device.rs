//! OpenCL context, queue, buffers and kernels for the exercises.

use std::fmt::Display;

use ocl::core::get_platform_ids;
use ocl::enums::{DeviceInfo, PlatformInfo};
use ocl::flags::MemFlags;
use ocl::{Buffer, Context, Device, Kernel, Platform, Program, Queue};
use tracing::{debug, info};

use crate::error::{BenchError, Result};
use crate::harness::DeviceRun;
use crate::launch::Launch;
use crate::reference;
use crate::signature::{KernelSignature, ParamKind};

fn runtime<E: Display>(err: E) -> BenchError {
    BenchError::Runtime(err.to_string())
}

/// Which platform and device to run on, by enumeration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceSelection {
    pub platform: usize,
    pub device: usize,
}

/// A context with one in-order command queue on one device.
#[derive(Debug, Clone)]
pub struct ClEnv {
    device: Device,
    context: Context,
    queue: Queue,
    device_name: String,
}

impl ClEnv {
    pub fn new(selection: DeviceSelection) -> Result<Self> {
        let ids = get_platform_ids().map_err(|e| BenchError::DeviceUnavailable(e.to_string()))?;
        let id = ids.get(selection.platform).copied().ok_or_else(|| {
            BenchError::DeviceUnavailable(format!(
                "platform {} requested but {} found",
                selection.platform,
                ids.len()
            ))
        })?;
        let platform = Platform::new(id);

        let devices =
            Device::list_all(platform).map_err(|e| BenchError::DeviceUnavailable(e.to_string()))?;
        let device = devices.get(selection.device).cloned().ok_or_else(|| {
            BenchError::DeviceUnavailable(format!(
                "device {} requested but platform {} has {}",
                selection.device,
                selection.platform,
                devices.len()
            ))
        })?;

        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(runtime)?;
        let queue = Queue::new(&context, device, None).map_err(runtime)?;

        let device_name = device
            .info(DeviceInfo::Name)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "unknown device".into());
        let platform_name = platform
            .info(PlatformInfo::Name)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "unknown platform".into());
        info!(platform = %platform_name, device = %device_name, "selected OpenCL device");

        Ok(Self {
            device,
            context,
            queue,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Builds `source` for this device after confirming it declares
    /// `kernel_name`. Build errors carry the compiler log.
    pub fn compile(&self, source: &str, kernel_name: &str) -> Result<CompiledKernel> {
        let signature = KernelSignature::parse(source, kernel_name)?;
        debug!(kernel = kernel_name, params = signature.params.len(), "building program");
        let program = Program::builder()
            .devices(self.device)
            .src(source)
            .build(&self.context)
            .map_err(|e| BenchError::CompileFailure {
                kernel: kernel_name.to_string(),
                log: e.to_string(),
            })?;
        Ok(CompiledKernel { program, signature })
    }

    /// Read-only device copy of `data`.
    pub fn input(&self, data: &[f32]) -> Result<Buffer<f32>> {
        Buffer::<f32>::builder()
            .queue(self.queue.clone())
            .flags(MemFlags::new().read_only())
            .len(data.len())
            .copy_host_slice(data)
            .build()
            .map_err(runtime)
    }

    /// Uninitialized buffer written by one kernel and read by the next.
    pub fn intermediate(&self, len: usize) -> Result<Buffer<f32>> {
        Buffer::<f32>::builder()
            .queue(self.queue.clone())
            .flags(MemFlags::new().read_write())
            .len(len)
            .build()
            .map_err(runtime)
    }

    /// Uninitialized buffer only written by the device.
    pub fn output(&self, len: usize) -> Result<Buffer<f32>> {
        Buffer::<f32>::builder()
            .queue(self.queue.clone())
            .flags(MemFlags::new().write_only())
            .len(len)
            .build()
            .map_err(runtime)
    }

    /// Binds `args` to a kernel of `compiled`, checking them against its
    /// declared parameters first.
    pub fn bind(
        &self,
        compiled: &CompiledKernel,
        args: &[ArgBinding<'_>],
        launch: &Launch,
    ) -> Result<Kernel> {
        let kinds: Vec<ParamKind> = args.iter().map(ArgBinding::kind).collect();
        compiled.signature.check(&kinds)?;

        let mut builder = Kernel::builder();
        builder
            .program(&compiled.program)
            .name(compiled.signature.name.as_str())
            .queue(self.queue.clone())
            .global_work_size(launch.global);
        for arg in args {
            match *arg {
                ArgBinding::Int(value) => {
                    builder.arg(value);
                }
                ArgBinding::Uint(value) => {
                    builder.arg(value);
                }
                ArgBinding::Float(value) => {
                    builder.arg(value);
                }
                ArgBinding::Global(buffer) => {
                    builder.arg(buffer);
                }
                ArgBinding::Local(len) => {
                    builder.arg_local::<f32>(len);
                }
            }
        }
        builder.build().map_err(|e| BenchError::CompileFailure {
            kernel: compiled.signature.name.clone(),
            log: e.to_string(),
        })
    }
}

/// A built program together with the declaration of its entry point.
#[derive(Debug, Clone)]
pub struct CompiledKernel {
    program: Program,
    signature: KernelSignature,
}

/// One positional kernel argument.
#[derive(Debug, Clone, Copy)]
pub enum ArgBinding<'a> {
    Int(i32),
    Uint(u32),
    Float(f32),
    Global(&'a Buffer<f32>),
    /// `__local float*` of the given number of elements.
    Local(usize),
}

impl ArgBinding<'_> {
    pub fn kind(&self) -> ParamKind {
        match self {
            ArgBinding::Int(_) => ParamKind::Int,
            ArgBinding::Uint(_) => ParamKind::Uint,
            ArgBinding::Float(_) => ParamKind::Float,
            ArgBinding::Global(_) => ParamKind::GlobalF32,
            ArgBinding::Local(_) => ParamKind::LocalF32,
        }
    }
}

/// How [`KernelChain::read_output`] turns the output buffer into a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readback {
    /// The whole buffer, element for element.
    #[default]
    Full,
    /// A single element: the sum of the buffer's partial sums.
    Sum,
}

/// Kernels enqueued back to back on one queue, followed by a copy of one
/// output buffer. The buffers bound to the kernels are owned here so they
/// are released together when the chain is dropped.
#[derive(Debug)]
pub struct KernelChain {
    queue: Queue,
    kernels: Vec<Kernel>,
    #[allow(dead_code)]
    buffers: Vec<Buffer<f32>>,
    output: Buffer<f32>,
    readback: Readback,
}

impl KernelChain {
    pub fn new(env: &ClEnv, kernels: Vec<Kernel>, output: Buffer<f32>) -> Self {
        Self {
            queue: env.queue().clone(),
            kernels,
            buffers: Vec::new(),
            output,
            readback: Readback::Full,
        }
    }

    /// Keeps input and intermediate buffers alive for the chain's lifetime.
    pub fn holding(mut self, buffers: Vec<Buffer<f32>>) -> Self {
        self.buffers = buffers;
        self
    }

    pub fn with_readback(mut self, readback: Readback) -> Self {
        self.readback = readback;
        self
    }
}

impl DeviceRun for KernelChain {
    fn submit(&mut self, launch: &Launch) -> Result<()> {
        for kernel in &self.kernels {
            let mut cmd = kernel.cmd().global_work_size(launch.global);
            if let Some(local) = launch.local.fixed() {
                cmd = cmd.local_work_size(local);
            }
            // Arguments were checked against the kernel declaration in
            // `ClEnv::bind` and every buffer outlives the chain.
            unsafe {
                cmd.enq()?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.queue.finish()?;
        Ok(())
    }

    fn read_output(&mut self) -> Result<Vec<f32>> {
        let mut out = vec![0.0f32; self.output.len()];
        self.output.read(&mut out).enq()?;
        Ok(match self.readback {
            Readback::Full => out,
            Readback::Sum => vec![reference::sum_partials(&out) as f32],
        })
    }
}
