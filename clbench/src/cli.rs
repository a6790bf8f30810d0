//! Command-line flags every exercise accepts.

use std::path::PathBuf;

use clap::Args;

use crate::closeness::Tolerance;
use crate::error::Result;
use crate::harness::BenchConfig;
use crate::kernels::DEFAULT_KERNEL_DIR;

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Number of timed repetitions (exercise default when omitted)
    #[arg(long, short = 'r')]
    pub repeats: Option<usize>,

    /// Seed for the random host inputs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Relative tolerance of the device/host comparison
    #[arg(long)]
    pub rtol: Option<f64>,

    /// Absolute tolerance of the device/host comparison
    #[arg(long)]
    pub atol: Option<f64>,

    /// OpenCL platform index
    #[arg(long, default_value_t = 0)]
    pub platform: usize,

    /// Device index within the platform
    #[arg(long, default_value_t = 0)]
    pub device: usize,

    /// Directory holding the companion .cl files
    #[arg(long, default_value = DEFAULT_KERNEL_DIR)]
    pub kernel_dir: PathBuf,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl CommonArgs {
    /// Merges the flags over an exercise's defaults.
    pub fn bench_config(
        &self,
        default_repeats: usize,
        default_tolerance: Tolerance,
    ) -> Result<BenchConfig> {
        let tolerance = Tolerance::new(
            self.rtol.unwrap_or(default_tolerance.rtol),
            self.atol.unwrap_or(default_tolerance.atol),
        )?;
        BenchConfig::new(self.repeats.unwrap_or(default_repeats), tolerance)
    }

    #[cfg(feature = "opencl")]
    pub fn selection(&self) -> crate::device::DeviceSelection {
        crate::device::DeviceSelection {
            platform: self.platform,
            device: self.device,
        }
    }
}
