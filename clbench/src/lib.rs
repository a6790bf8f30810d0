//! Host-versus-device benchmarking for a series of OpenCL exercises.
//!
//! - [`harness`]: repeated timing of a device computation against its host
//!   reference, with a closeness check on every repetition
//! - [`launch`], [`closeness`], [`stats`]: the pieces the harness is built from
//! - [`signature`]: kernel parameter lists, used to validate argument bindings
//! - [`matmul`], [`pi`]: problem shapes and their kernel decompositions
//! - [`host`], [`reference`]: host references and host models of the kernels
//! - `device` (feature `opencl`): context, buffers and kernel chains
//! - [`platform`]: platform/device introspection
//! - [`cli`], [`logging`]: flags and subscriber setup shared by the binaries

pub mod cli;
pub mod closeness;
#[cfg(feature = "opencl")]
pub mod device;
pub mod error;
pub mod harness;
pub mod host;
pub mod kernels;
pub mod launch;
pub mod logging;
pub mod matmul;
pub mod pi;
pub mod platform;
pub mod reference;
pub mod signature;
pub mod stats;

pub use closeness::Tolerance;
pub use error::{BenchError, Result};
pub use harness::{BenchConfig, BenchReport, DeviceRun, Harness};
pub use launch::{Extent, Launch, LocalSize};
pub use matmul::{MatmulShape, MatmulVariant};
pub use pi::PiProblem;
pub use stats::TimingStats;

#[cfg(feature = "opencl")]
pub use device::{ArgBinding, ClEnv, DeviceSelection, KernelChain, Readback};
