//! Error types shared by every exercise.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a benchmark run.
///
/// Only the platform version fallback in [`crate::platform`] is recovered
/// locally; every variant here is fatal to the run that produced it.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("no OpenCL device available: {0}")]
    DeviceUnavailable(String),

    #[error("failed to build kernel `{kernel}`:\n{log}")]
    CompileFailure { kernel: String, log: String },

    #[error(
        "device result diverges from host reference at index {index} \
         (device={device}, host={host}); {mismatches} of {total} elements out of tolerance"
    )]
    ResultMismatch {
        index: usize,
        device: f32,
        host: f32,
        mismatches: usize,
        total: usize,
    },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("cannot read kernel source {}", path.display())]
    KernelSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("kernel `{kernel}` argument {position}: expected {expected}, found {found}")]
    ArgumentMismatch {
        kernel: String,
        position: usize,
        expected: String,
        found: String,
    },

    #[error("OpenCL runtime error: {0}")]
    Runtime(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(feature = "opencl")]
impl From<ocl::Error> for BenchError {
    fn from(err: ocl::Error) -> Self {
        BenchError::Runtime(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_index_and_values() {
        let err = BenchError::ResultMismatch {
            index: 7,
            device: 1.5,
            host: 2.0,
            mismatches: 3,
            total: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("index 7"), "{msg}");
        assert!(msg.contains("3 of 16"), "{msg}");
    }

    #[test]
    fn kernel_source_error_keeps_io_source() {
        use std::error::Error as _;
        let err = BenchError::KernelSource {
            path: PathBuf::from("kernels/missing.cl"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("kernels/missing.cl"));
        assert!(err.source().is_some());
    }
}
