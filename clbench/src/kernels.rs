//! OpenCL C sources for the exercises.
//!
//! The vector-addition kernels are small enough to live inline. The matrix
//! multiplication and reduction kernels ship as companion `.cl` files under
//! the workspace `kernels/` directory and are read at start-up.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BenchError, Result};

/// `c = a + b`.
pub const VEC_ADD: &str = r#"
__kernel void vec_add(__global const float *a, __global const float *b, __global float *c)
{
    int i = get_global_id(0);
    c[i] = a[i] + b[i];
}
"#;

/// `c = a + b`, launched repeatedly to build a dependency chain on one queue.
pub const VEC_ADD_CHAINED: &str = r#"
__kernel void vec_add_verbose(__global const float *a, __global const float *b, __global float *c)
{
    int i = get_global_id(0);
    c[i] = a[i] + b[i];
}
"#;

/// `d = a + b + c` in a single pass.
pub const VEC_ADD3: &str = r#"
__kernel void vec_add(__global const float *a, __global const float *b,
                      __global const float *c, __global float *d)
{
    int i = get_global_id(0);
    d[i] = a[i] + b[i] + c[i];
}
"#;

/// Default location of the companion kernel files, relative to the
/// workspace root.
pub const DEFAULT_KERNEL_DIR: &str = "kernels";

/// A kernel source file shipped alongside the binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelFile {
    MatmulCore,
    MatmulRow,
    MatmulRowPrivate,
    MatmulRowLocalColumn,
    MatmulBlocked,
    SimplePi,
}

impl KernelFile {
    pub const ALL: [KernelFile; 6] = [
        KernelFile::MatmulCore,
        KernelFile::MatmulRow,
        KernelFile::MatmulRowPrivate,
        KernelFile::MatmulRowLocalColumn,
        KernelFile::MatmulBlocked,
        KernelFile::SimplePi,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            KernelFile::MatmulCore => "matmul_core.cl",
            KernelFile::MatmulRow => "matmul_wi_row.cl",
            KernelFile::MatmulRowPrivate => "matmul_wi_row_private.cl",
            KernelFile::MatmulRowLocalColumn => "matmul_wi_row_private_wg_col_local.cl",
            KernelFile::MatmulBlocked => "matmul_blocked.cl",
            KernelFile::SimplePi => "simple_pi.cl",
        }
    }

    /// Name of the `__kernel` entry point defined in the file.
    pub fn kernel_name(self) -> &'static str {
        match self {
            KernelFile::MatmulBlocked => "mmul",
            KernelFile::SimplePi => "get_pi",
            _ => "mat_mul",
        }
    }

    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }

    /// Reads the file from `dir`. A missing file is fatal to the exercise.
    pub fn load(self, dir: &Path) -> Result<String> {
        let path = self.path_in(dir);
        debug!(path = %path.display(), "loading kernel source");
        fs::read_to_string(&path).map_err(|source| BenchError::KernelSource { path, source })
    }
}
