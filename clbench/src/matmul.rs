//! Matrix multiplication problem shapes and the kernel variants that solve
//! them.
//!
//! Every variant computes `T = L @ R` for `L` of shape `(M, N)` and `R` of
//! shape `(N, O)`, row-major `f32`. They differ only in how work is split
//! across work items and which memory space each operand is read from.

use std::fmt;
use std::str::FromStr;

use crate::error::{BenchError, Result};
use crate::kernels::KernelFile;
use crate::launch::{Extent, Launch, LocalSize};
use crate::signature::ParamKind;

/// Tile edge of the blocked kernel; matches `#define BLOCK` in
/// `matmul_blocked.cl`.
pub const BLOCK_SIZE: usize = 16;

/// Capacity of the private row buffer; matches `#define MAX_N` in the
/// row-private kernels.
pub const MAX_PRIVATE_ROW: usize = 1024;

/// Work-group size of the one-row-per-work-item variants unless overridden.
pub const DEFAULT_ROW_GROUP: usize = 32;

/// Dimensions of `(M, N) @ (N, O)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatmulShape {
    pub m: usize,
    pub n: usize,
    pub o: usize,
}

impl MatmulShape {
    pub fn new(m: usize, n: usize, o: usize) -> Result<Self> {
        if m == 0 || n == 0 || o == 0 {
            return Err(BenchError::ConfigInvalid(format!(
                "matrix dimensions must be non-zero (M={m}, N={n}, O={o})"
            )));
        }
        // Kernels index with 32-bit ints.
        for (rows, cols) in [(m, n), (n, o), (m, o)] {
            let fits = rows
                .checked_mul(cols)
                .is_some_and(|len| i32::try_from(len).is_ok());
            if !fits {
                return Err(BenchError::ConfigInvalid(format!(
                    "{rows}x{cols} matrix exceeds 32-bit kernel indexing"
                )));
            }
        }
        Ok(Self { m, n, o })
    }

    pub fn square(order: usize) -> Result<Self> {
        Self::new(order, order, order)
    }

    pub fn left_len(&self) -> usize {
        self.m * self.n
    }

    pub fn right_len(&self) -> usize {
        self.n * self.o
    }

    pub fn out_len(&self) -> usize {
        self.m * self.o
    }

    /// One multiply and one add per inner-product term.
    pub fn flops(&self) -> f64 {
        2.0 * self.m as f64 * self.n as f64 * self.o as f64
    }

    /// `N` as the kernels receive it.
    pub fn n_arg(&self) -> i32 {
        self.n as i32
    }

    /// `O` as the kernels receive it.
    pub fn o_arg(&self) -> i32 {
        self.o as i32
    }
}

impl fmt::Display for MatmulShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}x{}) @ ({}x{})", self.m, self.n, self.n, self.o)
    }
}

/// Memory-access strategies for the matmul kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatmulVariant {
    /// One work item per output element.
    Naive,
    /// One work item per output row.
    Row,
    /// One work item per output row, with the row of `L` in private memory.
    RowPrivate,
    /// As `RowPrivate`, with each column of `R` shared through local memory.
    RowLocalColumn,
    /// Square tiles of both operands staged in local memory.
    Blocked,
}

impl MatmulVariant {
    pub const ALL: [MatmulVariant; 5] = [
        MatmulVariant::Naive,
        MatmulVariant::Row,
        MatmulVariant::RowPrivate,
        MatmulVariant::RowLocalColumn,
        MatmulVariant::Blocked,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MatmulVariant::Naive => "naive",
            MatmulVariant::Row => "row",
            MatmulVariant::RowPrivate => "row-private",
            MatmulVariant::RowLocalColumn => "row-local-col",
            MatmulVariant::Blocked => "blocked",
        }
    }

    /// Heading printed above the variant's results.
    pub fn description(self) -> &'static str {
        match self {
            MatmulVariant::Naive => "naive matrix multiplication",
            MatmulVariant::Row => "matrix multiplication (one work-item per row)",
            MatmulVariant::RowPrivate => {
                "matrix multiplication (one work-item per row, 'private' memory)"
            }
            MatmulVariant::RowLocalColumn => {
                "matrix multiplication (one work-item per row in 'private' memory, \
                 work group sharing R column)"
            }
            MatmulVariant::Blocked => "blocked matrix multiplication",
        }
    }

    pub fn kernel_file(self) -> KernelFile {
        match self {
            MatmulVariant::Naive => KernelFile::MatmulCore,
            MatmulVariant::Row => KernelFile::MatmulRow,
            MatmulVariant::RowPrivate => KernelFile::MatmulRowPrivate,
            MatmulVariant::RowLocalColumn => KernelFile::MatmulRowLocalColumn,
            MatmulVariant::Blocked => KernelFile::MatmulBlocked,
        }
    }

    /// Argument kinds in the order the variant binds them.
    pub fn params(self) -> Vec<ParamKind> {
        use ParamKind::{GlobalF32, Int, LocalF32};
        match self {
            MatmulVariant::Naive => vec![Int, GlobalF32, GlobalF32, GlobalF32],
            MatmulVariant::Row | MatmulVariant::RowPrivate => {
                vec![Int, Int, GlobalF32, GlobalF32, GlobalF32]
            }
            MatmulVariant::RowLocalColumn => {
                vec![Int, Int, GlobalF32, GlobalF32, LocalF32, GlobalF32]
            }
            MatmulVariant::Blocked => {
                vec![Int, GlobalF32, GlobalF32, GlobalF32, LocalF32, LocalF32]
            }
        }
    }

    /// Lengths, in floats, of the `__local` buffers the variant binds.
    pub fn local_buffers(self, shape: &MatmulShape) -> Vec<usize> {
        match self {
            MatmulVariant::RowLocalColumn => vec![shape.n],
            MatmulVariant::Blocked => vec![BLOCK_SIZE * BLOCK_SIZE; 2],
            _ => Vec::new(),
        }
    }

    /// Checks `shape` against the variant's constraints and derives the
    /// launch extents.
    ///
    /// `row_group` sets the work-group size of the row variants; the naive
    /// variant always lets the runtime choose and the blocked variant is
    /// pinned to `BLOCK_SIZE x BLOCK_SIZE`.
    pub fn launch(self, shape: &MatmulShape, row_group: Option<usize>) -> Result<Launch> {
        match self {
            MatmulVariant::Naive => Launch::new(Extent::Two(shape.m, shape.o), LocalSize::Auto),
            MatmulVariant::Row | MatmulVariant::RowPrivate | MatmulVariant::RowLocalColumn => {
                if self != MatmulVariant::Row && shape.n > MAX_PRIVATE_ROW {
                    return Err(BenchError::ConfigInvalid(format!(
                        "{} keeps a row of {} floats in private memory; at most {MAX_PRIVATE_ROW} fit",
                        self.name(),
                        shape.n
                    )));
                }
                let group = row_group.unwrap_or(DEFAULT_ROW_GROUP);
                Launch::new(Extent::One(shape.m), LocalSize::Fixed(Extent::One(group)))
            }
            MatmulVariant::Blocked => {
                check_block_divisible(shape, BLOCK_SIZE)?;
                Launch::new(
                    Extent::Two(shape.m, shape.o),
                    LocalSize::Fixed(Extent::Two(BLOCK_SIZE, BLOCK_SIZE)),
                )
            }
        }
    }
}

/// Rejects shapes the tiled algorithm cannot cover exactly.
pub fn check_block_divisible(shape: &MatmulShape, block: usize) -> Result<()> {
    if block == 0 {
        return Err(BenchError::ConfigInvalid("block size must be non-zero".into()));
    }
    if shape.m % block != 0 || shape.n % block != 0 || shape.o % block != 0 {
        return Err(BenchError::ConfigInvalid(format!(
            "blocked matmul needs M, N and O divisible by the block size {block}, got {shape}"
        )));
    }
    Ok(())
}

impl fmt::Display for MatmulVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatmulVariant {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|v| v.name()).collect();
                BenchError::ConfigInvalid(format!(
                    "unknown matmul variant `{s}` (expected one of {})",
                    names.join(", ")
                ))
            })
    }
}
