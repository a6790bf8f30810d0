//! Index-space description for a kernel launch.

use std::fmt;

use crate::error::{BenchError, Result};

/// Number of work items along each dimension of an NDRange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    One(usize),
    Two(usize, usize),
}

impl Extent {
    pub fn dims(&self) -> &'static str {
        match self {
            Extent::One(_) => "1D",
            Extent::Two(..) => "2D",
        }
    }

    /// Total number of work items.
    pub fn len(&self) -> usize {
        match *self {
            Extent::One(x) => x,
            Extent::Two(x, y) => x * y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn axes(&self) -> Vec<usize> {
        match *self {
            Extent::One(x) => vec![x],
            Extent::Two(x, y) => vec![x, y],
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::One(x) => write!(f, "({x},)"),
            Extent::Two(x, y) => write!(f, "({x}, {y})"),
        }
    }
}

#[cfg(feature = "opencl")]
impl From<Extent> for ocl::SpatialDims {
    fn from(extent: Extent) -> Self {
        match extent {
            Extent::One(x) => ocl::SpatialDims::One(x),
            Extent::Two(x, y) => ocl::SpatialDims::Two(x, y),
        }
    }
}

/// Work-group shape: either chosen by the runtime or pinned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalSize {
    #[default]
    Auto,
    Fixed(Extent),
}

impl LocalSize {
    pub fn fixed(&self) -> Option<Extent> {
        match self {
            LocalSize::Auto => None,
            LocalSize::Fixed(extent) => Some(*extent),
        }
    }
}

impl fmt::Display for LocalSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSize::Auto => f.write_str("auto"),
            LocalSize::Fixed(extent) => extent.fmt(f),
        }
    }
}

/// Global and local extents of one kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launch {
    pub global: Extent,
    pub local: LocalSize,
}

impl Launch {
    /// Validates that the global extent is non-empty and, when a local size is
    /// given, that it has the same dimensionality and evenly divides it.
    pub fn new(global: Extent, local: LocalSize) -> Result<Self> {
        if global.axes().contains(&0) {
            return Err(BenchError::ConfigInvalid(format!(
                "global extent {global} has an empty dimension"
            )));
        }
        if let LocalSize::Fixed(local_extent) = local {
            if global.dims() != local_extent.dims() {
                return Err(BenchError::ConfigInvalid(format!(
                    "local extent {local_extent} is {} but global extent {global} is {}",
                    local_extent.dims(),
                    global.dims()
                )));
            }
            for (g, l) in global.axes().into_iter().zip(local_extent.axes()) {
                if l == 0 || g % l != 0 {
                    return Err(BenchError::ConfigInvalid(format!(
                        "local extent {local_extent} does not evenly divide global extent {global}"
                    )));
                }
            }
        }
        Ok(Self { global, local })
    }

    /// Number of work groups, when the grouping is known on the host.
    pub fn work_groups(&self) -> Option<usize> {
        self.local
            .fixed()
            .map(|local| self.global.len() / local.len())
    }
}

impl fmt::Display for Launch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "global={} local={}", self.global, self.local)
    }
}
