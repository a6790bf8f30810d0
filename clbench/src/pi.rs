//! Decomposition of the π midpoint integral across work items and groups.

use std::fmt;

use crate::error::{BenchError, Result};
use crate::launch::{Extent, Launch, LocalSize};
use crate::signature::ParamKind;

pub const DEFAULT_RECTANGLES: usize = 1024 * 1024 * 1024;
pub const DEFAULT_PER_ITEM: usize = 1024 * 256;
pub const DEFAULT_GROUP: usize = 32;

/// `N` rectangles split into work items of `M` rectangles, grouped `L` at a
/// time. Each group yields one partial sum; the host adds them up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiProblem {
    pub rectangles: usize,
    pub per_item: usize,
    pub group: usize,
}

impl Default for PiProblem {
    fn default() -> Self {
        Self {
            rectangles: DEFAULT_RECTANGLES,
            per_item: DEFAULT_PER_ITEM,
            group: DEFAULT_GROUP,
        }
    }
}

impl PiProblem {
    pub fn new(rectangles: usize, per_item: usize, group: usize) -> Result<Self> {
        if rectangles == 0 || per_item == 0 || group == 0 {
            return Err(BenchError::ConfigInvalid(format!(
                "rectangles ({rectangles}), rectangles per item ({per_item}) and \
                 group size ({group}) must all be non-zero"
            )));
        }
        let problem = Self {
            rectangles,
            per_item,
            group,
        };
        // The kernel computes `gid * M` in a 32-bit int.
        let span = i32::try_from(rectangles)
            .ok()
            .and_then(|_| problem.work_groups().checked_mul(group))
            .and_then(|padded| padded.checked_mul(per_item));
        if span.map_or(true, |s| i32::try_from(s).is_err()) {
            return Err(BenchError::ConfigInvalid(format!(
                "{problem} exceeds 32-bit kernel indexing"
            )));
        }
        Ok(problem)
    }

    /// Work items needed to cover every rectangle.
    pub fn work_items(&self) -> usize {
        self.rectangles.div_ceil(self.per_item)
    }

    pub fn work_groups(&self) -> usize {
        self.work_items().div_ceil(self.group)
    }

    /// Global size rounded up to whole groups; the surplus items add nothing.
    pub fn padded_items(&self) -> usize {
        self.work_groups() * self.group
    }

    pub fn step(&self) -> f64 {
        1.0 / self.rectangles as f64
    }

    /// One function evaluation per rectangle.
    pub fn flops(&self) -> f64 {
        self.rectangles as f64
    }

    pub fn launch(&self) -> Result<Launch> {
        Launch::new(
            Extent::One(self.padded_items()),
            LocalSize::Fixed(Extent::One(self.group)),
        )
    }

    pub fn params() -> Vec<ParamKind> {
        vec![
            ParamKind::Int,
            ParamKind::Int,
            ParamKind::LocalF32,
            ParamKind::GlobalF32,
        ]
    }
}

impl fmt::Display for PiProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N={} rectangles, M={} per work item, L={} per group",
            self.rectangles, self.per_item, self.group
        )
    }
}
