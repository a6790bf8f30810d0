//! Element-wise approximate equality between device and host results.

use crate::error::{BenchError, Result};

/// Relative/absolute tolerance pair, compared as
/// `|device - host| <= atol + rtol * |host|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-8,
        }
    }
}

impl Tolerance {
    pub fn new(rtol: f64, atol: f64) -> Result<Self> {
        if !(rtol >= 0.0 && atol >= 0.0) {
            return Err(BenchError::ConfigInvalid(format!(
                "tolerances must be non-negative (rtol={rtol}, atol={atol})"
            )));
        }
        Ok(Self { rtol, atol })
    }

    /// Purely relative tolerance, for scalar results such as a reduction.
    pub fn relative(rtol: f64) -> Result<Self> {
        Self::new(rtol, 0.0)
    }

    pub fn is_close(&self, device: f32, host: f32) -> bool {
        if device == host {
            return true;
        }
        // Infinities only match themselves, which the equality above covers.
        if device.is_infinite() || host.is_infinite() {
            return false;
        }
        let (d, h) = (f64::from(device), f64::from(host));
        // NaN falls through to false.
        (d - h).abs() <= self.atol + self.rtol * h.abs()
    }

    /// Checks every element; the error names the first offending index and
    /// how many elements failed in total.
    pub fn check(&self, device: &[f32], host: &[f32]) -> Result<()> {
        if device.len() != host.len() {
            let index = device.len().min(host.len());
            return Err(BenchError::ResultMismatch {
                index,
                device: device.get(index).copied().unwrap_or(f32::NAN),
                host: host.get(index).copied().unwrap_or(f32::NAN),
                mismatches: device.len().abs_diff(host.len()),
                total: device.len().max(host.len()),
            });
        }

        let mut first = None;
        let mut mismatches = 0;
        for (index, (&d, &h)) in device.iter().zip(host).enumerate() {
            if !self.is_close(d, h) {
                first.get_or_insert(index);
                mismatches += 1;
            }
        }

        match first {
            None => Ok(()),
            Some(index) => Err(BenchError::ResultMismatch {
                index,
                device: device[index],
                host: host[index],
                mismatches,
                total: host.len(),
            }),
        }
    }
}
