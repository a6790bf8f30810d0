//! Timing statistics over repeated runs.

use std::fmt;
use std::time::Duration;

/// Mean and population standard deviation of a set of timing samples.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingStats {
    pub samples: Vec<Duration>,
    pub mean: Duration,
    pub std_dev: Duration,
}

impl TimingStats {
    pub fn from_samples(samples: Vec<Duration>) -> Self {
        if samples.is_empty() {
            return Self {
                samples,
                mean: Duration::ZERO,
                std_dev: Duration::ZERO,
            };
        }

        let n = samples.len() as f64;
        let secs: Vec<f64> = samples.iter().map(Duration::as_secs_f64).collect();
        let mean = secs.iter().sum::<f64>() / n;
        let variance = secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        Self {
            samples,
            mean: Duration::from_secs_f64(mean),
            std_dev: Duration::from_secs_f64(variance.sqrt()),
        }
    }

    pub fn mean_ms(&self) -> f64 {
        self.mean.as_secs_f64() * 1000.0
    }

    pub fn std_dev_ms(&self) -> f64 {
        self.std_dev.as_secs_f64() * 1000.0
    }

    /// Throughput in MFLOPS for `flops` operations per run.
    ///
    /// Zero when the mean duration is too small to measure.
    pub fn mflops(&self, flops: f64) -> f64 {
        let secs = self.mean.as_secs_f64();
        if secs > 0.0 {
            flops / secs / 1.0e6
        } else {
            0.0
        }
    }
}

impl fmt::Display for TimingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} +- {:.3} ms", self.mean_ms(), self.std_dev_ms())
    }
}
