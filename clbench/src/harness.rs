//! Repeated host-vs-device timing with a correctness check on every run.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::closeness::Tolerance;
use crate::error::{BenchError, Result};
use crate::launch::Launch;
use crate::stats::TimingStats;

/// Device side of one benchmark: a kernel (or a fixed chain of kernels) with
/// its arguments already bound.
pub trait DeviceRun {
    /// Enqueues the work without waiting for it.
    fn submit(&mut self, launch: &Launch) -> Result<()>;

    /// Blocks until every enqueued command has completed.
    fn finish(&mut self) -> Result<()>;

    /// Copies the result back to host memory.
    fn read_output(&mut self) -> Result<Vec<f32>>;
}

/// Settings shared by every repetition of a benchmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchConfig {
    pub repeats: usize,
    pub tolerance: Tolerance,
}

impl BenchConfig {
    pub fn new(repeats: usize, tolerance: Tolerance) -> Result<Self> {
        if repeats == 0 {
            return Err(BenchError::ConfigInvalid(
                "repeat count must be at least 1".into(),
            ));
        }
        Ok(Self { repeats, tolerance })
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            repeats: 3,
            tolerance: Tolerance::default(),
        }
    }
}

/// Outcome of [`Harness::run`].
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub device: TimingStats,
    pub host: TimingStats,
    /// Floating point operations performed by one run.
    pub flops: f64,
    /// Device result of the last repetition.
    pub output: Vec<f32>,
}

impl BenchReport {
    pub fn device_mflops(&self) -> f64 {
        self.device.mflops(self.flops)
    }

    pub fn host_mflops(&self) -> f64 {
        self.host.mflops(self.flops)
    }

    /// Host mean time divided by device mean time.
    pub fn speedup(&self) -> f64 {
        let device = self.device.mean.as_secs_f64();
        if device > 0.0 {
            self.host.mean.as_secs_f64() / device
        } else {
            0.0
        }
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Host computation: {} ({:.1} MFLOPS).",
            self.host,
            self.host_mflops()
        )?;
        write!(
            f,
            "Device computation: {} ({:.1} MFLOPS).",
            self.device,
            self.device_mflops()
        )
    }
}

/// Runs a device computation and its host reference side by side.
#[derive(Debug, Clone, Default)]
pub struct Harness {
    config: BenchConfig,
}

impl Harness {
    pub fn new(config: BenchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Times `device` against `host_reference` for the configured number of
    /// repetitions.
    ///
    /// The device window covers submit and drain only; the copy back to the
    /// host happens after the host reference has been timed. The first
    /// repetition whose results disagree aborts the run, as does an error
    /// from `host_reference`.
    pub fn run<D, H>(
        &self,
        launch: &Launch,
        device: &mut D,
        mut host_reference: H,
        flops: f64,
    ) -> Result<BenchReport>
    where
        D: DeviceRun + ?Sized,
        H: FnMut() -> Result<Vec<f32>>,
    {
        let repeats = self.config.repeats;
        let mut device_samples: Vec<Duration> = Vec::with_capacity(repeats);
        let mut host_samples: Vec<Duration> = Vec::with_capacity(repeats);
        let mut output = Vec::new();

        info!(%launch, repeats, "benchmarking");
        for repetition in 0..repeats {
            let start = Instant::now();
            device.submit(launch)?;
            device.finish()?;
            let device_dt = start.elapsed();

            let start = Instant::now();
            let expected = host_reference()?;
            let host_dt = start.elapsed();

            output = device.read_output()?;
            self.config.tolerance.check(&output, &expected)?;

            debug!(
                repetition,
                device_ms = device_dt.as_secs_f64() * 1000.0,
                host_ms = host_dt.as_secs_f64() * 1000.0,
                "repetition complete"
            );
            device_samples.push(device_dt);
            host_samples.push(host_dt);
        }

        Ok(BenchReport {
            device: TimingStats::from_samples(device_samples),
            host: TimingStats::from_samples(host_samples),
            flops,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::{Extent, LocalSize};

    /// Records the order in which the harness drives it.
    struct Recorder {
        calls: Vec<&'static str>,
        result: Vec<f32>,
    }

    impl DeviceRun for Recorder {
        fn submit(&mut self, _launch: &Launch) -> Result<()> {
            self.calls.push("submit");
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.calls.push("finish");
            Ok(())
        }

        fn read_output(&mut self) -> Result<Vec<f32>> {
            self.calls.push("read");
            Ok(self.result.clone())
        }
    }

    fn launch() -> Launch {
        Launch::new(Extent::One(4), LocalSize::Auto).unwrap()
    }

    #[test]
    fn zero_repeats_is_invalid() {
        assert!(matches!(
            BenchConfig::new(0, Tolerance::default()),
            Err(BenchError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn drives_submit_finish_read_per_repetition() {
        let harness = Harness::new(BenchConfig::new(2, Tolerance::default()).unwrap());
        let mut device = Recorder {
            calls: Vec::new(),
            result: vec![5.0; 4],
        };
        let report = harness
            .run(&launch(), &mut device, || Ok(vec![5.0; 4]), 4.0)
            .unwrap();

        assert_eq!(
            device.calls,
            ["submit", "finish", "read", "submit", "finish", "read"]
        );
        assert_eq!(report.device.samples.len(), 2);
        assert_eq!(report.host.samples.len(), 2);
        assert_eq!(report.output, vec![5.0; 4]);
    }

    #[test]
    fn mismatch_aborts_before_next_repetition() {
        let harness = Harness::new(BenchConfig::new(3, Tolerance::default()).unwrap());
        let mut device = Recorder {
            calls: Vec::new(),
            result: vec![1.0, 2.0, 3.0, 4.0],
        };
        let err = harness
            .run(&launch(), &mut device, || Ok(vec![1.0, 2.0, 3.5, 4.0]), 4.0)
            .unwrap_err();

        assert!(matches!(err, BenchError::ResultMismatch { index: 2, .. }));
        assert_eq!(device.calls, ["submit", "finish", "read"]);
    }

    #[test]
    fn host_reference_error_stops_the_run() {
        let harness = Harness::new(BenchConfig::new(3, Tolerance::default()).unwrap());
        let mut device = Recorder {
            calls: Vec::new(),
            result: vec![5.0; 4],
        };
        let err = harness
            .run(
                &launch(),
                &mut device,
                || Err(BenchError::ConfigInvalid("operands do not match".into())),
                4.0,
            )
            .unwrap_err();

        assert!(matches!(err, BenchError::ConfigInvalid(_)));
        assert_eq!(device.calls, ["submit", "finish"]);
    }

    #[test]
    fn report_renders_both_lines() {
        let report = BenchReport {
            device: TimingStats::from_samples(vec![Duration::from_millis(1)]),
            host: TimingStats::from_samples(vec![Duration::from_millis(4)]),
            flops: 2.0e6,
            output: Vec::new(),
        };
        let text = report.to_string();
        assert!(text.starts_with("Host computation: 4.000 +- 0.000 ms (500.0 MFLOPS)."));
        assert!(text.ends_with("Device computation: 1.000 +- 0.000 ms (2000.0 MFLOPS)."));
        assert!((report.speedup() - 4.0).abs() < 1e-9);
    }
}
