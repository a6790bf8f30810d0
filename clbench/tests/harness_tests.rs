//! Harness behaviour with host-side stand-ins for the device.
//!
//! Each stand-in does its work in `submit`, so the harness sees the same
//! submit/finish/read sequence a real queue would give it.

use clbench::host::{self, into_flat, vector_sum};
use clbench::matmul::BLOCK_SIZE;
use clbench::reference;
use clbench::{
    BenchConfig, BenchError, DeviceRun, Extent, Harness, Launch, LocalSize, MatmulShape,
    MatmulVariant, PiProblem, Tolerance,
};

struct HostAdd {
    terms: Vec<Vec<f32>>,
    out: Vec<f32>,
    submitted: usize,
}

impl HostAdd {
    fn new(terms: Vec<Vec<f32>>) -> Self {
        Self {
            terms,
            out: Vec::new(),
            submitted: 0,
        }
    }
}

impl DeviceRun for HostAdd {
    fn submit(&mut self, launch: &Launch) -> clbench::Result<()> {
        let len = launch.global.len();
        self.out = (0..len)
            .map(|i| self.terms.iter().map(|t| t[i]).sum())
            .collect();
        self.submitted += 1;
        Ok(())
    }

    fn finish(&mut self) -> clbench::Result<()> {
        Ok(())
    }

    fn read_output(&mut self) -> clbench::Result<Vec<f32>> {
        Ok(self.out.clone())
    }
}

/// Runs the tiled model as if it were the device.
struct TiledMatmul {
    left: Vec<f32>,
    right: Vec<f32>,
    shape: MatmulShape,
    out: Vec<f32>,
}

impl DeviceRun for TiledMatmul {
    fn submit(&mut self, _launch: &Launch) -> clbench::Result<()> {
        self.out = reference::matmul_blocked(&self.left, &self.right, &self.shape, BLOCK_SIZE)?;
        Ok(())
    }

    fn finish(&mut self) -> clbench::Result<()> {
        Ok(())
    }

    fn read_output(&mut self) -> clbench::Result<Vec<f32>> {
        Ok(self.out.clone())
    }
}

/// Yields the per-group partial sums of the π kernel, summed on read.
struct PartialSumPi {
    problem: PiProblem,
    partials: Vec<f32>,
}

impl DeviceRun for PartialSumPi {
    fn submit(&mut self, _launch: &Launch) -> clbench::Result<()> {
        self.partials = reference::pi_partial_sums(&self.problem);
        Ok(())
    }

    fn finish(&mut self) -> clbench::Result<()> {
        Ok(())
    }

    fn read_output(&mut self) -> clbench::Result<Vec<f32>> {
        Ok(vec![reference::sum_partials(&self.partials) as f32])
    }
}

fn fixed_launch(len: usize, local: usize) -> Launch {
    Launch::new(Extent::One(len), LocalSize::Fixed(Extent::One(local))).unwrap()
}

#[test]
fn vector_add_matches_host() {
    let a = vec![1.0f32, 2.0, 3.0, 4.0];
    let b = vec![4.0f32, 3.0, 2.0, 1.0];
    let mut device = HostAdd::new(vec![a, b]);

    let report = Harness::default()
        .run(&fixed_launch(4, 2), &mut device, || Ok(vec![5.0; 4]), 4.0)
        .unwrap();

    assert_eq!(report.output, vec![5.0, 5.0, 5.0, 5.0]);
    assert_eq!(device.submitted, 3);
    assert_eq!(report.device.samples.len(), 3);
}

#[test]
fn chained_add_of_random_vectors() {
    let mut rng = host::rng(Some(42));
    let inputs: Vec<_> = (0..4).map(|_| host::random_vector(&mut rng, 2048)).collect();
    let terms: Vec<_> = inputs.iter().collect();
    let expected = into_flat(vector_sum(&terms).unwrap());

    let mut device = HostAdd::new(inputs.iter().map(|v| v.to_vec()).collect());
    let harness = Harness::new(BenchConfig::new(1, Tolerance::default()).unwrap());
    let report = harness
        .run(&fixed_launch(2048, 32), &mut device, || Ok(expected.clone()), 3.0 * 2048.0)
        .unwrap();

    assert_eq!(report.flops, 6144.0);
    assert!(report.device_mflops() >= 0.0);
}

#[test]
fn wrong_device_result_is_reported_with_position() {
    let mut device = HostAdd::new(vec![vec![1.0, 2.0, 3.0, 4.0]]);
    let err = Harness::default()
        .run(&fixed_launch(4, 4), &mut device, || Ok(vec![1.0, 2.0, 3.0, 5.0]), 4.0)
        .unwrap_err();

    match err {
        BenchError::ResultMismatch {
            index,
            device,
            host,
            mismatches,
            total,
        } => {
            assert_eq!(index, 3);
            assert_eq!(device, 4.0);
            assert_eq!(host, 5.0);
            assert_eq!(mismatches, 1);
            assert_eq!(total, 4);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(device.submitted, 1);
}

#[test]
fn tiled_matmul_agrees_with_host_product() {
    let shape = MatmulShape::new(32, 48, 64).unwrap();
    let mut rng = host::rng(Some(1));
    let left = host::random_matrix(&mut rng, shape.m, shape.n);
    let right = host::random_matrix(&mut rng, shape.n, shape.o);
    let launch = MatmulVariant::Blocked.launch(&shape, None).unwrap();

    let mut device = TiledMatmul {
        left: left.iter().copied().collect(),
        right: right.iter().copied().collect(),
        shape,
        out: Vec::new(),
    };
    let harness = Harness::new(BenchConfig::new(2, Tolerance::new(1e-4, 1e-6).unwrap()).unwrap());
    let report = harness
        .run(
            &launch,
            &mut device,
            || host::matmul(&left, &right, &shape).map(into_flat),
            shape.flops(),
        )
        .unwrap();

    assert_eq!(report.output.len(), shape.out_len());
}

#[test]
fn identity_matmul_returns_right_operand() {
    let shape = MatmulShape::square(16).unwrap();
    let mut identity = vec![0.0f32; shape.left_len()];
    for i in 0..shape.n {
        identity[i * shape.n + i] = 1.0;
    }
    let right: Vec<f32> = (0..shape.right_len()).map(|i| i as f32).collect();
    let mut device = TiledMatmul {
        left: identity,
        right: right.clone(),
        shape,
        out: Vec::new(),
    };
    let launch = MatmulVariant::Blocked.launch(&shape, None).unwrap();

    let report = Harness::default()
        .run(&launch, &mut device, || Ok(right.clone()), shape.flops())
        .unwrap();
    assert_eq!(report.output, right);
}

#[test]
fn pi_partial_sums_pass_the_relative_check() {
    let problem = PiProblem::new(1 << 22, 1 << 12, 32).unwrap();
    let mut device = PartialSumPi {
        problem,
        partials: Vec::new(),
    };
    let harness = Harness::new(BenchConfig::new(1, Tolerance::relative(1e-4).unwrap()).unwrap());
    let report = harness
        .run(
            &problem.launch().unwrap(),
            &mut device,
            || Ok(vec![host::pi_midpoint(problem.rectangles) as f32]),
            problem.flops(),
        )
        .unwrap();

    let estimate = f64::from(report.output[0]);
    assert!((estimate - std::f64::consts::PI).abs() < 1e-4);
}

#[test]
fn repeated_runs_give_the_same_output() {
    let harness = Harness::new(BenchConfig::new(2, Tolerance::default()).unwrap());
    let mut device = HostAdd::new(vec![vec![0.5; 64], vec![0.25; 64]]);
    let launch = fixed_launch(64, 32);

    let first = harness
        .run(&launch, &mut device, || Ok(vec![0.75; 64]), 64.0)
        .unwrap();
    let second = harness
        .run(&launch, &mut device, || Ok(vec![0.75; 64]), 64.0)
        .unwrap();

    assert_eq!(first.output, second.output);
    assert_eq!(device.submitted, 4);
}
