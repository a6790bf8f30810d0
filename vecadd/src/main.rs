//! Vector addition on the host and on an OpenCL device.
//!
//! Four variations of the same exercise: explicit buffers and a fixed work
//! group size, the high-level `ProQue` API with runtime-chosen grouping, a
//! chain of three dependent launches on one queue, and a single launch that
//! adds three vectors at once.

use std::fmt;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ndarray::Array1;
use ocl::{Buffer, Kernel, ProQue};
use tracing::{debug, info};

use clbench::cli::CommonArgs;
use clbench::host::{self, as_contiguous, into_flat, vector_sum};
use clbench::kernels::{VEC_ADD, VEC_ADD3, VEC_ADD_CHAINED};
use clbench::{
    ArgBinding, BenchError, BenchReport, ClEnv, DeviceRun, Extent, Harness, KernelChain, Launch,
    LocalSize, Tolerance,
};

const DEFAULT_LEN: usize = 2048;
const DEFAULT_LOCAL: usize = 32;
const DEFAULT_REPEATS: usize = 1;

#[derive(Parser, Debug)]
#[command(version, about = "Add vectors on host and device and compare")]
struct Cli {
    #[command(subcommand)]
    exercise: Exercise,

    /// Elements per vector
    #[arg(long, global = true, default_value_t = DEFAULT_LEN)]
    len: usize,

    /// Work-group size; ignored by `pro-que`
    #[arg(long, global = true, default_value_t = DEFAULT_LOCAL)]
    local: usize,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Exercise {
    /// c = a + b with explicit context, queue and buffers
    Simple,
    /// c = a + b through the ProQue convenience API
    ProQue,
    /// f = ((a + b) + e) + g as three launches on one queue
    Chained,
    /// d = a + b + c in a single kernel
    Three,
}

impl Exercise {
    fn noun(self) -> &'static str {
        match self {
            Exercise::Simple | Exercise::ProQue => "the two vectors",
            Exercise::Chained | Exercise::Three => "the vectors",
        }
    }
}

/// `c = a + b` driven entirely through a `ProQue`.
struct ProQueAdd {
    proque: ProQue,
    kernel: Kernel,
    out: Buffer<f32>,
    // Inputs bound to `kernel`.
    _inputs: [Buffer<f32>; 2],
}

impl ProQueAdd {
    fn new(a: &[f32], b: &[f32]) -> clbench::Result<Self> {
        let context = ocl::Context::builder()
            .build()
            .map_err(|e| BenchError::DeviceUnavailable(e.to_string()))?;
        let proque = ProQue::builder()
            .context(context)
            .src(VEC_ADD)
            .dims(a.len())
            .build()
            .map_err(vec_add_build_failure)?;
        info!(device = %proque.device().name()?, "ProQue selected its default device");

        let d_a = proque.buffer_builder::<f32>().copy_host_slice(a).build()?;
        let d_b = proque.buffer_builder::<f32>().copy_host_slice(b).build()?;
        let out = proque.create_buffer::<f32>()?;
        let kernel = proque
            .kernel_builder("vec_add")
            .arg(&d_a)
            .arg(&d_b)
            .arg(&out)
            .build()?;

        Ok(Self {
            proque,
            kernel,
            out,
            _inputs: [d_a, d_b],
        })
    }
}

impl DeviceRun for ProQueAdd {
    fn submit(&mut self, _launch: &Launch) -> clbench::Result<()> {
        unsafe {
            self.kernel.enq()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> clbench::Result<()> {
        self.proque.finish()?;
        Ok(())
    }

    fn read_output(&mut self) -> clbench::Result<Vec<f32>> {
        let mut out = vec![0.0f32; self.out.len()];
        self.out.read(&mut out).enq()?;
        Ok(out)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    clbench::logging::init(&cli.common.log_level);

    let config = cli
        .common
        .bench_config(DEFAULT_REPEATS, Tolerance::default())?;
    let harness = Harness::new(config);
    let mut rng = host::rng(cli.common.seed);
    debug!(exercise = ?cli.exercise, len = cli.len, "generating inputs");

    let result = match cli.exercise {
        Exercise::Simple => {
            let a = host::random_vector(&mut rng, cli.len);
            let b = host::random_vector(&mut rng, cli.len);
            let launch = Launch::new(
                Extent::One(cli.len),
                LocalSize::Fixed(Extent::One(cli.local)),
            )?;
            let env = ClEnv::new(cli.common.selection())?;
            let compiled = env.compile(VEC_ADD, "vec_add")?;
            let d_a = env.input(as_contiguous(&a)?)?;
            let d_b = env.input(as_contiguous(&b)?)?;
            let d_c = env.output(cli.len)?;
            let kernel = env.bind(
                &compiled,
                &[
                    ArgBinding::Global(&d_a),
                    ArgBinding::Global(&d_b),
                    ArgBinding::Global(&d_c),
                ],
                &launch,
            )?;
            let mut chain = KernelChain::new(&env, vec![kernel], d_c).holding(vec![d_a, d_b]);
            harness.run(
                &launch,
                &mut chain,
                || add_on_host(&[&a, &b]),
                cli.len as f64,
            )
        }
        Exercise::ProQue => {
            let a = host::random_vector(&mut rng, cli.len);
            let b = host::random_vector(&mut rng, cli.len);
            let launch = Launch::new(Extent::One(cli.len), LocalSize::Auto)?;
            let mut device = ProQueAdd::new(as_contiguous(&a)?, as_contiguous(&b)?)?;
            harness.run(
                &launch,
                &mut device,
                || add_on_host(&[&a, &b]),
                cli.len as f64,
            )
        }
        Exercise::Chained => {
            let inputs: Vec<Array1<f32>> = (0..4)
                .map(|_| host::random_vector(&mut rng, cli.len))
                .collect();
            let launch = Launch::new(
                Extent::One(cli.len),
                LocalSize::Fixed(Extent::One(cli.local)),
            )?;
            let env = ClEnv::new(cli.common.selection())?;
            let compiled = env.compile(VEC_ADD_CHAINED, "vec_add_verbose")?;

            let d_a = env.input(as_contiguous(&inputs[0])?)?;
            let d_b = env.input(as_contiguous(&inputs[1])?)?;
            let d_e = env.input(as_contiguous(&inputs[2])?)?;
            let d_g = env.input(as_contiguous(&inputs[3])?)?;
            let d_c = env.intermediate(cli.len)?;
            let d_d = env.intermediate(cli.len)?;
            let d_f = env.output(cli.len)?;

            let steps = [(&d_a, &d_b, &d_c), (&d_c, &d_e, &d_d), (&d_d, &d_g, &d_f)];
            let kernels = steps
                .iter()
                .map(|&(x, y, out)| {
                    env.bind(
                        &compiled,
                        &[
                            ArgBinding::Global(x),
                            ArgBinding::Global(y),
                            ArgBinding::Global(out),
                        ],
                        &launch,
                    )
                })
                .collect::<clbench::Result<Vec<_>>>()?;

            let mut chain =
                KernelChain::new(&env, kernels, d_f).holding(vec![d_a, d_b, d_c, d_d, d_e, d_g]);
            let terms: Vec<&Array1<f32>> = inputs.iter().collect();
            harness.run(
                &launch,
                &mut chain,
                || add_on_host(&terms),
                3.0 * cli.len as f64,
            )
        }
        Exercise::Three => {
            let a = host::random_vector(&mut rng, cli.len);
            let b = host::random_vector(&mut rng, cli.len);
            let c = host::random_vector(&mut rng, cli.len);
            let launch = Launch::new(
                Extent::One(cli.len),
                LocalSize::Fixed(Extent::One(cli.local)),
            )?;
            let env = ClEnv::new(cli.common.selection())?;
            let compiled = env.compile(VEC_ADD3, "vec_add")?;
            let d_a = env.input(as_contiguous(&a)?)?;
            let d_b = env.input(as_contiguous(&b)?)?;
            let d_c = env.input(as_contiguous(&c)?)?;
            let d_d = env.output(cli.len)?;
            let kernel = env.bind(
                &compiled,
                &[
                    ArgBinding::Global(&d_a),
                    ArgBinding::Global(&d_b),
                    ArgBinding::Global(&d_c),
                    ArgBinding::Global(&d_d),
                ],
                &launch,
            )?;
            let mut chain =
                KernelChain::new(&env, vec![kernel], d_d).holding(vec![d_a, d_b, d_c]);
            harness.run(
                &launch,
                &mut chain,
                || add_on_host(&[&a, &b, &c]),
                2.0 * cli.len as f64,
            )
        }
    };

    report(cli.exercise, result)
}

/// The context already exists, so a `ProQue` build error is the program's.
fn vec_add_build_failure(err: impl fmt::Display) -> BenchError {
    BenchError::CompileFailure {
        kernel: "vec_add".into(),
        log: err.to_string(),
    }
}

fn add_on_host(terms: &[&Array1<f32>]) -> clbench::Result<Vec<f32>> {
    vector_sum(terms).map(into_flat)
}

fn report(exercise: Exercise, result: clbench::Result<BenchReport>) -> Result<()> {
    match result {
        Ok(report) => {
            println!("{report}");
            println!("Successfully added {} together.", exercise.noun());
            Ok(())
        }
        Err(err @ BenchError::ResultMismatch { .. }) => {
            println!("Failed to successfully add {} together...", exercise.noun());
            Err(err.into())
        }
        Err(err) => Err(err).context("vector addition failed"),
    }
}
