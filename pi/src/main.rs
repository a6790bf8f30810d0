//! Estimates π by midpoint integration of `4 / (1 + x²)` over `[0, 1]`,
//! reduced per work group on the device and summed on the host.

use std::f64::consts::PI;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use clbench::cli::CommonArgs;
use clbench::host;
use clbench::kernels::KernelFile;
use clbench::pi::{DEFAULT_GROUP, DEFAULT_PER_ITEM, DEFAULT_RECTANGLES};
use clbench::{ArgBinding, ClEnv, Harness, KernelChain, PiProblem, Readback, Tolerance};

const DEFAULT_REPEATS: usize = 3;
const DEFAULT_RTOL: f64 = 1e-4;

#[derive(Parser, Debug)]
#[command(version, about = "Estimate pi with a work-group reduction")]
struct Cli {
    /// Number of rectangles N
    #[arg(long, default_value_t = DEFAULT_RECTANGLES)]
    rectangles: usize,

    /// Rectangles integrated by each work item (M)
    #[arg(long, default_value_t = DEFAULT_PER_ITEM)]
    per_item: usize,

    /// Work items per group (L)
    #[arg(long, default_value_t = DEFAULT_GROUP)]
    group: usize,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    clbench::logging::init(&cli.common.log_level);

    let problem = PiProblem::new(cli.rectangles, cli.per_item, cli.group)?;
    let launch = problem.launch()?;
    let config = cli.common.bench_config(
        DEFAULT_REPEATS,
        Tolerance::new(DEFAULT_RTOL, 0.0)?,
    )?;
    let source = KernelFile::SimplePi.load(&cli.common.kernel_dir)?;
    info!(
        %problem,
        work_items = problem.work_items(),
        work_groups = problem.work_groups(),
        "decomposed"
    );

    let env = ClEnv::new(cli.common.selection())?;
    let compiled = env.compile(&source, KernelFile::SimplePi.kernel_name())?;
    let partial_sums = env.output(problem.work_groups())?;
    let kernel = env.bind(
        &compiled,
        &[
            ArgBinding::Int(problem.rectangles as i32),
            ArgBinding::Int(problem.per_item as i32),
            ArgBinding::Local(problem.group),
            ArgBinding::Global(&partial_sums),
        ],
        &launch,
    )?;
    let mut chain = KernelChain::new(&env, vec![kernel], partial_sums).with_readback(Readback::Sum);

    println!("Results for finding pi (simplest approach):");
    let report = Harness::new(config)
        .run(
            &launch,
            &mut chain,
            || Ok(vec![host::pi_midpoint(problem.rectangles) as f32]),
            problem.flops(),
        )
        .context("pi reduction failed")?;

    let estimate = report.output.first().copied().map_or(f64::NAN, f64::from);
    println!("{report}");
    println!(
        "π = {estimate}, Device MFLOPS: {:.1}",
        report.device_mflops()
    );
    println!("{}", estimate / PI);
    Ok(())
}
