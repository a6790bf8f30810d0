//! Matrix multiplication `T = L @ R` with several kernel strategies, each
//! timed against the host product.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ndarray::Array2;
use ocl::Buffer;
use tracing::{debug, info};

use clbench::cli::CommonArgs;
use clbench::host::{self, as_contiguous, into_flat};
use clbench::{
    ArgBinding, BenchError, BenchReport, ClEnv, Harness, KernelChain, MatmulShape, MatmulVariant,
    Tolerance,
};

/// Variant sets and sizes of the three matmul exercises.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Preset {
    /// Naive kernel on 2048x2048 matrices, 10 repeats
    E6,
    /// Naive against one-row-per-work-item kernels, 1024x1024
    #[default]
    E7,
    /// Private rows, shared columns and blocking, 1024x1024
    E8,
}

impl Preset {
    fn variants(self) -> Vec<MatmulVariant> {
        use MatmulVariant::*;
        match self {
            Preset::E6 => vec![Naive],
            Preset::E7 => vec![Naive, Row, RowPrivate],
            Preset::E8 => vec![RowPrivate, RowLocalColumn, Blocked],
        }
    }

    fn order(self) -> usize {
        match self {
            Preset::E6 => 2048,
            Preset::E7 | Preset::E8 => 1024,
        }
    }

    fn repeats(self) -> usize {
        match self {
            Preset::E6 => 10,
            Preset::E7 | Preset::E8 => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Compare matrix multiplication kernels against the host")]
struct Cli {
    /// Exercise whose variants, order and repeat count are the defaults
    #[arg(long, value_enum, default_value_t = Preset::default())]
    preset: Preset,

    /// Kernel variant to run; repeat to run several
    #[arg(long = "variant", short = 'v')]
    variants: Vec<MatmulVariant>,

    /// Order of square operands
    #[arg(long)]
    order: Option<usize>,

    /// Rows of L (overrides --order)
    #[arg(short = 'm', long)]
    m: Option<usize>,

    /// Columns of L and rows of R (overrides --order)
    #[arg(short = 'n', long)]
    n: Option<usize>,

    /// Columns of R (overrides --order)
    #[arg(short = 'o', long)]
    o: Option<usize>,

    /// Work-group size of the one-row-per-work-item variants
    #[arg(long)]
    row_group: Option<usize>,

    #[command(flatten)]
    common: CommonArgs,
}

impl Cli {
    fn shape(&self) -> clbench::Result<MatmulShape> {
        let order = self.order.unwrap_or_else(|| self.preset.order());
        MatmulShape::new(
            self.m.unwrap_or(order),
            self.n.unwrap_or(order),
            self.o.unwrap_or(order),
        )
    }

    fn variants(&self) -> Vec<MatmulVariant> {
        if self.variants.is_empty() {
            self.preset.variants()
        } else {
            self.variants.clone()
        }
    }
}

/// Arguments in the order each variant's kernel declares them.
fn bindings<'a>(
    variant: MatmulVariant,
    shape: &MatmulShape,
    left: &'a Buffer<f32>,
    right: &'a Buffer<f32>,
    out: &'a Buffer<f32>,
) -> Vec<ArgBinding<'a>> {
    use ArgBinding::{Global, Int, Local};

    let n = Int(shape.n_arg());
    let o = Int(shape.o_arg());
    let locals = variant.local_buffers(shape).into_iter().map(Local);
    match variant {
        MatmulVariant::Naive => vec![n, Global(left), Global(right), Global(out)],
        MatmulVariant::Row | MatmulVariant::RowPrivate => {
            vec![n, o, Global(left), Global(right), Global(out)]
        }
        MatmulVariant::RowLocalColumn => {
            let mut args = vec![n, o, Global(left), Global(right)];
            args.extend(locals);
            args.push(Global(out));
            args
        }
        MatmulVariant::Blocked => {
            let mut args = vec![n, Global(left), Global(right), Global(out)];
            args.extend(locals);
            args
        }
    }
}

fn host_product(
    left: &Array2<f32>,
    right: &Array2<f32>,
    shape: &MatmulShape,
) -> clbench::Result<Vec<f32>> {
    host::matmul(left, right, shape).map(into_flat)
}

fn outcome(result: clbench::Result<BenchReport>) -> clbench::Result<BenchReport> {
    match result {
        Ok(report) => {
            println!("{report}");
            println!("Successfully multiplied the two matrices.");
            Ok(report)
        }
        Err(err @ BenchError::ResultMismatch { .. }) => {
            println!("Failed to successfully multiply the two matrices...");
            Err(err)
        }
        Err(err) => Err(err),
    }
}

fn print_summary(results: &[(MatmulVariant, BenchReport)]) {
    println!(
        "{:<16}{:>22}{:>14}{:>10}",
        "variant", "device time", "MFLOPS", "speedup"
    );
    for (variant, report) in results {
        println!(
            "{:<16}{:>22}{:>14.1}{:>9.1}x",
            variant.name(),
            report.device.to_string(),
            report.device_mflops(),
            report.speedup()
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    clbench::logging::init(&cli.common.log_level);

    let shape = cli.shape()?;
    let config = cli
        .common
        .bench_config(cli.preset.repeats(), Tolerance::default())?;
    let harness = Harness::new(config);

    // Every constraint and kernel file is checked before touching the device.
    let mut plans = Vec::new();
    for variant in cli.variants() {
        let launch = variant
            .launch(&shape, cli.row_group)
            .with_context(|| format!("cannot run the {variant} kernel on {shape}"))?;
        let source = variant.kernel_file().load(&cli.common.kernel_dir)?;
        plans.push((variant, launch, source));
    }

    let mut rng = host::rng(cli.common.seed);
    let left = host::random_matrix(&mut rng, shape.m, shape.n);
    let right = host::random_matrix(&mut rng, shape.n, shape.o);
    debug!(%shape, "generated operands");

    let env = ClEnv::new(cli.common.selection())?;
    let d_left = env.input(as_contiguous(&left)?)?;
    let d_right = env.input(as_contiguous(&right)?)?;
    info!(
        device = env.device_name(),
        %shape,
        repeats = config.repeats,
        "multiplying"
    );

    let mut results = Vec::with_capacity(plans.len());
    for (variant, launch, source) in plans {
        let kernel_file = variant.kernel_file();
        let compiled = env.compile(&source, kernel_file.kernel_name())?;
        let d_out = env.output(shape.out_len())?;
        let args = bindings(variant, &shape, &d_left, &d_right, &d_out);
        let kernel = env.bind(&compiled, &args, &launch)?;
        let mut chain = KernelChain::new(&env, vec![kernel], d_out);

        println!("Results for {}:", variant.description());
        let result = harness.run(
            &launch,
            &mut chain,
            || host_product(&left, &right, &shape),
            shape.flops(),
        );
        let report = outcome(result)
            .with_context(|| format!("{variant} kernel ({})", kernel_file.file_name()))?;
        println!();
        results.push((variant, report));
    }

    if results.len() > 1 {
        print_summary(&results);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_fill_unset_flags() {
        let cli = Cli::parse_from(["matmul", "--preset", "e6"]);
        assert_eq!(cli.shape().unwrap(), MatmulShape::square(2048).unwrap());
        assert_eq!(cli.variants(), vec![MatmulVariant::Naive]);
        assert_eq!(cli.preset.repeats(), 10);
    }

    #[test]
    fn explicit_variants_and_dimensions_win() {
        let cli = Cli::parse_from([
            "matmul", "-v", "blocked", "-v", "row", "--order", "64", "-n", "32",
        ]);
        assert_eq!(
            cli.variants(),
            vec![MatmulVariant::Blocked, MatmulVariant::Row]
        );
        assert_eq!(cli.shape().unwrap(), MatmulShape::new(64, 32, 64).unwrap());
    }

    #[test]
    fn host_product_rejects_operands_of_another_shape() {
        let shape = MatmulShape::square(2).unwrap();
        let identity = Array2::eye(2);
        let right = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(
            host_product(&identity, &right, &shape).unwrap(),
            vec![1.0, 2.0, 3.0, 4.0]
        );
        assert!(host_product(&Array2::eye(3), &right, &shape).is_err());
    }

    #[test]
    fn mismatch_is_passed_through_after_reporting() {
        let mismatch = BenchError::ResultMismatch {
            index: 1,
            device: 0.0,
            host: 2.0,
            mismatches: 1,
            total: 4,
        };
        assert!(matches!(
            outcome(Err(mismatch)),
            Err(BenchError::ResultMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn unknown_variant_is_rejected() {
        assert!(Cli::try_parse_from(["matmul", "--variant", "tiled"]).is_err());
    }
}
