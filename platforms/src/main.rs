//! Lists every OpenCL platform on this machine and the properties of its
//! devices.

use anyhow::{Context, Result};
use clap::Parser;
use clbench::platform;

#[derive(Parser, Debug)]
#[command(version, about = "Print OpenCL platform and device information")]
struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    clbench::logging::init(&cli.log_level);

    let platforms = platform::enumerate().context("failed to enumerate OpenCL platforms")?;
    if platforms.is_empty() {
        println!("No OpenCL platforms found.");
        return Ok(());
    }

    for (index, report) in platforms.iter().enumerate() {
        tracing::debug!(index, devices = report.devices.len(), "platform");
        println!("{report}");
    }
    Ok(())
}
