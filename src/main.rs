use anyhow::{Context, Result};
use clap::Parser;
use routegate::cli::{Cli, OutputFormat};
use routegate::dataset::Dataset;
use routegate::regression::compare;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` turns on per-test-case diagnostics
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args.to_config().context("Failed to resolve comparison config")?;

    let benchmark = Dataset::from_file(&args.benchmark)
        .with_context(|| format!("Failed to load benchmark {}", args.benchmark.display()))?;
    let profile = Dataset::from_file(&args.profile)
        .with_context(|| format!("Failed to load profile {}", args.profile.display()))?;
    tracing::debug!(
        "Loaded {} test cases from {} and {} from {}",
        benchmark.len(),
        benchmark.origin(),
        profile.len(),
        profile.origin()
    );

    let report = compare(&benchmark, &profile, &config)?;

    match args.format {
        OutputFormat::Text => print!("{}", report.to_report_string()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        ),
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}
