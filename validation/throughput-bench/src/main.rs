//! Throughput benchmark CLI comparing blocking and streaming endpoint variants.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use throughput_bench::{
    run_benchmark, BenchConfig, Endpoint, EndpointClient, MeasurementRequest, ResultsReport,
    SweepController,
};

#[derive(Parser)]
#[command(name = "throughput-bench")]
#[command(
    about = "Concurrent throughput benchmark for blocking vs streaming endpoints",
    long_about = None
)]
struct Cli {
    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to benchmark YAML file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the base URL of the endpoints
    #[arg(short, long, env = "BENCH_BASE_URL")]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Warm up, sweep every load level and write the results table
    Run {
        #[command(flatten)]
        source: ConfigArgs,

        /// Override worker pool size
        #[arg(short, long)]
        parallelism: Option<usize>,

        /// Override connection pool capacity
        #[arg(long)]
        max_connections: Option<usize>,

        /// Override trials per load level
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Override output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the warm-up phase
        #[arg(long)]
        skip_warmup: bool,

        /// Also write a JSON summary with latency detail
        #[arg(long)]
        summary_json: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Issue one validated call to each variant
    Probe {
        #[command(flatten)]
        source: ConfigArgs,

        /// Numbers requested per call
        #[arg(short, long, default_value = "10")]
        number_count: u32,

        /// Minimum response delay requested per call
        #[arg(short, long, default_value = "100")]
        delay_millis: u64,
    },

    /// Print the effective configuration as YAML
    Config {
        #[command(flatten)]
        source: ConfigArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    match cli.command {
        Commands::Run {
            source,
            parallelism,
            max_connections,
            iterations,
            output,
            skip_warmup,
            summary_json,
            no_progress,
        } => {
            let mut config = load_config(&source)?;

            // Apply overrides
            if let Some(p) = parallelism {
                config.parallelism = p;
            }
            if max_connections.is_some() {
                config.max_connections = max_connections;
            }
            if let Some(i) = iterations {
                config.measurement.iterations = i;
            }
            if let Some(o) = output {
                config.output = o;
            }
            if skip_warmup {
                config.warmup.iterations = 0;
            }

            config.validate()?;

            info!(
                base_url = %config.base_url,
                parallelism = config.parallelism,
                max_connections = config.connection_capacity(),
                load_levels = ?config.load_levels(),
                iterations = config.measurement.iterations,
                "Starting benchmark"
            );

            let client = Arc::new(EndpointClient::new(&config)?);
            let controller = SweepController::new(client, config).with_progress(!no_progress);

            // Stdout receives the table when it cannot be written to the output file.
            let mut stdout = std::io::stdout();
            let run = run_benchmark(&controller, summary_json.as_deref(), &mut stdout).await?;

            println!("{}", ResultsReport::format_table(&run.report));
            println!("{}", ResultsReport::format_latency_table(&run.report));

            match run.export_errors.into_iter().next() {
                Some(e) => Err(e.into()),
                None => Ok(()),
            }
        }
        Commands::Probe {
            source,
            number_count,
            delay_millis,
        } => {
            let config = load_config(&source)?;
            config.validate()?;
            let client = EndpointClient::new(&config)?;

            for variant in &config.variants {
                let request = MeasurementRequest::new(&variant.name, number_count, delay_millis);
                let latency = client
                    .call(&request)
                    .await
                    .with_context(|| {
                        format!("Probe of '{}' failed", client.url_for(&variant.name))
                    })?;
                println!(
                    "✓ {} returned {} numbers in {}ms",
                    variant.name,
                    number_count,
                    latency.as_millis()
                );
            }

            Ok(())
        }
        Commands::Config { source } => {
            let config = load_config(&source)?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<BenchConfig> {
    let mut config = match &args.config {
        Some(path) => BenchConfig::from_file(path)
            .with_context(|| format!("Failed to load benchmark config: {}", path.display()))?,
        None => BenchConfig::default(),
    };
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    Ok(config)
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
