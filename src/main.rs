//! Stress Agent CLI
//!
//! Serves stress scores computed from an EmotiBit CSV feed.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use stress_agent::{
    core::ModelProbe, source::RecordSource, BiometricSample, Config, ScoreCalculator,
    ServiceStats, StressService, SCORE_NOTICE, VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stress-agent")]
#[command(version = VERSION)]
#[command(about = "Stress score service for EmotiBit biometric feeds", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the files the agent reads.
#[derive(Args, Default)]
struct PathArgs {
    /// CSV file the recorder appends to
    #[arg(long)]
    source: Option<PathBuf>,

    /// Trained model artifact
    #[arg(long)]
    model: Option<PathBuf>,

    /// Feature scaler artifact
    #[arg(long)]
    scaler: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service and background poller
    Serve {
        #[command(flatten)]
        paths: PathArgs,

        /// Address to bind to
        #[arg(long)]
        host: Option<std::net::IpAddr>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,

        /// Poll interval in milliseconds
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// Score one set of biometric values
    Score {
        #[command(flatten)]
        paths: PathArgs,

        /// Electrodermal activity (μS)
        #[arg(long, default_value_t = BiometricSample::DEFAULT_EDA)]
        eda: f64,

        /// Heart rate (bpm)
        #[arg(long, default_value_t = BiometricSample::DEFAULT_HEART_RATE)]
        hr: f64,

        /// Heart rate variability (ms)
        #[arg(long, default_value_t = BiometricSample::DEFAULT_HRV)]
        hrv: f64,

        /// Skin temperature (°C)
        #[arg(long, default_value_t = BiometricSample::DEFAULT_SKIN_TEMP)]
        temp: f64,
    },

    /// Append simulated records to the source
    Simulate {
        #[command(flatten)]
        paths: PathArgs,

        /// Number of records to append
        #[arg(long, default_value = "1")]
        count: usize,
    },

    /// Show model and source status
    Status {
        #[command(flatten)]
        paths: PathArgs,
    },

    /// Explain what the score means
    Notice,

    /// Show configuration
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        save: bool,
    },
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stress_agent=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = Config::load_from(&config_path)
        .with_context(|| format!("loading configuration from {config_path:?}"))?;

    match cli.command {
        Commands::Serve {
            paths,
            host,
            port,
            poll_interval_ms,
        } => {
            let mut config = apply_paths(config, paths);
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(ms) = poll_interval_ms {
                config.poll_interval = std::time::Duration::from_millis(ms);
            }
            config.validate()?;
            cmd_serve(config)
        }
        Commands::Score {
            paths,
            eda,
            hr,
            hrv,
            temp,
        } => cmd_score(
            apply_paths(config, paths),
            BiometricSample::new(eda, hr, hrv, temp),
        ),
        Commands::Simulate { paths, count } => cmd_simulate(apply_paths(config, paths), count),
        Commands::Status { paths } => cmd_status(apply_paths(config, paths)),
        Commands::Notice => {
            println!("{SCORE_NOTICE}");
            Ok(())
        }
        Commands::Config { save } => cmd_config(config, &config_path, save),
    }
}

fn apply_paths(mut config: Config, paths: PathArgs) -> Config {
    if let Some(source) = paths.source {
        config.source_path = source;
    }
    if let Some(model) = paths.model {
        config.model_path = model;
    }
    if let Some(scaler) = paths.scaler {
        config.scaler_path = scaler;
    }
    config
}

#[cfg(feature = "server")]
fn cmd_serve(config: Config) -> anyhow::Result<()> {
    use stress_agent::server::{self, ServerConfig};

    println!("Stress Agent v{VERSION}");
    println!();

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async move {
        let stats = Arc::new(ServiceStats::with_persistence(config.stats_path()));
        let service = Arc::new(StressService::new(&config, stats.clone()));

        let status = service.status();
        println!("  Source: {:?}", config.source_path);
        println!(
            "  Scoring: {}",
            if status.model_loaded {
                "trained model (heuristic fallback)"
            } else {
                "heuristic"
            }
        );
        println!("  Poll interval: {}ms", config.poll_interval.as_millis());

        let handle = server::run(ServerConfig::new(config.host, config.port), service).await?;
        println!("  Listening on http://{}", handle.addr);
        println!();
        println!("Press Ctrl+C to stop");

        tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl+C")?;

        println!();
        println!("Stopping...");
        handle.shutdown().await;

        if let Err(e) = stats.save() {
            eprintln!("Warning: Could not save service stats: {e}");
        }
        println!();
        println!("{}", stats.summary());
        Ok(())
    })
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_config: Config) -> anyhow::Result<()> {
    anyhow::bail!("serve requires the `server` feature (rebuild with --features server)")
}

fn cmd_score(config: Config, sample: BiometricSample) -> anyhow::Result<()> {
    let probe = ModelProbe::new(&config.model_path, &config.scaler_path);
    let calculator = match probe.load() {
        Some(artifact) => ScoreCalculator::with_model(Arc::new(artifact)),
        None => ScoreCalculator::heuristic(),
    };

    let scored = calculator.score(&sample);
    println!("Stress score: {:.1} ({})", scored.score, scored.source);
    if scored.model_failed {
        println!("  Model prediction failed; heuristic used instead");
    }
    Ok(())
}

fn cmd_simulate(config: Config, count: usize) -> anyhow::Result<()> {
    let service = StressService::new(&config, Arc::new(ServiceStats::new()));

    for _ in 0..count {
        let reading = service.inject_simulated_reading()?;
        println!(
            "Appended: EDA {:.2}, HR {}, HRV {}, TEMP {:.1} (score {:.1})",
            reading.eda(),
            reading.heart_rate(),
            reading.heart_rate_variability(),
            reading.skin_temp(),
            reading.score()
        );
    }
    println!("Wrote {count} record(s) to {:?}", service.source_path());
    Ok(())
}

fn cmd_status(config: Config) -> anyhow::Result<()> {
    let service = StressService::new(&config, Arc::new(ServiceStats::new()));
    let status = service.status();

    println!("Stress Agent Status");
    println!("===================");
    println!();
    println!("Model:");
    println!("  Artifacts present: {}", status.model_available);
    println!("  Loaded: {}", status.model_loaded);
    println!("  Model file: {:?}", config.model_path);
    println!("  Scaler file: {:?}", config.scaler_path);
    println!();
    println!("Source:");
    println!("  Path: {:?}", config.source_path);
    println!("  Exists: {}", status.source_exists);

    if status.source_exists {
        let source = RecordSource::new(&config.source_path);
        match source.read_latest() {
            Ok(latest) => {
                let s = latest.sample;
                println!(
                    "  Latest record: EDA {}, HR {}, HRV {}, TEMP {}",
                    s.eda, s.heart_rate, s.heart_rate_variability, s.skin_temp
                );
                for e in &latest.defaulted {
                    println!("    (default used: {e})");
                }
            }
            Err(e) => println!("  Latest record: unreadable ({e})"),
        }
    }
    Ok(())
}

fn cmd_config(config: Config, path: &std::path::Path, save: bool) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if save {
        config.save_to(path)?;
        println!();
        println!("Saved to {path:?}");
    }
    Ok(())
}
