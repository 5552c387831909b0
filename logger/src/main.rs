use anyhow::Context;
use clap::Parser;
use ftmcore::source::list_ports;
use ftmcore::Grammar;
use generator::profile::GeneratorConfig;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{ConfigOverrides, LoggerConfig};
use workflow::runner::{Runner, SourceKind};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Logs FTM ranging telemetry from a serial device to CSV")]
struct Args {
    /// Load logger settings from YAML; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serial port the ranging device is attached to
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    baud: Option<u32>,
    /// CSV log to append records to
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Message grammar to extract: session or summary
    #[arg(long, short)]
    grammar: Option<Grammar>,
    /// Serial read timeout; bounds how long Ctrl+C takes to act
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Only report written records, not every raw line
    #[arg(long, short, default_value_t = false)]
    quiet: bool,
    /// Read captured device output from a file instead of a port
    #[arg(long, conflicts_with = "simulate")]
    replay: Option<PathBuf>,
    /// Generate synthetic device output instead of opening a port
    #[arg(long, default_value_t = false)]
    simulate: bool,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Print available serial ports and exit
    #[arg(long, default_value_t = false)]
    list_ports: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port.clone(),
            baud_rate: self.baud,
            output: self.output.clone(),
            grammar: self.grammar,
            timeout_ms: self.timeout_ms,
            echo_lines: self.quiet.then_some(false),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_ports {
        for port in list_ports().context("listing serial ports")? {
            let product = port.product.as_deref().unwrap_or("-");
            let manufacturer = port.manufacturer.as_deref().unwrap_or("-");
            println!("{}\t{}\t{}", port.name, product, manufacturer);
        }
        return Ok(());
    }

    let base = if let Some(path) = &args.config {
        LoggerConfig::load(path)?
    } else {
        LoggerConfig::default()
    };
    let config = base.with_overrides(args.overrides());
    config.validate().context("invalid logger configuration")?;

    let kind = if let Some(path) = args.replay.clone() {
        SourceKind::Replay(path)
    } else if args.simulate {
        SourceKind::Simulated(GeneratorConfig {
            grammar: config.grammar,
            seed: args.seed,
            ..Default::default()
        })
    } else {
        SourceKind::Serial
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let runtime = TokioBuilder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    let flag = cancel.clone();
    runtime.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, stopping");
                flag.store(true, Ordering::SeqCst);
            }
            Err(err) => warn!("cannot listen for Ctrl+C: {}", err),
        }
    });

    let runner = Runner::new(config);
    let outcome = runner.execute(&kind, &cancel);
    runtime.shutdown_background();
    let summary = outcome?;

    println!("{}", summary.status_message());
    println!("{} -> {}", summary.stats, summary.output.display());

    Ok(())
}
