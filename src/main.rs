//! Cache latency CLI
//! Prints per-level access latency in cycles and nanoseconds

use cache_latency::bench::pin_to_core;
use cache_latency::{Config, LatencySuite, LoggingConfig};
use std::env;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    if logging.json_output {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::new(&logging.level))
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install logger: {}", e))?;
        return Ok(());
    }

    let level: Level = logging.level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;
    init_logging(&config.logging)?;

    // Check CLI args
    let args: Vec<String> = env::args().collect();

    if args.get(1).map(String::as_str) == Some("dump-config") {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    if args.get(1).map(String::as_str) == Some("save-config") {
        let path = args
            .get(2)
            .map(String::as_str)
            .unwrap_or("config/cache-latency.json");
        config.save(path)?;
        info!("Configuration saved to {}", path);
        return Ok(());
    }
    let json = args.iter().skip(1).any(|a| a == "--json");

    info!(
        iterations = config.iterations,
        stride = config.stride,
        cpus = num_cpus::get(),
        "Configuration loaded"
    );

    if let Some(core) = config.pin_core {
        pin_to_core(core);
    }

    let suite = LatencySuite::new(&config)?;
    for level in suite.levels() {
        if let Some(detail) = suite.topology().level(level.ordinal()) {
            info!(
                level = level.name(),
                size = detail.size,
                line_size = detail.line_size,
                source = ?detail.source,
                "Cache level"
            );
        }
    }

    if !json {
        for line in suite.header_lines() {
            println!("{}", line);
        }
    }

    let report = suite.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for level in &report.levels {
            println!("{}", level);
        }
    }

    Ok(())
}
