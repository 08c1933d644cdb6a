//! alertwire - real-time fraud alert client.
//!
//! `watch` follows the live push channel, `inject` exercises the store with
//! a synthetic alert, `trigger` asks the backend to evaluate a test item.

use alertwire_client::{
    Alert, AlertClient, AlertKind, AlertPriority, ClientConfig, DiagnosticTrigger, StoreEvent,
    TestAlert, TestTip,
};
use alertwire_telemetry::Metrics;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Real-time fraud alert client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "ALERTWIRE_CONFIG")]
    config: Option<String>,

    /// Override the push channel URL
    #[arg(long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and print alerts as they arrive (Ctrl-C to stop)
    Watch {
        /// Print Prometheus metrics on exit
        #[arg(long)]
        metrics: bool,
    },
    /// Inject a synthetic alert into a local client and print the store
    Inject {
        #[arg(long, default_value = "high_risk_tip")]
        kind: String,
        #[arg(long, default_value = "Test alert")]
        message: String,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },
    /// Submit a test item to the backend's diagnostic endpoint
    Trigger {
        #[arg(long)]
        text: String,
        #[arg(long)]
        sector: Option<String>,
        #[arg(long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    alertwire_ws::init_crypto();

    let args = Args::parse();

    alertwire_telemetry::init_logging()?;
    info!("Starting alertwire v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(args.config.as_deref())?;
    if let Some(url) = args.url {
        config.channel.url = url;
        config.validate()?;
    }

    match args.command {
        Command::Watch { metrics } => watch(&config, metrics).await,
        Command::Inject {
            kind,
            message,
            priority,
            id,
        } => {
            inject(&config, &kind, message, priority.as_deref(), id);
            Ok(())
        }
        Command::Trigger {
            text,
            sector,
            region,
        } => {
            let trigger = DiagnosticTrigger::new(&config.diagnostics)?;
            let mut tip = TestTip::new(text);
            tip.sector = sector;
            tip.region = region;
            let evaluation = trigger.submit(&tip).await?;
            println!(
                "risk_score={} alert_sent={}",
                evaluation
                    .risk_score
                    .map(|s| format!("{s:.1}"))
                    .unwrap_or_else(|| "n/a".to_string()),
                evaluation.alert_sent
            );
            Ok(())
        }
    }
}

/// CLI flag / env var > default path > built-in defaults.
fn load_config(explicit: Option<&str>) -> Result<ClientConfig> {
    match explicit {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            ClientConfig::from_file(path).with_context(|| format!("loading {path}"))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!(config_path = DEFAULT_CONFIG_PATH, "Loading configuration");
            Ok(ClientConfig::from_file(DEFAULT_CONFIG_PATH)?)
        }
        None => {
            info!("No configuration file, using defaults");
            Ok(ClientConfig::default())
        }
    }
}

async fn watch(config: &ClientConfig, print_metrics: bool) -> Result<()> {
    let client = AlertClient::from_config(config);
    let mut sub = client.subscribe();
    client.connect();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, disconnecting");
                break;
            }
            changed = sub.state.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *sub.state.borrow_and_update();
                println!("status: {state}");
            }
            event = sub.events.recv() => {
                match event {
                    Ok(StoreEvent::Inserted { id }) | Ok(StoreEvent::Replaced { id }) => {
                        if let Some(alert) = client.store().get(&id) {
                            println!("{}  (unread: {})", format_alert(&alert), client.unread_count());
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Alert printer lagged behind the store");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    client.disconnect();
    info!(
        decoded = client.decode_stats().decoded(),
        rejected = client.decode_stats().rejected(),
        "Session summary"
    );

    if print_metrics {
        print!("{}", Metrics::gather_text()?);
    }
    Ok(())
}

fn inject(
    config: &ClientConfig,
    kind: &str,
    message: String,
    priority: Option<&str>,
    id: Option<String>,
) {
    let client = AlertClient::from_config(config);

    let mut partial = TestAlert::new(message).kind(AlertKind::from_wire(kind));
    if let Some(priority) = priority.and_then(AlertPriority::from_wire) {
        partial = partial.priority(priority);
    }
    if let Some(id) = id {
        partial = partial.id(id);
    }

    let alert = client.inject_test_alert(partial);
    println!("{}", format_alert(&alert));
    println!("alerts: {}  unread: {}", client.alerts().len(), client.unread_count());
}

fn format_alert(alert: &Alert) -> String {
    let badge = alert
        .priority
        .map(|p| format!("[{}] ", p.as_str().to_uppercase()))
        .unwrap_or_default();
    format!(
        "{} {}{} - {} ({}, id={})",
        alert.timestamp.format("%H:%M:%S"),
        badge,
        alert.title,
        alert.message,
        alert.kind,
        alert.id
    )
}
