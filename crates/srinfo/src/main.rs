mod frontend;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use srinfo::{ApiClient, ScheduleEngine, TimeWindow};
use srinfo_proto::config::Config;
use srinfo_proto::model::group_channels;
use srinfo_proto::{platform, ChannelId};
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "srinfo", version, about = "Upcoming broadcasts on Sveriges Radio channels")]
struct Cli {
    /// Config file to use instead of ~/.config/srinfo/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// List every channel, grouped by name prefix
    Channels {
        #[arg(long)]
        json: bool,
    },
    /// Print one channel's schedule for the current window
    Schedule {
        channel: ChannelId,
        #[arg(long)]
        json: bool,
    },
    /// Keep channels loaded and refreshed, taking commands from stdin
    Watch {
        #[arg(required = true)]
        channels: Vec<ChannelId>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = init_logging()?;
    // Print log path to stderr so it can be tailed right away.
    eprintln!("srinfo log: {}", log_path.display());
    tracing::info!("srinfo starting…");

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };

    let api = ApiClient::from_config(&config.api).context("failed to set up the API client")?;
    let (event_tx, event_rx) = mpsc::channel(256);
    let engine = ScheduleEngine::new(api, TimeWindow::from(&config.window), event_tx);

    match cli.command {
        CliCommand::Channels { json } => {
            let channels = engine.fetch_channels().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&channels)?);
            } else {
                for (group, members) in group_channels(&channels) {
                    println!("{}", group.label());
                    for channel in members {
                        println!("  {:>5}  {}", channel.id, channel.name);
                    }
                }
            }
        }
        CliCommand::Schedule { channel, json } => {
            let entry = engine.load_schedule(channel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(entry.episodes())?);
            } else {
                frontend::print_schedule(&format!("Channel {}", channel), &entry);
            }
        }
        CliCommand::Watch { channels } => {
            frontend::run(engine, event_rx, channels, &config.refresh).await?;
        }
    }

    tracing::info!("srinfo exiting");
    Ok(())
}

fn init_logging() -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(platform::data_dir())?;
    let log_path = platform::log_file();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    // Allow RUST_LOG override; keep HTTP client connection chatter out by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    Ok(log_path)
}
