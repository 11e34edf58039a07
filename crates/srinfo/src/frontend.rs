//! Line-based front end for `srinfo watch`.
//!
//! Owns the engine's event receiver and is the only place that prints
//! schedules, so output always reflects events in the order they arrived.

use std::collections::HashMap;

use srinfo::ScheduleEngine;
use srinfo_proto::config::RefreshConfig;
use srinfo_proto::{ChannelId, Command, ScheduleEntry, ScheduleEvent, ScheduleRow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Show(ChannelId),
    Refresh,
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line {
        "r" | "refresh" => Input::Refresh,
        "q" | "quit" | "exit" => Input::Quit,
        "h" | "help" | "?" => Input::Help,
        other => match other.parse::<ChannelId>() {
            Ok(id) if id > 0 => Input::Show(id),
            _ => Input::Unknown(other.to_string()),
        },
    })
}

pub async fn run(
    engine: ScheduleEngine,
    mut events: mpsc::Receiver<ScheduleEvent>,
    channels: Vec<ChannelId>,
    refresh: &RefreshConfig,
) -> anyhow::Result<()> {
    let names: HashMap<ChannelId, String> = match engine.fetch_channels().await {
        Ok(list) => list.into_iter().map(|c| (c.id, c.name)).collect(),
        Err(e) => {
            warn!("Channel names unavailable: {}", e);
            HashMap::new()
        }
    };
    let label = |id: ChannelId| {
        names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Channel {}", id))
    };

    let timer = refresh
        .auto_refresh
        .then(|| engine.spawn_refresh_timer(refresh.interval()));

    for id in &channels {
        engine.handle(Command::Schedule { channel: *id });
    }
    let mut current = channels.first().copied();
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    None => {}
                    Some(Input::Quit) => break,
                    Some(Input::Help) => print_help(),
                    Some(Input::Refresh) => {
                        engine.handle(Command::RefreshAll);
                    }
                    Some(Input::Show(id)) => {
                        current = Some(id);
                        engine.handle(Command::Schedule { channel: id });
                    }
                    Some(Input::Unknown(text)) => println!("Unknown command: {}", text),
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                let focused = event.channel().is_some() && event.channel() == current;
                match event {
                    ScheduleEvent::Loading { channel } => {
                        if focused {
                            println!("Loading {}…", label(channel));
                        }
                    }
                    ScheduleEvent::Schedule { channel, entry } => {
                        if focused {
                            print_schedule(&label(channel), &entry);
                        } else {
                            println!("{}: {} episodes loaded", label(channel), entry.len());
                        }
                    }
                    ScheduleEvent::ScheduleFailed { channel, message, .. } => {
                        println!("Could not load {}: {}", label(channel), message);
                    }
                    ScheduleEvent::RefreshStarted { channels } => {
                        info!("Refresh of {} channels started", channels);
                    }
                    ScheduleEvent::Refreshed { channels } => {
                        println!("Refreshed {} channels", channels);
                        if let Some(id) = current {
                            if let Some(entry) = engine.cache().get(id) {
                                print_schedule(&label(id), &entry);
                            }
                        }
                    }
                    ScheduleEvent::RefreshFailed { channel, refreshed, message, .. } => {
                        println!(
                            "Refresh failed at {} after {} channels: {}",
                            label(channel),
                            refreshed,
                            message
                        );
                    }
                }
            }
        }
    }

    if let Some(timer) = timer {
        timer.abort();
    }
    Ok(())
}

fn print_help() {
    println!("Commands: <channel id> show schedule, r refresh all, h help, q quit");
}

pub fn print_schedule(title: &str, entry: &ScheduleEntry) {
    println!();
    println!("{}", title);
    if entry.is_empty() {
        println!("  Nothing scheduled in the current window");
        return;
    }
    for line in render_rows(&entry.rows()) {
        println!("  {}", line);
    }
}

fn render_rows(rows: &[ScheduleRow]) -> Vec<String> {
    let [program, starts, ends] = ScheduleRow::HEADERS;
    let program_width = rows
        .iter()
        .map(|r| r.program.chars().count())
        .chain([program.len()])
        .max()
        .unwrap_or_default();
    let time_width = rows
        .iter()
        .map(|r| r.starts.chars().count())
        .chain([starts.len()])
        .max()
        .unwrap_or_default();

    std::iter::once((program, starts, ends))
        .chain(
            rows.iter()
                .map(|r| (r.program.as_str(), r.starts.as_str(), r.ends.as_str())),
        )
        .map(|(p, s, e)| {
            format!(
                "{:<pw$}  {:<tw$}  {}",
                p,
                s,
                e,
                pw = program_width,
                tw = time_width
            )
        })
        .collect()
}
