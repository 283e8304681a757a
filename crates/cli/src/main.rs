use anyhow::{Context as AnyhowContext, Result};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use log::warn;
use notify::{RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::{mpsc, RwLock};
use watchword_engine::{
    ChannelSink, Command, DocumentEvent, InputEvent, JsonFileStore, MemoryDocument,
    MutationWatcher, StateStore, WatchContext,
};
use watchword_protocol::SinkEvent;

mod transcript;

use transcript::TranscriptMirror;

#[derive(Parser)]
#[command(name = "watchword")]
#[command(about = "Keyword watch over a live transcript file", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the persisted keyword log and activity record
    #[arg(long, global = true, default_value = ".watchword")]
    state_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail a transcript file and scan changed lines as they land
    Watch {
        /// Transcript file to follow, one message per line
        file: PathBuf,

        /// Hostname events are attributed to
        #[arg(long, default_value = "chatgpt.com")]
        host: String,
    },
    /// Print the persisted keyword log, newest first
    Log {
        /// Emit the raw entry array instead of formatted lines
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Watch { file, host } => watch(&cli.state_dir, &file, &host).await,
        Commands::Log { json } => print_log(&cli.state_dir, json).await,
    }
}

async fn watch(state_dir: &Path, file: &Path, host: &str) -> Result<()> {
    let store = Arc::new(JsonFileStore::new(state_dir));
    let (sink, sink_rx) = ChannelSink::new();
    let context = WatchContext::new(host, store, Arc::new(sink));
    tokio::spawn(print_sink_events(sink_rx));

    // Seed the document from the current file contents so the watcher's
    // initial pass covers what is already on disk.
    let doc = Arc::new(RwLock::new(MemoryDocument::new()));
    let mut mirror = TranscriptMirror::new();
    {
        let snapshot = read_snapshot(file).await;
        let mut doc = doc.write().await;
        mirror.apply_snapshot(&mut doc, &snapshot);
    }

    let (events_tx, events_rx) = mpsc::channel(1024);
    let watcher = MutationWatcher::spawn(context, doc.clone(), events_rx);

    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    let mut fs_watcher =
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                let _ = tick_tx.send(());
            }
            Ok(_) => {}
            Err(err) => warn!("transcript watch error: {err}"),
        })?;
    fs_watcher
        .watch(file, RecursiveMode::NonRecursive)
        .with_context(|| format!("cannot watch {}", file.display()))?;

    println!(
        "watching {} (state in {}); commands: highlight, reset, quit",
        file.display(),
        state_dir.display()
    );

    let mut stdin_lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(()) = tick_rx.recv() => {
                let snapshot = read_snapshot(file).await;
                let mutations = {
                    let mut doc = doc.write().await;
                    mirror.apply_snapshot(&mut doc, &snapshot)
                };
                if !mutations.is_empty() {
                    events_tx.send(DocumentEvent::Mutations(mutations)).await?;
                }
            }
            line = stdin_lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "quit" | "exit" => break,
                    "highlight" => {
                        let response = watcher.command(Command::Highlight).await?;
                        println!("{}", response.status);
                    }
                    "reset" => {
                        let response = watcher.command(Command::Reset).await?;
                        println!("{}", response.status);
                    }
                    // Any other input counts as user activity on the page.
                    _ => events_tx.send(DocumentEvent::Input(InputEvent::KeyDown)).await?,
                }
            }
            else => break,
        }
    }

    Ok(())
}

async fn read_snapshot(file: &Path) -> String {
    match tokio::fs::read_to_string(file).await {
        Ok(text) => text,
        Err(err) => {
            warn!("cannot read {}: {err}", file.display());
            String::new()
        }
    }
}

async fn print_sink_events(mut rx: mpsc::UnboundedReceiver<SinkEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            SinkEvent::LogEntry(entry) => {
                let meta = entry.meta();
                println!(
                    "[watchword] {} {} {} {} (platform: {})",
                    meta.date,
                    meta.time,
                    entry.kind_label(),
                    entry.details(),
                    meta.platform
                );
            }
            SinkEvent::Activity(record) => {
                println!(
                    "[watchword] last activity on {} at {}",
                    record.platform,
                    format_timestamp(record.timestamp)
                );
            }
        }
    }
}

async fn print_log(state_dir: &Path, json: bool) -> Result<()> {
    let store = JsonFileStore::new(state_dir);
    let entries = store.read_log().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("log is empty");
    }
    for entry in &entries {
        let meta = entry.meta();
        println!(
            "{} {} {} {} (platform: {})",
            meta.date,
            meta.time,
            entry.kind_label(),
            entry.details(),
            meta.platform
        );
    }
    if let Some(record) = store.read_activity().await? {
        println!(
            "last activity on {} at {}",
            record.platform,
            format_timestamp(record.timestamp)
        );
    }
    Ok(())
}

fn format_timestamp(ms: u64) -> String {
    let ms = i64::try_from(ms).unwrap_or(i64::MAX);
    match Local.timestamp_millis_opt(ms) {
        chrono::LocalResult::Single(when) => when.format("%b %-d, %Y %I:%M:%S %p").to_string(),
        _ => format!("{ms} ms since epoch"),
    }
}
