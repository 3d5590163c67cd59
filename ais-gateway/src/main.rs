//! ais-gateway: AIS maritime tracking to Cursor-on-Target gateway.
//!
//! Reads vessel reports from one of three sources (UDP NMEA listener, HTTP
//! aggregator feed, AISStream.io websocket), transforms them into CoT events,
//! and delivers the XML to a TAK destination over UDP, TCP, or stdout.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ais_core::config::{self, Config};
use ais_core::{AisDecoder, Decoded};

mod delivery;
mod normalize;
mod pipeline;
mod sources;
mod vessels;

use pipeline::Pipeline;

/// Bounded output queue depth. When delivery stalls, producers block here.
const QUEUE_DEPTH: usize = 1024;

#[derive(Parser)]
#[command(
    name = "ais-gateway",
    version,
    about = "AIS to Cursor-on-Target gateway"
)]
struct Cli {
    /// Config file path (defaults to ~/.ais-gateway/config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway: read AIS reports, emit CoT events
    Run {
        /// HTTP feed URL to poll (AISHub or SeaVision)
        #[arg(long, env = "FEED_URL")]
        feed_url: Option<String>,

        /// AISStream.io API key (enables the websocket source)
        #[arg(long, env = "AISSTREAM_API_KEY")]
        aisstream_api_key: Option<String>,

        /// UDP port for the NMEA listener
        #[arg(long, env = "LISTEN_PORT")]
        listen_port: Option<u16>,

        /// CoT destination: udp://host:port, tcp://host:port, or stdout
        #[arg(long, env = "COT_URL")]
        cot_url: Option<String>,

        /// Known-craft CSV (acts as an allow-list unless --include-all-craft)
        #[arg(long, env = "KNOWN_CRAFT")]
        known_craft: Option<String>,

        /// Emit events for vessels absent from the known-craft file
        #[arg(long)]
        include_all_craft: bool,
    },

    /// Decode NMEA sentences from a file (or - for stdin) and print reports
    Decode {
        /// Path to a file of AIVDM/AIVDO sentences, one per line
        file: PathBuf,

        /// Print CoT XML instead of decoded JSON reports
        #[arg(long)]
        cot: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    match cli.command {
        Commands::Run {
            feed_url,
            aisstream_api_key,
            listen_port,
            cot_url,
            known_craft,
            include_all_craft,
        } => {
            if let Some(url) = feed_url {
                cfg.feed.url = Some(url);
            }
            if let Some(key) = aisstream_api_key {
                cfg.aisstream.api_key = Some(key);
            }
            if let Some(port) = listen_port {
                cfg.listen.port = port;
            }
            if let Some(url) = cot_url {
                cfg.cot.url = url;
            }
            if let Some(path) = known_craft {
                cfg.known_craft = Some(path);
            }
            if include_all_craft {
                cfg.cot.include_all_craft = true;
            }
            run_gateway(cfg).await
        }
        Commands::Decode { file, cot } => cmd_decode(&cfg, &file, cot),
    }
}

async fn run_gateway(config: Config) -> anyhow::Result<()> {
    let sink = delivery::parse_url(&config.cot.url)?;
    let pipeline = Arc::new(Pipeline::new(&config)?);
    let (tx, rx) = mpsc::channel::<String>(QUEUE_DEPTH);

    // Source precedence: AISStream when a key is configured and no feed URL
    // overrides it, then HTTP polling, then the UDP listener.
    let source: std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>>>> =
        if config.aisstream.api_key.is_some() && config.feed.url.is_none() {
            info!("source: AISStream.io websocket");
            Box::pin(sources::stream::run(
                config.aisstream.clone(),
                pipeline,
                tx,
            ))
        } else if config.feed.url.is_some() {
            info!("source: HTTP feed poller");
            Box::pin(sources::poll::run(config.feed.clone(), pipeline, tx))
        } else {
            info!("source: UDP NMEA listener");
            Box::pin(sources::udp::run(config.listen.clone(), pipeline, tx))
        };

    let (source_result, delivery_result) = tokio::join!(source, delivery::run(sink, rx));
    source_result?;
    delivery_result
}

fn cmd_decode(config: &Config, file: &Path, cot: bool) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead> = if file == Path::new("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
        Box::new(BufReader::new(f))
    };

    let pipeline = Pipeline::new(config)?;
    let mut decoder = AisDecoder::new();
    let mut decoded = 0u64;
    let mut emitted = 0u64;

    for line in reader.lines() {
        let line = line?;
        match decoder.decode_line(&line) {
            Ok(Decoded::Report(report)) => {
                decoded += 1;
                if cot {
                    if let Some(event) = pipeline.event_for(&report) {
                        emitted += 1;
                        print!("{}", event.to_xml());
                    }
                } else {
                    println!("{}", serde_json::to_string(&report)?);
                }
            }
            Ok(Decoded::Incomplete) => {}
            Err(err) => eprintln!("skipping line: {err}"),
        }
    }

    if cot {
        eprintln!("{decoded} decoded reports, {emitted} CoT events");
    } else {
        eprintln!("{decoded} decoded reports");
    }
    Ok(())
}
