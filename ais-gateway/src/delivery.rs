//! CoT delivery worker.
//!
//! Consumes serialized events from the bounded output queue and writes them
//! to the configured destination. The queue gives producers backpressure:
//! when the destination stalls, `send().await` on the other side parks the
//! source adapter instead of growing memory.

use std::time::Duration;

use anyhow::{bail, Context};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Seconds between TCP reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// A parsed CoT destination URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CotSink {
    /// `udp://host:port` (unicast or multicast group).
    Udp(String),
    /// `tcp://host:port`, reconnecting with a fixed delay.
    Tcp(String),
    /// `stdout` or `-`: one XML document per line block.
    Stdout,
}

pub fn parse_url(url: &str) -> anyhow::Result<CotSink> {
    let url = url.trim();
    if url == "stdout" || url == "-" {
        return Ok(CotSink::Stdout);
    }
    if let Some(addr) = url.strip_prefix("udp://") {
        if addr.rsplit_once(':').is_none() {
            bail!("CoT URL {url} is missing a port");
        }
        return Ok(CotSink::Udp(addr.to_string()));
    }
    if let Some(addr) = url.strip_prefix("tcp://") {
        if addr.rsplit_once(':').is_none() {
            bail!("CoT URL {url} is missing a port");
        }
        return Ok(CotSink::Tcp(addr.to_string()));
    }
    bail!("unsupported CoT URL scheme: {url}")
}

/// Run the delivery loop until the queue closes.
pub async fn run(sink: CotSink, rx: mpsc::Receiver<String>) -> anyhow::Result<()> {
    match sink {
        CotSink::Udp(addr) => run_udp(addr, rx).await,
        CotSink::Tcp(addr) => run_tcp(addr, rx).await,
        CotSink::Stdout => run_stdout(rx).await,
    }
}

async fn run_udp(addr: String, mut rx: mpsc::Receiver<String>) -> anyhow::Result<()> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("binding UDP send socket")?;
    info!(%addr, "delivering CoT over UDP");
    while let Some(event) = rx.recv().await {
        if let Err(err) = socket.send_to(event.as_bytes(), &addr).await {
            warn!(%addr, %err, "UDP send failed, event dropped");
        } else {
            debug!(bytes = event.len(), "sent CoT event");
        }
    }
    Ok(())
}

async fn run_tcp(addr: String, mut rx: mpsc::Receiver<String>) -> anyhow::Result<()> {
    info!(%addr, "delivering CoT over TCP");
    let mut stream: Option<TcpStream> = None;
    while let Some(event) = rx.recv().await {
        // Retry the current event until it goes out; the bounded queue
        // holds back the producers meanwhile.
        loop {
            if stream.is_none() {
                match TcpStream::connect(&addr).await {
                    Ok(s) => {
                        info!(%addr, "connected to CoT destination");
                        stream = Some(s);
                    }
                    Err(err) => {
                        warn!(%addr, %err, "CoT connection failed, retrying");
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue;
                    }
                }
            }
            match stream.as_mut() {
                Some(s) => match s.write_all(event.as_bytes()).await {
                    Ok(()) => break,
                    Err(err) => {
                        warn!(%addr, %err, "CoT write failed, reconnecting");
                        stream = None;
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                },
                None => continue,
            }
        }
    }
    Ok(())
}

async fn run_stdout(mut rx: mpsc::Receiver<String>) -> anyhow::Result<()> {
    let mut out = tokio::io::stdout();
    while let Some(event) = rx.recv().await {
        out.write_all(event.as_bytes())
            .await
            .context("writing CoT to stdout")?;
        out.flush().await.context("flushing stdout")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
