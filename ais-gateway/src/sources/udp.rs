//! UDP NMEA listener: the default source. Receivers like rtl-ais and
//! ais-catcher emit `!AIVDM`/`!AIVDO` sentences as UDP datagrams, one or
//! more lines per packet.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info};

use ais_core::config::ListenConfig;
use ais_core::{AisDecoder, Decoded};

use crate::pipeline::Pipeline;

pub async fn run(
    listen: ListenConfig,
    pipeline: Arc<Pipeline>,
    tx: mpsc::Sender<String>,
) -> anyhow::Result<()> {
    let socket = UdpSocket::bind((listen.host.as_str(), listen.port))
        .await
        .with_context(|| format!("binding AIS listener on {}:{}", listen.host, listen.port))?;
    info!(host = %listen.host, port = listen.port, "listening for AIS sentences");

    // One fragment buffer per listener; senders interleave on the same port
    // rarely enough that a shared buffer matches the upstream receivers.
    let mut decoder = AisDecoder::new();
    let mut buf = [0u8; 2048];

    loop {
        let (len, peer) = socket.recv_from(&mut buf).await.context("UDP receive")?;
        let text = String::from_utf8_lossy(&buf[..len]);
        for line in text.lines() {
            match decoder.decode_line(line) {
                Ok(Decoded::Report(report)) => {
                    debug!(?report, "decoded AIS report");
                    if let Some(event) = pipeline.event_for(&report) {
                        if tx.send(event.to_xml()).await.is_err() {
                            // Delivery worker is gone; nothing left to do.
                            return Ok(());
                        }
                    }
                }
                Ok(Decoded::Incomplete) => {}
                Err(err) => debug!(%peer, %err, "dropped sentence"),
            }
        }
    }
}
