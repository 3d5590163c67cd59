//! AISStream.io websocket source.
//!
//! Subscribes with an API key, a bounding box, and a message-type filter,
//! then flattens each JSON envelope into the normalized report shape. The
//! connection loop reconnects with a fixed delay; a vessel registry carries
//! names from static-data messages onto later position reports.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use ais_core::config::AisStreamConfig;

use crate::normalize;
use crate::pipeline::Pipeline;
use crate::vessels::VesselRegistry;

pub const STREAM_URL: &str = "wss://stream.aisstream.io/v0/stream";

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Message types the flattener understands.
const MESSAGE_TYPES: &[&str] = &[
    "PositionReport",
    "ShipStaticData",
    "StandardClassBPositionReport",
    "ExtendedClassBPositionReport",
    "AidsToNavigationReport",
    "StaticDataReport",
];

/// Subscription payload. Bounding-box coordinates are `[lat, lon]` pairs,
/// `[[south-west], [north-east]]`.
fn subscribe_message(api_key: &str, bbox: &[f64; 4]) -> String {
    json!({
        "APIKey": api_key,
        "BoundingBoxes": [[[bbox[0], bbox[1]], [bbox[2], bbox[3]]]],
        "FilterMessageTypes": MESSAGE_TYPES,
    })
    .to_string()
}

pub async fn run(
    config: AisStreamConfig,
    pipeline: Arc<Pipeline>,
    tx: mpsc::Sender<String>,
) -> anyhow::Result<()> {
    let api_key = config
        .api_key
        .clone()
        .context("AISStream API key is not set")?;
    let subscribe = subscribe_message(&api_key, &config.bbox);
    let mut registry = VesselRegistry::new(config.vessel_cache.as_deref());

    loop {
        match session(&subscribe, &mut registry, &pipeline, &tx).await {
            Ok(()) => return Ok(()),
            Err(err) => warn!(%err, "AISStream connection lost"),
        }
        info!(delay_s = RECONNECT_DELAY.as_secs(), "reconnecting to AISStream");
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// One websocket session. `Ok` means the output queue closed and the gateway
/// is shutting down; any transport error surfaces for the reconnect loop.
async fn session(
    subscribe: &str,
    registry: &mut VesselRegistry,
    pipeline: &Pipeline,
    tx: &mpsc::Sender<String>,
) -> anyhow::Result<()> {
    let (mut ws, _) = connect_async(STREAM_URL)
        .await
        .context("connecting to AISStream")?;
    info!(url = STREAM_URL, "connected to AISStream");

    ws.send(Message::Text(subscribe.to_string()))
        .await
        .context("sending AISStream subscription")?;

    while let Some(frame) = ws.next().await {
        match frame.context("AISStream read")? {
            Message::Text(text) => {
                if !handle_envelope(&text, registry, pipeline, tx).await {
                    return Ok(());
                }
            }
            Message::Ping(payload) => {
                ws.send(Message::Pong(payload))
                    .await
                    .context("answering websocket ping")?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    anyhow::bail!("AISStream closed the connection")
}

/// Returns `false` when the output queue has closed.
async fn handle_envelope(
    text: &str,
    registry: &mut VesselRegistry,
    pipeline: &Pipeline,
    tx: &mpsc::Sender<String>,
) -> bool {
    let envelope: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(err) => {
            warn!(%err, "AISStream frame is not valid JSON");
            return true;
        }
    };

    let Some(mut report) = normalize::flatten_envelope(&envelope, registry) else {
        return true;
    };
    normalize::normalize(&mut report);
    debug!(?report, "normalized AISStream report");

    match pipeline.event_for(&report) {
        Some(event) => tx.send(event.to_xml()).await.is_ok(),
        None => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_message_shape() {
        let msg = subscribe_message("key123", &[-90.0, -180.0, 90.0, 180.0]);
        let parsed: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(parsed["APIKey"], "key123");
        assert_eq!(
            parsed["BoundingBoxes"],
            serde_json::json!([[[-90.0, -180.0], [90.0, 180.0]]])
        );
        assert_eq!(parsed["FilterMessageTypes"][0], "PositionReport");
        assert_eq!(
            parsed["FilterMessageTypes"].as_array().unwrap().len(),
            MESSAGE_TYPES.len()
        );
    }

    #[tokio::test]
    async fn test_handle_envelope_produces_event() {
        let mut registry = VesselRegistry::new(None);
        let pipeline = Pipeline::new(&ais_core::config::Config::default()).unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        let envelope = serde_json::json!({
            "MessageType": "PositionReport",
            "Message": {
                "PositionReport": {
                    "UserID": 366892000_i64,
                    "Latitude": 41.1,
                    "Longitude": -71.3,
                    "Cog": 95.0,
                    "Sog": 6.4,
                    "TrueHeading": 95,
                }
            }
        })
        .to_string();

        assert!(handle_envelope(&envelope, &mut registry, &pipeline, &tx).await);
        let xml = rx.try_recv().unwrap();
        assert!(xml.contains("uid=\"MMSI-366892000\""));
        assert!(xml.contains("course=\"95\""));
    }

    #[tokio::test]
    async fn test_handle_envelope_tolerates_garbage() {
        let mut registry = VesselRegistry::new(None);
        let pipeline = Pipeline::new(&ais_core::config::Config::default()).unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        assert!(handle_envelope("not json", &mut registry, &pipeline, &tx).await);
        assert!(handle_envelope("{}", &mut registry, &pipeline, &tx).await);
        assert!(rx.try_recv().is_err());
    }
}
