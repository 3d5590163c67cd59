//! HTTP feed poller for JSON aggregators.
//!
//! Two response shapes are handled: AISHub (`[status, [records...]]`, with
//! an `ERROR` flag in the status object) and SeaVision (a bare array of
//! records, authenticated with an `x-api-key` header). SeaVision is detected
//! by URL substring, matching how operators configure the upstream feeds.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ais_core::config::FeedConfig;

use crate::normalize;
use crate::pipeline::Pipeline;

pub async fn run(
    feed: FeedConfig,
    pipeline: Arc<Pipeline>,
    tx: mpsc::Sender<String>,
) -> anyhow::Result<()> {
    let url = feed.url.clone().context("feed URL is not set")?;
    let interval = Duration::from_secs(feed.poll_interval.max(1));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")?;

    info!(%url, interval_s = interval.as_secs(), "polling AIS feed");

    loop {
        match poll_once(&client, &url, feed.api_key.as_deref()).await {
            Ok(records) => {
                debug!(count = records.len(), "retrieved feed records");
                for record in &records {
                    let Some(report) = normalize::report_from_json(record) else {
                        continue;
                    };
                    if let Some(event) = pipeline.event_for(&report) {
                        if tx.send(event.to_xml()).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
            Err(err) => warn!(%url, %err, "feed poll failed"),
        }
        tokio::time::sleep(interval).await;
    }
}

async fn poll_once(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
) -> anyhow::Result<Vec<Value>> {
    let mut request = client.get(url);
    let seavision = url.contains("seavision");
    if seavision {
        request = request.header("accept", "application/json");
        if let Some(key) = api_key {
            request = request.header("x-api-key", key);
        }
    }

    let body: Value = request
        .send()
        .await
        .context("feed request")?
        .error_for_status()
        .context("feed response status")?
        .json()
        .await
        .context("feed response body")?;

    if seavision {
        return extract_seavision(body);
    }
    extract_aishub(body)
}

fn extract_aishub(body: Value) -> anyhow::Result<Vec<Value>> {
    let Value::Array(mut parts) = body else {
        bail!("AISHub response is not an array");
    };
    if parts.len() < 2 {
        bail!("AISHub response is missing the record list");
    }
    let records = parts.remove(1);
    let status = parts.remove(0);
    if status.get("ERROR").map(is_truthy_json).unwrap_or(false) {
        bail!("AISHub API returned an error: {status}");
    }
    match records {
        Value::Array(records) => Ok(records),
        _ => bail!("AISHub record list is not an array"),
    }
}

fn extract_seavision(body: Value) -> anyhow::Result<Vec<Value>> {
    match body {
        Value::Array(records) => Ok(records),
        _ => bail!("SeaVision response is not an array"),
    }
}

fn is_truthy_json(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
