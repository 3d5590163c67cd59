//! Configuration file management for ais-gateway.
//!
//! Reads/writes `~/.ais-gateway/config.yaml` with listener settings, feed
//! polling parameters, AISStream websocket credentials, and CoT output
//! options.

use std::path::PathBuf;

use crate::types::AisError;

/// Default NMEA listener bind address.
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
/// Default NMEA listener UDP port.
pub const DEFAULT_LISTEN_PORT: u16 = 5050;
/// Default HTTP feed poll interval, seconds.
pub const DEFAULT_POLL_INTERVAL: u64 = 61;
/// Default CoT destination: the TAK mesh SA multicast group.
pub const DEFAULT_COT_URL: &str = "udp://239.2.3.1:6969";
/// Default CoT type for vessels nothing else classifies.
pub const DEFAULT_COT_TYPE: &str = "a-u-S-X-M";
/// Default CoT stale TTL, seconds.
pub const DEFAULT_COT_STALE: u64 = 3600;

/// Full configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: ListenConfig,
    pub feed: FeedConfig,
    pub aisstream: AisStreamConfig,
    pub cot: CotConfig,
    /// Path to the operator's Known Craft CSV.
    pub known_craft: Option<String>,
}

/// UDP NMEA listener settings.
#[derive(Debug, Clone)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

/// Polled HTTP feed settings (AISHub, SeaVision).
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: Option<String>,
    pub poll_interval: u64,
    /// API key sent as a header for feeds that require one.
    pub api_key: Option<String>,
}

/// AISStream.io websocket settings.
#[derive(Debug, Clone)]
pub struct AisStreamConfig {
    pub api_key: Option<String>,
    /// Subscription bounding box: lat_min, lon_min, lat_max, lon_max.
    pub bbox: [f64; 4],
    /// Optional JSON file persisting the vessel-name registry between runs.
    pub vessel_cache: Option<String>,
}

/// CoT output settings, consumed by the transform and the delivery worker.
#[derive(Debug, Clone)]
pub struct CotConfig {
    /// Destination URL: `udp://host:port`, `tcp://host:port`, or `stdout`.
    pub url: String,
    /// Override for the resolved CoT type; wins over known-craft rows.
    pub cot_type: Option<String>,
    /// Override for the stale TTL in seconds; wins over known-craft rows.
    pub stale: Option<u64>,
    /// Identifier appended to event remarks.
    pub host_id: String,
    /// Optional `<usericon>` iconset path stamped on every event.
    pub icon: Option<String>,
    /// Suppress Aid-to-Navigation events entirely.
    pub ignore_aton: bool,
    /// Emit events for vessels absent from the Known Craft file even when
    /// one is configured (otherwise the file acts as an allow-list).
    pub include_all_craft: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: ListenConfig {
                host: DEFAULT_LISTEN_HOST.into(),
                port: DEFAULT_LISTEN_PORT,
            },
            feed: FeedConfig {
                url: None,
                poll_interval: DEFAULT_POLL_INTERVAL,
                api_key: None,
            },
            aisstream: AisStreamConfig {
                api_key: None,
                bbox: [-90.0, -180.0, 90.0, 180.0],
                vessel_cache: None,
            },
            cot: CotConfig::default(),
            known_craft: None,
        }
    }
}

impl Default for CotConfig {
    fn default() -> Self {
        CotConfig {
            url: DEFAULT_COT_URL.into(),
            cot_type: None,
            stale: None,
            host_id: "ais-gateway".into(),
            icon: None,
            ignore_aton: false,
            include_all_craft: false,
        }
    }
}

/// Get the config directory path (`~/.ais-gateway/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".ais-gateway")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.ais-gateway/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

/// Load config from an explicit path, falling back to defaults.
pub fn load_config_from(path: &std::path::Path) -> Config {
    if !path.exists() {
        return Config::default();
    }

    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(_) => return Config::default(),
    };

    parse_config(&text).unwrap_or_default()
}

/// Save config to `~/.ais-gateway/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, AisError> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).map_err(|e| AisError::Config(e.to_string()))?;

    let path = config_file();
    let text = serialize_config(config);
    std::fs::write(&path, text).map_err(|e| AisError::Config(e.to_string()))?;

    Ok(path)
}

/// Parse simple YAML-like config text.
pub fn parse_config(text: &str) -> Option<Config> {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        if let Some((key, val)) = stripped.split_once(':') {
            let key = key.trim();
            let val = val.trim();

            if !is_indented {
                if val.is_empty() {
                    current_section = Some(key.to_string());
                } else {
                    current_section = None;
                    // Top-level key with value
                    if key == "known_craft" {
                        config.known_craft = parse_string_value(val);
                    }
                }
            } else if let Some(ref section) = current_section {
                match section.as_str() {
                    "listen" => match key {
                        "host" => {
                            if let Some(v) = parse_string_value(val) {
                                config.listen.host = v;
                            }
                        }
                        "port" => {
                            if let Ok(v) = val.parse::<u16>() {
                                config.listen.port = v;
                            }
                        }
                        _ => {}
                    },
                    "feed" => match key {
                        "url" => config.feed.url = parse_string_value(val),
                        "poll_interval" => {
                            if let Ok(v) = val.parse::<u64>() {
                                config.feed.poll_interval = v;
                            }
                        }
                        "api_key" => config.feed.api_key = parse_string_value(val),
                        _ => {}
                    },
                    "aisstream" => match key {
                        "api_key" => config.aisstream.api_key = parse_string_value(val),
                        "lat_min" => set_bbox(&mut config.aisstream.bbox, 0, val),
                        "lon_min" => set_bbox(&mut config.aisstream.bbox, 1, val),
                        "lat_max" => set_bbox(&mut config.aisstream.bbox, 2, val),
                        "lon_max" => set_bbox(&mut config.aisstream.bbox, 3, val),
                        "vessel_cache" => {
                            config.aisstream.vessel_cache = parse_string_value(val)
                        }
                        _ => {}
                    },
                    "cot" => match key {
                        "url" => {
                            if let Some(v) = parse_string_value(val) {
                                config.cot.url = v;
                            }
                        }
                        "type" => config.cot.cot_type = parse_string_value(val),
                        "stale" => config.cot.stale = val.parse().ok(),
                        "host_id" => {
                            if let Some(v) = parse_string_value(val) {
                                config.cot.host_id = v;
                            }
                        }
                        "icon" => config.cot.icon = parse_string_value(val),
                        "ignore_aton" => config.cot.ignore_aton = parse_bool_value(val),
                        "include_all_craft" => {
                            config.cot.include_all_craft = parse_bool_value(val)
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
    }

    Some(config)
}

fn set_bbox(bbox: &mut [f64; 4], idx: usize, val: &str) {
    if let Some(v) = parse_float_value(val) {
        bbox[idx] = v;
    }
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if (val.starts_with('"') && val.ends_with('"'))
        || (val.starts_with('\'') && val.ends_with('\''))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

fn parse_bool_value(val: &str) -> bool {
    matches!(val, "true" | "yes" | "1")
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# ais-gateway configuration".to_string(), String::new()];

    lines.push("listen:".into());
    lines.push(format!("  host: \"{}\"", config.listen.host));
    lines.push(format!("  port: {}", config.listen.port));
    lines.push(String::new());

    lines.push("feed:".into());
    match &config.feed.url {
        Some(url) => lines.push(format!("  url: \"{url}\"")),
        None => lines.push("  url: null".into()),
    }
    lines.push(format!("  poll_interval: {}", config.feed.poll_interval));
    match &config.feed.api_key {
        Some(key) => lines.push(format!("  api_key: \"{key}\"")),
        None => lines.push("  api_key: null".into()),
    }
    lines.push(String::new());

    lines.push("aisstream:".into());
    match &config.aisstream.api_key {
        Some(key) => lines.push(format!("  api_key: \"{key}\"")),
        None => lines.push("  api_key: null".into()),
    }
    lines.push(format!("  lat_min: {}", config.aisstream.bbox[0]));
    lines.push(format!("  lon_min: {}", config.aisstream.bbox[1]));
    lines.push(format!("  lat_max: {}", config.aisstream.bbox[2]));
    lines.push(format!("  lon_max: {}", config.aisstream.bbox[3]));
    match &config.aisstream.vessel_cache {
        Some(path) => lines.push(format!("  vessel_cache: \"{path}\"")),
        None => lines.push("  vessel_cache: null".into()),
    }
    lines.push(String::new());

    lines.push("cot:".into());
    lines.push(format!("  url: \"{}\"", config.cot.url));
    match &config.cot.cot_type {
        Some(t) => lines.push(format!("  type: \"{t}\"")),
        None => lines.push("  type: null".into()),
    }
    match config.cot.stale {
        Some(s) => lines.push(format!("  stale: {s}")),
        None => lines.push("  stale: null".into()),
    }
    lines.push(format!("  host_id: \"{}\"", config.cot.host_id));
    match &config.cot.icon {
        Some(icon) => lines.push(format!("  icon: \"{icon}\"")),
        None => lines.push("  icon: null".into()),
    }
    lines.push(format!("  ignore_aton: {}", config.cot.ignore_aton));
    lines.push(format!(
        "  include_all_craft: {}",
        config.cot.include_all_craft
    ));
    lines.push(String::new());

    match &config.known_craft {
        Some(path) => lines.push(format!("known_craft: \"{path}\"")),
        None => lines.push("known_craft: null".into()),
    }

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
