use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::broadcast::DEFAULT_CHANNEL;
use crate::feed::DEFAULT_POLL_MS;
use crate::overlay::DEFAULT_NOTIFICATION_SECS;
use crate::persist::default_db_path;
use crate::state::MatchMeta;
use crate::wire::WireFormat;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub channel: String,
    pub wire_format: WireFormat,
    pub poll_interval: Duration,
    pub notification_ttl: Duration,
    pub db_path: Option<PathBuf>,
    pub api_base: Option<String>,
    pub match_id: String,
    pub max_overs: u32,
    pub template: String,
    pub template_file: Option<PathBuf>,
    pub meta: MatchMeta,
    pub fake_operator: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    /// Loads `.env.local` then `.env` (first definition wins) and reads the
    /// process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let wire_format = get("CREASE_WIRE_FORMAT")
            .and_then(|v| WireFormat::parse(&v))
            .unwrap_or_default();
        let poll_ms = get("CREASE_POLL_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_MS)
            .clamp(250, 60_000);
        let notify_secs = get("CREASE_NOTIFY_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_NOTIFICATION_SECS)
            .clamp(1, 30);
        let max_overs = get("CREASE_MAX_OVERS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(20)
            .min(50);

        Self {
            channel: get("CREASE_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            wire_format,
            poll_interval: Duration::from_millis(poll_ms),
            notification_ttl: Duration::from_secs(notify_secs),
            db_path: get("CREASE_DB_PATH")
                .map(PathBuf::from)
                .or_else(default_db_path),
            api_base: get("CREASE_API_BASE"),
            match_id: get("CREASE_MATCH_ID").unwrap_or_else(|| "local".to_string()),
            max_overs,
            template: get("CREASE_TEMPLATE").unwrap_or_else(|| "classic".to_string()),
            template_file: get("CREASE_TEMPLATE_FILE").map(PathBuf::from),
            meta: MatchMeta {
                tournament_name: get("CREASE_TOURNAMENT").unwrap_or_default(),
                team1_name: get("CREASE_TEAM1").unwrap_or_default(),
                team2_name: get("CREASE_TEAM2").unwrap_or_default(),
                team1_color: get("CREASE_TEAM1_COLOR"),
                team2_color: get("CREASE_TEAM2_COLOR"),
            },
            fake_operator: get("CREASE_FAKE_OPERATOR")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
