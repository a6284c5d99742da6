use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::persist::MatchSource;
use crate::state::LiveScores;

const REQUEST_TIMEOUT_SECS: u64 = 5;

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("crease_live/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build live scores http client")
    })
}

/// Read-only view of the tournament backend's live-score endpoint.
#[derive(Debug, Clone)]
pub struct HttpMatchSource {
    base_url: String,
}

impl HttpMatchSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn live_scores_url(&self, match_id: &str) -> String {
        format!("{}/api/matches/{}/live-scores", self.base_url, match_id)
    }
}

impl MatchSource for HttpMatchSource {
    fn load(&self, match_id: &str) -> Result<Option<LiveScores>> {
        let url = self.live_scores_url(match_id);
        let resp = http_client()?
            .get(&url)
            .send()
            .with_context(|| format!("request {url}"))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {}: {}", status, body));
        }
        parse_live_scores_json(&body)
    }
}

/// The backend sometimes wraps the scores (`{"liveScores": {...}}`) and
/// sometimes returns them bare; `null` means nothing has been saved yet.
pub fn parse_live_scores_json(raw: &str) -> Result<Option<LiveScores>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let mut value: Value = serde_json::from_str(raw).context("decode live scores body")?;
    if let Some(inner) = value.get_mut("liveScores") {
        value = inner.take();
    }
    if value.is_null() {
        return Ok(None);
    }
    let scores = serde_json::from_value::<LiveScores>(value).context("decode live scores")?;
    Ok(Some(scores))
}
