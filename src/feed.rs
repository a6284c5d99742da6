use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::api::parse_live_scores_json;
use crate::broadcast::BroadcastPublisher;
use crate::payload::build_payload;
use crate::persist::MatchSource;
use crate::state::{LiveScores, MatchMeta};
use crate::wire::{EventKind, ScoreEvent};

pub const DEFAULT_POLL_MS: u64 = 2000;
const STOP_CHECK: Duration = Duration::from_millis(100);

/// Updates arriving from outside the local scoring console.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedUpdate {
    ScoreUpdate {
        match_id: String,
        scores: LiveScores,
    },
    MatchEvent(ScoreEvent),
    Log(String),
}

/// Decodes one message from the server-push socket (`scoreUpdate` or
/// `matchEvent`).
pub fn parse_push_message(event_name: &str, raw: &str) -> Result<FeedUpdate> {
    match event_name {
        "scoreUpdate" => {
            let value: Value = serde_json::from_str(raw).context("decode scoreUpdate")?;
            let match_id = value
                .get("matchId")
                .or_else(|| value.get("_id"))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            let scores = parse_live_scores_json(raw)?
                .ok_or_else(|| anyhow!("scoreUpdate without scores"))?;
            Ok(FeedUpdate::ScoreUpdate { match_id, scores })
        }
        "matchEvent" => {
            let value: Value = serde_json::from_str(raw).context("decode matchEvent")?;
            if value.get("type").is_some() {
                let event = serde_json::from_value::<ScoreEvent>(value)
                    .context("decode matchEvent body")?;
                return Ok(FeedUpdate::MatchEvent(event));
            }
            // Bare server events only carry a name and a message.
            let event_type = value
                .get("eventType")
                .and_then(Value::as_str)
                .unwrap_or("event")
                .to_string();
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(FeedUpdate::MatchEvent(
                ScoreEvent::new(EventKind::PushEvent)
                    .with_event_type(event_type)
                    .with_message(message),
            ))
        }
        other => Err(anyhow!("unsupported push event {other}")),
    }
}

/// Reads the stored scores once and republishes them as a full payload.
/// Returns the number of listeners reached, or `None` when nothing is stored.
pub fn poll_once(
    source: &dyn MatchSource,
    meta: &MatchMeta,
    match_id: &str,
    publisher: &BroadcastPublisher,
) -> Result<Option<usize>> {
    let Some(scores) = source.load(match_id)? else {
        return Ok(None);
    };
    Ok(Some(publisher.publish_payload(&build_payload(meta, &scores))))
}

pub struct PollerHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Keeps overlays that follow a stored match fresh: every `interval` the
/// stored scores are re-read and republished. Errors are reported once per
/// failure streak over `tx`.
pub fn spawn_match_poller(
    source: Arc<dyn MatchSource>,
    meta: MatchMeta,
    match_id: String,
    publisher: BroadcastPublisher,
    interval: Duration,
    tx: Sender<FeedUpdate>,
) -> PollerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let join = thread::spawn(move || {
        let mut failing = false;
        let mut last_poll: Option<Instant> = None;
        while !stop_flag.load(Ordering::Relaxed) {
            let due = last_poll.is_none_or(|t| t.elapsed() >= interval);
            if due {
                last_poll = Some(Instant::now());
                match poll_once(source.as_ref(), &meta, &match_id, &publisher) {
                    Ok(_) => {
                        if failing {
                            let _ = tx.send(FeedUpdate::Log(format!(
                                "[INFO] Poll recovered for match {match_id}"
                            )));
                        }
                        failing = false;
                    }
                    Err(err) => {
                        if !failing {
                            let _ = tx.send(FeedUpdate::Log(format!(
                                "[WARN] Poll error for match {match_id}: {err:#}"
                            )));
                        }
                        failing = true;
                    }
                }
            }
            thread::sleep(STOP_CHECK.min(interval));
        }
    });
    PollerHandle {
        stop,
        join: Some(join),
    }
}
