use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::anyhow;
use crease_live::broadcast::{BroadcastHub, BroadcastPublisher};
use crease_live::config::AppConfig;
use crease_live::fake_feed::{random_ball, spawn_fake_operator};
use crease_live::feed::{FeedUpdate, parse_push_message, poll_once, spawn_match_poller};
use crease_live::persist::{MatchSource, MemoryScoreStore, ScoreStore};
use crease_live::scoring::ScoreAction;
use crease_live::state::{LiveScores, MatchMeta};
use crease_live::wire::{ChannelMessage, EventKind, WireFormat, decode_message};

#[test]
fn push_score_update_carries_match_and_scores() {
    let raw = r#"{"matchId": "m9", "liveScores": {"team1": {"score": 12}, "team2": {}}}"#;
    let update = parse_push_message("scoreUpdate", raw).expect("parse");
    let FeedUpdate::ScoreUpdate { match_id, scores } = update else {
        panic!("expected score update");
    };
    assert_eq!(match_id, "m9");
    assert_eq!(scores.team1.score, 12);
}

#[test]
fn push_match_event_accepts_both_shapes() {
    let typed = parse_push_message("matchEvent", r#"{"type": "SIX", "team": "team2"}"#)
        .expect("typed");
    assert!(matches!(
        typed,
        FeedUpdate::MatchEvent(ref e) if e.kind == EventKind::Six
    ));

    let bare = parse_push_message(
        "matchEvent",
        r#"{"eventType": "review", "message": "DRS REVIEW"}"#,
    )
    .expect("bare");
    let FeedUpdate::MatchEvent(event) = bare else {
        panic!("expected event");
    };
    assert_eq!(event.kind, EventKind::PushEvent);
    assert_eq!(event.banner().as_deref(), Some("DRS REVIEW"));

    assert!(parse_push_message("chat", "{}").is_err());
    assert!(
        parse_push_message("scoreUpdate", r#"{"matchId": "m1", "liveScores": null}"#).is_err()
    );
}

#[test]
fn poll_once_publishes_stored_scores() {
    let hub = BroadcastHub::new();
    let channel = hub.channel("scores");
    let mut sub = channel.subscribe();
    let publisher = BroadcastPublisher::new(channel, WireFormat::Tagged);
    let store = MemoryScoreStore::new();

    assert_eq!(
        poll_once(&store, &MatchMeta::default(), "m1", &publisher).expect("poll"),
        None
    );

    let mut scores = LiveScores::new("Hawks", "Owls");
    scores.team1.score = 31;
    store.save("m1", &scores).expect("save");
    assert_eq!(
        poll_once(&store, &MatchMeta::default(), "m1", &publisher).expect("poll"),
        Some(1)
    );
    let raw = sub.try_recv().expect("broadcast");
    let Some(ChannelMessage::State { payload }) = decode_message(&raw) else {
        panic!("state message");
    };
    assert_eq!(payload.team1.score, 31);
}

struct DownSource;

impl MatchSource for DownSource {
    fn load(&self, _match_id: &str) -> anyhow::Result<Option<LiveScores>> {
        Err(anyhow!("backend down"))
    }
}

#[test]
fn poller_reports_one_error_per_failure_streak() {
    let hub = BroadcastHub::new();
    let publisher = BroadcastPublisher::new(hub.channel("scores"), WireFormat::Tagged);
    let (tx, rx) = mpsc::channel();

    let poller = spawn_match_poller(
        Arc::new(DownSource),
        MatchMeta::default(),
        "m1".to_string(),
        publisher,
        Duration::from_millis(10),
        tx,
    );
    std::thread::sleep(Duration::from_millis(120));
    poller.stop();

    let logs: Vec<String> = rx
        .try_iter()
        .filter_map(|u| match u {
            FeedUpdate::Log(line) => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("[WARN] Poll error"));
    assert!(logs[0].contains("backend down"));
}

#[test]
fn poller_keeps_followers_fresh() {
    let hub = BroadcastHub::new();
    let channel = hub.channel("scores");
    let sub = channel.subscribe();
    let publisher = BroadcastPublisher::new(channel, WireFormat::Legacy);
    let store = Arc::new(MemoryScoreStore::new());
    store
        .save("m1", &LiveScores::new("Hawks", "Owls"))
        .expect("save");
    let (tx, _rx) = mpsc::channel();

    let poller = spawn_match_poller(
        store,
        MatchMeta::default(),
        "m1".to_string(),
        publisher,
        Duration::from_millis(10),
        tx,
    );
    std::thread::sleep(Duration::from_millis(100));
    drop(poller);
    assert!(sub.pending() >= 2);
}

#[test]
fn config_defaults_and_clamps() {
    let cfg = AppConfig::from_lookup(|_| None);
    assert_eq!(cfg.channel, "cricket-scores");
    assert_eq!(cfg.wire_format, WireFormat::Tagged);
    assert_eq!(cfg.poll_interval, Duration::from_millis(2000));
    assert_eq!(cfg.notification_ttl, Duration::from_secs(3));
    assert_eq!(cfg.match_id, "local");
    assert_eq!(cfg.max_overs, 20);
    assert_eq!(cfg.template, "classic");
    assert!(cfg.api_base.is_none());
    assert!(!cfg.fake_operator);

    let vars: HashMap<&str, &str> = HashMap::from([
        ("CREASE_CHANNEL", " stadium-a "),
        ("CREASE_WIRE_FORMAT", "legacy"),
        ("CREASE_POLL_MS", "5"),
        ("CREASE_NOTIFY_SECS", "600"),
        ("CREASE_MAX_OVERS", "90"),
        ("CREASE_TEAM1", "Hawks"),
        ("CREASE_TEAM2_COLOR", "#ff0000"),
        ("CREASE_DB_PATH", "/tmp/crease.sqlite"),
        ("CREASE_FAKE_OPERATOR", "yes"),
    ]);
    let cfg = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
    assert_eq!(cfg.channel, "stadium-a");
    assert_eq!(cfg.wire_format, WireFormat::Legacy);
    assert_eq!(cfg.poll_interval, Duration::from_millis(250));
    assert_eq!(cfg.notification_ttl, Duration::from_secs(30));
    assert_eq!(cfg.max_overs, 50);
    assert_eq!(cfg.meta.team1_name, "Hawks");
    assert_eq!(cfg.meta.team2_color.as_deref(), Some("#ff0000"));
    assert_eq!(
        cfg.db_path.as_deref(),
        Some(std::path::Path::new("/tmp/crease.sqlite"))
    );
    assert!(cfg.fake_operator);
}

#[test]
fn random_balls_are_always_valid_deliveries() {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        match random_ball(&mut rng) {
            ScoreAction::Runs(r) => assert!(r <= 6),
            ScoreAction::Extra { runs_run, .. } => assert!(runs_run <= 6),
            ScoreAction::Wicket(out) => assert!(out.consumes_ball()),
            other => panic!("unexpected action {other:?}"),
        }
    }
}

#[test]
fn fake_operator_opens_with_toss_and_bowler() {
    let (tx, rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_fake_operator(tx, Duration::from_millis(1), stop.clone());

    let first = rx.recv().expect("toss");
    let second = rx.recv().expect("bowler");
    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    drop(rx);
    handle.join().expect("operator thread");

    assert!(matches!(first, ScoreAction::Toss { .. }));
    assert!(matches!(second, ScoreAction::SetBowler(_)));
}
