use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crease_live::broadcast::{BroadcastHub, BroadcastPublisher};
use crease_live::config::AppConfig;
use crease_live::fake_feed;
use crease_live::overlay::{FieldMap, MemoryDocument, OverlayRenderer};
use crease_live::persist::SqliteScoreStore;
use crease_live::scoring::{OutType, ScoreAction};
use crease_live::session::ScoringSession;
use crease_live::state::{TeamKey, TossChoice};
use crease_live::wire::ExtraType;

fn main() -> Result<()> {
    let cfg = AppConfig::from_env();
    let mut args = std::env::args().skip(1);
    let mut random_balls: Option<usize> = None;
    let mut save = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--random" => {
                let n = args
                    .next()
                    .context("--random expects a ball count")?
                    .parse::<usize>()
                    .context("--random expects a number")?;
                random_balls = Some(n);
            }
            "--save" => save = true,
            other => anyhow::bail!("unknown argument {other}"),
        }
    }

    let hub = BroadcastHub::new();
    let channel = hub.channel(&cfg.channel);
    let publisher = BroadcastPublisher::new(channel.clone(), cfg.wire_format);
    let mut wire = channel.subscribe();
    let field_map = FieldMap::builtin(&cfg.template).unwrap_or_else(FieldMap::classic);
    let mut overlay_sub = channel.subscribe();
    let mut overlay = OverlayRenderer::new(MemoryDocument::for_template(&field_map), &field_map)
        .with_notification_ttl(cfg.notification_ttl);

    let mut session =
        ScoringSession::new(&cfg.match_id, cfg.meta.clone(), cfg.max_overs, publisher);

    let actions = match random_balls {
        Some(n) => random_actions(n),
        None => scripted_actions(),
    };
    for action in actions {
        if let Err(err) = session.apply(action) {
            eprintln!("rejected: {err}");
        }
        for raw in wire.drain() {
            println!("{raw}");
        }
        overlay.drain(&mut overlay_sub, Instant::now());
    }

    if save {
        let path = cfg
            .db_path
            .clone()
            .context("no checkpoint path; set CREASE_DB_PATH")?;
        let store = SqliteScoreStore::open(&path)?;
        session.save(&store)?;
        eprintln!("saved match {} to {}", cfg.match_id, path.display());
    }

    let payload = session.payload();
    eprintln!(
        "{} | overlay template {} | banner {:?}",
        payload.status,
        overlay.template(),
        overlay.notification()
    );
    Ok(())
}

fn scripted_actions() -> Vec<ScoreAction> {
    vec![
        ScoreAction::Toss {
            winner: TeamKey::Team1,
            choice: TossChoice::Bat,
        },
        ScoreAction::SetBowler("Opening Bowler".to_string()),
        ScoreAction::Runs(1),
        ScoreAction::Runs(4),
        ScoreAction::Extra {
            kind: ExtraType::Wide,
            runs_run: 0,
        },
        ScoreAction::Runs(0),
        ScoreAction::Wicket(OutType::Caught),
        ScoreAction::SetBatsmanName {
            slot: 0,
            name: "Number Three".to_string(),
        },
        ScoreAction::Runs(6),
        ScoreAction::Extra {
            kind: ExtraType::LegBye,
            runs_run: 1,
        },
        ScoreAction::SwitchBatting,
        ScoreAction::Runs(2),
        ScoreAction::PushEvent {
            event_type: "break".to_string(),
            message: "DRINKS BREAK".to_string(),
        },
    ]
}

/// Collects `balls` deliveries (plus the toss and bowler changes) from the
/// fake operator thread.
fn random_actions(balls: usize) -> Vec<ScoreAction> {
    let (tx, rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let handle = fake_feed::spawn_fake_operator(tx, Duration::from_millis(1), stop.clone());

    let mut out = Vec::new();
    let mut deliveries = 0;
    while deliveries < balls {
        let Ok(action) = rx.recv() else {
            break;
        };
        if matches!(
            action,
            ScoreAction::Runs(_) | ScoreAction::Extra { .. } | ScoreAction::Wicket(_)
        ) {
            deliveries += 1;
        }
        out.push(action);
    }
    stop.store(true, Ordering::Relaxed);
    drop(rx);
    let _ = handle.join();
    out
}
