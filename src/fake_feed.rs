use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::scoring::{OutType, ScoreAction};
use crate::state::{TeamKey, TossChoice};
use crate::wire::ExtraType;

const BOWLERS: &[&str] = &["R. Khan", "J. Anderson", "P. Cummins", "T. Boult", "K. Rabada"];
const BATTERS: &[&str] = &[
    "S. Dhawan", "D. Warner", "K. Williamson", "J. Root", "B. Azam", "Q. de Kock", "S. Smith",
];

/// Weighted ball outcome, roughly shaped like a T20 innings.
pub fn random_ball(rng: &mut impl Rng) -> ScoreAction {
    let roll = rng.gen_range(0..100);
    match roll {
        0..=33 => ScoreAction::Runs(0),
        34..=58 => ScoreAction::Runs(1),
        59..=68 => ScoreAction::Runs(2),
        69..=70 => ScoreAction::Runs(3),
        71..=80 => ScoreAction::Runs(4),
        81..=85 => ScoreAction::Runs(6),
        86..=89 => ScoreAction::Extra {
            kind: ExtraType::Wide,
            runs_run: if rng.gen_bool(0.1) { 4 } else { 0 },
        },
        90..=91 => ScoreAction::Extra {
            kind: ExtraType::NoBall,
            runs_run: rng.gen_range(0..=1),
        },
        92 => ScoreAction::Extra {
            kind: ExtraType::Bye,
            runs_run: rng.gen_range(1..=2),
        },
        93..=94 => ScoreAction::Extra {
            kind: ExtraType::LegBye,
            runs_run: 1,
        },
        _ => {
            let out = *OutType::ALL[..OutType::ALL.len() - 1]
                .choose(rng)
                .unwrap_or(&OutType::Bowled);
            ScoreAction::Wicket(out)
        }
    }
}

fn consumes_ball(action: &ScoreAction) -> bool {
    match action {
        ScoreAction::Runs(_) => true,
        ScoreAction::Extra { kind, .. } => kind.consumes_ball(),
        ScoreAction::Wicket(out) => out.consumes_ball(),
        _ => false,
    }
}

/// Drives a session with random but legal actions: a toss, then balls, a new
/// bowler every over and a named batsman after every wicket.
pub fn spawn_fake_operator(
    tx: Sender<ScoreAction>,
    pace: Duration,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        let winner = if rng.gen_bool(0.5) {
            TeamKey::Team1
        } else {
            TeamKey::Team2
        };
        let choice = if rng.gen_bool(0.5) {
            TossChoice::Bat
        } else {
            TossChoice::Field
        };
        if tx.send(ScoreAction::Toss { winner, choice }).is_err() {
            return;
        }

        let mut legal = 0u32;
        let mut bowling_over: Option<u32> = None;
        let mut bowler_idx = 0usize;
        let mut batter_idx = 0usize;
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(pace);

            if bowling_over != Some(legal / 6) {
                bowling_over = Some(legal / 6);
                let name = BOWLERS[bowler_idx % BOWLERS.len()].to_string();
                bowler_idx += 1;
                if tx.send(ScoreAction::SetBowler(name)).is_err() {
                    return;
                }
            }

            let action = random_ball(&mut rng);
            if consumes_ball(&action) {
                legal += 1;
            }
            let wicket = matches!(action, ScoreAction::Wicket(_));
            if tx.send(action).is_err() {
                return;
            }
            if wicket {
                let name = BATTERS[batter_idx % BATTERS.len()].to_string();
                batter_idx += 1;
                // Strike swaps and dismissals both leave the striker in slot 0.
                if tx.send(ScoreAction::SetBatsmanName { slot: 0, name }).is_err() {
                    return;
                }
            }
        }
    })
}
