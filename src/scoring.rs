//! Ball-by-ball scoring transitions over [`LiveScores`].
//!
//! Every function validates its input before touching state, so a rejected
//! call leaves the scores exactly as they were. Successful calls return the
//! discrete events the transition produced; publishing them is the caller's
//! business.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{
    BALLS_PER_OVER, BallMark, BallMarkKind, Batsman, Bowler, LiveScores, MAX_WICKETS,
    PLACEHOLDER_NEW_BATSMAN, TeamKey, Toss, TossChoice, opening_pair,
};
use crate::wire::{EventKind, ExtraType, ScoreEvent};

pub const MAX_RUNS_PER_BALL: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("runs must be between 0 and {MAX_RUNS_PER_BALL}, got {0}")]
    InvalidRuns(u32),
    #[error("runs run on an extra must be between 0 and {MAX_RUNS_PER_BALL}, got {0}")]
    InvalidExtraRuns(u32),
    #[error("unknown dismissal type: {0}")]
    UnknownOutType(String),
    #[error("unknown extra type: {0}")]
    UnknownExtraType(String),
    #[error("batting side is already all out")]
    AllOut,
    #[error("record the toss before scoring")]
    TossPending,
    #[error("toss already recorded; reset the match to redo it")]
    TossAlreadyRecorded,
    #[error("no reset is waiting for confirmation")]
    NoPendingReset,
    #[error("batsman slot must be 0 or 1, got {0}")]
    InvalidSlot(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutType {
    Caught,
    Bowled,
    Lbw,
    Stumped,
    RunOut,
    HitWicket,
    HandledBall,
    TimedOut,
}

impl OutType {
    pub const ALL: [OutType; 8] = [
        OutType::Caught,
        OutType::Bowled,
        OutType::Lbw,
        OutType::Stumped,
        OutType::RunOut,
        OutType::HitWicket,
        OutType::HandledBall,
        OutType::TimedOut,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OutType::Caught => "CAUGHT",
            OutType::Bowled => "BOWLED",
            OutType::Lbw => "LBW",
            OutType::Stumped => "STUMPED",
            OutType::RunOut => "RUN OUT",
            OutType::HitWicket => "HIT WICKET",
            OutType::HandledBall => "HANDLED BALL",
            OutType::TimedOut => "TIMED OUT",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            OutType::Caught => "caught",
            OutType::Bowled => "bowled",
            OutType::Lbw => "lbw",
            OutType::Stumped => "stumped",
            OutType::RunOut => "runOut",
            OutType::HitWicket => "hitWicket",
            OutType::HandledBall => "handledBall",
            OutType::TimedOut => "timedOut",
        }
    }

    /// A timed-out batsman never faced the delivery.
    pub fn consumes_ball(self) -> bool {
        self != OutType::TimedOut
    }
}

impl fmt::Display for OutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OutType {
    type Err = ScoringError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        OutType::ALL
            .into_iter()
            .find(|out| out.code().eq_ignore_ascii_case(&key))
            .ok_or_else(|| ScoringError::UnknownOutType(raw.to_string()))
    }
}

impl FromStr for ExtraType {
    type Err = ScoringError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "wide" | "wd" => Ok(ExtraType::Wide),
            "noball" | "nb" => Ok(ExtraType::NoBall),
            "bye" | "b" => Ok(ExtraType::Bye),
            "legbye" | "lb" => Ok(ExtraType::LegBye),
            _ => Err(ScoringError::UnknownExtraType(raw.to_string())),
        }
    }
}

/// One operator intent, applied through [`apply_action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreAction {
    Toss {
        winner: TeamKey,
        choice: TossChoice,
    },
    Runs(u32),
    Extra {
        kind: ExtraType,
        runs_run: u32,
    },
    Wicket(OutType),
    SwitchBatting,
    Reset(Option<TeamKey>),
    SetBatsmanName {
        slot: usize,
        name: String,
    },
    SetBowler(String),
    PushEvent {
        event_type: String,
        message: String,
    },
}

impl ScoreAction {
    /// Whether the action counts as scoring and therefore needs a recorded toss.
    pub fn requires_toss(&self) -> bool {
        !matches!(
            self,
            ScoreAction::Toss { .. } | ScoreAction::Reset(_) | ScoreAction::PushEvent { .. }
        )
    }
}

pub fn apply_action(
    scores: &mut LiveScores,
    action: ScoreAction,
) -> Result<Vec<ScoreEvent>, ScoringError> {
    match action {
        ScoreAction::Toss { winner, choice } => {
            handle_toss(scores, winner, choice);
            Ok(Vec::new())
        }
        ScoreAction::Runs(runs) => add_runs(scores, runs),
        ScoreAction::Extra { kind, runs_run } => add_extra(scores, kind, runs_run),
        ScoreAction::Wicket(out) => process_wicket(scores, out),
        ScoreAction::SwitchBatting => {
            switch_batting(scores);
            Ok(Vec::new())
        }
        ScoreAction::Reset(team) => {
            reset_innings(scores, team);
            Ok(Vec::new())
        }
        ScoreAction::SetBatsmanName { slot, name } => {
            set_batsman_name(scores, slot, &name)?;
            Ok(Vec::new())
        }
        ScoreAction::SetBowler(name) => {
            set_bowler(scores, &name);
            Ok(Vec::new())
        }
        ScoreAction::PushEvent {
            event_type,
            message,
        } => Ok(vec![push_event(&event_type, &message)]),
    }
}

pub fn add_runs(scores: &mut LiveScores, runs: u32) -> Result<Vec<ScoreEvent>, ScoringError> {
    if runs > MAX_RUNS_PER_BALL {
        return Err(ScoringError::InvalidRuns(runs));
    }
    let key = scores.batting_team;
    let team = scores.batting_mut();
    team.normalize_crease();

    team.score += runs;
    if let Some(striker) = striker_mut(&mut team.batsmen) {
        striker.runs += runs;
        striker.balls += 1;
        match runs {
            4 => striker.fours += 1,
            6 => striker.sixes += 1,
            _ => {}
        }
    }
    concede(scores, runs);
    advance_ball(scores);
    if runs % 2 == 1 {
        swap_strike(&mut scores.batting_mut().batsmen);
    }
    scores.record_ball(BallMark {
        runs,
        kind: BallMarkKind::Runs,
    });
    scores.refresh_run_rates();

    let mut events = vec![ScoreEvent::new(EventKind::Run).with_runs(runs).with_team(key)];
    match runs {
        4 => events.push(ScoreEvent::new(EventKind::Four).with_message("FOUR!").with_team(key)),
        6 => events.push(ScoreEvent::new(EventKind::Six).with_message("SIX!").with_team(key)),
        _ => {}
    }
    Ok(events)
}

pub fn add_extra(
    scores: &mut LiveScores,
    kind: ExtraType,
    runs_run: u32,
) -> Result<Vec<ScoreEvent>, ScoringError> {
    if runs_run > MAX_RUNS_PER_BALL {
        return Err(ScoringError::InvalidExtraRuns(runs_run));
    }
    let key = scores.batting_team;
    let total = kind.penalty() + runs_run;
    let team = scores.batting_mut();
    team.normalize_crease();
    team.score += total;

    if kind.consumes_ball() {
        if let Some(striker) = striker_mut(&mut team.batsmen) {
            striker.balls += 1;
        }
    }
    concede(scores, total);
    if kind.consumes_ball() {
        advance_ball(scores);
    }
    let mark_kind = match kind {
        ExtraType::Wide => BallMarkKind::Wide,
        ExtraType::NoBall => BallMarkKind::NoBall,
        ExtraType::Bye => BallMarkKind::Bye,
        ExtraType::LegBye => BallMarkKind::LegBye,
    };
    scores.record_ball(BallMark {
        runs: total,
        kind: mark_kind,
    });
    scores.refresh_run_rates();

    Ok(vec![
        ScoreEvent::new(EventKind::Extra)
            .with_message(kind.label())
            .with_runs(total)
            .with_team(key)
            .with_extra(kind),
    ])
}

pub fn process_wicket(
    scores: &mut LiveScores,
    out: OutType,
) -> Result<Vec<ScoreEvent>, ScoringError> {
    if scores.batting().wickets >= MAX_WICKETS {
        return Err(ScoringError::AllOut);
    }
    let key = scores.batting_team;
    let team = scores.batting_mut();
    team.normalize_crease();
    team.wickets += 1;
    if let Some(bowler) = team.bowler.as_mut() {
        bowler.wickets += 1;
    }

    // The incoming batsman always takes strike; the survivor stays where he is.
    let striker_idx = team.striker_index().unwrap_or(0);
    team.batsmen[striker_idx] = Batsman::fresh(PLACEHOLDER_NEW_BATSMAN, true);
    for (idx, batsman) in team.batsmen.iter_mut().enumerate() {
        if idx != striker_idx {
            batsman.is_striker = false;
        }
    }

    if out.consumes_ball() {
        advance_ball(scores);
    }
    scores.record_ball(BallMark {
        runs: 0,
        kind: BallMarkKind::Wicket {
            legal: out.consumes_ball(),
        },
    });
    scores.refresh_run_rates();

    Ok(vec![
        ScoreEvent::new(EventKind::Wicket)
            .with_message(out.label())
            .with_event_type(out.code())
            .with_team(key),
    ])
}

pub fn switch_batting(scores: &mut LiveScores) {
    let first_innings_score = scores.batting().score;
    scores.batting_team = scores.batting_team.other();
    scores.batting_mut().batsmen = opening_pair();
    scores.innings = 2;
    scores.is_chasing = true;
    if scores.target == 0 {
        scores.target = first_innings_score + 1;
    }
    scores.clear_recent_balls();
    scores.refresh_run_rates();
}

/// Zeroes one side, or the whole match (run rates, target and recent balls
/// included) when no side is given.
pub fn reset_innings(scores: &mut LiveScores, team: Option<TeamKey>) {
    match team {
        Some(key) => scores.team_mut(key).reset(),
        None => {
            scores.team1.reset();
            scores.team2.reset();
            scores.current_run_rate = 0.0;
            scores.required_run_rate = 0.0;
            scores.target = 0;
            scores.clear_recent_balls();
        }
    }
    scores.refresh_run_rates();
}

pub fn handle_toss(scores: &mut LiveScores, winner: TeamKey, choice: TossChoice) {
    scores.batting_team = match choice {
        TossChoice::Bat => winner,
        TossChoice::Field => winner.other(),
    };
    scores.toss = Some(Toss { winner, choice });
    scores.is_chasing = false;
    scores.innings = 1;
    scores.refresh_run_rates();
}

pub fn set_batsman_name(
    scores: &mut LiveScores,
    slot: usize,
    name: &str,
) -> Result<(), ScoringError> {
    if slot > 1 {
        return Err(ScoringError::InvalidSlot(slot));
    }
    let team = scores.batting_mut();
    team.normalize_crease();
    team.batsmen[slot].name = name.trim().to_string();
    Ok(())
}

/// Brings on a new bowler with empty figures. Overs stay tied to the team count.
pub fn set_bowler(scores: &mut LiveScores, name: &str) {
    let team = scores.batting_mut();
    let mut bowler = Bowler::fresh(name.trim());
    bowler.overs = team.overs;
    bowler.joined_mid_over = team.balls > 0;
    team.bowler = Some(bowler);
}

pub fn push_event(event_type: &str, message: &str) -> ScoreEvent {
    ScoreEvent::new(EventKind::PushEvent)
        .with_event_type(event_type)
        .with_message(message)
}

fn striker_mut(batsmen: &mut [Batsman]) -> Option<&mut Batsman> {
    batsmen.iter_mut().find(|b| b.is_striker)
}

/// Swaps the two batsmen's ends: slots trade places and the strike flags flip.
fn swap_strike(batsmen: &mut [Batsman]) {
    if batsmen.len() < 2 {
        return;
    }
    batsmen.swap(0, 1);
    for batsman in batsmen.iter_mut().take(2) {
        batsman.is_striker = !batsman.is_striker;
    }
}

fn concede(scores: &mut LiveScores, runs: u32) {
    let team = scores.batting_mut();
    team.over_runs += runs;
    if let Some(bowler) = team.bowler.as_mut() {
        bowler.runs += runs;
    }
}

fn advance_ball(scores: &mut LiveScores) {
    let team = scores.batting_mut();
    team.balls += 1;
    if team.balls >= BALLS_PER_OVER {
        team.balls = 0;
        team.overs += 1;
        let maiden = team.over_runs == 0;
        team.over_runs = 0;
        if let Some(bowler) = team.bowler.as_mut() {
            if maiden && !bowler.joined_mid_over {
                bowler.maidens += 1;
            }
            bowler.joined_mid_over = false;
        }
    }
    let overs = team.overs;
    if let Some(bowler) = team.bowler.as_mut() {
        bowler.overs = overs;
    }
}
