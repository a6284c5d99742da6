//! The scoring console's state container.
//!
//! A [`ScoringSession`] is the single writer of one match's [`LiveScores`].
//! Every accepted action is followed by a broadcast of its discrete events and
//! then a full payload, so overlays never need to reconstruct state from
//! diffs.

use std::collections::VecDeque;

use anyhow::Result;

use crate::broadcast::BroadcastPublisher;
use crate::payload::{OverlayPayload, build_payload};
use crate::persist::{MatchSource, ScoreStore};
use crate::scoring::{self, ScoreAction, ScoringError};
use crate::state::{LiveScores, MatchMeta, TeamKey, Toss, TossChoice};
use crate::wire::{EventKind, ScoreEvent};

const MAX_LOGS: usize = 200;
const MAX_UNDO: usize = 100;

/// A destructive reset waiting for the operator to confirm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReset {
    pub team: Option<TeamKey>,
}

pub struct ScoringSession {
    match_id: String,
    meta: MatchMeta,
    scores: LiveScores,
    publisher: BroadcastPublisher,
    history: Vec<LiveScores>,
    pending_reset: Option<PendingReset>,
    notice: Option<String>,
    logs: VecDeque<String>,
    dirty: bool,
}

impl ScoringSession {
    pub fn new(
        match_id: &str,
        meta: MatchMeta,
        max_overs: u32,
        publisher: BroadcastPublisher,
    ) -> Self {
        let scores = LiveScores::new(&meta.team1_name, &meta.team2_name).with_max_overs(max_overs);
        Self::with_scores(match_id, meta, scores, publisher)
    }

    pub fn with_scores(
        match_id: &str,
        meta: MatchMeta,
        scores: LiveScores,
        publisher: BroadcastPublisher,
    ) -> Self {
        Self {
            match_id: match_id.to_string(),
            meta,
            scores,
            publisher,
            history: Vec::new(),
            pending_reset: None,
            notice: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            dirty: false,
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    pub fn meta(&self) -> &MatchMeta {
        &self.meta
    }

    pub fn scores(&self) -> &LiveScores {
        &self.scores
    }

    pub fn publisher(&self) -> &BroadcastPublisher {
        &self.publisher
    }

    pub fn payload(&self) -> OverlayPayload {
        build_payload(&self.meta, &self.scores)
    }

    pub fn logs(&self) -> &VecDeque<String> {
        &self.logs
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn pending_reset(&self) -> Option<PendingReset> {
        self.pending_reset
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn toss_recorded(&self) -> bool {
        self.scores.toss_recorded()
    }

    /// Applies one operator action. Scoring is refused until the toss is in;
    /// resets only stage a confirmation. Rejected actions change nothing.
    pub fn apply(&mut self, action: ScoreAction) -> Result<Vec<ScoreEvent>, ScoringError> {
        if let ScoreAction::Reset(team) = action {
            self.request_reset(team);
            return Ok(Vec::new());
        }
        let gate = if matches!(action, ScoreAction::Toss { .. }) && self.scores.toss_recorded() {
            Some(ScoringError::TossAlreadyRecorded)
        } else if action.requires_toss() && !self.scores.toss_recorded() {
            Some(ScoringError::TossPending)
        } else {
            None
        };
        if let Some(err) = gate {
            self.push_log(format!("[WARN] Rejected: {err}"));
            return Err(err);
        }

        let snapshot = self.scores.clone();
        let summary = describe(&action);
        let events = match scoring::apply_action(&mut self.scores, action) {
            Ok(events) => events,
            Err(err) => {
                self.push_log(format!("[WARN] Rejected: {err}"));
                return Err(err);
            }
        };
        self.remember(snapshot);
        if let Some(summary) = summary {
            self.push_log(format!("[INFO] {summary}"));
        }
        self.publish(&events);
        Ok(events)
    }

    pub fn request_reset(&mut self, team: Option<TeamKey>) {
        self.pending_reset = Some(PendingReset { team });
        let what = team.map(|t| t.as_str()).unwrap_or("both innings");
        self.push_log(format!("[INFO] Reset of {what} requested; confirm to proceed"));
    }

    pub fn cancel_reset(&mut self) {
        if self.pending_reset.take().is_some() {
            self.push_log("[INFO] Reset cancelled");
        }
    }

    pub fn confirm_reset(&mut self) -> Result<(), ScoringError> {
        let Some(PendingReset { team }) = self.pending_reset.take() else {
            return Err(ScoringError::NoPendingReset);
        };
        let snapshot = self.scores.clone();
        scoring::reset_innings(&mut self.scores, team);
        if team.is_none() {
            // A full reset reopens the toss.
            self.scores.toss = None;
            self.scores.innings = 1;
            self.scores.is_chasing = false;
        }
        self.remember(snapshot);
        let what = team.map(|t| t.as_str()).unwrap_or("both innings");
        self.push_log(format!("[INFO] Reset {what}"));
        self.publish(&[]);
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            self.push_log("[INFO] Nothing to undo");
            return false;
        };
        self.scores = previous;
        self.dirty = true;
        self.push_log("[INFO] Undid last action");
        self.publish(&[]);
        true
    }

    /// Republishes the current payload without changing anything.
    pub fn publish_state(&self) -> usize {
        self.publisher.publish_payload(&self.payload())
    }

    /// Replaces the local scores with state from the server side (poll or
    /// push). The previous state stays reachable through undo.
    ///
    /// Server state carries neither the toss nor the match length. The
    /// session's own overs limit fills a missing one, and state that already
    /// shows play counts as past the toss.
    pub fn hydrate(&mut self, mut scores: LiveScores) {
        if scores.max_overs == 0 {
            scores.max_overs = self.scores.max_overs;
        }
        if scores.toss.is_none() && scores.shows_play() {
            scores.toss = Some(inferred_toss(&scores));
        }
        scores.refresh_run_rates();
        let snapshot = std::mem::replace(&mut self.scores, scores);
        self.remember(snapshot);
        self.dirty = false;
        self.push_log("[INFO] Scores re-hydrated from server state");
        self.publish(&[]);
    }

    /// Checkpoints the scores. A failure leaves local scoring untouched and
    /// is reported through the notice line.
    pub fn save(&mut self, store: &dyn ScoreStore) -> Result<()> {
        match store.save(&self.match_id, &self.scores) {
            Ok(()) => {
                self.dirty = false;
                self.notice = Some("Saved".to_string());
                self.push_log(format!("[INFO] Saved match {}", self.match_id));
                Ok(())
            }
            Err(err) => {
                self.notice = Some(format!("Save failed: {err:#}"));
                self.push_log(format!("[WARN] Save failed: {err:#}"));
                Err(err)
            }
        }
    }

    /// Loads the last checkpoint, if any. Returns whether state was replaced.
    pub fn restore(&mut self, source: &dyn MatchSource) -> Result<bool> {
        match source.load(&self.match_id) {
            Ok(Some(scores)) => {
                self.hydrate(scores);
                self.notice = Some("Restored saved scores".to_string());
                Ok(true)
            }
            Ok(None) => {
                self.notice = Some("No saved scores for this match".to_string());
                self.push_log(format!("[INFO] No checkpoint for match {}", self.match_id));
                Ok(false)
            }
            Err(err) => {
                self.notice = Some(format!("Load failed: {err:#}"));
                self.push_log(format!("[WARN] Load failed: {err:#}"));
                Err(err)
            }
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    fn remember(&mut self, snapshot: LiveScores) {
        self.history.push(snapshot);
        if self.history.len() > MAX_UNDO {
            let excess = self.history.len() - MAX_UNDO;
            self.history.drain(..excess);
        }
        self.dirty = true;
    }

    fn publish(&mut self, events: &[ScoreEvent]) {
        for event in events {
            self.publisher.publish_event(event);
            if event.kind == EventKind::Wicket {
                let how = event.message.as_deref().unwrap_or("OUT");
                self.push_log(format!("[INFO] Wicket: {how}"));
            }
        }
        self.publisher.publish_payload(&self.payload());
    }
}

/// Stands in for a toss that happened before this session saw the match:
/// whoever batted first is taken to have won it and chosen to bat.
fn inferred_toss(scores: &LiveScores) -> Toss {
    let batted_first = if scores.innings > 1 || scores.is_chasing {
        scores.batting_team.other()
    } else {
        scores.batting_team
    };
    Toss {
        winner: batted_first,
        choice: TossChoice::Bat,
    }
}

fn describe(action: &ScoreAction) -> Option<String> {
    match action {
        ScoreAction::Toss { winner, choice } => {
            let choice = match choice {
                TossChoice::Bat => "bat",
                TossChoice::Field => "field",
            };
            Some(format!("Toss: {winner} won, chose to {choice}"))
        }
        ScoreAction::SwitchBatting => Some("Innings switched".to_string()),
        ScoreAction::SetBowler(name) => Some(format!("Bowler: {name}")),
        ScoreAction::SetBatsmanName { slot, name } => Some(format!("Batsman {slot}: {name}")),
        ScoreAction::PushEvent { event_type, .. } => Some(format!("Pushed event {event_type}")),
        ScoreAction::Runs(_)
        | ScoreAction::Extra { .. }
        | ScoreAction::Wicket(_)
        | ScoreAction::Reset(_) => None,
    }
}
