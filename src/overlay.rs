//! Passive overlay rendering.
//!
//! A rendering surface is anything implementing [`OverlayDocument`]: a set of
//! text elements addressed by id plus one notification banner. Which element
//! shows which payload field is decided by a declarative [`FieldMap`], one per
//! visual template, resolved once when the renderer is created.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::broadcast::Subscription;
use crate::feed::FeedUpdate;
use crate::payload::{OverlayPayload, build_payload};
use crate::persist::MatchSource;
use crate::state::MatchMeta;
use crate::wire::{ChannelMessage, ScoreEvent, decode_message};

pub const DEFAULT_NOTIFICATION_SECS: u64 = 3;
const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OverlayField {
    #[serde(rename = "tournament.name")]
    TournamentName,
    #[serde(rename = "team1.name")]
    Team1Name,
    #[serde(rename = "team1.shortName")]
    Team1ShortName,
    #[serde(rename = "team1.score")]
    Team1Score,
    #[serde(rename = "team1.wickets")]
    Team1Wickets,
    #[serde(rename = "team1.overs")]
    Team1Overs,
    #[serde(rename = "team1.oversDisplay")]
    Team1OversDisplay,
    #[serde(rename = "team2.name")]
    Team2Name,
    #[serde(rename = "team2.shortName")]
    Team2ShortName,
    #[serde(rename = "team2.score")]
    Team2Score,
    #[serde(rename = "team2.wickets")]
    Team2Wickets,
    #[serde(rename = "team2.overs")]
    Team2Overs,
    #[serde(rename = "team2.oversDisplay")]
    Team2OversDisplay,
    #[serde(rename = "striker.name")]
    StrikerName,
    #[serde(rename = "striker.runs")]
    StrikerRuns,
    #[serde(rename = "striker.balls")]
    StrikerBalls,
    #[serde(rename = "striker.fours")]
    StrikerFours,
    #[serde(rename = "striker.sixes")]
    StrikerSixes,
    #[serde(rename = "nonStriker.name")]
    NonStrikerName,
    #[serde(rename = "nonStriker.runs")]
    NonStrikerRuns,
    #[serde(rename = "nonStriker.balls")]
    NonStrikerBalls,
    #[serde(rename = "nonStriker.fours")]
    NonStrikerFours,
    #[serde(rename = "nonStriker.sixes")]
    NonStrikerSixes,
    #[serde(rename = "bowler.name")]
    BowlerName,
    #[serde(rename = "bowler.overs")]
    BowlerOvers,
    #[serde(rename = "bowler.maidens")]
    BowlerMaidens,
    #[serde(rename = "bowler.runs")]
    BowlerRuns,
    #[serde(rename = "bowler.wickets")]
    BowlerWickets,
    #[serde(rename = "stats.currentRunRate")]
    CurrentRunRate,
    #[serde(rename = "stats.requiredRunRate")]
    RequiredRunRate,
    #[serde(rename = "stats.target")]
    Target,
    #[serde(rename = "stats.need")]
    Need,
    #[serde(rename = "stats.last5Overs")]
    LastFiveOvers,
    #[serde(rename = "battingTeam")]
    BattingTeam,
    #[serde(rename = "innings")]
    Innings,
    #[serde(rename = "status")]
    Status,
}

impl OverlayField {
    /// Reads the field's display text from a payload.
    pub fn read(self, p: &OverlayPayload) -> String {
        match self {
            OverlayField::TournamentName => p.tournament.name.clone(),
            OverlayField::Team1Name => p.team1.name.clone(),
            OverlayField::Team1ShortName => p.team1.short_name.clone(),
            OverlayField::Team1Score => p.team1.score.to_string(),
            OverlayField::Team1Wickets => p.team1.wickets.to_string(),
            OverlayField::Team1Overs => p.team1.overs.to_string(),
            OverlayField::Team1OversDisplay => overs_text(&p.team1.overs_display, p.team1.overs),
            OverlayField::Team2Name => p.team2.name.clone(),
            OverlayField::Team2ShortName => p.team2.short_name.clone(),
            OverlayField::Team2Score => p.team2.score.to_string(),
            OverlayField::Team2Wickets => p.team2.wickets.to_string(),
            OverlayField::Team2Overs => p.team2.overs.to_string(),
            OverlayField::Team2OversDisplay => overs_text(&p.team2.overs_display, p.team2.overs),
            OverlayField::StrikerName => p.striker.name.clone(),
            OverlayField::StrikerRuns => p.striker.runs.to_string(),
            OverlayField::StrikerBalls => p.striker.balls.to_string(),
            OverlayField::StrikerFours => p.striker.fours.to_string(),
            OverlayField::StrikerSixes => p.striker.sixes.to_string(),
            OverlayField::NonStrikerName => p.non_striker.name.clone(),
            OverlayField::NonStrikerRuns => p.non_striker.runs.to_string(),
            OverlayField::NonStrikerBalls => p.non_striker.balls.to_string(),
            OverlayField::NonStrikerFours => p.non_striker.fours.to_string(),
            OverlayField::NonStrikerSixes => p.non_striker.sixes.to_string(),
            OverlayField::BowlerName => p.bowler.name.clone(),
            OverlayField::BowlerOvers => p.bowler.overs.to_string(),
            OverlayField::BowlerMaidens => p.bowler.maidens.to_string(),
            OverlayField::BowlerRuns => p.bowler.runs.to_string(),
            OverlayField::BowlerWickets => p.bowler.wickets.to_string(),
            OverlayField::CurrentRunRate => format!("{:.2}", p.stats.current_run_rate),
            OverlayField::RequiredRunRate => format!("{:.2}", p.stats.required_run_rate),
            OverlayField::Target => p.stats.target.to_string(),
            OverlayField::Need => p.stats.need.unwrap_or(0).to_string(),
            OverlayField::LastFiveOvers => p.stats.last_five_overs.clone(),
            OverlayField::BattingTeam => p.batting_team.to_string(),
            OverlayField::Innings => p.innings.to_string(),
            OverlayField::Status => p.status.clone(),
        }
    }
}

fn overs_text(display: &str, overs: u32) -> String {
    if display.trim().is_empty() {
        format!("{overs}.0")
    } else {
        display.to_string()
    }
}

/// Declarative `{logical field -> element id}` table for one visual template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    pub name: String,
    pub fields: BTreeMap<OverlayField, String>,
}

impl FieldMap {
    pub fn new(name: &str, pairs: &[(OverlayField, &str)]) -> Self {
        Self {
            name: name.to_string(),
            fields: pairs
                .iter()
                .map(|(field, id)| (*field, (*id).to_string()))
                .collect(),
        }
    }

    pub fn element_ids(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(String::as_str)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read overlay template {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse overlay template {}", path.display()))
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "classic" => Some(Self::classic()),
            "compact" => Some(Self::compact()),
            "ticker" => Some(Self::ticker()),
            _ => None,
        }
    }

    pub fn builtin_names() -> &'static [&'static str] {
        &["classic", "compact", "ticker"]
    }

    /// Full scorebug: both teams, both batsmen, bowler figures and rates.
    pub fn classic() -> Self {
        use OverlayField::*;
        Self::new(
            "classic",
            &[
                (TournamentName, "tournament-name"),
                (Team1Name, "team1-name"),
                (Team1ShortName, "team1-short"),
                (Team1Score, "team1-score"),
                (Team1Wickets, "team1-wickets"),
                (Team1OversDisplay, "team1-overs"),
                (Team2Name, "team2-name"),
                (Team2ShortName, "team2-short"),
                (Team2Score, "team2-score"),
                (Team2Wickets, "team2-wickets"),
                (Team2OversDisplay, "team2-overs"),
                (StrikerName, "striker-name"),
                (StrikerRuns, "striker-runs"),
                (StrikerBalls, "striker-balls"),
                (StrikerFours, "striker-fours"),
                (StrikerSixes, "striker-sixes"),
                (NonStrikerName, "non-striker-name"),
                (NonStrikerRuns, "non-striker-runs"),
                (NonStrikerBalls, "non-striker-balls"),
                (BowlerName, "bowler-name"),
                (BowlerOvers, "bowler-overs"),
                (BowlerMaidens, "bowler-maidens"),
                (BowlerRuns, "bowler-runs"),
                (BowlerWickets, "bowler-wickets"),
                (CurrentRunRate, "crr"),
                (RequiredRunRate, "rrr"),
                (Target, "target"),
                (Need, "need"),
                (LastFiveOvers, "last-five"),
                (Status, "status"),
            ],
        )
    }

    pub fn compact() -> Self {
        use OverlayField::*;
        Self::new(
            "compact",
            &[
                (Team1ShortName, "t1"),
                (Team1Score, "t1-runs"),
                (Team1Wickets, "t1-wkts"),
                (Team1OversDisplay, "t1-ov"),
                (Team2ShortName, "t2"),
                (Team2Score, "t2-runs"),
                (Team2Wickets, "t2-wkts"),
                (Team2OversDisplay, "t2-ov"),
                (StrikerName, "bat1"),
                (StrikerRuns, "bat1-r"),
                (StrikerBalls, "bat1-b"),
                (NonStrikerName, "bat2"),
                (NonStrikerRuns, "bat2-r"),
                (NonStrikerBalls, "bat2-b"),
                (BowlerName, "bowl"),
                (BowlerWickets, "bowl-w"),
                (BowlerRuns, "bowl-r"),
                (CurrentRunRate, "crr"),
            ],
        )
    }

    pub fn ticker() -> Self {
        use OverlayField::*;
        Self::new(
            "ticker",
            &[
                (TournamentName, "ticker-title"),
                (BattingTeam, "ticker-batting"),
                (Innings, "ticker-innings"),
                (LastFiveOvers, "ticker-recent"),
                (Status, "ticker-status"),
            ],
        )
    }
}

/// The surface an overlay renders into.
pub trait OverlayDocument {
    fn has_element(&self, id: &str) -> bool;
    fn set_text(&mut self, id: &str, text: &str);
    /// Retriggers the element's highlight animation.
    fn pulse(&mut self, id: &str);
    fn show_notification(&mut self, text: Option<&str>);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementState {
    pub text: String,
    pub pulses: u32,
}

/// Headless document: a fixed set of element ids holding text.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    elements: HashMap<String, ElementState>,
    notification: Option<String>,
    notifications_shown: u32,
}

impl MemoryDocument {
    pub fn with_elements<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            elements: ids
                .into_iter()
                .map(|id| (id.to_string(), ElementState::default()))
                .collect(),
            notification: None,
            notifications_shown: 0,
        }
    }

    pub fn for_template(map: &FieldMap) -> Self {
        Self::with_elements(map.element_ids())
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.elements.get(id).map(|e| e.text.as_str())
    }

    pub fn pulses(&self, id: &str) -> u32 {
        self.elements.get(id).map(|e| e.pulses).unwrap_or(0)
    }

    pub fn element(&self, id: &str) -> Option<&ElementState> {
        self.elements.get(id)
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn notifications_shown(&self) -> u32 {
        self.notifications_shown
    }
}

impl OverlayDocument for MemoryDocument {
    fn has_element(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    fn set_text(&mut self, id: &str, text: &str) {
        if let Some(el) = self.elements.get_mut(id) {
            el.text.clear();
            el.text.push_str(text);
        }
    }

    fn pulse(&mut self, id: &str) {
        if let Some(el) = self.elements.get_mut(id) {
            el.pulses += 1;
        }
    }

    fn show_notification(&mut self, text: Option<&str>) {
        if text.is_some() {
            self.notifications_shown += 1;
        }
        self.notification = text.map(str::to_string);
    }
}

#[derive(Debug, Clone)]
struct ActiveNotification {
    text: String,
    shown_at: Instant,
}

pub struct OverlayRenderer<D: OverlayDocument> {
    document: D,
    template: String,
    bindings: Vec<(OverlayField, String)>,
    rendered: HashMap<OverlayField, String>,
    notification: Option<ActiveNotification>,
    notification_ttl: Duration,
    last_payload: Option<OverlayPayload>,
    logs: VecDeque<String>,
}

impl<D: OverlayDocument> OverlayRenderer<D> {
    /// Binds the template against the document once. Fields whose element the
    /// document lacks are dropped here and never looked up again.
    pub fn new(document: D, map: &FieldMap) -> Self {
        let bindings = map
            .fields
            .iter()
            .filter(|(_, id)| document.has_element(id))
            .map(|(field, id)| (*field, id.clone()))
            .collect();
        Self {
            document,
            template: map.name.clone(),
            bindings,
            rendered: HashMap::new(),
            notification: None,
            notification_ttl: Duration::from_secs(DEFAULT_NOTIFICATION_SECS),
            last_payload: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
        }
    }

    pub fn with_notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn bound_fields(&self) -> Vec<OverlayField> {
        self.bindings.iter().map(|(field, _)| *field).collect()
    }

    pub fn last_payload(&self) -> Option<&OverlayPayload> {
        self.last_payload.as_ref()
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_ref().map(|n| n.text.as_str())
    }

    pub fn logs(&self) -> &VecDeque<String> {
        &self.logs
    }

    /// Writes every bound field whose text changed and pulses it. Returns the
    /// number of elements touched; re-applying the same payload touches none.
    pub fn apply_payload(&mut self, payload: &OverlayPayload) -> usize {
        let mut changed = 0;
        for (field, id) in &self.bindings {
            let text = field.read(payload);
            if self.rendered.get(field) == Some(&text) {
                continue;
            }
            self.document.set_text(id, &text);
            self.document.pulse(id);
            self.rendered.insert(*field, text);
            changed += 1;
        }
        self.last_payload = Some(payload.clone());
        changed
    }

    /// Shows the event's banner, replacing any banner still on screen.
    /// Returns whether the event produced a banner.
    pub fn handle_event(&mut self, event: &ScoreEvent, now: Instant) -> bool {
        let Some(text) = event.banner() else {
            return false;
        };
        self.document.show_notification(Some(&text));
        self.notification = Some(ActiveNotification {
            text,
            shown_at: now,
        });
        true
    }

    /// Clears the banner once it has been up for the notification window.
    pub fn tick(&mut self, now: Instant) {
        let Some(active) = self.notification.as_ref() else {
            return;
        };
        if now.saturating_duration_since(active.shown_at) >= self.notification_ttl {
            self.notification = None;
            self.document.show_notification(None);
        }
    }

    pub fn handle_raw(&mut self, raw: &str, now: Instant) -> bool {
        match decode_message(raw) {
            Some(ChannelMessage::State { payload }) => {
                self.apply_payload(&payload);
                true
            }
            Some(ChannelMessage::Event { event }) => {
                self.handle_event(&event, now);
                true
            }
            None => {
                self.push_log("[WARN] Ignored unrecognized broadcast message");
                false
            }
        }
    }

    /// Applies everything queued on the subscription, oldest first.
    pub fn drain(&mut self, subscription: &mut Subscription, now: Instant) -> usize {
        let mut handled = 0;
        while let Some(raw) = subscription.try_recv() {
            if self.handle_raw(&raw, now) {
                handled += 1;
            }
        }
        self.tick(now);
        handled
    }

    /// Best-effort first paint from stored state. Failures are logged and the
    /// overlay keeps waiting for broadcasts.
    pub fn load_initial(
        &mut self,
        source: &dyn MatchSource,
        meta: &MatchMeta,
        match_id: &str,
    ) -> bool {
        match source.load(match_id) {
            Ok(Some(scores)) => {
                self.apply_payload(&build_payload(meta, &scores));
                self.push_log(format!("[INFO] Initial state loaded for match {match_id}"));
                true
            }
            Ok(None) => {
                self.push_log(format!("[INFO] No stored state for match {match_id}"));
                false
            }
            Err(err) => {
                self.push_log(format!("[WARN] Initial fetch failed: {err:#}"));
                false
            }
        }
    }

    /// Consumes updates from the server-push source through the same contract.
    pub fn apply_feed_update(&mut self, meta: &MatchMeta, update: FeedUpdate, now: Instant) {
        match update {
            FeedUpdate::ScoreUpdate { scores, .. } => {
                self.apply_payload(&build_payload(meta, &scores));
            }
            FeedUpdate::MatchEvent(event) => {
                self.handle_event(&event, now);
            }
            FeedUpdate::Log(line) => self.push_log(line),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}
