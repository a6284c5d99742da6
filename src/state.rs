use std::fmt;

use serde::{Deserialize, Serialize};

pub const BALLS_PER_OVER: u32 = 6;
pub const MAX_WICKETS: u32 = 10;
/// Legal deliveries covered by the `lastFiveOvers` ledger.
pub const RECENT_LEGAL_BALLS: u32 = 5 * BALLS_PER_OVER;

pub const PLACEHOLDER_OPENER_1: &str = "Batsman 1";
pub const PLACEHOLDER_OPENER_2: &str = "Batsman 2";
pub const PLACEHOLDER_NEW_BATSMAN: &str = "New Batsman";
pub const PLACEHOLDER_BOWLER: &str = "Bowler";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamKey {
    #[default]
    Team1,
    Team2,
}

impl TeamKey {
    pub fn other(self) -> Self {
        match self {
            TeamKey::Team1 => TeamKey::Team2,
            TeamKey::Team2 => TeamKey::Team1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TeamKey::Team1 => "team1",
            TeamKey::Team2 => "team2",
        }
    }
}

impl fmt::Display for TeamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TossChoice {
    Bat,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toss {
    pub winner: TeamKey,
    pub choice: TossChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Batsman {
    pub name: String,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub is_striker: bool,
}

impl Batsman {
    pub fn fresh(name: &str, is_striker: bool) -> Self {
        Self {
            name: name.to_string(),
            runs: 0,
            balls: 0,
            fours: 0,
            sixes: 0,
            is_striker,
        }
    }

    pub fn strike_rate(&self) -> f64 {
        if self.balls == 0 {
            return 0.0;
        }
        round2(self.runs as f64 * 100.0 / self.balls as f64)
    }
}

impl Default for Batsman {
    fn default() -> Self {
        Self::fresh("", false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bowler {
    pub name: String,
    pub overs: u32,
    pub maidens: u32,
    pub runs: u32,
    pub wickets: u32,
    /// Came on partway through the current over; no maiden for it.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub joined_mid_over: bool,
}

impl Bowler {
    pub fn fresh(name: &str) -> Self {
        Self {
            name: name.to_string(),
            overs: 0,
            maidens: 0,
            runs: 0,
            wickets: 0,
            joined_mid_over: false,
        }
    }
}

impl Default for Bowler {
    fn default() -> Self {
        Self::fresh("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamInnings {
    pub name: String,
    pub score: u32,
    pub wickets: u32,
    pub overs: u32,
    pub balls: u32,
    // Externally supplied state may arrive with empty slots; the engine
    // restores two batsmen and a bowler before it mutates anything.
    pub batsmen: Vec<Batsman>,
    pub bowler: Option<Bowler>,
    pub over_runs: u32,
}

impl Default for TeamInnings {
    fn default() -> Self {
        Self::new("")
    }
}

impl TeamInnings {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            score: 0,
            wickets: 0,
            overs: 0,
            balls: 0,
            batsmen: opening_pair(),
            bowler: Some(Bowler::fresh(PLACEHOLDER_BOWLER)),
            over_runs: 0,
        }
    }

    pub fn legal_balls(&self) -> u32 {
        self.overs * BALLS_PER_OVER + self.balls
    }

    pub fn overs_display(&self) -> String {
        format!("{}.{}", self.overs, self.balls)
    }

    pub fn striker_index(&self) -> Option<usize> {
        self.batsmen.iter().position(|b| b.is_striker)
    }

    pub fn striker(&self) -> Option<&Batsman> {
        self.striker_index().and_then(|idx| self.batsmen.get(idx))
    }

    pub fn non_striker(&self) -> Option<&Batsman> {
        match self.striker_index() {
            Some(idx) => self
                .batsmen
                .iter()
                .enumerate()
                .find(|(i, _)| *i != idx)
                .map(|(_, b)| b),
            None => self.batsmen.get(1),
        }
    }

    /// Pads the crease back to two batsmen and a bowler and makes sure exactly
    /// one of them is on strike (slot 0 when the flags disagree).
    pub fn normalize_crease(&mut self) {
        self.batsmen.truncate(2);
        while self.batsmen.len() < 2 {
            let name = if self.batsmen.is_empty() {
                PLACEHOLDER_OPENER_1
            } else {
                PLACEHOLDER_OPENER_2
            };
            self.batsmen.push(Batsman::fresh(name, false));
        }
        let strikers = self.batsmen.iter().filter(|b| b.is_striker).count();
        if strikers != 1 {
            self.batsmen[0].is_striker = true;
            self.batsmen[1].is_striker = false;
        }
        if self.bowler.is_none() {
            let mut bowler = Bowler::fresh(PLACEHOLDER_BOWLER);
            bowler.overs = self.overs;
            self.bowler = Some(bowler);
        }
        self.balls = self.balls.min(BALLS_PER_OVER - 1);
        self.wickets = self.wickets.min(MAX_WICKETS);
    }

    pub fn reset(&mut self) {
        let name = std::mem::take(&mut self.name);
        *self = Self::new(&name);
    }
}

pub fn opening_pair() -> Vec<Batsman> {
    vec![
        Batsman::fresh(PLACEHOLDER_OPENER_1, true),
        Batsman::fresh(PLACEHOLDER_OPENER_2, false),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallMark {
    pub runs: u32,
    pub kind: BallMarkKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BallMarkKind {
    Runs,
    Wide,
    NoBall,
    Bye,
    LegBye,
    Wicket { legal: bool },
}

impl BallMark {
    pub fn is_legal(&self) -> bool {
        match self.kind {
            BallMarkKind::Wide | BallMarkKind::NoBall => false,
            BallMarkKind::Wicket { legal } => legal,
            _ => true,
        }
    }

    pub fn label(&self) -> String {
        match self.kind {
            BallMarkKind::Runs => self.runs.to_string(),
            BallMarkKind::Wide => format!("{}wd", self.runs),
            BallMarkKind::NoBall => format!("{}nb", self.runs),
            BallMarkKind::Bye => format!("{}b", self.runs),
            BallMarkKind::LegBye => format!("{}lb", self.runs),
            BallMarkKind::Wicket { .. } => "W".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveScores {
    pub team1: TeamInnings,
    pub team2: TeamInnings,
    pub batting_team: TeamKey,
    pub current_run_rate: f64,
    pub required_run_rate: f64,
    pub target: u32,
    pub last_five_overs: String,
    pub innings: u32,
    pub is_chasing: bool,
    pub toss: Option<Toss>,
    pub max_overs: u32,
    pub recent_balls: Vec<BallMark>,
}

impl Default for LiveScores {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl LiveScores {
    pub fn new(team1: &str, team2: &str) -> Self {
        Self {
            team1: TeamInnings::new(team1),
            team2: TeamInnings::new(team2),
            batting_team: TeamKey::Team1,
            current_run_rate: 0.0,
            required_run_rate: 0.0,
            target: 0,
            last_five_overs: String::new(),
            innings: 1,
            is_chasing: false,
            toss: None,
            max_overs: 0,
            recent_balls: Vec::new(),
        }
    }

    pub fn with_max_overs(mut self, max_overs: u32) -> Self {
        self.max_overs = max_overs;
        self
    }

    pub fn team(&self, key: TeamKey) -> &TeamInnings {
        match key {
            TeamKey::Team1 => &self.team1,
            TeamKey::Team2 => &self.team2,
        }
    }

    pub fn team_mut(&mut self, key: TeamKey) -> &mut TeamInnings {
        match key {
            TeamKey::Team1 => &mut self.team1,
            TeamKey::Team2 => &mut self.team2,
        }
    }

    pub fn batting(&self) -> &TeamInnings {
        self.team(self.batting_team)
    }

    pub fn batting_mut(&mut self) -> &mut TeamInnings {
        self.team_mut(self.batting_team)
    }

    pub fn toss_recorded(&self) -> bool {
        self.toss.is_some()
    }

    /// True once anything has happened on the field.
    pub fn shows_play(&self) -> bool {
        self.innings > 1
            || self.is_chasing
            || [&self.team1, &self.team2]
                .iter()
                .any(|t| t.legal_balls() > 0 || t.score > 0 || t.wickets > 0)
    }

    pub fn refresh_run_rates(&mut self) {
        let (score, legal) = {
            let batting = self.batting();
            (batting.score, batting.legal_balls())
        };
        self.current_run_rate = run_rate(score, legal);

        self.required_run_rate = 0.0;
        if self.is_chasing && self.target > 0 && self.max_overs > 0 {
            let need = self.target.saturating_sub(score);
            let remaining = (self.max_overs * BALLS_PER_OVER).saturating_sub(legal);
            if need > 0 && remaining > 0 {
                self.required_run_rate = run_rate(need, remaining);
            }
        }
    }

    pub fn record_ball(&mut self, mark: BallMark) {
        self.recent_balls.push(mark);

        // Keep only the marks needed to cover the trailing window of legal balls.
        let mut legal = 0;
        let mut keep_from = 0;
        for (idx, mark) in self.recent_balls.iter().enumerate().rev() {
            if mark.is_legal() {
                legal += 1;
                if legal > RECENT_LEGAL_BALLS {
                    keep_from = idx + 1;
                    break;
                }
            }
        }
        if keep_from > 0 {
            self.recent_balls.drain(..keep_from);
        }
        self.refresh_last_five();
    }

    pub fn clear_recent_balls(&mut self) {
        self.recent_balls.clear();
        self.last_five_overs.clear();
    }

    fn refresh_last_five(&mut self) {
        self.last_five_overs = self
            .recent_balls
            .iter()
            .map(BallMark::label)
            .collect::<Vec<_>>()
            .join(" ");
    }
}

/// Runs per six-ball over, rounded for display. Zero before the first legal ball.
pub fn run_rate(runs: u32, legal_balls: u32) -> f64 {
    if legal_balls == 0 {
        return 0.0;
    }
    round2(runs as f64 / (legal_balls as f64 / BALLS_PER_OVER as f64))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Read-only match metadata supplied by the tournament side of the product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchMeta {
    pub tournament_name: String,
    pub team1_name: String,
    pub team2_name: String,
    pub team1_color: Option<String>,
    pub team2_color: Option<String>,
}

impl MatchMeta {
    pub fn team_name(&self, key: TeamKey) -> &str {
        match key {
            TeamKey::Team1 => &self.team1_name,
            TeamKey::Team2 => &self.team2_name,
        }
    }

    pub fn team_color(&self, key: TeamKey) -> Option<&str> {
        match key {
            TeamKey::Team1 => self.team1_color.as_deref(),
            TeamKey::Team2 => self.team2_color.as_deref(),
        }
        .filter(|c| !c.trim().is_empty())
    }
}
