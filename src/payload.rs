use serde::{Deserialize, Serialize};

use crate::state::{Batsman, Bowler, LiveScores, MatchMeta, TeamInnings, TeamKey, round2};

pub const FALLBACK_TOURNAMENT: &str = "Tournament";
pub const FALLBACK_STRIKER: &str = "Striker";
pub const FALLBACK_NON_STRIKER: &str = "Non-Striker";
pub const FALLBACK_BOWLER: &str = "Bowler";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayPayload {
    pub tournament: TournamentLine,
    pub team1: TeamLine,
    pub team2: TeamLine,
    pub striker: BatterLine,
    pub non_striker: BatterLine,
    pub bowler: BowlerLine,
    pub stats: StatsLine,
    pub batting_team: TeamKey,
    pub innings: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentLine {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamLine {
    pub name: String,
    pub short_name: String,
    pub score: u32,
    pub wickets: u32,
    pub overs: u32,
    pub balls: u32,
    pub overs_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatterLine {
    pub name: String,
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BowlerLine {
    pub name: String,
    pub overs: u32,
    pub maidens: u32,
    pub runs: u32,
    pub wickets: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsLine {
    pub current_run_rate: f64,
    pub required_run_rate: f64,
    pub target: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub need: Option<u32>,
    #[serde(rename = "last5Overs")]
    pub last_five_overs: String,
}

/// Projects the live scores onto the overlay wire shape. Every display field
/// gets a value; missing names and empty slots fall back to placeholders.
pub fn build_payload(meta: &MatchMeta, scores: &LiveScores) -> OverlayPayload {
    let batting = scores.batting();
    let batting_key = scores.batting_team;

    let striker = batting.striker().or_else(|| batting.batsmen.first());
    let non_striker = match batting.striker_index() {
        Some(_) => batting.non_striker(),
        None => batting.batsmen.get(1),
    };

    let need = (scores.target > 0).then(|| scores.target.saturating_sub(batting.score));

    OverlayPayload {
        tournament: TournamentLine {
            name: non_empty_or(&meta.tournament_name, FALLBACK_TOURNAMENT),
        },
        team1: team_line(meta, scores, TeamKey::Team1),
        team2: team_line(meta, scores, TeamKey::Team2),
        striker: batter_line(striker, FALLBACK_STRIKER),
        non_striker: batter_line(non_striker, FALLBACK_NON_STRIKER),
        bowler: bowler_line(batting.bowler.as_ref()),
        stats: StatsLine {
            current_run_rate: finite_or_zero(scores.current_run_rate),
            required_run_rate: finite_or_zero(scores.required_run_rate),
            target: scores.target,
            need,
            last_five_overs: scores.last_five_overs.clone(),
        },
        batting_team: batting_key,
        innings: scores.innings.max(1),
        status: status_line(meta, scores, need),
    }
}

pub fn team_display_name(meta: &MatchMeta, innings: &TeamInnings, key: TeamKey) -> String {
    let from_meta = meta.team_name(key).trim();
    if !from_meta.is_empty() {
        return from_meta.to_string();
    }
    let from_innings = innings.name.trim();
    if !from_innings.is_empty() {
        return from_innings.to_string();
    }
    match key {
        TeamKey::Team1 => "Team 1".to_string(),
        TeamKey::Team2 => "Team 2".to_string(),
    }
}

/// Three-letter uppercase code from the configured name, `T1`/`T2` when unset.
pub fn short_name(name: &str, key: TeamKey) -> String {
    let abbr = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    if abbr.is_empty() {
        match key {
            TeamKey::Team1 => "T1".to_string(),
            TeamKey::Team2 => "T2".to_string(),
        }
    } else {
        abbr
    }
}

fn team_line(meta: &MatchMeta, scores: &LiveScores, key: TeamKey) -> TeamLine {
    let innings = scores.team(key);
    let configured = {
        let m = meta.team_name(key).trim();
        if m.is_empty() { innings.name.trim() } else { m }
    };
    TeamLine {
        name: team_display_name(meta, innings, key),
        short_name: short_name(configured, key),
        score: innings.score,
        wickets: innings.wickets,
        overs: innings.overs,
        balls: innings.balls,
        overs_display: innings.overs_display(),
        color: meta.team_color(key).map(str::to_string),
    }
}

fn batter_line(batsman: Option<&Batsman>, fallback: &str) -> BatterLine {
    match batsman {
        Some(b) => BatterLine {
            name: non_empty_or(&b.name, fallback),
            runs: b.runs,
            balls: b.balls,
            fours: b.fours,
            sixes: b.sixes,
        },
        None => BatterLine {
            name: fallback.to_string(),
            ..BatterLine::default()
        },
    }
}

fn bowler_line(bowler: Option<&Bowler>) -> BowlerLine {
    match bowler {
        Some(b) => BowlerLine {
            name: non_empty_or(&b.name, FALLBACK_BOWLER),
            overs: b.overs,
            maidens: b.maidens,
            runs: b.runs,
            wickets: b.wickets,
        },
        None => BowlerLine {
            name: FALLBACK_BOWLER.to_string(),
            ..BowlerLine::default()
        },
    }
}

fn status_line(meta: &MatchMeta, scores: &LiveScores, need: Option<u32>) -> String {
    if !scores.toss_recorded() {
        return "Toss pending".to_string();
    }
    let key = scores.batting_team;
    let batting = scores.batting();
    let name = team_display_name(meta, batting, key);
    match need {
        Some(0) if scores.is_chasing => "Target reached".to_string(),
        Some(runs) if scores.is_chasing => {
            let short = short_name(&name, key);
            let remaining = (scores.max_overs * crate::state::BALLS_PER_OVER)
                .saturating_sub(batting.legal_balls());
            if scores.max_overs > 0 && remaining > 0 {
                format!("{short} need {runs} runs from {remaining} balls")
            } else {
                format!("{short} need {runs} runs")
            }
        }
        _ => format!("{name} batting"),
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { round2(value.max(0.0)) } else { 0.0 }
}
