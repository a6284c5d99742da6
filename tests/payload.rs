use crease_live::payload::{
    FALLBACK_BOWLER, FALLBACK_NON_STRIKER, FALLBACK_STRIKER, FALLBACK_TOURNAMENT, build_payload,
    short_name,
};
use crease_live::scoring::{add_runs, handle_toss, switch_batting};
use crease_live::state::{LiveScores, MatchMeta, TeamKey, TossChoice};

fn meta() -> MatchMeta {
    MatchMeta {
        tournament_name: "Premier Cup".to_string(),
        team1_name: "Royal Strikers".to_string(),
        team2_name: "Coastal Kings".to_string(),
        team1_color: Some("#1d4ed8".to_string()),
        team2_color: Some("  ".to_string()),
    }
}

#[test]
fn empty_slots_fall_back_to_placeholders() {
    let mut scores = LiveScores::default();
    scores.team1.batsmen.clear();
    scores.team1.bowler = None;

    let payload = build_payload(&MatchMeta::default(), &scores);

    assert_eq!(payload.tournament.name, FALLBACK_TOURNAMENT);
    assert_eq!(payload.team1.name, "Team 1");
    assert_eq!(payload.team2.name, "Team 2");
    assert_eq!(payload.team1.short_name, "T1");
    assert_eq!(payload.team2.short_name, "T2");
    assert_eq!(payload.striker.name, FALLBACK_STRIKER);
    assert_eq!(payload.non_striker.name, FALLBACK_NON_STRIKER);
    assert_eq!(payload.bowler.name, FALLBACK_BOWLER);
    assert_eq!(payload.team1.overs_display, "0.0");
    assert_eq!(payload.innings, 1);
    assert_eq!(payload.status, "Toss pending");
}

#[test]
fn serialized_payload_has_no_nulls() {
    let mut scores = LiveScores::default();
    scores.team2.batsmen.clear();
    scores.team2.bowler = None;
    scores.batting_team = TeamKey::Team2;

    let payload = build_payload(&MatchMeta::default(), &scores);
    let json = serde_json::to_value(&payload).expect("payload serializes");

    fn assert_no_null(value: &serde_json::Value, path: &str) {
        match value {
            serde_json::Value::Null => panic!("null at {path}"),
            serde_json::Value::Object(map) => {
                for (key, v) in map {
                    assert_no_null(v, &format!("{path}.{key}"));
                }
            }
            serde_json::Value::Array(items) => {
                for (idx, v) in items.iter().enumerate() {
                    assert_no_null(v, &format!("{path}[{idx}]"));
                }
            }
            _ => {}
        }
    }
    assert_no_null(&json, "payload");
    assert!(json["stats"].get("last5Overs").is_some());
    assert!(json.get("nonStriker").is_some());
}

#[test]
fn names_prefer_meta_then_innings() {
    let scores = LiveScores::new("Innings Name", "Other Side");
    let mut meta = meta();
    meta.team2_name = String::new();

    let payload = build_payload(&meta, &scores);
    assert_eq!(payload.team1.name, "Royal Strikers");
    assert_eq!(payload.team1.short_name, "ROY");
    assert_eq!(payload.team2.name, "Other Side");
    assert_eq!(payload.team2.short_name, "OTH");
    assert_eq!(payload.team1.color.as_deref(), Some("#1d4ed8"));
    assert_eq!(payload.team2.color, None, "blank colors are dropped");
}

#[test]
fn short_names_skip_punctuation() {
    assert_eq!(short_name("St. Kitts", TeamKey::Team1), "STK");
    assert_eq!(short_name("  ", TeamKey::Team2), "T2");
}

#[test]
fn striker_and_non_striker_follow_the_flags() {
    let mut scores = LiveScores::new("A", "B");
    handle_toss(&mut scores, TeamKey::Team1, TossChoice::Bat);
    scores.team1.batsmen[0].name = "Left".to_string();
    scores.team1.batsmen[1].name = "Right".to_string();
    scores.team1.batsmen[0].is_striker = false;
    scores.team1.batsmen[1].is_striker = true;

    let payload = build_payload(&meta(), &scores);
    assert_eq!(payload.striker.name, "Right");
    assert_eq!(payload.non_striker.name, "Left");
}

#[test]
fn chase_status_and_need() {
    let mut scores = LiveScores::new("A", "B").with_max_overs(20);
    handle_toss(&mut scores, TeamKey::Team1, TossChoice::Bat);
    let first = build_payload(&meta(), &scores);
    assert_eq!(first.status, "Royal Strikers batting");
    assert_eq!(first.stats.need, None);

    add_runs(&mut scores, 6).expect("six");
    switch_batting(&mut scores);
    add_runs(&mut scores, 4).expect("four");

    let chase = build_payload(&meta(), &scores);
    assert_eq!(chase.batting_team, TeamKey::Team2);
    assert_eq!(chase.innings, 2);
    assert_eq!(chase.stats.target, 7);
    assert_eq!(chase.stats.need, Some(3));
    assert_eq!(chase.status, "COA need 3 runs from 119 balls");

    add_runs(&mut scores, 4).expect("four");
    let done = build_payload(&meta(), &scores);
    assert_eq!(done.stats.need, Some(0));
    assert_eq!(done.status, "Target reached");
}

#[test]
fn non_finite_rates_are_zeroed() {
    let mut scores = LiveScores::new("A", "B");
    scores.current_run_rate = f64::NAN;
    scores.required_run_rate = f64::INFINITY;

    let payload = build_payload(&meta(), &scores);
    assert_eq!(payload.stats.current_run_rate, 0.0);
    assert_eq!(payload.stats.required_run_rate, 0.0);
}
