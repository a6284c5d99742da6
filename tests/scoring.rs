use crease_live::scoring::{
    OutType, ScoreAction, ScoringError, add_extra, add_runs, apply_action, handle_toss,
    process_wicket, reset_innings, set_batsman_name, set_bowler, switch_batting,
};
use crease_live::state::{LiveScores, PLACEHOLDER_NEW_BATSMAN, TeamKey, TossChoice};
use crease_live::wire::{EventKind, ExtraType};

fn fresh_match() -> LiveScores {
    let mut scores = LiveScores::new("Mumbai", "Chennai").with_max_overs(20);
    handle_toss(&mut scores, TeamKey::Team1, TossChoice::Bat);
    scores
}

fn named_openers(scores: &mut LiveScores) {
    set_batsman_name(scores, 0, "Opener A").expect("slot 0");
    set_batsman_name(scores, 1, "Opener B").expect("slot 1");
}

#[test]
fn six_legal_balls_roll_the_over() {
    let mut scores = fresh_match();
    for _ in 0..6 {
        add_runs(&mut scores, 0).expect("dot ball");
    }
    assert_eq!(scores.team1.overs, 1);
    assert_eq!(scores.team1.balls, 0);
    assert_eq!(scores.team1.overs_display(), "1.0");

    add_runs(&mut scores, 2).expect("two");
    assert_eq!(scores.team1.overs, 1);
    assert_eq!(scores.team1.balls, 1);
}

#[test]
fn balls_never_leave_zero_to_five() {
    let mut scores = fresh_match();
    for i in 0..40 {
        let action = match i % 4 {
            0 => ScoreAction::Runs(1),
            1 => ScoreAction::Extra {
                kind: ExtraType::Bye,
                runs_run: 1,
            },
            2 => ScoreAction::Extra {
                kind: ExtraType::Wide,
                runs_run: 0,
            },
            _ => ScoreAction::Runs(3),
        };
        apply_action(&mut scores, action).expect("valid action");
        assert!(scores.team1.balls <= 5);
    }
}

#[test]
fn odd_runs_swap_strike_and_even_runs_do_not() {
    let mut scores = fresh_match();
    named_openers(&mut scores);

    add_runs(&mut scores, 2).expect("two");
    assert_eq!(scores.team1.striker().map(|b| b.name.as_str()), Some("Opener A"));

    add_runs(&mut scores, 1).expect("single");
    assert_eq!(scores.team1.striker().map(|b| b.name.as_str()), Some("Opener B"));
    assert_eq!(scores.team1.non_striker().map(|b| b.name.as_str()), Some("Opener A"));
    assert!(scores.team1.batsmen[0].is_striker, "striker sits in slot 0");

    add_runs(&mut scores, 3).expect("three");
    assert_eq!(scores.team1.striker().map(|b| b.name.as_str()), Some("Opener A"));

    add_runs(&mut scores, 4).expect("four");
    assert_eq!(scores.team1.striker().map(|b| b.name.as_str()), Some("Opener A"));
    let strikers = scores.team1.batsmen.iter().filter(|b| b.is_striker).count();
    assert_eq!(strikers, 1);
}

#[test]
fn boundaries_are_counted_and_notified() {
    let mut scores = fresh_match();
    let four = add_runs(&mut scores, 4).expect("four");
    let six = add_runs(&mut scores, 6).expect("six");

    let striker = scores.team1.striker().expect("striker");
    assert_eq!(striker.runs, 10);
    assert_eq!(striker.balls, 2);
    assert_eq!(striker.fours, 1);
    assert_eq!(striker.sixes, 1);

    assert_eq!(four.len(), 2);
    assert_eq!(four[0].kind, EventKind::Run);
    assert_eq!(four[1].kind, EventKind::Four);
    assert_eq!(six[1].kind, EventKind::Six);
}

#[test]
fn invalid_runs_leave_state_untouched() {
    let mut scores = fresh_match();
    add_runs(&mut scores, 1).expect("single");
    let before = scores.clone();

    assert_eq!(add_runs(&mut scores, 7), Err(ScoringError::InvalidRuns(7)));
    assert_eq!(
        add_extra(&mut scores, ExtraType::Bye, 9),
        Err(ScoringError::InvalidExtraRuns(9))
    );
    assert_eq!(scores, before);
}

#[test]
fn wides_and_no_balls_do_not_consume_a_delivery() {
    let mut scores = fresh_match();
    add_extra(&mut scores, ExtraType::Wide, 0).expect("wide");
    add_extra(&mut scores, ExtraType::NoBall, 1).expect("no ball");
    assert_eq!(scores.team1.balls, 0);
    assert_eq!(scores.team1.overs, 0);
    assert_eq!(scores.team1.score, 3);

    let striker = scores.team1.striker().expect("striker");
    assert_eq!(striker.runs, 0);
    assert_eq!(striker.balls, 0);
}

#[test]
fn byes_consume_a_delivery_without_batsman_runs() {
    let mut scores = fresh_match();
    named_openers(&mut scores);
    add_extra(&mut scores, ExtraType::Bye, 1).expect("bye");
    add_extra(&mut scores, ExtraType::LegBye, 2).expect("leg bye");

    assert_eq!(scores.team1.balls, 2);
    assert_eq!(scores.team1.score, 3);
    let striker = scores.team1.striker().expect("striker");
    assert_eq!(striker.name, "Opener A", "extras never rotate strike");
    assert_eq!(striker.runs, 0);
    assert_eq!(striker.balls, 2);
}

#[test]
fn extra_totals_include_the_penalty() {
    let cases = [
        (ExtraType::Wide, 0, 1),
        (ExtraType::Wide, 4, 5),
        (ExtraType::NoBall, 2, 3),
        (ExtraType::Bye, 3, 3),
        (ExtraType::LegBye, 1, 1),
    ];
    for (kind, runs_run, expected) in cases {
        let mut scores = fresh_match();
        set_bowler(&mut scores, "Seamer");
        let events = add_extra(&mut scores, kind, runs_run).expect("extra");
        assert_eq!(scores.team1.score, expected, "{kind:?} + {runs_run}");
        assert_eq!(scores.team1.bowler.as_ref().map(|b| b.runs), Some(expected));
        assert_eq!(events[0].kind, EventKind::Extra);
        assert_eq!(events[0].runs, Some(expected));
        assert_eq!(events[0].extra_type, Some(kind));
    }
}

#[test]
fn extra_types_parse_from_operator_input() {
    assert_eq!("wide".parse::<ExtraType>(), Ok(ExtraType::Wide));
    assert_eq!("No-Ball".parse::<ExtraType>(), Ok(ExtraType::NoBall));
    assert_eq!("lb".parse::<ExtraType>(), Ok(ExtraType::LegBye));
    assert!(matches!(
        "dead ball".parse::<ExtraType>(),
        Err(ScoringError::UnknownExtraType(_))
    ));
}

#[test]
fn wicket_replaces_striker_and_keeps_non_striker() {
    let mut scores = fresh_match();
    named_openers(&mut scores);
    set_bowler(&mut scores, "Spinner");
    add_runs(&mut scores, 2).expect("two");

    let events = process_wicket(&mut scores, OutType::Lbw).expect("wicket");

    let striker = scores.team1.striker().expect("striker");
    assert_eq!(striker.name, PLACEHOLDER_NEW_BATSMAN);
    assert_eq!(striker.runs, 0);
    assert_eq!(striker.balls, 0);
    let non_striker = scores.team1.non_striker().expect("non-striker");
    assert_eq!(non_striker.name, "Opener B");
    assert!(!non_striker.is_striker);

    assert_eq!(scores.team1.wickets, 1);
    assert_eq!(scores.team1.balls, 2);
    assert_eq!(scores.team1.bowler.as_ref().map(|b| b.wickets), Some(1));
    assert_eq!(events[0].kind, EventKind::Wicket);
    assert_eq!(events[0].message.as_deref(), Some("LBW"));
    assert_eq!(events[0].event_type.as_deref(), Some("lbw"));
}

#[test]
fn timed_out_does_not_consume_a_delivery() {
    let mut scores = fresh_match();
    process_wicket(&mut scores, OutType::TimedOut).expect("timed out");
    assert_eq!(scores.team1.wickets, 1);
    assert_eq!(scores.team1.balls, 0);
    assert_eq!(scores.last_five_overs, "W");
}

#[test]
fn dismissal_types_parse_and_label() {
    assert_eq!("runOut".parse::<OutType>(), Ok(OutType::RunOut));
    assert_eq!("hit wicket".parse::<OutType>(), Ok(OutType::HitWicket));
    assert_eq!("BOWLED".parse::<OutType>(), Ok(OutType::Bowled));
    assert_eq!(
        "retired".parse::<OutType>(),
        Err(ScoringError::UnknownOutType("retired".to_string()))
    );
    assert_eq!(OutType::HandledBall.label(), "HANDLED BALL");
    assert_eq!(OutType::RunOut.label(), "RUN OUT");
}

#[test]
fn eleventh_wicket_is_refused() {
    let mut scores = fresh_match();
    for _ in 0..10 {
        process_wicket(&mut scores, OutType::Bowled).expect("wicket");
    }
    let before = scores.clone();
    assert_eq!(
        process_wicket(&mut scores, OutType::Bowled),
        Err(ScoringError::AllOut)
    );
    assert_eq!(scores, before);
    assert_eq!(scores.team1.wickets, 10);
}

#[test]
fn run_rate_uses_legal_deliveries() {
    let mut scores = fresh_match();
    assert_eq!(scores.current_run_rate, 0.0);

    add_runs(&mut scores, 4).expect("four");
    add_runs(&mut scores, 3).expect("three");
    add_extra(&mut scores, ExtraType::Wide, 0).expect("wide");
    // 8 runs off 2 legal balls.
    assert_eq!(scores.current_run_rate, 24.0);

    add_runs(&mut scores, 0).expect("dot");
    // 8 / (3 / 6) = 16.00
    assert_eq!(scores.current_run_rate, 16.0);

    for _ in 0..4 {
        add_runs(&mut scores, 1).expect("single");
    }
    // 12 runs off 7 balls rounds to two decimals.
    assert_eq!(scores.current_run_rate, 10.29);
}

#[test]
fn switch_batting_starts_the_chase() {
    let mut scores = fresh_match();
    add_runs(&mut scores, 6).expect("six");
    add_runs(&mut scores, 4).expect("four");

    switch_batting(&mut scores);

    assert_eq!(scores.batting_team, TeamKey::Team2);
    assert_eq!(scores.innings, 2);
    assert!(scores.is_chasing);
    assert_eq!(scores.target, 11);
    assert_eq!(scores.team1.score, 10, "first innings stays on the board");
    assert!(scores.last_five_overs.is_empty());
    // 11 needed from 120 balls.
    assert_eq!(scores.required_run_rate, 0.55);

    add_runs(&mut scores, 2).expect("two");
    assert_eq!(scores.team2.score, 2);
    // 9 needed from 119 balls.
    assert_eq!(scores.required_run_rate, 0.45);
}

#[test]
fn toss_decides_the_batting_side() {
    let mut scores = LiveScores::new("A", "B");
    handle_toss(&mut scores, TeamKey::Team1, TossChoice::Field);
    assert_eq!(scores.batting_team, TeamKey::Team2);

    handle_toss(&mut scores, TeamKey::Team2, TossChoice::Bat);
    assert_eq!(scores.batting_team, TeamKey::Team2);
    assert!(!scores.is_chasing);
    assert_eq!(scores.innings, 1);
    assert!(scores.toss_recorded());
}

#[test]
fn resets_clear_one_side_or_everything() {
    let mut scores = fresh_match();
    add_runs(&mut scores, 4).expect("four");
    switch_batting(&mut scores);
    add_runs(&mut scores, 1).expect("single");

    reset_innings(&mut scores, Some(TeamKey::Team2));
    assert_eq!(scores.team2.score, 0);
    assert_eq!(scores.team2.name, "Chennai");
    assert_eq!(scores.team1.score, 4);
    assert_eq!(scores.target, 5);

    reset_innings(&mut scores, None);
    assert_eq!(scores.team1.score, 0);
    assert_eq!(scores.target, 0);
    assert_eq!(scores.current_run_rate, 0.0);
    assert!(scores.last_five_overs.is_empty());
}

#[test]
fn maiden_is_credited_for_a_scoreless_over() {
    let mut scores = fresh_match();
    set_bowler(&mut scores, "Miser");
    for _ in 0..5 {
        add_runs(&mut scores, 0).expect("dot");
    }
    add_extra(&mut scores, ExtraType::Wide, 0).expect("wide");
    add_runs(&mut scores, 0).expect("dot");
    assert_eq!(scores.team1.bowler.as_ref().map(|b| b.maidens), Some(0));

    set_bowler(&mut scores, "Tight");
    for _ in 0..6 {
        add_runs(&mut scores, 0).expect("dot");
    }
    let bowler = scores.team1.bowler.as_ref().expect("bowler");
    assert_eq!(bowler.maidens, 1);
    assert_eq!(bowler.overs, 2, "bowler overs follow the team count");
}

#[test]
fn bowler_changed_mid_over_gets_no_maiden_for_it() {
    let mut scores = fresh_match();
    set_bowler(&mut scores, "Injured");
    add_runs(&mut scores, 0).expect("dot");
    add_runs(&mut scores, 0).expect("dot");

    set_bowler(&mut scores, "Stand In");
    for _ in 0..4 {
        add_runs(&mut scores, 0).expect("dot");
    }
    let bowler = scores.team1.bowler.as_ref().expect("bowler");
    assert_eq!(scores.team1.overs, 1);
    assert_eq!(bowler.maidens, 0);
    assert!(!bowler.joined_mid_over);

    for _ in 0..6 {
        add_runs(&mut scores, 0).expect("dot");
    }
    let bowler = scores.team1.bowler.as_ref().expect("bowler");
    assert_eq!(bowler.maidens, 1, "a full over afterwards still counts");
}

#[test]
fn last_five_overs_keeps_thirty_legal_balls() {
    let mut scores = fresh_match();
    add_runs(&mut scores, 4).expect("four");
    add_extra(&mut scores, ExtraType::NoBall, 1).expect("no ball");
    add_extra(&mut scores, ExtraType::LegBye, 1).expect("leg bye");
    process_wicket(&mut scores, OutType::Caught).expect("wicket");
    assert_eq!(scores.last_five_overs, "4 2nb 1lb W");

    for _ in 0..30 {
        add_runs(&mut scores, 1).expect("single");
    }
    let marks: Vec<&str> = scores.last_five_overs.split(' ').collect();
    assert_eq!(marks.len(), 30);
    assert!(marks.iter().all(|m| *m == "1"));
}

#[test]
fn batsman_slots_are_bounded() {
    let mut scores = fresh_match();
    assert_eq!(
        set_batsman_name(&mut scores, 2, "Extra"),
        Err(ScoringError::InvalidSlot(2))
    );
}

#[test]
fn engine_repairs_an_empty_crease() {
    let mut scores = fresh_match();
    scores.team1.batsmen.clear();
    scores.team1.bowler = None;

    add_runs(&mut scores, 1).expect("single");

    assert_eq!(scores.team1.batsmen.len(), 2);
    assert_eq!(scores.team1.batsmen.iter().filter(|b| b.is_striker).count(), 1);
    assert_eq!(scores.team1.bowler.as_ref().map(|b| b.runs), Some(1));
}

#[test]
fn scripted_innings_end_to_end() {
    let mut scores = LiveScores::new("Team One", "Team Two");
    named_openers(&mut scores);
    apply_action(
        &mut scores,
        ScoreAction::Toss {
            winner: TeamKey::Team1,
            choice: TossChoice::Bat,
        },
    )
    .expect("toss");
    apply_action(&mut scores, ScoreAction::Runs(4)).expect("four");
    apply_action(&mut scores, ScoreAction::Runs(1)).expect("single");
    apply_action(&mut scores, ScoreAction::Wicket(OutType::Bowled)).expect("wicket");
    apply_action(
        &mut scores,
        ScoreAction::Extra {
            kind: ExtraType::Wide,
            runs_run: 0,
        },
    )
    .expect("wide");

    let team = &scores.team1;
    assert_eq!(team.score, 6);
    assert_eq!(team.wickets, 1);
    // Run, run and the bowled delivery; the wide is not a legal ball.
    assert_eq!(team.balls, 3);

    let striker = team.striker().expect("striker");
    assert_eq!(striker.name, PLACEHOLDER_NEW_BATSMAN);
    assert_eq!(striker.runs, 0);
    // Opener A faced the four and the single, then ran to the far end.
    let non_striker = team.non_striker().expect("non-striker");
    assert_eq!(non_striker.name, "Opener A");
    assert_eq!(non_striker.runs, 5);

    assert_eq!(scores.current_run_rate, 12.0);
}
