//! End-to-end drives through the public session API: pulls become spots,
//! spots advance downs, and the referee gate holds the line of scrimmage.

use std::thread;

use flagball_core::events::{FlagSide, GameEvent};
use flagball_core::field::FieldGeometry;
use flagball_core::game_trait::{FieldGame, PoseFrame};
use flagball_core::math::{Pose, Vec3};
use flagball_core::player::Team;
use flagball_core::test_helpers::{default_config, make_players, make_referee, spread_poses};

use flagball_game::config::FlagFootballConfig;
use flagball_game::error::FlagError;
use flagball_game::flags::FlagStatus;
use flagball_game::{FlagFootball, GameCommand};

const DT: f32 = 1.0 / 30.0;

fn started(referee: bool) -> FlagFootball {
    let mut game = FlagFootball::with_config(FlagFootballConfig::default());
    let mut players = make_players(4);
    if referee {
        players.push(make_referee(9));
    }
    game.init(&players, &default_config(1200));
    game
}

fn spot(z: f32) -> Vec3 {
    Vec3::new(0.0, 0.0, z)
}

/// Player 2 (team B) standing just off player 1's left hip at `z`.
fn tackle_at(z: f32) -> PoseFrame {
    PoseFrame::new()
        .with(1, Pose::at(0.0, z))
        .with(2, Pose::at(-0.5, z))
        .with(3, Pose::at(40.0, z))
        .with(4, Pose::at(-40.0, z))
}

fn far() -> PoseFrame {
    spread_poses(&make_players(4))
}

#[test]
fn gaining_the_line_resets_downs() {
    let mut game = started(false);
    assert_eq!(game.scrimmage_state().line_to_gain.z, 20.0);

    let events = game.spot_ball(spot(25.0)).unwrap();

    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::FirstDown { team: Team::A, .. }
    )));
    let s = game.scrimmage_state();
    assert_eq!(s.current_down, 1);
    assert_eq!(s.line_of_scrimmage.z, 25.0);
    assert_eq!(s.line_to_gain.z, 45.0);
    assert_eq!(s.possession, Team::A);
}

#[test]
fn four_short_spots_turn_the_ball_over() {
    let mut game = started(false);
    for (i, z) in [2.0, 4.0, 6.0].into_iter().enumerate() {
        game.spot_ball(spot(z)).unwrap();
        assert_eq!(game.scrimmage_state().current_down, i as u8 + 2);
        assert_eq!(game.scrimmage_state().line_to_gain.z, 20.0);
    }

    let events = game.spot_ball(spot(8.0)).unwrap();

    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::Turnover { to: Team::B }))
    );
    let s = game.scrimmage_state();
    assert_eq!(s.possession, Team::B);
    assert_eq!(s.current_down, 1);
    assert_eq!(s.line_of_scrimmage.z, 8.0);
    assert_eq!(s.line_to_gain.z, -12.0);
    assert_eq!(game.down_marker_text(), "Down: 1\nPossession: TeamB");
}

#[test]
fn referee_holds_the_spot_until_confirmed() {
    let mut game = started(true);
    game.set_manual_spotting(true);

    let events = game.tick(DT, &tackle_at(12.0));
    assert!(events.iter().any(|e| matches!(e, GameEvent::SpotPending { carrier: 1, .. })));
    assert!(!events.iter().any(|e| matches!(e, GameEvent::BallSpotted { .. })));
    assert_eq!(game.scrimmage_state().line_of_scrimmage.z, 0.0);
    assert_eq!(game.scrimmage_state().current_down, 1);

    assert_eq!(
        game.confirm_spot(2),
        Err(FlagError::InvalidRole { player_id: 2 })
    );
    assert!(game.pending_spot().is_some());

    let events = game.confirm_spot(9).unwrap();
    assert!(events.iter().any(|e| matches!(e, GameEvent::BallSpotted { down: 2, .. })));
    assert_eq!(game.scrimmage_state().line_of_scrimmage.z, 12.0);
    assert!(game.pending_spot().is_none());
    assert_eq!(game.confirm_spot(9), Err(FlagError::NoPendingSpot));
}

#[test]
fn referee_override_moves_the_spot() {
    let mut game = started(true);
    game.set_manual_spotting(true);
    game.tick(DT, &tackle_at(12.0));

    game.override_spot(9, spot(15.0)).unwrap();

    assert_eq!(game.scrimmage_state().line_of_scrimmage.z, 15.0);
}

#[test]
fn pulled_flag_respawns_within_a_tick_of_the_delay() {
    let mut game = started(false);
    let delay = f64::from(game.config().respawn_delay_secs);

    game.tick(DT, &tackle_at(5.0));
    let pulled_at = game.flag_state(1).unwrap().left.pulled_at.unwrap();

    let mut respawned_at = None;
    for _ in 0..200 {
        let events = game.tick(DT, &far());
        if events.iter().any(|e| {
            matches!(
                e,
                GameEvent::FlagRespawned {
                    carrier: 1,
                    side: FlagSide::Left
                }
            )
        }) {
            respawned_at = Some(game.now());
            break;
        }
        assert_ne!(game.flag_state(1).unwrap().left.status, FlagStatus::Attached);
    }

    let elapsed = respawned_at.unwrap().since(pulled_at);
    assert!(elapsed >= delay, "respawned early after {elapsed}s");
    assert!(elapsed <= delay + f64::from(DT) + 1e-6, "respawned late after {elapsed}s");
    assert!(game.flag_state(1).unwrap().left.is_attached());
}

#[test]
fn second_pull_inside_the_window_is_ignored() {
    let mut game = started(false);
    game.tick(DT, &tackle_at(5.0));
    assert_eq!(game.scrimmage_state().current_down, 2);

    // Player 4 grabs the right flag a few ticks later.
    let late = PoseFrame::new()
        .with(1, Pose::at(0.0, 6.0))
        .with(2, Pose::at(-30.0, 0.0))
        .with(4, Pose::at(0.5, 6.0));
    let mut pulls = 0;
    let mut plays = 0;
    for _ in 0..3 {
        for event in game.tick(DT, &late) {
            match event {
                GameEvent::FlagPulled { carrier: 1, .. } => pulls += 1,
                GameEvent::PlayFinished { .. } => plays += 1,
                _ => {},
            }
        }
    }

    assert_eq!(pulls, 1);
    assert_eq!(plays, 0);
    assert_eq!(game.scrimmage_state().current_down, 2);
    assert_eq!(game.scrimmage_state().line_of_scrimmage.z, 5.0);
}

#[test]
fn spot_in_the_end_zone_scores_a_touchdown() {
    let mut game = started(false);
    game.set_field(Some(FieldGeometry::from_markers(
        Vec3::ZERO,
        spot(40.0),
        spot(-40.0),
    )));

    let events = game.spot_ball(spot(42.0)).unwrap();

    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::Touchdown {
            team: Team::A,
            points: 6
        }
    )));
    assert_eq!(game.scores().team_a, 6);
    assert!(game.scoreboard_text().starts_with("HOME: 6 | GUEST: 0"));
}

#[test]
fn commands_sent_from_another_thread_apply_on_next_tick() {
    let mut game = started(false);
    let tx = game.command_sender();

    let sender = thread::spawn(move || {
        tx.send(GameCommand::Enroll {
            player_id: 5,
            team: Team::A,
            pose: Pose::at(60.0, 0.0),
        })
        .unwrap();
        tx.send(GameCommand::AddScore {
            team: Team::B,
            points: 2,
        })
        .unwrap();
    });
    sender.join().unwrap();
    assert!(game.flag_state(5).is_none());

    let events = game.tick(DT, &far());

    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::PlayerEnrolled {
            player_id: 5,
            team: Team::A
        }
    )));
    assert_eq!(game.flag_state(5).unwrap().attached_count(), 2);
    assert_eq!(game.scores().team_b, 2);
}

#[test]
fn stopped_game_rejects_spots_and_scores() {
    let mut game = started(false);
    game.stop_game();

    assert_eq!(game.spot_ball(spot(30.0)), Err(FlagError::NotActive));
    assert_eq!(game.add_score(Team::A, 6), Err(FlagError::NotActive));
    assert_eq!(game.scrimmage_state().line_of_scrimmage.z, 0.0);

    game.start_game();
    assert!(game.spot_ball(spot(3.0)).is_ok());
}

#[test]
fn reset_drive_hands_fresh_downs() {
    let mut game = started(false);
    game.spot_ball(spot(3.0)).unwrap();
    game.reset_drive(Team::B, spot(30.0));

    let s = game.scrimmage_state();
    assert_eq!(s.possession, Team::B);
    assert_eq!(s.current_down, 1);
    assert_eq!(s.line_to_gain.z, 10.0);
}

#[test]
fn clock_runs_out_through_every_quarter() {
    let mut game = FlagFootball::default();
    game.init(&make_players(2), &default_config(40));

    let mut quarters = Vec::new();
    let mut over = false;
    for _ in 0..50 {
        for event in game.update(1.0, &far()) {
            match event {
                GameEvent::QuarterEnded { quarter } => quarters.push(quarter),
                GameEvent::GameOver { .. } => over = true,
                _ => {},
            }
        }
    }

    assert!(over);
    assert!(game.is_game_over());
    assert_eq!(quarters, vec![1, 2, 3, 4]);
    assert_eq!(game.scoreboard_text(), "HOME: 0 | GUEST: 0\nQ4 - 0:00");
}

#[test]
fn one_long_tick_still_reports_every_quarter() {
    let mut game = FlagFootball::default();
    game.init(&make_players(2), &default_config(40));

    let quarters: Vec<u8> = game
        .update(100.0, &far())
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::QuarterEnded { quarter } => Some(quarter),
            _ => None,
        })
        .collect();

    assert_eq!(quarters, vec![1, 2, 3, 4]);
    assert!(game.is_game_over());
}
