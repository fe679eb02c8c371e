pub mod events;
pub mod feedback;
pub mod field;
pub mod game_trait;
pub mod math;
pub mod player;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::time::Duration;

    use crate::events::GameEvent;
    use crate::game_trait::{FieldGame, GameConfig, PlayerId, PoseFrame};
    use crate::math::Pose;
    use crate::player::{Player, Role, Team};

    /// Create `n` test players with sequential IDs starting at 1, alternating
    /// team A and team B.
    pub fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| {
                let team = if i % 2 == 0 { Team::A } else { Team::B };
                Player::new(i as PlayerId + 1, format!("Player{}", i + 1), Role::Team(team))
            })
            .collect()
    }

    /// Create a referee participant.
    pub fn make_referee(id: PlayerId) -> Player {
        Player::new(id, "Referee", Role::Referee)
    }

    /// Create a default GameConfig with the given game duration in seconds.
    pub fn default_config(game_duration_secs: u64) -> GameConfig {
        GameConfig {
            game_duration: Duration::from_secs(game_duration_secs),
            custom: HashMap::new(),
        }
    }

    /// Spread players far apart along the sideline so no flag is in reach.
    pub fn spread_poses(players: &[Player]) -> PoseFrame {
        let mut frame = PoseFrame::new();
        for (i, p) in players.iter().enumerate() {
            frame.set(p.id, Pose::at(i as f32 * 25.0, 0.0));
        }
        frame
    }

    /// Run N game ticks with the given poses, returning all accumulated events.
    pub fn run_game_ticks(
        game: &mut dyn FieldGame,
        n: usize,
        dt: f32,
        poses: &PoseFrame,
    ) -> Vec<GameEvent> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(game.update(dt, poses));
        }
        all_events
    }

    // ================================================================
    // FieldGame Contract Tests
    // ================================================================
    // Generic suite every FieldGame implementation must pass. Game crates
    // call these from their own #[cfg(test)] modules.

    /// After init() with N players, serialize_state() must return non-empty bytes.
    pub fn contract_init_creates_player_state(game: &mut dyn FieldGame, player_count: usize) {
        let players = make_players(player_count);
        game.init(&players, &default_config(600));
        let state = game.serialize_state();
        assert!(
            !state.is_empty(),
            "serialize_state() must return non-empty bytes after init"
        );
    }

    /// update() with dt>0 must advance the game clock.
    pub fn contract_update_advances_time(game: &mut dyn FieldGame, poses: &PoseFrame) {
        let before = game.serialize_state();
        game.update(1.0, poses);
        let after = game.serialize_state();
        assert_ne!(before, after, "update(dt>0) must advance game state (clock)");
    }

    /// Snapshots without an intervening update must be byte-identical.
    pub fn contract_snapshot_is_stable(game: &dyn FieldGame) {
        assert_eq!(
            game.serialize_state(),
            game.serialize_state(),
            "serialize_state() must be deterministic"
        );
    }

    /// Running update() long enough must reach is_game_over().
    pub fn contract_game_eventually_ends(
        game: &mut dyn FieldGame,
        poses: &PoseFrame,
        max_ticks: usize,
    ) {
        for _ in 0..max_ticks {
            game.update(1.0, poses);
            if game.is_game_over() {
                return;
            }
        }
        assert!(
            game.is_game_over(),
            "Game must end after {max_ticks} ticks of 1s each"
        );
    }

    /// player_left() must change the snapshot.
    pub fn contract_player_left_cleanup(game: &mut dyn FieldGame, player_id: PlayerId) {
        let before = game.serialize_state();
        game.player_left(player_id);
        let after = game.serialize_state();
        assert_ne!(before, after, "player_left must change state");
    }

    /// Leaving twice is a no-op the second time.
    pub fn contract_player_left_idempotent(game: &mut dyn FieldGame, player_id: PlayerId) {
        game.player_left(player_id);
        let before = game.serialize_state();
        game.player_left(player_id);
        assert_eq!(
            before,
            game.serialize_state(),
            "second player_left must not change state"
        );
    }
}
