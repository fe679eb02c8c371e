use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::events::GameEvent;
use crate::math::Pose;

/// Unique identifier for a player in the game.
pub type PlayerId = u64;

/// Core trait a host drives once per simulation tick.
///
/// The host owns rendering, input devices, and player tracking; the game
/// only handles live-play logic and hands back events and read-only
/// snapshots.
pub trait FieldGame {
    /// Game metadata for the session selection screen.
    fn metadata(&self) -> GameMetadata;

    /// Called once when players are ready. Starts the game clock.
    fn init(&mut self, players: &[super::player::Player], config: &GameConfig);

    /// Called each frame with the latest known player poses.
    fn update(&mut self, dt: f32, poses: &PoseFrame) -> Vec<GameEvent>;

    /// Encode a read-only snapshot of the full game state for presentation.
    fn serialize_state(&self) -> Vec<u8>;

    /// Called when a participant joins or changes role mid-game.
    fn player_joined(&mut self, player: &super::player::Player);

    /// Called when a participant disconnects.
    fn player_left(&mut self, player_id: PlayerId);

    /// Simulation tick rate in Hz.
    fn tick_rate(&self) -> f32 {
        30.0
    }

    /// Whether the game clock has run out.
    fn is_game_over(&self) -> bool;
}

/// Game metadata for the session selection screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub min_players: u8,
    pub max_players: u8,
    pub estimated_game_duration: Duration,
}

/// Configuration for a game session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub game_duration: Duration,
    pub custom: HashMap<String, serde_json::Value>,
}

/// Player poses reported by the host for a single tick.
///
/// Players missing from the frame keep their last known pose.
#[derive(Debug, Clone, Default)]
pub struct PoseFrame {
    pub poses: HashMap<PlayerId, Pose>,
}

impl PoseFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, player_id: PlayerId, pose: Pose) -> Self {
        self.poses.insert(player_id, pose);
        self
    }

    pub fn set(&mut self, player_id: PlayerId, pose: Pose) {
        self.poses.insert(player_id, pose);
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Pose> {
        self.poses.get(&player_id)
    }
}

/// Generates `serialize_state` and `is_game_over` for a `FieldGame`.
///
/// Requires `fn snapshot(&self)` returning a `Serialize` type and
/// `fn clock_state(&self)` returning a value with an `is_game_over: bool` field.
#[macro_export]
macro_rules! field_game_snapshot {
    () => {
        fn serialize_state(&self) -> Vec<u8> {
            match rmp_serde::to_vec(&self.snapshot()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode game snapshot");
                    Vec::new()
                },
            }
        }

        fn is_game_over(&self) -> bool {
            self.clock_state().is_game_over
        }
    };
}
