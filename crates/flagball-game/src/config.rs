use serde::{Deserialize, Serialize};

use flagball_core::math::Vec3;

/// Data-driven configuration for a flag football session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagFootballConfig {
    /// Game length in minutes, split evenly across quarters.
    pub game_duration_minutes: f32,
    /// Number of quarters in a game.
    pub quarters: u8,
    /// Distance the offense must gain for a first down.
    pub yards_for_first_down: f32,
    /// Points awarded for a touchdown.
    pub touchdown_points: i32,
    /// When true, the referee must confirm every spot.
    pub manual_spotting: bool,
    /// Maximum enrolled players across both teams. The flag pool holds two per player.
    pub max_players: usize,
    /// Maximum enrolled players per team.
    pub max_team_size: usize,
    /// An opponent closer than this to an attached flag pulls it.
    pub pull_distance: f32,
    /// Lateral distance from the body center to each hip flag.
    pub flag_lateral_offset: f32,
    /// Height of the flags above the body origin.
    pub flag_height: f32,
    /// Seconds before a pulled flag reattaches to its carrier.
    pub respawn_delay_secs: f32,
    /// Pulls inside this window after an authoritative play end belong to the same play.
    pub double_pull_window_secs: f32,
    /// How long feedback notices stay visible.
    pub notice_secs: f32,
    /// Simulation tick rate (Hz).
    pub tick_rate: f32,
    /// Where the line of scrimmage starts when a game starts.
    pub initial_spot: Vec3,
}

impl Default for FlagFootballConfig {
    fn default() -> Self {
        Self {
            game_duration_minutes: 20.0,
            quarters: 4,
            yards_for_first_down: 20.0,
            touchdown_points: 6,
            manual_spotting: false,
            max_players: 16,
            max_team_size: 8,
            pull_distance: 0.6,
            flag_lateral_offset: 0.3,
            flag_height: 0.9,
            respawn_delay_secs: 3.0,
            double_pull_window_secs: 1.5,
            notice_secs: 2.5,
            tick_rate: 30.0,
            initial_spot: Vec3::ZERO,
        }
    }
}

impl FlagFootballConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("FLAGBALL_CONFIG")
            && let Some(config) = Self::from_file(&path)
        {
            return config;
        }
        Self::from_file("config/flagball.toml").unwrap_or_default()
    }

    fn from_file(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<Self>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Failed to parse {path}: {e}, using defaults");
                None
            },
        }
    }

    /// Total game length in seconds.
    pub fn game_duration_secs(&self) -> f32 {
        self.game_duration_minutes * 60.0
    }

    /// Flag pool capacity.
    pub fn pool_capacity(&self) -> usize {
        self.max_players * 2
    }

    /// Body-local offset of a hip flag; `lateral_sign` is -1 for left, +1 for right.
    pub fn flag_offset(&self, lateral_sign: f32) -> Vec3 {
        Vec3::new(self.flag_lateral_offset * lateral_sign, self.flag_height, 0.0)
    }

    /// Apply overrides from a session's custom JSON map.
    pub fn apply_overrides(&mut self, custom: &std::collections::HashMap<String, serde_json::Value>) {
        if let Some(v) = custom.get("manual_spotting").and_then(|v| v.as_bool()) {
            self.manual_spotting = v;
        }
        if let Some(v) = custom_f32(custom, "yards_for_first_down") {
            self.yards_for_first_down = v;
        }
        if let Some(v) = custom.get("touchdown_points").and_then(|v| v.as_i64()) {
            match i32::try_from(v) {
                Ok(points) => self.touchdown_points = points,
                Err(_) => tracing::warn!(value = v, "Ignoring out-of-range touchdown_points"),
            }
        }
        if let Some(v) = custom_f32(custom, "respawn_delay_secs") {
            self.respawn_delay_secs = v;
        }
    }
}

/// A finite `f32` override, or `None` (with a warning) when it does not fit.
fn custom_f32(
    custom: &std::collections::HashMap<String, serde_json::Value>,
    key: &str,
) -> Option<f32> {
    let v = custom.get(key)?.as_f64()?;
    let narrowed = v as f32;
    if narrowed.is_finite() {
        Some(narrowed)
    } else {
        tracing::warn!(key, value = v, "Ignoring out-of-range override");
        None
    }
}
