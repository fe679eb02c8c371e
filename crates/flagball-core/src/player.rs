use serde::{Deserialize, Serialize};

use crate::game_trait::PlayerId;

/// One of the two sides on the field. Team A attacks +Z, team B attacks -Z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    #[default]
    #[serde(rename = "TeamA")]
    A,
    #[serde(rename = "TeamB")]
    B,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }

    /// Sign of forward progress along the field axis.
    pub fn forward_sign(self) -> f32 {
        match self {
            Team::A => 1.0,
            Team::B => -1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Team::A => "TeamA",
            Team::B => "TeamB",
        }
    }

    /// Scoreboard name (home/guest).
    pub fn scoreboard_name(self) -> &'static str {
        match self {
            Team::A => "HOME",
            Team::B => "GUEST",
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What a participant does in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Team(Team),
    Referee,
    Spectator,
}

impl Role {
    pub fn team(self) -> Option<Team> {
        match self {
            Role::Team(team) => Some(team),
            Role::Referee | Role::Spectator => None,
        }
    }
}

/// A participant connected to a Flagball session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub role: Role,
}

impl Player {
    pub fn new(id: PlayerId, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
        }
    }

    pub fn team(&self) -> Option<Team> {
        self.role.team()
    }
}
