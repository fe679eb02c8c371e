use serde::{Deserialize, Serialize};

use crate::game_trait::PlayerId;
use crate::math::Vec3;
use crate::player::Team;

/// Which hip a flag hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlagSide {
    Left,
    Right,
}

impl FlagSide {
    /// Processing order within a tick: left before right.
    pub const BOTH: [FlagSide; 2] = [FlagSide::Left, FlagSide::Right];

    /// Sign of the lateral offset from the body center.
    pub fn lateral_sign(self) -> f32 {
        match self {
            FlagSide::Left => -1.0,
            FlagSide::Right => 1.0,
        }
    }
}

/// Events emitted by a tick or a command, read by presentation collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted,
    GameStopped,
    PlayerEnrolled {
        player_id: PlayerId,
        team: Team,
    },
    PlayerUnenrolled {
        player_id: PlayerId,
    },
    FlagPulled {
        carrier: PlayerId,
        puller: PlayerId,
        side: FlagSide,
        position: Vec3,
    },
    FlagRespawned {
        carrier: PlayerId,
        side: FlagSide,
    },
    /// Canonical end of a live play.
    PlayFinished {
        position: Vec3,
        puller: PlayerId,
        carrier: PlayerId,
    },
    /// A play ended but the spot waits for the referee.
    SpotPending {
        position: Vec3,
        puller: PlayerId,
        carrier: PlayerId,
    },
    BallSpotted {
        position: Vec3,
        down: u8,
        possession: Team,
    },
    FirstDown {
        team: Team,
        line_to_gain: Vec3,
    },
    Turnover {
        to: Team,
    },
    Touchdown {
        team: Team,
        points: i32,
    },
    ScoreChanged {
        team: Team,
        points: i32,
        total: i32,
    },
    QuarterEnded {
        quarter: u8,
    },
    GameOver {
        score_a: i32,
        score_b: i32,
    },
    CommandRejected {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = GameEvent::Turnover { to: Team::B };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "turnover");
        assert_eq!(json["to"], "TeamB");
    }

    #[test]
    fn play_finished_msgpack_roundtrip() {
        let event = GameEvent::PlayFinished {
            position: Vec3::new(1.0, 0.0, 12.5),
            puller: 4,
            carrier: 1,
        };
        let bytes = rmp_serde::to_vec(&event).unwrap();
        let back: GameEvent = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn left_flag_sits_on_negative_side() {
        assert_eq!(FlagSide::Left.lateral_sign(), -1.0);
        assert_eq!(FlagSide::Right.lateral_sign(), 1.0);
        assert_eq!(FlagSide::BOTH[0], FlagSide::Left);
    }
}
