use thiserror::Error;

use flagball_core::events::FlagSide;
use flagball_core::game_trait::PlayerId;

/// Failures reported by live-play operations. None of them are fatal to a tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    #[error("{what} is full (capacity {capacity})")]
    CapacityExceeded { what: &'static str, capacity: usize },
    #[error("stale event for player {player_id} {side:?} flag")]
    StaleEvent { player_id: PlayerId, side: FlagSide },
    #[error("stale contact with flag handle {subject_id}")]
    StaleContact { subject_id: u64 },
    #[error("player {player_id} is not the designated referee")]
    InvalidRole { player_id: PlayerId },
    #[error("game is not active")]
    NotActive,
    #[error("player {player_id} is not enrolled")]
    UnknownPlayer { player_id: PlayerId },
    #[error("no spot is waiting for confirmation")]
    NoPendingSpot,
    #[error("spot position is not a finite point")]
    InvalidSpot,
}
