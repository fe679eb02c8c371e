use serde::{Deserialize, Serialize};

use flagball_core::events::FlagSide;
use flagball_core::game_trait::PlayerId;
use flagball_core::math::{Pose, Vec3};
use flagball_core::player::Team;
use flagball_core::time::Timestamp;

use crate::config::FlagFootballConfig;
use crate::pool::FlagHandle;
use crate::proximity::flag_world_position;

/// Lifecycle of a single flag slot.
///
/// `Attached -> Pulled -> Respawning -> Attached`. `Respawning` is the part
/// of being pulled where the reattach timer is running; both count as down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagStatus {
    Attached,
    Pulled,
    Respawning,
}

/// One of the two flags a player carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagSlot {
    pub owner: PlayerId,
    pub side: FlagSide,
    pub handle: FlagHandle,
    pub status: FlagStatus,
    pub world_position: Vec3,
    pub pulled_at: Option<Timestamp>,
    pub pulled_by: Option<PlayerId>,
}

impl FlagSlot {
    pub(crate) fn attached(
        owner: PlayerId,
        side: FlagSide,
        handle: FlagHandle,
        pose: &Pose,
        config: &FlagFootballConfig,
    ) -> Self {
        Self {
            owner,
            side,
            handle,
            status: FlagStatus::Attached,
            world_position: flag_world_position(pose, side, config),
            pulled_at: None,
            pulled_by: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.status == FlagStatus::Attached
    }

    /// Pulled or waiting to respawn.
    pub fn is_down(&self) -> bool {
        !self.is_attached()
    }

    /// Follow the carrier. Detached flags stay where they fell.
    pub(crate) fn track(&mut self, pose: &Pose, config: &FlagFootballConfig) {
        if self.is_attached() {
            self.world_position = flag_world_position(pose, self.side, config);
        }
    }

    /// Detach the flag. Returns false if it was not attached.
    pub(crate) fn pull(&mut self, puller: PlayerId, now: Timestamp) -> bool {
        if !self.is_attached() {
            return false;
        }
        self.status = FlagStatus::Pulled;
        self.pulled_at = Some(now);
        self.pulled_by = Some(puller);
        true
    }

    pub(crate) fn start_respawn_timer(&mut self) {
        if self.status == FlagStatus::Pulled {
            self.status = FlagStatus::Respawning;
        }
    }

    pub fn respawn_due(&self, now: Timestamp, delay_secs: f32) -> bool {
        match (self.status, self.pulled_at) {
            (FlagStatus::Attached, _) | (_, None) => false,
            (_, Some(at)) => now.since(at) >= f64::from(delay_secs),
        }
    }

    pub(crate) fn reattach(&mut self, pose: &Pose, config: &FlagFootballConfig) {
        self.status = FlagStatus::Attached;
        self.pulled_at = None;
        self.pulled_by = None;
        self.world_position = flag_world_position(pose, self.side, config);
    }
}

/// Per-player flag record, created on enrollment and dropped on removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFlagState {
    pub player_id: PlayerId,
    pub team: Team,
    /// Last pose reported by the host.
    pub pose: Pose,
    pub left: FlagSlot,
    pub right: FlagSlot,
}

impl PlayerFlagState {
    pub fn slot(&self, side: FlagSide) -> &FlagSlot {
        match side {
            FlagSide::Left => &self.left,
            FlagSide::Right => &self.right,
        }
    }

    pub fn slot_mut(&mut self, side: FlagSide) -> &mut FlagSlot {
        match side {
            FlagSide::Left => &mut self.left,
            FlagSide::Right => &mut self.right,
        }
    }

    /// Both slots, left first.
    pub fn slots(&self) -> [&FlagSlot; 2] {
        [&self.left, &self.right]
    }

    pub fn attached_count(&self) -> usize {
        self.slots().iter().filter(|s| s.is_attached()).count()
    }

    pub fn has_attached(&self) -> bool {
        self.attached_count() > 0
    }

    pub(crate) fn set_pose(&mut self, pose: Pose, config: &FlagFootballConfig) {
        self.pose = pose;
        self.left.track(&pose, config);
        self.right.track(&pose, config);
    }
}
