use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use flagball_core::events::FlagSide;
use flagball_core::game_trait::{PlayerId, PoseFrame};
use flagball_core::math::{Pose, Vec3};
use flagball_core::player::Team;
use flagball_core::time::Timestamp;

use crate::config::FlagFootballConfig;
use crate::error::FlagError;
use crate::flags::{FlagSlot, FlagStatus, PlayerFlagState};
use crate::pool::{FlagHandle, FlagPool};
use crate::proximity::{PullEvent, PullEvents, detect_pulls};

/// Host capability to move and parent pooled flag objects.
///
/// All methods default to no-ops so headless hosts can ignore visuals.
pub trait FlagRig {
    /// Parent the flag to the carrier's hip.
    fn attach(&mut self, _handle: FlagHandle, _carrier: PlayerId, _side: FlagSide) {}

    /// Unparent the flag and leave it at `position`.
    fn detach(&mut self, _handle: FlagHandle, _position: Vec3) {}

    /// Hide the flag; it went back to the pool.
    fn stow(&mut self, _handle: FlagHandle) {}
}

/// Rig for hosts without flag visuals.
#[derive(Debug, Default)]
pub struct NullRig;

impl FlagRig for NullRig {}

/// Canonical end of a live play, produced by a valid pull.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayFinished {
    pub position: Vec3,
    pub puller: PlayerId,
    pub carrier: PlayerId,
}

/// Opaque trigger-enter pair from the host: `actor_id` is the player who
/// touched the flag, `subject_id` the flag handle id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerContact {
    pub actor_id: PlayerId,
    pub subject_id: u64,
}

/// Owns every `PlayerFlagState` and the flag pool.
pub struct FlagLifecycleManager {
    config: FlagFootballConfig,
    pool: FlagPool,
    players: BTreeMap<PlayerId, PlayerFlagState>,
    owners: HashMap<FlagHandle, (PlayerId, FlagSide)>,
    rig: Box<dyn FlagRig>,
}

impl FlagLifecycleManager {
    pub fn new(config: FlagFootballConfig) -> Self {
        Self::with_rig(config, Box::new(NullRig))
    }

    pub fn with_rig(config: FlagFootballConfig, rig: Box<dyn FlagRig>) -> Self {
        Self {
            pool: FlagPool::new(config.pool_capacity()),
            config,
            players: BTreeMap::new(),
            owners: HashMap::new(),
            rig,
        }
    }

    pub fn set_rig(&mut self, rig: Box<dyn FlagRig>) {
        self.rig = rig;
    }

    /// Drop every enrollment and resize the pool for `config`. The rig is kept.
    pub fn reconfigure(&mut self, config: FlagFootballConfig) {
        self.clear();
        self.pool = FlagPool::new(config.pool_capacity());
        self.config = config;
    }

    /// Give `player_id` two attached flags on `team`.
    ///
    /// Re-enrolling an enrolled player (e.g. switching teams) returns its old
    /// flags first. Nothing changes if the roster or pool is full.
    pub fn enroll(&mut self, player_id: PlayerId, team: Team, pose: Pose) -> Result<(), FlagError> {
        let already_on_team = self.team_of(player_id) == Some(team);
        let teammates = self.team_count(team) - usize::from(already_on_team);
        if teammates >= self.config.max_team_size {
            return Err(FlagError::CapacityExceeded {
                what: "team roster",
                capacity: self.config.max_team_size,
            });
        }
        let reenroll = self.players.contains_key(&player_id);
        if !reenroll && self.pool.free() < 2 {
            return Err(FlagError::CapacityExceeded {
                what: "flag pool",
                capacity: self.pool.capacity(),
            });
        }
        if reenroll {
            self.release_player(player_id);
        }

        let left = self.pool.acquire()?;
        let right = match self.pool.acquire() {
            Ok(h) => h,
            Err(e) => {
                self.pool.release(left);
                return Err(e);
            },
        };

        let state = PlayerFlagState {
            player_id,
            team,
            pose,
            left: FlagSlot::attached(player_id, FlagSide::Left, left, &pose, &self.config),
            right: FlagSlot::attached(player_id, FlagSide::Right, right, &pose, &self.config),
        };
        for slot in state.slots() {
            self.owners.insert(slot.handle, (player_id, slot.side));
            self.rig.attach(slot.handle, player_id, slot.side);
        }
        self.players.insert(player_id, state);

        tracing::info!(player_id, %team, "Flags attached");
        Ok(())
    }

    /// Return both flags to the pool and forget the player. Unknown players
    /// are a no-op. Returns whether a record was removed.
    pub fn unenroll(&mut self, player_id: PlayerId) -> bool {
        let removed = self.release_player(player_id);
        if removed {
            tracing::info!(player_id, "Flags removed");
        }
        removed
    }

    fn release_player(&mut self, player_id: PlayerId) -> bool {
        let Some(state) = self.players.remove(&player_id) else {
            return false;
        };
        for slot in state.slots() {
            self.owners.remove(&slot.handle);
            self.pool.release(slot.handle);
            self.rig.stow(slot.handle);
        }
        true
    }

    /// Return every flag to the pool.
    pub fn clear(&mut self) {
        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        for id in ids {
            self.release_player(id);
        }
    }

    /// Refresh carrier poses; attached flags follow their carrier.
    pub fn sync_poses(&mut self, frame: &PoseFrame) {
        for (id, state) in &mut self.players {
            if let Some(pose) = frame.get(*id) {
                state.set_pose(*pose, &self.config);
            }
        }
    }

    /// Pull candidates for the current poses. Does not mutate anything.
    pub fn detect(&self) -> PullEvents {
        detect_pulls(self.players.values(), &self.config)
    }

    /// Apply a pull. Pulls on a slot that is not attached are stale.
    pub fn on_pull_event(
        &mut self,
        event: &PullEvent,
        now: Timestamp,
    ) -> Result<PlayFinished, FlagError> {
        let puller_team = self.players.get(&event.puller).map(|p| p.team);
        let Some(carrier) = self.players.get_mut(&event.carrier) else {
            return Err(FlagError::UnknownPlayer {
                player_id: event.carrier,
            });
        };
        let Some(puller_team) = puller_team else {
            return Err(FlagError::UnknownPlayer {
                player_id: event.puller,
            });
        };
        let stale = FlagError::StaleEvent {
            player_id: event.carrier,
            side: event.side,
        };
        if puller_team == carrier.team {
            return Err(stale);
        }

        let slot = carrier.slot_mut(event.side);
        if !slot.pull(event.puller, now) {
            return Err(stale);
        }
        let position = slot.world_position;
        self.rig.detach(slot.handle, position);

        tracing::info!(
            carrier = event.carrier,
            puller = event.puller,
            side = ?event.side,
            %position,
            "Flag pulled"
        );
        Ok(PlayFinished {
            position,
            puller: event.puller,
            carrier: event.carrier,
        })
    }

    /// Resolve a trigger-enter pair into a pull candidate. Contacts with a
    /// flag nobody owns, from a non-enrolled actor or a teammate are stale.
    pub fn resolve_contact(&self, contact: TriggerContact) -> Result<PullEvent, FlagError> {
        let unowned = FlagError::StaleContact {
            subject_id: contact.subject_id,
        };
        let Ok(handle) = u32::try_from(contact.subject_id).map(FlagHandle) else {
            return Err(unowned);
        };
        let Some(&(carrier, side)) = self.owners.get(&handle) else {
            return Err(unowned);
        };
        let Some(state) = self.players.get(&carrier) else {
            return Err(unowned);
        };
        let stale = FlagError::StaleEvent {
            player_id: carrier,
            side,
        };
        let Some(actor) = self.players.get(&contact.actor_id) else {
            return Err(stale);
        };
        let slot = state.slot(side);
        if actor.team == state.team || !slot.is_attached() {
            return Err(stale);
        }
        Ok(PullEvent {
            carrier,
            side,
            puller: contact.actor_id,
            position: slot.world_position,
        })
    }

    /// Start timers on freshly pulled flags and reattach those whose delay
    /// has elapsed. Runs whether or not the game is active.
    pub fn respawn_sweep(&mut self, now: Timestamp) -> Vec<(PlayerId, FlagSide)> {
        let delay = self.config.respawn_delay_secs;
        let mut respawned = Vec::new();
        for (id, state) in &mut self.players {
            let pose = state.pose;
            for side in FlagSide::BOTH {
                let slot = state.slot_mut(side);
                if slot.respawn_due(now, delay) {
                    slot.reattach(&pose, &self.config);
                    self.rig.attach(slot.handle, *id, side);
                    respawned.push((*id, side));
                } else if slot.status == FlagStatus::Pulled {
                    slot.start_respawn_timer();
                }
            }
        }
        for (id, side) in &respawned {
            tracing::debug!(player_id = id, side = ?side, "Flag respawned");
        }
        respawned
    }

    pub fn flag_state(&self, player_id: PlayerId) -> Option<&PlayerFlagState> {
        self.players.get(&player_id)
    }

    /// Enrolled players in ascending id order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerFlagState> {
        self.players.values()
    }

    pub fn is_enrolled(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    pub fn team_of(&self, player_id: PlayerId) -> Option<Team> {
        self.players.get(&player_id).map(|p| p.team)
    }

    pub fn enrolled_count(&self) -> usize {
        self.players.len()
    }

    pub fn team_count(&self, team: Team) -> usize {
        self.players.values().filter(|p| p.team == team).count()
    }

    pub fn pool(&self) -> &FlagPool {
        &self.pool
    }

    pub fn config(&self) -> &FlagFootballConfig {
        &self.config
    }
}
