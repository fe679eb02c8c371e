use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use flagball_core::events::FlagSide;
use flagball_core::game_trait::PlayerId;
use flagball_core::math::{Pose, Vec3};

use crate::config::FlagFootballConfig;
use crate::flags::PlayerFlagState;

/// A candidate flag pull found by the detector. Validity is decided by the
/// lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PullEvent {
    pub carrier: PlayerId,
    pub side: FlagSide,
    pub puller: PlayerId,
    pub position: Vec3,
}

/// Pull candidates for one tick. Rarely more than a couple.
pub type PullEvents = SmallVec<[PullEvent; 4]>;

/// World position of a hip flag for a carrier standing at `pose`.
pub fn flag_world_position(pose: &Pose, side: FlagSide, config: &FlagFootballConfig) -> Vec3 {
    pose.local_to_world(config.flag_offset(side.lateral_sign()))
}

/// Distance on the ground plane. Flag height does not matter for reach.
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

/// Nearest opponent strictly within `threshold` of `target`.
/// Ties go to the lowest player id.
pub fn nearest_opponent<'a>(
    target: Vec3,
    opponents: impl Iterator<Item = &'a PlayerFlagState>,
    threshold: f32,
) -> Option<(PlayerId, f32)> {
    let mut best: Option<(PlayerId, f32)> = None;
    for opp in opponents {
        let dist = planar_distance(opp.pose.position, target);
        if dist >= threshold {
            continue;
        }
        best = match best {
            Some((id, d)) if d < dist || (d == dist && id < opp.player_id) => Some((id, d)),
            _ => Some((opp.player_id, dist)),
        };
    }
    best
}

/// Scan every carrier with an attached flag against every opponent.
///
/// `players` must iterate in a stable order (ascending id); events come out
/// carrier by carrier, left slot before right. Nothing is mutated.
pub fn detect_pulls<'a, I>(players: I, config: &FlagFootballConfig) -> PullEvents
where
    I: IntoIterator<Item = &'a PlayerFlagState> + Clone,
{
    let mut events = PullEvents::new();

    for carrier in players.clone() {
        if !carrier.has_attached() {
            continue;
        }
        for side in FlagSide::BOTH {
            let slot = carrier.slot(side);
            if !slot.is_attached() {
                continue;
            }
            let target = flag_world_position(&carrier.pose, side, config);
            let opponents = players
                .clone()
                .into_iter()
                .filter(|p| p.team != carrier.team && p.player_id != carrier.player_id);
            if let Some((puller, _)) = nearest_opponent(target, opponents, config.pull_distance) {
                events.push(PullEvent {
                    carrier: carrier.player_id,
                    side,
                    puller,
                    position: target,
                });
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use flagball_core::player::Team;

    use super::*;
    use crate::flags::FlagSlot;
    use crate::pool::FlagHandle;

    fn player(id: PlayerId, team: Team, x: f32, z: f32) -> PlayerFlagState {
        let config = FlagFootballConfig::default();
        let pose = Pose::at(x, z);
        let h = id as u32 * 2;
        PlayerFlagState {
            player_id: id,
            team,
            pose,
            left: FlagSlot::attached(id, FlagSide::Left, FlagHandle(h), &pose, &config),
            right: FlagSlot::attached(id, FlagSide::Right, FlagHandle(h + 1), &pose, &config),
        }
    }

    fn roster(players: Vec<PlayerFlagState>) -> BTreeMap<PlayerId, PlayerFlagState> {
        players.into_iter().map(|p| (p.player_id, p)).collect()
    }

    #[test]
    fn planar_distance_ignores_height() {
        let d = planar_distance(Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 9.0, 4.0));
        assert!((d - 5.0).abs() < 1e-5);
    }

    #[test]
    fn opponent_near_left_hip_pulls_left() {
        let config = FlagFootballConfig::default();
        // Carrier faces +Z, left hip at x = -0.3.
        let players = roster(vec![
            player(1, Team::A, 0.0, 0.0),
            player(2, Team::B, -0.5, 0.0),
        ]);
        let events: Vec<_> = detect_pulls(players.values(), &config)
            .into_iter()
            .filter(|e| e.carrier == 1)
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].side, FlagSide::Left);
        assert_eq!(events[0].puller, 2);
    }

    #[test]
    fn teammates_never_pull() {
        let config = FlagFootballConfig::default();
        let players = roster(vec![
            player(1, Team::A, 0.0, 0.0),
            player(3, Team::A, 0.0, 0.0),
        ]);
        assert!(detect_pulls(players.values(), &config).is_empty());
    }

    #[test]
    fn opponent_at_threshold_does_not_pull() {
        let config = FlagFootballConfig::default();
        // Right hip at x = 0.3; opponent exactly pull_distance away.
        let players = roster(vec![
            player(1, Team::A, 0.0, 0.0),
            player(2, Team::B, 0.3 + config.pull_distance, 0.0),
        ]);
        let events = detect_pulls(players.values(), &config);
        assert!(events.iter().all(|e| e.carrier != 1));
    }

    #[test]
    fn both_slots_reported_left_first() {
        let config = FlagFootballConfig::default();
        let players = roster(vec![
            player(1, Team::A, 0.0, 0.0),
            player(2, Team::B, -0.4, 0.0),
            player(4, Team::B, 0.4, 0.0),
        ]);
        let events: Vec<_> = detect_pulls(players.values(), &config)
            .into_iter()
            .filter(|e| e.carrier == 1)
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!((events[0].side, events[0].puller), (FlagSide::Left, 2));
        assert_eq!((events[1].side, events[1].puller), (FlagSide::Right, 4));
    }

    #[test]
    fn pulled_slot_is_not_rescanned() {
        let config = FlagFootballConfig::default();
        let mut players = roster(vec![
            player(1, Team::A, 0.0, 0.0),
            player(2, Team::B, -0.5, 0.0),
        ]);
        if let Some(p) = players.get_mut(&1) {
            p.left.pull(2, flagball_core::time::Timestamp(0.0));
        }
        let events = detect_pulls(players.values(), &config);
        assert!(events.iter().all(|e| !(e.carrier == 1 && e.side == FlagSide::Left)));
    }

    #[test]
    fn nearest_opponent_wins() {
        let target = Vec3::new(0.0, 0.0, 0.0);
        let a = player(5, Team::B, 0.5, 0.0);
        let b = player(6, Team::B, 0.2, 0.0);
        let found = nearest_opponent(target, [&a, &b].into_iter(), 0.6);
        assert_eq!(found.map(|(id, _)| id), Some(6));
    }
}
