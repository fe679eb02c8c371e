use serde::{Deserialize, Serialize};

use crate::math::Vec3;
use crate::player::Team;

/// Field geometry derived once from marker points placed in the world.
///
/// The field runs along the Z axis. Team A attacks toward `goal_line_a_z`
/// (+Z), team B toward `goal_line_b_z` (-Z).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    pub midfield: Vec3,
    pub goal_line_a_z: f32,
    pub goal_line_b_z: f32,
    pub length: f32,
}

impl FieldGeometry {
    /// Markers are assumed to sit exactly on the goal lines.
    pub fn from_markers(midfield: Vec3, goal_line_a: Vec3, goal_line_b: Vec3) -> Self {
        let length = midfield.distance(goal_line_a) + midfield.distance(goal_line_b);
        tracing::debug!(
            length,
            goal_line_a_z = goal_line_a.z,
            goal_line_b_z = goal_line_b.z,
            "Field geometry derived"
        );
        Self {
            midfield,
            goal_line_a_z: goal_line_a.z,
            goal_line_b_z: goal_line_b.z,
            length,
        }
    }

    /// Whether `position` is past the goal line that `team` attacks.
    pub fn is_inside_end_zone(&self, position: Vec3, team: Team) -> bool {
        match team {
            Team::A => position.z > self.goal_line_a_z,
            Team::B => position.z < self.goal_line_b_z,
        }
    }
}
