use serde::{Deserialize, Serialize};

/// Points for a conversion from short range.
pub const EXTRA_POINT_SHORT: i32 = 1;
/// Points for a conversion from long range.
pub const EXTRA_POINT_LONG: i32 = 2;
/// Points for tackling the carrier in their own end zone.
pub const SAFETY_POINTS: i32 = 2;

/// Kinds of scoring plays a collaborator can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreKind {
    Touchdown,
    ExtraPointShort,
    ExtraPointLong,
    Safety,
}

impl ScoreKind {
    /// Point value; touchdowns are configurable.
    pub fn points(self, touchdown_points: i32) -> i32 {
        match self {
            ScoreKind::Touchdown => touchdown_points,
            ScoreKind::ExtraPointShort => EXTRA_POINT_SHORT,
            ScoreKind::ExtraPointLong => EXTRA_POINT_LONG,
            ScoreKind::Safety => SAFETY_POINTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touchdown_uses_configured_value() {
        assert_eq!(ScoreKind::Touchdown.points(6), 6);
        assert_eq!(ScoreKind::Touchdown.points(7), 7);
    }

    #[test]
    fn fixed_values() {
        assert_eq!(ScoreKind::ExtraPointShort.points(6), 1);
        assert_eq!(ScoreKind::ExtraPointLong.points(6), 2);
        assert_eq!(ScoreKind::Safety.points(6), 2);
    }
}
