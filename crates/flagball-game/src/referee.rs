use serde::{Deserialize, Serialize};

use flagball_core::game_trait::PlayerId;
use flagball_core::math::Vec3;
use flagball_core::time::Timestamp;

use crate::error::FlagError;
use crate::lifecycle::PlayFinished;

/// A play end waiting for the referee's confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefereeSpotRequest {
    pub pending_position: Vec3,
    pub puller: PlayerId,
    pub carrier: PlayerId,
    pub requested_at: Timestamp,
}

/// Where a finished play goes next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// Spot the ball here now.
    Apply(Vec3),
    /// Held for the referee.
    Held,
}

/// Optional manual-spotting stage between play end and `spot_ball`.
#[derive(Debug, Clone, Default)]
pub struct RefereeGate {
    manual_spotting: bool,
    referee: Option<PlayerId>,
    pending: Option<RefereeSpotRequest>,
}

impl RefereeGate {
    pub fn new(manual_spotting: bool) -> Self {
        Self {
            manual_spotting,
            ..Self::default()
        }
    }

    pub fn manual_spotting(&self) -> bool {
        self.manual_spotting
    }

    /// Turning manual spotting off drops any spot still waiting for the referee.
    pub fn set_manual_spotting(&mut self, enabled: bool) {
        self.manual_spotting = enabled;
        if !enabled && let Some(dropped) = self.pending.take() {
            tracing::info!(position = %dropped.pending_position, "Pending spot discarded");
        }
    }

    pub fn designate(&mut self, referee: Option<PlayerId>) {
        self.referee = referee;
        tracing::info!(referee = ?referee, "Referee designated");
    }

    pub fn referee(&self) -> Option<PlayerId> {
        self.referee
    }

    pub fn pending(&self) -> Option<&RefereeSpotRequest> {
        self.pending.as_ref()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Pass the play through, or hold it as the single pending request.
    /// A newer play replaces an unconfirmed one.
    pub fn intercept(&mut self, play: &PlayFinished, now: Timestamp) -> GateDecision {
        if !self.manual_spotting {
            return GateDecision::Apply(play.position);
        }
        if let Some(old) = self.pending.replace(RefereeSpotRequest {
            pending_position: play.position,
            puller: play.puller,
            carrier: play.carrier,
            requested_at: now,
        }) {
            tracing::debug!(
                superseded = %old.pending_position,
                position = %play.position,
                "Pending spot superseded"
            );
        }
        GateDecision::Held
    }

    fn authorize(&self, by: PlayerId) -> Result<(), FlagError> {
        if self.referee == Some(by) {
            Ok(())
        } else {
            tracing::warn!(player_id = by, "Rejected referee command from non-referee");
            Err(FlagError::InvalidRole { player_id: by })
        }
    }

    /// Release the pending spot as recorded.
    pub fn confirm_spot(&mut self, by: PlayerId) -> Result<RefereeSpotRequest, FlagError> {
        self.authorize(by)?;
        self.pending.take().ok_or(FlagError::NoPendingSpot)
    }

    /// Release the pending spot at a referee-chosen position instead.
    pub fn override_spot(
        &mut self,
        by: PlayerId,
        position: Vec3,
    ) -> Result<RefereeSpotRequest, FlagError> {
        self.authorize(by)?;
        let mut request = self.pending.take().ok_or(FlagError::NoPendingSpot)?;
        request.pending_position = position;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(z: f32) -> PlayFinished {
        PlayFinished {
            position: Vec3::new(0.0, 0.0, z),
            puller: 2,
            carrier: 1,
        }
    }

    #[test]
    fn auto_mode_applies_immediately() {
        let mut gate = RefereeGate::new(false);
        assert_eq!(
            gate.intercept(&play(5.0), Timestamp(0.0)),
            GateDecision::Apply(Vec3::new(0.0, 0.0, 5.0))
        );
        assert!(gate.pending().is_none());
    }

    #[test]
    fn manual_mode_holds_latest_play() {
        let mut gate = RefereeGate::new(true);
        gate.designate(Some(9));
        assert_eq!(gate.intercept(&play(5.0), Timestamp(0.0)), GateDecision::Held);
        assert_eq!(gate.intercept(&play(8.0), Timestamp(1.0)), GateDecision::Held);

        let request = gate.confirm_spot(9).unwrap();
        assert_eq!(request.pending_position.z, 8.0);
        assert!(gate.pending().is_none());
        assert_eq!(gate.confirm_spot(9), Err(FlagError::NoPendingSpot));
    }

    #[test]
    fn only_referee_may_confirm() {
        let mut gate = RefereeGate::new(true);
        gate.designate(Some(9));
        gate.intercept(&play(5.0), Timestamp(0.0));
        assert_eq!(
            gate.confirm_spot(1),
            Err(FlagError::InvalidRole { player_id: 1 })
        );
        assert!(gate.pending().is_some(), "rejected confirm keeps the request");
    }

    #[test]
    fn no_referee_means_no_one_confirms() {
        let mut gate = RefereeGate::new(true);
        gate.intercept(&play(5.0), Timestamp(0.0));
        assert!(matches!(gate.confirm_spot(1), Err(FlagError::InvalidRole { .. })));
    }

    #[test]
    fn disabling_manual_spotting_drops_pending_request() {
        let mut gate = RefereeGate::new(true);
        gate.designate(Some(9));
        gate.intercept(&play(5.0), Timestamp(0.0));

        gate.set_manual_spotting(false);

        assert!(!gate.manual_spotting());
        assert!(gate.pending().is_none());
        assert_eq!(gate.confirm_spot(9), Err(FlagError::NoPendingSpot));
        assert_eq!(
            gate.intercept(&play(7.0), Timestamp(1.0)),
            GateDecision::Apply(Vec3::new(0.0, 0.0, 7.0))
        );
    }

    #[test]
    fn override_moves_the_spot() {
        let mut gate = RefereeGate::new(true);
        gate.designate(Some(9));
        gate.intercept(&play(5.0), Timestamp(0.0));
        let request = gate.override_spot(9, Vec3::new(0.0, 0.0, 3.0)).unwrap();
        assert_eq!(request.pending_position.z, 3.0);
        assert_eq!(request.carrier, 1);
    }
}
