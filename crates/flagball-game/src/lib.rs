pub mod config;
pub mod error;
pub mod flags;
pub mod lifecycle;
pub mod pool;
pub mod possession;
pub mod proximity;
pub mod referee;
pub mod scoring;

use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use flagball_core::events::GameEvent;
use flagball_core::feedback::{FeedbackBoard, Notice, NoticeKind};
use flagball_core::field::FieldGeometry;
use flagball_core::field_game_snapshot;
use flagball_core::game_trait::{FieldGame, GameConfig, GameMetadata, PlayerId, PoseFrame};
use flagball_core::math::{Pose, Vec3};
use flagball_core::player::{Player, Role, Team};
use flagball_core::time::{SimClock, Timestamp};

use config::FlagFootballConfig;
use error::FlagError;
use flags::PlayerFlagState;
use lifecycle::{FlagLifecycleManager, FlagRig, PlayFinished, TriggerContact};
use possession::{ClockEvent, GameClockState, PossessionStateMachine, Scoreboard, ScrimmageState, SpotOutcome};
use proximity::PullEvent;
use referee::{GateDecision, RefereeGate, RefereeSpotRequest};
use scoring::ScoreKind;

/// Commands a collaborator can queue for the start of the next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum GameCommand {
    Enroll {
        player_id: PlayerId,
        team: Team,
        pose: Pose,
    },
    Unenroll {
        player_id: PlayerId,
    },
    Pull(PullEvent),
    TriggerEnter(TriggerContact),
    SpotBall {
        position: Vec3,
    },
    ConfirmSpot {
        by: PlayerId,
    },
    OverrideSpot {
        by: PlayerId,
        position: Vec3,
    },
    AddScore {
        team: Team,
        points: i32,
    },
    RecordScore {
        team: Team,
        kind: ScoreKind,
    },
    Turnover,
    ResetDrive {
        team: Team,
        spot: Vec3,
    },
    StartGame,
    StopGame,
}

/// Read-only view of the whole session for presentation collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagFootballSnapshot {
    pub now: Timestamp,
    pub scrimmage: ScrimmageState,
    pub clock: GameClockState,
    pub scores: Scoreboard,
    pub players: Vec<PlayerFlagState>,
    pub referee: Option<PlayerId>,
    pub pending_spot: Option<RefereeSpotRequest>,
    pub notices: Vec<Notice>,
    pub pool_free: usize,
    pub pool_capacity: usize,
}

/// A flag football session: flags, downs, clock and the referee gate,
/// advanced together once per tick.
pub struct FlagFootball {
    config: FlagFootballConfig,
    clock: SimClock,
    flags: FlagLifecycleManager,
    possession: PossessionStateMachine,
    referee: RefereeGate,
    feedback: FeedbackBoard,
    field: Option<FieldGeometry>,
    /// Plays finishing before this instant belong to the last authoritative play.
    play_window_until: Option<Timestamp>,
    command_tx: mpsc::Sender<GameCommand>,
    command_rx: mpsc::Receiver<GameCommand>,
}

impl FlagFootball {
    pub fn new() -> Self {
        Self::with_config(FlagFootballConfig::load())
    }

    pub fn with_config(config: FlagFootballConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        Self {
            clock: SimClock::new(),
            flags: FlagLifecycleManager::new(config.clone()),
            possession: PossessionStateMachine::new(config.clone()),
            referee: RefereeGate::new(config.manual_spotting),
            feedback: FeedbackBoard::new(),
            field: None,
            play_window_until: None,
            command_tx,
            command_rx,
            config,
        }
    }

    pub fn config(&self) -> &FlagFootballConfig {
        &self.config
    }

    fn reconfigure(&mut self, config: FlagFootballConfig) {
        self.flags.reconfigure(config.clone());
        self.possession = PossessionStateMachine::new(config.clone());
        self.possession.set_field(self.field);
        self.referee = RefereeGate::new(config.manual_spotting);
        self.feedback.clear();
        self.play_window_until = None;
        self.config = config;
    }

    /// Host capability for moving pooled flag objects.
    pub fn set_rig(&mut self, rig: Box<dyn FlagRig>) {
        self.flags.set_rig(rig);
    }

    /// Enable touchdown recognition against marker-derived field geometry.
    pub fn set_field(&mut self, field: Option<FieldGeometry>) {
        self.field = field;
        self.possession.set_field(field);
    }

    pub fn designate_referee(&mut self, referee: Option<PlayerId>) {
        self.referee.designate(referee);
    }

    pub fn set_manual_spotting(&mut self, enabled: bool) {
        self.config.manual_spotting = enabled;
        self.referee.set_manual_spotting(enabled);
    }

    /// Sender for commands applied at the start of the next tick.
    pub fn command_sender(&self) -> mpsc::Sender<GameCommand> {
        self.command_tx.clone()
    }

    // ================================================================
    // Tick
    // ================================================================

    /// Advance one simulation tick.
    ///
    /// Order: queued commands, pose sync, detection, flag transitions,
    /// respawn sweep, possession updates, clock.
    pub fn tick(&mut self, dt: f32, poses: &PoseFrame) -> Vec<GameEvent> {
        let now = self.clock.advance(dt);
        let mut events = Vec::new();

        while let Ok(command) = self.command_rx.try_recv() {
            self.apply_command(command, &mut events);
        }

        self.flags.sync_poses(poses);

        let candidates = if self.possession.is_active() {
            self.flags.detect()
        } else {
            Default::default()
        };

        let mut plays = Vec::new();
        for pull in &candidates {
            match self.flags.on_pull_event(pull, now) {
                Ok(play) => {
                    self.record_pull(pull, &play, &mut events);
                    plays.push(play);
                },
                Err(e) => tracing::debug!(error = %e, "Dropped pull candidate"),
            }
        }

        for (carrier, side) in self.flags.respawn_sweep(now) {
            events.push(GameEvent::FlagRespawned { carrier, side });
        }

        for play in plays {
            self.finish_play(play, &mut events);
        }

        for clock_event in self.possession.tick(dt) {
            match clock_event {
                ClockEvent::QuarterEnded(quarter) => {
                    events.push(GameEvent::QuarterEnded { quarter });
                },
                ClockEvent::GameOver => {
                    let scores = self.possession.scores();
                    self.notify(NoticeKind::GameOver, "GAME OVER");
                    events.push(GameEvent::GameOver {
                        score_a: scores.team_a,
                        score_b: scores.team_b,
                    });
                },
            }
        }

        self.feedback.prune(now);
        events
    }

    fn apply_command(&mut self, command: GameCommand, events: &mut Vec<GameEvent>) {
        let result = match command {
            GameCommand::Enroll {
                player_id,
                team,
                pose,
            } => self.enroll_into(player_id, team, pose, events),
            GameCommand::Unenroll { player_id } => {
                self.unenroll_into(player_id, events);
                Ok(())
            },
            GameCommand::Pull(pull) => self.pull_into(&pull, events),
            GameCommand::TriggerEnter(contact) => self
                .flags
                .resolve_contact(contact)
                .and_then(|pull| self.pull_into(&pull, events)),
            GameCommand::SpotBall { position } => self.spot_into(position, events),
            GameCommand::ConfirmSpot { by } => self.confirm_into(by, None, events),
            GameCommand::OverrideSpot { by, position } => {
                self.confirm_into(by, Some(position), events)
            },
            GameCommand::AddScore { team, points } => self.score_into(team, points, events),
            GameCommand::RecordScore { team, kind } => {
                self.score_into(team, kind.points(self.config.touchdown_points), events)
            },
            GameCommand::Turnover => {
                self.turnover_into(events);
                Ok(())
            },
            GameCommand::ResetDrive { team, spot } => {
                self.possession.reset_drive(team, spot);
                Ok(())
            },
            GameCommand::StartGame => {
                self.start_into(events);
                Ok(())
            },
            GameCommand::StopGame => {
                self.stop_into(events);
                Ok(())
            },
        };
        if let Err(e) = result {
            reject(e, events);
        }
    }

    // ================================================================
    // Internal transitions shared by direct calls and queued commands
    // ================================================================

    fn record_pull(&mut self, pull: &PullEvent, play: &PlayFinished, events: &mut Vec<GameEvent>) {
        events.push(GameEvent::FlagPulled {
            carrier: pull.carrier,
            puller: pull.puller,
            side: pull.side,
            position: play.position,
        });
        self.notify(NoticeKind::FlagPulled, "FLAG PULLED!");
    }

    /// De-duplicate, then route through the referee gate to the spot.
    fn finish_play(&mut self, play: PlayFinished, events: &mut Vec<GameEvent>) {
        let now = self.clock.now();
        if let Some(until) = self.play_window_until
            && now < until
        {
            tracing::debug!(
                carrier = play.carrier,
                puller = play.puller,
                "Pull ignored, play already over"
            );
            return;
        }
        self.play_window_until = Some(now.after(self.config.double_pull_window_secs));

        events.push(GameEvent::PlayFinished {
            position: play.position,
            puller: play.puller,
            carrier: play.carrier,
        });

        match self.referee.intercept(&play, now) {
            GateDecision::Apply(position) => {
                if let Err(e) = self.spot_into(position, events) {
                    reject(e, events);
                }
            },
            GateDecision::Held => {
                self.notify(NoticeKind::SpotPending, "Spot pending referee");
                events.push(GameEvent::SpotPending {
                    position: play.position,
                    puller: play.puller,
                    carrier: play.carrier,
                });
            },
        }
    }

    fn enroll_into(
        &mut self,
        player_id: PlayerId,
        team: Team,
        pose: Pose,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), FlagError> {
        self.flags.enroll(player_id, team, pose)?;
        events.push(GameEvent::PlayerEnrolled { player_id, team });
        Ok(())
    }

    fn unenroll_into(&mut self, player_id: PlayerId, events: &mut Vec<GameEvent>) {
        if self.flags.unenroll(player_id) {
            events.push(GameEvent::PlayerUnenrolled { player_id });
        }
    }

    fn pull_into(&mut self, pull: &PullEvent, events: &mut Vec<GameEvent>) -> Result<(), FlagError> {
        if !self.possession.is_active() {
            return Err(FlagError::NotActive);
        }
        let play = self.flags.on_pull_event(pull, self.clock.now())?;
        self.record_pull(pull, &play, events);
        self.finish_play(play, events);
        Ok(())
    }

    fn spot_into(&mut self, position: Vec3, events: &mut Vec<GameEvent>) -> Result<(), FlagError> {
        let outcome = self.possession.spot_ball(position)?;
        let scrimmage = self.possession.scrimmage();
        events.push(GameEvent::BallSpotted {
            position,
            down: scrimmage.current_down,
            possession: scrimmage.possession,
        });
        match outcome {
            SpotOutcome::NextDown { .. } => {},
            SpotOutcome::FirstDown => {
                let event = GameEvent::FirstDown {
                    team: scrimmage.possession,
                    line_to_gain: scrimmage.line_to_gain,
                };
                events.push(event);
                self.notify(NoticeKind::FirstDown, "FIRST DOWN!");
            },
            SpotOutcome::TurnoverOnDowns { to } => {
                events.push(GameEvent::Turnover { to });
                self.notify(NoticeKind::Turnover, "TURNOVER ON DOWNS!");
            },
            SpotOutcome::Touchdown {
                team,
                points,
                total,
            } => {
                events.push(GameEvent::Touchdown { team, points });
                events.push(GameEvent::ScoreChanged {
                    team,
                    points,
                    total,
                });
                self.notify(NoticeKind::Touchdown, format!("TOUCHDOWN {team}!"));
            },
        }
        Ok(())
    }

    fn confirm_into(
        &mut self,
        by: PlayerId,
        position: Option<Vec3>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), FlagError> {
        if !self.possession.is_active() {
            return Err(FlagError::NotActive);
        }
        let request = match position {
            Some(position) => self.referee.override_spot(by, position)?,
            None => self.referee.confirm_spot(by)?,
        };
        tracing::info!(referee = by, position = %request.pending_position, "Spot confirmed");
        self.spot_into(request.pending_position, events)
    }

    fn score_into(
        &mut self,
        team: Team,
        points: i32,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), FlagError> {
        let total = self.possession.add_score(team, points)?;
        events.push(GameEvent::ScoreChanged {
            team,
            points,
            total,
        });
        Ok(())
    }

    fn turnover_into(&mut self, events: &mut Vec<GameEvent>) {
        let to = self.possession.turnover();
        events.push(GameEvent::Turnover { to });
    }

    fn start_into(&mut self, events: &mut Vec<GameEvent>) {
        self.possession.start_game();
        self.referee.clear();
        self.feedback.clear();
        self.play_window_until = None;
        events.push(GameEvent::GameStarted);
    }

    fn stop_into(&mut self, events: &mut Vec<GameEvent>) {
        self.possession.stop_game();
        events.push(GameEvent::GameStopped);
    }

    fn notify(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.feedback
            .push(kind, text, self.clock.now(), self.config.notice_secs);
    }

    // ================================================================
    // Direct commands (outside a tick, applied immediately)
    // ================================================================

    pub fn enroll(
        &mut self,
        player_id: PlayerId,
        team: Team,
        pose: Pose,
    ) -> Result<Vec<GameEvent>, FlagError> {
        let mut events = Vec::new();
        self.enroll_into(player_id, team, pose, &mut events)?;
        Ok(events)
    }

    pub fn unenroll(&mut self, player_id: PlayerId) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.unenroll_into(player_id, &mut events);
        events
    }

    /// Apply a pull reported by the host's collision signal.
    pub fn on_pull_event(&mut self, pull: PullEvent) -> Result<Vec<GameEvent>, FlagError> {
        let mut events = Vec::new();
        self.pull_into(&pull, &mut events)?;
        Ok(events)
    }

    /// Apply a trigger-enter pair from the host.
    pub fn on_trigger_enter(&mut self, contact: TriggerContact) -> Result<Vec<GameEvent>, FlagError> {
        let pull = self.flags.resolve_contact(contact)?;
        self.on_pull_event(pull)
    }

    /// Spot the ball directly, bypassing the referee gate.
    pub fn spot_ball(&mut self, position: Vec3) -> Result<Vec<GameEvent>, FlagError> {
        let mut events = Vec::new();
        self.spot_into(position, &mut events)?;
        Ok(events)
    }

    pub fn confirm_spot(&mut self, by: PlayerId) -> Result<Vec<GameEvent>, FlagError> {
        let mut events = Vec::new();
        self.confirm_into(by, None, &mut events)?;
        Ok(events)
    }

    pub fn override_spot(
        &mut self,
        by: PlayerId,
        position: Vec3,
    ) -> Result<Vec<GameEvent>, FlagError> {
        let mut events = Vec::new();
        self.confirm_into(by, Some(position), &mut events)?;
        Ok(events)
    }

    pub fn add_score(&mut self, team: Team, points: i32) -> Result<Vec<GameEvent>, FlagError> {
        let mut events = Vec::new();
        self.score_into(team, points, &mut events)?;
        Ok(events)
    }

    pub fn record_score(&mut self, team: Team, kind: ScoreKind) -> Result<Vec<GameEvent>, FlagError> {
        self.add_score(team, kind.points(self.config.touchdown_points))
    }

    pub fn turnover(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.turnover_into(&mut events);
        events
    }

    pub fn reset_drive(&mut self, team: Team, spot: Vec3) {
        self.possession.reset_drive(team, spot);
    }

    pub fn start_game(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.start_into(&mut events);
        events
    }

    pub fn stop_game(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.stop_into(&mut events);
        events
    }

    // ================================================================
    // Read-only queries
    // ================================================================

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn scrimmage_state(&self) -> &ScrimmageState {
        self.possession.scrimmage()
    }

    pub fn clock_state(&self) -> &GameClockState {
        self.possession.clock()
    }

    pub fn flag_state(&self, player_id: PlayerId) -> Option<&PlayerFlagState> {
        self.flags.flag_state(player_id)
    }

    pub fn flags(&self) -> &FlagLifecycleManager {
        &self.flags
    }

    pub fn scores(&self) -> Scoreboard {
        self.possession.scores()
    }

    pub fn pending_spot(&self) -> Option<&RefereeSpotRequest> {
        self.referee.pending()
    }

    pub fn referee(&self) -> Option<PlayerId> {
        self.referee.referee()
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.feedback.active(self.clock.now())
    }

    pub fn scoreboard_text(&self) -> String {
        self.possession.scoreboard_text()
    }

    pub fn down_marker_text(&self) -> String {
        self.possession.down_marker_text()
    }

    pub fn snapshot(&self) -> FlagFootballSnapshot {
        FlagFootballSnapshot {
            now: self.clock.now(),
            scrimmage: self.possession.scrimmage().clone(),
            clock: self.possession.clock().clone(),
            scores: self.possession.scores(),
            players: self.flags.players().cloned().collect(),
            referee: self.referee.referee(),
            pending_spot: self.referee.pending().copied(),
            notices: self.notices().cloned().collect(),
            pool_free: self.flags.pool().free(),
            pool_capacity: self.flags.pool().capacity(),
        }
    }
}

impl Default for FlagFootball {
    fn default() -> Self {
        Self::with_config(FlagFootballConfig::default())
    }
}

fn reject(error: FlagError, events: &mut Vec<GameEvent>) {
    match error {
        FlagError::StaleEvent { .. } | FlagError::StaleContact { .. } => {
            tracing::debug!(error = %error, "Ignored stale event")
        },
        _ => tracing::warn!(error = %error, "Command rejected"),
    }
    events.push(GameEvent::CommandRejected {
        reason: error.to_string(),
    });
}

impl FieldGame for FlagFootball {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Flag Football".to_string(),
            description: "Pull a flag to end the play. Four downs to gain the line.".to_string(),
            min_players: 2,
            max_players: u8::try_from(self.config.max_players).unwrap_or(u8::MAX),
            estimated_game_duration: Duration::from_secs_f32(
                self.config.game_duration_secs().max(0.0),
            ),
        }
    }

    fn tick_rate(&self) -> f32 {
        self.config.tick_rate
    }

    /// Rebuilds the session from `players` and starts the game. A rig set
    /// earlier is kept.
    fn init(&mut self, players: &[Player], config: &GameConfig) {
        let mut session_config = self.config.clone();
        session_config.game_duration_minutes = config.game_duration.as_secs_f32() / 60.0;
        session_config.apply_overrides(&config.custom);
        self.reconfigure(session_config);

        for player in players {
            self.player_joined(player);
        }
        self.start_game();
    }

    fn update(&mut self, dt: f32, poses: &PoseFrame) -> Vec<GameEvent> {
        self.tick(dt, poses)
    }

    field_game_snapshot!();

    /// Team joiners are enrolled at the origin and keep that pose until a
    /// frame carries them, so hosts should tick with every enrolled player.
    fn player_joined(&mut self, player: &Player) {
        match player.role {
            Role::Team(team) => {
                if self.referee.referee() == Some(player.id) {
                    self.referee.designate(None);
                }
                if let Err(e) = self.flags.enroll(player.id, team, Pose::default()) {
                    tracing::warn!(player_id = player.id, error = %e, "Enrollment refused");
                }
            },
            Role::Referee => {
                self.flags.unenroll(player.id);
                self.referee.designate(Some(player.id));
            },
            Role::Spectator => {
                self.flags.unenroll(player.id);
                if self.referee.referee() == Some(player.id) {
                    self.referee.designate(None);
                }
            },
        }
    }

    fn player_left(&mut self, player_id: PlayerId) {
        self.flags.unenroll(player_id);
        if self.referee.referee() == Some(player_id) {
            self.referee.designate(None);
        }
    }
}
