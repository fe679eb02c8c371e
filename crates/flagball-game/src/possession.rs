use serde::{Deserialize, Serialize};

use flagball_core::field::FieldGeometry;
use flagball_core::math::Vec3;
use flagball_core::player::Team;

use crate::config::FlagFootballConfig;
use crate::error::FlagError;

/// Downs allowed before possession changes.
pub const MAX_DOWNS: u8 = 4;

/// Down and distance for the team in possession.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrimmageState {
    pub possession: Team,
    pub current_down: u8,
    pub line_of_scrimmage: Vec3,
    pub line_to_gain: Vec3,
    pub yards_to_go: f32,
}

/// Game clock. Ticks down only while active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameClockState {
    pub is_active: bool,
    pub quarter: u8,
    pub time_remaining_secs: f32,
    /// Cumulative active time integrated from tick deltas.
    pub elapsed_secs: f64,
    pub is_game_over: bool,
}

/// Running totals per team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub team_a: i32,
    pub team_b: i32,
}

impl Scoreboard {
    pub fn get(&self, team: Team) -> i32 {
        match team {
            Team::A => self.team_a,
            Team::B => self.team_b,
        }
    }

    fn add(&mut self, team: Team, points: i32) -> i32 {
        let total = match team {
            Team::A => &mut self.team_a,
            Team::B => &mut self.team_b,
        };
        *total += points;
        *total
    }
}

/// What a spot did to the drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpotOutcome {
    FirstDown,
    NextDown { down: u8 },
    TurnoverOnDowns { to: Team },
    Touchdown { team: Team, points: i32, total: i32 },
}

/// Clock transitions produced by `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    QuarterEnded(u8),
    GameOver,
}

/// Owns down/distance, possession, the game clock, and the score.
pub struct PossessionStateMachine {
    config: FlagFootballConfig,
    field: Option<FieldGeometry>,
    scrimmage: ScrimmageState,
    clock: GameClockState,
    scores: Scoreboard,
}

impl PossessionStateMachine {
    pub fn new(config: FlagFootballConfig) -> Self {
        let spot = config.initial_spot;
        let mut machine = Self {
            clock: GameClockState {
                is_active: false,
                quarter: 1,
                time_remaining_secs: config.game_duration_secs(),
                elapsed_secs: 0.0,
                is_game_over: false,
            },
            scrimmage: ScrimmageState {
                possession: Team::A,
                current_down: 1,
                line_of_scrimmage: spot,
                line_to_gain: spot,
                yards_to_go: 0.0,
            },
            scores: Scoreboard::default(),
            field: None,
            config,
        };
        machine.reset_drive(Team::A, spot);
        machine
    }

    /// Enable touchdown recognition against the given field.
    pub fn set_field(&mut self, field: Option<FieldGeometry>) {
        self.field = field;
    }

    pub fn scrimmage(&self) -> &ScrimmageState {
        &self.scrimmage
    }

    pub fn clock(&self) -> &GameClockState {
        &self.clock
    }

    pub fn scores(&self) -> Scoreboard {
        self.scores
    }

    pub fn is_active(&self) -> bool {
        self.clock.is_active
    }

    /// Reset score, clock and drive, then start the clock.
    pub fn start_game(&mut self) {
        self.scores = Scoreboard::default();
        self.clock = GameClockState {
            is_active: true,
            quarter: 1,
            time_remaining_secs: self.config.game_duration_secs(),
            elapsed_secs: 0.0,
            is_game_over: false,
        };
        self.reset_drive(Team::A, self.config.initial_spot);
        tracing::info!("Game started");
    }

    pub fn stop_game(&mut self) {
        self.clock.is_active = false;
        tracing::info!(
            time_remaining = self.clock.time_remaining_secs,
            "Game stopped"
        );
    }

    /// Give `team` a fresh set of downs starting at `spot`.
    pub fn reset_drive(&mut self, team: Team, spot: Vec3) {
        self.scrimmage.possession = team;
        self.scrimmage.line_of_scrimmage = spot;
        self.scrimmage.current_down = 1;
        self.recompute_line_to_gain();
    }

    fn recompute_line_to_gain(&mut self) {
        let direction = self.scrimmage.possession.forward_sign();
        self.scrimmage.line_to_gain = self
            .scrimmage
            .line_of_scrimmage
            .along_field(self.config.yards_for_first_down * direction);
        self.update_yards_to_go();
    }

    fn update_yards_to_go(&mut self) {
        let s = &mut self.scrimmage;
        let to_go = (s.line_to_gain.z - s.line_of_scrimmage.z) * s.possession.forward_sign();
        s.yards_to_go = to_go.max(0.0);
    }

    fn reached_line_to_gain(&self, position: Vec3) -> bool {
        match self.scrimmage.possession {
            Team::A => position.z >= self.scrimmage.line_to_gain.z,
            Team::B => position.z <= self.scrimmage.line_to_gain.z,
        }
    }

    /// Move the line of scrimmage to where the play ended and advance downs.
    pub fn spot_ball(&mut self, position: Vec3) -> Result<SpotOutcome, FlagError> {
        if !self.clock.is_active {
            return Err(FlagError::NotActive);
        }
        if !position.is_finite() {
            return Err(FlagError::InvalidSpot);
        }

        self.scrimmage.line_of_scrimmage = position;
        let offense = self.scrimmage.possession;

        if let Some(field) = &self.field
            && field.is_inside_end_zone(position, offense)
        {
            let points = self.config.touchdown_points;
            let total = self.scores.add(offense, points);
            self.scrimmage.current_down = 1;
            self.recompute_line_to_gain();
            tracing::info!(team = %offense, points, total, "Touchdown");
            return Ok(SpotOutcome::Touchdown {
                team: offense,
                points,
                total,
            });
        }

        if self.reached_line_to_gain(position) {
            self.scrimmage.current_down = 1;
            self.recompute_line_to_gain();
            tracing::info!(team = %offense, line_to_gain = %self.scrimmage.line_to_gain, "First down");
            return Ok(SpotOutcome::FirstDown);
        }

        self.scrimmage.current_down += 1;
        if self.scrimmage.current_down > MAX_DOWNS {
            let to = self.turnover();
            return Ok(SpotOutcome::TurnoverOnDowns { to });
        }
        self.update_yards_to_go();
        tracing::debug!(
            team = %offense,
            down = self.scrimmage.current_down,
            yards_to_go = self.scrimmage.yards_to_go,
            "Ball spotted"
        );
        Ok(SpotOutcome::NextDown {
            down: self.scrimmage.current_down,
        })
    }

    /// Flip possession at the current line of scrimmage. Returns the new offense.
    pub fn turnover(&mut self) -> Team {
        let to = self.scrimmage.possession.opponent();
        self.reset_drive(to, self.scrimmage.line_of_scrimmage);
        tracing::info!(to = %to, "Turnover");
        to
    }

    /// Add points to a team's total. Possession is left alone.
    pub fn add_score(&mut self, team: Team, points: i32) -> Result<i32, FlagError> {
        if !self.clock.is_active {
            return Err(FlagError::NotActive);
        }
        let total = self.scores.add(team, points);
        tracing::info!(team = %team, points, total, "Score");
        Ok(total)
    }

    /// Run the clock down by `dt`. No catch-up for missed ticks.
    pub fn tick(&mut self, dt: f32) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        if !self.clock.is_active || !dt.is_finite() || dt <= 0.0 {
            return events;
        }

        self.clock.elapsed_secs += f64::from(dt);
        self.clock.time_remaining_secs -= dt;

        if self.clock.time_remaining_secs <= 0.0 {
            self.clock.time_remaining_secs = 0.0;
            self.clock.is_active = false;
            self.clock.is_game_over = true;
            let last = self.quarters();
            for quarter in self.clock.quarter..=last {
                events.push(ClockEvent::QuarterEnded(quarter));
            }
            self.clock.quarter = last;
            events.push(ClockEvent::GameOver);
            tracing::info!(
                score_a = self.scores.team_a,
                score_b = self.scores.team_b,
                "Game over"
            );
            return events;
        }

        let quarter = self.quarter_for(self.clock.time_remaining_secs);
        while self.clock.quarter < quarter {
            events.push(ClockEvent::QuarterEnded(self.clock.quarter));
            self.clock.quarter += 1;
        }
        events
    }

    fn quarters(&self) -> u8 {
        self.config.quarters.max(1)
    }

    fn quarter_for(&self, remaining: f32) -> u8 {
        let quarters = self.quarters();
        let length = self.config.game_duration_secs() / f32::from(quarters);
        if length <= 0.0 {
            return quarters;
        }
        // The current quarter is the first whose later periods do not cover `remaining`.
        (1..=quarters)
            .find(|&q| remaining > length * f32::from(quarters - q))
            .unwrap_or(quarters)
    }

    /// `HOME: a | GUEST: b` / `Q1 - 12:34`
    pub fn scoreboard_text(&self) -> String {
        format!(
            "{}: {} | {}: {}\nQ{} - {}",
            Team::A.scoreboard_name(),
            self.scores.team_a,
            Team::B.scoreboard_name(),
            self.scores.team_b,
            self.clock.quarter,
            format_clock(self.clock.time_remaining_secs)
        )
    }

    /// `Down: n` / `Possession: TeamA`
    pub fn down_marker_text(&self) -> String {
        format!(
            "Down: {}\nPossession: {}",
            self.scrimmage.current_down, self.scrimmage.possession
        )
    }
}

/// `m:ss`, truncating fractional seconds.
pub fn format_clock(seconds: f32) -> String {
    let total = seconds.max(0.0) as u32;
    format!("{}:{:02}", total / 60, total % 60)
}
