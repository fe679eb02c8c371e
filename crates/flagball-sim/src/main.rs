use std::collections::HashMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

use flagball_core::events::GameEvent;
use flagball_core::field::FieldGeometry;
use flagball_core::game_trait::{FieldGame, GameConfig, PlayerId, PoseFrame};
use flagball_core::math::{Pose, Vec3};
use flagball_core::player::{Player, Role, Team};
use flagball_game::{FlagFootball, GameCommand};

const REFEREE_ID: PlayerId = 100;
const HALF_FIELD: f32 = 50.0;
const CARRIER_SPEED: f32 = 6.0;
const DEFENDER_SPEED: f32 = 5.5;
const JOG_SPEED: f32 = 2.0;
/// Seconds the referee takes to confirm a held spot.
const REFEREE_DELAY_SECS: f32 = 1.0;

struct Args {
    ticks: usize,
    players: usize,
    seed: u64,
    manual: bool,
}

fn arg<T: std::str::FromStr>(prefix: &str) -> Option<T> {
    std::env::args()
        .skip(1)
        .find_map(|a| a.strip_prefix(prefix).map(String::from))
        .and_then(|v| v.parse::<T>().ok())
}

fn parse_args() -> Args {
    Args {
        ticks: arg::<usize>("--ticks=").unwrap_or(9000),
        players: arg::<usize>("--players=").unwrap_or(8).max(2),
        seed: arg::<u64>("--seed=").unwrap_or(7),
        manual: std::env::args().any(|a| a == "--manual"),
    }
}

/// A simulated participant: ball carrier, pursuer or bystander depending on
/// which team has the ball.
struct Runner {
    id: PlayerId,
    team: Team,
    pose: Pose,
}

impl Runner {
    fn step_towards(&mut self, target: Vec3, speed: f32, dt: f32) {
        let delta = target - self.pose.position;
        let dist = Vec3::new(delta.x, 0.0, delta.z).length();
        if dist < 1e-3 {
            return;
        }
        let step = (speed * dt).min(dist);
        let dir = Vec3::new(delta.x / dist, 0.0, delta.z / dist);
        self.pose.position = self.pose.position + dir * step;
        self.pose.heading = dir.x.atan2(dir.z);
    }
}

struct Sim {
    game: FlagFootball,
    runners: Vec<Runner>,
    rng: StdRng,
    /// Remaining huddle time before the next snap.
    huddle_secs: f32,
    /// Remaining time before the referee confirms a held spot.
    confirm_in: Option<f32>,
}

impl Sim {
    fn new(args: &Args) -> Self {
        let mut game = FlagFootball::new();
        game.set_field(Some(FieldGeometry::from_markers(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, HALF_FIELD),
            Vec3::new(0.0, 0.0, -HALF_FIELD),
        )));

        let mut players: Vec<Player> = (0..args.players)
            .map(|i| {
                let team = if i % 2 == 0 { Team::A } else { Team::B };
                Player::new(i as PlayerId + 1, format!("Player{}", i + 1), Role::Team(team))
            })
            .collect();
        if args.manual {
            players.push(Player::new(REFEREE_ID, "Referee", Role::Referee));
        }

        let config = GameConfig {
            game_duration: Duration::from_secs_f32(game.config().game_duration_secs().max(0.0)),
            custom: HashMap::new(),
        };
        game.init(&players, &config);
        game.set_manual_spotting(args.manual);

        let runners = players
            .iter()
            .filter_map(|p| {
                p.team().map(|team| Runner {
                    id: p.id,
                    team,
                    pose: Pose::default(),
                })
            })
            .collect();

        let mut sim = Self {
            game,
            runners,
            rng: StdRng::seed_from_u64(args.seed),
            huddle_secs: 0.0,
            confirm_in: None,
        };
        sim.line_up();
        sim
    }

    /// Offense just behind the line of scrimmage, defense a few yards off it.
    fn line_up(&mut self) {
        let scrimmage = self.game.scrimmage_state();
        let los = scrimmage.line_of_scrimmage.z;
        let offense = scrimmage.possession;
        let forward = offense.forward_sign();
        let mut slots = HashMap::new();
        for runner in &mut self.runners {
            let slot = slots.entry(runner.team).or_insert(0u8);
            let x = f32::from(*slot) * 4.0 - 8.0;
            *slot += 1;
            let (z, heading) = if runner.team == offense {
                (los - 2.0 * forward, if forward > 0.0 { 0.0 } else { std::f32::consts::PI })
            } else {
                (los + 5.0 * forward, if forward > 0.0 { std::f32::consts::PI } else { 0.0 })
            };
            runner.pose = Pose {
                position: Vec3::new(x, 0.0, z.clamp(-HALF_FIELD - 5.0, HALF_FIELD + 5.0)),
                heading,
            };
        }
    }

    fn carrier(&self) -> Option<usize> {
        let offense = self.game.scrimmage_state().possession;
        self.runners.iter().position(|r| r.team == offense)
    }

    fn move_runners(&mut self, dt: f32) {
        if self.huddle_secs > 0.0 {
            self.huddle_secs -= dt;
            return;
        }
        let Some(carrier) = self.carrier() else {
            return;
        };
        let offense = self.runners[carrier].team;
        let forward = offense.forward_sign();

        let weave = self.rng.random_range(-4.0..4.0);
        let goal = self.runners[carrier].pose.position + Vec3::new(weave, 0.0, 10.0 * forward);
        self.runners[carrier].step_towards(goal, CARRIER_SPEED, dt);
        let target = self.runners[carrier].pose.position;

        for (i, runner) in self.runners.iter_mut().enumerate() {
            if i == carrier {
                continue;
            }
            if runner.team == offense {
                let jog = Vec3::new(
                    self.rng.random_range(-1.0..1.0),
                    0.0,
                    self.rng.random_range(-1.0..1.0),
                );
                runner.step_towards(runner.pose.position + jog, JOG_SPEED, dt);
            } else {
                let noise = Vec3::new(self.rng.random_range(-0.5..0.5), 0.0, 0.0);
                runner.step_towards(target + noise, DEFENDER_SPEED, dt);
            }
        }
    }

    fn poses(&self) -> PoseFrame {
        let mut frame = PoseFrame::new();
        for runner in &self.runners {
            frame.set(runner.id, runner.pose);
        }
        frame
    }

    fn step(&mut self, dt: f32) -> Vec<GameEvent> {
        if let Some(remaining) = self.confirm_in.as_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.confirm_in = None;
                let tx = self.game.command_sender();
                if tx.send(GameCommand::ConfirmSpot { by: REFEREE_ID }).is_err() {
                    tracing::warn!("Command queue closed");
                }
            }
        }

        self.move_runners(dt);
        let events = self.game.update(dt, &self.poses());

        let mut new_snap = false;
        for event in &events {
            match event {
                GameEvent::SpotPending { .. } => self.confirm_in = Some(REFEREE_DELAY_SECS),
                GameEvent::BallSpotted { .. } | GameEvent::Turnover { .. } => new_snap = true,
                _ => {},
            }
            log_event(event);
        }
        if new_snap {
            self.line_up();
            self.huddle_secs = self.game.config().respawn_delay_secs + 0.5;
        }
        events
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::FlagPulled {
            carrier,
            puller,
            side,
            position,
        } => tracing::info!(carrier, puller, ?side, %position, "Flag pulled"),
        GameEvent::BallSpotted {
            position,
            down,
            possession,
        } => tracing::info!(%position, down, %possession, "Ball spotted"),
        GameEvent::FirstDown { team, .. } => tracing::info!(%team, "First down"),
        GameEvent::Turnover { to } => tracing::info!(%to, "Turnover"),
        GameEvent::Touchdown { team, points } => tracing::info!(%team, points, "Touchdown"),
        GameEvent::QuarterEnded { quarter } => tracing::info!(quarter, "End of quarter"),
        GameEvent::CommandRejected { reason } => tracing::warn!(%reason, "Command rejected"),
        other => tracing::debug!(?other, "Game event"),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = parse_args();
    let mut sim = Sim::new(&args);
    let dt = 1.0 / sim.game.tick_rate().max(1.0);
    let report_every = (sim.game.tick_rate().max(1.0) as usize) * 60;

    tracing::info!(
        ticks = args.ticks,
        players = args.players,
        seed = args.seed,
        manual = args.manual,
        "Flagball simulation starting"
    );

    for tick in 1..=args.ticks {
        sim.step(dt);
        if tick % report_every == 0 {
            tracing::info!("{}", sim.game.scoreboard_text().replace('\n', " "));
        }
        if sim.game.is_game_over() {
            break;
        }
    }

    println!("{}", sim.game.scoreboard_text());
    println!("{}", sim.game.down_marker_text());
}
