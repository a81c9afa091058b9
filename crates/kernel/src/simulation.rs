use glam::Vec2;
use serde::{Deserialize, Serialize};
use towerdef_common::EnemyTypeId;

use crate::enemy::MapData;
use crate::flock::{self, FlockParams};
use crate::interpolate::interpolate;
use crate::state::SimulationState;
use crate::time::FixedStepClock;

/// Static configuration of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed step size in seconds.
    pub fixed_step: f32,
    /// Optional cap on fixed steps per frame. `None` pays back every stall.
    pub max_steps_per_frame: Option<u32>,
    /// Seed for spawn jitter.
    pub seed: u64,
    /// Half-extent of the random offset applied to spawned enemies.
    pub spawn_jitter: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_step: 1.0 / 60.0,
            max_steps_per_frame: None,
            seed: 0,
            spawn_jitter: 1.0,
        }
    }
}

/// Structural changes applied between fixed steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimCommand {
    /// Spawn `count` enemies of a type at the path start. Zero spawns the
    /// type's `units_per_spawn`.
    Spawn { type_id: EnemyTypeId, count: u32 },
    /// Remove every enemy.
    DespawnAll,
    /// Remove enemies that walked past the final waypoint.
    DespawnFinished,
}

/// Errors from simulation setup and commands.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("unknown enemy type {0:?}")]
    UnknownEnemyType(EnemyTypeId),
    #[error("enemy path needs at least two waypoints, got {0}")]
    PathTooShort(usize),
    #[error("fixed step must be positive and finite, got {0}")]
    InvalidFixedStep(f32),
}

/// What one call to `Simulation::advance` did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    pub steps: u32,
    pub skipped_steps: u32,
    pub interpolation_factor: f32,
    pub enemy_count: usize,
}

/// Double-buffered fixed-step simulation.
///
/// Owns two state buffers whose roles (previous / latest) are swapped after
/// every step, plus the per-frame interpolated buffer handed to rendering.
#[derive(Debug, Clone)]
pub struct Simulation {
    map: MapData,
    params: FlockParams,
    config: SimConfig,
    buffers: [SimulationState; 2],
    latest: usize,
    interpolated: SimulationState,
    clock: FixedStepClock,
    jitter: SplitMix64,
    pending: Vec<SimCommand>,
    tick: u64,
    keep: Vec<bool>,
}

impl Simulation {
    pub fn new(map: MapData, params: FlockParams, config: SimConfig) -> Result<Self, SimError> {
        if map.path.waypoint_count() < 2 {
            return Err(SimError::PathTooShort(map.path.waypoint_count()));
        }
        if !(config.fixed_step > 0.0 && config.fixed_step.is_finite()) {
            return Err(SimError::InvalidFixedStep(config.fixed_step));
        }

        Ok(Self {
            map,
            params,
            config,
            buffers: [SimulationState::new(), SimulationState::new()],
            latest: 0,
            interpolated: SimulationState::new(),
            clock: FixedStepClock::new(config.fixed_step)
                .with_max_steps(config.max_steps_per_frame),
            jitter: SplitMix64::new(config.seed),
            pending: Vec::new(),
            tick: 0,
            keep: Vec::new(),
        })
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn params(&self) -> &FlockParams {
        &self.params
    }

    /// Tunables for the UI layer. Takes effect from the next step.
    pub fn params_mut(&mut self) -> &mut FlockParams {
        &mut self.params
    }

    /// Number of fixed steps applied so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// State before the most recent step.
    pub fn previous(&self) -> &SimulationState {
        &self.buffers[self.latest ^ 1]
    }

    /// State after the most recent step.
    pub fn latest(&self) -> &SimulationState {
        &self.buffers[self.latest]
    }

    /// Presentation state blended at the end of the last `advance`.
    pub fn interpolated(&self) -> &SimulationState {
        &self.interpolated
    }

    pub fn interpolation_factor(&self) -> f32 {
        self.clock.interpolation_factor()
    }

    pub fn enemy_count(&self) -> usize {
        self.latest().len()
    }

    pub fn state_hash(&self) -> u64 {
        self.latest().state_hash()
    }

    /// Queue a structural change for the next synchronization point.
    pub fn queue_command(&mut self, command: SimCommand) -> Result<(), SimError> {
        if let SimCommand::Spawn { type_id, .. } = command {
            if self.map.enemy_type(type_id).is_none() {
                return Err(SimError::UnknownEnemyType(type_id));
            }
        }
        self.pending.push(command);
        Ok(())
    }

    /// Advance by `dt` seconds of real (already scaled) time.
    ///
    /// Applies queued commands, runs every fixed step the clock grants, then
    /// refreshes the interpolated state.
    pub fn advance(&mut self, dt: f32) -> FrameReport {
        let _span = tracing::info_span!("sim_advance").entered();

        self.apply_pending();

        let budget = self.clock.accumulate(dt);
        if budget.skipped > 0 {
            tracing::warn!(
                skipped = budget.skipped,
                ran = budget.steps,
                "fixed step cap reached, dropping simulation time"
            );
        }
        for _ in 0..budget.steps {
            self.step_once();
        }

        let factor = self.clock.interpolation_factor();
        let [first, second] = &self.buffers;
        let (prev, next) = if self.latest == 0 {
            (second, first)
        } else {
            (first, second)
        };
        interpolate(prev, next, factor, &mut self.interpolated);

        FrameReport {
            steps: budget.steps,
            skipped_steps: budget.skipped,
            interpolation_factor: factor,
            enemy_count: self.enemy_count(),
        }
    }

    /// Run exactly one fixed step, independent of the clock.
    pub fn step_once(&mut self) {
        let [first, second] = &mut self.buffers;
        let (prev, next) = if self.latest == 0 {
            (&*first, second)
        } else {
            (&*second, first)
        };
        flock::step(&self.map, &self.params, prev, next, self.config.fixed_step);
        self.latest ^= 1;
        self.tick += 1;
        tracing::trace!(tick = self.tick, enemies = next.len(), "fixed step");
    }

    fn apply_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        for command in &pending {
            match *command {
                SimCommand::Spawn { type_id, count } => self.spawn(type_id, count),
                SimCommand::DespawnAll => {
                    for buffer in &mut self.buffers {
                        buffer.enemies.clear();
                    }
                    tracing::debug!("despawned all enemies");
                }
                SimCommand::DespawnFinished => self.despawn_finished(),
            }
        }
        // Hand the allocation back for the next frame.
        self.pending = pending;
        self.pending.clear();
    }

    fn spawn(&mut self, type_id: EnemyTypeId, count: u32) {
        let Some(enemy_type) = self.map.enemy_type(type_id) else {
            return;
        };
        let count = if count == 0 {
            enemy_type.units_per_spawn
        } else {
            count
        };

        for _ in 0..count {
            let mut enemy = enemy_type.create_enemy(&self.map.path, type_id);
            let shift = Vec2::new(self.jitter.next_signed(), self.jitter.next_signed());
            enemy.position += shift * self.config.spawn_jitter;
            // Both buffers receive the enemy so they stay index-aligned.
            for buffer in &mut self.buffers {
                buffer.enemies.push(enemy);
            }
        }
        tracing::debug!(name = %enemy_type.name, count, "spawned enemies");
    }

    fn despawn_finished(&mut self) {
        let path = &self.map.path;
        self.keep.clear();
        self.keep.extend(
            self.buffers[self.latest]
                .enemies
                .iter()
                .map(|e| !e.reached_end(path)),
        );

        let before = self.keep.len();
        for buffer in &mut self.buffers {
            let mut keep = self.keep.iter();
            buffer.enemies.retain(|_| keep.next().copied().unwrap_or(false));
        }
        tracing::debug!(
            removed = before - self.buffers[self.latest].len(),
            "despawned finished enemies"
        );
    }
}

/// Deterministic jitter source: splitmix64 over a seed.
#[derive(Debug, Clone)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform value in `[-1, 1)`.
    fn next_signed(&mut self) -> f32 {
        let unit = (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32;
        unit * 2.0 - 1.0
    }
}
