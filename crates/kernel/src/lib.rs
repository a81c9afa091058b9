//! Simulation kernel: enemy state, fixed-step flocking, interpolation for rendering.
//!
//! # Invariants
//! - `flock::step` is a pure function of the previous buffer, static map data
//!   and a parameter snapshot.
//! - Both simulation buffers stay index-aligned; entities are only added or
//!   removed at the synchronization point at the start of `Simulation::advance`.
//! - Simulation is forward-only: an applied step is never rolled back.

pub mod enemy;
pub mod flock;
pub mod interpolate;
pub mod simulation;
pub mod state;
pub mod time;

pub use enemy::{Enemy, EnemyPath, EnemyType, MapData};
pub use flock::{FlockParams, WAYPOINT_REACHED_DISTANCE, step};
pub use interpolate::interpolate;
pub use simulation::{FrameReport, SimCommand, SimConfig, SimError, Simulation};
pub use state::SimulationState;
pub use time::{FixedStepClock, FrameClock, StepBudget};
