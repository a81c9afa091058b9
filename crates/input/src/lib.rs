//! Player input mapped to high-level actions.
//!
//! # Invariants
//! - Hosts translate raw window events into [`Action`]s; nothing below the
//!   host sees key codes.
//! - Zoom and time-scale selections are indices into fixed tables and are
//!   always clamped in range.

pub mod action;
pub mod camera_control;
pub mod time_scale;

pub use action::{Action, MovementKeys};
pub use camera_control::{BASE_PIXELS_PER_UNIT, CAMERA_SPEED, CameraController, SCALE_FACTORS};
pub use time_scale::{TIME_SCALE_FACTORS, TimeScale};
