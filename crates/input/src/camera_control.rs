use glam::Vec2;
use towerdef_render::OrthoCamera;

/// Zoom levels, from closest to farthest.
pub const SCALE_FACTORS: [f32; 13] = [
    4.0,
    3.0,
    2.0,
    1.0,
    1.0 / 2.0,
    1.0 / 3.0,
    1.0 / 4.0,
    1.0 / 5.0,
    1.0 / 6.0,
    1.0 / 7.0,
    1.0 / 8.0,
    1.0 / 9.0,
    1.0 / 10.0,
];

pub const DEFAULT_SCALE_INDEX: usize = 3;
pub const BASE_PIXELS_PER_UNIT: f32 = 64.0;
/// Pan speed in world units per second at scale 1.
pub const CAMERA_SPEED: f32 = 5.0;

/// Pan and zoom state driving an [`OrthoCamera`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraController {
    scale_index: usize,
    pub base_pixels_per_unit: f32,
    pub speed: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            scale_index: DEFAULT_SCALE_INDEX,
            base_pixels_per_unit: BASE_PIXELS_PER_UNIT,
            speed: CAMERA_SPEED,
        }
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale_index(&self) -> usize {
        self.scale_index
    }

    pub fn scale_factor(&self) -> f32 {
        SCALE_FACTORS[self.scale_index]
    }

    pub fn pixels_per_unit(&self) -> f32 {
        self.base_pixels_per_unit * self.scale_factor()
    }

    /// Positive steps zoom in. The index saturates at both ends of the table.
    pub fn zoom(&mut self, steps: i32) {
        let max = (SCALE_FACTORS.len() - 1) as i64;
        let index = (self.scale_index as i64 - steps as i64).clamp(0, max);
        self.scale_index = index as usize;
        tracing::trace!(scale = self.scale_factor(), "zoom");
    }

    /// World-space pan for `direction` held over `dt` seconds. Zoomed-out
    /// views pan faster so the on-screen speed stays comparable.
    pub fn pan_delta(&self, direction: Vec2, dt: f32) -> Vec2 {
        direction * dt * self.speed / self.scale_factor()
    }

    /// Move `camera` and apply the current zoom.
    pub fn update(&self, camera: &mut OrthoCamera, direction: Vec2, dt: f32) {
        camera.position += self.pan_delta(direction, dt);
        camera.pixels_per_unit = self.pixels_per_unit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_native_scale() {
        let ctl = CameraController::new();
        assert_eq!(ctl.scale_factor(), 1.0);
        assert_eq!(ctl.pixels_per_unit(), 64.0);
    }

    #[test]
    fn zoom_saturates() {
        let mut ctl = CameraController::new();
        ctl.zoom(1);
        assert_eq!(ctl.scale_factor(), 2.0);
        ctl.zoom(100);
        assert_eq!(ctl.scale_index(), 0);
        assert_eq!(ctl.pixels_per_unit(), 256.0);
        ctl.zoom(-100);
        assert_eq!(ctl.scale_index(), SCALE_FACTORS.len() - 1);
        assert!((ctl.pixels_per_unit() - 6.4).abs() < 1e-5);
    }

    #[test]
    fn pan_speed_scales_with_zoom() {
        let mut ctl = CameraController::new();
        assert_eq!(ctl.pan_delta(Vec2::X, 1.0), Vec2::new(5.0, 0.0));
        ctl.zoom(-1);
        assert_eq!(ctl.pan_delta(Vec2::X, 1.0), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn update_moves_camera_and_sets_ppu() {
        let mut ctl = CameraController::new();
        ctl.zoom(2);
        let mut camera = OrthoCamera::new(640, 480);
        ctl.update(&mut camera, Vec2::Y, 0.5);
        assert_eq!(camera.pixels_per_unit, 192.0);
        assert!((camera.position - Vec2::new(0.0, 2.5 / 3.0)).length() < 1e-6);
    }
}
