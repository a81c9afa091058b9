use glam::{DVec2, Mat4, Vec2, Vec3};

/// View and projection source for a frame.
pub trait Camera {
    fn view(&self) -> Mat4;
    fn projection(&self) -> Mat4;

    fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    fn position(&self) -> Vec3;
    fn is_orthographic(&self) -> bool;
}

/// Top-down orthographic camera measured in pixels per world unit.
///
/// Screen space has its origin at the top-left corner with Y growing down;
/// world space has Y growing up. Screen positions are `f64`, like the window
/// system's physical cursor positions, so the screen/world mapping stays
/// invertible to well under a thousandth of a unit at any zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoCamera {
    pub position: Vec2,
    pub pixels_per_unit: f32,
    /// Snap the view to whole pixels. Only the derived view is snapped; the
    /// stored position keeps its sub-pixel value.
    pub snap_to_pixel: bool,
    viewport: Vec2,
}

impl OrthoCamera {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: Vec2::ZERO,
            pixels_per_unit: 64.0,
            snap_to_pixel: false,
            viewport: Vec2::new(viewport_width.max(1) as f32, viewport_height.max(1) as f32),
        }
    }

    /// Track the drawable size of the window.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn units_per_pixel(&self) -> f32 {
        1.0 / self.pixels_per_unit
    }

    /// Position actually used for the view matrix.
    pub fn effective_position(&self) -> Vec2 {
        if !self.snap_to_pixel {
            return self.position;
        }
        let upp = self.units_per_pixel();
        (self.position / upp).trunc() * upp
    }

    /// Map a pixel position (top-left origin) to world units.
    ///
    /// Closed form of the inverse view-projection followed by the viewport
    /// transform, evaluated in `f64`.
    pub fn screen_to_world(&self, screen: DVec2) -> Vec2 {
        let offset = (screen - self.viewport.as_dvec2() * 0.5) * FLIP_Y;
        (self.effective_position().as_dvec2() + offset / f64::from(self.pixels_per_unit))
            .as_vec2()
    }

    /// Map a world position to pixels (top-left origin).
    pub fn world_to_screen(&self, world: Vec2) -> DVec2 {
        let offset = (world.as_dvec2() - self.effective_position().as_dvec2())
            * f64::from(self.pixels_per_unit);
        offset * FLIP_Y + self.viewport.as_dvec2() * 0.5
    }
}

const FLIP_Y: DVec2 = DVec2::new(1.0, -1.0);

impl Camera for OrthoCamera {
    fn view(&self) -> Mat4 {
        let eye = self.effective_position();
        Mat4::look_at_lh(eye.extend(-1.0), eye.extend(0.0), Vec3::Y)
    }

    fn projection(&self) -> Mat4 {
        let half = self.viewport * 0.5 * self.units_per_pixel();
        Mat4::orthographic_lh(-half.x, half.x, -half.y, half.y, 0.0, 2.0)
    }

    fn position(&self) -> Vec3 {
        self.position.extend(-1.0)
    }

    fn is_orthographic(&self) -> bool {
        true
    }
}
