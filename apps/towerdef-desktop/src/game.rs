use glam::{DVec2, Vec2, Vec4};
use towerdef_assets::LoadedMap;
use towerdef_common::EnemyTypeId;
use towerdef_input::{Action, CameraController, MovementKeys, TIME_SCALE_FACTORS, TimeScale};
use towerdef_kernel::{FlockParams, FrameReport, SimCommand, Simulation};
use towerdef_render::{
    OrthoCamera, RenderContext, RenderError, RenderQueue, RenderStats, TileSet, queue_enemies,
};

const CLEAR_COLOR: Vec4 = Vec4::new(0.5, 0.5, 0.5, 1.0);
const DEFAULT_SPAWN_COUNT: u32 = 20;

/// Everything the frame loop owns besides the window and GPU.
pub struct Game {
    map: LoadedMap,
    sim: Simulation,
    tileset: Option<TileSet>,
    pub camera: OrthoCamera,
    controller: CameraController,
    time_scale: TimeScale,
    pub keys: MovementKeys,
    queue: RenderQueue,
    stats: RenderStats,
    last_report: FrameReport,
    frame_time: f32,
    cursor: Option<DVec2>,
    selected_enemy: usize,
    spawn_count: u32,
    sort_sprites: bool,
    show_path: bool,
    actions: Vec<Action>,
}

impl Game {
    pub fn new(map: LoadedMap, sim: Simulation, width: u32, height: u32) -> Self {
        let mut camera = OrthoCamera::new(width, height);
        camera.position = map_center(&map);
        let controller = CameraController::new();
        camera.pixels_per_unit = controller.pixels_per_unit();

        Self {
            map,
            sim,
            tileset: None,
            camera,
            controller,
            time_scale: TimeScale::default(),
            keys: MovementKeys::default(),
            queue: RenderQueue::new(),
            stats: RenderStats::default(),
            last_report: FrameReport::default(),
            frame_time: 0.0,
            cursor: None,
            selected_enemy: 0,
            spawn_count: DEFAULT_SPAWN_COUNT,
            sort_sprites: true,
            show_path: true,
            actions: Vec::new(),
        }
    }

    /// Upload the map's tileset into `ctx`.
    pub fn load_textures(&mut self, ctx: &mut dyn RenderContext) -> Result<(), RenderError> {
        let texture = ctx.load_texture(&self.map.tileset_image)?;
        self.tileset = Some(TileSet::new(&self.map.tileset_layout, texture));
        Ok(())
    }

    pub fn push_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn set_cursor(&mut self, cursor: Option<DVec2>) {
        self.cursor = cursor;
    }

    /// Apply queued actions. Returns `true` when quitting was requested.
    fn apply_actions(&mut self) -> bool {
        let mut quit = false;
        for action in std::mem::take(&mut self.actions) {
            match action {
                Action::Quit => quit = true,
                Action::Zoom(steps) => self.controller.zoom(steps),
                Action::MoveCamera(direction) => {
                    self.controller
                        .update(&mut self.camera, direction, self.frame_time);
                }
                Action::Spawn { type_id, count } => {
                    if let Err(e) = self.sim.queue_command(SimCommand::Spawn { type_id, count }) {
                        tracing::error!("spawn rejected: {e}");
                    }
                }
                Action::DespawnAll => {
                    if let Err(e) = self.sim.queue_command(SimCommand::DespawnAll) {
                        tracing::error!("despawn rejected: {e}");
                    }
                }
                Action::SetTimeScale(index) => self.time_scale.select(index),
            }
        }
        quit
    }

    /// Run one frame of input, simulation and sprite submission. Returns
    /// `true` when the host should quit.
    pub fn frame(&mut self, dt: f32, ctx: &mut dyn RenderContext) -> bool {
        self.frame_time = dt;
        if let Some(action) = self.keys.action() {
            self.actions.push(action);
        }
        if self.apply_actions() {
            return true;
        }
        // Zoom applies even without panning.
        self.controller.update(&mut self.camera, Vec2::ZERO, dt);

        self.last_report = self.sim.advance(self.time_scale.scale(dt));

        self.queue.reset();
        self.queue.clear_color = CLEAR_COLOR;
        if let Some(tileset) = &self.tileset {
            for layer in &self.map.layers {
                layer.queue_sprites(&mut self.queue, tileset);
            }
            queue_enemies(
                &mut self.queue,
                self.sim.interpolated(),
                &self.map.map_data.enemy_types,
                tileset,
            );
        }

        ctx.clear(self.queue.clear_color);
        self.stats = ctx.submit(&mut self.queue, &self.camera, self.sort_sprites);
        false
    }

    /// Build the egui panels. Changes are queued as actions and applied on
    /// the next frame, except flocking weights which take effect at once.
    pub fn draw_ui(&mut self, ctx: &egui::Context) {
        egui::Window::new("Render Stats")
            .default_pos([10.0, 10.0])
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.label(format!("Frame time: {:.2}ms", self.frame_time * 1000.0));
                ui.label(format!("Sprites: {}", self.stats.sprite_count));
                ui.label(format!("Drawcalls: {}", self.stats.draw_call_count));
                ui.label(step_summary(&self.last_report));
                ui.label(format!("Tick: {}", self.sim.tick()));
                if let Some(cursor) = self.cursor {
                    let world = self.camera.screen_to_world(cursor);
                    ui.label(format!("Cursor: ({:.2}, {:.2})", world.x, world.y));
                }
                ui.checkbox(&mut self.sort_sprites, "Sort sprites by texture");
                ui.checkbox(&mut self.camera.snap_to_pixel, "Snap camera to pixels");
                ui.checkbox(&mut self.show_path, "Show enemy path");
            });

        egui::Window::new("Gameplay Settings")
            .default_pos([10.0, 200.0])
            .show(ctx, |ui| {
                let mut index = self.time_scale.index();
                ui.horizontal(|ui| {
                    for (i, factor) in TIME_SCALE_FACTORS.iter().enumerate() {
                        ui.radio_value(&mut index, i, format!("{factor}"));
                    }
                });
                if index != self.time_scale.index() {
                    self.actions.push(Action::SetTimeScale(index));
                }
            });

        egui::Window::new("Spawn Enemies")
            .default_pos([10.0, 290.0])
            .show(ctx, |ui| {
                let types = &self.map.map_data.enemy_types;
                let selected_name = types
                    .get(self.selected_enemy)
                    .map(|t| t.name.as_str())
                    .unwrap_or("<none>");
                egui::ComboBox::from_label("Enemy Type")
                    .selected_text(selected_name)
                    .show_ui(ui, |ui| {
                        for (i, ty) in types.iter().enumerate() {
                            ui.selectable_value(&mut self.selected_enemy, i, ty.name.as_str());
                        }
                    });
                ui.horizontal(|ui| {
                    ui.label("Enemies To Spawn");
                    ui.add(egui::DragValue::new(&mut self.spawn_count).range(0..=10_000));
                });
                if ui.button("Spawn Enemy").clicked() && self.selected_enemy < types.len() {
                    self.actions.push(Action::Spawn {
                        type_id: EnemyTypeId(self.selected_enemy as u32),
                        count: self.spawn_count,
                    });
                }
                if ui.button("Despawn All").clicked() {
                    self.actions.push(Action::DespawnAll);
                }
                ui.label(format!("Alive: {}", self.sim.enemy_count()));
            });

        egui::Window::new("Flocking Options")
            .default_pos([10.0, 450.0])
            .show(ctx, |ui| {
                flock_sliders(ui, self.sim.params_mut());
            });

        if self.show_path {
            self.paint_path(ctx);
        }
    }

    /// Draw the enemy route under the egui windows.
    fn paint_path(&self, ctx: &egui::Context) {
        let path = &self.map.map_data.path;
        let ppp = f64::from(ctx.pixels_per_point());
        let points: Vec<egui::Pos2> = path
            .waypoints
            .iter()
            .map(|&w| {
                let s = (self.camera.world_to_screen(w) / ppp).as_vec2();
                egui::pos2(s.x, s.y)
            })
            .collect();
        let c = (path.color * 255.0).round();
        let color = egui::Color32::from_rgba_unmultiplied(c.x as u8, c.y as u8, c.z as u8, c.w as u8);
        let painter = ctx.layer_painter(egui::LayerId::background());
        painter.add(egui::Shape::line(points.clone(), egui::Stroke::new(2.0, color)));
        for p in points {
            painter.circle_filled(p, 4.0, color);
        }
    }
}

fn flock_sliders(ui: &mut egui::Ui, params: &mut FlockParams) {
    let defaults = FlockParams::default();
    ui.add(egui::Slider::new(&mut params.sight_range, 0.0..=10.0).text("Sight Range"));
    ui.add(egui::Slider::new(&mut params.desired_spacing, 0.0..=5.0).text("Desired Spacing"));
    ui.add(egui::Slider::new(&mut params.max_path_distance, 0.0..=5.0).text("Max Path Distance"));
    ui.separator();
    ui.add(egui::Slider::new(&mut params.waypoint_factor, 0.0..=5.0).text("Waypoint Steering"));
    ui.add(egui::Slider::new(&mut params.alignment_factor, 0.0..=5.0).text("Common Direction"));
    ui.add(egui::Slider::new(&mut params.path_readjust_factor, 0.0..=5.0).text("Path Readjust"));
    ui.add(egui::Slider::new(&mut params.pushback_factor, 0.0..=5.0).text("Pushback"));
    ui.add(egui::Slider::new(&mut params.centering_factor, 0.0..=5.0).text("Centering"));
    if ui.button("Reset").clicked() {
        *params = defaults;
    }
}

fn step_summary(report: &FrameReport) -> String {
    format!(
        "Steps: {} (skipped {})  alpha={:.2}",
        report.steps, report.skipped_steps, report.interpolation_factor
    )
}

fn map_center(map: &LoadedMap) -> Vec2 {
    Vec2::new(
        (map.width as f32 - 1.0) * 0.5,
        -(map.height as f32 - 1.0) * 0.5,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_summary_is_plain_ascii() {
        let report = FrameReport {
            steps: 2,
            skipped_steps: 1,
            interpolation_factor: 0.25,
            enemy_count: 4,
        };
        let text = step_summary(&report);
        assert_eq!(text, "Steps: 2 (skipped 1)  alpha=0.25");
        assert!(text.is_ascii());
    }
}
