mod game;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::DVec2;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};
use towerdef_assets::{TuningFile, load_map};
use towerdef_input::Action;
use towerdef_kernel::{FrameClock, Simulation};
use towerdef_render::RenderContext;
use towerdef_render_wgpu::WgpuRenderContext;

use crate::game::Game;

#[derive(Parser)]
#[command(name = "towerdef-desktop", about = "Tower-defense flocking demo")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Tiled JSON map to load
    #[arg(long, default_value = "data/maps/tower_defense.json")]
    map: PathBuf,

    /// JSON file with `flock` and `sim` tuning sections
    #[arg(long)]
    params: Option<PathBuf>,

    /// Initial window width in pixels
    #[arg(long, default_value = "1280")]
    width: u32,

    /// Initial window height in pixels
    #[arg(long, default_value = "720")]
    height: u32,
}

struct GpuApp {
    game: Game,
    size: PhysicalSize<u32>,
    window: Option<Arc<Window>>,
    render: Option<WgpuRenderContext>,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    clock: FrameClock,
    /// Fatal error raised inside the event loop, returned from `main`.
    error: Option<anyhow::Error>,
}

impl GpuApp {
    fn new(game: Game, size: PhysicalSize<u32>) -> Self {
        Self {
            game,
            size,
            window: None,
            render: None,
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            egui_renderer: None,
            clock: FrameClock::new(),
            error: None,
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Tower Defense")
            .with_inner_size(self.size);
        let window = Arc::new(event_loop.create_window(attrs).context("creating window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("creating surface")?;

        let size = window.inner_size();
        let mut render = WgpuRenderContext::new(&instance, surface, size.width, size.height)?;
        self.game
            .load_textures(&mut render)
            .context("loading tileset texture")?;
        self.game.camera.set_viewport(size.width, size.height);

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(render.device(), render.surface_format(), None, 1, false);

        tracing::info!(backend = render.backend(), "GPU initialized");
        self.window = Some(window);
        self.render = Some(render);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);
        self.clock = FrameClock::new();
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        let keys = &mut self.game.keys;
        match key {
            KeyCode::KeyW => keys.up = pressed,
            KeyCode::KeyS => keys.down = pressed,
            KeyCode::KeyA => keys.left = pressed,
            KeyCode::KeyD => keys.right = pressed,
            KeyCode::Escape if pressed => self.game.push_action(Action::Quit),
            _ => {}
        }
    }

    /// One iteration of the frame loop. Returns `true` to quit.
    fn redraw(&mut self) -> bool {
        let (Some(window), Some(render), Some(egui_winit), Some(egui_renderer)) = (
            &self.window,
            &mut self.render,
            &mut self.egui_winit,
            &mut self.egui_renderer,
        ) else {
            return false;
        };

        let dt = self.clock.tick();

        let raw_input = egui_winit.take_egui_input(window);
        let game = &mut self.game;
        let full_output = self.egui_ctx.run(raw_input, |ctx| game.draw_ui(ctx));
        egui_winit.handle_platform_output(window, full_output.platform_output);

        if game.frame(dt, &mut *render) {
            return true;
        }

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        if let Some(target) = render.overlay_target() {
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: target.size,
                pixels_per_point: full_output.pixels_per_point,
            };
            for (id, image_delta) in &full_output.textures_delta.set {
                egui_renderer.update_texture(target.device, target.queue, *id, image_delta);
            }
            let mut encoder = target
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("egui_encoder"),
                });
            egui_renderer.update_buffers(
                target.device,
                target.queue,
                &mut encoder,
                &paint_jobs,
                &screen_descriptor,
            );
            {
                let mut pass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("egui_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: target.view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    })
                    .forget_lifetime();
                egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
            }
            target.queue.submit(std::iter::once(encoder.finish()));
        }
        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }

        render.present();
        false
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init_gpu(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
            let response = egui_winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(render) = &mut self.render {
                    render.resize(new_size.width, new_size.height);
                    let [w, h] = render.size();
                    self.game.camera.set_viewport(w, h);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => {
                self.handle_key(key, state == ElementState::Pressed);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
                    MouseScrollDelta::PixelDelta(p) if p.y > 0.0 => 1,
                    MouseScrollDelta::PixelDelta(p) if p.y < 0.0 => -1,
                    MouseScrollDelta::PixelDelta(_) => 0,
                };
                if steps != 0 {
                    self.game.push_action(Action::Zoom(steps));
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.game
                    .set_cursor(Some(DVec2::new(position.x, position.y)));
            }
            WindowEvent::CursorLeft { .. } => {
                self.game.set_cursor(None);
            }
            WindowEvent::RedrawRequested => {
                if self.redraw() {
                    event_loop.exit();
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("towerdef-desktop starting");

    let map = load_map(&cli.map).with_context(|| format!("loading map {}", cli.map.display()))?;
    let tuning = TuningFile::load_or_default(cli.params.as_deref())
        .context("loading tuning parameters")?;
    let sim = Simulation::new(map.map_data.clone(), tuning.flock, tuning.sim)
        .context("creating simulation")?;
    let game = Game::new(map, sim, cli.width, cli.height);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(game, PhysicalSize::new(cli.width.max(1), cli.height.max(1)));
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e.context("desktop app failed")),
        None => Ok(()),
    }
}
