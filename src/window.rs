//! Interactive viewer.
//!
//! Steps the simulation once per redraw and presents the composite. Space
//! pauses, Right steps once while paused, S saves a PNG, Escape quits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use physarum::{Diagnostics, GpuContext, GpuError, Physarum, PhysarumError, SimulationConfig};

struct Viewer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    sim: Physarum,
}

impl Viewer {
    async fn new(window: Arc<Window>, config: &SimulationConfig) -> Result<Self, PhysarumError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .map_err(GpuError::SurfaceCreation)?;
        let ctx = GpuContext::request(&instance, Some(&surface)).await?;

        let caps = surface.get_capabilities(&ctx.adapter);
        // Palette colors are display values already; an sRGB target would
        // encode them twice.
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or(caps.formats.first())
            .copied()
            .ok_or_else(|| GpuError::Resource("surface reports no formats".to_string()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctx.device, &surface_config);

        let mut sim = Physarum::new(Arc::new(ctx), config, Diagnostics::disabled())?;
        sim.enable_present(format);

        Ok(Self {
            window,
            surface,
            surface_config,
            sim,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface
                .configure(&self.sim.context().device, &self.surface_config);
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let ctx = Arc::clone(self.sim.context());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        if let Err(e) = self.sim.render(&mut encoder, &view) {
            tracing::error!(error = %e, "render failed");
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    config: SimulationConfig,
    out: PathBuf,
    viewer: Option<Viewer>,
    paused: bool,
}

impl App {
    pub fn new(config: SimulationConfig, out: PathBuf) -> Self {
        Self {
            config,
            out,
            viewer: None,
            paused: false,
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(viewer) = &mut self.viewer else {
            return;
        };

        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                self.paused = !self.paused;
                tracing::info!(paused = self.paused, frame = viewer.sim.frame(), "toggled pause");
                viewer.window.request_redraw();
            }
            KeyCode::ArrowRight if self.paused => {
                viewer.sim.step();
                viewer.window.request_redraw();
            }
            KeyCode::KeyS => export(&viewer.sim, &numbered(&self.out, viewer.sim.frame())),
            _ => {}
        }
    }
}

/// `out.png` becomes `out-<frame>.png`.
fn numbered(out: &Path, frame: u64) -> PathBuf {
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "physarum".to_string());
    out.with_file_name(format!("{}-{}.png", stem, frame))
}

pub fn export(sim: &Physarum, path: &Path) {
    match sim.draw() {
        Ok(image) => match image.save(path) {
            Ok(()) => tracing::info!(path = %path.display(), frame = sim.frame(), "saved image"),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "could not save image"),
        },
        Err(e) => tracing::error!(error = %e, "could not read composite"),
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(format!("Physarum - {}", self.config.seed))
            .with_inner_size(winit::dpi::PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!(error = %e, "could not create window");
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(Viewer::new(window.clone(), &self.config)) {
            Ok(viewer) => {
                self.viewer = Some(viewer);
                window.request_redraw();
            }
            Err(e) => {
                tracing::error!(error = %e, "could not start simulation");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::RedrawRequested => {
                let paused = self.paused;
                if let Some(viewer) = &mut self.viewer {
                    if !paused {
                        viewer.sim.step();
                    }
                    match viewer.render() {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            let size = viewer.window.inner_size();
                            viewer.resize(size);
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                        Err(e) => tracing::warn!(error = ?e, "surface error"),
                    }
                    if !paused {
                        viewer.window.request_redraw();
                    }
                }
            }
            _ => {}
        }
    }
}
