//! Test Pressing - plays an audio file and presses its spectrum into a
//! rotating radial mesh, sealed on demand into a printable solid.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use testpressing::audio::{AudioSystem, SilentSource, SpectrumSource, VolumeControl};
use testpressing::camera::OrbitCamera;
use testpressing::cli::{Args, Track};
use testpressing::mesh::{export_ply, FinishOutcome};
use testpressing::params::{FFTConfig, OutputConfig, RenderConfig, Settings};
use testpressing::pressing::PressingSystem;
use testpressing::rendering::{RenderError, RenderSystem};

const APP_TITLE: &str = "Test Pressing";

/// Wheel pixels per line on touchpads
const PIXELS_PER_LINE: f32 = 50.0;

/// User commands bound to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    ToggleInfo,
    VolumeUp,
    VolumeDown,
    ToggleMute,
    Screenshot,
    DumpMesh,
    Finish,
    ToggleWireframe,
    Quit,
}

impl Command {
    fn from_key(key: &Key) -> Option<Self> {
        match key {
            Key::Named(NamedKey::Space) => Some(Self::ToggleMute),
            Key::Named(NamedKey::Escape) => Some(Self::Quit),
            Key::Character(c) => Self::from_char(c.as_str()),
            _ => None,
        }
    }

    fn from_char(c: &str) -> Option<Self> {
        match c {
            "h" => Some(Self::ToggleInfo),
            "+" | "=" => Some(Self::VolumeUp),
            "-" => Some(Self::VolumeDown),
            " " => Some(Self::ToggleMute),
            "s" => Some(Self::Screenshot),
            "m" => Some(Self::DumpMesh),
            "f" => Some(Self::Finish),
            "w" => Some(Self::ToggleWireframe),
            _ => None,
        }
    }
}

/// One-line status shown in the window title
fn status_line(
    track: &Track,
    volume: &VolumeControl,
    elapsed_s: f32,
    vertices: usize,
    triangles: usize,
    sealed: bool,
) -> String {
    let mute = if volume.is_muted() { " (muted)" } else { "" };
    let sealed = if sealed { " | sealed" } else { "" };
    format!(
        "{} | {} ({:.0}s) | volume {:.1}{} | {:.1}s | {} vertices | {} triangles{}",
        APP_TITLE,
        track.name,
        track.length_s,
        volume.volume(),
        mute,
        elapsed_s,
        vertices,
        triangles,
        sealed
    )
}

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Pressing and its inputs
    pressing: PressingSystem,
    camera: OrbitCamera,
    audio: Option<AudioSystem>,
    volume: VolumeControl,

    // Configuration
    track: Track,
    fft_config: FFTConfig,
    render_config: RenderConfig,
    output: OutputConfig,

    // UI state
    show_info: bool,
    mesh_dirty: bool,
    dragging: bool,
    cursor: Option<(f64, f64)>,
    title: String,

    // Time tracking
    start_time: Instant,
}

impl App {
    fn new(
        pressing: PressingSystem,
        track: Track,
        render_config: RenderConfig,
        output: OutputConfig,
    ) -> Self {
        let camera = OrbitCamera::new(&render_config);

        Self {
            window: None,
            render_system: None,
            pressing,
            camera,
            audio: None,
            volume: VolumeControl::default(),
            track,
            fft_config: FFTConfig::default(),
            render_config,
            output,
            show_info: true,
            mesh_dirty: false,
            dragging: false,
            cursor: None,
            title: String::new(),
            start_time: Instant::now(),
        }
    }

    fn spectrum_source(&self) -> &dyn SpectrumSource {
        match &self.audio {
            Some(audio) => audio,
            None => &SilentSource,
        }
    }

    /// Start playback, falling back to silence when audio is unavailable
    fn start_audio(&mut self) {
        let Some(path) = self.track.path.clone() else {
            log::warn!("no audio file configured; pressing silence");
            return;
        };
        match AudioSystem::new(&path, self.fft_config.clone(), self.pressing.params.band_count) {
            Ok(audio) => {
                let duration_s = audio.duration_s();
                if (duration_s - self.track.length_s).abs() > 1.0 {
                    log::warn!(
                        "{} plays for {:.1}s but one revolution takes {:.1}s",
                        self.track.name,
                        duration_s,
                        self.track.length_s
                    );
                }
                audio.set_gain(self.volume.gain());
                self.audio = Some(audio);
            }
            Err(e) => log::warn!("audio unavailable ({}); pressing silence", e),
        }
    }

    fn apply_volume(&self) {
        if let Some(audio) = &self.audio {
            audio.set_gain(self.volume.gain());
        }
        log::info!(
            "volume {:.1}{}",
            self.volume.volume(),
            if self.volume.is_muted() { " (muted)" } else { "" }
        );
    }

    fn dump_mesh(&self) {
        let path = self.output.mesh_dump_path();
        match export_ply(self.pressing.builder().mesh(), &path) {
            Ok(()) => log::info!("mesh dump saved to {}", path.display()),
            Err(e) => log::error!("mesh dump failed: {}", e),
        }
    }

    fn execute(&mut self, command: Command, event_loop: &ActiveEventLoop) {
        match command {
            Command::ToggleInfo => {
                self.show_info = !self.show_info;
                if !self.show_info {
                    if let Some(render_system) = &mut self.render_system {
                        render_system.update_overlay(&[]);
                    }
                }
            }
            Command::VolumeUp => {
                self.volume.raise();
                self.apply_volume();
            }
            Command::VolumeDown => {
                self.volume.lower();
                self.apply_volume();
            }
            Command::ToggleMute => {
                self.volume.toggle_mute();
                self.apply_volume();
            }
            Command::Screenshot => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.request_screenshot(self.output.screenshot_path());
                }
            }
            Command::DumpMesh => self.dump_mesh(),
            Command::Finish => match self.pressing.finish() {
                FinishOutcome::Sealed {
                    added_vertices,
                    added_triangles,
                } => {
                    log::info!(
                        "sealed: {} vertices and {} triangles added",
                        added_vertices,
                        added_triangles
                    );
                    self.mesh_dirty = true;
                    self.dump_mesh();
                }
                FinishOutcome::TooFewRings { rings } => {
                    log::warn!("finished without sealing ({} rings)", rings);
                }
                FinishOutcome::AlreadyFinished => log::info!("pressing already finished"),
            },
            Command::ToggleWireframe => {
                if let Some(render_system) = &mut self.render_system {
                    let on = render_system.toggle_wireframe();
                    log::debug!("wireframe {}", if on { "on" } else { "off" });
                }
            }
            Command::Quit => event_loop.exit(),
        }
    }

    /// Advance the pressing and render a single frame
    fn update(&mut self, event_loop: &ActiveEventLoop) {
        let now_s = self.start_time.elapsed().as_secs_f32();

        // Pull the spectrum and maybe press a ring
        let raw = self
            .spectrum_source()
            .spectrum(self.pressing.params.band_count);
        if self.pressing.update(&raw, now_s) {
            self.mesh_dirty = true;
        }

        self.update_title();

        let Some(render_system) = &mut self.render_system else {
            return;
        };

        if self.mesh_dirty {
            render_system.update_mesh(self.pressing.builder().mesh());
            self.mesh_dirty = false;
        }
        if self.show_info {
            render_system.update_overlay(self.pressing.smoothed());
        }

        let (view_proj, _) = self
            .camera
            .view_proj(&self.render_config, render_system.aspect_ratio());
        render_system.update_view(view_proj);

        match render_system.render() {
            Ok(()) => {}
            Err(RenderError::Frame(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                let (width, height) = render_system.size();
                render_system.resize(width, height);
            }
            Err(RenderError::Frame(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::error!("render error: {}", e),
        }
    }

    fn update_title(&mut self) {
        let title = if self.show_info {
            let builder = self.pressing.builder();
            let elapsed_s = self.audio.as_ref().map_or(0.0, |a| a.elapsed_s());
            status_line(
                &self.track,
                &self.volume,
                elapsed_s,
                builder.mesh().vertex_count(),
                builder.mesh().triangle_count(),
                builder.is_finished(),
            )
        } else {
            APP_TITLE.to_string()
        };

        if title != self.title {
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
            self.title = title;
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        // Create window
        let window_attributes = Window::default_attributes()
            .with_title(APP_TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        // Initialize rendering system
        let render_system = match pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.render_config.clone(),
        )) {
            Ok(render_system) => render_system,
            Err(e) => {
                log::error!("failed to initialize renderer: {}", e);
                event_loop.exit();
                return;
            }
        };

        self.start_audio();

        log::info!("running; press h for info, f to finish, Esc to quit");

        self.window = Some(window);
        self.render_system = Some(render_system);
        self.start_time = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        logical_key,
                        ..
                    },
                ..
            } => {
                if let Some(command) = Command::from_key(&logical_key) {
                    self.execute(command, event_loop);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let (true, Some((x, y))) = (self.dragging, self.cursor) {
                    self.camera
                        .drag((position.x - x) as f32, (position.y - y) as f32);
                }
                self.cursor = Some((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                self.camera.zoom(lines);
            }
            WindowEvent::RedrawRequested => self.update(event_loop),
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let settings = Settings::load_or_default(&args.settings);

    let track = args.track(&settings);
    log::info!("track: {} ({}s per revolution)", track.name, track.length_s);

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;
    let output = OutputConfig::new(args.output_dir.clone());
    log::info!("mesh dumps and screenshots go to {}", output.output_dir().display());

    let pressing = PressingSystem::new(settings.settings.clone(), track.length_s, 0.0)?;
    let mut app = App::new(pressing, track, RenderConfig::default(), output);

    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(Command::from_char("h"), Some(Command::ToggleInfo));
        assert_eq!(Command::from_char("+"), Some(Command::VolumeUp));
        assert_eq!(Command::from_char("="), Some(Command::VolumeUp));
        assert_eq!(Command::from_char("-"), Some(Command::VolumeDown));
        assert_eq!(Command::from_char(" "), Some(Command::ToggleMute));
        assert_eq!(Command::from_char("s"), Some(Command::Screenshot));
        assert_eq!(Command::from_char("m"), Some(Command::DumpMesh));
        assert_eq!(Command::from_char("f"), Some(Command::Finish));
        assert_eq!(Command::from_char("w"), Some(Command::ToggleWireframe));
        assert_eq!(Command::from_char("x"), None);
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(
            Command::from_key(&Key::Named(NamedKey::Space)),
            Some(Command::ToggleMute)
        );
        assert_eq!(
            Command::from_key(&Key::Named(NamedKey::Escape)),
            Some(Command::Quit)
        );
        assert_eq!(Command::from_key(&Key::Named(NamedKey::Enter)), None);
    }

    #[test]
    fn test_status_line() {
        let track = Track {
            name: "song.wav".to_string(),
            path: None,
            length_s: 60.0,
        };
        let mut volume = VolumeControl::default();
        volume.toggle_mute();

        let line = status_line(&track, &volume, 12.34, 512, 762, false);
        assert!(line.contains("song.wav (60s)"));
        assert!(line.contains("volume 1.0 (muted)"));
        assert!(line.contains("12.3s"));
        assert!(line.contains("512 vertices"));
        assert!(line.contains("762 triangles"));
        assert!(!line.contains("sealed"));

        let line = status_line(&track, &volume, 12.34, 540, 820, true);
        assert!(line.ends_with("820 triangles | sealed"));
    }
}
