//! Oblique - real-time audio-reactive shader synthesiser

mod cli;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{error, info};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use cli::{AudioChoice, Args};
use oblique::audio::{list_input_devices, AudioFeed, DeviceSource, WavFileSource};
use oblique::compositor::Patch;
use oblique::engine::{CaptureDisplay, CaptureLog, Engine, EngineContext, SurfaceDisplay};
use oblique::gpu::GpuContext;
use oblique::module::ModuleRegistry;
use oblique::params::EngineConfig;

/// Module used when no patch is given
const DEFAULT_MODULE: &str = "echo_trails";

fn open_feed(choice: &AudioChoice, chunk_frames: usize) -> oblique::Result<AudioFeed> {
    match choice.clone() {
        AudioChoice::File(path) => AudioFeed::spawn(move || WavFileSource::open(path), chunk_frames),
        AudioChoice::Device(name) => {
            AudioFeed::spawn(move || DeviceSource::open(name.as_deref()), chunk_frames)
        }
    }
}

/// Window state; the engine is built once the event loop grants a window
struct App {
    config: EngineConfig,
    patch: Patch,
    audio: AudioChoice,
    window: Option<Arc<Window>>,
    engine: Option<Engine>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: EngineConfig, patch: Patch, audio: AudioChoice) -> Self {
        Self {
            config,
            patch,
            audio,
            window: None,
            engine: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title(format!("Oblique - {}", self.patch.name))
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );

        let (gpu, surface) = GpuContext::with_surface(Arc::clone(&window))?;
        let ctx = EngineContext::new(gpu, self.config.width, self.config.height);
        let size = window.inner_size();
        let display = SurfaceDisplay::new(&ctx, surface, size.width, size.height)?;
        let feed = open_feed(&self.audio, self.patch.analysis.chunk_frames)?;
        let engine = Engine::new(
            &self.config,
            ctx,
            &self.patch,
            &ModuleRegistry::with_builtins(),
            feed,
            Box::new(display),
        )?;

        info!("Oblique is running, press ESC to quit");
        self.window = Some(window);
        self.engine = Some(engine);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.resize(size.width, size.height);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let due = engine
            .next_deadline()
            .map_or(true, |deadline| Instant::now() >= deadline);
        if due {
            if let Err(e) = engine.tick() {
                self.fail(event_loop, e.into());
                return;
            }
        }
        if let Some(deadline) = engine.next_deadline() {
            event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.as_mut() {
            engine.shutdown();
        }
    }
}

fn run_windowed(config: EngineConfig, patch: Patch, audio: AudioChoice) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let mut app = App::new(config, patch, audio);
    event_loop.run_app(&mut app)?;
    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn run_headless(args: &Args, config: EngineConfig, patch: Patch) -> anyhow::Result<()> {
    let recording = args.recording_config();
    let gpu = GpuContext::headless()?;
    let ctx = EngineContext::new(gpu, config.width, config.height);
    let display = CaptureDisplay::new(recording.clone(), CaptureLog::new(1))?;
    let feed = open_feed(&args.audio_choice(), patch.analysis.chunk_frames)?;
    let source_duration = feed.info().duration_secs;

    let mut engine = Engine::new(
        &config,
        ctx,
        &patch,
        &ModuleRegistry::with_builtins(),
        feed,
        Box::new(display),
    )?;

    // Recording length wins; otherwise play a file to its end, or a device forever
    let max_frames = recording.map(|r| r.total_frames()).or_else(|| {
        source_duration.map(|secs| (secs * config.target_fps as f64).ceil() as u64)
    });
    let frames = engine.run(max_frames)?;
    engine.shutdown();
    info!("Rendered {} frames", frames);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    oblique::logging::init(&args.log_level)?;

    if args.list_devices {
        for name in list_input_devices()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = args.engine_config();
    config.validate().map_err(|e| anyhow!(e))?;

    let patch = match &args.patch {
        Some(path) => Patch::load(path)?,
        None => Patch::single(DEFAULT_MODULE),
    };

    if args.is_headless() {
        run_headless(&args, config, patch)
    } else {
        run_windowed(config, patch, args.audio_choice())
    }
}
