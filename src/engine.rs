//! Fixed-cadence tick loop: audio → modules → compositor → display.

mod clock;
mod context;
mod display;
mod stats;
mod stop;

pub use clock::{TickClock, TickTime};
pub use context::EngineContext;
pub use display::{CaptureDisplay, CaptureLog, Display, SurfaceDisplay};
pub use stats::{FrameStats, StatsSummary, STATS_WINDOW};
pub use stop::StopSignal;

use std::thread;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::audio::{AudioFeatureFrame, AudioFeed, FeatureExtractor};
use crate::compositor::{Compositor, Patch};
use crate::error::{ObliqueError, Result};
use crate::gpu::RenderTarget;
use crate::module::{Module, ModuleRegistry, ShaderModule};
use crate::params::EngineConfig;
use crate::shader::ShaderLibrary;

/// Consecutive empty ticks before a starvation streak is logged
const STARVATION_LOG_TICKS: u64 = 30;

/// A live module and its slot in the composition graph
struct Layer {
    module: ShaderModule,
    slot: usize,
}

/// One audiovisual session
pub struct Engine {
    ctx: EngineContext,
    feed: AudioFeed,
    extractor: FeatureExtractor,
    layers: Vec<Layer>,
    compositor: Option<Compositor>,
    display: Option<Box<dyn Display>>,
    clock: TickClock,
    stats: FrameStats,
    stop: StopSignal,
    starved_ticks: u64,
    last_tick_start: Option<Instant>,
    shut_down: bool,
}

impl Engine {
    /// Build every layer of `patch`. Modules whose construction fails locally
    /// (contract, shader or allocation errors) are logged and left out of the
    /// fold; any other failure aborts.
    pub fn new(
        config: &EngineConfig,
        ctx: EngineContext,
        patch: &Patch,
        registry: &ModuleRegistry,
        feed: AudioFeed,
        display: Box<dyn Display>,
    ) -> Result<Self> {
        config.validate().map_err(ObliqueError::Config)?;
        let library = ShaderLibrary::new(&config.shader_root, &config.vendor_root);
        let extractor = FeatureExtractor::new(patch.analysis.clone(), feed.info())?;
        let visuals = patch.layers.instantiate(registry)?;

        // Allocated before the modules; a failure here leaves nothing to release
        let ops: Vec<_> = patch.layers.ops().collect();
        let compositor = Compositor::new(&ctx, &ops)?;

        let mut layers = Vec::with_capacity(visuals.len());
        for (slot, (visual, op)) in visuals.into_iter().enumerate() {
            let mut module = ShaderModule::new(visual);
            match module.initialize(&ctx, &library) {
                Ok(()) => {
                    debug!("Layer {}: '{}' ({})", slot, module.name(), op);
                    layers.push(Layer { module, slot });
                }
                Err(e) if e.is_module_local() => {
                    error!("Module '{}' excluded from composition: {}", module.name(), e);
                    module.dispose(&ctx);
                }
                Err(e) => {
                    module.dispose(&ctx);
                    release_layers(&ctx, &mut layers);
                    compositor.release(&ctx);
                    return Err(e);
                }
            }
        }
        if layers.is_empty() && !patch.layers.is_empty() {
            warn!("No module of patch '{}' could be built; output is black", patch.name);
        }

        info!(
            "Engine ready: patch '{}', {}/{} layers, {}x{} @ {} fps",
            patch.name,
            layers.len(),
            patch.layers.len(),
            config.width,
            config.height,
            config.target_fps
        );

        Ok(Self {
            ctx,
            feed,
            extractor,
            layers,
            compositor: Some(compositor),
            display: Some(display),
            clock: TickClock::new(config.frame_interval()),
            stats: FrameStats::new(config.log_stats.then_some(config.stats_interval_frames)),
            stop: StopSignal::new(),
            starved_ticks: 0,
            last_tick_start: None,
            shut_down: false,
        })
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Handle that stops [`run`](Self::run) at the next tick boundary
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn stats(&self) -> StatsSummary {
        self.stats.summary()
    }

    /// Ticks run so far
    pub fn frames(&self) -> u64 {
        self.clock.frames()
    }

    /// Names of the modules taking part in the fold, in fold order
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.module.name()).collect()
    }

    /// Feature frame used by the most recent tick
    pub fn last_features(&self) -> &AudioFeatureFrame {
        self.extractor.last_frame()
    }

    pub fn is_audio_playing(&self) -> bool {
        self.feed.is_playing()
    }

    /// When the next tick is due; `None` before the first
    pub fn next_deadline(&self) -> Option<Instant> {
        self.clock.next_deadline()
    }

    /// Run one full tick. Module-local failures drop that module; any other
    /// error is fatal to the session.
    pub fn tick(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(ObliqueError::Display("engine already shut down".to_string()));
        }
        let start = Instant::now();
        let time = self.clock.begin_tick(start);

        let chunks = self.feed.drain();
        self.track_starvation(chunks.is_empty());
        let features = self.extractor.process(&chunks, self.feed.is_playing());

        let mut encoder = self
            .ctx
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Tick Encoder"),
            });

        let mut outputs: Vec<(&RenderTarget, usize)> = Vec::with_capacity(self.layers.len());
        let mut failed = Vec::new();
        for (index, layer) in self.layers.iter_mut().enumerate() {
            let slot = layer.slot;
            let name = layer.module.name().to_string();
            let result = match layer.module.update(&features, &time) {
                Ok(params) => layer.module.render(&self.ctx, &mut encoder, &params),
                Err(e) => Err(e),
            };
            match result {
                Ok(target) => outputs.push((target, slot)),
                Err(e) if e.is_module_local() => {
                    error!("Module '{}' failed and was removed: {}", name, e);
                    failed.push(index);
                }
                Err(e) => return Err(e),
            }
        }

        let compositor = self
            .compositor
            .as_mut()
            .ok_or_else(|| ObliqueError::Display("compositor already released".to_string()))?;
        let frame = compositor.compose(&self.ctx, &mut encoder, &outputs)?;
        self.ctx.gpu.queue.submit(std::iter::once(encoder.finish()));

        let display = self
            .display
            .as_mut()
            .ok_or_else(|| ObliqueError::Display("display already disposed".to_string()))?;
        display.present(&self.ctx, frame, &time)?;
        drop(outputs);

        for index in failed.into_iter().rev() {
            let mut layer = self.layers.remove(index);
            layer.module.dispose(&self.ctx);
        }

        let now = Instant::now();
        let overrun = self.clock.is_overrun(now);
        if overrun {
            debug!(
                "Tick {} overran by {:?}",
                time.frame,
                now.saturating_duration_since(start + self.clock.interval())
            );
        }
        let frame_time = self
            .last_tick_start
            .map(|last| start.saturating_duration_since(last))
            .unwrap_or(self.clock.interval());
        self.last_tick_start = Some(start);
        self.stats.record(frame_time, overrun);
        Ok(())
    }

    /// Tick at the configured cadence until stopped or `max_frames` ticks have run.
    /// An overrun tick is followed immediately by the next. Returns ticks run.
    pub fn run(&mut self, max_frames: Option<u64>) -> Result<u64> {
        while !self.stop.is_requested() {
            if max_frames.is_some_and(|max| self.clock.frames() >= max) {
                break;
            }
            self.tick()?;
            let remaining = self.clock.remaining(Instant::now());
            if !remaining.is_zero() {
                thread::sleep(remaining);
            }
        }
        Ok(self.clock.frames())
    }

    /// Forward a window size change to the display
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(display) = self.display.as_mut() {
            display.resize(&self.ctx, width, height);
        }
    }

    /// Dispose every module, the compositor and the display exactly once,
    /// stop the audio feed and check the resource ledger. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        release_layers(&self.ctx, &mut self.layers);
        if let Some(compositor) = self.compositor.take() {
            compositor.release(&self.ctx);
        }
        if let Some(mut display) = self.display.take() {
            display.dispose(&self.ctx);
        }
        self.feed.stop();
        self.ctx.release_shared();
        self.ctx.gpu.device.poll(wgpu::Maintain::Wait);

        let s = self.stats.summary();
        info!(
            "Engine stopped after {} frames ({:.1} fps avg, {} overruns)",
            s.frames, s.avg_fps, s.overruns
        );
        if self.ctx.ledger.check_balanced() {
            debug!("All GPU resources released");
        }
    }

    fn track_starvation(&mut self, starved: bool) {
        if starved {
            self.starved_ticks += 1;
            if self.starved_ticks == STARVATION_LOG_TICKS {
                debug!(
                    "No audio for {} ticks, holding last features",
                    self.starved_ticks
                );
            }
        } else {
            if self.starved_ticks >= STARVATION_LOG_TICKS {
                debug!("Audio resumed after {} starved ticks", self.starved_ticks);
            }
            self.starved_ticks = 0;
        }
    }
}

/// Dispose every layer's module and empty the list
fn release_layers(ctx: &EngineContext, layers: &mut Vec<Layer>) {
    for mut layer in layers.drain(..) {
        layer.module.dispose(ctx);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
