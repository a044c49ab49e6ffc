use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use glam::{Vec2, Vec3};
use orbit_stage::animation::AnimationStage;
use orbit_stage::engine::{
    BlobBinding, HostBindings, OrbitSystemManager, RingBinding,
};
use orbit_stage::error::OrbitError;
use orbit_stage::geometry::{ParticlePosition, StandardGenerator};
use orbit_stage::host::{
    AnimationObserver, BlobVisual, LensEffect, ManualScheduler, OrthoProjector,
    RenderLayer, RingVisual, TextPlacement,
};
use orbit_stage::options::Options;
use web_time::{Duration, Instant};

/// Run the stage engine headlessly and log every transition.
#[derive(Parser, Debug)]
#[command(name = "orbit-stage", version)]
struct Args {
    /// TOML preset to load; built-in defaults otherwise.
    #[arg(short, long)]
    preset: Option<PathBuf>,
    /// Simulated seconds to run.
    #[arg(short, long, default_value_t = 20.0)]
    seconds: f64,
    /// Simulated display refresh rate.
    #[arg(long, default_value_t = 60)]
    refresh: u32,
    /// Leave the viewport at this time (seconds).
    #[arg(long)]
    exit_at: Option<f64>,
    /// Re-enter the viewport at this time (seconds).
    #[arg(long)]
    enter_at: Option<f64>,
    /// Hide the page at this time (seconds).
    #[arg(long)]
    hide_at: Option<f64>,
    /// Show the page again at this time (seconds).
    #[arg(long)]
    show_at: Option<f64>,
    /// Print the options JSON schema and exit.
    #[arg(long)]
    schema: bool,
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Viewport(bool),
    Visibility(bool),
}

/// Logs observer edges at `info`.
struct TransitionLog;

impl AnimationObserver for TransitionLog {
    fn on_stage_change(
        &mut self,
        source: &str,
        from: AnimationStage,
        to: AnimationStage,
    ) {
        log::info!("[{source}] {from} -> {to}");
    }

    fn on_loop_complete(&mut self, source: &str, loop_count: u32) {
        log::info!("[{source}] loop {loop_count}");
    }

    fn on_animation_complete(&mut self, source: &str) {
        log::info!("[{source}] cycle complete");
    }

    fn on_reset(&mut self, source: &str) {
        log::debug!("[{source}] reset");
    }

    fn on_reveal(&mut self) {
        log::info!("cards revealed");
    }
}

struct HeadlessRing(String);

impl RingVisual for HeadlessRing {
    fn set_sphere_positions(&mut self, _positions: &[Vec3]) {}

    fn set_text(&mut self, index: usize, placement: TextPlacement) {
        log::trace!(
            "{} text {index}: ({:.0}, {:.0}) opacity {:.2}",
            self.0,
            placement.screen.x,
            placement.screen.y,
            placement.opacity
        );
    }
}

struct HeadlessBlob;

impl BlobVisual for HeadlessBlob {
    fn set_particles(&mut self, particles: &[ParticlePosition]) {
        log::debug!("blob particles: {}", particles.len());
    }

    fn set_scales(&mut self, _group_scale: f32, _particle_scale: f32) {}
}

struct HeadlessLens;

impl LensEffect for HeadlessLens {
    fn update(&mut self, _dt: f32, _elapsed: f64) {}
}

struct HeadlessLayer;

impl RenderLayer for HeadlessLayer {
    fn render(&mut self) -> Result<(), OrbitError> {
        Ok(())
    }
}

fn bindings(options: &Options, scheduler: &ManualScheduler) -> HostBindings {
    HostBindings {
        scheduler: Box::new(scheduler.clone()),
        projector: Box::new(OrthoProjector {
            pixels_per_unit: 120.0,
            origin: Vec2::new(640.0, 360.0),
        }),
        layers: vec![Box::new(HeadlessLayer)],
        rings: options
            .rings
            .iter()
            .map(|ring| RingBinding {
                visual: Box::new(HeadlessRing(ring.label.clone())),
                observer: Box::new(TransitionLog),
            })
            .collect(),
        blob: options.blob.as_ref().map(|_| BlobBinding {
            visual: Box::new(HeadlessBlob),
            lens: Box::new(HeadlessLens),
            observer: Box::new(TransitionLog),
        }),
        generator: Box::new(StandardGenerator),
        observer: Box::new(TransitionLog),
        subscription: None,
    }
}

fn signals(args: &Args) -> Vec<(f64, Signal)> {
    let mut signals: Vec<(f64, Signal)> = [
        (args.exit_at, Signal::Viewport(false)),
        (args.enter_at, Signal::Viewport(true)),
        (args.hide_at, Signal::Visibility(false)),
        (args.show_at, Signal::Visibility(true)),
    ]
    .into_iter()
    .filter_map(|(at, signal)| at.map(|t| (t, signal)))
    .collect();
    signals.sort_by(|a, b| a.0.total_cmp(&b.0));
    signals
}

fn run(args: &Args) -> Result<(), OrbitError> {
    if args.schema {
        let schema = serde_json::to_string_pretty(&Options::json_schema())
            .map_err(|e| OrbitError::OptionsParse(e.to_string()))?;
        writeln!(std::io::stdout(), "{schema}")?;
        return Ok(());
    }

    let mut options = match &args.preset {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    options.lifecycle.initially_in_viewport = true;

    let t0 = Instant::now();
    let scheduler = ManualScheduler::new(t0);
    let mut manager = OrbitSystemManager::new(
        options.clone(),
        bindings(&options, &scheduler),
        t0,
    )?;
    manager.start(t0);

    let interval = Duration::from_secs_f64(1.0 / f64::from(args.refresh.max(1)));
    let end = t0 + Duration::from_secs_f64(args.seconds.max(0.0));
    let mut pending = signals(args).into_iter().peekable();
    let mut now = t0;
    while now < end {
        now += interval;
        let secs = now.duration_since(t0).as_secs_f64();
        while let Some((_, signal)) = pending.next_if(|(at, _)| *at <= secs) {
            scheduler.set_now(now);
            log::info!("{secs:.2}s: {signal:?}");
            match signal {
                Signal::Viewport(entered) => {
                    manager.handle_viewport_change(entered, now);
                }
                Signal::Visibility(visible) => {
                    manager.handle_visibility_change(visible, now);
                }
            }
        }
        let _ = scheduler.pump(&mut manager, now);
    }

    for ring in manager.rings() {
        log::info!(
            "{}: stage {}, radius {:.3}, loops {}",
            ring.label(),
            ring.current_stage(),
            ring.current_radius(),
            ring.loop_count()
        );
    }
    if let Some(blob) = manager.blob() {
        log::info!(
            "{}: stage {}, scale {:.3}, loops {}",
            blob.label(),
            blob.current_stage(),
            blob.current_scale(),
            blob.loop_count()
        );
    }
    log::info!(
        "{} frames rendered, {:.1} fps",
        manager.frames_rendered(),
        manager.fps()
    );
    manager.dispose();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
