use crate::renderer::{Exit, Feedback, GameRenderer, Screen};
use anyhow::{Context, Result};
use doggo_core::{Outcome, ResponseKey, Stimulus};
use doggo_experiment::{GameConfig, GameEvent, GameSession, LevelReport};
use doggo_timing::{Clock, HighPrecisionClock};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::ThreadRng;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::Pixmap;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

const CALIBRATION_FRAMES: usize = 120;

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    session: GameSession<HighPrecisionClock, ThreadRng>,
    renderer: Option<GameRenderer>,
    canvas: Option<Pixmap>,
    screen: Screen,
    frame_clock: HighPrecisionClock,
    last_frame_ms: Option<f64>,
    shown: Option<Stimulus>,
    feedback: Option<Feedback>,
    exit: Option<Exit>,
    results_path: PathBuf,
    scale_factor: f64,
    refresh_rate: Option<f64>,
    should_exit: bool,
}

impl App {
    pub fn new(config: GameConfig, results_path: PathBuf) -> Self {
        let clock = HighPrecisionClock::new();
        let session = GameSession::new(config, clock.clone(), rand::rng());

        Self {
            window: None,
            pixels: None,
            session,
            renderer: None,
            canvas: None,
            screen: Screen::Welcome,
            frame_clock: clock,
            last_frame_ms: None,
            shown: None,
            feedback: None,
            exit: None,
            results_path,
            scale_factor: 1.0,
            refresh_rate: None,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        tracing::info!(
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "press SPACE to start or ESC to exit"
        );
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("no monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("Doggo/Nogo")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();
        self.scale_factor = window.scale_factor();

        tracing::info!(
            width = size.width,
            height = size.height,
            scale_factor = self.scale_factor,
            refresh_hz = ?self.refresh_rate,
            "display configured"
        );

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);
        self.canvas = Pixmap::new(size.width, size.height);
        self.renderer = Some(GameRenderer::new(size.width, size.height));

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer), Some(canvas)) =
            (self.pixels.as_mut(), self.renderer.as_ref(), self.canvas.as_mut())
        else {
            return Ok(());
        };

        let now = self.frame_clock.now_ms();
        renderer.render_frame(
            canvas,
            self.screen,
            &self.session,
            self.feedback.as_ref(),
            self.exit.as_ref(),
            now,
        )?;
        let frame = pixels.frame_mut();
        if frame.len() == canvas.data().len() {
            frame.copy_from_slice(canvas.data());
        }
        pixels.render()?;

        if let Some(last) = self.last_frame_ms.replace(now) {
            self.frame_clock
                .record_frame(Duration::from_secs_f64((now - last).max(0.0) / 1000.0));
        }
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        match self.screen {
            Screen::Welcome => {}
            Screen::Calibrating => {
                if self.frame_clock.frame_count() >= CALIBRATION_FRAMES {
                    let stats = self.frame_clock.calibration_stats();
                    tracing::info!(
                        mean_frame_ms = stats.average_frame_time_ns / 1e6,
                        jitter_ms = stats.jitter_ns / 1e6,
                        min_frame_ms = stats.min_frame_time_ns / 1e6,
                        max_frame_ms = stats.max_frame_time_ns / 1e6,
                        fps = stats.effective_fps,
                        "display calibrated"
                    );
                    self.screen = Screen::Playing;
                    let events = self.session.start();
                    self.apply(events)?;
                }
            }
            Screen::Playing => {
                let events = self.session.poll();
                self.apply(events)?;
            }
        }
        Ok(())
    }

    fn apply(&mut self, events: Vec<GameEvent>) -> Result<()> {
        let now = self.frame_clock.now_ms();
        for event in events {
            match event {
                GameEvent::StimulusOnset { trial, .. } => self.shown = Some(trial.stimulus),
                GameEvent::TrialResolved { outcome, .. } => {
                    let jump = match outcome {
                        Outcome::Fast { normalized_rt, .. } => normalized_rt,
                        _ => 0.0,
                    };
                    self.feedback = Some(Feedback {
                        trial_type: outcome.trial_type(),
                        jump,
                        started_ms: now,
                    });
                }
                GameEvent::StimulusExit { until_ms } => {
                    self.exit = self.shown.take().map(|stimulus| Exit {
                        stimulus,
                        started_ms: now,
                        until_ms,
                    });
                }
                GameEvent::BreakStarted { from, to } => {
                    tracing::info!(from = from.index(), to = to.index(), "break, press ENTER to continue");
                }
                GameEvent::LevelComplete(report) => self.save_results(report)?,
                GameEvent::TrialArmed { .. } | GameEvent::BreakReady | GameEvent::BreakResumed { .. } => {}
            }
        }
        Ok(())
    }

    fn save_results(&self, report: LevelReport) -> Result<()> {
        let results = report.into_results(self.session.config());
        let file = File::create(&self.results_path)
            .with_context(|| format!("creating {}", self.results_path.display()))?;
        results.write_json(BufWriter::new(file))?;
        tracing::info!(
            path = %self.results_path.display(),
            score = results.report.score,
            trials = results.report.trials_count,
            mean_rt_ms = ?results.summary.mean_rt_ms,
            error_rate = results.summary.error_rate,
            quantile = ?results.summary.quantile,
            "results saved"
        );
        Ok(())
    }

    fn handle_input(&mut self, key: PhysicalKey, event_loop: &ActiveEventLoop) -> Result<()> {
        let PhysicalKey::Code(code) = key else {
            return Ok(());
        };
        match (self.screen, code) {
            (_, KeyCode::Escape) => {
                let events = self.session.abort();
                self.apply(events)?;
                self.cleanup_and_exit(event_loop);
            }
            (Screen::Welcome, KeyCode::Space) => {
                self.screen = Screen::Calibrating;
                tracing::info!(frames = CALIBRATION_FRAMES, "calibrating display");
            }
            (Screen::Playing, KeyCode::Enter) => {
                let events = self.session.resume();
                self.apply(events)?;
            }
            (Screen::Playing, code) => {
                if let Some(key) = response_key(code) {
                    let events = self.session.press(key);
                    self.apply(events)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                tracing::warn!(error = %e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                tracing::warn!(error = %e, "failed to resize buffer");
            }
        }
        self.canvas = Pixmap::new(new_size.width, new_size.height);
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height);
        }
        tracing::debug!(width = new_size.width, height = new_size.height, "display resized");
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

/// Space doubles as the go key; arrows map by name.
fn response_key(code: KeyCode) -> Option<ResponseKey> {
    match code {
        KeyCode::Space => Some(ResponseKey::Down),
        other => ResponseKey::parse(&format!("{other:?}")),
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                tracing::error!(error = %e, "failed to create window and surface");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                let events = self.session.abort();
                if let Err(e) = self.apply(events) {
                    tracing::error!(error = %e, "failed to save results");
                }
                self.cleanup_and_exit(event_loop);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.update().and_then(|()| self.render()) {
                    tracing::error!(error = %e, "frame failed");
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                if let Err(e) = self.handle_input(event.physical_key, event_loop) {
                    tracing::error!(error = %e, "input handling failed");
                }
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
