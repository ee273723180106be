use anyhow::Result;
use doggo_core::{Side, Stimulus, TrialType, PHASE_COUNT};
use doggo_experiment::{GameSession, SessionStatus, StimulusState};
use doggo_timing::Clock;
use rand::Rng;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

const JUMP_MS: f64 = 450.0;
const FLASH_MS: f64 = 300.0;
const MAX_JUMP_PX: f32 = 140.0;

/// What the app is showing around the level itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Calibrating,
    Playing,
}

/// Feedback animation started by the last resolved trial.
#[derive(Debug, Clone, Copy)]
pub struct Feedback {
    pub trial_type: TrialType,
    /// `1 - rt/maxRT` for fast responses, otherwise 0.
    pub jump: f64,
    pub started_ms: f64,
}

/// Stimulus sliding out after it was answered.
#[derive(Debug, Clone, Copy)]
pub struct Exit {
    pub stimulus: Stimulus,
    pub started_ms: f64,
    pub until_ms: f64,
}

/// Plain shape renderer for the game state. Everything is drawn from scratch
/// each frame.
pub struct GameRenderer {
    width: u32,
    height: u32,
    center_x: f32,
    ground_y: f32,
}

impl GameRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            center_x: width as f32 / 2.0,
            ground_y: height as f32 * 0.75,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    pub fn render_frame<C: Clock, R: Rng>(
        &self,
        pixmap: &mut Pixmap,
        screen: Screen,
        session: &GameSession<C, R>,
        feedback: Option<&Feedback>,
        exit: Option<&Exit>,
        now_ms: f64,
    ) -> Result<()> {
        pixmap.fill(Color::from_rgba8(24, 26, 38, 255));

        match screen {
            Screen::Welcome => self.draw_fixation(pixmap, 1.0)?,
            Screen::Calibrating => {
                let pulse = 0.5 + 0.5 * ((now_ms / 200.0).sin() as f32);
                self.draw_fixation(pixmap, pulse)?;
            }
            Screen::Playing => self.render_level(pixmap, session, feedback, exit, now_ms)?,
        }
        Ok(())
    }

    fn render_level<C: Clock, R: Rng>(
        &self,
        pixmap: &mut Pixmap,
        session: &GameSession<C, R>,
        feedback: Option<&Feedback>,
        exit: Option<&Exit>,
        now_ms: f64,
    ) -> Result<()> {
        self.draw_ground(pixmap)?;
        self.draw_phase_bars(pixmap, session)?;

        if let StimulusState::Visible(trial) = session.stimulus() {
            self.draw_stimulus(pixmap, &trial.stimulus, 255)?;
        }
        if let Some(exit) = exit.filter(|e| now_ms < e.until_ms) {
            let span = (exit.until_ms - exit.started_ms).max(1.0);
            let left = ((exit.until_ms - now_ms) / span).clamp(0.0, 1.0);
            self.draw_stimulus(pixmap, &exit.stimulus, (left * 255.0) as u8)?;
        }

        let lift = feedback.map_or(0.0, |f| jump_height(f, now_ms));
        self.draw_dog(pixmap, lift)?;

        if let Some(f) = feedback.filter(|f| now_ms - f.started_ms < FLASH_MS) {
            self.draw_flash(pixmap, f.trial_type)?;
        }

        match session.status() {
            SessionStatus::Break { ready, .. } => self.draw_break(pixmap, ready, now_ms)?,
            SessionStatus::Done => self.draw_break(pixmap, false, now_ms)?,
            SessionStatus::Idle | SessionStatus::Running => {}
        }
        Ok(())
    }

    fn draw_fixation(&self, pixmap: &mut Pixmap, alpha: f32) -> Result<()> {
        let paint = solid(Color::from_rgba8(255, 255, 255, (alpha.clamp(0.0, 1.0) * 255.0) as u8));
        let cy = self.height as f32 / 2.0;
        let cross = 20.0;
        let mut path = PathBuilder::new();
        path.move_to(self.center_x - cross, cy);
        path.line_to(self.center_x + cross, cy);
        path.move_to(self.center_x, cy - cross);
        path.line_to(self.center_x, cy + cross);
        let path = path
            .finish()
            .ok_or_else(|| anyhow::anyhow!("empty fixation path"))?;
        let stroke = Stroke {
            width: 2.0,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        Ok(())
    }

    fn draw_ground(&self, pixmap: &mut Pixmap) -> Result<()> {
        let rect = Rect::from_xywh(0.0, self.ground_y, self.width as f32, self.height as f32 - self.ground_y)
            .ok_or_else(|| anyhow::anyhow!("invalid ground rect"))?;
        pixmap.fill_rect(rect, &solid(Color::from_rgba8(46, 82, 52, 255)), Transform::identity(), None);
        Ok(())
    }

    /// One bar per phase: finished phases full, the current one filled to
    /// its share of the phase target.
    fn draw_phase_bars<C: Clock, R: Rng>(&self, pixmap: &mut Pixmap, session: &GameSession<C, R>) -> Result<()> {
        let margin = 24.0;
        let gap = 12.0;
        let bar_h = 14.0;
        let bar_w = (self.width as f32 - 2.0 * margin - gap * (PHASE_COUNT as f32 - 1.0)) / PHASE_COUNT as f32;
        let current = session.phase().index();
        let done = session.is_done();

        for i in 0..PHASE_COUNT {
            let x = margin + i as f32 * (bar_w + gap);
            let track = Rect::from_xywh(x, margin, bar_w, bar_h)
                .ok_or_else(|| anyhow::anyhow!("invalid bar rect"))?;
            pixmap.fill_rect(track, &solid(Color::from_rgba8(60, 62, 80, 255)), Transform::identity(), None);

            let fill = if i < current || done {
                1.0
            } else if i == current {
                session.phase_progress() as f32
            } else {
                0.0
            };
            if fill > 0.0 {
                if let Some(bar) = Rect::from_xywh(x, margin, bar_w * fill, bar_h) {
                    pixmap.fill_rect(bar, &solid(Color::from_rgba8(250, 196, 64, 255)), Transform::identity(), None);
                }
            }
        }
        Ok(())
    }

    fn stimulus_position(&self, stimulus: &Stimulus) -> (f32, f32) {
        let y = self.height as f32 * 0.35;
        match stimulus.region() {
            None => (self.center_x, y),
            Some(Side::Left) => (self.width as f32 * 0.25, y),
            Some(Side::Right) => (self.width as f32 * 0.75, y),
        }
    }

    fn draw_stimulus(&self, pixmap: &mut Pixmap, stimulus: &Stimulus, alpha: u8) -> Result<()> {
        let (x, y) = self.stimulus_position(stimulus);
        let size = 90.0;
        let mut path = PathBuilder::new();
        match stimulus.direction() {
            None => path.push_circle(x, y, size / 2.0),
            Some(Side::Left) => {
                path.move_to(x - size / 2.0, y);
                path.line_to(x + size / 2.0, y - size / 3.0);
                path.line_to(x + size / 6.0, y - size / 6.0);
                path.line_to(x + size / 6.0, y + size / 6.0);
                path.line_to(x + size / 2.0, y + size / 3.0);
                path.close();
            }
            Some(Side::Right) => {
                path.move_to(x + size / 2.0, y);
                path.line_to(x - size / 2.0, y - size / 3.0);
                path.line_to(x - size / 6.0, y - size / 6.0);
                path.line_to(x - size / 6.0, y + size / 6.0);
                path.line_to(x - size / 2.0, y + size / 3.0);
                path.close();
            }
        }
        let path = path
            .finish()
            .ok_or_else(|| anyhow::anyhow!("empty stimulus path"))?;
        pixmap.fill_path(
            &path,
            &solid(Color::from_rgba8(232, 92, 72, alpha)),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
        Ok(())
    }

    fn draw_dog(&self, pixmap: &mut Pixmap, lift: f32) -> Result<()> {
        let body_w = 110.0;
        let body_h = 56.0;
        let base_y = self.ground_y - body_h - 20.0 - lift;
        let fur = solid(Color::from_rgba8(198, 142, 88, 255));

        let body = Rect::from_xywh(self.center_x - body_w / 2.0, base_y, body_w, body_h)
            .ok_or_else(|| anyhow::anyhow!("invalid dog rect"))?;
        pixmap.fill_rect(body, &fur, Transform::identity(), None);

        let mut path = PathBuilder::new();
        path.push_circle(self.center_x + body_w / 2.0, base_y - 8.0, 30.0);
        for leg in [-0.4f32, -0.15, 0.15, 0.4] {
            if let Some(rect) = Rect::from_xywh(self.center_x + leg * body_w - 6.0, base_y + body_h, 12.0, 20.0) {
                path.push_rect(rect);
            }
        }
        let path = path
            .finish()
            .ok_or_else(|| anyhow::anyhow!("empty dog path"))?;
        pixmap.fill_path(&path, &fur, FillRule::Winding, Transform::identity(), None);
        Ok(())
    }

    fn draw_flash(&self, pixmap: &mut Pixmap, trial_type: TrialType) -> Result<()> {
        let color = match trial_type {
            TrialType::Fast => Color::from_rgba8(96, 220, 120, 255),
            TrialType::Slow => Color::from_rgba8(240, 210, 90, 255),
            TrialType::Early | TrialType::Error => Color::from_rgba8(230, 70, 70, 255),
            TrialType::Timeout => Color::from_rgba8(140, 140, 150, 255),
        };
        let rect = Rect::from_xywh(4.0, 4.0, self.width as f32 - 8.0, self.height as f32 - 8.0)
            .ok_or_else(|| anyhow::anyhow!("invalid flash rect"))?;
        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke {
            width: 8.0,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &solid(color), &stroke, Transform::identity(), None);
        Ok(())
    }

    /// Dimmed overlay; the bar pulses green once the break can be dismissed.
    fn draw_break(&self, pixmap: &mut Pixmap, ready: bool, now_ms: f64) -> Result<()> {
        let full = Rect::from_xywh(0.0, 0.0, self.width as f32, self.height as f32)
            .ok_or_else(|| anyhow::anyhow!("invalid overlay rect"))?;
        pixmap.fill_rect(full, &solid(Color::from_rgba8(0, 0, 0, 150)), Transform::identity(), None);

        let color = if ready {
            let pulse = 0.6 + 0.4 * ((now_ms / 300.0).sin() as f32).abs();
            Color::from_rgba8(96, 220, 120, (pulse * 255.0) as u8)
        } else {
            Color::from_rgba8(120, 120, 130, 255)
        };
        let bar = Rect::from_xywh(self.center_x - 120.0, self.height as f32 / 2.0 - 10.0, 240.0, 20.0)
            .ok_or_else(|| anyhow::anyhow!("invalid break bar"))?;
        pixmap.fill_rect(bar, &solid(color), Transform::identity(), None);
        Ok(())
    }
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

/// Parabolic hop whose height scales with how fast the response was.
fn jump_height(feedback: &Feedback, now_ms: f64) -> f32 {
    let t = (now_ms - feedback.started_ms) / JUMP_MS;
    if feedback.trial_type != TrialType::Fast || !(0.0..1.0).contains(&t) {
        return 0.0;
    }
    (4.0 * t * (1.0 - t) * feedback.jump) as f32 * MAX_JUMP_PX
}
