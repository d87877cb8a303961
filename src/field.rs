use ::rand as external_rand;
use external_rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::FieldConfig;
use crate::error::FieldResult;
use crate::particle::{Motion, Particle};
use crate::surface::Surface;
use crate::types::{Bounds, Point, Rgba};

const LAUNCH_FLASH_COLOR: Rgba = Rgba::new(108, 99, 255, 0.2);
const LAUNCH_FLASH_RADIUS: f32 = 50.0;
const LAUNCH_FLASH_Y: f32 = -100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    Launching,
    Steady,
    Stopped,
}

/// Identifies one requested frame. Only the most recently issued handle is honored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrameHandle(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Frame drawn; run the returned handle on the next display frame.
    Scheduled(FrameHandle),
    /// Frame drawn and the play time is over; nothing further is scheduled.
    Stopped,
    /// The handle was cancelled or superseded; nothing was drawn.
    Stale,
}

#[derive(Clone, Debug, Serialize)]
pub struct FieldStats {
    pub phase: Phase,
    pub elapsed_ms: f64,
    pub frames: u64,
    pub particle_count: usize,
    pub lines_last_frame: usize,
    pub mean_opacity: f32,
    pub surface_opacity: f32,
}

/// The particle field: pool, lifecycle, and per-frame rendering.
pub struct ParticleField {
    pub config: FieldConfig,
    pub bounds: Bounds,
    pub particles: Vec<Particle>,
    phase: Phase,
    start_time: Option<f64>,
    elapsed_ms: f64,
    frames: u64,
    lines_last_frame: usize,
    next_handle: u64,
    pending: Option<FrameHandle>,
    surface_opacity: f32,
    fading: bool,
}

impl ParticleField {
    pub fn new(config: FieldConfig, bounds: Bounds) -> FieldResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            bounds,
            particles: Vec::new(),
            phase: Phase::Uninitialized,
            start_time: None,
            elapsed_ms: 0.0,
            frames: 0,
            lines_last_frame: 0,
            next_handle: 0,
            pending: None,
            surface_opacity: 0.0,
            fading: false,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[cfg(test)]
    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn is_fading(&self) -> bool {
        self.fading
    }

    /// Begin (or restart) the animation from any phase.
    ///
    /// Cancels the outstanding frame first, so a handle issued before this call can
    /// never draw against the new pool.
    pub fn start<R: Rng, S: Surface + ?Sized>(
        &mut self,
        rng: &mut R,
        surface: &mut S,
    ) -> FrameHandle {
        self.cancel();

        self.particles.clear();
        self.particles.reserve(self.config.particle_count);
        for _ in 0..self.config.particle_count {
            self.particles.push(Particle::spawn(rng, &self.config, self.bounds));
        }

        self.surface_opacity = 1.0;
        surface.set_opacity(1.0);
        self.fading = false;
        self.start_time = None;
        self.elapsed_ms = 0.0;
        self.frames = 0;
        self.lines_last_frame = 0;
        self.phase = Phase::Launching;

        if self.config.launch_flash {
            surface.fill_circle(
                Point::new(self.bounds.center_x(), LAUNCH_FLASH_Y),
                LAUNCH_FLASH_RADIUS,
                LAUNCH_FLASH_COLOR,
            );
        }

        info!(
            particles = self.particles.len(),
            width = self.bounds.width,
            height = self.bounds.height,
            "particle field started"
        );
        self.schedule()
    }

    /// Drop the outstanding frame request, if any.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// New bounds apply to future frames; current positions are kept as they are.
    pub fn resize(&mut self, bounds: Bounds) {
        if bounds != self.bounds {
            debug!(width = bounds.width, height = bounds.height, "surface resized");
            self.bounds = bounds;
        }
    }

    fn schedule(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some(handle);
        handle
    }

    /// Run one display frame for `handle` at host time `now_ms`.
    pub fn frame<R: Rng, S: Surface + ?Sized>(
        &mut self,
        handle: FrameHandle,
        now_ms: f64,
        surface: &mut S,
        rng: &mut R,
    ) -> FrameOutcome {
        if self.pending != Some(handle) {
            return FrameOutcome::Stale;
        }
        self.pending = None;

        let start = *self.start_time.get_or_insert(now_ms);
        self.elapsed_ms = now_ms - start;

        if self.phase == Phase::Launching && self.elapsed_ms > self.config.launch_phase_ms {
            debug!(elapsed_ms = self.elapsed_ms, "launch phase over");
            self.phase = Phase::Steady;
        }

        surface.fill_rect(
            0.0,
            0.0,
            self.bounds.width,
            self.bounds.height,
            self.config.trail_color,
        );

        let motion = match self.phase {
            Phase::Launching => Motion::Launch,
            _ => Motion::Drift,
        };
        for p in &mut self.particles {
            p.update(rng, &self.config, self.bounds, motion);
        }
        for p in &self.particles {
            p.draw(surface, &self.config);
        }

        self.lines_last_frame = connect_particles(&mut self.particles, &self.config, surface);
        self.frames += 1;

        if self.config.play_once && self.elapsed_ms >= self.config.duration_ms {
            self.stop();
            return FrameOutcome::Stopped;
        }

        FrameOutcome::Scheduled(self.schedule())
    }

    fn stop(&mut self) {
        self.cancel();
        self.phase = Phase::Stopped;
        self.fading = self.config.fade_out;
        info!(
            frames = self.frames,
            elapsed_ms = self.elapsed_ms,
            "particle field stopped"
        );
    }

    /// One step of the optional fade-out. Returns `false` once the surface is hidden.
    pub fn fade_tick<S: Surface + ?Sized>(&mut self, surface: &mut S) -> bool {
        if !self.fading {
            return false;
        }
        self.surface_opacity = (self.surface_opacity - self.config.fade_out_step).max(0.0);
        surface.set_opacity(self.surface_opacity);
        if self.surface_opacity <= 0.0 {
            self.fading = false;
            debug!("fade-out finished");
        }
        self.fading
    }

    pub fn stats(&self) -> FieldStats {
        let mean_opacity = if self.particles.is_empty() {
            0.0
        } else {
            self.particles.iter().map(|p| p.opacity).sum::<f32>() / self.particles.len() as f32
        };
        FieldStats {
            phase: self.phase,
            elapsed_ms: self.elapsed_ms,
            frames: self.frames,
            particle_count: self.particles.len(),
            lines_last_frame: self.lines_last_frame,
            mean_opacity,
            surface_opacity: self.surface_opacity,
        }
    }
}

/// Line strength for a pair at `distance`: 1 at contact, 0 at `max_distance`.
pub fn link_strength(distance: f32, max_distance: f32) -> f32 {
    (1.0 - distance / max_distance).max(0.0)
}

/// Connectivity pass. Draws one line per close pair, capped per particle, and
/// returns the number of lines drawn.
///
/// Particles are sorted top to bottom first, so the cap favors the higher ones.
pub fn connect_particles<S: Surface + ?Sized>(
    particles: &mut [Particle],
    config: &FieldConfig,
    surface: &mut S,
) -> usize {
    for p in particles.iter_mut() {
        p.connections = 0;
    }
    particles.sort_by(|a, b| a.y.total_cmp(&b.y));

    let cap = config.max_connections;
    let mut lines = 0;
    for a in 0..particles.len() {
        for b in (a + 1)..particles.len() {
            if particles[a].connections >= cap {
                break;
            }
            if particles[b].connections >= cap {
                continue;
            }

            let pa = particles[a].position();
            let pb = particles[b].position();
            let distance = pa.distance(pb);
            if distance >= config.max_distance {
                continue;
            }

            let strength = link_strength(distance, config.max_distance);
            surface.stroke_gradient_line(
                pa,
                pb,
                config.line_width * strength,
                particles[a].color.scale_alpha(strength),
                particles[b].color.scale_alpha(strength),
            );
            particles[a].connections += 1;
            particles[b].connections += 1;
            lines += 1;
        }
    }
    lines
}
