// Host-side frame scheduling: at most one frame request is outstanding at a time

use ::rand as external_rand;
use external_rand::Rng;

use crate::field::{FrameHandle, FrameOutcome, ParticleField};
use crate::surface::Surface;

#[derive(Default)]
pub struct FrameLoop {
    pending: Option<FrameHandle>,
    frames_run: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)start the field. The previously pending handle is dropped before the new
    /// pool exists, so two loops can never run against two pools.
    pub fn start<R: Rng, S: Surface + ?Sized>(
        &mut self,
        field: &mut ParticleField,
        rng: &mut R,
        surface: &mut S,
    ) {
        self.pending = Some(field.start(rng, surface));
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Frames this loop has handed to the field since it was created.
    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }

    /// Called once per display frame. Runs the pending frame if there is one,
    /// otherwise advances the fade-out when it is active.
    pub fn tick<R: Rng, S: Surface + ?Sized>(
        &mut self,
        field: &mut ParticleField,
        now_ms: f64,
        surface: &mut S,
        rng: &mut R,
    ) {
        let Some(handle) = self.pending.take() else {
            field.fade_tick(surface);
            return;
        };

        match field.frame(handle, now_ms, surface, rng) {
            FrameOutcome::Scheduled(next) => {
                self.frames_run += 1;
                self.pending = Some(next);
            }
            FrameOutcome::Stopped => {
                self.frames_run += 1;
            }
            FrameOutcome::Stale => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use crate::field::Phase;
    use crate::surface::RecordingSurface;
    use crate::types::Bounds;
    use external_rand::rngs::StdRng;
    use external_rand::SeedableRng;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn setup(config: FieldConfig) -> (ParticleField, RecordingSurface, StdRng) {
        let field = ParticleField::new(config, Bounds::new(640.0, 480.0).unwrap()).unwrap();
        (field, RecordingSurface::new(), StdRng::seed_from_u64(42))
    }

    #[test]
    fn frame_count_stops_growing_after_duration() {
        let (mut field, mut surface, mut rng) = setup(FieldConfig {
            particle_count: 10,
            duration_ms: 4000.0,
            ..FieldConfig::default()
        });
        let mut frame_loop = FrameLoop::new();
        frame_loop.start(&mut field, &mut rng, &mut surface);

        let mut now = 0.0;
        while frame_loop.is_running() {
            frame_loop.tick(&mut field, now, &mut surface, &mut rng);
            now += FRAME_MS;
        }
        let frames = frame_loop.frames_run();
        assert_eq!(field.phase(), Phase::Stopped);
        assert_eq!(frames, field.frames());

        for _ in 0..120 {
            frame_loop.tick(&mut field, now, &mut surface, &mut rng);
            now += FRAME_MS;
        }
        assert_eq!(frame_loop.frames_run(), frames);
        assert_eq!(field.frames(), frames);
    }

    #[test]
    fn restart_mid_run_keeps_a_single_loop() {
        let (mut field, mut surface, mut rng) = setup(FieldConfig {
            play_once: false,
            ..FieldConfig::default()
        });
        let mut frame_loop = FrameLoop::new();
        frame_loop.start(&mut field, &mut rng, &mut surface);
        for i in 0..30 {
            frame_loop.tick(&mut field, i as f64 * FRAME_MS, &mut surface, &mut rng);
        }

        frame_loop.start(&mut field, &mut rng, &mut surface);
        assert_eq!(field.frames(), 0);
        for i in 0..10 {
            frame_loop.tick(&mut field, 1000.0 + i as f64 * FRAME_MS, &mut surface, &mut rng);
        }
        assert_eq!(field.frames(), 10);
        assert_eq!(frame_loop.frames_run(), 40);
    }

    #[test]
    fn idle_ticks_drive_fade_out() {
        let (mut field, mut surface, mut rng) = setup(FieldConfig {
            particle_count: 5,
            duration_ms: 100.0,
            launch_phase_ms: 50.0,
            fade_out: true,
            fade_out_step: 0.25,
            ..FieldConfig::default()
        });
        let mut frame_loop = FrameLoop::new();
        frame_loop.start(&mut field, &mut rng, &mut surface);

        let mut now = 0.0;
        while frame_loop.is_running() {
            frame_loop.tick(&mut field, now, &mut surface, &mut rng);
            now += FRAME_MS;
        }
        assert_eq!(surface.opacity, 1.0);

        for _ in 0..4 {
            frame_loop.tick(&mut field, now, &mut surface, &mut rng);
        }
        assert_eq!(surface.opacity, 0.0);
        assert!(!field.is_fading());
    }
}
