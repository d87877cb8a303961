use ::rand as external_rand;
use external_rand::Rng;
use serde::Serialize;

use crate::config::FieldConfig;
use crate::surface::Surface;
use crate::types::{Bounds, Point, Rgba};

/// Recycled particles re-enter this far above the top edge, and leave this far below the bottom.
pub const RECYCLE_MARGIN: f32 = 20.0;
/// Share of the surface height above the top edge used for launch placement.
pub const LAUNCH_SPREAD: f32 = 0.2;
/// Horizontal speed kept after hitting a side edge.
pub const BOUNCE_DAMPING: f32 = 0.8;
/// Glow radius relative to the particle radius.
pub const GLOW_SCALE: f32 = 1.5;

/// How a particle moves during one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    /// Vertical speed amplified, horizontal speed carried over.
    Launch,
    /// Base velocity plus random turbulence on both axes.
    Drift,
}

#[derive(Clone, Debug, Serialize)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub base_vx: f32,
    pub base_vy: f32,
    pub vx: f32,
    pub vy: f32,
    pub opacity: f32,
    pub target_opacity: f32,
    pub age: u64,
    pub color: Rgba,
    pub connections: usize,
}

impl Particle {
    /// New particle placed for the launch, spread just above the top edge.
    pub fn spawn<R: Rng>(rng: &mut R, config: &FieldConfig, bounds: Bounds) -> Self {
        let mut p = Particle {
            x: 0.0,
            y: 0.0,
            radius: config.min_radius,
            base_vx: 0.0,
            base_vy: 0.0,
            vx: 0.0,
            vy: 0.0,
            opacity: 0.0,
            target_opacity: 0.0,
            age: 0,
            color: config.colors[0],
            connections: 0,
        };
        p.reset(rng, config, bounds, true);
        p
    }

    /// Re-roll everything; `launch` picks the initial placement instead of the recycle one.
    pub fn reset<R: Rng>(
        &mut self,
        rng: &mut R,
        config: &FieldConfig,
        bounds: Bounds,
        launch: bool,
    ) {
        self.x = rng.gen::<f32>() * bounds.width;
        self.y = if launch {
            -rng.gen::<f32>() * bounds.height * LAUNCH_SPREAD
        } else {
            -RECYCLE_MARGIN
        };
        self.radius = rng.gen::<f32>() * (config.max_radius - config.min_radius) + config.min_radius;
        self.base_vx = (rng.gen::<f32>() - 0.5) * config.speed_multiplier;
        self.base_vy = rng.gen::<f32>() * 2.0 * config.speed_multiplier;
        self.vx = self.base_vx;
        self.vy = self.base_vy;
        self.opacity = 0.0;
        self.target_opacity = rng.gen::<f32>() * 0.7 + 0.3;
        self.age = 0;
        self.color = config.colors[rng.gen_range(0..config.colors.len())];
        self.connections = 0;
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Advance one frame.
    pub fn update<R: Rng>(
        &mut self,
        rng: &mut R,
        config: &FieldConfig,
        bounds: Bounds,
        motion: Motion,
    ) {
        match motion {
            Motion::Launch => {
                self.vy = self.base_vy * config.launch_speed_multiplier;
            }
            Motion::Drift => {
                self.vx = self.base_vx + (rng.gen::<f32>() - 0.5) * config.turbulence;
                self.vy = self.base_vy + (rng.gen::<f32>() - 0.5) * config.turbulence;
            }
        }

        self.x += self.vx;
        self.y += self.vy;
        self.age += 1;

        if self.opacity < self.target_opacity {
            self.opacity = (self.opacity + config.fade_in_step).min(self.target_opacity);
        }

        // Past a side edge the heading is forced back inward. The base velocity is
        // damped only when it still points out, so turbulence can't wear it down.
        if self.x < 0.0 && self.vx < 0.0 {
            self.vx = -self.vx * BOUNCE_DAMPING;
            if self.base_vx < 0.0 {
                self.base_vx = -self.base_vx * BOUNCE_DAMPING;
            }
        } else if self.x > bounds.width && self.vx > 0.0 {
            self.vx = -self.vx * BOUNCE_DAMPING;
            if self.base_vx > 0.0 {
                self.base_vx = -self.base_vx * BOUNCE_DAMPING;
            }
        }

        if config.recycle && self.y > bounds.height + RECYCLE_MARGIN {
            self.reset(rng, config, bounds, false);
        }
    }

    /// Glow halo first, solid core on top.
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S, config: &FieldConfig) {
        let center = self.position();
        surface.fill_radial_gradient(
            center,
            self.radius * GLOW_SCALE,
            self.color.with_alpha(config.glow_alpha),
            Rgba::TRANSPARENT,
        );
        surface.fill_circle(center, self.radius, self.color.with_alpha(self.opacity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, RecordingSurface};
    use external_rand::rngs::StdRng;
    use external_rand::SeedableRng;

    fn bounds() -> Bounds {
        Bounds::new(800.0, 600.0).unwrap()
    }

    #[test]
    fn spawn_places_particle_above_the_top() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = FieldConfig::default();
        for _ in 0..200 {
            let p = Particle::spawn(&mut rng, &config, bounds());
            assert!(p.y <= 0.0 && p.y >= -600.0 * LAUNCH_SPREAD);
            assert!(p.x >= 0.0 && p.x <= 800.0);
            assert!(p.radius >= config.min_radius && p.radius <= config.max_radius);
            assert!(p.target_opacity >= 0.3 && p.target_opacity <= 1.0);
            assert!(p.base_vy >= 0.0);
            assert_eq!(p.opacity, 0.0);
            assert_eq!(p.age, 0);
            assert!(config.colors.contains(&p.color));
        }
    }

    #[test]
    fn launch_motion_amplifies_vertical_speed_only() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = FieldConfig::default();
        let mut p = Particle::spawn(&mut rng, &config, bounds());
        p.x = 400.0;
        let (x0, y0, vx) = (p.x, p.y, p.vx);

        p.update(&mut rng, &config, bounds(), Motion::Launch);

        assert_eq!(p.vy, p.base_vy * config.launch_speed_multiplier);
        assert_eq!(p.vx, vx);
        assert!((p.y - (y0 + p.base_vy * 3.0)).abs() < 1e-4);
        assert!((p.x - (x0 + vx)).abs() < 1e-4);
        assert_eq!(p.age, 1);
    }

    #[test]
    fn drift_without_turbulence_uses_base_velocity() {
        let mut rng = StdRng::seed_from_u64(2);
        let config = FieldConfig {
            turbulence: 0.0,
            ..FieldConfig::default()
        };
        let mut p = Particle::spawn(&mut rng, &config, bounds());
        p.x = 400.0;
        p.update(&mut rng, &config, bounds(), Motion::Drift);
        assert_eq!(p.vy, p.base_vy);
        assert_eq!(p.vx, p.base_vx);
    }

    #[test]
    fn opacity_fades_in_and_stops_at_target() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = FieldConfig::default();
        let mut p = Particle::spawn(&mut rng, &config, bounds());
        p.x = 400.0;
        p.y = 0.0;
        let mut last = p.opacity;
        for _ in 0..100 {
            p.update(&mut rng, &config, bounds(), Motion::Drift);
            assert!(p.opacity >= last);
            assert!(p.opacity <= p.target_opacity);
            last = p.opacity;
            p.y = 0.0;
        }
        assert_eq!(p.opacity, p.target_opacity);
    }

    #[test]
    fn bounces_off_side_edges() {
        let mut rng = StdRng::seed_from_u64(4);
        let config = FieldConfig::default();
        let mut p = Particle::spawn(&mut rng, &config, bounds());
        p.x = 799.5;
        p.vx = 1.0;
        p.base_vx = 1.0;
        p.update(&mut rng, &config, bounds(), Motion::Launch);
        assert!(p.x > 800.0);
        assert_eq!(p.vx, -BOUNCE_DAMPING);

        // Heading back in: no second flip
        p.update(&mut rng, &config, bounds(), Motion::Launch);
        assert_eq!(p.vx, -BOUNCE_DAMPING);
    }

    #[test]
    fn turbulent_drift_returns_particles_past_the_left_edge() {
        let config = FieldConfig {
            turbulence: 0.3,
            ..FieldConfig::default()
        };
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut p = Particle::spawn(&mut rng, &config, bounds());
            p.x = -5.0;
            p.base_vx = 0.04;
            p.vx = 0.04;

            let mut frames_outside = 0;
            while p.x < 0.0 && frames_outside < 2000 {
                p.y = 300.0;
                p.update(&mut rng, &config, bounds(), Motion::Drift);
                // An inward base heading is never flipped or shrunk by noise
                assert_eq!(p.base_vx, 0.04);
                frames_outside += 1;
            }
            assert!(p.x >= 0.0, "seed {seed}: still at x={} after 2000 frames", p.x);
        }
    }

    #[test]
    fn outward_base_heading_is_reversed_once() {
        let mut rng = StdRng::seed_from_u64(11);
        let config = FieldConfig::default();
        let mut p = Particle::spawn(&mut rng, &config, bounds());
        p.x = 801.0;
        p.y = 300.0;
        p.base_vx = 0.5;
        p.update(&mut rng, &config, bounds(), Motion::Drift);
        assert!(p.x > 800.0);
        assert_eq!(p.base_vx, -0.5 * BOUNCE_DAMPING);
        assert!(p.vx < 0.0);

        for _ in 0..50 {
            p.y = 300.0;
            p.update(&mut rng, &config, bounds(), Motion::Drift);
        }
        assert_eq!(p.base_vx, -0.5 * BOUNCE_DAMPING);
        assert!(p.x <= 800.0);
    }

    #[test]
    fn recycles_below_bottom_edge() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = FieldConfig::default();
        let mut p = Particle::spawn(&mut rng, &config, bounds());
        p.y = 600.0 + RECYCLE_MARGIN + 1.0;
        p.age = 99;
        p.update(&mut rng, &config, bounds(), Motion::Launch);
        assert_eq!(p.y, -RECYCLE_MARGIN);
        assert_eq!(p.age, 0);
        assert_eq!(p.opacity, 0.0);
    }

    #[test]
    fn no_recycle_when_disabled() {
        let mut rng = StdRng::seed_from_u64(6);
        let config = FieldConfig {
            recycle: false,
            ..FieldConfig::default()
        };
        let mut p = Particle::spawn(&mut rng, &config, bounds());
        p.y = 700.0;
        p.update(&mut rng, &config, bounds(), Motion::Launch);
        assert!(p.y > 700.0);
    }

    #[test]
    fn draw_emits_glow_then_core() {
        let mut rng = StdRng::seed_from_u64(8);
        let config = FieldConfig::default();
        let mut p = Particle::spawn(&mut rng, &config, bounds());
        p.opacity = 0.5;
        let mut surface = RecordingSurface::new();
        p.draw(&mut surface, &config);

        match &surface.commands[..] {
            [DrawCommand::RadialGradient {
                radius,
                inner,
                outer,
                ..
            }, DrawCommand::Circle {
                radius: core,
                color,
                ..
            }] => {
                assert!((radius - p.radius * GLOW_SCALE).abs() < 1e-6);
                assert_eq!(inner.a, config.glow_alpha);
                assert_eq!(outer.a, 0.0);
                assert_eq!(*core, p.radius);
                assert_eq!(color.a, 0.5);
            }
            other => panic!("unexpected commands: {other:?}"),
        }
    }
}
