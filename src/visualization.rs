use macroquad::prelude::*;

use crate::driver::FrameLoop;
use crate::field::{ParticleField, Phase};
use crate::surface::Surface;
use crate::types::{Point, Rgba};

/// Rings used to approximate a radial gradient.
const GLOW_RINGS: usize = 6;
/// Pieces a gradient line is split into.
const LINE_SEGMENTS: usize = 4;

pub fn to_color(c: Rgba) -> Color {
    Color::new(
        c.r as f32 / 255.0,
        c.g as f32 / 255.0,
        c.b as f32 / 255.0,
        c.a,
    )
}

// Persistent offscreen canvas: nothing is cleared between frames, so the
// partial fill each frame leaves trails behind moving particles
pub struct MacroquadSurface {
    target: RenderTarget,
    camera: Camera2D,
    opacity: f32,
    width: u32,
    height: u32,
}

impl MacroquadSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let (target, camera) = Self::canvas(width, height);
        let surface = Self {
            target,
            camera,
            opacity: 0.0,
            width,
            height,
        };
        surface.wipe();
        surface
    }

    fn canvas(width: u32, height: u32) -> (RenderTarget, Camera2D) {
        let target = render_target(width.max(1), height.max(1));
        target.texture.set_filter(FilterMode::Linear);
        let mut camera =
            Camera2D::from_display_rect(Rect::new(0.0, 0.0, width as f32, height as f32));
        camera.render_target = Some(target.clone());
        (target, camera)
    }

    fn wipe(&self) {
        set_camera(&self.camera);
        clear_background(BLACK);
        set_default_camera();
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Recreate the canvas at a new size. The old contents are dropped.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        let (target, camera) = Self::canvas(width, height);
        self.target = target;
        self.camera = camera;
        self.width = width;
        self.height = height;
        self.wipe();
    }

    /// Route subsequent draws to the canvas.
    pub fn begin(&self) {
        set_camera(&self.camera);
    }

    /// Blit the canvas to the screen at the current opacity.
    pub fn present(&self) {
        set_default_camera();
        clear_background(BLACK);
        if self.opacity <= 0.0 {
            return;
        }
        draw_texture_ex(
            &self.target.texture,
            0.0,
            0.0,
            Color::new(1.0, 1.0, 1.0, self.opacity),
            blit_params(screen_width(), screen_height()),
        );
    }
}

// The canvas camera renders y-down into the texture, so it is flipped back on the way out
fn blit_params(width: f32, height: f32) -> DrawTextureParams {
    DrawTextureParams {
        dest_size: Some(vec2(width, height)),
        flip_y: true,
        ..Default::default()
    }
}

impl Surface for MacroquadSurface {
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        draw_rectangle(x, y, width, height, to_color(color));
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba) {
        draw_circle(center.x, center.y, radius, to_color(color));
    }

    fn fill_radial_gradient(&mut self, center: Point, radius: f32, inner: Rgba, outer: Rgba) {
        // Stacked translucent discs, largest first; overlap builds up toward the center
        for ring in 0..GLOW_RINGS {
            let t = ring as f32 / GLOW_RINGS as f32;
            let r = radius * (1.0 - t);
            let tint = outer.lerp(inner, t + 1.0 / GLOW_RINGS as f32);
            let alpha = tint.a / GLOW_RINGS as f32;
            draw_circle(center.x, center.y, r, to_color(tint.with_alpha(alpha)));
        }
    }

    fn stroke_gradient_line(
        &mut self,
        from: Point,
        to: Point,
        width: f32,
        from_color: Rgba,
        end_color: Rgba,
    ) {
        let dx = (to.x - from.x) / LINE_SEGMENTS as f32;
        let dy = (to.y - from.y) / LINE_SEGMENTS as f32;
        for i in 0..LINE_SEGMENTS {
            let t = (i as f32 + 0.5) / LINE_SEGMENTS as f32;
            let x0 = from.x + dx * i as f32;
            let y0 = from.y + dy * i as f32;
            draw_line(
                x0,
                y0,
                x0 + dx,
                y0 + dy,
                width,
                to_color(from_color.lerp(end_color, t)),
            );
        }
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

pub fn draw_stats(field: &ParticleField, frame_loop: &FrameLoop, looping: bool) {
    let stats = field.stats();
    let phase = match field.phase() {
        Phase::Uninitialized => "idle",
        Phase::Launching => "launching",
        Phase::Steady => "steady",
        Phase::Stopped if field.is_fading() => "fading out",
        Phase::Stopped => "stopped",
    };
    let line1 = format!(
        "Phase: {} | Elapsed: {:.0} ms | Frames: {} ({} total) | FPS: {}",
        phase,
        stats.elapsed_ms,
        stats.frames,
        frame_loop.frames_run(),
        get_fps()
    );
    draw_text(&line1, 10.0, 20.0, 20.0, WHITE);
    let line2 = format!(
        "Particles: {} | Lines: {} | Mean opacity: {:.2} | Mode: {}",
        stats.particle_count,
        stats.lines_last_frame,
        stats.mean_opacity,
        if looping { "loop" } else { "play once" }
    );
    draw_text(&line2, 10.0, 40.0, 20.0, WHITE);

    draw_text(
        "Controls: R=Restart | L=Loop on next restart | Tab=Stats | P=Screenshot | Esc=Quit",
        10.0,
        screen_height() - 20.0,
        16.0,
        Color::new(1.0, 1.0, 1.0, 0.7),
    );
}

pub fn draw_hint() {
    let hint_text = "Press Tab for stats";
    let hint_font_size = 16.0;
    let hint_width = measure_text(hint_text, None, hint_font_size as u16, 1.0).width;
    draw_text(
        hint_text,
        screen_width() - hint_width - 10.0,
        screen_height() - 25.0,
        hint_font_size,
        Color::new(0.7, 0.7, 0.7, 0.6),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colors_convert_to_unit_range() {
        let c = to_color(Rgba::new(255, 0, 51, 0.8));
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 0.2).abs() < 1e-6);
        assert_eq!(c.a, 0.8);
    }

    #[test]
    fn canvas_is_blitted_upright_at_window_size() {
        let params = blit_params(1280.0, 720.0);
        assert!(params.flip_y);
        assert!(!params.flip_x);
        assert_eq!(params.dest_size, Some(vec2(1280.0, 720.0)));
        assert!(params.source.is_none());
    }
}
