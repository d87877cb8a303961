// Drawing capability the field renders through

use serde::Serialize;

use crate::types::{Point, Rgba};

/// The primitives the particle field needs from a 2D drawing surface.
pub trait Surface {
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba);

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba);

    /// Circle whose fill fades from `inner` at the center to `outer` at `radius`.
    fn fill_radial_gradient(&mut self, center: Point, radius: f32, inner: Rgba, outer: Rgba);

    /// Line whose color runs from `from_color` at `from` to `to_color` at `to`.
    fn stroke_gradient_line(
        &mut self,
        from: Point,
        to: Point,
        width: f32,
        from_color: Rgba,
        to_color: Rgba,
    );

    /// Opacity of the whole surface; 0 hides it.
    fn set_opacity(&mut self, opacity: f32);
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgba,
    },
    Circle {
        center: Point,
        radius: f32,
        color: Rgba,
    },
    RadialGradient {
        center: Point,
        radius: f32,
        inner: Rgba,
        outer: Rgba,
    },
    Line {
        from: Point,
        to: Point,
        width: f32,
        from_color: Rgba,
        to_color: Rgba,
    },
}

/// Headless surface that keeps every command it receives.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
    pub opacity: f32,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            opacity: 0.0,
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn lines(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
    }

    pub fn line_count(&self) -> usize {
        self.lines().count()
    }
}

impl Surface for RecordingSurface {
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn fill_radial_gradient(&mut self, center: Point, radius: f32, inner: Rgba, outer: Rgba) {
        self.commands.push(DrawCommand::RadialGradient {
            center,
            radius,
            inner,
            outer,
        });
    }

    fn stroke_gradient_line(
        &mut self,
        from: Point,
        to: Point,
        width: f32,
        from_color: Rgba,
        to_color: Rgba,
    ) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            width,
            from_color,
            to_color,
        });
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}
