use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

/// Color with 8-bit channels and a floating-point alpha, as used by the palette.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0.0);

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with the alpha replaced.
    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Same color with the alpha multiplied by `factor`.
    pub fn scale_alpha(self, factor: f32) -> Self {
        self.with_alpha(self.a * factor)
    }

    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Size of the drawing surface in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    /// A surface without positive, finite dimensions cannot host the field.
    pub fn new(width: f32, height: f32) -> FieldResult<Self> {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if !usable(width) || !usable(height) {
            return Err(FieldError::SurfaceUnavailable { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn center_x(&self) -> f32 {
        self.width / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_reject_empty_surface() {
        assert!(Bounds::new(0.0, 600.0).is_err());
        assert!(Bounds::new(800.0, -1.0).is_err());
        assert!(Bounds::new(f32::NAN, 600.0).is_err());
        assert!(Bounds::new(800.0, 600.0).is_ok());
    }

    #[test]
    fn alpha_helpers_clamp() {
        let c = Rgba::new(108, 99, 255, 0.8);
        assert_eq!(c.with_alpha(1.5).a, 1.0);
        assert!((c.scale_alpha(0.5).a - 0.4).abs() < 1e-6);
        assert_eq!(c.with_alpha(0.3).r, 108);
    }

    #[test]
    fn lerp_hits_endpoints() {
        let a = Rgba::new(0, 0, 0, 0.0);
        let b = Rgba::new(200, 100, 50, 1.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5).r, 100);
    }
}
