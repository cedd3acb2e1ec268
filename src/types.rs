// Small value types shared by every part of the engine.

use std::fmt;

/// One straight-alpha RGBA8 pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse `#rrggbb` (the leading `#` is optional). Alpha is always 255.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// `#rrggbb`, alpha dropped.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Largest absolute per-channel difference, alpha included.
    pub fn max_channel_diff(self, other: Rgba) -> u8 {
        self.r
            .abs_diff(other.r)
            .max(self.g.abs_diff(other.g))
            .max(self.b.abs_diff(other.b))
            .max(self.a.abs_diff(other.a))
    }

    /// Pack as 0x00RRGGBB for the window (alpha ignored).
    #[inline]
    pub fn to_u32_rgb(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// A pointer sample in canvas pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    /// 0..1; mice report nothing, so they get the 0.5 midpoint.
    pub pressure: f32,
}

impl Point {
    pub const DEFAULT_PRESSURE: f32 = 0.5;

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, pressure: Self::DEFAULT_PRESSURE }
    }

    pub fn with_pressure(x: f32, y: f32, pressure: f32) -> Self {
        Self { x, y, pressure: pressure.clamp(0.0, 1.0) }
    }

    /// Nearest pixel (rounds half away from zero).
    pub fn pixel(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// Coverage in [0,1] per pixel over a clipped rectangle of the canvas.
/// Geometry is rasterized into one of these first, then applied to a buffer
/// in a single pass so overlapping parts of one shape never blend twice.
pub struct Mask {
    pub x: i32,          // left edge in canvas pixels
    pub y: i32,          // top edge in canvas pixels
    pub width: usize,
    pub height: usize,
    pub alpha: Vec<f32>, // length = width * height
}

impl Mask {
    /// Empty mask covering `[min, max]` (canvas coordinates, inclusive of partial
    /// pixels) clipped to a `canvas_w` x `canvas_h` canvas. `None` when nothing
    /// of it lands on the canvas.
    pub fn covering(
        canvas_w: u32,
        canvas_h: u32,
        min: (f32, f32),
        max: (f32, f32),
    ) -> Option<Self> {
        let x0 = (min.0.floor() as i64).max(0);
        let y0 = (min.1.floor() as i64).max(0);
        let x1 = (max.0.ceil() as i64).min(canvas_w as i64);
        let y1 = (max.1.ceil() as i64).min(canvas_h as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        let width = (x1 - x0) as usize;
        let height = (y1 - y0) as usize;
        Some(Self {
            x: x0 as i32,
            y: y0 as i32,
            width,
            height,
            alpha: vec![0.0; width * height],
        })
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let lx = x - self.x;
        let ly = y - self.y;
        if lx < 0 || ly < 0 || lx as usize >= self.width || ly as usize >= self.height {
            return None;
        }
        Some(ly as usize * self.width + lx as usize)
    }

    /// Coverage at a canvas pixel; 0 outside the mask.
    pub fn get(&self, x: i32, y: i32) -> f32 {
        self.index(x, y).map_or(0.0, |i| self.alpha[i])
    }

    /// Union: keep the stronger of the existing and new coverage.
    pub fn cover(&mut self, x: i32, y: i32, value: f32) {
        if let Some(i) = self.index(x, y) {
            let v = value.clamp(0.0, 1.0);
            if v > self.alpha[i] {
                self.alpha[i] = v;
            }
        }
    }

    /// Canvas-space pixel range `(x0, y0, x1, y1)`, exclusive on the far side.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        (
            self.x,
            self.y,
            self.x + self.width as i32,
            self.y + self.height as i32,
        )
    }
}
