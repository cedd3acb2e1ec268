// Fixed-size RGBA8 raster storage and the two blend equations every tool uses.
// Out-of-bounds reads return transparent and out-of-bounds writes are dropped,
// so callers can iterate brush footprints without clipping first.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::{Error, Result};
use crate::types::Rgba;

/// How `blit` combines a source pixel with the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeOp {
    /// Replace the destination; source alpha is scaled by the opacity.
    Copy,
    /// Standard alpha-over.
    SourceOver,
    /// Remove destination alpha where the source is opaque (eraser).
    DestinationOut,
}

/// Straight-alpha over: `src` scaled by `opacity` painted onto `dst`.
#[inline]
pub fn source_over(dst: Rgba, src: Rgba, opacity: f32) -> Rgba {
    let sa = src.a as f32 / 255.0 * opacity.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return dst;
    }
    if sa >= 1.0 {
        return src.with_alpha(255);
    }
    let da = dst.a as f32 / 255.0;
    let keep = da * (1.0 - sa);
    let out_a = sa + keep;
    let mix = |s: u8, d: u8| -> u8 {
        ((s as f32 * sa + d as f32 * keep) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgba::new(
        mix(src.r, dst.r),
        mix(src.g, dst.g),
        mix(src.b, dst.b),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    )
}

/// Destination-out with a source alpha of `strength`: color untouched, alpha reduced.
#[inline]
pub fn destination_out(dst: Rgba, strength: f32) -> Rgba {
    let s = strength.clamp(0.0, 1.0);
    let a = (dst.a as f32 * (1.0 - s)).round().clamp(0.0, 255.0) as u8;
    dst.with_alpha(a)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>, // width * height * 4, row-major RGBA
}

impl PixelBuffer {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let mut buf = Self::new(width, height);
        buf.fill(color);
        buf
    }

    /// Wrap raw RGBA bytes; the length must be exactly `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(Error::Encode(format!(
                "raw buffer is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> Rgba {
        match self.index(x, y) {
            Some(i) => Rgba::new(
                self.data[i],
                self.data[i + 1],
                self.data[i + 2],
                self.data[i + 3],
            ),
            None => Rgba::TRANSPARENT,
        }
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, c: Rgba) {
        if let Some(i) = self.index(x, y) {
            self.data[i..i + 4].copy_from_slice(&[c.r, c.g, c.b, c.a]);
        }
    }

    pub fn fill(&mut self, c: Rgba) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[c.r, c.g, c.b, c.a]);
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Overwrite a rectangle, clipped to the buffer.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, c: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x as i64 + w as i64).min(self.width as i64) as i32;
        let y1 = (y as i64 + h as i64).min(self.height as i64) as i32;
        for py in y0..y1 {
            for px in x0..x1 {
                self.set(px, py, c);
            }
        }
    }

    /// Draw `src` with its top-left corner at `(dx, dy)`.
    pub fn blit(&mut self, src: &PixelBuffer, dx: i32, dy: i32, op: CompositeOp, opacity: f32) {
        let opacity = opacity.clamp(0.0, 1.0);
        // only the overlapping rectangle is visited
        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx as i64 + src.width as i64).min(self.width as i64) as i32;
        let y1 = (dy as i64 + src.height as i64).min(self.height as i64) as i32;
        for y in y0..y1 {
            for x in x0..x1 {
                let s = src.get(x - dx, y - dy);
                match op {
                    CompositeOp::Copy => {
                        let a = (s.a as f32 * opacity).round() as u8;
                        self.set(x, y, s.with_alpha(a));
                    }
                    CompositeOp::SourceOver => {
                        if s.a == 0 {
                            continue;
                        }
                        let d = self.get(x, y);
                        self.set(x, y, source_over(d, s, opacity));
                    }
                    CompositeOp::DestinationOut => {
                        if s.a == 0 {
                            continue;
                        }
                        let d = self.get(x, y);
                        self.set(x, y, destination_out(d, s.a as f32 / 255.0 * opacity));
                    }
                }
            }
        }
    }

    /// Encode as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let img = RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| Error::Encode("buffer size does not match dimensions".into()))?;
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| Error::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }

    /// Decode any PNG into RGBA8.
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| Error::Encode(e.to_string()))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Self::from_raw(width, height, img.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_is_a_no_op() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.set(-1, 0, Rgba::BLACK);
        buf.set(4, 0, Rgba::BLACK);
        buf.set(0, 4, Rgba::BLACK);
        assert_eq!(buf, PixelBuffer::new(4, 4));
        assert_eq!(buf.get(100, 100), Rgba::TRANSPARENT);
    }

    #[test]
    fn fill_rect_clips() {
        let mut buf = PixelBuffer::new(4, 4);
        buf.fill_rect(2, 2, 10, 10, Rgba::WHITE);
        assert_eq!(buf.get(1, 1), Rgba::TRANSPARENT);
        assert_eq!(buf.get(2, 2), Rgba::WHITE);
        assert_eq!(buf.get(3, 3), Rgba::WHITE);
    }

    #[test]
    fn opaque_over_replaces() {
        let red = Rgba::rgb(255, 0, 0);
        assert_eq!(source_over(Rgba::WHITE, red, 1.0), red);
        assert_eq!(source_over(Rgba::TRANSPARENT, red, 1.0), red);
    }

    #[test]
    fn translucent_over_transparent_keeps_color() {
        let c = Rgba::rgb(10, 200, 30);
        let out = source_over(Rgba::TRANSPARENT, c, 0.4);
        assert_eq!(out, c.with_alpha(102));
    }

    #[test]
    fn half_black_over_white_is_grey() {
        let out = source_over(Rgba::WHITE, Rgba::BLACK, 0.5);
        assert_eq!(out.a, 255);
        assert!((127..=128).contains(&out.r));
    }

    #[test]
    fn destination_out_clears_alpha() {
        let red = Rgba::rgb(255, 0, 0);
        assert_eq!(destination_out(red, 1.0).a, 0);
        assert_eq!(destination_out(red, 0.5).a, 128);
    }

    #[test]
    fn blit_with_offset_clips_and_copies() {
        let src = PixelBuffer::filled(2, 2, Rgba::BLACK);
        let mut dst = PixelBuffer::filled(3, 3, Rgba::WHITE);
        dst.blit(&src, 2, 2, CompositeOp::SourceOver, 1.0);
        assert_eq!(dst.get(2, 2), Rgba::BLACK);
        assert_eq!(dst.get(1, 1), Rgba::WHITE);

        let mut moved = PixelBuffer::new(3, 3);
        moved.blit(&dst, -2, -2, CompositeOp::Copy, 1.0);
        assert_eq!(moved.get(0, 0), Rgba::BLACK);
        assert_eq!(moved.get(1, 1), Rgba::TRANSPARENT);
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let mut buf = PixelBuffer::new(5, 3);
        buf.set(1, 1, Rgba::new(1, 2, 3, 4));
        buf.set(4, 2, Rgba::WHITE);
        let back = PixelBuffer::from_png(&buf.to_png().unwrap()).unwrap();
        assert_eq!(back, buf);
    }

    #[test]
    fn garbage_png_is_an_encode_error() {
        assert!(matches!(
            PixelBuffer::from_png(b"not a png"),
            Err(Error::Encode(_))
        ));
    }
}
