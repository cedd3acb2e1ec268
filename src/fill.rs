// Tolerance-bounded 4-connected flood fill.
// Iterative with an explicit stack and a visited bitmap, so large regions
// cannot blow the call stack and no pixel is processed twice.

use log::debug;

use crate::pixel::PixelBuffer;
use crate::types::Rgba;

/// Per-channel tolerance used when none is configured.
pub const DEFAULT_TOLERANCE: u8 = 32;

/// The RGBA a fill actually writes: the color's RGB with alpha from `opacity`.
pub fn resolve_fill_color(color: Rgba, opacity: f32) -> Rgba {
    color.with_alpha((opacity.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Fill the region connected to `seed` whose pixels are within `tolerance` of
/// the seed color on every channel (alpha included). Returns how many pixels
/// were written; 0 when the seed is off-canvas or already the fill color.
pub fn flood_fill(
    buf: &mut PixelBuffer,
    seed: (i32, i32),
    color: Rgba,
    opacity: f32,
    tolerance: u8,
) -> usize {
    let (w, h) = (buf.width() as i32, buf.height() as i32);
    let (sx, sy) = seed;
    if sx < 0 || sy < 0 || sx >= w || sy >= h {
        return 0;
    }
    let target = buf.get(sx, sy);
    let fill = resolve_fill_color(color, opacity);
    if target == fill {
        return 0;
    }

    let mut visited = vec![false; w as usize * h as usize];
    let mut stack: Vec<(i32, i32)> = Vec::with_capacity(1024);
    stack.push((sx, sy));
    let mut filled = 0usize;

    while let Some((x, y)) = stack.pop() {
        if x < 0 || y < 0 || x >= w || y >= h {
            continue;
        }
        let vi = y as usize * w as usize + x as usize;
        if visited[vi] {
            continue;
        }
        if buf.get(x, y).max_channel_diff(target) > tolerance {
            continue;
        }
        visited[vi] = true;
        buf.set(x, y, fill);
        filled += 1;
        stack.push((x + 1, y));
        stack.push((x - 1, y));
        stack.push((x, y + 1));
        stack.push((x, y - 1));
    }

    debug!("flood fill at ({sx}, {sy}) wrote {filled} pixels");
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_whole_uniform_buffer() {
        let mut buf = PixelBuffer::filled(30, 20, Rgba::WHITE);
        let n = flood_fill(&mut buf, (3, 4), Rgba::BLACK, 1.0, DEFAULT_TOLERANCE);
        assert_eq!(n, 600);
        assert_eq!(buf, PixelBuffer::filled(30, 20, Rgba::BLACK));
    }

    #[test]
    fn second_fill_is_a_no_op() {
        let mut buf = PixelBuffer::filled(10, 10, Rgba::WHITE);
        flood_fill(&mut buf, (0, 0), Rgba::rgb(200, 10, 10), 0.5, DEFAULT_TOLERANCE);
        let once = buf.clone();
        assert_eq!(flood_fill(&mut buf, (0, 0), Rgba::rgb(200, 10, 10), 0.5, DEFAULT_TOLERANCE), 0);
        assert_eq!(buf, once);
    }

    #[test]
    fn stops_at_channels_beyond_tolerance() {
        let mut buf = PixelBuffer::filled(10, 10, Rgba::WHITE);
        // a wall at x = 5, darker than the tolerance allows
        for y in 0..10 {
            buf.set(5, y, Rgba::rgb(255, 255, 200));
        }
        // close but within tolerance: gets filled
        buf.set(2, 2, Rgba::rgb(230, 240, 250));
        flood_fill(&mut buf, (0, 0), Rgba::BLACK, 1.0, DEFAULT_TOLERANCE);
        assert_eq!(buf.get(2, 2), Rgba::BLACK);
        assert_eq!(buf.get(4, 9), Rgba::BLACK);
        assert_eq!(buf.get(5, 3), Rgba::rgb(255, 255, 200));
        assert_eq!(buf.get(7, 3), Rgba::WHITE);
    }

    #[test]
    fn does_not_leak_diagonally() {
        let mut buf = PixelBuffer::filled(3, 3, Rgba::WHITE);
        buf.set(1, 0, Rgba::BLACK);
        buf.set(0, 1, Rgba::BLACK);
        flood_fill(&mut buf, (0, 0), Rgba::rgb(0, 255, 0), 1.0, DEFAULT_TOLERANCE);
        assert_eq!(buf.get(0, 0), Rgba::rgb(0, 255, 0));
        assert_eq!(buf.get(1, 1), Rgba::WHITE);
    }

    #[test]
    fn off_canvas_seed_does_nothing() {
        let mut buf = PixelBuffer::filled(4, 4, Rgba::WHITE);
        assert_eq!(flood_fill(&mut buf, (-1, 2), Rgba::BLACK, 1.0, DEFAULT_TOLERANCE), 0);
        assert_eq!(flood_fill(&mut buf, (2, 4), Rgba::BLACK, 1.0, DEFAULT_TOLERANCE), 0);
    }

    #[test]
    fn large_fill_does_not_overflow() {
        let mut buf = PixelBuffer::new(1024, 1024);
        let n = flood_fill(&mut buf, (512, 512), Rgba::BLACK, 1.0, DEFAULT_TOLERANCE);
        assert_eq!(n, 1024 * 1024);
    }

    #[test]
    fn tolerance_boundary_is_inclusive_and_counts_alpha() {
        let mut buf = PixelBuffer::new(5, 1);
        buf.set(0, 0, Rgba::rgb(222, 255, 255)); // 33 away
        buf.set(1, 0, Rgba::WHITE);
        buf.set(2, 0, Rgba::rgb(223, 255, 255)); // 32 away
        buf.set(3, 0, Rgba::WHITE.with_alpha(223)); // 32 away, alpha only
        buf.set(4, 0, Rgba::WHITE.with_alpha(200)); // 55 away, alpha only

        let n = flood_fill(&mut buf, (1, 0), Rgba::BLACK, 1.0, DEFAULT_TOLERANCE);
        assert_eq!(n, 3);
        assert_eq!(buf.get(0, 0), Rgba::rgb(222, 255, 255));
        assert_eq!(buf.get(1, 0), Rgba::BLACK);
        assert_eq!(buf.get(2, 0), Rgba::BLACK);
        assert_eq!(buf.get(3, 0), Rgba::BLACK);
        assert_eq!(buf.get(4, 0), Rgba::WHITE.with_alpha(200));
    }
}
