// Software rasterization of brush footprints and shape outlines.
// Geometry is first stamped into a coverage `Mask` (union, never summed), then
// the mask is applied to a buffer in one pass with a `Paint` mode.

use crate::pixel::{PixelBuffer, destination_out, source_over};
use crate::types::{Mask, Rgba};

/// Smallest half-width we rasterize. Must exceed sqrt(0.5) so a dot anywhere
/// covers at least one pixel center.
const MIN_RADIUS: f32 = 0.75;

/// Line end style.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cap {
    /// Half-disc past each end (also gives round joins between segments).
    Round,
    /// Half-square past each end, aligned with the segment.
    Square,
}

/// How a mask is written into a buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Paint {
    /// Alpha-over `color` at `opacity`.
    Over(Rgba, f32),
    /// Destination-out at `strength`; color is irrelevant.
    Erase(f32),
    /// Overwrite with `color`, alpha scaled by `opacity` (overlays only).
    Replace(Rgba, f32),
}

#[inline]
fn radius_of(width: f32) -> f32 {
    (width * 0.5).max(MIN_RADIUS)
}

/// Mask sized to hold every point of `points` grown by `width / 2`.
fn mask_for(
    canvas_w: u32,
    canvas_h: u32,
    points: &[(f32, f32)],
    width: f32,
    cap: Cap,
) -> Option<Mask> {
    let mut min = (f32::INFINITY, f32::INFINITY);
    let mut max = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for &(x, y) in points {
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    }
    if !min.0.is_finite() || !max.0.is_finite() {
        return None;
    }
    // square caps reach out along the diagonal
    let grow = match cap {
        Cap::Round => radius_of(width),
        Cap::Square => radius_of(width) * std::f32::consts::SQRT_2,
    } + 1.0;
    Mask::covering(
        canvas_w,
        canvas_h,
        (min.0 - grow, min.1 - grow),
        (max.0 + grow, max.1 + grow),
    )
}

/// Stamp a thick segment `a -> b` into `mask`. Pixels whose centers fall inside
/// the stroked footprint get full coverage.
pub fn stamp_segment(mask: &mut Mask, a: (f32, f32), b: (f32, f32), width: f32, cap: Cap) {
    let r = radius_of(width);
    let reach = r * std::f32::consts::SQRT_2 + 1.0;
    let (mx0, my0, mx1, my1) = mask.bounds();
    let x0 = ((a.0.min(b.0) - reach).floor() as i32).max(mx0);
    let y0 = ((a.1.min(b.1) - reach).floor() as i32).max(my0);
    let x1 = ((a.0.max(b.0) + reach).ceil() as i32).min(mx1);
    let y1 = ((a.1.max(b.1) + reach).ceil() as i32).min(my1);

    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = (dx * dx + dy * dy).sqrt();
    // degenerate segments still need a direction for square caps
    let (ux, uy) = if len > 1e-6 { (dx / len, dy / len) } else { (1.0, 0.0) };

    for y in y0..y1 {
        for x in x0..x1 {
            let px = x as f32 + 0.5 - a.0;
            let py = y as f32 + 0.5 - a.1;
            let along = px * ux + py * uy;
            let across = (px * uy - py * ux).abs();
            let inside = match cap {
                Cap::Round => {
                    let t = along.clamp(0.0, len);
                    let ex = px - t * ux;
                    let ey = py - t * uy;
                    ex * ex + ey * ey <= r * r
                }
                Cap::Square => along >= -r && along <= len + r && across <= r,
            };
            if inside {
                mask.cover(x, y, 1.0);
            }
        }
    }
}

/// Coverage of one thick segment.
pub fn segment_mask(
    canvas_w: u32,
    canvas_h: u32,
    a: (f32, f32),
    b: (f32, f32),
    width: f32,
    cap: Cap,
) -> Option<Mask> {
    let mut mask = mask_for(canvas_w, canvas_h, &[a, b], width, cap)?;
    stamp_segment(&mut mask, a, b, width, cap);
    Some(mask)
}

/// Coverage of a polyline; `closed` joins the last point back to the first.
pub fn polyline_mask(
    canvas_w: u32,
    canvas_h: u32,
    points: &[(f32, f32)],
    closed: bool,
    width: f32,
    cap: Cap,
) -> Option<Mask> {
    let mut mask = mask_for(canvas_w, canvas_h, points, width, cap)?;
    match points {
        [] => return None,
        [p] => stamp_segment(&mut mask, *p, *p, width, cap),
        _ => {
            for pair in points.windows(2) {
                stamp_segment(&mut mask, pair[0], pair[1], width, cap);
            }
            if closed {
                stamp_segment(&mut mask, points[points.len() - 1], points[0], width, cap);
            }
        }
    }
    Some(mask)
}

/// Stroked outline of the axis-aligned box spanned by two corners.
pub fn rect_outline_mask(
    canvas_w: u32,
    canvas_h: u32,
    a: (f32, f32),
    b: (f32, f32),
    width: f32,
) -> Option<Mask> {
    let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
    let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
    let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
    polyline_mask(canvas_w, canvas_h, &corners, true, width, Cap::Round)
}

/// Stroked outline of the ellipse inscribed in the box spanned by two corners.
pub fn ellipse_outline_mask(
    canvas_w: u32,
    canvas_h: u32,
    a: (f32, f32),
    b: (f32, f32),
    width: f32,
) -> Option<Mask> {
    let cx = (a.0 + b.0) * 0.5;
    let cy = (a.1 + b.1) * 0.5;
    let rx = (b.0 - a.0).abs() * 0.5;
    let ry = (b.1 - a.1).abs() * 0.5;
    // Ramanujan's perimeter estimate; one vertex every ~2px
    let h = ((rx - ry) / (rx + ry).max(1e-6)).powi(2);
    let perimeter =
        std::f32::consts::PI * (rx + ry) * (1.0 + 3.0 * h / (10.0 + (4.0 - 3.0 * h).sqrt()));
    let steps = ((perimeter / 2.0).ceil() as usize).clamp(16, 1440);
    let points: Vec<(f32, f32)> = (0..steps)
        .map(|i| {
            let t = i as f32 / steps as f32 * std::f32::consts::TAU;
            (cx + rx * t.cos(), cy + ry * t.sin())
        })
        .collect();
    polyline_mask(canvas_w, canvas_h, &points, true, width, Cap::Round)
}

/// Write a mask into `buf`.
pub fn apply_mask(buf: &mut PixelBuffer, mask: &Mask, paint: Paint) {
    let (x0, y0, x1, y1) = mask.bounds();
    for y in y0..y1 {
        for x in x0..x1 {
            let cov = mask.get(x, y);
            if cov <= 0.0 {
                continue;
            }
            let dst = buf.get(x, y);
            let out = match paint {
                Paint::Over(color, opacity) => source_over(dst, color, opacity * cov),
                Paint::Erase(strength) => destination_out(dst, strength * cov),
                Paint::Replace(color, opacity) => {
                    let a = (color.a as f32 * (opacity * cov).clamp(0.0, 1.0)).round() as u8;
                    color.with_alpha(a)
                }
            };
            buf.set(x, y, out);
        }
    }
}
