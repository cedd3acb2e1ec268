//! Freehand strokes: brush width rules, pointer stabilization, and the
//! per-gesture state that turns pointer samples into painted segments.
//!
//! Most brushes paint straight into the active layer. The highlighter paints
//! fully opaque into a private overlay and is blended into the layer once at
//! the end, so a stroke crossing itself never darkens.

use std::collections::VecDeque;

use log::debug;

use crate::layer::Document;
use crate::pixel::{CompositeOp, PixelBuffer};
use crate::raster::{self, Cap, Paint};
use crate::types::{Point, Rgba};

/// Freehand brush tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BrushKind {
    Pencil,
    /// Width follows pointer pressure.
    Pen,
    Marker,
    Highlighter,
    Eraser,
}

impl BrushKind {
    /// Stroke width for a base brush size.
    pub fn line_width(self, size: f32, pressure: f32) -> f32 {
        match self {
            BrushKind::Marker => size * 2.5,
            BrushKind::Highlighter => size * 3.0,
            BrushKind::Eraser => size * 2.0,
            BrushKind::Pen => size * (pressure * 1.2 + 0.4),
            BrushKind::Pencil => size.max(1.0),
        }
    }

    pub fn cap(self) -> Cap {
        match self {
            BrushKind::Marker | BrushKind::Highlighter => Cap::Square,
            _ => Cap::Round,
        }
    }

    /// Paints into an isolated overlay instead of the layer.
    pub fn uses_overlay(self) -> bool {
        self == BrushKind::Highlighter
    }

    /// The eraser follows the raw pointer.
    pub fn is_stabilized(self) -> bool {
        self != BrushKind::Eraser
    }
}

/// Recency-weighted moving average over the last `amount` pointer samples.
/// The i-th oldest of L buffered points weighs `i + 1`, normalized by L(L+1)/2.
#[derive(Clone, Debug)]
pub struct Stabilizer {
    amount: usize,
    buffer: VecDeque<(f32, f32)>,
}

impl Stabilizer {
    /// `amount == 0` disables smoothing entirely.
    pub fn new(amount: usize, first: (f32, f32)) -> Self {
        let mut buffer = VecDeque::with_capacity(amount.clamp(1, 64) + 1);
        buffer.push_back(first);
        Self { amount, buffer }
    }

    pub fn amount(&self) -> usize {
        self.amount
    }

    /// Feed a raw sample, get the position to draw to.
    pub fn push(&mut self, raw: (f32, f32)) -> (f32, f32) {
        if self.amount == 0 {
            return raw;
        }
        self.buffer.push_back(raw);
        while self.buffer.len() > self.amount {
            self.buffer.pop_front();
        }
        smooth(&self.buffer)
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Linearly recency-weighted mean. Fewer than two points pass through.
pub fn smooth(points: &VecDeque<(f32, f32)>) -> (f32, f32) {
    let len = points.len();
    if len < 2 {
        return points.back().copied().unwrap_or((0.0, 0.0));
    }
    let mut sx = 0.0;
    let mut sy = 0.0;
    for (i, &(x, y)) in points.iter().enumerate() {
        let w = (i + 1) as f32;
        sx += x * w;
        sy += y * w;
    }
    let total = (len * (len + 1) / 2) as f32;
    (sx / total, sy / total)
}

/// Per-stroke parameters, captured at pointer-down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushSettings {
    pub kind: BrushKind,
    pub color: Rgba,
    pub size: f32,
    pub opacity: f32,
    pub stabilization: usize,
    /// Alpha the highlighter overlay is blended in at (times `opacity`).
    pub highlighter_alpha: f32,
}

/// One stroke in flight: exists between pointer-down and pointer-up/cancel.
pub struct StrokeState {
    settings: BrushSettings,
    last: (f32, f32),
    stabilizer: Stabilizer,
    overlay: Option<PixelBuffer>,
    points: Vec<Point>,
}

impl StrokeState {
    /// Start a stroke: allocate the overlay if the brush needs one and paint
    /// the initial dot.
    pub fn begin(doc: &mut Document, start: Point, settings: BrushSettings) -> Self {
        let overlay = settings
            .kind
            .uses_overlay()
            .then(|| PixelBuffer::new(doc.width(), doc.height()));
        let first = (start.x, start.y);
        let mut stroke = Self {
            settings,
            last: first,
            stabilizer: Stabilizer::new(settings.stabilization, first),
            overlay,
            points: vec![start],
        };
        debug!(
            "stroke begin {:?} at ({:.1}, {:.1}) size {}",
            settings.kind, start.x, start.y, settings.size
        );
        // the initial dot is always round, whatever the cap
        let width = settings.kind.line_width(settings.size, start.pressure);
        let (w, h) = (doc.width(), doc.height());
        if let Some(mask) = raster::segment_mask(w, h, first, first, width, Cap::Round) {
            stroke.paint(doc, &mask);
        }
        stroke
    }

    /// Consume one pointer sample and draw the next segment.
    pub fn extend(&mut self, doc: &mut Document, point: Point) {
        self.points.push(point);
        let raw = (point.x, point.y);
        let target = if self.settings.kind.is_stabilized() {
            self.stabilizer.push(raw)
        } else {
            raw
        };
        let width = self.settings.kind.line_width(self.settings.size, point.pressure);
        let cap = self.settings.kind.cap();
        let (w, h) = (doc.width(), doc.height());
        if let Some(mask) = raster::segment_mask(w, h, self.last, target, width, cap) {
            self.paint(doc, &mask);
        }
        self.last = target;
    }

    fn paint(&mut self, doc: &mut Document, mask: &crate::types::Mask) {
        let s = self.settings;
        match (&mut self.overlay, s.kind) {
            (Some(overlay), _) => raster::apply_mask(overlay, mask, Paint::Over(s.color, 1.0)),
            (None, BrushKind::Eraser) => {
                let layer = &mut doc.active_layer_mut().buffer;
                raster::apply_mask(layer, mask, Paint::Erase(s.opacity))
            }
            (None, _) => {
                let layer = &mut doc.active_layer_mut().buffer;
                raster::apply_mask(layer, mask, Paint::Over(s.color, s.opacity))
            }
        }
    }

    /// Commit the overlay (if any) into the active layer and drop all transient state.
    pub fn finish(mut self, doc: &mut Document) {
        if let Some(overlay) = self.overlay.take() {
            let alpha = self.settings.opacity * self.settings.highlighter_alpha;
            doc.active_layer_mut()
                .buffer
                .blit(&overlay, 0, 0, CompositeOp::SourceOver, alpha);
        }
        self.stabilizer.reset();
        debug!("stroke end {:?} after {} samples", self.settings.kind, self.points.len());
    }

    /// Overlay to preview on top of the composite, with the alpha it will commit at.
    pub fn preview(&self) -> Option<(&PixelBuffer, f32)> {
        self.overlay
            .as_ref()
            .map(|o| (o, self.settings.opacity * self.settings.highlighter_alpha))
    }

    pub fn settings(&self) -> &BrushSettings {
        &self.settings
    }

    /// Raw samples received so far, pointer-down included.
    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerFill;

    fn settings(kind: BrushKind, stabilization: usize) -> BrushSettings {
        BrushSettings {
            kind,
            color: Rgba::BLACK,
            size: 4.0,
            opacity: 1.0,
            stabilization,
            highlighter_alpha: 0.4,
        }
    }

    #[test]
    fn widths_per_brush() {
        assert_eq!(BrushKind::Marker.line_width(4.0, 0.5), 10.0);
        assert_eq!(BrushKind::Highlighter.line_width(4.0, 0.5), 12.0);
        assert_eq!(BrushKind::Eraser.line_width(4.0, 0.5), 8.0);
        assert_eq!(BrushKind::Pencil.line_width(0.5, 0.5), 1.0);
        assert!((BrushKind::Pen.line_width(10.0, 1.0) - 16.0).abs() < 1e-4);
        assert!((BrushKind::Pen.line_width(10.0, 0.0) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn zero_amount_returns_raw_point() {
        let mut s = Stabilizer::new(0, (0.0, 0.0));
        assert_eq!(s.push((10.0, 3.0)), (10.0, 3.0));
        assert_eq!(s.push((-4.5, 7.25)), (-4.5, 7.25));
    }

    #[test]
    fn weighted_average_favours_recent_points() {
        let mut s = Stabilizer::new(3, (0.0, 0.0));
        // buffer [0, 6] -> (0*1 + 6*2) / 3
        assert_eq!(s.push((6.0, 0.0)), (4.0, 0.0));
        // buffer [0, 6, 12] -> (0 + 12 + 36) / 6
        assert_eq!(s.push((12.0, 0.0)), (8.0, 0.0));
        // oldest falls out: [6, 12, 18] -> (6 + 24 + 54) / 6
        assert_eq!(s.push((18.0, 0.0)), (14.0, 0.0));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn amount_one_passes_through() {
        let mut s = Stabilizer::new(1, (0.0, 0.0));
        assert_eq!(s.push((5.0, 5.0)), (5.0, 5.0));
    }

    #[test]
    fn pencil_paints_into_active_layer() {
        let mut doc = Document::new(40, 40);
        doc.add_layer(None, LayerFill::Transparent);
        let start = Point::new(5.0, 20.0);
        let mut stroke = StrokeState::begin(&mut doc, start, settings(BrushKind::Pencil, 0));
        stroke.extend(&mut doc, Point::new(35.0, 20.0));
        stroke.finish(&mut doc);
        assert_eq!(doc.active_layer().buffer.get(20, 20), Rgba::BLACK);
        assert_eq!(doc.active_layer().buffer.get(20, 30), Rgba::TRANSPARENT);
    }

    #[test]
    fn highlighter_only_touches_layer_on_finish() {
        let mut doc = Document::new(40, 40);
        doc.add_layer(None, LayerFill::Transparent);
        let start = Point::new(5.0, 20.0);
        let mut stroke = StrokeState::begin(&mut doc, start, settings(BrushKind::Highlighter, 0));
        stroke.extend(&mut doc, Point::new(35.0, 20.0));
        assert_eq!(doc.active_layer().buffer.get(20, 20), Rgba::TRANSPARENT);
        let (overlay, alpha) = stroke.preview().unwrap();
        assert_eq!(overlay.get(20, 20), Rgba::BLACK);
        assert!((alpha - 0.4).abs() < 1e-6);
        stroke.finish(&mut doc);
        assert_eq!(doc.active_layer().buffer.get(20, 20), Rgba::BLACK.with_alpha(102));
    }

    #[test]
    fn eraser_ignores_stabilization() {
        let mut doc = Document::new(40, 40);
        let start = Point::new(2.0, 2.0);
        let mut stroke = StrokeState::begin(&mut doc, start, settings(BrushKind::Eraser, 20));
        stroke.extend(&mut doc, Point::new(30.0, 30.0));
        stroke.finish(&mut doc);
        // with smoothing the segment would stop well short of the raw point
        assert_eq!(doc.active_layer().buffer.get(29, 29).a, 0);
    }

    #[test]
    fn huge_stabilization_window_still_draws() {
        for amount in [1_000_000_000_000, usize::MAX] {
            let mut doc = Document::new(16, 16);
            let start = Point::new(2.0, 8.0);
            let brush = settings(BrushKind::Pencil, amount);
            let mut stroke = StrokeState::begin(&mut doc, start, brush);
            stroke.extend(&mut doc, Point::new(12.0, 8.0));
            stroke.finish(&mut doc);
            assert_eq!(doc.active_layer().buffer.get(5, 8), Rgba::BLACK, "amount {amount}");
        }
    }
}
