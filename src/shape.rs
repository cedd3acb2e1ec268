// Rectangle / ellipse / line tool. The preview lives on a scratch overlay that
// is cleared and redrawn on every pointer move; release commits it.

use log::debug;

use crate::layer::Document;
use crate::pixel::{CompositeOp, PixelBuffer};
use crate::raster::{self, Cap, Paint};
use crate::types::{Point, Rgba};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Stroked outline of the bounding box.
    Rect,
    /// Inscribed in the bounding box.
    Ellipse,
    /// Anchor to current point.
    Line,
}

/// A shape gesture in flight.
pub struct ShapeState {
    kind: ShapeKind,
    anchor: (f32, f32),
    color: Rgba,
    width: f32,
    opacity: f32,
    overlay: PixelBuffer,
}

impl ShapeState {
    pub fn begin(
        kind: ShapeKind,
        anchor: Point,
        color: Rgba,
        width: f32,
        opacity: f32,
        canvas: (u32, u32),
    ) -> Self {
        debug!("shape begin {kind:?} at ({:.1}, {:.1})", anchor.x, anchor.y);
        Self {
            kind,
            anchor: (anchor.x, anchor.y),
            color,
            width: width.max(1.0),
            opacity: opacity.clamp(0.0, 1.0),
            overlay: PixelBuffer::new(canvas.0, canvas.1),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Redraw the preview from scratch for the current pointer position.
    pub fn update(&mut self, point: Point) {
        self.overlay.clear();
        let (w, h) = (self.overlay.width(), self.overlay.height());
        let current = (point.x, point.y);
        let (anchor, width) = (self.anchor, self.width);
        let mask = match self.kind {
            ShapeKind::Rect => raster::rect_outline_mask(w, h, anchor, current, width),
            ShapeKind::Ellipse => raster::ellipse_outline_mask(w, h, anchor, current, width),
            ShapeKind::Line => raster::segment_mask(w, h, anchor, current, width, Cap::Round),
        };
        if let Some(mask) = mask {
            raster::apply_mask(&mut self.overlay, &mask, Paint::Replace(self.color, self.opacity));
        }
    }

    pub fn preview(&self) -> &PixelBuffer {
        &self.overlay
    }

    /// Paint the last preview into the active layer.
    pub fn commit(self, doc: &mut Document) {
        doc.active_layer_mut()
            .buffer
            .blit(&self.overlay, 0, 0, CompositeOp::SourceOver, 1.0);
        debug!("shape commit {:?}", self.kind);
    }
}
