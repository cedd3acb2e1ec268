//! Layer compositing.
//!
//! [`flatten`] blends visible layers bottom-to-top onto a transparent
//! accumulator and is what export uses. [`display_frame`] does the same on top
//! of a checkerboard so transparency is visible on screen; the checkerboard
//! never reaches any layer. Both are pure reads of the document.

use crate::layer::Document;
use crate::pixel::{CompositeOp, PixelBuffer};
use crate::types::Rgba;

/// Checker square size used when none is configured.
pub const DEFAULT_CHECKER_TILE: u32 = 16;

pub const CHECKER_LIGHT: Rgba = Rgba::rgb(0xe0, 0xe0, 0xe0);
pub const CHECKER_DARK: Rgba = Rgba::rgb(0xcc, 0xcc, 0xcc);

/// Extra buffer drawn above all layers (live tool preview) with its opacity.
pub type Overlay<'a> = Option<(&'a PixelBuffer, f32)>;

fn composite_onto(acc: &mut PixelBuffer, doc: &Document, overlay: Overlay<'_>) {
    for layer in doc.layers().iter().filter(|l| l.visible) {
        acc.blit(&layer.buffer, 0, 0, CompositeOp::SourceOver, layer.opacity);
    }
    if let Some((buf, opacity)) = overlay {
        acc.blit(buf, 0, 0, CompositeOp::SourceOver, opacity);
    }
}

/// All visible layers alpha-over blended, transparent where nothing was painted.
pub fn flatten(doc: &Document) -> PixelBuffer {
    let mut acc = PixelBuffer::new(doc.width(), doc.height());
    composite_onto(&mut acc, doc, None);
    acc
}

/// Checkerboard of `tile`-pixel squares, dark squares on the even diagonal.
pub fn checkerboard(width: u32, height: u32, tile: u32) -> PixelBuffer {
    let tile = tile.max(1);
    let mut buf = PixelBuffer::filled(width, height, CHECKER_LIGHT);
    for y in 0..height {
        for x in 0..width {
            if (x / tile + y / tile) % 2 == 0 {
                buf.set(x as i32, y as i32, CHECKER_DARK);
            }
        }
    }
    buf
}

/// Opaque frame for the screen: checkerboard, visible layers, then the overlay.
pub fn display_frame(doc: &Document, overlay: Overlay<'_>, tile: u32) -> PixelBuffer {
    let mut acc = checkerboard(doc.width(), doc.height(), tile);
    composite_onto(&mut acc, doc, overlay);
    acc
}
