//! Layered raster painting engine.
//!
//! A [`Document`] is a stack of same-sized RGBA layers. The [`Engine`] turns
//! pointer input into brush strokes, shapes, fills and layer moves on the
//! active layer, records snapshot-based undo history, composites the visible
//! layers for display, and reads/writes the JSON project format.
//!
//! ```no_run
//! use layerpaint::{Engine, EngineConfig, Point, PointerEvent};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.apply(PointerEvent::Down(Point::new(10.0, 10.0)));
//! engine.apply(PointerEvent::Move(Point::new(200.0, 120.0)));
//! engine.apply(PointerEvent::Up);
//! let png = engine.export_png()?;
//! # Ok::<(), layerpaint::Error>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod composite;
pub mod draw;
pub mod engine;
pub mod error;
pub mod fill;
pub mod history;
pub mod layer;
pub mod pixel;
pub mod project;
pub mod raster;
pub mod shape;
pub mod stroke;
pub mod tools;
pub mod types;

pub use engine::{Engine, PointerEvent};
pub use error::{Error, Result};
pub use history::History;
pub use layer::{Document, Layer, LayerFill, LayerId, Snapshot};
pub use pixel::{CompositeOp, PixelBuffer};
pub use project::ProjectFile;
pub use shape::ShapeKind;
pub use stroke::BrushKind;
pub use tools::{Tool, ToolState};
pub use types::{Point, Rgba};

/// Engine-wide settings fixed for the lifetime of an [`Engine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Maximum number of undo snapshots
    pub history_limit: usize,
    /// Per-channel flood fill tolerance (0-255)
    pub fill_tolerance: u8,
    /// Extra alpha applied to a finished highlighter stroke
    pub highlighter_alpha: f32,
    /// Checkerboard square size behind transparent pixels
    pub checker_tile: u32,
    /// How many recently used colors the tool state remembers
    pub recent_colors_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            history_limit: history::DEFAULT_HISTORY_LIMIT,
            fill_tolerance: fill::DEFAULT_TOLERANCE,
            highlighter_alpha: 0.4,
            checker_tile: composite::DEFAULT_CHECKER_TILE,
            recent_colors_limit: tools::DEFAULT_RECENT_COLORS,
        }
    }
}
