//! The paint engine: owns the document, undo history, tool settings and the
//! single gesture in flight, and turns pointer events into layer mutations.
//!
//! Every mutation records a history snapshot first. At most one gesture
//! (stroke, shape or move) is active; starting anything else finishes it
//! cleanly, exactly as pointer-up would. The display frame is cached and only
//! re-composited when something marked it dirty, so callers can ask for it
//! once per screen refresh no matter how many pointer samples arrived.

use std::path::Path;

use log::debug;

use crate::EngineConfig;
use crate::composite;
use crate::error::Result;
use crate::fill;
use crate::history::History;
use crate::layer::{Document, LayerId, LayerFill};
use crate::pixel::{CompositeOp, PixelBuffer};
use crate::project;
use crate::shape::{ShapeKind, ShapeState};
use crate::stroke::{BrushKind, BrushSettings, StrokeState};
use crate::tools::{Tool, ToolState};
use crate::types::{Point, Rgba};

/// Pointer input in canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
    /// Pointer left the canvas or the platform cancelled it; same as `Up`.
    Cancel,
}

struct MoveState {
    origin: (f32, f32),
    source: PixelBuffer,
}

enum Gesture {
    Stroke(StrokeState),
    Shape(ShapeState),
    Move(MoveState),
}

pub struct Engine {
    config: EngineConfig,
    document: Document,
    history: History,
    tools: ToolState,
    gesture: Option<Gesture>,
    frame: Option<PixelBuffer>,
}

impl Engine {
    /// Fresh document with a white background layer.
    pub fn new(config: EngineConfig) -> Self {
        let document = Document::new(config.width, config.height);
        Self::with_document(config, document)
    }

    /// Wrap an existing document; its size overrides the configured one.
    pub fn with_document(mut config: EngineConfig, document: Document) -> Self {
        config.width = document.width();
        config.height = document.height();
        Self {
            history: History::new(config.history_limit),
            tools: ToolState::new(config.recent_colors_limit),
            config,
            document,
            gesture: None,
            frame: None,
        }
    }

    /// Open a saved project; the canvas takes the project's size.
    pub fn open(config: EngineConfig, path: &Path) -> Result<Self> {
        let document = project::load_project(path)?;
        debug!("opened {} ({} layers)", path.display(), document.len());
        Ok(Self::with_document(config, document))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    /// Tool settings. Changing them mid-gesture only affects the next gesture.
    pub fn tools_mut(&mut self) -> &mut ToolState {
        &mut self.tools
    }

    /// Switch tools, finishing whatever was in progress.
    pub fn set_tool(&mut self, tool: Tool) {
        self.end_gesture();
        self.tools.tool = tool;
    }

    pub fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    fn invalidate(&mut self) {
        self.frame = None;
    }

    /// True when the next `display_frame` call will re-composite.
    pub fn needs_redraw(&self) -> bool {
        self.frame.is_none()
    }

    /// Single entry point for pointer input; dispatches on the current tool.
    pub fn apply(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down(p) => match self.tools.tool {
                Tool::Brush(kind) => self.begin_stroke(p, kind),
                Tool::Fill => {
                    self.flood_fill(p);
                }
                Tool::Eyedropper => {
                    self.pick_color(p);
                }
                Tool::Move => self.begin_move(p),
                Tool::Shape(kind) => self.begin_shape(p, kind),
            },
            PointerEvent::Move(p) => match self.gesture {
                Some(Gesture::Stroke(_)) => self.continue_stroke(p),
                Some(Gesture::Shape(_)) => self.update_shape(p),
                Some(Gesture::Move(_)) => self.continue_move(p),
                None => {}
            },
            PointerEvent::Up | PointerEvent::Cancel => self.end_gesture(),
        }
    }

    /// Finish the active gesture, if any. Safe to call at any time.
    pub fn end_gesture(&mut self) {
        let Some(gesture) = self.gesture.take() else {
            return;
        };
        match gesture {
            Gesture::Stroke(stroke) => stroke.finish(&mut self.document),
            Gesture::Shape(shape) => shape.commit(&mut self.document),
            Gesture::Move(_) => debug!("move end"),
        }
        self.invalidate();
    }

    fn brush_settings(&self, kind: BrushKind) -> BrushSettings {
        BrushSettings {
            kind,
            color: self.tools.color(),
            size: self.tools.brush_size(),
            opacity: self.tools.opacity(),
            stabilization: self.tools.stabilization,
            highlighter_alpha: self.config.highlighter_alpha,
        }
    }

    /// Pointer-down for a freehand brush.
    pub fn begin_stroke(&mut self, point: Point, kind: BrushKind) {
        self.end_gesture();
        self.history.push(&self.document);
        let settings = self.brush_settings(kind);
        let stroke = StrokeState::begin(&mut self.document, point, settings);
        self.gesture = Some(Gesture::Stroke(stroke));
        self.invalidate();
    }

    /// Pointer-move during a stroke. Every sample is consumed.
    pub fn continue_stroke(&mut self, point: Point) {
        if let Some(Gesture::Stroke(stroke)) = &mut self.gesture {
            stroke.extend(&mut self.document, point);
            self.frame = None;
        }
    }

    pub fn end_stroke(&mut self) {
        if matches!(self.gesture, Some(Gesture::Stroke(_))) {
            self.end_gesture();
        }
    }

    /// Pointer-down for rectangle/ellipse/line: record the anchor.
    pub fn begin_shape(&mut self, anchor: Point, kind: ShapeKind) {
        self.end_gesture();
        self.history.push(&self.document);
        let shape = ShapeState::begin(
            kind,
            anchor,
            self.tools.color(),
            self.tools.brush_size(),
            self.tools.opacity(),
            (self.document.width(), self.document.height()),
        );
        self.gesture = Some(Gesture::Shape(shape));
        self.invalidate();
    }

    pub fn update_shape(&mut self, point: Point) {
        if let Some(Gesture::Shape(shape)) = &mut self.gesture {
            shape.update(point);
            self.frame = None;
        }
    }

    pub fn end_shape(&mut self) {
        if matches!(self.gesture, Some(Gesture::Shape(_))) {
            self.end_gesture();
        }
    }

    /// Pointer-down for the move tool: remember the layer as it is now.
    pub fn begin_move(&mut self, point: Point) {
        self.end_gesture();
        self.history.push(&self.document);
        let source = self.document.active_layer().buffer.clone();
        debug!("move begin at ({:.1}, {:.1})", point.x, point.y);
        self.gesture = Some(Gesture::Move(MoveState {
            origin: (point.x, point.y),
            source,
        }));
    }

    /// Redraw the active layer translated by the pointer delta.
    pub fn continue_move(&mut self, point: Point) {
        if let Some(Gesture::Move(state)) = &self.gesture {
            let dx = (point.x - state.origin.0).round() as i32;
            let dy = (point.y - state.origin.1).round() as i32;
            let buffer = &mut self.document.active_layer_mut().buffer;
            buffer.clear();
            buffer.blit(&state.source, dx, dy, CompositeOp::Copy, 1.0);
            self.frame = None;
        }
    }

    /// Bucket fill on the active layer with the current color and opacity.
    /// Returns false when nothing changed (seed off-canvas or already filled).
    pub fn flood_fill(&mut self, point: Point) -> bool {
        self.end_gesture();
        self.history.push(&self.document);
        let filled = fill::flood_fill(
            &mut self.document.active_layer_mut().buffer,
            point.pixel(),
            self.tools.color(),
            self.tools.opacity(),
            self.config.fill_tolerance,
        );
        if filled > 0 {
            self.invalidate();
        }
        filled > 0
    }

    /// Eyedropper: take the displayed color under the pointer as the current color.
    pub fn pick_color(&mut self, point: Point) -> Option<Rgba> {
        let (x, y) = point.pixel();
        let (w, h) = (self.document.width(), self.document.height());
        if x < 0 || y < 0 || x as u32 >= w || y as u32 >= h {
            return None;
        }
        let picked = self.display_frame().get(x, y).with_alpha(255);
        self.tools.set_color(picked);
        debug!("picked {picked} at ({x}, {y})");
        Some(picked)
    }

    /// Step back one snapshot. False when the undo stack is empty.
    pub fn undo(&mut self) -> bool {
        self.end_gesture();
        let done = self.history.undo(&mut self.document);
        if done {
            self.invalidate();
        }
        done
    }

    /// Re-apply the last undone snapshot. False when the redo stack is empty.
    pub fn redo(&mut self) -> bool {
        self.end_gesture();
        let done = self.history.redo(&mut self.document);
        if done {
            self.invalidate();
        }
        done
    }

    /// Run a validated layer-stack mutation, recording history only if it succeeds.
    fn mutate<T>(&mut self, f: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        self.end_gesture();
        let before = self.document.snapshot();
        let out = f(&mut self.document)?;
        self.history.push_snapshot(before);
        self.invalidate();
        Ok(out)
    }

    /// New transparent layer on top; it becomes active.
    pub fn add_layer(&mut self, name: Option<&str>) -> LayerId {
        self.end_gesture();
        self.history.push(&self.document);
        let id = self.document.add_layer(name, LayerFill::Transparent);
        self.invalidate();
        id
    }

    pub fn remove_layer(&mut self, index: usize) -> Result<()> {
        self.mutate(|doc| doc.remove_layer(index).map(|_| ()))
    }

    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.mutate(|doc| doc.move_layer(from, to))
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.mutate(|doc| doc.set_visible(index, visible))
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> Result<()> {
        self.mutate(|doc| doc.set_opacity(index, opacity))
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> Result<()> {
        self.mutate(|doc| doc.rename_layer(index, name))
    }

    /// Selection only; not recorded in history.
    pub fn set_active_layer(&mut self, index: usize) -> Result<()> {
        self.end_gesture();
        self.document.set_active(index)
    }

    /// Start over with a single white background (undoable).
    pub fn new_canvas(&mut self) {
        self.end_gesture();
        self.history.push(&self.document);
        self.document = Document::new(self.config.width, self.config.height);
        self.invalidate();
    }

    /// Replace the document with a project file's contents. The current
    /// document is left untouched if anything about the file is invalid.
    pub fn import_project(&mut self, json: &str) -> Result<()> {
        let (w, h) = (self.document.width(), self.document.height());
        let imported = project::import_project(json, w, h)?;
        self.end_gesture();
        self.history.push(&self.document);
        self.document = imported;
        self.invalidate();
        Ok(())
    }

    pub fn export_project(&self) -> Result<String> {
        project::export_project(&self.document)
    }

    pub fn export_png(&self) -> Result<Vec<u8>> {
        project::export_png(&self.document)
    }

    pub fn save_project(&self, path: &Path) -> Result<()> {
        project::save_project(path, &self.document)
    }

    /// Visible layers flattened without the checkerboard.
    pub fn flatten(&self) -> PixelBuffer {
        composite::flatten(&self.document)
    }

    /// The on-screen frame, including any live tool preview. Re-composited
    /// only when something changed since the last call.
    pub fn display_frame(&mut self) -> &PixelBuffer {
        let frame = match self.frame.take() {
            Some(frame) => frame,
            None => {
                let overlay = match &self.gesture {
                    Some(Gesture::Stroke(stroke)) => stroke.preview(),
                    Some(Gesture::Shape(shape)) => Some((shape.preview(), 1.0)),
                    _ => None,
                };
                composite::display_frame(&self.document, overlay, self.config.checker_tile)
            }
        };
        self.frame.insert(frame)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Engine {
        Engine::new(EngineConfig {
            width: 40,
            height: 30,
            ..Default::default()
        })
    }

    #[test]
    fn apply_dispatches_on_current_tool() {
        let mut engine = small();
        engine.set_tool(Tool::Fill);
        engine.tools_mut().set_color(Rgba::rgb(0, 128, 0));
        engine.apply(PointerEvent::Down(Point::new(5.0, 5.0)));
        assert!(!engine.is_drawing());
        assert_eq!(engine.document().active_layer().buffer.get(39, 29), Rgba::rgb(0, 128, 0));
    }

    #[test]
    fn cancel_finishes_a_stroke_like_up() {
        let mut engine = small();
        engine.set_tool(Tool::Brush(BrushKind::Highlighter));
        engine.apply(PointerEvent::Down(Point::new(5.0, 15.0)));
        engine.apply(PointerEvent::Move(Point::new(30.0, 15.0)));
        assert!(engine.is_drawing());
        engine.apply(PointerEvent::Cancel);
        assert!(!engine.is_drawing());
        // highlighter committed over white: tinted but still opaque
        let px = engine.document().active_layer().buffer.get(20, 15);
        assert_eq!(px.a, 255);
        assert!(px.r < 255);
    }

    #[test]
    fn starting_a_new_gesture_ends_the_old_one() {
        let mut engine = small();
        engine.begin_shape(Point::new(2.0, 2.0), ShapeKind::Line);
        engine.update_shape(Point::new(20.0, 2.0));
        engine.begin_stroke(Point::new(30.0, 25.0), BrushKind::Pencil);
        assert_eq!(engine.document().active_layer().buffer.get(10, 2), Rgba::BLACK);
        engine.end_stroke();
        assert_eq!(engine.history().undo_len(), 2);
    }

    #[test]
    fn move_tool_translates_layer() {
        let mut engine = small();
        engine.add_layer(None);
        engine.tools_mut().set_brush_size(1.0);
        engine.document.active_layer_mut().buffer.set(5, 5, Rgba::BLACK);
        engine.set_tool(Tool::Move);
        engine.apply(PointerEvent::Down(Point::new(10.0, 10.0)));
        engine.apply(PointerEvent::Move(Point::new(13.0, 12.0)));
        engine.apply(PointerEvent::Up);
        let buf = &engine.document().active_layer().buffer;
        assert_eq!(buf.get(8, 7), Rgba::BLACK);
        assert_eq!(buf.get(5, 5), Rgba::TRANSPARENT);
    }

    #[test]
    fn eyedropper_picks_displayed_color() {
        let mut engine = small();
        engine.document.active_layer_mut().buffer.set(3, 4, Rgba::rgb(1, 2, 3));
        engine.set_tool(Tool::Eyedropper);
        engine.apply(PointerEvent::Down(Point::new(3.2, 3.9)));
        assert_eq!(engine.tools().color(), Rgba::rgb(1, 2, 3));
        assert_eq!(engine.tools().recent_colors().first(), Some(Rgba::rgb(1, 2, 3)));
        assert_eq!(engine.history().undo_len(), 0);
    }

    #[test]
    fn rejected_layer_removal_leaves_no_history() {
        let mut engine = small();
        assert!(engine.remove_layer(0).is_err());
        assert_eq!(engine.history().undo_len(), 0);
        assert_eq!(engine.document().len(), 1);
    }

    #[test]
    fn frame_is_cached_until_something_changes() {
        let mut engine = small();
        engine.display_frame();
        assert!(!engine.needs_redraw());
        engine.add_layer(None);
        assert!(engine.needs_redraw());
        let frame = engine.display_frame().clone();
        assert_eq!(frame.get(0, 0), Rgba::WHITE);
    }

    #[test]
    fn failed_import_keeps_document() {
        let mut engine = small();
        engine.add_layer(Some("Keep"));
        let before = engine.document().clone();
        assert!(engine.import_project("{\"type\":\"other\"}").is_err());
        assert_eq!(engine.document(), &before);
    }

    #[test]
    fn new_canvas_is_undoable() {
        let mut engine = small();
        engine.add_layer(None);
        engine.new_canvas();
        assert_eq!(engine.document().len(), 1);
        assert!(engine.undo());
        assert_eq!(engine.document().len(), 2);
    }

    #[test]
    fn extreme_config_values_do_not_panic() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"width":16,"height":16,"recent_colors_limit":18446744073709551615}"#,
        )
        .unwrap();
        let mut engine = Engine::new(config);
        engine.tools_mut().stabilization = usize::MAX;
        engine.apply(PointerEvent::Down(Point::new(2.0, 8.0)));
        engine.apply(PointerEvent::Move(Point::new(12.0, 8.0)));
        engine.apply(PointerEvent::Up);
        assert_eq!(engine.document().active_layer().buffer.get(5, 8), Rgba::BLACK);
    }
}
