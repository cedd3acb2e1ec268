// Tool selection and the settings a tool reads at pointer-down.

use std::collections::VecDeque;

use crate::shape::ShapeKind;
use crate::stroke::BrushKind;
use crate::types::Rgba;

pub const MIN_BRUSH_SIZE: f32 = 1.0;
pub const MAX_BRUSH_SIZE: f32 = 100.0;
/// Size change per `[` / `]` keypress.
pub const BRUSH_SIZE_STEP: f32 = 2.0;
/// Recent-colors capacity used when none is configured.
pub const DEFAULT_RECENT_COLORS: usize = 14;

/// The active tool. Variants carry only what distinguishes them; shared
/// settings (size, color, opacity) live in [`ToolState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    Brush(BrushKind),
    Fill,
    Eyedropper,
    /// Drag the whole active layer.
    Move,
    Shape(ShapeKind),
}

impl Tool {
    pub const ALL: [Tool; 11] = [
        Tool::Brush(BrushKind::Pencil),
        Tool::Brush(BrushKind::Pen),
        Tool::Brush(BrushKind::Marker),
        Tool::Brush(BrushKind::Highlighter),
        Tool::Brush(BrushKind::Eraser),
        Tool::Fill,
        Tool::Eyedropper,
        Tool::Move,
        Tool::Shape(ShapeKind::Rect),
        Tool::Shape(ShapeKind::Ellipse),
        Tool::Shape(ShapeKind::Line),
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tool::Brush(BrushKind::Pencil) => "Pencil",
            Tool::Brush(BrushKind::Pen) => "Pen",
            Tool::Brush(BrushKind::Marker) => "Marker",
            Tool::Brush(BrushKind::Highlighter) => "Highlighter",
            Tool::Brush(BrushKind::Eraser) => "Eraser",
            Tool::Fill => "Fill Bucket",
            Tool::Eyedropper => "Eyedropper",
            Tool::Move => "Move",
            Tool::Shape(ShapeKind::Rect) => "Rectangle",
            Tool::Shape(ShapeKind::Ellipse) => "Ellipse",
            Tool::Shape(ShapeKind::Line) => "Line",
        }
    }

    /// Single-letter keyboard shortcut.
    pub fn shortcut(self) -> char {
        match self {
            Tool::Brush(BrushKind::Pencil) => 'b',
            Tool::Brush(BrushKind::Pen) => 'p',
            Tool::Brush(BrushKind::Marker) => 'm',
            Tool::Brush(BrushKind::Highlighter) => 'h',
            Tool::Brush(BrushKind::Eraser) => 'e',
            Tool::Fill => 'g',
            Tool::Eyedropper => 'i',
            Tool::Move => 'v',
            Tool::Shape(ShapeKind::Rect) => 'r',
            Tool::Shape(ShapeKind::Ellipse) => 'o',
            Tool::Shape(ShapeKind::Line) => 'l',
        }
    }

    pub fn from_shortcut(key: char) -> Option<Tool> {
        let key = key.to_ascii_lowercase();
        Tool::ALL.into_iter().find(|t| t.shortcut() == key)
    }
}

impl Default for Tool {
    fn default() -> Self {
        Tool::Brush(BrushKind::Pencil)
    }
}

/// Most-recent-first color history without duplicates.
#[derive(Clone, Debug, PartialEq)]
pub struct RecentColors {
    colors: VecDeque<Rgba>,
    limit: usize,
}

impl RecentColors {
    pub fn new(limit: usize) -> Self {
        Self {
            colors: VecDeque::with_capacity(limit.min(16)),
            limit: limit.max(1),
        }
    }

    /// The palette a fresh session starts with.
    pub fn with_defaults(limit: usize) -> Self {
        let mut recent = Self::new(limit);
        let defaults = [
            "#000000", "#ffffff", "#ff5e3a", "#3b82f6", "#10b981", "#f59e0b", "#8b5cf6", "#ef4444",
        ];
        for hex in defaults.iter().rev() {
            if let Some(c) = Rgba::from_hex(hex) {
                recent.push(c);
            }
        }
        recent
    }

    /// Move `color` to the front, removing any earlier copy; the oldest falls
    /// off past the limit.
    pub fn push(&mut self, color: Rgba) {
        self.colors.retain(|&c| c != color);
        self.colors.push_front(color);
        self.colors.truncate(self.limit);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rgba> {
        self.colors.iter()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn first(&self) -> Option<Rgba> {
        self.colors.front().copied()
    }
}

/// Current tool and its shared settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolState {
    pub tool: Tool,
    brush_size: f32,
    opacity: f32,
    /// Stabilizer window in samples; 0 turns smoothing off.
    pub stabilization: usize,
    color: Rgba,
    recent: RecentColors,
}

impl ToolState {
    pub fn new(recent_limit: usize) -> Self {
        Self {
            tool: Tool::default(),
            brush_size: 6.0,
            opacity: 1.0,
            stabilization: 8,
            color: Rgba::BLACK,
            recent: RecentColors::with_defaults(recent_limit),
        }
    }

    pub fn brush_size(&self) -> f32 {
        self.brush_size
    }

    pub fn set_brush_size(&mut self, size: f32) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    /// Grow (positive) or shrink (negative) the brush by whole keyboard steps.
    pub fn nudge_brush_size(&mut self, steps: i32) {
        self.set_brush_size(self.brush_size + steps as f32 * BRUSH_SIZE_STEP);
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    /// Select a color and record it in the recent list. Alpha is forced opaque;
    /// translucency comes from the opacity setting.
    pub fn set_color(&mut self, color: Rgba) {
        let color = color.with_alpha(255);
        self.color = color;
        self.recent.push(color);
    }

    pub fn recent_colors(&self) -> &RecentColors {
        &self.recent
    }
}

impl Default for ToolState {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_COLORS)
    }
}
