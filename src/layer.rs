//! The layer stack: an ordered list of same-sized raster layers plus the
//! active-layer index.
//!
//! Index 0 is the bottom of the paint order. The stack never holds fewer than
//! one layer and the active index always points at a real layer. Undo is not
//! handled here; [`crate::Engine`] snapshots through [`crate::History`] before
//! calling any mutator.

use log::warn;

use crate::error::{Error, Result};
use crate::pixel::PixelBuffer;
use crate::types::Rgba;

/// Stable identity of a layer within one document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

/// Initial contents of a new layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LayerFill {
    #[default]
    Transparent,
    /// Opaque white, used for the background layer.
    White,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub buffer: PixelBuffer,
    pub visible: bool,
    /// Always within [0, 1].
    pub opacity: f32,
}

/// Layers and active index as captured for undo. Immutable once taken.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    layers: Vec<Layer>,
    active: usize,
}

impl Snapshot {
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn active_index(&self) -> usize {
        self.active
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    active: usize,
    next_id: u32,
}

impl Document {
    /// A document with a single opaque white "Background" layer.
    pub fn new(width: u32, height: u32) -> Self {
        let mut doc = Self {
            width,
            height,
            layers: Vec::new(),
            active: 0,
            next_id: 1,
        };
        doc.add_layer(Some("Background"), LayerFill::White);
        doc
    }

    /// Build from already decoded layers (project import). Every buffer must
    /// match the document size and there must be at least one layer.
    pub fn from_layers(
        width: u32,
        height: u32,
        layers: Vec<(String, bool, f32, PixelBuffer)>,
    ) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::InvalidOperation("a document needs at least one layer".into()));
        }
        let mut doc = Self {
            width,
            height,
            layers: Vec::with_capacity(layers.len()),
            active: 0,
            next_id: 1,
        };
        for (name, visible, opacity, buffer) in layers {
            if buffer.width() != width || buffer.height() != height {
                return Err(Error::InvalidOperation(format!(
                    "layer '{name}' is {}x{}, document is {width}x{height}",
                    buffer.width(),
                    buffer.height()
                )));
            }
            let id = doc.take_id();
            doc.layers.push(Layer {
                id,
                name,
                buffer,
                visible,
                opacity: clamp_opacity(opacity),
            });
        }
        Ok(doc)
    }

    fn take_id(&mut self) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.active]
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.active]
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.layers.len() {
            return Err(Error::InvalidOperation(format!(
                "layer index {index} out of range (have {})",
                self.layers.len()
            )));
        }
        Ok(())
    }

    /// Push a new layer on top and make it active. `None` picks "Layer N".
    pub fn add_layer(&mut self, name: Option<&str>, fill: LayerFill) -> LayerId {
        let buffer = match fill {
            LayerFill::Transparent => PixelBuffer::new(self.width, self.height),
            LayerFill::White => PixelBuffer::filled(self.width, self.height, Rgba::WHITE),
        };
        let name = match name {
            Some(n) => n.to_string(),
            None => format!("Layer {}", self.layers.len() + 1),
        };
        let id = self.take_id();
        self.layers.push(Layer {
            id,
            name,
            buffer,
            visible: true,
            opacity: 1.0,
        });
        self.active = self.layers.len() - 1;
        id
    }

    /// Remove a layer. Refuses to drop the last one. The active layer keeps its
    /// identity when it survives; otherwise its nearest neighbour becomes active.
    pub fn remove_layer(&mut self, index: usize) -> Result<Layer> {
        self.check_index(index)?;
        if self.layers.len() <= 1 {
            warn!("refusing to remove the last layer");
            return Err(Error::InvalidOperation("need at least one layer".into()));
        }
        let removed = self.layers.remove(index);
        if index < self.active || self.active >= self.layers.len() {
            self.active = self.active.saturating_sub(1);
        }
        Ok(removed)
    }

    /// Move the layer at `from` so it ends up at `to`. The active layer is
    /// tracked by identity, not position.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let active_id = self.layers[self.active].id;
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.active = self.index_of(active_id).unwrap_or(0);
        Ok(())
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.check_index(index)?;
        self.layers[index].visible = visible;
        Ok(())
    }

    /// Opacity is clamped to [0, 1]; NaN becomes 0.
    pub fn set_opacity(&mut self, index: usize, opacity: f32) -> Result<()> {
        self.check_index(index)?;
        self.layers[index].opacity = clamp_opacity(opacity);
        Ok(())
    }

    /// Blank names are ignored, as a rename field left empty would be.
    pub fn rename_layer(&mut self, index: usize, name: &str) -> Result<()> {
        self.check_index(index)?;
        let name = name.trim();
        if !name.is_empty() {
            self.layers[index].name = name.to_string();
        }
        Ok(())
    }

    pub fn set_active(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.active = index;
        Ok(())
    }

    /// Deep copy of layers and active index.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            layers: self.layers.clone(),
            active: self.active,
        }
    }

    /// Replace layers and active index in one step.
    pub fn restore(&mut self, snapshot: Snapshot) {
        let Snapshot { layers, active } = snapshot;
        debug_assert!(!layers.is_empty());
        self.layers = layers;
        self.active = active.min(self.layers.len().saturating_sub(1));
        // keep ids unique across undo/redo
        let max_id = self.layers.iter().map(|l| l.id.0).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
    }
}

fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) }
}
