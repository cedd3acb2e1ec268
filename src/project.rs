//! Project persistence: the JSON document exchanged with the surrounding
//! application, plus flattened PNG export.
//!
//! ```json
//! { "type": "rasterproject", "version": 2, "width": 1920, "height": 1080,
//!   "layers": [ { "name": "Background", "visible": true, "opacity": 1,
//!                 "data": "data:image/png;base64,..." } ] }
//! ```
//!
//! Import validates everything (type, dimensions, every layer image) before a
//! [`Document`] is built, so a failed import never leaves partial state.

use std::fs;
use std::io;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::composite;
use crate::error::{Error, Result};
use crate::layer::Document;
use crate::pixel::PixelBuffer;

pub const PROJECT_TYPE: &str = "rasterproject";
pub const PROJECT_VERSION: u32 = 2;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectLayer {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    /// PNG data URL of exactly width x height pixels.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
    pub width: u32,
    pub height: u32,
    /// Optional at the serde level so a missing list gets a precise error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<ProjectLayer>>,
}

/// PNG bytes as a `data:` URL.
pub fn encode_data_url(png: &[u8]) -> String {
    format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png))
}

/// Bytes from a PNG data URL; bare base64 is accepted too.
pub fn decode_data_url(data: &str) -> Result<Vec<u8>> {
    let payload = data.strip_prefix(PNG_DATA_URL_PREFIX).unwrap_or(data);
    STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Encode(format!("invalid base64 layer data: {e}")))
}

impl ProjectFile {
    /// Serialize every layer of `doc`.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let layers = doc
            .layers()
            .iter()
            .map(|l| {
                Ok(ProjectLayer {
                    name: l.name.clone(),
                    visible: l.visible,
                    opacity: l.opacity,
                    data: encode_data_url(&l.buffer.to_png()?),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            kind: PROJECT_TYPE.to_string(),
            version: PROJECT_VERSION,
            width: doc.width(),
            height: doc.height(),
            layers: Some(layers),
        })
    }

    /// Parse and check the envelope: known type and a non-empty layer list.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ProjectFile =
            serde_json::from_str(json).map_err(|e| {
                Error::ImportFormat(format!("malformed project JSON: {e}"))
            })?;
        if file.kind != PROJECT_TYPE {
            return Err(Error::ImportFormat(format!("unknown project type '{}'", file.kind)));
        }
        if file.layers.as_ref().is_none_or(|l| l.is_empty()) {
            return Err(Error::ImportFormat("project has no layers".into()));
        }
        Ok(file)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Encode(e.to_string()))
    }

    /// Decode into a document of the expected size.
    pub fn into_document(self, width: u32, height: u32) -> Result<Document> {
        if self.width != width || self.height != height {
            return Err(Error::ImportFormat(format!(
                "project is {}x{}, document is {width}x{height}",
                self.width, self.height
            )));
        }
        let layers = self
            .layers
            .ok_or_else(|| Error::ImportFormat("project has no layers".into()))?;
        let mut decoded = Vec::with_capacity(layers.len());
        for (i, layer) in layers.into_iter().enumerate() {
            let bytes = decode_data_url(&layer.data)
                .map_err(|e| Error::ImportFormat(format!("layer {i} ('{}'): {e}", layer.name)))?;
            let buffer = PixelBuffer::from_png(&bytes)
                .map_err(|e| Error::ImportFormat(format!("layer {i} ('{}'): {e}", layer.name)))?;
            if buffer.width() != width || buffer.height() != height {
                return Err(Error::ImportFormat(format!(
                    "layer {i} ('{}') image is {}x{}, expected {width}x{height}",
                    layer.name,
                    buffer.width(),
                    buffer.height()
                )));
            }
            decoded.push((layer.name, layer.visible, layer.opacity, buffer));
        }
        let doc = Document::from_layers(width, height, decoded)
            .map_err(|e| Error::ImportFormat(e.to_string()))?;
        debug!("imported project with {} layers", doc.len());
        Ok(doc)
    }
}

/// Project JSON for `doc`.
pub fn export_project(doc: &Document) -> Result<String> {
    ProjectFile::from_document(doc)?.to_json()
}

/// Parse, validate and decode a project for a `width` x `height` document.
pub fn import_project(json: &str, width: u32, height: u32) -> Result<Document> {
    let result = ProjectFile::from_json(json).and_then(|f| f.into_document(width, height));
    if let Err(e) = &result {
        warn!("project import rejected: {e}");
    }
    result
}

/// All visible layers flattened once and encoded as PNG.
pub fn export_png(doc: &Document) -> Result<Vec<u8>> {
    composite::flatten(doc).to_png()
}

fn map_write_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::StorageFull | io::ErrorKind::OutOfMemory => {
            Error::ResourceExhausted(e.to_string())
        }
        _ => Error::Io(e),
    }
}

/// Write the project JSON to `path`. Only reads the document.
pub fn save_project(path: &Path, doc: &Document) -> Result<()> {
    let json = export_project(doc)?;
    fs::write(path, json).map_err(map_write_error)?;
    debug!("saved project to {}", path.display());
    Ok(())
}

/// Read a project file into a document sized by the file itself.
pub fn load_project(path: &Path) -> Result<Document> {
    let json = fs::read_to_string(path)?;
    let file = ProjectFile::from_json(&json)?;
    let (width, height) = (file.width, file.height);
    file.into_document(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerFill;
    use crate::types::Rgba;

    fn sample_doc() -> Document {
        let mut doc = Document::new(6, 4);
        doc.add_layer(Some("Ink"), LayerFill::Transparent);
        doc.active_layer_mut().buffer.set(2, 1, Rgba::new(10, 20, 30, 200));
        doc.set_opacity(1, 0.25).unwrap();
        doc.set_visible(0, false).unwrap();
        doc
    }

    #[test]
    fn export_then_import_keeps_layers() {
        let doc = sample_doc();
        let json = export_project(&doc).unwrap();
        assert!(json.contains("\"type\":\"rasterproject\""));
        assert!(json.contains(PNG_DATA_URL_PREFIX));

        let back = import_project(&json, 6, 4).unwrap();
        assert_eq!(back.len(), 2);
        for (a, b) in back.layers().iter().zip(doc.layers()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.visible, b.visible);
            assert_eq!(a.opacity, b.opacity);
            assert_eq!(a.buffer, b.buffer);
        }
        assert_eq!(back.active_index(), 0);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let json = r#"{"type":"moltendraw","version":2,"width":6,"height":4,"layers":[]}"#;
        assert!(matches!(import_project(json, 6, 4), Err(Error::ImportFormat(_))));
    }

    #[test]
    fn missing_layers_is_rejected() {
        let json = r#"{"type":"rasterproject","version":2,"width":6,"height":4}"#;
        let err = import_project(json, 6, 4).unwrap_err();
        assert!(err.to_string().contains("no layers"));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let json = export_project(&sample_doc()).unwrap();
        assert!(matches!(import_project(&json, 8, 4), Err(Error::ImportFormat(_))));
    }

    #[test]
    fn bad_layer_image_is_rejected() {
        let json = r#"{"type":"rasterproject","version":2,"width":6,"height":4,
            "layers":[{"name":"x","visible":true,"opacity":1,"data":"data:image/png;base64,AAAA"}]}"#;
        assert!(matches!(import_project(json, 6, 4), Err(Error::ImportFormat(_))));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(import_project("{not json", 6, 4), Err(Error::ImportFormat(_))));
    }

    #[test]
    fn bare_base64_is_accepted() {
        let png = PixelBuffer::filled(2, 2, Rgba::WHITE).to_png().unwrap();
        let url = encode_data_url(&png);
        let bare = url.trim_start_matches(PNG_DATA_URL_PREFIX);
        assert_eq!(decode_data_url(bare).unwrap(), png);
    }

    #[test]
    fn save_and_load_through_a_file() {
        let path = std::env::temp_dir().join(format!("layerpaint-{}.json", std::process::id()));
        let doc = sample_doc();
        save_project(&path, &doc).unwrap();
        let loaded = load_project(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!((loaded.width(), loaded.height()), (6, 4));
        assert_eq!(loaded.layer(1).unwrap().buffer, doc.layer(1).unwrap().buffer);
    }

    #[test]
    fn flattened_png_skips_hidden_layers() {
        let png = export_png(&sample_doc()).unwrap();
        let flat = PixelBuffer::from_png(&png).unwrap();
        assert_eq!(flat.get(0, 0), Rgba::TRANSPARENT);
        assert_eq!(flat.get(2, 1).a, 50);
    }

    #[test]
    fn full_disk_maps_to_resource_exhausted() {
        let full = map_write_error(io::Error::new(io::ErrorKind::StorageFull, "disk full"));
        assert!(matches!(full, Error::ResourceExhausted(_)));
        let denied = map_write_error(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        assert!(matches!(denied, Error::Io(_)));
    }
}
