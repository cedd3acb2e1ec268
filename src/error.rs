//! Error types for the paint engine.
//!
//! Expected edge cases on the tool-input path (empty undo stack, a fill that
//! changes nothing) are reported as `bool` results, not errors. Only
//! structurally invalid requests and persistence failures end up here.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The request would break a document invariant (e.g. removing the last layer)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A project file was malformed or does not match the document
    #[error("Project import failed: {0}")]
    ImportFormat(String),

    /// The persistence target has no room left
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// PNG or base64 encoding/decoding failed
    #[error("Image encoding failed: {0}")]
    Encode(String),

    /// Reading or writing a project file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Creating the viewer window failed
    #[error("Window init error: {0}")]
    WindowInit(String),

    /// Updating the viewer window buffer failed
    #[error("Window update error: {0}")]
    WindowUpdate(String),
}
