//! Error types for the console driver.

use thiserror::Error;

use crate::ui::font::FontId;

/// Failure reported by a window backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Operation not supported by this window")]
    Unsupported,

    #[error("Window is no longer available")]
    WindowGone,

    #[error("Rectangle lies outside the window")]
    OutOfBounds,

    #[error("Window backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Invalid geometry: {width}x{height} pixels holds no character cell")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("Unknown font id: {0}")]
    UnknownFont(FontId),

    #[error("Out of memory while allocating console buffers")]
    OutOfMemory,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Surface failure: {0}")]
    Surface(#[from] SurfaceError),
}

impl From<std::collections::TryReserveError> for ConsoleError {
    fn from(_: std::collections::TryReserveError) -> Self {
        ConsoleError::OutOfMemory
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
