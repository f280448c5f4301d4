use thiserror::Error;

/// Errors surfaced by the drawing core
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A raster of the requested size could not be allocated
    #[error("Failed to allocate a {width}x{height} raster")]
    ResourceExhausted { width: u32, height: u32 },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The operation needs an idle canvas but a stroke is being drawn
    #[error("A stroke is in progress")]
    StrokeInProgress,
}

/// Result type for core canvas operations
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur while exporting a saved image
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write exported image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Errors that can occur while loading a canvas configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
