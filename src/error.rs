use thiserror::Error;

/// Errors raised while preparing or driving the particle field.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The drawing surface is missing or has no usable area.
    #[error("drawing surface unavailable: {width}x{height}")]
    SurfaceUnavailable { width: f32, height: f32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    ConfigParse { path: String, message: String },
}

pub type FieldResult<T> = Result<T, FieldError>;
