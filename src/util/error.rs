//! Error types for scene acceleration builds.

use thiserror::Error;

/// Main error type for build operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Top-level build requested over zero items
    #[error("Cannot build a top-level BVH over zero items")]
    EmptyBuild,

    /// Build options are out of range
    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    /// Instance transform produced NaN or infinite world bounds
    #[error("Instance {instance} (mesh {mesh}) has non-finite world bounds; check its transform")]
    NonFiniteBounds { instance: usize, mesh: usize },

    /// Instance transform collapses space (zero or non-finite determinant)
    #[error("Instance {instance} has a singular transform (determinant {determinant})")]
    SingularTransform { instance: usize, determinant: f32 },

    /// Square texture side exceeds what the packed index can address
    #[error("{buffer} texture width {width} exceeds the packed index limit of {max}")]
    TextureWidthOverflow {
        buffer: &'static str,
        width: usize,
        max: usize,
    },

    /// Instance references a mesh id that was never registered
    #[error("Instance {instance} references unknown mesh {mesh}")]
    UnknownMesh { instance: usize, mesh: usize },

    /// Instance references a material id that was never registered
    #[error("Instance {instance} references unknown material {material}")]
    UnknownMaterial { instance: usize, material: usize },

    /// Texture assignment targets a material id that was never registered
    #[error("No material {material} to assign a texture to")]
    NoSuchMaterial { material: usize },

    /// Mesh index data is inconsistent with its attribute buffers
    #[error("Mesh '{mesh}' is malformed: {reason}")]
    MalformedMesh { mesh: String, reason: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a malformed mesh error.
    pub fn malformed(mesh: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedMesh {
            mesh: mesh.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::TextureWidthOverflow {
            buffer: "vertices",
            width: 5000,
            max: 4096,
        };
        let msg = e.to_string();
        assert!(msg.contains("vertices"));
        assert!(msg.contains("5000"));
        assert!(msg.contains("4096"));

        let e = Error::NonFiniteBounds { instance: 3, mesh: 1 };
        assert!(e.to_string().contains("Instance 3"));

        let e = Error::SingularTransform { instance: 5, determinant: 0.0 };
        assert!(e.to_string().contains("Instance 5"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(Error::config("x"), Error::InvalidConfig(m) if m == "x"));
        assert!(matches!(Error::other("y"), Error::Other(m) if m == "y"));
        assert!(matches!(Error::malformed("m", "r"), Error::MalformedMesh { .. }));
    }
}
