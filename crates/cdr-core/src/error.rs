//! Error types for geometry construction and parameter handling

use thiserror::Error;

/// Errors raised when building polygons and trajectories
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Every polygon vertex needs exactly one velocity
    #[error("Vertex/velocity mismatch: {vertices} vertices, {velocities} velocities")]
    VertexVelocityMismatch { vertices: usize, velocities: usize },

    /// Morphing polygons must keep the same vertex count over time
    #[error("Vertex count changed from {expected} to {actual}")]
    VertexCountChanged { expected: usize, actual: usize },

    /// A trajectory mixes Euclidean and geodetic coordinates
    #[error("Mixed coordinate frames in {0}")]
    MixedFrames(String),

    /// Time values must be finite
    #[error("Invalid time {0}")]
    InvalidTime(f64),
}

/// Errors raised when reading or applying parameters
#[derive(Error, Debug)]
pub enum ParameterError {
    /// Malformed JSON parameter document
    #[error("Parameter parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Parameter holds a value of the wrong kind
    #[error("Parameter {key} is not {expected}")]
    WrongType { key: String, expected: &'static str },

    /// Parameter uses a unit with no known conversion
    #[error("Unknown unit {unit} for parameter {key}")]
    UnknownUnit { key: String, unit: String },
}
