use std::path::PathBuf;

/// Errors that abort a pipeline run.
///
/// Regions below the minimum pixel count are not errors; they are filtered
/// out before any artifact references them. A tracer that produces nothing
/// usable for one mask surfaces as [`TraceError`] and only skips that
/// region.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The source image could not be decoded.
    #[error("failed to decode source image: {0}")]
    Decode(#[from] image::ImageError),

    /// An image artifact (mask or preview) could not be written.
    #[error("failed to write image artifact {}: {message}", path.display())]
    ImageWrite { path: PathBuf, message: String },

    /// An intermediate artifact expected at composition time is absent.
    ///
    /// Never substituted with a default: a partially composed document
    /// would break the color-table/SVG consistency contract.
    #[error("missing artifact: {}", path.display())]
    MissingArtifact { path: PathBuf },

    /// Invalid configuration or malformed input (bad threshold, label grid
    /// shape mismatch, unsupported array encoding).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn missing_artifact(path: impl Into<PathBuf>) -> Self {
        Self::MissingArtifact { path: path.into() }
    }

    pub fn image_write(path: impl Into<PathBuf>, err: image::ImageError) -> Self {
        Self::ImageWrite {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Failure of the external bitmap tracer for a single mask.
///
/// Non-fatal for the run: the caller logs it and drops the region before
/// any color index is assigned.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("tracer backend failed: {0}")]
    Backend(String),

    #[error("tracer produced no usable path")]
    EmptyOutput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifact_names_the_path() {
        let err = PipelineError::missing_artifact("/tmp/out/region-colors.json");
        assert_eq!(
            err.to_string(),
            "missing artifact: /tmp/out/region-colors.json"
        );
    }

    #[test]
    fn invalid_input_preserves_message() {
        let err = PipelineError::InvalidInput("label grid is 4x4 but image is 8x8".to_string());
        assert_eq!(
            err.to_string(),
            "invalid input: label grid is 4x4 but image is 8x8"
        );
    }

    #[test]
    fn trace_error_display() {
        assert_eq!(
            TraceError::EmptyOutput.to_string(),
            "tracer produced no usable path"
        );
    }
}
