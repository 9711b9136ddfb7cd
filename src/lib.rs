//! Offline image-to-coloring-page pipeline.
//!
//! Converts a source photograph into a labeled vector coloring page: the
//! image is thresholded into connected regions (or partitioned by a
//! precomputed label grid), each region gets a mask, a mean color, and a
//! traced silhouette, and everything is composed into one SVG document
//! plus an ordered color table a client paints against.

pub mod artifacts;
pub mod binarize;
pub mod centers;
pub mod compose;
pub mod config;
pub mod error;
pub mod labeling;
pub mod npy;
pub mod outline;
pub mod pipeline;
pub mod regions;
pub mod tracer;

pub use artifacts::{ArtifactLayout, ColorEntry};
pub use config::{LabelSource, PipelineConfig};
pub use error::{PipelineError, TraceError};
pub use pipeline::{run_pipeline, PerfStats, PipelineReport};
pub use tracer::{TraceConfig, Tracer, VtracerBackend};
