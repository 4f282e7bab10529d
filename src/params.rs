//! Parameter definitions with physical units and documented semantics.
//!
//! Every tunable constant of the pipeline lives here with:
//! - Physical units (seconds, Hz, pixels, decibels)
//! - Documented ranges and meanings
//! - A `validate()` that rejects configurations the pipeline cannot honour

mod audio;
mod engine;
mod recording;

pub use audio::{AnalysisConfig, BandNormalization};
pub use engine::EngineConfig;
pub use recording::RecordingConfig;
