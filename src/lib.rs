//! Oblique - real-time audio-reactive shader synthesiser
//!
//! Audio is analysed into one feature frame per tick, every module of a
//! patch turns that frame into uniforms and renders a fullscreen pass, and
//! the compositor folds the module outputs into the displayed frame with an
//! ordered list of blend operations.

pub mod audio;
pub mod compositor;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod logging;
pub mod module;
pub mod modules;
pub mod params;
pub mod shader;
pub mod uniforms;

pub use error::{ObliqueError, Result};
