//! WGSL loading, `#include` expansion and pipeline compilation.

mod preprocess;
mod program;

pub use preprocess::ShaderLibrary;
pub use program::{ParsedShader, ShaderProgram, VERTEX_PRELUDE};
