//! Ordered binary-blend fold of module outputs.

mod blend;
mod gpu;
mod graph;

pub use blend::{blend_pixel, fold_frames, BlendOp, CpuFrame};
pub use gpu::Compositor;
pub use graph::{CompositionGraph, LayerSpec, Patch};
