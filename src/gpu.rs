//! wgpu device setup, offscreen render targets and resource accounting.

mod context;
mod ledger;
mod target;

pub use context::GpuContext;
pub use ledger::{ResourceKind, ResourceLedger};
pub use target::{PingPong, RenderTarget, TARGET_FORMAT};
