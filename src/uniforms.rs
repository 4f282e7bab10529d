//! Typed uniform contracts between host parameters and shader programs.
//!
//! A module declares a [`UniformContract`] (name → type + default). At
//! registration the contract is checked in both directions against the
//! uniforms reflected from the compiled shader; every tick a fresh
//! [`ModuleParameters`] is filled in and packed, in full, into the
//! module's [`UniformBlock`].

mod block;
mod contract;
mod reflect;
mod types;

pub use block::UniformBlock;
pub use contract::{ModuleParameters, UniformContract, UniformSpec};
pub use reflect::{
    reflect_shader, validate_contract, BlockLayout, ContractMismatch, MemberLayout,
    ShaderReflection, TextureSlot,
};
pub use types::{TextureBinding, UniformType, UniformValue};
