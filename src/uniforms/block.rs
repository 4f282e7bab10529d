//! Packing parameters into the shader's uniform buffer layout.

use std::collections::HashSet;

use tracing::warn;

use super::contract::ModuleParameters;
use super::reflect::{BlockLayout, MemberLayout};
use super::types::{UniformType, UniformValue};

/// Host-side image of a module's uniform buffer.
///
/// Each [`write`](Self::write) clears the whole block and writes every
/// parameter again, so nothing from a previous tick can survive.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    module: String,
    layout: BlockLayout,
    bytes: Vec<u8>,
    truncation_warned: HashSet<String>,
}

impl UniformBlock {
    pub fn new(module: &str, layout: BlockLayout) -> Self {
        // uniform buffers are bound in 16-byte units
        let size = (layout.size as usize).max(16).next_multiple_of(16);
        Self {
            module: module.to_string(),
            layout,
            bytes: vec![0; size],
            truncation_warned: HashSet::new(),
        }
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Pack every parameter; returns the bytes to upload
    pub fn write(&mut self, params: &ModuleParameters) -> &[u8] {
        self.bytes.fill(0);
        for (spec, value) in params.iter() {
            let Some(member) = self.layout.members.iter().find(|m| m.name == spec.name) else {
                continue;
            };
            let truncated = pack(&mut self.bytes, member, value);
            if truncated && self.truncation_warned.insert(spec.name.clone()) {
                warn!(
                    "Module '{}': '{}' holds more values than its capacity of {}; extra values dropped",
                    self.module, spec.name, member.ty
                );
            }
        }
        &self.bytes
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Write one value at its member location; returns true if elements were dropped
fn pack(bytes: &mut [u8], member: &MemberLayout, value: &UniformValue) -> bool {
    let offset = member.offset as usize;
    match value {
        UniformValue::Float(v) => put(bytes, offset, bytemuck::bytes_of(v)),
        UniformValue::Int(v) => put(bytes, offset, bytemuck::bytes_of(v)),
        UniformValue::UInt(v) => put(bytes, offset, bytemuck::bytes_of(v)),
        UniformValue::Vec2(v) => put(bytes, offset, bytemuck::cast_slice(&v.to_array())),
        UniformValue::Vec3(v) => put(bytes, offset, bytemuck::cast_slice(&v.to_array())),
        UniformValue::Vec4(v) => put(bytes, offset, bytemuck::cast_slice(&v.to_array())),
        UniformValue::Mat3(m) => {
            // each column is padded to vec4
            for c in 0..3 {
                let column = m.col(c).to_array();
                put(
                    bytes,
                    offset + c * member.stride as usize,
                    bytemuck::cast_slice(&column),
                );
            }
        }
        UniformValue::Mat4(m) => put(bytes, offset, bytemuck::cast_slice(&m.to_cols_array())),
        UniformValue::FloatArray(values) => return pack_array(bytes, member, values),
        UniformValue::IntArray(values) => return pack_array(bytes, member, values),
        UniformValue::Texture(_) => {}
    }
    false
}

fn pack_array<T: bytemuck::Pod>(bytes: &mut [u8], member: &MemberLayout, values: &[T]) -> bool {
    let capacity = match member.ty {
        UniformType::FloatArray(n) | UniformType::IntArray(n) => n,
        _ => 0,
    };
    let lanes = member.lanes.max(1) as usize;
    for (i, v) in values.iter().take(capacity).enumerate() {
        let offset = member.offset as usize
            + (i / lanes) * member.stride as usize
            + (i % lanes) * std::mem::size_of::<T>();
        put(bytes, offset, bytemuck::bytes_of(v));
    }
    values.len() > capacity
}

fn put(bytes: &mut [u8], offset: usize, data: &[u8]) {
    if let Some(slot) = bytes.get_mut(offset..offset + data.len()) {
        slot.copy_from_slice(data);
    }
}
