//! Shader reflection and two-way contract validation.

use std::fmt;

use naga::{AddressSpace, ArraySize, ImageClass, ImageDimension, ScalarKind, TypeInner, VectorSize};

use super::contract::UniformContract;
use super::types::UniformType;
use crate::error::{ObliqueError, Result};

/// Bind group holding a module's uniforms and textures
pub const MODULE_GROUP: u32 = 0;

/// Byte layout of one member of the uniform block
#[derive(Debug, Clone, PartialEq)]
pub struct MemberLayout {
    pub name: String,
    pub ty: UniformType,
    /// Byte offset inside the block
    pub offset: u32,
    /// Array element stride, or column stride for matrices
    pub stride: u32,
    /// Scalars per array element (4 for `array<vec4<f32>, N>`)
    pub lanes: u32,
}

/// The module's `var<uniform>` struct
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    pub binding: u32,
    /// Struct span in bytes
    pub size: u32,
    pub members: Vec<MemberLayout>,
}

/// A sampled 2D texture binding
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSlot {
    pub name: String,
    pub binding: u32,
}

/// Uniform interface of a parsed shader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderReflection {
    pub block: Option<BlockLayout>,
    pub textures: Vec<TextureSlot>,
    /// Sampler bindings; samplers are supplied by the host
    pub samplers: Vec<u32>,
    /// (name, description) of declarations with no semantic type
    pub unsupported: Vec<(String, String)>,
}

impl ShaderReflection {
    /// Every value and texture uniform as (name, type)
    pub fn uniforms(&self) -> impl Iterator<Item = (&str, UniformType)> {
        let members = self
            .block
            .iter()
            .flat_map(|b| b.members.iter())
            .map(|m| (m.name.as_str(), m.ty));
        let textures = self
            .textures
            .iter()
            .map(|t| (t.name.as_str(), UniformType::Texture));
        members.chain(textures)
    }

    pub fn find(&self, name: &str) -> Option<UniformType> {
        self.uniforms().find(|(n, _)| *n == name).map(|(_, ty)| ty)
    }
}

/// One disagreement between a contract and its shader
#[derive(Debug, Clone, PartialEq)]
pub enum ContractMismatch {
    /// Declared by the contract, absent from the shader
    MissingInShader { name: String },
    /// Declared by the shader, absent from the contract
    MissingInContract { name: String, shader: UniformType },
    TypeMismatch {
        name: String,
        contract: UniformType,
        shader: UniformType,
    },
    /// Shader declaration with no semantic uniform type
    Unsupported { name: String, description: String },
}

impl fmt::Display for ContractMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractMismatch::MissingInShader { name } => {
                write!(f, "'{}' is declared by the module but not by the shader", name)
            }
            ContractMismatch::MissingInContract { name, shader } => write!(
                f,
                "'{}' ({}) is declared by the shader but not by the module",
                name, shader
            ),
            ContractMismatch::TypeMismatch {
                name,
                contract,
                shader,
            } => write!(
                f,
                "'{}' is {} in the module but {} in the shader",
                name, contract, shader
            ),
            ContractMismatch::Unsupported { name, description } => {
                write!(f, "'{}' has unsupported type {}", name, description)
            }
        }
    }
}

/// Collect the uniform interface of a parsed WGSL module
pub fn reflect_shader(module: &naga::Module, path: &str) -> Result<ShaderReflection> {
    let mut reflection = ShaderReflection::default();

    for (_, global) in module.global_variables.iter() {
        let name = global.name.clone().unwrap_or_default();
        let Some(binding) = &global.binding else {
            continue;
        };
        if binding.group != MODULE_GROUP {
            reflection.unsupported.push((
                name,
                format!("binding in group {} (only group {} is bound)", binding.group, MODULE_GROUP),
            ));
            continue;
        }

        let inner = &module.types[global.ty].inner;
        match (global.space, inner) {
            (AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                if reflection.block.is_some() {
                    return Err(ObliqueError::ShaderParse {
                        path: path.to_string(),
                        diagnostics: format!(
                            "uniform block '{}' is the second var<uniform>; declare one struct",
                            name
                        ),
                    });
                }
                let mut layout = BlockLayout {
                    binding: binding.binding,
                    size: *span,
                    members: Vec::with_capacity(members.len()),
                };
                for member in members {
                    let member_name = member.name.clone().unwrap_or_default();
                    match member_layout(module, member.ty) {
                        Ok((ty, stride, lanes)) => layout.members.push(MemberLayout {
                            name: member_name,
                            ty,
                            offset: member.offset,
                            stride,
                            lanes,
                        }),
                        Err(description) => reflection.unsupported.push((member_name, description)),
                    }
                }
                reflection.block = Some(layout);
            }
            (AddressSpace::Uniform, _) => reflection.unsupported.push((
                name,
                "bare var<uniform> (wrap uniforms in a struct)".to_string(),
            )),
            (
                AddressSpace::Handle,
                TypeInner::Image {
                    dim: ImageDimension::D2,
                    arrayed: false,
                    class: ImageClass::Sampled {
                        kind: ScalarKind::Float,
                        multi: false,
                    },
                },
            ) => reflection.textures.push(TextureSlot {
                name,
                binding: binding.binding,
            }),
            (AddressSpace::Handle, TypeInner::Sampler { comparison: false }) => {
                reflection.samplers.push(binding.binding)
            }
            (space, _) => reflection
                .unsupported
                .push((name, format!("{:?} resource", space))),
        }
    }

    Ok(reflection)
}

/// (semantic type, stride, lanes) of a uniform struct member
fn member_layout(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
) -> std::result::Result<(UniformType, u32, u32), String> {
    let inner = &module.types[ty].inner;
    let scalar_only = |kind: ScalarKind, width: u8| -> Option<UniformType> {
        match (kind, width) {
            (ScalarKind::Float, 4) => Some(UniformType::Float),
            (ScalarKind::Sint, 4) => Some(UniformType::Int),
            (ScalarKind::Uint, 4) => Some(UniformType::UInt),
            _ => None,
        }
    };

    let found = match inner {
        TypeInner::Scalar(s) => scalar_only(s.kind, s.width).map(|t| (t, 0, 1)),
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
            match size {
                VectorSize::Bi => Some((UniformType::Vec2, 0, 1)),
                VectorSize::Tri => Some((UniformType::Vec3, 0, 1)),
                VectorSize::Quad => Some((UniformType::Vec4, 0, 1)),
            }
        }
        TypeInner::Matrix {
            columns,
            rows,
            scalar,
        } if scalar.kind == ScalarKind::Float && scalar.width == 4 => match (columns, rows) {
            (VectorSize::Tri, VectorSize::Tri) => Some((UniformType::Mat3, 16, 1)),
            (VectorSize::Quad, VectorSize::Quad) => Some((UniformType::Mat4, 16, 1)),
            _ => None,
        },
        TypeInner::Array {
            base,
            size: ArraySize::Constant(count),
            stride,
        } => {
            let count = count.get() as usize;
            match &module.types[*base].inner {
                TypeInner::Scalar(s) => match scalar_only(s.kind, s.width) {
                    Some(UniformType::Float) => Some((UniformType::FloatArray(count), *stride, 1)),
                    Some(UniformType::Int) => Some((UniformType::IntArray(count), *stride, 1)),
                    _ => None,
                },
                TypeInner::Vector {
                    size: VectorSize::Quad,
                    scalar,
                } if scalar.width == 4 => match scalar.kind {
                    ScalarKind::Float => Some((UniformType::FloatArray(count * 4), *stride, 4)),
                    ScalarKind::Sint => Some((UniformType::IntArray(count * 4), *stride, 4)),
                    _ => None,
                },
                _ => None,
            }
        }
        _ => None,
    };

    found.ok_or_else(|| describe(module, inner))
}

fn describe(module: &naga::Module, inner: &TypeInner) -> String {
    match inner {
        TypeInner::Array { base, .. } => format!("array of {}", describe(module, &module.types[*base].inner)),
        TypeInner::Struct { .. } => "nested struct".to_string(),
        other => format!("{:?}", other),
    }
}

/// Check a contract against a shader in both directions, reporting every mismatch
pub fn validate_contract(
    module_name: &str,
    contract: &UniformContract,
    reflection: &ShaderReflection,
) -> Result<()> {
    let mut mismatches = Vec::new();

    for spec in contract.iter() {
        match reflection.find(&spec.name) {
            None if reflection.unsupported.iter().any(|(n, _)| *n == spec.name) => {}
            None => mismatches.push(ContractMismatch::MissingInShader {
                name: spec.name.clone(),
            }),
            Some(shader) if shader != spec.ty => mismatches.push(ContractMismatch::TypeMismatch {
                name: spec.name.clone(),
                contract: spec.ty,
                shader,
            }),
            Some(_) => {}
        }
    }

    for (name, shader) in reflection.uniforms() {
        if is_padding(name) || contract.get(name).is_some() {
            continue;
        }
        mismatches.push(ContractMismatch::MissingInContract {
            name: name.to_string(),
            shader,
        });
    }

    for (name, description) in &reflection.unsupported {
        if !is_padding(name) {
            mismatches.push(ContractMismatch::Unsupported {
                name: name.clone(),
                description: description.clone(),
            });
        }
    }

    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(ObliqueError::Contract {
            module: module_name.to_string(),
            mismatches,
        })
    }
}

/// Struct members named with a leading underscore only pad the layout
fn is_padding(name: &str) -> bool {
    name.starts_with('_')
}
