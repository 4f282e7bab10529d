//! Parsing, reflection and pipeline creation for fullscreen fragment programs.

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::{ObliqueError, Result};
use crate::gpu::{GpuContext, ResourceKind, ResourceLedger};
use crate::uniforms::{reflect_shader, ShaderReflection};

/// Fullscreen-triangle vertex stage prepended to every fragment program.
/// Fragment entry points take `VertexOutput` and write `@location(0)`.
pub const VERTEX_PRELUDE: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let corner = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(corner * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(corner.x, 1.0 - corner.y);
    return out;
}
"#;

/// CPU-side result of loading a program: parsed, validated and reflected
#[derive(Debug)]
pub struct ParsedShader {
    pub path: String,
    pub source: String,
    pub module: naga::Module,
    pub reflection: ShaderReflection,
}

impl ParsedShader {
    /// Prepend the vertex prelude, parse and validate the WGSL, and reflect its uniforms
    pub fn parse(path: &str, fragment_source: &str) -> Result<Self> {
        let source = format!("{}\n{}", VERTEX_PRELUDE, fragment_source);
        let module =
            naga::front::wgsl::parse_str(&source).map_err(|e| ObliqueError::ShaderParse {
                path: path.to_string(),
                diagnostics: e.emit_to_string(&source),
            })?;

        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .map_err(|e| ObliqueError::ShaderCompile {
                path: path.to_string(),
                diagnostics: e.emit_to_string(&source),
            })?;

        if !module.entry_points.iter().any(|e| e.name == "fs_main") {
            return Err(ObliqueError::ShaderCompile {
                path: path.to_string(),
                diagnostics: "missing @fragment entry point 'fs_main'".to_string(),
            });
        }

        let reflection = reflect_shader(&module, path)?;
        Ok(Self {
            path: path.to_string(),
            source,
            module,
            reflection,
        })
    }
}

/// Compiled render pipeline plus its reflected bind group layout
pub struct ShaderProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl ShaderProgram {
    /// Compile under error scopes so driver-side failures surface as errors
    pub fn compile(
        gpu: &GpuContext,
        ledger: &ResourceLedger,
        parsed: &ParsedShader,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let device = &gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&parsed.path),
            source: wgpu::ShaderSource::Wgsl(parsed.source.as_str().into()),
        });

        let entries = layout_entries(&parsed.reflection);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&parsed.path),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&parsed.path),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&parsed.path),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(err) = validation {
            return Err(ObliqueError::ShaderCompile {
                path: parsed.path.clone(),
                diagnostics: err.to_string(),
            });
        }
        if let Some(err) = out_of_memory {
            return Err(ObliqueError::Gpu(format!(
                "{}: pipeline allocation failed: {}",
                parsed.path, err
            )));
        }

        ledger.acquire(ResourceKind::ShaderProgram);
        Ok(Self {
            label: parsed.path.clone(),
            pipeline,
            bind_group_layout,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Drop the pipeline and record the release
    pub fn release(self, ledger: &ResourceLedger) {
        ledger.release(ResourceKind::ShaderProgram);
    }
}

fn layout_entries(reflection: &ShaderReflection) -> Vec<wgpu::BindGroupLayoutEntry> {
    let uniform = reflection.block.iter().map(|block| wgpu::BindGroupLayoutEntry {
        binding: block.binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });
    let textures = reflection.textures.iter().map(|slot| wgpu::BindGroupLayoutEntry {
        binding: slot.binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    });
    let samplers = reflection.samplers.iter().map(|&binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });
    uniform.chain(textures).chain(samplers).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_provides_vertex_stage() {
        let parsed = ParsedShader::parse(
            "solid.wgsl",
            "@fragment\nfn fs_main(in: VertexOutput) -> @location(0) vec4<f32> { return vec4<f32>(in.uv, 0.0, 1.0); }\n",
        )
        .unwrap();
        let stages: Vec<_> = parsed.module.entry_points.iter().map(|e| e.stage).collect();
        assert!(stages.contains(&naga::ShaderStage::Vertex));
        assert!(stages.contains(&naga::ShaderStage::Fragment));
        assert!(parsed.reflection.block.is_none());
    }

    #[test]
    fn test_parse_error_carries_diagnostics() {
        let err = ParsedShader::parse("broken.wgsl", "@fragment fn fs_main( -> {").unwrap_err();
        let ObliqueError::ShaderParse { path, diagnostics } = err else {
            panic!("expected parse error");
        };
        assert_eq!(path, "broken.wgsl");
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn test_type_error_is_a_compile_error() {
        let err = ParsedShader::parse(
            "typed.wgsl",
            "@fragment\nfn fs_main(in: VertexOutput) -> @location(0) vec4<f32> { let x: f32 = 1.0; return x; }\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ObliqueError::ShaderCompile { .. } | ObliqueError::ShaderParse { .. }
        ));
    }

    #[test]
    fn test_missing_fragment_entry() {
        let err = ParsedShader::parse("empty.wgsl", "fn helper() -> f32 { return 1.0; }\n").unwrap_err();
        assert!(matches!(err, ObliqueError::ShaderCompile { .. }));
    }
}
