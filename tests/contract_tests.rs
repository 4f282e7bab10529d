//! Uniform contracts checked against real WGSL, without a GPU.

use std::fs;
use std::path::{Path, PathBuf};

use oblique::audio::AudioFeatureFrame;
use oblique::engine::TickTime;
use oblique::module::{ModuleRegistry, ShaderModule, Visual};
use oblique::shader::ShaderLibrary;
use oblique::uniforms::{ContractMismatch, ModuleParameters, UniformContract};
use oblique::{ObliqueError, Result};

fn builtin_library() -> ShaderLibrary {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders");
    ShaderLibrary::new(&root, root.join("vendor"))
}

#[test]
fn test_every_builtin_matches_its_shader() {
    let registry = ModuleRegistry::with_builtins();
    let library = builtin_library();
    for name in registry.names() {
        let visual = registry.create(name, &serde_json::Value::Null).unwrap();
        let mut module = ShaderModule::new(visual);
        if let Err(e) = module.prepare(&library) {
            panic!("built-in '{}' failed validation:\n{}", name, e);
        }
    }
}

#[test]
fn test_demo_patch_modules_validate() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("patches/demo.json");
    let patch = oblique::compositor::Patch::load(&path).unwrap();
    let library = builtin_library();
    for (visual, _) in patch.layers.instantiate(&ModuleRegistry::with_builtins()).unwrap() {
        ShaderModule::new(visual).prepare(&library).unwrap();
    }
}

/// Declares a contract that disagrees with its shader in several ways
struct Mismatched {
    shader: PathBuf,
}

impl Visual for Mismatched {
    fn name(&self) -> &str {
        "mismatched"
    }

    fn shader_path(&self) -> &Path {
        &self.shader
    }

    fn contract(&self) -> UniformContract {
        UniformContract::new()
            .with("level", 0i32)
            .with("speed", 1.0f32)
            .with("tint", glam::Vec3::ONE)
    }

    fn update(&mut self, _: &AudioFeatureFrame, _: &TickTime, _: &mut ModuleParameters) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_contract_failure_lists_every_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("mismatched.wgsl"),
        r#"
struct Params {
    tint: vec3<f32>,
    level: f32,
    extra: vec2<f32>,
}
@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(params.tint * params.level + vec3<f32>(params.extra, 0.0), 1.0);
}
"#,
    )
    .unwrap();
    let library = ShaderLibrary::new(dir.path(), dir.path().join("vendor"));

    let mut module = ShaderModule::new(Box::new(Mismatched {
        shader: PathBuf::from("mismatched.wgsl"),
    }));
    let err = module.prepare(&library).unwrap_err();
    assert!(err.is_module_local());

    let ObliqueError::Contract { module, mismatches } = err else {
        panic!("expected a contract error");
    };
    assert_eq!(module, "mismatched");
    assert_eq!(mismatches.len(), 3, "{:?}", mismatches);
    assert!(mismatches
        .iter()
        .any(|m| matches!(m, ContractMismatch::TypeMismatch { name, .. } if name == "level")));
    assert!(mismatches
        .iter()
        .any(|m| matches!(m, ContractMismatch::MissingInShader { name } if name == "speed")));
    assert!(mismatches
        .iter()
        .any(|m| matches!(m, ContractMismatch::MissingInContract { name, .. } if name == "extra")));
}

#[test]
fn test_shader_error_is_module_local() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.wgsl"), "@fragment fn fs_main( {").unwrap();
    let library = ShaderLibrary::new(dir.path(), dir.path().join("vendor"));

    let mut module = ShaderModule::new(Box::new(Mismatched {
        shader: PathBuf::from("broken.wgsl"),
    }));
    let err = module.prepare(&library).unwrap_err();
    assert!(matches!(err, ObliqueError::ShaderParse { .. }));
    assert!(err.is_module_local());
}
