//! Error types shared across the engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::uniforms::ContractMismatch;

/// Engine errors
#[derive(Error, Debug)]
pub enum ObliqueError {
    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error with the offending path
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Audio source could not be opened or driven
    #[error("Audio source error: {0}")]
    AudioSource(String),

    /// WAV decoding failure
    #[error("Audio decode error: {0}")]
    AudioDecode(#[from] hound::Error),

    /// Uniform contract does not match the shader program
    #[error("Uniform contract violation in module '{module}':\n{}", format_mismatches(.mismatches))]
    Contract {
        module: String,
        mismatches: Vec<ContractMismatch>,
    },

    /// A parameter was assigned a value of the wrong semantic type
    #[error("Parameter '{name}' expects {expected}, got {actual}")]
    ParameterType {
        name: String,
        expected: String,
        actual: String,
    },

    /// A parameter name that the contract does not declare
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    /// `#include` could not be resolved
    #[error("Shader include error: {0}")]
    ShaderInclude(String),

    /// WGSL front end rejected the source
    #[error("Shader parse error in {path}:\n{diagnostics}")]
    ShaderParse { path: String, diagnostics: String },

    /// Driver-side compilation or pipeline creation failed
    #[error("Shader compile error in {path}:\n{diagnostics}")]
    ShaderCompile { path: String, diagnostics: String },

    /// GPU adapter, device or allocation failure
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Presentation surface failure
    #[error("Surface error: {0}")]
    Surface(String),

    /// Display submission failure
    #[error("Display error: {0}")]
    Display(String),

    /// Two frames that must share a resolution do not
    #[error("Frame size mismatch: expected {expected:?}, got {actual:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Module lifecycle violation
    #[error("Module '{module}' cannot {operation} while {state}")]
    InvalidState {
        module: String,
        operation: &'static str,
        state: String,
    },

    /// Patch refers to a module the registry does not know
    #[error("Unknown module '{0}'")]
    UnknownModule(String),

    /// Patch (de)serialisation error
    #[error("Patch error: {0}")]
    Patch(#[from] serde_json::Error),
}

impl ObliqueError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that exclude a single module from composition rather than stopping the engine.
    pub fn is_module_local(&self) -> bool {
        matches!(
            self,
            Self::Contract { .. }
                | Self::ParameterType { .. }
                | Self::UnknownParameter(_)
                | Self::ShaderInclude(_)
                | Self::ShaderParse { .. }
                | Self::ShaderCompile { .. }
                | Self::Gpu(_)
                | Self::InvalidState { .. }
        )
    }
}

fn format_mismatches(mismatches: &[ContractMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| format!("  - {}", m))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, ObliqueError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::UniformType;

    #[test]
    fn test_contract_error_lists_every_mismatch() {
        let err = ObliqueError::Contract {
            module: "echo".to_string(),
            mismatches: vec![
                ContractMismatch::MissingInShader {
                    name: "decay".to_string(),
                },
                ContractMismatch::TypeMismatch {
                    name: "level".to_string(),
                    contract: UniformType::Float,
                    shader: UniformType::Vec2,
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("decay"));
        assert!(text.contains("level"));
        assert!(err.is_module_local());
    }

    #[test]
    fn test_display_errors_are_fatal() {
        assert!(!ObliqueError::Display("lost".into()).is_module_local());
        assert!(!ObliqueError::Surface("outdated".into()).is_module_local());
    }
}
