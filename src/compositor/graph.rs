//! Composition graph and the declarative patch file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::blend::{fold_frames, BlendOp, CpuFrame};
use crate::error::{ObliqueError, Result};
use crate::module::{ModuleRegistry, Visual};
use crate::params::AnalysisConfig;

/// One layer: which module to instantiate and how it blends onto the layers below
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub module: String,
    pub op: BlendOp,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub settings: serde_json::Value,
}

impl LayerSpec {
    pub fn new(module: &str, op: BlendOp) -> Self {
        Self {
            module: module.to_string(),
            op,
            settings: serde_json::Value::Null,
        }
    }

    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }
}

/// Ordered layers; the fold runs in exactly this order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositionGraph {
    layers: Vec<LayerSpec>,
}

impl CompositionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, layer: LayerSpec) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn ops(&self) -> impl Iterator<Item = BlendOp> + '_ {
        self.layers.iter().map(|layer| layer.op)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// CPU fold of one static frame per layer
    pub fn fold(&self, frames: &[CpuFrame]) -> Result<CpuFrame> {
        if frames.len() != self.layers.len() {
            return Err(ObliqueError::Config(format!(
                "graph has {} layers but {} frames were given",
                self.layers.len(),
                frames.len()
            )));
        }
        let (width, height) = frames.first().map(CpuFrame::size).unwrap_or((1, 1));
        let layers: Vec<_> = frames.iter().zip(self.ops()).collect();
        fold_frames(width, height, &layers)
    }

    /// Build every layer's visual. An unknown name fails the whole graph.
    pub fn instantiate(&self, registry: &ModuleRegistry) -> Result<Vec<(Box<dyn Visual>, BlendOp)>> {
        self.layers
            .iter()
            .map(|layer| Ok((registry.create(&layer.module, &layer.settings)?, layer.op)))
            .collect()
    }
}

/// A patch file: `{ name, analysis?, layers: [{ module, op, settings? }] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub name: String,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub layers: CompositionGraph,
}

impl Patch {
    pub fn new(name: &str, layers: CompositionGraph) -> Self {
        Self {
            name: name.to_string(),
            analysis: AnalysisConfig::default(),
            layers,
        }
    }

    /// The patch used when none is given on the command line
    pub fn single(module: &str) -> Self {
        Self::new(
            module,
            CompositionGraph::new().push(LayerSpec::new(module, BlendOp::PassthroughTop)),
        )
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let patch: Patch = serde_json::from_str(text)?;
        patch.analysis.validate().map_err(ObliqueError::Config)?;
        Ok(patch)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ObliqueError::io(path, e))?;
        let patch = Self::from_json(&text)?;
        info!(
            "Loaded patch '{}' from {} ({} layers)",
            patch.name,
            path.display(),
            patch.layers.len()
        );
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEMO: &str = r#"{
        "name": "demo",
        "layers": [
            { "module": "pulse", "op": "passthrough_top" },
            { "module": "echo_trails", "op": "screen", "settings": { "ring_count": 4 } },
            { "module": "spectrum", "op": "subtract" }
        ]
    }"#;

    #[test]
    fn test_parse_preserves_declaration_order() {
        let patch = Patch::from_json(DEMO).unwrap();
        let ops: Vec<_> = patch.layers.ops().collect();
        assert_eq!(
            ops,
            vec![BlendOp::PassthroughTop, BlendOp::Screen, BlendOp::Subtract]
        );
        assert_eq!(patch.layers.layers()[1].settings, json!({ "ring_count": 4 }));
        assert_eq!(patch.analysis, AnalysisConfig::default());
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let text = r#"{ "name": "x", "layers": [{ "module": "pulse", "op": "smear" }] }"#;
        assert!(matches!(Patch::from_json(text), Err(ObliqueError::Patch(_))));
    }

    #[test]
    fn test_invalid_analysis_is_rejected() {
        let text = r#"{ "name": "x", "analysis": { "fft_size": 1000 }, "layers": [] }"#;
        assert!(matches!(Patch::from_json(text), Err(ObliqueError::Config(_))));
    }

    #[test]
    fn test_instantiate_unknown_module_fails() {
        let graph = CompositionGraph::new().push(LayerSpec::new("nebula", BlendOp::Add));
        let result = graph.instantiate(&ModuleRegistry::with_builtins());
        assert!(matches!(result, Err(ObliqueError::UnknownModule(_))));
    }

    #[test]
    fn test_instantiate_builds_in_order() {
        let patch = Patch::from_json(DEMO).unwrap();
        let visuals = patch.layers.instantiate(&ModuleRegistry::with_builtins()).unwrap();
        let names: Vec<_> = visuals.iter().map(|(v, _)| v.name().to_string()).collect();
        assert_eq!(names, vec!["pulse", "echo_trails", "spectrum"]);
    }

    #[test]
    fn test_fold_requires_one_frame_per_layer() {
        let graph = CompositionGraph::new().push(LayerSpec::new("pulse", BlendOp::Add));
        assert!(graph.fold(&[]).is_err());
    }
}
