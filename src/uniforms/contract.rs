//! Uniform contracts and per-tick parameter instances.

use std::sync::Arc;

use super::types::{UniformType, UniformValue};
use crate::error::{ObliqueError, Result};

/// One declared uniform
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSpec {
    pub name: String,
    pub ty: UniformType,
    pub default: UniformValue,
}

/// Ordered, immutable mapping from uniform name to (type, default).
///
/// Built once per module definition; the type of each entry is the type of
/// its default value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformContract {
    entries: Vec<UniformSpec>,
}

impl UniformContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` with `default`; redeclaring a name replaces it in place
    pub fn with(mut self, name: &str, default: impl Into<UniformValue>) -> Self {
        let default = default.into();
        let spec = UniformSpec {
            name: name.to_string(),
            ty: default.uniform_type(),
            default,
        };
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => *existing = spec,
            None => self.entries.push(spec),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&UniformSpec> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UniformSpec> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh parameter set holding every default
    pub fn parameters(self: &Arc<Self>) -> ModuleParameters {
        ModuleParameters {
            contract: Arc::clone(self),
            values: self.entries.iter().map(|e| e.default.clone()).collect(),
        }
    }
}

/// Concrete values for one tick, positionally aligned with the contract
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleParameters {
    contract: Arc<UniformContract>,
    values: Vec<UniformValue>,
}

impl ModuleParameters {
    /// Assign a value, rejecting names the contract lacks and values of the wrong type
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> Result<()> {
        let value = value.into();
        let index = self
            .contract
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| ObliqueError::UnknownParameter(name.to_string()))?;
        let spec = &self.contract.entries[index];
        if !spec.ty.accepts(&value) {
            return Err(ObliqueError::ParameterType {
                name: name.to_string(),
                expected: spec.ty.to_string(),
                actual: value.uniform_type().to_string(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.contract
            .entries
            .iter()
            .position(|e| e.name == name)
            .map(|i| &self.values[i])
    }

    /// (spec, value) pairs in contract order
    pub fn iter(&self) -> impl Iterator<Item = (&UniformSpec, &UniformValue)> {
        self.contract.entries.iter().zip(self.values.iter())
    }

    pub fn contract(&self) -> &UniformContract {
        &self.contract
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::TextureBinding;
    use glam::Vec3;

    fn contract() -> Arc<UniformContract> {
        Arc::new(
            UniformContract::new()
                .with("time", 0.0f32)
                .with("tint", Vec3::ONE)
                .with("bands", vec![0.0f32; 8])
                .with("previous_frame", TextureBinding::PreviousFrame),
        )
    }

    #[test]
    fn test_parameters_start_from_defaults() {
        let params = contract().parameters();
        assert_eq!(params.get("tint"), Some(&UniformValue::Vec3(Vec3::ONE)));
        assert_eq!(params.iter().count(), 4);
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let mut params = contract().parameters();
        let err = params.set("time", 1i32).unwrap_err();
        assert!(matches!(err, ObliqueError::ParameterType { .. }));
        assert_eq!(params.get("time"), Some(&UniformValue::Float(0.0)));
    }

    #[test]
    fn test_set_rejects_unknown_name() {
        let mut params = contract().parameters();
        assert!(matches!(
            params.set("speed", 1.0f32),
            Err(ObliqueError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_each_instance_is_independent() {
        let contract = contract();
        let mut first = contract.parameters();
        first.set("time", 3.0f32).unwrap();
        let second = contract.parameters();
        assert_eq!(second.get("time"), Some(&UniformValue::Float(0.0)));
    }

    #[test]
    fn test_redeclaring_replaces_entry() {
        let contract = UniformContract::new()
            .with("level", 0.0f32)
            .with("level", 1i32);
        assert_eq!(contract.len(), 1);
        assert_eq!(contract.get("level").unwrap().ty, UniformType::Int);
    }
}
