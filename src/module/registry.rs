//! Name → factory lookup used when loading a patch.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use super::Visual;
use crate::error::{ObliqueError, Result};
use crate::modules::{EchoTrails, Pulse, Spectrum};

/// Builds a visual from its patch `settings` object
pub type VisualFactory = Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn Visual>>>;

pub struct ModuleRegistry {
    factories: BTreeMap<String, VisualFactory>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ModuleRegistry {
    /// Registry with no entries
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in visual
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("pulse", |s| Ok(Box::new(settings::<Pulse>(s)?) as Box<dyn Visual>));
        registry.register("spectrum", |s| Ok(Box::new(settings::<Spectrum>(s)?) as Box<dyn Visual>));
        registry.register("echo_trails", |s| Ok(Box::new(settings::<EchoTrails>(s)?) as Box<dyn Visual>));
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Box<dyn Visual>> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn create(&self, name: &str, settings: &serde_json::Value) -> Result<Box<dyn Visual>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ObliqueError::UnknownModule(name.to_string()))?;
        factory(settings)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// `null` means all defaults; anything else must deserialize as `T`
fn settings<T: DeserializeOwned + Default>(value: &serde_json::Value) -> Result<T> {
    if value.is_null() {
        Ok(T::default())
    } else {
        Ok(serde_json::from_value(value.clone())?)
    }
}
