use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::File;
use crate::error::{Error, Result};
use crate::validate::ValidatedDesign;

/// Signature of a generation target: a pure function of the validated design.
pub type TargetFn = fn(&ValidatedDesign) -> Result<Vec<File>>;

/// A target submitted to the link-time inventory, usually by
/// `#[design_kit::target]`.
pub struct TargetRegistration {
    pub name: &'static str,
    pub description: &'static str,
    pub generate: TargetFn,
}

impl TargetRegistration {
    pub const fn new(name: &'static str, description: &'static str, generate: TargetFn) -> Self {
        Self {
            name,
            description,
            generate,
        }
    }
}

inventory::collect!(TargetRegistration);

type Generator = dyn Fn(&ValidatedDesign) -> Result<Vec<File>> + Send + Sync;

#[derive(Clone)]
pub struct Target {
    name: String,
    description: String,
    generate: Arc<Generator>,
}

impl Target {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn files(&self, design: &ValidatedDesign) -> Result<Vec<File>> {
        (self.generate)(design)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Named generation targets, iterated in name order.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, Target>,
}

impl TargetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The targets shipped with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, description, generate) in crate::targets::BUILTIN {
            registry.targets.insert(
                name.to_string(),
                Target {
                    name: name.to_string(),
                    description: description.to_string(),
                    generate: Arc::new(*generate),
                },
            );
        }
        registry
    }

    /// Built-in targets plus every target linked into the binary through
    /// the inventory.
    pub fn discover() -> Result<Self> {
        let mut registry = Self::builtin();
        for registration in inventory::iter::<TargetRegistration> {
            debug!(target_name = registration.name, "discovered target");
            registry.register(registration.name, registration.description, registration.generate)?;
        }
        Ok(registry)
    }

    /// Adds a target. Names are unique within a registry.
    pub fn register<F>(&mut self, name: &str, description: &str, generate: F) -> Result<&mut Self>
    where
        F: Fn(&ValidatedDesign) -> Result<Vec<File>> + Send + Sync + 'static,
    {
        if self.targets.contains_key(name) {
            return Err(Error::DuplicateTarget(name.to_string()));
        }
        self.targets.insert(
            name.to_string(),
            Target {
                name: name.to_string(),
                description: description.to_string(),
                generate: Arc::new(generate),
            },
        );
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
