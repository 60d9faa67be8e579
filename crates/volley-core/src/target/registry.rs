use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::factory::{DynFactory, DynTarget, TypedFactory};
use super::Target;
use crate::domain::VolleyError;

/// Registry of target factories (target type -> factory).
///
/// Built during initialization (mutable), then shared immutably by
/// every worker behind an `Arc`. This avoids locks on the hot path.
#[derive(Default)]
pub struct TargetRegistry {
    factories: HashMap<String, Arc<dyn DynFactory>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a target type. Registering the same `TYPE` twice is
    /// an error rather than a silent overwrite.
    pub fn register<T: Target>(&mut self) -> Result<(), VolleyError> {
        let target_type = T::TYPE.to_string();
        if self.factories.contains_key(&target_type) {
            return Err(VolleyError::DuplicateTarget(target_type));
        }
        self.factories
            .insert(target_type, Arc::new(TypedFactory::<T>::new()));
        Ok(())
    }

    /// Construct an instance of a registered target type.
    pub fn construct(
        &self,
        target_type: &str,
        params: &Map<String, Value>,
    ) -> Result<Box<dyn DynTarget>, VolleyError> {
        let factory = self
            .factories
            .get(target_type)
            .ok_or_else(|| VolleyError::UnknownTarget(target_type.to_string()))?;
        factory.construct(params)
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
