use async_trait::async_trait;
use serde_json::{Map, Value};
use std::marker::PhantomData;

use super::Target;
use crate::domain::VolleyError;

/// Object-safe face of a constructed target. Workers drive tasks
/// through this, one boxed instance per task.
#[async_trait]
pub trait DynTarget: Send {
    async fn invoke(&mut self, method: &str) -> Result<Value, VolleyError>;
}

impl std::fmt::Debug for dyn DynTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DynTarget")
    }
}

#[async_trait]
impl<T: Target> DynTarget for T {
    async fn invoke(&mut self, method: &str) -> Result<Value, VolleyError> {
        Target::invoke(self, method).await
    }
}

/// Object-safe constructor for a target type.
pub trait DynFactory: Send + Sync {
    fn target_type(&self) -> &'static str;

    /// Decode the task's pass-through params and build an instance.
    fn construct(&self, params: &Map<String, Value>) -> Result<Box<dyn DynTarget>, VolleyError>;
}

/// Bridges a typed [`Target`] into a [`DynFactory`]: decodes the
/// flattened params into `T::Config`, then builds.
pub struct TypedFactory<T: Target> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Target> TypedFactory<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Target> Default for TypedFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Target> DynFactory for TypedFactory<T> {
    fn target_type(&self) -> &'static str {
        T::TYPE
    }

    fn construct(&self, params: &Map<String, Value>) -> Result<Box<dyn DynTarget>, VolleyError> {
        let config: T::Config = serde_json::from_value(Value::Object(params.clone())).map_err(
            |source| VolleyError::InvalidParams {
                target: T::TYPE.to_string(),
                source,
            },
        )?;
        Ok(Box::new(T::build(config)?))
    }
}
