//! The target capability layer.
//!
//! A target is the unit of work a task constructs and drives: a type
//! with a configuration struct and named, argument-less operations.
//! Two layers:
//! - **Typed**: the [`Target`] trait, with type-safe config decode
//!   and a compile-time `TYPE` name.
//! - **Dyn**: [`DynTarget`] / [`DynFactory`], object-safe type
//!   erasure so workers can hold any target behind one box.

mod factory;
mod registry;

pub use factory::{DynFactory, DynTarget, TypedFactory};
pub use registry::TargetRegistry;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::VolleyError;

/// A constructible unit of work.
///
/// # Example
/// ```ignore
/// #[derive(Deserialize)]
/// struct HouseConfig { style: String }
///
/// struct House { style: String }
///
/// #[async_trait]
/// impl Target for House {
///     const TYPE: &'static str = "house";
///     type Config = HouseConfig;
///
///     fn build(config: Self::Config) -> Result<Self, VolleyError> {
///         Ok(Self { style: config.style })
///     }
///
///     async fn invoke(&mut self, method: &str) -> Result<Value, VolleyError> {
///         match method {
///             "foundation" => Ok(Value::Null),
///             _ => Err(VolleyError::UnknownMethod {
///                 target: Self::TYPE.to_string(),
///                 method: method.to_string(),
///             }),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Target: Send + 'static {
    /// Name tasks use to select this target.
    const TYPE: &'static str;

    /// Constructor parameters, decoded from the task's extra fields.
    type Config: DeserializeOwned + Send;

    fn build(config: Self::Config) -> Result<Self, VolleyError>
    where
        Self: Sized;

    /// Invoke one named operation. Unknown names should return
    /// [`VolleyError::UnknownMethod`]; the engine records it as an
    /// ordinary method failure.
    async fn invoke(&mut self, method: &str) -> Result<Value, VolleyError>;
}
