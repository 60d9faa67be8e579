//! Test targets shared by the engine and registry tests.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;

use crate::domain::{TaskSpec, VolleyError};
use crate::target::{Target, TargetRegistry};

#[derive(Debug, Deserialize)]
pub(crate) struct CarConfig {
    #[serde(default)]
    pub(crate) color: Option<String>,
}

/// Builds without complaint; every known method succeeds.
pub(crate) struct ValidCar {
    color: Option<String>,
}

#[async_trait]
impl Target for ValidCar {
    const TYPE: &'static str = "valid_car";
    type Config = CarConfig;

    fn build(config: Self::Config) -> Result<Self, VolleyError> {
        Ok(Self {
            color: config.color,
        })
    }

    async fn invoke(&mut self, method: &str) -> Result<Value, VolleyError> {
        match method {
            "exterior" => Ok(json!({ "painted": self.color })),
            "interior" => Ok(json!("leather")),
            _ => Err(VolleyError::UnknownMethod {
                target: Self::TYPE.to_string(),
                method: method.to_string(),
            }),
        }
    }
}

/// The exterior goes fine; the interior blows up.
pub(crate) struct InvalidCar;

#[async_trait]
impl Target for InvalidCar {
    const TYPE: &'static str = "invalid_car";
    type Config = CarConfig;

    fn build(_config: Self::Config) -> Result<Self, VolleyError> {
        Ok(Self)
    }

    async fn invoke(&mut self, method: &str) -> Result<Value, VolleyError> {
        match method {
            "exterior" => Ok(json!("primed")),
            "interior" => Err(VolleyError::Method("no seats in stock".to_string())),
            _ => Err(VolleyError::UnknownMethod {
                target: Self::TYPE.to_string(),
                method: method.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlowCarConfig {
    pub(crate) delay_ms: u64,
}

/// Sleeps on every method; used for timeout and interrupt tests.
pub(crate) struct SlowCar {
    delay: Duration,
}

#[async_trait]
impl Target for SlowCar {
    const TYPE: &'static str = "slow_car";
    type Config = SlowCarConfig;

    fn build(config: Self::Config) -> Result<Self, VolleyError> {
        Ok(Self {
            delay: Duration::from_millis(config.delay_ms),
        })
    }

    async fn invoke(&mut self, _method: &str) -> Result<Value, VolleyError> {
        tokio::time::sleep(self.delay).await;
        Ok(Value::Null)
    }
}

pub(crate) fn registry() -> TargetRegistry {
    let mut registry = TargetRegistry::new();
    registry.register::<ValidCar>().unwrap();
    registry.register::<InvalidCar>().unwrap();
    registry.register::<SlowCar>().unwrap();
    registry
}

pub(crate) fn spec(name: &str, target: &str, methods: &[&str]) -> TaskSpec {
    TaskSpec {
        name: name.to_string(),
        target: target.to_string(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
        timeout: None,
        params: Map::new(),
    }
}
