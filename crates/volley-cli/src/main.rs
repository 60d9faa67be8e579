//! Demo driver: build five houses concurrently and print the results.

use std::process::ExitCode;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;

use volley_core::{
    ExecuteOptions, RunStatus, Runner, Target, TargetRegistry, TaskSpec, VolleyError,
};

#[derive(Debug, Deserialize)]
struct HouseConfig {
    style: String,
}

/// Build a house in stages.
struct House {
    style: String,
}

#[async_trait]
impl Target for House {
    const TYPE: &'static str = "house";
    type Config = HouseConfig;

    fn build(config: Self::Config) -> Result<Self, VolleyError> {
        Ok(Self {
            style: config.style,
        })
    }

    async fn invoke(&mut self, method: &str) -> Result<Value, VolleyError> {
        match method {
            "foundation" => info!("building the foundation for the {} house..", self.style),
            "frame" => info!("framing the {} house..", self.style),
            "roof" => info!("roofing the {} house..", self.style),
            "furnish" => info!("furnishing the {} house..", self.style),
            "post_build_tasks" => info!("post build tasks for the {} house..", self.style),
            "enjoy" => info!("enjoy your new {} house :)", self.style),
            _ => {
                return Err(VolleyError::UnknownMethod {
                    target: Self::TYPE.to_string(),
                    method: method.to_string(),
                });
            }
        }
        sleep(Duration::from_millis(200)).await;
        Ok(json!({ "style": self.style, "stage": method }))
    }
}

fn house(name: &str, style: &str) -> TaskSpec {
    let mut params = serde_json::Map::new();
    params.insert("style".to_string(), json!(style));
    TaskSpec {
        name: name.to_string(),
        target: House::TYPE.to_string(),
        methods: [
            "foundation",
            "frame",
            "roof",
            "furnish",
            "post_build_tasks",
            "enjoy",
        ]
        .iter()
        .map(|m| m.to_string())
        .collect(),
        timeout: Some(Duration::from_secs(5)),
        params,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut registry = TargetRegistry::new();
    registry.register::<House>().expect("fresh registry");
    let runner = Runner::new(registry);

    let tasks = vec![
        house("house 1", "contemporary"),
        house("house 2", "cape"),
        house("house 3", "colonial"),
        house("house 4", "ranch"),
        house("house 5", "split"),
    ];

    let results = match runner.execute(tasks, ExecuteOptions::default()).await {
        Ok(results) => results,
        Err(err) => {
            eprintln!("run failed to execute: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&results).expect("results serialize")
    );
    match results.analyze() {
        RunStatus::Pass => ExitCode::SUCCESS,
        RunStatus::Fail => ExitCode::FAILURE,
    }
}
