use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use super::errors::VolleyError;
use super::ids::TaskId;

/// Caller-supplied description of one unit of work.
///
/// `name`, `target`, and `methods` are required and must be non-empty.
/// Any other field is captured into `params` and forwarded verbatim to
/// the target's constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Human-readable label.
    pub name: String,

    /// Registered target type to construct.
    pub target: String,

    /// Methods to invoke on the constructed target, in order.
    pub methods: Vec<String>,

    /// Optional bound on a single method invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Remaining fields, passed through as constructor parameters.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl TaskSpec {
    fn validate(&self) -> Result<(), VolleyError> {
        let task = if self.name.is_empty() {
            "<unnamed>".to_string()
        } else {
            self.name.clone()
        };
        if self.name.is_empty() {
            return Err(VolleyError::MissingField {
                field: "name",
                task,
            });
        }
        if self.target.is_empty() {
            return Err(VolleyError::MissingField {
                field: "target",
                task,
            });
        }
        if self.methods.is_empty() {
            return Err(VolleyError::MissingField {
                field: "methods",
                task,
            });
        }
        Ok(())
    }
}

/// A validated task stamped with its correlation id.
///
/// Built by the runner at staging time, carried through the task
/// channel, and echoed back in the matching [`super::TaskResult`].
/// Exposed as accessors to avoid accidental mutation in flight.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    id: TaskId,
    spec: TaskSpec,
}

impl TaskDefinition {
    /// Validate a spec and assign it a fresh id. Fails fast with a
    /// configuration error naming the offending field and task.
    pub fn new(spec: TaskSpec) -> Result<Self, VolleyError> {
        spec.validate()?;
        Ok(Self {
            id: TaskId::generate(),
            spec,
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn target(&self) -> &str {
        &self.spec.target
    }

    pub fn methods(&self) -> &[String] {
        &self.spec.methods
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.spec.timeout
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.spec.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn spec(name: &str, target: &str, methods: &[&str]) -> TaskSpec {
        TaskSpec {
            name: name.to_string(),
            target: target.to_string(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            timeout: None,
            params: Map::new(),
        }
    }

    #[test]
    fn valid_spec_becomes_a_definition() {
        let def = TaskDefinition::new(spec("car", "valid_car", &["exterior"])).unwrap();
        assert_eq!(def.name(), "car");
        assert_eq!(def.target(), "valid_car");
        assert_eq!(def.methods(), ["exterior".to_string()]);
    }

    #[rstest]
    #[case("", "valid_car", &["exterior"], "name")]
    #[case("car", "", &["exterior"], "target")]
    #[case("car", "valid_car", &[], "methods")]
    fn missing_required_field_is_a_configuration_error(
        #[case] name: &str,
        #[case] target: &str,
        #[case] methods: &[&str],
        #[case] expected: &str,
    ) {
        let err = TaskDefinition::new(spec(name, target, methods)).unwrap_err();
        match err {
            VolleyError::MissingField { field, .. } => assert_eq!(field, expected),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn each_definition_gets_its_own_id() {
        let a = TaskDefinition::new(spec("car", "valid_car", &["exterior"])).unwrap();
        let b = TaskDefinition::new(spec("car", "valid_car", &["exterior"])).unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn extra_fields_flatten_into_params() {
        let spec: TaskSpec = serde_json::from_value(json!({
            "name": "house 1",
            "target": "house",
            "methods": ["foundation", "frame"],
            "style": "cape",
        }))
        .unwrap();
        assert_eq!(spec.params.get("style"), Some(&json!("cape")));
        assert!(spec.timeout.is_none());
    }
}
