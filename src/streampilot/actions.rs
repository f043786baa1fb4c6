//! The built-in capability set for the cluster management API.
//!
//! Registry specs and executor bindings are built side by side in this one
//! module so the schema the model sees and the dispatch table the executor
//! uses cannot drift apart.

use crate::streampilot::action_registry::{
    ActionParameter, ActionRegistry, ActionSpec, ParameterKind, RegistryError, ValidatedArguments,
};
use crate::streampilot::executor::{ActionBinding, RemoteExecutor};
use serde_json::{json, Map, Value};

/// Build the default registry advertised to the model.
pub fn default_registry() -> Result<ActionRegistry, RegistryError> {
    let mut registry = ActionRegistry::new();

    registry.register(ActionSpec::new(
        "check_health",
        "Checks the operational status of the cluster management server.",
    ))?;

    registry.register(ActionSpec::new(
        "list_topics",
        "Retrieves a list of all topic names from the connected cluster.",
    ))?;

    registry.register(
        ActionSpec::new("produce_message", "Sends one message to the specified topic.")
            .with_parameter(
                ActionParameter::new("topic", ParameterKind::String)
                    .with_description("The target topic name.")
                    .required(),
            )
            .with_parameter(
                ActionParameter::new("value", ParameterKind::String)
                    .with_description("The message content (value).")
                    .required(),
            )
            .with_parameter(
                ActionParameter::new("key", ParameterKind::String)
                    .with_description("Optional message key."),
            ),
    )?;

    registry.register(
        ActionSpec::new("create_topic", "Creates a new topic on the cluster.")
            .with_parameter(
                ActionParameter::new("topicName", ParameterKind::String)
                    .with_description("Desired name for the new topic.")
                    .required(),
            )
            .with_parameter(
                ActionParameter::new("partitions", ParameterKind::Integer)
                    .with_description("Number of partitions (default: 1)."),
            )
            .with_parameter(
                ActionParameter::new("replicas", ParameterKind::Integer)
                    .with_description("Replication factor (default: 1)."),
            ),
    )?;

    Ok(registry)
}

/// Install the HTTP bindings matching [`default_registry`].
pub fn bind_all(executor: &mut RemoteExecutor) {
    executor.bind("check_health", ActionBinding::get("/health"));
    executor.bind("list_topics", ActionBinding::get("/api/topics"));
    executor.bind("produce_message", ActionBinding::post("/api/produce", shape_produce));
    executor.bind("create_topic", ActionBinding::post("/api/topics", shape_create_topic));
}

fn shape_produce(args: &ValidatedArguments) -> Value {
    let mut message = Map::new();
    if let Some(key) = args.str_arg("key") {
        message.insert("key".to_string(), json!(key));
    }
    message.insert("value".to_string(), json!(args.str_arg("value").unwrap_or("")));

    json!({
        "topic": args.str_arg("topic").unwrap_or(""),
        "messages": [Value::Object(message)],
    })
}

fn shape_create_topic(args: &ValidatedArguments) -> Value {
    let mut payload = Map::new();
    payload.insert(
        "topicName".to_string(),
        json!(args.str_arg("topicName").unwrap_or("")),
    );
    if let Some(partitions) = args.int_arg("partitions") {
        payload.insert("partitions".to_string(), json!(partitions));
    }
    if let Some(replicas) = args.int_arg("replicas") {
        payload.insert("replicas".to_string(), json!(replicas));
    }
    Value::Object(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated(registry: &ActionRegistry, name: &str, args: Value) -> ValidatedArguments {
        registry.validate(name, &args).unwrap()
    }

    #[test]
    fn test_default_registry_has_reference_actions() {
        let registry = default_registry().unwrap();
        let names: Vec<&str> = registry
            .describe_all()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["check_health", "list_topics", "produce_message", "create_topic"]
        );
    }

    #[test]
    fn test_shape_produce_with_key() {
        let registry = default_registry().unwrap();
        let args = validated(
            &registry,
            "produce_message",
            json!({ "topic": "orders", "value": "v1", "key": "k1" }),
        );
        assert_eq!(
            shape_produce(&args),
            json!({ "topic": "orders", "messages": [{ "key": "k1", "value": "v1" }] })
        );
    }

    #[test]
    fn test_shape_produce_omits_absent_key() {
        let registry = default_registry().unwrap();
        let args = validated(
            &registry,
            "produce_message",
            json!({ "topic": "orders", "value": "v1" }),
        );
        assert_eq!(
            shape_produce(&args),
            json!({ "topic": "orders", "messages": [{ "value": "v1" }] })
        );
    }

    #[test]
    fn test_shape_create_topic_optional_fields() {
        let registry = default_registry().unwrap();

        let bare = validated(&registry, "create_topic", json!({ "topicName": "t1" }));
        assert_eq!(shape_create_topic(&bare), json!({ "topicName": "t1" }));

        let full = validated(
            &registry,
            "create_topic",
            json!({ "topicName": "t1", "partitions": 3, "replicas": 2 }),
        );
        assert_eq!(
            shape_create_topic(&full),
            json!({ "topicName": "t1", "partitions": 3, "replicas": 2 })
        );
    }
}
