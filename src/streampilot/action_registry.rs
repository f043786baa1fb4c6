//! Action declaration and validation.
//!
//! This module defines the static capability set the agent advertises to the
//! model provider on every invocation, and validates the model's action
//! requests before anything touches the network.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator → ActionRegistry → [validate] → RemoteExecutor
//!                              ↘ [describe_all] → ModelProvider
//! ```
//!
//! # Example
//!
//! ```rust
//! use streampilot::action_registry::{ActionParameter, ActionRegistry, ActionSpec, ParameterKind};
//!
//! let mut registry = ActionRegistry::new();
//! registry
//!     .register(
//!         ActionSpec::new("list_topics", "Lists all topic names on the cluster.")
//!     )
//!     .unwrap();
//!
//! let spec = ActionSpec::new("produce_message", "Sends one message to a topic.")
//!     .with_parameter(
//!         ActionParameter::new("topic", ParameterKind::String)
//!             .with_description("The target topic name.")
//!             .required(),
//!     );
//! registry.register(spec).unwrap();
//! assert_eq!(registry.describe_all().len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// The type of an action parameter as advertised to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Integer,
    Boolean,
}

impl ParameterKind {
    /// JSON-schema type name used when rendering the capability set.
    pub fn schema_name(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Integer => "integer",
            ParameterKind::Boolean => "boolean",
        }
    }
}

/// Defines a single parameter of an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub description: Option<String>,
    pub required: bool,
}

impl ActionParameter {
    /// Define a new parameter with the provided name and type.
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            required: false,
        }
    }

    /// Add a human readable description that surfaces in the generated schema.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the parameter as required. Required parameters carry no default.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Static description of an action the model may request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ActionParameter>,
}

impl ActionSpec {
    /// Create a spec with the supplied identifier and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter definition to the spec.
    pub fn with_parameter(mut self, param: ActionParameter) -> Self {
        self.parameters.push(param);
        self
    }
}

/// Arguments that passed validation against an [`ActionSpec`].
///
/// Wraps the raw argument object with typed accessors. Keys the spec does not
/// declare are retained but harmless — extra arguments are ignored by policy,
/// not rejected.
#[derive(Debug, Clone, Default)]
pub struct ValidatedArguments(Map<String, Value>);

impl ValidatedArguments {
    /// Borrow the raw value for a parameter, if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String accessor.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Integer accessor.
    pub fn int_arg(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    /// Boolean accessor.
    pub fn bool_arg(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }
}

/// Error types for registry operations.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// An action with the same name is already registered.
    DuplicateAction(String),
    /// The requested action name is not registered.
    UnknownAction(String),
    /// One or more required parameters are absent from the arguments.
    MissingArguments {
        action: String,
        missing: Vec<String>,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateAction(name) => {
                write!(f, "Action already registered: {}", name)
            }
            RegistryError::UnknownAction(name) => write!(f, "Unknown action: {}", name),
            RegistryError::MissingArguments { action, missing } => write!(
                f,
                "Missing required arguments for '{}': {}",
                action,
                missing.join(", ")
            ),
        }
    }
}

impl Error for RegistryError {}

/// Registry of actions available to the model.
///
/// Specs are kept in registration order because [`describe_all`](ActionRegistry::describe_all)
/// is replayed verbatim to the provider on every invocation; a side index
/// gives O(1) lookup for validation.
#[derive(Default)]
pub struct ActionRegistry {
    specs: Vec<ActionSpec>,
    index: HashMap<String, usize>,
}

impl ActionRegistry {
    /// Build an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a spec, failing if the name is already taken.
    pub fn register(&mut self, spec: ActionSpec) -> Result<(), RegistryError> {
        if self.index.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateAction(spec.name));
        }
        self.index.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// The full capability set, in registration order.
    pub fn describe_all(&self) -> &[ActionSpec] {
        &self.specs
    }

    /// Borrow a spec by name.
    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// Validate model-supplied arguments against the named spec.
    ///
    /// Fails with [`RegistryError::UnknownAction`] for unregistered names and
    /// [`RegistryError::MissingArguments`] listing every absent required
    /// parameter. Unrecognized extra keys pass through untouched.
    pub fn validate(
        &self,
        name: &str,
        arguments: &Value,
    ) -> Result<ValidatedArguments, RegistryError> {
        let spec = self
            .get(name)
            .ok_or_else(|| RegistryError::UnknownAction(name.to_string()))?;

        let provided = match arguments {
            Value::Object(map) => map.clone(),
            // A null or non-object payload carries no arguments at all.
            _ => Map::new(),
        };

        let missing: Vec<String> = spec
            .parameters
            .iter()
            .filter(|p| p.required && !provided.contains_key(&p.name))
            .map(|p| p.name.clone())
            .collect();

        if !missing.is_empty() {
            return Err(RegistryError::MissingArguments {
                action: name.to_string(),
                missing,
            });
        }

        Ok(ValidatedArguments(provided))
    }
}
