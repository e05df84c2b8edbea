//! Validator registry: one bound validator per (entity, operation).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use campus_core::Record;

use crate::model::FieldModels;
use crate::rule::RuleSet;
use crate::validator::{CompiledRuleSet, SchemaValidator, ValidationErrors};

/// Configuration errors detected while loading rule-sets. Any of these
/// aborts startup.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{entity}.{operation}: rule references undefined field model '{model}'")]
    UnknownModel {
        entity: String,
        operation: String,
        model: String,
    },

    #[error("{entity}.{operation}: invalid regex for field '{field}': {source}")]
    InvalidRegex {
        entity: String,
        operation: String,
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("entity '{0}' declared twice")]
    DuplicateEntity(String),

    #[error("{entity}.{operation} declared twice")]
    DuplicateOperation { entity: String, operation: String },

    #[error("no validator bound for {entity}.{operation}")]
    UnboundOperation { entity: String, operation: String },
}

/// Rule-sets declared by one entity, keyed by operation name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitySchema {
    pub entity: String,
    pub operations: Vec<(String, RuleSet)>,
}

impl EntitySchema {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            operations: Vec::new(),
        }
    }

    pub fn operation(mut self, name: impl Into<String>, rules: RuleSet) -> Self {
        self.operations.push((name.into(), rules));
        self
    }
}

/// The validation function for one (entity, operation) pair.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    entity: Arc<str>,
    operation: Arc<str>,
    rules: Arc<CompiledRuleSet>,
    validator: SchemaValidator,
}

impl RecordValidator {
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn validate(&self, record: &Record) -> Option<ValidationErrors> {
        self.validator.validate(&self.rules, record)
    }

    /// Validate a JSON value; anything but an object is treated as an empty record.
    pub fn validate_value(&self, value: &Value) -> Option<ValidationErrors> {
        match value {
            Value::Object(record) => self.validate(record),
            _ => self.validate(&Record::new()),
        }
    }
}

/// Immutable after [`ValidatorRegistry::load`]; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    entities: HashMap<String, HashMap<String, RecordValidator>>,
}

impl ValidatorRegistry {
    /// Compile every declared rule-set against the shared base models.
    pub fn load<I>(models: FieldModels, schemas: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = EntitySchema>,
    {
        let validator = SchemaValidator::new(models);
        let mut entities: HashMap<String, HashMap<String, RecordValidator>> = HashMap::new();
        let mut bound = 0usize;

        for schema in schemas {
            if entities.contains_key(&schema.entity) {
                return Err(SchemaError::DuplicateEntity(schema.entity));
            }
            let entity: Arc<str> = Arc::from(schema.entity.as_str());
            let mut operations = HashMap::new();
            for (operation, rules) in schema.operations {
                if operations.contains_key(&operation) {
                    return Err(SchemaError::DuplicateOperation {
                        entity: schema.entity.clone(),
                        operation,
                    });
                }
                let compiled = validator.compile(&schema.entity, &operation, &rules)?;
                operations.insert(
                    operation.clone(),
                    RecordValidator {
                        entity: entity.clone(),
                        operation: Arc::from(operation.as_str()),
                        rules: Arc::new(compiled),
                        validator: validator.clone(),
                    },
                );
                bound += 1;
            }
            entities.insert(schema.entity, operations);
        }

        tracing::info!(entities = entities.len(), validators = bound, "validator registry loaded");
        Ok(Self { entities })
    }

    pub fn get(&self, entity: &str, operation: &str) -> Option<&RecordValidator> {
        self.entities.get(entity)?.get(operation)
    }

    /// Like [`get`](Self::get), but a missing pair is a configuration error.
    pub fn bind(&self, entity: &str, operation: &str) -> Result<RecordValidator, SchemaError> {
        self.get(entity, operation)
            .cloned()
            .ok_or_else(|| SchemaError::UnboundOperation {
                entity: entity.to_string(),
                operation: operation.to_string(),
            })
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn operations(&self, entity: &str) -> Vec<&str> {
        self.entities
            .get(entity)
            .map(|ops| ops.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
