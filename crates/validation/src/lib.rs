//! `campus-validation`: declarative, schema-driven field validation.
//!
//! Entities declare ordered rule-sets that reference shared base field models
//! by name. The registry compiles every rule-set once at startup; afterwards
//! each (entity, operation) pair is validated through a cheap, cloneable
//! [`RecordValidator`].

pub mod model;
pub mod registry;
pub mod rule;
pub mod validator;

pub use model::{Bounds, FieldModel, FieldModels, FieldType};
pub use registry::{EntitySchema, RecordValidator, SchemaError, ValidatorRegistry};
pub use rule::{FieldRule, RuleSet};
pub use validator::{CompiledRule, CompiledRuleSet, FieldError, SchemaValidator, ValidationErrors};
