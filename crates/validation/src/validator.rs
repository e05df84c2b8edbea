//! The schema validator: evaluates a compiled rule-set against a record.

use std::sync::Arc;

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use campus_core::Record;

use crate::model::{Bounds, FieldModels, FieldType};
use crate::registry::SchemaError;
use crate::rule::FieldRule;

/// A rule with its base model resolved and its regex compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub field: String,
    pub required: bool,
    pub kind: FieldType,
    pub bounds: Option<Bounds>,
    pub one_of: Option<Vec<String>>,
    pub regex: Option<Regex>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledRuleSet {
    rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field name to first recorded message, in rule declaration order.
///
/// Serialises as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, field: &str, message: String) {
        // First message per field wins.
        if self.get(field).is_none() {
            self.errors.push(FieldError {
                field: field.to_string(),
                message,
            });
        }
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.errors.len()))?;
        for e in &self.errors {
            map.serialize_entry(&e.field, &e.message)?;
        }
        map.end()
    }
}

impl From<ValidationErrors> for Value {
    fn from(value: ValidationErrors) -> Self {
        Value::Object(
            value
                .errors
                .into_iter()
                .map(|e| (e.field, Value::String(e.message)))
                .collect(),
        )
    }
}

/// Shared validator closing over the base field models.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    models: Arc<FieldModels>,
}

impl SchemaValidator {
    pub fn new(models: FieldModels) -> Self {
        Self {
            models: Arc::new(models),
        }
    }

    pub fn models(&self) -> &FieldModels {
        &self.models
    }

    /// Resolve every rule against its base model and compile regexes.
    pub fn compile(
        &self,
        entity: &str,
        operation: &str,
        rules: &[FieldRule],
    ) -> Result<CompiledRuleSet, SchemaError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let base = self
                .models
                .get(&rule.model)
                .ok_or_else(|| SchemaError::UnknownModel {
                    entity: entity.to_string(),
                    operation: operation.to_string(),
                    model: rule.model.clone(),
                })?;

            let field = rule.path.clone().unwrap_or_else(|| base.path.clone());
            let bounds = match (base.length, rule.bound_overrides()) {
                (Some(b), Some(over)) => Some(b.overlay(over)),
                (b, over) => over.or(b),
            };
            let pattern = rule.regex.as_ref().or(base.regex.as_ref());
            let regex = pattern
                .map(|p| Regex::new(p))
                .transpose()
                .map_err(|source| SchemaError::InvalidRegex {
                    entity: entity.to_string(),
                    operation: operation.to_string(),
                    field: field.clone(),
                    source,
                })?;

            compiled.push(CompiledRule {
                field,
                required: rule.required,
                kind: rule.kind.unwrap_or(base.kind),
                bounds,
                one_of: rule.one_of.clone().or_else(|| base.one_of.clone()),
                regex,
                message: rule.error.clone(),
            });
        }
        Ok(CompiledRuleSet { rules: compiled })
    }

    /// `None` when every field passes, otherwise the first message per
    /// failing field. Later fields are still checked after a failure.
    pub fn validate(&self, rules: &CompiledRuleSet, record: &Record) -> Option<ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for rule in &rules.rules {
            if let Err(generated) = check_field(rule, record.get(&rule.field)) {
                let message = rule.message.clone().unwrap_or(generated);
                errors.record(&rule.field, message);
            }
        }
        if errors.is_empty() { None } else { Some(errors) }
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn check_field(rule: &CompiledRule, value: Option<&Value>) -> Result<(), String> {
    let field = rule.field.as_str();
    if is_absent(value) {
        if rule.required {
            return Err(format!("{field} is required"));
        }
        return Ok(());
    }
    let Some(value) = value else {
        return Ok(());
    };

    let text = match (rule.kind, value) {
        (FieldType::String, Value::String(s)) => s.clone(),
        (FieldType::Number, Value::Number(n)) => n.to_string(),
        (FieldType::Boolean, Value::Bool(b)) => b.to_string(),
        (kind, _) => return Err(format!("{field} must be of type {kind}")),
    };

    if let Some(bounds) = rule.bounds {
        check_bounds(field, rule.kind, value, &text, bounds)?;
    }

    if let Some(allowed) = &rule.one_of {
        if !allowed.iter().any(|a| *a == text) {
            return Err(format!("{field} must be one of: {}", allowed.join(", ")));
        }
    }

    if let Some(regex) = &rule.regex {
        if !regex.is_match(&text) {
            return Err(format!("{field} has an invalid format"));
        }
    }

    Ok(())
}

fn check_bounds(
    field: &str,
    kind: FieldType,
    value: &Value,
    text: &str,
    bounds: Bounds,
) -> Result<(), String> {
    match kind {
        FieldType::Number => {
            let n = value.as_f64().unwrap_or_default();
            if let Some(min) = bounds.min.filter(|min| n < *min) {
                return Err(format!("{field} must be greater than or equal to {min}"));
            }
            if let Some(max) = bounds.max.filter(|max| n > *max) {
                return Err(format!("{field} must be less than or equal to {max}"));
            }
        }
        FieldType::String => {
            let len = text.chars().count() as f64;
            if let Some(min) = bounds.min.filter(|min| len < *min) {
                return Err(format!("{field} must be at least {min} characters long"));
            }
            if let Some(max) = bounds.max.filter(|max| len > *max) {
                return Err(format!("{field} must be at most {max} characters long"));
            }
        }
        FieldType::Boolean => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldModel;
    use serde_json::json;

    fn models() -> FieldModels {
        FieldModels::new()
            .with("name", FieldModel::string("name").length(3.0, 20.0))
            .with("password", FieldModel::string("password").length(8.0, 100.0))
            .with("age", FieldModel::number("age").length(1.0, 100.0))
            .with(
                "userType",
                FieldModel::string("userType").one_of(["admin", "superadmin"]),
            )
            .with("email", FieldModel::string("email").length(3.0, 100.0))
    }

    fn record(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn compile(rules: &[FieldRule]) -> (SchemaValidator, CompiledRuleSet) {
        let v = SchemaValidator::new(models());
        let set = v.compile("user", "op", rules).unwrap();
        (v, set)
    }

    #[test]
    fn passing_record_yields_none() {
        let (v, set) = compile(&[
            FieldRule::model("name").required(),
            FieldRule::model("age").required(),
        ]);
        assert_eq!(v.validate(&set, &record(json!({"name": "Alice", "age": 12}))), None);
    }

    #[test]
    fn absent_optional_fields_are_skipped() {
        let (v, set) = compile(&[FieldRule::model("name"), FieldRule::model("age")]);
        assert_eq!(v.validate(&set, &record(json!({"name": null, "age": ""}))), None);
        assert_eq!(v.validate(&set, &record(json!({}))), None);
    }

    #[test]
    fn required_check_comes_first() {
        let (v, set) = compile(&[FieldRule::model("name").required()]);
        let errs = v.validate(&set, &record(json!({}))).unwrap();
        assert_eq!(errs.get("name"), Some("name is required"));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let (v, set) = compile(&[FieldRule::model("age").required()]);
        let errs = v.validate(&set, &record(json!({"age": "12"}))).unwrap();
        assert_eq!(errs.get("age"), Some("age must be of type number"));
    }

    #[test]
    fn string_length_counts_characters() {
        let (v, set) = compile(&[FieldRule::model("name").required()]);
        // Three characters, six bytes.
        assert_eq!(v.validate(&set, &record(json!({"name": "ééé"}))), None);
        let errs = v.validate(&set, &record(json!({"name": "Jo"}))).unwrap();
        assert_eq!(errs.get("name"), Some("name must be at least 3 characters long"));
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let (v, set) = compile(&[FieldRule::model("age").required()]);
        assert_eq!(v.validate(&set, &record(json!({"age": 1}))), None);
        assert_eq!(v.validate(&set, &record(json!({"age": 100}))), None);
        let errs = v.validate(&set, &record(json!({"age": 101}))).unwrap();
        assert_eq!(errs.get("age"), Some("age must be less than or equal to 100"));
        let errs = v.validate(&set, &record(json!({"age": 0}))).unwrap();
        assert_eq!(errs.get("age"), Some("age must be greater than or equal to 1"));
    }

    #[test]
    fn rule_overrides_only_what_it_states() {
        let (v, set) = compile(&[FieldRule::model("password").required().min(6.0)]);
        assert_eq!(v.validate(&set, &record(json!({"password": "sixsix"}))), None);
        let errs = v
            .validate(&set, &record(json!({"password": "x".repeat(101)})))
            .unwrap();
        assert_eq!(errs.get("password"), Some("password must be at most 100 characters long"));
    }

    #[test]
    fn enum_and_regex_checks() {
        let (v, set) = compile(&[
            FieldRule::model("userType").required(),
            FieldRule::model("email").regex(r"^[a-z]+@[a-z]+\.[a-z]{2,4}$"),
        ]);
        let errs = v
            .validate(&set, &record(json!({"userType": "parent", "email": "nope"})))
            .unwrap();
        assert_eq!(errs.get("userType"), Some("userType must be one of: admin, superadmin"));
        assert_eq!(errs.get("email"), Some("email has an invalid format"));
        assert_eq!(errs.len(), 2);
    }

    #[test]
    fn custom_message_replaces_generated_one() {
        let (v, set) = compile(&[FieldRule::model("name")
            .regex("^[a-f0-9]{24}$")
            .error("Invalid classroom ID")]);
        let errs = v.validate(&set, &record(json!({"name": "not-an-id"}))).unwrap();
        assert_eq!(errs.get("name"), Some("Invalid classroom ID"));
    }

    #[test]
    fn all_failing_fields_accumulate_in_declaration_order() {
        let (v, set) = compile(&[
            FieldRule::model("password").required(),
            FieldRule::model("name").required(),
            FieldRule::model("age").required(),
        ]);
        let errs = v.validate(&set, &record(json!({"name": "Jo"}))).unwrap();
        assert_eq!(errs.fields().collect::<Vec<_>>(), vec!["password", "name", "age"]);
        let json = serde_json::to_string(&errs).unwrap();
        assert!(json.starts_with("{\"password\""));
    }

    #[test]
    fn unknown_model_is_a_compile_error() {
        let v = SchemaValidator::new(models());
        let err = v
            .compile("user", "signup", &[FieldRule::model("nickname")])
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownModel { ref model, .. } if model == "nickname"));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: a string passes the length rule iff its char count is within bounds.
            #[test]
            fn length_rule_matches_char_count(name in "\\PC{0,30}") {
                let (v, set) = compile(&[FieldRule::model("name")]);
                let len = name.chars().count();
                let passes = v.validate(&set, &record(json!({"name": name}))).is_none();
                prop_assert_eq!(passes, len == 0 || (3..=20).contains(&len));
            }

            /// Property: numeric bounds are inclusive on both ends.
            #[test]
            fn age_rule_matches_inclusive_range(age in -50i64..200) {
                let (v, set) = compile(&[FieldRule::model("age").required()]);
                let passes = v.validate(&set, &record(json!({"age": age}))).is_none();
                prop_assert_eq!(passes, (1..=100).contains(&age));
            }
        }
    }
}
