//! Per-operation field rules.

use serde::{Deserialize, Serialize};

use crate::model::{Bounds, FieldType};

/// One entry of a rule-set. Names a base field model and overrides only
/// what differs for this operation.
///
/// `min`/`max` are shorthands that override the corresponding side of the
/// bounds, applied after `length`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    pub model: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type")]
    pub kind: Option<FieldType>,
    #[serde(default)]
    pub length: Option<Bounds>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub one_of: Option<Vec<String>>,
    #[serde(default)]
    pub regex: Option<String>,
    /// Custom message reported instead of the generated one.
    #[serde(default)]
    pub error: Option<String>,
}

pub type RuleSet = Vec<FieldRule>;

impl FieldRule {
    pub fn model(name: impl Into<String>) -> Self {
        Self {
            model: name.into(),
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Validate a different record field than the model's own path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn kind(mut self, kind: FieldType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn length(mut self, min: f64, max: f64) -> Self {
        self.length = Some(Bounds::new(min, max));
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Bound overrides stated by this rule, `None` when it states none.
    pub(crate) fn bound_overrides(&self) -> Option<Bounds> {
        let mut bounds = self.length.unwrap_or_default();
        bounds = bounds.overlay(Bounds {
            min: self.min,
            max: self.max,
        });
        if bounds.is_unbounded() { None } else { Some(bounds) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_shorthands_override_length() {
        let rule = FieldRule::model("age").length(1.0, 100.0).max(60.0);
        assert_eq!(rule.bound_overrides(), Some(Bounds::new(1.0, 60.0)));
        assert_eq!(FieldRule::model("name").bound_overrides(), None);
    }

    #[test]
    fn rules_deserialize_with_defaults() {
        let rule: FieldRule = serde_json::from_value(serde_json::json!({
            "model": "classroom",
            "regex": "^[a-f0-9]{24}$",
            "error": "Invalid classroom ID",
        }))
        .unwrap();
        assert!(!rule.required);
        assert_eq!(rule.error.as_deref(), Some("Invalid classroom ID"));
    }
}
