//! Base field models shared by every entity rule-set.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }
}

impl core::fmt::Display for FieldType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive bounds. For strings they bound the length in characters, for
/// numbers the value itself.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Overlay `over` on top of `self`; only the sides `over` sets change.
    pub fn overlay(self, over: Bounds) -> Bounds {
        Bounds {
            min: over.min.or(self.min),
            max: over.max.or(self.max),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// A reusable field definition (type, bounds, enum, regex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldModel {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default)]
    pub length: Option<Bounds>,
    #[serde(default)]
    pub one_of: Option<Vec<String>>,
    #[serde(default)]
    pub regex: Option<String>,
}

impl FieldModel {
    pub fn new(path: impl Into<String>, kind: FieldType) -> Self {
        Self {
            path: path.into(),
            kind,
            length: None,
            one_of: None,
            regex: None,
        }
    }

    pub fn string(path: impl Into<String>) -> Self {
        Self::new(path, FieldType::String)
    }

    pub fn number(path: impl Into<String>) -> Self {
        Self::new(path, FieldType::Number)
    }

    pub fn length(mut self, min: f64, max: f64) -> Self {
        self.length = Some(Bounds::new(min, max));
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
}

/// Named base field models. Rules reference them by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldModels {
    models: HashMap<String, FieldModel>,
}

impl FieldModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, model: FieldModel) -> Self {
        self.insert(name, model);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, model: FieldModel) -> Option<FieldModel> {
        self.models.insert(name.into(), model)
    }

    pub fn get(&self, name: &str) -> Option<&FieldModel> {
        self.models.get(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, FieldModel)> for FieldModels {
    fn from_iter<T: IntoIterator<Item = (S, FieldModel)>>(iter: T) -> Self {
        Self {
            models: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
