//! Query filters and update documents.

use serde_json::Value;

use campus_core::Record;

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Eq(String, Value),
    EqIgnoreCase(String, String),
}

/// Conjunction of field clauses. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(field.into(), value.into()));
        self
    }

    /// Exact string match ignoring case.
    pub fn eq_ignore_case(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push(Clause::EqIgnoreCase(field.into(), value.into()));
        self
    }

    pub fn matches(&self, doc: &Record) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq(field, value) => doc.get(field) == Some(value),
            Clause::EqIgnoreCase(field, value) => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase() == value.to_lowercase()),
        })
    }
}

/// Field assignments plus array push/pull operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Record,
    push: Vec<(String, Value)>,
    pull: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.insert(field.into(), value.into());
        self
    }

    /// Assign every field of `fields`.
    pub fn set_all(mut self, fields: Record) -> Self {
        self.set.extend(fields);
        self
    }

    /// Append `value` to the array at `field` (created when missing).
    pub fn push(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push.push((field.into(), value.into()));
        self
    }

    /// Remove every element equal to `value` from the array at `field`.
    pub fn pull(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.pull.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.push.is_empty() && self.pull.is_empty()
    }

    /// Apply to `doc` in place. `_id` is never overwritten.
    pub fn apply_to(&self, doc: &mut Record) {
        for (field, value) in &self.set {
            if field != "_id" {
                doc.insert(field.clone(), value.clone());
            }
        }
        for (field, value) in &self.push {
            match doc.get_mut(field) {
                Some(Value::Array(items)) => items.push(value.clone()),
                _ => {
                    doc.insert(field.clone(), Value::Array(vec![value.clone()]));
                }
            }
        }
        for (field, value) in &self.pull {
            if let Some(Value::Array(items)) = doc.get_mut(field) {
                items.retain(|item| item != value);
            }
        }
    }
}
