//! Entity managers: one module per entity plus the token module.
//!
//! Capability bodies return [`Step`]: business failures and persistence
//! faults both propagate with `?`, and [`finish`] splits them into an
//! [`Outcome::Failure`] or an `Err` fault.

mod classroom;
mod school;
mod student;
mod token;
mod user;

pub use classroom::ClassroomManager;
pub use school::SchoolManager;
pub use student::StudentManager;
pub use token::TokenManager;
pub use user::UserManager;

use serde_json::Value;

use campus_auth::{Principal, TokenError};
use campus_core::{Failure, Outcome, Record};
use campus_dispatch::{CapabilityInput, GraphError};
use campus_infra::{Document, StoreError};
use campus_validation::RecordValidator;

/// Which of two alternative lookup keys the caller supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup<'a> {
    Id(&'a str),
    Key(&'a str),
}

/// Exactly one of `id` or `key` from the parsed query.
fn id_or_key<'a>(input: &'a CapabilityInput, key: &str) -> Result<Lookup<'a>, Failure> {
    match (input.query_str("id"), input.query_str(key)) {
        (Some(id), None) => Ok(Lookup::Id(id)),
        (None, Some(k)) => Ok(Lookup::Key(k)),
        (None, None) => Err(Failure::bad_request(format!("Either 'id' or '{key}' must be provided"))),
        (Some(_), Some(_)) => Err(Failure::bad_request(format!("Provide either 'id' or '{key}', not both"))),
    }
}

/// The authenticated caller. Capabilities behind `__token` always have one.
fn caller(input: &CapabilityInput) -> Result<&Principal, Failure> {
    input.principal().ok_or_else(|| Failure::unauthorized("unauthorized"))
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Copy the present caller fields named in `pairs` (input name, record
/// name) into a new record.
fn pick(input: &CapabilityInput, pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .filter_map(|(from, to)| {
            let value = input.field(from).filter(|v| !is_absent(v))?;
            Some((to.to_string(), value.clone()))
        })
        .collect()
}

fn check(validator: &RecordValidator, record: &Record) -> Result<(), Failure> {
    match validator.validate(record) {
        None => Ok(()),
        Some(errors) => Err(Failure::validation(Value::from(errors))),
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

fn str_of<'a>(doc: &'a Document, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

fn has_references(doc: &Document, field: &str) -> bool {
    doc.get(field)
        .and_then(Value::as_array)
        .is_some_and(|refs| !refs.is_empty())
}

fn list(data: Vec<Document>) -> Value {
    let total = data.len();
    serde_json::json!({ "data": data, "totalCount": total })
}

/// Why a capability body stopped before producing data.
#[derive(Debug)]
enum Stop {
    /// A business failure, reported to the caller as-is.
    Rejected(Failure),
    /// An unexpected fault; becomes a 500 at the dispatch boundary.
    Fault(anyhow::Error),
}

impl From<Failure> for Stop {
    fn from(value: Failure) -> Self {
        Stop::Rejected(value)
    }
}

impl From<StoreError> for Stop {
    fn from(value: StoreError) -> Self {
        Stop::Fault(value.into())
    }
}

impl From<GraphError> for Stop {
    fn from(value: GraphError) -> Self {
        Stop::Fault(value.into())
    }
}

impl From<TokenError> for Stop {
    fn from(value: TokenError) -> Self {
        Stop::Fault(value.into())
    }
}

impl From<anyhow::Error> for Stop {
    fn from(value: anyhow::Error) -> Self {
        Stop::Fault(value)
    }
}

type Step<T> = Result<T, Stop>;

/// Turn a capability body's result into what the dispatcher expects.
fn finish(result: Step<Value>) -> anyhow::Result<Outcome> {
    match result {
        Ok(data) => Ok(Outcome::data(data)),
        Err(Stop::Rejected(failure)) => Ok(failure.into()),
        Err(Stop::Fault(err)) => Err(err),
    }
}
