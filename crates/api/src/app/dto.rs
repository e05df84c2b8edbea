//! Request mapping: raw HTTP pieces into an [`InboundCall`].

use std::collections::{BTreeMap, HashMap};

use axum::http::HeaderMap;
use serde_json::Value;

use campus_core::{Failure, Record};
use campus_dispatch::{InboundCall, Verb};

/// An empty body is an empty record; anything else must be a JSON object.
pub fn parse_body(bytes: &[u8]) -> Result<Record, Failure> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Record::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(Failure::bad_request("request body must be a JSON object")),
        Err(err) => Err(Failure::bad_request(format!("malformed JSON body: {err}"))),
    }
}

pub fn inbound_call(
    module: String,
    capability: String,
    verb: Verb,
    body: Record,
    query: HashMap<String, String>,
    headers: &HeaderMap,
) -> InboundCall {
    let query = query.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
    InboundCall {
        module,
        capability,
        verb,
        body,
        query,
        headers: header_map(headers),
    }
}

/// Headers with non-UTF-8 values dropped. Repeated headers keep the first value.
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            out.entry(name.as_str().to_string()).or_insert_with(|| value.to_string());
        }
    }
    out
}
