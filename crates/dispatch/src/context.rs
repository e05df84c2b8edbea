//! Per-call context and the input a capability receives.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use campus_auth::Principal;
use campus_core::Record;

use crate::handler::InboundCall;
use crate::manifest::Verb;

/// Prefix reserved for framework-injected fields. Caller keys carrying it
/// are discarded.
pub const INJECTED_PREFIX: &str = "__";

/// Caller device information attached by the `__device` middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Per-call record: raw inbound fields plus whatever middleware attached.
///
/// Owned by exactly one call. Middleware augments it by value and hands it
/// back through [`crate::Flow::Continue`].
#[derive(Debug, Clone)]
pub struct Context {
    module: String,
    capability: String,
    verb: Verb,
    body: Record,
    query: Record,
    headers: BTreeMap<String, String>,
    principal: Option<Principal>,
    parsed_query: Option<Record>,
    is_super_admin: bool,
    device: Option<Device>,
}

impl Context {
    pub fn new(call: InboundCall) -> Self {
        Self {
            module: call.module,
            capability: call.capability,
            verb: call.verb,
            body: call.body,
            query: call.query,
            headers: call
                .headers
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
            principal: None,
            parsed_query: None,
            is_super_admin: false,
            device: None,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn body(&self) -> &Record {
        &self.body
    }

    pub fn query(&self) -> &Record {
        &self.query
    }

    /// Header lookup; names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_super_admin
    }

    pub fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_parsed_query(mut self) -> Self {
        self.parsed_query = Some(self.query.clone());
        self
    }

    pub fn with_super_admin(mut self) -> Self {
        self.is_super_admin = true;
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Merge caller fields (body first, then query for keys the body does
    /// not set) and move the injected fields into their typed slots.
    pub fn into_input(self) -> CapabilityInput {
        let mut fields = Record::new();
        for (k, v) in self.body.into_iter().chain(self.query) {
            if k.starts_with(INJECTED_PREFIX) || fields.contains_key(&k) {
                continue;
            }
            fields.insert(k, v);
        }
        CapabilityInput {
            fields,
            principal: self.principal,
            query: self.parsed_query,
            is_super_admin: self.is_super_admin,
            device: self.device,
        }
    }
}

/// What a capability receives: caller-supplied fields, plus framework fields
/// that only middleware can set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityInput {
    fields: Record,
    principal: Option<Principal>,
    query: Option<Record>,
    is_super_admin: bool,
    device: Option<Device>,
}

impl CapabilityInput {
    pub fn new(fields: Record) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_query(mut self, query: Record) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_super_admin(mut self) -> Self {
        self.is_super_admin = true;
        self
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A non-empty string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        non_empty(self.fields.get(name))
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The parsed query, present only when the `__query` middleware ran.
    pub fn query(&self) -> Option<&Record> {
        self.query.as_ref()
    }

    /// A non-empty string from the parsed query.
    pub fn query_str(&self, name: &str) -> Option<&str> {
        non_empty(self.query.as_ref()?.get(name))
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_super_admin
    }

    pub fn device(&self) -> Option<&Device> {
        self.device.as_ref()
    }
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
