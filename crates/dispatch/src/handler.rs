//! Capability dispatcher: routes `(module, verb, capability)` to a module and
//! its resolved middleware stack.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use campus_core::{Failure, Record};

use crate::context::Context;
use crate::manifest::Verb;
use crate::middleware::RegistryError;
use crate::module::{Module, ModuleGraph};
use crate::pipeline::{ResolvedStack, VirtualStack};
use crate::response::{Reply, Response, ResponseChannel, ResponseDispatcher};

/// A call as received by the transport, before any middleware ran.
#[derive(Debug, Clone)]
pub struct InboundCall {
    pub module: String,
    pub capability: String,
    pub verb: Verb,
    pub body: Record,
    pub query: Record,
    pub headers: BTreeMap<String, String>,
}

impl InboundCall {
    pub fn new(module: impl Into<String>, capability: impl Into<String>, verb: Verb) -> Self {
        Self {
            module: module.into(),
            capability: capability.into(),
            verb,
            body: Record::new(),
            query: Record::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_body(mut self, body: Record) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, query: Record) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    module: String,
    verb: Verb,
    capability: String,
}

#[derive(Clone)]
struct Route {
    module: Arc<dyn Module>,
    stack: ResolvedStack,
}

/// Routing table over the module graph. Built once; every exposed capability
/// has its effective middleware order resolved up front, so a manifest
/// naming an unregistered middleware fails startup instead of a call.
#[derive(Clone)]
pub struct ApiHandler {
    routes: Arc<HashMap<RouteKey, Route>>,
    responses: ResponseDispatcher,
}

impl ApiHandler {
    pub fn new(graph: &ModuleGraph, stack: &VirtualStack) -> Result<Self, RegistryError> {
        let mut routes = HashMap::new();
        for module in graph.modules() {
            for exposure in module.manifest().entries() {
                let resolved = stack.resolve(&exposure.stack)?;
                tracing::debug!(
                    module = module.name(),
                    verb = exposure.verb.as_str(),
                    capability = %exposure.capability,
                    stack = ?resolved,
                    "route registered"
                );
                routes.insert(
                    RouteKey {
                        module: module.name().to_string(),
                        verb: exposure.verb,
                        capability: exposure.capability.clone(),
                    },
                    Route {
                        module: module.clone(),
                        stack: resolved,
                    },
                );
            }
        }
        tracing::info!(routes = routes.len(), modules = graph.len(), "api handler ready");
        Ok(Self {
            routes: Arc::new(routes),
            responses: ResponseDispatcher::new(),
        })
    }

    /// Registered routes as `(module, verb, capability)`, sorted.
    pub fn routes(&self) -> Vec<(String, Verb, String)> {
        let mut out: Vec<_> = self
            .routes
            .keys()
            .map(|k| (k.module.clone(), k.verb, k.capability.clone()))
            .collect();
        out.sort_by(|a, b| (&a.0, a.1.as_str(), &a.2).cmp(&(&b.0, b.1.as_str(), &b.2)));
        out
    }

    /// The middleware names a route runs, in order.
    pub fn stack_of(&self, module: &str, verb: Verb, capability: &str) -> Option<Vec<String>> {
        let key = RouteKey {
            module: module.to_string(),
            verb,
            capability: capability.to_string(),
        };
        self.routes
            .get(&key)
            .map(|r| r.stack.names().map(str::to_string).collect())
    }

    /// Run one call to completion. Always yields exactly one response.
    ///
    /// The call runs on its own task. Dropping this future (for instance on a
    /// transport timeout) discards the response but does not cancel the task,
    /// so writes already under way still complete. Nothing is rolled back.
    pub async fn dispatch(&self, call: InboundCall) -> Response {
        let key = RouteKey {
            module: call.module.clone(),
            verb: call.verb,
            capability: call.capability.clone(),
        };
        let Some(route) = self.routes.get(&key).cloned() else {
            tracing::debug!(
                module = %call.module,
                verb = call.verb.as_str(),
                capability = %call.capability,
                "no route"
            );
            return self.responses.render(Failure::not_found("not found").into());
        };

        let (mut channel, rx) = ResponseChannel::new();
        let responses = self.responses;
        let capability = call.capability.clone();
        let ctx = Context::new(call);

        // A panicking call drops its channel unsent; the receiver turns that
        // into a 500 below and the process keeps serving.
        tokio::spawn(async move {
            let reply = match VirtualStack::execute(&route.stack, route.module.as_ref(), &capability, ctx).await {
                Ok(reply) => reply,
                Err(err) => {
                    tracing::error!(
                        module = route.module.name(),
                        capability = %capability,
                        error = %err,
                        "capability faulted"
                    );
                    Reply::fault()
                }
            };
            responses.dispatch(&mut channel, reply);
        });

        match rx.await {
            Ok(response) => response,
            Err(_) => {
                tracing::error!(module = %key.module, capability = %key.capability, "call aborted without a response");
                self.responses.render(Reply::fault())
            }
        }
    }
}

impl core::fmt::Debug for ApiHandler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiHandler").field("routes", &self.routes.len()).finish()
    }
}
