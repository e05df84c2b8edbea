//! The virtual stack: ordered middleware followed by exactly one capability
//! invocation.

use std::sync::Arc;

use crate::context::Context;
use crate::middleware::{Flow, Middleware, MiddlewareRegistry, RegistryError};
use crate::module::Module;
use crate::response::Reply;

#[derive(Clone)]
pub struct NamedMiddleware {
    pub name: Arc<str>,
    pub unit: Arc<dyn Middleware>,
}

/// An effective middleware order, resolved against the registry at startup.
#[derive(Clone, Default)]
pub struct ResolvedStack {
    units: Arc<[NamedMiddleware]>,
}

impl ResolvedStack {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|m| &*m.name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl core::fmt::Debug for ResolvedStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Global pre-stack plus the registry capability stacks are resolved from.
#[derive(Debug, Clone)]
pub struct VirtualStack {
    pre_stack: Vec<String>,
    registry: Arc<MiddlewareRegistry>,
}

impl VirtualStack {
    /// Every pre-stack name must exist in `registry`.
    pub fn new(pre_stack: Vec<String>, registry: Arc<MiddlewareRegistry>) -> Result<Self, RegistryError> {
        if let Some(missing) = pre_stack.iter().find(|n| !registry.contains(n)) {
            return Err(RegistryError::Unknown(missing.clone()));
        }
        Ok(Self { pre_stack, registry })
    }

    pub fn pre_stack(&self) -> &[String] {
        &self.pre_stack
    }

    /// Pre-stack followed by `capability_stack`, without de-duplication: a
    /// name listed twice runs twice.
    pub fn resolve(&self, capability_stack: &[String]) -> Result<ResolvedStack, RegistryError> {
        let units = self
            .pre_stack
            .iter()
            .chain(capability_stack)
            .map(|name| {
                let unit = self
                    .registry
                    .get(name)
                    .ok_or_else(|| RegistryError::Unknown(name.clone()))?;
                Ok(NamedMiddleware {
                    name: Arc::from(name.as_str()),
                    unit: unit.clone(),
                })
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;
        Ok(ResolvedStack {
            units: units.into(),
        })
    }

    /// Run `stack` strictly in order, then invoke `capability` once. The
    /// first halting middleware ends the call; nothing after it runs.
    pub async fn execute(
        stack: &ResolvedStack,
        module: &dyn Module,
        capability: &str,
        mut ctx: Context,
    ) -> anyhow::Result<Reply> {
        for mw in stack.units.iter() {
            match mw.unit.run(ctx).await? {
                Flow::Continue(next) => ctx = next,
                Flow::Halt(reply) => {
                    tracing::debug!(middleware = %mw.name, code = ?reply.code, "middleware halted call");
                    return Ok(reply);
                }
            }
        }
        let outcome = module.call(capability, ctx.into_input()).await?;
        Ok(outcome.into())
    }
}
