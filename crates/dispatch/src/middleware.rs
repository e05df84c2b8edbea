//! Middleware units and their registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::Context;
use crate::response::Reply;

/// What a middleware decided.
#[derive(Debug)]
pub enum Flow {
    /// Advance to the next unit with the (possibly augmented) context.
    Continue(Context),
    /// Stop the call and answer with this reply.
    Halt(Reply),
}

/// A named pre-capability step. Constructed once and shared by every call,
/// so implementations must not keep per-call state.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn run(&self, ctx: Context) -> anyhow::Result<Flow>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("middleware '{0}' registered twice")]
    Duplicate(String),

    #[error("unknown middleware '{0}'")]
    Unknown(String),
}

/// Name → middleware lookup table. Immutable once built.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    units: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    pub fn builder() -> MiddlewareRegistryBuilder {
        MiddlewareRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Middleware>> {
        self.units.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl core::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("MiddlewareRegistry").field("units", &names).finish()
    }
}

#[derive(Default)]
pub struct MiddlewareRegistryBuilder {
    units: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistryBuilder {
    pub fn register(
        mut self,
        name: impl Into<String>,
        unit: Arc<dyn Middleware>,
    ) -> Result<Self, RegistryError> {
        let name = name.into();
        if self.units.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.units.insert(name, unit);
        Ok(self)
    }

    pub fn build(self) -> MiddlewareRegistry {
        tracing::info!(middleware = self.units.len(), "middleware registry loaded");
        MiddlewareRegistry { units: self.units }
    }
}
