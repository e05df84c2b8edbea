//! Capability modules and the module graph.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use thiserror::Error;

use campus_core::Outcome;

use crate::context::CapabilityInput;
use crate::manifest::ExposureManifest;

/// A loosely-coupled unit exposing named capabilities.
///
/// Business failures come back as [`Outcome::Failure`]; an `Err` is an
/// unexpected fault and is turned into a 500 at the dispatch boundary.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn manifest(&self) -> &ExposureManifest;

    async fn call(&self, capability: &str, input: CapabilityInput) -> anyhow::Result<Outcome>;

    /// Typed access for sibling modules.
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("module '{0}' registered twice")]
    DuplicateModule(String),

    #[error("module graph is not published yet")]
    NotReady,

    #[error("module graph already published")]
    AlreadyPublished,

    #[error("unknown module '{0}'")]
    UnknownModule(String),

    #[error("module '{0}' is not of the requested type")]
    TypeMismatch(String),
}

/// Read-only mapping from module name to module, built once at startup.
#[derive(Clone, Default)]
pub struct ModuleGraph {
    order: Vec<String>,
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ModuleGraph {
    pub fn builder() -> ModuleGraphBuilder {
        ModuleGraphBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.get(name)
    }

    /// Look up a sibling by name and downcast it to its concrete type.
    pub fn typed<T: Module>(&self, name: &str) -> Result<&T, GraphError> {
        self.get(name)
            .ok_or_else(|| GraphError::UnknownModule(name.to_string()))?
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| GraphError::TypeMismatch(name.to_string()))
    }

    /// Module names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.order.iter().filter_map(|n| self.modules.get(n))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl core::fmt::Debug for ModuleGraph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleGraph").field("modules", &self.order).finish()
    }
}

#[derive(Default)]
pub struct ModuleGraphBuilder {
    graph: ModuleGraph,
}

impl ModuleGraphBuilder {
    pub fn register(&mut self, module: Arc<dyn Module>) -> Result<&mut Self, GraphError> {
        let name = module.name().to_string();
        if self.graph.modules.contains_key(&name) {
            return Err(GraphError::DuplicateModule(name));
        }
        self.graph.order.push(name.clone());
        self.graph.modules.insert(name, module);
        Ok(self)
    }

    pub fn build(self) -> ModuleGraph {
        self.graph
    }
}

/// Deferred reference to the module graph, handed to modules while the
/// graph is still being built. Lookups through it only succeed once the
/// finished graph is published, i.e. at call time.
#[derive(Clone, Default)]
pub struct ModuleGraphHandle {
    inner: Arc<OnceLock<ModuleGraph>>,
}

impl ModuleGraphHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, graph: ModuleGraph) -> Result<(), GraphError> {
        self.inner.set(graph).map_err(|_| GraphError::AlreadyPublished)
    }

    pub fn get(&self) -> Result<&ModuleGraph, GraphError> {
        self.inner.get().ok_or(GraphError::NotReady)
    }

    pub fn is_published(&self) -> bool {
        self.inner.get().is_some()
    }

    pub fn sibling<T: Module>(&self, name: &str) -> Result<&T, GraphError> {
        self.get()?.typed(name)
    }
}

impl core::fmt::Debug for ModuleGraphHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleGraphHandle")
            .field("published", &self.is_published())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::Failure;
    use serde_json::json;

    struct Echo {
        name: &'static str,
        manifest: ExposureManifest,
        siblings: ModuleGraphHandle,
    }

    #[async_trait]
    impl Module for Echo {
        fn name(&self) -> &str {
            self.name
        }

        fn manifest(&self) -> &ExposureManifest {
            &self.manifest
        }

        async fn call(&self, capability: &str, _input: CapabilityInput) -> anyhow::Result<Outcome> {
            match capability {
                "peer" => {
                    let peer = self.siblings.sibling::<Echo>("b")?;
                    Ok(Outcome::data(json!({ "peer": peer.name })))
                }
                _ => Ok(Failure::not_found("not found").into()),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn echo(name: &'static str, siblings: &ModuleGraphHandle) -> Arc<dyn Module> {
        Arc::new(Echo {
            name,
            manifest: ExposureManifest::empty(),
            siblings: siblings.clone(),
        })
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let handle = ModuleGraphHandle::new();
        let mut builder = ModuleGraph::builder();
        builder.register(echo("a", &handle)).unwrap();
        let err = builder.register(echo("a", &handle)).err().unwrap();
        assert_eq!(err, GraphError::DuplicateModule("a".into()));
    }

    #[tokio::test]
    async fn siblings_resolve_at_call_time_regardless_of_registration_order() {
        let handle = ModuleGraphHandle::new();
        let mut builder = ModuleGraph::builder();
        // "a" is registered before "b" exists.
        builder.register(echo("a", &handle)).unwrap();
        let a = builder.graph.modules["a"].clone();

        let early = a.call("peer", CapabilityInput::default()).await;
        assert!(early.is_err());

        builder.register(echo("b", &handle)).unwrap();
        handle.publish(builder.build()).unwrap();

        let out = a.call("peer", CapabilityInput::default()).await.unwrap();
        assert_eq!(out, Outcome::data(json!({"peer": "b"})));
        assert_eq!(handle.get().unwrap().names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn publishing_twice_fails() {
        let handle = ModuleGraphHandle::new();
        handle.publish(ModuleGraph::default()).unwrap();
        assert_eq!(handle.publish(ModuleGraph::default()), Err(GraphError::AlreadyPublished));
    }

    #[test]
    fn typed_lookup_reports_unknown_modules() {
        let graph = ModuleGraph::default();
        assert!(matches!(graph.typed::<Echo>("x"), Err(GraphError::UnknownModule(_))));
    }
}
