//! Startup wiring: validators, collections, managers, middleware, routes.

use std::sync::Arc;

use thiserror::Error;

use campus_dispatch::{
    ApiHandler, GraphError, ManifestError, MiddlewareRegistry, Module, ModuleGraph, ModuleGraphHandle,
    RegistryError, VirtualStack,
};
use campus_infra::Collections;
use campus_validation::{SchemaError, ValidatorRegistry};

use crate::config::Config;
use crate::entities::{ClassroomManager, SchoolManager, StudentManager, TokenManager, UserManager};
use crate::injectable::{Injectables, Utils};
use crate::mws::{
    DEVICE, DeviceMiddleware, QUERY, QueryMiddleware, SUPER_ADMIN, SuperAdminMiddleware, TOKEN, TokenMiddleware,
};
use crate::schemas;

/// Anything that prevents the process from starting.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Middleware(#[from] RegistryError),
}

/// The loaded system.
#[derive(Debug, Clone)]
pub struct Managers {
    pub config: Arc<Config>,
    pub collections: Collections,
    pub graph: ModuleGraphHandle,
    pub api: Arc<ApiHandler>,
}

pub struct ManagersLoader {
    injectables: Injectables,
}

impl ManagersLoader {
    /// Preload validators and in-memory collections.
    pub fn new(config: Config) -> Result<Self, LoadError> {
        Self::with_collections(config, Collections::in_memory())
    }

    /// Preload validators; persistence is supplied by the caller.
    pub fn with_collections(config: Config, collections: Collections) -> Result<Self, LoadError> {
        let validators = ValidatorRegistry::load(schemas::base_models(), schemas::entity_schemas())?;
        Ok(Self {
            injectables: Injectables {
                config: Arc::new(config),
                collections,
                validators: Arc::new(validators),
                utils: Utils::default(),
                managers: ModuleGraphHandle::new(),
            },
        })
    }

    pub fn injectables(&self) -> &Injectables {
        &self.injectables
    }

    pub fn load(self) -> Result<Managers, LoadError> {
        let inj = self.injectables;

        let middleware = MiddlewareRegistry::builder()
            .register(DEVICE, Arc::new(DeviceMiddleware))?
            .register(TOKEN, Arc::new(TokenMiddleware::new(&inj)))?
            .register(SUPER_ADMIN, Arc::new(SuperAdminMiddleware))?
            .register(QUERY, Arc::new(QueryMiddleware))?
            .build();

        let modules: [Arc<dyn Module>; 5] = [
            Arc::new(TokenManager::new(&inj)),
            Arc::new(UserManager::new(&inj)?),
            Arc::new(SchoolManager::new(&inj)?),
            Arc::new(ClassroomManager::new(&inj)?),
            Arc::new(StudentManager::new(&inj)?),
        ];
        let mut builder = ModuleGraph::builder();
        for module in modules {
            builder.register(module)?;
        }
        let graph = builder.build();

        let stack = VirtualStack::new(inj.config.pre_stack.clone(), Arc::new(middleware))?;
        let api = ApiHandler::new(&graph, &stack)?;

        tracing::info!(
            service = %inj.config.service_name,
            modules = ?graph.names().collect::<Vec<_>>(),
            pre_stack = ?inj.config.pre_stack,
            "managers loaded"
        );
        inj.managers.publish(graph)?;

        Ok(Managers {
            config: inj.config,
            collections: inj.collections,
            graph: inj.managers,
            api: Arc::new(api),
        })
    }
}
