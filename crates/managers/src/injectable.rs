//! The fixed bundle every manager and middleware is constructed with.

use std::sync::Arc;

use campus_auth::PasswordHasher;
use campus_dispatch::ModuleGraphHandle;
use campus_infra::Collections;
use campus_validation::ValidatorRegistry;

use crate::config::Config;

/// Shared helpers.
#[derive(Debug, Clone, Default)]
pub struct Utils {
    pub passwords: PasswordHasher,
}

#[derive(Debug, Clone)]
pub struct Injectables {
    pub config: Arc<Config>,
    pub collections: Collections,
    pub validators: Arc<ValidatorRegistry>,
    pub utils: Utils,
    /// Sibling managers; resolvable once the loader publishes the graph.
    pub managers: ModuleGraphHandle,
}
