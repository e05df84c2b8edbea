//! `campus-managers`: the entity managers, built-in middleware and the
//! loader that wires them onto the dispatch platform.

pub mod config;
pub mod entities;
pub mod injectable;
pub mod loader;
pub mod mws;
pub mod schemas;

pub use config::{Config, ConfigError};
pub use entities::{ClassroomManager, SchoolManager, StudentManager, TokenManager, UserManager};
pub use injectable::{Injectables, Utils};
pub use loader::{LoadError, Managers, ManagersLoader};
