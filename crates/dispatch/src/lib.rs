//! `campus-dispatch`: the request-dispatch platform every entity manager
//! plugs into.
//!
//! ```text
//! InboundCall
//!   ↓  ApiHandler: (module, verb, fn) → route (fixed at startup)
//!   ↓  VirtualStack: pre-stack ++ capability stack, sequential, halts early
//!   ↓  Module::call(capability, CapabilityInput)
//!   ↓  ResponseDispatcher: Reply → one Envelope + status
//! Response
//! ```
//!
//! Everything except [`Context`] is built once at startup and read-only
//! afterwards.

pub mod context;
pub mod handler;
pub mod manifest;
pub mod middleware;
pub mod module;
pub mod pipeline;
pub mod response;

pub use context::{CapabilityInput, Context, Device};
pub use handler::{ApiHandler, InboundCall};
pub use manifest::{Exposure, ExposureManifest, ManifestBuilder, ManifestError, Verb};
pub use middleware::{Flow, Middleware, MiddlewareRegistry, MiddlewareRegistryBuilder, RegistryError};
pub use module::{GraphError, Module, ModuleGraph, ModuleGraphBuilder, ModuleGraphHandle};
pub use pipeline::{NamedMiddleware, ResolvedStack, VirtualStack};
pub use response::{Envelope, Reply, Response, ResponseChannel, ResponseDispatcher};
