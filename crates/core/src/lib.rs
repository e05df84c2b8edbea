//! `campus-core`: shared building blocks for every crate in the workspace.
//!
//! No IO and no transport concerns live here: only identifiers, the failure
//! taxonomy and the value a capability hands back to the dispatcher.

pub mod error;
pub mod id;
pub mod outcome;

pub use error::{ErrorKind, Failure};
pub use id::{InvalidId, RecordId};
pub use outcome::{Outcome, Record};
