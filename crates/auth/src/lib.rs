//! `campus-auth`: credentials and identities.
//!
//! Token signing/verification, password digests and the authenticated
//! principal. Decoupled from HTTP and storage.

pub mod claims;
pub mod password;
pub mod principal;
pub mod token;
pub mod user_type;

pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use password::PasswordHasher;
pub use principal::Principal;
pub use token::{TokenError, TokenService};
pub use user_type::{UnknownUserType, UserType};
