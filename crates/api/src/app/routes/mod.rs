pub mod api;
pub mod system;
