//! HTTP transport: maps `/api/{moduleName}/{fnName}` onto the api handler.

pub mod app;
pub mod middleware;
