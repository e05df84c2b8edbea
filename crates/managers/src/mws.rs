//! Built-in middleware units.

use std::sync::Arc;

use async_trait::async_trait;

use campus_auth::Principal;
use campus_core::Failure;
use campus_dispatch::{Context, Device, Flow, Middleware, ModuleGraphHandle};
use campus_infra::{Collection, Filter};

use crate::entities::TokenManager;
use crate::injectable::Injectables;

pub const DEVICE: &str = "__device";
pub const TOKEN: &str = "__token";
pub const SUPER_ADMIN: &str = "__isSuperAdmin";
pub const QUERY: &str = "__query";

/// Attaches the caller's ip and user agent.
#[derive(Debug, Default)]
pub struct DeviceMiddleware;

#[async_trait]
impl Middleware for DeviceMiddleware {
    async fn run(&self, ctx: Context) -> anyhow::Result<Flow> {
        let ip = ctx
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .or_else(|| ctx.header("x-real-ip"))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let device = Device {
            ip,
            user_agent: ctx.header("user-agent").map(str::to_string),
        };
        Ok(Flow::Continue(ctx.with_device(device)))
    }
}

/// Resolves the `token` header to a stored user.
pub struct TokenMiddleware {
    managers: ModuleGraphHandle,
    users: Arc<dyn Collection>,
}

impl TokenMiddleware {
    pub fn new(injectables: &Injectables) -> Self {
        Self {
            managers: injectables.managers.clone(),
            users: injectables.collections.users.clone(),
        }
    }

    async fn authenticate(&self, token: &str) -> anyhow::Result<Option<Principal>> {
        let tokens = self.managers.sibling::<TokenManager>(TokenManager::NAME)?;
        let claims = tokens.verify_long_token(token)?;
        let filter = Filter::all()
            .eq("_id", claims.user_id.as_str())
            .eq("email", claims.email.as_str());
        let user = self.users.find_one(&filter).await?;
        Ok(user.and_then(|u| Principal::from_record(&serde_json::Value::Object(u))))
    }
}

#[async_trait]
impl Middleware for TokenMiddleware {
    async fn run(&self, ctx: Context) -> anyhow::Result<Flow> {
        let Some(token) = ctx.header("token") else {
            tracing::warn!(module = ctx.module(), capability = ctx.capability(), "token required but not found");
            return Ok(unauthorized());
        };
        match self.authenticate(token).await {
            Ok(Some(principal)) => Ok(Flow::Continue(ctx.with_principal(principal))),
            Ok(None) => {
                tracing::warn!("token does not match a stored user");
                Ok(unauthorized())
            }
            Err(err) => {
                tracing::warn!(error = %err, "token rejected");
                Ok(unauthorized())
            }
        }
    }
}

fn unauthorized() -> Flow {
    Flow::Halt(Failure::unauthorized("unauthorized").into())
}

/// Lets only super-admins through. Must run after `__token`.
#[derive(Debug, Default)]
pub struct SuperAdminMiddleware;

#[async_trait]
impl Middleware for SuperAdminMiddleware {
    async fn run(&self, ctx: Context) -> anyhow::Result<Flow> {
        if ctx.principal().is_some_and(Principal::is_super_admin) {
            return Ok(Flow::Continue(ctx.with_super_admin()));
        }
        tracing::warn!(module = ctx.module(), capability = ctx.capability(), "superadmin required");
        Ok(Flow::Halt(
            Failure::forbidden("forbidden, this actions needs a superadmin").into(),
        ))
    }
}

/// Exposes the query string to the capability.
#[derive(Debug, Default)]
pub struct QueryMiddleware;

#[async_trait]
impl Middleware for QueryMiddleware {
    async fn run(&self, ctx: Context) -> anyhow::Result<Flow> {
        Ok(Flow::Continue(ctx.with_parsed_query()))
    }
}
