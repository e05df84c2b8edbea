use std::any::Any;

use async_trait::async_trait;

use campus_auth::{TokenClaims, TokenError, TokenService};
use campus_core::{Failure, Outcome, RecordId};
use campus_dispatch::{CapabilityInput, ExposureManifest, Module};

use crate::injectable::Injectables;

/// Issues and verifies long-lived user tokens. Used by siblings and the
/// `__token` middleware only; nothing is exposed over the transport.
#[derive(Debug)]
pub struct TokenManager {
    tokens: TokenService,
    manifest: ExposureManifest,
}

impl TokenManager {
    pub const NAME: &'static str = "token";

    pub fn new(injectables: &Injectables) -> Self {
        let config = &injectables.config;
        Self {
            tokens: TokenService::new(config.long_token_secret.as_bytes(), config.long_token_ttl()),
            manifest: ExposureManifest::empty(),
        }
    }

    pub fn gen_long_token(&self, user_id: RecordId, email: &str) -> Result<String, TokenError> {
        self.tokens.issue(user_id, email)
    }

    pub fn verify_long_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.tokens.verify(token)
    }
}

#[async_trait]
impl Module for TokenManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn manifest(&self) -> &ExposureManifest {
        &self.manifest
    }

    async fn call(&self, _capability: &str, _input: CapabilityInput) -> anyhow::Result<Outcome> {
        Ok(Failure::not_found("not found").into())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
