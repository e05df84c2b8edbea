use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use campus_core::{Failure, Outcome, RecordId};
use campus_dispatch::{CapabilityInput, ExposureManifest, Module, ModuleGraphHandle, Verb};
use campus_infra::{Collection, Filter};
use campus_validation::RecordValidator;

use super::{Step, TokenManager, check, finish, pick};
use crate::injectable::{Injectables, Utils};
use crate::loader::LoadError;

const BAD_CREDENTIALS: &str = "Incorrect username or password";

pub struct UserManager {
    manifest: ExposureManifest,
    users: Arc<dyn Collection>,
    utils: Utils,
    managers: ModuleGraphHandle,
    create_user: RecordValidator,
    login: RecordValidator,
}

impl UserManager {
    pub const NAME: &'static str = "user";

    pub fn new(injectables: &Injectables) -> Result<Self, LoadError> {
        let validators = &injectables.validators;
        Ok(Self {
            manifest: ExposureManifest::builder()
                .expose(Verb::Post, "signup")
                .expose(Verb::Post, "login")
                .build()?,
            users: injectables.collections.users.clone(),
            utils: injectables.utils.clone(),
            managers: injectables.managers.clone(),
            create_user: validators.bind("user", "createUser")?,
            login: validators.bind("user", "login")?,
        })
    }

    async fn signup(&self, input: CapabilityInput) -> Step<Value> {
        let mut user = pick(
            &input,
            &[("name", "name"), ("email", "email"), ("password", "password"), ("userType", "userType")],
        );
        check(&self.create_user, &user)?;

        let email = input.str_field("email").unwrap_or_default();
        if self.users.find_one(&Filter::all().eq("email", email)).await?.is_some() {
            return Err(Failure::conflict("Email already in use").into());
        }

        let password = input.str_field("password").unwrap_or_default();
        user.insert("password".into(), Value::String(self.utils.passwords.hash(password)));

        let mut created = self.users.create(user).await?;
        created.remove("password");
        tracing::info!(user_id = ?created.get("_id"), "user signed up");
        Ok(json!({ "createdUser": created }))
    }

    async fn login(&self, input: CapabilityInput) -> Step<Value> {
        let credentials = pick(&input, &[("email", "email"), ("password", "password")]);
        check(&self.login, &credentials)?;

        let email = input.str_field("email").unwrap_or_default();
        let password = input.str_field("password").unwrap_or_default();
        let Some(user) = self.users.find_one(&Filter::all().eq("email", email)).await? else {
            return Err(Failure::unauthorized(BAD_CREDENTIALS).into());
        };
        let stored = user.get("password").and_then(Value::as_str).unwrap_or_default();
        if !self.utils.passwords.verify(password, stored) {
            return Err(Failure::unauthorized(BAD_CREDENTIALS).into());
        }

        let user_id: RecordId = user
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .parse()
            .map_err(anyhow::Error::from)?;
        let tokens = self.managers.sibling::<TokenManager>(TokenManager::NAME)?;
        let token = tokens.gen_long_token(user_id, email)?;
        Ok(json!({ "token": token }))
    }
}

#[async_trait]
impl Module for UserManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn manifest(&self) -> &ExposureManifest {
        &self.manifest
    }

    async fn call(&self, capability: &str, input: CapabilityInput) -> anyhow::Result<Outcome> {
        finish(match capability {
            "signup" => self.signup(input).await,
            "login" => self.login(input).await,
            _ => Err(Failure::not_found("not found").into()),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
