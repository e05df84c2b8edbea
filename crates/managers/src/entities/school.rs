use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use campus_core::{Failure, Outcome};
use campus_dispatch::{CapabilityInput, ExposureManifest, Module, Verb};
use campus_infra::{Collection, Document, Filter, Update, populate};
use campus_validation::RecordValidator;

use super::{Lookup, Step, caller, check, finish, has_references, id_of, id_or_key, list, pick};
use crate::injectable::Injectables;
use crate::loader::LoadError;
use crate::mws::{QUERY, SUPER_ADMIN, TOKEN};

const NOT_FOUND: &str = "School not found";
const NOT_ADMIN: &str = "Forbidden, you are not the school admin";
const ADMIN_NOT_FOUND: &str = "Admin with provided email not found";

pub struct SchoolManager {
    manifest: ExposureManifest,
    schools: Arc<dyn Collection>,
    users: Arc<dyn Collection>,
    classrooms: Arc<dyn Collection>,
    create_school: RecordValidator,
    update_school: RecordValidator,
    get_school: RecordValidator,
}

impl SchoolManager {
    pub const NAME: &'static str = "school";

    pub fn new(injectables: &Injectables) -> Result<Self, LoadError> {
        let validators = &injectables.validators;
        let collections = &injectables.collections;
        Ok(Self {
            manifest: ExposureManifest::builder()
                .expose_with(Verb::Post, "createSchool", &[TOKEN, SUPER_ADMIN])
                .expose_with(Verb::Patch, "updateSchool", &[TOKEN, QUERY])
                .expose_with(Verb::Get, "getSchool", &[TOKEN, QUERY])
                .expose_with(Verb::Get, "getAllSchools", &[TOKEN, SUPER_ADMIN])
                .expose_with(Verb::Delete, "deleteSchool", &[TOKEN, QUERY])
                .build()?,
            schools: collections.schools.clone(),
            users: collections.users.clone(),
            classrooms: collections.classrooms.clone(),
            create_school: validators.bind("school", "createSchool")?,
            update_school: validators.bind("school", "updateSchool")?,
            get_school: validators.bind("school", "getSchool")?,
        })
    }

    async fn create_school(&self, input: CapabilityInput) -> Step<Value> {
        let mut school = pick(
            &input,
            &[("name", "name"), ("address", "address"), ("mobileNumber", "mobileNumber")],
        );
        check(&self.create_school, &school)?;

        let name = input.str_field("name").unwrap_or_default();
        let admin_email = input.str_field("adminEmail").unwrap_or_default();
        let by_name = Filter::all().eq_ignore_case("name", name);
        let by_email = Filter::all().eq("email", admin_email);
        let (existing, admin) = tokio::try_join!(
            self.schools.find_one(&by_name),
            self.users.find_one(&by_email),
        )?;
        if existing.is_some() {
            return Err(Failure::conflict("A school with this name already exists").into());
        }
        let Some(admin_id) = admin.as_ref().and_then(id_of) else {
            return Err(Failure::not_found(ADMIN_NOT_FOUND).into());
        };

        school.insert("admin".into(), json!(admin_id));
        school.insert("classrooms".into(), json!([]));
        let created = self.schools.create(school).await?;
        tracing::info!(school_id = ?id_of(&created), admin_id, "school created");
        Ok(json!({ "createdSchool": created }))
    }

    async fn update_school(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let Some(id) = input.query_str("id") else {
            return Err(Failure::bad_request("Id must be provided").into());
        };

        let mut fields = pick(
            &input,
            &[("name", "name"), ("address", "address"), ("mobileNumber", "mobileNumber")],
        );
        check(&self.update_school, &fields)?;

        if let Some(admin_email) = input.str_field("admin") {
            let admin = self.users.find_one(&Filter::all().eq("email", admin_email)).await?;
            let Some(admin_id) = admin.as_ref().and_then(id_of) else {
                return Err(Failure::not_found(ADMIN_NOT_FOUND).into());
            };
            fields.insert("admin".into(), json!(admin_id));
        }
        if fields.is_empty() {
            return Err(Failure::bad_request("No fields provided to update").into());
        }

        let Some(school) = self.schools.find_by_id(id).await? else {
            return Err(Failure::not_found(NOT_FOUND).into());
        };
        if !principal.owns(school.get("admin")) {
            return Err(Failure::forbidden(NOT_ADMIN).into());
        }

        let updated = self
            .schools
            .find_by_id_and_update(id, &Update::new().set_all(fields))
            .await?;
        match updated {
            Some(updated) => Ok(json!({ "updatedSchool": updated })),
            None => Err(Failure::not_found(NOT_FOUND).into()),
        }
    }

    async fn get_school(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let lookup = id_or_key(&input, "name")?;
        let query = input.query().cloned().unwrap_or_default();
        check(&self.get_school, &query)?;

        let school = match lookup {
            Lookup::Id(id) => self.schools.find_by_id(id).await?,
            Lookup::Key(name) => self.schools.find_one(&Filter::all().eq_ignore_case("name", name)).await?,
        };
        let Some(mut school) = school else {
            return Err(Failure::not_found(NOT_FOUND).into());
        };
        if !principal.owns(school.get("admin")) {
            return Err(Failure::forbidden(NOT_ADMIN).into());
        }

        self.expand(&mut school).await?;
        Ok(json!({ "school": school }))
    }

    async fn get_all_schools(&self, _input: CapabilityInput) -> Step<Value> {
        let mut schools = self.schools.find(&Filter::all()).await?;
        for school in &mut schools {
            self.expand(school).await?;
        }
        Ok(list(schools))
    }

    async fn delete_school(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let school = match id_or_key(&input, "name")? {
            Lookup::Id(id) => self.schools.find_by_id(id).await?,
            Lookup::Key(name) => self.schools.find_one(&Filter::all().eq_ignore_case("name", name)).await?,
        };
        let Some(school) = school else {
            return Err(Failure::not_found(NOT_FOUND).into());
        };
        if !principal.owns(school.get("admin")) {
            return Err(Failure::forbidden(NOT_ADMIN).into());
        }
        if has_references(&school, "classrooms") {
            return Err(Failure::forbidden("Forbidden, school has classrooms, please delete classrooms first").into());
        }

        let id = id_of(&school).unwrap_or_default();
        if self.schools.find_by_id_and_delete(id).await?.is_none() {
            // Deleted concurrently.
            return Err(Failure::not_found(NOT_FOUND).into());
        }
        tracing::info!(school_id = id, "school deleted");
        Ok(json!({ "message": "School successfully deleted" }))
    }

    /// Admin as `{name, email}` and classrooms as `{name}`.
    async fn expand(&self, school: &mut Document) -> Step<()> {
        populate(school, "admin", self.users.as_ref(), &["name", "email"]).await?;
        populate(school, "classrooms", self.classrooms.as_ref(), &["name"]).await?;
        Ok(())
    }
}

#[async_trait]
impl Module for SchoolManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn manifest(&self) -> &ExposureManifest {
        &self.manifest
    }

    async fn call(&self, capability: &str, input: CapabilityInput) -> anyhow::Result<Outcome> {
        finish(match capability {
            "createSchool" => self.create_school(input).await,
            "updateSchool" => self.update_school(input).await,
            "getSchool" => self.get_school(input).await,
            "getAllSchools" => self.get_all_schools(input).await,
            "deleteSchool" => self.delete_school(input).await,
            _ => Err(Failure::not_found("not found").into()),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
