use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use campus_auth::Principal;
use campus_core::{Failure, Outcome};
use campus_dispatch::{CapabilityInput, ExposureManifest, Module, Verb};
use campus_infra::{Collection, Document, Filter, Update, populate};
use campus_validation::RecordValidator;

use super::{Step, caller, check, finish, has_references, id_of, list, pick, str_of};
use crate::injectable::Injectables;
use crate::loader::LoadError;
use crate::mws::{QUERY, SUPER_ADMIN, TOKEN};

const NOT_FOUND: &str = "Classroom not found";
const SCHOOL_NOT_FOUND: &str = "School not found";
const NOT_ADMIN: &str = "Forbidden, you are not the admin of this school";

pub struct ClassroomManager {
    manifest: ExposureManifest,
    classrooms: Arc<dyn Collection>,
    schools: Arc<dyn Collection>,
    students: Arc<dyn Collection>,
    users: Arc<dyn Collection>,
    create_classroom: RecordValidator,
    update_classroom: RecordValidator,
    get_classroom: RecordValidator,
    delete_classroom: RecordValidator,
}

impl ClassroomManager {
    pub const NAME: &'static str = "classroom";

    pub fn new(injectables: &Injectables) -> Result<Self, LoadError> {
        let validators = &injectables.validators;
        let collections = &injectables.collections;
        Ok(Self {
            manifest: ExposureManifest::builder()
                .expose_with(Verb::Post, "createClassroom", &[TOKEN])
                .expose_with(Verb::Patch, "updateClassroom", &[TOKEN, QUERY])
                .expose_with(Verb::Get, "getClassroom", &[TOKEN, QUERY])
                .expose_with(Verb::Get, "getAllClassrooms", &[TOKEN, SUPER_ADMIN])
                .expose_with(Verb::Delete, "deleteClassroom", &[TOKEN, QUERY])
                .build()?,
            classrooms: collections.classrooms.clone(),
            schools: collections.schools.clone(),
            students: collections.students.clone(),
            users: collections.users.clone(),
            create_classroom: validators.bind("classroom", "createClassroom")?,
            update_classroom: validators.bind("classroom", "updateClassroom")?,
            get_classroom: validators.bind("classroom", "getClassroom")?,
            delete_classroom: validators.bind("classroom", "deleteClassroom")?,
        })
    }

    /// The school stored under `school_id`, provided `principal` administers it.
    async fn owned_school(&self, principal: &Principal, school_id: &str, forbidden: &str) -> Step<Document> {
        let Some(school) = self.schools.find_by_id(school_id).await? else {
            return Err(Failure::not_found(SCHOOL_NOT_FOUND).into());
        };
        if !principal.owns(school.get("admin")) {
            return Err(Failure::forbidden(forbidden.to_string()).into());
        }
        Ok(school)
    }

    async fn create_classroom(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let mut classroom = pick(&input, &[("name", "name"), ("schoolId", "school")]);
        check(&self.create_classroom, &classroom)?;

        let name = input.str_field("name").unwrap_or_default();
        let school_id = input.str_field("schoolId").unwrap_or_default();
        self.owned_school(principal, school_id, NOT_ADMIN).await?;

        let clash = Filter::all().eq("name", name).eq("school", school_id);
        if self.classrooms.find_one(&clash).await?.is_some() {
            return Err(Failure::conflict("A classroom in the same school with this name already exists").into());
        }

        classroom.insert("students".into(), json!([]));
        let created = self.classrooms.create(classroom).await?;
        let classroom_id = id_of(&created).unwrap_or_default();
        self.schools
            .find_by_id_and_update(school_id, &Update::new().push("classrooms", classroom_id))
            .await?;
        tracing::info!(classroom_id, school_id, "classroom created");
        Ok(json!({ "createdClassroom": created }))
    }

    async fn update_classroom(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let Some(id) = input.query_str("id") else {
            return Err(Failure::bad_request("Id must be provided").into());
        };

        let fields = pick(&input, &[("name", "name"), ("schoolId", "school")]);
        if fields.is_empty() {
            return Err(Failure::bad_request("No fields provided to update").into());
        }
        let mut checked = fields.clone();
        checked.insert("id".into(), json!(id));
        check(&self.update_classroom, &checked)?;

        let Some(current) = self.classrooms.find_by_id(id).await? else {
            return Err(Failure::not_found(NOT_FOUND).into());
        };
        let current_school = str_of(&current, "school").unwrap_or_default().to_string();
        self.owned_school(
            principal,
            &current_school,
            "Forbidden, you are not the admin of the school that currently contains this classroom",
        )
        .await?;

        let target_school = input.str_field("schoolId").unwrap_or(&current_school).to_string();
        let moving = target_school != current_school;
        if moving {
            self.owned_school(principal, &target_school, "Forbidden, you are not the admin of the target school")
                .await?;
        }

        let name = input
            .str_field("name")
            .or_else(|| str_of(&current, "name"))
            .unwrap_or_default();
        let clash = Filter::all().eq("name", name).eq("school", target_school.as_str());
        if let Some(other) = self.classrooms.find_one(&clash).await? {
            if id_of(&other) != Some(id) {
                return Err(Failure::conflict("A classroom in the target school with this name already exists").into());
            }
        }

        let Some(updated) = self
            .classrooms
            .find_by_id_and_update(id, &Update::new().set_all(fields))
            .await?
        else {
            return Err(Failure::not_found(NOT_FOUND).into());
        };

        if moving {
            self.schools
                .find_by_id_and_update(&target_school, &Update::new().push("classrooms", id))
                .await?;
            self.schools
                .find_by_id_and_update(&current_school, &Update::new().pull("classrooms", id))
                .await?;
            tracing::info!(classroom_id = id, from = %current_school, to = %target_school, "classroom moved");
        }
        Ok(json!({ "updatedClassroom": updated }))
    }

    async fn get_classroom(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let query = input.query().cloned().unwrap_or_default();
        check(&self.get_classroom, &query)?;
        let id = input.query_str("id").unwrap_or_default();

        let Some(mut classroom) = self.classrooms.find_by_id(id).await? else {
            return Err(Failure::not_found(NOT_FOUND).into());
        };
        let school_id = str_of(&classroom, "school").unwrap_or_default().to_string();
        self.owned_school(principal, &school_id, NOT_ADMIN).await?;

        populate(&mut classroom, "school", self.schools.as_ref(), &["name", "admin"]).await?;
        if let Some(school) = classroom.get_mut("school").and_then(Value::as_object_mut) {
            populate(school, "admin", self.users.as_ref(), &["name", "email"]).await?;
        }
        populate(&mut classroom, "students", self.students.as_ref(), &["name"]).await?;
        Ok(json!({ "classroom": classroom }))
    }

    async fn get_all_classrooms(&self, _input: CapabilityInput) -> Step<Value> {
        let mut classrooms = self.classrooms.find(&Filter::all()).await?;
        for classroom in &mut classrooms {
            populate(classroom, "school", self.schools.as_ref(), &["name"]).await?;
            populate(classroom, "students", self.students.as_ref(), &["name"]).await?;
        }
        Ok(list(classrooms))
    }

    async fn delete_classroom(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let query = input.query().cloned().unwrap_or_default();
        check(&self.delete_classroom, &query)?;
        let Some(id) = input.query_str("id") else {
            return Err(Failure::bad_request("id must be provided").into());
        };

        let Some(classroom) = self.classrooms.find_by_id(id).await? else {
            return Err(Failure::not_found(NOT_FOUND).into());
        };
        let school_id = str_of(&classroom, "school").unwrap_or_default().to_string();
        self.owned_school(principal, &school_id, NOT_ADMIN).await?;
        if has_references(&classroom, "students") {
            return Err(Failure::conflict("Classroom has students, cannot be deleted, delete students first").into());
        }

        if self.classrooms.find_by_id_and_delete(id).await?.is_none() {
            return Err(Failure::not_found(NOT_FOUND).into());
        }
        self.schools
            .find_by_id_and_update(&school_id, &Update::new().pull("classrooms", id))
            .await?;
        tracing::info!(classroom_id = id, school_id = %school_id, "classroom deleted");
        Ok(json!({ "message": "Classroom successfully deleted" }))
    }
}

#[async_trait]
impl Module for ClassroomManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn manifest(&self) -> &ExposureManifest {
        &self.manifest
    }

    async fn call(&self, capability: &str, input: CapabilityInput) -> anyhow::Result<Outcome> {
        finish(match capability {
            "createClassroom" => self.create_classroom(input).await,
            "updateClassroom" => self.update_classroom(input).await,
            "getClassroom" => self.get_classroom(input).await,
            "getAllClassrooms" => self.get_all_classrooms(input).await,
            "deleteClassroom" => self.delete_classroom(input).await,
            _ => Err(Failure::not_found("not found").into()),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
