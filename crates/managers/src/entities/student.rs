use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use campus_auth::Principal;
use campus_core::{Failure, Outcome};
use campus_dispatch::{CapabilityInput, ExposureManifest, Module, Verb};
use campus_infra::{Collection, Document, Filter, Update, populate};
use campus_validation::RecordValidator;

use super::{Lookup, Step, caller, check, finish, id_of, id_or_key, list, pick, str_of};
use crate::injectable::Injectables;
use crate::loader::LoadError;
use crate::mws::{QUERY, SUPER_ADMIN, TOKEN};

const NOT_FOUND: &str = "Student not found";
const CLASSROOM_NOT_FOUND: &str = "Classroom not found";
const DUPLICATE_EMAIL: &str = "A student with this email already exists";
const NOT_ADMIN: &str = "Forbidden, you are not the admin of the school associated with this student";

pub struct StudentManager {
    manifest: ExposureManifest,
    students: Arc<dyn Collection>,
    classrooms: Arc<dyn Collection>,
    schools: Arc<dyn Collection>,
    create_student: RecordValidator,
    update_student: RecordValidator,
    get_student: RecordValidator,
    delete_student: RecordValidator,
}

impl StudentManager {
    pub const NAME: &'static str = "student";

    pub fn new(injectables: &Injectables) -> Result<Self, LoadError> {
        let validators = &injectables.validators;
        let collections = &injectables.collections;
        Ok(Self {
            manifest: ExposureManifest::builder()
                .expose_with(Verb::Post, "createStudent", &[TOKEN])
                .expose_with(Verb::Put, "updateStudent", &[TOKEN, QUERY])
                .expose_with(Verb::Get, "getStudent", &[TOKEN, QUERY])
                .expose_with(Verb::Get, "getAllStudents", &[TOKEN, SUPER_ADMIN])
                .expose_with(Verb::Delete, "deleteStudent", &[TOKEN, QUERY])
                .build()?,
            students: collections.students.clone(),
            classrooms: collections.classrooms.clone(),
            schools: collections.schools.clone(),
            create_student: validators.bind("student", "createStudent")?,
            update_student: validators.bind("student", "updateStudent")?,
            get_student: validators.bind("student", "getStudent")?,
            delete_student: validators.bind("student", "deleteStudent")?,
        })
    }

    /// Succeeds when `principal` administers the school owning `classroom_id`.
    async fn authorize_classroom(&self, principal: &Principal, classroom_id: &str, forbidden: &str) -> Step<()> {
        let Some(classroom) = self.classrooms.find_by_id(classroom_id).await? else {
            return Err(Failure::not_found(CLASSROOM_NOT_FOUND).into());
        };
        let school_id = str_of(&classroom, "school").unwrap_or_default();
        let Some(school) = self.schools.find_by_id(school_id).await? else {
            return Err(Failure::not_found("School not found").into());
        };
        if !principal.owns(school.get("admin")) {
            return Err(Failure::forbidden(forbidden.to_string()).into());
        }
        Ok(())
    }

    async fn find(&self, lookup: Lookup<'_>) -> Step<Document> {
        let found = match lookup {
            Lookup::Id(id) => self.students.find_by_id(id).await?,
            Lookup::Key(email) => self.students.find_one(&Filter::all().eq_ignore_case("email", email)).await?,
        };
        found.ok_or_else(|| Failure::not_found(NOT_FOUND).into())
    }

    async fn create_student(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let student = pick(
            &input,
            &[("name", "name"), ("age", "age"), ("email", "email"), ("classroomId", "classroom")],
        );
        check(&self.create_student, &student)?;

        let email = input.str_field("email").unwrap_or_default();
        if self.students.find_one(&Filter::all().eq_ignore_case("email", email)).await?.is_some() {
            return Err(Failure::conflict(DUPLICATE_EMAIL).into());
        }
        let classroom_id = input.str_field("classroomId").unwrap_or_default();
        self.authorize_classroom(
            principal,
            classroom_id,
            "Forbidden, you are not the admin of the school associated with this classroom",
        )
        .await?;

        let created = self.students.create(student).await?;
        let student_id = id_of(&created).unwrap_or_default();
        self.classrooms
            .find_by_id_and_update(classroom_id, &Update::new().push("students", student_id))
            .await?;
        tracing::info!(student_id, classroom_id, "student created");
        Ok(json!({ "createdStudent": created }))
    }

    async fn update_student(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let Some(id) = input.query_str("id") else {
            return Err(Failure::bad_request("Id must be provided").into());
        };

        let fields = pick(
            &input,
            &[("name", "name"), ("email", "email"), ("age", "age"), ("classroomId", "classroom")],
        );
        if fields.is_empty() {
            return Err(Failure::bad_request("No fields provided to update").into());
        }
        check(&self.update_student, &fields)?;

        let current = self.find(Lookup::Id(id)).await?;
        let unchanged = |e: &str| str_of(&current, "email").is_some_and(|c| c.to_lowercase() == e.to_lowercase());
        if let Some(email) = input.str_field("email").filter(|e| !unchanged(e)) {
            if self.students.find_one(&Filter::all().eq_ignore_case("email", email)).await?.is_some() {
                return Err(Failure::conflict(DUPLICATE_EMAIL).into());
            }
        }

        let current_classroom = str_of(&current, "classroom").unwrap_or_default().to_string();
        self.authorize_classroom(principal, &current_classroom, NOT_ADMIN).await?;

        let target_classroom = input.str_field("classroomId").unwrap_or(&current_classroom).to_string();
        let moving = target_classroom != current_classroom;
        if moving {
            self.authorize_classroom(
                principal,
                &target_classroom,
                "Forbidden, you are not the admin of the school associated with this classroom",
            )
            .await?;
        }

        let Some(updated) = self
            .students
            .find_by_id_and_update(id, &Update::new().set_all(fields))
            .await?
        else {
            return Err(Failure::not_found(NOT_FOUND).into());
        };

        if moving {
            self.classrooms
                .find_by_id_and_update(&target_classroom, &Update::new().push("students", id))
                .await?;
            self.classrooms
                .find_by_id_and_update(&current_classroom, &Update::new().pull("students", id))
                .await?;
        }
        Ok(json!({ "updatedStudent": updated }))
    }

    async fn get_student(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let lookup = id_or_key(&input, "email")?;
        let query = input.query().cloned().unwrap_or_default();
        check(&self.get_student, &query)?;

        let mut student = self.find(lookup).await?;
        let classroom_id = str_of(&student, "classroom").unwrap_or_default().to_string();
        self.authorize_classroom(principal, &classroom_id, NOT_ADMIN).await?;

        populate(&mut student, "classroom", self.classrooms.as_ref(), &["name", "school"]).await?;
        Ok(json!({ "student": student }))
    }

    async fn get_all_students(&self, _input: CapabilityInput) -> Step<Value> {
        let mut students = self.students.find(&Filter::all()).await?;
        for student in &mut students {
            populate(student, "classroom", self.classrooms.as_ref(), &["name", "school"]).await?;
            if let Some(classroom) = student.get_mut("classroom").and_then(Value::as_object_mut) {
                populate(classroom, "school", self.schools.as_ref(), &["name"]).await?;
            }
        }
        Ok(list(students))
    }

    async fn delete_student(&self, input: CapabilityInput) -> Step<Value> {
        let principal = caller(&input)?;
        let lookup = id_or_key(&input, "email")?;
        let query = input.query().cloned().unwrap_or_default();
        check(&self.delete_student, &query)?;

        let student = self.find(lookup).await?;
        let classroom_id = str_of(&student, "classroom").unwrap_or_default().to_string();
        self.authorize_classroom(principal, &classroom_id, NOT_ADMIN).await?;

        let id = id_of(&student).unwrap_or_default();
        if self.students.find_by_id_and_delete(id).await?.is_none() {
            return Err(Failure::not_found(NOT_FOUND).into());
        }
        self.classrooms
            .find_by_id_and_update(&classroom_id, &Update::new().pull("students", id))
            .await?;
        tracing::info!(student_id = id, classroom_id = %classroom_id, "student deleted");
        Ok(json!({ "message": "Student successfully deleted" }))
    }
}

#[async_trait]
impl Module for StudentManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn manifest(&self) -> &ExposureManifest {
        &self.manifest
    }

    async fn call(&self, capability: &str, input: CapabilityInput) -> anyhow::Result<Outcome> {
        finish(match capability {
            "createStudent" => self.create_student(input).await,
            "updateStudent" => self.update_student(input).await,
            "getStudent" => self.get_student(input).await,
            "getAllStudents" => self.get_all_students(input).await,
            "deleteStudent" => self.delete_student(input).await,
            _ => Err(Failure::not_found("not found").into()),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
