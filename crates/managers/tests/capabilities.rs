//! End-to-end capability scenarios through the api handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use campus_core::Record;
use campus_dispatch::{InboundCall, Response, Verb};
use campus_infra::{Collection, Collections, Document, Filter, InMemoryCollection, StoreError, Update};
use campus_managers::{Config, Managers, ManagersLoader};

/// Counts every call before delegating to an in-memory collection.
struct Spy {
    inner: InMemoryCollection,
    calls: AtomicUsize,
}

impl Spy {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryCollection::new(name),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Collection for Spy {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.touch();
        self.inner.find_by_id(id).await
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.touch();
        self.inner.find_one(filter).await
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.touch();
        self.inner.find(filter).await
    }

    async fn create(&self, doc: Record) -> Result<Document, StoreError> {
        self.touch();
        self.inner.create(doc).await
    }

    async fn find_by_id_and_update(&self, id: &str, update: &Update) -> Result<Option<Document>, StoreError> {
        self.touch();
        self.inner.find_by_id_and_update(id, update).await
    }

    async fn find_by_id_and_delete(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.touch();
        self.inner.find_by_id_and_delete(id).await
    }

    async fn delete_one(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.touch();
        self.inner.delete_one(filter).await
    }
}

struct Harness {
    managers: Managers,
    users: Arc<Spy>,
    schools: Arc<Spy>,
}

impl Harness {
    fn new() -> Self {
        let users = Spy::new("users");
        let schools = Spy::new("schools");
        let collections = Collections {
            users: users.clone(),
            schools: schools.clone(),
            classrooms: Arc::new(InMemoryCollection::new("classrooms")),
            students: Arc::new(InMemoryCollection::new("students")),
        };
        let managers = ManagersLoader::with_collections(Config::for_tests(), collections)
            .unwrap()
            .load()
            .unwrap();
        Self { managers, users, schools }
    }

    async fn call(&self, verb: Verb, module: &str, capability: &str, token: Option<&str>, body: Value, query: Value) -> Response {
        let mut call = InboundCall::new(module, capability, verb)
            .with_body(body.as_object().cloned().unwrap_or_default())
            .with_query(query.as_object().cloned().unwrap_or_default());
        if let Some(token) = token {
            call = call.with_header("token", token);
        }
        self.managers.api.dispatch(call).await
    }

    /// Sign up and log in; returns the token.
    async fn user(&self, name: &str, email: &str, user_type: &str) -> String {
        let res = self
            .call(
                Verb::Post,
                "user",
                "signup",
                None,
                json!({"name": name, "email": email, "password": "s3cret-pass", "userType": user_type}),
                json!({}),
            )
            .await;
        assert_eq!(res.status, 200, "{:?}", res.envelope);
        let res = self
            .call(Verb::Post, "user", "login", None, json!({"email": email, "password": "s3cret-pass"}), json!({}))
            .await;
        assert_eq!(res.status, 200, "{:?}", res.envelope);
        data(&res)["token"].as_str().unwrap().to_string()
    }

    async fn school(&self, root: &str, admin_email: &str, name: &str) -> String {
        let res = self
            .call(
                Verb::Post,
                "school",
                "createSchool",
                Some(root),
                json!({"name": name, "address": "12 Long Street", "mobileNumber": "0123456789", "adminEmail": admin_email}),
                json!({}),
            )
            .await;
        assert_eq!(res.status, 200, "{:?}", res.envelope);
        data(&res)["createdSchool"]["_id"].as_str().unwrap().to_string()
    }
}

fn data(res: &Response) -> &Value {
    res.envelope.data.as_ref().unwrap()
}

fn errors(res: &Response) -> &Value {
    res.envelope.errors.as_ref().unwrap()
}

#[tokio::test]
async fn invalid_signup_never_touches_persistence() {
    let h = Harness::new();
    let res = h
        .call(
            Verb::Post,
            "user",
            "signup",
            None,
            json!({"name": "Jo", "email": "jo@x.com", "password": "short"}),
            json!({}),
        )
        .await;
    assert_eq!(res.status, 400);
    assert!(!res.envelope.ok);
    assert_eq!(errors(&res)["password"], json!("password must be at least 6 characters long"));
    assert_eq!(h.users.calls(), 0);
}

#[tokio::test]
async fn signup_hides_the_password_and_rejects_duplicates() {
    let h = Harness::new();
    let body = json!({"name": "Grace", "email": "grace@x.com", "password": "hopper-1906", "userType": "admin"});
    let res = h.call(Verb::Post, "user", "signup", None, body.clone(), json!({})).await;
    assert_eq!(res.status, 200);
    let created = &data(&res)["createdUser"];
    assert_eq!(created["email"], json!("grace@x.com"));
    assert!(created.get("password").is_none());

    let res = h.call(Verb::Post, "user", "signup", None, body, json!({})).await;
    assert_eq!(res.status, 409);
    assert_eq!(errors(&res), &json!("Email already in use"));
}

#[tokio::test]
async fn login_rejects_bad_credentials_uniformly() {
    let h = Harness::new();
    h.user("Grace", "grace@x.com", "admin").await;
    for body in [
        json!({"email": "grace@x.com", "password": "wrong-password"}),
        json!({"email": "nobody@x.com", "password": "s3cret-pass"}),
    ] {
        let res = h.call(Verb::Post, "user", "login", None, body, json!({})).await;
        assert_eq!(res.status, 401);
        assert_eq!(errors(&res), &json!("Incorrect username or password"));
    }
}

#[tokio::test]
async fn verb_mismatch_is_not_found() {
    let h = Harness::new();
    let res = h.call(Verb::Get, "classroom", "createClassroom", None, json!({}), json!({})).await;
    assert_eq!(res.status, 404);
    let res = h.call(Verb::Post, "token", "gen_long_token", None, json!({}), json!({})).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn token_middleware_halts_before_the_capability() {
    let h = Harness::new();
    let before = h.schools.calls();
    for token in [None, Some("not-a-token")] {
        let res = h
            .call(Verb::Post, "school", "createSchool", token, json!({"name": "Hill"}), json!({}))
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(errors(&res), &json!("unauthorized"));
    }
    assert_eq!(h.schools.calls(), before);
}

#[tokio::test]
async fn only_superadmins_create_schools() {
    let h = Harness::new();
    let admin = h.user("Grace", "grace@x.com", "admin").await;
    let res = h
        .call(Verb::Post, "school", "createSchool", Some(&admin), json!({"name": "Hill"}), json!({}))
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(errors(&res), &json!("forbidden, this actions needs a superadmin"));
    assert_eq!(h.schools.calls(), 0);
}

#[tokio::test]
async fn school_lifecycle_with_ownership() {
    let h = Harness::new();
    let root = h.user("Root", "root@x.com", "superadmin").await;
    let admin = h.user("Grace", "grace@x.com", "admin").await;
    let other = h.user("Alan", "alan@x.com", "admin").await;
    let school = h.school(&root, "grace@x.com", "Hill Valley").await;

    // Duplicate name.
    let res = h
        .call(
            Verb::Post,
            "school",
            "createSchool",
            Some(&root),
            json!({"name": "Hill Valley", "address": "12 Long Street", "mobileNumber": "0123456789", "adminEmail": "grace@x.com"}),
            json!({}),
        )
        .await;
    assert_eq!(res.status, 409);

    // Lookup by name is case-insensitive and populates the admin.
    let res = h
        .call(Verb::Get, "school", "getSchool", Some(&admin), json!({}), json!({"name": "hill valley"}))
        .await;
    assert_eq!(res.status, 200, "{:?}", res.envelope);
    assert_eq!(data(&res)["school"]["admin"]["email"], json!("grace@x.com"));

    // Exactly one lookup key.
    let res = h
        .call(Verb::Get, "school", "getSchool", Some(&admin), json!({}), json!({"id": school, "name": "Hill Valley"}))
        .await;
    assert_eq!(res.status, 400);

    // Non-admins are refused.
    let res = h
        .call(Verb::Get, "school", "getSchool", Some(&other), json!({}), json!({"id": school}))
        .await;
    assert_eq!(res.status, 403);
    assert_eq!(errors(&res), &json!("Forbidden, you are not the school admin"));

    let res = h
        .call(Verb::Patch, "school", "updateSchool", Some(&admin), json!({}), json!({"id": school}))
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(errors(&res), &json!("No fields provided to update"));

    let res = h
        .call(
            Verb::Patch,
            "school",
            "updateSchool",
            Some(&admin),
            json!({"address": "99 Short Avenue"}),
            json!({"id": school}),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(data(&res)["updatedSchool"]["address"], json!("99 Short Avenue"));

    let res = h
        .call(Verb::Get, "school", "getAllSchools", Some(&root), json!({}), json!({}))
        .await;
    assert_eq!(data(&res)["totalCount"], json!(1));
}

#[tokio::test]
async fn deleting_twice_is_not_found() {
    let h = Harness::new();
    let root = h.user("Root", "root@x.com", "superadmin").await;
    let admin = h.user("Grace", "grace@x.com", "admin").await;
    let school = h.school(&root, "grace@x.com", "Hill Valley").await;

    let res = h
        .call(Verb::Delete, "school", "deleteSchool", Some(&admin), json!({}), json!({"id": school}))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(data(&res)["message"], json!("School successfully deleted"));

    let res = h
        .call(Verb::Delete, "school", "deleteSchool", Some(&admin), json!({}), json!({"id": school}))
        .await;
    assert_eq!(res.status, 404);
    assert_eq!(errors(&res), &json!("School not found"));
}

#[tokio::test]
async fn classrooms_and_students_keep_reference_lists_in_step() {
    let h = Harness::new();
    let root = h.user("Root", "root@x.com", "superadmin").await;
    let admin = h.user("Grace", "grace@x.com", "admin").await;
    let school = h.school(&root, "grace@x.com", "Hill Valley").await;

    let res = h
        .call(
            Verb::Post,
            "classroom",
            "createClassroom",
            Some(&admin),
            json!({"name": "7B", "schoolId": school}),
            json!({}),
        )
        .await;
    assert_eq!(res.status, 200, "{:?}", res.envelope);
    let classroom = data(&res)["createdClassroom"]["_id"].as_str().unwrap().to_string();

    let res = h
        .call(
            Verb::Post,
            "classroom",
            "createClassroom",
            Some(&admin),
            json!({"name": "7B", "schoolId": school}),
            json!({}),
        )
        .await;
    assert_eq!(res.status, 409);

    // The school now refuses deletion.
    let res = h
        .call(Verb::Delete, "school", "deleteSchool", Some(&admin), json!({}), json!({"id": school}))
        .await;
    assert_eq!(res.status, 403);

    let res = h
        .call(
            Verb::Post,
            "student",
            "createStudent",
            Some(&admin),
            json!({"name": "Marty", "age": 17, "email": "marty@x.com", "classroomId": classroom}),
            json!({}),
        )
        .await;
    assert_eq!(res.status, 200, "{:?}", res.envelope);
    let student = data(&res)["createdStudent"]["_id"].as_str().unwrap().to_string();

    let res = h
        .call(Verb::Get, "classroom", "getClassroom", Some(&admin), json!({}), json!({"id": classroom}))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(data(&res)["classroom"]["students"][0]["name"], json!("Marty"));
    assert_eq!(data(&res)["classroom"]["school"]["admin"]["name"], json!("Grace"));

    let res = h
        .call(Verb::Delete, "classroom", "deleteClassroom", Some(&admin), json!({}), json!({"id": classroom}))
        .await;
    assert_eq!(res.status, 409);

    let res = h
        .call(Verb::Get, "student", "getStudent", Some(&admin), json!({}), json!({"email": "MARTY@x.com"}))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(data(&res)["student"]["classroom"]["name"], json!("7B"));

    let res = h
        .call(Verb::Delete, "student", "deleteStudent", Some(&admin), json!({}), json!({"id": student}))
        .await;
    assert_eq!(res.status, 200);
    let res = h
        .call(Verb::Delete, "classroom", "deleteClassroom", Some(&admin), json!({}), json!({"id": classroom}))
        .await;
    assert_eq!(res.status, 200);
    let res = h
        .call(Verb::Delete, "school", "deleteSchool", Some(&admin), json!({}), json!({"name": "Hill Valley"}))
        .await;
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn forged_framework_fields_are_ignored() {
    let h = Harness::new();
    let admin = h.user("Grace", "grace@x.com", "admin").await;
    let res = h
        .call(
            Verb::Get,
            "school",
            "getAllSchools",
            Some(&admin),
            json!({"__isSuperAdmin": true, "__token": {"userType": "superadmin"}}),
            json!({}),
        )
        .await;
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn school_names_are_unique_regardless_of_case() {
    let h = Harness::new();
    let root = h.user("Root", "root@x.com", "superadmin").await;
    let grace = h.user("Grace", "grace@x.com", "admin").await;
    h.user("Alan", "alan@x.com", "admin").await;
    let school = h.school(&root, "grace@x.com", "Hill Valley").await;

    let res = h
        .call(
            Verb::Post,
            "school",
            "createSchool",
            Some(&root),
            json!({"name": "hill valley", "address": "12 Long Street", "mobileNumber": "0123456789", "adminEmail": "alan@x.com"}),
            json!({}),
        )
        .await;
    assert_eq!(res.status, 409);
    assert_eq!(errors(&res), &json!("A school with this name already exists"));

    let res = h
        .call(Verb::Delete, "school", "deleteSchool", Some(&grace), json!({}), json!({"name": "HILL VALLEY"}))
        .await;
    assert_eq!(res.status, 200, "{:?}", res.envelope);

    let res = h
        .call(Verb::Delete, "school", "deleteSchool", Some(&grace), json!({}), json!({"id": school}))
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn student_emails_are_unique_regardless_of_case() {
    let h = Harness::new();
    let root = h.user("Root", "root@x.com", "superadmin").await;
    let admin = h.user("Grace", "grace@x.com", "admin").await;
    let school = h.school(&root, "grace@x.com", "Hill Valley").await;
    let res = h
        .call(
            Verb::Post,
            "classroom",
            "createClassroom",
            Some(&admin),
            json!({"name": "7B", "schoolId": school}),
            json!({}),
        )
        .await;
    assert_eq!(res.status, 200, "{:?}", res.envelope);
    let classroom = data(&res)["createdClassroom"]["_id"].as_str().unwrap().to_string();

    let mut ids = Vec::new();
    for email in ["Kid@x.com", "other@x.com"] {
        let res = h
            .call(
                Verb::Post,
                "student",
                "createStudent",
                Some(&admin),
                json!({"name": "Kid", "age": 12, "email": email, "classroomId": classroom}),
                json!({}),
            )
            .await;
        assert_eq!(res.status, 200, "{:?}", res.envelope);
        ids.push(data(&res)["createdStudent"]["_id"].as_str().unwrap().to_string());
    }

    let res = h
        .call(
            Verb::Post,
            "student",
            "createStudent",
            Some(&admin),
            json!({"name": "Kid", "age": 12, "email": "kid@x.com", "classroomId": classroom}),
            json!({}),
        )
        .await;
    assert_eq!(res.status, 409);

    // Another student may not take the address in a different case.
    let res = h
        .call(
            Verb::Put,
            "student",
            "updateStudent",
            Some(&admin),
            json!({"email": "KID@x.com"}),
            json!({"id": ids[1]}),
        )
        .await;
    assert_eq!(res.status, 409);

    // Re-casing one's own address is not a clash.
    let res = h
        .call(
            Verb::Put,
            "student",
            "updateStudent",
            Some(&admin),
            json!({"email": "kid@x.com"}),
            json!({"id": ids[0]}),
        )
        .await;
    assert_eq!(res.status, 200, "{:?}", res.envelope);

    let res = h
        .call(Verb::Get, "student", "getStudent", Some(&admin), json!({}), json!({"email": "KID@X.COM"}))
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(data(&res)["student"]["_id"], json!(ids[0]));
}
