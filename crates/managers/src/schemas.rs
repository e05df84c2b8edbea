//! Base field models and the per-entity rule-sets.

use campus_validation::{EntitySchema, FieldModel, FieldModels, FieldRule, FieldType};

pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,4}$";
pub const RECORD_ID_PATTERN: &str = "^[a-f0-9]{24}$";

pub fn base_models() -> FieldModels {
    FieldModels::new()
        .with("id", FieldModel::string("id"))
        .with("name", FieldModel::string("name").length(3.0, 20.0))
        .with("age", FieldModel::number("age").length(1.0, 100.0))
        .with("password", FieldModel::string("password").length(8.0, 100.0))
        .with("classroom", FieldModel::string("classroom").length(24.0, 24.0))
        .with("school", FieldModel::string("school").length(24.0, 24.0))
        .with("email", FieldModel::string("email").length(3.0, 100.0))
        .with("userType", FieldModel::string("userType").one_of(["admin", "superadmin"]))
        .with("address", FieldModel::string("address").length(10.0, 100.0))
        .with("mobileNumber", FieldModel::string("mobileNumber").length(8.0, 12.0))
}

pub fn entity_schemas() -> Vec<EntitySchema> {
    vec![user(), school(), classroom(), student()]
}

fn email() -> FieldRule {
    FieldRule::model("email").regex(EMAIL_PATTERN)
}

fn record_id(model: &str) -> FieldRule {
    FieldRule::model(model).regex(RECORD_ID_PATTERN)
}

fn user() -> EntitySchema {
    EntitySchema::new("user")
        .operation(
            "createUser",
            vec![
                FieldRule::model("name").required(),
                email().required(),
                FieldRule::model("password").required().min(6.0),
                FieldRule::model("userType").required().one_of(["admin", "superadmin"]),
            ],
        )
        .operation(
            "login",
            vec![email().required(), FieldRule::model("password").required()],
        )
}

fn school() -> EntitySchema {
    EntitySchema::new("school")
        .operation(
            "createSchool",
            vec![
                FieldRule::model("name").required(),
                FieldRule::model("address").required().length(10.0, 100.0),
                FieldRule::model("mobileNumber").required().length(8.0, 12.0),
            ],
        )
        .operation(
            "updateSchool",
            vec![
                FieldRule::model("name"),
                FieldRule::model("address").length(10.0, 100.0),
                FieldRule::model("mobileNumber").length(8.0, 12.0),
            ],
        )
        .operation("getSchool", vec![record_id("id"), FieldRule::model("name")])
}

fn classroom() -> EntitySchema {
    EntitySchema::new("classroom")
        .operation(
            "createClassroom",
            vec![
                FieldRule::model("name").required().length(1.0, 100.0),
                record_id("school").required(),
            ],
        )
        .operation(
            "updateClassroom",
            vec![
                record_id("id").error("Invalid classroom ID"),
                FieldRule::model("name").length(1.0, 100.0),
                record_id("school").error("Invalid school ID"),
            ],
        )
        .operation(
            "getClassroom",
            vec![record_id("id").required().error("Invalid classroom ID")],
        )
        .operation(
            "deleteClassroom",
            vec![record_id("id").error("Invalid classroom ID")],
        )
}

fn student() -> EntitySchema {
    let name = || FieldRule::model("name").length(1.0, 100.0);
    let age = || FieldRule::model("age").kind(FieldType::Number).min(1.0).max(100.0);
    let classroom = || record_id("classroom").error("Invalid classroom ID");
    let id = || record_id("id").error("Invalid student ID");

    EntitySchema::new("student")
        .operation(
            "createStudent",
            vec![name().required(), age().required(), email().required(), classroom().required()],
        )
        .operation("updateStudent", vec![name(), age(), classroom(), email()])
        .operation("getStudent", vec![id(), email()])
        .operation("deleteStudent", vec![id(), email()])
}
