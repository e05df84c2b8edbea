use serde::{Deserialize, Serialize};
use serde_json::Value;

use campus_core::RecordId;

use crate::UserType;

/// The authenticated caller, resolved from a verified token and the stored
/// user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
}

impl Principal {
    pub fn is_super_admin(&self) -> bool {
        self.user_type == UserType::SuperAdmin
    }

    /// Build a principal from a stored user record; `None` if the record
    /// lacks any of the identity fields.
    pub fn from_record(record: &Value) -> Option<Self> {
        let id = record.get("_id")?.as_str()?.parse().ok()?;
        let user_type = record.get("userType")?.as_str()?.parse().ok()?;
        Some(Self {
            id,
            name: record.get("name")?.as_str()?.to_string(),
            email: record.get("email")?.as_str()?.to_string(),
            user_type,
        })
    }

    /// Whether this principal is the record id stored under `owner`.
    pub fn owns(&self, owner: Option<&Value>) -> bool {
        owner.and_then(Value::as_str) == Some(self.id.as_str())
    }
}
