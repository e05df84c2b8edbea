use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use campus_core::{Record, RecordId};

use super::{Collection, Document, Filter, StoreError, Update};

/// In-memory collection for tests/dev. Documents keep insertion order.
#[derive(Debug)]
pub struct InMemoryCollection {
    name: String,
    inner: RwLock<Vec<Document>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned(&self) -> StoreError {
        StoreError::Poisoned(self.name.clone())
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

#[async_trait]
impl Collection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self.inner.read().map_err(|_| self.poisoned())?;
        Ok(docs.iter().find(|d| id_of(d) == Some(id)).cloned())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let docs = self.inner.read().map_err(|_| self.poisoned())?;
        Ok(docs.iter().find(|d| filter.matches(d)).cloned())
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let docs = self.inner.read().map_err(|_| self.poisoned())?;
        Ok(docs.iter().filter(|d| filter.matches(d)).cloned().collect())
    }

    async fn create(&self, mut doc: Record) -> Result<Document, StoreError> {
        let id = match doc.get("_id") {
            None | Some(Value::Null) => RecordId::new().to_string(),
            Some(Value::String(s)) if RecordId::is_valid(s) => s.clone(),
            Some(other) => {
                return Err(StoreError::InvalidDocument {
                    collection: self.name.clone(),
                    message: format!("_id must be a record id, got {other}"),
                });
            }
        };

        let mut docs = self.inner.write().map_err(|_| self.poisoned())?;
        if docs.iter().any(|d| id_of(d) == Some(id.as_str())) {
            return Err(StoreError::InvalidDocument {
                collection: self.name.clone(),
                message: format!("duplicate _id {id}"),
            });
        }

        let ts = now();
        doc.insert("_id".into(), Value::String(id));
        doc.insert("createdAt".into(), ts.clone());
        doc.insert("updatedAt".into(), ts);
        docs.push(doc.clone());
        tracing::debug!(collection = %self.name, "document created");
        Ok(doc)
    }

    async fn find_by_id_and_update(&self, id: &str, update: &Update) -> Result<Option<Document>, StoreError> {
        let mut docs = self.inner.write().map_err(|_| self.poisoned())?;
        let Some(doc) = docs.iter_mut().find(|d| id_of(d) == Some(id)) else {
            return Ok(None);
        };
        update.apply_to(doc);
        doc.insert("updatedAt".into(), now());
        Ok(Some(doc.clone()))
    }

    async fn find_by_id_and_delete(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let mut docs = self.inner.write().map_err(|_| self.poisoned())?;
        let pos = docs.iter().position(|d| id_of(d) == Some(id));
        Ok(pos.map(|i| docs.remove(i)))
    }

    async fn delete_one(&self, filter: &Filter) -> Result<u64, StoreError> {
        let mut docs = self.inner.write().map_err(|_| self.poisoned())?;
        match docs.iter().position(|d| filter.matches(d)) {
            Some(i) => {
                docs.remove(i);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamps() {
        let users = InMemoryCollection::new("users");
        let doc = users.create(record(json!({"email": "a@b.co"}))).await.unwrap();
        let id = doc["_id"].as_str().unwrap();
        assert!(RecordId::is_valid(id));
        assert!(doc.contains_key("createdAt"));
        assert_eq!(users.find_by_id(id).await.unwrap(), Some(doc.clone()));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_malformed_or_duplicate_ids() {
        let users = InMemoryCollection::new("users");
        assert!(users.create(record(json!({"_id": 7}))).await.is_err());
        let id = RecordId::new().to_string();
        users.create(record(json!({"_id": id}))).await.unwrap();
        assert!(users.create(record(json!({"_id": id}))).await.is_err());
    }

    #[tokio::test]
    async fn lookups_of_missing_records_are_not_errors() {
        let users = InMemoryCollection::new("users");
        assert_eq!(users.find_by_id("nope").await.unwrap(), None);
        assert_eq!(users.find_one(&Filter::all().eq("email", "x")).await.unwrap(), None);
        assert!(users.find(&Filter::all()).await.unwrap().is_empty());
        assert_eq!(
            users.find_by_id_and_update("nope", &Update::new().set("a", 1)).await.unwrap(),
            None
        );
        assert_eq!(users.find_by_id_and_delete("nope").await.unwrap(), None);
        assert_eq!(users.delete_one(&Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_returns_new_document() {
        let schools = InMemoryCollection::new("schools");
        let doc = schools.create(record(json!({"name": "A"}))).await.unwrap();
        let id = doc["_id"].as_str().unwrap();
        let updated = schools
            .find_by_id_and_update(id, &Update::new().set("name", "B").push("classrooms", "c1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], json!("B"));
        assert_eq!(updated["classrooms"], json!(["c1"]));
    }

    #[tokio::test]
    async fn delete_twice_finds_nothing_the_second_time() {
        let students = InMemoryCollection::new("students");
        let doc = students.create(record(json!({"email": "s@x.io"}))).await.unwrap();
        let id = doc["_id"].as_str().unwrap();
        assert!(students.find_by_id_and_delete(id).await.unwrap().is_some());
        assert!(students.find_by_id_and_delete(id).await.unwrap().is_none());

        students.create(record(json!({"email": "t@x.io"}))).await.unwrap();
        let by_email = Filter::all().eq("email", "t@x.io");
        assert_eq!(students.delete_one(&by_email).await.unwrap(), 1);
        assert_eq!(students.delete_one(&by_email).await.unwrap(), 0);
    }
}
