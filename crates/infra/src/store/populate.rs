//! Replace stored references with projections of the referenced documents.

use serde_json::{Map, Value};

use super::{Collection, Document, StoreError};

/// Resolve the reference(s) stored at `field` against `from`, keeping only
/// `_id` and the `select`ed fields.
///
/// A single reference that no longer resolves becomes `null`; unresolved
/// entries of a reference array are dropped.
pub async fn populate(
    doc: &mut Document,
    field: &str,
    from: &dyn Collection,
    select: &[&str],
) -> Result<(), StoreError> {
    let Some(current) = doc.get(field).cloned() else {
        return Ok(());
    };
    let populated = match current {
        Value::String(id) => match from.find_by_id(&id).await? {
            Some(found) => Value::Object(project(&found, select)),
            None => Value::Null,
        },
        Value::Array(ids) => {
            let mut out = Vec::with_capacity(ids.len());
            for id in ids.iter().filter_map(Value::as_str) {
                if let Some(found) = from.find_by_id(id).await? {
                    out.push(Value::Object(project(&found, select)));
                }
            }
            Value::Array(out)
        }
        other => other,
    };
    doc.insert(field.to_string(), populated);
    Ok(())
}

fn project(doc: &Document, select: &[&str]) -> Map<String, Value> {
    let mut out = Map::new();
    if let Some(id) = doc.get("_id") {
        out.insert("_id".into(), id.clone());
    }
    for key in select {
        if let Some(v) = doc.get(*key) {
            out.insert((*key).to_string(), v.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCollection;
    use serde_json::json;

    #[tokio::test]
    async fn populates_single_and_array_references() {
        let users = InMemoryCollection::new("users");
        let classrooms = InMemoryCollection::new("classrooms");
        let admin = users
            .create(json!({"name": "Ada", "email": "a@x.io", "password": "secret"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        let room = classrooms
            .create(json!({"name": "1A", "students": []}).as_object().cloned().unwrap())
            .await
            .unwrap();

        let mut school = json!({
            "name": "Hill",
            "admin": admin["_id"],
            "classrooms": [room["_id"], "000000000000000000000000"],
        })
        .as_object()
        .cloned()
        .unwrap();

        populate(&mut school, "admin", &users, &["name", "email"]).await.unwrap();
        populate(&mut school, "classrooms", &classrooms, &["name"]).await.unwrap();

        assert_eq!(school["admin"], json!({"_id": admin["_id"], "name": "Ada", "email": "a@x.io"}));
        assert_eq!(school["classrooms"], json!([{"_id": room["_id"], "name": "1A"}]));
    }
}
