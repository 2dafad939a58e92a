use mongodb::bson::{Bson, Document};

use super::filter::equality_fields;
use crate::store::DbError;

const SUPPORTED: &[&str] = &["$set", "$unset", "$inc"];

/// Reject update documents the store would refuse before touching any data.
pub fn validate_update(update: &Document) -> Result<(), DbError> {
    if update.is_empty() {
        return Err(DbError::invalid("update document must not be empty"));
    }
    for (operator, fields) in update {
        if !operator.starts_with('$') {
            return Err(DbError::invalid("update document requires atomic operators"));
        }
        if !SUPPORTED.contains(&operator.as_str()) {
            return Err(DbError::invalid(format!(
                "unknown modifier: {}",
                operator
            )));
        }
        if !matches!(fields, Bson::Document(_)) {
            return Err(DbError::invalid(format!(
                "modifiers operate on fields but we found a non-document for {}",
                operator
            )));
        }
    }
    Ok(())
}

/// Apply an operator update in place. Returns whether the document changed.
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<bool, DbError> {
    validate_update(update)?;
    let mut working = doc.clone();

    for (operator, fields) in update {
        let Bson::Document(fields) = fields else {
            continue;
        };
        for (path, value) in fields {
            if path == "_id" || path.starts_with("_id.") {
                let unchanged = operator == "$set" && doc.get("_id") == Some(value);
                if !unchanged {
                    return Err(DbError::invalid(
                        "performing an update on the path '_id' would modify the immutable field '_id'",
                    ));
                }
                continue;
            }
            match operator.as_str() {
                "$set" => set_path(&mut working, path, value.clone())?,
                "$unset" => remove_path(&mut working, path),
                "$inc" => increment(&mut working, path, value)?,
                other => return Err(DbError::invalid(format!("unknown modifier: {}", other))),
            }
        }
    }

    let modified = working != *doc;
    *doc = working;
    Ok(modified)
}

/// Build the document inserted by an upsert that matched nothing.
pub fn upsert_seed(filter: &Document, update: &Document) -> Result<Document, DbError> {
    let mut seed = Document::new();
    for (path, value) in equality_fields(filter) {
        set_path(&mut seed, path, value.clone())?;
    }
    apply_update(&mut seed, update)?;
    Ok(seed)
}

fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<(), DbError> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));
            match child {
                Bson::Document(inner) => set_path(inner, rest, value),
                other => Err(DbError::invalid(format!(
                    "cannot create field '{}' in element {{{}: {}}}",
                    rest, head, other
                ))),
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}

fn increment(doc: &mut Document, path: &str, by: &Bson) -> Result<(), DbError> {
    let current = super::filter::lookup_path(doc, path).cloned();
    let next = match (current, by) {
        (None, by @ (Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))) => by.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(a) + i64::from(*b)),
        },
        (Some(Bson::Int32(a)), Bson::Int64(b)) => {
            Bson::Int64(checked_long(i64::from(a).checked_add(*b), path)?)
        }
        (Some(Bson::Int64(a)), Bson::Int32(b)) => {
            Bson::Int64(checked_long(a.checked_add(i64::from(*b)), path)?)
        }
        (Some(Bson::Int64(a)), Bson::Int64(b)) => Bson::Int64(checked_long(a.checked_add(*b), path)?),
        (Some(Bson::Double(a)), Bson::Double(b)) => Bson::Double(a + b),
        (Some(Bson::Double(a)), Bson::Int32(b)) => Bson::Double(a + f64::from(*b)),
        (Some(Bson::Double(a)), Bson::Int64(b)) => Bson::Double(a + *b as f64),
        (Some(Bson::Int32(a)), Bson::Double(b)) => Bson::Double(f64::from(a) + b),
        (Some(Bson::Int64(a)), Bson::Double(b)) => Bson::Double(a as f64 + b),
        _ => {
            return Err(DbError::invalid(format!(
                "cannot apply $inc to field '{}' with a non-numeric value",
                path
            )));
        }
    };
    set_path(doc, path, next)
}

fn checked_long(sum: Option<i64>, path: &str) -> Result<i64, DbError> {
    sum.ok_or_else(|| {
        DbError::invalid(format!(
            "failed to apply $inc to field '{}': result would overflow a 64-bit integer",
            path
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn test_set_and_unset() {
        let mut doc = doc! { "name": "App1", "description": "Test", "owner": "a" };
        let modified = apply_update(
            &mut doc,
            &doc! { "$set": { "description": "New Description" }, "$unset": { "owner": "" } },
        )
        .unwrap();
        assert!(modified);
        assert_eq!(doc, doc! { "name": "App1", "description": "New Description" });
    }

    #[test]
    fn test_set_nested_path_creates_documents() {
        let mut doc = doc! { "name": "App1" };
        apply_update(&mut doc, &doc! { "$set": { "resources.cpu": 2 } }).unwrap();
        assert_eq!(doc, doc! { "name": "App1", "resources": { "cpu": 2 } });

        let err = apply_update(&mut doc, &doc! { "$set": { "name.first": "x" } }).unwrap_err();
        assert!(matches!(err, DbError::InvalidExpression(_)));
    }

    #[test]
    fn test_noop_update_reports_unmodified() {
        let mut doc = doc! { "name": "App1" };
        assert!(!apply_update(&mut doc, &doc! { "$set": { "name": "App1" } }).unwrap());
    }

    #[test]
    fn test_increment() {
        let mut doc = doc! { "height": 1, "ratio": 0.5 };
        apply_update(&mut doc, &doc! { "$inc": { "height": 2, "ratio": 1, "hits": 1_i64 } }).unwrap();
        assert_eq!(doc, doc! { "height": 3, "ratio": 1.5, "hits": 1_i64 });

        let mut doc = doc! { "name": "App1" };
        assert!(apply_update(&mut doc, &doc! { "$inc": { "name": 1 } }).is_err());
    }

    #[test]
    fn test_increment_overflow_is_rejected() {
        let original = doc! { "_id": 1, "hits": i64::MAX, "small": 1 };
        let mut doc = original.clone();

        for update in [
            doc! { "$inc": { "hits": 1_i64 } },
            doc! { "$inc": { "hits": 1 } },
            doc! { "$set": { "name": "App1" }, "$inc": { "small": i64::MAX, "hits": 1_i64 } },
        ] {
            let err = apply_update(&mut doc, &update).unwrap_err();
            assert!(matches!(err, DbError::InvalidExpression(_)));
            assert_eq!(doc, original);
        }

        let mut doc = doc! { "hits": i32::MAX };
        apply_update(&mut doc, &doc! { "$inc": { "hits": 1 } }).unwrap();
        assert_eq!(doc, doc! { "hits": i64::from(i32::MAX) + 1 });
    }

    #[test]
    fn test_rejects_replacement_and_unknown_operators() {
        let mut doc = doc! { "name": "App1" };
        assert!(apply_update(&mut doc, &doc! { "name": "App2" }).is_err());
        assert!(apply_update(&mut doc, &doc! { "$rename": { "name": "title" } }).is_err());
        assert!(apply_update(&mut doc, &doc! {}).is_err());
        assert_eq!(doc, doc! { "name": "App1" });
    }

    #[test]
    fn test_id_is_immutable() {
        let id = ObjectId::new();
        let mut doc = doc! { "_id": id, "name": "App1" };
        assert!(apply_update(&mut doc, &doc! { "$set": { "_id": ObjectId::new() } }).is_err());
        assert!(apply_update(&mut doc, &doc! { "$set": { "_id": id } }).is_ok());
        assert!(apply_update(&mut doc, &doc! { "$unset": { "_id": "" } }).is_err());
    }

    #[test]
    fn test_upsert_seed_uses_equality_fields() {
        let seed = upsert_seed(
            &doc! { "name": "App7", "height": { "$gt": 3 } },
            &doc! { "$set": { "description": "Seeded" } },
        )
        .unwrap();
        assert_eq!(seed, doc! { "name": "App7", "description": "Seeded" });
    }
}
