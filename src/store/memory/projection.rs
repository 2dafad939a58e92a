use mongodb::bson::{Bson, Document};

use crate::store::DbError;

fn flag(field: &str, value: &Bson) -> Result<bool, DbError> {
    match value {
        Bson::Boolean(b) => Ok(*b),
        Bson::Int32(n) => Ok(*n != 0),
        Bson::Int64(n) => Ok(*n != 0),
        Bson::Double(n) => Ok(*n != 0.0),
        other => Err(DbError::invalid(format!(
            "unsupported projection value {} for field '{}'",
            other, field
        ))),
    }
}

/// Apply a top-level inclusion or exclusion projection.
///
/// `_id` is kept unless explicitly excluded, and may be excluded inside an
/// inclusion projection. Mixing inclusion and exclusion of other fields fails.
pub fn apply_projection(doc: &Document, projection: &Document) -> Result<Document, DbError> {
    if projection.is_empty() {
        return Ok(doc.clone());
    }

    let mut keep_id = true;
    let mut included = Vec::new();
    let mut excluded = Vec::new();
    for (field, value) in projection {
        let on = flag(field, value)?;
        if field == "_id" {
            keep_id = on;
        } else if on {
            included.push(field.as_str());
        } else {
            excluded.push(field.as_str());
        }
    }

    if let (Some(inc), Some(exc)) = (included.first(), excluded.first()) {
        return Err(DbError::invalid(format!(
            "cannot do exclusion on field {} in inclusion projection (includes {})",
            exc, inc
        )));
    }

    // {_id: 1} alone is an inclusion projection of just the identifier
    let inclusion = !included.is_empty() || (excluded.is_empty() && keep_id);

    let projected = doc
        .iter()
        .filter(|(field, _)| {
            if field.as_str() == "_id" {
                keep_id
            } else if inclusion {
                included.contains(&field.as_str())
            } else {
                !excluded.contains(&field.as_str())
            }
        })
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect();
    Ok(projected)
}
