use std::cmp::Ordering;

use mongodb::bson::{Bson, Document};

use crate::store::DbError;

/// Resolve a dotted path (`a.b.c`) against a document.
pub fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Equality with numeric types compared by value (`1 == 1i64 == 1.0`).
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering between values of the same kind; `None` when they are not comparable.
pub fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        _ => None,
    }
}

fn is_operator_document(value: &Bson) -> bool {
    match value {
        Bson::Document(doc) => doc.keys().next().is_some_and(|k| k.starts_with('$')),
        _ => false,
    }
}

/// Evaluate a query filter against a document.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool, DbError> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => clauses(condition, key)?
                .iter()
                .try_fold(true, |acc, clause| Ok::<_, DbError>(acc && matches(doc, clause)?))?,
            "$or" => clauses(condition, key)?
                .iter()
                .try_fold(false, |acc, clause| Ok::<_, DbError>(acc || matches(doc, clause)?))?,
            "$nor" => !clauses(condition, key)?
                .iter()
                .try_fold(false, |acc, clause| Ok::<_, DbError>(acc || matches(doc, clause)?))?,
            op if op.starts_with('$') => {
                return Err(DbError::invalid(format!("unknown top level operator: {}", op)));
            }
            path => {
                let value = lookup_path(doc, path);
                match condition {
                    Bson::Document(ops) if is_operator_document(condition) => {
                        matches_operators(value, ops)?
                    }
                    expected => matches_equal(value, expected),
                }
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(condition: &'a Bson, operator: &str) -> Result<Vec<&'a Document>, DbError> {
    let items = match condition {
        Bson::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(DbError::invalid(format!(
                "{} must be a nonempty array",
                operator
            )));
        }
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(clause) => Ok(clause),
            _ => Err(DbError::invalid(format!(
                "{} argument's entries must be objects",
                operator
            ))),
        })
        .collect()
}

fn matches_equal(value: Option<&Bson>, expected: &Bson) -> bool {
    match (value, expected) {
        (None, Bson::Null) => true,
        (None, _) => false,
        (Some(Bson::Array(items)), expected) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        (Some(actual), expected) => values_equal(actual, expected),
    }
}

fn matches_ordering(value: Option<&Bson>, bound: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let compare = |candidate: &Bson| compare_values(candidate, bound).is_some_and(accept);
    match value {
        Some(Bson::Array(items)) => items.iter().any(compare),
        Some(candidate) => compare(candidate),
        None => false,
    }
}

fn matches_operators(value: Option<&Bson>, operators: &Document) -> Result<bool, DbError> {
    for (operator, operand) in operators {
        let matched = match operator.as_str() {
            "$eq" => matches_equal(value, operand),
            "$ne" => !matches_equal(value, operand),
            "$gt" => matches_ordering(value, operand, |o| o == Ordering::Greater),
            "$gte" => matches_ordering(value, operand, |o| o != Ordering::Less),
            "$lt" => matches_ordering(value, operand, |o| o == Ordering::Less),
            "$lte" => matches_ordering(value, operand, |o| o != Ordering::Greater),
            "$in" => candidates(operand, operator)?
                .iter()
                .any(|candidate| matches_equal(value, candidate)),
            "$nin" => !candidates(operand, operator)?
                .iter()
                .any(|candidate| matches_equal(value, candidate)),
            "$exists" => {
                let wanted = match operand {
                    Bson::Boolean(flag) => *flag,
                    other => as_number(other).is_some_and(|n| n != 0.0),
                };
                value.is_some() == wanted
            }
            other => return Err(DbError::invalid(format!("unknown operator: {}", other))),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn candidates<'a>(operand: &'a Bson, operator: &str) -> Result<&'a Vec<Bson>, DbError> {
    match operand {
        Bson::Array(items) => Ok(items),
        _ => Err(DbError::invalid(format!("{} needs an array", operator))),
    }
}

/// Equality constraints of a filter, used to seed an upserted document.
pub fn equality_fields(filter: &Document) -> Vec<(&str, &Bson)> {
    filter
        .iter()
        .filter(|(key, _)| !key.starts_with('$'))
        .filter_map(|(key, value)| match value {
            Bson::Document(ops) if is_operator_document(value) => {
                ops.get("$eq").map(|eq| (key.as_str(), eq))
            }
            value => Some((key.as_str(), value)),
        })
        .collect()
}
