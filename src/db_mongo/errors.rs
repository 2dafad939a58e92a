use mongodb::error::{Error, ErrorKind, InsertManyError, WriteFailure};

use crate::store::DbError;

const DUPLICATE_KEY: i32 = 11000;

/// Server codes for rejected filters, updates and projections.
const INVALID_EXPRESSION_CODES: &[i32] = &[
    2,     // BadValue
    9,     // FailedToParse
    14,    // TypeMismatch
    28,    // PathNotViable
    31254, // Location31254, mixed projection
    40,    // ConflictingUpdateOperators
    52,    // DollarPrefixedFieldName
    66,    // ImmutableField
];

fn from_code(code: i32, message: String, collection: &str) -> DbError {
    if code == DUPLICATE_KEY {
        DbError::DuplicateKey {
            collection: collection.to_string(),
            message,
        }
    } else if INVALID_EXPRESSION_CODES.contains(&code) {
        DbError::InvalidExpression(message)
    } else {
        DbError::Operation(message)
    }
}

/// Bulk writes report one code per failed document; a duplicate anywhere wins.
fn from_write_codes(
    codes: impl IntoIterator<Item = i32>,
    message: String,
    collection: &str,
) -> DbError {
    let codes: Vec<i32> = codes.into_iter().collect();
    let code = codes
        .iter()
        .copied()
        .find(|code| *code == DUPLICATE_KEY)
        .or_else(|| codes.first().copied());
    match code {
        Some(code) => from_code(code, message, collection),
        None => DbError::Operation(message),
    }
}

/// Map a driver error onto the helper's error taxonomy.
pub fn classify(err: Error, collection: &str) -> DbError {
    let message = err.to_string();
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) => {
            from_code(write_error.code, message, collection)
        }
        ErrorKind::Command(ref command_error) => {
            from_code(command_error.code, message, collection)
        }
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => DbError::Unreachable(message),
        ErrorKind::Authentication { .. } => DbError::Authentication(message),
        ErrorKind::InvalidArgument { .. } => DbError::InvalidExpression(message),
        ErrorKind::InsertMany(InsertManyError {
            write_errors: Some(ref write_errors),
            ..
        }) => from_write_codes(
            write_errors.iter().map(|write_error| write_error.code),
            message,
            collection,
        ),
        _ => DbError::Operation(message),
    }
}
