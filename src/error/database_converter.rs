use crate::error::AppError;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// Converts diesel errors into structured `AppError` variants.
pub struct DatabaseErrorConverter;

impl DatabaseErrorConverter {
    pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
        match error {
            DieselError::DatabaseError(kind, info) => {
                Self::convert_database_error(kind, info.as_ref(), operation)
            }
            DieselError::NotFound => AppError::NotFound {
                entity: "resource".to_string(),
                field: "id".to_string(),
                value: "unknown".to_string(),
            },
            other => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::from(other),
            },
        }
    }

    fn convert_database_error(
        kind: DatabaseErrorKind,
        info: &(dyn diesel::result::DatabaseErrorInformation + Send + Sync),
        operation: &str,
    ) -> AppError {
        let message = info.message().to_string();

        match kind {
            DatabaseErrorKind::UniqueViolation => {
                let (entity, field) = Self::split_constraint(info.constraint_name(), info.table_name());
                AppError::Duplicate {
                    entity,
                    field,
                    value: info.details().map(str::to_string).unwrap_or_default(),
                }
            }
            DatabaseErrorKind::NotNullViolation => AppError::Validation {
                field: info.column_name().unwrap_or("unknown").to_string(),
                reason: "Field is required".to_string(),
            },
            DatabaseErrorKind::ForeignKeyViolation => AppError::Validation {
                field: info.constraint_name().unwrap_or("unknown").to_string(),
                reason: "Invalid reference".to_string(),
            },
            _ => AppError::Database {
                operation: operation.to_string(),
                source: anyhow::Error::msg(message),
            },
        }
    }

    /// Postgres unique index names follow `<table>_<column>_key`.
    fn split_constraint(constraint: Option<&str>, table: Option<&str>) -> (String, String) {
        let table = table.unwrap_or("resource").to_string();
        let field = constraint
            .and_then(|c| c.strip_prefix(&format!("{}_", table)).map(str::to_string))
            .map(|rest| rest.trim_end_matches("_key").trim_end_matches("_idx").to_string())
            .unwrap_or_else(|| constraint.unwrap_or("unknown").to_string());
        (table, field)
    }
}
