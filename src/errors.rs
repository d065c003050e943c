// src/errors.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // Database errors
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Auth errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid token")]
    InvalidToken,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    // Workflow errors
    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Postgres SQLSTATE codes surfaced to clients instead of a bare 500
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return AppError::NotFound("Record not found".to_string());
        }
        if let sqlx::Error::Database(db_err) = &err {
            let detail = db_err
                .constraint()
                .map(str::to_string)
                .unwrap_or_else(|| db_err.message().to_string());
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return AppError::Conflict(format!("Duplicate record ({detail})"));
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return AppError::BadRequest(format!(
                        "Referenced record missing or still in use ({detail})"
                    ));
                }
                Some(CHECK_VIOLATION) => {
                    return AppError::BadRequest(format!("Constraint violated ({detail})"));
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

// Convenience alias
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{db_state, insert_company};
    use uuid::Uuid;

    #[test]
    fn transition_errors_are_unprocessable() {
        let err = AppError::InvalidTransition {
            entity: "leave application",
            from: "Approved".to_string(),
            to: "Rejected".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.to_string(),
            "Cannot move leave application from Approved to Rejected"
        );
    }

    #[test]
    fn missing_row_is_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn constraint_violations_map_to_client_errors() {
        let Some(state) = db_state().await else {
            return;
        };
        let db = &state.db;
        let (_, name) = insert_company(db).await;

        let duplicate = sqlx::query("INSERT INTO companies (id, name) VALUES ($1, $2)")
            .bind(Uuid::new_v4())
            .bind(&name)
            .execute(db)
            .await
            .unwrap_err();
        let err = AppError::from(duplicate);
        assert!(matches!(err, AppError::Conflict(ref msg) if msg.contains("companies_name_key")));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let orphan = sqlx::query("INSERT INTO departments (id, company_id, name) VALUES ($1, $2, 'Cutting')")
            .bind(Uuid::new_v4())
            .bind(Uuid::new_v4())
            .execute(db)
            .await
            .unwrap_err();
        assert_eq!(AppError::from(orphan).status_code(), StatusCode::BAD_REQUEST);

        let negative = sqlx::query("INSERT INTO leave_types (id, name, yearly_limit) VALUES ($1, $2, -1)")
            .bind(Uuid::new_v4())
            .bind(format!("Broken {}", Uuid::new_v4().simple()))
            .execute(db)
            .await
            .unwrap_err();
        let err = AppError::from(negative);
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg.starts_with("Constraint violated")));
    }

    #[tokio::test]
    async fn error_body_carries_code_and_message() {
        let response = AppError::NotFound("Employee x not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], 404);
        assert_eq!(
            body["error"]["message"],
            "Record not found: Employee x not found"
        );
    }
}
