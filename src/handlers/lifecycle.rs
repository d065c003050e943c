// src/handlers/lifecycle.rs

use crate::{
    auth::{AuthUser, HR_WRITERS},
    errors::{AppError, AppResult},
    models::{
        Separation, SeparationRequest, SettleSeparationRequest, Transfer, TransferRequest,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

/// Where an employee sits in the organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
struct Placement {
    department_id: Option<Uuid>,
    section_id: Option<Uuid>,
    designation_id: Option<Uuid>,
    line_id: Option<Uuid>,
}

impl Placement {
    /// Fields the request leaves out stay where they are.
    fn moved_by(self, body: &TransferRequest) -> Placement {
        Placement {
            department_id: body.to_department_id.or(self.department_id),
            section_id: body.to_section_id.or(self.section_id),
            designation_id: body.to_designation_id.or(self.designation_id),
            line_id: body.to_line_id.or(self.line_id),
        }
    }
}

/// Move an employee; the previous placement is kept on the transfer record
#[utoipa::path(
    post,
    path = "/api/v1/employees/{employee_id}/transfers",
    request_body = TransferRequest,
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 201, description = "Employee transferred", body = Transfer),
        (status = 400, description = "Nothing changes or unknown target"),
        (status = 404, description = "Employee not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Lifecycle"
)]
pub async fn create_transfer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Json(body): Json<TransferRequest>,
) -> AppResult<(StatusCode, Json<Transfer>)> {
    auth.require(HR_WRITERS)?;

    let mut tx = state.db.begin().await?;

    let from = sqlx::query_as::<_, Placement>(
        r#"SELECT department_id, section_id, designation_id, line_id
           FROM employees WHERE id = $1 FOR UPDATE"#,
    )
    .bind(employee_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;

    let to = from.moved_by(&body);
    if to == from {
        return Err(AppError::Validation(
            "Transfer does not change the employee's placement".to_string(),
        ));
    }

    sqlx::query(
        r#"UPDATE employees
           SET department_id = $2, section_id = $3, designation_id = $4, line_id = $5, updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(employee_id)
    .bind(to.department_id)
    .bind(to.section_id)
    .bind(to.designation_id)
    .bind(to.line_id)
    .execute(&mut *tx)
    .await?;

    let transfer = sqlx::query_as::<_, Transfer>(
        r#"INSERT INTO transfers (
            id, employee_id,
            from_department_id, to_department_id, from_section_id, to_section_id,
            from_designation_id, to_designation_id, from_line_id, to_line_id,
            transfer_date, remarks, created_by, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(employee_id)
    .bind(from.department_id)
    .bind(to.department_id)
    .bind(from.section_id)
    .bind(to.section_id)
    .bind(from.designation_id)
    .bind(to.designation_id)
    .bind(from.line_id)
    .bind(to.line_id)
    .bind(body.transfer_date)
    .bind(&body.remarks)
    .bind(auth.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(%employee_id, transfer_id = %transfer.id, "employee transferred");
    Ok((StatusCode::CREATED, Json(transfer)))
}

/// Transfer history of an employee
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/transfers",
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses((status = 200, description = "Transfers", body = Vec<Transfer>)),
    security(("bearer_auth" = [])),
    tag = "Lifecycle"
)]
pub async fn list_transfers(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<Vec<Transfer>>> {
    let transfers = sqlx::query_as::<_, Transfer>(
        "SELECT * FROM transfers WHERE employee_id = $1 ORDER BY transfer_date DESC, created_at DESC",
    )
    .bind(employee_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(transfers))
}

/// Separate an employee from the company; the employee is deactivated
#[utoipa::path(
    post,
    path = "/api/v1/employees/{employee_id}/separations",
    request_body = SeparationRequest,
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 201, description = "Employee separated", body = Separation),
        (status = 404, description = "Employee not found"),
        (status = 422, description = "Employee already inactive"),
    ),
    security(("bearer_auth" = [])),
    tag = "Lifecycle"
)]
pub async fn create_separation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Json(body): Json<SeparationRequest>,
) -> AppResult<(StatusCode, Json<Separation>)> {
    auth.require(HR_WRITERS)?;
    if body
        .notice_date
        .is_some_and(|notice| notice > body.separation_date)
    {
        return Err(AppError::Validation(
            "notice_date must not be after separation_date".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;

    let is_active = sqlx::query_scalar::<_, bool>(
        "SELECT is_active FROM employees WHERE id = $1 FOR UPDATE",
    )
    .bind(employee_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;

    if !is_active {
        return Err(AppError::InvalidTransition {
            entity: "employee",
            from: "inactive".to_string(),
            to: "separated".to_string(),
        });
    }

    sqlx::query("UPDATE employees SET is_active = false, updated_at = NOW() WHERE id = $1")
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;

    let separation = sqlx::query_as::<_, Separation>(
        r#"INSERT INTO separations (
            id, employee_id, separation_type, notice_date, separation_date,
            reason, is_settled, created_by, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, false, $7, NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(employee_id)
    .bind(body.separation_type)
    .bind(body.notice_date)
    .bind(body.separation_date)
    .bind(&body.reason)
    .bind(auth.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(%employee_id, separation_type = ?separation.separation_type, "employee separated");
    Ok((StatusCode::CREATED, Json(separation)))
}

/// Separations of an employee
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/separations",
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses((status = 200, description = "Separations", body = Vec<Separation>)),
    security(("bearer_auth" = [])),
    tag = "Lifecycle"
)]
pub async fn list_separations(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<Vec<Separation>>> {
    let separations = sqlx::query_as::<_, Separation>(
        "SELECT * FROM separations WHERE employee_id = $1 ORDER BY separation_date DESC",
    )
    .bind(employee_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(separations))
}

/// Record the final settlement; a separation can be settled once
#[utoipa::path(
    post,
    path = "/api/v1/separations/{separation_id}/settle",
    request_body = SettleSeparationRequest,
    params(("separation_id" = Uuid, Path, description = "Separation ID")),
    responses(
        (status = 200, description = "Separation settled", body = Separation),
        (status = 404, description = "Separation not found"),
        (status = 422, description = "Already settled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Lifecycle"
)]
pub async fn settle_separation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(separation_id): Path<Uuid>,
    Json(body): Json<SettleSeparationRequest>,
) -> AppResult<Json<Separation>> {
    auth.require(HR_WRITERS)?;
    if body.settlement_amount < Decimal::ZERO {
        return Err(AppError::Validation(
            "settlement_amount cannot be negative".to_string(),
        ));
    }

    let settled = sqlx::query_as::<_, Separation>(
        r#"UPDATE separations
           SET is_settled = true, settlement_amount = $2, settled_at = NOW()
           WHERE id = $1 AND is_settled = false
           RETURNING *"#,
    )
    .bind(separation_id)
    .bind(body.settlement_amount)
    .fetch_optional(&state.db)
    .await?;

    if let Some(settled) = settled {
        return Ok(Json(settled));
    }

    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM separations WHERE id = $1)")
            .bind(separation_id)
            .fetch_one(&state.db)
            .await?;
    if exists {
        Err(AppError::InvalidTransition {
            entity: "separation",
            from: "settled".to_string(),
            to: "settled".to_string(),
        })
    } else {
        Err(AppError::NotFound(format!(
            "Separation {} not found",
            separation_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::SeparationType, state::testing::db_state};
    use chrono::NaiveDate;

    #[test]
    fn transfer_keeps_fields_it_does_not_name() {
        let from = Placement {
            department_id: Some(Uuid::new_v4()),
            section_id: Some(Uuid::new_v4()),
            designation_id: Some(Uuid::new_v4()),
            line_id: None,
        };
        let line = Uuid::new_v4();
        let body = TransferRequest {
            to_department_id: None,
            to_section_id: None,
            to_designation_id: None,
            to_line_id: Some(line),
            transfer_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            remarks: None,
        };

        let to = from.moved_by(&body);
        assert_eq!(to.line_id, Some(line));
        assert_eq!(to.department_id, from.department_id);
        assert_eq!(to.section_id, from.section_id);
    }

    #[tokio::test]
    async fn separation_types_use_display_labels() {
        assert_eq!(serde_json::to_value(SeparationType::Resignation).unwrap(), "Resignation");

        let Some(state) = db_state().await else {
            return;
        };
        let label: String = sqlx::query_scalar("SELECT $1::separation_type::text")
            .bind(SeparationType::Death)
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(label, "Death");
    }
}
