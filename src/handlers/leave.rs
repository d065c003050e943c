// src/handlers/leave.rs

use crate::{
    auth::{AuthUser, HR_WRITERS},
    errors::{AppError, AppResult},
    models::{
        LeaveApplication, LeaveApplicationRequest, LeaveBalance, LeaveBalanceQuery,
        LeaveDecisionRequest, LeaveFilter, LeaveStatus, LeaveType, LeaveTypeRequest,
        MessageResponse,
    },
    services::leave::{balance_for, ensure_covered, ensure_transition, leave_days},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Datelike, Utc};
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

fn validate_leave_type(body: &LeaveTypeRequest) -> AppResult<()> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Leave type name is required".to_string()));
    }
    if body.yearly_limit < 0 {
        return Err(AppError::Validation(
            "yearly_limit cannot be negative".to_string(),
        ));
    }
    Ok(())
}

async fn fetch_leave_type(db: &PgPool, id: Uuid) -> AppResult<LeaveType> {
    sqlx::query_as::<_, LeaveType>("SELECT * FROM leave_types WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Leave type {} not found", id)))
}

async fn fetch_application(db: &PgPool, id: Uuid) -> AppResult<LeaveApplication> {
    sqlx::query_as::<_, LeaveApplication>("SELECT * FROM leave_applications WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Leave application {} not found", id)))
}

// ─── Leave types ──────────────────────────────────────────────────────────────

/// Create a leave type
#[utoipa::path(
    post,
    path = "/api/v1/leave-types",
    request_body = LeaveTypeRequest,
    responses(
        (status = 201, description = "Leave type created", body = LeaveType),
        (status = 409, description = "Name already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave_type(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<LeaveTypeRequest>,
) -> AppResult<(StatusCode, Json<LeaveType>)> {
    auth.require(HR_WRITERS)?;
    validate_leave_type(&body)?;

    let leave_type = sqlx::query_as::<_, LeaveType>(
        r#"INSERT INTO leave_types (id, name, name_bangla, yearly_limit, carry_forward, is_paid, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.name.trim())
    .bind(&body.name_bangla)
    .bind(body.yearly_limit)
    .bind(body.carry_forward)
    .bind(body.is_paid.unwrap_or(true))
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(leave_type)))
}

/// List leave types
#[utoipa::path(
    get,
    path = "/api/v1/leave-types",
    responses((status = 200, description = "Leave types", body = Vec<LeaveType>)),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LeaveType>>> {
    let types = sqlx::query_as::<_, LeaveType>("SELECT * FROM leave_types ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(types))
}

/// Get a leave type
#[utoipa::path(
    get,
    path = "/api/v1/leave-types/{leave_type_id}",
    params(("leave_type_id" = Uuid, Path, description = "Leave type ID")),
    responses(
        (status = 200, description = "Leave type", body = LeaveType),
        (status = 404, description = "Leave type not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave_type(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(leave_type_id): Path<Uuid>,
) -> AppResult<Json<LeaveType>> {
    Ok(Json(fetch_leave_type(&state.db, leave_type_id).await?))
}

/// Update a leave type
#[utoipa::path(
    put,
    path = "/api/v1/leave-types/{leave_type_id}",
    request_body = LeaveTypeRequest,
    params(("leave_type_id" = Uuid, Path, description = "Leave type ID")),
    responses(
        (status = 200, description = "Leave type updated", body = LeaveType),
        (status = 404, description = "Leave type not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave_type(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(leave_type_id): Path<Uuid>,
    Json(body): Json<LeaveTypeRequest>,
) -> AppResult<Json<LeaveType>> {
    auth.require(HR_WRITERS)?;
    validate_leave_type(&body)?;

    let leave_type = sqlx::query_as::<_, LeaveType>(
        r#"UPDATE leave_types
           SET name = $2, name_bangla = $3, yearly_limit = $4, carry_forward = $5,
               is_paid = $6, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(leave_type_id)
    .bind(body.name.trim())
    .bind(&body.name_bangla)
    .bind(body.yearly_limit)
    .bind(body.carry_forward)
    .bind(body.is_paid.unwrap_or(true))
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Leave type {} not found", leave_type_id)))?;

    Ok(Json(leave_type))
}

/// Delete a leave type that has no applications
#[utoipa::path(
    delete,
    path = "/api/v1/leave-types/{leave_type_id}",
    params(("leave_type_id" = Uuid, Path, description = "Leave type ID")),
    responses(
        (status = 200, description = "Leave type deleted", body = MessageResponse),
        (status = 400, description = "Leave type still in use"),
        (status = 404, description = "Leave type not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave_type(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(leave_type_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    let result = sqlx::query("DELETE FROM leave_types WHERE id = $1")
        .bind(leave_type_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Leave type {} not found",
            leave_type_id
        )));
    }
    Ok(Json(MessageResponse::new("Leave type deleted")))
}

// ─── Applications ─────────────────────────────────────────────────────────────

/// Apply for leave; the application starts out pending
#[utoipa::path(
    post,
    path = "/api/v1/leave-applications",
    request_body = LeaveApplicationRequest,
    responses(
        (status = 201, description = "Application filed", body = LeaveApplication),
        (status = 400, description = "Invalid dates or unknown employee/type"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave_application(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<LeaveApplicationRequest>,
) -> AppResult<(StatusCode, Json<LeaveApplication>)> {
    auth.require(HR_WRITERS)?;
    let total_days = leave_days(body.from_date, body.to_date, body.is_half_day)?;

    let application = sqlx::query_as::<_, LeaveApplication>(
        r#"INSERT INTO leave_applications (
            id, employee_id, leave_type_id, from_date, to_date, is_half_day,
            total_days, reason, status, applied_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Pending', NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.employee_id)
    .bind(body.leave_type_id)
    .bind(body.from_date)
    .bind(body.to_date)
    .bind(body.is_half_day)
    .bind(total_days)
    .bind(&body.reason)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(application)))
}

/// List leave applications
#[utoipa::path(
    get,
    path = "/api/v1/leave-applications",
    params(LeaveFilter),
    responses((status = 200, description = "Applications", body = Vec<LeaveApplication>)),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_applications(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<LeaveFilter>,
) -> AppResult<Json<Vec<LeaveApplication>>> {
    let applications = sqlx::query_as::<_, LeaveApplication>(
        r#"SELECT * FROM leave_applications
           WHERE ($1::uuid IS NULL OR employee_id = $1)
             AND ($2::uuid IS NULL OR leave_type_id = $2)
             AND ($3::leave_status IS NULL OR status = $3)
           ORDER BY applied_at DESC"#,
    )
    .bind(filter.employee_id)
    .bind(filter.leave_type_id)
    .bind(filter.status)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(applications))
}

/// Get a leave application
#[utoipa::path(
    get,
    path = "/api/v1/leave-applications/{application_id}",
    params(("application_id" = Uuid, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Application", body = LeaveApplication),
        (status = 404, description = "Application not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave_application(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> AppResult<Json<LeaveApplication>> {
    Ok(Json(fetch_application(&state.db, application_id).await?))
}

/// Moves a pending application to `next`, guarding against a concurrent decision.
async fn decide<'e>(
    db: impl PgExecutor<'e>,
    application: &LeaveApplication,
    next: LeaveStatus,
    decided_by: Uuid,
    remarks: Option<String>,
) -> AppResult<LeaveApplication> {
    sqlx::query_as::<_, LeaveApplication>(
        r#"UPDATE leave_applications
           SET status = $2, decided_at = NOW(), decided_by = $3, remarks = $4
           WHERE id = $1 AND status = 'Pending'
           RETURNING *"#,
    )
    .bind(application.id)
    .bind(next)
    .bind(decided_by)
    .bind(remarks)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::InvalidTransition {
        entity: "leave application",
        from: "a decided state".to_string(),
        to: next.to_string(),
    })
}

/// Approve a pending application when the year's balance covers it
#[utoipa::path(
    post,
    path = "/api/v1/leave-applications/{application_id}/approve",
    request_body = LeaveDecisionRequest,
    params(("application_id" = Uuid, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Application approved", body = LeaveApplication),
        (status = 400, description = "Insufficient balance"),
        (status = 422, description = "Application is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(body): Json<LeaveDecisionRequest>,
) -> AppResult<Json<LeaveApplication>> {
    auth.require(HR_WRITERS)?;
    let application = fetch_application(&state.db, application_id).await?;
    ensure_transition(application.status, LeaveStatus::Approved)?;
    let leave_type = fetch_leave_type(&state.db, application.leave_type_id).await?;

    let mut tx = state.db.begin().await?;

    // Approvals for one employee run one at a time, so each sees the days
    // the previous one granted.
    sqlx::query("SELECT id FROM employees WHERE id = $1 FOR UPDATE")
        .bind(application.employee_id)
        .execute(&mut *tx)
        .await?;

    let balance = balance_for(
        &mut *tx,
        application.employee_id,
        &leave_type,
        application.from_date.year(),
    )
    .await?;
    ensure_covered(&balance, &application)?;

    let approved = decide(
        &mut *tx,
        &application,
        LeaveStatus::Approved,
        auth.id,
        body.remarks,
    )
    .await?;
    tx.commit().await?;

    info!(application_id = %approved.id, days = %approved.total_days, "leave approved");
    Ok(Json(approved))
}

/// Reject a pending application
#[utoipa::path(
    post,
    path = "/api/v1/leave-applications/{application_id}/reject",
    request_body = LeaveDecisionRequest,
    params(("application_id" = Uuid, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Application rejected", body = LeaveApplication),
        (status = 422, description = "Application is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(body): Json<LeaveDecisionRequest>,
) -> AppResult<Json<LeaveApplication>> {
    auth.require(HR_WRITERS)?;
    let application = fetch_application(&state.db, application_id).await?;
    ensure_transition(application.status, LeaveStatus::Rejected)?;
    let rejected = decide(
        &state.db,
        &application,
        LeaveStatus::Rejected,
        auth.id,
        body.remarks,
    )
    .await?;
    Ok(Json(rejected))
}

/// Withdraw a pending application
#[utoipa::path(
    post,
    path = "/api/v1/leave-applications/{application_id}/cancel",
    request_body = LeaveDecisionRequest,
    params(("application_id" = Uuid, Path, description = "Leave application ID")),
    responses(
        (status = 200, description = "Application cancelled", body = LeaveApplication),
        (status = 422, description = "Application is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(body): Json<LeaveDecisionRequest>,
) -> AppResult<Json<LeaveApplication>> {
    auth.require(HR_WRITERS)?;
    let application = fetch_application(&state.db, application_id).await?;
    ensure_transition(application.status, LeaveStatus::Cancelled)?;
    let cancelled = decide(
        &state.db,
        &application,
        LeaveStatus::Cancelled,
        auth.id,
        body.remarks,
    )
    .await?;
    Ok(Json(cancelled))
}

/// Balance of every leave type for one employee and year
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/leave-balances",
    params(
        ("employee_id" = Uuid, Path, description = "Employee ID"),
        LeaveBalanceQuery,
    ),
    responses(
        (status = 200, description = "Balances", body = Vec<LeaveBalance>),
        (status = 404, description = "Employee not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave_balances(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<LeaveBalanceQuery>,
) -> AppResult<Json<Vec<LeaveBalance>>> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = $1)")
        .bind(employee_id)
        .fetch_one(&state.db)
        .await?;
    if !exists {
        return Err(AppError::NotFound(format!("Employee {} not found", employee_id)));
    }

    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let types = sqlx::query_as::<_, LeaveType>("SELECT * FROM leave_types ORDER BY name")
        .fetch_all(&state.db)
        .await?;

    let mut conn = state.db.acquire().await?;
    let mut balances = Vec::with_capacity(types.len());
    for leave_type in &types {
        balances.push(balance_for(&mut conn, employee_id, leave_type, year).await?);
    }
    Ok(Json(balances))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::UserRole,
        routes::app,
        state::testing::{bearer, db_state, insert_company, insert_employee},
    };
    use axum::{body::Body, http::Request};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;

    #[test]
    fn leave_type_limits_are_checked() {
        let mut body = LeaveTypeRequest {
            name: "Casual".to_string(),
            name_bangla: None,
            yearly_limit: 10,
            carry_forward: false,
            is_paid: None,
        };
        assert!(validate_leave_type(&body).is_ok());

        body.yearly_limit = -1;
        assert!(validate_leave_type(&body).is_err());

        body.yearly_limit = 10;
        body.name = "  ".to_string();
        assert!(validate_leave_type(&body).is_err());
    }

    async fn pending_application(
        db: &PgPool,
        employee_id: Uuid,
        leave_type_id: Uuid,
        from: NaiveDate,
        days: i64,
    ) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO leave_applications
                   (id, employee_id, leave_type_id, from_date, to_date, total_days)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(id)
        .bind(employee_id)
        .bind(leave_type_id)
        .bind(from)
        .bind(from + chrono::Duration::days(days - 1))
        .bind(Decimal::from(days))
        .execute(db)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn simultaneous_approvals_cannot_overdraw_the_year() {
        let Some(state) = db_state().await else {
            return;
        };
        let db = state.db.clone();
        let company = insert_company(&db).await;
        let joined = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let employee = insert_employee(&db, &company, "5001", joined, dec!(12000)).await;

        let leave_type_id = Uuid::new_v4();
        sqlx::query("INSERT INTO leave_types (id, name, yearly_limit) VALUES ($1, $2, 10)")
            .bind(leave_type_id)
            .bind(format!("Casual {}", leave_type_id.simple()))
            .execute(&db)
            .await
            .unwrap();

        let march = NaiveDate::from_ymd_opt(2031, 3, 2).unwrap();
        let may = NaiveDate::from_ymd_opt(2031, 5, 4).unwrap();
        let first = pending_application(&db, employee, leave_type_id, march, 6).await;
        let second = pending_application(&db, employee, leave_type_id, may, 6).await;

        let token = bearer(&state, UserRole::Hr).await;
        let router = app(state);
        let approve = |id: Uuid| {
            let router = router.clone();
            let token = token.clone();
            async move {
                router
                    .oneshot(
                        Request::post(format!("/api/v1/leave-applications/{id}/approve"))
                            .header("Authorization", token)
                            .header("Content-Type", "application/json")
                            .body(Body::from("{}"))
                            .unwrap(),
                    )
                    .await
                    .unwrap()
                    .status()
            }
        };

        let (a, b) = tokio::join!(approve(first), approve(second));
        let mut statuses = [a, b];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

        let approved = sqlx::query_scalar::<_, Decimal>(
            r#"SELECT COALESCE(SUM(total_days), 0) FROM leave_applications
               WHERE employee_id = $1 AND status = 'Approved'"#,
        )
        .bind(employee)
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(approved, dec!(6));
    }
}
