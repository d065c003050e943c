// src/handlers/production.rs

use crate::{
    auth::{AuthUser, HR_WRITERS},
    errors::{AppError, AppResult},
    models::{
        AssignmentFilter, AssignmentRequest, AssignmentSummary, DailyProductionRecord,
        DailyProductionRequest, DateRangeFilter, MessageResponse, Production, ProductionAssignment,
        ProductionColor, ProductionDetail, ProductionFilter, ProductionRequest, ProductionTarget,
        ProductionTargetRequest,
    },
    services::production::{daily_efficiency, daily_target, hourly_buckets, total_completed},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

fn validate_production(body: &ProductionRequest) -> AppResult<()> {
    for (field, value) in [
        ("buyer", &body.buyer),
        ("style_no", &body.style_no),
        ("order_no", &body.order_no),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} is required")));
        }
    }
    if body.order_quantity <= 0 {
        return Err(AppError::Validation(
            "order_quantity must be positive".to_string(),
        ));
    }
    if body.smv.is_some_and(|smv| smv < Decimal::ZERO) {
        return Err(AppError::Validation("smv cannot be negative".to_string()));
    }

    let mut seen = HashSet::new();
    let mut total: i64 = 0;
    for color in &body.colors {
        let name = color.color.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Color name is required".to_string()));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(AppError::Validation(format!("Color '{name}' is listed twice")));
        }
        if color.quantity < 0 {
            return Err(AppError::Validation(format!(
                "Quantity for '{name}' cannot be negative"
            )));
        }
        total += i64::from(color.quantity);
    }
    if total > i64::from(body.order_quantity) {
        return Err(AppError::Validation(format!(
            "Color quantities ({total}) exceed the order quantity ({})",
            body.order_quantity
        )));
    }
    Ok(())
}

async fn replace_colors(
    conn: &mut PgConnection,
    production_id: Uuid,
    body: &ProductionRequest,
) -> AppResult<Vec<ProductionColor>> {
    sqlx::query("DELETE FROM production_colors WHERE production_id = $1")
        .bind(production_id)
        .execute(&mut *conn)
        .await?;

    let ids: Vec<Uuid> = body.colors.iter().map(|_| Uuid::new_v4()).collect();
    let names: Vec<String> = body.colors.iter().map(|c| c.color.trim().to_string()).collect();
    let quantities: Vec<i32> = body.colors.iter().map(|c| c.quantity).collect();

    let colors = sqlx::query_as::<_, ProductionColor>(
        r#"INSERT INTO production_colors (id, production_id, color, quantity)
           SELECT c.id, $2, c.color, c.quantity
           FROM UNNEST($1::uuid[], $3::text[], $4::int[]) AS c(id, color, quantity)
           RETURNING *"#,
    )
    .bind(&ids)
    .bind(production_id)
    .bind(&names)
    .bind(&quantities)
    .fetch_all(&mut *conn)
    .await?;
    Ok(colors)
}

async fn load_detail(db: &PgPool, production_id: Uuid) -> AppResult<ProductionDetail> {
    let production = sqlx::query_as::<_, Production>("SELECT * FROM productions WHERE id = $1")
        .bind(production_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Production {} not found", production_id)))?;

    let colors = sqlx::query_as::<_, ProductionColor>(
        "SELECT * FROM production_colors WHERE production_id = $1 ORDER BY color",
    )
    .bind(production_id)
    .fetch_all(db)
    .await?;

    Ok(ProductionDetail { production, colors })
}

// ─── Orders ───────────────────────────────────────────────────────────────────

/// Create a production order with its color breakdown
#[utoipa::path(
    post,
    path = "/api/v1/productions",
    request_body = ProductionRequest,
    responses(
        (status = 201, description = "Production created", body = ProductionDetail),
        (status = 409, description = "Buyer/style/order already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn create_production(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ProductionRequest>,
) -> AppResult<(StatusCode, Json<ProductionDetail>)> {
    auth.require(HR_WRITERS)?;
    validate_production(&body)?;

    let mut tx = state.db.begin().await?;

    let production = sqlx::query_as::<_, Production>(
        r#"INSERT INTO productions (
            id, company_id, buyer, style_no, order_no, item, order_quantity, smv,
            shipment_date, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.company_id)
    .bind(body.buyer.trim())
    .bind(body.style_no.trim())
    .bind(body.order_no.trim())
    .bind(&body.item)
    .bind(body.order_quantity)
    .bind(body.smv)
    .bind(body.shipment_date)
    .fetch_one(&mut *tx)
    .await?;

    let colors = replace_colors(&mut tx, production.id, &body).await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductionDetail { production, colors }),
    ))
}

/// List production orders
#[utoipa::path(
    get,
    path = "/api/v1/productions",
    params(ProductionFilter),
    responses((status = 200, description = "Productions", body = Vec<Production>)),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn list_productions(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ProductionFilter>,
) -> AppResult<Json<Vec<Production>>> {
    let productions = sqlx::query_as::<_, Production>(
        r#"SELECT * FROM productions
           WHERE ($1::uuid IS NULL OR company_id = $1)
             AND ($2::text IS NULL OR buyer ILIKE '%' || $2 || '%')
           ORDER BY created_at DESC"#,
    )
    .bind(filter.company_id)
    .bind(filter.buyer)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(productions))
}

/// Get a production order with colors
#[utoipa::path(
    get,
    path = "/api/v1/productions/{production_id}",
    params(("production_id" = Uuid, Path, description = "Production ID")),
    responses(
        (status = 200, description = "Production", body = ProductionDetail),
        (status = 404, description = "Production not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn get_production(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(production_id): Path<Uuid>,
) -> AppResult<Json<ProductionDetail>> {
    Ok(Json(load_detail(&state.db, production_id).await?))
}

/// Update a production order; the color list is replaced
#[utoipa::path(
    put,
    path = "/api/v1/productions/{production_id}",
    request_body = ProductionRequest,
    params(("production_id" = Uuid, Path, description = "Production ID")),
    responses(
        (status = 200, description = "Production updated", body = ProductionDetail),
        (status = 404, description = "Production not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn update_production(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(production_id): Path<Uuid>,
    Json(body): Json<ProductionRequest>,
) -> AppResult<Json<ProductionDetail>> {
    auth.require(HR_WRITERS)?;
    validate_production(&body)?;

    let mut tx = state.db.begin().await?;

    let production = sqlx::query_as::<_, Production>(
        r#"UPDATE productions
           SET company_id = $2, buyer = $3, style_no = $4, order_no = $5, item = $6,
               order_quantity = $7, smv = $8, shipment_date = $9, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(production_id)
    .bind(body.company_id)
    .bind(body.buyer.trim())
    .bind(body.style_no.trim())
    .bind(body.order_no.trim())
    .bind(&body.item)
    .bind(body.order_quantity)
    .bind(body.smv)
    .bind(body.shipment_date)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Production {} not found", production_id)))?;

    let colors = replace_colors(&mut tx, production_id, &body).await?;
    tx.commit().await?;

    Ok(Json(ProductionDetail { production, colors }))
}

/// Delete a production order with its colors and assignments
#[utoipa::path(
    delete,
    path = "/api/v1/productions/{production_id}",
    params(("production_id" = Uuid, Path, description = "Production ID")),
    responses(
        (status = 200, description = "Production deleted", body = MessageResponse),
        (status = 404, description = "Production not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn delete_production(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(production_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    let result = sqlx::query("DELETE FROM productions WHERE id = $1")
        .bind(production_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Production {} not found",
            production_id
        )));
    }
    Ok(Json(MessageResponse::new("Production deleted")))
}

// ─── Line assignments ─────────────────────────────────────────────────────────

/// Assign part of an order to a sewing line
#[utoipa::path(
    post,
    path = "/api/v1/production-assignments",
    request_body = AssignmentRequest,
    responses(
        (status = 201, description = "Assignment created", body = ProductionAssignment),
        (status = 400, description = "Invalid quantity or dates"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn create_assignment(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<AssignmentRequest>,
) -> AppResult<(StatusCode, Json<ProductionAssignment>)> {
    auth.require(HR_WRITERS)?;
    if body.assigned_quantity <= 0 {
        return Err(AppError::Validation(
            "assigned_quantity must be positive".to_string(),
        ));
    }
    if body.end_date.is_some_and(|end| end < body.start_date) {
        return Err(AppError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }

    let assignment = sqlx::query_as::<_, ProductionAssignment>(
        r#"INSERT INTO production_assignments (
            id, production_id, line_id, assigned_quantity, start_date, end_date, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.production_id)
    .bind(body.line_id)
    .bind(body.assigned_quantity)
    .bind(body.start_date)
    .bind(body.end_date)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

/// List line assignments
#[utoipa::path(
    get,
    path = "/api/v1/production-assignments",
    params(AssignmentFilter),
    responses((status = 200, description = "Assignments", body = Vec<ProductionAssignment>)),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn list_assignments(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AssignmentFilter>,
) -> AppResult<Json<Vec<ProductionAssignment>>> {
    let assignments = sqlx::query_as::<_, ProductionAssignment>(
        r#"SELECT * FROM production_assignments
           WHERE ($1::uuid IS NULL OR production_id = $1)
             AND ($2::uuid IS NULL OR line_id = $2)
           ORDER BY start_date DESC"#,
    )
    .bind(filter.production_id)
    .bind(filter.line_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(assignments))
}

async fn fetch_assignment(db: &PgPool, id: Uuid) -> AppResult<ProductionAssignment> {
    sqlx::query_as::<_, ProductionAssignment>("SELECT * FROM production_assignments WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assignment {} not found", id)))
}

/// Get a line assignment
#[utoipa::path(
    get,
    path = "/api/v1/production-assignments/{assignment_id}",
    params(("assignment_id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment", body = ProductionAssignment),
        (status = 404, description = "Assignment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn get_assignment(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
) -> AppResult<Json<ProductionAssignment>> {
    Ok(Json(fetch_assignment(&state.db, assignment_id).await?))
}

/// Delete a line assignment with its records and targets
#[utoipa::path(
    delete,
    path = "/api/v1/production-assignments/{assignment_id}",
    params(("assignment_id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment deleted", body = MessageResponse),
        (status = 404, description = "Assignment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn delete_assignment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    let result = sqlx::query("DELETE FROM production_assignments WHERE id = $1")
        .bind(assignment_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Assignment {} not found",
            assignment_id
        )));
    }
    Ok(Json(MessageResponse::new("Assignment deleted")))
}

// ─── Hourly output and targets ────────────────────────────────────────────────

/// Record a day's hourly output for an assignment, replacing an earlier entry
#[utoipa::path(
    post,
    path = "/api/v1/production-records",
    request_body = DailyProductionRequest,
    responses(
        (status = 200, description = "Output recorded", body = DailyProductionRecord),
        (status = 400, description = "Invalid hourly values"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn upsert_daily_record(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<DailyProductionRequest>,
) -> AppResult<Json<DailyProductionRecord>> {
    auth.require(HR_WRITERS)?;
    let hours = hourly_buckets(&body.hourly)?;
    let completed = total_completed(&hours)?;

    let mut query = sqlx::query_as::<_, DailyProductionRecord>(
        r#"INSERT INTO daily_production_records (
            id, assignment_id, production_date,
            hour1, hour2, hour3, hour4, hour5, hour6,
            hour7, hour8, hour9, hour10, hour11, hour12,
            total_completed, remarks, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, NOW(), NOW())
        ON CONFLICT (assignment_id, production_date) DO UPDATE
        SET hour1 = EXCLUDED.hour1, hour2 = EXCLUDED.hour2, hour3 = EXCLUDED.hour3,
            hour4 = EXCLUDED.hour4, hour5 = EXCLUDED.hour5, hour6 = EXCLUDED.hour6,
            hour7 = EXCLUDED.hour7, hour8 = EXCLUDED.hour8, hour9 = EXCLUDED.hour9,
            hour10 = EXCLUDED.hour10, hour11 = EXCLUDED.hour11, hour12 = EXCLUDED.hour12,
            total_completed = EXCLUDED.total_completed,
            remarks = EXCLUDED.remarks,
            updated_at = NOW()
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.assignment_id)
    .bind(body.production_date);
    for quantity in hours {
        query = query.bind(quantity);
    }
    let record = query
        .bind(completed)
        .bind(&body.remarks)
        .fetch_one(&state.db)
        .await?;

    Ok(Json(record))
}

/// Hourly output of an assignment
#[utoipa::path(
    get,
    path = "/api/v1/production-assignments/{assignment_id}/records",
    params(
        ("assignment_id" = Uuid, Path, description = "Assignment ID"),
        DateRangeFilter,
    ),
    responses((status = 200, description = "Daily records", body = Vec<DailyProductionRecord>)),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn list_daily_records(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
    Query(range): Query<DateRangeFilter>,
) -> AppResult<Json<Vec<DailyProductionRecord>>> {
    let records = sqlx::query_as::<_, DailyProductionRecord>(
        r#"SELECT * FROM daily_production_records
           WHERE assignment_id = $1
             AND ($2::date IS NULL OR production_date >= $2)
             AND ($3::date IS NULL OR production_date <= $3)
           ORDER BY production_date"#,
    )
    .bind(assignment_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(records))
}

/// Set a day's target for an assignment
#[utoipa::path(
    post,
    path = "/api/v1/production-targets",
    request_body = ProductionTargetRequest,
    responses(
        (status = 200, description = "Target set", body = ProductionTarget),
        (status = 400, description = "Invalid target"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn upsert_target(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ProductionTargetRequest>,
) -> AppResult<Json<ProductionTarget>> {
    auth.require(HR_WRITERS)?;
    if body.working_hours <= Decimal::ZERO {
        return Err(AppError::Validation(
            "working_hours must be positive".to_string(),
        ));
    }
    let derived = daily_target(body.hourly_target, body.working_hours)?;
    let target_quantity = match body.daily_target {
        Some(given) if given < 0 => {
            return Err(AppError::Validation(
                "daily_target cannot be negative".to_string(),
            ));
        }
        Some(given) => given,
        None => derived,
    };

    let target = sqlx::query_as::<_, ProductionTarget>(
        r#"INSERT INTO production_targets (
            id, assignment_id, target_date, hourly_target, working_hours, daily_target, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, NOW())
        ON CONFLICT (assignment_id, target_date) DO UPDATE
        SET hourly_target = EXCLUDED.hourly_target,
            working_hours = EXCLUDED.working_hours,
            daily_target = EXCLUDED.daily_target
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.assignment_id)
    .bind(body.target_date)
    .bind(body.hourly_target)
    .bind(body.working_hours)
    .bind(target_quantity)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(target))
}

/// Completed against assigned quantity, with per-day efficiency
#[utoipa::path(
    get,
    path = "/api/v1/production-assignments/{assignment_id}/summary",
    params(("assignment_id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment summary", body = AssignmentSummary),
        (status = 404, description = "Assignment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Production"
)]
pub async fn assignment_summary(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
) -> AppResult<Json<AssignmentSummary>> {
    let assignment = fetch_assignment(&state.db, assignment_id).await?;

    let records = sqlx::query_as::<_, DailyProductionRecord>(
        "SELECT * FROM daily_production_records WHERE assignment_id = $1",
    )
    .bind(assignment_id)
    .fetch_all(&state.db)
    .await?;
    let targets = sqlx::query_as::<_, ProductionTarget>(
        "SELECT * FROM production_targets WHERE assignment_id = $1",
    )
    .bind(assignment_id)
    .fetch_all(&state.db)
    .await?;

    let completed: i64 = records.iter().map(|r| i64::from(r.total_completed)).sum();
    Ok(Json(AssignmentSummary {
        assignment_id,
        assigned_quantity: assignment.assigned_quantity,
        total_completed: completed,
        remaining: (i64::from(assignment.assigned_quantity) - completed).max(0),
        days: daily_efficiency(&records, &targets),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColorInput;

    fn order(colors: &[(&str, i32)]) -> ProductionRequest {
        ProductionRequest {
            company_id: None,
            buyer: "H&M".to_string(),
            style_no: "ST-204".to_string(),
            order_no: "PO-9981".to_string(),
            item: Some("Polo shirt".to_string()),
            order_quantity: 1000,
            smv: None,
            shipment_date: None,
            colors: colors
                .iter()
                .map(|(color, quantity)| ColorInput {
                    color: color.to_string(),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn color_breakdown_is_checked() {
        assert!(validate_production(&order(&[("Navy", 600), ("White", 400)])).is_ok());
        assert!(validate_production(&order(&[("Navy", 600), ("navy", 100)])).is_err());
        assert!(validate_production(&order(&[("Navy", 800), ("White", 400)])).is_err());
        assert!(validate_production(&order(&[("Navy", -1)])).is_err());
    }

    #[test]
    fn order_needs_identity_and_quantity() {
        let mut body = order(&[]);
        body.order_no = " ".to_string();
        assert!(validate_production(&body).is_err());

        let mut body = order(&[]);
        body.order_quantity = 0;
        assert!(validate_production(&body).is_err());
    }
}
