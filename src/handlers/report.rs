// src/handlers/report.rs

use crate::{
    auth::AuthUser,
    errors::AppResult,
    models::{
        AttendanceSummaryQuery, AttendanceSummaryRow, Dashboard, DashboardQuery,
        DepartmentHeadcount, StatusCount,
    },
    services::period::{last_day_of_month, parse_month},
    state::AppState,
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;

/// Headcount and attendance at a glance
#[utoipa::path(
    get,
    path = "/api/v1/reports/dashboard",
    params(DashboardQuery),
    responses((status = 200, description = "Dashboard figures", body = Dashboard)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn dashboard(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Dashboard>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let active_employees =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE is_active = true")
            .fetch_one(&state.db)
            .await?;

    let by_department = sqlx::query_as::<_, DepartmentHeadcount>(
        r#"SELECT e.department_id, d.name AS department_name, COUNT(*) AS headcount
           FROM employees e
           LEFT JOIN departments d ON d.id = e.department_id
           WHERE e.is_active = true
           GROUP BY e.department_id, d.name
           ORDER BY d.name NULLS LAST"#,
    )
    .fetch_all(&state.db)
    .await?;

    let attendance = sqlx::query_as::<_, StatusCount>(
        r#"SELECT a.status, COUNT(*) AS count
           FROM attendances a
           JOIN employees e ON e.id = a.employee_id
           WHERE a.attendance_date = $1 AND e.is_active = true
           GROUP BY a.status
           ORDER BY a.status"#,
    )
    .bind(date)
    .fetch_all(&state.db)
    .await?;

    let recorded: i64 = attendance.iter().map(|s| s.count).sum();

    let pending_leave_applications = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM leave_applications WHERE status = 'Pending'",
    )
    .fetch_one(&state.db)
    .await?;

    Ok(Json(Dashboard {
        date,
        active_employees,
        by_department,
        attendance,
        unprocessed: (active_employees - recorded).max(0),
        pending_leave_applications,
    }))
}

/// Per-employee attendance totals for a month
#[utoipa::path(
    get,
    path = "/api/v1/reports/attendance-summary",
    params(AttendanceSummaryQuery),
    responses(
        (status = 200, description = "Summary rows", body = Vec<AttendanceSummaryRow>),
        (status = 400, description = "Invalid month"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn attendance_summary(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AttendanceSummaryQuery>,
) -> AppResult<Json<Vec<AttendanceSummaryRow>>> {
    let month_start = parse_month(&query.month)?;
    let month_end = last_day_of_month(month_start);

    let rows = sqlx::query_as::<_, AttendanceSummaryRow>(
        r#"SELECT
               e.id AS employee_id,
               e.employee_code,
               e.name,
               e.department_id,
               COUNT(a.id) FILTER (WHERE a.status = 'Present') AS present,
               COUNT(a.id) FILTER (WHERE a.status = 'Late') AS late,
               COUNT(a.id) FILTER (WHERE a.status = 'Absent') AS absent,
               COUNT(a.id) FILTER (WHERE a.status = 'On Leave') AS on_leave,
               COUNT(a.id) FILTER (WHERE a.status = 'Off Day') AS off_day,
               COUNT(a.id) FILTER (WHERE a.status = 'Holiday') AS holiday,
               COALESCE(SUM(a.late_minutes), 0)::bigint AS late_minutes,
               COALESCE(SUM(a.ot_hours), 0) AS ot_hours
           FROM employees e
           LEFT JOIN attendances a
                  ON a.employee_id = e.id
                 AND a.attendance_date BETWEEN $1 AND $2
           WHERE e.joining_date <= $2
             AND (e.is_active = true OR a.id IS NOT NULL)
             AND ($3::uuid IS NULL OR e.department_id = $3)
             AND ($4::uuid IS NULL OR e.company_id = $4)
           GROUP BY e.id, e.employee_code, e.name, e.department_id
           ORDER BY e.employee_code"#,
    )
    .bind(month_start)
    .bind(month_end)
    .bind(query.department_id)
    .bind(query.company_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows))
}
