// src/handlers/attendance.rs

use crate::{
    auth::{AuthUser, HR_WRITERS},
    errors::{AppError, AppResult},
    models::{
        Attendance, AttendanceFilter, AttendanceLog, AttendanceLogFilter, DateRangeFilter,
        EmployeeShiftRoster, Holiday, HolidayRequest, ImportPunchesRequest, ImportPunchesResponse,
        ManualAttendanceRequest, MessageResponse, ProcessAttendanceRequest,
        ProcessAttendanceResponse, RosterFilter, RosterRequest, RosterResponse, Shift, ShiftRequest,
    },
    services::{attendance::process_day, device::store_punches, period::date_range},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Longest span a single roster request may plan
const MAX_ROSTER_DAYS: i64 = 366;

fn validate_shift(body: &ShiftRequest) -> AppResult<()> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Shift name is required".to_string()));
    }
    if body.late_in_minutes.is_some_and(|m| m < 0) {
        return Err(AppError::Validation(
            "late_in_minutes cannot be negative".to_string(),
        ));
    }
    if let (Some(start), Some(end)) = (body.lunch_start, body.lunch_end) {
        if end <= start {
            return Err(AppError::Validation(
                "lunch_end must be after lunch_start".to_string(),
            ));
        }
    }
    Ok(())
}

// ─── Shifts ───────────────────────────────────────────────────────────────────

/// Create a shift
#[utoipa::path(
    post,
    path = "/api/v1/shifts",
    request_body = ShiftRequest,
    responses(
        (status = 201, description = "Shift created", body = Shift),
        (status = 409, description = "Shift name already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn create_shift(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ShiftRequest>,
) -> AppResult<(StatusCode, Json<Shift>)> {
    auth.require(HR_WRITERS)?;
    validate_shift(&body)?;

    let shift = sqlx::query_as::<_, Shift>(
        r#"INSERT INTO shifts (id, name, start_time, end_time, lunch_start, lunch_end, late_in_minutes, weekends, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.name.trim())
    .bind(body.start_time)
    .bind(body.end_time)
    .bind(body.lunch_start)
    .bind(body.lunch_end)
    .bind(body.late_in_minutes.unwrap_or(0))
    .bind(&body.weekends)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(shift)))
}

/// List shifts
#[utoipa::path(
    get,
    path = "/api/v1/shifts",
    responses((status = 200, description = "Shifts", body = Vec<Shift>)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_shifts(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Shift>>> {
    let shifts = sqlx::query_as::<_, Shift>("SELECT * FROM shifts ORDER BY start_time, name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(shifts))
}

/// Get a shift
#[utoipa::path(
    get,
    path = "/api/v1/shifts/{shift_id}",
    params(("shift_id" = Uuid, Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Shift", body = Shift),
        (status = 404, description = "Shift not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn get_shift(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(shift_id): Path<Uuid>,
) -> AppResult<Json<Shift>> {
    let shift = sqlx::query_as::<_, Shift>("SELECT * FROM shifts WHERE id = $1")
        .bind(shift_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Shift {} not found", shift_id)))?;
    Ok(Json(shift))
}

/// Update a shift
#[utoipa::path(
    put,
    path = "/api/v1/shifts/{shift_id}",
    request_body = ShiftRequest,
    params(("shift_id" = Uuid, Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Shift updated", body = Shift),
        (status = 404, description = "Shift not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_shift(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(shift_id): Path<Uuid>,
    Json(body): Json<ShiftRequest>,
) -> AppResult<Json<Shift>> {
    auth.require(HR_WRITERS)?;
    validate_shift(&body)?;

    let shift = sqlx::query_as::<_, Shift>(
        r#"UPDATE shifts
           SET name = $2, start_time = $3, end_time = $4, lunch_start = $5, lunch_end = $6,
               late_in_minutes = $7, weekends = $8, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(shift_id)
    .bind(body.name.trim())
    .bind(body.start_time)
    .bind(body.end_time)
    .bind(body.lunch_start)
    .bind(body.lunch_end)
    .bind(body.late_in_minutes.unwrap_or(0))
    .bind(&body.weekends)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Shift {} not found", shift_id)))?;

    Ok(Json(shift))
}

/// Delete a shift; employees on it fall back to no shift
#[utoipa::path(
    delete,
    path = "/api/v1/shifts/{shift_id}",
    params(("shift_id" = Uuid, Path, description = "Shift ID")),
    responses(
        (status = 200, description = "Shift deleted", body = MessageResponse),
        (status = 404, description = "Shift not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_shift(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(shift_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    let result = sqlx::query("DELETE FROM shifts WHERE id = $1")
        .bind(shift_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Shift {} not found", shift_id)));
    }
    Ok(Json(MessageResponse::new("Shift deleted")))
}

// ─── Holidays ─────────────────────────────────────────────────────────────────

/// Add a holiday to the calendar
#[utoipa::path(
    post,
    path = "/api/v1/holidays",
    request_body = HolidayRequest,
    responses(
        (status = 201, description = "Holiday added", body = Holiday),
        (status = 409, description = "Date already a holiday"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn create_holiday(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<HolidayRequest>,
) -> AppResult<(StatusCode, Json<Holiday>)> {
    auth.require(HR_WRITERS)?;
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Holiday name is required".to_string()));
    }

    let holiday = sqlx::query_as::<_, Holiday>(
        r#"INSERT INTO holidays (id, holiday_date, name, created_at)
           VALUES ($1, $2, $3, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.holiday_date)
    .bind(body.name.trim())
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(holiday)))
}

/// List holidays in a date range
#[utoipa::path(
    get,
    path = "/api/v1/holidays",
    params(DateRangeFilter),
    responses((status = 200, description = "Holidays", body = Vec<Holiday>)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_holidays(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<DateRangeFilter>,
) -> AppResult<Json<Vec<Holiday>>> {
    let holidays = sqlx::query_as::<_, Holiday>(
        r#"SELECT * FROM holidays
           WHERE ($1::date IS NULL OR holiday_date >= $1)
             AND ($2::date IS NULL OR holiday_date <= $2)
           ORDER BY holiday_date"#,
    )
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(holidays))
}

/// Remove a holiday
#[utoipa::path(
    delete,
    path = "/api/v1/holidays/{holiday_id}",
    params(("holiday_id" = Uuid, Path, description = "Holiday ID")),
    responses(
        (status = 200, description = "Holiday removed", body = MessageResponse),
        (status = 404, description = "Holiday not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_holiday(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(holiday_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    let result = sqlx::query("DELETE FROM holidays WHERE id = $1")
        .bind(holiday_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Holiday {} not found", holiday_id)));
    }
    Ok(Json(MessageResponse::new("Holiday removed")))
}

// ─── Rosters ──────────────────────────────────────────────────────────────────

/// Plan a shift for employees over a date range, replacing earlier plans
#[utoipa::path(
    post,
    path = "/api/v1/rosters",
    request_body = RosterRequest,
    responses(
        (status = 200, description = "Roster planned", body = RosterResponse),
        (status = 400, description = "Invalid range or unknown employee/shift"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn plan_roster(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<RosterRequest>,
) -> AppResult<Json<RosterResponse>> {
    auth.require(HR_WRITERS)?;
    if body.employee_ids.is_empty() {
        return Err(AppError::Validation("employee_ids is empty".to_string()));
    }
    if body.to_date < body.from_date {
        return Err(AppError::Validation(
            "to_date must not be before from_date".to_string(),
        ));
    }
    if (body.to_date - body.from_date).num_days() >= MAX_ROSTER_DAYS {
        return Err(AppError::Validation(format!(
            "A roster covers at most {MAX_ROSTER_DAYS} days"
        )));
    }

    let mut ids = Vec::new();
    let mut employees = Vec::new();
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut off_days = Vec::new();
    for employee_id in &body.employee_ids {
        for date in date_range(body.from_date, body.to_date) {
            ids.push(Uuid::new_v4());
            employees.push(*employee_id);
            dates.push(date);
            off_days.push(body.off_dates.contains(&date));
        }
    }

    let result = sqlx::query(
        r#"INSERT INTO employee_shift_rosters (id, employee_id, shift_id, roster_date, is_off_day, created_at)
           SELECT r.id, r.employee_id, $3, r.roster_date, r.is_off_day, NOW()
           FROM UNNEST($1::uuid[], $2::uuid[], $4::date[], $5::bool[])
                AS r(id, employee_id, roster_date, is_off_day)
           ON CONFLICT (employee_id, roster_date) DO UPDATE
           SET shift_id = EXCLUDED.shift_id, is_off_day = EXCLUDED.is_off_day"#,
    )
    .bind(&ids)
    .bind(&employees)
    .bind(body.shift_id)
    .bind(&dates)
    .bind(&off_days)
    .execute(&state.db)
    .await?;

    Ok(Json(RosterResponse {
        planned: result.rows_affected() as usize,
    }))
}

/// List planned shifts
#[utoipa::path(
    get,
    path = "/api/v1/rosters",
    params(RosterFilter),
    responses((status = 200, description = "Roster entries", body = Vec<EmployeeShiftRoster>)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_rosters(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<RosterFilter>,
) -> AppResult<Json<Vec<EmployeeShiftRoster>>> {
    let rosters = sqlx::query_as::<_, EmployeeShiftRoster>(
        r#"SELECT * FROM employee_shift_rosters
           WHERE ($1::uuid IS NULL OR employee_id = $1)
             AND ($2::date IS NULL OR roster_date >= $2)
             AND ($3::date IS NULL OR roster_date <= $3)
           ORDER BY roster_date, employee_id"#,
    )
    .bind(filter.employee_id)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rosters))
}

// ─── Raw punches ──────────────────────────────────────────────────────────────

/// Upload punches exported from a device; already stored punches are skipped
#[utoipa::path(
    post,
    path = "/api/v1/attendance/logs/import",
    request_body = ImportPunchesRequest,
    responses((status = 200, description = "Punches stored", body = ImportPunchesResponse)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn import_punches(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ImportPunchesRequest>,
) -> AppResult<Json<ImportPunchesResponse>> {
    auth.require(HR_WRITERS)?;
    if let Some(blank) = body.punches.iter().position(|p| p.proximity.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "Punch {} has no proximity id",
            blank + 1
        )));
    }

    let inserted = store_punches(&state.db, &body.punches, body.company_name.as_deref()).await?;
    Ok(Json(ImportPunchesResponse {
        received: body.punches.len(),
        inserted,
    }))
}

/// List raw punches
#[utoipa::path(
    get,
    path = "/api/v1/attendance/logs",
    params(AttendanceLogFilter),
    responses((status = 200, description = "Punches", body = Vec<AttendanceLog>)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_punches(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AttendanceLogFilter>,
) -> AppResult<Json<Vec<AttendanceLog>>> {
    let from = filter.from.map(|d| d.and_time(NaiveTime::MIN));
    let until = filter
        .to
        .map(|d| d.and_time(NaiveTime::MIN) + chrono::Duration::days(1));

    let logs = sqlx::query_as::<_, AttendanceLog>(
        r#"SELECT * FROM attendance_logs
           WHERE ($1::text IS NULL OR proximity = $1)
             AND ($2::uuid IS NULL OR employee_id = $2)
             AND ($3::timestamp IS NULL OR punch_time >= $3)
             AND ($4::timestamp IS NULL OR punch_time < $4)
           ORDER BY punch_time"#,
    )
    .bind(filter.proximity)
    .bind(filter.employee_id)
    .bind(from)
    .bind(until)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(logs))
}

// ─── Daily attendance ─────────────────────────────────────────────────────────

fn validate_manual(body: &ManualAttendanceRequest) -> AppResult<()> {
    if body.late_minutes.is_some_and(|m| m < 0) {
        return Err(AppError::Validation(
            "late_minutes cannot be negative".to_string(),
        ));
    }
    if body.ot_hours.is_some_and(|h| h < Decimal::ZERO) {
        return Err(AppError::Validation("ot_hours cannot be negative".to_string()));
    }
    if let (Some(arrived), Some(left)) = (body.in_time, body.out_time) {
        if left < arrived {
            return Err(AppError::Validation(
                "out_time must not be before in_time".to_string(),
            ));
        }
    }
    Ok(())
}

/// Record a day by hand. The row is marked manual and processing never overwrites it.
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    request_body = ManualAttendanceRequest,
    responses(
        (status = 201, description = "Attendance recorded", body = Attendance),
        (status = 400, description = "Invalid values or unknown employee"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn create_manual_attendance(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ManualAttendanceRequest>,
) -> AppResult<(StatusCode, Json<Attendance>)> {
    auth.require(HR_WRITERS)?;
    validate_manual(&body)?;

    let attendance = sqlx::query_as::<_, Attendance>(
        r#"INSERT INTO attendances (
            id, employee_id, attendance_date, shift_id, in_time, out_time, status,
            late_minutes, ot_hours, remarks, is_manual, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,true,NOW(),NOW())
        ON CONFLICT (employee_id, attendance_date) DO UPDATE
        SET shift_id = EXCLUDED.shift_id,
            in_time = EXCLUDED.in_time,
            out_time = EXCLUDED.out_time,
            status = EXCLUDED.status,
            late_minutes = EXCLUDED.late_minutes,
            ot_hours = EXCLUDED.ot_hours,
            remarks = EXCLUDED.remarks,
            is_manual = true,
            updated_at = NOW()
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.employee_id)
    .bind(body.attendance_date)
    .bind(body.shift_id)
    .bind(body.in_time)
    .bind(body.out_time)
    .bind(body.status)
    .bind(body.late_minutes.unwrap_or(0))
    .bind(body.ot_hours.unwrap_or_default())
    .bind(&body.remarks)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(attendance)))
}

/// Correct a day by hand; the employee and date of the row stay as they are
#[utoipa::path(
    put,
    path = "/api/v1/attendance/{attendance_id}",
    request_body = ManualAttendanceRequest,
    params(("attendance_id" = Uuid, Path, description = "Attendance ID")),
    responses(
        (status = 200, description = "Attendance corrected", body = Attendance),
        (status = 404, description = "Attendance not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(attendance_id): Path<Uuid>,
    Json(body): Json<ManualAttendanceRequest>,
) -> AppResult<Json<Attendance>> {
    auth.require(HR_WRITERS)?;
    validate_manual(&body)?;

    let attendance = sqlx::query_as::<_, Attendance>(
        r#"UPDATE attendances
           SET shift_id = $2, in_time = $3, out_time = $4, status = $5,
               late_minutes = $6, ot_hours = $7, remarks = $8,
               is_manual = true, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(attendance_id)
    .bind(body.shift_id)
    .bind(body.in_time)
    .bind(body.out_time)
    .bind(body.status)
    .bind(body.late_minutes.unwrap_or(0))
    .bind(body.ot_hours.unwrap_or_default())
    .bind(&body.remarks)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Attendance {} not found", attendance_id)))?;

    Ok(Json(attendance))
}

/// List daily attendance
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceFilter),
    responses((status = 200, description = "Attendance rows", body = Vec<Attendance>)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AttendanceFilter>,
) -> AppResult<Json<Vec<Attendance>>> {
    let rows = sqlx::query_as::<_, Attendance>(
        r#"SELECT * FROM attendances
           WHERE ($1::uuid IS NULL OR employee_id = $1)
             AND ($2::date IS NULL OR attendance_date >= $2)
             AND ($3::date IS NULL OR attendance_date <= $3)
             AND ($4::attendance_status IS NULL OR status = $4)
           ORDER BY attendance_date, employee_id"#,
    )
    .bind(filter.employee_id)
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.status)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// Derive a day's attendance from punches, rosters, holidays and leave
#[utoipa::path(
    post,
    path = "/api/v1/attendance/process",
    request_body = ProcessAttendanceRequest,
    responses((status = 200, description = "Day processed", body = ProcessAttendanceResponse)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn process_attendance(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ProcessAttendanceRequest>,
) -> AppResult<Json<ProcessAttendanceResponse>> {
    auth.require(HR_WRITERS)?;
    let outcome = process_day(&state.db, body.attendance_date, body.employee_id).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;

    fn manual() -> ManualAttendanceRequest {
        ManualAttendanceRequest {
            employee_id: Uuid::new_v4(),
            attendance_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            shift_id: None,
            in_time: NaiveTime::from_hms_opt(8, 0, 0),
            out_time: NaiveTime::from_hms_opt(17, 0, 0),
            status: AttendanceStatus::Present,
            late_minutes: None,
            ot_hours: None,
            remarks: Some("card lost".to_string()),
        }
    }

    #[test]
    fn manual_rows_are_checked() {
        assert!(validate_manual(&manual()).is_ok());

        let mut reversed = manual();
        reversed.out_time = NaiveTime::from_hms_opt(7, 0, 0);
        assert!(validate_manual(&reversed).is_err());

        let mut negative = manual();
        negative.ot_hours = Some(Decimal::NEGATIVE_ONE);
        assert!(validate_manual(&negative).is_err());
    }

    #[test]
    fn shift_lunch_must_be_ordered() {
        let shift: ShiftRequest = serde_json::from_value(serde_json::json!({
            "name": "General",
            "start_time": "08:00:00",
            "end_time": "17:00:00",
            "lunch_start": "14:00:00",
            "lunch_end": "13:00:00"
        }))
        .unwrap();
        assert!(validate_shift(&shift).is_err());
    }
}
