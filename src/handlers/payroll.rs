// src/handlers/payroll.rs

use crate::{
    auth::{AuthUser, HR_WRITERS},
    errors::{AppError, AppResult},
    models::{
        AdvanceSalary, AdvanceSalaryRequest, Bonus, BonusRequest, DailySalarySheet,
        MonthlySalarySheet, PayrollItemFilter, PayrollRun, PayrollRunType, RunDailyPayrollRequest,
        RunMonthlyPayrollRequest, SalaryIncrement, SalaryIncrementRequest, SalarySheetFilter,
    },
    services::{
        payroll::{process_payroll_background, salary_structure},
        period::{format_month, parse_month},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Normalizes a "YYYY-MM" month, rejecting anything else
fn normalize_month(month: &str) -> AppResult<String> {
    Ok(format_month(parse_month(month)?))
}

// ─── Advances ─────────────────────────────────────────────────────────────────

/// Record an advance; installments are deducted from the first deduction month on
#[utoipa::path(
    post,
    path = "/api/v1/advances",
    request_body = AdvanceSalaryRequest,
    responses(
        (status = 201, description = "Advance recorded", body = AdvanceSalary),
        (status = 400, description = "Invalid amounts or month"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_advance(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<AdvanceSalaryRequest>,
) -> AppResult<(StatusCode, Json<AdvanceSalary>)> {
    auth.require(HR_WRITERS)?;
    if body.amount <= Decimal::ZERO || body.monthly_installment <= Decimal::ZERO {
        return Err(AppError::Validation(
            "amount and monthly_installment must be positive".to_string(),
        ));
    }
    if body.monthly_installment > body.amount {
        return Err(AppError::Validation(
            "monthly_installment cannot exceed the advance".to_string(),
        ));
    }
    let first_month = normalize_month(&body.first_deduction_month)?;

    let advance = sqlx::query_as::<_, AdvanceSalary>(
        r#"INSERT INTO advance_salaries (
            id, employee_id, amount, monthly_installment, first_deduction_month,
            advance_date, remarks, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.employee_id)
    .bind(body.amount)
    .bind(body.monthly_installment)
    .bind(first_month)
    .bind(body.advance_date)
    .bind(&body.remarks)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(advance)))
}

/// List advances. `month` selects advances whose deductions begin that month.
#[utoipa::path(
    get,
    path = "/api/v1/advances",
    params(PayrollItemFilter),
    responses((status = 200, description = "Advances", body = Vec<AdvanceSalary>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_advances(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<PayrollItemFilter>,
) -> AppResult<Json<Vec<AdvanceSalary>>> {
    let month = filter.month.as_deref().map(normalize_month).transpose()?;
    let advances = sqlx::query_as::<_, AdvanceSalary>(
        r#"SELECT * FROM advance_salaries
           WHERE ($1::uuid IS NULL OR employee_id = $1)
             AND ($2::text IS NULL OR first_deduction_month = $2)
           ORDER BY advance_date DESC"#,
    )
    .bind(filter.employee_id)
    .bind(month)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(advances))
}

// ─── Increments ───────────────────────────────────────────────────────────────

fn validate_increment(previous_gross: Decimal, increment: Decimal) -> AppResult<Decimal> {
    if increment.is_zero() {
        return Err(AppError::Validation(
            "increment_amount cannot be zero".to_string(),
        ));
    }
    let new_gross = previous_gross + increment;
    if new_gross < Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "A decrement of {} exceeds the current gross of {}",
            -increment, previous_gross
        )));
    }
    Ok(new_gross)
}

/// Raise (or lower) an employee's gross salary and re-derive its structure
#[utoipa::path(
    post,
    path = "/api/v1/employees/{employee_id}/increments",
    request_body = SalaryIncrementRequest,
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 201, description = "Increment applied", body = SalaryIncrement),
        (status = 404, description = "Employee not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_increment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Json(body): Json<SalaryIncrementRequest>,
) -> AppResult<(StatusCode, Json<SalaryIncrement>)> {
    auth.require(HR_WRITERS)?;

    let mut tx = state.db.begin().await?;

    let previous_gross = sqlx::query_scalar::<_, Decimal>(
        "SELECT gross_salary FROM employees WHERE id = $1 FOR UPDATE",
    )
    .bind(employee_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;

    let new_gross = validate_increment(previous_gross, body.increment_amount)?;
    let structure = salary_structure(new_gross);

    sqlx::query(
        r#"UPDATE employees
           SET gross_salary = $2, basic_salary = $3, house_rent = $4, medical_allowance = $5,
               food_allowance = $6, conveyance = $7, updated_at = NOW()
           WHERE id = $1"#,
    )
    .bind(employee_id)
    .bind(structure.gross_salary)
    .bind(structure.basic_salary)
    .bind(structure.house_rent)
    .bind(structure.medical_allowance)
    .bind(structure.food_allowance)
    .bind(structure.conveyance)
    .execute(&mut *tx)
    .await?;

    let increment = sqlx::query_as::<_, SalaryIncrement>(
        r#"INSERT INTO salary_increments (
            id, employee_id, previous_gross, increment_amount, new_gross,
            effective_date, remarks, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(employee_id)
    .bind(previous_gross)
    .bind(body.increment_amount)
    .bind(new_gross)
    .bind(body.effective_date)
    .bind(&body.remarks)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(%employee_id, %previous_gross, %new_gross, "salary increment applied");
    Ok((StatusCode::CREATED, Json(increment)))
}

/// Increment history of an employee
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/increments",
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses((status = 200, description = "Increments", body = Vec<SalaryIncrement>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_increments(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<Vec<SalaryIncrement>>> {
    let increments = sqlx::query_as::<_, SalaryIncrement>(
        "SELECT * FROM salary_increments WHERE employee_id = $1 ORDER BY effective_date DESC, created_at DESC",
    )
    .bind(employee_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(increments))
}

// ─── Bonuses ──────────────────────────────────────────────────────────────────

/// Grant a bonus paid with the given month's salary
#[utoipa::path(
    post,
    path = "/api/v1/bonuses",
    request_body = BonusRequest,
    responses(
        (status = 201, description = "Bonus granted", body = Bonus),
        (status = 400, description = "Invalid amount or month"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_bonus(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BonusRequest>,
) -> AppResult<(StatusCode, Json<Bonus>)> {
    auth.require(HR_WRITERS)?;
    if body.amount <= Decimal::ZERO {
        return Err(AppError::Validation("Bonus amount must be positive".to_string()));
    }
    let month = normalize_month(&body.bonus_month)?;

    let bonus = sqlx::query_as::<_, Bonus>(
        r#"INSERT INTO bonuses (id, employee_id, bonus_type, amount, bonus_month, remarks, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.employee_id)
    .bind(body.bonus_type)
    .bind(body.amount)
    .bind(month)
    .bind(&body.remarks)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(bonus)))
}

/// List bonuses
#[utoipa::path(
    get,
    path = "/api/v1/bonuses",
    params(PayrollItemFilter),
    responses((status = 200, description = "Bonuses", body = Vec<Bonus>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_bonuses(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<PayrollItemFilter>,
) -> AppResult<Json<Vec<Bonus>>> {
    let month = filter.month.as_deref().map(normalize_month).transpose()?;
    let bonuses = sqlx::query_as::<_, Bonus>(
        r#"SELECT * FROM bonuses
           WHERE ($1::uuid IS NULL OR employee_id = $1)
             AND ($2::text IS NULL OR bonus_month = $2)
           ORDER BY bonus_month DESC, created_at DESC"#,
    )
    .bind(filter.employee_id)
    .bind(month)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(bonuses))
}

// ─── Runs ─────────────────────────────────────────────────────────────────────

/// Inserts a pending run and hands it to a background task.
/// A second active run for the same type and period is refused with 409.
async fn start_run(
    db: &PgPool,
    run_type: PayrollRunType,
    period: String,
    company_id: Option<Uuid>,
    initiated_by: Uuid,
) -> AppResult<PayrollRun> {
    let active = sqlx::query_scalar::<_, Uuid>(
        r#"SELECT id FROM payroll_runs
           WHERE run_type = $1 AND period = $2 AND status IN ('pending', 'processing')"#,
    )
    .bind(run_type)
    .bind(&period)
    .fetch_optional(db)
    .await?;

    if let Some(active) = active {
        return Err(AppError::Conflict(format!(
            "Payroll for {} is already running (run {})",
            period, active
        )));
    }

    let run = sqlx::query_as::<_, PayrollRun>(
        r#"INSERT INTO payroll_runs (id, run_type, period, company_id, status, initiated_by, initiated_at)
           VALUES ($1, $2, $3, $4, 'pending', $5, NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(run_type)
    .bind(&period)
    .bind(company_id)
    .bind(initiated_by)
    .fetch_one(db)
    .await?;

    // The HTTP response returns 202 right away, however many employees there are.
    tokio::spawn(process_payroll_background(db.clone(), run.clone()));

    Ok(run)
}

/// Generate monthly salary sheets. Returns immediately; poll the run for progress.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/monthly/run",
    request_body = RunMonthlyPayrollRequest,
    responses(
        (status = 202, description = "Payroll run started", body = PayrollRun),
        (status = 409, description = "A run for this month is already active"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn run_monthly_payroll(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<RunMonthlyPayrollRequest>,
) -> AppResult<(StatusCode, Json<PayrollRun>)> {
    auth.require(HR_WRITERS)?;
    let month = normalize_month(&body.salary_month)?;
    let run = start_run(
        &state.db,
        PayrollRunType::Monthly,
        month,
        body.company_id,
        auth.id,
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(run)))
}

/// Generate daily salary sheets for one date
#[utoipa::path(
    post,
    path = "/api/v1/payroll/daily/run",
    request_body = RunDailyPayrollRequest,
    responses(
        (status = 202, description = "Payroll run started", body = PayrollRun),
        (status = 409, description = "A run for this date is already active"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn run_daily_payroll(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<RunDailyPayrollRequest>,
) -> AppResult<(StatusCode, Json<PayrollRun>)> {
    auth.require(HR_WRITERS)?;
    let run = start_run(
        &state.db,
        PayrollRunType::Daily,
        body.work_date.format("%Y-%m-%d").to_string(),
        body.company_id,
        auth.id,
    )
    .await?;
    Ok((StatusCode::ACCEPTED, Json(run)))
}

/// List payroll runs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/payroll/runs",
    responses((status = 200, description = "List of payroll runs", body = Vec<PayrollRun>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payroll_runs(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PayrollRun>>> {
    let runs = sqlx::query_as::<_, PayrollRun>(
        "SELECT * FROM payroll_runs ORDER BY initiated_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(runs))
}

/// Get status and totals of a payroll run
#[utoipa::path(
    get,
    path = "/api/v1/payroll/runs/{run_id}",
    params(("run_id" = Uuid, Path, description = "Payroll run ID")),
    responses(
        (status = 200, description = "Payroll run detail", body = PayrollRun),
        (status = 404, description = "Run not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll_run(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> AppResult<Json<PayrollRun>> {
    let run = sqlx::query_as::<_, PayrollRun>("SELECT * FROM payroll_runs WHERE id = $1")
        .bind(run_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payroll run {} not found", run_id)))?;
    Ok(Json(run))
}

// ─── Sheets ───────────────────────────────────────────────────────────────────

/// Monthly salary sheet rows of a month
#[utoipa::path(
    get,
    path = "/api/v1/payroll/monthly/{salary_month}",
    params(
        ("salary_month" = String, Path, description = "Month as YYYY-MM"),
        SalarySheetFilter,
    ),
    responses((status = 200, description = "Sheet rows", body = Vec<MonthlySalarySheet>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_monthly_sheets(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(salary_month): Path<String>,
    Query(filter): Query<SalarySheetFilter>,
) -> AppResult<Json<Vec<MonthlySalarySheet>>> {
    let month = normalize_month(&salary_month)?;
    let rows = sqlx::query_as::<_, MonthlySalarySheet>(
        r#"SELECT s.* FROM monthly_salary_sheets s
           JOIN employees e ON e.id = s.employee_id
           WHERE s.salary_month = $1
             AND ($2::uuid IS NULL OR s.employee_id = $2)
             AND ($3::uuid IS NULL OR s.company_id = $3)
             AND ($4::uuid IS NULL OR s.department_id = $4)
           ORDER BY e.employee_code"#,
    )
    .bind(month)
    .bind(filter.employee_id)
    .bind(filter.company_id)
    .bind(filter.department_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

/// Daily salary sheet rows of a date
#[utoipa::path(
    get,
    path = "/api/v1/payroll/daily/{work_date}",
    params(
        ("work_date" = String, Path, description = "Date as YYYY-MM-DD"),
        SalarySheetFilter,
    ),
    responses((status = 200, description = "Sheet rows", body = Vec<DailySalarySheet>)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_daily_sheets(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(work_date): Path<NaiveDate>,
    Query(filter): Query<SalarySheetFilter>,
) -> AppResult<Json<Vec<DailySalarySheet>>> {
    let rows = sqlx::query_as::<_, DailySalarySheet>(
        r#"SELECT s.* FROM daily_salary_sheets s
           JOIN employees e ON e.id = s.employee_id
           WHERE s.work_date = $1
             AND ($2::uuid IS NULL OR s.employee_id = $2)
             AND ($3::uuid IS NULL OR s.company_id = $3)
             AND ($4::uuid IS NULL OR e.department_id = $4)
           ORDER BY e.employee_code"#,
    )
    .bind(work_date)
    .bind(filter.employee_id)
    .bind(filter.company_id)
    .bind(filter.department_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::BonusType, state::testing::db_state};
    use rust_decimal_macros::dec;

    #[test]
    fn months_are_normalized() {
        assert_eq!(normalize_month("2024-03").unwrap(), "2024-03");
        assert!(normalize_month("March 2024").is_err());
    }

    #[test]
    fn increments_cannot_push_gross_below_zero() {
        assert_eq!(validate_increment(dec!(12000), dec!(1500)).unwrap(), dec!(13500));
        assert_eq!(validate_increment(dec!(12000), dec!(-2000)).unwrap(), dec!(10000));
        assert!(validate_increment(dec!(12000), dec!(-12001)).is_err());
        assert!(validate_increment(dec!(12000), dec!(0)).is_err());
    }

    #[test]
    fn bonus_types_use_display_labels() {
        assert_eq!(serde_json::to_value(BonusType::Festival).unwrap(), "Festival");
        let parsed: BonusType = serde_json::from_str("\"Production\"").unwrap();
        assert_eq!(parsed, BonusType::Production);
        assert!(serde_json::from_str::<BonusType>("\"festival\"").is_err());
    }

    #[tokio::test]
    async fn bonus_labels_match_the_database_enum() {
        let Some(state) = db_state().await else {
            return;
        };
        for kind in [
            BonusType::Festival,
            BonusType::Attendance,
            BonusType::Production,
            BonusType::Other,
        ] {
            let stored: BonusType = sqlx::query_scalar("SELECT $1::bonus_type")
                .bind(kind)
                .fetch_one(&state.db)
                .await
                .unwrap();
            assert_eq!(stored, kind);
        }
        let label: String = sqlx::query_scalar("SELECT $1::bonus_type::text")
            .bind(BonusType::Festival)
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(label, "Festival");
    }
}
