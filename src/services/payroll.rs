// src/services/payroll.rs

use crate::{
    errors::{AppError, AppResult},
    models::{
        AdvanceSalary, Attendance, AttendanceStatus, Employee, PayrollRun, PayrollRunType,
        SalaryStructure,
    },
    services::period::{days_in_month, format_month, last_day_of_month, months_between, parse_month},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

// Garment sector wage structure: fixed allowances on top of basic, house
// rent at half of basic.
pub const MEDICAL_ALLOWANCE: Decimal = dec!(750);
pub const FOOD_ALLOWANCE: Decimal = dec!(1250);
pub const CONVEYANCE: Decimal = dec!(450);
const BASIC_DIVISOR: Decimal = dec!(1.5);
/// Overtime is paid at twice the hourly basic, hourly basic = basic / 208
const OT_HOURS_PER_MONTH: Decimal = dec!(208);
const OT_MULTIPLIER: Decimal = dec!(2);

/// Splits a gross salary into its components. The parts always add back up to
/// `gross` exactly; salaries too small to carry the fixed allowances are all basic.
pub fn salary_structure(gross: Decimal) -> SalaryStructure {
    let fixed = MEDICAL_ALLOWANCE + FOOD_ALLOWANCE + CONVEYANCE;
    if gross <= fixed {
        return SalaryStructure {
            gross_salary: gross,
            basic_salary: gross,
            house_rent: dec!(0),
            medical_allowance: dec!(0),
            food_allowance: dec!(0),
            conveyance: dec!(0),
        };
    }

    let basic = ((gross - fixed) / BASIC_DIVISOR).round_dp(2);
    SalaryStructure {
        gross_salary: gross,
        basic_salary: basic,
        house_rent: gross - fixed - basic,
        medical_allowance: MEDICAL_ALLOWANCE,
        food_allowance: FOOD_ALLOWANCE,
        conveyance: CONVEYANCE,
    }
}

pub fn ot_rate(basic: Decimal) -> Decimal {
    (basic / OT_HOURS_PER_MONTH * OT_MULTIPLIER).round_dp(2)
}

/// Installment owed for the month starting at `month_start`. Derived from the
/// schedule alone, so re-running a month never changes what was owed.
pub fn advance_installment(advance: &AdvanceSalary, month_start: NaiveDate) -> Decimal {
    let Ok(first) = parse_month(&advance.first_deduction_month) else {
        return dec!(0);
    };
    let elapsed = months_between(first, month_start);
    if elapsed < 0 {
        return dec!(0);
    }

    let recovered = advance.monthly_installment * Decimal::from(elapsed);
    let outstanding = advance.amount - recovered;
    if outstanding <= dec!(0) {
        dec!(0)
    } else {
        outstanding.min(advance.monthly_installment)
    }
}

// ─── Monthly sheet ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculatedMonthlySheet {
    pub employee_id: Uuid,
    pub structure: SalaryStructure,
    pub total_days: i32,
    pub payable_days: i32,
    pub present_days: i32,
    pub late_days: i32,
    pub absent_days: i32,
    pub leave_days: i32,
    pub holidays: i32,
    pub off_days: i32,
    pub ot_hours: Decimal,
    pub ot_rate: Decimal,
    pub ot_amount: Decimal,
    pub attendance_bonus: Decimal,
    pub bonus_amount: Decimal,
    pub total_earning: Decimal,
    pub absent_deduction: Decimal,
    pub advance_deduction: Decimal,
    pub total_deduction: Decimal,
    pub net_payable: Decimal,
}

pub struct PayrollService;

impl PayrollService {
    /// Calculate one employee's month from the attendance rows of that month,
    /// the bonuses granted for it and the employee's salary advances.
    ///
    /// The employment window runs from the joining date to `last_working_day`
    /// (the separation date of a leaver), clipped to the month. Days inside the
    /// window without an attendance row count as absent, so attendance must be
    /// processed before payroll is run.
    pub fn calculate_monthly(
        employee: &Employee,
        month_start: NaiveDate,
        last_working_day: Option<NaiveDate>,
        attendance: &[Attendance],
        bonus_amount: Decimal,
        advances: &[AdvanceSalary],
    ) -> CalculatedMonthlySheet {
        let month_end = last_day_of_month(month_start);
        let total_days = days_in_month(month_start) as i32;
        let employed_from = employee.joining_date.max(month_start);
        let employed_until = last_working_day.map_or(month_end, |d| d.min(month_end));
        let payable_days = if employed_from > employed_until {
            0
        } else {
            (employed_until - employed_from).num_days() as i32 + 1
        };

        let mut present_days = 0;
        let mut late_days = 0;
        let mut explicit_absent = 0;
        let mut leave_days = 0;
        let mut holidays = 0;
        let mut off_days = 0;
        let mut ot_hours = dec!(0);
        let mut recorded = 0;

        for row in attendance
            .iter()
            .filter(|a| a.attendance_date >= employed_from && a.attendance_date <= employed_until)
        {
            recorded += 1;
            match row.status {
                AttendanceStatus::Present => present_days += 1,
                AttendanceStatus::Late => {
                    present_days += 1;
                    late_days += 1;
                }
                AttendanceStatus::Absent => explicit_absent += 1,
                AttendanceStatus::OnLeave => leave_days += 1,
                AttendanceStatus::Holiday => holidays += 1,
                AttendanceStatus::OffDay => off_days += 1,
            }
            ot_hours += row.ot_hours;
        }
        let absent_days = explicit_absent + (payable_days - recorded).max(0);

        let structure = SalaryStructure {
            gross_salary: employee.gross_salary,
            basic_salary: employee.basic_salary,
            house_rent: employee.house_rent,
            medical_allowance: employee.medical_allowance,
            food_allowance: employee.food_allowance,
            conveyance: employee.conveyance,
        };

        let days = Decimal::from(total_days);
        let earned_gross =
            (employee.gross_salary * Decimal::from(payable_days) / days).round_dp(2);

        let ot_hours = if employee.ot_eligible { ot_hours } else { dec!(0) };
        let rate = ot_rate(employee.basic_salary);
        let ot_amount = (rate * ot_hours).round_dp(2);

        let full_month = payable_days == total_days;
        let attendance_bonus = if full_month && absent_days == 0 && leave_days == 0 {
            employee.attendance_bonus
        } else {
            dec!(0)
        };

        let total_earning = earned_gross + ot_amount + attendance_bonus + bonus_amount;

        let absent_deduction = (employee.basic_salary / days * Decimal::from(absent_days))
            .round_dp(2)
            .min(total_earning);

        let owed: Decimal = advances
            .iter()
            .map(|a| advance_installment(a, month_start))
            .sum();
        let advance_deduction = owed.min(total_earning - absent_deduction);

        let total_deduction = absent_deduction + advance_deduction;

        CalculatedMonthlySheet {
            employee_id: employee.id,
            structure,
            total_days,
            payable_days,
            present_days,
            late_days,
            absent_days,
            leave_days,
            holidays,
            off_days,
            ot_hours,
            ot_rate: rate,
            ot_amount,
            attendance_bonus,
            bonus_amount,
            total_earning,
            absent_deduction,
            advance_deduction,
            total_deduction,
            net_payable: total_earning - total_deduction,
        }
    }

    /// Calculate one employee's day. A day without an attendance row, or an
    /// absent day, deducts the per-day basic.
    pub fn calculate_daily(
        employee: &Employee,
        work_date: NaiveDate,
        attendance: Option<&Attendance>,
    ) -> CalculatedDailySheet {
        let days = Decimal::from(days_in_month(work_date));
        let daily_gross = (employee.gross_salary / days).round_dp(2);
        let status = attendance.map(|a| a.status);

        let ot_hours = match attendance {
            Some(a) if employee.ot_eligible => a.ot_hours,
            _ => dec!(0),
        };
        let ot_amount = (ot_rate(employee.basic_salary) * ot_hours).round_dp(2);
        let total_earning = daily_gross + ot_amount;

        let total_deduction = match status {
            Some(s) if s.is_paid() => dec!(0),
            _ => (employee.basic_salary / days).round_dp(2).min(total_earning),
        };

        CalculatedDailySheet {
            employee_id: employee.id,
            status,
            daily_gross,
            ot_hours,
            ot_amount,
            total_earning,
            total_deduction,
            net_payable: total_earning - total_deduction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculatedDailySheet {
    pub employee_id: Uuid,
    pub status: Option<AttendanceStatus>,
    pub daily_gross: Decimal,
    pub ot_hours: Decimal,
    pub ot_amount: Decimal,
    pub total_earning: Decimal,
    pub total_deduction: Decimal,
    pub net_payable: Decimal,
}

// ─── Background runs ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RunTotals {
    employee_count: i32,
    total_earning: Decimal,
    total_deduction: Decimal,
    total_net: Decimal,
}

/// Spawned with tokio::spawn so the HTTP request returns immediately.
/// Poll GET /api/v1/payroll/runs/{payroll_run_id} to track progress.
pub async fn process_payroll_background(db: PgPool, run: PayrollRun) {
    info!(
        "Starting {:?} payroll run {} for period {}",
        run.run_type, run.id, run.period
    );

    if let Err(e) = sqlx::query("UPDATE payroll_runs SET status = 'processing' WHERE id = $1")
        .bind(run.id)
        .execute(&db)
        .await
    {
        error!("Failed to mark payroll run {} processing: {}", run.id, e);
        return;
    }

    let result = match run.run_type {
        PayrollRunType::Monthly => run_monthly(&db, &run).await,
        PayrollRunType::Daily => run_daily(&db, &run).await,
    };

    match result {
        Ok(totals) => {
            let update = sqlx::query(
                r#"UPDATE payroll_runs
                   SET status = 'completed',
                       employee_count = $1,
                       total_earning = $2,
                       total_deduction = $3,
                       total_net = $4,
                       error_message = NULL,
                       completed_at = NOW()
                   WHERE id = $5"#,
            )
            .bind(totals.employee_count)
            .bind(totals.total_earning)
            .bind(totals.total_deduction)
            .bind(totals.total_net)
            .bind(run.id)
            .execute(&db)
            .await;

            if let Err(e) = update {
                error!("Failed to record totals for payroll run {}: {}", run.id, e);
                return;
            }
            info!(
                "Payroll run {} complete. {} employees, total net payable {}",
                run.id, totals.employee_count, totals.total_net
            );
        }
        Err(e) => {
            error!("Payroll run {} failed: {}", run.id, e);
            mark_failed(&db, run.id, &e.to_string()).await;
        }
    }
}

/// Runs left pending or processing by a previous process can never finish.
pub async fn fail_interrupted_runs(db: &PgPool) -> AppResult<u64> {
    let result = sqlx::query(
        r#"UPDATE payroll_runs
           SET status = 'failed', error_message = 'Interrupted by server restart', completed_at = NOW()
           WHERE status IN ('pending', 'processing')"#,
    )
    .execute(db)
    .await?;

    if result.rows_affected() > 0 {
        warn!("Marked {} interrupted payroll runs as failed", result.rows_affected());
    }
    Ok(result.rows_affected())
}

async fn mark_failed(db: &PgPool, payroll_run_id: Uuid, message: &str) {
    let result = sqlx::query(
        "UPDATE payroll_runs SET status = 'failed', error_message = $1, completed_at = NOW() WHERE id = $2",
    )
    .bind(message)
    .bind(payroll_run_id)
    .execute(db)
    .await;

    if let Err(e) = result {
        error!("Failed to mark payroll run {} failed: {}", payroll_run_id, e);
    }
}

/// An employee on the payroll of a period, with the last day worked when
/// they left during or after it.
#[derive(Debug, FromRow)]
struct PayableEmployee {
    #[sqlx(flatten)]
    employee: Employee,
    last_working_day: Option<NaiveDate>,
}

/// Everyone employed for at least one day between `from` and `until`:
/// joined by `until`, and either still active or separated on or after `from`.
async fn load_employees(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Option<Uuid>,
    from: NaiveDate,
    until: NaiveDate,
) -> AppResult<Vec<PayableEmployee>> {
    let employees = sqlx::query_as::<_, PayableEmployee>(
        r#"SELECT e.*,
                  CASE WHEN e.is_active THEN NULL ELSE s.separation_date END AS last_working_day
           FROM employees e
           LEFT JOIN LATERAL (
               SELECT MAX(separation_date) AS separation_date
               FROM separations
               WHERE employee_id = e.id
           ) s ON true
           WHERE e.joining_date <= $1
             AND (e.is_active = true OR s.separation_date >= $2)
             AND ($3::uuid IS NULL OR e.company_id = $3)
           ORDER BY e.employee_code"#,
    )
    .bind(until)
    .bind(from)
    .bind(company_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(employees)
}

/// Rebuilds every monthly sheet of the run's scope inside one transaction:
/// old rows for the period are deleted, never patched.
async fn run_monthly(db: &PgPool, run: &PayrollRun) -> AppResult<RunTotals> {
    let month_start = parse_month(&run.period)?;
    let month_end = last_day_of_month(month_start);
    let salary_month = format_month(month_start);

    let mut tx = db.begin().await?;

    let employees = load_employees(&mut tx, run.company_id, month_start, month_end).await?;
    if employees.is_empty() {
        return Err(AppError::BadRequest(format!(
            "No employees to pay for {salary_month}"
        )));
    }
    let ids: Vec<Uuid> = employees.iter().map(|p| p.employee.id).collect();

    sqlx::query(
        r#"DELETE FROM monthly_salary_sheets
           WHERE salary_month = $1
             AND ($2::uuid IS NULL OR company_id = $2 OR employee_id = ANY($3))"#,
    )
    .bind(&salary_month)
    .bind(run.company_id)
    .bind(&ids)
    .execute(&mut *tx)
    .await?;

    let mut attendance: HashMap<Uuid, Vec<Attendance>> = HashMap::new();
    for row in sqlx::query_as::<_, Attendance>(
        r#"SELECT * FROM attendances
           WHERE attendance_date BETWEEN $1 AND $2 AND employee_id = ANY($3)"#,
    )
    .bind(month_start)
    .bind(month_end)
    .bind(&ids)
    .fetch_all(&mut *tx)
    .await?
    {
        attendance.entry(row.employee_id).or_default().push(row);
    }

    let bonuses: HashMap<Uuid, Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(
        r#"SELECT employee_id, SUM(amount) FROM bonuses
           WHERE bonus_month = $1 AND employee_id = ANY($2)
           GROUP BY employee_id"#,
    )
    .bind(&salary_month)
    .bind(&ids)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .collect();

    let mut advances: HashMap<Uuid, Vec<AdvanceSalary>> = HashMap::new();
    for advance in sqlx::query_as::<_, AdvanceSalary>(
        "SELECT * FROM advance_salaries WHERE employee_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&mut *tx)
    .await?
    {
        advances.entry(advance.employee_id).or_default().push(advance);
    }

    let mut totals = RunTotals::default();
    for PayableEmployee {
        employee,
        last_working_day,
    } in &employees
    {
        let sheet = PayrollService::calculate_monthly(
            employee,
            month_start,
            *last_working_day,
            attendance.get(&employee.id).map(Vec::as_slice).unwrap_or_default(),
            bonuses.get(&employee.id).copied().unwrap_or_default(),
            advances.get(&employee.id).map(Vec::as_slice).unwrap_or_default(),
        );

        sqlx::query(
            r#"INSERT INTO monthly_salary_sheets (
                id, payroll_run_id, employee_id, company_id, department_id, salary_month,
                gross_salary, basic_salary, house_rent, medical_allowance, food_allowance, conveyance,
                total_days, payable_days, present_days, late_days, absent_days, leave_days,
                holidays, off_days, ot_hours, ot_rate, ot_amount, attendance_bonus, bonus_amount,
                total_earning, absent_deduction, advance_deduction, total_deduction, net_payable,
                generated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,
                      $21,$22,$23,$24,$25,$26,$27,$28,$29,$30,NOW())"#,
        )
        .bind(Uuid::new_v4())
        .bind(run.id)
        .bind(employee.id)
        .bind(employee.company_id)
        .bind(employee.department_id)
        .bind(&salary_month)
        .bind(sheet.structure.gross_salary)
        .bind(sheet.structure.basic_salary)
        .bind(sheet.structure.house_rent)
        .bind(sheet.structure.medical_allowance)
        .bind(sheet.structure.food_allowance)
        .bind(sheet.structure.conveyance)
        .bind(sheet.total_days)
        .bind(sheet.payable_days)
        .bind(sheet.present_days)
        .bind(sheet.late_days)
        .bind(sheet.absent_days)
        .bind(sheet.leave_days)
        .bind(sheet.holidays)
        .bind(sheet.off_days)
        .bind(sheet.ot_hours)
        .bind(sheet.ot_rate)
        .bind(sheet.ot_amount)
        .bind(sheet.attendance_bonus)
        .bind(sheet.bonus_amount)
        .bind(sheet.total_earning)
        .bind(sheet.absent_deduction)
        .bind(sheet.advance_deduction)
        .bind(sheet.total_deduction)
        .bind(sheet.net_payable)
        .execute(&mut *tx)
        .await?;

        totals.employee_count += 1;
        totals.total_earning += sheet.total_earning;
        totals.total_deduction += sheet.total_deduction;
        totals.total_net += sheet.net_payable;
    }

    tx.commit().await?;
    Ok(totals)
}

async fn run_daily(db: &PgPool, run: &PayrollRun) -> AppResult<RunTotals> {
    let work_date = NaiveDate::parse_from_str(&run.period, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("'{}' is not a valid date", run.period)))?;

    let mut tx = db.begin().await?;

    let employees = load_employees(&mut tx, run.company_id, work_date, work_date).await?;
    if employees.is_empty() {
        return Err(AppError::BadRequest(format!(
            "No employees to pay for {work_date}"
        )));
    }
    let ids: Vec<Uuid> = employees.iter().map(|p| p.employee.id).collect();

    sqlx::query(
        r#"DELETE FROM daily_salary_sheets
           WHERE work_date = $1
             AND ($2::uuid IS NULL OR company_id = $2 OR employee_id = ANY($3))"#,
    )
    .bind(work_date)
    .bind(run.company_id)
    .bind(&ids)
    .execute(&mut *tx)
    .await?;

    let attendance: HashMap<Uuid, Attendance> = sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendances WHERE attendance_date = $1 AND employee_id = ANY($2)",
    )
    .bind(work_date)
    .bind(&ids)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|a| (a.employee_id, a))
    .collect();

    let mut totals = RunTotals::default();
    for PayableEmployee { employee, .. } in &employees {
        let sheet =
            PayrollService::calculate_daily(employee, work_date, attendance.get(&employee.id));

        sqlx::query(
            r#"INSERT INTO daily_salary_sheets (
                id, payroll_run_id, employee_id, company_id, work_date, attendance_status,
                daily_gross, ot_hours, ot_amount, total_earning, total_deduction, net_payable,
                generated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,NOW())"#,
        )
        .bind(Uuid::new_v4())
        .bind(run.id)
        .bind(employee.id)
        .bind(employee.company_id)
        .bind(work_date)
        .bind(sheet.status)
        .bind(sheet.daily_gross)
        .bind(sheet.ot_hours)
        .bind(sheet.ot_amount)
        .bind(sheet.total_earning)
        .bind(sheet.total_deduction)
        .bind(sheet.net_payable)
        .execute(&mut *tx)
        .await?;

        totals.employee_count += 1;
        totals.total_earning += sheet.total_earning;
        totals.total_deduction += sheet.total_deduction;
        totals.total_net += sheet.net_payable;
    }

    tx.commit().await?;
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::PayrollStatus,
        state::testing::{db_state, insert_company, insert_employee},
    };
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn worker(gross: Decimal, joining_date: NaiveDate) -> Employee {
        let s = salary_structure(gross);
        Employee {
            id: Uuid::new_v4(),
            employee_code: "W-1001".to_string(),
            proximity: Some("1001".to_string()),
            company_name: Some("Alpha Knit".to_string()),
            company_id: None,
            department_id: None,
            section_id: None,
            designation_id: None,
            line_id: None,
            shift_id: None,
            employee_type: Some("Worker".to_string()),
            grade: Some("7".to_string()),
            joining_date,
            name: "Rahima Khatun".to_string(),
            name_bangla: None,
            father_name: None,
            father_name_bangla: None,
            mother_name: None,
            mother_name_bangla: None,
            spouse_name: None,
            date_of_birth: None,
            gender: None,
            religion: None,
            marital_status: None,
            blood_group: None,
            nid: None,
            birth_certificate: None,
            nationality: None,
            phone: None,
            email: None,
            gross_salary: s.gross_salary,
            basic_salary: s.basic_salary,
            house_rent: s.house_rent,
            medical_allowance: s.medical_allowance,
            food_allowance: s.food_allowance,
            conveyance: s.conveyance,
            attendance_bonus: dec!(450),
            ot_eligible: true,
            payment_mode: None,
            bank_name: None,
            bank_branch: None,
            bank_account_number: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            emergency_contact_relation: None,
            present_country_id: None,
            present_division_id: None,
            present_district_id: None,
            present_thana_id: None,
            present_post_office_id: None,
            present_village: None,
            permanent_country_id: None,
            permanent_division_id: None,
            permanent_district_id: None,
            permanent_thana_id: None,
            permanent_post_office_id: None,
            permanent_village: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn day(employee: &Employee, d: NaiveDate, status: AttendanceStatus, ot: Decimal) -> Attendance {
        Attendance {
            id: Uuid::new_v4(),
            employee_id: employee.id,
            attendance_date: d,
            shift_id: None,
            in_time: None,
            out_time: None,
            status,
            late_minutes: 0,
            ot_hours: ot,
            remarks: None,
            is_manual: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// A full April where every day is attended except the listed overrides
    fn april(employee: &Employee, overrides: &[(u32, AttendanceStatus)]) -> Vec<Attendance> {
        (1..=30)
            .map(|d| {
                let status = overrides
                    .iter()
                    .find(|(od, _)| *od == d)
                    .map(|(_, s)| *s)
                    .unwrap_or(AttendanceStatus::Present);
                day(employee, date(2024, 4, d), status, dec!(0))
            })
            .collect()
    }

    fn advance(amount: Decimal, installment: Decimal, first: &str) -> AdvanceSalary {
        AdvanceSalary {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            amount,
            monthly_installment: installment,
            first_deduction_month: first.to_string(),
            advance_date: date(2024, 1, 15),
            remarks: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn structure_matches_minimum_wage_grade() {
        let s = salary_structure(dec!(12500));
        assert_eq!(s.basic_salary, dec!(6700));
        assert_eq!(s.house_rent, dec!(3350));
        assert_eq!(s.medical_allowance, dec!(750));
        assert_eq!(s.food_allowance, dec!(1250));
        assert_eq!(s.conveyance, dec!(450));
    }

    #[test]
    fn structure_always_sums_to_gross() {
        for gross in [dec!(12500), dec!(13333.33), dec!(20001), dec!(2451)] {
            let s = salary_structure(gross);
            let sum = s.basic_salary + s.house_rent + s.medical_allowance + s.food_allowance + s.conveyance;
            assert_eq!(sum, gross, "components of {gross}");
        }
        let tiny = salary_structure(dec!(2000));
        assert_eq!(tiny.basic_salary, dec!(2000));
        assert_eq!(tiny.medical_allowance, dec!(0));
    }

    #[test]
    fn advance_schedule_is_derived_per_month() {
        let adv = advance(dec!(5000), dec!(2000), "2024-03");
        assert_eq!(advance_installment(&adv, date(2024, 2, 1)), dec!(0));
        assert_eq!(advance_installment(&adv, date(2024, 3, 1)), dec!(2000));
        assert_eq!(advance_installment(&adv, date(2024, 4, 1)), dec!(2000));
        assert_eq!(advance_installment(&adv, date(2024, 5, 1)), dec!(1000));
        assert_eq!(advance_installment(&adv, date(2024, 6, 1)), dec!(0));
    }

    #[test]
    fn full_attendance_month_earns_gross_and_attendance_bonus() {
        let e = worker(dec!(12500), date(2023, 1, 1));
        let rows = april(&e, &[(5, AttendanceStatus::OffDay), (12, AttendanceStatus::Late)]);
        let sheet = PayrollService::calculate_monthly(&e, date(2024, 4, 1), None, &rows, dec!(0), &[]);

        assert_eq!(sheet.total_days, 30);
        assert_eq!(sheet.payable_days, 30);
        assert_eq!(sheet.present_days, 29);
        assert_eq!(sheet.late_days, 1);
        assert_eq!(sheet.off_days, 1);
        assert_eq!(sheet.absent_days, 0);
        assert_eq!(sheet.attendance_bonus, dec!(450));
        assert_eq!(sheet.total_earning, dec!(12950));
        assert_eq!(sheet.total_deduction, dec!(0));
        assert_eq!(sheet.net_payable, dec!(12950));
    }

    #[test]
    fn absences_deduct_basic_and_forfeit_attendance_bonus() {
        let e = worker(dec!(12500), date(2023, 1, 1));
        let mut rows = april(&e, &[(3, AttendanceStatus::Absent)]);
        // day 30 never processed: counts as absent too
        rows.retain(|r| r.attendance_date != date(2024, 4, 30));
        let sheet = PayrollService::calculate_monthly(&e, date(2024, 4, 1), None, &rows, dec!(0), &[]);

        assert_eq!(sheet.absent_days, 2);
        assert_eq!(sheet.attendance_bonus, dec!(0));
        // 6700 / 30 * 2
        assert_eq!(sheet.absent_deduction, dec!(446.67));
        assert_eq!(sheet.net_payable, sheet.total_earning - sheet.total_deduction);
        assert_eq!(sheet.net_payable, dec!(12053.33));
    }

    #[test]
    fn overtime_paid_at_double_hourly_basic() {
        let e = worker(dec!(12500), date(2023, 1, 1));
        let mut rows = april(&e, &[]);
        rows[0].ot_hours = dec!(2);
        rows[1].ot_hours = dec!(3);
        let sheet = PayrollService::calculate_monthly(&e, date(2024, 4, 1), None, &rows, dec!(0), &[]);

        assert_eq!(sheet.ot_hours, dec!(5));
        // 6700 / 208 * 2 = 64.4230..
        assert_eq!(sheet.ot_rate, dec!(64.42));
        assert_eq!(sheet.ot_amount, dec!(322.10));

        let mut staff = e.clone();
        staff.ot_eligible = false;
        let sheet = PayrollService::calculate_monthly(&staff, date(2024, 4, 1), None, &rows, dec!(0), &[]);
        assert_eq!(sheet.ot_amount, dec!(0));
    }

    #[test]
    fn mid_month_joiner_is_paid_pro_rata() {
        let e = worker(dec!(12000), date(2024, 4, 16));
        let rows: Vec<_> = (16..=30)
            .map(|d| day(&e, date(2024, 4, d), AttendanceStatus::Present, dec!(0)))
            .collect();
        let sheet = PayrollService::calculate_monthly(&e, date(2024, 4, 1), None, &rows, dec!(0), &[]);

        assert_eq!(sheet.payable_days, 15);
        assert_eq!(sheet.absent_days, 0);
        assert_eq!(sheet.attendance_bonus, dec!(0));
        assert_eq!(sheet.total_earning, dec!(6000));
    }

    #[test]
    fn mid_month_leaver_is_paid_to_the_separation_date() {
        let e = worker(dec!(12000), date(2023, 1, 1));
        let rows: Vec<_> = (1..=20)
            .map(|d| day(&e, date(2024, 4, d), AttendanceStatus::Present, dec!(0)))
            .collect();
        let sheet = PayrollService::calculate_monthly(
            &e,
            date(2024, 4, 1),
            Some(date(2024, 4, 20)),
            &rows,
            dec!(0),
            &[],
        );

        assert_eq!(sheet.payable_days, 20);
        assert_eq!(sheet.present_days, 20);
        assert_eq!(sheet.absent_days, 0);
        assert_eq!(sheet.attendance_bonus, dec!(0));
        assert_eq!(sheet.total_earning, dec!(8000));

        // separated after the month: the whole month is payable
        let sheet = PayrollService::calculate_monthly(
            &e,
            date(2024, 3, 1),
            Some(date(2024, 4, 20)),
            &[],
            dec!(0),
            &[],
        );
        assert_eq!(sheet.payable_days, 31);
    }

    #[test]
    fn advance_deduction_never_exceeds_earnings() {
        let e = worker(dec!(12500), date(2023, 1, 1));
        let rows = april(&e, &[]);
        let adv = advance(dec!(50000), dec!(20000), "2024-04");
        let sheet =
            PayrollService::calculate_monthly(&e, date(2024, 4, 1), None, &rows, dec!(1000), &[adv]);

        assert_eq!(sheet.bonus_amount, dec!(1000));
        assert_eq!(sheet.advance_deduction, sheet.total_earning);
        assert_eq!(sheet.net_payable, dec!(0));
        assert_eq!(sheet.net_payable, sheet.total_earning - sheet.total_deduction);
    }

    #[test]
    fn daily_sheet_deducts_basic_for_absent_or_missing_days() {
        let e = worker(dec!(12500), date(2023, 1, 1));
        let present = day(&e, date(2024, 4, 2), AttendanceStatus::Present, dec!(2));
        let sheet = PayrollService::calculate_daily(&e, date(2024, 4, 2), Some(&present));
        assert_eq!(sheet.daily_gross, dec!(416.67));
        assert_eq!(sheet.ot_amount, dec!(128.84));
        assert_eq!(sheet.total_deduction, dec!(0));
        assert_eq!(sheet.net_payable, dec!(545.51));

        let missing = PayrollService::calculate_daily(&e, date(2024, 4, 3), None);
        assert_eq!(missing.status, None);
        assert_eq!(missing.total_deduction, dec!(223.33));
        assert_eq!(missing.net_payable, missing.total_earning - missing.total_deduction);
    }

    async fn run_month(db: &PgPool, period: &str, company_id: Uuid) -> PayrollRun {
        let run = sqlx::query_as::<_, PayrollRun>(
            r#"INSERT INTO payroll_runs (id, run_type, period, company_id, status)
               VALUES ($1, 'monthly', $2, $3, 'pending')
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(period)
        .bind(company_id)
        .fetch_one(db)
        .await
        .unwrap();
        process_payroll_background(db.clone(), run.clone()).await;
        sqlx::query_as::<_, PayrollRun>("SELECT * FROM payroll_runs WHERE id = $1")
            .bind(run.id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    async fn sheet_days(db: &PgPool, employee_id: Uuid, period: &str) -> Vec<i32> {
        sqlx::query_scalar::<_, i32>(
            "SELECT payable_days FROM monthly_salary_sheets WHERE employee_id = $1 AND salary_month = $2",
        )
        .bind(employee_id)
        .bind(period)
        .fetch_all(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn rerun_after_separation_keeps_the_leavers_sheet() {
        let Some(state) = db_state().await else {
            return;
        };
        let db = &state.db;
        let company = insert_company(db).await;
        let leaver = insert_employee(db, &company, "7001", date(2030, 1, 1), dec!(12000)).await;
        let stayer = insert_employee(db, &company, "7002", date(2030, 1, 1), dec!(12000)).await;
        for (employee, last) in [(leaver, 20), (stayer, 30)] {
            sqlx::query(
                r#"INSERT INTO attendances (id, employee_id, attendance_date, status)
                   SELECT gen_random_uuid(), $1, d::date, 'Present'::attendance_status
                   FROM generate_series($2::date, $3::date, INTERVAL '1 day') d"#,
            )
            .bind(employee)
            .bind(date(2031, 4, 1))
            .bind(date(2031, 4, last))
            .execute(db)
            .await
            .unwrap();
        }

        let first = run_month(db, "2031-04", company.0).await;
        assert_eq!(first.status, PayrollStatus::Completed);
        assert_eq!(sheet_days(db, leaver, "2031-04").await, vec![30]);

        sqlx::query(
            r#"INSERT INTO separations (id, employee_id, separation_type, separation_date)
               VALUES ($1, $2, 'Resignation', $3)"#,
        )
        .bind(Uuid::new_v4())
        .bind(leaver)
        .bind(date(2031, 4, 20))
        .execute(db)
        .await
        .unwrap();
        sqlx::query("UPDATE employees SET is_active = false WHERE id = $1")
            .bind(leaver)
            .execute(db)
            .await
            .unwrap();

        let rerun = run_month(db, "2031-04", company.0).await;
        assert_eq!(rerun.status, PayrollStatus::Completed);
        assert_eq!(rerun.employee_count, 2);
        assert_eq!(sheet_days(db, leaver, "2031-04").await, vec![20]);
        assert_eq!(sheet_days(db, stayer, "2031-04").await, vec![30]);

        // gone before May: no sheet
        let may = run_month(db, "2031-05", company.0).await;
        assert_eq!(may.employee_count, 1);
        assert!(sheet_days(db, leaver, "2031-05").await.is_empty());
    }
}
