use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Advance salary ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AdvanceSalary {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub amount: Decimal,
    pub monthly_installment: Decimal,
    /// Format: "YYYY-MM"
    pub first_deduction_month: String,
    #[schema(value_type = String, format = "date")]
    pub advance_date: NaiveDate,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceSalaryRequest {
    pub employee_id: Uuid,
    pub amount: Decimal,
    pub monthly_installment: Decimal,
    /// Format: "YYYY-MM"
    pub first_deduction_month: String,
    #[schema(value_type = String, format = "date")]
    pub advance_date: NaiveDate,
    pub remarks: Option<String>,
}

// ─── Salary increment ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SalaryIncrement {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub previous_gross: Decimal,
    pub increment_amount: Decimal,
    pub new_gross: Decimal,
    #[schema(value_type = String, format = "date")]
    pub effective_date: NaiveDate,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SalaryIncrementRequest {
    pub increment_amount: Decimal,
    #[schema(value_type = String, format = "date")]
    pub effective_date: NaiveDate,
    pub remarks: Option<String>,
}

// ─── Bonus ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "bonus_type")]
pub enum BonusType {
    Festival,
    Attendance,
    Production,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Bonus {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub bonus_type: BonusType,
    pub amount: Decimal,
    /// Format: "YYYY-MM"
    pub bonus_month: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BonusRequest {
    pub employee_id: Uuid,
    pub bonus_type: BonusType,
    pub amount: Decimal,
    /// Format: "YYYY-MM"
    pub bonus_month: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PayrollItemFilter {
    pub employee_id: Option<Uuid>,
    /// Format: "YYYY-MM"
    pub month: Option<String>,
}

// ─── Salary sheets ────────────────────────────────────────────────────────────

/// Materialized monthly payroll row; rebuilt wholesale by every monthly run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MonthlySalarySheet {
    pub id: Uuid,
    pub payroll_run_id: Uuid,
    pub employee_id: Uuid,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    /// Format: "YYYY-MM"
    pub salary_month: String,
    pub gross_salary: Decimal,
    pub basic_salary: Decimal,
    pub house_rent: Decimal,
    pub medical_allowance: Decimal,
    pub food_allowance: Decimal,
    pub conveyance: Decimal,
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
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DailySalarySheet {
    pub id: Uuid,
    pub payroll_run_id: Uuid,
    pub employee_id: Uuid,
    pub company_id: Option<Uuid>,
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    pub attendance_status: Option<super::AttendanceStatus>,
    pub daily_gross: Decimal,
    pub ot_hours: Decimal,
    pub ot_amount: Decimal,
    pub total_earning: Decimal,
    pub total_deduction: Decimal,
    pub net_payable: Decimal,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SalarySheetFilter {
    pub employee_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

// ─── Payroll run ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "payroll_run_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayrollRunType {
    Monthly,
    Daily,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "payroll_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollRun {
    pub id: Uuid,
    pub run_type: PayrollRunType,
    /// "YYYY-MM" for monthly runs, "YYYY-MM-DD" for daily runs
    pub period: String,
    pub company_id: Option<Uuid>,
    pub status: PayrollStatus,
    pub employee_count: i32,
    pub total_earning: Decimal,
    pub total_deduction: Decimal,
    pub total_net: Decimal,
    pub error_message: Option<String>,
    pub initiated_by: Option<Uuid>,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunMonthlyPayrollRequest {
    /// Format: "YYYY-MM"
    pub salary_month: String,
    /// Limit the run to one company
    pub company_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunDailyPayrollRequest {
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    pub company_id: Option<Uuid>,
}
