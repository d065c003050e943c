use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::AttendanceStatus;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct DepartmentHeadcount {
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub headcount: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StatusCount {
    pub status: AttendanceStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub active_employees: i64,
    pub by_department: Vec<DepartmentHeadcount>,
    pub attendance: Vec<StatusCount>,
    /// Active employees without an attendance row for the date
    pub unprocessed: i64,
    pub pending_leave_applications: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// Defaults to today
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AttendanceSummaryRow {
    pub employee_id: Uuid,
    pub employee_code: String,
    pub name: String,
    pub department_id: Option<Uuid>,
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub on_leave: i64,
    pub off_day: i64,
    pub holiday: i64,
    pub late_minutes: i64,
    pub ot_hours: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceSummaryQuery {
    /// Format: "YYYY-MM"
    pub month: String,
    pub department_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
}
