use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Leave type ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveType {
    pub id: Uuid,
    pub name: String,
    pub name_bangla: Option<String>,
    /// Days allowed per calendar year
    pub yearly_limit: i32,
    /// Unused days of the previous year roll over
    pub carry_forward: bool,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LeaveTypeRequest {
    pub name: String,
    pub name_bangla: Option<String>,
    pub yearly_limit: i32,
    #[serde(default)]
    pub carry_forward: bool,
    pub is_paid: Option<bool>,
}

// ─── Leave application ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "leave_status")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LeaveStatus::Pending => "Pending",
            LeaveStatus::Approved => "Approved",
            LeaveStatus::Rejected => "Rejected",
            LeaveStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LeaveApplication {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub leave_type_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to_date: NaiveDate,
    pub is_half_day: bool,
    /// Precomputed at application time; 0.5 for a half day
    pub total_days: Decimal,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub applied_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LeaveApplicationRequest {
    pub employee_id: Uuid,
    pub leave_type_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to_date: NaiveDate,
    #[serde(default)]
    pub is_half_day: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LeaveDecisionRequest {
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LeaveFilter {
    pub employee_id: Option<Uuid>,
    pub leave_type_id: Option<Uuid>,
    pub status: Option<LeaveStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LeaveBalanceQuery {
    /// Calendar year; defaults to the current year
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveBalance {
    pub leave_type_id: Uuid,
    pub leave_type: String,
    pub year: i32,
    pub yearly_limit: i32,
    pub carried_forward: Decimal,
    pub used: Decimal,
    pub pending: Decimal,
    pub remaining: Decimal,
}
