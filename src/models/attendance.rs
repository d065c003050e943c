use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Shift ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Shift {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "17:00:00")]
    pub end_time: NaiveTime,
    #[schema(value_type = Option<String>)]
    pub lunch_start: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub lunch_end: Option<NaiveTime>,
    /// Grace period after `start_time` before an arrival counts as late
    pub late_in_minutes: i32,
    /// English weekday names, e.g. `["Friday"]`
    pub weekends: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShiftRequest {
    pub name: String,
    #[schema(value_type = String, example = "08:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "17:00:00")]
    pub end_time: NaiveTime,
    #[schema(value_type = Option<String>)]
    pub lunch_start: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub lunch_end: Option<NaiveTime>,
    pub late_in_minutes: Option<i32>,
    #[serde(default)]
    pub weekends: Vec<String>,
}

// ─── Holiday ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Holiday {
    pub id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub holiday_date: NaiveDate,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HolidayRequest {
    #[schema(value_type = String, format = "date")]
    pub holiday_date: NaiveDate,
    pub name: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DateRangeFilter {
    #[param(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
}

// ─── Shift roster ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EmployeeShiftRoster {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub shift_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub roster_date: NaiveDate,
    pub is_off_day: bool,
    pub created_at: DateTime<Utc>,
}

/// Plans `shift_id` for every employee on every date in `from_date..=to_date`,
/// replacing previous plans for those days.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RosterRequest {
    pub employee_ids: Vec<Uuid>,
    pub shift_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub from_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to_date: NaiveDate,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub off_dates: Vec<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RosterResponse {
    pub planned: usize,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RosterFilter {
    pub employee_id: Option<Uuid>,
    #[param(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
}

// ─── Raw device punches ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceLog {
    pub id: Uuid,
    pub device_serial: String,
    pub proximity: String,
    /// Company whose card numbers the punch is matched against
    pub company_name: Option<String>,
    /// Resolved from `proximity` when the punch was stored; left empty while
    /// no single employee carries the card
    pub employee_id: Option<Uuid>,
    #[schema(value_type = String, example = "2024-05-01T07:58:12")]
    pub punch_time: NaiveDateTime,
    pub verify_mode: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct PunchInput {
    pub device_serial: Option<String>,
    pub proximity: String,
    #[schema(value_type = String, example = "2024-05-01T07:58:12")]
    pub punch_time: NaiveDateTime,
    pub verify_mode: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportPunchesRequest {
    /// Company the card numbers belong to. Required when two companies
    /// issue the same card number.
    pub company_name: Option<String>,
    pub punches: Vec<PunchInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportPunchesResponse {
    pub received: usize,
    /// Punches already stored are skipped
    pub inserted: u64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AttendanceLogFilter {
    pub proximity: Option<String>,
    pub employee_id: Option<Uuid>,
    #[param(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
}

/// Query string sent by ZKTeco devices on the push endpoints
#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    #[serde(rename = "SN")]
    pub serial: String,
    pub table: Option<String>,
}

// ─── Daily attendance ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq, Hash)]
#[sqlx(type_name = "attendance_status")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    #[sqlx(rename = "On Leave")]
    #[serde(rename = "On Leave")]
    OnLeave,
    #[sqlx(rename = "Off Day")]
    #[serde(rename = "Off Day")]
    OffDay,
    Holiday,
}

impl AttendanceStatus {
    /// Days the worker is paid for without deduction
    pub fn is_paid(self) -> bool {
        !matches!(self, AttendanceStatus::Absent)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::OnLeave => "On Leave",
            AttendanceStatus::OffDay => "Off Day",
            AttendanceStatus::Holiday => "Holiday",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attendance {
    pub id: Uuid,
    pub employee_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub attendance_date: NaiveDate,
    pub shift_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub in_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub out_time: Option<NaiveTime>,
    pub status: AttendanceStatus,
    pub late_minutes: i32,
    pub ot_hours: Decimal,
    pub remarks: Option<String>,
    /// Entered by hand; never overwritten by processing
    pub is_manual: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualAttendanceRequest {
    pub employee_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub attendance_date: NaiveDate,
    pub shift_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub in_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub out_time: Option<NaiveTime>,
    pub status: AttendanceStatus,
    pub late_minutes: Option<i32>,
    pub ot_hours: Option<Decimal>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessAttendanceRequest {
    #[schema(value_type = String, format = "date")]
    pub attendance_date: NaiveDate,
    /// Process one employee instead of every active employee
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessAttendanceResponse {
    #[schema(value_type = String, format = "date")]
    pub attendance_date: NaiveDate,
    pub processed: usize,
    pub skipped_manual: usize,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AttendanceFilter {
    pub employee_id: Option<Uuid>,
    #[param(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
    pub status: Option<AttendanceStatus>,
}
