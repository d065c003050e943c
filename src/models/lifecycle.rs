use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ─── Transfer ─────────────────────────────────────────────────────────────────

/// Append-only record of a placement change, with a snapshot of where the
/// employee sat before the move.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Transfer {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub from_department_id: Option<Uuid>,
    pub to_department_id: Option<Uuid>,
    pub from_section_id: Option<Uuid>,
    pub to_section_id: Option<Uuid>,
    pub from_designation_id: Option<Uuid>,
    pub to_designation_id: Option<Uuid>,
    pub from_line_id: Option<Uuid>,
    pub to_line_id: Option<Uuid>,
    #[schema(value_type = String, format = "date")]
    pub transfer_date: NaiveDate,
    pub remarks: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub to_department_id: Option<Uuid>,
    pub to_section_id: Option<Uuid>,
    pub to_designation_id: Option<Uuid>,
    pub to_line_id: Option<Uuid>,
    #[schema(value_type = String, format = "date")]
    pub transfer_date: NaiveDate,
    pub remarks: Option<String>,
}

// ─── Separation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "separation_type")]
pub enum SeparationType {
    Resignation,
    Termination,
    Retirement,
    Dismissal,
    Death,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Separation {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub separation_type: SeparationType,
    #[schema(value_type = Option<String>, format = "date")]
    pub notice_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date")]
    pub separation_date: NaiveDate,
    pub reason: Option<String>,
    pub is_settled: bool,
    pub settlement_amount: Option<Decimal>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SeparationRequest {
    pub separation_type: SeparationType,
    #[schema(value_type = Option<String>, format = "date")]
    pub notice_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date")]
    pub separation_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SettleSeparationRequest {
    pub settlement_amount: Decimal,
}
