use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// ─── Branch ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BranchRequest {
    pub name: String,
    pub code: String,
}

// ─── Cash transactions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "cash_transaction_type")]
pub enum CashTransactionType {
    Receipt,
    Payment,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CashTransaction {
    pub id: Uuid,
    pub branch_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub transaction_date: NaiveDate,
    pub transaction_type: CashTransactionType,
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference: Option<String>,
    /// Set on the pair of rows posted by a completed fund transfer
    pub fund_transfer_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CashTransactionRequest {
    pub branch_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub transaction_date: NaiveDate,
    pub transaction_type: CashTransactionType,
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CashbookFilter {
    pub branch_id: Option<Uuid>,
    #[param(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
}

// ─── Opening balance ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OpeningBalance {
    pub id: Uuid,
    pub branch_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub balance_date: NaiveDate,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OpeningBalanceRequest {
    pub branch_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub balance_date: NaiveDate,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Defaults to today
    #[param(value_type = Option<String>, format = "date")]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BranchBalance {
    pub branch_id: Uuid,
    #[schema(value_type = String, format = "date")]
    pub as_of: NaiveDate,
    #[schema(value_type = Option<String>, format = "date")]
    pub opening_date: Option<NaiveDate>,
    pub opening_amount: Decimal,
    pub receipts: Decimal,
    pub payments: Decimal,
    pub balance: Decimal,
}

// ─── Fund transfer ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "fund_transfer_status")]
pub enum FundTransferStatus {
    Pending,
    Approved,
    Completed,
    Rejected,
}

impl fmt::Display for FundTransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FundTransferStatus::Pending => "Pending",
            FundTransferStatus::Approved => "Approved",
            FundTransferStatus::Completed => "Completed",
            FundTransferStatus::Rejected => "Rejected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FundTransfer {
    pub id: Uuid,
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub amount: Decimal,
    #[schema(value_type = String, format = "date")]
    pub transfer_date: NaiveDate,
    pub status: FundTransferStatus,
    pub remarks: Option<String>,
    pub requested_by: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rejected_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FundTransferRequest {
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub amount: Decimal,
    #[schema(value_type = String, format = "date")]
    pub transfer_date: NaiveDate,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectTransferRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FundTransferFilter {
    pub branch_id: Option<Uuid>,
    pub status: Option<FundTransferStatus>,
}
