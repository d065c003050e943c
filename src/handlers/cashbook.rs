// src/handlers/cashbook.rs
//
// Every query here runs on `cashbook_db`, which may be a separate database.

use crate::{
    auth::{ADMINS, AuthUser, CASH_WRITERS},
    errors::{AppError, AppResult},
    models::{
        BalanceQuery, Branch, BranchBalance, BranchRequest, CashTransaction,
        CashTransactionRequest, CashbookFilter, FundTransfer, FundTransferFilter,
        FundTransferRequest, FundTransferStatus, MessageResponse, OpeningBalance,
        OpeningBalanceRequest, RejectTransferRequest,
    },
    services::cashbook::{
        branch_balance, complete_transfer, ensure_transfer_transition, validate_transfer,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

// ─── Branches ─────────────────────────────────────────────────────────────────

/// Open a cash branch
#[utoipa::path(
    post,
    path = "/api/v1/cashbook/branches",
    request_body = BranchRequest,
    responses(
        (status = 201, description = "Branch created", body = Branch),
        (status = 409, description = "Branch code already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn create_branch(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BranchRequest>,
) -> AppResult<(StatusCode, Json<Branch>)> {
    auth.require(CASH_WRITERS)?;
    if body.name.trim().is_empty() || body.code.trim().is_empty() {
        return Err(AppError::Validation(
            "Branch name and code are required".to_string(),
        ));
    }

    let branch = sqlx::query_as::<_, Branch>(
        "INSERT INTO branches (id, name, code, created_at) VALUES ($1, $2, $3, NOW()) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(body.name.trim())
    .bind(body.code.trim().to_uppercase())
    .fetch_one(&state.cashbook_db)
    .await?;

    Ok((StatusCode::CREATED, Json(branch)))
}

/// List cash branches
#[utoipa::path(
    get,
    path = "/api/v1/cashbook/branches",
    responses((status = 200, description = "Branches", body = Vec<Branch>)),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn list_branches(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Branch>>> {
    let branches = sqlx::query_as::<_, Branch>("SELECT * FROM branches ORDER BY code")
        .fetch_all(&state.cashbook_db)
        .await?;
    Ok(Json(branches))
}

/// Cash in hand of a branch on a date
#[utoipa::path(
    get,
    path = "/api/v1/cashbook/branches/{branch_id}/balance",
    params(
        ("branch_id" = Uuid, Path, description = "Branch ID"),
        BalanceQuery,
    ),
    responses(
        (status = 200, description = "Branch balance", body = BranchBalance),
        (status = 404, description = "Branch not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn get_branch_balance(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
    Query(query): Query<BalanceQuery>,
) -> AppResult<Json<BranchBalance>> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
        .bind(branch_id)
        .fetch_one(&state.cashbook_db)
        .await?;
    if !exists {
        return Err(AppError::NotFound(format!("Branch {} not found", branch_id)));
    }

    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(branch_balance(&state.cashbook_db, branch_id, as_of).await?))
}

// ─── Transactions ─────────────────────────────────────────────────────────────

/// Post a receipt or payment
#[utoipa::path(
    post,
    path = "/api/v1/cashbook/transactions",
    request_body = CashTransactionRequest,
    responses(
        (status = 201, description = "Transaction posted", body = CashTransaction),
        (status = 400, description = "Invalid amount or unknown branch"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn create_transaction(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CashTransactionRequest>,
) -> AppResult<(StatusCode, Json<CashTransaction>)> {
    auth.require(CASH_WRITERS)?;
    if body.amount <= Decimal::ZERO {
        return Err(AppError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if body.category.trim().is_empty() {
        return Err(AppError::Validation("Category is required".to_string()));
    }

    let transaction = sqlx::query_as::<_, CashTransaction>(
        r#"INSERT INTO cash_transactions (
            id, branch_id, transaction_date, transaction_type, category, amount,
            description, reference, created_by, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.branch_id)
    .bind(body.transaction_date)
    .bind(body.transaction_type)
    .bind(body.category.trim())
    .bind(body.amount)
    .bind(&body.description)
    .bind(&body.reference)
    .bind(auth.id)
    .fetch_one(&state.cashbook_db)
    .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// List receipts and payments
#[utoipa::path(
    get,
    path = "/api/v1/cashbook/transactions",
    params(CashbookFilter),
    responses((status = 200, description = "Transactions", body = Vec<CashTransaction>)),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn list_transactions(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<CashbookFilter>,
) -> AppResult<Json<Vec<CashTransaction>>> {
    let transactions = sqlx::query_as::<_, CashTransaction>(
        r#"SELECT * FROM cash_transactions
           WHERE ($1::uuid IS NULL OR branch_id = $1)
             AND ($2::date IS NULL OR transaction_date >= $2)
             AND ($3::date IS NULL OR transaction_date <= $3)
           ORDER BY transaction_date, created_at"#,
    )
    .bind(filter.branch_id)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(&state.cashbook_db)
    .await?;
    Ok(Json(transactions))
}

/// Delete a hand-posted transaction. Rows posted by a fund transfer stay.
#[utoipa::path(
    delete,
    path = "/api/v1/cashbook/transactions/{transaction_id}",
    params(("transaction_id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction deleted", body = MessageResponse),
        (status = 400, description = "Transaction belongs to a fund transfer"),
        (status = 404, description = "Transaction not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn delete_transaction(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(CASH_WRITERS)?;

    let transfer_id = sqlx::query_scalar::<_, Option<Uuid>>(
        "SELECT fund_transfer_id FROM cash_transactions WHERE id = $1",
    )
    .bind(transaction_id)
    .fetch_optional(&state.cashbook_db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Transaction {} not found", transaction_id)))?;

    if let Some(transfer_id) = transfer_id {
        return Err(AppError::BadRequest(format!(
            "Transaction was posted by fund transfer {transfer_id} and cannot be deleted"
        )));
    }

    sqlx::query("DELETE FROM cash_transactions WHERE id = $1 AND fund_transfer_id IS NULL")
        .bind(transaction_id)
        .execute(&state.cashbook_db)
        .await?;
    Ok(Json(MessageResponse::new("Transaction deleted")))
}

// ─── Opening balances ─────────────────────────────────────────────────────────

/// Set the opening balance of a branch on a date
#[utoipa::path(
    post,
    path = "/api/v1/cashbook/opening-balances",
    request_body = OpeningBalanceRequest,
    responses((status = 200, description = "Opening balance set", body = OpeningBalance)),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn upsert_opening_balance(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<OpeningBalanceRequest>,
) -> AppResult<Json<OpeningBalance>> {
    auth.require(CASH_WRITERS)?;

    let balance = sqlx::query_as::<_, OpeningBalance>(
        r#"INSERT INTO opening_balances (id, branch_id, balance_date, amount, created_at, updated_at)
           VALUES ($1, $2, $3, $4, NOW(), NOW())
           ON CONFLICT (branch_id, balance_date) DO UPDATE
           SET amount = EXCLUDED.amount, updated_at = NOW()
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.branch_id)
    .bind(body.balance_date)
    .bind(body.amount)
    .fetch_one(&state.cashbook_db)
    .await?;

    Ok(Json(balance))
}

/// List opening balances
#[utoipa::path(
    get,
    path = "/api/v1/cashbook/opening-balances",
    params(CashbookFilter),
    responses((status = 200, description = "Opening balances", body = Vec<OpeningBalance>)),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn list_opening_balances(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<CashbookFilter>,
) -> AppResult<Json<Vec<OpeningBalance>>> {
    let balances = sqlx::query_as::<_, OpeningBalance>(
        r#"SELECT * FROM opening_balances
           WHERE ($1::uuid IS NULL OR branch_id = $1)
             AND ($2::date IS NULL OR balance_date >= $2)
             AND ($3::date IS NULL OR balance_date <= $3)
           ORDER BY balance_date DESC"#,
    )
    .bind(filter.branch_id)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(&state.cashbook_db)
    .await?;
    Ok(Json(balances))
}

// ─── Fund transfers ───────────────────────────────────────────────────────────

async fn fetch_transfer(db: &PgPool, id: Uuid) -> AppResult<FundTransfer> {
    sqlx::query_as::<_, FundTransfer>("SELECT * FROM fund_transfers WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Fund transfer {} not found", id)))
}

/// Request a transfer of cash between branches
#[utoipa::path(
    post,
    path = "/api/v1/cashbook/fund-transfers",
    request_body = FundTransferRequest,
    responses(
        (status = 201, description = "Transfer requested", body = FundTransfer),
        (status = 400, description = "Same branch or non-positive amount"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn create_fund_transfer(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<FundTransferRequest>,
) -> AppResult<(StatusCode, Json<FundTransfer>)> {
    auth.require(CASH_WRITERS)?;
    validate_transfer(body.from_branch_id, body.to_branch_id, body.amount)?;

    let transfer = sqlx::query_as::<_, FundTransfer>(
        r#"INSERT INTO fund_transfers (
            id, from_branch_id, to_branch_id, amount, transfer_date, status,
            remarks, requested_by, created_at
        ) VALUES ($1, $2, $3, $4, $5, 'Pending', $6, $7, NOW())
        RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.from_branch_id)
    .bind(body.to_branch_id)
    .bind(body.amount)
    .bind(body.transfer_date)
    .bind(&body.remarks)
    .bind(auth.id)
    .fetch_one(&state.cashbook_db)
    .await?;

    Ok((StatusCode::CREATED, Json(transfer)))
}

/// List fund transfers touching a branch
#[utoipa::path(
    get,
    path = "/api/v1/cashbook/fund-transfers",
    params(FundTransferFilter),
    responses((status = 200, description = "Fund transfers", body = Vec<FundTransfer>)),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn list_fund_transfers(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<FundTransferFilter>,
) -> AppResult<Json<Vec<FundTransfer>>> {
    let transfers = sqlx::query_as::<_, FundTransfer>(
        r#"SELECT * FROM fund_transfers
           WHERE ($1::uuid IS NULL OR from_branch_id = $1 OR to_branch_id = $1)
             AND ($2::fund_transfer_status IS NULL OR status = $2)
           ORDER BY transfer_date DESC, created_at DESC"#,
    )
    .bind(filter.branch_id)
    .bind(filter.status)
    .fetch_all(&state.cashbook_db)
    .await?;
    Ok(Json(transfers))
}

/// Get a fund transfer
#[utoipa::path(
    get,
    path = "/api/v1/cashbook/fund-transfers/{transfer_id}",
    params(("transfer_id" = Uuid, Path, description = "Fund transfer ID")),
    responses(
        (status = 200, description = "Fund transfer", body = FundTransfer),
        (status = 404, description = "Fund transfer not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn get_fund_transfer(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<FundTransfer>> {
    Ok(Json(fetch_transfer(&state.cashbook_db, transfer_id).await?))
}

/// Approve a pending transfer (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/cashbook/fund-transfers/{transfer_id}/approve",
    params(("transfer_id" = Uuid, Path, description = "Fund transfer ID")),
    responses(
        (status = 200, description = "Transfer approved", body = FundTransfer),
        (status = 403, description = "Not an admin"),
        (status = 422, description = "Transfer is not pending"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn approve_fund_transfer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<FundTransfer>> {
    auth.require(ADMINS)?;
    let transfer = fetch_transfer(&state.cashbook_db, transfer_id).await?;
    ensure_transfer_transition(transfer.status, FundTransferStatus::Approved)?;

    let approved = sqlx::query_as::<_, FundTransfer>(
        r#"UPDATE fund_transfers
           SET status = 'Approved', approved_by = $2, approved_at = NOW()
           WHERE id = $1 AND status = 'Pending'
           RETURNING *"#,
    )
    .bind(transfer_id)
    .bind(auth.id)
    .fetch_optional(&state.cashbook_db)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Fund transfer {} changed meanwhile", transfer_id)))?;

    info!(%transfer_id, approved_by = %auth.username, "fund transfer approved");
    Ok(Json(approved))
}

/// Complete an approved transfer, posting the payment and receipt
#[utoipa::path(
    post,
    path = "/api/v1/cashbook/fund-transfers/{transfer_id}/complete",
    params(("transfer_id" = Uuid, Path, description = "Fund transfer ID")),
    responses(
        (status = 200, description = "Transfer completed", body = FundTransfer),
        (status = 422, description = "Transfer is not approved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn complete_fund_transfer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<FundTransfer>> {
    auth.require(CASH_WRITERS)?;
    let transfer = fetch_transfer(&state.cashbook_db, transfer_id).await?;
    let completed = complete_transfer(&state.cashbook_db, &transfer, auth.id).await?;
    Ok(Json(completed))
}

/// Reject a pending or approved transfer (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/cashbook/fund-transfers/{transfer_id}/reject",
    request_body = RejectTransferRequest,
    params(("transfer_id" = Uuid, Path, description = "Fund transfer ID")),
    responses(
        (status = 200, description = "Transfer rejected", body = FundTransfer),
        (status = 403, description = "Not an admin"),
        (status = 422, description = "Transfer already completed or rejected"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cashbook"
)]
pub async fn reject_fund_transfer(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
    Json(body): Json<RejectTransferRequest>,
) -> AppResult<Json<FundTransfer>> {
    auth.require(ADMINS)?;
    let transfer = fetch_transfer(&state.cashbook_db, transfer_id).await?;
    ensure_transfer_transition(transfer.status, FundTransferStatus::Rejected)?;

    let rejected = sqlx::query_as::<_, FundTransfer>(
        r#"UPDATE fund_transfers
           SET status = 'Rejected', rejected_reason = $2
           WHERE id = $1 AND status IN ('Pending', 'Approved')
           RETURNING *"#,
    )
    .bind(transfer_id)
    .bind(&body.reason)
    .fetch_optional(&state.cashbook_db)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Fund transfer {} changed meanwhile", transfer_id)))?;

    Ok(Json(rejected))
}
