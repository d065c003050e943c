// src/services/cashbook.rs

use crate::{
    errors::{AppError, AppResult},
    models::{BranchBalance, CashTransactionType, FundTransfer, FundTransferStatus},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

pub const TRANSFER_CATEGORY: &str = "Fund Transfer";

pub fn ensure_transfer_transition(
    current: FundTransferStatus,
    next: FundTransferStatus,
) -> AppResult<()> {
    use FundTransferStatus::*;

    let allowed = matches!(
        (current, next),
        (Pending, Approved) | (Approved, Completed) | (Pending, Rejected) | (Approved, Rejected)
    );
    if allowed {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            entity: "fund transfer",
            from: current.to_string(),
            to: next.to_string(),
        })
    }
}

pub fn validate_transfer(from_branch: Uuid, to_branch: Uuid, amount: Decimal) -> AppResult<()> {
    if from_branch == to_branch {
        return Err(AppError::Validation(
            "A fund transfer needs two different branches".to_string(),
        ));
    }
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation(
            "Transfer amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

pub fn compose_balance(
    branch_id: Uuid,
    as_of: NaiveDate,
    opening: Option<(NaiveDate, Decimal)>,
    receipts: Decimal,
    payments: Decimal,
) -> BranchBalance {
    let opening_amount = opening.map(|(_, amount)| amount).unwrap_or_default();
    BranchBalance {
        branch_id,
        as_of,
        opening_date: opening.map(|(date, _)| date),
        opening_amount,
        receipts,
        payments,
        balance: opening_amount + receipts - payments,
    }
}

/// Latest opening balance on or before `as_of`, plus receipts and minus
/// payments dated after it up to `as_of`. Without an opening balance every
/// transaction up to `as_of` counts.
pub async fn branch_balance(db: &PgPool, branch_id: Uuid, as_of: NaiveDate) -> AppResult<BranchBalance> {
    let opening = sqlx::query_as::<_, (NaiveDate, Decimal)>(
        r#"SELECT balance_date, amount FROM opening_balances
           WHERE branch_id = $1 AND balance_date <= $2
           ORDER BY balance_date DESC LIMIT 1"#,
    )
    .bind(branch_id)
    .bind(as_of)
    .fetch_optional(db)
    .await?;

    let (receipts, payments) = sqlx::query_as::<_, (Decimal, Decimal)>(
        r#"SELECT
               COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'Receipt'), 0),
               COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'Payment'), 0)
           FROM cash_transactions
           WHERE branch_id = $1
             AND ($2::date IS NULL OR transaction_date > $2)
             AND transaction_date <= $3"#,
    )
    .bind(branch_id)
    .bind(opening.map(|(date, _)| date))
    .bind(as_of)
    .fetch_one(db)
    .await?;

    Ok(compose_balance(branch_id, as_of, opening, receipts, payments))
}

/// Marks an approved transfer completed and posts the matching payment and
/// receipt in one transaction.
pub async fn complete_transfer(
    db: &PgPool,
    transfer: &FundTransfer,
    user_id: Uuid,
) -> AppResult<FundTransfer> {
    ensure_transfer_transition(transfer.status, FundTransferStatus::Completed)?;

    let mut tx = db.begin().await?;

    let completed = sqlx::query_as::<_, FundTransfer>(
        r#"UPDATE fund_transfers SET status = 'Completed', completed_at = NOW()
           WHERE id = $1 AND status = 'Approved'
           RETURNING *"#,
    )
    .bind(transfer.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::Conflict(format!("Fund transfer {} changed meanwhile", transfer.id)))?;

    for (branch_id, kind) in [
        (completed.from_branch_id, CashTransactionType::Payment),
        (completed.to_branch_id, CashTransactionType::Receipt),
    ] {
        sqlx::query(
            r#"INSERT INTO cash_transactions (
                id, branch_id, transaction_date, transaction_type, category, amount,
                description, fund_transfer_id, created_by, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,NOW())"#,
        )
        .bind(Uuid::new_v4())
        .bind(branch_id)
        .bind(completed.transfer_date)
        .bind(kind)
        .bind(TRANSFER_CATEGORY)
        .bind(completed.amount)
        .bind(completed.remarks.as_deref())
        .bind(completed.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        "Fund transfer {} completed: {} moved from {} to {}",
        completed.id, completed.amount, completed.from_branch_id, completed.to_branch_id
    );
    Ok(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use FundTransferStatus::*;

    #[test]
    fn transfer_workflow() {
        assert!(ensure_transfer_transition(Pending, Approved).is_ok());
        assert!(ensure_transfer_transition(Approved, Completed).is_ok());
        assert!(ensure_transfer_transition(Pending, Rejected).is_ok());
        assert!(ensure_transfer_transition(Approved, Rejected).is_ok());

        assert!(ensure_transfer_transition(Pending, Completed).is_err());
        assert!(ensure_transfer_transition(Completed, Rejected).is_err());
        assert!(matches!(
            ensure_transfer_transition(Rejected, Approved),
            Err(AppError::InvalidTransition { entity: "fund transfer", .. })
        ));
    }

    #[test]
    fn transfer_needs_two_branches_and_an_amount() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_transfer(a, b, dec!(5000)).is_ok());
        assert!(validate_transfer(a, a, dec!(5000)).is_err());
        assert!(validate_transfer(a, b, dec!(0)).is_err());
        assert!(validate_transfer(a, b, dec!(-1)).is_err());
    }

    #[test]
    fn balance_adds_movements_to_the_opening() {
        let branch = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();
        let opened = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();

        let with_opening = compose_balance(
            branch,
            day,
            Some((opened, dec!(10000))),
            dec!(2500.50),
            dec!(4000),
        );
        assert_eq!(with_opening.balance, dec!(8500.50));
        assert_eq!(with_opening.opening_date, Some(opened));

        let without = compose_balance(branch, day, None, dec!(100), dec!(250));
        assert_eq!(without.opening_amount, dec!(0));
        assert_eq!(without.balance, dec!(-150));
    }
}
