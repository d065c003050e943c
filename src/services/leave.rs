// src/services/leave.rs

use crate::{
    errors::{AppError, AppResult},
    models::{LeaveApplication, LeaveBalance, LeaveStatus, LeaveType},
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

/// Days charged for an application: an inclusive span, or 0.5 for a half day.
pub fn leave_days(from: NaiveDate, to: NaiveDate, is_half_day: bool) -> AppResult<Decimal> {
    if to < from {
        return Err(AppError::Validation(
            "to_date must not be before from_date".to_string(),
        ));
    }
    if is_half_day {
        if from != to {
            return Err(AppError::Validation(
                "A half-day leave covers a single date".to_string(),
            ));
        }
        return Ok(dec!(0.5));
    }
    Ok(Decimal::from((to - from).num_days() + 1))
}

/// Only pending applications can be decided or withdrawn.
pub fn ensure_transition(current: LeaveStatus, next: LeaveStatus) -> AppResult<()> {
    let allowed = current == LeaveStatus::Pending
        && matches!(
            next,
            LeaveStatus::Approved | LeaveStatus::Rejected | LeaveStatus::Cancelled
        );
    if allowed {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            entity: "leave application",
            from: current.to_string(),
            to: next.to_string(),
        })
    }
}

/// Days of one type an employee used (approved) or asked for (pending) in a year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeaveUsage {
    pub used: Decimal,
    pub pending: Decimal,
}

pub fn compute_balance(
    leave_type: &LeaveType,
    year: i32,
    usage: LeaveUsage,
    previous_year_used: Decimal,
) -> LeaveBalance {
    let limit = Decimal::from(leave_type.yearly_limit);
    let carried_forward = if leave_type.carry_forward {
        (limit - previous_year_used).max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    LeaveBalance {
        leave_type_id: leave_type.id,
        leave_type: leave_type.name.clone(),
        year,
        yearly_limit: leave_type.yearly_limit,
        carried_forward,
        used: usage.used,
        pending: usage.pending,
        remaining: limit + carried_forward - usage.used,
    }
}

/// Applications are charged to the year their first day falls in.
async fn usage_in_year<'e>(
    db: impl PgExecutor<'e>,
    employee_id: Uuid,
    leave_type_id: Uuid,
    year: i32,
) -> AppResult<LeaveUsage> {
    let (used, pending) = sqlx::query_as::<_, (Decimal, Decimal)>(
        r#"SELECT
               COALESCE(SUM(total_days) FILTER (WHERE status = 'Approved'), 0),
               COALESCE(SUM(total_days) FILTER (WHERE status = 'Pending'), 0)
           FROM leave_applications
           WHERE employee_id = $1 AND leave_type_id = $2
             AND EXTRACT(YEAR FROM from_date)::int = $3"#,
    )
    .bind(employee_id)
    .bind(leave_type_id)
    .bind(year)
    .fetch_one(db)
    .await?;

    Ok(LeaveUsage { used, pending })
}

/// Balance of one leave type for `year`. Runs on the caller's connection so an
/// approval can read it inside its own transaction.
pub async fn balance_for(
    conn: &mut PgConnection,
    employee_id: Uuid,
    leave_type: &LeaveType,
    year: i32,
) -> AppResult<LeaveBalance> {
    let usage = usage_in_year(&mut *conn, employee_id, leave_type.id, year).await?;
    let previous_year_used = if leave_type.carry_forward {
        usage_in_year(&mut *conn, employee_id, leave_type.id, year - 1)
            .await?
            .used
    } else {
        Decimal::ZERO
    };
    Ok(compute_balance(leave_type, year, usage, previous_year_used))
}

/// Rejects approving `application` when it would overdraw its year's balance.
pub fn ensure_covered(balance: &LeaveBalance, application: &LeaveApplication) -> AppResult<()> {
    if application.total_days > balance.remaining {
        return Err(AppError::Validation(format!(
            "Insufficient {} balance for {}: {} day(s) remaining, {} requested",
            balance.leave_type,
            application.from_date.year(),
            balance.remaining,
            application.total_days
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn casual(carry_forward: bool) -> LeaveType {
        LeaveType {
            id: Uuid::new_v4(),
            name: "Casual".to_string(),
            name_bangla: None,
            yearly_limit: 10,
            carry_forward,
            is_paid: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn application(total_days: Decimal) -> LeaveApplication {
        LeaveApplication {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            leave_type_id: Uuid::new_v4(),
            from_date: date(2024, 3, 4),
            to_date: date(2024, 3, 8),
            is_half_day: false,
            total_days,
            reason: None,
            status: LeaveStatus::Pending,
            applied_at: Utc::now(),
            decided_at: None,
            decided_by: None,
            remarks: None,
        }
    }

    #[test]
    fn span_is_inclusive() {
        assert_eq!(leave_days(date(2024, 3, 4), date(2024, 3, 8), false).unwrap(), dec!(5));
        assert_eq!(leave_days(date(2024, 3, 4), date(2024, 3, 4), false).unwrap(), dec!(1));
        assert_eq!(leave_days(date(2024, 3, 4), date(2024, 3, 4), true).unwrap(), dec!(0.5));
    }

    #[test]
    fn invalid_spans_are_rejected() {
        assert!(leave_days(date(2024, 3, 8), date(2024, 3, 4), false).is_err());
        assert!(leave_days(date(2024, 3, 4), date(2024, 3, 5), true).is_err());
    }

    #[test]
    fn decisions_only_from_pending() {
        assert!(ensure_transition(LeaveStatus::Pending, LeaveStatus::Approved).is_ok());
        assert!(ensure_transition(LeaveStatus::Pending, LeaveStatus::Cancelled).is_ok());
        assert!(matches!(
            ensure_transition(LeaveStatus::Approved, LeaveStatus::Rejected),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(ensure_transition(LeaveStatus::Cancelled, LeaveStatus::Approved).is_err());
        assert!(ensure_transition(LeaveStatus::Pending, LeaveStatus::Pending).is_err());
    }

    #[test]
    fn balance_carries_unused_days_forward() {
        let usage = LeaveUsage {
            used: dec!(3),
            pending: dec!(2),
        };
        let carried = compute_balance(&casual(true), 2024, usage, dec!(6));
        assert_eq!(carried.carried_forward, dec!(4));
        assert_eq!(carried.remaining, dec!(11));
        assert_eq!(carried.pending, dec!(2));

        let plain = compute_balance(&casual(false), 2024, usage, dec!(6));
        assert_eq!(plain.carried_forward, dec!(0));
        assert_eq!(plain.remaining, dec!(7));

        // overdrawn previous year carries nothing
        let overdrawn = compute_balance(&casual(true), 2024, LeaveUsage::default(), dec!(12));
        assert_eq!(overdrawn.carried_forward, dec!(0));
    }

    #[test]
    fn approval_needs_enough_balance() {
        let balance = compute_balance(
            &casual(false),
            2024,
            LeaveUsage {
                used: dec!(6),
                pending: dec!(0),
            },
            dec!(0),
        );
        assert!(ensure_covered(&balance, &application(dec!(4))).is_ok());
        assert!(matches!(
            ensure_covered(&balance, &application(dec!(5))),
            Err(AppError::Validation(_))
        ));
    }
}
