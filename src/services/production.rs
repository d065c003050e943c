// src/services/production.rs

use crate::{
    errors::{AppError, AppResult},
    models::{DailyEfficiency, DailyProductionRecord, PRODUCTION_HOURS, ProductionTarget},
};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Pads the submitted hourly output to twelve buckets.
pub fn hourly_buckets(hourly: &[i32]) -> AppResult<[i32; PRODUCTION_HOURS]> {
    if hourly.len() > PRODUCTION_HOURS {
        return Err(AppError::Validation(format!(
            "At most {PRODUCTION_HOURS} hourly entries are accepted, got {}",
            hourly.len()
        )));
    }
    if let Some(hour) = hourly.iter().position(|q| *q < 0) {
        return Err(AppError::Validation(format!(
            "Output for hour {} cannot be negative",
            hour + 1
        )));
    }
    let mut buckets = [0; PRODUCTION_HOURS];
    buckets[..hourly.len()].copy_from_slice(hourly);
    Ok(buckets)
}

pub fn total_completed(buckets: &[i32; PRODUCTION_HOURS]) -> AppResult<i32> {
    buckets
        .iter()
        .try_fold(0i32, |total, q| total.checked_add(*q))
        .ok_or_else(|| AppError::Validation("Daily output is too large".to_string()))
}

/// Hourly target × working hours, rounded down to whole pieces.
pub fn daily_target(hourly_target: i32, working_hours: Decimal) -> AppResult<i32> {
    if hourly_target < 0 || working_hours < Decimal::ZERO {
        return Err(AppError::Validation(
            "Targets and working hours cannot be negative".to_string(),
        ));
    }
    (Decimal::from(hourly_target) * working_hours)
        .floor()
        .to_i32()
        .ok_or_else(|| AppError::Validation("Daily target is too large".to_string()))
}

pub fn achievement_percent(completed: i32, target: i32) -> Option<Decimal> {
    if target <= 0 {
        return None;
    }
    Some(
        (Decimal::from(completed) * dec!(100) / Decimal::from(target))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    )
}

/// Per-day output against the target of the same day, oldest first.
pub fn daily_efficiency(
    records: &[DailyProductionRecord],
    targets: &[ProductionTarget],
) -> Vec<DailyEfficiency> {
    let by_date: HashMap<_, i32> = targets
        .iter()
        .map(|t| (t.target_date, t.daily_target))
        .collect();

    let mut days: Vec<DailyEfficiency> = records
        .iter()
        .map(|record| {
            let target = by_date.get(&record.production_date).copied();
            DailyEfficiency {
                production_date: record.production_date,
                completed: record.total_completed,
                target,
                achievement_percent: target
                    .and_then(|t| achievement_percent(record.total_completed, t)),
            }
        })
        .collect();
    days.sort_by_key(|d| d.production_date);
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn record(day: u32, hourly: &[i32]) -> DailyProductionRecord {
        let b = hourly_buckets(hourly).unwrap();
        DailyProductionRecord {
            id: Uuid::new_v4(),
            assignment_id: Uuid::nil(),
            production_date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            hour1: b[0],
            hour2: b[1],
            hour3: b[2],
            hour4: b[3],
            hour5: b[4],
            hour6: b[5],
            hour7: b[6],
            hour8: b[7],
            hour9: b[8],
            hour10: b[9],
            hour11: b[10],
            hour12: b[11],
            total_completed: total_completed(&b).unwrap(),
            remarks: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn target(day: u32, daily: i32) -> ProductionTarget {
        ProductionTarget {
            id: Uuid::new_v4(),
            assignment_id: Uuid::nil(),
            target_date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            hourly_target: daily / 10,
            working_hours: dec!(10),
            daily_target: daily,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn short_input_is_padded_with_zeros() {
        let buckets = hourly_buckets(&[50, 60, 55]).unwrap();
        assert_eq!(buckets[..3], [50, 60, 55]);
        assert!(buckets[3..].iter().all(|q| *q == 0));
        assert_eq!(total_completed(&buckets).unwrap(), 165);
    }

    #[test]
    fn oversized_output_is_rejected_not_wrapped() {
        let buckets = hourly_buckets(&[1_000_000_000; 3]).unwrap();
        assert!(matches!(
            total_completed(&buckets),
            Err(AppError::Validation(_))
        ));

        let mut full = [i32::MAX / 12; PRODUCTION_HOURS];
        assert!(total_completed(&full).is_ok());
        full[0] += 12;
        assert!(total_completed(&full).is_err());
    }

    #[test]
    fn bad_hourly_input_is_rejected() {
        assert!(hourly_buckets(&[1; 13]).is_err());
        assert!(matches!(
            hourly_buckets(&[10, -1]),
            Err(AppError::Validation(msg)) if msg.contains("hour 2")
        ));
    }

    #[test]
    fn record_total_matches_its_buckets() {
        let r = record(3, &[40, 45, 50, 52, 0, 48, 47, 46, 44, 30]);
        assert_eq!(r.total_completed, r.hourly().iter().sum::<i32>());
        assert_eq!(r.total_completed, 402);
    }

    #[test]
    fn daily_target_rounds_down() {
        assert_eq!(daily_target(60, dec!(10)).unwrap(), 600);
        assert_eq!(daily_target(55, dec!(7.5)).unwrap(), 412);
        assert!(daily_target(-5, dec!(8)).is_err());
    }

    #[test]
    fn efficiency_pairs_records_with_same_day_targets() {
        let records = vec![record(4, &[90, 95]), record(3, &[100, 100, 100])];
        let targets = vec![target(3, 400)];
        let days = daily_efficiency(&records, &targets);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].completed, 300);
        assert_eq!(days[0].target, Some(400));
        assert_eq!(days[0].achievement_percent, Some(dec!(75.00)));
        assert_eq!(days[1].target, None);
        assert_eq!(days[1].achievement_percent, None);
    }

    #[test]
    fn zero_target_has_no_percentage() {
        assert_eq!(achievement_percent(10, 0), None);
        assert_eq!(achievement_percent(1, 3), Some(dec!(33.33)));
    }
}
