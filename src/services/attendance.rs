// src/services/attendance.rs

use crate::{
    errors::AppResult,
    models::{AttendanceStatus, Employee, EmployeeShiftRoster, ProcessAttendanceResponse, Shift},
};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

/// How an approved leave application covers the day being processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveCover {
    None,
    Full,
    /// Only applies when the employee did not come in at all
    Half,
}

pub struct DayContext<'a> {
    pub date: NaiveDate,
    pub shift: Option<&'a Shift>,
    pub is_holiday: bool,
    pub leave: LeaveCover,
    pub roster_off_day: bool,
    pub ot_eligible: bool,
    /// Punches of the day in ascending order
    pub punches: &'a [NaiveDateTime],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAttendance {
    pub status: AttendanceStatus,
    pub in_time: Option<NaiveTime>,
    pub out_time: Option<NaiveTime>,
    pub late_minutes: i32,
    pub ot_hours: Decimal,
}

fn weekday_matches(name: &str, weekday: Weekday) -> bool {
    let abbrev = match weekday {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    };
    name.trim().to_ascii_lowercase().starts_with(abbrev)
}

pub fn is_weekend(shift: &Shift, date: NaiveDate) -> bool {
    shift
        .weekends
        .iter()
        .any(|name| weekday_matches(name, date.weekday()))
}

/// Whole hours between two times, never negative
fn whole_hours(from: NaiveTime, to: NaiveTime) -> Decimal {
    let minutes = (to - from).num_minutes();
    if minutes <= 0 {
        dec!(0)
    } else {
        Decimal::from(minutes / 60)
    }
}

/// Decides one employee's day from the planned shift, the calendar and the
/// raw punches. The earliest punch is the in time, the latest distinct punch
/// is the out time.
pub fn derive_attendance(ctx: &DayContext<'_>) -> DerivedAttendance {
    let in_time = ctx.punches.first().map(|p| p.time());
    let out_time = ctx
        .punches
        .last()
        .map(|p| p.time())
        .filter(|out| Some(*out) != in_time);

    let off_day = ctx.roster_off_day || ctx.shift.is_some_and(|s| is_weekend(s, ctx.date));

    let non_working = if ctx.is_holiday {
        Some(AttendanceStatus::Holiday)
    } else if ctx.leave == LeaveCover::Full
        || (ctx.leave == LeaveCover::Half && ctx.punches.is_empty())
    {
        Some(AttendanceStatus::OnLeave)
    } else if off_day {
        Some(AttendanceStatus::OffDay)
    } else {
        None
    };

    if let Some(status) = non_working {
        // Work on a day off is all overtime
        let ot_hours = match (in_time, out_time) {
            (Some(i), Some(o)) if ctx.ot_eligible && status != AttendanceStatus::OnLeave => {
                whole_hours(i, o)
            }
            _ => dec!(0),
        };
        return DerivedAttendance {
            status,
            in_time,
            out_time,
            late_minutes: 0,
            ot_hours,
        };
    }

    let Some(arrived) = in_time else {
        return DerivedAttendance {
            status: AttendanceStatus::Absent,
            in_time: None,
            out_time: None,
            late_minutes: 0,
            ot_hours: dec!(0),
        };
    };

    let Some(shift) = ctx.shift else {
        return DerivedAttendance {
            status: AttendanceStatus::Present,
            in_time,
            out_time,
            late_minutes: 0,
            ot_hours: dec!(0),
        };
    };

    let minutes_after_start = (arrived - shift.start_time).num_minutes();
    let is_late = ctx.leave == LeaveCover::None
        && minutes_after_start > i64::from(shift.late_in_minutes);

    let ot_hours = match out_time {
        Some(left) if ctx.ot_eligible => whole_hours(shift.end_time, left),
        _ => dec!(0),
    };

    DerivedAttendance {
        status: if is_late {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        },
        in_time,
        out_time,
        late_minutes: if is_late {
            i32::try_from(minutes_after_start).unwrap_or(i32::MAX)
        } else {
            0
        },
        ot_hours,
    }
}

/// Recomputes the attendance of `date` for every employee on the rolls that
/// day (or just `employee_id`) inside one transaction. Leavers are processed
/// up to their separation date. Rows entered by hand are kept.
pub async fn process_day(
    db: &PgPool,
    date: NaiveDate,
    employee_id: Option<Uuid>,
) -> AppResult<ProcessAttendanceResponse> {
    let mut tx = db.begin().await?;

    let employees = sqlx::query_as::<_, Employee>(
        r#"SELECT * FROM employees e
           WHERE e.joining_date <= $1
             AND (e.is_active = true OR EXISTS (
                 SELECT 1 FROM separations s
                 WHERE s.employee_id = e.id AND s.separation_date >= $1))
             AND ($2::uuid IS NULL OR e.id = $2)"#,
    )
    .bind(date)
    .bind(employee_id)
    .fetch_all(&mut *tx)
    .await?;
    let ids: Vec<Uuid> = employees.iter().map(|e| e.id).collect();

    let day_start = date.and_time(NaiveTime::MIN);
    let day_end = day_start + chrono::Duration::days(1);

    // Punches stored before the card was enrolled carry no employee yet. A
    // card is only assigned when exactly one employee of the punch's company
    // carries it on that day.
    let assigned = sqlx::query(
        r#"UPDATE attendance_logs l
           SET employee_id = m.employee_id
           FROM (
               SELECT p.id, (ARRAY_AGG(e.id))[1] AS employee_id
               FROM attendance_logs p
               JOIN employees e
                 ON e.proximity = p.proximity
                AND (p.company_name IS NULL OR e.company_name = p.company_name)
                AND e.joining_date <= $3
                AND (e.is_active = true OR EXISTS (
                    SELECT 1 FROM separations s
                    WHERE s.employee_id = e.id AND s.separation_date >= $3))
               WHERE p.employee_id IS NULL AND p.punch_time >= $1 AND p.punch_time < $2
               GROUP BY p.id
               HAVING COUNT(*) = 1
           ) m
           WHERE l.id = m.id"#,
    )
    .bind(day_start)
    .bind(day_end)
    .bind(date)
    .execute(&mut *tx)
    .await?;

    let unassigned = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM attendance_logs
           WHERE employee_id IS NULL AND punch_time >= $1 AND punch_time < $2"#,
    )
    .bind(day_start)
    .bind(day_end)
    .fetch_one(&mut *tx)
    .await?;
    if unassigned > 0 {
        warn!(
            %date,
            assigned = assigned.rows_affected(),
            unassigned,
            "punches left without an employee: unknown or ambiguous card numbers"
        );
    }

    let shifts: HashMap<Uuid, Shift> = sqlx::query_as::<_, Shift>("SELECT * FROM shifts")
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let rosters: HashMap<Uuid, EmployeeShiftRoster> = sqlx::query_as::<_, EmployeeShiftRoster>(
        "SELECT * FROM employee_shift_rosters WHERE roster_date = $1 AND employee_id = ANY($2)",
    )
    .bind(date)
    .bind(&ids)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .map(|r| (r.employee_id, r))
    .collect();

    let is_holiday = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM holidays WHERE holiday_date = $1)",
    )
    .bind(date)
    .fetch_one(&mut *tx)
    .await?;

    let mut leaves: HashMap<Uuid, LeaveCover> = HashMap::new();
    for (emp, half) in sqlx::query_as::<_, (Uuid, bool)>(
        r#"SELECT employee_id, is_half_day FROM leave_applications
           WHERE status = 'Approved' AND from_date <= $1 AND to_date >= $1
             AND employee_id = ANY($2)"#,
    )
    .bind(date)
    .bind(&ids)
    .fetch_all(&mut *tx)
    .await?
    {
        let cover = if half { LeaveCover::Half } else { LeaveCover::Full };
        // A full-day application wins over a half-day one
        let entry = leaves.entry(emp).or_insert(cover);
        if cover == LeaveCover::Full {
            *entry = LeaveCover::Full;
        }
    }

    let mut punches: HashMap<Uuid, Vec<NaiveDateTime>> = HashMap::new();
    for (emp, at) in sqlx::query_as::<_, (Uuid, NaiveDateTime)>(
        r#"SELECT employee_id, punch_time FROM attendance_logs
           WHERE punch_time >= $1 AND punch_time < $2 AND employee_id = ANY($3)
           ORDER BY punch_time"#,
    )
    .bind(day_start)
    .bind(day_end)
    .bind(&ids)
    .fetch_all(&mut *tx)
    .await?
    {
        punches.entry(emp).or_default().push(at);
    }

    let manual: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
        "SELECT employee_id FROM attendances WHERE attendance_date = $1 AND is_manual = true",
    )
    .bind(date)
    .fetch_all(&mut *tx)
    .await?
    .into_iter()
    .collect();

    let mut processed = 0;
    let mut skipped_manual = 0;
    for employee in &employees {
        if manual.contains(&employee.id) {
            skipped_manual += 1;
            continue;
        }

        let roster = rosters.get(&employee.id);
        let shift_id = roster.map(|r| r.shift_id).or(employee.shift_id);
        let shift = shift_id.and_then(|id| shifts.get(&id));

        let derived = derive_attendance(&DayContext {
            date,
            shift,
            is_holiday,
            leave: leaves.get(&employee.id).copied().unwrap_or(LeaveCover::None),
            roster_off_day: roster.is_some_and(|r| r.is_off_day),
            ot_eligible: employee.ot_eligible,
            punches: punches.get(&employee.id).map(Vec::as_slice).unwrap_or_default(),
        });

        sqlx::query(
            r#"INSERT INTO attendances (
                id, employee_id, attendance_date, shift_id, in_time, out_time,
                status, late_minutes, ot_hours, is_manual, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,false,NOW(),NOW())
            ON CONFLICT (employee_id, attendance_date) DO UPDATE
            SET shift_id = EXCLUDED.shift_id,
                in_time = EXCLUDED.in_time,
                out_time = EXCLUDED.out_time,
                status = EXCLUDED.status,
                late_minutes = EXCLUDED.late_minutes,
                ot_hours = EXCLUDED.ot_hours,
                updated_at = NOW()
            WHERE attendances.is_manual = false"#,
        )
        .bind(Uuid::new_v4())
        .bind(employee.id)
        .bind(date)
        .bind(shift.map(|s| s.id))
        .bind(derived.in_time)
        .bind(derived.out_time)
        .bind(derived.status)
        .bind(derived.late_minutes)
        .bind(derived.ot_hours)
        .execute(&mut *tx)
        .await?;

        processed += 1;
    }

    tx.commit().await?;

    info!(
        "Processed attendance for {}: {} employees, {} manual rows kept",
        date, processed, skipped_manual
    );

    Ok(ProcessAttendanceResponse {
        attendance_date: date,
        processed,
        skipped_manual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{db_state, insert_company, insert_employee};
    use chrono::Utc;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn general_shift() -> Shift {
        Shift {
            id: Uuid::new_v4(),
            name: "General".to_string(),
            start_time: time(8, 0),
            end_time: time(17, 0),
            lunch_start: Some(time(13, 0)),
            lunch_end: Some(time(14, 0)),
            late_in_minutes: 5,
            weekends: vec!["Friday".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // 2024-05-02 is a Thursday, 2024-05-03 a Friday
    fn thursday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    fn punches(date: NaiveDate, times: &[(u32, u32)]) -> Vec<NaiveDateTime> {
        times.iter().map(|(h, m)| date.and_time(time(*h, *m))).collect()
    }

    fn ctx<'a>(date: NaiveDate, shift: &'a Shift, punches: &'a [NaiveDateTime]) -> DayContext<'a> {
        DayContext {
            date,
            shift: Some(shift),
            is_holiday: false,
            leave: LeaveCover::None,
            roster_off_day: false,
            ot_eligible: true,
            punches,
        }
    }

    #[test]
    fn on_time_arrival_is_present() {
        let shift = general_shift();
        let p = punches(thursday(), &[(8, 3), (17, 10)]);
        let day = derive_attendance(&ctx(thursday(), &shift, &p));
        assert_eq!(day.status, AttendanceStatus::Present);
        assert_eq!(day.in_time, Some(time(8, 3)));
        assert_eq!(day.out_time, Some(time(17, 10)));
        assert_eq!(day.late_minutes, 0);
        assert_eq!(day.ot_hours, dec!(0));
    }

    #[test]
    fn arrival_past_grace_is_late() {
        let shift = general_shift();
        let p = punches(thursday(), &[(8, 20), (12, 0), (19, 45)]);
        let day = derive_attendance(&ctx(thursday(), &shift, &p));
        assert_eq!(day.status, AttendanceStatus::Late);
        assert_eq!(day.late_minutes, 20);
        assert_eq!(day.out_time, Some(time(19, 45)));
        assert_eq!(day.ot_hours, dec!(2));
    }

    #[test]
    fn overtime_needs_eligibility() {
        let shift = general_shift();
        let p = punches(thursday(), &[(7, 55), (20, 0)]);
        let mut c = ctx(thursday(), &shift, &p);
        c.ot_eligible = false;
        assert_eq!(derive_attendance(&c).ot_hours, dec!(0));
    }

    #[test]
    fn single_punch_has_no_out_time() {
        let shift = general_shift();
        let p = punches(thursday(), &[(7, 58)]);
        let day = derive_attendance(&ctx(thursday(), &shift, &p));
        assert_eq!(day.status, AttendanceStatus::Present);
        assert_eq!(day.out_time, None);
    }

    #[test]
    fn no_punches_on_a_working_day_is_absent() {
        let shift = general_shift();
        let day = derive_attendance(&ctx(thursday(), &shift, &[]));
        assert_eq!(day.status, AttendanceStatus::Absent);
        assert_eq!(day.in_time, None);
    }

    #[test]
    fn calendar_outranks_punches() {
        let shift = general_shift();
        let friday = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let p = punches(friday, &[(9, 0), (13, 30)]);
        let weekend = derive_attendance(&ctx(friday, &shift, &p));
        assert_eq!(weekend.status, AttendanceStatus::OffDay);
        assert_eq!(weekend.ot_hours, dec!(4));

        let mut holiday = ctx(thursday(), &shift, &[]);
        holiday.is_holiday = true;
        holiday.leave = LeaveCover::Full;
        assert_eq!(derive_attendance(&holiday).status, AttendanceStatus::Holiday);

        let mut rostered_off = ctx(thursday(), &shift, &[]);
        rostered_off.roster_off_day = true;
        assert_eq!(derive_attendance(&rostered_off).status, AttendanceStatus::OffDay);
    }

    #[test]
    fn leave_cover() {
        let shift = general_shift();
        let mut full = ctx(thursday(), &shift, &[]);
        full.leave = LeaveCover::Full;
        assert_eq!(derive_attendance(&full).status, AttendanceStatus::OnLeave);

        // half day off in the morning, came in after lunch: present, not late
        let p = punches(thursday(), &[(13, 55), (17, 0)]);
        let mut half = ctx(thursday(), &shift, &p);
        half.leave = LeaveCover::Half;
        let day = derive_attendance(&half);
        assert_eq!(day.status, AttendanceStatus::Present);
        assert_eq!(day.late_minutes, 0);

        let mut half_absent = ctx(thursday(), &shift, &[]);
        half_absent.leave = LeaveCover::Half;
        assert_eq!(derive_attendance(&half_absent).status, AttendanceStatus::OnLeave);
    }

    #[test]
    fn weekend_names_accept_abbreviations() {
        assert!(weekday_matches("Friday", Weekday::Fri));
        assert!(weekday_matches(" fri", Weekday::Fri));
        assert!(!weekday_matches("Saturday", Weekday::Fri));
    }

    #[tokio::test]
    async fn leavers_are_processed_up_to_their_separation_date() {
        let Some(state) = db_state().await else {
            return;
        };
        let db = &state.db;
        let company = insert_company(db).await;
        let card = Uuid::new_v4().simple().to_string();
        let leaver = insert_employee(
            db,
            &company,
            &card,
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            dec!(12000),
        )
        .await;
        sqlx::query(
            r#"INSERT INTO separations (id, employee_id, separation_type, separation_date)
               VALUES ($1, $2, 'Resignation', $3)"#,
        )
        .bind(Uuid::new_v4())
        .bind(leaver)
        .bind(NaiveDate::from_ymd_opt(2031, 7, 10).unwrap())
        .execute(db)
        .await
        .unwrap();
        sqlx::query("UPDATE employees SET is_active = false WHERE id = $1")
            .bind(leaver)
            .execute(db)
            .await
            .unwrap();

        let last_day = NaiveDate::from_ymd_opt(2031, 7, 10).unwrap();
        let after = NaiveDate::from_ymd_opt(2031, 7, 11).unwrap();
        assert_eq!(process_day(db, last_day, Some(leaver)).await.unwrap().processed, 1);
        assert_eq!(process_day(db, after, Some(leaver)).await.unwrap().processed, 0);
    }
}
