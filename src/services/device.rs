// src/services/device.rs
//
// ZKTeco push protocol (ADMS) support and the shared punch store.

use crate::{errors::AppResult, models::PunchInput};
use chrono::NaiveDateTime;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

const PUNCH_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serial recorded for punches imported without one
pub const MANUAL_IMPORT_SERIAL: &str = "IMPORT";

/// Options block a device reads on its first `GET /iclock/cdata` call
pub fn handshake_options(serial: &str, timezone: i32) -> String {
    [
        format!("GET OPTION FROM: {serial}"),
        "ATTLOGStamp=None".to_string(),
        "OPERLOGStamp=9999".to_string(),
        "ATTPHOTOStamp=None".to_string(),
        "ErrorDelay=30".to_string(),
        "Delay=10".to_string(),
        "TransTimes=00:00;14:05".to_string(),
        "TransInterval=1".to_string(),
        "TransFlag=TransData AttLog".to_string(),
        format!("TimeZone={timezone}"),
        "Realtime=1".to_string(),
        "Encrypt=None".to_string(),
    ]
    .join("\n")
}

/// Parses an ATTLOG body: one punch per line, tab separated as
/// `PIN  YYYY-MM-DD HH:MM:SS  status  verify  ...`.
/// Lines that cannot be read are skipped.
pub fn parse_attlog(serial: &str, body: &str) -> Vec<PunchInput> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split('\t').map(str::trim);
            let pin = fields.next().filter(|p| !p.is_empty())?;
            let stamp = fields.next()?;
            let punch_time = match NaiveDateTime::parse_from_str(stamp, PUNCH_TIME_FORMAT) {
                Ok(t) => t,
                Err(_) => {
                    warn!("Device {} sent an unreadable punch: {:?}", serial, line);
                    return None;
                }
            };
            let verify_mode = fields.nth(1).and_then(|v| v.parse().ok());
            Some(PunchInput {
                device_serial: Some(serial.to_string()),
                proximity: pin.to_string(),
                punch_time,
                verify_mode,
            })
        })
        .collect()
}

/// Outcome of looking up a card number among the employees it could belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardMatch {
    Employee(Uuid),
    Unknown,
    /// Several employees carry the card; the punch is stored unassigned
    Ambiguous,
}

pub fn match_card(candidates: &[Uuid]) -> CardMatch {
    match candidates {
        [] => CardMatch::Unknown,
        [only] => CardMatch::Employee(*only),
        _ => CardMatch::Ambiguous,
    }
}

/// Stores punches, resolving each card number to the one employee of
/// `company_name` (any company when `None`) who carries it on the punch date.
/// Unknown or ambiguous cards are stored without an employee. Duplicates of
/// stored punches are ignored; returns how many rows were written.
pub async fn store_punches(
    db: &PgPool,
    punches: &[PunchInput],
    company_name: Option<&str>,
) -> AppResult<u64> {
    if punches.is_empty() {
        return Ok(0);
    }

    let mut tx = db.begin().await?;
    let mut inserted = 0;

    for punch in punches {
        let serial = punch
            .device_serial
            .as_deref()
            .unwrap_or(MANUAL_IMPORT_SERIAL);

        let candidates = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT e.id FROM employees e
               WHERE e.proximity = $1
                 AND ($2::text IS NULL OR e.company_name = $2)
                 AND e.joining_date <= $3
                 AND (e.is_active = true OR EXISTS (
                     SELECT 1 FROM separations s
                     WHERE s.employee_id = e.id AND s.separation_date >= $3))
               LIMIT 2"#,
        )
        .bind(&punch.proximity)
        .bind(company_name)
        .bind(punch.punch_time.date())
        .fetch_all(&mut *tx)
        .await?;

        let employee_id = match match_card(&candidates) {
            CardMatch::Employee(id) => Some(id),
            CardMatch::Unknown => None,
            CardMatch::Ambiguous => {
                warn!(
                    serial,
                    proximity = %punch.proximity,
                    "card number is shared by several employees; punch stored unassigned"
                );
                None
            }
        };

        let result = sqlx::query(
            r#"INSERT INTO attendance_logs
                   (id, device_serial, proximity, company_name, employee_id, punch_time,
                    verify_mode, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
               ON CONFLICT (device_serial, proximity, punch_time) DO NOTHING"#,
        )
        .bind(Uuid::new_v4())
        .bind(serial)
        .bind(&punch.proximity)
        .bind(company_name)
        .bind(employee_id)
        .bind(punch.punch_time)
        .bind(punch.verify_mode)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;

    debug!("Stored {} of {} punches", inserted, punches.len());
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{db_state, insert_company, insert_employee};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn handshake_names_device_and_timezone() {
        let options = handshake_options("CKJ1234567", 6);
        let lines: Vec<&str> = options.lines().collect();
        assert_eq!(lines[0], "GET OPTION FROM: CKJ1234567");
        assert!(lines.contains(&"TimeZone=6"));
        assert!(lines.contains(&"TransFlag=TransData AttLog"));
        assert_eq!(lines.len(), 12);
    }

    #[test]
    fn attlog_lines_become_punches() {
        let body = "1001\t2024-05-01 07:58:12\t0\t1\t0\t0\n\
                    1002\t2024-05-01 08:09:40\t0\t15\n";
        let punches = parse_attlog("CKJ1234567", body);
        assert_eq!(punches.len(), 2);
        assert_eq!(punches[0].proximity, "1001");
        assert_eq!(punches[0].device_serial.as_deref(), Some("CKJ1234567"));
        assert_eq!(
            punches[0].punch_time,
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(7, 58, 12)
                .unwrap()
        );
        assert_eq!(punches[0].verify_mode, Some(1));
        assert_eq!(punches[1].verify_mode, Some(15));
    }

    #[test]
    fn unreadable_lines_are_skipped() {
        let body = "\n1001\tyesterday\t0\t1\n\t2024-05-01 07:58:12\n1003\t2024-05-01 17:01:00";
        let punches = parse_attlog("CKJ1234567", body);
        assert_eq!(punches.len(), 1);
        assert_eq!(punches[0].proximity, "1003");
        assert_eq!(punches[0].verify_mode, None);
    }

    #[test]
    fn shared_cards_are_never_guessed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(match_card(&[]), CardMatch::Unknown);
        assert_eq!(match_card(&[a]), CardMatch::Employee(a));
        assert_eq!(match_card(&[a, b]), CardMatch::Ambiguous);
    }

    async fn punch_owner(db: &PgPool, serial: &str, proximity: &str) -> Option<Uuid> {
        sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT employee_id FROM attendance_logs WHERE device_serial = $1 AND proximity = $2",
        )
        .bind(serial)
        .bind(proximity)
        .fetch_one(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn punches_go_to_the_devices_company() {
        let Some(state) = db_state().await else {
            return;
        };
        let db = &state.db;
        let alpha = insert_company(db).await;
        let beta = insert_company(db).await;
        // a card number unique to this test run, issued by both companies
        let card = Uuid::new_v4().simple().to_string();
        let joined = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        insert_employee(db, &alpha, &card, joined, dec!(12000)).await;
        let beta_worker = insert_employee(db, &beta, &card, joined, dec!(12000)).await;

        let at = NaiveDate::from_ymd_opt(2031, 6, 2)
            .unwrap()
            .and_hms_opt(7, 58, 0)
            .unwrap();
        let punch = |serial: &str| PunchInput {
            device_serial: Some(serial.to_string()),
            proximity: card.clone(),
            punch_time: at,
            verify_mode: Some(1),
        };

        store_punches(db, &[punch("BETA-DEVICE")], Some(&beta.1))
            .await
            .unwrap();
        assert_eq!(punch_owner(db, "BETA-DEVICE", &card).await, Some(beta_worker));

        // no company to narrow it down: stored, but not attributed to either
        store_punches(db, &[punch("LOBBY-DEVICE")], None).await.unwrap();
        assert_eq!(punch_owner(db, "LOBBY-DEVICE", &card).await, None);
    }
}
