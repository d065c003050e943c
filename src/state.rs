use crate::config::Config;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Cashbook context; the same pool as `db` unless a separate database is configured
    pub cashbook_db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, cashbook_db: PgPool, config: Config) -> Self {
        Self {
            db,
            cashbook_db,
            config: Arc::new(config),
        }
    }
}

/// Database-backed test fixtures. Every helper writes rows under fresh
/// names so tests can share one database and run in parallel.
#[cfg(test)]
pub mod testing {
    use super::AppState;
    use crate::{
        auth::generate_token, config::test_config, models::UserRole,
        services::payroll::salary_structure,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use sqlx::{PgPool, postgres::PgPoolOptions};
    use uuid::Uuid;

    /// State over the database named by `DATABASE_URL` with both migration
    /// sets applied, or `None` when the variable is unset.
    pub async fn db_state() -> Option<AppState> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let db = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("DATABASE_URL must point at a reachable database");

        let mut hr = sqlx::migrate!("./migrations");
        hr.set_ignore_missing(true);
        hr.run(&db).await.expect("HR migrations");
        let mut cashbook = sqlx::migrate!("./cashbook_migrations");
        cashbook.set_ignore_missing(true);
        cashbook.run(&db).await.expect("cashbook migrations");

        let mut config = test_config();
        config.database_url = url;
        Some(AppState::new(db.clone(), db, config))
    }

    /// Registers a user with `role` and returns an Authorization header value
    pub async fn bearer(state: &AppState, role: UserRole) -> String {
        let id = Uuid::new_v4();
        let username = format!("user-{}", id.simple());
        sqlx::query(
            r#"INSERT INTO users (id, username, full_name, password_hash, role)
               VALUES ($1, $2, 'Fixture User', 'not-a-hash', $3)"#,
        )
        .bind(id)
        .bind(&username)
        .bind(role)
        .execute(&state.db)
        .await
        .unwrap();

        let token = generate_token(id, &username, role, &state.config.jwt_secret, 1).unwrap();
        format!("Bearer {token}")
    }

    /// A company with a unique name; returns its id and name
    pub async fn insert_company(db: &PgPool) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let name = format!("Company {}", id.simple());
        sqlx::query("INSERT INTO companies (id, name) VALUES ($1, $2)")
            .bind(id)
            .bind(&name)
            .execute(db)
            .await
            .unwrap();
        (id, name)
    }

    pub async fn insert_employee(
        db: &PgPool,
        company: &(Uuid, String),
        proximity: &str,
        joining_date: NaiveDate,
        gross: Decimal,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let s = salary_structure(gross);
        sqlx::query(
            r#"INSERT INTO employees (
                   id, employee_code, proximity, company_name, company_id, joining_date, name,
                   gross_salary, basic_salary, house_rent, medical_allowance, food_allowance,
                   conveyance
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(id)
        .bind(format!("E-{}", &id.simple().to_string()[..8]))
        .bind(proximity)
        .bind(&company.1)
        .bind(company.0)
        .bind(joining_date)
        .bind(format!("Worker {proximity}"))
        .bind(s.gross_salary)
        .bind(s.basic_salary)
        .bind(s.house_rent)
        .bind(s.medical_allowance)
        .bind(s.food_allowance)
        .bind(s.conveyance)
        .execute(db)
        .await
        .unwrap();
        id
    }
}
