// src/handlers/employee.rs

use super::geography::{resolve_address, validate_address};
use crate::{
    auth::{AuthUser, HR_WRITERS},
    errors::{AppError, AppResult},
    models::{
        BulkEmployeeRequest, BulkImportResponse, Employee, EmployeeAddresses, EmployeeFilter,
        EmployeeRequest, MessageResponse, SalaryStructure, SalaryStructureQuery,
    },
    services::payroll::salary_structure,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Postgres, postgres::PgArguments, query::QueryAs};
use tracing::info;
use uuid::Uuid;

/// Columns written from an `EmployeeRequest`, in bind order starting at `$2`
const EMPLOYEE_COLUMNS: [&str; 56] = [
    "employee_code",
    "proximity",
    "company_name",
    "company_id",
    "department_id",
    "section_id",
    "designation_id",
    "line_id",
    "shift_id",
    "employee_type",
    "grade",
    "joining_date",
    "name",
    "name_bangla",
    "father_name",
    "father_name_bangla",
    "mother_name",
    "mother_name_bangla",
    "spouse_name",
    "date_of_birth",
    "gender",
    "religion",
    "marital_status",
    "blood_group",
    "nid",
    "birth_certificate",
    "nationality",
    "phone",
    "email",
    "gross_salary",
    "basic_salary",
    "house_rent",
    "medical_allowance",
    "food_allowance",
    "conveyance",
    "attendance_bonus",
    "ot_eligible",
    "payment_mode",
    "bank_name",
    "bank_branch",
    "bank_account_number",
    "emergency_contact_name",
    "emergency_contact_phone",
    "emergency_contact_relation",
    "present_country_id",
    "present_division_id",
    "present_district_id",
    "present_thana_id",
    "present_post_office_id",
    "present_village",
    "permanent_country_id",
    "permanent_division_id",
    "permanent_district_id",
    "permanent_thana_id",
    "permanent_post_office_id",
    "permanent_village",
];

/// Placeholder of the optional `is_active` value following the columns
const IS_ACTIVE_PARAM: usize = EMPLOYEE_COLUMNS.len() + 2;

fn insert_sql() -> String {
    let placeholders: Vec<String> = (2..IS_ACTIVE_PARAM).map(|n| format!("${n}")).collect();
    format!(
        "INSERT INTO employees (id, {}, is_active, created_at, updated_at) \
         VALUES ($1, {}, COALESCE(${IS_ACTIVE_PARAM}, true), NOW(), NOW()) \
         RETURNING *",
        EMPLOYEE_COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

fn update_sql() -> String {
    let assignments: Vec<String> = EMPLOYEE_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 2))
        .collect();
    format!(
        "UPDATE employees SET {}, is_active = COALESCE(${IS_ACTIVE_PARAM}, is_active), \
         updated_at = NOW() WHERE id = $1 RETURNING *",
        assignments.join(", ")
    )
}

/// Salary components of a request, deriving the ones left out from the gross.
pub fn requested_structure(body: &EmployeeRequest) -> SalaryStructure {
    let derived = salary_structure(body.gross_salary);
    SalaryStructure {
        gross_salary: body.gross_salary,
        basic_salary: body.basic_salary.unwrap_or(derived.basic_salary),
        house_rent: body.house_rent.unwrap_or(derived.house_rent),
        medical_allowance: body.medical_allowance.unwrap_or(derived.medical_allowance),
        food_allowance: body.food_allowance.unwrap_or(derived.food_allowance),
        conveyance: body.conveyance.unwrap_or(derived.conveyance),
    }
}

fn validate_employee(body: &EmployeeRequest) -> AppResult<()> {
    if body.employee_code.trim().is_empty() {
        return Err(AppError::Validation("employee_code is required".to_string()));
    }
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if body.gross_salary < Decimal::ZERO {
        return Err(AppError::Validation(
            "gross_salary cannot be negative".to_string(),
        ));
    }
    if body.proximity.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err(AppError::Validation(
            "proximity cannot be blank; omit it instead".to_string(),
        ));
    }
    Ok(())
}

/// Validates the payload and both address chains before any write.
async fn check_request(db: &PgPool, body: &EmployeeRequest) -> AppResult<()> {
    validate_employee(body)?;
    validate_address(db, body.present_address_ids()).await?;
    validate_address(db, body.permanent_address_ids()).await?;
    Ok(())
}

fn bind_employee<'q>(
    query: QueryAs<'q, Postgres, Employee, PgArguments>,
    body: &'q EmployeeRequest,
) -> QueryAs<'q, Postgres, Employee, PgArguments> {
    let salary = requested_structure(body);
    query
        .bind(body.employee_code.trim())
        .bind(body.proximity.as_deref().map(str::trim))
        .bind(body.company_name.as_deref())
        .bind(body.company_id)
        .bind(body.department_id)
        .bind(body.section_id)
        .bind(body.designation_id)
        .bind(body.line_id)
        .bind(body.shift_id)
        .bind(body.employee_type.as_deref())
        .bind(body.grade.as_deref())
        .bind(body.joining_date)
        .bind(body.name.trim())
        .bind(body.name_bangla.as_deref())
        .bind(body.father_name.as_deref())
        .bind(body.father_name_bangla.as_deref())
        .bind(body.mother_name.as_deref())
        .bind(body.mother_name_bangla.as_deref())
        .bind(body.spouse_name.as_deref())
        .bind(body.date_of_birth)
        .bind(body.gender.as_deref())
        .bind(body.religion.as_deref())
        .bind(body.marital_status.as_deref())
        .bind(body.blood_group.as_deref())
        .bind(body.nid.as_deref())
        .bind(body.birth_certificate.as_deref())
        .bind(body.nationality.as_deref())
        .bind(body.phone.as_deref())
        .bind(body.email.as_deref())
        .bind(salary.gross_salary)
        .bind(salary.basic_salary)
        .bind(salary.house_rent)
        .bind(salary.medical_allowance)
        .bind(salary.food_allowance)
        .bind(salary.conveyance)
        .bind(body.attendance_bonus.unwrap_or_default())
        .bind(body.ot_eligible.unwrap_or(true))
        .bind(body.payment_mode.as_deref())
        .bind(body.bank_name.as_deref())
        .bind(body.bank_branch.as_deref())
        .bind(body.bank_account_number.as_deref())
        .bind(body.emergency_contact_name.as_deref())
        .bind(body.emergency_contact_phone.as_deref())
        .bind(body.emergency_contact_relation.as_deref())
        .bind(body.present_country_id)
        .bind(body.present_division_id)
        .bind(body.present_district_id)
        .bind(body.present_thana_id)
        .bind(body.present_post_office_id)
        .bind(body.present_village.as_deref())
        .bind(body.permanent_country_id)
        .bind(body.permanent_division_id)
        .bind(body.permanent_district_id)
        .bind(body.permanent_thana_id)
        .bind(body.permanent_post_office_id)
        .bind(body.permanent_village.as_deref())
        .bind(body.is_active)
}

async fn insert_employee<'e>(
    db: impl PgExecutor<'e>,
    body: &EmployeeRequest,
) -> AppResult<Employee> {
    let sql = insert_sql();
    let employee = bind_employee(sqlx::query_as::<_, Employee>(&sql).bind(Uuid::new_v4()), body)
        .fetch_one(db)
        .await?;
    Ok(employee)
}

pub async fn fetch_employee<'e>(db: impl PgExecutor<'e>, employee_id: Uuid) -> AppResult<Employee> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
        .bind(employee_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))
}

/// Onboard a new employee
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = EmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid payload or address"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Employee code or proximity already used in this company"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn create_employee(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<EmployeeRequest>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    auth.require(HR_WRITERS)?;
    check_request(&state.db, &body).await?;

    let employee = insert_employee(&state.db, &body).await?;
    info!("Employee {} ({}) onboarded", employee.employee_code, employee.id);

    Ok((StatusCode::CREATED, Json(employee)))
}

/// Import many employees at once; nothing is stored unless every row is valid
#[utoipa::path(
    post,
    path = "/api/v1/employees/bulk",
    request_body = BulkEmployeeRequest,
    responses(
        (status = 201, description = "Employees imported", body = BulkImportResponse),
        (status = 400, description = "A row is invalid"),
        (status = 409, description = "A row duplicates an existing employee"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn bulk_create_employees(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkEmployeeRequest>,
) -> AppResult<(StatusCode, Json<BulkImportResponse>)> {
    auth.require(HR_WRITERS)?;
    if body.employees.is_empty() {
        return Err(AppError::Validation("No employees to import".to_string()));
    }

    for (row, employee) in body.employees.iter().enumerate() {
        check_request(&state.db, employee).await.map_err(|e| match e {
            AppError::Validation(msg) => AppError::Validation(format!("Row {}: {msg}", row + 1)),
            other => other,
        })?;
    }

    let mut tx = state.db.begin().await?;
    for employee in &body.employees {
        insert_employee(&mut *tx, employee).await?;
    }
    tx.commit().await?;

    info!("Bulk import stored {} employees", body.employees.len());
    Ok((
        StatusCode::CREATED,
        Json(BulkImportResponse {
            inserted: body.employees.len(),
        }),
    ))
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeFilter),
    responses(
        (status = 200, description = "List of employees", body = Vec<Employee>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn list_employees(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<EmployeeFilter>,
) -> AppResult<Json<Vec<Employee>>> {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let employees = sqlx::query_as::<_, Employee>(
        r#"SELECT * FROM employees
           WHERE ($1::uuid IS NULL OR company_id = $1)
             AND ($2::uuid IS NULL OR department_id = $2)
             AND ($3::uuid IS NULL OR section_id = $3)
             AND ($4::uuid IS NULL OR line_id = $4)
             AND ($5::bool IS NULL OR is_active = $5)
             AND ($6::text IS NULL
                  OR employee_code ILIKE $6 OR proximity ILIKE $6
                  OR name ILIKE $6 OR name_bangla ILIKE $6)
           ORDER BY employee_code"#,
    )
    .bind(filter.company_id)
    .bind(filter.department_id)
    .bind(filter.section_id)
    .bind(filter.line_id)
    .bind(filter.is_active)
    .bind(search)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(employees))
}

/// Get a single employee
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee detail", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn get_employee(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<Employee>> {
    Ok(Json(fetch_employee(&state.db, employee_id).await?))
}

/// Replace an employee's record
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    request_body = EmployeeRequest,
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee code or proximity already used in this company"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn update_employee(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Json(body): Json<EmployeeRequest>,
) -> AppResult<Json<Employee>> {
    auth.require(HR_WRITERS)?;
    check_request(&state.db, &body).await?;

    let sql = update_sql();
    let employee = bind_employee(sqlx::query_as::<_, Employee>(&sql).bind(employee_id), &body)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))?;

    Ok(Json(employee))
}

/// Delete an employee together with all attendance, leave, payroll and lifecycle history
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deleted", body = MessageResponse),
        (status = 404, description = "Employee not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn delete_employee(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;

    let result = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(employee_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Employee {} not found", employee_id)));
    }

    info!("Employee {} deleted by {}", employee_id, auth.username);
    Ok(Json(MessageResponse::new("Employee deleted")))
}

/// Present and permanent address with every geography level resolved
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/addresses",
    params(("employee_id" = Uuid, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Resolved addresses", body = EmployeeAddresses),
        (status = 404, description = "Employee not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn get_employee_addresses(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<EmployeeAddresses>> {
    let employee = fetch_employee(&state.db, employee_id).await?;

    Ok(Json(EmployeeAddresses {
        present: resolve_address(
            &state.db,
            employee.present_address_ids(),
            employee.present_village.clone(),
        )
        .await?,
        permanent: resolve_address(
            &state.db,
            employee.permanent_address_ids(),
            employee.permanent_village.clone(),
        )
        .await?,
    }))
}

/// Preview the wage structure of a gross salary
#[utoipa::path(
    get,
    path = "/api/v1/employees/salary-structure",
    params(SalaryStructureQuery),
    responses(
        (status = 200, description = "Salary breakdown", body = SalaryStructure),
        (status = 400, description = "Negative gross"),
    ),
    security(("bearer_auth" = [])),
    tag = "Employees"
)]
pub async fn preview_salary_structure(
    _auth: AuthUser,
    Query(query): Query<SalaryStructureQuery>,
) -> AppResult<Json<SalaryStructure>> {
    if query.gross < Decimal::ZERO {
        return Err(AppError::Validation("gross cannot be negative".to_string()));
    }
    Ok(Json(salary_structure(query.gross)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::UserRole,
        routes::app,
        state::testing::{bearer, db_state},
    };
    use axum::{Router, body::Body, http::Request};
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn request() -> EmployeeRequest {
        serde_json::from_value(serde_json::json!({
            "employee_code": "E-1001",
            "proximity": "1001",
            "company_name": "Alpha Knit",
            "joining_date": "2024-01-01",
            "name": "Rahima Khatun",
            "gross_salary": "12500"
        }))
        .unwrap()
    }

    #[test]
    fn insert_statement_lines_up_with_binds() {
        let sql = insert_sql();
        assert!(sql.contains("VALUES ($1, $2, $3,"));
        assert!(sql.contains("$57, COALESCE($58, true)"));
        assert!(!sql.contains("$59"));
    }

    #[test]
    fn update_statement_lines_up_with_binds() {
        let sql = update_sql();
        assert!(sql.contains("employee_code = $2,"));
        assert!(sql.contains("permanent_village = $57,"));
        assert!(sql.contains("is_active = COALESCE($58, is_active)"));
    }

    #[test]
    fn missing_components_come_from_the_gross() {
        let derived = requested_structure(&request());
        assert_eq!(derived, salary_structure(dec!(12500)));

        let mut custom = request();
        custom.basic_salary = Some(dec!(7000));
        let structure = requested_structure(&custom);
        assert_eq!(structure.basic_salary, dec!(7000));
        assert_eq!(structure.medical_allowance, dec!(750));
    }

    #[test]
    fn blank_identity_is_rejected() {
        assert!(validate_employee(&request()).is_ok());

        let mut blank_code = request();
        blank_code.employee_code = "  ".to_string();
        assert!(validate_employee(&blank_code).is_err());

        let mut blank_card = request();
        blank_card.proximity = Some(String::new());
        assert!(validate_employee(&blank_card).is_err());

        let mut negative = request();
        negative.gross_salary = dec!(-1);
        assert!(validate_employee(&negative).is_err());
    }

    fn row(code: &str, card: &str, company: Option<&str>) -> Value {
        json!({
            "employee_code": code,
            "proximity": card,
            "company_name": company,
            "joining_date": "2024-01-01",
            "name": "Rahima Khatun",
            "gross_salary": "12500"
        })
    }

    async fn post(router: &Router, token: &str, uri: &str, body: Value) -> StatusCode {
        router
            .clone()
            .oneshot(
                Request::post(uri)
                    .header("Authorization", token)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn codes_and_cards_are_unique_per_named_company() {
        let Some(state) = db_state().await else {
            return;
        };
        let token = bearer(&state, UserRole::Hr).await;
        let router = app(state);
        let tag = Uuid::new_v4().simple().to_string();
        let alpha = format!("Alpha {tag}");
        let beta = format!("Beta {tag}");
        let code = format!("E-{tag}");
        let card = format!("C-{tag}");
        let url = "/api/v1/employees";

        let created = post(&router, &token, url, row(&code, &card, Some(&alpha))).await;
        assert_eq!(created, StatusCode::CREATED);

        let same_code = post(&router, &token, url, row(&code, "other-card", Some(&alpha))).await;
        assert_eq!(same_code, StatusCode::CONFLICT);
        let same_card = post(&router, &token, url, row("other-code", &card, Some(&alpha))).await;
        assert_eq!(same_card, StatusCode::CONFLICT);

        let other_company = post(&router, &token, url, row(&code, &card, Some(&beta))).await;
        assert_eq!(other_company, StatusCode::CREATED);

        for _ in 0..2 {
            let unnamed = post(&router, &token, url, row(&code, &card, None)).await;
            assert_eq!(unnamed, StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn bulk_import_with_a_duplicate_stores_nothing() {
        let Some(state) = db_state().await else {
            return;
        };
        let db = state.db.clone();
        let token = bearer(&state, UserRole::Hr).await;
        let router = app(state);
        let tag = Uuid::new_v4().simple().to_string();
        let company = format!("Alpha {tag}");
        let fresh = format!("F-{tag}");
        let taken = format!("T-{tag}");

        let seeded = post(
            &router,
            &token,
            "/api/v1/employees",
            row(&taken, &format!("T{tag}"), Some(&company)),
        )
        .await;
        assert_eq!(seeded, StatusCode::CREATED);

        let body = json!({
            "employees": [
                row(&fresh, &format!("F{tag}"), Some(&company)),
                row(&taken, &format!("X{tag}"), Some(&company)),
            ]
        });
        let status = post(&router, &token, "/api/v1/employees/bulk", body).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let stored = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM employees WHERE company_name = $1",
        )
        .bind(&company)
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(stored, 1);
    }
}
