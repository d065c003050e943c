// src/handlers/organization.rs

use super::units::{UnitKind, create_unit, delete_unit, get_unit, list_units, update_unit};
use crate::{
    auth::{AuthUser, HR_WRITERS},
    errors::{AppError, AppResult},
    models::{
        Company, CompanyRequest, Designation, DesignationRequest, Line, LineRequest,
        MessageResponse, NamedUnit, NamedUnitRequest, ParentFilter, SectionFilter,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgPool;
use uuid::Uuid;

fn require_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    Ok(())
}

// ─── Companies ────────────────────────────────────────────────────────────────

/// Register a company (factory unit)
#[utoipa::path(
    post,
    path = "/api/v1/companies",
    request_body = CompanyRequest,
    responses(
        (status = 201, description = "Company created", body = Company),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Company name already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn create_company(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CompanyRequest>,
) -> AppResult<(StatusCode, Json<Company>)> {
    auth.require(HR_WRITERS)?;
    require_name(&body.name)?;

    let company = sqlx::query_as::<_, Company>(
        r#"INSERT INTO companies (id, name, name_bangla, address, address_bangla, phone, email, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.name.trim())
    .bind(&body.name_bangla)
    .bind(&body.address)
    .bind(&body.address_bangla)
    .bind(&body.phone)
    .bind(&body.email)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(company)))
}

/// List companies
#[utoipa::path(
    get,
    path = "/api/v1/companies",
    responses((status = 200, description = "Companies", body = Vec<Company>)),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn list_companies(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Company>>> {
    let companies = sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(companies))
}

/// Get a company
#[utoipa::path(
    get,
    path = "/api/v1/companies/{company_id}",
    params(("company_id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company", body = Company),
        (status = 404, description = "Company not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn get_company(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<Company>> {
    let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(company_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {} not found", company_id)))?;
    Ok(Json(company))
}

/// Update a company
#[utoipa::path(
    put,
    path = "/api/v1/companies/{company_id}",
    request_body = CompanyRequest,
    params(("company_id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company updated", body = Company),
        (status = 404, description = "Company not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn update_company(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Json(body): Json<CompanyRequest>,
) -> AppResult<Json<Company>> {
    auth.require(HR_WRITERS)?;
    require_name(&body.name)?;

    let company = sqlx::query_as::<_, Company>(
        r#"UPDATE companies
           SET name = $2, name_bangla = $3, address = $4, address_bangla = $5,
               phone = $6, email = $7, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(company_id)
    .bind(body.name.trim())
    .bind(&body.name_bangla)
    .bind(&body.address)
    .bind(&body.address_bangla)
    .bind(&body.phone)
    .bind(&body.email)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Company {} not found", company_id)))?;

    Ok(Json(company))
}

/// Delete a company without departments
#[utoipa::path(
    delete,
    path = "/api/v1/companies/{company_id}",
    params(("company_id" = Uuid, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company deleted", body = MessageResponse),
        (status = 400, description = "Company still has departments"),
        (status = 404, description = "Company not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn delete_company(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;

    let result = sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(company_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Company {} not found", company_id)));
    }
    Ok(Json(MessageResponse::new("Company deleted")))
}

// ─── Departments & sections ───────────────────────────────────────────────────

/// List departments, optionally of one company (`parent_id`)
#[utoipa::path(
    get,
    path = "/api/v1/departments",
    params(ParentFilter),
    responses((status = 200, description = "Departments", body = Vec<NamedUnit>)),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn list_departments(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ParentFilter>,
) -> AppResult<Json<Vec<NamedUnit>>> {
    Ok(Json(list_units(&state.db, UnitKind::Department, filter.parent_id).await?))
}

/// Create a department; `parent_id` is the company
#[utoipa::path(
    post,
    path = "/api/v1/departments",
    request_body = NamedUnitRequest,
    responses(
        (status = 201, description = "Department created", body = NamedUnit),
        (status = 409, description = "Name already used in this company"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn create_department(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<(StatusCode, Json<NamedUnit>)> {
    auth.require(HR_WRITERS)?;
    let unit = create_unit(&state.db, UnitKind::Department, &body).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Update a department
#[utoipa::path(
    put,
    path = "/api/v1/departments/{id}",
    request_body = NamedUnitRequest,
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department updated", body = NamedUnit),
        (status = 404, description = "Department not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn update_department(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<Json<NamedUnit>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(update_unit(&state.db, UnitKind::Department, id, &body).await?))
}

/// Delete a department
#[utoipa::path(
    delete,
    path = "/api/v1/departments/{id}",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted", body = MessageResponse),
        (status = 400, description = "Department still has sections"),
        (status = 404, description = "Department not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn delete_department(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(delete_unit(&state.db, UnitKind::Department, id).await?))
}

/// List sections, optionally of one department (`parent_id`)
#[utoipa::path(
    get,
    path = "/api/v1/sections",
    params(ParentFilter),
    responses((status = 200, description = "Sections", body = Vec<NamedUnit>)),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn list_sections(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ParentFilter>,
) -> AppResult<Json<Vec<NamedUnit>>> {
    Ok(Json(list_units(&state.db, UnitKind::Section, filter.parent_id).await?))
}

/// Create a section; `parent_id` is the department
#[utoipa::path(
    post,
    path = "/api/v1/sections",
    request_body = NamedUnitRequest,
    responses(
        (status = 201, description = "Section created", body = NamedUnit),
        (status = 409, description = "Name already used in this department"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn create_section(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<(StatusCode, Json<NamedUnit>)> {
    auth.require(HR_WRITERS)?;
    let unit = create_unit(&state.db, UnitKind::Section, &body).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Update a section
#[utoipa::path(
    put,
    path = "/api/v1/sections/{id}",
    request_body = NamedUnitRequest,
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section updated", body = NamedUnit),
        (status = 404, description = "Section not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn update_section(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<Json<NamedUnit>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(update_unit(&state.db, UnitKind::Section, id, &body).await?))
}

/// Delete a section
#[utoipa::path(
    delete,
    path = "/api/v1/sections/{id}",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section deleted", body = MessageResponse),
        (status = 400, description = "Section still has designations or lines"),
        (status = 404, description = "Section not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn delete_section(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(delete_unit(&state.db, UnitKind::Section, id).await?))
}

// ─── Designations & lines ─────────────────────────────────────────────────────

/// Fills the denormalized department and company of a designation or line
/// from its section when the caller leaves them out.
async fn placement_of_section(
    db: &PgPool,
    section_id: Uuid,
    department_id: Option<Uuid>,
    company_id: Option<Uuid>,
) -> AppResult<(Option<Uuid>, Option<Uuid>)> {
    let section = get_unit(db, UnitKind::Section, section_id).await?;
    let department_id = department_id.or(section.parent_id);
    let company_id = match (company_id, department_id) {
        (Some(company), _) => Some(company),
        (None, Some(department)) => get_unit(db, UnitKind::Department, department)
            .await?
            .parent_id,
        (None, None) => None,
    };
    Ok((department_id, company_id))
}

/// List designations
#[utoipa::path(
    get,
    path = "/api/v1/designations",
    params(SectionFilter),
    responses((status = 200, description = "Designations", body = Vec<Designation>)),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn list_designations(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<SectionFilter>,
) -> AppResult<Json<Vec<Designation>>> {
    let designations = sqlx::query_as::<_, Designation>(
        r#"SELECT * FROM designations
           WHERE ($1::uuid IS NULL OR section_id = $1)
             AND ($2::uuid IS NULL OR department_id = $2)
             AND ($3::uuid IS NULL OR company_id = $3)
           ORDER BY name"#,
    )
    .bind(filter.section_id)
    .bind(filter.department_id)
    .bind(filter.company_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(designations))
}

/// Create a designation
#[utoipa::path(
    post,
    path = "/api/v1/designations",
    request_body = DesignationRequest,
    responses(
        (status = 201, description = "Designation created", body = Designation),
        (status = 404, description = "Section not found"),
        (status = 409, description = "Name already used in this section"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn create_designation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<DesignationRequest>,
) -> AppResult<(StatusCode, Json<Designation>)> {
    auth.require(HR_WRITERS)?;
    require_name(&body.name)?;
    let (department_id, company_id) =
        placement_of_section(&state.db, body.section_id, body.department_id, body.company_id)
            .await?;

    let designation = sqlx::query_as::<_, Designation>(
        r#"INSERT INTO designations (id, section_id, company_id, department_id, name, name_bangla, grade, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.section_id)
    .bind(company_id)
    .bind(department_id)
    .bind(body.name.trim())
    .bind(&body.name_bangla)
    .bind(&body.grade)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(designation)))
}

/// Update a designation
#[utoipa::path(
    put,
    path = "/api/v1/designations/{id}",
    request_body = DesignationRequest,
    params(("id" = Uuid, Path, description = "Designation ID")),
    responses(
        (status = 200, description = "Designation updated", body = Designation),
        (status = 404, description = "Designation not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn update_designation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DesignationRequest>,
) -> AppResult<Json<Designation>> {
    auth.require(HR_WRITERS)?;
    require_name(&body.name)?;
    let (department_id, company_id) =
        placement_of_section(&state.db, body.section_id, body.department_id, body.company_id)
            .await?;

    let designation = sqlx::query_as::<_, Designation>(
        r#"UPDATE designations
           SET section_id = $2, company_id = $3, department_id = $4,
               name = $5, name_bangla = $6, grade = $7, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(body.section_id)
    .bind(company_id)
    .bind(department_id)
    .bind(body.name.trim())
    .bind(&body.name_bangla)
    .bind(&body.grade)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Designation {} not found", id)))?;

    Ok(Json(designation))
}

/// Delete a designation
#[utoipa::path(
    delete,
    path = "/api/v1/designations/{id}",
    params(("id" = Uuid, Path, description = "Designation ID")),
    responses(
        (status = 200, description = "Designation deleted", body = MessageResponse),
        (status = 404, description = "Designation not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn delete_designation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    let result = sqlx::query("DELETE FROM designations WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Designation {} not found", id)));
    }
    Ok(Json(MessageResponse::new("Designation deleted")))
}

/// List sewing lines
#[utoipa::path(
    get,
    path = "/api/v1/lines",
    params(SectionFilter),
    responses((status = 200, description = "Lines", body = Vec<Line>)),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn list_lines(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<SectionFilter>,
) -> AppResult<Json<Vec<Line>>> {
    let lines = sqlx::query_as::<_, Line>(
        r#"SELECT * FROM lines
           WHERE ($1::uuid IS NULL OR section_id = $1)
             AND ($2::uuid IS NULL OR department_id = $2)
             AND ($3::uuid IS NULL OR company_id = $3)
           ORDER BY name"#,
    )
    .bind(filter.section_id)
    .bind(filter.department_id)
    .bind(filter.company_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(lines))
}

/// Create a line
#[utoipa::path(
    post,
    path = "/api/v1/lines",
    request_body = LineRequest,
    responses(
        (status = 201, description = "Line created", body = Line),
        (status = 404, description = "Section not found"),
        (status = 409, description = "Name already used in this section"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn create_line(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<LineRequest>,
) -> AppResult<(StatusCode, Json<Line>)> {
    auth.require(HR_WRITERS)?;
    require_name(&body.name)?;
    let (department_id, company_id) =
        placement_of_section(&state.db, body.section_id, body.department_id, body.company_id)
            .await?;

    let line = sqlx::query_as::<_, Line>(
        r#"INSERT INTO lines (id, section_id, company_id, department_id, name, name_bangla, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(body.section_id)
    .bind(company_id)
    .bind(department_id)
    .bind(body.name.trim())
    .bind(&body.name_bangla)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(line)))
}

/// Update a line
#[utoipa::path(
    put,
    path = "/api/v1/lines/{id}",
    request_body = LineRequest,
    params(("id" = Uuid, Path, description = "Line ID")),
    responses(
        (status = 200, description = "Line updated", body = Line),
        (status = 404, description = "Line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn update_line(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<LineRequest>,
) -> AppResult<Json<Line>> {
    auth.require(HR_WRITERS)?;
    require_name(&body.name)?;
    let (department_id, company_id) =
        placement_of_section(&state.db, body.section_id, body.department_id, body.company_id)
            .await?;

    let line = sqlx::query_as::<_, Line>(
        r#"UPDATE lines
           SET section_id = $2, company_id = $3, department_id = $4,
               name = $5, name_bangla = $6, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(body.section_id)
    .bind(company_id)
    .bind(department_id)
    .bind(body.name.trim())
    .bind(&body.name_bangla)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Line {} not found", id)))?;

    Ok(Json(line))
}

/// Delete a line not used by any production assignment
#[utoipa::path(
    delete,
    path = "/api/v1/lines/{id}",
    params(("id" = Uuid, Path, description = "Line ID")),
    responses(
        (status = 200, description = "Line deleted", body = MessageResponse),
        (status = 400, description = "Line still has production assignments"),
        (status = 404, description = "Line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Organization"
)]
pub async fn delete_line(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    let result = sqlx::query("DELETE FROM lines WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Line {} not found", id)));
    }
    Ok(Json(MessageResponse::new("Line deleted")))
}
