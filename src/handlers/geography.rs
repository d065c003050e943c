// src/handlers/geography.rs

use super::units::{UnitKind, create_unit, delete_unit, find_unit, list_units, update_unit};
use crate::{
    auth::{AuthUser, HR_WRITERS},
    errors::{AppError, AppResult},
    models::{AddressIds, MessageResponse, NamedUnit, NamedUnitRequest, ParentFilter, ResolvedAddress},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgPool;
use uuid::Uuid;

// ─── Address resolution ───────────────────────────────────────────────────────

async fn load_level(db: &PgPool, kind: UnitKind, id: Option<Uuid>) -> AppResult<Option<NamedUnit>> {
    let Some(id) = id else {
        return Ok(None);
    };
    find_unit(db, kind, id)
        .await?
        .map(Some)
        .ok_or_else(|| AppError::Validation(format!("{} {} does not exist", kind.label(), id)))
}

/// Loads every geography level referenced by `ids`.
pub async fn resolve_address(
    db: &PgPool,
    ids: AddressIds,
    village: Option<String>,
) -> AppResult<ResolvedAddress> {
    Ok(ResolvedAddress {
        country: load_level(db, UnitKind::Country, ids.country_id).await?,
        division: load_level(db, UnitKind::Division, ids.division_id).await?,
        district: load_level(db, UnitKind::District, ids.district_id).await?,
        thana: load_level(db, UnitKind::Thana, ids.thana_id).await?,
        post_office: load_level(db, UnitKind::PostOffice, ids.post_office_id).await?,
        village,
    })
}

fn ensure_child_of(
    child: Option<&NamedUnit>,
    child_kind: UnitKind,
    parent: Option<&NamedUnit>,
    parent_kind: UnitKind,
) -> AppResult<()> {
    if let (Some(child), Some(parent)) = (child, parent) {
        if child.parent_id != Some(parent.id) {
            return Err(AppError::Validation(format!(
                "{} '{}' is not in {} '{}'",
                child_kind.label(),
                child.name,
                parent_kind.label().to_lowercase(),
                parent.name
            )));
        }
    }
    Ok(())
}

/// Every level given must sit under the level above it.
pub fn check_address_chain(address: &ResolvedAddress) -> AppResult<()> {
    ensure_child_of(
        address.division.as_ref(),
        UnitKind::Division,
        address.country.as_ref(),
        UnitKind::Country,
    )?;
    ensure_child_of(
        address.district.as_ref(),
        UnitKind::District,
        address.division.as_ref(),
        UnitKind::Division,
    )?;
    ensure_child_of(
        address.thana.as_ref(),
        UnitKind::Thana,
        address.district.as_ref(),
        UnitKind::District,
    )?;
    ensure_child_of(
        address.post_office.as_ref(),
        UnitKind::PostOffice,
        address.district.as_ref(),
        UnitKind::District,
    )
}

pub async fn validate_address(db: &PgPool, ids: AddressIds) -> AppResult<()> {
    let address = resolve_address(db, ids, None).await?;
    check_address_chain(&address)
}

// ─── Countries ────────────────────────────────────────────────────────────────

/// List countries
#[utoipa::path(
    get,
    path = "/api/v1/countries",
    responses((status = 200, description = "Countries", body = Vec<NamedUnit>)),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn list_countries(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<NamedUnit>>> {
    Ok(Json(list_units(&state.db, UnitKind::Country, None).await?))
}

/// Create a country
#[utoipa::path(
    post,
    path = "/api/v1/countries",
    request_body = NamedUnitRequest,
    responses(
        (status = 201, description = "Country created", body = NamedUnit),
        (status = 409, description = "Country already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn create_country(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<(StatusCode, Json<NamedUnit>)> {
    auth.require(HR_WRITERS)?;
    let unit = create_unit(&state.db, UnitKind::Country, &body).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Update a country
#[utoipa::path(
    put,
    path = "/api/v1/countries/{id}",
    request_body = NamedUnitRequest,
    params(("id" = Uuid, Path, description = "Country ID")),
    responses(
        (status = 200, description = "Country updated", body = NamedUnit),
        (status = 404, description = "Country not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn update_country(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<Json<NamedUnit>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(update_unit(&state.db, UnitKind::Country, id, &body).await?))
}

/// Delete a country
#[utoipa::path(
    delete,
    path = "/api/v1/countries/{id}",
    params(("id" = Uuid, Path, description = "Country ID")),
    responses(
        (status = 200, description = "Country deleted", body = MessageResponse),
        (status = 400, description = "Country still has divisions"),
        (status = 404, description = "Country not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn delete_country(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(delete_unit(&state.db, UnitKind::Country, id).await?))
}

// ─── Divisions ────────────────────────────────────────────────────────────────

/// List divisions, optionally of one country (`parent_id`)
#[utoipa::path(
    get,
    path = "/api/v1/divisions",
    params(ParentFilter),
    responses((status = 200, description = "Divisions", body = Vec<NamedUnit>)),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn list_divisions(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ParentFilter>,
) -> AppResult<Json<Vec<NamedUnit>>> {
    Ok(Json(list_units(&state.db, UnitKind::Division, filter.parent_id).await?))
}

/// Create a division; `parent_id` is the country
#[utoipa::path(
    post,
    path = "/api/v1/divisions",
    request_body = NamedUnitRequest,
    responses(
        (status = 201, description = "Division created", body = NamedUnit),
        (status = 409, description = "Division already exists in this country"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn create_division(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<(StatusCode, Json<NamedUnit>)> {
    auth.require(HR_WRITERS)?;
    let unit = create_unit(&state.db, UnitKind::Division, &body).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Update a division
#[utoipa::path(
    put,
    path = "/api/v1/divisions/{id}",
    request_body = NamedUnitRequest,
    params(("id" = Uuid, Path, description = "Division ID")),
    responses(
        (status = 200, description = "Division updated", body = NamedUnit),
        (status = 404, description = "Division not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn update_division(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<Json<NamedUnit>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(update_unit(&state.db, UnitKind::Division, id, &body).await?))
}

/// Delete a division
#[utoipa::path(
    delete,
    path = "/api/v1/divisions/{id}",
    params(("id" = Uuid, Path, description = "Division ID")),
    responses(
        (status = 200, description = "Division deleted", body = MessageResponse),
        (status = 400, description = "Division still has districts"),
        (status = 404, description = "Division not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn delete_division(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(delete_unit(&state.db, UnitKind::Division, id).await?))
}

// ─── Districts ────────────────────────────────────────────────────────────────

/// List districts, optionally of one division (`parent_id`)
#[utoipa::path(
    get,
    path = "/api/v1/districts",
    params(ParentFilter),
    responses((status = 200, description = "Districts", body = Vec<NamedUnit>)),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn list_districts(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ParentFilter>,
) -> AppResult<Json<Vec<NamedUnit>>> {
    Ok(Json(list_units(&state.db, UnitKind::District, filter.parent_id).await?))
}

/// Create a district; `parent_id` is the division
#[utoipa::path(
    post,
    path = "/api/v1/districts",
    request_body = NamedUnitRequest,
    responses(
        (status = 201, description = "District created", body = NamedUnit),
        (status = 409, description = "District already exists in this division"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn create_district(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<(StatusCode, Json<NamedUnit>)> {
    auth.require(HR_WRITERS)?;
    let unit = create_unit(&state.db, UnitKind::District, &body).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Update a district
#[utoipa::path(
    put,
    path = "/api/v1/districts/{id}",
    request_body = NamedUnitRequest,
    params(("id" = Uuid, Path, description = "District ID")),
    responses(
        (status = 200, description = "District updated", body = NamedUnit),
        (status = 404, description = "District not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn update_district(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<Json<NamedUnit>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(update_unit(&state.db, UnitKind::District, id, &body).await?))
}

/// Delete a district
#[utoipa::path(
    delete,
    path = "/api/v1/districts/{id}",
    params(("id" = Uuid, Path, description = "District ID")),
    responses(
        (status = 200, description = "District deleted", body = MessageResponse),
        (status = 400, description = "District still has thanas or post offices"),
        (status = 404, description = "District not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn delete_district(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(delete_unit(&state.db, UnitKind::District, id).await?))
}

// ─── Thanas ───────────────────────────────────────────────────────────────────

/// List thanas (upazilas), optionally of one district (`parent_id`)
#[utoipa::path(
    get,
    path = "/api/v1/thanas",
    params(ParentFilter),
    responses((status = 200, description = "Thanas", body = Vec<NamedUnit>)),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn list_thanas(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ParentFilter>,
) -> AppResult<Json<Vec<NamedUnit>>> {
    Ok(Json(list_units(&state.db, UnitKind::Thana, filter.parent_id).await?))
}

/// Create a thana; `parent_id` is the district
#[utoipa::path(
    post,
    path = "/api/v1/thanas",
    request_body = NamedUnitRequest,
    responses(
        (status = 201, description = "Thana created", body = NamedUnit),
        (status = 409, description = "Thana already exists in this district"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn create_thana(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<(StatusCode, Json<NamedUnit>)> {
    auth.require(HR_WRITERS)?;
    let unit = create_unit(&state.db, UnitKind::Thana, &body).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Update a thana
#[utoipa::path(
    put,
    path = "/api/v1/thanas/{id}",
    request_body = NamedUnitRequest,
    params(("id" = Uuid, Path, description = "Thana ID")),
    responses(
        (status = 200, description = "Thana updated", body = NamedUnit),
        (status = 404, description = "Thana not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn update_thana(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<Json<NamedUnit>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(update_unit(&state.db, UnitKind::Thana, id, &body).await?))
}

/// Delete a thana
#[utoipa::path(
    delete,
    path = "/api/v1/thanas/{id}",
    params(("id" = Uuid, Path, description = "Thana ID")),
    responses(
        (status = 200, description = "Thana deleted", body = MessageResponse),
        (status = 404, description = "Thana not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn delete_thana(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(delete_unit(&state.db, UnitKind::Thana, id).await?))
}

// ─── Post offices ─────────────────────────────────────────────────────────────

/// List post offices, optionally of one district (`parent_id`)
#[utoipa::path(
    get,
    path = "/api/v1/post-offices",
    params(ParentFilter),
    responses((status = 200, description = "Post offices", body = Vec<NamedUnit>)),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn list_post_offices(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ParentFilter>,
) -> AppResult<Json<Vec<NamedUnit>>> {
    Ok(Json(list_units(&state.db, UnitKind::PostOffice, filter.parent_id).await?))
}

/// Create a post office; `parent_id` is the district and `code` the postal code
#[utoipa::path(
    post,
    path = "/api/v1/post-offices",
    request_body = NamedUnitRequest,
    responses(
        (status = 201, description = "Post office created", body = NamedUnit),
        (status = 409, description = "Post office already exists in this district"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn create_post_office(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<(StatusCode, Json<NamedUnit>)> {
    auth.require(HR_WRITERS)?;
    let unit = create_unit(&state.db, UnitKind::PostOffice, &body).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Update a post office
#[utoipa::path(
    put,
    path = "/api/v1/post-offices/{id}",
    request_body = NamedUnitRequest,
    params(("id" = Uuid, Path, description = "Post office ID")),
    responses(
        (status = 200, description = "Post office updated", body = NamedUnit),
        (status = 404, description = "Post office not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn update_post_office(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<NamedUnitRequest>,
) -> AppResult<Json<NamedUnit>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(update_unit(&state.db, UnitKind::PostOffice, id, &body).await?))
}

/// Delete a post office
#[utoipa::path(
    delete,
    path = "/api/v1/post-offices/{id}",
    params(("id" = Uuid, Path, description = "Post office ID")),
    responses(
        (status = 200, description = "Post office deleted", body = MessageResponse),
        (status = 404, description = "Post office not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Geography"
)]
pub async fn delete_post_office(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.require(HR_WRITERS)?;
    Ok(Json(delete_unit(&state.db, UnitKind::PostOffice, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn unit(name: &str, parent_id: Option<Uuid>) -> NamedUnit {
        NamedUnit {
            id: Uuid::new_v4(),
            parent_id,
            name: name.to_string(),
            name_bangla: None,
            code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn chain() -> ResolvedAddress {
        let country = unit("Bangladesh", None);
        let division = unit("Dhaka", Some(country.id));
        let district = unit("Gazipur", Some(division.id));
        let thana = unit("Kaliakair", Some(district.id));
        let post_office = unit("Mouchak", Some(district.id));
        ResolvedAddress {
            country: Some(country),
            division: Some(division),
            district: Some(district),
            thana: Some(thana),
            post_office: Some(post_office),
            village: Some("Safipur".to_string()),
        }
    }

    #[test]
    fn consistent_chain_passes() {
        assert!(check_address_chain(&chain()).is_ok());
        assert!(check_address_chain(&ResolvedAddress::default()).is_ok());
    }

    #[test]
    fn missing_levels_are_not_checked() {
        let mut address = chain();
        address.division = None;
        assert!(check_address_chain(&address).is_ok());
    }

    #[test]
    fn thana_from_another_district_is_rejected() {
        let mut address = chain();
        address.thana = Some(unit("Savar", Some(Uuid::new_v4())));
        let err = check_address_chain(&address).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ref msg) if msg == "Thana 'Savar' is not in district 'Gazipur'"
        ));
    }
}
