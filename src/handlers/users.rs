// src/handlers/users.rs

use crate::{
    auth::{ADMINS, AuthUser, authenticate, generate_token},
    errors::{AppError, AppResult},
    models::{AuthResponse, LoginRequest, RegisterUserRequest, User, UserPublic, UserRole},
    state::AppState,
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use bcrypt::{DEFAULT_COST, hash, verify};
use tracing::info;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

/// The first user becomes an admin; later registrations need an admin token.
fn registration_role(
    user_count: i64,
    headers: &HeaderMap,
    secret: &str,
    requested: Option<UserRole>,
) -> AppResult<UserRole> {
    if user_count == 0 {
        return Ok(UserRole::Admin);
    }
    authenticate(headers, secret)?.require(ADMINS)?;
    Ok(requested.unwrap_or(UserRole::Hr))
}

/// Register an application user.
/// The first user needs no token and becomes an admin; afterwards only admins may register users.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid username or password"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only admins may register users"),
        (status = 409, description = "Username already taken"),
    ),
    security((), ("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn register_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let username = body.username.trim().to_lowercase();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash =
        hash(&body.password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    // Concurrent registrations wait here so only one of them can see an empty table
    let mut tx = state.db.begin().await?;
    sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *tx)
        .await?;

    let user_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *tx)
        .await?;
    let role = registration_role(user_count, &headers, &state.config.jwt_secret, body.role)?;

    let user = sqlx::query_as::<_, User>(
        r#"INSERT INTO users (id, username, full_name, password_hash, role, is_active, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, true, NOW(), NOW())
           RETURNING *"#,
    )
    .bind(Uuid::new_v4())
    .bind(&username)
    .bind(body.full_name.trim())
    .bind(password_hash)
    .bind(role)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Registered user '{}' as {:?}", user.username, user.role);

    let token = generate_token(
        user.id,
        &user.username,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(body.username.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    let valid = verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let token = generate_token(
        user.id,
        &user.username,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// Current user profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "User profile", body = UserPublic),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserPublic>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "registration-secret";

    fn headers_for(role: UserRole) -> HeaderMap {
        let token = generate_token(Uuid::new_v4(), "someone", role, SECRET, 1).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", format!("Bearer {token}").parse().unwrap());
        headers
    }

    #[test]
    fn first_user_is_always_an_admin() {
        let role = registration_role(0, &HeaderMap::new(), SECRET, Some(UserRole::Hr)).unwrap();
        assert_eq!(role, UserRole::Admin);
    }

    #[test]
    fn later_users_need_an_admin_token() {
        let anonymous = registration_role(1, &HeaderMap::new(), SECRET, None);
        assert!(matches!(anonymous, Err(AppError::Unauthorized(_))));

        let hr = registration_role(1, &headers_for(UserRole::Hr), SECRET, None);
        assert!(matches!(hr, Err(AppError::Forbidden(_))));

        let admin = headers_for(UserRole::Admin);
        assert_eq!(registration_role(3, &admin, SECRET, None).unwrap(), UserRole::Hr);
        assert_eq!(
            registration_role(3, &admin, SECRET, Some(UserRole::Admin)).unwrap(),
            UserRole::Admin
        );
    }
}
