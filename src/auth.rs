use crate::{
    errors::AppError,
    models::{Claims, UserRole},
    state::AppState,
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

/// Roles allowed to change HR, payroll and production data
pub const HR_WRITERS: &[UserRole] = &[UserRole::Admin, UserRole::Hr];
/// Roles allowed to post to the cashbook
pub const CASH_WRITERS: &[UserRole] = &[UserRole::Admin, UserRole::Accounts];
pub const ADMINS: &[UserRole] = &[UserRole::Admin];

/// Authenticated user extractor.
/// Add `auth: AuthUser` as a parameter in any handler that requires authentication.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn require(&self, roles: &[UserRole]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "User '{}' is not allowed to perform this action",
                self.username
            )))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, &state.config.jwt_secret)
    }
}

/// Resolves the bearer token in `headers` to the user it was issued for
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthUser, AppError> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))?;

    let claims = decode_token(token, secret)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    Ok(AuthUser {
        id: user_id,
        username: claims.username,
        role: claims.role,
    })
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

pub fn generate_token(
    user_id: Uuid,
    username: &str,
    role: UserRole,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + chrono::Duration::hours(expiry_hours)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_claims() {
        let id = Uuid::new_v4();
        let token = generate_token(id, "hr.manager", UserRole::Hr, "secret", 1).unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.username, "hr.manager");
        assert_eq!(claims.role, UserRole::Hr);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = generate_token(Uuid::new_v4(), "admin", UserRole::Admin, "one", 1).unwrap();
        assert!(matches!(
            decode_token(&token, "two"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_header_is_required() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            authenticate(&headers, "secret"),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert("Authorization", "Token abc".parse().unwrap());
        assert!(matches!(
            authenticate(&headers, "secret"),
            Err(AppError::Unauthorized(_))
        ));

        let token = generate_token(Uuid::new_v4(), "admin", UserRole::Admin, "secret", 1).unwrap();
        headers.insert("Authorization", format!("Bearer {token}").parse().unwrap());
        let user = authenticate(&headers, "secret").unwrap();
        assert_eq!(user.role, UserRole::Admin);
    }

    #[test]
    fn role_gate() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            username: "cashier".to_string(),
            role: UserRole::Accounts,
        };
        assert!(user.require(CASH_WRITERS).is_ok());
        assert!(matches!(user.require(HR_WRITERS), Err(AppError::Forbidden(_))));
        assert!(user.require(ADMINS).is_err());
    }
}
