use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use carshare_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Numeric user id
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Manager => "MANAGER",
        }
    }

    fn from_claim(role: &str) -> Option<Self> {
        match role {
            "CUSTOMER" => Some(Role::Customer),
            "MANAGER" => Some(Role::Manager),
            _ => None,
        }
    }
}

/// Authenticated caller, injected into request extensions
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthenticationError("Invalid token subject".to_string()))?;
        let role = Role::from_claim(&claims.role)
            .ok_or_else(|| AppError::AuthorizationError(format!("Unknown role: {}", claims.role)))?;

        Ok(CurrentUser {
            id,
            email: claims.email,
            role,
        })
    }
}

fn authenticate(state: &AppState, req: &Request) -> Result<CurrentUser, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Invalid or expired token".to_string()))?;

    CurrentUser::try_from(token_data.claims)
}

async fn require(
    state: &AppState,
    mut req: Request,
    next: Next,
    role: Option<Role>,
) -> Result<Response, AppError> {
    let user = authenticate(state, &req)?;

    if let Some(required) = role {
        if user.role != required {
            return Err(AppError::AuthorizationError(format!(
                "Access restricted to {} role",
                required.as_str()
            )));
        }
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

// ============================================================================
// Middlewares
// ============================================================================

/// Any valid token
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    require(&state, req, next, None).await
}

pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    require(&state, req, next, Some(Role::Customer)).await
}

pub async fn manager_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    require(&state, req, next, Some(Role::Manager)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: "alice@example.com".to_string(),
            role: role.to_string(),
            exp: 0,
        }
    }

    #[test]
    fn test_claims_to_current_user() {
        let user = CurrentUser::try_from(claims("42", "MANAGER")).unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.role, Role::Manager);

        assert!(matches!(
            CurrentUser::try_from(claims("alice", "CUSTOMER")),
            Err(AppError::AuthenticationError(_))
        ));
        assert!(matches!(
            CurrentUser::try_from(claims("42", "ADMIN")),
            Err(AppError::AuthorizationError(_))
        ));
    }
}
