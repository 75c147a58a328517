// Authentication extractors and authorization middleware

use axum::{
    async_trait,
    body::Body,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{error::AuthError, models::Role, token::TokenService};

/// Authenticated user extractor for protected routes
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Extracts the bearer token, `Ok(None)` when no Authorization header is sent
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;
    value
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or(AuthError::InvalidToken)
}

fn authenticate(tokens: &TokenService, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let claims = tokens.validate_access_token(token)?;
    Ok(AuthenticatedUser {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?.ok_or(AuthError::MissingToken)?;
        let tokens = Arc::<TokenService>::from_ref(state);
        authenticate(&tokens, token)
    }
}

/// Optional authentication for endpoints open to guests.
///
/// No Authorization header yields `MaybeUser(None)`; a header carrying an
/// invalid or expired token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(&parts.headers)? {
            None => Ok(MaybeUser(None)),
            Some(token) => {
                let tokens = Arc::<TokenService>::from_ref(state);
                authenticate(&tokens, token).map(|user| MaybeUser(Some(user)))
            }
        }
    }
}

/// Middleware admitting only ADMIN tokens to the wrapped routes
pub async fn require_admin(
    user: AuthenticatedUser,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let endpoint = request.uri().path().to_string();

    if !user.is_admin() {
        warn!(
            "Authorization failed: user_id={}, role={}, endpoint={}",
            user.user_id, user.role, endpoint
        );
        return Err(AuthError::InsufficientPermissions {
            required: Role::Admin,
            actual: user.role,
        });
    }

    debug!(
        "Authorization successful: user_id={}, role={}, endpoint={}",
        user.user_id, user.role, endpoint
    );
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TestState {
        tokens: Arc<TokenService>,
    }

    impl FromRef<TestState> for Arc<TokenService> {
        fn from_ref(state: &TestState) -> Self {
            state.tokens.clone()
        }
    }

    fn test_state() -> TestState {
        TestState {
            tokens: Arc::new(TokenService::new("test_secret_key_for_testing_purposes")),
        }
    }

    fn parts_with(auth_value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn test_valid_token_is_accepted() {
        let state = test_state();
        let token = state
            .tokens
            .generate_access_token(42, "test@example.com", Role::Customer)
            .unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {}", token)));

        let user = AuthenticatedUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();

        assert_eq!(user.user_id, 42);
        assert_eq!(user.email, "test@example.com");
        assert!(!user.is_admin());
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let mut parts = parts_with(None);
        let result = AuthenticatedUser::from_request_parts(&mut parts, &test_state()).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let mut parts = parts_with(Some("Basic dXNlcjpwYXNz"));
        let result = AuthenticatedUser::from_request_parts(&mut parts, &test_state()).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_maybe_user_allows_guests() {
        let mut parts = parts_with(None);
        let MaybeUser(user) = MaybeUser::from_request_parts(&mut parts, &test_state())
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_maybe_user_rejects_bad_token() {
        let mut parts = parts_with(Some("Bearer garbage"));
        let result = MaybeUser::from_request_parts(&mut parts, &test_state()).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_maybe_user_reads_admin_token() {
        let state = test_state();
        let token = state
            .tokens
            .generate_access_token(1, "admin@flowers.bg", Role::Admin)
            .unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {}", token)));

        let MaybeUser(user) = MaybeUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.unwrap().is_admin());
    }
}
