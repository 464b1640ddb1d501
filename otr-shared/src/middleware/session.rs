use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::errors::{AppError, AppResult, ErrorCode};
use crate::types::auth::{AdminSession, Claims, Scope, SessionUser};

/// Secret and cookie name used to resolve sessions from a request.
#[derive(Debug, Clone)]
pub struct SessionKeys {
    secret: String,
    cookie_name: String,
}

impl SessionKeys {
    pub fn new(secret: impl Into<String>, cookie_name: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: cookie_name.into(),
        }
    }

    /// Signs `claims` into a session token.
    pub fn issue(&self, claims: &Claims) -> AppResult<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("failed to sign session token: {e}")))
    }

    /// Resolves the caller from the session cookie, falling back to a bearer
    /// token. Anything unreadable resolves to no session.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<SessionUser> {
        let token = session_cookie(headers, &self.cookie_name).or_else(|| bearer_token(headers))?;

        match self.validate(&token) {
            Ok(claims) => Some(SessionUser::from(claims)),
            Err(e) => {
                tracing::debug!(error = %e, "discarding unusable session token");
                None
            }
        }
    }

    fn validate(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::SessionExpired, "session has expired")
            }
            _ => AppError::new(ErrorCode::SessionInvalid, format!("invalid session: {e}")),
        })?;

        if token_data.claims.is_expired() {
            return Err(AppError::new(ErrorCode::SessionExpired, "session has expired"));
        }

        Ok(token_data.claims)
    }
}

/// Implemented by service state so handlers can extract a [`SessionContext`].
pub trait SessionState {
    fn session_keys(&self) -> &SessionKeys;
}

impl<T: SessionState> SessionState for std::sync::Arc<T> {
    fn session_keys(&self) -> &SessionKeys {
        (**self).session_keys()
    }
}

fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

/// Request-scoped session context. Empty when the caller presented no usable
/// session; extraction itself never fails.
#[derive(Debug, Clone, Default)]
pub struct SessionContext(pub Option<SessionUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: SessionState + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(state.session_keys().resolve(&parts.headers)))
    }
}

/// Sole authorization gate for admin procedures.
pub fn ensure_admin_session(context: &SessionContext) -> AppResult<AdminSession> {
    let user = context
        .0
        .as_ref()
        .ok_or_else(|| AppError::forbidden("admin session required"))?;

    if !user.has_scope(Scope::Admin) {
        tracing::warn!(user_id = user.id, "non-admin session rejected");
        return Err(AppError::forbidden("admin access required"));
    }

    Ok(AdminSession {
        admin_user_id: user.id,
    })
}
