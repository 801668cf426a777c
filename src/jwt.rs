use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::app::AppState;
use crate::errors::AppError;
use crate::models::user::{UserKey, UserProfile};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, exp_hours: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_hours,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| AppError::configuration("JWT_SECRET not set"))?;
        let exp_hours = std::env::var("JWT_EXP_HOURS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(24))
            .map_err(|_| AppError::configuration("JWT_EXP_HOURS must be a valid integer"))?;

        Ok(Self {
            secret: Arc::new(secret.into_bytes()),
            exp_hours,
        })
    }

    /// Issues a token whose subject is the user key.
    pub fn encode(&self, user_key: &UserKey) -> Result<String, AppError> {
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let exp = now + Duration::hours(self.exp_hours);

        let claims = Claims {
            sub: user_key.as_str().to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::token(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::token(err.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    /// Stable user key.
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Caller identity taken from the bearer token. The key is not yet known
/// to exist; handlers resolve it through the policy engine.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_key: UserKey,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("Authorization header missing"))?;

        let claims = state.jwt.decode(token)?;

        Ok(AuthUser {
            user_key: UserKey::new(claims.sub),
        })
    }
}

/// Bearer identity resolved to a known user.
///
/// Rejects with "User does not exist." when the token's key is unknown.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let profile = state.policy.require_user_key(&auth.user_key).await?;
        Ok(CurrentUser(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_subject_round_trips_user_key() {
        let config = JwtConfig::new("test-secret", 1);
        let token = config.encode(&UserKey::from("8a7f3c0e")).unwrap();
        let claims = config.decode(&token).unwrap();
        assert_eq!(claims.sub, "8a7f3c0e");
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = JwtConfig::new("secret-a", 1);
        let verifier = JwtConfig::new("secret-b", 1);
        let token = issuer.encode(&UserKey::from("k1")).unwrap();
        assert!(matches!(verifier.decode(&token), Err(AppError::Token(_))));
    }
}
