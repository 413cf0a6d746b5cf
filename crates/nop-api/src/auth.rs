use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};

use nop_db::models::{NewUser, User};
use nop_db::{RequestContext, SessionManager};
use nop_types::api::{AccessTokenResponse, AuthRequest, Claims, Data};

use crate::context::with_session;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::validation::Fields;

const TOKEN_TTL_DAYS: i64 = 3;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub sessions: SessionManager,
    pub jwt_secret: String,
}

/// OAuth providers a client may sign in through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Facebook,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Self::Google, Self::Facebook];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|p| p.as_str() == s).ok_or_else(|| {
            ApiError::BadRequest(format!("Provider must be one of: {}", provider_names()))
        })
    }
}

fn provider_names() -> String {
    Provider::ALL.map(Provider::as_str).join(", ")
}

/// Sign in with an OAuth profile. The user row is created on first login.
pub async fn login(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<AuthRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let provider: Provider = provider.parse()?;

    let mut fields = Fields::new();
    fields.text("id", &req.id, 256);
    fields.text("name", &req.name, 64);
    fields.url("thumbnailUrl", &req.thumbnail_url);
    fields.finish()?;

    let user = with_session(&state, &ctx, move |session| {
        if let Some(user) = User::get_by_id(session, &req.id)? {
            return Ok(user);
        }

        let new_user = NewUser {
            id: req.id.clone(),
            provider: provider.as_str().to_string(),
            thumbnail_url: req.thumbnail_url,
            name: req.name,
        };
        match session.save(new_user) {
            Ok(user) => {
                info!("Created {} user {}", provider, user.id);
                Ok(user)
            }
            // A concurrent first login for the same id won the insert.
            Err(e) if e.is_constraint() => User::get_by_id(session, &req.id)?
                .ok_or_else(|| ApiError::Conflict("user creation raced".into())),
            Err(e) => Err(e.into()),
        }
    })
    .await?;

    let token = create_token(&state.jwt_secret, &user.id).map_err(|e| {
        error!("Failed to sign access token: {}", e);
        ApiError::Internal
    })?;

    Ok((
        StatusCode::CREATED,
        Json(Data::new(AccessTokenResponse {
            access_token: token,
        })),
    ))
}

pub fn create_token(secret: &str, user_id: &str) -> jsonwebtoken::errors::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn providers_parse() {
        assert_eq!("google".parse::<Provider>().unwrap(), Provider::Google);
        assert_eq!("facebook".parse::<Provider>().unwrap(), Provider::Facebook);

        let err = "twitter".parse::<Provider>().unwrap_err();
        assert_eq!(err.to_string(), "Provider must be one of: google, facebook");
    }

    #[test]
    fn token_carries_user_id_and_expiry() {
        let token = create_token("test-secret", "108234").unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.sub, "108234");
        let ttl = data.claims.exp as i64 - chrono::Utc::now().timestamp();
        assert!(ttl > 2 * 86_400 && ttl <= 3 * 86_400);
    }
}
