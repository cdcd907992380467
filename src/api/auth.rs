use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{request::Parts, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use tracing::{error, info};

use crate::catalog::{error_response, ActingUser};
use crate::db::{AccessToken, DbError, User};
use crate::server::AppState;
use crate::util::generate_id;
use super::extract::JsonBody;
use super::types::*;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or invalid access token")]
    Unauthorized,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username and password are required")]
    MissingCredentials,
    #[error("User already exists: {0}")]
    UserExists(String),
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
            AuthError::UserExists(_) => StatusCode::CONFLICT,
            AuthError::Hash(_) | AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }
        error_response(status, self.to_string())
    }
}

/// The authenticated caller, resolved from the request's access token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub ActingUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers, &parts.uri).ok_or(AuthError::Unauthorized)?;

        let token = state.db.get_token(&token).await.map_err(unauthorized)?;
        let user = state
            .db
            .get_user_by_id(&token.userid)
            .await
            .map_err(unauthorized)?;

        Ok(CurrentUser(user.into()))
    }
}

fn unauthorized(e: DbError) -> AuthError {
    match e {
        DbError::NotFound(_) => AuthError::Unauthorized,
        e => AuthError::Database(e),
    }
}

fn extract_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(token) = headers
        .get("X-Access-Token")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
    {
        return Some(token);
    }

    Query::<HashMap<String, String>>::try_from_uri(uri)
        .ok()
        .and_then(|Query(params)| params.get("api_key").cloned())
}

// bcrypt is CPU-bound; run it on the blocking pool.
async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
        .map_err(|e| AuthError::Hash(e.to_string()))
}

async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))
}

async fn issue_token(state: &AppState, user: User) -> Result<Json<AuthenticationResult>, AuthError> {
    let token = AccessToken {
        token: uuid::Uuid::new_v4().to_string(),
        userid: user.id.clone(),
        created: Some(chrono::Utc::now()),
    };

    state.db.insert_token(&token).await?;

    Ok(Json(AuthenticationResult {
        user: user.into(),
        access_token: token.token,
    }))
}

async fn create_user(state: &AppState, username: &str, password: String) -> Result<User, AuthError> {
    let user = User {
        id: generate_id(),
        username: username.to_string(),
        password: hash_password(password).await?,
        created: Some(chrono::Utc::now().to_rfc3339()),
    };

    state.db.insert_user(&user).await.map_err(|e| match e {
        DbError::AlreadyExists(_) => AuthError::UserExists(user.username.clone()),
        e => AuthError::Database(e),
    })?;

    info!(user = %user.username, "user registered");
    Ok(user)
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<Credentials>,
) -> Result<Json<AuthenticationResult>, AuthError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let user = create_user(&state, username, req.password.clone()).await?;
    issue_token(&state, user).await
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<Credentials>,
) -> Result<Json<AuthenticationResult>, AuthError> {
    let username = req.username.trim();

    let user = match state.db.get_user(username).await {
        Ok(user) => {
            if !verify_password(req.password.clone(), user.password.clone()).await? {
                return Err(AuthError::InvalidCredentials);
            }
            user
        }
        Err(DbError::NotFound(_)) if state.config.auth.autoregister && !username.is_empty() => {
            create_user(&state, username, req.password.clone()).await?
        }
        Err(DbError::NotFound(_)) => return Err(AuthError::InvalidCredentials),
        Err(e) => return Err(AuthError::Database(e)),
    };

    issue_token(&state, user).await
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<StatusCode, AuthError> {
    let token = extract_token(&headers, &uri).ok_or(AuthError::Unauthorized)?;
    state.db.delete_token(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
