// ============================
// sample-app-backend/src/routes.rs
// ============================
//! HTTP router: signup, profile, sign-in and sign-out.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use metrics::counter;
use sample_app_common::{SigninRequest, SignupRequest, UpdateUserRequest, UserId, UserView};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::auth::SessionManager;
use crate::error::AppError;
use crate::metrics as keys;
use crate::models::{User, UserChanges, UserForm};
use crate::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/users", post(signup))
        .route("/users/{id}", get(show_user).patch(update_user))
        .route("/sessions", post(signin).delete(signout))
        .route("/me", get(me))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "ok"
}

/// Resolve the signed-in user from the remember cookie, if any
async fn current_user(state: &AppState, jar: &CookieJar) -> Result<Option<User>, AppError> {
    let Some(token) = state.sessions.open_jar(jar) else {
        debug!("no usable remember cookie");
        return Ok(None);
    };

    state.users.find_by_remember_token(&token).await
}

async fn require_user(state: &AppState, jar: &CookieJar) -> Result<User, AppError> {
    current_user(state, jar)
        .await?
        .ok_or_else(|| AppError::Auth("sign in required".to_string()))
}

/// Response carrying the user view and a fresh remember cookie
fn signed_in(
    state: &AppState,
    jar: CookieJar,
    status: StatusCode,
    user: &User,
) -> Result<Response, AppError> {
    let cookie = state.sessions.remember_cookie(&user.remember_token)?;
    Ok((status, jar.add(cookie), Json(user.view())).into_response())
}

async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SignupRequest>,
) -> Result<Response, AppError> {
    let form = UserForm::from(request);
    let user = state.users.create(&form).await?;
    signed_in(&state, jar, StatusCode::CREATED, &user)
}

async fn show_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
) -> Result<Json<UserView>, AppError> {
    let user = state.users.find(id).await?;
    Ok(Json(user.view()))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<UserId>,
    jar: CookieJar,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserView>, AppError> {
    let me = require_user(&state, &jar).await?;
    if me.id != id {
        return Err(AppError::Forbidden(format!("user {} may not edit user {id}", me.id)));
    }

    let changes = UserChanges::from(request);
    let user = state.users.update(id, &changes).await?;
    Ok(Json(user.view()))
}

async fn signin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SigninRequest>,
) -> Result<Response, AppError> {
    let user = state
        .users
        .authenticate(&request.email, &request.password)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    info!(user_id = %user.id, "signed in");
    signed_in(&state, jar, StatusCode::OK, &user)
}

async fn signout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    if let Some(user) = current_user(&state, &jar).await? {
        state.users.rotate_remember_token(user.id).await?;
        counter!(keys::SIGNOUT).increment(1);
        info!(user_id = %user.id, "signed out");
    }

    Ok((StatusCode::NO_CONTENT, jar.add(SessionManager::expired_cookie())).into_response())
}

async fn me(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<UserView>, AppError> {
    let user = require_user(&state, &jar).await?;
    Ok(Json(user.view()))
}
