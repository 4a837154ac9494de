use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::mail;
use crate::state::AppState;

use super::dto::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, PublicUser, RefreshRequest,
    RegisterRequest, ResetPasswordRequest, StatusMessage,
};
use super::jwt::{AuthUser, JwtKeys};
use super::password::{hash_password, verify_password};
use super::repo::{AccountKey, KeyKind, User};
use super::services::is_valid_email;

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/activate/:key", get(activate))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Mail goes out in the background; registration must not wait on the relay.
fn send_in_background(state: &AppState, ctx: mail::MailContext, verb: &'static str) {
    let mailer = Arc::clone(&state.mailer);
    tokio::spawn(async move {
        let status = mail::deliver(mailer.as_ref(), &ctx, verb).await;
        info!(%status, "background mail");
    });
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }
    if let Ok(Some(_)) = User::find_by_email(&state.db, &payload.email).await {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(internal)?;
    let user = User::create(
        &state.db,
        &payload.email,
        &hash,
        payload.first_name.trim(),
        payload.last_name.trim(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "create user failed");
        internal(e)
    })?;

    let key = AccountKey::get_or_create(&state.db, KeyKind::Activation, user.id)
        .await
        .map_err(internal)?;
    let ctx = mail::messages::activation_mail(&state.config, &user, &key.key);
    send_in_background(&state, ctx, "activation");

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state))]
pub async fn activate(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<StatusMessage>, (StatusCode, String)> {
    let Some(record) = AccountKey::find_unused(&state.db, KeyKind::Activation, &key)
        .await
        .map_err(internal)?
    else {
        return Err((
            StatusCode::NOT_FOUND,
            "Invalid or used activation key".into(),
        ));
    };

    User::mark_verified(&state.db, record.user_id)
        .await
        .map_err(internal)?;
    AccountKey::mark_used(&state.db, KeyKind::Activation, record.id)
        .await
        .map_err(internal)?;

    info!(user_id = %record.user_id, "account activated");
    Ok(Json(StatusMessage::new("Account activated")))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(internal(e));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    if !user.is_verified {
        warn!(user_id = %user.id, "login before activation");
        return Err((StatusCode::BAD_REQUEST, "Account is not activated".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id).map_err(internal)?;
    let refresh_token = keys.sign_refresh(user.id).map_err(internal)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let access_token = keys.sign_access(user.id).map_err(internal)?;
    let refresh_token = keys.sign_refresh(user.id).map_err(internal)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<StatusMessage>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    // Same answer whether or not the account exists.
    if let Some(user) = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
    {
        let key = AccountKey::get_or_create(&state.db, KeyKind::ResetPassword, user.id)
            .await
            .map_err(internal)?;
        let ctx = mail::messages::forgot_password_mail(&state.config, &user, &key.key);
        send_in_background(&state, ctx, "forgot-password");
    }

    Ok(Json(StatusMessage::new(
        "If the account exists, a reset mail is on its way",
    )))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<StatusMessage>, (StatusCode, String)> {
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let Some(record) = AccountKey::find_unused(&state.db, KeyKind::ResetPassword, &payload.key)
        .await
        .map_err(internal)?
    else {
        return Err((StatusCode::NOT_FOUND, "Invalid or used reset key".into()));
    };

    let hash = hash_password(&payload.password).map_err(internal)?;
    User::set_password(&state.db, record.user_id, &hash)
        .await
        .map_err(internal)?;
    AccountKey::mark_used(&state.db, KeyKind::ResetPassword, record.id)
        .await
        .map_err(internal)?;

    info!(user_id = %record.user_id, "password reset");
    Ok(Json(StatusMessage::new("Password updated")))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(PublicUser::from(user)))
}
