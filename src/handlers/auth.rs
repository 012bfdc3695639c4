use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::ValidatedJson,
    models::{
        ApiResponse, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
        RefreshRequest, RefreshResponse, ResetPasswordRequest, UserProfile, message, ok,
    },
    services::auth as service,
};

/// login
///
/// [Public Route] Exchanges email and password for an access/refresh token pair.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials or deactivated account"),
        (status = 422, description = "Malformed credentials"),
        (status = 429, description = "Too many failed logins from this client")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let session = service::login(state.repo.as_ref(), &state.config, payload).await?;
    Ok(ok(session))
}

/// refresh
///
/// [Public Route] Issues a fresh access token from a valid refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Invalid refresh token")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let tokens = service::refresh(state.repo.as_ref(), &state.config, payload).await?;
    Ok(ok(tokens))
}

/// me
///
/// [Authenticated Route] Profile of the caller, role included.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses((status = 200, description = "Current user", body = UserProfile))
)]
pub async fn me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = service::me(state.repo.as_ref(), &user).await?;
    Ok(ok(profile))
}

/// logout
///
/// [Authenticated Route] Tokens are stateless; this only records the event.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(("bearer" = [])),
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(user: AuthUser) -> Json<MessageResponse> {
    service::logout(&user);
    message("Logged out successfully")
}

/// forgot_password
///
/// [Public Route] Starts a password reset. The answer never reveals whether the
/// account exists.
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset requested", body = MessageResponse),
        (status = 429, description = "Too many reset requests from this client")
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let text = service::forgot_password(
        state.repo.as_ref(),
        state.mailer.as_ref(),
        &state.config,
        payload,
    )
    .await?;
    Ok(message(text))
}

/// reset_password
///
/// [Public Route] Sets a new password using the emailed reset token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Invalid or expired token"),
        (status = 422, description = "Password too weak")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    service::reset_password(state.repo.as_ref(), &state.config, payload).await?;
    Ok(message("Password has been reset successfully"))
}
