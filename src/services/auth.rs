use chrono::{Duration, Utc};

use crate::{
    auth::AuthUser,
    config::AppConfig,
    crypto::{self, RESET_TOKEN_TTL_SECS},
    error::{ApiError, FieldError},
    mailer::{Mailer, password_reset_mail},
    models::{
        ForgotPasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
        ResetPasswordRequest, SessionUser, UserProfile,
    },
    repository::Repository,
};

/// Returned by `forgot_password` whether or not the account exists.
pub const RESET_REQUESTED: &str =
    "If an account with that email exists, a password reset link has been sent.";

/// login
///
/// Verifies credentials, stamps `last_login_at` and issues an access/refresh pair.
/// Unknown emails and wrong passwords share one message.
pub async fn login(
    repo: &dyn Repository,
    config: &AppConfig,
    req: LoginRequest,
) -> Result<LoginResponse, ApiError> {
    let user = repo
        .find_user_by_email(req.email.trim())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized("Your account has been deactivated"));
    }

    let valid =
        crypto::verify_password_blocking(req.password, user.password_hash.clone()).await?;
    if !valid {
        tracing::info!(user_id = user.id, "login rejected: wrong password");
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let role = repo
        .find_role(user.role_id)
        .await?
        .ok_or_else(|| ApiError::internal(format!("user {} has no role row", user.id)))?;

    repo.touch_last_login(user.id).await?;

    let access_token = crypto::issue_access_token(config, user.id, &user.email, &role.slug)?;
    let refresh_token = crypto::issue_refresh_token(config, user.id)?;

    tracing::info!(user_id = user.id, role = %role.slug, "user logged in");

    Ok(LoginResponse {
        access_token,
        refresh_token,
        user: SessionUser {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: role.slug,
        },
    })
}

/// refresh
///
/// Exchanges a refresh token for a new access token. Every failure, including an
/// account deactivated since the token was issued, reads as `Invalid refresh token`.
pub async fn refresh(
    repo: &dyn Repository,
    config: &AppConfig,
    req: RefreshRequest,
) -> Result<RefreshResponse, ApiError> {
    let invalid = || ApiError::unauthorized("Invalid refresh token");

    let claims = crypto::verify_refresh_token(config, &req.refresh_token).map_err(|err| {
        tracing::debug!(code = err.code(), "refresh token rejected");
        invalid()
    })?;

    let user = repo
        .find_user(claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;
    let role = repo.find_role(user.role_id).await?.ok_or_else(invalid)?;

    let access_token = crypto::issue_access_token(config, user.id, &user.email, &role.slug)?;
    Ok(RefreshResponse { access_token })
}

/// me
///
/// Profile of the authenticated caller.
pub async fn me(repo: &dyn Repository, principal: &AuthUser) -> Result<UserProfile, ApiError> {
    let user = repo
        .find_user(principal.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let role = repo
        .find_role(user.role_id)
        .await?
        .ok_or_else(|| ApiError::internal(format!("user {} has no role row", user.id)))?;
    Ok(UserProfile::new(&user, &role))
}

/// Tokens are stateless; logging out only leaves an audit line.
pub fn logout(principal: &AuthUser) {
    tracing::info!(user_id = principal.id, email = %principal.email, "user logged out");
}

/// forgot_password
///
/// Stores a fresh reset token (valid one hour) on an active account and hands the
/// reset link to the mailer. The caller cannot tell whether the account exists.
pub async fn forgot_password(
    repo: &dyn Repository,
    mailer: &dyn Mailer,
    config: &AppConfig,
    req: ForgotPasswordRequest,
) -> Result<&'static str, ApiError> {
    let Some(user) = repo.find_user_by_email(req.email.trim()).await? else {
        tracing::debug!("password reset requested for unknown email");
        return Ok(RESET_REQUESTED);
    };
    if !user.is_active {
        tracing::debug!(user_id = user.id, "password reset requested for inactive account");
        return Ok(RESET_REQUESTED);
    }

    let token = crypto::generate_reset_token();
    let expires_at = Utc::now() + Duration::seconds(RESET_TOKEN_TTL_SECS);
    repo.set_reset_token(user.id, Some(&token), Some(expires_at)).await?;

    let mail = password_reset_mail(&config.mail_from, &user.email, &config.frontend_url, &token);
    mailer.send(mail).await?;

    tracing::info!(user_id = user.id, "password reset token issued");
    Ok(RESET_REQUESTED)
}

/// reset_password
///
/// Applies the strength policy, then swaps the password for the holder of a live
/// reset token and burns the token.
pub async fn reset_password(
    repo: &dyn Repository,
    config: &AppConfig,
    req: ResetPasswordRequest,
) -> Result<(), ApiError> {
    let weaknesses = crypto::password_strength_errors(&req.new_password);
    if !weaknesses.is_empty() {
        return Err(ApiError::validation(
            weaknesses
                .into_iter()
                .map(|message| FieldError::new("newPassword", message))
                .collect(),
        ));
    }

    let user = repo
        .find_user_by_reset_token(&req.token)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid or expired reset token"))?;

    let live = user
        .reset_token_expires_at
        .is_some_and(|expires_at| expires_at > Utc::now());
    if !live {
        return Err(ApiError::bad_request("Reset token has expired"));
    }

    let password_hash =
        crypto::hash_password_blocking(req.new_password, config.bcrypt_cost).await?;
    repo.set_password(user.id, &password_hash).await?;

    tracing::info!(user_id = user.id, "password reset completed");
    Ok(())
}
