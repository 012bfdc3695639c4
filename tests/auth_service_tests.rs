mod common;

use chrono::{Duration, Utc};
use common::{PASSWORD, TestContext};
use morphe_cms::{
    auth::AuthUser,
    models::{CreateUserRequest, LoginRequest, UpdateUserRequest, UserFilter},
    permissions::{EDITOR, SUPER_ADMIN, VIEWER},
    repository::Repository,
    services::{
        auth::{self, RESET_REQUESTED},
        users,
    },
};
use serde_json::json;

fn login_request(email: &str, password: &str) -> LoginRequest {
    serde_json::from_value(json!({ "email": email, "password": password })).unwrap()
}

async fn admin(ctx: &TestContext) -> AuthUser {
    ctx.principal(SUPER_ADMIN, "admin@morphelabs.com").await
}

// --- Login / refresh ---

#[tokio::test]
async fn test_login_issues_token_pair_and_stamps_last_login() {
    let ctx = TestContext::new();
    let admin = admin(&ctx).await;

    let response = auth::login(
        ctx.repo.as_ref(),
        &ctx.config,
        login_request("admin@morphelabs.com", PASSWORD),
    )
    .await
    .unwrap();

    assert_eq!(response.user.id, admin.id);
    assert_eq!(response.user.role, SUPER_ADMIN);
    assert_ne!(response.access_token, response.refresh_token);
    assert!(ctx.repo.user_row(admin.id).unwrap().last_login_at.is_some());

    let body = serde_json::to_value(&response).unwrap();
    assert!(body.get("accessToken").is_some());
    assert_eq!(body["user"]["fullName"], "Super Admin User");
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let ctx = TestContext::new();
    admin(&ctx).await;

    let wrong_password = auth::login(
        ctx.repo.as_ref(),
        &ctx.config,
        login_request("admin@morphelabs.com", "Wr0ng!Pass"),
    )
    .await
    .unwrap_err();
    let unknown = auth::login(
        ctx.repo.as_ref(),
        &ctx.config,
        login_request("nobody@morphelabs.com", PASSWORD),
    )
    .await
    .unwrap_err();

    assert_eq!(wrong_password.code(), "UNAUTHORIZED");
    assert_eq!(wrong_password.to_string(), unknown.to_string());
    assert_eq!(unknown.to_string(), "Invalid email or password");
}

#[tokio::test]
async fn test_deactivated_accounts_cannot_log_in() {
    let ctx = TestContext::new();
    let admin = admin(&ctx).await;
    let mut row = ctx.repo.user_row(admin.id).unwrap();
    row.is_active = false;
    ctx.repo.save_user(&row).await.unwrap();

    let err = auth::login(
        ctx.repo.as_ref(),
        &ctx.config,
        login_request("admin@morphelabs.com", PASSWORD),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Your account has been deactivated");
}

#[tokio::test]
async fn test_refresh_exchanges_refresh_token_only() {
    let ctx = TestContext::new();
    admin(&ctx).await;
    let session = auth::login(
        ctx.repo.as_ref(),
        &ctx.config,
        login_request("admin@morphelabs.com", PASSWORD),
    )
    .await
    .unwrap();

    let refreshed = auth::refresh(
        ctx.repo.as_ref(),
        &ctx.config,
        serde_json::from_value(json!({ "refreshToken": session.refresh_token })).unwrap(),
    )
    .await
    .unwrap();
    assert!(!refreshed.access_token.is_empty());

    let err = auth::refresh(
        ctx.repo.as_ref(),
        &ctx.config,
        serde_json::from_value(json!({ "refreshToken": session.access_token })).unwrap(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid refresh token");
}

// --- Password reset ---

#[tokio::test]
async fn test_forgot_password_mails_link_for_known_accounts_only() {
    let ctx = TestContext::new();
    let admin = admin(&ctx).await;

    let unknown = auth::forgot_password(
        ctx.repo.as_ref(),
        &ctx.mailer,
        &ctx.config,
        serde_json::from_value(json!({ "email": "ghost@morphelabs.com" })).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(unknown, RESET_REQUESTED);
    assert!(ctx.mailer.sent().is_empty());

    let known = auth::forgot_password(
        ctx.repo.as_ref(),
        &ctx.mailer,
        &ctx.config,
        serde_json::from_value(json!({ "email": "admin@morphelabs.com" })).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(known, RESET_REQUESTED);

    let row = ctx.repo.user_row(admin.id).unwrap();
    let token = row.reset_token.expect("token stored");
    assert_eq!(token.len(), 64);
    assert!(row.reset_token_expires_at.unwrap() > Utc::now());

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "admin@morphelabs.com");
    assert!(sent[0].body.contains(&format!("/reset-password?token={token}")));
}

#[tokio::test]
async fn test_reset_password_swaps_hash_and_burns_token() {
    let ctx = TestContext::new();
    let admin = admin(&ctx).await;
    auth::forgot_password(
        ctx.repo.as_ref(),
        &ctx.mailer,
        &ctx.config,
        serde_json::from_value(json!({ "email": "admin@morphelabs.com" })).unwrap(),
    )
    .await
    .unwrap();
    let token = ctx.repo.user_row(admin.id).unwrap().reset_token.unwrap();

    let weak = auth::reset_password(
        ctx.repo.as_ref(),
        &ctx.config,
        serde_json::from_value(json!({ "token": token, "newPassword": "short" })).unwrap(),
    )
    .await
    .unwrap_err();
    assert_eq!(weak.code(), "VALIDATION_ERROR");

    auth::reset_password(
        ctx.repo.as_ref(),
        &ctx.config,
        serde_json::from_value(json!({ "token": token, "newPassword": "N3w!Passw0rd" })).unwrap(),
    )
    .await
    .unwrap();

    let row = ctx.repo.user_row(admin.id).unwrap();
    assert!(row.reset_token.is_none());
    assert!(row.reset_token_expires_at.is_none());

    auth::login(
        ctx.repo.as_ref(),
        &ctx.config,
        login_request("admin@morphelabs.com", "N3w!Passw0rd"),
    )
    .await
    .unwrap();

    let reused = auth::reset_password(
        ctx.repo.as_ref(),
        &ctx.config,
        serde_json::from_value(json!({ "token": token, "newPassword": "An0ther!Pass" })).unwrap(),
    )
    .await
    .unwrap_err();
    assert_eq!(reused.to_string(), "Invalid or expired reset token");
}

#[tokio::test]
async fn test_expired_reset_token_is_rejected() {
    let ctx = TestContext::new();
    let admin = admin(&ctx).await;
    let mut row = ctx.repo.user_row(admin.id).unwrap();
    row.reset_token = Some("a".repeat(64));
    row.reset_token_expires_at = Some(Utc::now() - Duration::minutes(1));
    ctx.repo.save_user(&row).await.unwrap();

    let err = auth::reset_password(
        ctx.repo.as_ref(),
        &ctx.config,
        serde_json::from_value(json!({ "token": "a".repeat(64), "newPassword": "N3w!Passw0rd" }))
            .unwrap(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Reset token has expired");
}

// --- User administration ---

fn create_request(email: &str, role_id: i32) -> CreateUserRequest {
    serde_json::from_value(json!({
        "email": email,
        "password": PASSWORD,
        "fullName": "Jane Doe",
        "roleId": role_id,
    }))
    .unwrap()
}

#[tokio::test]
async fn test_create_user_normalizes_email_and_rejects_duplicates() {
    let ctx = TestContext::new();
    let editor_role = ctx.repo.find_role_by_slug(EDITOR).await.unwrap().unwrap();

    let profile = users::create(
        ctx.repo.as_ref(),
        &ctx.mailer,
        &ctx.config,
        create_request("  Jane@MorpheLabs.com ", editor_role.id),
    )
    .await
    .unwrap();
    assert_eq!(profile.email, "jane@morphelabs.com");
    assert_eq!(profile.role.slug, EDITOR);
    assert!(profile.is_active);

    let err = users::create(
        ctx.repo.as_ref(),
        &ctx.mailer,
        &ctx.config,
        create_request("jane@morphelabs.com", editor_role.id),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");

    let err = users::create(
        ctx.repo.as_ref(),
        &ctx.mailer,
        &ctx.config,
        create_request("john@morphelabs.com", 99),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Invalid role ID");
}

#[tokio::test]
async fn test_update_and_delete_user() {
    let ctx = TestContext::new();
    let admin = admin(&ctx).await;
    let viewer = ctx.principal(VIEWER, "viewer@morphelabs.com").await;
    let editor_role = ctx.repo.find_role_by_slug(EDITOR).await.unwrap().unwrap();

    let profile = users::update(
        ctx.repo.as_ref(),
        &ctx.config,
        viewer.id,
        UpdateUserRequest {
            role_id: Some(editor_role.id),
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(profile.role.slug, EDITOR);
    assert!(!profile.is_active);

    users::delete(ctx.repo.as_ref(), &admin, viewer.id).await.unwrap();
    assert!(ctx.repo.user_row(viewer.id).unwrap().deleted_at.is_some());
    let err = users::get(ctx.repo.as_ref(), viewer.id).await.unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");

    // The address of a deleted account stays reserved.
    let err = users::create(
        ctx.repo.as_ref(),
        &ctx.mailer,
        &ctx.config,
        create_request("viewer@morphelabs.com", editor_role.id),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
}

#[tokio::test]
async fn test_create_user_sends_welcome_mail() {
    let ctx = TestContext::new();
    let editor_role = ctx.repo.find_role_by_slug(EDITOR).await.unwrap().unwrap();

    users::create(
        ctx.repo.as_ref(),
        &ctx.mailer,
        &ctx.config,
        create_request("jane@morphelabs.com", editor_role.id),
    )
    .await
    .unwrap();

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@morphelabs.com");
    assert_eq!(sent[0].from, ctx.config.mail_from);
    assert_eq!(sent[0].subject, "Welcome to Morphe Labs CMS");
    assert!(sent[0].body.contains("Jane Doe"));
}

#[tokio::test]
async fn test_admin_cannot_delete_own_account() {
    let ctx = TestContext::new();
    let admin = admin(&ctx).await;

    let err = users::delete(ctx.repo.as_ref(), &admin, admin.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "BAD_REQUEST");
    assert_eq!(err.to_string(), "You cannot delete your own account");
    assert!(ctx.repo.user_row(admin.id).unwrap().deleted_at.is_none());
}

#[tokio::test]
async fn test_login_stamp_keeps_concurrent_admin_changes() {
    let ctx = TestContext::new();
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let viewer_role = ctx.repo.find_role_by_slug(VIEWER).await.unwrap().unwrap();

    // A login that read the row before the admin edit lands after it.
    let stale = ctx.repo.find_user(editor.id).await.unwrap().unwrap();
    assert!(stale.is_active);

    users::update(
        ctx.repo.as_ref(),
        &ctx.config,
        editor.id,
        UpdateUserRequest {
            role_id: Some(viewer_role.id),
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    ctx.repo.touch_last_login(stale.id).await.unwrap();

    let row = ctx.repo.user_row(editor.id).unwrap();
    assert!(!row.is_active);
    assert_eq!(row.role_id, viewer_role.id);
    assert!(row.last_login_at.is_some());
}

#[tokio::test]
async fn test_reset_token_write_keeps_concurrent_admin_changes() {
    let ctx = TestContext::new();
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;

    auth::forgot_password(
        ctx.repo.as_ref(),
        &ctx.mailer,
        &ctx.config,
        serde_json::from_value(json!({ "email": "editor@morphelabs.com" })).unwrap(),
    )
    .await
    .unwrap();
    users::update(
        ctx.repo.as_ref(),
        &ctx.config,
        editor.id,
        UpdateUserRequest {
            full_name: Some("Renamed Editor".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let expires_at = Utc::now() + Duration::minutes(5);
    ctx.repo
        .set_reset_token(editor.id, Some("fresh-token"), Some(expires_at))
        .await
        .unwrap();

    let row = ctx.repo.user_row(editor.id).unwrap();
    assert_eq!(row.full_name, "Renamed Editor");
    assert_eq!(row.reset_token.as_deref(), Some("fresh-token"));
    assert_eq!(row.reset_token_expires_at, Some(expires_at));
}

#[tokio::test]
async fn test_list_users_paginates_and_lists_roles() {
    let ctx = TestContext::new();
    for n in 0..3 {
        ctx.principal(EDITOR, &format!("editor{n}@morphelabs.com")).await;
    }

    let page = users::list(
        ctx.repo.as_ref(),
        UserFilter {
            page: Some(2),
            limit: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.total_pages, 2);
    assert_eq!(page.data.len(), 1);

    let roles = users::roles(ctx.repo.as_ref()).await.unwrap();
    let slugs: Vec<_> = roles.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec![SUPER_ADMIN, EDITOR, VIEWER]);
}
