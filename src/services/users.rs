use std::collections::HashMap;

use crate::{
    config::AppConfig,
    crypto,
    auth::AuthUser,
    error::ApiError,
    mailer::{Mailer, welcome_mail},
    models::{
        CreateUserRequest, NewUser, Page, PageOf, Paginated, Role, UpdateUserRequest, User, UserFilter,
        UserProfile,
    },
    repository::Repository,
};

const DUPLICATE_EMAIL: &str = "A user with this email already exists";

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

async fn role_of(repo: &dyn Repository, user: &User) -> Result<Role, ApiError> {
    repo.find_role(user.role_id)
        .await?
        .ok_or_else(|| ApiError::internal(format!("user {} has no role row", user.id)))
}

async fn existing_role(repo: &dyn Repository, role_id: i32) -> Result<Role, ApiError> {
    repo.find_role(role_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid role ID"))
}

/// Newest accounts first.
pub async fn list(repo: &dyn Repository, filter: UserFilter) -> Result<Paginated<UserProfile>, ApiError> {
    let page = Page::new(filter.page, filter.limit, Page::DEFAULT_LIMIT);
    let roles: HashMap<i32, Role> = repo
        .list_roles()
        .await?
        .into_iter()
        .map(|role| (role.id, role))
        .collect();

    let users = repo.list_users(&filter, page).await?;
    let mut profiles = Vec::with_capacity(users.items.len());
    for user in &users.items {
        let role = roles
            .get(&user.role_id)
            .ok_or_else(|| ApiError::internal(format!("user {} has no role row", user.id)))?;
        profiles.push(UserProfile::new(user, role));
    }

    Ok(PageOf {
        items: profiles,
        total: users.total,
    }
    .into_paginated(page))
}

pub async fn get(repo: &dyn Repository, id: i32) -> Result<UserProfile, ApiError> {
    let user = repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    let role = role_of(repo, &user).await?;
    Ok(UserProfile::new(&user, &role))
}

/// create
///
/// New accounts start active unless the request says otherwise. The welcome mail is
/// best effort: a delivery failure is logged and the account is kept.
pub async fn create(
    repo: &dyn Repository,
    mailer: &dyn Mailer,
    config: &AppConfig,
    req: CreateUserRequest,
) -> Result<UserProfile, ApiError> {
    let email = normalize_email(&req.email);
    if repo.email_taken(&email, None).await? {
        return Err(ApiError::conflict(DUPLICATE_EMAIL));
    }
    let role = existing_role(repo, req.role_id).await?;

    let password_hash = crypto::hash_password_blocking(req.password, config.bcrypt_cost).await?;
    let user = repo
        .insert_user(NewUser {
            email,
            password_hash,
            full_name: req.full_name.trim().to_string(),
            role_id: role.id,
            is_active: req.is_active.unwrap_or(true),
        })
        .await?;

    tracing::info!(user_id = user.id, role = %role.slug, "user created");

    let mail = welcome_mail(&config.mail_from, &user.email, &user.full_name);
    if let Err(e) = mailer.send(mail).await {
        tracing::warn!(user_id = user.id, error = %e, "welcome mail not sent");
    }

    Ok(UserProfile::new(&user, &role))
}

/// update
///
/// Partial: only supplied fields change. A new password is re-hashed.
pub async fn update(
    repo: &dyn Repository,
    config: &AppConfig,
    id: i32,
    req: UpdateUserRequest,
) -> Result<UserProfile, ApiError> {
    let mut user = repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(email) = req.email {
        let email = normalize_email(&email);
        if email != user.email && repo.email_taken(&email, Some(id)).await? {
            return Err(ApiError::conflict(DUPLICATE_EMAIL));
        }
        user.email = email;
    }
    if let Some(role_id) = req.role_id {
        user.role_id = existing_role(repo, role_id).await?.id;
    }
    if let Some(full_name) = req.full_name {
        user.full_name = full_name.trim().to_string();
    }
    if let Some(is_active) = req.is_active {
        user.is_active = is_active;
    }
    if let Some(password) = req.password {
        user.password_hash = crypto::hash_password_blocking(password, config.bcrypt_cost).await?;
    }

    let user = repo.save_user(&user).await?;
    let role = role_of(repo, &user).await?;
    Ok(UserProfile::new(&user, &role))
}

/// Soft delete; the row stays for authorship references. An account cannot delete
/// itself.
pub async fn delete(repo: &dyn Repository, principal: &AuthUser, id: i32) -> Result<(), ApiError> {
    if principal.id == id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    if !repo.soft_delete_user(id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    tracing::info!(user_id = id, "user deleted");
    Ok(())
}

/// Roles in id order.
pub async fn roles(repo: &dyn Repository) -> Result<Vec<Role>, ApiError> {
    repo.list_roles().await
}
