use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::{ApiQuery, EntityId, ValidatedJson},
    models::{
        ApiResponse, CreateUserRequest, MessageResponse, Paginated, Role, UpdateUserRequest,
        UserFilter, UserProfile, created, message, ok,
    },
    permissions::SUPER_ADMIN,
    services::users as service,
};

/// list_users
///
/// [Super-admin Route] Paginated accounts with their roles.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    security(("bearer" = [])),
    params(UserFilter),
    responses((status = 200, description = "Paginated users", body = [UserProfile]))
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> Result<Json<Paginated<UserProfile>>, ApiError> {
    user.require_role(&[SUPER_ADMIN])?;
    Ok(Json(service::list(state.repo.as_ref(), filter).await?))
}

/// get_user
///
/// [Super-admin Route]
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserProfile),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    user.require_role(&[SUPER_ADMIN])?;
    Ok(ok(service::get(state.repo.as_ref(), id).await?))
}

/// create_user
///
/// [Super-admin Route] Creates an account with a bcrypt-hashed password.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    security(("bearer" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Role does not exist"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ApiError> {
    user.require_role(&[SUPER_ADMIN])?;
    let profile = service::create(
        state.repo.as_ref(),
        state.mailer.as_ref(),
        &state.config,
        payload,
    )
    .await?;
    Ok(created(profile))
}

/// update_user
///
/// [Super-admin Route] Partial update; covers role changes and (de)activation.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses((status = 200, description = "User updated", body = UserProfile))
)]
pub async fn update_user(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    user.require_role(&[SUPER_ADMIN])?;
    let profile = service::update(state.repo.as_ref(), &state.config, id, payload).await?;
    Ok(ok(profile))
}

/// delete_user
///
/// [Super-admin Route] Soft delete.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "User id")),
    responses((status = 200, description = "User deleted", body = MessageResponse))
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_role(&[SUPER_ADMIN])?;
    service::delete(state.repo.as_ref(), &user, id).await?;
    Ok(message("User deleted successfully"))
}

/// list_roles
///
/// [Super-admin Route] Every role with its permission map.
#[utoipa::path(
    get,
    path = "/api/v1/users/roles",
    tag = "users",
    security(("bearer" = [])),
    responses((status = 200, description = "Roles", body = [Role]))
)]
pub async fn list_roles(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Role>>>, ApiError> {
    user.require_role(&[SUPER_ADMIN])?;
    Ok(ok(service::roles(state.repo.as_ref()).await?))
}
