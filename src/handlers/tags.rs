use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::{EntityId, ValidatedJson},
    models::{ApiResponse, MessageResponse, Tag, TagRequest, created, message, ok},
    permissions::{Action, Module},
    services::tags as service,
};

/// list_tags
///
/// [Public Route] All tags ordered by name, with live usage counts.
#[utoipa::path(
    get,
    path = "/api/v1/tags",
    tag = "tags",
    responses((status = 200, description = "Tags", body = [Tag]))
)]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Tag>>>, ApiError> {
    Ok(ok(service::list(state.repo.as_ref()).await?))
}

/// get_tag
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/tags/{id}",
    tag = "tags",
    params(("id" = i32, Path, description = "Tag id")),
    responses(
        (status = 200, description = "Tag", body = Tag),
        (status = 404, description = "Tag not found")
    )
)]
pub async fn get_tag(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ApiResponse<Tag>>, ApiError> {
    Ok(ok(service::get(state.repo.as_ref(), id).await?))
}

/// get_tag_by_slug
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/tags/slug/{slug}",
    tag = "tags",
    params(("slug" = String, Path, description = "Tag slug")),
    responses((status = 200, description = "Tag", body = Tag))
)]
pub async fn get_tag_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Tag>>, ApiError> {
    Ok(ok(service::get_by_slug(state.repo.as_ref(), &slug).await?))
}

/// create_tag
///
/// [Authenticated Route] Needs a content-writer role with `blog.create`.
#[utoipa::path(
    post,
    path = "/api/v1/tags",
    tag = "tags",
    security(("bearer" = [])),
    request_body = TagRequest,
    responses(
        (status = 201, description = "Tag created", body = Tag),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn create_tag(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<TagRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Tag>>), ApiError> {
    user.require_writer(Module::Blog, Action::Create)?;
    Ok(created(service::create(state.repo.as_ref(), &payload.name).await?))
}

/// rename_tag
///
/// [Authenticated Route] The slug follows the new name.
#[utoipa::path(
    put,
    path = "/api/v1/tags/{id}",
    tag = "tags",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Tag id")),
    request_body = TagRequest,
    responses((status = 200, description = "Tag renamed", body = Tag))
)]
pub async fn rename_tag(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<TagRequest>,
) -> Result<Json<ApiResponse<Tag>>, ApiError> {
    user.require_writer(Module::Blog, Action::Update)?;
    Ok(ok(service::rename(state.repo.as_ref(), id, &payload.name).await?))
}

/// delete_tag
///
/// [Authenticated Route] Hard delete; the tag disappears from every post.
#[utoipa::path(
    delete,
    path = "/api/v1/tags/{id}",
    tag = "tags",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Tag id")),
    responses((status = 200, description = "Tag deleted", body = MessageResponse))
)]
pub async fn delete_tag(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_writer(Module::Blog, Action::Delete)?;
    service::delete(state.repo.as_ref(), id).await?;
    Ok(message("Tag deleted successfully"))
}
