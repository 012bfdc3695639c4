use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    extract::{ApiQuery, EntityId, ValidatedJson},
    models::{
        ApiResponse, CreatePostRequest, MessageResponse, Paginated, PostDetail, PostFilter,
        UpdatePostRequest, created, message, ok,
    },
    permissions::{Action, Module},
    services::posts as service,
};

/// list_posts
///
/// [Public Route] Paginated posts. Without a staff token only published posts are
/// returned, whatever `status` is requested.
#[utoipa::path(
    get,
    path = "/api/v1/posts",
    tag = "posts",
    params(PostFilter),
    responses((status = 200, description = "Paginated posts", body = [PostDetail]))
)]
pub async fn list_posts(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<PostFilter>,
) -> Result<Json<Paginated<PostDetail>>, ApiError> {
    let posts = service::list(state.repo.as_ref(), filter, viewer.visibility()).await?;
    Ok(Json(posts))
}

/// get_post
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    params(("id" = i32, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = PostDetail),
        (status = 404, description = "Blog post not found")
    )
)]
pub async fn get_post(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ApiResponse<PostDetail>>, ApiError> {
    let post = service::get(state.repo.as_ref(), id, viewer.visibility()).await?;
    Ok(ok(post))
}

/// get_post_by_slug
///
/// [Public Route] Reading a published post counts a view.
#[utoipa::path(
    get,
    path = "/api/v1/posts/slug/{slug}",
    tag = "posts",
    params(("slug" = String, Path, description = "Post slug")),
    responses((status = 200, description = "Post", body = PostDetail))
)]
pub async fn get_post_by_slug(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<PostDetail>>, ApiError> {
    let post = service::get_by_slug(state.repo.as_ref(), &slug, viewer.visibility()).await?;
    Ok(ok(post))
}

/// create_post
///
/// [Authenticated Route] The caller becomes the author. Publishing straight away
/// additionally needs `blog.publish`.
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    tag = "posts",
    security(("bearer" = [])),
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostDetail),
        (status = 400, description = "Unknown category or tag"),
        (status = 409, description = "Title already taken")
    )
)]
pub async fn create_post(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PostDetail>>), ApiError> {
    user.require_writer(Module::Blog, Action::Create)?;
    let post = service::create(state.repo.as_ref(), &user, payload).await?;
    Ok(created(post))
}

/// update_post
///
/// [Authenticated Route] Partial update. `tags` replaces the whole set.
#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses((status = 200, description = "Post updated", body = PostDetail))
)]
pub async fn update_post(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdatePostRequest>,
) -> Result<Json<ApiResponse<PostDetail>>, ApiError> {
    user.require_writer(Module::Blog, Action::Update)?;
    let post = service::update(state.repo.as_ref(), &user, id, payload).await?;
    Ok(ok(post))
}

/// delete_post
///
/// [Authenticated Route] Soft delete.
#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    tag = "posts",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Post id")),
    responses((status = 200, description = "Post deleted", body = MessageResponse))
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_writer(Module::Blog, Action::Delete)?;
    service::delete(state.repo.as_ref(), id).await?;
    Ok(message("Blog post deleted successfully"))
}
