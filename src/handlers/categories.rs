use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::{ApiQuery, EntityId, ValidatedJson},
    models::{
        ApiResponse, Category, CategoryQuery, CreateCategoryRequest, MessageResponse,
        UpdateCategoryRequest, created, message, ok,
    },
    permissions::{Action, Module},
    services::categories::{self as service, CategoryListing},
};

/// list_categories
///
/// [Public Route] Flat list ordered by display order, or the nested tree with `?tree=true`.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "categories",
    params(CategoryQuery),
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> Result<Json<ApiResponse<CategoryListing>>, ApiError> {
    let listing = service::list(state.repo.as_ref(), query.tree.unwrap_or(false)).await?;
    Ok(ok(listing))
}

/// get_category
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    tag = "categories",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category", body = Category),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    Ok(ok(service::get(state.repo.as_ref(), id).await?))
}

/// get_category_by_slug
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/categories/slug/{slug}",
    tag = "categories",
    params(("slug" = String, Path, description = "Category slug")),
    responses((status = 200, description = "Category", body = Category))
)]
pub async fn get_category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    Ok(ok(service::get_by_slug(state.repo.as_ref(), &slug).await?))
}

/// create_category
///
/// [Authenticated Route] Needs a content-writer role with `blog.create`.
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "categories",
    security(("bearer" = [])),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), ApiError> {
    user.require_writer(Module::Blog, Action::Create)?;
    Ok(created(service::create(state.repo.as_ref(), payload).await?))
}

/// update_category
///
/// [Authenticated Route] Partial update; moving under a descendant is rejected.
#[utoipa::path(
    patch,
    path = "/api/v1/categories/{id}",
    tag = "categories",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Category id")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 400, description = "Invalid parent")
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    user.require_writer(Module::Blog, Action::Update)?;
    Ok(ok(service::update(state.repo.as_ref(), id, payload).await?))
}

/// delete_category
///
/// [Authenticated Route] Hard delete; children become roots.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    tag = "categories",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Category id")),
    responses((status = 200, description = "Category deleted", body = MessageResponse))
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_writer(Module::Blog, Action::Delete)?;
    service::delete(state.repo.as_ref(), id).await?;
    Ok(message("Category deleted successfully"))
}
