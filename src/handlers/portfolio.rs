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
        ApiResponse, CreatePortfolioRequest, MessageResponse, Paginated, PortfolioDetail,
        PortfolioFilter, UpdatePortfolioRequest, created, message, ok,
    },
    permissions::{Action, Module},
    services::portfolio as service,
};

/// list_services
///
/// [Public Route] Paginated portfolio items with their galleries. Archived items are
/// staff-only.
#[utoipa::path(
    get,
    path = "/api/v1/services",
    tag = "services",
    params(PortfolioFilter),
    responses((status = 200, description = "Paginated services", body = [PortfolioDetail]))
)]
pub async fn list_services(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<PortfolioFilter>,
) -> Result<Json<Paginated<PortfolioDetail>>, ApiError> {
    let items = service::list(state.repo.as_ref(), filter, viewer.visibility()).await?;
    Ok(Json(items))
}

/// get_service
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/services/{id}",
    tag = "services",
    params(("id" = i32, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service", body = PortfolioDetail),
        (status = 404, description = "Service not found")
    )
)]
pub async fn get_service(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ApiResponse<PortfolioDetail>>, ApiError> {
    Ok(ok(service::get(state.repo.as_ref(), id, viewer.visibility()).await?))
}

/// get_service_by_slug
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/services/slug/{slug}",
    tag = "services",
    params(("slug" = String, Path, description = "Service slug")),
    responses((status = 200, description = "Service", body = PortfolioDetail))
)]
pub async fn get_service_by_slug(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<PortfolioDetail>>, ApiError> {
    let item = service::get_by_slug(state.repo.as_ref(), &slug, viewer.visibility()).await?;
    Ok(ok(item))
}

/// create_service
///
/// [Authenticated Route] Needs a content-writer role with `services.create`; setting
/// an explicit status also needs `services.publish`.
#[utoipa::path(
    post,
    path = "/api/v1/services",
    tag = "services",
    security(("bearer" = [])),
    request_body = CreatePortfolioRequest,
    responses(
        (status = 201, description = "Service created", body = PortfolioDetail),
        (status = 409, description = "Title already taken")
    )
)]
pub async fn create_service(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreatePortfolioRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PortfolioDetail>>), ApiError> {
    user.require_writer(Module::Services, Action::Create)?;
    let item = service::create(state.repo.as_ref(), &user, payload).await?;
    Ok(created(item))
}

/// update_service
///
/// [Authenticated Route] Partial update; `images` replaces the gallery.
#[utoipa::path(
    put,
    path = "/api/v1/services/{id}",
    tag = "services",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Service id")),
    request_body = UpdatePortfolioRequest,
    responses((status = 200, description = "Service updated", body = PortfolioDetail))
)]
pub async fn update_service(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdatePortfolioRequest>,
) -> Result<Json<ApiResponse<PortfolioDetail>>, ApiError> {
    user.require_writer(Module::Services, Action::Update)?;
    let item = service::update(state.repo.as_ref(), &user, id, payload).await?;
    Ok(ok(item))
}

/// delete_service
///
/// [Authenticated Route] Soft delete.
#[utoipa::path(
    delete,
    path = "/api/v1/services/{id}",
    tag = "services",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Service id")),
    responses((status = 200, description = "Service deleted", body = MessageResponse))
)]
pub async fn delete_service(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_writer(Module::Services, Action::Delete)?;
    service::delete(state.repo.as_ref(), id).await?;
    Ok(message("Service deleted successfully"))
}
