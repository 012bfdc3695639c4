use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::ApiQuery,
    models::{ApiResponse, DashboardStats, SearchHit, SearchQuery, ok},
    permissions::CONTENT_WRITERS,
    services::dashboard as service,
};

/// dashboard_stats
///
/// [Authenticated Route] Overview counts, breakdown and recent activity. Viewers get
/// public figures only.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    tag = "dashboard",
    security(("bearer" = [])),
    responses((status = 200, description = "Dashboard statistics", body = DashboardStats))
)]
pub async fn dashboard_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    Ok(ok(service::stats(state.repo.as_ref(), &user).await?))
}

/// dashboard_search
///
/// [Authenticated Route] Search across posts, services and jobs. Staff only.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/search",
    tag = "dashboard",
    security(("bearer" = [])),
    params(SearchQuery),
    responses(
        (status = 200, description = "Search hits", body = [SearchHit]),
        (status = 400, description = "Query shorter than two characters")
    )
)]
pub async fn dashboard_search(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<SearchHit>>>, ApiError> {
    user.require_role(CONTENT_WRITERS)?;
    let hits = service::search(state.repo.as_ref(), query.q.as_deref()).await?;
    Ok(ok(hits))
}
