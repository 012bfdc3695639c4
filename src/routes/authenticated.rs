use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Authenticated Router Module
///
/// Every route here sits behind the `AuthUser` middleware, so handlers always receive a
/// resolved, active principal. Content writes then check role and module permission;
/// media edits additionally check ownership.
pub fn authenticated_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session ---
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/logout", post(handlers::auth::logout))
        // --- Taxonomy ---
        .route("/categories", post(handlers::categories::create_category))
        .route(
            "/categories/{id}",
            patch(handlers::categories::update_category)
                .put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route("/tags", post(handlers::tags::create_tag))
        .route(
            "/tags/{id}",
            put(handlers::tags::rename_tag).delete(handlers::tags::delete_tag),
        )
        // --- Content ---
        .route("/posts", post(handlers::posts::create_post))
        .route(
            "/posts/{id}",
            put(handlers::posts::update_post).delete(handlers::posts::delete_post),
        )
        .route("/services", post(handlers::portfolio::create_service))
        .route(
            "/services/{id}",
            put(handlers::portfolio::update_service).delete(handlers::portfolio::delete_service),
        )
        // --- Careers ---
        .route("/jobs", post(handlers::careers::create_job))
        .route(
            "/jobs/{id}",
            put(handlers::careers::update_job).delete(handlers::careers::delete_job),
        )
        .route(
            "/jobs/{id}/applications",
            get(handlers::careers::list_job_applications),
        )
        // Static segment wins over `{id}` above.
        .route(
            "/jobs/all/applications",
            get(handlers::careers::list_all_applications),
        )
        .route(
            "/jobs/applications/{id}/status",
            patch(handlers::careers::update_application_status),
        )
        // --- Media ---
        // POST /media/upload
        // The whole request is buffered; anything past the limit fails as "File too large".
        .route(
            "/media/upload",
            post(handlers::media::upload_media)
                .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/media", get(handlers::media::list_media))
        .route(
            "/media/{id}",
            get(handlers::media::get_media)
                .put(handlers::media::update_media)
                .patch(handlers::media::update_media)
                .delete(handlers::media::delete_media),
        )
        // --- Dashboard ---
        .route("/dashboard/stats", get(handlers::dashboard::dashboard_stats))
        .route("/dashboard/search", get(handlers::dashboard::dashboard_search))
}
