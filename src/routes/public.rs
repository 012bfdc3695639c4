use crate::{
    AppState,
    config::AppConfig,
    handlers,
    rate_limit::{RateLimitPolicy, RateLimiter, rate_limit},
};
use axum::{
    Router,
    middleware,
    routing::{get, post},
};

/// Public Router Module
///
/// Login and password recovery, the public read side of every content type, and job
/// applications. Visibility of drafts, archived and inactive rows is decided per
/// request from the optional bearer token. Login and forgot-password are rate limited
/// per client address.
pub fn public_routes(config: &AppConfig) -> Router<AppState> {
    let login_limiter = RateLimiter::new(RateLimitPolicy::login(config));
    let reset_limiter = RateLimiter::new(RateLimitPolicy::password_reset());

    Router::new()
        // GET /health
        .route("/health", get(handlers::health::health))
        // --- Auth ---
        .route(
            "/auth/login",
            post(handlers::auth::login)
                .layer(middleware::from_fn_with_state(login_limiter, rate_limit)),
        )
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/auth/forgot-password",
            post(handlers::auth::forgot_password)
                .layer(middleware::from_fn_with_state(reset_limiter, rate_limit)),
        )
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        // --- Taxonomy ---
        .route("/categories", get(handlers::categories::list_categories))
        .route("/categories/{id}", get(handlers::categories::get_category))
        .route(
            "/categories/slug/{slug}",
            get(handlers::categories::get_category_by_slug),
        )
        .route("/tags", get(handlers::tags::list_tags))
        .route("/tags/{id}", get(handlers::tags::get_tag))
        .route("/tags/slug/{slug}", get(handlers::tags::get_tag_by_slug))
        // --- Content ---
        .route("/posts", get(handlers::posts::list_posts))
        .route("/posts/{id}", get(handlers::posts::get_post))
        .route("/posts/slug/{slug}", get(handlers::posts::get_post_by_slug))
        .route("/services", get(handlers::portfolio::list_services))
        .route("/services/{id}", get(handlers::portfolio::get_service))
        .route(
            "/services/slug/{slug}",
            get(handlers::portfolio::get_service_by_slug),
        )
        // --- Careers ---
        .route("/jobs", get(handlers::careers::list_jobs))
        .route("/jobs/{id}", get(handlers::careers::get_job))
        .route("/jobs/slug/{slug}", get(handlers::careers::get_job_by_slug))
        // POST /jobs/{id}/apply
        // Open to anyone; the listing must be active.
        .route("/jobs/{id}/apply", post(handlers::careers::apply_for_job))
}
