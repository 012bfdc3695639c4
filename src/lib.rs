use axum::{
    Router,
    body::Body,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, Uri, header},
    middleware::{self, Next},
    response::Response,
};
use serde_json::{Value, json};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod permissions;
pub mod rate_limit;
pub mod repository;
pub mod services;
pub mod slug;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use config::Env;
use error::{ApiError, InternalDetail};
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use mailer::{LogMailer, MailerState, MemoryMailer};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{LocalDiskStorage, MockStorageService, StorageState};

/// Every API route lives under this prefix.
pub const API_PREFIX: &str = "/api/v1";

/// ApiDoc
///
/// The OpenAPI document, assembled from the `#[utoipa::path]` annotations on the
/// handlers and served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::login, handlers::auth::refresh, handlers::auth::me,
        handlers::auth::logout, handlers::auth::forgot_password, handlers::auth::reset_password,
        handlers::users::list_users, handlers::users::get_user, handlers::users::create_user,
        handlers::users::update_user, handlers::users::delete_user, handlers::users::list_roles,
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::get_category_by_slug, handlers::categories::create_category,
        handlers::categories::update_category, handlers::categories::delete_category,
        handlers::tags::list_tags, handlers::tags::get_tag, handlers::tags::get_tag_by_slug,
        handlers::tags::create_tag, handlers::tags::rename_tag, handlers::tags::delete_tag,
        handlers::posts::list_posts, handlers::posts::get_post, handlers::posts::get_post_by_slug,
        handlers::posts::create_post, handlers::posts::update_post, handlers::posts::delete_post,
        handlers::portfolio::list_services, handlers::portfolio::get_service,
        handlers::portfolio::get_service_by_slug, handlers::portfolio::create_service,
        handlers::portfolio::update_service, handlers::portfolio::delete_service,
        handlers::careers::list_jobs, handlers::careers::get_job, handlers::careers::get_job_by_slug,
        handlers::careers::create_job, handlers::careers::update_job, handlers::careers::delete_job,
        handlers::careers::apply_for_job, handlers::careers::list_job_applications,
        handlers::careers::list_all_applications, handlers::careers::update_application_status,
        handlers::media::upload_media, handlers::media::list_media, handlers::media::get_media,
        handlers::media::update_media, handlers::media::delete_media,
        handlers::dashboard::dashboard_stats, handlers::dashboard::dashboard_search,
    ),
    components(
        schemas(
            error::ErrorEnvelope, error::ErrorBody, error::FieldError,
            models::MessageResponse, models::Pagination, handlers::health::HealthResponse,
            models::LoginRequest, models::LoginResponse, models::SessionUser,
            models::RefreshRequest, models::RefreshResponse, models::ForgotPasswordRequest,
            models::ResetPasswordRequest, models::UserProfile, models::Role, models::RoleSummary,
            models::CreateUserRequest, models::UpdateUserRequest,
            models::Category, models::CategorySummary, models::CreateCategoryRequest,
            models::UpdateCategoryRequest, models::Tag, models::TagSummary, models::TagRequest,
            models::PostStatus, models::PostDetail, models::AuthorSummary,
            models::CreatePostRequest, models::UpdatePostRequest,
            models::ServiceStatus, models::PortfolioItem, models::ServiceImage,
            models::ServiceImageInput, models::PortfolioDetail, models::CreatePortfolioRequest,
            models::UpdatePortfolioRequest,
            models::JobStatus, models::EmploymentType, models::LocationType,
            models::ApplicationStatus, models::JobListing, models::JobDetail,
            models::JobApplication, models::ApplicationListing, models::CreateJobRequest,
            models::UpdateJobRequest, models::ApplyRequest, models::UpdateApplicationStatusRequest,
            models::MediaType, models::MediaFile, models::UpdateMediaRequest,
            handlers::media::UploadForm,
            models::DashboardStats, models::Overview, models::Breakdown, models::ActivityItem,
            models::SearchHit,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "morphe-cms", description = "Morphe headless CMS API")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by the authenticated paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// AppState
///
/// Everything a request may need, shared across all requests. Each field is an `Arc`
/// (or cheap to clone), and extractors pull individual parts out through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in deployment, in-memory in tests.
    pub repo: RepositoryState,
    /// Where uploaded media bytes are written.
    pub storage: StorageState,
    /// Hand-off point for outgoing email.
    pub mailer: MailerState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Gate for the authenticated and admin routers. Extracting `AuthUser` runs the whole
/// token check and store lookup; a failure rejects the request with 401 before any
/// handler runs. The resolved principal is cached in the request extensions, so the
/// handler's own `AuthUser` does not hit the store a second time.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// Fallback for paths no router matched.
async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {method} {} not found", uri.path()))
}

/// attach_debug_detail
///
/// Local only. Copies the cause of a 500 (left in the response extensions by
/// `ApiError`) into `error.details.debug` so it shows up in the client.
async fn attach_debug_detail(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let Some(InternalDetail(detail)) = response.extensions().get::<InternalDetail>().cloned()
    else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, usize::MAX).await else {
        return Response::from_parts(parts, Body::empty());
    };
    let Ok(mut envelope) = serde_json::from_slice::<Value>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    if let Some(error) = envelope.get_mut("error").and_then(Value::as_object_mut) {
        error.insert("details".to_string(), json!({ "debug": detail }));
    }
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(envelope.to_string()))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// create_router
///
/// Assembles the whole application: API routers under `/api/v1`, uploaded files under
/// `/uploads`, Swagger UI, and the observability and CORS layers around them.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();
    let x_request_id = HeaderName::from_static("x-request-id");

    // 1. API routers. Authenticated and admin routes share the auth gate.
    let api = Router::new()
        .merge(public::public_routes(&config))
        .merge(
            authenticated::authenticated_routes(config.max_upload_bytes)
                .merge(admin::admin_routes())
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    // 2. Base router: docs, API, static uploads, 404 envelope.
    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest(API_PREFIX, api)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .fallback(route_not_found)
        .with_state(state);

    if config.env == Env::Local {
        app = app.layer(middleware::from_fn(attach_debug_detail));
    }

    // 3. Observability and correlation layers.
    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
    // 4. CORS, outermost.
    .layer(cors_layer(&config.cors_origins))
}

/// trace_span_logger
///
/// Span for one request, tagged with method, URI and the `x-request-id` set above, so
/// every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
