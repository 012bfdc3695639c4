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
        ApiResponse, ApplicationFilter, ApplicationListing, ApplyRequest, CreateJobRequest,
        JobApplication, JobDetail, JobFilter, JobListing, MessageResponse, Paginated,
        UpdateApplicationStatusRequest, UpdateJobRequest, created, message, ok,
    },
    permissions::{Action, Module},
    services::careers as service,
};

// --- Job listings ---

/// list_jobs
///
/// [Public Route] Paginated listings. Anonymous callers see active listings only,
/// without internal notes or hidden salaries.
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "careers",
    params(JobFilter),
    responses((status = 200, description = "Paginated jobs", body = [JobListing]))
)]
pub async fn list_jobs(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<JobFilter>,
) -> Result<Json<Paginated<JobListing>>, ApiError> {
    let jobs = service::list(state.repo.as_ref(), filter, viewer.visibility()).await?;
    Ok(Json(jobs))
}

/// get_job
///
/// [Public Route] Staff callers also get the applications count.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "careers",
    params(("id" = i32, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job", body = JobDetail),
        (status = 404, description = "Job listing not found")
    )
)]
pub async fn get_job(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ApiResponse<JobDetail>>, ApiError> {
    Ok(ok(service::get(state.repo.as_ref(), id, viewer.visibility()).await?))
}

/// get_job_by_slug
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/api/v1/jobs/slug/{slug}",
    tag = "careers",
    params(("slug" = String, Path, description = "Job slug")),
    responses((status = 200, description = "Job", body = JobDetail))
)]
pub async fn get_job_by_slug(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<JobDetail>>, ApiError> {
    let job = service::get_by_slug(state.repo.as_ref(), &slug, viewer.visibility()).await?;
    Ok(ok(job))
}

/// create_job
///
/// [Authenticated Route] Anything but a draft also needs `careers.publish`.
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "careers",
    security(("bearer" = [])),
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created", body = JobListing),
        (status = 409, description = "Title already taken")
    )
)]
pub async fn create_job(
    user: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JobListing>>), ApiError> {
    user.require_writer(Module::Careers, Action::Create)?;
    let job = service::create(state.repo.as_ref(), &user, payload).await?;
    Ok(created(job))
}

/// update_job
///
/// [Authenticated Route] Partial update.
#[utoipa::path(
    put,
    path = "/api/v1/jobs/{id}",
    tag = "careers",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Job id")),
    request_body = UpdateJobRequest,
    responses((status = 200, description = "Job updated", body = JobListing))
)]
pub async fn update_job(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdateJobRequest>,
) -> Result<Json<ApiResponse<JobListing>>, ApiError> {
    user.require_writer(Module::Careers, Action::Update)?;
    let job = service::update(state.repo.as_ref(), &user, id, payload).await?;
    Ok(ok(job))
}

/// delete_job
///
/// [Authenticated Route] Soft delete.
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    tag = "careers",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Job id")),
    responses((status = 200, description = "Job deleted", body = MessageResponse))
)]
pub async fn delete_job(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_writer(Module::Careers, Action::Delete)?;
    service::delete(state.repo.as_ref(), id).await?;
    Ok(message("Job listing deleted successfully"))
}

// --- Applications ---

/// apply_for_job
///
/// [Public Route] Anyone may apply to an active listing, once per email.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/apply",
    tag = "careers",
    params(("id" = i32, Path, description = "Job id")),
    request_body = ApplyRequest,
    responses(
        (status = 201, description = "Application received", body = JobApplication),
        (status = 400, description = "Job is not accepting applications"),
        (status = 409, description = "Already applied")
    )
)]
pub async fn apply_for_job(
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<ApplyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JobApplication>>), ApiError> {
    let application = service::apply(state.repo.as_ref(), id, payload).await?;
    Ok(created(application))
}

/// list_job_applications
///
/// [Authenticated Route] Applications of one listing, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/applications",
    tag = "careers",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Job id")),
    responses((status = 200, description = "Applications", body = [JobApplication]))
)]
pub async fn list_job_applications(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ApiResponse<Vec<JobApplication>>>, ApiError> {
    user.require_writer(Module::Careers, Action::Read)?;
    Ok(ok(service::job_applications(state.repo.as_ref(), id).await?))
}

/// list_all_applications
///
/// [Authenticated Route] Applications across every listing, paginated.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/all/applications",
    tag = "careers",
    security(("bearer" = [])),
    params(ApplicationFilter),
    responses((status = 200, description = "Paginated applications", body = [ApplicationListing]))
)]
pub async fn list_all_applications(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ApplicationFilter>,
) -> Result<Json<Paginated<ApplicationListing>>, ApiError> {
    user.require_writer(Module::Careers, Action::Read)?;
    Ok(Json(service::all_applications(state.repo.as_ref(), filter).await?))
}

/// update_application_status
///
/// [Authenticated Route] Moves an application through the hiring pipeline.
#[utoipa::path(
    patch,
    path = "/api/v1/jobs/applications/{id}/status",
    tag = "careers",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Application id")),
    request_body = UpdateApplicationStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = JobApplication),
        (status = 404, description = "Application not found")
    )
)]
pub async fn update_application_status(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdateApplicationStatusRequest>,
) -> Result<Json<ApiResponse<JobApplication>>, ApiError> {
    user.require_writer(Module::Careers, Action::Update)?;
    let application = service::update_application_status(state.repo.as_ref(), id, payload).await?;
    Ok(ok(application))
}
