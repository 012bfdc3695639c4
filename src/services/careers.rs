use super::slug_for;
use crate::{
    auth::AuthUser,
    error::{ApiError, FieldError},
    models::{
        ApplicationFilter, ApplicationListing, ApplyRequest, CreateJobRequest, EmploymentType,
        JobApplication, JobDetail, JobFilter, JobListing, JobStatus, LocationType, NewApplication,
        NewJob, Page, Paginated, UpdateApplicationStatusRequest, UpdateJobRequest, Visibility,
    },
    permissions::{Action, Module},
    repository::Repository,
};

const DUPLICATE_TITLE: &str = "A job with this title already exists";
const DEFAULT_CURRENCY: &str = "USD";

fn not_found() -> ApiError {
    ApiError::not_found("Job listing not found")
}

fn visible(job: &JobListing, visibility: Visibility) -> bool {
    visibility == Visibility::All || job.status == JobStatus::Active
}

fn check_salary_range(min: Option<i32>, max: Option<i32>) -> Result<(), ApiError> {
    if let (Some(min), Some(max)) = (min, max)
        && min > max
    {
        return Err(ApiError::validation(vec![FieldError::new(
            "salaryMax",
            "Maximum salary must not be lower than minimum salary",
        )]));
    }
    Ok(())
}

/// Anything but `draft` puts the listing in front of (or takes it away from) applicants.
fn needs_publish(status: JobStatus) -> bool {
    status != JobStatus::Draft
}

async fn detail(
    repo: &dyn Repository,
    job: JobListing,
    visibility: Visibility,
) -> Result<JobDetail, ApiError> {
    Ok(match visibility {
        Visibility::All => JobDetail {
            applications_count: Some(repo.count_applications(job.id).await?),
            job,
        },
        Visibility::Public => JobDetail {
            job: job.public_view(),
            applications_count: None,
        },
    })
}

// --- Listings ---

/// list
///
/// Newest first. Anonymous and viewer callers only see `active` listings, without
/// internal notes or hidden salaries.
pub async fn list(
    repo: &dyn Repository,
    filter: JobFilter,
    visibility: Visibility,
) -> Result<Paginated<JobListing>, ApiError> {
    let page = Page::new(filter.page, filter.limit, Page::DEFAULT_LIMIT);
    let jobs = repo.list_jobs(&filter, visibility, page).await?;
    let jobs = match visibility {
        Visibility::All => jobs,
        Visibility::Public => jobs.map(JobListing::public_view),
    };
    Ok(jobs.into_paginated(page))
}

pub async fn get(repo: &dyn Repository, id: i32, visibility: Visibility) -> Result<JobDetail, ApiError> {
    let job = repo
        .find_job(id)
        .await?
        .filter(|job| visible(job, visibility))
        .ok_or_else(not_found)?;
    detail(repo, job, visibility).await
}

pub async fn get_by_slug(
    repo: &dyn Repository,
    slug: &str,
    visibility: Visibility,
) -> Result<JobDetail, ApiError> {
    let job = repo
        .find_job_by_slug(slug)
        .await?
        .filter(|job| visible(job, visibility))
        .ok_or_else(not_found)?;
    detail(repo, job, visibility).await
}

/// create
///
/// New listings default to a full-time on-site draft in USD with a visible salary.
pub async fn create(
    repo: &dyn Repository,
    principal: &AuthUser,
    req: CreateJobRequest,
) -> Result<JobListing, ApiError> {
    let status = req.status.unwrap_or(JobStatus::Draft);
    if needs_publish(status) {
        principal.require_permission(Module::Careers, Action::Publish)?;
    }
    check_salary_range(req.salary_min, req.salary_max)?;

    let slug = slug_for("title", &req.title)?;
    if repo.job_slug_taken(&slug, None).await? {
        return Err(ApiError::conflict(DUPLICATE_TITLE));
    }

    let job = repo
        .insert_job(NewJob {
            title: req.title.trim().to_string(),
            slug,
            department: req.department.trim().to_string(),
            location_type: req.location_type.unwrap_or(LocationType::Onsite),
            location_city: req.location_city,
            location_region: req.location_region,
            remote_policy: req.remote_policy,
            employment_type: req.employment_type.unwrap_or(EmploymentType::FullTime),
            description: req.description,
            responsibilities: req.responsibilities,
            qualifications_required: req.qualifications_required,
            qualifications_preferred: req.qualifications_preferred,
            benefits: req.benefits,
            salary_min: req.salary_min,
            salary_max: req.salary_max,
            salary_currency: req
                .salary_currency
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            salary_visible: req.salary_visible.unwrap_or(true),
            application_deadline: req.application_deadline,
            status,
            internal_notes: req.internal_notes,
            posted_by: principal.id,
        })
        .await?;

    tracing::info!(job_id = job.id, slug = %job.slug, status = job.status.as_str(), "job created");
    Ok(job)
}

/// Partial update; a changed title re-derives the slug.
pub async fn update(
    repo: &dyn Repository,
    principal: &AuthUser,
    id: i32,
    req: UpdateJobRequest,
) -> Result<JobListing, ApiError> {
    let mut job = repo.find_job(id).await?.ok_or_else(not_found)?;

    if let Some(title) = req.title {
        let title = title.trim().to_string();
        if title != job.title {
            let slug = slug_for("title", &title)?;
            if repo.job_slug_taken(&slug, Some(id)).await? {
                return Err(ApiError::conflict(DUPLICATE_TITLE));
            }
            job.slug = slug;
        }
        job.title = title;
    }
    if let Some(status) = req.status {
        if status != job.status && (needs_publish(status) || needs_publish(job.status)) {
            principal.require_permission(Module::Careers, Action::Publish)?;
        }
        job.status = status;
    }
    if let Some(department) = req.department {
        job.department = department.trim().to_string();
    }
    if let Some(location_type) = req.location_type {
        job.location_type = location_type;
    }
    if let Some(location_city) = req.location_city {
        job.location_city = location_city;
    }
    if let Some(location_region) = req.location_region {
        job.location_region = location_region;
    }
    if let Some(remote_policy) = req.remote_policy {
        job.remote_policy = remote_policy;
    }
    if let Some(employment_type) = req.employment_type {
        job.employment_type = employment_type;
    }
    if let Some(description) = req.description {
        job.description = description;
    }
    if let Some(responsibilities) = req.responsibilities {
        job.responsibilities = responsibilities;
    }
    if let Some(required) = req.qualifications_required {
        job.qualifications_required = required;
    }
    if let Some(preferred) = req.qualifications_preferred {
        job.qualifications_preferred = preferred;
    }
    if let Some(benefits) = req.benefits {
        job.benefits = benefits;
    }
    if let Some(salary_min) = req.salary_min {
        job.salary_min = salary_min;
    }
    if let Some(salary_max) = req.salary_max {
        job.salary_max = salary_max;
    }
    if let Some(currency) = req.salary_currency {
        job.salary_currency = currency.to_ascii_uppercase();
    }
    if let Some(salary_visible) = req.salary_visible {
        job.salary_visible = salary_visible;
    }
    if let Some(deadline) = req.application_deadline {
        job.application_deadline = deadline;
    }
    if let Some(internal_notes) = req.internal_notes {
        job.internal_notes = internal_notes;
    }
    check_salary_range(job.salary_min, job.salary_max)?;

    repo.save_job(&job).await
}

pub async fn delete(repo: &dyn Repository, id: i32) -> Result<(), ApiError> {
    if !repo.soft_delete_job(id).await? {
        return Err(not_found());
    }
    tracing::info!(job_id = id, "job deleted");
    Ok(())
}

// --- Applications ---

/// Last path segment of the resume URL, used when the applicant sends no filename.
fn filename_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("resume")
        .to_string()
}

/// apply
///
/// Public submission. Only `active` listings take applications, and each email may
/// apply once per listing.
pub async fn apply(
    repo: &dyn Repository,
    job_id: i32,
    req: ApplyRequest,
) -> Result<JobApplication, ApiError> {
    let job = repo.find_job(job_id).await?.ok_or_else(not_found)?;
    if job.status != JobStatus::Active {
        return Err(ApiError::bad_request("This job is not accepting applications"));
    }

    let email = req.applicant_email.trim().to_string();
    if repo
        .find_application_by_job_email(job_id, &email)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("You have already applied for this position"));
    }

    let resume_filename = req
        .resume_filename
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| filename_from_url(&req.resume_url));

    let application = repo
        .insert_application(NewApplication {
            job_id,
            applicant_name: req.applicant_name.trim().to_string(),
            applicant_email: email,
            applicant_phone: req.applicant_phone,
            resume_url: req.resume_url,
            resume_filename,
            cover_letter: req.cover_letter,
            linkedin_url: req.linkedin_url,
            portfolio_url: req.portfolio_url,
        })
        .await?;

    tracing::info!(job_id, application_id = application.id, "application received");
    Ok(application)
}

/// Applications of one listing, newest first.
pub async fn job_applications(
    repo: &dyn Repository,
    job_id: i32,
) -> Result<Vec<JobApplication>, ApiError> {
    repo.find_job(job_id).await?.ok_or_else(not_found)?;
    repo.list_job_applications(job_id).await
}

/// Applications across every listing, with the job title attached.
pub async fn all_applications(
    repo: &dyn Repository,
    filter: ApplicationFilter,
) -> Result<Paginated<ApplicationListing>, ApiError> {
    let page = Page::new(filter.page, filter.limit, Page::DEFAULT_LIMIT);
    Ok(repo.list_applications(&filter, page).await?.into_paginated(page))
}

/// Moves an application through the pipeline. Omitted notes keep the previous ones.
pub async fn update_application_status(
    repo: &dyn Repository,
    id: i32,
    req: UpdateApplicationStatusRequest,
) -> Result<JobApplication, ApiError> {
    let mut application = repo
        .find_application(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Application not found"))?;

    application.status = req.status;
    if let Some(notes) = req.notes {
        application.notes = Some(notes);
    }
    let application = repo.save_application(&application).await?;

    tracing::info!(
        application_id = id,
        status = application.status.as_str(),
        "application status changed"
    );
    Ok(application)
}
