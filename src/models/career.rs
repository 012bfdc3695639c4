use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::common::double_option;

// --- Enums ---

/// JobStatus
///
/// Only `active` listings are public and accept applications.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, TS,
)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum JobStatus {
    Draft,
    Active,
    Closed,
    Archived,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Archived => "archived",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, TS,
)]
#[sqlx(type_name = "employment_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, TS,
)]
#[sqlx(type_name = "location_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LocationType {
    Onsite,
    Remote,
    Hybrid,
}

/// ApplicationStatus
///
/// Pipeline of a candidate: new → reviewing → shortlisted → interviewing → offered,
/// with rejected/withdrawn as exits from any stage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, TS,
)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ApplicationStatus {
    New,
    Reviewing,
    Shortlisted,
    Interviewing,
    Offered,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Reviewing => "reviewing",
            Self::Shortlisted => "shortlisted",
            Self::Interviewing => "interviewing",
            Self::Offered => "offered",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }
}

// --- Rows ---

/// JobListing
///
/// Row of `job_listings`. Salaries are whole units of `salary_currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[ts(export)]
pub struct JobListing {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub department: String,
    pub location_type: LocationType,
    pub location_city: Option<String>,
    pub location_region: Option<String>,
    pub remote_policy: Option<String>,
    pub employment_type: EmploymentType,
    pub description: String,
    pub responsibilities: Vec<String>,
    pub qualifications_required: Vec<String>,
    pub qualifications_preferred: Vec<String>,
    pub benefits: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub salary_currency: String,
    pub salary_visible: bool,
    #[ts(type = "string | null")]
    pub application_deadline: Option<NaiveDate>,
    pub status: JobStatus,
    /// Staff-only; blanked before a listing is shown to anonymous readers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_notes: Option<String>,
    pub posted_by: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    #[ts(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl JobListing {
    /// Projection for anonymous readers: no internal notes, and no salary unless
    /// the listing opts in.
    pub fn public_view(mut self) -> Self {
        self.internal_notes = None;
        if !self.salary_visible {
            self.salary_min = None;
            self.salary_max = None;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobListing,
    /// Present for staff only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[ts(export)]
pub struct JobApplication {
    pub id: i32,
    pub job_id: i32,
    pub applicant_name: String,
    pub applicant_email: String,
    pub applicant_phone: Option<String>,
    pub resume_url: String,
    pub resume_filename: String,
    pub cover_letter: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub status: ApplicationStatus,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub applied_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// An application with the title of the job it targets, for the cross-job list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: JobApplication,
    pub job_title: String,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub slug: String,
    pub department: String,
    pub location_type: LocationType,
    pub location_city: Option<String>,
    pub location_region: Option<String>,
    pub remote_policy: Option<String>,
    pub employment_type: EmploymentType,
    pub description: String,
    pub responsibilities: Vec<String>,
    pub qualifications_required: Vec<String>,
    pub qualifications_preferred: Vec<String>,
    pub benefits: Vec<String>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub salary_currency: String,
    pub salary_visible: bool,
    pub application_deadline: Option<NaiveDate>,
    pub status: JobStatus,
    pub internal_notes: Option<String>,
    pub posted_by: i32,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: i32,
    pub applicant_name: String,
    pub applicant_email: String,
    pub applicant_phone: Option<String>,
    pub resume_url: String,
    pub resume_filename: String,
    pub cover_letter: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
}

// --- Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateJobRequest {
    #[validate(custom(function = "crate::models::common::not_blank", message = "Title is required"))]
    pub title: String,
    #[validate(custom(function = "crate::models::common::not_blank", message = "Department is required"))]
    pub department: String,
    pub location_type: Option<LocationType>,
    pub location_city: Option<String>,
    pub location_region: Option<String>,
    pub remote_policy: Option<String>,
    pub employment_type: Option<EmploymentType>,
    #[validate(custom(function = "crate::models::common::not_blank", message = "Description is required"))]
    pub description: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub qualifications_required: Vec<String>,
    #[serde(default)]
    pub qualifications_preferred: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[validate(range(min = 0, message = "Salary must be a positive number"))]
    pub salary_min: Option<i32>,
    #[validate(range(min = 0, message = "Salary must be a positive number"))]
    pub salary_max: Option<i32>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub salary_currency: Option<String>,
    pub salary_visible: Option<bool>,
    #[ts(type = "string | null")]
    pub application_deadline: Option<NaiveDate>,
    pub status: Option<JobStatus>,
    pub internal_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    #[validate(custom(function = "crate::models::common::not_blank", message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(custom(function = "crate::models::common::not_blank", message = "Department cannot be empty"))]
    pub department: Option<String>,
    pub location_type: Option<LocationType>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location_city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location_region: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub remote_policy: Option<Option<String>>,
    pub employment_type: Option<EmploymentType>,
    #[validate(custom(function = "crate::models::common::not_blank", message = "Description cannot be empty"))]
    pub description: Option<String>,
    pub responsibilities: Option<Vec<String>>,
    pub qualifications_required: Option<Vec<String>>,
    pub qualifications_preferred: Option<Vec<String>>,
    pub benefits: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub salary_min: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub salary_max: Option<Option<i32>>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub salary_currency: Option<String>,
    pub salary_visible: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub application_deadline: Option<Option<NaiveDate>>,
    pub status: Option<JobStatus>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub internal_notes: Option<Option<String>>,
}

/// ApplyRequest
///
/// Public submission for `POST /jobs/{id}/apply`. The resume is uploaded beforehand;
/// only its URL travels here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApplyRequest {
    #[validate(custom(function = "crate::models::common::not_blank", message = "Name is required"))]
    pub applicant_name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub applicant_email: String,
    pub applicant_phone: Option<String>,
    #[validate(url(message = "Resume URL must be a valid URL"))]
    pub resume_url: String,
    pub resume_filename: Option<String>,
    pub cover_letter: Option<String>,
    #[validate(url(message = "LinkedIn URL must be a valid URL"))]
    pub linkedin_url: Option<String>,
    #[validate(url(message = "Portfolio URL must be a valid URL"))]
    pub portfolio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[ts(export)]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,
    pub notes: Option<String>,
}

// --- Filters ---

/// JobFilter
///
/// Query parameters of `GET /jobs`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct JobFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<JobStatus>,
    pub department: Option<String>,
    pub employment_type: Option<EmploymentType>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ApplicationFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ApplicationStatus>,
    pub job_id: Option<i32>,
}
