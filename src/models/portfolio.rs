use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::common::double_option;

/// ServiceStatus
///
/// Maps to the Postgres enum `service_status`. Archived items are hidden from the public site.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, TS,
)]
#[sqlx(type_name = "service_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ServiceStatus {
    Ongoing,
    Completed,
    Archived,
}

impl ServiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

/// PortfolioItem
///
/// Row of `services`: a client engagement shown in the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[ts(export)]
pub struct PortfolioItem {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub client_name: Option<String>,
    pub project_url: Option<String>,
    #[ts(type = "string | null")]
    pub project_date: Option<NaiveDate>,
    pub project_duration: Option<String>,
    pub status: ServiceStatus,
    pub featured: bool,
    pub category: Option<String>,
    pub technologies: Vec<String>,
    pub industry: Option<String>,
    pub challenge: Option<String>,
    pub solution: Option<String>,
    pub results: Option<String>,
    #[schema(value_type = Option<Object>)]
    #[ts(type = "Record<string, unknown> | null")]
    pub metrics: Option<serde_json::Value>,
    pub created_by: i32,
    pub display_order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    #[ts(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Row of `service_images`. Hard-deleted with its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[ts(export)]
pub struct ServiceImage {
    pub id: i32,
    pub service_id: i32,
    pub image_url: String,
    pub caption: Option<String>,
    pub is_primary: bool,
    pub display_order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// A portfolio item with its gallery.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PortfolioDetail {
    #[serde(flatten)]
    pub item: PortfolioItem,
    pub images: Vec<ServiceImage>,
}

#[derive(Debug, Clone)]
pub struct NewPortfolioItem {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub client_name: Option<String>,
    pub project_url: Option<String>,
    pub project_date: Option<NaiveDate>,
    pub project_duration: Option<String>,
    pub status: ServiceStatus,
    pub featured: bool,
    pub category: Option<String>,
    pub technologies: Vec<String>,
    pub industry: Option<String>,
    pub challenge: Option<String>,
    pub solution: Option<String>,
    pub results: Option<String>,
    pub metrics: Option<serde_json::Value>,
    pub created_by: i32,
    pub display_order: i32,
}

/// One gallery entry in a create/update payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServiceImageInput {
    #[validate(custom(function = "crate::models::common::not_blank", message = "Image URL is required"))]
    pub image_url: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    pub display_order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatePortfolioRequest {
    #[validate(custom(function = "crate::models::common::not_blank", message = "Title is required"))]
    pub title: String,
    #[validate(custom(function = "crate::models::common::not_blank", message = "Description is required"))]
    pub description: String,
    pub client_name: Option<String>,
    #[validate(url(message = "Project URL must be a valid URL"))]
    pub project_url: Option<String>,
    #[ts(type = "string | null")]
    pub project_date: Option<NaiveDate>,
    pub project_duration: Option<String>,
    pub status: Option<ServiceStatus>,
    #[serde(default)]
    pub featured: bool,
    pub category: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub industry: Option<String>,
    pub challenge: Option<String>,
    pub solution: Option<String>,
    pub results: Option<String>,
    #[schema(value_type = Option<Object>)]
    #[ts(type = "Record<string, unknown> | null")]
    pub metrics: Option<serde_json::Value>,
    pub display_order: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub images: Vec<ServiceImageInput>,
}

/// Partial update. `images`, when present, replaces the whole gallery.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortfolioRequest {
    #[validate(custom(function = "crate::models::common::not_blank", message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(custom(function = "crate::models::common::not_blank", message = "Description cannot be empty"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub client_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub project_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub project_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub project_duration: Option<Option<String>>,
    pub status: Option<ServiceStatus>,
    pub featured: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    pub technologies: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub industry: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub challenge: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub solution: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub results: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Object>)]
    pub metrics: Option<Option<serde_json::Value>>,
    pub display_order: Option<i32>,
    #[validate(nested)]
    pub images: Option<Vec<ServiceImageInput>>,
}

/// PortfolioFilter
///
/// Query parameters of `GET /services`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PortfolioFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ServiceStatus>,
    #[serde(alias = "isFeatured")]
    pub featured: Option<bool>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
}
