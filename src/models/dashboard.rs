use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Raw counts over live (non-deleted) rows, gathered by the repository in one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct ContentCounts {
    pub users: i64,
    pub posts: i64,
    pub posts_published: i64,
    pub posts_draft: i64,
    pub services: i64,
    pub services_ongoing: i64,
    pub services_completed: i64,
    pub services_archived: i64,
    pub jobs: i64,
    pub jobs_active: i64,
    pub jobs_closed: i64,
    pub applications: i64,
    pub media: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<i64>,
    pub total_posts: i64,
    pub total_services: i64,
    pub total_jobs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_applications: Option<i64>,
    pub total_media: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub posts_published: i64,
    pub posts_draft: i64,
    pub jobs_active: i64,
    pub jobs_closed: i64,
    pub services_ongoing: i64,
    pub services_completed: i64,
}

/// One row of the merged recent-activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i32,
    pub title: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// DashboardStats
///
/// Body of `GET /dashboard/stats`. `breakdown` is omitted for viewers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overview: Overview,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Breakdown>,
    pub recent_activity: Vec<ActivityItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i32,
    pub title: String,
    pub status: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// At least two characters.
    pub q: Option<String>,
}
