use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{
    ActivityItem, ApplicationFilter, ApplicationListing, BlogPost, Category, ContentCounts,
    JobApplication, JobFilter, JobListing, MediaFile, MediaFilter, NewApplication, NewCategory,
    NewJob, NewMedia, NewPortfolioItem, NewPost, NewRole, NewUser, Page, PageOf, PortfolioFilter,
    PortfolioItem, PostFilter, Role, SearchHit, ServiceImage, ServiceImageInput, Tag, User,
    UserFilter, Visibility,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

pub type RepoResult<T> = Result<T, ApiError>;

/// Repository Trait
///
/// The persistence contract behind every domain service. Handlers never see it directly;
/// services receive it through `AppState` as `Arc<dyn Repository>` so the Postgres
/// implementation and the in-memory one used by tests are interchangeable.
///
/// Unless a method says otherwise, lookups ignore soft-deleted rows. Slug and email
/// "taken" checks deliberately include them, since the unique indexes do.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user(&self, id: i32) -> RepoResult<Option<User>>;
    /// Case-insensitive.
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_reset_token(&self, token: &str) -> RepoResult<Option<User>>;
    async fn email_taken(&self, email: &str, exclude: Option<i32>) -> RepoResult<bool>;
    async fn list_users(&self, filter: &UserFilter, page: Page) -> RepoResult<PageOf<User>>;
    async fn insert_user(&self, user: NewUser) -> RepoResult<User>;
    /// Writes every mutable column of `user` and bumps `updated_at`.
    async fn save_user(&self, user: &User) -> RepoResult<User>;
    /// Stamps `last_login_at` and nothing else.
    async fn touch_last_login(&self, id: i32) -> RepoResult<()>;
    /// Sets (or clears, with `None`) the reset token and its expiry only.
    async fn set_reset_token(
        &self,
        id: i32,
        token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> RepoResult<()>;
    /// Replaces the password hash and burns any pending reset token.
    async fn set_password(&self, id: i32, password_hash: &str) -> RepoResult<()>;
    async fn soft_delete_user(&self, id: i32) -> RepoResult<bool>;

    // --- Roles ---
    async fn find_role(&self, id: i32) -> RepoResult<Option<Role>>;
    async fn find_role_by_slug(&self, slug: &str) -> RepoResult<Option<Role>>;
    async fn list_roles(&self) -> RepoResult<Vec<Role>>;
    async fn insert_role(&self, role: NewRole) -> RepoResult<Role>;

    // --- Categories ---
    /// Ordered by display order, then name.
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn find_category(&self, id: i32) -> RepoResult<Option<Category>>;
    async fn find_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>>;
    async fn category_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool>;
    async fn insert_category(&self, category: NewCategory) -> RepoResult<Category>;
    async fn save_category(&self, category: &Category) -> RepoResult<Category>;
    /// Hard delete. Children become roots and posts lose the category.
    async fn delete_category(&self, id: i32) -> RepoResult<bool>;

    // --- Tags ---
    /// Ordered by name.
    async fn list_tags(&self) -> RepoResult<Vec<Tag>>;
    async fn find_tag(&self, id: i32) -> RepoResult<Option<Tag>>;
    async fn find_tag_by_slug(&self, slug: &str) -> RepoResult<Option<Tag>>;
    async fn find_tags(&self, ids: &[i32]) -> RepoResult<Vec<Tag>>;
    async fn tag_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool>;
    async fn insert_tag(&self, name: &str, slug: &str) -> RepoResult<Tag>;
    async fn save_tag(&self, tag: &Tag) -> RepoResult<Tag>;
    async fn delete_tag(&self, id: i32) -> RepoResult<bool>;
    async fn post_tags(&self, post_id: i32) -> RepoResult<Vec<Tag>>;

    // --- Blog posts ---
    async fn list_posts(
        &self,
        filter: &PostFilter,
        visibility: Visibility,
        page: Page,
    ) -> RepoResult<PageOf<BlogPost>>;
    async fn find_post(&self, id: i32) -> RepoResult<Option<BlogPost>>;
    async fn find_post_by_slug(&self, slug: &str) -> RepoResult<Option<BlogPost>>;
    async fn post_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool>;
    async fn insert_post(&self, post: NewPost) -> RepoResult<BlogPost>;
    async fn save_post(&self, post: &BlogPost) -> RepoResult<BlogPost>;
    /// Replaces the post's tag set and recomputes `usage_count` of every tag involved.
    async fn set_post_tags(&self, post_id: i32, tag_ids: &[i32]) -> RepoResult<()>;
    async fn increment_post_views(&self, id: i32) -> RepoResult<()>;
    async fn soft_delete_post(&self, id: i32) -> RepoResult<bool>;

    // --- Services (portfolio) ---
    async fn list_portfolio(
        &self,
        filter: &PortfolioFilter,
        visibility: Visibility,
        page: Page,
    ) -> RepoResult<PageOf<PortfolioItem>>;
    async fn find_portfolio_item(&self, id: i32) -> RepoResult<Option<PortfolioItem>>;
    async fn find_portfolio_item_by_slug(&self, slug: &str) -> RepoResult<Option<PortfolioItem>>;
    async fn portfolio_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool>;
    async fn insert_portfolio_item(&self, item: NewPortfolioItem) -> RepoResult<PortfolioItem>;
    async fn save_portfolio_item(&self, item: &PortfolioItem) -> RepoResult<PortfolioItem>;
    /// Drops the current gallery and inserts `images` in order.
    async fn replace_service_images(
        &self,
        service_id: i32,
        images: &[ServiceImageInput],
    ) -> RepoResult<Vec<ServiceImage>>;
    async fn service_images(&self, service_id: i32) -> RepoResult<Vec<ServiceImage>>;
    async fn soft_delete_portfolio_item(&self, id: i32) -> RepoResult<bool>;

    // --- Jobs ---
    async fn list_jobs(
        &self,
        filter: &JobFilter,
        visibility: Visibility,
        page: Page,
    ) -> RepoResult<PageOf<JobListing>>;
    async fn find_job(&self, id: i32) -> RepoResult<Option<JobListing>>;
    async fn find_job_by_slug(&self, slug: &str) -> RepoResult<Option<JobListing>>;
    async fn job_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool>;
    async fn insert_job(&self, job: NewJob) -> RepoResult<JobListing>;
    async fn save_job(&self, job: &JobListing) -> RepoResult<JobListing>;
    async fn soft_delete_job(&self, id: i32) -> RepoResult<bool>;
    async fn count_applications(&self, job_id: i32) -> RepoResult<i64>;

    // --- Applications ---
    /// Case-insensitive on the email.
    async fn find_application_by_job_email(
        &self,
        job_id: i32,
        email: &str,
    ) -> RepoResult<Option<JobApplication>>;
    async fn insert_application(&self, application: NewApplication) -> RepoResult<JobApplication>;
    async fn find_application(&self, id: i32) -> RepoResult<Option<JobApplication>>;
    async fn save_application(&self, application: &JobApplication) -> RepoResult<JobApplication>;
    /// Newest first.
    async fn list_job_applications(&self, job_id: i32) -> RepoResult<Vec<JobApplication>>;
    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: Page,
    ) -> RepoResult<PageOf<ApplicationListing>>;

    // --- Media ---
    async fn insert_media(&self, media: NewMedia) -> RepoResult<MediaFile>;
    async fn find_media(&self, id: i32) -> RepoResult<Option<MediaFile>>;
    async fn list_media(&self, filter: &MediaFilter, page: Page) -> RepoResult<PageOf<MediaFile>>;
    async fn save_media(&self, media: &MediaFile) -> RepoResult<MediaFile>;
    async fn soft_delete_media(&self, id: i32) -> RepoResult<bool>;

    // --- Dashboard ---
    async fn content_counts(&self) -> RepoResult<ContentCounts>;
    /// Latest `per_kind` posts, jobs and (for `Visibility::All`) applications, merged
    /// newest first.
    async fn recent_activity(
        &self,
        visibility: Visibility,
        per_kind: i64,
    ) -> RepoResult<Vec<ActivityItem>>;
    /// Up to `per_kind` hits each from posts, services and jobs.
    async fn search_content(&self, term: &str, per_kind: i64) -> RepoResult<Vec<SearchHit>>;
}

/// RepositoryState
///
/// The type shared through `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// Link the admin dashboard opens for a search hit.
pub(crate) fn admin_link(kind: &str, id: i32) -> String {
    let section = match kind {
        "post" => "blog",
        "service" => "services",
        _ => "careers",
    };
    format!("/admin/{section}/{id}")
}

/// ILIKE pattern for a free-text term. `%` and `_` in the term match literally.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
