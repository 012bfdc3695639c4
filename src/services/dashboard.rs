use super::search_term;
use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{Breakdown, ContentCounts, DashboardStats, Overview, SearchHit, Visibility},
    repository::Repository,
};

/// Rows per kind in the activity feed and in search results.
pub const PER_KIND: i64 = 5;
pub const MIN_SEARCH_LEN: usize = 2;

/// Figures for staff: everything that is not deleted.
fn staff_view(counts: &ContentCounts) -> (Overview, Option<Breakdown>) {
    let overview = Overview {
        total_users: Some(counts.users),
        total_posts: counts.posts,
        total_services: counts.services,
        total_jobs: counts.jobs,
        total_applications: Some(counts.applications),
        total_media: counts.media,
    };
    let breakdown = Breakdown {
        posts_published: counts.posts_published,
        posts_draft: counts.posts_draft,
        jobs_active: counts.jobs_active,
        jobs_closed: counts.jobs_closed,
        services_ongoing: counts.services_ongoing,
        services_completed: counts.services_completed,
    };
    (overview, Some(breakdown))
}

/// Figures a viewer may see: only what anonymous visitors could reach anyway.
fn public_view(counts: &ContentCounts) -> (Overview, Option<Breakdown>) {
    let overview = Overview {
        total_users: None,
        total_posts: counts.posts_published,
        total_services: counts.services - counts.services_archived,
        total_jobs: counts.jobs_active,
        total_applications: None,
        total_media: counts.media,
    };
    (overview, None)
}

/// stats
///
/// Role-scoped overview plus the merged recent-activity feed.
pub async fn stats(repo: &dyn Repository, principal: &AuthUser) -> Result<DashboardStats, ApiError> {
    let counts = repo.content_counts().await?;
    let visibility = principal.visibility();
    let (overview, breakdown) = match visibility {
        Visibility::All => staff_view(&counts),
        Visibility::Public => public_view(&counts),
    };
    let recent_activity = repo.recent_activity(visibility, PER_KIND).await?;

    Ok(DashboardStats {
        overview,
        breakdown,
        recent_activity,
    })
}

/// Case-insensitive title/body search over posts, services and jobs.
pub async fn search(repo: &dyn Repository, q: Option<&str>) -> Result<Vec<SearchHit>, ApiError> {
    let term = search_term(q)
        .filter(|term| term.chars().count() >= MIN_SEARCH_LEN)
        .ok_or_else(|| {
            ApiError::bad_request(format!(
                "Search query must be at least {MIN_SEARCH_LEN} characters"
            ))
        })?;
    repo.search_content(term, PER_KIND).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> ContentCounts {
        ContentCounts {
            users: 4,
            posts: 10,
            posts_published: 6,
            posts_draft: 4,
            services: 5,
            services_ongoing: 2,
            services_completed: 2,
            services_archived: 1,
            jobs: 3,
            jobs_active: 1,
            jobs_closed: 1,
            applications: 7,
            media: 12,
        }
    }

    #[test]
    fn viewers_only_get_public_figures() {
        let (overview, breakdown) = public_view(&counts());
        assert!(breakdown.is_none());
        assert_eq!(overview.total_users, None);
        assert_eq!(overview.total_applications, None);
        assert_eq!(overview.total_posts, 6);
        assert_eq!(overview.total_services, 4);
        assert_eq!(overview.total_jobs, 1);
        assert_eq!(overview.total_media, 12);
    }

    #[test]
    fn staff_get_everything() {
        let (overview, breakdown) = staff_view(&counts());
        assert_eq!(overview.total_users, Some(4));
        assert_eq!(overview.total_applications, Some(7));
        assert_eq!(overview.total_posts, 10);
        assert_eq!(breakdown.unwrap().posts_draft, 4);
    }
}
