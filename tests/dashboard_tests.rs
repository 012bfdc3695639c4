mod common;

use common::TestContext;
use morphe_cms::{
    auth::AuthUser,
    models::{CreateJobRequest, CreatePortfolioRequest, CreatePostRequest},
    permissions::{SUPER_ADMIN, VIEWER},
    services::{careers, dashboard, portfolio, posts},
};
use serde_json::json;

/// One published and one draft post, an ongoing service, an active and a draft job,
/// and one application.
async fn seed_content(ctx: &TestContext, author: &AuthUser) {
    let repo = ctx.repo.as_ref();
    for (title, status) in [("Rust at Morphe", "published"), ("Draft Thoughts", "draft")] {
        let req: CreatePostRequest =
            serde_json::from_value(json!({ "title": title, "content": "Rust all the way", "status": status }))
                .unwrap();
        posts::create(repo, author, req).await.unwrap();
    }

    let service: CreatePortfolioRequest = serde_json::from_value(json!({
        "title": "Rust Consulting",
        "description": "Performance audits",
    }))
    .unwrap();
    portfolio::create(repo, author, service).await.unwrap();

    let mut active_id = 0;
    for (title, status) in [("Rust Engineer", "active"), ("Hidden Role", "draft")] {
        let req: CreateJobRequest = serde_json::from_value(json!({
            "title": title,
            "department": "Engineering",
            "description": "Write Rust",
            "status": status,
        }))
        .unwrap();
        let job = careers::create(repo, author, req).await.unwrap();
        if status == "active" {
            active_id = job.id;
        }
    }

    careers::apply(
        repo,
        active_id,
        serde_json::from_value(json!({
            "applicantName": "Ferris",
            "applicantEmail": "ferris@example.com",
            "resumeUrl": "https://example.com/ferris.pdf",
        }))
        .unwrap(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_staff_dashboard_shows_everything() {
    let ctx = TestContext::new();
    let admin = ctx.principal(SUPER_ADMIN, "admin@morphelabs.com").await;
    seed_content(&ctx, &admin).await;

    let stats = dashboard::stats(ctx.repo.as_ref(), &admin).await.unwrap();
    assert_eq!(stats.overview.total_users, Some(1));
    assert_eq!(stats.overview.total_posts, 2);
    assert_eq!(stats.overview.total_jobs, 2);
    assert_eq!(stats.overview.total_applications, Some(1));

    let breakdown = stats.breakdown.expect("staff get a breakdown");
    assert_eq!(breakdown.posts_published, 1);
    assert_eq!(breakdown.posts_draft, 1);
    assert_eq!(breakdown.jobs_active, 1);
    assert_eq!(breakdown.services_ongoing, 1);

    let kinds: Vec<&str> = stats.recent_activity.iter().map(|a| a.kind.as_str()).collect();
    assert!(kinds.contains(&"application"));
    assert_eq!(kinds.iter().filter(|k| **k == "post").count(), 2);
}

#[tokio::test]
async fn test_viewer_dashboard_only_shows_public_figures() {
    let ctx = TestContext::new();
    let admin = ctx.principal(SUPER_ADMIN, "admin@morphelabs.com").await;
    let viewer = ctx.principal(VIEWER, "viewer@morphelabs.com").await;
    seed_content(&ctx, &admin).await;

    let stats = dashboard::stats(ctx.repo.as_ref(), &viewer).await.unwrap();
    assert_eq!(stats.overview.total_users, None);
    assert_eq!(stats.overview.total_applications, None);
    assert_eq!(stats.overview.total_posts, 1);
    assert_eq!(stats.overview.total_jobs, 1);
    assert!(stats.breakdown.is_none());

    assert!(
        stats
            .recent_activity
            .iter()
            .all(|item| item.kind != "application" && item.status != "draft")
    );

    let body = serde_json::to_value(&stats).unwrap();
    assert!(body.get("breakdown").is_none());
    assert!(body["recentActivity"].is_array());
}

#[tokio::test]
async fn test_search_spans_posts_services_and_jobs() {
    let ctx = TestContext::new();
    let admin = ctx.principal(SUPER_ADMIN, "admin@morphelabs.com").await;
    seed_content(&ctx, &admin).await;

    let hits = dashboard::search(ctx.repo.as_ref(), Some("  rust ")).await.unwrap();
    let kinds: Vec<&str> = hits.iter().map(|h| h.kind.as_str()).collect();
    assert!(kinds.contains(&"post"));
    assert!(kinds.contains(&"service"));
    assert!(kinds.contains(&"job"));

    let service = hits.iter().find(|h| h.kind == "service").unwrap();
    assert_eq!(service.link, format!("/admin/services/{}", service.id));

    let none = dashboard::search(ctx.repo.as_ref(), Some("kotlin")).await.unwrap();
    assert!(none.is_empty());

    for short in [None, Some(""), Some(" r ")] {
        let err = dashboard::search(ctx.repo.as_ref(), short).await.unwrap_err();
        assert_eq!(err.to_string(), "Search query must be at least 2 characters");
    }
}
