//! Runs the Postgres repository against a real database. Every test is ignored by
//! default; run them with `cargo test -- --ignored` and `DATABASE_URL` pointing at a
//! disposable database.

use morphe_cms::{
    models::{NewPost, NewUser, PostStatus},
    permissions::EDITOR,
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Unique suffix so reruns against the same database do not collide.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..8])
}

async fn create_editor(repo: &PostgresRepository) -> i32 {
    let role = repo
        .find_role_by_slug(EDITOR)
        .await
        .unwrap()
        .expect("roles are seeded by the migration");
    repo.insert_user(NewUser {
        email: format!("{}@test.morphelabs.com", unique("editor")),
        password_hash: "not-a-real-hash".to_string(),
        full_name: "Test Editor".to_string(),
        role_id: role.id,
        is_active: true,
    })
    .await
    .unwrap()
    .id
}

fn draft_post(author_id: i32, slug: &str) -> NewPost {
    NewPost {
        title: slug.to_string(),
        slug: slug.to_string(),
        content: "Body".to_string(),
        excerpt: None,
        status: PostStatus::Draft,
        featured_image: None,
        published_at: None,
        scheduled_for: None,
        author_id,
        category_id: None,
        meta_title: None,
        meta_description: None,
        meta_keywords: None,
        canonical_url: None,
    }
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_seeded_roles_decode_permissions() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let roles = repo.list_roles().await.unwrap();
    let slugs: Vec<&str> = roles.iter().map(|r| r.slug.as_str()).collect();
    assert!(slugs.contains(&"super-admin"));
    assert!(slugs.contains(&"editor"));
    assert!(slugs.contains(&"viewer"));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_soft_deleted_user_keeps_email_reserved() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let id = create_editor(&repo).await;
    let user = repo.find_user(id).await.unwrap().unwrap();

    assert!(repo.soft_delete_user(id).await.unwrap());
    assert!(repo.find_user(id).await.unwrap().is_none());
    assert!(repo.email_taken(&user.email, None).await.unwrap());
    assert!(!repo.soft_delete_user(id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_tag_usage_follows_live_posts() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_editor(&repo).await;

    let tag_slug = unique("tag");
    let tag = repo.insert_tag(&tag_slug, &tag_slug).await.unwrap();
    assert_eq!(tag.usage_count, 0);

    let post = repo.insert_post(draft_post(author, &unique("post"))).await.unwrap();
    repo.set_post_tags(post.id, &[tag.id]).await.unwrap();
    assert_eq!(repo.find_tag(tag.id).await.unwrap().unwrap().usage_count, 1);
    assert_eq!(repo.post_tags(post.id).await.unwrap().len(), 1);

    repo.set_post_tags(post.id, &[]).await.unwrap();
    assert_eq!(repo.find_tag(tag.id).await.unwrap().unwrap().usage_count, 0);

    assert!(repo.delete_tag(tag.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_post_slugs_stay_reserved_after_delete() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_editor(&repo).await;

    let slug = unique("launch");
    let post = repo.insert_post(draft_post(author, &slug)).await.unwrap();
    assert!(repo.post_slug_taken(&slug, None).await.unwrap());
    assert!(!repo.post_slug_taken(&slug, Some(post.id)).await.unwrap());

    repo.increment_post_views(post.id).await.unwrap();
    assert_eq!(repo.find_post(post.id).await.unwrap().unwrap().view_count, 1);

    assert!(repo.soft_delete_post(post.id).await.unwrap());
    assert!(repo.find_post_by_slug(&slug).await.unwrap().is_none());
    assert!(repo.post_slug_taken(&slug, None).await.unwrap());
}
