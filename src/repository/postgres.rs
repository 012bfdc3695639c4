use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};

use super::{RepoResult, Repository, admin_link, like_pattern};
use crate::models::{
    ActivityItem, ApplicationFilter, ApplicationListing, BlogPost, Category, ContentCounts,
    JobApplication, JobFilter, JobListing, MediaFile, MediaFilter, NewApplication, NewCategory,
    NewJob, NewMedia, NewPortfolioItem, NewPost, NewRole, NewUser, Page, PageOf, PortfolioFilter,
    PortfolioItem, PostFilter, PostStatus, Role, SearchHit, ServiceImage, ServiceImageInput, Tag,
    User, UserFilter, Visibility,
};

// --- Column lists ---

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role_id, is_active, \
    last_login_at, reset_token, reset_token_expires_at, created_at, updated_at, deleted_at";

const ROLE_COLUMNS: &str = "id, name, slug, description, permissions, created_at, updated_at";

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, parent_id, display_order, created_at, updated_at";

const TAG_COLUMNS: &str = "id, name, slug, usage_count, created_at, updated_at";

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, status, featured_image, \
    published_at, scheduled_for, author_id, category_id, view_count, meta_title, \
    meta_description, meta_keywords, canonical_url, created_at, updated_at, deleted_at";

const SERVICE_COLUMNS: &str = "id, title, slug, description, client_name, project_url, \
    project_date, project_duration, status, featured, category, technologies, industry, \
    challenge, solution, results, metrics, created_by, display_order, created_at, updated_at, \
    deleted_at";

const SERVICE_IMAGE_COLUMNS: &str =
    "id, service_id, image_url, caption, is_primary, display_order, created_at";

const JOB_COLUMNS: &str = "id, title, slug, department, location_type, location_city, \
    location_region, remote_policy, employment_type, description, responsibilities, \
    qualifications_required, qualifications_preferred, benefits, salary_min, salary_max, \
    salary_currency, salary_visible, application_deadline, status, internal_notes, posted_by, \
    created_at, updated_at, deleted_at";

const APPLICATION_COLUMNS: &str = "id, job_id, applicant_name, applicant_email, \
    applicant_phone, resume_url, resume_filename, cover_letter, linkedin_url, portfolio_url, \
    status, notes, applied_at, updated_at";

const MEDIA_COLUMNS: &str = "id, filename, original_name, file_path, file_url, thumbnail_url, \
    file_type, mime_type, file_size, image_width, image_height, alt_text, uploaded_by, \
    created_at, updated_at, deleted_at";

/// Recomputes `usage_count` for the tags bound to `$1` from live posts only.
const RECOUNT_TAGS: &str = r#"
    UPDATE tags SET usage_count = (
        SELECT COUNT(*) FROM post_tags pt
        JOIN blog_posts p ON p.id = pt.post_id
        WHERE pt.tag_id = tags.id AND p.deleted_at IS NULL
    ), updated_at = NOW()
    WHERE id = ANY($1)
"#;

/// PostgresRepository
///
/// The production implementation of `Repository`. All dynamic filtering goes through
/// `QueryBuilder::push_bind`; user input never reaches the SQL text.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Shared by every "is this slug used?" check. `table` is always a literal.
    async fn slug_taken(&self, table: &str, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {table} WHERE slug = $1 AND ($2::int IS NULL OR id <> $2))"
        );
        let taken = sqlx::query_scalar::<_, bool>(&sql)
            .bind(slug)
            .bind(exclude)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }

    async fn soft_delete(&self, table: &str, id: i32) -> RepoResult<bool> {
        let sql = format!(
            "UPDATE {table} SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL"
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Runs the count and the page query for a list endpoint. `push_filters` appends the
    /// same `AND ...` clauses to both.
    async fn paged<T, F>(
        &self,
        columns: &str,
        from: &str,
        order_by: &str,
        page: Page,
        push_filters: F,
    ) -> RepoResult<PageOf<T>>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
        F: Fn(&mut QueryBuilder<'_, Postgres>),
    {
        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {from}"));
        push_filters(&mut count);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {columns} FROM {from}"));
        push_filters(&mut query);
        query.push(format!(" ORDER BY {order_by} LIMIT "));
        query.push_bind(page.limit);
        query.push(" OFFSET ");
        query.push_bind(page.offset());
        let items = query.build_query_as::<T>().fetch_all(&self.pool).await?;

        Ok(PageOf { items, total })
    }
}

// --- Filter builders ---

fn push_search(builder: &mut QueryBuilder<'_, Postgres>, columns: &[&str], term: &str) {
    let pattern = like_pattern(term);
    builder.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push(format!("{column} ILIKE "));
        builder.push_bind(pattern.clone());
    }
    builder.push(")");
}

fn non_empty(term: &Option<String>) -> Option<&str> {
    term.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

fn push_user_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(term) = non_empty(&filter.search) {
        push_search(builder, &["email", "full_name"], term);
    }
    if let Some(role_id) = filter.role_id {
        builder.push(" AND role_id = ").push_bind(role_id);
    }
    if let Some(is_active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
}

fn push_post_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &PostFilter,
    visibility: Visibility,
) {
    if visibility == Visibility::Public {
        builder.push(" AND status = ").push_bind(PostStatus::Published);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(category_id) = filter.category_id {
        builder.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(author_id) = filter.author_id {
        builder.push(" AND author_id = ").push_bind(author_id);
    }
    if let Some(tag_id) = filter.tag_id {
        builder
            .push(" AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = blog_posts.id AND pt.tag_id = ")
            .push_bind(tag_id)
            .push(")");
    }
    if let Some(term) = non_empty(&filter.search) {
        push_search(builder, &["title", "content"], term);
    }
}

fn push_portfolio_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &PortfolioFilter,
    visibility: Visibility,
) {
    if visibility == Visibility::Public {
        builder.push(" AND status <> 'archived'");
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(featured) = filter.featured {
        builder.push(" AND featured = ").push_bind(featured);
    }
    if let Some(term) = non_empty(&filter.search) {
        push_search(builder, &["title", "description"], term);
    }
}

fn push_job_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    filter: &JobFilter,
    visibility: Visibility,
) {
    if visibility == Visibility::Public {
        builder.push(" AND status = 'active'");
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(department) = non_empty(&filter.department) {
        builder
            .push(" AND LOWER(department) = LOWER(")
            .push_bind(department.to_string())
            .push(")");
    }
    if let Some(employment_type) = filter.employment_type {
        builder
            .push(" AND employment_type = ")
            .push_bind(employment_type);
    }
    if let Some(term) = non_empty(&filter.search) {
        push_search(builder, &["title", "description"], term);
    }
}

fn push_media_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &MediaFilter) {
    if let Some(file_type) = filter.file_type {
        builder.push(" AND file_type = ").push_bind(file_type);
    }
    if let Some(term) = non_empty(&filter.search) {
        push_search(builder, &["original_name", "filename", "alt_text"], term);
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Users ---

    async fn find_user(&self, id: i32) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1) AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_reset_token(&self, token: &str) -> RepoResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE reset_token = $1 AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn email_taken(&self, email: &str, exclude: Option<i32>) -> RepoResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn list_users(&self, filter: &UserFilter, page: Page) -> RepoResult<PageOf<User>> {
        self.paged(
            USER_COLUMNS,
            "users WHERE deleted_at IS NULL",
            "created_at DESC, id DESC",
            page,
            |b| push_user_filters(b, filter),
        )
        .await
    }

    async fn insert_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, full_name, role_id, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.full_name)
            .bind(user.role_id)
            .bind(user.is_active)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn save_user(&self, user: &User) -> RepoResult<User> {
        let sql = format!(
            "UPDATE users SET email = $1, password_hash = $2, full_name = $3, role_id = $4, \
             is_active = $5, last_login_at = $6, reset_token = $7, reset_token_expires_at = $8, \
             updated_at = NOW() WHERE id = $9 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .bind(user.role_id)
            .bind(user.is_active)
            .bind(user.last_login_at)
            .bind(&user.reset_token)
            .bind(user.reset_token_expires_at)
            .bind(user.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn touch_last_login(&self, id: i32) -> RepoResult<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: i32,
        token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> RepoResult<()> {
        sqlx::query(
            "UPDATE users SET reset_token = $1, reset_token_expires_at = $2, updated_at = NOW() \
             WHERE id = $3 AND deleted_at IS NULL",
        )
        .bind(token)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_password(&self, id: i32, password_hash: &str) -> RepoResult<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $1, reset_token = NULL, \
             reset_token_expires_at = NULL, updated_at = NOW() \
             WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn soft_delete_user(&self, id: i32) -> RepoResult<bool> {
        self.soft_delete("users", id).await
    }

    // --- Roles ---

    async fn find_role(&self, id: i32) -> RepoResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1");
        Ok(sqlx::query_as::<_, Role>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_role_by_slug(&self, slug: &str) -> RepoResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE slug = $1");
        Ok(sqlx::query_as::<_, Role>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY id");
        Ok(sqlx::query_as::<_, Role>(&sql).fetch_all(&self.pool).await?)
    }

    async fn insert_role(&self, role: NewRole) -> RepoResult<Role> {
        let sql = format!(
            "INSERT INTO roles (name, slug, description, permissions) VALUES ($1, $2, $3, $4) \
             RETURNING {ROLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Role>(&sql)
            .bind(role.name)
            .bind(role.slug)
            .bind(role.description)
            .bind(role.permissions.to_json())
            .fetch_one(&self.pool)
            .await?)
    }

    // --- Categories ---

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY display_order, name");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_category(&self, id: i32) -> RepoResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn category_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        self.slug_taken("categories", slug, exclude).await
    }

    async fn insert_category(&self, category: NewCategory) -> RepoResult<Category> {
        let sql = format!(
            "INSERT INTO categories (name, slug, description, parent_id, display_order) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CATEGORY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(category.name)
            .bind(category.slug)
            .bind(category.description)
            .bind(category.parent_id)
            .bind(category.display_order)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn save_category(&self, category: &Category) -> RepoResult<Category> {
        let sql = format!(
            "UPDATE categories SET name = $1, slug = $2, description = $3, parent_id = $4, \
             display_order = $5, updated_at = NOW() WHERE id = $6 RETURNING {CATEGORY_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .bind(category.parent_id)
            .bind(category.display_order)
            .bind(category.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_category(&self, id: i32) -> RepoResult<bool> {
        // Foreign keys are ON DELETE SET NULL for both children and posts.
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Tags ---

    async fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name");
        Ok(sqlx::query_as::<_, Tag>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_tag(&self, id: i32) -> RepoResult<Option<Tag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = $1");
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_tag_by_slug(&self, slug: &str) -> RepoResult<Option<Tag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE slug = $1");
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_tags(&self, ids: &[i32]) -> RepoResult<Vec<Tag>> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ANY($1) ORDER BY name");
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn tag_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        self.slug_taken("tags", slug, exclude).await
    }

    async fn insert_tag(&self, name: &str, slug: &str) -> RepoResult<Tag> {
        let sql = format!("INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING {TAG_COLUMNS}");
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(name)
            .bind(slug)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn save_tag(&self, tag: &Tag) -> RepoResult<Tag> {
        let sql = format!(
            "UPDATE tags SET name = $1, slug = $2, updated_at = NOW() WHERE id = $3 \
             RETURNING {TAG_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(&tag.name)
            .bind(&tag.slug)
            .bind(tag.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_tag(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn post_tags(&self, post_id: i32) -> RepoResult<Vec<Tag>> {
        let sql = format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE id IN \
             (SELECT tag_id FROM post_tags WHERE post_id = $1) ORDER BY name"
        );
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    // --- Blog posts ---

    async fn list_posts(
        &self,
        filter: &PostFilter,
        visibility: Visibility,
        page: Page,
    ) -> RepoResult<PageOf<BlogPost>> {
        self.paged(
            POST_COLUMNS,
            "blog_posts WHERE deleted_at IS NULL",
            "published_at DESC NULLS LAST, created_at DESC, id DESC",
            page,
            |b| push_post_filters(b, filter, visibility),
        )
        .await
    }

    async fn find_post(&self, id: i32) -> RepoResult<Option<BlogPost>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1 AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_post_by_slug(&self, slug: &str) -> RepoResult<Option<BlogPost>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = $1 AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn post_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        self.slug_taken("blog_posts", slug, exclude).await
    }

    async fn insert_post(&self, post: NewPost) -> RepoResult<BlogPost> {
        let sql = format!(
            "INSERT INTO blog_posts (title, slug, content, excerpt, status, featured_image, \
             published_at, scheduled_for, author_id, category_id, meta_title, meta_description, \
             meta_keywords, canonical_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(post.title)
            .bind(post.slug)
            .bind(post.content)
            .bind(post.excerpt)
            .bind(post.status)
            .bind(post.featured_image)
            .bind(post.published_at)
            .bind(post.scheduled_for)
            .bind(post.author_id)
            .bind(post.category_id)
            .bind(post.meta_title)
            .bind(post.meta_description)
            .bind(post.meta_keywords)
            .bind(post.canonical_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn save_post(&self, post: &BlogPost) -> RepoResult<BlogPost> {
        let sql = format!(
            "UPDATE blog_posts SET title = $1, slug = $2, content = $3, excerpt = $4, \
             status = $5, featured_image = $6, published_at = $7, scheduled_for = $8, \
             category_id = $9, meta_title = $10, meta_description = $11, meta_keywords = $12, \
             canonical_url = $13, updated_at = NOW() WHERE id = $14 RETURNING {POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.content)
            .bind(&post.excerpt)
            .bind(post.status)
            .bind(&post.featured_image)
            .bind(post.published_at)
            .bind(post.scheduled_for)
            .bind(post.category_id)
            .bind(&post.meta_title)
            .bind(&post.meta_description)
            .bind(&post.meta_keywords)
            .bind(&post.canonical_url)
            .bind(post.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn set_post_tags(&self, post_id: i32, tag_ids: &[i32]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let mut affected: Vec<i32> =
            sqlx::query_scalar("SELECT tag_id FROM post_tags WHERE post_id = $1")
                .bind(post_id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO post_tags (post_id, tag_id) SELECT $1, UNNEST($2::int[]) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(tag_ids)
        .execute(&mut *tx)
        .await?;

        affected.extend_from_slice(tag_ids);
        sqlx::query(RECOUNT_TAGS)
            .bind(&affected)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn increment_post_views(&self, id: i32) -> RepoResult<()> {
        sqlx::query("UPDATE blog_posts SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn soft_delete_post(&self, id: i32) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE blog_posts SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let tag_ids: Vec<i32> =
            sqlx::query_scalar("SELECT tag_id FROM post_tags WHERE post_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        sqlx::query(RECOUNT_TAGS)
            .bind(&tag_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Services (portfolio) ---

    async fn list_portfolio(
        &self,
        filter: &PortfolioFilter,
        visibility: Visibility,
        page: Page,
    ) -> RepoResult<PageOf<PortfolioItem>> {
        self.paged(
            SERVICE_COLUMNS,
            "services WHERE deleted_at IS NULL",
            "display_order ASC, created_at DESC, id DESC",
            page,
            |b| push_portfolio_filters(b, filter, visibility),
        )
        .await
    }

    async fn find_portfolio_item(&self, id: i32) -> RepoResult<Option<PortfolioItem>> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1 AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, PortfolioItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_portfolio_item_by_slug(&self, slug: &str) -> RepoResult<Option<PortfolioItem>> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE slug = $1 AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, PortfolioItem>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn portfolio_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        self.slug_taken("services", slug, exclude).await
    }

    async fn insert_portfolio_item(&self, item: NewPortfolioItem) -> RepoResult<PortfolioItem> {
        let sql = format!(
            "INSERT INTO services (title, slug, description, client_name, project_url, \
             project_date, project_duration, status, featured, category, technologies, industry, \
             challenge, solution, results, metrics, created_by, display_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {SERVICE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, PortfolioItem>(&sql)
            .bind(item.title)
            .bind(item.slug)
            .bind(item.description)
            .bind(item.client_name)
            .bind(item.project_url)
            .bind(item.project_date)
            .bind(item.project_duration)
            .bind(item.status)
            .bind(item.featured)
            .bind(item.category)
            .bind(item.technologies)
            .bind(item.industry)
            .bind(item.challenge)
            .bind(item.solution)
            .bind(item.results)
            .bind(item.metrics)
            .bind(item.created_by)
            .bind(item.display_order)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn save_portfolio_item(&self, item: &PortfolioItem) -> RepoResult<PortfolioItem> {
        let sql = format!(
            "UPDATE services SET title = $1, slug = $2, description = $3, client_name = $4, \
             project_url = $5, project_date = $6, project_duration = $7, status = $8, \
             featured = $9, category = $10, technologies = $11, industry = $12, challenge = $13, \
             solution = $14, results = $15, metrics = $16, display_order = $17, \
             updated_at = NOW() WHERE id = $18 RETURNING {SERVICE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, PortfolioItem>(&sql)
            .bind(&item.title)
            .bind(&item.slug)
            .bind(&item.description)
            .bind(&item.client_name)
            .bind(&item.project_url)
            .bind(item.project_date)
            .bind(&item.project_duration)
            .bind(item.status)
            .bind(item.featured)
            .bind(&item.category)
            .bind(&item.technologies)
            .bind(&item.industry)
            .bind(&item.challenge)
            .bind(&item.solution)
            .bind(&item.results)
            .bind(&item.metrics)
            .bind(item.display_order)
            .bind(item.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn replace_service_images(
        &self,
        service_id: i32,
        images: &[ServiceImageInput],
    ) -> RepoResult<Vec<ServiceImage>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM service_images WHERE service_id = $1")
            .bind(service_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "INSERT INTO service_images (service_id, image_url, caption, is_primary, display_order) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SERVICE_IMAGE_COLUMNS}"
        );
        let mut saved = Vec::with_capacity(images.len());
        for (position, image) in images.iter().enumerate() {
            let row = sqlx::query_as::<_, ServiceImage>(&sql)
                .bind(service_id)
                .bind(&image.image_url)
                .bind(&image.caption)
                .bind(image.is_primary)
                .bind(image.display_order.unwrap_or(position as i32))
                .fetch_one(&mut *tx)
                .await?;
            saved.push(row);
        }

        tx.commit().await?;
        Ok(saved)
    }

    async fn service_images(&self, service_id: i32) -> RepoResult<Vec<ServiceImage>> {
        let sql = format!(
            "SELECT {SERVICE_IMAGE_COLUMNS} FROM service_images WHERE service_id = $1 \
             ORDER BY display_order, id"
        );
        Ok(sqlx::query_as::<_, ServiceImage>(&sql)
            .bind(service_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn soft_delete_portfolio_item(&self, id: i32) -> RepoResult<bool> {
        self.soft_delete("services", id).await
    }

    // --- Jobs ---

    async fn list_jobs(
        &self,
        filter: &JobFilter,
        visibility: Visibility,
        page: Page,
    ) -> RepoResult<PageOf<JobListing>> {
        self.paged(
            JOB_COLUMNS,
            "job_listings WHERE deleted_at IS NULL",
            "created_at DESC, id DESC",
            page,
            |b| push_job_filters(b, filter, visibility),
        )
        .await
    }

    async fn find_job(&self, id: i32) -> RepoResult<Option<JobListing>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM job_listings WHERE id = $1 AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, JobListing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_job_by_slug(&self, slug: &str) -> RepoResult<Option<JobListing>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM job_listings WHERE slug = $1 AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, JobListing>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn job_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        self.slug_taken("job_listings", slug, exclude).await
    }

    async fn insert_job(&self, job: NewJob) -> RepoResult<JobListing> {
        let sql = format!(
            "INSERT INTO job_listings (title, slug, department, location_type, location_city, \
             location_region, remote_policy, employment_type, description, responsibilities, \
             qualifications_required, qualifications_preferred, benefits, salary_min, salary_max, \
             salary_currency, salary_visible, application_deadline, status, internal_notes, \
             posted_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
             $18, $19, $20, $21) RETURNING {JOB_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, JobListing>(&sql)
            .bind(job.title)
            .bind(job.slug)
            .bind(job.department)
            .bind(job.location_type)
            .bind(job.location_city)
            .bind(job.location_region)
            .bind(job.remote_policy)
            .bind(job.employment_type)
            .bind(job.description)
            .bind(job.responsibilities)
            .bind(job.qualifications_required)
            .bind(job.qualifications_preferred)
            .bind(job.benefits)
            .bind(job.salary_min)
            .bind(job.salary_max)
            .bind(job.salary_currency)
            .bind(job.salary_visible)
            .bind(job.application_deadline)
            .bind(job.status)
            .bind(job.internal_notes)
            .bind(job.posted_by)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn save_job(&self, job: &JobListing) -> RepoResult<JobListing> {
        let sql = format!(
            "UPDATE job_listings SET title = $1, slug = $2, department = $3, location_type = $4, \
             location_city = $5, location_region = $6, remote_policy = $7, employment_type = $8, \
             description = $9, responsibilities = $10, qualifications_required = $11, \
             qualifications_preferred = $12, benefits = $13, salary_min = $14, salary_max = $15, \
             salary_currency = $16, salary_visible = $17, application_deadline = $18, \
             status = $19, internal_notes = $20, updated_at = NOW() WHERE id = $21 \
             RETURNING {JOB_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, JobListing>(&sql)
            .bind(&job.title)
            .bind(&job.slug)
            .bind(&job.department)
            .bind(job.location_type)
            .bind(&job.location_city)
            .bind(&job.location_region)
            .bind(&job.remote_policy)
            .bind(job.employment_type)
            .bind(&job.description)
            .bind(&job.responsibilities)
            .bind(&job.qualifications_required)
            .bind(&job.qualifications_preferred)
            .bind(&job.benefits)
            .bind(job.salary_min)
            .bind(job.salary_max)
            .bind(&job.salary_currency)
            .bind(job.salary_visible)
            .bind(job.application_deadline)
            .bind(job.status)
            .bind(&job.internal_notes)
            .bind(job.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn soft_delete_job(&self, id: i32) -> RepoResult<bool> {
        self.soft_delete("job_listings", id).await
    }

    async fn count_applications(&self, job_id: i32) -> RepoResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM job_applications WHERE job_id = $1")
                .bind(job_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // --- Applications ---

    async fn find_application_by_job_email(
        &self,
        job_id: i32,
        email: &str,
    ) -> RepoResult<Option<JobApplication>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications \
             WHERE job_id = $1 AND LOWER(applicant_email) = LOWER($2)"
        );
        Ok(sqlx::query_as::<_, JobApplication>(&sql)
            .bind(job_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_application(&self, application: NewApplication) -> RepoResult<JobApplication> {
        let sql = format!(
            "INSERT INTO job_applications (job_id, applicant_name, applicant_email, \
             applicant_phone, resume_url, resume_filename, cover_letter, linkedin_url, \
             portfolio_url) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {APPLICATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, JobApplication>(&sql)
            .bind(application.job_id)
            .bind(application.applicant_name)
            .bind(application.applicant_email)
            .bind(application.applicant_phone)
            .bind(application.resume_url)
            .bind(application.resume_filename)
            .bind(application.cover_letter)
            .bind(application.linkedin_url)
            .bind(application.portfolio_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_application(&self, id: i32) -> RepoResult<Option<JobApplication>> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = $1");
        Ok(sqlx::query_as::<_, JobApplication>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn save_application(&self, application: &JobApplication) -> RepoResult<JobApplication> {
        let sql = format!(
            "UPDATE job_applications SET status = $1, notes = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING {APPLICATION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, JobApplication>(&sql)
            .bind(application.status)
            .bind(&application.notes)
            .bind(application.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_job_applications(&self, job_id: i32) -> RepoResult<Vec<JobApplication>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE job_id = $1 \
             ORDER BY applied_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, JobApplication>(&sql)
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: Page,
    ) -> RepoResult<PageOf<ApplicationListing>> {
        let columns = APPLICATION_COLUMNS
            .split(", ")
            .map(|c| format!("a.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        self.paged(
            &format!("{columns}, j.title AS job_title"),
            "job_applications a JOIN job_listings j ON j.id = a.job_id WHERE TRUE",
            "a.applied_at DESC, a.id DESC",
            page,
            |b| {
                if let Some(status) = filter.status {
                    b.push(" AND a.status = ").push_bind(status);
                }
                if let Some(job_id) = filter.job_id {
                    b.push(" AND a.job_id = ").push_bind(job_id);
                }
            },
        )
        .await
    }

    // --- Media ---

    async fn insert_media(&self, media: NewMedia) -> RepoResult<MediaFile> {
        let sql = format!(
            "INSERT INTO media_files (filename, original_name, file_path, file_url, \
             thumbnail_url, file_type, mime_type, file_size, image_width, image_height, alt_text, \
             uploaded_by) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {MEDIA_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, MediaFile>(&sql)
            .bind(media.filename)
            .bind(media.original_name)
            .bind(media.file_path)
            .bind(media.file_url)
            .bind(media.thumbnail_url)
            .bind(media.file_type)
            .bind(media.mime_type)
            .bind(media.file_size)
            .bind(media.image_width)
            .bind(media.image_height)
            .bind(media.alt_text)
            .bind(media.uploaded_by)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_media(&self, id: i32) -> RepoResult<Option<MediaFile>> {
        let sql = format!(
            "SELECT {MEDIA_COLUMNS} FROM media_files WHERE id = $1 AND deleted_at IS NULL"
        );
        Ok(sqlx::query_as::<_, MediaFile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_media(&self, filter: &MediaFilter, page: Page) -> RepoResult<PageOf<MediaFile>> {
        self.paged(
            MEDIA_COLUMNS,
            "media_files WHERE deleted_at IS NULL",
            "created_at DESC, id DESC",
            page,
            |b| push_media_filters(b, filter),
        )
        .await
    }

    async fn save_media(&self, media: &MediaFile) -> RepoResult<MediaFile> {
        let sql = format!(
            "UPDATE media_files SET alt_text = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING {MEDIA_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, MediaFile>(&sql)
            .bind(&media.alt_text)
            .bind(media.id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn soft_delete_media(&self, id: i32) -> RepoResult<bool> {
        self.soft_delete("media_files", id).await
    }

    // --- Dashboard ---

    async fn content_counts(&self) -> RepoResult<ContentCounts> {
        let counts = sqlx::query_as::<_, ContentCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE deleted_at IS NULL) AS users,
                (SELECT COUNT(*) FROM blog_posts WHERE deleted_at IS NULL) AS posts,
                (SELECT COUNT(*) FROM blog_posts WHERE deleted_at IS NULL AND status = 'published') AS posts_published,
                (SELECT COUNT(*) FROM blog_posts WHERE deleted_at IS NULL AND status = 'draft') AS posts_draft,
                (SELECT COUNT(*) FROM services WHERE deleted_at IS NULL) AS services,
                (SELECT COUNT(*) FROM services WHERE deleted_at IS NULL AND status = 'ongoing') AS services_ongoing,
                (SELECT COUNT(*) FROM services WHERE deleted_at IS NULL AND status = 'completed') AS services_completed,
                (SELECT COUNT(*) FROM services WHERE deleted_at IS NULL AND status = 'archived') AS services_archived,
                (SELECT COUNT(*) FROM job_listings WHERE deleted_at IS NULL) AS jobs,
                (SELECT COUNT(*) FROM job_listings WHERE deleted_at IS NULL AND status = 'active') AS jobs_active,
                (SELECT COUNT(*) FROM job_listings WHERE deleted_at IS NULL AND status = 'closed') AS jobs_closed,
                (SELECT COUNT(*) FROM job_applications) AS applications,
                (SELECT COUNT(*) FROM media_files WHERE deleted_at IS NULL) AS media
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn recent_activity(
        &self,
        visibility: Visibility,
        per_kind: i64,
    ) -> RepoResult<Vec<ActivityItem>> {
        type Row = (i32, String, String, DateTime<Utc>);
        let public = visibility == Visibility::Public;

        let posts = sqlx::query_as::<_, Row>(
            "SELECT id, title, status::text, created_at FROM blog_posts \
             WHERE deleted_at IS NULL AND (NOT $1 OR status = 'published') \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(public)
        .bind(per_kind)
        .fetch_all(&self.pool)
        .await?;

        let jobs = sqlx::query_as::<_, Row>(
            "SELECT id, title, status::text, created_at FROM job_listings \
             WHERE deleted_at IS NULL AND (NOT $1 OR status = 'active') \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(public)
        .bind(per_kind)
        .fetch_all(&self.pool)
        .await?;

        let applications = if public {
            Vec::new()
        } else {
            sqlx::query_as::<_, Row>(
                "SELECT a.id, a.applicant_name || ' applied for ' || j.title, a.status::text, \
                 a.applied_at FROM job_applications a JOIN job_listings j ON j.id = a.job_id \
                 ORDER BY a.applied_at DESC LIMIT $1",
            )
            .bind(per_kind)
            .fetch_all(&self.pool)
            .await?
        };

        let tagged = |kind: &'static str, rows: Vec<Row>| {
            rows.into_iter()
                .map(move |(id, title, status, created_at)| ActivityItem {
                    kind: kind.to_string(),
                    id,
                    title,
                    status,
                    created_at,
                })
        };
        let mut items: Vec<ActivityItem> = tagged("post", posts)
            .chain(tagged("job", jobs))
            .chain(tagged("application", applications))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn search_content(&self, term: &str, per_kind: i64) -> RepoResult<Vec<SearchHit>> {
        type Row = (i32, String, String);
        let pattern = like_pattern(term);
        let sources = [
            ("post", "blog_posts", "content"),
            ("service", "services", "description"),
            ("job", "job_listings", "description"),
        ];

        let mut hits = Vec::new();
        for (kind, table, body) in sources {
            let sql = format!(
                "SELECT id, title, status::text FROM {table} \
                 WHERE deleted_at IS NULL AND (title ILIKE $1 OR {body} ILIKE $1) \
                 ORDER BY created_at DESC LIMIT $2"
            );
            let rows = sqlx::query_as::<_, Row>(&sql)
                .bind(&pattern)
                .bind(per_kind)
                .fetch_all(&self.pool)
                .await?;
            hits.extend(rows.into_iter().map(|(id, title, status)| SearchHit {
                kind: kind.to_string(),
                link: admin_link(kind, id),
                id,
                title,
                status,
            }));
        }
        Ok(hits)
    }
}
