use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{RepoResult, Repository, admin_link};
use crate::error::ApiError;
use crate::models::{
    ActivityItem, ApplicationFilter, ApplicationListing, ApplicationStatus, BlogPost, Category,
    ContentCounts, JobApplication, JobFilter, JobListing, JobStatus, MediaFile, MediaFilter,
    NewApplication, NewCategory, NewJob, NewMedia, NewPortfolioItem, NewPost, NewRole, NewUser,
    Page, PageOf, PortfolioFilter, PortfolioItem, PostFilter, PostStatus, Role, SearchHit,
    ServiceImage, ServiceImageInput, ServiceStatus, Tag, User, UserFilter, Visibility,
};
use crate::permissions::{self, EDITOR, SUPER_ADMIN, VIEWER};

/// Same wording the Postgres unique-violation mapping produces.
const DUPLICATE: &str = "Resource already exists";

#[derive(Default)]
struct Store {
    sequences: BTreeMap<&'static str, i32>,
    users: Vec<User>,
    roles: Vec<Role>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    posts: Vec<BlogPost>,
    /// (post_id, tag_id)
    post_tags: Vec<(i32, i32)>,
    services: Vec<PortfolioItem>,
    service_images: Vec<ServiceImage>,
    jobs: Vec<JobListing>,
    applications: Vec<JobApplication>,
    media: Vec<MediaFile>,
}

impl Store {
    fn next_id(&mut self, table: &'static str) -> i32 {
        let id = self.sequences.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn recount_tags(&mut self, tag_ids: &[i32]) {
        let now = Utc::now();
        for tag in self.tags.iter_mut().filter(|t| tag_ids.contains(&t.id)) {
            let live = self
                .post_tags
                .iter()
                .filter(|(post_id, tag_id)| {
                    *tag_id == tag.id
                        && self
                            .posts
                            .iter()
                            .any(|p| p.id == *post_id && p.deleted_at.is_none())
                })
                .count();
            tag.usage_count = live as i32;
            tag.updated_at = now;
        }
    }

    fn tags_of(&self, post_id: i32) -> Vec<i32> {
        self.post_tags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .map(|(_, t)| *t)
            .collect()
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory. It mirrors the Postgres semantics the
/// services rely on (soft deletes, unique slugs and emails including deleted rows, tag
/// usage counts, category detachment) so the whole HTTP surface can be exercised without
/// a database. Seeded with the three built-in roles.
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        let mut store = Store::default();
        let now = Utc::now();
        let seeds = [
            ("Super Admin", SUPER_ADMIN, permissions::super_admin_permissions()),
            ("Editor", EDITOR, permissions::editor_permissions()),
            ("Viewer", VIEWER, permissions::viewer_permissions()),
        ];
        for (name, slug, permissions) in seeds {
            let id = store.next_id("roles");
            store.roles.push(Role {
                id,
                name: name.to_string(),
                slug: slug.to_string(),
                description: None,
                permissions,
                created_at: now,
                updated_at: now,
            });
        }
        Self {
            store: Mutex::new(store),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` to the live user `id`, if there is one.
    fn with_live_user(&self, id: i32, change: impl FnOnce(&mut User)) {
        if let Some(user) = self
            .lock()
            .users
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
        {
            change(user);
        }
    }

    // --- Inspection helpers (soft-deleted rows included) ---

    pub fn user_row(&self, id: i32) -> Option<User> {
        self.lock().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn post_row(&self, id: i32) -> Option<BlogPost> {
        self.lock().posts.iter().find(|p| p.id == id).cloned()
    }

    pub fn media_row(&self, id: i32) -> Option<MediaFile> {
        self.lock().media.iter().find(|m| m.id == id).cloned()
    }
}

fn paginate<T>(rows: Vec<T>, page: Page) -> PageOf<T> {
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    PageOf { items, total }
}

/// Lowercased, trimmed search term, or `None` when blank.
fn needle(term: &Option<String>) -> Option<String> {
    term.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn matches(needle: &str, fields: &[Option<&str>]) -> bool {
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- Users ---

    async fn find_user(&self, id: i32) -> RepoResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email) && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_user_by_reset_token(&self, token: &str) -> RepoResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.reset_token.as_deref() == Some(token) && u.deleted_at.is_none())
            .cloned())
    }

    async fn email_taken(&self, email: &str, exclude: Option<i32>) -> RepoResult<bool> {
        Ok(self
            .lock()
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != exclude))
    }

    async fn list_users(&self, filter: &UserFilter, page: Page) -> RepoResult<PageOf<User>> {
        let store = self.lock();
        let needle = needle(&filter.search);
        let mut rows: Vec<User> = store
            .users
            .iter()
            .filter(|u| u.deleted_at.is_none())
            .filter(|u| filter.role_id.is_none_or(|r| u.role_id == r))
            .filter(|u| filter.is_active.is_none_or(|a| u.is_active == a))
            .filter(|u| {
                needle
                    .as_deref()
                    .is_none_or(|n| matches(n, &[Some(u.email.as_str()), Some(u.full_name.as_str())]))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(paginate(rows, page))
    }

    async fn insert_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.lock();
        if store
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ApiError::conflict(DUPLICATE));
        }
        if !store.roles.iter().any(|r| r.id == user.role_id) {
            return Err(ApiError::bad_request("Referenced resource does not exist"));
        }
        let now = Utc::now();
        let row = User {
            id: store.next_id("users"),
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            role_id: user.role_id,
            is_active: user.is_active,
            last_login_at: None,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        store.users.push(row.clone());
        Ok(row)
    }

    async fn save_user(&self, user: &User) -> RepoResult<User> {
        let mut store = self.lock();
        if store
            .users
            .iter()
            .any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let row = store
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        *row = User {
            updated_at: Utc::now(),
            created_at: row.created_at,
            deleted_at: row.deleted_at,
            ..user.clone()
        };
        Ok(row.clone())
    }

    async fn touch_last_login(&self, id: i32) -> RepoResult<()> {
        self.with_live_user(id, |user| user.last_login_at = Some(Utc::now()));
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: i32,
        token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> RepoResult<()> {
        self.with_live_user(id, |user| {
            user.reset_token = token.map(str::to_string);
            user.reset_token_expires_at = expires_at;
            user.updated_at = Utc::now();
        });
        Ok(())
    }

    async fn set_password(&self, id: i32, password_hash: &str) -> RepoResult<()> {
        self.with_live_user(id, |user| {
            user.password_hash = password_hash.to_string();
            user.reset_token = None;
            user.reset_token_expires_at = None;
            user.updated_at = Utc::now();
        });
        Ok(())
    }

    async fn soft_delete_user(&self, id: i32) -> RepoResult<bool> {
        let mut store = self.lock();
        match store
            .users
            .iter_mut()
            .find(|u| u.id == id && u.deleted_at.is_none())
        {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Roles ---

    async fn find_role(&self, id: i32) -> RepoResult<Option<Role>> {
        Ok(self.lock().roles.iter().find(|r| r.id == id).cloned())
    }

    async fn find_role_by_slug(&self, slug: &str) -> RepoResult<Option<Role>> {
        Ok(self.lock().roles.iter().find(|r| r.slug == slug).cloned())
    }

    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        Ok(self.lock().roles.clone())
    }

    async fn insert_role(&self, role: NewRole) -> RepoResult<Role> {
        let mut store = self.lock();
        if store
            .roles
            .iter()
            .any(|r| r.slug == role.slug || r.name == role.name)
        {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let now = Utc::now();
        let row = Role {
            id: store.next_id("roles"),
            name: role.name,
            slug: role.slug,
            description: role.description,
            permissions: role.permissions,
            created_at: now,
            updated_at: now,
        };
        store.roles.push(row.clone());
        Ok(row)
    }

    // --- Categories ---

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut rows = self.lock().categories.clone();
        rows.sort_by(|a, b| (a.display_order, &a.name).cmp(&(b.display_order, &b.name)));
        Ok(rows)
    }

    async fn find_category(&self, id: i32) -> RepoResult<Option<Category>> {
        Ok(self.lock().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> RepoResult<Option<Category>> {
        Ok(self
            .lock()
            .categories
            .iter()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn category_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        Ok(self
            .lock()
            .categories
            .iter()
            .any(|c| c.slug == slug && Some(c.id) != exclude))
    }

    async fn insert_category(&self, category: NewCategory) -> RepoResult<Category> {
        let mut store = self.lock();
        if store.categories.iter().any(|c| c.slug == category.slug) {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let now = Utc::now();
        let row = Category {
            id: store.next_id("categories"),
            name: category.name,
            slug: category.slug,
            description: category.description,
            parent_id: category.parent_id,
            display_order: category.display_order,
            created_at: now,
            updated_at: now,
        };
        store.categories.push(row.clone());
        Ok(row)
    }

    async fn save_category(&self, category: &Category) -> RepoResult<Category> {
        let mut store = self.lock();
        if store
            .categories
            .iter()
            .any(|c| c.id != category.id && c.slug == category.slug)
        {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let row = store
            .categories
            .iter_mut()
            .find(|c| c.id == category.id)
            .ok_or_else(|| ApiError::not_found("Category not found"))?;
        *row = Category {
            updated_at: Utc::now(),
            created_at: row.created_at,
            ..category.clone()
        };
        Ok(row.clone())
    }

    async fn delete_category(&self, id: i32) -> RepoResult<bool> {
        let mut store = self.lock();
        let before = store.categories.len();
        store.categories.retain(|c| c.id != id);
        if store.categories.len() == before {
            return Ok(false);
        }
        for child in store.categories.iter_mut().filter(|c| c.parent_id == Some(id)) {
            child.parent_id = None;
        }
        for post in store.posts.iter_mut().filter(|p| p.category_id == Some(id)) {
            post.category_id = None;
        }
        Ok(true)
    }

    // --- Tags ---

    async fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        let mut rows = self.lock().tags.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn find_tag(&self, id: i32) -> RepoResult<Option<Tag>> {
        Ok(self.lock().tags.iter().find(|t| t.id == id).cloned())
    }

    async fn find_tag_by_slug(&self, slug: &str) -> RepoResult<Option<Tag>> {
        Ok(self.lock().tags.iter().find(|t| t.slug == slug).cloned())
    }

    async fn find_tags(&self, ids: &[i32]) -> RepoResult<Vec<Tag>> {
        let mut rows: Vec<Tag> = self
            .lock()
            .tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn tag_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        Ok(self
            .lock()
            .tags
            .iter()
            .any(|t| t.slug == slug && Some(t.id) != exclude))
    }

    async fn insert_tag(&self, name: &str, slug: &str) -> RepoResult<Tag> {
        let mut store = self.lock();
        if store.tags.iter().any(|t| t.slug == slug) {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let now = Utc::now();
        let row = Tag {
            id: store.next_id("tags"),
            name: name.to_string(),
            slug: slug.to_string(),
            usage_count: 0,
            created_at: now,
            updated_at: now,
        };
        store.tags.push(row.clone());
        Ok(row)
    }

    async fn save_tag(&self, tag: &Tag) -> RepoResult<Tag> {
        let mut store = self.lock();
        if store.tags.iter().any(|t| t.id != tag.id && t.slug == tag.slug) {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let row = store
            .tags
            .iter_mut()
            .find(|t| t.id == tag.id)
            .ok_or_else(|| ApiError::not_found("Tag not found"))?;
        row.name = tag.name.clone();
        row.slug = tag.slug.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_tag(&self, id: i32) -> RepoResult<bool> {
        let mut store = self.lock();
        let before = store.tags.len();
        store.tags.retain(|t| t.id != id);
        store.post_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(store.tags.len() < before)
    }

    async fn post_tags(&self, post_id: i32) -> RepoResult<Vec<Tag>> {
        let store = self.lock();
        let ids = store.tags_of(post_id);
        let mut rows: Vec<Tag> = store
            .tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    // --- Blog posts ---

    async fn list_posts(
        &self,
        filter: &PostFilter,
        visibility: Visibility,
        page: Page,
    ) -> RepoResult<PageOf<BlogPost>> {
        let store = self.lock();
        let needle = needle(&filter.search);
        let mut rows: Vec<BlogPost> = store
            .posts
            .iter()
            .filter(|p| p.deleted_at.is_none())
            .filter(|p| visibility == Visibility::All || p.status == PostStatus::Published)
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .filter(|p| filter.category_id.is_none_or(|c| p.category_id == Some(c)))
            .filter(|p| filter.author_id.is_none_or(|a| p.author_id == a))
            .filter(|p| {
                filter
                    .tag_id
                    .is_none_or(|t| store.post_tags.contains(&(p.id, t)))
            })
            .filter(|p| {
                needle
                    .as_deref()
                    .is_none_or(|n| matches(n, &[Some(p.title.as_str()), Some(p.content.as_str())]))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let key = |p: &BlogPost| (p.published_at.is_some(), p.published_at, p.created_at, p.id);
            key(b).cmp(&key(a))
        });
        Ok(paginate(rows, page))
    }

    async fn find_post(&self, id: i32) -> RepoResult<Option<BlogPost>> {
        Ok(self
            .lock()
            .posts
            .iter()
            .find(|p| p.id == id && p.deleted_at.is_none())
            .cloned())
    }

    async fn find_post_by_slug(&self, slug: &str) -> RepoResult<Option<BlogPost>> {
        Ok(self
            .lock()
            .posts
            .iter()
            .find(|p| p.slug == slug && p.deleted_at.is_none())
            .cloned())
    }

    async fn post_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        Ok(self
            .lock()
            .posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != exclude))
    }

    async fn insert_post(&self, post: NewPost) -> RepoResult<BlogPost> {
        let mut store = self.lock();
        if store.posts.iter().any(|p| p.slug == post.slug) {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let now = Utc::now();
        let row = BlogPost {
            id: store.next_id("blog_posts"),
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            status: post.status,
            featured_image: post.featured_image,
            published_at: post.published_at,
            scheduled_for: post.scheduled_for,
            author_id: post.author_id,
            category_id: post.category_id,
            view_count: 0,
            meta_title: post.meta_title,
            meta_description: post.meta_description,
            meta_keywords: post.meta_keywords,
            canonical_url: post.canonical_url,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        store.posts.push(row.clone());
        Ok(row)
    }

    async fn save_post(&self, post: &BlogPost) -> RepoResult<BlogPost> {
        let mut store = self.lock();
        if store
            .posts
            .iter()
            .any(|p| p.id != post.id && p.slug == post.slug)
        {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let row = store
            .posts
            .iter_mut()
            .find(|p| p.id == post.id)
            .ok_or_else(|| ApiError::not_found("Post not found"))?;
        *row = BlogPost {
            updated_at: Utc::now(),
            created_at: row.created_at,
            view_count: row.view_count,
            author_id: row.author_id,
            deleted_at: row.deleted_at,
            ..post.clone()
        };
        Ok(row.clone())
    }

    async fn set_post_tags(&self, post_id: i32, tag_ids: &[i32]) -> RepoResult<()> {
        let mut store = self.lock();
        let mut affected = store.tags_of(post_id);
        store.post_tags.retain(|(p, _)| *p != post_id);
        for tag_id in tag_ids {
            if !store.post_tags.contains(&(post_id, *tag_id)) {
                store.post_tags.push((post_id, *tag_id));
            }
        }
        affected.extend_from_slice(tag_ids);
        store.recount_tags(&affected);
        Ok(())
    }

    async fn increment_post_views(&self, id: i32) -> RepoResult<()> {
        if let Some(post) = self.lock().posts.iter_mut().find(|p| p.id == id) {
            post.view_count += 1;
        }
        Ok(())
    }

    async fn soft_delete_post(&self, id: i32) -> RepoResult<bool> {
        let mut store = self.lock();
        let Some(post) = store
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.deleted_at.is_none())
        else {
            return Ok(false);
        };
        post.deleted_at = Some(Utc::now());
        let tags = store.tags_of(id);
        store.recount_tags(&tags);
        Ok(true)
    }

    // --- Services (portfolio) ---

    async fn list_portfolio(
        &self,
        filter: &PortfolioFilter,
        visibility: Visibility,
        page: Page,
    ) -> RepoResult<PageOf<PortfolioItem>> {
        let store = self.lock();
        let needle = needle(&filter.search);
        let mut rows: Vec<PortfolioItem> = store
            .services
            .iter()
            .filter(|s| s.deleted_at.is_none())
            .filter(|s| visibility == Visibility::All || s.status != ServiceStatus::Archived)
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .filter(|s| filter.featured.is_none_or(|f| s.featured == f))
            .filter(|s| {
                needle
                    .as_deref()
                    .is_none_or(|n| matches(n, &[Some(s.title.as_str()), Some(s.description.as_str())]))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
        });
        Ok(paginate(rows, page))
    }

    async fn find_portfolio_item(&self, id: i32) -> RepoResult<Option<PortfolioItem>> {
        Ok(self
            .lock()
            .services
            .iter()
            .find(|s| s.id == id && s.deleted_at.is_none())
            .cloned())
    }

    async fn find_portfolio_item_by_slug(&self, slug: &str) -> RepoResult<Option<PortfolioItem>> {
        Ok(self
            .lock()
            .services
            .iter()
            .find(|s| s.slug == slug && s.deleted_at.is_none())
            .cloned())
    }

    async fn portfolio_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        Ok(self
            .lock()
            .services
            .iter()
            .any(|s| s.slug == slug && Some(s.id) != exclude))
    }

    async fn insert_portfolio_item(&self, item: NewPortfolioItem) -> RepoResult<PortfolioItem> {
        let mut store = self.lock();
        if store.services.iter().any(|s| s.slug == item.slug) {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let now = Utc::now();
        let row = PortfolioItem {
            id: store.next_id("services"),
            title: item.title,
            slug: item.slug,
            description: item.description,
            client_name: item.client_name,
            project_url: item.project_url,
            project_date: item.project_date,
            project_duration: item.project_duration,
            status: item.status,
            featured: item.featured,
            category: item.category,
            technologies: item.technologies,
            industry: item.industry,
            challenge: item.challenge,
            solution: item.solution,
            results: item.results,
            metrics: item.metrics,
            created_by: item.created_by,
            display_order: item.display_order,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        store.services.push(row.clone());
        Ok(row)
    }

    async fn save_portfolio_item(&self, item: &PortfolioItem) -> RepoResult<PortfolioItem> {
        let mut store = self.lock();
        if store
            .services
            .iter()
            .any(|s| s.id != item.id && s.slug == item.slug)
        {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let row = store
            .services
            .iter_mut()
            .find(|s| s.id == item.id)
            .ok_or_else(|| ApiError::not_found("Service not found"))?;
        *row = PortfolioItem {
            updated_at: Utc::now(),
            created_at: row.created_at,
            created_by: row.created_by,
            deleted_at: row.deleted_at,
            ..item.clone()
        };
        Ok(row.clone())
    }

    async fn replace_service_images(
        &self,
        service_id: i32,
        images: &[ServiceImageInput],
    ) -> RepoResult<Vec<ServiceImage>> {
        let mut store = self.lock();
        store.service_images.retain(|i| i.service_id != service_id);
        let now = Utc::now();
        let mut saved = Vec::with_capacity(images.len());
        for (position, image) in images.iter().enumerate() {
            let row = ServiceImage {
                id: store.next_id("service_images"),
                service_id,
                image_url: image.image_url.clone(),
                caption: image.caption.clone(),
                is_primary: image.is_primary,
                display_order: image.display_order.unwrap_or(position as i32),
                created_at: now,
            };
            store.service_images.push(row.clone());
            saved.push(row);
        }
        Ok(saved)
    }

    async fn service_images(&self, service_id: i32) -> RepoResult<Vec<ServiceImage>> {
        let mut rows: Vec<ServiceImage> = self
            .lock()
            .service_images
            .iter()
            .filter(|i| i.service_id == service_id)
            .cloned()
            .collect();
        rows.sort_by_key(|i| (i.display_order, i.id));
        Ok(rows)
    }

    async fn soft_delete_portfolio_item(&self, id: i32) -> RepoResult<bool> {
        let mut store = self.lock();
        match store
            .services
            .iter_mut()
            .find(|s| s.id == id && s.deleted_at.is_none())
        {
            Some(item) => {
                item.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Jobs ---

    async fn list_jobs(
        &self,
        filter: &JobFilter,
        visibility: Visibility,
        page: Page,
    ) -> RepoResult<PageOf<JobListing>> {
        let store = self.lock();
        let department = needle(&filter.department);
        let needle = needle(&filter.search);
        let mut rows: Vec<JobListing> = store
            .jobs
            .iter()
            .filter(|j| j.deleted_at.is_none())
            .filter(|j| visibility == Visibility::All || j.status == JobStatus::Active)
            .filter(|j| filter.status.is_none_or(|s| j.status == s))
            .filter(|j| {
                department
                    .as_deref()
                    .is_none_or(|d| j.department.to_lowercase() == d)
            })
            .filter(|j| filter.employment_type.is_none_or(|e| j.employment_type == e))
            .filter(|j| {
                needle
                    .as_deref()
                    .is_none_or(|n| matches(n, &[Some(j.title.as_str()), Some(j.description.as_str())]))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(paginate(rows, page))
    }

    async fn find_job(&self, id: i32) -> RepoResult<Option<JobListing>> {
        Ok(self
            .lock()
            .jobs
            .iter()
            .find(|j| j.id == id && j.deleted_at.is_none())
            .cloned())
    }

    async fn find_job_by_slug(&self, slug: &str) -> RepoResult<Option<JobListing>> {
        Ok(self
            .lock()
            .jobs
            .iter()
            .find(|j| j.slug == slug && j.deleted_at.is_none())
            .cloned())
    }

    async fn job_slug_taken(&self, slug: &str, exclude: Option<i32>) -> RepoResult<bool> {
        Ok(self
            .lock()
            .jobs
            .iter()
            .any(|j| j.slug == slug && Some(j.id) != exclude))
    }

    async fn insert_job(&self, job: NewJob) -> RepoResult<JobListing> {
        let mut store = self.lock();
        if store.jobs.iter().any(|j| j.slug == job.slug) {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let now = Utc::now();
        let row = JobListing {
            id: store.next_id("job_listings"),
            title: job.title,
            slug: job.slug,
            department: job.department,
            location_type: job.location_type,
            location_city: job.location_city,
            location_region: job.location_region,
            remote_policy: job.remote_policy,
            employment_type: job.employment_type,
            description: job.description,
            responsibilities: job.responsibilities,
            qualifications_required: job.qualifications_required,
            qualifications_preferred: job.qualifications_preferred,
            benefits: job.benefits,
            salary_min: job.salary_min,
            salary_max: job.salary_max,
            salary_currency: job.salary_currency,
            salary_visible: job.salary_visible,
            application_deadline: job.application_deadline,
            status: job.status,
            internal_notes: job.internal_notes,
            posted_by: job.posted_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        store.jobs.push(row.clone());
        Ok(row)
    }

    async fn save_job(&self, job: &JobListing) -> RepoResult<JobListing> {
        let mut store = self.lock();
        if store.jobs.iter().any(|j| j.id != job.id && j.slug == job.slug) {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let row = store
            .jobs
            .iter_mut()
            .find(|j| j.id == job.id)
            .ok_or_else(|| ApiError::not_found("Job listing not found"))?;
        *row = JobListing {
            updated_at: Utc::now(),
            created_at: row.created_at,
            posted_by: row.posted_by,
            deleted_at: row.deleted_at,
            ..job.clone()
        };
        Ok(row.clone())
    }

    async fn soft_delete_job(&self, id: i32) -> RepoResult<bool> {
        let mut store = self.lock();
        match store
            .jobs
            .iter_mut()
            .find(|j| j.id == id && j.deleted_at.is_none())
        {
            Some(job) => {
                job.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_applications(&self, job_id: i32) -> RepoResult<i64> {
        Ok(self
            .lock()
            .applications
            .iter()
            .filter(|a| a.job_id == job_id)
            .count() as i64)
    }

    // --- Applications ---

    async fn find_application_by_job_email(
        &self,
        job_id: i32,
        email: &str,
    ) -> RepoResult<Option<JobApplication>> {
        Ok(self
            .lock()
            .applications
            .iter()
            .find(|a| a.job_id == job_id && a.applicant_email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_application(&self, application: NewApplication) -> RepoResult<JobApplication> {
        let mut store = self.lock();
        if store.applications.iter().any(|a| {
            a.job_id == application.job_id
                && a.applicant_email
                    .eq_ignore_ascii_case(&application.applicant_email)
        }) {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let now = Utc::now();
        let row = JobApplication {
            id: store.next_id("job_applications"),
            job_id: application.job_id,
            applicant_name: application.applicant_name,
            applicant_email: application.applicant_email,
            applicant_phone: application.applicant_phone,
            resume_url: application.resume_url,
            resume_filename: application.resume_filename,
            cover_letter: application.cover_letter,
            linkedin_url: application.linkedin_url,
            portfolio_url: application.portfolio_url,
            status: ApplicationStatus::New,
            notes: None,
            applied_at: now,
            updated_at: now,
        };
        store.applications.push(row.clone());
        Ok(row)
    }

    async fn find_application(&self, id: i32) -> RepoResult<Option<JobApplication>> {
        Ok(self
            .lock()
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn save_application(&self, application: &JobApplication) -> RepoResult<JobApplication> {
        let mut store = self.lock();
        let row = store
            .applications
            .iter_mut()
            .find(|a| a.id == application.id)
            .ok_or_else(|| ApiError::not_found("Application not found"))?;
        row.status = application.status;
        row.notes = application.notes.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn list_job_applications(&self, job_id: i32) -> RepoResult<Vec<JobApplication>> {
        let mut rows: Vec<JobApplication> = self
            .lock()
            .applications
            .iter()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.applied_at, b.id).cmp(&(a.applied_at, a.id)));
        Ok(rows)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: Page,
    ) -> RepoResult<PageOf<ApplicationListing>> {
        let store = self.lock();
        let mut rows: Vec<ApplicationListing> = store
            .applications
            .iter()
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| filter.job_id.is_none_or(|j| a.job_id == j))
            .filter_map(|a| {
                let job = store.jobs.iter().find(|j| j.id == a.job_id)?;
                Some(ApplicationListing {
                    application: a.clone(),
                    job_title: job.title.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (b.application.applied_at, b.application.id)
                .cmp(&(a.application.applied_at, a.application.id))
        });
        Ok(paginate(rows, page))
    }

    // --- Media ---

    async fn insert_media(&self, media: NewMedia) -> RepoResult<MediaFile> {
        let mut store = self.lock();
        if store.media.iter().any(|m| m.filename == media.filename) {
            return Err(ApiError::conflict(DUPLICATE));
        }
        let now = Utc::now();
        let row = MediaFile {
            id: store.next_id("media_files"),
            filename: media.filename,
            original_name: media.original_name,
            file_path: media.file_path,
            file_url: media.file_url,
            thumbnail_url: media.thumbnail_url,
            file_type: media.file_type,
            mime_type: media.mime_type,
            file_size: media.file_size,
            image_width: media.image_width,
            image_height: media.image_height,
            alt_text: media.alt_text,
            uploaded_by: media.uploaded_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        store.media.push(row.clone());
        Ok(row)
    }

    async fn find_media(&self, id: i32) -> RepoResult<Option<MediaFile>> {
        Ok(self
            .lock()
            .media
            .iter()
            .find(|m| m.id == id && m.deleted_at.is_none())
            .cloned())
    }

    async fn list_media(&self, filter: &MediaFilter, page: Page) -> RepoResult<PageOf<MediaFile>> {
        let store = self.lock();
        let needle = needle(&filter.search);
        let mut rows: Vec<MediaFile> = store
            .media
            .iter()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| filter.file_type.is_none_or(|t| m.file_type == t))
            .filter(|m| {
                needle.as_deref().is_none_or(|n| {
                    matches(
                        n,
                        &[
                            Some(m.original_name.as_str()),
                            Some(m.filename.as_str()),
                            m.alt_text.as_deref(),
                        ],
                    )
                })
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(paginate(rows, page))
    }

    async fn save_media(&self, media: &MediaFile) -> RepoResult<MediaFile> {
        let mut store = self.lock();
        let row = store
            .media
            .iter_mut()
            .find(|m| m.id == media.id)
            .ok_or_else(|| ApiError::not_found("Media file not found"))?;
        row.alt_text = media.alt_text.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn soft_delete_media(&self, id: i32) -> RepoResult<bool> {
        let mut store = self.lock();
        match store
            .media
            .iter_mut()
            .find(|m| m.id == id && m.deleted_at.is_none())
        {
            Some(media) => {
                media.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Dashboard ---

    async fn content_counts(&self) -> RepoResult<ContentCounts> {
        let store = self.lock();
        let posts: Vec<&BlogPost> = store.posts.iter().filter(|p| p.deleted_at.is_none()).collect();
        let services: Vec<&PortfolioItem> = store
            .services
            .iter()
            .filter(|s| s.deleted_at.is_none())
            .collect();
        let jobs: Vec<&JobListing> = store.jobs.iter().filter(|j| j.deleted_at.is_none()).collect();
        let count_posts = |status: PostStatus| posts.iter().filter(|p| p.status == status).count() as i64;
        let count_services = |status: ServiceStatus| services.iter().filter(|s| s.status == status).count() as i64;
        let count_jobs = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count() as i64;

        Ok(ContentCounts {
            users: store.users.iter().filter(|u| u.deleted_at.is_none()).count() as i64,
            posts: posts.len() as i64,
            posts_published: count_posts(PostStatus::Published),
            posts_draft: count_posts(PostStatus::Draft),
            services: services.len() as i64,
            services_ongoing: count_services(ServiceStatus::Ongoing),
            services_completed: count_services(ServiceStatus::Completed),
            services_archived: count_services(ServiceStatus::Archived),
            jobs: jobs.len() as i64,
            jobs_active: count_jobs(JobStatus::Active),
            jobs_closed: count_jobs(JobStatus::Closed),
            applications: store.applications.len() as i64,
            media: store.media.iter().filter(|m| m.deleted_at.is_none()).count() as i64,
        })
    }

    async fn recent_activity(
        &self,
        visibility: Visibility,
        per_kind: i64,
    ) -> RepoResult<Vec<ActivityItem>> {
        let store = self.lock();
        let per_kind = per_kind.max(0) as usize;
        let public = visibility == Visibility::Public;

        let mut posts: Vec<&BlogPost> = store
            .posts
            .iter()
            .filter(|p| p.deleted_at.is_none() && (!public || p.status == PostStatus::Published))
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut jobs: Vec<&JobListing> = store
            .jobs
            .iter()
            .filter(|j| j.deleted_at.is_none() && (!public || j.status == JobStatus::Active))
            .collect();
        jobs.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut applications: Vec<&JobApplication> = if public {
            Vec::new()
        } else {
            store.applications.iter().collect()
        };
        applications.sort_by(|a, b| (b.applied_at, b.id).cmp(&(a.applied_at, a.id)));

        let mut items: Vec<ActivityItem> = Vec::new();
        items.extend(posts.into_iter().take(per_kind).map(|p| ActivityItem {
            kind: "post".to_string(),
            id: p.id,
            title: p.title.clone(),
            status: p.status.as_str().to_string(),
            created_at: p.created_at,
        }));
        items.extend(jobs.into_iter().take(per_kind).map(|j| ActivityItem {
            kind: "job".to_string(),
            id: j.id,
            title: j.title.clone(),
            status: j.status.as_str().to_string(),
            created_at: j.created_at,
        }));
        items.extend(applications.into_iter().take(per_kind).map(|a| {
            let job_title = store
                .jobs
                .iter()
                .find(|j| j.id == a.job_id)
                .map(|j| j.title.as_str())
                .unwrap_or_default();
            ActivityItem {
                kind: "application".to_string(),
                id: a.id,
                title: format!("{} applied for {}", a.applicant_name, job_title),
                status: a.status.as_str().to_string(),
                created_at: a.applied_at,
            }
        }));
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn search_content(&self, term: &str, per_kind: i64) -> RepoResult<Vec<SearchHit>> {
        let store = self.lock();
        let needle = term.trim().to_lowercase();
        let per_kind = per_kind.max(0) as usize;
        let hit = |kind: &str, id: i32, title: &str, status: &str| SearchHit {
            kind: kind.to_string(),
            id,
            title: title.to_string(),
            status: status.to_string(),
            link: admin_link(kind, id),
        };

        let mut posts: Vec<&BlogPost> = store
            .posts
            .iter()
            .filter(|p| p.deleted_at.is_none())
            .filter(|p| matches(&needle, &[Some(p.title.as_str()), Some(p.content.as_str())]))
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut services: Vec<&PortfolioItem> = store
            .services
            .iter()
            .filter(|s| s.deleted_at.is_none())
            .filter(|s| matches(&needle, &[Some(s.title.as_str()), Some(s.description.as_str())]))
            .collect();
        services.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut jobs: Vec<&JobListing> = store
            .jobs
            .iter()
            .filter(|j| j.deleted_at.is_none())
            .filter(|j| matches(&needle, &[Some(j.title.as_str()), Some(j.description.as_str())]))
            .collect();
        jobs.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut hits = Vec::new();
        hits.extend(
            posts
                .into_iter()
                .take(per_kind)
                .map(|p| hit("post", p.id, &p.title, p.status.as_str())),
        );
        hits.extend(
            services
                .into_iter()
                .take(per_kind)
                .map(|s| hit("service", s.id, &s.title, s.status.as_str())),
        );
        hits.extend(
            jobs.into_iter()
                .take(per_kind)
                .map(|j| hit("job", j.id, &j.title, j.status.as_str())),
        );
        Ok(hits)
    }
}
