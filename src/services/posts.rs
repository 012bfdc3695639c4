use std::collections::{BTreeSet, HashMap};

use chrono::Utc;

use super::slug_for;
use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{
        AuthorSummary, BlogPost, Category, CategorySummary, CreatePostRequest, NewPost, Page,
        PageOf, Paginated, PostDetail, PostFilter, PostStatus, TagSummary, UpdatePostRequest,
        Visibility,
    },
    permissions::{Action, Module},
    repository::Repository,
};

const DUPLICATE_TITLE: &str = "A post with this title already exists";

fn not_found() -> ApiError {
    ApiError::not_found("Blog post not found")
}

fn visible(post: &BlogPost, visibility: Visibility) -> bool {
    visibility == Visibility::All || post.status == PostStatus::Published
}

// --- Composition ---

/// compose
///
/// Joins a post with its author, category and tags. `categories` is a lookup the
/// caller may share across a whole page of posts.
async fn compose(
    repo: &dyn Repository,
    post: BlogPost,
    categories: &HashMap<i32, Category>,
    authors: &mut HashMap<i32, Option<AuthorSummary>>,
) -> Result<PostDetail, ApiError> {
    let author = match authors.get(&post.author_id) {
        Some(cached) => cached.clone(),
        None => {
            let author = repo.find_user(post.author_id).await?.map(|user| AuthorSummary {
                id: user.id,
                full_name: user.full_name,
                email: user.email,
            });
            authors.insert(post.author_id, author.clone());
            author
        }
    };
    let category = post
        .category_id
        .and_then(|id| categories.get(&id))
        .map(CategorySummary::from);
    let tags = repo
        .post_tags(post.id)
        .await?
        .iter()
        .map(TagSummary::from)
        .collect();

    Ok(PostDetail {
        post,
        author,
        category,
        tags,
    })
}

async fn category_lookup(repo: &dyn Repository) -> Result<HashMap<i32, Category>, ApiError> {
    Ok(repo
        .list_categories()
        .await?
        .into_iter()
        .map(|category| (category.id, category))
        .collect())
}

/// Single-post composition: only the post's own category is loaded.
async fn detail(repo: &dyn Repository, post: BlogPost) -> Result<PostDetail, ApiError> {
    let mut categories = HashMap::new();
    if let Some(id) = post.category_id
        && let Some(category) = repo.find_category(id).await?
    {
        categories.insert(category.id, category);
    }
    compose(repo, post, &categories, &mut HashMap::new()).await
}

// --- Reference checks ---

async fn ensure_category(repo: &dyn Repository, category_id: Option<i32>) -> Result<(), ApiError> {
    if let Some(id) = category_id
        && repo.find_category(id).await?.is_none()
    {
        return Err(ApiError::bad_request("Category not found"));
    }
    Ok(())
}

/// Deduplicates tag ids and checks that every one exists.
async fn resolve_tags(repo: &dyn Repository, tag_ids: &[i32]) -> Result<Vec<i32>, ApiError> {
    let wanted: BTreeSet<i32> = tag_ids.iter().copied().collect();
    let wanted: Vec<i32> = wanted.into_iter().collect();
    if wanted.is_empty() {
        return Ok(wanted);
    }
    let found = repo.find_tags(&wanted).await?;
    if found.len() != wanted.len() {
        return Err(ApiError::bad_request("One or more tags do not exist"));
    }
    Ok(wanted)
}

// --- Operations ---

/// list
///
/// Paginated posts, newest publication first. Anonymous and viewer callers only ever
/// see published posts, whatever `status` they ask for.
pub async fn list(
    repo: &dyn Repository,
    filter: PostFilter,
    visibility: Visibility,
) -> Result<Paginated<PostDetail>, ApiError> {
    let page = Page::new(filter.page, filter.limit, Page::DEFAULT_LIMIT);
    let posts = repo.list_posts(&filter, visibility, page).await?;

    let categories = category_lookup(repo).await?;
    let mut authors = HashMap::new();
    let mut items = Vec::with_capacity(posts.items.len());
    for post in posts.items {
        items.push(compose(repo, post, &categories, &mut authors).await?);
    }

    Ok(PageOf {
        items,
        total: posts.total,
    }
    .into_paginated(page))
}

pub async fn get(
    repo: &dyn Repository,
    id: i32,
    visibility: Visibility,
) -> Result<PostDetail, ApiError> {
    let post = repo
        .find_post(id)
        .await?
        .filter(|post| visible(post, visibility))
        .ok_or_else(not_found)?;
    detail(repo, post).await
}

/// get_by_slug
///
/// The public read path. Each fetch of a published post counts as one view; drafts
/// opened by staff do not.
pub async fn get_by_slug(
    repo: &dyn Repository,
    slug: &str,
    visibility: Visibility,
) -> Result<PostDetail, ApiError> {
    let mut post = repo
        .find_post_by_slug(slug)
        .await?
        .filter(|post| visible(post, visibility))
        .ok_or_else(not_found)?;

    if post.status == PostStatus::Published {
        repo.increment_post_views(post.id).await?;
        post.view_count += 1;
    }
    detail(repo, post).await
}

/// create
///
/// The caller becomes the author. Publishing needs `blog.publish`; a published post
/// without `publishedAt` is stamped now.
pub async fn create(
    repo: &dyn Repository,
    principal: &AuthUser,
    req: CreatePostRequest,
) -> Result<PostDetail, ApiError> {
    let status = req.status.unwrap_or(PostStatus::Draft);
    if status == PostStatus::Published {
        principal.require_permission(Module::Blog, Action::Publish)?;
    }

    let slug = slug_for("title", &req.title)?;
    if repo.post_slug_taken(&slug, None).await? {
        return Err(ApiError::conflict(DUPLICATE_TITLE));
    }
    ensure_category(repo, req.category_id).await?;
    let tag_ids = resolve_tags(repo, &req.tags).await?;

    let published_at = match (req.published_at, status) {
        (Some(at), _) => Some(at),
        (None, PostStatus::Published) => Some(Utc::now()),
        (None, _) => None,
    };

    let post = repo
        .insert_post(NewPost {
            title: req.title.trim().to_string(),
            slug,
            content: req.content,
            excerpt: req.excerpt,
            status,
            featured_image: req.featured_image,
            published_at,
            scheduled_for: req.scheduled_for,
            author_id: principal.id,
            category_id: req.category_id,
            meta_title: req.meta_title,
            meta_description: req.meta_description,
            meta_keywords: req.meta_keywords,
            canonical_url: req.canonical_url,
        })
        .await?;

    if !tag_ids.is_empty() {
        repo.set_post_tags(post.id, &tag_ids).await?;
    }

    tracing::info!(post_id = post.id, slug = %post.slug, status = post.status.as_str(), "post created");
    detail(repo, post).await
}

/// update
///
/// Partial. A changed title re-derives the slug; `tags`, when present, replaces the
/// whole set.
pub async fn update(
    repo: &dyn Repository,
    principal: &AuthUser,
    id: i32,
    req: UpdatePostRequest,
) -> Result<PostDetail, ApiError> {
    let mut post = repo.find_post(id).await?.ok_or_else(not_found)?;

    if let Some(title) = req.title {
        let title = title.trim().to_string();
        if title != post.title {
            let slug = slug_for("title", &title)?;
            if repo.post_slug_taken(&slug, Some(id)).await? {
                return Err(ApiError::conflict(DUPLICATE_TITLE));
            }
            post.slug = slug;
        }
        post.title = title;
    }
    if let Some(status) = req.status {
        if status == PostStatus::Published && post.status != PostStatus::Published {
            principal.require_permission(Module::Blog, Action::Publish)?;
        }
        post.status = status;
    }
    if let Some(category_id) = req.category_id {
        ensure_category(repo, category_id).await?;
        post.category_id = category_id;
    }
    let tag_ids = match req.tags {
        Some(ref tags) => Some(resolve_tags(repo, tags).await?),
        None => None,
    };

    if let Some(content) = req.content {
        post.content = content;
    }
    if let Some(excerpt) = req.excerpt {
        post.excerpt = excerpt;
    }
    if let Some(featured_image) = req.featured_image {
        post.featured_image = featured_image;
    }
    if let Some(published_at) = req.published_at {
        post.published_at = published_at;
    }
    if let Some(scheduled_for) = req.scheduled_for {
        post.scheduled_for = scheduled_for;
    }
    if let Some(meta_title) = req.meta_title {
        post.meta_title = meta_title;
    }
    if let Some(meta_description) = req.meta_description {
        post.meta_description = meta_description;
    }
    if let Some(meta_keywords) = req.meta_keywords {
        post.meta_keywords = meta_keywords;
    }
    if let Some(canonical_url) = req.canonical_url {
        post.canonical_url = canonical_url;
    }
    if post.status == PostStatus::Published && post.published_at.is_none() {
        post.published_at = Some(Utc::now());
    }

    let post = repo.save_post(&post).await?;
    if let Some(tag_ids) = tag_ids {
        repo.set_post_tags(post.id, &tag_ids).await?;
    }
    detail(repo, post).await
}

/// Soft delete. Tag usage counts drop accordingly.
pub async fn delete(repo: &dyn Repository, id: i32) -> Result<(), ApiError> {
    if !repo.soft_delete_post(id).await? {
        return Err(not_found());
    }
    tracing::info!(post_id = id, "post deleted");
    Ok(())
}
