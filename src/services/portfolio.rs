use super::slug_for;
use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{
        CreatePortfolioRequest, NewPortfolioItem, Page, PageOf, Paginated, PortfolioDetail,
        PortfolioFilter, PortfolioItem, ServiceStatus, UpdatePortfolioRequest, Visibility,
    },
    permissions::{Action, Module},
    repository::Repository,
};

const DUPLICATE_TITLE: &str = "Service with this title already exists";

fn not_found() -> ApiError {
    ApiError::not_found("Service not found")
}

fn visible(item: &PortfolioItem, visibility: Visibility) -> bool {
    visibility == Visibility::All || item.status != ServiceStatus::Archived
}

async fn detail(repo: &dyn Repository, item: PortfolioItem) -> Result<PortfolioDetail, ApiError> {
    let images = repo.service_images(item.id).await?;
    Ok(PortfolioDetail { item, images })
}

/// list
///
/// Ordered by display order, newest first within the same slot. Archived items are
/// hidden from anonymous and viewer callers.
pub async fn list(
    repo: &dyn Repository,
    filter: PortfolioFilter,
    visibility: Visibility,
) -> Result<Paginated<PortfolioDetail>, ApiError> {
    let page = Page::new(filter.page, filter.limit, Page::DEFAULT_LIMIT);
    let items = repo.list_portfolio(&filter, visibility, page).await?;

    let mut details = Vec::with_capacity(items.items.len());
    for item in items.items {
        details.push(detail(repo, item).await?);
    }
    Ok(PageOf {
        items: details,
        total: items.total,
    }
    .into_paginated(page))
}

pub async fn get(
    repo: &dyn Repository,
    id: i32,
    visibility: Visibility,
) -> Result<PortfolioDetail, ApiError> {
    let item = repo
        .find_portfolio_item(id)
        .await?
        .filter(|item| visible(item, visibility))
        .ok_or_else(not_found)?;
    detail(repo, item).await
}

pub async fn get_by_slug(
    repo: &dyn Repository,
    slug: &str,
    visibility: Visibility,
) -> Result<PortfolioDetail, ApiError> {
    let item = repo
        .find_portfolio_item_by_slug(slug)
        .await?
        .filter(|item| visible(item, visibility))
        .ok_or_else(not_found)?;
    detail(repo, item).await
}

/// create
///
/// Inserts the item and its gallery. An explicit status needs `services.publish`;
/// without one the item starts as `ongoing`.
pub async fn create(
    repo: &dyn Repository,
    principal: &AuthUser,
    req: CreatePortfolioRequest,
) -> Result<PortfolioDetail, ApiError> {
    if req.status.is_some() {
        principal.require_permission(Module::Services, Action::Publish)?;
    }
    let slug = slug_for("title", &req.title)?;
    if repo.portfolio_slug_taken(&slug, None).await? {
        return Err(ApiError::conflict(DUPLICATE_TITLE));
    }

    let item = repo
        .insert_portfolio_item(NewPortfolioItem {
            title: req.title.trim().to_string(),
            slug,
            description: req.description,
            client_name: req.client_name,
            project_url: req.project_url,
            project_date: req.project_date,
            project_duration: req.project_duration,
            status: req.status.unwrap_or(ServiceStatus::Ongoing),
            featured: req.featured,
            category: req.category,
            technologies: req.technologies,
            industry: req.industry,
            challenge: req.challenge,
            solution: req.solution,
            results: req.results,
            metrics: req.metrics,
            created_by: principal.id,
            display_order: req.display_order.unwrap_or(0),
        })
        .await?;

    let images = if req.images.is_empty() {
        Vec::new()
    } else {
        repo.replace_service_images(item.id, &req.images).await?
    };

    tracing::info!(service_id = item.id, slug = %item.slug, "service created");
    Ok(PortfolioDetail { item, images })
}

/// update
///
/// Partial. `images`, when present, replaces the gallery wholesale.
pub async fn update(
    repo: &dyn Repository,
    principal: &AuthUser,
    id: i32,
    req: UpdatePortfolioRequest,
) -> Result<PortfolioDetail, ApiError> {
    let mut item = repo.find_portfolio_item(id).await?.ok_or_else(not_found)?;

    if let Some(title) = req.title {
        let title = title.trim().to_string();
        if title != item.title {
            let slug = slug_for("title", &title)?;
            if repo.portfolio_slug_taken(&slug, Some(id)).await? {
                return Err(ApiError::conflict(DUPLICATE_TITLE));
            }
            item.slug = slug;
        }
        item.title = title;
    }
    if let Some(status) = req.status {
        if status != item.status {
            principal.require_permission(Module::Services, Action::Publish)?;
        }
        item.status = status;
    }
    if let Some(description) = req.description {
        item.description = description;
    }
    if let Some(client_name) = req.client_name {
        item.client_name = client_name;
    }
    if let Some(project_url) = req.project_url {
        item.project_url = project_url;
    }
    if let Some(project_date) = req.project_date {
        item.project_date = project_date;
    }
    if let Some(project_duration) = req.project_duration {
        item.project_duration = project_duration;
    }
    if let Some(featured) = req.featured {
        item.featured = featured;
    }
    if let Some(category) = req.category {
        item.category = category;
    }
    if let Some(technologies) = req.technologies {
        item.technologies = technologies;
    }
    if let Some(industry) = req.industry {
        item.industry = industry;
    }
    if let Some(challenge) = req.challenge {
        item.challenge = challenge;
    }
    if let Some(solution) = req.solution {
        item.solution = solution;
    }
    if let Some(results) = req.results {
        item.results = results;
    }
    if let Some(metrics) = req.metrics {
        item.metrics = metrics;
    }
    if let Some(display_order) = req.display_order {
        item.display_order = display_order;
    }

    let item = repo.save_portfolio_item(&item).await?;
    let images = match req.images {
        Some(images) => repo.replace_service_images(item.id, &images).await?,
        None => repo.service_images(item.id).await?,
    };
    Ok(PortfolioDetail { item, images })
}

/// Soft delete; the gallery rows stay with the hidden item.
pub async fn delete(repo: &dyn Repository, id: i32) -> Result<(), ApiError> {
    if !repo.soft_delete_portfolio_item(id).await? {
        return Err(not_found());
    }
    tracing::info!(service_id = id, "service deleted");
    Ok(())
}
