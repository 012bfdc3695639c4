use super::slug_for;
use crate::{error::ApiError, models::Tag, repository::Repository};

const DUPLICATE_NAME: &str = "Tag with this name already exists";

pub async fn list(repo: &dyn Repository) -> Result<Vec<Tag>, ApiError> {
    repo.list_tags().await
}

pub async fn get(repo: &dyn Repository, id: i32) -> Result<Tag, ApiError> {
    repo.find_tag(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag not found"))
}

pub async fn get_by_slug(repo: &dyn Repository, slug: &str) -> Result<Tag, ApiError> {
    repo.find_tag_by_slug(slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag not found"))
}

pub async fn create(repo: &dyn Repository, name: &str) -> Result<Tag, ApiError> {
    let name = name.trim();
    let slug = slug_for("name", name)?;
    if repo.tag_slug_taken(&slug, None).await? {
        return Err(ApiError::conflict(DUPLICATE_NAME));
    }
    repo.insert_tag(name, &slug).await
}

/// Renames the tag; the slug follows the new name.
pub async fn rename(repo: &dyn Repository, id: i32, name: &str) -> Result<Tag, ApiError> {
    let mut tag = get(repo, id).await?;
    let name = name.trim();
    let slug = slug_for("name", name)?;
    if repo.tag_slug_taken(&slug, Some(id)).await? {
        return Err(ApiError::conflict(DUPLICATE_NAME));
    }
    tag.name = name.to_string();
    tag.slug = slug;
    repo.save_tag(&tag).await
}

/// Hard delete; post assignments go with it.
pub async fn delete(repo: &dyn Repository, id: i32) -> Result<(), ApiError> {
    if !repo.delete_tag(id).await? {
        return Err(ApiError::not_found("Tag not found"));
    }
    Ok(())
}
