use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::slug_for;
use crate::{
    error::ApiError,
    models::{Category, CategoryNode, CreateCategoryRequest, NewCategory, UpdateCategoryRequest},
    repository::Repository,
};

const DUPLICATE_NAME: &str = "A category with this name already exists";

/// Body of `GET /categories`: the flat list or, with `?tree=true`, the nested forest.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CategoryListing {
    Flat(Vec<Category>),
    Tree(Vec<CategoryNode>),
}

/// build_tree
///
/// Groups a flat category list under parent ids. Input order is kept among
/// siblings. Categories whose parent is missing from the input surface as roots, and a
/// stored cycle is cut at the first repeated node instead of recursing forever.
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let known: HashSet<i32> = categories.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<i32>, Vec<Category>> = HashMap::new();
    for category in categories {
        let parent = category.parent_id.filter(|id| known.contains(id));
        children.entry(parent).or_default().push(category);
    }

    let mut seen = HashSet::new();
    let roots = children.remove(&None).unwrap_or_default();
    let mut forest = attach(roots, &mut children, &mut seen);

    // Whatever is left only hangs off a cycle; expose it rather than drop it.
    let mut stranded: Vec<Category> = children.into_values().flatten().collect();
    stranded.sort_by_key(|c| (c.display_order, c.id));
    for category in stranded {
        if seen.insert(category.id) {
            forest.push(CategoryNode {
                category,
                children: Vec::new(),
            });
        }
    }
    forest
}

fn attach(
    level: Vec<Category>,
    children: &mut HashMap<Option<i32>, Vec<Category>>,
    seen: &mut HashSet<i32>,
) -> Vec<CategoryNode> {
    let mut nodes = Vec::with_capacity(level.len());
    for category in level {
        if !seen.insert(category.id) {
            continue;
        }
        let below = children.remove(&Some(category.id)).unwrap_or_default();
        let children = attach(below, children, seen);
        nodes.push(CategoryNode { category, children });
    }
    nodes
}

/// Flat list in display order, or the nested tree.
pub async fn list(repo: &dyn Repository, as_tree: bool) -> Result<CategoryListing, ApiError> {
    let categories = repo.list_categories().await?;
    Ok(if as_tree {
        CategoryListing::Tree(build_tree(categories))
    } else {
        CategoryListing::Flat(categories)
    })
}

pub async fn get(repo: &dyn Repository, id: i32) -> Result<Category, ApiError> {
    repo.find_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))
}

pub async fn get_by_slug(repo: &dyn Repository, slug: &str) -> Result<Category, ApiError> {
    repo.find_category_by_slug(slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))
}

pub async fn create(repo: &dyn Repository, req: CreateCategoryRequest) -> Result<Category, ApiError> {
    let slug = slug_for("name", &req.name)?;
    if repo.category_slug_taken(&slug, None).await? {
        return Err(ApiError::conflict(DUPLICATE_NAME));
    }
    if let Some(parent_id) = req.parent_id {
        ensure_parent_exists(repo, parent_id).await?;
    }

    let category = repo
        .insert_category(NewCategory {
            name: req.name.trim().to_string(),
            slug,
            description: req.description,
            parent_id: req.parent_id,
            display_order: req.display_order.unwrap_or(0),
        })
        .await?;
    tracing::info!(category_id = category.id, slug = %category.slug, "category created");
    Ok(category)
}

/// update
///
/// Partial. Re-parenting is refused when it would make the category its own parent
/// or place it below one of its descendants.
pub async fn update(
    repo: &dyn Repository,
    id: i32,
    req: UpdateCategoryRequest,
) -> Result<Category, ApiError> {
    let mut category = get(repo, id).await?;

    if let Some(name) = req.name {
        let name = name.trim().to_string();
        if name != category.name {
            let slug = slug_for("name", &name)?;
            if repo.category_slug_taken(&slug, Some(id)).await? {
                return Err(ApiError::conflict(DUPLICATE_NAME));
            }
            category.slug = slug;
        }
        category.name = name;
    }

    if let Some(parent_id) = req.parent_id {
        if let Some(parent_id) = parent_id {
            if parent_id == id {
                return Err(ApiError::bad_request("Category cannot be its own parent"));
            }
            ensure_parent_exists(repo, parent_id).await?;
            let all = repo.list_categories().await?;
            if creates_cycle(&all, id, parent_id) {
                return Err(ApiError::bad_request(
                    "Category cannot be moved under one of its own descendants",
                ));
            }
        }
        category.parent_id = parent_id;
    }

    if let Some(description) = req.description {
        category.description = description;
    }
    if let Some(display_order) = req.display_order {
        category.display_order = display_order;
    }

    repo.save_category(&category).await
}

/// Hard delete. Children become roots and posts lose the category.
pub async fn delete(repo: &dyn Repository, id: i32) -> Result<(), ApiError> {
    if !repo.delete_category(id).await? {
        return Err(ApiError::not_found("Category not found"));
    }
    tracing::info!(category_id = id, "category deleted");
    Ok(())
}

async fn ensure_parent_exists(repo: &dyn Repository, parent_id: i32) -> Result<(), ApiError> {
    match repo.find_category(parent_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::bad_request("Parent category not found")),
    }
}

/// creates_cycle
///
/// True when walking up from `new_parent` reaches `id`, i.e. `new_parent` is `id`
/// itself or one of its descendants.
pub fn creates_cycle(categories: &[Category], id: i32, new_parent: i32) -> bool {
    let parents: HashMap<i32, Option<i32>> =
        categories.iter().map(|c| (c.id, c.parent_id)).collect();
    let mut visited = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == id {
            return true;
        }
        if !visited.insert(current) {
            // A stored loop that does not involve `id`.
            return false;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(id: i32, parent_id: Option<i32>, display_order: i32) -> Category {
        let now = Utc::now();
        Category {
            id,
            name: format!("Category {id}"),
            slug: format!("category-{id}"),
            description: None,
            parent_id,
            display_order,
            created_at: now,
            updated_at: now,
        }
    }

    fn ids(nodes: &[CategoryNode]) -> Vec<i32> {
        nodes.iter().map(|n| n.category.id).collect()
    }

    #[test]
    fn groups_children_under_parents_in_input_order() {
        let tree = build_tree(vec![
            category(1, None, 0),
            category(2, Some(1), 0),
            category(3, None, 1),
            category(4, Some(1), 1),
            category(5, Some(2), 0),
        ]);
        assert_eq!(ids(&tree), vec![1, 3]);
        assert_eq!(ids(&tree[0].children), vec![2, 4]);
        assert_eq!(ids(&tree[0].children[0].children), vec![5]);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn orphans_become_roots() {
        let tree = build_tree(vec![category(1, None, 0), category(2, Some(99), 0)]);
        assert_eq!(ids(&tree), vec![1, 2]);
    }

    #[test]
    fn stored_cycles_do_not_hang() {
        let tree = build_tree(vec![
            category(1, None, 0),
            category(2, Some(3), 0),
            category(3, Some(2), 0),
        ]);
        let mut all = ids(&tree);
        all.sort();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[test]
    fn detects_multi_level_cycles() {
        // 1 <- 2 <- 3
        let rows = vec![
            category(1, None, 0),
            category(2, Some(1), 0),
            category(3, Some(2), 0),
        ];
        assert!(creates_cycle(&rows, 1, 3));
        assert!(creates_cycle(&rows, 1, 1));
        assert!(!creates_cycle(&rows, 3, 1));
        assert!(!creates_cycle(&rows, 2, 1));
    }
}
