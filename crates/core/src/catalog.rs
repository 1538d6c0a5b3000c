//! Category hierarchy.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::models::Category;
use crate::types::CategoryId;

/// Longest accepted slug.
pub const MAX_SLUG_LEN: usize = 120;

/// Invalid catalog input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("slug cannot be empty")]
    EmptySlug,
    #[error("slug must be at most {MAX_SLUG_LEN} characters")]
    SlugTooLong,
    #[error("slug may only contain lowercase letters, digits and single hyphens")]
    InvalidSlug,
    #[error("name cannot be empty")]
    EmptyName,
    #[error("category cannot be its own parent")]
    SelfParent,
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
}

/// Check a URL slug such as `eau-de-parfum`.
///
/// # Errors
///
/// Returns the first rule the slug breaks.
pub fn validate_slug(slug: &str) -> Result<(), CatalogError> {
    if slug.is_empty() {
        return Err(CatalogError::EmptySlug);
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(CatalogError::SlugTooLong);
    }
    let valid_chars = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid_chars || slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
        return Err(CatalogError::InvalidSlug);
    }
    Ok(())
}

/// Derive a slug from a display name, e.g. `Eau de Parfum` to `eau-de-parfum`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(MAX_SLUG_LEN);
    slug
}

/// A category with its children, ready to render as a menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Self>,
}

impl CategoryNode {
    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Self::len).sum::<usize>()
    }

    /// Always false; a node contains at least itself.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    fn collect_ids(&self, out: &mut Vec<CategoryId>) {
        out.push(self.category.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }

    fn find(&self, id: CategoryId) -> Option<&Self> {
        if self.category.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Build a forest from flat category rows.
///
/// Roots are categories with no parent or whose parent is not in `categories`.
/// Siblings are ordered by `(sort_order, name)`. Every category appears
/// exactly once: members of a parent cycle are promoted to roots where the
/// cycle is broken.
#[must_use]
pub fn build_category_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let ids: HashSet<CategoryId> = categories.iter().map(|c| c.id).collect();
    let mut by_id: HashMap<CategoryId, Category> = HashMap::with_capacity(categories.len());
    let mut children: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();
    let mut roots: Vec<CategoryId> = Vec::new();

    for category in categories {
        if by_id.contains_key(&category.id) {
            continue;
        }
        match category.parent_id {
            Some(parent) if parent != category.id && ids.contains(&parent) => {
                children.entry(parent).or_default().push(category.id);
            }
            _ => roots.push(category.id),
        }
        by_id.insert(category.id, category);
    }

    let sort = |list: &mut Vec<CategoryId>, by_id: &HashMap<CategoryId, Category>| {
        list.sort_by_key(|id| {
            by_id
                .get(id)
                .map(|c| (c.sort_order, c.name.clone()))
        });
    };

    let mut visited: HashSet<CategoryId> = HashSet::with_capacity(by_id.len());
    let mut forest = Vec::with_capacity(roots.len());
    sort(&mut roots, &by_id);
    for root in roots {
        forest.extend(assemble(root, &by_id, &children, &mut visited, &sort));
    }

    // Anything not reached hangs off a cycle; promote the lowest-ordered
    // member of each remaining component to a root.
    let mut leftovers: Vec<CategoryId> = by_id
        .keys()
        .filter(|id| !visited.contains(id))
        .copied()
        .collect();
    sort(&mut leftovers, &by_id);
    for id in leftovers {
        if !visited.contains(&id) {
            forest.extend(assemble(id, &by_id, &children, &mut visited, &sort));
        }
    }

    forest
}

fn assemble<F>(
    id: CategoryId,
    by_id: &HashMap<CategoryId, Category>,
    children: &HashMap<CategoryId, Vec<CategoryId>>,
    visited: &mut HashSet<CategoryId>,
    sort: &F,
) -> Option<CategoryNode>
where
    F: Fn(&mut Vec<CategoryId>, &HashMap<CategoryId, Category>),
{
    let category = by_id.get(&id)?.clone();
    visited.insert(id);
    let mut kids: Vec<CategoryId> = children
        .get(&id)
        .map(|list| {
            list.iter()
                .filter(|child| !visited.contains(child))
                .copied()
                .collect()
        })
        .unwrap_or_default();
    sort(&mut kids, by_id);

    let mut nodes = Vec::with_capacity(kids.len());
    for kid in kids {
        if !visited.contains(&kid) {
            nodes.extend(assemble(kid, by_id, children, visited, sort));
        }
    }

    Some(CategoryNode {
        category,
        children: nodes,
    })
}

/// `id` and every category below it, or just `id` if it is not in the tree.
#[must_use]
pub fn descendant_ids(tree: &[CategoryNode], id: CategoryId) -> Vec<CategoryId> {
    let mut out = Vec::new();
    match tree.iter().find_map(|node| node.find(id)) {
        Some(node) => node.collect_ids(&mut out),
        None => out.push(id),
    }
    out
}

/// Find a category by slug anywhere in the tree.
#[must_use]
pub fn find_by_slug<'a>(tree: &'a [CategoryNode], slug: &str) -> Option<&'a CategoryNode> {
    fn walk<'a>(nodes: &'a [CategoryNode], slug: &str) -> Option<&'a CategoryNode> {
        nodes.iter().find_map(|node| {
            if node.category.slug == slug {
                Some(node)
            } else {
                walk(&node.children, slug)
            }
        })
    }
    walk(tree, slug)
}
