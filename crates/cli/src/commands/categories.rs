//! Category commands.

use std::io::Write;

use parfumerie_backend::BackendClient;
use parfumerie_backend::repos::CategoryRepository;
use parfumerie_core::catalog::CategoryNode;

use super::CliError;

pub async fn tree(client: &BackendClient, out: &mut impl Write) -> Result<(), CliError> {
    let tree = CategoryRepository::new(client).tree().await?;
    write_tree(&tree, 0, out)?;
    Ok(())
}

/// Two spaces of indent per level, then `name (slug) #id`.
fn write_tree(nodes: &[CategoryNode], depth: usize, out: &mut impl Write) -> std::io::Result<()> {
    for node in nodes {
        writeln!(
            out,
            "{:indent$}{} ({}) #{}",
            "",
            node.category.name,
            node.category.slug,
            node.category.id,
            indent = depth * 2
        )?;
        write_tree(&node.children, depth + 1, out)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use parfumerie_core::CategoryId;
    use parfumerie_core::catalog::build_category_tree;
    use parfumerie_core::models::Category;

    use super::*;

    #[test]
    fn test_tree_indentation() {
        let cat = |id: i64, name: &str, slug: &str, parent: Option<i64>| Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            slug: slug.to_string(),
            parent_id: parent.map(CategoryId::new),
            sort_order: 0,
        };
        let tree = build_category_tree(vec![
            cat(1, "Women", "women", None),
            cat(2, "Floral", "floral", Some(1)),
            cat(3, "Men", "men", None),
        ]);

        let mut out = Vec::new();
        write_tree(&tree, 0, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Men (men) #3\nWomen (women) #1\n  Floral (floral) #2\n"
        );
    }
}
