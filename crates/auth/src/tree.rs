//! Permission tree assembly for menu/navigation views.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use aegis_core::PermissionId;

use crate::rbac::Permission;

/// A permission plus its ordered children, produced fresh per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionTreeNode {
    #[serde(flatten)]
    pub permission: Permission,

    #[serde(default)]
    pub children: Vec<PermissionTreeNode>,
}

/// Assemble a forest from flat permission records.
///
/// Records are ordered by `sort_order` (stable on ties) before linking, so
/// both the root list and every sibling list come out sorted. A record whose
/// `parent_id` does not resolve (including self-parents and parent chains
/// that never reach a root) is left out of the forest rather than promoted
/// to a root.
pub fn build_tree(permissions: &[Permission]) -> Vec<PermissionTreeNode> {
    let mut ordered: Vec<&Permission> = permissions.iter().collect();
    ordered.sort_by_key(|p| p.sort_order);

    let index_of: HashMap<PermissionId, usize> = ordered
        .iter()
        .enumerate()
        .map(|(index, p)| (p.id, index))
        .collect();

    // Arena of wrapper nodes plus index-based child lists; nodes are moved
    // out of the arena exactly once during assembly.
    let mut arena: Vec<Option<PermissionTreeNode>> = ordered
        .iter()
        .map(|p| {
            Some(PermissionTreeNode {
                permission: (*p).clone(),
                children: Vec::new(),
            })
        })
        .collect();

    let mut child_indices: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
    let mut root_indices: Vec<usize> = Vec::new();

    for (index, p) in ordered.iter().enumerate() {
        match p.parent_id {
            None => root_indices.push(index),
            Some(parent_id) => {
                if let Some(&parent) = index_of.get(&parent_id) {
                    if parent != index {
                        child_indices[parent].push(index);
                    }
                }
            }
        }
    }

    root_indices
        .into_iter()
        .filter_map(|index| take_subtree(index, &mut arena, &child_indices))
        .collect()
}

fn take_subtree(
    index: usize,
    arena: &mut Vec<Option<PermissionTreeNode>>,
    child_indices: &[Vec<usize>],
) -> Option<PermissionTreeNode> {
    let mut node = arena[index].take()?;
    node.children = child_indices[index]
        .iter()
        .filter_map(|&child| take_subtree(child, arena, child_indices))
        .collect();
    Some(node)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::PermissionKind;
    use proptest::prelude::*;

    fn permission(
        id: PermissionId,
        code: &str,
        parent_id: Option<PermissionId>,
        sort_order: i32,
    ) -> Permission {
        Permission {
            id,
            name: code.to_string(),
            code: code.to_string(),
            description: None,
            kind: PermissionKind::Menu,
            path: None,
            parent_id,
            sort_order,
        }
    }

    fn codes(nodes: &[PermissionTreeNode]) -> Vec<String> {
        nodes.iter().map(|n| n.permission.code.clone()).collect()
    }

    #[test]
    fn empty_input_builds_empty_forest() {
        assert!(build_tree(&[]).is_empty());
    }

    #[test]
    fn dangling_parent_drops_the_node() {
        let root = PermissionId::new();
        let child = PermissionId::new();
        let absent = PermissionId::new();

        let tree = build_tree(&[
            permission(root, "root", None, 0),
            permission(child, "child", Some(root), 1),
            permission(PermissionId::new(), "orphan", Some(absent), 2),
        ]);

        assert_eq!(codes(&tree), vec!["root"]);
        assert_eq!(codes(&tree[0].children), vec!["child"]);
    }

    #[test]
    fn siblings_come_out_in_sort_order() {
        let root = PermissionId::new();
        let tree = build_tree(&[
            permission(root, "root", None, 0),
            permission(PermissionId::new(), "third", Some(root), 3),
            permission(PermissionId::new(), "first", Some(root), 1),
            permission(PermissionId::new(), "second", Some(root), 2),
        ]);

        assert_eq!(codes(&tree[0].children), vec!["first", "second", "third"]);
    }

    #[test]
    fn sort_ties_preserve_input_order() {
        let tree = build_tree(&[
            permission(PermissionId::new(), "a", None, 5),
            permission(PermissionId::new(), "b", None, 5),
            permission(PermissionId::new(), "c", None, 5),
        ]);

        assert_eq!(codes(&tree), vec!["a", "b", "c"]);
    }

    #[test]
    fn child_declared_before_its_parent_still_attaches() {
        let parent = PermissionId::new();
        let tree = build_tree(&[
            permission(PermissionId::new(), "child", Some(parent), 0),
            permission(parent, "parent", None, 1),
        ]);

        assert_eq!(codes(&tree), vec!["parent"]);
        assert_eq!(codes(&tree[0].children), vec!["child"]);
    }

    #[test]
    fn self_parent_is_dropped_without_crashing() {
        let looped = PermissionId::new();
        let tree = build_tree(&[
            permission(PermissionId::new(), "root", None, 0),
            permission(looped, "loop", Some(looped), 1),
        ]);

        assert_eq!(codes(&tree), vec!["root"]);
    }

    #[test]
    fn cyclic_parent_chain_terminates_and_loses_the_cycle() {
        let a = PermissionId::new();
        let b = PermissionId::new();
        let tree = build_tree(&[
            permission(PermissionId::new(), "root", None, 0),
            permission(a, "a", Some(b), 1),
            permission(b, "b", Some(a), 2),
        ]);

        assert_eq!(codes(&tree), vec!["root"]);
    }

    #[test]
    fn deep_chain_nests_fully() {
        let ids: Vec<PermissionId> = (0..5).map(|_| PermissionId::new()).collect();
        let mut records = vec![permission(ids[0], "p0", None, 0)];
        for i in 1..ids.len() {
            records.push(permission(ids[i], &format!("p{i}"), Some(ids[i - 1]), i as i32));
        }

        let tree = build_tree(&records);
        assert_eq!(tree.len(), 1);

        let mut depth = 0;
        let mut cursor = &tree[0];
        while let Some(next) = cursor.children.first() {
            depth += 1;
            cursor = next;
        }
        assert_eq!(depth, ids.len() - 1);
    }

    proptest! {
        #[test]
        fn parentless_records_are_exactly_the_roots(
            sort_orders in proptest::collection::vec(0i32..10, 1..20),
            parent_choices in proptest::collection::vec(proptest::option::of(0usize..20), 1..20),
        ) {
            let ids: Vec<PermissionId> =
                sort_orders.iter().map(|_| PermissionId::new()).collect();

            let records: Vec<Permission> = sort_orders
                .iter()
                .enumerate()
                .map(|(i, &order)| {
                    // Only reuse ids from the record set itself; out-of-range
                    // choices become dangling parents on purpose.
                    let parent = parent_choices
                        .get(i)
                        .copied()
                        .flatten()
                        .filter(|&p| p < ids.len() && p != i)
                        .map(|p| ids[p]);
                    permission(ids[i], &format!("p{i}"), parent, order)
                })
                .collect();

            let tree = build_tree(&records);

            let parentless = records.iter().filter(|p| p.parent_id.is_none()).count();
            prop_assert_eq!(tree.len(), parentless);

            fn count(nodes: &[PermissionTreeNode]) -> usize {
                nodes.iter().map(|n| 1 + count(&n.children)).sum()
            }
            prop_assert!(count(&tree) <= records.len());
        }
    }
}
