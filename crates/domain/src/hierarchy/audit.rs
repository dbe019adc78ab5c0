//! Whole-tree integrity report.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ids::CategoryId;

use super::error::TreeError;
use super::tree::CategoryTree;
use super::MAX_LEVEL;

/// A category whose stored level disagrees with its ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleLevel {
    pub category_id: CategoryId,
    pub stored: u8,
    pub computed: u8,
}

/// Categories sharing one case-folded name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameClash {
    pub key: String,
    pub category_ids: Vec<CategoryId>,
}

/// Everything wrong with a snapshot. Empty lists mean the invariant holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TreeAudit {
    pub total: usize,
    pub stale_levels: Vec<StaleLevel>,
    pub too_deep: Vec<CategoryId>,
    pub dangling_parents: Vec<CategoryId>,
    pub cycles: Vec<CategoryId>,
    pub name_clashes: Vec<NameClash>,
}

impl TreeAudit {
    pub fn is_healthy(&self) -> bool {
        self.stale_levels.is_empty()
            && self.too_deep.is_empty()
            && self.dangling_parents.is_empty()
            && self.cycles.is_empty()
            && self.name_clashes.is_empty()
    }
}

impl CategoryTree {
    pub fn audit(&self) -> TreeAudit {
        let mut report = TreeAudit {
            total: self.len(),
            ..TreeAudit::default()
        };
        let mut by_key: BTreeMap<String, Vec<CategoryId>> = BTreeMap::new();

        for category in self.iter() {
            let id = category.id();
            by_key.entry(category.name().key()).or_default().push(id);

            match self.level(id) {
                Ok(computed) if computed != category.level() => {
                    report.stale_levels.push(StaleLevel {
                        category_id: id,
                        stored: category.level(),
                        computed,
                    });
                }
                Ok(_) => {}
                Err(TreeError::DepthOverrun { .. }) => report.too_deep.push(id),
                Err(TreeError::DanglingParent { .. }) => report.dangling_parents.push(id),
                Err(TreeError::CycleDetected(_)) => report.cycles.push(id),
                Err(TreeError::UnknownCategory(_)) => {}
            }
            if category.level() > MAX_LEVEL && !report.too_deep.contains(&id) {
                report.too_deep.push(id);
            }
        }

        report.name_clashes = by_key
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(key, mut category_ids)| {
                category_ids.sort();
                NameClash { key, category_ids }
            })
            .collect();

        for list in [
            &mut report.too_deep,
            &mut report.dangling_parents,
            &mut report.cycles,
        ] {
            list.sort();
        }
        report.stale_levels.sort_by_key(|stale| stale.category_id);

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Category;
    use crate::value_objects::CategoryName;
    use chrono::{TimeZone, Utc};

    fn node(name: &str, parent: Option<CategoryId>, level: u8) -> Category {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Category::new(CategoryName::new(name).unwrap(), now).with_placement(parent, level)
    }

    #[test]
    fn consistent_tree_is_healthy() {
        let root = node("Soccer", None, 0);
        let child = node("Balls", Some(root.id()), 1);
        let report = CategoryTree::new([root, child]).audit();
        assert!(report.is_healthy());
        assert_eq!(report.total, 2);
    }

    #[test]
    fn reports_stale_levels() {
        let root = node("Soccer", None, 0);
        let child = node("Balls", Some(root.id()), 2);
        let child_id = child.id();
        let report = CategoryTree::new([root, child]).audit();
        assert_eq!(
            report.stale_levels,
            vec![StaleLevel {
                category_id: child_id,
                stored: 2,
                computed: 1,
            }]
        );
        assert!(!report.is_healthy());
    }

    #[test]
    fn reports_structural_corruption() {
        let a_id = CategoryId::new();
        let b_id = CategoryId::new();
        let a = node("A", Some(b_id), 1).with_id(a_id);
        let b = node("B", Some(a_id), 1).with_id(b_id);
        let orphan = node("Orphan", Some(CategoryId::new()), 1);
        let orphan_id = orphan.id();

        let l0 = node("L0", None, 0);
        let l1 = node("L1", Some(l0.id()), 1);
        let l2 = node("L2", Some(l1.id()), 2);
        let l3 = node("L3", Some(l2.id()), 3);
        let l3_id = l3.id();

        let report = CategoryTree::new([a, b, orphan, l0, l1, l2, l3]).audit();
        let mut expected_cycles = vec![a_id, b_id];
        expected_cycles.sort();
        assert_eq!(report.cycles, expected_cycles);
        assert_eq!(report.dangling_parents, vec![orphan_id]);
        assert_eq!(report.too_deep, vec![l3_id]);
    }

    #[test]
    fn reports_case_insensitive_name_clashes() {
        let a = node("Shoes", None, 0);
        let b = node("SHOES", None, 0);
        let report = CategoryTree::new([a, b]).audit();
        assert_eq!(report.name_clashes.len(), 1);
        assert_eq!(report.name_clashes[0].key, "shoes");
        assert_eq!(report.name_clashes[0].category_ids.len(), 2);
    }
}
