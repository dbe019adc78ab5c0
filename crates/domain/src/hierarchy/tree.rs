//! Category tree snapshot and traversals.
//!
//! A `CategoryTree` is an arena keyed by id plus a `parent -> children` index.
//! It is built once per operation from a full store snapshot and never
//! mutated, so every traversal within one operation sees the same data.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::entities::Category;
use crate::ids::CategoryId;

use super::error::TreeError;
use super::{MAX_DEPTH, PATH_SEPARATOR};

/// One row of the flattened pre-order listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlatCategory<'a> {
    pub category: &'a Category,
    pub depth: u8,
}

/// Immutable arena of categories with a derived child index.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: HashMap<CategoryId, Category>,
    // Keyed by parent; `None` holds the roots. Each list is in sibling order.
    children: HashMap<Option<CategoryId>, Vec<CategoryId>>,
}

impl CategoryTree {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        let nodes: HashMap<CategoryId, Category> = categories
            .into_iter()
            .map(|category| (category.id(), category))
            .collect();

        let mut children: HashMap<Option<CategoryId>, Vec<CategoryId>> = HashMap::new();
        for category in nodes.values() {
            children
                .entry(category.parent_id())
                .or_default()
                .push(category.id());
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| nodes[a].sibling_cmp(&nodes[b]));
        }

        Self { nodes, children }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)
    }

    /// All categories, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.nodes.values()
    }

    /// Direct children of `parent` (`None` for roots), in sibling order.
    pub fn children(&self, parent: Option<CategoryId>) -> Vec<&Category> {
        self.children
            .get(&parent)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn roots(&self) -> Vec<&Category> {
        self.children(None)
    }

    pub fn child_count(&self, parent: CategoryId) -> usize {
        self.children.get(&Some(parent)).map_or(0, Vec::len)
    }

    /// Walk from `id` up to its root. Leaf first.
    ///
    /// Every upward traversal goes through here. The walk stops after
    /// `MAX_DEPTH + 1` steps and refuses to revisit a node, so corrupt data
    /// surfaces as an error instead of a hang.
    fn walk_up(&self, id: CategoryId) -> Result<Vec<&Category>, TreeError> {
        let mut chain: Vec<&Category> = Vec::with_capacity(MAX_DEPTH);
        let mut seen = HashSet::with_capacity(MAX_DEPTH + 1);
        let mut cursor = Some(id);

        while let Some(current) = cursor {
            if !seen.insert(current) {
                return Err(TreeError::CycleDetected(id));
            }
            let node = match (self.nodes.get(&current), chain.last()) {
                (Some(node), _) => node,
                (None, None) => return Err(TreeError::UnknownCategory(current)),
                (None, Some(child)) => {
                    return Err(TreeError::DanglingParent {
                        category_id: child.id(),
                        parent_id: current,
                    })
                }
            };
            chain.push(node);
            if chain.len() > MAX_DEPTH {
                return Err(TreeError::DepthOverrun {
                    category_id: id,
                    max_depth: MAX_DEPTH,
                });
            }
            cursor = node.parent_id();
        }

        Ok(chain)
    }

    /// Root-first chain ending with the category itself (breadcrumb feed).
    pub fn ancestor_chain(&self, id: CategoryId) -> Result<Vec<&Category>, TreeError> {
        let mut chain = self.walk_up(id)?;
        chain.reverse();
        Ok(chain)
    }

    /// Root-first ancestors, excluding the category itself.
    pub fn ancestors(&self, id: CategoryId) -> Result<Vec<&Category>, TreeError> {
        let mut chain = self.ancestor_chain(id)?;
        chain.pop();
        Ok(chain)
    }

    /// Computed depth: the number of ancestors (roots are 0).
    pub fn level(&self, id: CategoryId) -> Result<u8, TreeError> {
        // walk_up caps the chain at MAX_DEPTH nodes, so this always fits
        Ok(self.ancestors(id)?.len() as u8)
    }

    /// Names from root to `id` joined by `" > "`.
    pub fn full_path(&self, id: CategoryId) -> Result<String, TreeError> {
        let names: Vec<&str> = self
            .ancestor_chain(id)?
            .into_iter()
            .map(|category| category.name().as_str())
            .collect();
        Ok(names.join(PATH_SEPARATOR))
    }

    /// Every node below `id` paired with its depth relative to `id`
    /// (the node itself is first, at depth 0). Breadth-first.
    pub fn subtree(&self, id: CategoryId) -> Result<Vec<(&Category, u8)>, TreeError> {
        let root = self.get(id).ok_or(TreeError::UnknownCategory(id))?;

        let mut out = vec![(root, 0u8)];
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([(id, 0u8)]);

        while let Some((current, depth)) = queue.pop_front() {
            for child in self.children(Some(current)) {
                if !seen.insert(child.id()) {
                    return Err(TreeError::CycleDetected(child.id()));
                }
                let child_depth = depth.saturating_add(1);
                out.push((child, child_depth));
                queue.push_back((child.id(), child_depth));
            }
        }

        Ok(out)
    }

    /// Every category whose ancestor chain includes `id`, breadth-first.
    pub fn descendants(&self, id: CategoryId) -> Result<Vec<&Category>, TreeError> {
        Ok(self
            .subtree(id)?
            .into_iter()
            .skip(1)
            .map(|(category, _)| category)
            .collect())
    }

    /// How many levels hang below `id` (0 for a leaf).
    pub fn subtree_height(&self, id: CategoryId) -> Result<u8, TreeError> {
        Ok(self
            .subtree(id)?
            .into_iter()
            .map(|(_, depth)| depth)
            .max()
            .unwrap_or(0))
    }

    /// Depth-first pre-order listing starting from the ordered roots.
    ///
    /// Each node is followed by its whole subtree before its next sibling.
    /// Nodes that cannot be reached from a root are left out.
    pub fn flattened(&self) -> Vec<FlatCategory<'_>> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut stack: Vec<(&Category, u8)> = self
            .roots()
            .into_iter()
            .rev()
            .map(|root| (root, 0))
            .collect();

        while let Some((category, depth)) = stack.pop() {
            if !seen.insert(category.id()) {
                continue;
            }
            out.push(FlatCategory { category, depth });
            for child in self.children(Some(category.id())).into_iter().rev() {
                stack.push((child, depth.saturating_add(1)));
            }
        }

        out
    }
}
