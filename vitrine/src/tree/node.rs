use crate::collection::RecordId;
use crate::repository::Hierarchical;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// A record materialized in its place in the category forest.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<T> {
    pub record: T,
    /// Number of ancestors; roots have depth 0.
    pub depth: usize,
    /// Slugs from the root down to this node, joined with `/`.
    pub path: String,
    pub children: Vec<TreeNode<T>>,
}

impl<T: Hierarchical> TreeNode<T> {
    /// Depth-first search for the node holding `id`.
    pub fn find(&self, id: RecordId) -> Option<&TreeNode<T>> {
        if self.record.id() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Number of nodes in this subtree, the node itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Pre-order listing of every node of a forest.
pub fn flatten<T>(forest: &[TreeNode<T>]) -> Vec<&TreeNode<T>> {
    let mut nodes = Vec::new();
    let mut stack: Vec<&TreeNode<T>> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        nodes.push(node);
        stack.extend(node.children.iter().rev());
    }
    nodes
}

/// Finds the node holding `id` anywhere in a forest.
pub fn find_node<T: Hierarchical>(forest: &[TreeNode<T>], id: RecordId) -> Option<&TreeNode<T>> {
    forest.iter().find_map(|root| root.find(id))
}

/// Builds the forest for a flat list of records in one pass over the input.
///
/// Every record appears exactly once in the output. A record whose parent is not
/// in the list becomes a root, and siblings are ordered by `(order, name)`.
///
/// Records caught in a parent cycle are not reachable from any root. They are
/// logged and promoted to roots so the build always terminates and loses nothing.
pub fn build_tree<T: Hierarchical>(records: Vec<T>) -> Vec<TreeNode<T>> {
    let mut roots = Vec::new();
    let mut by_id: HashMap<RecordId, T> = HashMap::with_capacity(records.len());
    for record in records {
        match record.id() {
            Some(id) => {
                by_id.insert(id, record);
            }
            None => roots.push(make_node(record, 0, None, Vec::new())),
        }
    }

    let mut children: HashMap<Option<RecordId>, Vec<RecordId>> = HashMap::new();
    for (id, record) in &by_id {
        let parent = record
            .parent()
            .filter(|parent| parent != id && by_id.contains_key(parent));
        children.entry(parent).or_default().push(*id);
    }

    let mut builder = Builder { by_id, children };
    let top = builder.children.remove(&None).unwrap_or_default();
    for id in top {
        if let Some(node) = builder.materialize(id, 0, None) {
            roots.push(node);
        }
    }

    if !builder.by_id.is_empty() {
        let mut stranded: Vec<RecordId> = builder.by_id.keys().copied().collect();
        stranded.sort_by(|a, b| match (builder.by_id.get(a), builder.by_id.get(b)) {
            (Some(a), Some(b)) => sibling_order(a, b),
            _ => Ordering::Equal,
        });
        log::warn!(
            "{} record(s) are caught in a parent cycle and were promoted to roots",
            stranded.len()
        );
        for id in stranded {
            if let Some(node) = builder.materialize(id, 0, None) {
                roots.push(node);
            }
        }
    }

    roots.sort_by(|a, b| sibling_order(&a.record, &b.record));
    roots
}

struct Builder<T> {
    by_id: HashMap<RecordId, T>,
    children: HashMap<Option<RecordId>, Vec<RecordId>>,
}

impl<T: Hierarchical> Builder<T> {
    /// Takes `id` out of the pending set and builds its subtree. Returns `None` for
    /// an id already placed, which only happens inside a cycle.
    fn materialize(&mut self, id: RecordId, depth: usize, parent_path: Option<&str>) -> Option<TreeNode<T>> {
        let record = self.by_id.remove(&id)?;
        let path = match parent_path {
            Some(parent_path) => format!("{}/{}", parent_path, record.slug()),
            None => record.slug().to_string(),
        };

        let mut nodes = Vec::new();
        for child in self.children.remove(&Some(id)).unwrap_or_default() {
            if let Some(child) = self.materialize(child, depth + 1, Some(path.as_str())) {
                nodes.push(child);
            }
        }
        nodes.sort_by(|a, b| sibling_order(&a.record, &b.record));
        Some(make_node(record, depth, Some(path), nodes))
    }
}

fn make_node<T: Hierarchical>(record: T, depth: usize, path: Option<String>, children: Vec<TreeNode<T>>) -> TreeNode<T> {
    let path = path.unwrap_or_else(|| record.slug().to_string());
    TreeNode {
        record,
        depth,
        path,
        children,
    }
}

fn sibling_order<T: Hierarchical>(a: &T, b: &T) -> Ordering {
    a.order()
        .cmp(&b.order())
        .then_with(|| a.name().cmp(b.name()))
}

/// Ids of every record below `root`, given the full flat list. Tolerates cycles.
pub(crate) fn descendants_of<T: Hierarchical>(records: &[T], root: RecordId) -> Vec<RecordId> {
    let mut children: HashMap<RecordId, Vec<RecordId>> = HashMap::new();
    for record in records {
        if let (Some(id), Some(parent)) = (record.id(), record.parent()) {
            children.entry(parent).or_default().push(id);
        }
    }

    let mut seen = HashSet::from([root]);
    let mut found = Vec::new();
    let mut queue = vec![root];
    while let Some(current) = queue.pop() {
        for child in children.get(&current).map(Vec::as_slice).unwrap_or_default() {
            if seen.insert(*child) {
                found.push(*child);
                queue.push(*child);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Category;

    fn category(name: &str, parent: Option<&Category>, order: i64) -> Category {
        let mut category = Category::new(name, &name.to_lowercase())
            .with_parent(parent.and_then(|p| p.id))
            .with_order(order);
        category.id = Some(RecordId::new());
        category
    }

    #[test]
    fn every_record_becomes_one_node() {
        let lasers = category("Lasers", None, 0);
        let ipl = category("IPL", Some(&lasers), 1);
        let diode = category("Diode", Some(&lasers), 0);
        let skin = category("Skin", None, 1);
        let filters = category("Filters", Some(&ipl), 0);

        let forest = build_tree(vec![
            filters.clone(),
            skin.clone(),
            ipl.clone(),
            lasers.clone(),
            diode.clone(),
        ]);

        assert_eq!(forest.iter().map(TreeNode::size).sum::<usize>(), 5);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].record.name, "Lasers");
        assert_eq!(forest[1].record.name, "Skin");

        let children: Vec<&str> = forest[0]
            .children
            .iter()
            .map(|c| c.record.name.as_str())
            .collect();
        assert_eq!(children, vec!["Diode", "IPL"]);

        let node = find_node(&forest, filters.id.unwrap()).unwrap();
        assert_eq!(node.depth, 2);
        assert_eq!(node.path, "lasers/ipl/filters");
        assert!(node.is_leaf());
    }

    #[test]
    fn equal_order_falls_back_to_name() {
        let b = category("Beta", None, 0);
        let a = category("Alpha", None, 0);
        let forest = build_tree(vec![b, a]);
        assert_eq!(forest[0].record.name, "Alpha");
    }

    #[test]
    fn orphans_become_roots() {
        let missing = category("Gone", None, 0);
        let orphan = category("Orphan", Some(&missing), 0);
        let forest = build_tree(vec![orphan.clone()]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].depth, 0);
        assert_eq!(forest[0].path, "orphan");
    }

    #[test]
    fn corrupted_cycle_terminates_without_losing_records() {
        let mut a = category("A", None, 0);
        let mut b = category("B", None, 1);
        a.parent = b.id;
        b.parent = a.id;
        let root = category("Root", None, 2);

        let forest = build_tree(vec![a, b, root]);
        let total: usize = forest.iter().map(TreeNode::size).sum();
        assert_eq!(total, 3);
        assert_eq!(flatten(&forest).len(), 3);
    }

    #[test]
    fn flatten_is_pre_order() {
        let lasers = category("Lasers", None, 0);
        let ipl = category("IPL", Some(&lasers), 0);
        let skin = category("Skin", None, 1);
        let forest = build_tree(vec![skin, ipl, lasers]);
        let paths: Vec<&str> = flatten(&forest).iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, vec!["lasers", "lasers/ipl", "skin"]);
    }

    #[test]
    fn descendants_include_grandchildren() {
        let lasers = category("Lasers", None, 0);
        let ipl = category("IPL", Some(&lasers), 0);
        let filters = category("Filters", Some(&ipl), 0);
        let skin = category("Skin", None, 1);
        let records = vec![lasers.clone(), ipl.clone(), filters.clone(), skin];

        let mut found = descendants_of(&records, lasers.id.unwrap());
        found.sort();
        let mut expected = vec![ipl.id.unwrap(), filters.id.unwrap()];
        expected.sort();
        assert_eq!(found, expected);
    }
}
