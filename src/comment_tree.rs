use crate::comment::{CommentId, CommentNode, Visibility};
use crate::error::{Error, Result};

/// A discussion thread flattened in pre-order: every comment is immediately
/// followed by its replies, and `level` is the only structure kept.
#[derive(Clone, Debug, Default)]
pub struct CommentTree {
    nodes: Vec<CommentNode>,
}

impl CommentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from comments already in pre-order.
    pub fn from_nodes(nodes: impl IntoIterator<Item = CommentNode>) -> Result<Self> {
        let mut tree = Self::new();
        tree.append(nodes)?;
        Ok(tree)
    }

    /// Appends comments after the current last one, e.g. a further page of a
    /// thread fetched in the background.
    ///
    /// Levels are checked before anything is inserted, so a rejected batch
    /// leaves the tree untouched. New comments inherit the collapse state of
    /// the ancestors they land under.
    pub fn append(&mut self, nodes: impl IntoIterator<Item = CommentNode>) -> Result<usize> {
        let nodes: Vec<CommentNode> = nodes.into_iter().collect();

        let mut max = self.nodes.last().map_or(0, |last| last.level() + 1);
        for node in &nodes {
            if node.level() > max {
                return Err(Error::LevelJump {
                    id: node.id().clone(),
                    level: node.level(),
                    max,
                });
            }
            max = node.level() + 1;
        }

        let start = self.ancestors_start();
        let added = nodes.len();
        self.nodes.extend(nodes);
        derive_visibility(&mut self.nodes[start..], false);

        tracing::debug!(added, total = self.nodes.len(), "appended comments");
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every comment, hidden ones included.
    pub fn nodes(&self) -> &[CommentNode] {
        &self.nodes
    }

    pub fn position(&self, id: &CommentId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id() == id)
    }

    pub fn get(&self, id: &CommentId) -> Option<&CommentNode> {
        self.position(id).map(|index| &self.nodes[index])
    }

    /// One past the last descendant of the comment at `index`, which must be
    /// below `len()`.
    pub(crate) fn subtree_end(&self, index: usize) -> usize {
        let level = self.nodes[index].level();
        self.nodes[index + 1..]
            .iter()
            .position(|node| node.level() <= level)
            .map_or(self.nodes.len(), |offset| index + 1 + offset)
    }

    /// Number of replies, direct or nested, under the comment at `index`.
    pub(crate) fn descendant_count(&self, index: usize) -> usize {
        self.subtree_end(index) - index - 1
    }

    /// Collapses an expanded comment or expands a collapsed one, then
    /// re-derives the visibility of its whole subtree. Returns whether the
    /// comment is now collapsed.
    ///
    /// Replies the user collapsed separately stay collapsed when an ancestor
    /// is expanded again.
    pub fn toggle_collapse(&mut self, id: &CommentId) -> Result<bool> {
        let index = self.position(id).ok_or_else(|| Error::NotFound(id.clone()))?;
        let end = self.subtree_end(index);
        let hidden_above = self.nodes[index].visibility() == Visibility::Hidden;

        let node = &mut self.nodes[index];
        node.collapsed = !node.collapsed;
        let collapsed = node.collapsed;

        derive_visibility(&mut self.nodes[index..end], hidden_above);

        tracing::debug!(%id, collapsed, affected = end - index, "toggled comment");
        Ok(collapsed)
    }

    /// The comments that get a row, in thread order. Cheap to clone, so it can
    /// be walked again from the start.
    pub fn visible_sequence(&self) -> impl Iterator<Item = &CommentNode> + Clone + '_ {
        self.nodes
            .iter()
            .filter(|node| node.visibility() != Visibility::Hidden)
    }

    /// Positions in `nodes()` of the comments that get a row.
    pub fn visible_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.visibility() != Visibility::Hidden)
            .map(|(index, _)| index)
    }

    /// Index of the top-level comment that starts the thread containing the
    /// last comment. Re-deriving from there covers every ancestor of an
    /// appended batch, and nothing can hide a top-level comment.
    fn ancestors_start(&self) -> usize {
        self.nodes
            .iter()
            .rposition(|node| node.level() == 0)
            .unwrap_or(0)
    }
}

/// Derives the visibility of each comment in a pre-order slice from the
/// collapse flags of the comment itself and its ancestors inside the slice.
/// `hidden_above` marks the whole slice as lying under a collapsed ancestor
/// outside of it.
///
/// The slice must start at its shallowest comment.
pub fn derive_visibility(nodes: &mut [CommentNode], hidden_above: bool) {
    let mut collapsed_levels: Vec<usize> = Vec::new();

    for node in nodes {
        while collapsed_levels
            .last()
            .is_some_and(|level| *level >= node.level())
        {
            collapsed_levels.pop();
        }

        node.visibility = if hidden_above || !collapsed_levels.is_empty() {
            Visibility::Hidden
        } else if node.collapsed {
            Visibility::Compact
        } else {
            Visibility::Visible
        };

        if node.collapsed {
            collapsed_levels.push(node.level());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, level: usize) -> CommentNode {
        CommentNode::new(id, level, format!("user_{id}"), "2 hours ago", format!("<p>{id}</p>"))
    }

    fn tree(levels: &[(&str, usize)]) -> CommentTree {
        CommentTree::from_nodes(levels.iter().map(|(id, level)| node(id, *level))).unwrap()
    }

    fn visibilities(tree: &CommentTree) -> Vec<Visibility> {
        tree.nodes().iter().map(|n| n.visibility()).collect()
    }

    fn visible_ids(tree: &CommentTree) -> Vec<&str> {
        tree.visible_sequence().map(|n| n.id().as_str()).collect()
    }

    #[test]
    fn test_collapse_hides_subtree_only() {
        let mut t = tree(&[("a", 0), ("b", 1), ("c", 2), ("d", 0)]);
        let collapsed = t.toggle_collapse(&"b".into()).unwrap();

        assert!(collapsed);
        assert_eq!(
            visibilities(&t),
            vec![
                Visibility::Visible,
                Visibility::Compact,
                Visibility::Hidden,
                Visibility::Visible
            ]
        );
        assert_eq!(visible_ids(&t), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_toggle_twice_restores_everything() {
        let mut t = tree(&[("a", 0), ("b", 1), ("c", 2), ("e", 1), ("d", 0)]);
        t.toggle_collapse(&"c".into()).unwrap();
        let before = visibilities(&t);

        t.toggle_collapse(&"a".into()).unwrap();
        t.toggle_collapse(&"a".into()).unwrap();

        assert_eq!(visibilities(&t), before);
    }

    #[test]
    fn test_nested_collapse_is_sticky() {
        let mut t = tree(&[("a", 0), ("b", 1), ("c", 2)]);
        t.toggle_collapse(&"b".into()).unwrap();
        t.toggle_collapse(&"a".into()).unwrap();
        assert_eq!(
            visibilities(&t),
            vec![Visibility::Compact, Visibility::Hidden, Visibility::Hidden]
        );

        t.toggle_collapse(&"a".into()).unwrap();
        assert_eq!(
            visibilities(&t),
            vec![Visibility::Visible, Visibility::Compact, Visibility::Hidden]
        );
        assert!(t.get(&"b".into()).unwrap().is_collapsed());
    }

    #[test]
    fn test_toggle_inside_collapsed_ancestor_stays_hidden() {
        let mut t = tree(&[("a", 0), ("b", 1), ("c", 2)]);
        t.toggle_collapse(&"a".into()).unwrap();
        t.toggle_collapse(&"b".into()).unwrap();
        assert_eq!(
            visibilities(&t),
            vec![Visibility::Compact, Visibility::Hidden, Visibility::Hidden]
        );

        t.toggle_collapse(&"a".into()).unwrap();
        assert_eq!(
            visibilities(&t),
            vec![Visibility::Visible, Visibility::Compact, Visibility::Hidden]
        );
    }

    #[test]
    fn test_toggle_leaf_only_flips_itself() {
        let mut t = tree(&[("a", 0), ("b", 1), ("c", 0)]);
        t.toggle_collapse(&"c".into()).unwrap();
        assert_eq!(
            visibilities(&t),
            vec![Visibility::Visible, Visibility::Visible, Visibility::Compact]
        );
        assert_eq!(t.descendant_count(2), 0);
    }

    #[test]
    fn test_toggle_unknown_id_is_not_found() {
        let mut t = tree(&[("a", 0)]);
        let err = t.toggle_collapse(&"zzz".into()).unwrap_err();
        assert!(matches!(err, Error::NotFound(id) if id.as_str() == "zzz"));
    }

    #[test]
    fn test_level_jump_is_rejected() {
        let err = CommentTree::from_nodes(vec![node("a", 0), node("b", 2)]).unwrap_err();
        assert!(matches!(err, Error::LevelJump { level: 2, max: 1, .. }));

        let err = CommentTree::from_nodes(vec![node("a", 1)]).unwrap_err();
        assert!(matches!(err, Error::LevelJump { level: 1, max: 0, .. }));
    }

    #[test]
    fn test_rejected_append_leaves_tree_untouched() {
        let mut t = tree(&[("a", 0), ("b", 1)]);
        let err = t.append(vec![node("c", 2), node("d", 4)]).unwrap_err();
        assert!(matches!(err, Error::LevelJump { .. }));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_append_under_collapsed_ancestor_is_hidden() {
        let mut t = tree(&[("a", 0), ("b", 1)]);
        t.toggle_collapse(&"a".into()).unwrap();

        t.append(vec![node("c", 2), node("d", 1), node("e", 0)]).unwrap();

        assert_eq!(
            visibilities(&t),
            vec![
                Visibility::Compact,
                Visibility::Hidden,
                Visibility::Hidden,
                Visibility::Hidden,
                Visibility::Visible
            ]
        );
        assert_eq!(visible_ids(&t), vec!["a", "e"]);
    }

    #[test]
    fn test_subtree_bounds() {
        let t = tree(&[("a", 0), ("b", 1), ("c", 2), ("d", 1), ("e", 0)]);
        assert_eq!(t.subtree_end(0), 4);
        assert_eq!(t.subtree_end(1), 3);
        assert_eq!(t.subtree_end(4), 5);
        assert_eq!(t.descendant_count(0), 3);
    }

    #[test]
    fn test_derive_visibility_with_hidden_ancestor() {
        let mut nodes = vec![node("x", 1), node("y", 2)];
        derive_visibility(&mut nodes, true);
        assert!(nodes.iter().all(|n| n.visibility() == Visibility::Hidden));
    }

    #[test]
    fn test_visible_sequence_is_restartable() {
        let mut t = tree(&[("a", 0), ("b", 1), ("c", 0)]);
        t.toggle_collapse(&"a".into()).unwrap();
        let seq = t.visible_sequence();
        assert_eq!(seq.clone().count(), 2);
        assert_eq!(seq.map(|n| n.id().as_str()).collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(t.visible_positions().collect::<Vec<_>>(), vec![0, 2]);
    }
}
