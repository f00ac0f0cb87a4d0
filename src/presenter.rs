use crate::comment::CommentNode;
use crate::comment_tree::CommentTree;
use crate::error::{Error, Result};

/// Rows replaced by an activation: `removed` rows starting at `start` are now
/// `inserted` rows. The first of them is always the activated row itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowChange {
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
    pub row_count: usize,
}

/// Whatever draws the rows. It re-queries the presenter after being told
/// which rows changed, and may redraw everything or just the range.
pub trait RenderSurface {
    fn rows_changed(&mut self, change: RowChange);
}

/// Exposes the visible comments of a tree as numbered rows.
#[derive(Debug)]
pub struct CommentListPresenter {
    tree: CommentTree,
    /// Positions in the tree of the rows, rebuilt after every mutation.
    rows: Vec<usize>,
}

impl CommentListPresenter {
    pub fn new(tree: CommentTree) -> Self {
        let mut presenter = Self {
            tree,
            rows: Vec::new(),
        };
        presenter.refresh_rows();
        presenter
    }

    pub fn tree(&self) -> &CommentTree {
        &self.tree
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_at(&self, index: usize) -> Result<&CommentNode> {
        let position = self.position_of_row(index)?;
        Ok(&self.tree.nodes()[position])
    }

    /// Replies folded away under the comment at `index`.
    pub fn hidden_replies(&self, index: usize) -> Result<usize> {
        let position = self.position_of_row(index)?;
        Ok(self.tree.descendant_count(position))
    }

    /// Rows in display order, for renderers that draw them all at once.
    pub fn rows(&self) -> impl Iterator<Item = &CommentNode> + '_ {
        self.tree.visible_sequence()
    }

    /// Collapses or expands the comment at `index` and tells the surface which
    /// rows changed.
    pub fn handle_row_activated(
        &mut self,
        index: usize,
        surface: &mut impl RenderSurface,
    ) -> Result<RowChange> {
        let position = self.position_of_row(index)?;
        let end = self.tree.subtree_end(position);
        let id = self.tree.nodes()[position].id().clone();

        let removed = self.rows_within(position, end);
        self.tree.toggle_collapse(&id)?;
        self.refresh_rows();
        let inserted = self.rows_within(position, end);

        let change = RowChange {
            start: index,
            removed,
            inserted,
            row_count: self.rows.len(),
        };
        surface.rows_changed(change);
        Ok(change)
    }

    /// Appends a further page of the thread.
    pub fn append(&mut self, nodes: impl IntoIterator<Item = CommentNode>) -> Result<usize> {
        let added = self.tree.append(nodes)?;
        self.refresh_rows();
        Ok(added)
    }

    fn position_of_row(&self, index: usize) -> Result<usize> {
        self.rows.get(index).copied().ok_or(Error::IndexOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    fn rows_within(&self, start: usize, end: usize) -> usize {
        self.rows
            .iter()
            .filter(|&&position| (start..end).contains(&position))
            .count()
    }

    fn refresh_rows(&mut self) {
        self.rows = self.tree.visible_positions().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<RowChange>);

    impl RenderSurface for Recorder {
        fn rows_changed(&mut self, change: RowChange) {
            self.0.push(change);
        }
    }

    fn presenter() -> CommentListPresenter {
        let nodes = [("a", 0), ("b", 1), ("c", 2), ("d", 0)]
            .into_iter()
            .map(|(id, level)| CommentNode::new(id, level, "u", "now", ""));
        CommentListPresenter::new(CommentTree::from_nodes(nodes).unwrap())
    }

    #[test]
    fn test_activation_reports_changed_rows() {
        let mut p = presenter();
        let mut surface = Recorder::default();

        let change = p.handle_row_activated(1, &mut surface).unwrap();
        assert_eq!(
            change,
            RowChange {
                start: 1,
                removed: 2,
                inserted: 1,
                row_count: 3
            }
        );
        assert_eq!(surface.0, vec![change]);
        assert_eq!(p.row_at(2).unwrap().id().as_str(), "d");
        assert_eq!(p.hidden_replies(1).unwrap(), 1);

        let change = p.handle_row_activated(1, &mut surface).unwrap();
        assert_eq!((change.removed, change.inserted, change.row_count), (1, 2, 4));
    }

    #[test]
    fn test_row_out_of_range() {
        let mut p = presenter();
        let mut surface = Recorder::default();
        p.handle_row_activated(1, &mut surface).unwrap();
        assert_eq!(p.row_count(), 3);

        let err = p.row_at(5).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 5, len: 3 }));
        assert!(p.handle_row_activated(3, &mut surface).is_err());
        assert!(matches!(
            p.hidden_replies(3),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert_eq!(surface.0.len(), 1);
    }

    #[test]
    fn test_append_refreshes_rows() {
        let mut p = presenter();
        p.append(vec![CommentNode::new("e", 1, "u", "now", "")]).unwrap();
        assert_eq!(p.row_count(), 5);
        assert_eq!(p.rows().last().unwrap().id().as_str(), "e");
    }
}
