use std::fmt;

use crate::source::CommentRecord;

/// Opaque identifier of a comment, as handed out by the content source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommentId(String);

impl CommentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for CommentId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// How a comment shows up in the rendered list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Header and body are shown.
    #[default]
    Visible,
    /// Not rendered at all: an ancestor is collapsed.
    Hidden,
    /// The comment itself is collapsed: a single summary row without body.
    Compact,
}

#[derive(Clone, Debug)]
pub struct CommentNode {
    id: CommentId,
    level: usize,
    author_username: String,
    date_created_string: String,
    text: String,
    pub(crate) collapsed: bool,
    pub(crate) visibility: Visibility,
}

impl CommentNode {
    pub fn new(
        id: impl Into<CommentId>,
        level: usize,
        author_username: impl Into<String>,
        date_created_string: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            level,
            author_username: author_username.into(),
            date_created_string: date_created_string.into(),
            text: text.into(),
            collapsed: false,
            visibility: Visibility::Visible,
        }
    }

    pub fn id(&self) -> &CommentId {
        &self.id
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn author_username(&self) -> &str {
        &self.author_username
    }

    pub fn date_created_string(&self) -> &str {
        &self.date_created_string
    }

    /// Raw HTML body.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the user collapsed this comment directly. Stays set while an
    /// ancestor hides it, so expanding the ancestor shows it compact again.
    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// Left padding for this comment. Top-level comments get one unit so they
    /// never sit flush against the edge.
    pub fn indent_width(&self, level_unit: u16) -> u16 {
        let depth = u16::try_from(self.level).unwrap_or(u16::MAX).saturating_add(1);
        level_unit.saturating_mul(depth)
    }

    /// Selects the dimmed author/date styling; the body is rendered only when
    /// this is false.
    pub fn is_collapsed_presentation(&self) -> bool {
        self.visibility != Visibility::Visible
    }
}

impl From<CommentRecord> for CommentNode {
    fn from(record: CommentRecord) -> Self {
        Self::new(
            record.id,
            record.level,
            record.author_username,
            record.date_created_string,
            record.text,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(level: usize) -> CommentNode {
        CommentNode::new("1", level, "pg", "1 hour ago", "<p>hi</p>")
    }

    #[test]
    fn test_indent_width_adds_one_unit() {
        assert_eq!(node(0).indent_width(15), 15);
        assert_eq!(node(2).indent_width(15), 45);
        assert_eq!(node(0).indent_width(2), 2);
        assert_eq!(node(usize::MAX).indent_width(2), u16::MAX);
    }

    #[test]
    fn test_collapsed_presentation_follows_visibility() {
        let mut n = node(1);
        assert!(!n.is_collapsed_presentation());
        n.visibility = Visibility::Compact;
        assert!(n.is_collapsed_presentation());
        n.visibility = Visibility::Hidden;
        assert!(n.is_collapsed_presentation());
    }

    #[test]
    fn test_new_node_starts_visible_and_expanded() {
        let n = node(3);
        assert_eq!(n.visibility(), Visibility::Visible);
        assert!(!n.is_collapsed());
        assert_eq!(n.id().as_str(), "1");
    }
}
