//! Selection state for the document.
//!
//! A selection is either absent, a caret inside a text run, a range within
//! a single text run, or a whole non-text node (a math leaf the caret has
//! landed on). Offsets are byte offsets into the text run and always fall
//! on a char boundary.

use super::node::NodeKey;

/// A position inside a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
}

impl Point {
    pub const fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

/// Current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    /// Collapsed caret inside a text run.
    Caret(Point),
    /// Anchor and focus inside the same text run. The anchor is where the
    /// selection started; the focus moves with the cursor and may precede
    /// the anchor.
    Range { anchor: Point, focus: Point },
    /// A whole non-text leaf is selected.
    Node(NodeKey),
}

impl Selection {
    pub const fn caret(key: NodeKey, offset: usize) -> Self {
        Self::Caret(Point::new(key, offset))
    }

    pub const fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    /// The text run the selection lives in, if it is a caret or range.
    pub const fn text_key(&self) -> Option<NodeKey> {
        match self {
            Self::Caret(point) => Some(point.key),
            Self::Range { anchor, .. } => Some(anchor.key),
            _ => None,
        }
    }

    /// The focus point, where the cursor visually sits.
    pub const fn focus(&self) -> Option<Point> {
        match self {
            Self::Caret(point) => Some(*point),
            Self::Range { focus, .. } => Some(*focus),
            _ => None,
        }
    }

    /// Range bounds in document order, collapsing a caret to an empty span.
    pub fn ordered_range(&self) -> Option<(Point, Point)> {
        match self {
            Self::Caret(point) => Some((*point, *point)),
            Self::Range { anchor, focus } => {
                if anchor.offset <= focus.offset {
                    Some((*anchor, *focus))
                } else {
                    Some((*focus, *anchor))
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn some_key() -> NodeKey {
        let mut map: SlotMap<NodeKey, ()> = SlotMap::with_key();
        map.insert(())
    }

    #[test]
    fn test_ordered_range_normalizes_backwards_selection() {
        let key = some_key();
        let selection = Selection::Range {
            anchor: Point::new(key, 7),
            focus: Point::new(key, 2),
        };
        let (start, end) = selection.ordered_range().unwrap();
        assert_eq!(start.offset, 2);
        assert_eq!(end.offset, 7);
    }

    #[test]
    fn test_caret_collapses_to_empty_span() {
        let key = some_key();
        let (start, end) = Selection::caret(key, 4).ordered_range().unwrap();
        assert_eq!(start, end);
    }

    #[test]
    fn test_node_selection_has_no_text_key() {
        let key = some_key();
        assert_eq!(Selection::Node(key).text_key(), None);
        assert!(Selection::Node(key).ordered_range().is_none());
    }
}
