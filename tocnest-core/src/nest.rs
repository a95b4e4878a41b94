//! Heading nesting: turn the flat, ordered heading list into a tree

use crate::heading::HeadingRecord;

/// A node of the TOC tree. The synthetic root carries no heading.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TocNode {
    pub heading: Option<HeadingRecord>,
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// The synthetic root that anchors the top level
    pub fn root() -> Self {
        Self::default()
    }

    pub fn leaf(heading: HeadingRecord) -> Self {
        Self {
            heading: Some(heading),
            children: Vec::new(),
        }
    }

    /// Heading level, 0 for the synthetic root
    pub fn level(&self) -> u8 {
        self.heading.as_ref().map_or(0, |h| h.level)
    }

    pub fn is_root(&self) -> bool {
        self.heading.is_none()
    }

    /// Number of headings in this subtree, the node itself included
    pub fn len(&self) -> usize {
        usize::from(self.heading.is_some())
            + self.children.iter().map(TocNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth of the deepest heading below this node (0 for a leaf)
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Headings of the subtree in document (pre-)order
    pub fn headings(&self) -> Vec<&HeadingRecord> {
        let mut out = Vec::new();
        self.collect_headings(&mut out);
        out
    }

    fn collect_headings<'a>(&'a self, out: &mut Vec<&'a HeadingRecord>) {
        if let Some(heading) = &self.heading {
            out.push(heading);
        }
        for child in &self.children {
            child.collect_headings(out);
        }
    }

    /// Follow the last child `depth` times
    fn last_descendant_mut(&mut self, depth: usize) -> &mut TocNode {
        let mut node = self;
        for _ in 0..depth {
            // The open stack mirrors the rightmost path, so this only stops early on misuse
            let Some(last) = node.children.len().checked_sub(1) else {
                break;
            };
            node = &mut node.children[last];
        }
        node
    }
}

/// Output of [`nest_headings`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NestedHeadings {
    /// Synthetic root whose children are the top-level sections
    pub root: TocNode,
    /// The input records, in input order
    pub headings: Vec<HeadingRecord>,
}

/// Nest headings by level.
///
/// Keeps a stack of open levels along the rightmost path of the tree. Each
/// heading pops every open node whose level is not smaller than its own and is
/// appended under whatever remains on top (the root when the stack is empty).
/// Skipped levels are absorbed: an `h3` right after an `h1` becomes its child.
pub fn nest_headings(headings: &[HeadingRecord]) -> NestedHeadings {
    let mut root = TocNode::root();
    let mut open: Vec<u8> = Vec::new();

    for heading in headings {
        while open.last().is_some_and(|&level| level >= heading.level) {
            open.pop();
        }
        root.last_descendant_mut(open.len())
            .children
            .push(TocNode::leaf(heading.clone()));
        open.push(heading.level);
    }

    NestedHeadings {
        root,
        headings: headings.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn records(levels: &[u8]) -> Vec<HeadingRecord> {
        let mut doc = Document::new();
        levels
            .iter()
            .enumerate()
            .map(|(i, &level)| HeadingRecord {
                id: format!("h{i}"),
                text: format!("Heading {i}"),
                level,
                tag: format!("H{level}"),
                node: doc.create_element(&format!("h{level}")),
            })
            .collect()
    }

    fn ids(node: &TocNode) -> Vec<&str> {
        node.children
            .iter()
            .map(|c| c.heading.as_ref().map_or("", |h| h.id.as_str()))
            .collect()
    }

    fn assert_levels_increase(node: &TocNode) {
        for child in &node.children {
            assert!(child.level() > node.level());
            assert_levels_increase(child);
        }
    }

    #[test]
    fn test_nest_empty() {
        let nested = nest_headings(&[]);
        assert!(nested.root.is_root());
        assert!(nested.root.children.is_empty());
        assert!(nested.root.is_empty());
    }

    #[test]
    fn test_siblings_and_children() {
        let nested = nest_headings(&records(&[1, 2, 2, 3, 1]));
        assert_eq!(ids(&nested.root), vec!["h0", "h4"]);
        assert_eq!(ids(&nested.root.children[0]), vec!["h1", "h2"]);
        assert_eq!(ids(&nested.root.children[0].children[1]), vec!["h3"]);
        assert_eq!(nested.root.len(), 5);
        assert_eq!(nested.root.depth(), 3);
    }

    #[test]
    fn test_skipped_levels_are_absorbed() {
        let nested = nest_headings(&records(&[1, 3, 2]));
        let h1 = &nested.root.children[0];
        assert_eq!(ids(h1), vec!["h1", "h2"]);
        assert_eq!(h1.children[0].level(), 3);
        assert_eq!(h1.children[1].level(), 2);
    }

    #[test]
    fn test_first_heading_deeper_than_later_ones() {
        let nested = nest_headings(&records(&[3, 2, 1, 4]));
        assert_eq!(ids(&nested.root), vec!["h0", "h1", "h2"]);
        assert_eq!(ids(&nested.root.children[2]), vec!["h3"]);
    }

    #[test]
    fn test_flat_copy_and_preorder() {
        let input = records(&[2, 3, 3, 2, 4, 1]);
        let nested = nest_headings(&input);
        assert_eq!(nested.headings, input);
        let preorder: Vec<_> = nested.root.headings().into_iter().cloned().collect();
        assert_eq!(preorder, input);
    }

    #[test]
    fn test_invariants_hold_for_all_level_sequences() {
        // Every sequence of length 5 over levels 1..=6
        for seed in 0..6u32.pow(5) {
            let mut n = seed;
            let levels: Vec<u8> = (0..5)
                .map(|_| {
                    let level = (n % 6) as u8 + 1;
                    n /= 6;
                    level
                })
                .collect();
            let input = records(&levels);
            let nested = nest_headings(&input);
            assert_levels_increase(&nested.root);
            let preorder: Vec<_> = nested.root.headings().into_iter().cloned().collect();
            assert_eq!(preorder, input, "levels {levels:?}");
        }
    }
}
