//! Section tree types.

use serde::{Deserialize, Serialize};

/// A node in the heading hierarchy.
///
/// Each section exclusively owns its children, so the tree has no shared
/// nodes and no cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text (empty for an implicit section)
    pub title: String,

    /// Nesting level, 1 = top
    pub level: u32,

    /// Body paragraphs directly under this heading
    pub paragraphs: Vec<String>,

    /// Nested sections
    pub children: Vec<Section>,
}

impl Section {
    /// Create an empty section.
    pub fn new(title: impl Into<String>, level: u32) -> Self {
        Self {
            title: title.into(),
            level: level.max(1),
            paragraphs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create the untitled section that holds paragraphs preceding any heading.
    pub fn implicit() -> Self {
        Self::new(String::new(), 1)
    }

    /// Whether this section has no heading of its own.
    pub fn is_implicit(&self) -> bool {
        self.title.is_empty()
    }

    /// Count this section and all of its descendants.
    pub fn total_sections(&self) -> usize {
        1 + self.children.iter().map(|c| c.total_sections()).sum::<usize>()
    }

    /// Count body paragraphs in this section and all of its descendants.
    pub fn total_paragraphs(&self) -> usize {
        self.paragraphs.len()
            + self
                .children
                .iter()
                .map(|c| c.total_paragraphs())
                .sum::<usize>()
    }

    /// Depth of the subtree rooted here (1 for a leaf).
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_counts() {
        let mut leaf = Section::new("1.1", 2);
        leaf.paragraphs.push("body".to_string());
        let mut root = Section::new("1", 1);
        root.paragraphs.push("intro".to_string());
        root.children.push(leaf);

        assert_eq!(root.total_sections(), 2);
        assert_eq!(root.total_paragraphs(), 2);
        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn test_level_is_positive() {
        assert_eq!(Section::new("x", 0).level, 1);
        assert!(Section::implicit().is_implicit());
    }
}
