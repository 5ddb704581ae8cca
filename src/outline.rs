//! Document outline ("bookmarks") tree built from a flat list of sections.

use crate::document::Destination;

/// One bookmark. `level` 0 is top level; a section nests under the closest
/// preceding section one level up.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineSection {
    pub name: String,
    pub level: usize,
    pub dest: Destination,
}

/// Tree links of one node, as indices into the section list. `parent: None`
/// means the `/Outlines` root.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct OutlineLinks {
    pub(crate) parent: Option<usize>,
    pub(crate) prev: Option<usize>,
    pub(crate) next: Option<usize>,
    pub(crate) first: Option<usize>,
    pub(crate) last: Option<usize>,
    /// Direct children.
    pub(crate) count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct OutlineTree {
    pub(crate) root: OutlineLinks,
    pub(crate) items: Vec<OutlineLinks>,
}

pub(crate) fn build_tree(sections: &[OutlineSection]) -> OutlineTree {
    let mut tree = OutlineTree {
        root: OutlineLinks::default(),
        items: vec![OutlineLinks::default(); sections.len()],
    };
    // Most recent item seen at each level; deeper levels are forgotten as
    // soon as a shallower section appears.
    let mut last_at_level: Vec<(usize, usize)> = Vec::new();
    for (idx, section) in sections.iter().enumerate() {
        if let Some(&(_, prev)) = last_at_level.iter().find(|(level, _)| *level == section.level) {
            tree.items[prev].next = Some(idx);
            tree.items[idx].prev = Some(prev);
        }
        let parent = section.level.checked_sub(1).and_then(|up| {
            last_at_level
                .iter()
                .find(|(level, _)| *level == up)
                .map(|(_, item)| *item)
        });
        tree.items[idx].parent = parent;
        let links = match parent {
            Some(parent) => &mut tree.items[parent],
            None => &mut tree.root,
        };
        if links.first.is_none() {
            links.first = Some(idx);
        }
        links.last = Some(idx);
        links.count += 1;

        last_at_level.retain(|(level, _)| *level < section.level);
        last_at_level.push((section.level, idx));
    }
    tree
}
