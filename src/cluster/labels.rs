//! Human-readable community names

use std::collections::HashMap;

use crate::data::record::UNKNOWN_TAG;
use crate::graph::Node;

/// Share of members below which a dominant tag is reported as mixed
pub const MIXED_THRESHOLD: f64 = 0.3;

/// Names a community from its members.
///
/// The default implementation only looks at primary tags; richer
/// labelers (detailed tags, external naming services) plug in here.
pub trait CommunityLabeler: Send + Sync {
    fn label(&self, community: u32, members: &[&Node]) -> String;
}

/// Labels a community as `"NN - TAG"` after its most frequent primary tag
#[derive(Debug, Clone, Copy, Default)]
pub struct DominantTagLabeler;

impl CommunityLabeler for DominantTagLabeler {
    fn label(&self, community: u32, members: &[&Node]) -> String {
        match dominant_tag(members) {
            Some((tag, share)) if share < MIXED_THRESHOLD => {
                format!("{:02} - {} (mixed)", community, tag.to_uppercase())
            }
            Some((tag, _)) => format!("{:02} - {}", community, tag.to_uppercase()),
            None => format!("{:02} - {}", community, UNKNOWN_TAG.to_uppercase()),
        }
    }
}

/// Most frequent known primary tag and its share of all members.
///
/// `"Unknown"` tags never win; ties go to the lexicographically smaller
/// tag so the result does not depend on hash order.
pub fn dominant_tag<'a>(members: &[&'a Node]) -> Option<(&'a str, f64)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &node in members {
        if node.main_tag != UNKNOWN_TAG && !node.main_tag.is_empty() {
            *counts.entry(node.main_tag.as_str()).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(tag, count)| (tag, count as f64 / members.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Tags;

    fn node(id: u64, tag: &str) -> Node {
        Node::new(id, &Tags::new(tag, UNKNOWN_TAG))
    }

    #[test]
    fn dominant_tag_skips_unknown() {
        let nodes = [node(1, "Unknown"), node(2, "Unknown"), node(3, "Books")];
        let members: Vec<&Node> = nodes.iter().collect();
        let (tag, share) = dominant_tag(&members).unwrap();
        assert_eq!(tag, "Books");
        assert!((share - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(DominantTagLabeler.label(4, &members), "04 - BOOKS");
    }

    #[test]
    fn weak_majority_is_marked_mixed() {
        let nodes: Vec<Node> = ["Books", "Games", "Music", "Shoes"]
            .iter()
            .enumerate()
            .map(|(i, tag)| node(i as u64, tag))
            .collect();
        let members: Vec<&Node> = nodes.iter().collect();
        // Four-way tie resolves to the smallest tag at 25%
        assert_eq!(DominantTagLabeler.label(12, &members), "12 - BOOKS (mixed)");
    }

    #[test]
    fn all_unknown() {
        let nodes = [node(1, "Unknown")];
        let members: Vec<&Node> = nodes.iter().collect();
        assert!(dominant_tag(&members).is_none());
        assert_eq!(DominantTagLabeler.label(0, &members), "00 - UNKNOWN");
    }
}
