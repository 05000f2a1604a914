use regex::Regex;
use serde::{de, Deserialize, Deserializer};

use super::node::Node;
use super::numbering::short_name;

/// Rules for hiding nodes from the display; only applied to remapped clusters
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeFilter {
    /// 1-based positions in the (sorted) node list
    pub out_by_index: Vec<usize>,
    /// Exact node names, with or without domain
    pub out_by_name: Vec<String>,
    /// If non-empty, only nodes matching one of these patterns are shown
    #[serde(deserialize_with = "regex_list")]
    pub in_by_pattern: Vec<Regex>,
    #[serde(deserialize_with = "regex_list")]
    pub out_by_pattern: Vec<Regex>,
    /// State codes of nodes to hide
    pub out_by_state: Vec<char>,
}

impl NodeFilter {
    pub fn is_empty(&self) -> bool {
        self.out_by_index.is_empty()
            && self.out_by_name.is_empty()
            && self.in_by_pattern.is_empty()
            && self.out_by_pattern.is_empty()
            && self.out_by_state.is_empty()
    }

    /// Removes filtered nodes and returns the number of nodes removed
    pub fn apply(&self, nodes: &mut Vec<Node>) -> usize {
        let before = nodes.len();
        let mut position = 0;
        nodes.retain(|node| {
            position += 1;
            self.keep(position, node)
        });

        before - nodes.len()
    }

    fn keep(&self, position: usize, node: &Node) -> bool {
        let name = node.name.as_str();

        !self.out_by_index.contains(&position)
            && !self
                .out_by_name
                .iter()
                .any(|v| v == name || v == short_name(name))
            && (self.in_by_pattern.is_empty()
                || self.in_by_pattern.iter().any(|r| r.is_match(name)))
            && !self.out_by_pattern.iter().any(|r| r.is_match(name))
            && !self.out_by_state.contains(&node.state.0)
    }
}

/// Compiles a list of regular expressions
pub fn regex_list<'de, D>(deserializer: D) -> Result<Vec<Regex>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<String> = Deserialize::deserialize(deserializer)?;
    values
        .iter()
        .map(|value| {
            Regex::new(value)
                .map_err(|err| de::Error::custom(format!("invalid pattern {:?}: {}", value, err)))
        })
        .collect()
}
