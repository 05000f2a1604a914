use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::config::Config;

/// Most placeholder columns that gap-filling may add before nodes are remapped
pub const MAX_PLACEHOLDERS: u64 = 10_000;

/// Returns the name of a node without its domain
pub fn short_name(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Ordinal and subcluster tag derived from a node name
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Numbering {
    /// Leading non-digit part of the name, e.g. `wn` for `wn067`
    pub tag: String,
    /// Digits following the tag, concatenated; None if the name has no digits
    pub ordinal: Option<u64>,
}

impl Numbering {
    /// Parses a node name; `wn01-03-003.example.org` yields tag `wn` and ordinal 103003
    pub fn parse(name: &str) -> Self {
        let name = short_name(name);
        let split = name
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(name.len());
        let (tag, rest) = name.split_at(split);

        let digits: String = rest.chars().filter(char::is_ascii_digit).collect();
        // Numbers too large to represent are treated like names without digits
        let ordinal = if digits.is_empty() {
            None
        } else {
            digits.parse().ok()
        };

        Self {
            tag: tag.to_string(),
            ordinal,
        }
    }
}

/// Conditions that force nodes to be renumbered 1..N
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemapReason {
    /// Remapping was explicitly requested
    Requested,
    /// Node names follow more than one naming scheme
    Subclusters,
    /// Numbering starts far from 1
    ExoticStart,
    /// Too many nodes are down or offline
    OfflineDown,
    /// Some node names contain no digits
    Unnumbered,
    /// Several nodes share an ordinal
    Duplicates,
    /// A node is numbered 0, which has no column in a 1-based grid
    ZeroOrdinal,
    /// Filling the gaps between node numbers would add too many empty columns
    Sparse,
}

impl fmt::Display for RemapReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            RemapReason::Requested => "remapping requested",
            RemapReason::Subclusters => "multiple subclusters",
            RemapReason::ExoticStart => "exotic starting number",
            RemapReason::OfflineDown => "too many offline/down nodes",
            RemapReason::Unnumbered => "node names without numbers",
            RemapReason::Duplicates => "duplicate node numbers",
            RemapReason::ZeroOrdinal => "node numbered zero",
            RemapReason::Sparse => "sparse node numbers",
        };

        f.write_str(text)
    }
}

/// Outcome of the remap decision; remapping happens if any reason applies
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemapDecision {
    pub reasons: Vec<RemapReason>,
}

impl RemapDecision {
    /// Decides whether nodes must be remapped.
    ///
    /// `numbering` holds the parsed name of every node and `offdown` the number of
    /// nodes that are down or offline. Returns None for a cluster without nodes.
    pub fn decide(numbering: &[Numbering], offdown: usize, config: &Config) -> Option<Self> {
        if numbering.is_empty() {
            return None;
        }

        let mut reasons = Vec::new();
        if config.blind_remap {
            reasons.push(RemapReason::Requested);
        }

        let tags: BTreeSet<&str> = numbering.iter().map(|n| n.tag.as_str()).collect();
        if tags.len() > 1 {
            reasons.push(RemapReason::Subclusters);
        }

        let ordinals: Vec<u64> = numbering.iter().filter_map(|n| n.ordinal).collect();
        if let Some(&min) = ordinals.iter().min() {
            if min > config.exotic_starting_wn {
                reasons.push(RemapReason::ExoticStart);
            }
        }

        if offdown as f64 / numbering.len() as f64 > config.offline_down_fraction {
            reasons.push(RemapReason::OfflineDown);
        }

        if ordinals.len() < numbering.len() {
            reasons.push(RemapReason::Unnumbered);
        }

        let mut seen = HashSet::with_capacity(ordinals.len());
        if !ordinals.iter().all(|ordinal| seen.insert(*ordinal)) {
            reasons.push(RemapReason::Duplicates);
        }

        if ordinals.contains(&0) {
            reasons.push(RemapReason::ZeroOrdinal);
        }

        if let Some(&max) = ordinals.iter().max() {
            if max.saturating_sub(seen.len() as u64) > MAX_PLACEHOLDERS {
                reasons.push(RemapReason::Sparse);
            }
        }

        Some(Self { reasons })
    }

    pub fn remap(&self) -> bool {
        !self.reasons.is_empty()
    }
}
