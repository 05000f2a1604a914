mod filter;
mod job;
mod naming;
mod node;
mod numbering;
mod sort;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

pub use filter::NodeFilter;
pub use job::{job_key, Job, JobTable, Queue};
pub use naming::{display_label, regex_from_str, NameRule};
pub use node::{CoreSlot, Node, NodeAttribute, NodeState};
pub use numbering::{short_name, Numbering, RemapDecision, RemapReason};
pub use sort::SortExpression;

use crate::config::Config;
use crate::error::ClusterError;
use crate::scheduler::RawNode;

/// Normalized worker nodes of one refresh cycle
#[derive(Clone, Debug, Default)]
pub struct Cluster {
    /// Nodes keyed by the number used for display; either the ordinal parsed from
    /// the node name (with placeholders filling gaps), or 1..N when remapped
    pub nodes: BTreeMap<u64, Node>,
    /// Number of nodes reported by the scheduler
    pub total_nodes: usize,
    /// Highest display number
    pub highest_wn: u64,
    pub total_cores: usize,
    /// Number of cores running a job
    pub busy_cores: usize,
    /// Number of nodes that are down or offline
    pub offdown_nodes: usize,
    /// Distinct naming schemes, e.g. `wn` and `ps`
    pub subclusters: BTreeSet<String>,
    /// None if the cluster has no nodes
    pub remap: Option<RemapDecision>,
    /// Number of nodes removed by filters
    pub filtered: usize,
}

impl Cluster {
    /// Normalizes nodes reported by a scheduler.
    ///
    /// Fails if the nodes reference jobs missing from `jobs`, or if the configured sort
    /// expression cannot be applied; no partial cluster is returned in either case.
    pub fn build(config: &Config, raw: Vec<RawNode>, jobs: &JobTable) -> Result<Self, ClusterError> {
        let mut nodes = Vec::with_capacity(raw.len());
        let mut cluster = Cluster {
            total_nodes: raw.len(),
            ..Default::default()
        };

        for raw in raw {
            let mut node = Node::from_raw(raw, jobs)?;
            node.label = display_label(&node.name, &config.name_rules, config.max_label_len);

            cluster.total_cores += node.cores.len();
            cluster.busy_cores += node.busy();
            if node.state.is_unavailable() {
                cluster.offdown_nodes += 1;
            }

            cluster.subclusters.insert(node.numbering.tag.clone());
            nodes.push(node);
        }

        let numbering: Vec<Numbering> = nodes.iter().map(|n| n.numbering.clone()).collect();
        cluster.remap = RemapDecision::decide(&numbering, cluster.offdown_nodes, config);

        match &cluster.remap {
            Some(decision) if decision.remap() => {
                debug!(reasons = ?decision.reasons, "remapping {} nodes", nodes.len());

                if let Some(sort) = &config.sort {
                    sort.sort(&mut nodes)?;
                }

                cluster.filtered = config.filter.apply(&mut nodes);
                if cluster.filtered > 0 {
                    debug!("{} nodes hidden by filters", cluster.filtered);
                }

                cluster.nodes = (1..).zip(nodes).collect();
                cluster.highest_wn = cluster.nodes.len() as u64;
            }
            Some(_) => {
                // Without remapping every node has a unique, non-zero ordinal
                for node in nodes {
                    if let Some(ordinal) = node.numbering.ordinal {
                        cluster.nodes.insert(ordinal, node);
                    }
                }

                cluster.highest_wn = cluster.nodes.keys().last().copied().unwrap_or_default();
                for ordinal in 1..=cluster.highest_wn {
                    cluster
                        .nodes
                        .entry(ordinal)
                        .or_insert_with(|| Node::placeholder(ordinal));
                }
            }
            None => {}
        }

        Ok(cluster)
    }

    pub fn is_remapped(&self) -> bool {
        self.remap.as_ref().is_some_and(RemapDecision::remap)
    }

    /// Number of nodes that are neither down nor offline
    pub fn online_nodes(&self) -> usize {
        self.total_nodes - self.offdown_nodes
    }

    /// Lowest display number of a node that is not a placeholder
    pub fn min_ordinal(&self) -> Option<u64> {
        self.nodes
            .iter()
            .find(|(_, node)| !node.is_placeholder())
            .map(|(&ordinal, _)| ordinal)
    }

    /// Largest number of cores on any node
    pub fn max_cores(&self) -> usize {
        self.nodes
            .values()
            .map(|node| node.cores.len())
            .max()
            .unwrap_or_default()
    }
}
