use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;

use crate::error::ClusterError;
use crate::scheduler::RawNode;

use super::job::{job_key, JobTable};
use super::numbering::Numbering;

/// Single character node state as shown in the state attribute line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeState(pub char);

impl NodeState {
    pub const FREE: NodeState = NodeState('-');
    pub const DOWN: NodeState = NodeState('d');
    pub const OFFLINE: NodeState = NodeState('o');
    pub const SUSPECTED: NodeState = NodeState('s');
    pub const MIXED: NodeState = NodeState('%');
    /// Placeholder for node numbers missing from the cluster
    pub const MISSING: NodeState = NodeState('?');

    /// Returns true if the node is down or offline
    pub fn is_unavailable(self) -> bool {
        self == Self::DOWN || self == Self::OFFLINE
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-node attributes that can be displayed below the core matrix
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeAttribute {
    /// Node state code
    State,
    /// Initials of queues with jobs on the node
    Queues,
    /// Display label of the node
    Name,
    /// Number of cores
    Cores,
    /// Number of GPUs
    Gpus,
}

impl fmt::Display for NodeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            NodeAttribute::State => "state",
            NodeAttribute::Queues => "queues",
            NodeAttribute::Name => "name",
            NodeAttribute::Cores => "cores",
            NodeAttribute::Gpus => "gpus",
        };

        f.write_str(name)
    }
}

/// Occupation of a single core
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreSlot {
    Free,
    /// Key of the job running on the core
    Busy(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Fully qualified name; empty for placeholders
    pub name: String,
    pub numbering: Numbering,
    pub state: NodeState,
    /// One slot per core
    pub cores: Vec<CoreSlot>,
    /// Initials of the queues of jobs running on this node
    pub queues: BTreeSet<char>,
    /// Short label used in place of the full name
    pub label: String,
    pub gpus: Option<usize>,
}

impl Node {
    /// Normalizes a node reported by a scheduler.
    ///
    /// Every job on the node must be present in `jobs`, and must be placed on one of
    /// the cores the node actually has.
    pub fn from_raw(raw: RawNode, jobs: &JobTable) -> Result<Self, ClusterError> {
        let mut cores = vec![CoreSlot::Free; raw.cores];
        let mut queues = BTreeSet::new();

        for (core, id) in raw.jobs {
            let job = jobs.get(&id).ok_or_else(|| ClusterError::MissingJob {
                job: job_key(&id).to_string(),
                node: raw.name.clone(),
            })?;

            let slot = cores
                .get_mut(core)
                .ok_or_else(|| ClusterError::CoreOutOfRange {
                    node: raw.name.clone(),
                    core,
                    cores: raw.cores,
                })?;

            *slot = CoreSlot::Busy(job.key().to_string());
            if let Some(initial) = job.queue.chars().next() {
                queues.insert(initial);
            }
        }

        Ok(Self {
            numbering: Numbering::parse(&raw.name),
            label: super::numbering::short_name(&raw.name).to_string(),
            name: raw.name,
            state: NodeState(raw.state),
            cores,
            queues,
            gpus: raw.gpus,
        })
    }

    /// Creates a core-less stand-in for a node number missing from the cluster
    pub fn placeholder(ordinal: u64) -> Self {
        Self {
            name: String::new(),
            numbering: Numbering {
                tag: String::new(),
                ordinal: Some(ordinal),
            },
            state: NodeState::MISSING,
            cores: Vec::new(),
            queues: BTreeSet::new(),
            label: String::new(),
            gpus: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.state == NodeState::MISSING && self.name.is_empty()
    }

    /// Number of cores with a job
    pub fn busy(&self) -> usize {
        self.cores
            .iter()
            .filter(|slot| matches!(slot, CoreSlot::Busy(_)))
            .count()
    }

    /// Returns the value shown for `attribute`, or None if the node has no such value
    pub fn attribute(&self, attribute: NodeAttribute) -> Option<String> {
        match attribute {
            NodeAttribute::State => Some(self.state.to_string()),
            NodeAttribute::Queues => Some(self.queues.iter().collect()),
            NodeAttribute::Name => Some(self.label.clone()),
            NodeAttribute::Cores => Some(self.cores.len().to_string()),
            NodeAttribute::Gpus => self.gpus.map(|gpus| gpus.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Job;

    fn jobs() -> JobTable {
        JobTable::new(vec![
            Job {
                id: "10.server".into(),
                user: "alice".into(),
                state: 'R',
                queue: "short".into(),
            },
            Job {
                id: "11.server".into(),
                user: "bob".into(),
                state: 'R',
                queue: "long".into(),
            },
        ])
    }

    fn raw(jobs: &[(usize, &str)]) -> RawNode {
        RawNode {
            name: "wn007.example.org".into(),
            state: 'j',
            cores: 4,
            jobs: jobs.iter().map(|(c, j)| (*c, j.to_string())).collect(),
            gpus: None,
        }
    }

    #[test]
    fn test_from_raw() {
        let node = Node::from_raw(raw(&[(0, "10.server"), (3, "11")]), &jobs()).unwrap();

        assert_eq!(node.label, "wn007");
        assert_eq!(node.numbering.ordinal, Some(7));
        assert_eq!(node.state, NodeState('j'));
        assert_eq!(
            node.cores,
            vec![
                CoreSlot::Busy("10".into()),
                CoreSlot::Free,
                CoreSlot::Free,
                CoreSlot::Busy("11".into())
            ]
        );
        assert_eq!(node.busy(), 2);
        assert_eq!(node.attribute(NodeAttribute::Queues), Some("ls".into()));
        assert_eq!(node.attribute(NodeAttribute::Cores), Some("4".into()));
        assert_eq!(node.attribute(NodeAttribute::Gpus), None);
    }

    #[test]
    fn test_missing_job() {
        let err = Node::from_raw(raw(&[(1, "999.server")]), &jobs()).unwrap_err();
        assert_eq!(
            err,
            ClusterError::MissingJob {
                job: "999".into(),
                node: "wn007.example.org".into()
            }
        );
        assert!(err.to_string().contains("\"999\""));
    }

    #[test]
    fn test_core_out_of_range() {
        let err = Node::from_raw(raw(&[(4, "10")]), &jobs()).unwrap_err();
        assert!(matches!(err, ClusterError::CoreOutOfRange { core: 4, cores: 4, .. }));
    }

    #[test]
    fn test_placeholder() {
        let node = Node::placeholder(3);
        assert!(node.is_placeholder());
        assert!(node.cores.is_empty());
        assert_eq!(node.numbering.ordinal, Some(3));
        assert_eq!(node.attribute(NodeAttribute::State), Some("?".into()));
    }
}
