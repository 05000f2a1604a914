mod demo;
mod misc;
mod oar;
mod pbs;
mod sge;
mod snapshot;

use std::collections::BTreeMap;
use std::path::PathBuf;

use color_eyre::{eyre::eyre, Result};

pub use demo::Demo;
pub use oar::Oar;
pub use pbs::Pbs;
pub use sge::Sge;
pub use snapshot::Snapshot;

use crate::cluster::{Job, NodeAttribute, Queue};

/// A worker node as reported by a scheduler, before normalization
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawNode {
    /// Fully qualified name of the node
    pub name: String,
    /// Single character state code; `-` for free nodes
    pub state: char,
    /// Number of cores (job slots) on the node
    pub cores: usize,
    /// Sparse mapping of core index to job id
    pub jobs: BTreeMap<usize, String>,
    pub gpus: Option<usize>,
}

/// Queues plus the cluster-wide running/queued totals
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueReport {
    pub queues: Vec<Queue>,
    pub running: usize,
    pub queued: usize,
}

impl QueueReport {
    /// Aggregates queues from job states, for schedulers that do not report them
    pub fn from_jobs(
        jobs: &[Job],
        is_running: fn(char) -> bool,
        is_queued: fn(char) -> bool,
    ) -> Self {
        let mut queues: BTreeMap<&str, Queue> = BTreeMap::new();
        let mut report = QueueReport::default();

        for job in jobs {
            let queue = queues.entry(job.queue.as_str()).or_insert_with(|| Queue {
                name: job.queue.clone(),
                ..Default::default()
            });

            if is_running(job.state) {
                queue.running += 1;
                report.running += 1;
            } else if is_queued(job.state) {
                queue.queued += 1;
                report.queued += 1;
            }
        }

        report.queues = queues.into_values().collect();
        report
    }
}

/// Interface implemented by every batch system back end
pub trait Scheduler {
    /// Short name of the scheduler; also used as key into the state abbreviation tables
    fn name(&self) -> &'static str;

    /// Called once at the start of every refresh cycle
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    fn jobs(&self) -> Result<Vec<Job>>;

    fn queues(&self) -> Result<QueueReport>;

    fn nodes(&self) -> Result<Vec<RawNode>>;

    /// Attribute lines that can be shown for nodes of this scheduler
    fn attributes(&self) -> &'static [NodeAttribute] {
        &[
            NodeAttribute::State,
            NodeAttribute::Queues,
            NodeAttribute::Name,
            NodeAttribute::Cores,
        ]
    }
}

/// Options shared by the scheduler factories
#[derive(Clone, Debug, Default)]
pub struct SchedulerOptions {
    /// Directory containing a captured cluster state
    pub snapshot: Option<PathBuf>,
    /// Seed for the demo generator
    pub seed: u64,
}

type Factory = fn(&SchedulerOptions) -> Result<Box<dyn Scheduler>>;

/// Schedulers by name
const REGISTRY: &[(&str, Factory)] = &[
    ("pbs", pbs),
    ("oar", oar),
    ("sge", sge),
    ("demo", demo),
    ("snapshot", snapshot),
];

fn pbs(_: &SchedulerOptions) -> Result<Box<dyn Scheduler>> {
    Ok(Box::new(Pbs::default()))
}

fn oar(_: &SchedulerOptions) -> Result<Box<dyn Scheduler>> {
    Ok(Box::new(Oar::default()))
}

fn sge(_: &SchedulerOptions) -> Result<Box<dyn Scheduler>> {
    Ok(Box::new(Sge::default()))
}

fn demo(options: &SchedulerOptions) -> Result<Box<dyn Scheduler>> {
    Ok(Box::new(Demo::new(options.seed)))
}

fn snapshot(options: &SchedulerOptions) -> Result<Box<dyn Scheduler>> {
    let path = options
        .snapshot
        .clone()
        .ok_or_else(|| eyre!("the snapshot scheduler requires --snapshot <dir>"))?;

    Ok(Box::new(Snapshot::new(path)))
}

/// Names of all known schedulers
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

/// Constructs the scheduler registered under `name`
pub fn connect(name: &str, options: &SchedulerOptions) -> Result<Box<dyn Scheduler>> {
    let name = name.to_ascii_lowercase();
    match REGISTRY.iter().find(|(candidate, _)| *candidate == name) {
        Some((_, factory)) => factory(options),
        None => Err(eyre!(
            "unknown scheduler {:?}; expected one of {}",
            name,
            names().collect::<Vec<_>>().join(", ")
        )),
    }
}
