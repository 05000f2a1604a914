use color_eyre::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::cluster::{Job, NodeAttribute};

use super::{QueueReport, RawNode, Scheduler};

const USERS: &[&str] = &[
    "alice", "bob", "carol", "dave", "erin", "atlas001", "atlas002", "cms", "lhcb05",
];
const QUEUES: &[&str] = &["short", "long", "grid"];
const CORES: &[usize] = &[8, 8, 16, 32];

/// Synthetic cluster for trying out the dashboard; a new state is drawn on every refresh
#[derive(Debug)]
pub struct Demo {
    rng: StdRng,
    nodes: Vec<RawNode>,
    jobs: Vec<Job>,
}

impl Demo {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            nodes: Vec::new(),
            jobs: Vec::new(),
        }
    }

    fn generate(&mut self) {
        let rng = &mut self.rng;
        let count = rng.gen_range(24..=96);
        let mut nodes = Vec::with_capacity(count);
        let mut jobs = Vec::new();
        let mut next_id = 1000;

        for ordinal in 1..=count {
            // Leave a few gaps in the numbering
            if rng.gen_bool(0.04) {
                continue;
            }

            let mut node = RawNode {
                name: format!("wn{:03}.demo.local", ordinal),
                state: '-',
                cores: *CORES.choose(rng).unwrap_or(&8),
                gpus: rng.gen_bool(0.2).then(|| rng.gen_range(1..=4)),
                ..Default::default()
            };

            if rng.gen_bool(0.05) {
                node.state = if rng.gen_bool(0.5) { 'd' } else { 'o' };
                nodes.push(node);
                continue;
            }

            let load: f64 = rng.gen();
            let mut core = 0;
            while core < node.cores && rng.gen_bool(load) {
                let width = rng.gen_range(1..=4).min(node.cores - core);
                let id = format!("{}.demo", next_id);
                next_id += 1;

                for slot in core..core + width {
                    node.jobs.insert(slot, id.clone());
                }
                core += width;

                jobs.push(Job {
                    id,
                    user: USERS.choose(rng).unwrap_or(&"alice").to_string(),
                    state: 'R',
                    queue: QUEUES.choose(rng).unwrap_or(&"short").to_string(),
                });
            }

            if core == node.cores {
                node.state = 'j';
            }

            nodes.push(node);
        }

        for _ in 0..rng.gen_range(0..40) {
            jobs.push(Job {
                id: format!("{}.demo", next_id),
                user: USERS.choose(rng).unwrap_or(&"alice").to_string(),
                state: if rng.gen_bool(0.8) { 'Q' } else { 'H' },
                queue: QUEUES.choose(rng).unwrap_or(&"short").to_string(),
            });
            next_id += 1;
        }

        self.nodes = nodes;
        self.jobs = jobs;
    }
}

impl Scheduler for Demo {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn refresh(&mut self) -> Result<()> {
        self.generate();
        Ok(())
    }

    fn jobs(&self) -> Result<Vec<Job>> {
        Ok(self.jobs.clone())
    }

    fn queues(&self) -> Result<QueueReport> {
        Ok(QueueReport::from_jobs(&self.jobs, |c| c == 'R', |c| c == 'Q'))
    }

    fn nodes(&self) -> Result<Vec<RawNode>> {
        Ok(self.nodes.clone())
    }

    fn attributes(&self) -> &'static [NodeAttribute] {
        &[
            NodeAttribute::State,
            NodeAttribute::Queues,
            NodeAttribute::Name,
            NodeAttribute::Cores,
            NodeAttribute::Gpus,
        ]
    }
}
