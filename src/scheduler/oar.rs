use std::collections::BTreeMap;

use color_eyre::{eyre::Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::cluster::Job;

use super::misc::run;
use super::{QueueReport, RawNode, Scheduler};

/// OAR, queried via `oarnodes` and `oarstat` in JSON mode
#[derive(Clone, Debug)]
pub struct Oar {
    oarnodes: String,
    oarstat: String,
}

impl Default for Oar {
    fn default() -> Self {
        Self {
            oarnodes: "oarnodes".into(),
            oarstat: "oarstat".into(),
        }
    }
}

impl Scheduler for Oar {
    fn name(&self) -> &'static str {
        "oar"
    }

    fn jobs(&self) -> Result<Vec<Job>> {
        parse_jobs(&run(&self.oarstat, &["-J"])?)
    }

    fn queues(&self) -> Result<QueueReport> {
        // OAR does not report per-queue totals
        Ok(QueueReport::from_jobs(&self.jobs()?, |c| c == 'R', |c| c == 'W'))
    }

    fn nodes(&self) -> Result<Vec<RawNode>> {
        parse_nodes(&run(&self.oarnodes, &["-J"])?)
    }
}

/// A single resource (core) reported by `oarnodes -J`
#[derive(Debug, Deserialize)]
struct Resource {
    network_address: String,
    state: String,
    /// Job id(s) running on the resource; a number, a string, or a list
    #[serde(default)]
    jobs: Value,
}

#[derive(Debug, Deserialize)]
struct OarJob {
    #[serde(alias = "job_user")]
    owner: String,
    state: String,
    #[serde(alias = "queue_name")]
    queue: String,
}

/// Groups resources by host; cores are numbered in resource id order
fn parse_nodes(output: &[u8]) -> Result<Vec<RawNode>> {
    let resources: BTreeMap<String, Resource> =
        serde_json::from_slice(output).wrap_err("error while parsing oarnodes output")?;

    let mut resources: Vec<(u64, Resource)> = resources
        .into_iter()
        .map(|(id, resource)| (id.parse().unwrap_or(u64::MAX), resource))
        .collect();
    resources.sort_by_key(|(id, _)| *id);

    let mut nodes: Vec<RawNode> = Vec::new();
    for (_, resource) in resources {
        let idx = match nodes
            .iter()
            .position(|node| node.name == resource.network_address)
        {
            Some(idx) => idx,
            None => {
                nodes.push(RawNode {
                    name: resource.network_address.clone(),
                    state: node_state(&resource.state),
                    ..Default::default()
                });
                nodes.len() - 1
            }
        };

        let node = &mut nodes[idx];
        if let Some(job) = job_id(&resource.jobs) {
            node.jobs.insert(node.cores, job);
        }

        node.cores += 1;
    }

    Ok(nodes)
}

fn node_state(state: &str) -> char {
    match state {
        "Alive" => '-',
        "Absent" => 'o',
        "Suspected" => 's',
        "Dead" => 'd',
        other => other.chars().next().map_or('?', |c| c.to_ascii_lowercase()),
    }
}

fn job_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Array(ids) => ids.first().and_then(job_id),
        _ => None,
    }
}

/// Parses `oarstat -J`, an object keyed by job id
fn parse_jobs(output: &[u8]) -> Result<Vec<Job>> {
    let jobs: BTreeMap<String, OarJob> =
        serde_json::from_slice(output).wrap_err("error while parsing oarstat output")?;

    Ok(jobs
        .into_iter()
        .map(|(id, job)| Job {
            id,
            user: job.owner,
            state: job.state.chars().next().unwrap_or('?'),
            queue: job.queue,
        })
        .collect())
}
