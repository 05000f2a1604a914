use std::collections::BTreeMap;

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};

use crate::cluster::{Job, NodeAttribute, Queue};
use crate::utilities::split_key_value;

use super::misc::{parse_cores, run};
use super::{QueueReport, RawNode, Scheduler};

/// PBS Pro and Torque, queried via `pbsnodes` and `qstat`
#[derive(Clone, Debug)]
pub struct Pbs {
    pbsnodes: String,
    qstat: String,
}

impl Default for Pbs {
    fn default() -> Self {
        Self {
            pbsnodes: "pbsnodes".into(),
            qstat: "qstat".into(),
        }
    }
}

impl Scheduler for Pbs {
    fn name(&self) -> &'static str {
        "pbs"
    }

    fn jobs(&self) -> Result<Vec<Job>> {
        parse_jobs(&run(&self.qstat, &[])?)
    }

    fn queues(&self) -> Result<QueueReport> {
        parse_queues(&run(&self.qstat, &["-q"])?)
    }

    fn nodes(&self) -> Result<Vec<RawNode>> {
        parse_nodes(&run(&self.pbsnodes, &["-a"])?)
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

/// Parses `pbsnodes -a`; one block of `key = value` lines per node
fn parse_nodes(output: &[u8]) -> Result<Vec<RawNode>> {
    let mut nodes = Vec::new();
    let mut current: Option<RawNode> = None;

    for line in output.split(|&c| c == b'\n') {
        if line.trim_ascii().is_empty() {
            nodes.extend(current.take());
            continue;
        } else if !line[0].is_ascii_whitespace() {
            nodes.extend(current.take());
            current = Some(RawNode {
                name: String::from_utf8_lossy(line.trim_ascii()).into_owned(),
                state: '-',
                ..Default::default()
            });
            continue;
        }

        let Some(node) = current.as_mut() else {
            continue;
        };

        if let Some((key, value)) = split_key_value(line, b'=') {
            let value = String::from_utf8_lossy(value);
            match key {
                b"state" => node.state = node_state(&value),
                b"np" | b"pcpus" | b"resources_available.ncpus" => {
                    node.cores = value
                        .parse()
                        .wrap_err_with(|| format!("invalid core count for {}", node.name))?;
                }
                b"gpus" | b"resources_available.ngpus" => node.gpus = value.parse().ok(),
                b"jobs" => {
                    node.jobs = parse_slots(&value)
                        .wrap_err_with(|| format!("invalid job list for {}", node.name))?;
                }
                _ => {}
            }
        }
    }

    nodes.extend(current);
    Ok(nodes)
}

/// First letter of the first state; `free` is shown as `-`
fn node_state(value: &str) -> char {
    match value.split(',').next().map(str::trim) {
        Some("free") | None => '-',
        Some(state) => state.chars().next().unwrap_or('-'),
    }
}

/// Parses the job list of a node, in either of the forms
/// `0/123.server, 1-3/124.server` (Torque) or `123.server/0, 124.server/1` (PBS Pro)
fn parse_slots(value: &str) -> Result<BTreeMap<usize, String>> {
    let mut slots = BTreeMap::new();
    // Torque 5 lists cores as `0-1,3/123.server`, so cores may precede the job
    let mut pending = Vec::new();

    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once('/') {
            Some((left, right)) => {
                if let Some(cores) = parse_cores(left) {
                    for core in pending.drain(..).chain(cores) {
                        slots.insert(core, right.to_string());
                    }
                } else {
                    let core = right
                        .parse()
                        .map_err(|_| eyre!("invalid core {:?} in {:?}", right, entry))?;
                    slots.insert(core, left.to_string());
                }
            }
            None => pending.extend(
                parse_cores(entry).ok_or_else(|| eyre!("invalid job entry {:?}", entry))?,
            ),
        }
    }

    Ok(slots)
}

/// Parses the default `qstat` listing:
/// `Job ID  Name  User  Time Use  S  Queue`
fn parse_jobs(output: &[u8]) -> Result<Vec<Job>> {
    let text = String::from_utf8_lossy(output);
    let mut jobs = Vec::new();

    for line in text.lines().skip_while(|line| !line.starts_with("---")).skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [id, .., user, _, state, queue] = fields.as_slice() else {
            continue;
        };

        jobs.push(Job {
            id: id.to_string(),
            user: user.to_string(),
            state: state.chars().next().unwrap_or('?'),
            queue: queue.to_string(),
        });
    }

    Ok(jobs)
}

/// Parses `qstat -q`, including the trailing running/queued totals
fn parse_queues(output: &[u8]) -> Result<QueueReport> {
    let text = String::from_utf8_lossy(output);
    let mut report = QueueReport::default();
    let mut totals = None;

    for line in text.lines().skip_while(|line| !line.starts_with("---")).skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.iter().all(|field| field.bytes().all(|c| c == b'-')) {
            continue;
        }

        match fields.as_slice() {
            [running, queued] => {
                totals = running.parse().ok().zip(queued.parse().ok());
            }
            [name, _, _, _, _, running, queued, lm, state @ ..] => {
                report.queues.push(Queue {
                    name: name.to_string(),
                    running: running
                        .parse()
                        .wrap_err_with(|| format!("invalid running count for queue {}", name))?,
                    queued: queued
                        .parse()
                        .wrap_err_with(|| format!("invalid queued count for queue {}", name))?,
                    lm: lm.to_string(),
                    state: state.join(" "),
                });
            }
            _ => {}
        }
    }

    (report.running, report.queued) = totals.unwrap_or_else(|| {
        report
            .queues
            .iter()
            .fold((0, 0), |(r, q), queue| (r + queue.running, q + queue.queued))
    });

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PBSNODES: &str = "\
wn01.example.org
     state = job-exclusive
     np = 4
     ntype = cluster
     jobs = 0/101.server, 1-2/102.server
     status = opsys=linux,uname=Linux wn01

wn02.example.org
     state = free
     np = 2
     gpus = 1

wn03.example.org
     state = down,offline
     np = 8
     jobs = 0-1,3/103.server

ps01.example.org
     state = free
     resources_available.ncpus = 4
     jobs = 104.server/0, 104.server/1
";

    const QSTAT: &str = "\
Job ID                    Name             User            Time Use S Queue
------------------------- ---------------- --------------- -------- - -----
101.server                 STDIN            alice           00:01:00 R batch
102.server                 my job           bob             00:00:10 R long
105.server                 sim              alice                  0 Q batch
";

    const QSTAT_Q: &str = "\
server: pbs.example.org

Queue            Memory CPU Time Walltime Node  Run Que Lm  State
---------------- ------ -------- -------- ----  --- --- --  -----
batch              --      --       --      --    10   2 --   E R
long               --      --       --      --     1   0 --   E R
                                               ----- -----
                                                  11     2
";

    #[test]
    fn test_parse_nodes() {
        let nodes = parse_nodes(PBSNODES.as_bytes()).unwrap();
        assert_eq!(nodes.len(), 4);

        assert_eq!(nodes[0].name, "wn01.example.org");
        assert_eq!(nodes[0].state, 'j');
        assert_eq!(nodes[0].cores, 4);
        assert_eq!(
            nodes[0].jobs,
            BTreeMap::from([
                (0, "101.server".to_string()),
                (1, "102.server".to_string()),
                (2, "102.server".to_string())
            ])
        );

        assert_eq!((nodes[1].state, nodes[1].gpus), ('-', Some(1)));
        assert!(nodes[1].jobs.is_empty());

        assert_eq!(nodes[2].state, 'd');
        assert_eq!(nodes[2].jobs.keys().copied().collect::<Vec<_>>(), [0, 1, 3]);

        assert_eq!(nodes[3].cores, 4);
        assert_eq!(nodes[3].jobs.len(), 2);
        assert_eq!(nodes[3].jobs[&1], "104.server");
    }

    #[test]
    fn test_parse_invalid_nodes() {
        assert!(parse_nodes(b"wn01\n     np = four\n").is_err());
        assert!(parse_nodes(b"wn01\n     jobs = a/b\n").is_err());
        assert!(parse_nodes(b"").unwrap().is_empty());
    }

    #[test]
    fn test_parse_jobs() {
        let jobs = parse_jobs(QSTAT.as_bytes()).unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[1].id, "102.server");
        assert_eq!(jobs[1].user, "bob");
        assert_eq!(jobs[1].state, 'R');
        assert_eq!(jobs[1].queue, "long");
        assert_eq!(jobs[2].state, 'Q');
    }

    #[test]
    fn test_parse_queues() {
        let report = parse_queues(QSTAT_Q.as_bytes()).unwrap();
        assert_eq!(report.queues.len(), 2);
        assert_eq!(report.queues[0].name, "batch");
        assert_eq!((report.queues[0].running, report.queues[0].queued), (10, 2));
        assert_eq!(report.queues[0].state, "E R");
        assert_eq!((report.running, report.queued), (11, 2));

        // Totals are summed when the footer is missing
        let truncated: String = QSTAT_Q.lines().take(6).collect::<Vec<_>>().join("\n");
        let report = parse_queues(truncated.as_bytes()).unwrap();
        assert_eq!((report.running, report.queued), (11, 2));
    }
}
