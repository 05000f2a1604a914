use std::collections::BTreeSet;

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};

use crate::cluster::Job;

use super::misc::run;
use super::{QueueReport, RawNode, Scheduler};

/// Son of Grid Engine and friends, queried via `qstat -f`
#[derive(Clone, Debug)]
pub struct Sge {
    qstat: String,
    /// Output of the last `qstat -f`; a single call describes nodes, jobs and queues
    output: Option<Vec<u8>>,
}

impl Default for Sge {
    fn default() -> Self {
        Self {
            qstat: "qstat".into(),
            output: None,
        }
    }
}

impl Sge {
    fn report(&self) -> Result<Report> {
        let output = self
            .output
            .as_deref()
            .ok_or_else(|| eyre!("`{} -f` has not been run", self.qstat))?;

        parse(output)
    }
}

impl Scheduler for Sge {
    fn name(&self) -> &'static str {
        "sge"
    }

    fn refresh(&mut self) -> Result<()> {
        self.output = None;
        self.output = Some(run(&self.qstat, &["-f", "-u", "*"])?);

        Ok(())
    }

    fn jobs(&self) -> Result<Vec<Job>> {
        Ok(self.report()?.jobs)
    }

    fn queues(&self) -> Result<QueueReport> {
        let report = self.report()?;
        Ok(QueueReport::from_jobs(&report.jobs, is_running, |c| c == 'w'))
    }

    fn nodes(&self) -> Result<Vec<RawNode>> {
        Ok(self.report()?.nodes)
    }
}

fn is_running(state: char) -> bool {
    matches!(state, 'r' | 't' | 'R')
}

#[derive(Debug, Default)]
struct Report {
    nodes: Vec<RawNode>,
    jobs: Vec<Job>,
}

/// Parses `qstat -f`: queue instance lines (`queue@host qtype r/u/t load arch [states]`),
/// each followed by the jobs running in that instance, then the pending jobs
fn parse(output: &[u8]) -> Result<Report> {
    let text = String::from_utf8_lossy(output);
    let mut report = Report::default();
    let mut seen = BTreeSet::new();
    let mut instance: Option<Instance> = None;

    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = fields.first() else {
            continue;
        };

        if line.starts_with('#') || line.starts_with('-') || *first == "queuename" {
            continue;
        } else if line.contains("PENDING JOBS") {
            instance = None;
            continue;
        }

        if let Some((queue, host)) = first.split_once('@') {
            let [_, _, slots, ..] = fields.as_slice() else {
                return Err(eyre!("truncated queue instance line {:?}", line));
            };

            let cores: usize = slots
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .parse()
                .wrap_err_with(|| format!("invalid slot counts {:?} for {}", slots, first))?;
            let state = fields.get(5).map_or('-', |states| node_state(states));

            // A host may serve several queues; its cores are the sum of their slots, and
            // each queue instance owns the slots following those of the previous one
            let (node, base) = match report.nodes.iter().position(|node| node.name == host) {
                Some(idx) => {
                    let node = &mut report.nodes[idx];
                    let base = node.cores;
                    node.cores += cores;
                    if node.state == '-' {
                        node.state = state;
                    }
                    (idx, base)
                }
                None => {
                    report.nodes.push(RawNode {
                        name: host.to_string(),
                        state,
                        cores,
                        ..Default::default()
                    });
                    (report.nodes.len() - 1, 0)
                }
            };

            instance = Some(Instance {
                node,
                queue: queue.to_string(),
                next: base,
            });
            continue;
        }

        let Some(job) = parse_job(&fields) else {
            return Err(eyre!("unrecognized line in qstat output: {:?}", line));
        };

        let queue = match &mut instance {
            Some(instance) => {
                let node = &mut report.nodes[instance.node];
                for core in instance.next..instance.next + job.slots {
                    node.jobs.insert(core, job.id.clone());
                }
                instance.next += job.slots;
                instance.queue.clone()
            }
            None => "pending".to_string(),
        };

        // Parallel jobs are listed once per queue instance
        if seen.insert(job.id.clone()) {
            report.jobs.push(Job {
                id: job.id,
                user: job.user,
                state: job.state,
                queue,
            });
        }
    }

    Ok(report)
}

/// Queue instance whose jobs are being read
struct Instance {
    /// Index of the host in the report
    node: usize,
    queue: String,
    /// First core slot not yet taken by a job of this instance
    next: usize,
}

struct SgeJob {
    id: String,
    user: String,
    state: char,
    slots: usize,
}

/// Parses `job-ID prior name user state date time slots [ja-task-ID]`
fn parse_job(fields: &[&str]) -> Option<SgeJob> {
    let [id, _, _, user, state, _, _, slots, rest @ ..] = fields else {
        return None;
    };

    id.parse::<u64>().ok()?;
    let id = match rest.first() {
        Some(task) => format!("{}[{}]", id, task),
        None => id.to_string(),
    };

    Some(SgeJob {
        id,
        user: user.to_string(),
        // The last letter is the most specific, e.g. `w` in `hqw`
        state: state.chars().last()?,
        slots: slots.parse().ok()?,
    })
}

/// Maps queue instance states to node states
fn node_state(states: &str) -> char {
    if states.contains('u') || states.contains('E') {
        'd'
    } else if states.contains('d') {
        'o'
    } else if states.contains('s') || states.contains('S') {
        's'
    } else {
        '-'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QSTAT: &str = "\
queuename                      qtype resv/used/tot. load_avg arch          states
---------------------------------------------------------------------------------
all.q@wn01.example.org         BIP   0/3/4          1.02     lx-amd64
    123 0.55500 job1       alice        r     03/01/2024 10:00:00     2
    124 0.55500 job2       bob          r     03/01/2024 10:00:00     1
---------------------------------------------------------------------------------
all.q@wn02.example.org         BIP   0/0/4          -NA-     lx-amd64      au
---------------------------------------------------------------------------------
long.q@wn01.example.org        BP    0/1/2          1.02     lx-amd64
    125 0.50000 array      carol        r     03/01/2024 10:00:00     1 7
---------------------------------------------------------------------------------
gpu.q@wn03.example.org         BP    0/2/2          2.00     lx-amd64      d
    126 0.50000 mpi        dave         r     03/01/2024 10:00:00     2
---------------------------------------------------------------------------------
gpu.q@wn04.example.org         BP    0/2/2          2.00     lx-amd64
    126 0.50000 mpi        dave         r     03/01/2024 10:00:00     2

############################################################################
 - PENDING JOBS - PENDING JOBS - PENDING JOBS - PENDING JOBS - PENDING JOBS
############################################################################
    127 0.00000 job3       carol        qw    03/01/2024 09:00:00     1
    128 0.00000 job4       alice        hqw   03/01/2024 09:00:00     4
";

    #[test]
    fn test_parse_nodes() {
        let report = parse(QSTAT.as_bytes()).unwrap();
        let nodes = &report.nodes;
        assert_eq!(nodes.len(), 4);

        assert_eq!(nodes[0].name, "wn01.example.org");
        assert_eq!(nodes[0].cores, 6);
        let jobs: Vec<_> = nodes[0]
            .jobs
            .iter()
            .map(|(core, job)| (*core, job.as_str()))
            .collect();
        // long.q owns slots 4 and 5 of wn01, after the four of all.q
        assert_eq!(jobs, [(0, "123"), (1, "123"), (2, "124"), (4, "125[7]")]);

        assert_eq!((nodes[1].state, nodes[1].cores), ('d', 4));
        assert_eq!(nodes[2].state, 'o');
        assert_eq!(nodes[3].jobs.len(), 2);
    }

    #[test]
    fn test_parse_jobs() {
        let report = parse(QSTAT.as_bytes()).unwrap();
        let jobs: Vec<_> = report
            .jobs
            .iter()
            .map(|job| (job.id.as_str(), job.user.as_str(), job.state, job.queue.as_str()))
            .collect();

        assert_eq!(
            jobs,
            [
                ("123", "alice", 'r', "all.q"),
                ("124", "bob", 'r', "all.q"),
                ("125[7]", "carol", 'r', "long.q"),
                ("126", "dave", 'r', "gpu.q"),
                ("127", "carol", 'w', "pending"),
                ("128", "alice", 'w', "pending"),
            ]
        );

        let queues = QueueReport::from_jobs(&report.jobs, is_running, |c| c == 'w');
        assert_eq!((queues.running, queues.queued), (4, 2));
    }

    #[test]
    fn test_invalid_output() {
        assert!(parse(b"all.q@wn01 BIP\n").is_err());
        assert!(parse(b"all.q@wn01 BIP 0/0/x 0.0 lx-amd64\n").is_err());
        assert!(parse(b"something else entirely\n").is_err());
        assert!(Sge::default().jobs().is_err());
    }
}
