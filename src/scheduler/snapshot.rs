use std::fs::File;
use std::path::PathBuf;

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::cluster::{Job, NodeAttribute, Queue};

use super::misc::parse_cores;
use super::{QueueReport, RawNode, Scheduler};

/// Captured cluster state: `nodes.csv`, `jobs.csv` and `queues.csv` in a directory,
/// `|` delimited with a header row
#[derive(Clone, Debug)]
pub struct Snapshot {
    path: PathBuf,
}

/// Row of `nodes.csv`; jobs are listed as space separated `cores/job` entries
#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct NodeRecord {
    name: String,
    state: char,
    cores: usize,
    #[serde(default)]
    jobs: String,
    #[serde(default)]
    gpus: Option<usize>,
}

impl Snapshot {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.path.join(name);
        let file = File::open(&path).wrap_err_with(|| format!("failed to open {}", path.display()))?;

        parse(file).wrap_err_with(|| format!("error while parsing {}", path.display()))
    }
}

fn parse<T, R>(reader: R) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: std::io::Read,
{
    let mut records = Vec::new();
    for record in csv::ReaderBuilder::new()
        .delimiter(b'|')
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
    {
        records.push(record?);
    }

    Ok(records)
}

fn to_raw(record: NodeRecord) -> Result<RawNode> {
    let mut node = RawNode {
        name: record.name,
        state: record.state,
        cores: record.cores,
        gpus: record.gpus,
        ..Default::default()
    };

    for entry in record.jobs.split_whitespace() {
        let (cores, job) = entry
            .split_once('/')
            .and_then(|(cores, job)| Some((parse_cores(cores)?, job)))
            .ok_or_else(|| eyre!("invalid job entry {:?} for {}", entry, node.name))?;

        for core in cores {
            node.jobs.insert(core, job.to_string());
        }
    }

    Ok(node)
}

impl Scheduler for Snapshot {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    fn jobs(&self) -> Result<Vec<Job>> {
        self.read("jobs.csv")
    }

    fn queues(&self) -> Result<QueueReport> {
        let queues: Vec<Queue> = self.read("queues.csv")?;
        Ok(QueueReport {
            running: queues.iter().map(|q| q.running).sum(),
            queued: queues.iter().map(|q| q.queued).sum(),
            queues,
        })
    }

    fn nodes(&self) -> Result<Vec<RawNode>> {
        self.read::<NodeRecord>("nodes.csv")?
            .into_iter()
            .map(to_raw)
            .collect()
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

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn write_snapshot(dir: &Path, nodes: &str) {
        fs::write(dir.join("nodes.csv"), nodes).unwrap();
        fs::write(
            dir.join("jobs.csv"),
            "JOBID|USER|STATE|QUEUE\n1.srv|alice|R|batch\n2.srv|bob|R|long\n3.srv|alice|Q|batch\n",
        )
        .unwrap();
        fs::write(
            dir.join("queues.csv"),
            "NAME|RUNNING|QUEUED|LM|STATE\nbatch|1|1|--|E R\nlong|1|0||\n",
        )
        .unwrap();
    }

    #[test]
    fn test_read_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(
            dir.path(),
            "NAME|STATE|CORES|JOBS|GPUS\nwn01|-|4|0-1/1.srv 3/2.srv|\nwn02|d|4||2\n",
        );

        let snapshot = Snapshot::new(dir.path().to_path_buf());
        let nodes = snapshot.nodes().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].jobs.len(), 3);
        assert_eq!(nodes[0].jobs[&3], "2.srv");
        assert_eq!(nodes[0].gpus, None);
        assert_eq!((nodes[1].state, nodes[1].gpus), ('d', Some(2)));

        let jobs = snapshot.jobs().unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!((jobs[2].user.as_str(), jobs[2].state), ("alice", 'Q'));

        let report = snapshot.queues().unwrap();
        assert_eq!((report.running, report.queued), (2, 1));
        assert_eq!(report.queues[0].state, "E R");
    }

    #[test]
    fn test_invalid_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(dir.path().to_path_buf());
        assert!(snapshot.nodes().is_err());

        write_snapshot(dir.path(), "NAME|STATE|CORES|JOBS|GPUS\nwn01|-|4|x/1.srv|\n");
        assert!(snapshot.nodes().is_err());
        assert!(snapshot.jobs().is_ok());
    }
}
