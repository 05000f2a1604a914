use std::collections::HashMap;

use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub struct Job {
    /// ID of the job as reported by the scheduler, including array indices
    #[serde(rename = "JOBID")]
    pub id: String,
    /// Owner of the job
    pub user: String,
    /// One letter state code; meaning depends on the scheduler
    pub state: char,
    /// Name of the queue to which the job was submitted
    pub queue: String,
}

impl Job {
    /// Returns the key used to match the job against node core assignments
    pub fn key(&self) -> &str {
        job_key(&self.id)
    }
}

/// Strips the server suffix (`1234.server` → `1234`) and the array index
/// (`1234[7]` → `1234`) from a job id
pub fn job_key(id: &str) -> &str {
    let end = id.find(|c: char| c == '.' || c == '[').unwrap_or(id.len());
    id[..end].trim()
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub struct Queue {
    pub name: String,
    pub running: usize,
    pub queued: usize,
    /// Limit on running jobs; free text since most schedulers report `--`
    #[serde(default)]
    pub lm: String,
    #[serde(default)]
    pub state: String,
}

/// Jobs of a single refresh cycle, indexed by job key
#[derive(Clone, Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    keys: HashMap<String, usize>,
}

impl JobTable {
    pub fn new(jobs: Vec<Job>) -> Self {
        let mut keys = HashMap::with_capacity(jobs.len());
        for (idx, job) in jobs.iter().enumerate() {
            // Array jobs share a key; all elements belong to the same user
            keys.entry(job.key().to_string()).or_insert(idx);
        }

        Self { jobs, keys }
    }

    /// Looks up a job by (possibly suffixed) id
    pub fn get(&self, id: &str) -> Option<&Job> {
        self.keys.get(job_key(id)).map(|&idx| &self.jobs[idx])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
