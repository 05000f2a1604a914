use std::fmt::Display;

use color_eyre::Result;
use tracing::{info, warn};

use crate::cluster::{Cluster, JobTable};
use crate::config::Config;
use crate::error::ClusterError;
use crate::occupancy::check_attributes;
use crate::scheduler::{QueueReport, Scheduler};
use crate::users::UserIdentities;

/// Everything collected during a single refresh cycle
#[derive(Clone, Debug)]
pub struct Dashboard {
    /// Name of the scheduler that was queried
    pub scheduler: &'static str,
    /// Configuration in effect when the dashboard was collected
    pub config: Config,
    pub cluster: Cluster,
    pub users: UserIdentities,
    pub queues: QueueReport,
    /// Number of jobs reported by the scheduler
    pub jobs: usize,
    /// Data sources that could not be queried
    pub warnings: Vec<String>,
}

impl Dashboard {
    /// Queries the scheduler and builds the cluster model.
    ///
    /// Data sources that fail are logged and treated as empty; inconsistent data and
    /// configuration errors fail the whole cycle.
    pub fn collect(scheduler: &mut dyn Scheduler, config: Config) -> Result<Self, ClusterError> {
        let name = scheduler.name();
        info!("collecting cluster state from {}", name);
        check_attributes(&config, scheduler.attributes(), name)?;

        let mut warnings = Vec::new();
        degrade(scheduler.refresh(), "scheduler", &mut warnings);
        let jobs = degrade(scheduler.jobs(), "job list", &mut warnings);
        let queues = degrade(scheduler.queues(), "queue list", &mut warnings);
        let nodes = degrade(scheduler.nodes(), "node list", &mut warnings);

        let jobs = JobTable::new(jobs);
        let cluster = Cluster::build(&config, nodes, &jobs)?;
        let users = UserIdentities::assign(&jobs, name, &config)?;

        info!(
            "collected {} nodes, {} jobs and {} users",
            cluster.total_nodes,
            jobs.len(),
            users.len()
        );

        Ok(Self {
            scheduler: name,
            config,
            cluster,
            users,
            queues,
            jobs: jobs.len(),
            warnings,
        })
    }

    /// Percentage of cores running jobs
    pub fn utilization(&self) -> f64 {
        if self.cluster.total_cores == 0 {
            0.0
        } else {
            100.0 * self.cluster.busy_cores as f64 / self.cluster.total_cores as f64
        }
    }
}

/// Returns the value of `result`, or a default after recording a warning
fn degrade<T: Default, D: Display>(
    result: Result<T>,
    source: D,
    warnings: &mut Vec<String>,
) -> T {
    result.unwrap_or_else(|err| {
        warn!("{} unavailable: {:#}", source, err);
        warnings.push(format!("{} unavailable: {}", source, err));
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use color_eyre::eyre::eyre;

    use super::*;
    use crate::cluster::{Job, NodeAttribute};
    use crate::config::AttributeLine;
    use crate::scheduler::RawNode;

    /// Scheduler with canned output
    #[derive(Default)]
    pub struct Fake {
        pub jobs: Vec<Job>,
        pub nodes: Vec<RawNode>,
        pub broken_nodes: bool,
    }

    impl Scheduler for Fake {
        fn name(&self) -> &'static str {
            "pbs"
        }

        fn jobs(&self) -> Result<Vec<Job>> {
            Ok(self.jobs.clone())
        }

        fn queues(&self) -> Result<QueueReport> {
            Ok(QueueReport::from_jobs(&self.jobs, |c| c == 'R', |c| c == 'Q'))
        }

        fn nodes(&self) -> Result<Vec<RawNode>> {
            if self.broken_nodes {
                Err(eyre!("pbsnodes: command not found"))
            } else {
                Ok(self.nodes.clone())
            }
        }
    }

    fn fake() -> Fake {
        let job = |id: &str, user: &str| Job {
            id: id.into(),
            user: user.into(),
            state: 'R',
            queue: "batch".into(),
        };
        let node = |name: &str, jobs: &[(usize, &str)]| RawNode {
            name: name.into(),
            state: '-',
            cores: 4,
            jobs: jobs.iter().map(|(c, j)| (*c, j.to_string())).collect(),
            gpus: None,
        };

        Fake {
            jobs: vec![job("1.srv", "alice"), job("2.srv", "bob")],
            nodes: vec![
                node("wn01", &[(0, "1.srv"), (1, "1.srv")]),
                node("wn02", &[]),
                node("ps01", &[(2, "2.srv")]),
            ],
            broken_nodes: false,
        }
    }

    #[test]
    fn test_collect() {
        let dashboard = Dashboard::collect(&mut fake(), Config::default()).unwrap();

        assert_eq!(dashboard.scheduler, "pbs");
        assert!(dashboard.cluster.is_remapped());
        assert_eq!(
            dashboard.cluster.nodes.keys().copied().collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert_eq!(dashboard.cluster.total_cores, 12);
        assert_eq!(dashboard.cluster.busy_cores, 3);
        assert_eq!(dashboard.cluster.offdown_nodes, 0);
        assert_eq!(dashboard.jobs, 2);
        assert_eq!(dashboard.users.len(), 2);
        assert_eq!(dashboard.queues.running, 2);
        assert!(dashboard.warnings.is_empty());
        assert!((dashboard.utilization() - 100.0 * 3.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_job() {
        let mut scheduler = fake();
        scheduler.nodes[1].jobs.insert(0, "999.srv".into());

        let err = Dashboard::collect(&mut scheduler, Config::default()).unwrap_err();
        assert!(matches!(err, ClusterError::MissingJob { ref job, .. } if job == "999"));
    }

    #[test]
    fn test_degraded_source() {
        let mut scheduler = fake();
        scheduler.broken_nodes = true;

        let dashboard = Dashboard::collect(&mut scheduler, Config::default()).unwrap();
        assert!(dashboard.cluster.nodes.is_empty());
        assert_eq!(dashboard.users.len(), 2);
        assert_eq!(dashboard.warnings.len(), 1);
        assert!(dashboard.warnings[0].contains("node list"));
    }

    #[test]
    fn test_unsupported_attribute() {
        let config = Config {
            attributes: vec![AttributeLine {
                attribute: NodeAttribute::Gpus,
                max_len: 1,
            }],
            ..Config::default()
        };

        let err = Dashboard::collect(&mut fake(), config).unwrap_err();
        assert!(matches!(err, ClusterError::UnsupportedAttribute { .. }));
    }
}
