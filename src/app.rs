use std::rc::Rc;
use std::time::{Duration, Instant};

use color_eyre::Result;
use tracing::{error, info};

use crate::args::Args;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::scheduler::{self, Scheduler, SchedulerOptions};

pub struct App {
    /// Is the application running?
    pub running: bool,
    /// Command-line args
    pub args: Args,
    scheduler: Box<dyn Scheduler>,
    /// Result of the last successful refresh cycle
    pub dashboard: Option<Rc<Dashboard>>,
    /// Error of the last refresh cycle, if it failed
    pub status: Option<String>,
    /// Time since last automatic update
    last_update: Instant,
}

impl App {
    /// Constructs a new instance of [`App`] for the batch system named in `args`.
    pub fn new(args: Args) -> Result<Self> {
        let options = SchedulerOptions {
            snapshot: args.snapshot.clone(),
            seed: args.seed,
        };

        let scheduler = scheduler::connect(&args.batch_system, &options)?;
        Ok(Self::with_scheduler(args, scheduler))
    }

    pub fn with_scheduler(args: Args, scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            running: true,
            args,
            scheduler,
            dashboard: None,
            status: None,
            last_update: Instant::now(),
        }
    }

    /// Runs a single refresh cycle; the configuration file is re-read every cycle
    pub fn cycle(&mut self) -> Result<Dashboard> {
        let config = Config::load(&self.args)?;
        let started = Instant::now();
        let dashboard = Dashboard::collect(self.scheduler.as_mut(), config)?;
        info!("refresh cycle finished in {:?}", started.elapsed());

        Ok(dashboard)
    }

    /// Runs a refresh cycle; on failure the previous dashboard is kept and the error is
    /// recorded in `status`
    pub fn collect(&mut self) {
        match self.cycle() {
            Ok(dashboard) => {
                self.dashboard = Some(Rc::new(dashboard));
                self.status = None;
            }
            Err(err) => {
                error!("refresh cycle failed: {:#}", err);
                self.status = Some(format!("refresh failed: {:#}", err));
            }
        }

        self.last_update = Instant::now();
    }

    /// Handles the tick event of the terminal.
    pub fn tick(&mut self) -> bool {
        if self.args.interval > 0 {
            self.update(self.args.interval)
        } else {
            false
        }
    }

    /// Refreshes the dashboard if at least `interval` seconds have passed
    pub fn update(&mut self, interval: u64) -> bool {
        // A minimum refresh rate is enforced to prevent the user just holding `r`
        let update_rate = Duration::from_secs(interval.max(1));
        if self.last_update.elapsed() >= update_rate {
            self.collect();
            true
        } else {
            false
        }
    }

    /// Set running to false to quit the application.
    pub fn quit(&mut self) {
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use argh::FromArgs;

    use super::*;

    fn write_snapshot(dir: &Path, nodes: &str) {
        fs::write(dir.join("nodes.csv"), nodes).unwrap();
        fs::write(
            dir.join("jobs.csv"),
            "JOBID|USER|STATE|QUEUE\n1.srv|alice|R|batch\n2.srv|bob|R|batch\n",
        )
        .unwrap();
        fs::write(
            dir.join("queues.csv"),
            "NAME|RUNNING|QUEUED|LM|STATE\nbatch|2|0|--|E R\n",
        )
        .unwrap();
    }

    fn app(dir: &Path) -> App {
        let dir = dir.to_string_lossy();
        let args = Args::from_args(&["qtop"], &["-b", "snapshot", "--snapshot", &dir]).unwrap();

        App::new(args).unwrap()
    }

    #[test]
    fn test_collect() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(
            dir.path(),
            "NAME|STATE|CORES|JOBS|GPUS\nwn01|-|4|0-1/1.srv|\nwn02|-|4||\nps01|-|4|2/2.srv|\n",
        );

        let mut app = app(dir.path());
        assert!(app.dashboard.is_none());

        app.collect();
        assert_eq!(app.status, None);
        let dashboard = app.dashboard.clone().unwrap();
        assert_eq!(dashboard.scheduler, "snapshot");
        assert_eq!(dashboard.cluster.total_nodes, 3);
        assert_eq!(dashboard.cluster.total_cores, 12);
        assert_eq!(dashboard.cluster.busy_cores, 3);
    }

    #[test]
    fn test_failed_cycle_keeps_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(
            dir.path(),
            "NAME|STATE|CORES|JOBS|GPUS\nwn01|-|4|0/1.srv|\nwn02|-|4||\n",
        );

        let mut app = app(dir.path());
        app.collect();
        let previous = app.dashboard.clone().unwrap();

        write_snapshot(
            dir.path(),
            "NAME|STATE|CORES|JOBS|GPUS\nwn01|-|4|0/1.srv|\nwn02|-|4|1/999.srv|\n",
        );

        assert!(app.cycle().is_err());
        app.collect();
        let status = app.status.clone().unwrap();
        assert!(status.contains("999"), "{}", status);
        assert!(Rc::ptr_eq(&previous, app.dashboard.as_ref().unwrap()));
    }

    #[test]
    fn test_unknown_scheduler() {
        let args = Args::from_args(&["qtop"], &["-b", "slurm"]).unwrap();
        assert!(App::new(args).is_err());
    }

    #[test]
    fn test_update_interval() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "NAME|STATE|CORES|JOBS|GPUS\nwn01|-|4||\n");

        let mut app = app(dir.path());
        // Less than the minimum refresh interval has passed
        assert!(!app.update(1));
        assert!(app.dashboard.is_none());

        app.quit();
        assert!(!app.running);
    }
}
