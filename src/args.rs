use std::path::PathBuf;

use argh::FromArgs;

/// Text-based dashboard for PBS, OAR and SGE clusters
#[derive(FromArgs, Debug, Default)]
pub struct Args {
    /// batch system to query: pbs, oar, sge, demo, or snapshot
    #[argh(option, short = 'b', default = "\"demo\".to_string()")]
    pub batch_system: String,

    /// configuration file; defaults to $QTOP_CONFIG if set
    #[argh(option)]
    pub config: Option<PathBuf>,

    /// refresh frequency in seconds; a value of zero disables automatic updates
    #[argh(option, default = "5")]
    pub interval: u64,

    /// print the dashboard once and exit
    #[argh(switch)]
    pub once: bool,

    /// terminal width used for printing with --once; defaults to the terminal size
    #[argh(option)]
    pub width: Option<u16>,

    /// always renumber nodes 1..N
    #[argh(switch)]
    pub remap: bool,

    /// do not hide leading node columns when numbering starts far from 1
    #[argh(switch)]
    pub no_masking: bool,

    /// show one row per node instead of one column
    #[argh(switch)]
    pub transpose: bool,

    /// fixed number of node columns per matrix
    #[argh(option)]
    pub cut: Option<usize>,

    /// hide empty core rows: 0 never, 1 non-existent, 2 free, 3 free or non-existent
    #[argh(option)]
    pub empty_rows: Option<u8>,

    /// node sort expression, e.g. `-busy,name`; only applied when nodes are renumbered
    #[argh(option)]
    pub sort: Option<String>,

    /// use the first letter of account names as tokens
    #[argh(switch)]
    pub letters: bool,

    /// directory with nodes.csv, jobs.csv and queues.csv for the snapshot batch system
    #[argh(option)]
    pub snapshot: Option<PathBuf>,

    /// seed for the demo batch system
    #[argh(option, default = "1")]
    pub seed: u64,

    /// log file; defaults to qtop-<user>.log in the temporary directory
    #[argh(option)]
    pub log_file: Option<PathBuf>,

    /// log debug messages
    #[argh(switch)]
    pub verbose: bool,

    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
}
