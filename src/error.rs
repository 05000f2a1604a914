use thiserror::Error;

/// Errors that abort a single refresh cycle.
///
/// Each variant names the offending value so that the one-line diagnostic
/// shown by the dashboard is actionable without digging through the log.
#[derive(Debug, Error, PartialEq)]
pub enum ClusterError {
    /// A node lists a job that the job table does not know about
    #[error("job {job:?} running on {node} is missing from the job list; scheduler output is inconsistent")]
    MissingJob { job: String, node: String },

    /// A node reports a job on a core it does not have
    #[error("{node} reports a job on core {core}, but only has {cores} cores")]
    CoreOutOfRange {
        node: String,
        core: usize,
        cores: usize,
    },

    /// A job state without an entry in the abbreviation table
    #[error("unknown job state {state:?} for {scheduler}; add it to [state_abbreviations.{scheduler}] in the configuration")]
    UnknownJobState { state: char, scheduler: String },

    /// The configured node sort expression could not be evaluated
    #[error("sort expression {expression:?} failed for {node}: {reason}; check the `sort` setting")]
    SortExpression {
        expression: String,
        node: String,
        reason: String,
    },

    /// An attribute line was requested that the scheduler does not report
    #[error("attribute line {attribute:?} is not available for {scheduler}")]
    UnsupportedAttribute {
        attribute: String,
        scheduler: String,
    },
}
