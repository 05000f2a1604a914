use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use tracing_subscriber::EnvFilter;

/// Environment variable with the log filter; falls back to `RUST_LOG`
pub const LOG_ENV: &str = "QTOP_LOG";

/// Sends log messages to a file, so that they do not end up on the dashboard.
///
/// Returns the path of the log file.
pub fn init(path: Option<&Path>, verbose: bool) -> Result<PathBuf> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let path = path.map_or_else(default_path, Path::to_path_buf);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err_with(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| eyre!("failed to initialize logging: {}", err))?;

    tracing::info!("qtop v{} started", env!("CARGO_PKG_VERSION"));
    Ok(path)
}

/// `qtop-<user>.log` in the temporary directory
pub fn default_path() -> PathBuf {
    let user = env::var("USER")
        .or_else(|_| env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".into());

    env::temp_dir().join(format!("qtop-{}.log", user))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_init() {
        assert!(default_path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("qtop-"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qtop.log");
        assert_eq!(init(Some(&path), true).unwrap(), path);

        tracing::error!("written to the log file");
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("written to the log file"));
    }
}
