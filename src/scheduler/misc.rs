use std::process::Command;

use color_eyre::{
    eyre::{bail, Context},
    Result,
};
use tracing::debug;

/// Runs a scheduler command and returns its standard output
pub fn run(exe: &str, args: &[&str]) -> Result<Vec<u8>> {
    let command = format!("{} {}", exe, args.join(" "));
    debug!("running `{}`", command.trim_end());

    let output = Command::new(exe)
        .args(args)
        .output()
        .wrap_err_with(|| format!("failed to execute `{}`", command.trim_end()))?;

    if !output.status.success() {
        bail!(
            "`{}` failed with {}: {}",
            command.trim_end(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(output.stdout)
}

/// Parses a core list such as `3`, `0-3`, or `0-1,4`
pub fn parse_cores(list: &str) -> Option<Vec<usize>> {
    let mut cores = Vec::new();
    for part in list.split(',').map(str::trim) {
        match part.split_once('-') {
            Some((first, last)) => {
                let first: usize = first.trim().parse().ok()?;
                let last: usize = last.trim().parse().ok()?;
                cores.extend(first..=last);
            }
            None => cores.push(part.parse().ok()?),
        }
    }

    Some(cores)
}
