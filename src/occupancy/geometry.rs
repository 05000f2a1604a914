use std::ops::Range;

use crate::cluster::Cluster;
use crate::config::Config;

/// Number of leading node columns hidden when numbering starts far from 1
pub fn masking_start(cluster: &Cluster, config: &Config) -> u64 {
    if config.no_masking {
        return 0;
    }

    match cluster.min_ordinal() {
        Some(min) if min > config.min_masking_threshold => min - 1,
        _ => 0,
    }
}

/// Number of node columns that fit next to the row labels
pub fn columns(width: usize, config: &Config) -> usize {
    match config.cut_width {
        Some(cut) => cut.max(1),
        None => width.saturating_sub(config.label_overhead).max(1),
    }
}

/// Splits the node numbers `(start, highest_wn]` into windows of at most `columns` nodes.
///
/// Windows are half-open ranges of column offsets: column `k` shows node `k + 1`.
pub fn paginate(start: u64, highest_wn: u64, columns: usize, fixed: bool) -> Vec<Range<u64>> {
    let columns = columns.max(1) as u64;
    let extra = if fixed {
        highest_wn / columns
    } else {
        highest_wn
            .saturating_sub(start)
            .div_ceil(columns)
            .saturating_sub(1)
    };

    (0..=extra)
        .map(|page| {
            let first = start + page * columns;
            first.min(highest_wn)..(first + columns).min(highest_wn)
        })
        .filter(|window| !window.is_empty())
        .collect()
}
