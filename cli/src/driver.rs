//! Walks the UUID space one prefix at a time, splitting prefixes that hold
//! too many objects for a single pass.

use crate::config::DriverConfig;
use reindex_core::{MAX_PREFIX_LEN, PassStats, Reindexer};
use std::collections::VecDeque;
use tracing::{error, info, warn};

/// Offsets at which a hyphenated UUID has a `-`.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// The 16 prefixes one hex digit longer than `prefix`, with a hyphen inserted
/// where the UUID layout has one. Empty once `prefix` is a full UUID.
pub fn subdivide(prefix: &str) -> Vec<String> {
    let mut base = prefix.to_string();
    if HYPHEN_POSITIONS.contains(&base.len()) {
        base.push('-');
    }
    if base.len() >= MAX_PREFIX_LEN {
        return Vec::new();
    }
    (0..16u32)
        .filter_map(|d| char::from_digit(d, 16))
        .map(|digit| format!("{base}{digit}"))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixFailure {
    pub prefix: String,
    pub error: String,
}

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct DriverReport {
    /// Counters summed over successful passes
    pub totals: PassStats,
    pub passes: usize,
    /// Prefixes that were split into children
    pub subdivided: usize,
    pub failures: Vec<PrefixFailure>,
}

impl DriverReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct PrefixDriver<'a> {
    reindexer: &'a Reindexer,
    max_depth: usize,
}

impl<'a> PrefixDriver<'a> {
    pub fn new(reindexer: &'a Reindexer, config: &DriverConfig) -> Self {
        Self {
            reindexer,
            max_depth: config.max_depth,
        }
    }

    /// Run one pass per prefix, in order, queueing the children of any
    /// prefix that turned out to be too large.
    pub async fn run(&self, prefixes: &[String]) -> DriverReport {
        let mut report = DriverReport::default();
        let mut queue: VecDeque<(String, usize)> =
            prefixes.iter().map(|p| (p.to_lowercase(), 0)).collect();

        while let Some((prefix, depth)) = queue.pop_front() {
            match self.reindexer.reindex_prefix(&prefix).await {
                Ok(stats) => {
                    report.passes += 1;
                    report.totals.accumulate(&stats);
                }
                Err(err) => match err.too_many_results() {
                    Some(count) => {
                        let children = if depth < self.max_depth {
                            subdivide(&prefix)
                        } else {
                            Vec::new()
                        };
                        if children.is_empty() {
                            error!("Prefix {prefix} holds {count} results and cannot be split further");
                            report.failures.push(PrefixFailure {
                                prefix,
                                error: err.to_string(),
                            });
                        } else {
                            warn!("Prefix {prefix} holds {count} results, splitting it");
                            report.subdivided += 1;
                            queue.extend(children.into_iter().map(|child| (child, depth + 1)));
                        }
                    }
                    None => {
                        error!("Failed to reindex prefix {prefix}: {err}");
                        report.failures.push(PrefixFailure {
                            prefix,
                            error: err.to_string(),
                        });
                    }
                },
            }
        }

        info!(
            "Finished {} passes ({} prefixes split, {} failed)",
            report.passes,
            report.subdivided,
            report.failures.len()
        );
        report
    }
}
