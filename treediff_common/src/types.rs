use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Pluggable strategy deciding whether two files hold equivalent content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStrategy {
    /// Streaming byte-for-byte comparison.
    #[default]
    Bytes,
    /// Line-oriented comparison, optionally tolerant of line endings
    /// and surrounding whitespace.
    Lines,
}

/// Configuration for one comparison run.
///
/// Applied once before traversal starts and never mutated by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Two files with different sizes are distinct, without reading content.
    pub compare_size: bool,
    /// Two files whose modification dates differ by more than
    /// `date_tolerance_ms` are distinct.
    pub compare_date: bool,
    /// Tolerance in milliseconds used by `compare_date`.
    pub date_tolerance_ms: u64,
    /// Defer to the content strategy for files that pass the earlier checks.
    pub compare_content: bool,
    /// Do not recurse into subdirectories.
    pub skip_subdirectories: bool,
    /// Leave symlinked entries out of directory listings.
    pub skip_symlinks: bool,
    /// Compare entry names case-insensitively.
    pub ignore_case: bool,
    /// Comma-separated glob patterns; when set, only matching files are
    /// listed. Directories are always listed.
    pub include_filter: Option<String>,
    /// Comma-separated glob patterns; matching files and directories are
    /// dropped from listings.
    pub exclude_filter: Option<String>,
    /// Which content comparator `compare_content` dispatches to.
    pub content_strategy: ContentStrategy,
    /// Line strategy only: ignore trailing carriage returns.
    pub ignore_line_ending: bool,
    /// Line strategy only: ignore leading/trailing whitespace on each line.
    pub ignore_white_spaces: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            compare_size: false,
            compare_date: false,
            date_tolerance_ms: 1000,
            compare_content: false,
            skip_subdirectories: false,
            skip_symlinks: false,
            ignore_case: false,
            include_filter: None,
            exclude_filter: None,
            content_strategy: ContentStrategy::Bytes,
            ignore_line_ending: false,
            ignore_white_spaces: false,
        }
    }
}

/// What one side of a compared position holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    /// The side has no entry at this position. Never appears in directory
    /// listings, only in `Difference` records.
    Missing,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
            EntryKind::Missing => write!(f, "missing"),
        }
    }
}

/// Classification of one compared tree position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffState {
    /// Present on both sides with equivalent outcome.
    Equal,
    /// Present on both sides but different.
    Distinct,
    /// Present only on the left side.
    Left,
    /// Present only on the right side.
    Right,
}

impl fmt::Display for DiffState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffState::Equal => write!(f, "equal"),
            DiffState::Distinct => write!(f, "distinct"),
            DiffState::Left => write!(f, "left"),
            DiffState::Right => write!(f, "right"),
        }
    }
}

/// One classified outcome for one compared position.
///
/// Produced exactly once per compared pair or one-sided entry; fields for an
/// absent side are `None` (`kind` is `Missing`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Difference {
    /// Path of the containing directory, relative to the comparison roots.
    pub relative_path: PathBuf,
    /// Recursion depth at which the entry was found (roots are level 0).
    pub level: usize,
    pub state: DiffState,
    pub path1: Option<PathBuf>,
    pub path2: Option<PathBuf>,
    pub name1: Option<String>,
    pub name2: Option<String>,
    pub kind1: EntryKind,
    pub kind2: EntryKind,
    pub size1: Option<u64>,
    pub size2: Option<u64>,
    pub date1: Option<SystemTime>,
    pub date2: Option<SystemTime>,
}

impl Difference {
    /// The kind of whichever side is present. For `Distinct`/`Equal` pairs
    /// both sides agree by construction.
    pub fn kind(&self) -> EntryKind {
        if self.kind1 != EntryKind::Missing {
            self.kind1
        } else {
            self.kind2
        }
    }

    /// Name of whichever side is present.
    pub fn name(&self) -> &str {
        self.name1
            .as_deref()
            .or(self.name2.as_deref())
            .unwrap_or("")
    }
}

/// Running counters over the differences of one comparison run.
///
/// Raw counters are incremented per difference via [`Statistics::record`];
/// derived totals are filled in by [`Statistics::finalize`] once traversal
/// completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub equal: u64,
    pub distinct: u64,
    pub left: u64,
    pub right: u64,

    pub equal_files: u64,
    pub distinct_files: u64,
    pub left_files: u64,
    pub right_files: u64,

    pub equal_dirs: u64,
    pub distinct_dirs: u64,
    pub left_dirs: u64,
    pub right_dirs: u64,

    pub differences: u64,
    pub differences_files: u64,
    pub differences_dirs: u64,

    pub total: u64,
    pub total_files: u64,
    pub total_dirs: u64,

    pub is_same: bool,
}

impl Statistics {
    pub fn record(&mut self, difference: &Difference) {
        let is_file = difference.kind() == EntryKind::File;
        match difference.state {
            DiffState::Equal => {
                self.equal += 1;
                if is_file {
                    self.equal_files += 1;
                } else {
                    self.equal_dirs += 1;
                }
            }
            DiffState::Distinct => {
                self.distinct += 1;
                if is_file {
                    self.distinct_files += 1;
                } else {
                    self.distinct_dirs += 1;
                }
            }
            DiffState::Left => {
                self.left += 1;
                if is_file {
                    self.left_files += 1;
                } else {
                    self.left_dirs += 1;
                }
            }
            DiffState::Right => {
                self.right += 1;
                if is_file {
                    self.right_files += 1;
                } else {
                    self.right_dirs += 1;
                }
            }
        }
    }

    /// Computes the derived totals. Call once after the last `record`.
    pub fn finalize(&mut self) {
        self.differences = self.distinct + self.left + self.right;
        self.differences_files = self.distinct_files + self.left_files + self.right_files;
        self.differences_dirs = self.distinct_dirs + self.left_dirs + self.right_dirs;
        self.total = self.equal + self.differences;
        self.total_files = self.equal_files + self.differences_files;
        self.total_dirs = self.equal_dirs + self.differences_dirs;
        self.is_same = self.differences == 0;
    }
}

/// Outcome of one comparison run: the finalized statistics plus the flat,
/// deterministic list of differences in traversal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResults {
    pub statistics: Statistics,
    pub differences: Vec<Difference>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_sided(state: DiffState, kind: EntryKind) -> Difference {
        let left = state != DiffState::Right;
        Difference {
            relative_path: PathBuf::new(),
            level: 0,
            state,
            path1: left.then(|| PathBuf::from(".")),
            path2: (!left).then(|| PathBuf::from(".")),
            name1: left.then(|| "x".to_string()),
            name2: (!left).then(|| "x".to_string()),
            kind1: if left { kind } else { EntryKind::Missing },
            kind2: if left { EntryKind::Missing } else { kind },
            size1: left.then_some(1),
            size2: (!left).then_some(1),
            date1: left.then_some(SystemTime::UNIX_EPOCH),
            date2: (!left).then_some(SystemTime::UNIX_EPOCH),
        }
    }

    #[test]
    fn derived_totals_sum_raw_counters() {
        let mut stats = Statistics::default();
        stats.record(&one_sided(DiffState::Left, EntryKind::File));
        stats.record(&one_sided(DiffState::Left, EntryKind::Directory));
        stats.record(&one_sided(DiffState::Right, EntryKind::File));
        stats.record(&one_sided(DiffState::Equal, EntryKind::File));
        stats.finalize();

        assert_eq!(stats.differences, stats.distinct + stats.left + stats.right);
        assert_eq!(
            stats.differences_files,
            stats.distinct_files + stats.left_files + stats.right_files
        );
        assert_eq!(stats.total, stats.equal + stats.differences);
        assert_eq!(stats.total_files, stats.equal_files + stats.differences_files);
        assert_eq!(stats.total_dirs, stats.equal_dirs + stats.differences_dirs);
        assert!(!stats.is_same);
    }

    #[test]
    fn no_differences_means_same() {
        let mut stats = Statistics::default();
        stats.record(&one_sided(DiffState::Equal, EntryKind::Directory));
        stats.finalize();
        assert!(stats.is_same);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.total_dirs, 1);
    }

    #[test]
    fn default_options_match_documentation() {
        let options = CompareOptions::default();
        assert!(!options.compare_size);
        assert!(!options.compare_date);
        assert!(!options.compare_content);
        assert_eq!(options.date_tolerance_ms, 1000);
        assert_eq!(options.content_strategy, ContentStrategy::Bytes);
        assert!(options.include_filter.is_none());
        assert!(options.exclude_filter.is_none());
    }
}
