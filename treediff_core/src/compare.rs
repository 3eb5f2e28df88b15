use crate::buffer_pool::BufferPool;
use crate::content::{self, ContentCompare};
use crate::entry::{self, Entry};
use crate::fd_queue::FdQueue;
use crate::filter::EntryFilter;
use crate::symlink::{self, SymlinkCache};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};
use treediff_common::{
    CompareOptions, CompareResults, DiffState, Difference, EntryKind, Result, Statistics,
    TreeDiffError,
};

/// Recursive two-way tree comparison engine.
///
/// Owns its resource pools and content strategy; multiple engines with
/// independent configuration can coexist in one process. Stateless between
/// `compare` calls.
pub struct CompareEngine {
    options: CompareOptions,
    filter: EntryFilter,
    content: Box<dyn ContentCompare>,
}

impl CompareEngine {
    /// Validates the options (glob filters) and wires the resource pools.
    /// Configuration errors surface here, before any filesystem access.
    pub fn new(options: CompareOptions) -> Result<Self> {
        let filter = EntryFilter::new(
            options.include_filter.as_deref(),
            options.exclude_filter.as_deref(),
        )?;
        let fd_queue = FdQueue::new(content::MAX_CONCURRENT_FILE_COMPARE * 2);
        let buffers = BufferPool::new(content::DEFAULT_BUF_SIZE, fd_queue.comparison_slots());
        let content = content::build_strategy(&options, fd_queue, buffers);
        Ok(Self {
            options,
            filter,
            content,
        })
    }

    /// Compares the two roots and returns the finalized statistics plus the
    /// flat list of differences.
    pub fn compare(&self, path1: &Path, path2: &Path) -> Result<CompareResults> {
        let mut statistics = Statistics::default();
        let mut differences = Vec::new();
        self.compare_with_sink(path1, path2, &mut |difference: &Difference| {
            statistics.record(difference);
            differences.push(difference.clone());
        })?;
        statistics.finalize();
        Ok(CompareResults {
            statistics,
            differences,
        })
    }

    /// Runs the comparison, handing every difference to `sink` exactly once.
    /// The sink sees sibling entries in sorted order; the complete set is
    /// deterministic once this returns.
    pub fn compare_with_sink(
        &self,
        path1: &Path,
        path2: &Path,
        sink: &mut dyn FnMut(&Difference),
    ) -> Result<()> {
        // Canonical roots are required for loop detection to work.
        let root1 = self.resolve_root(path1)?;
        let root2 = self.resolve_root(path2)?;
        info!(
            "comparing {} with {}",
            root1.absolute_path.display(),
            root2.absolute_path.display()
        );

        let cache = SymlinkCache::default();
        let differences =
            self.compare_frame(Some(&root1), Some(&root2), 0, Path::new(""), &cache)?;
        debug!("classified {} positions", differences.len());

        for difference in &differences {
            sink(difference);
        }
        Ok(())
    }

    fn resolve_root(&self, path: &Path) -> Result<Entry> {
        let absolute = fs::canonicalize(path)
            .map_err(|e| TreeDiffError::Root(format!("{}: {}", path.display(), e)))?;
        Entry::from_root(absolute, path)
    }

    /// One traversal frame: list both sides, merge the sorted listings, then
    /// resolve the deferred content comparisons and subtree recursions
    /// concurrently. Returns this subtree's differences in traversal order.
    fn compare_frame(
        &self,
        root1: Option<&Entry>,
        root2: Option<&Entry>,
        level: usize,
        relative_path: &Path,
        cache: &SymlinkCache,
    ) -> Result<Vec<Difference>> {
        let loop1 = symlink::detect_loop(root1, &cache.left)?;
        let loop2 = symlink::detect_loop(root2, &cache.right)?;

        // This frame's own copy; siblings never see the marks added here.
        let mut cache = cache.clone();
        if let (Some(root1), false) = (root1, loop1) {
            cache.left.insert(symlink::visited_key(root1)?);
        }
        if let (Some(root2), false) = (root2, loop2) {
            cache.right.insert(symlink::visited_key(root2)?);
        }

        let entries1 = self.list_side(root1, loop1)?;
        let entries2 = self.list_side(root2, loop2)?;

        let mut slots: Vec<Slot> = Vec::new();
        let mut jobs: Vec<Job> = Vec::new();
        let mut i1 = 0;
        let mut i2 = 0;

        while i1 < entries1.len() || i2 < entries2.len() {
            // An exhausted side always sorts after the other, so unmatched
            // entries report in listing order.
            let cmp = if i1 < entries1.len() && i2 < entries2.len() {
                entry::entry_order(&entries1[i1], &entries2[i2], self.options.ignore_case)
            } else if i1 < entries1.len() {
                Ordering::Less
            } else {
                Ordering::Greater
            };

            match cmp {
                Ordering::Equal => {
                    let entry1 = &entries1[i1];
                    let entry2 = &entries2[i2];
                    if entry1.kind == EntryKind::File {
                        match self.file_outcome(entry1, entry2) {
                            Some(same) => slots.push(Slot::Ready(paired_difference(
                                entry1,
                                entry2,
                                same,
                                level,
                                relative_path,
                            ))),
                            None => {
                                slots.push(Slot::Deferred(jobs.len()));
                                jobs.push(Job::Content {
                                    entry1: entry1.clone(),
                                    entry2: entry2.clone(),
                                });
                            }
                        }
                    } else {
                        // Directory equality never depends on content, only
                        // on the union of children handled by recursion.
                        slots.push(Slot::Ready(paired_difference(
                            entry1,
                            entry2,
                            true,
                            level,
                            relative_path,
                        )));
                        if !self.options.skip_subdirectories {
                            slots.push(Slot::Deferred(jobs.len()));
                            jobs.push(Job::Subtree {
                                root1: Some(entry1.clone()),
                                root2: Some(entry2.clone()),
                                relative_path: relative_path.join(&entry1.name),
                            });
                        }
                    }
                    i1 += 1;
                    i2 += 1;
                }
                Ordering::Less => {
                    let entry1 = &entries1[i1];
                    slots.push(Slot::Ready(one_sided_difference(
                        entry1,
                        DiffState::Left,
                        level,
                        relative_path,
                    )));
                    if entry1.kind == EntryKind::Directory && !self.options.skip_subdirectories {
                        slots.push(Slot::Deferred(jobs.len()));
                        jobs.push(Job::Subtree {
                            root1: Some(entry1.clone()),
                            root2: None,
                            relative_path: relative_path.join(&entry1.name),
                        });
                    }
                    i1 += 1;
                }
                Ordering::Greater => {
                    let entry2 = &entries2[i2];
                    slots.push(Slot::Ready(one_sided_difference(
                        entry2,
                        DiffState::Right,
                        level,
                        relative_path,
                    )));
                    if entry2.kind == EntryKind::Directory && !self.options.skip_subdirectories {
                        slots.push(Slot::Deferred(jobs.len()));
                        jobs.push(Job::Subtree {
                            root1: None,
                            root2: Some(entry2.clone()),
                            relative_path: relative_path.join(&entry2.name),
                        });
                    }
                    i2 += 1;
                }
            }
        }

        // Fan out: every recursion and content comparison discovered by this
        // merge pass runs concurrently and is awaited as a batch. Any error
        // aborts the whole run.
        let outputs = jobs
            .into_par_iter()
            .map(|job| self.run_job(job, level, relative_path, &cache))
            .collect::<Result<Vec<JobOutput>>>()?;

        let mut outputs: Vec<Option<JobOutput>> = outputs.into_iter().map(Some).collect();
        let mut differences = Vec::new();
        for slot in slots {
            match slot {
                Slot::Ready(difference) => differences.push(difference),
                Slot::Deferred(index) => match outputs[index].take() {
                    Some(JobOutput::Content(difference)) => differences.push(difference),
                    Some(JobOutput::Subtree(subtree)) => differences.extend(subtree),
                    None => {}
                },
            }
        }
        Ok(differences)
    }

    fn run_job(
        &self,
        job: Job,
        level: usize,
        relative_path: &Path,
        cache: &SymlinkCache,
    ) -> Result<JobOutput> {
        match job {
            Job::Content { entry1, entry2 } => {
                let same = self
                    .content
                    .same_content(&entry1.absolute_path, &entry2.absolute_path)?;
                Ok(JobOutput::Content(paired_difference(
                    &entry1,
                    &entry2,
                    same,
                    level,
                    relative_path,
                )))
            }
            Job::Subtree {
                root1,
                root2,
                relative_path,
            } => {
                let subtree = self.compare_frame(
                    root1.as_ref(),
                    root2.as_ref(),
                    level + 1,
                    &relative_path,
                    cache,
                )?;
                Ok(JobOutput::Subtree(subtree))
            }
        }
    }

    /// Strict precedence chain for a same-named file pair: the first enabled
    /// check that fails decides; only `compare_content` defers.
    fn file_outcome(&self, entry1: &Entry, entry2: &Entry) -> Option<bool> {
        if self.options.compare_size && entry1.size != entry2.size {
            Some(false)
        } else if self.options.compare_date
            && !same_date(
                entry1.modified,
                entry2.modified,
                self.options.date_tolerance_ms,
            )
        {
            Some(false)
        } else if self.options.compare_content {
            None
        } else {
            Some(true)
        }
    }

    /// The sorted, filtered listing for one side of a frame. A missing or
    /// loop-detected side lists as empty; a plain file lists as itself
    /// (depth-0 file-to-file comparison).
    fn list_side(&self, root: Option<&Entry>, loop_detected: bool) -> Result<Vec<Entry>> {
        let root = match root {
            Some(root) if !loop_detected => root,
            _ => return Ok(Vec::new()),
        };

        if root.kind != EntryKind::Directory {
            return Ok(vec![root.clone()]);
        }

        let mut entries = Vec::new();
        for child in fs::read_dir(&root.absolute_path)? {
            let child = child?;
            let built = Entry::from_child(root, &child.file_name(), self.options.skip_symlinks)?;
            if let Some(entry) = built {
                if self.filter.keeps(&entry) {
                    entries.push(entry);
                }
            }
        }
        entries.sort_by(|a, b| entry::entry_order(a, b, self.options.ignore_case));
        Ok(entries)
    }
}

enum Slot {
    Ready(Difference),
    Deferred(usize),
}

enum Job {
    Content {
        entry1: Entry,
        entry2: Entry,
    },
    Subtree {
        root1: Option<Entry>,
        root2: Option<Entry>,
        relative_path: PathBuf,
    },
}

enum JobOutput {
    Content(Difference),
    Subtree(Vec<Difference>),
}

fn same_date(date1: SystemTime, date2: SystemTime, tolerance_ms: u64) -> bool {
    let delta = match date1.duration_since(date2) {
        Ok(delta) => delta,
        Err(e) => e.duration(),
    };
    delta <= Duration::from_millis(tolerance_ms)
}

fn paired_difference(
    entry1: &Entry,
    entry2: &Entry,
    same: bool,
    level: usize,
    relative_path: &Path,
) -> Difference {
    Difference {
        relative_path: relative_path.to_path_buf(),
        level,
        state: if same {
            DiffState::Equal
        } else {
            DiffState::Distinct
        },
        path1: entry1.path.parent().map(Path::to_path_buf),
        path2: entry2.path.parent().map(Path::to_path_buf),
        name1: Some(entry1.name.clone()),
        name2: Some(entry2.name.clone()),
        kind1: entry1.kind,
        kind2: entry2.kind,
        size1: Some(entry1.size),
        size2: Some(entry2.size),
        date1: Some(entry1.modified),
        date2: Some(entry2.modified),
    }
}

fn one_sided_difference(
    entry: &Entry,
    state: DiffState,
    level: usize,
    relative_path: &Path,
) -> Difference {
    let parent = entry.path.parent().map(Path::to_path_buf);
    let left = state == DiffState::Left;
    Difference {
        relative_path: relative_path.to_path_buf(),
        level,
        state,
        path1: if left { parent.clone() } else { None },
        path2: if left { None } else { parent },
        name1: left.then(|| entry.name.clone()),
        name2: (!left).then(|| entry.name.clone()),
        kind1: if left { entry.kind } else { EntryKind::Missing },
        kind2: if left { EntryKind::Missing } else { entry.kind },
        size1: left.then_some(entry.size),
        size2: (!left).then_some(entry.size),
        date1: left.then_some(entry.modified),
        date2: (!left).then_some(entry.modified),
    }
}
