use crate::entry::Entry;
use glob::Pattern;
use treediff_common::{EntryKind, Result, TreeDiffError};

/// Name filter applied to directory listings.
///
/// The include list only restricts files (directories must stay visible so
/// traversal can reach nested matches); the exclude list drops files and
/// directories alike. Both accept comma-separated glob patterns.
#[derive(Debug, Default)]
pub struct EntryFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl EntryFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: parse_patterns(include)?,
            exclude: parse_patterns(exclude)?,
        })
    }

    /// Returns true if the entry should be processed.
    pub fn keeps(&self, entry: &Entry) -> bool {
        if entry.kind == EntryKind::File
            && !self.include.is_empty()
            && !self.include.iter().any(|p| p.matches(&entry.name))
        {
            return false;
        }

        if self.exclude.iter().any(|p| p.matches(&entry.name)) {
            return false;
        }

        true
    }
}

fn parse_patterns(list: Option<&str>) -> Result<Vec<Pattern>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };

    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            Pattern::new(p)
                .map_err(|e| TreeDiffError::Config(format!("invalid filter pattern '{}': {}", p, e)))
        })
        .collect()
}
