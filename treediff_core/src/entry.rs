use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use treediff_common::{EntryKind, Result};

/// One filesystem node at one level of one side's tree.
///
/// Immutable after construction and owned by the traversal frame that
/// produced it. A missing side is represented as `Option<&Entry>` = `None`;
/// `kind` here is never `EntryKind::Missing`.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub absolute_path: PathBuf,
    /// Nominal path as the caller spelled it, possibly through symlinks.
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: SystemTime,
    pub is_symlink: bool,
}

impl Entry {
    /// Builds the entry for a comparison root. `absolute_path` must already
    /// be canonical; `nominal` is the path the caller supplied.
    pub fn from_root(absolute_path: PathBuf, nominal: &Path) -> Result<Self> {
        let metadata = fs::metadata(&absolute_path)?;
        let lmetadata = fs::symlink_metadata(&absolute_path)?;
        let name = nominal
            .file_name()
            .or_else(|| absolute_path.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());

        Ok(Self {
            name,
            absolute_path,
            path: nominal.to_path_buf(),
            kind: kind_of(&metadata),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_symlink: lmetadata.file_type().is_symlink(),
        })
    }

    /// Builds the entry for one child of `parent`. Returns `Ok(None)` when
    /// the child is a symlink and `skip_symlinks` is set, in which case the
    /// follow-stat is skipped entirely.
    pub fn from_child(parent: &Entry, file_name: &OsStr, skip_symlinks: bool) -> Result<Option<Self>> {
        let absolute_path = parent.absolute_path.join(file_name);
        let lmetadata = fs::symlink_metadata(&absolute_path)?;
        let is_symlink = lmetadata.file_type().is_symlink();
        if is_symlink && skip_symlinks {
            return Ok(None);
        }

        // Follow the link for type/size/mtime; dangling symlinks are an error.
        let metadata = if is_symlink {
            fs::metadata(&absolute_path)?
        } else {
            lmetadata
        };

        Ok(Some(Self {
            name: file_name.to_string_lossy().into_owned(),
            path: parent.path.join(file_name),
            absolute_path,
            kind: kind_of(&metadata),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_symlink,
        }))
    }
}

fn kind_of(metadata: &fs::Metadata) -> EntryKind {
    if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

/// Listing order: directories sort before files; within a kind, names
/// compare byte-wise, or case-folded when `ignore_case` is set.
pub fn entry_order(a: &Entry, b: &Entry, ignore_case: bool) -> Ordering {
    match (a.kind, b.kind) {
        (EntryKind::Directory, EntryKind::File) => Ordering::Less,
        (EntryKind::File, EntryKind::Directory) => Ordering::Greater,
        _ => {
            if ignore_case {
                a.name.to_lowercase().cmp(&b.name.to_lowercase())
            } else {
                a.name.cmp(&b.name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: EntryKind) -> Entry {
        Entry {
            name: name.to_string(),
            absolute_path: PathBuf::from(name),
            path: PathBuf::from(name),
            kind,
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            is_symlink: false,
        }
    }

    #[test]
    fn directories_sort_before_files() {
        let dir = entry("zzz", EntryKind::Directory);
        let file = entry("aaa", EntryKind::File);
        assert_eq!(entry_order(&dir, &file, false), Ordering::Less);
        assert_eq!(entry_order(&file, &dir, false), Ordering::Greater);
    }

    #[test]
    fn names_compare_byte_wise_within_kind() {
        let a = entry("Makefile", EntryKind::File);
        let b = entry("main.c", EntryKind::File);
        // 'M' (0x4d) < 'm' (0x6d)
        assert_eq!(entry_order(&a, &b, false), Ordering::Less);
    }

    #[test]
    fn case_folding_changes_order() {
        let a = entry("README", EntryKind::File);
        let b = entry("alpha", EntryKind::File);
        assert_eq!(entry_order(&a, &b, false), Ordering::Less);
        assert_eq!(entry_order(&a, &b, true), Ordering::Greater);
    }

    #[test]
    fn equal_names_compare_equal_ignoring_case() {
        let a = entry("Data.TXT", EntryKind::File);
        let b = entry("data.txt", EntryKind::File);
        assert_eq!(entry_order(&a, &b, true), Ordering::Equal);
        assert_ne!(entry_order(&a, &b, false), Ordering::Equal);
    }

    #[test]
    fn from_root_on_regular_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let canonical = fs::canonicalize(temp.path()).unwrap();
        let root = Entry::from_root(canonical.clone(), temp.path()).unwrap();
        assert_eq!(root.kind, EntryKind::Directory);
        assert_eq!(root.absolute_path, canonical);
        assert!(!root.is_symlink);
    }

    #[test]
    fn from_child_skips_symlinks_on_request() {
        #[cfg(unix)]
        {
            let temp = tempfile::TempDir::new().unwrap();
            fs::write(temp.path().join("target.txt"), b"data").unwrap();
            std::os::unix::fs::symlink(temp.path().join("target.txt"), temp.path().join("link.txt"))
                .unwrap();

            let parent = Entry::from_root(fs::canonicalize(temp.path()).unwrap(), temp.path()).unwrap();
            let skipped = Entry::from_child(&parent, OsStr::new("link.txt"), true).unwrap();
            assert!(skipped.is_none());

            let followed = Entry::from_child(&parent, OsStr::new("link.txt"), false)
                .unwrap()
                .unwrap();
            assert!(followed.is_symlink);
            assert_eq!(followed.kind, EntryKind::File);
            assert_eq!(followed.size, 4);
        }
    }
}
