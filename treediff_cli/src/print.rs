use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;
use std::time::SystemTime;
use treediff_common::{CompareResults, DiffState, Difference, EntryKind};

/// Display options for one report, mirroring the command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ReportView {
    pub show_all: bool,
    pub show_equal: bool,
    pub show_left: bool,
    pub show_right: bool,
    pub show_distinct: bool,
    /// Include directories in the detailed report and use the whole-tree
    /// counters in the summary; otherwise the report covers files only.
    pub whole_report: bool,
    pub csv: bool,
    pub no_colors: bool,
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

struct Palette {
    equal: &'static str,
    distinct: &'static str,
    missing: &'static str,
    reset: &'static str,
}

impl Palette {
    fn new(no_colors: bool) -> Self {
        if no_colors {
            Self {
                equal: "",
                distinct: "",
                missing: "",
                reset: "",
            }
        } else {
            Self {
                equal: GREEN,
                distinct: RED,
                missing: YELLOW,
                reset: RESET,
            }
        }
    }

    fn for_state(&self, state: DiffState) -> (&'static str, &'static str) {
        match state {
            DiffState::Equal => (self.equal, self.reset),
            DiffState::Distinct => (self.distinct, self.reset),
            DiffState::Left | DiffState::Right => ("", ""),
        }
    }
}

/// Renders the comparison results to `writer` as a detailed listing (pretty
/// or CSV) followed by the verdict and summary lines.
pub fn print_report(
    results: &CompareResults,
    writer: &mut dyn Write,
    view: &ReportView,
) -> anyhow::Result<()> {
    if view.csv {
        print_csv(results, writer)?;
    } else {
        print_pretty(results, writer, view)?;
    }

    let stats = &results.statistics;
    let palette = Palette::new(view.no_colors);
    let verdict = if stats.is_same {
        format!("{}Entries are identical{}", palette.equal, palette.reset)
    } else {
        format!("{}Entries are different{}", palette.distinct, palette.reset)
    };
    writeln!(writer, "{}", verdict)?;

    let (total, equal, distinct, left, right) = if view.whole_report {
        (stats.total, stats.equal, stats.distinct, stats.left, stats.right)
    } else {
        (
            stats.total_files,
            stats.equal_files,
            stats.distinct_files,
            stats.left_files,
            stats.right_files,
        )
    };
    writeln!(
        writer,
        "total: {}, equal: {}{}{}, distinct: {}{}{}, only left: {}, only right: {}",
        total, palette.equal, equal, palette.reset, palette.distinct, distinct, palette.reset, left,
        right
    )?;
    Ok(())
}

fn shown(difference: &Difference, view: &ReportView) -> bool {
    if !view.whole_report && difference.kind() != EntryKind::File {
        return false;
    }
    match difference.state {
        DiffState::Equal => view.show_all || view.show_equal,
        DiffState::Left => view.show_all || view.show_left,
        DiffState::Right => view.show_all || view.show_right,
        DiffState::Distinct => view.show_all || view.show_distinct,
    }
}

fn print_pretty(
    results: &CompareResults,
    writer: &mut dyn Write,
    view: &ReportView,
) -> anyhow::Result<()> {
    let palette = Palette::new(view.no_colors);

    for difference in &results.differences {
        if !shown(difference, view) {
            continue;
        }

        let glyph = match difference.state {
            DiffState::Equal => "==",
            DiffState::Distinct => "<>",
            DiffState::Left => "->",
            DiffState::Right => "<-",
        };
        let (color, reset) = palette.for_state(difference.state);

        let path = if difference.relative_path.as_os_str().is_empty() {
            std::path::MAIN_SEPARATOR.to_string()
        } else {
            difference.relative_path.display().to_string()
        };

        let missing1 = if difference.kind1 == EntryKind::Missing {
            format!("{}missing{}", palette.missing, palette.reset)
        } else {
            String::new()
        };
        let missing2 = if difference.kind2 == EntryKind::Missing {
            format!("{}missing{}", palette.missing, palette.reset)
        } else {
            String::new()
        };
        let name1 = difference.name1.as_deref().unwrap_or("");
        let name2 = difference.name2.as_deref().unwrap_or("");
        let entry_text = format!(
            "{}{}{}{}{}{}{}",
            missing1, name1, color, glyph, reset, missing2, name2
        );

        if view.whole_report {
            writeln!(writer, "[{}] {}({})", path, entry_text, difference.kind())?;
        } else {
            writeln!(writer, "[{}] {}", path, entry_text)?;
        }
    }
    Ok(())
}

fn print_csv(results: &CompareResults, writer: &mut dyn Write) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "path", "name", "state", "type", "size1", "size2", "date1", "date2",
    ])?;

    for difference in &results.differences {
        let path = if difference.relative_path.as_os_str().is_empty() {
            std::path::MAIN_SEPARATOR.to_string()
        } else {
            difference.relative_path.display().to_string()
        };

        // Sizes are only meaningful for files.
        let size1 = csv_size(difference.size1, difference.kind1);
        let size2 = csv_size(difference.size2, difference.kind2);

        csv_writer.write_record([
            path,
            difference.name().to_string(),
            difference.state.to_string(),
            difference.kind().to_string(),
            size1,
            size2,
            csv_date(difference.date1),
            csv_date(difference.date2),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn csv_size(size: Option<u64>, kind: EntryKind) -> String {
    match (size, kind) {
        (Some(size), EntryKind::File) => size.to_string(),
        _ => String::new(),
    }
}

fn csv_date(date: Option<SystemTime>) -> String {
    match date {
        Some(date) => {
            DateTime::<Utc>::from(date).to_rfc3339_opts(SecondsFormat::Millis, true)
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use treediff_common::Statistics;

    fn file_pair(name: &str, state: DiffState) -> Difference {
        Difference {
            relative_path: PathBuf::new(),
            level: 0,
            state,
            path1: Some(PathBuf::from("left")),
            path2: Some(PathBuf::from("right")),
            name1: Some(name.to_string()),
            name2: Some(name.to_string()),
            kind1: EntryKind::File,
            kind2: EntryKind::File,
            size1: Some(10),
            size2: Some(10),
            date1: Some(SystemTime::UNIX_EPOCH),
            date2: Some(SystemTime::UNIX_EPOCH),
        }
    }

    fn results_with(differences: Vec<Difference>) -> CompareResults {
        let mut statistics = Statistics::default();
        for difference in &differences {
            statistics.record(difference);
        }
        statistics.finalize();
        CompareResults {
            statistics,
            differences,
        }
    }

    fn render(results: &CompareResults, view: &ReportView) -> String {
        let mut out = Vec::new();
        print_report(results, &mut out, view).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn default_view_prints_only_the_summary() {
        let results = results_with(vec![file_pair("a.txt", DiffState::Distinct)]);
        let view = ReportView {
            no_colors: true,
            ..ReportView::default()
        };
        let text = render(&results, &view);
        assert!(text.contains("Entries are different"));
        assert!(text.contains("total: 1, equal: 0, distinct: 1, only left: 0, only right: 0"));
        assert!(!text.contains("a.txt"));
    }

    #[test]
    fn show_distinct_lists_the_entry() {
        let results = results_with(vec![file_pair("a.txt", DiffState::Distinct)]);
        let view = ReportView {
            show_distinct: true,
            no_colors: true,
            ..ReportView::default()
        };
        let text = render(&results, &view);
        assert!(text.contains("a.txt<>a.txt"));
    }

    #[test]
    fn directories_hidden_without_whole_report() {
        let mut dir_diff = file_pair("sub", DiffState::Equal);
        dir_diff.kind1 = EntryKind::Directory;
        dir_diff.kind2 = EntryKind::Directory;
        let results = results_with(vec![dir_diff]);

        let hidden = render(
            &results,
            &ReportView {
                show_all: true,
                no_colors: true,
                ..ReportView::default()
            },
        );
        assert!(!hidden.contains("sub==sub"));

        let whole = render(
            &results,
            &ReportView {
                show_all: true,
                whole_report: true,
                no_colors: true,
                ..ReportView::default()
            },
        );
        assert!(whole.contains("sub==sub(directory)"));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let results = results_with(vec![file_pair("a.txt", DiffState::Equal)]);
        let view = ReportView {
            csv: true,
            no_colors: true,
            ..ReportView::default()
        };
        let text = render(&results, &view);
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("path,name,state,type,size1,size2,date1,date2")
        );
        let row = lines.next().unwrap();
        assert!(row.contains("a.txt,equal,file,10,10"));
    }

    #[test]
    fn one_sided_entry_shows_missing_marker() {
        let mut diff = file_pair("x.txt", DiffState::Left);
        diff.name2 = None;
        diff.kind2 = EntryKind::Missing;
        diff.size2 = None;
        diff.date2 = None;
        diff.path2 = None;
        let results = results_with(vec![diff]);

        let view = ReportView {
            show_left: true,
            no_colors: true,
            ..ReportView::default()
        };
        let text = render(&results, &view);
        assert!(text.contains("x.txt->missing"));
    }
}
