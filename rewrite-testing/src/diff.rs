//! Unified diffs of rewritten units.

use std::fmt;
use std::path::Path;

use similar::{ChangeTag, TextDiff};

/// Line counts over one or more rewritten files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl DiffStats {
    pub fn add(&mut self, other: &DiffStats) {
        self.files_changed += other.files_changed;
        self.lines_added += other.lines_added;
        self.lines_removed += other.lines_removed;
    }

    pub fn is_empty(&self) -> bool {
        self.files_changed == 0
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files = if self.files_changed == 1 { "file" } else { "files" };
        write!(
            f,
            "{} {files} changed, {} insertions(+), {} deletions(-)",
            self.files_changed, self.lines_added, self.lines_removed
        )
    }
}

/// The unified diff between a unit's source before and after a run.
///
/// Headers use `a/` and `b/` prefixes so the output applies with
/// `git apply` from the directory the paths are relative to.
///
/// # Arguments
/// * `path` - the unit's source path, used in the headers
/// * `before` - the source as read
/// * `after` - the printed rewritten unit
/// * `context_lines` - lines of context around each hunk
///
/// # Returns
/// An empty string and zeroed stats when nothing changed.
pub fn unified_diff(path: &Path, before: &str, after: &str, context_lines: usize) -> (String, DiffStats) {
    let diff = TextDiff::from_lines(before, after);
    let mut stats = DiffStats::default();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => stats.lines_added += 1,
            ChangeTag::Delete => stats.lines_removed += 1,
            ChangeTag::Equal => {}
        }
    }
    if stats.lines_added == 0 && stats.lines_removed == 0 {
        return (String::new(), stats);
    }
    stats.files_changed = 1;

    let path = path.display().to_string().replace('\\', "/");
    let output = diff
        .unified_diff()
        .context_radius(context_lines)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string();
    (output, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_of_rewritten_assertion() {
        let before = "class T {\n  void t() {\n    assertEquals(1, n);\n  }\n}\n";
        let after = "class T {\n  void t() {\n    assertThat(n).isEqualTo(1);\n  }\n}\n";
        let (diff, stats) = unified_diff(Path::new("src/T.java"), before, after, 3);
        assert!(diff.starts_with("--- a/src/T.java\n+++ b/src/T.java\n"));
        assert!(diff.contains("-    assertEquals(1, n);\n"));
        assert!(diff.contains("+    assertThat(n).isEqualTo(1);\n"));
        assert_eq!(
            stats,
            DiffStats {
                files_changed: 1,
                lines_added: 1,
                lines_removed: 1
            }
        );
    }

    #[test]
    fn unchanged_source_has_no_diff() {
        let source = "class T {}\n";
        let (diff, stats) = unified_diff(Path::new("T.java"), source, source, 3);
        assert!(diff.is_empty());
        assert!(stats.is_empty());
    }

    #[test]
    fn stats_accumulate_and_display() {
        let mut total = DiffStats::default();
        total.add(&DiffStats {
            files_changed: 1,
            lines_added: 2,
            lines_removed: 1,
        });
        total.add(&DiffStats {
            files_changed: 1,
            lines_added: 0,
            lines_removed: 3,
        });
        assert_eq!(total.to_string(), "2 files changed, 2 insertions(+), 4 deletions(-)");
    }
}
