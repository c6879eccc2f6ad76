//! Unified diff parsing into a `ChangeSet`.
//!
//! Hunks are tracked line by line, so both `-U0` output and diffs carrying
//! context lines produce the same changed ranges. Within a hunk, each run of
//! consecutive `+`/`-` lines becomes one `Hunk::Lines` over the added lines,
//! or a `Hunk::Removal` when the run only removed lines.

use crate::change::{ChangeSet, ChangeStatus, FileChange, Hunk};
use crate::error::{Result, TestscopeError};
use once_cell::sync::Lazy;
use regex::Regex;

static DIFF_GIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").expect("valid diff header regex"));

static HUNK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk header regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
}

pub fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let caps = HUNK_RE.captures(line)?;
    let number = |idx: usize| -> Option<usize> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(1),
        }
    };
    Some(HunkHeader {
        old_start: number(1)?,
        old_count: number(2)?,
        new_start: number(3)?,
        new_count: number(4)?,
    })
}

#[derive(Default)]
struct PendingFile {
    old_path: Option<String>,
    new_path: Option<String>,
    status: Option<ChangeStatus>,
    rename: bool,
    hunks: Vec<Hunk>,
}

impl PendingFile {
    fn finish(self, out: &mut Vec<FileChange>) {
        let old_path = self.old_path;
        let new_path = self.new_path;

        if self.rename {
            if let (Some(old), Some(new)) = (old_path.as_ref(), new_path.as_ref()) {
                if old != new {
                    out.push(FileChange::deleted(old.clone()));
                    out.push(FileChange::added(new.clone()));
                    return;
                }
            }
        }

        match self.status.unwrap_or(ChangeStatus::Modified) {
            ChangeStatus::Added => {
                if let Some(path) = new_path.or(old_path) {
                    out.push(FileChange::added(path));
                }
            }
            ChangeStatus::Deleted => {
                if let Some(path) = old_path.or(new_path) {
                    out.push(FileChange::deleted(path));
                }
            }
            ChangeStatus::Modified => {
                if let Some(path) = new_path.or(old_path) {
                    out.push(FileChange::modified(path, self.hunks));
                }
            }
        }
    }
}

/// Line cursor inside one hunk body.
struct HunkBody {
    old_left: usize,
    new_left: usize,
    /// Next line number in the new version.
    new_line: usize,
    run: Option<Run>,
}

/// A run of consecutive changed lines.
struct Run {
    first_added: Option<usize>,
    last_added: usize,
    /// New-version line the run follows.
    after: usize,
}

impl HunkBody {
    fn new(header: HunkHeader) -> Self {
        // With new_count == 0, git reports the line *before* the removal.
        let new_line = if header.new_count == 0 {
            header.new_start + 1
        } else {
            header.new_start
        };
        Self {
            old_left: header.old_count,
            new_left: header.new_count,
            new_line,
            run: None,
        }
    }

    fn is_done(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }

    fn run(&mut self) -> &mut Run {
        let after = self.new_line.saturating_sub(1);
        self.run.get_or_insert(Run {
            first_added: None,
            last_added: 0,
            after,
        })
    }

    fn added(&mut self) {
        let line = self.new_line;
        let run = self.run();
        run.first_added.get_or_insert(line);
        run.last_added = line;
        self.new_line += 1;
        self.new_left = self.new_left.saturating_sub(1);
    }

    fn removed(&mut self) {
        self.run();
        self.old_left = self.old_left.saturating_sub(1);
    }

    fn context(&mut self, hunks: &mut Vec<Hunk>) {
        self.close_run(hunks);
        self.new_line += 1;
        self.old_left = self.old_left.saturating_sub(1);
        self.new_left = self.new_left.saturating_sub(1);
    }

    fn close_run(&mut self, hunks: &mut Vec<Hunk>) {
        if let Some(run) = self.run.take() {
            match run.first_added {
                Some(first) => hunks.push(Hunk::lines(first, run.last_added)),
                None => hunks.push(Hunk::Removal { after: run.after }),
            }
        }
    }
}

fn strip_side_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}

/// Parses `git diff` output. Paths come out exactly as git printed them,
/// minus the `a/` and `b/` prefixes.
pub fn parse_unified_diff(text: &str) -> Result<ChangeSet> {
    let mut files: Vec<FileChange> = Vec::new();
    let mut current: Option<PendingFile> = None;
    let mut body: Option<HunkBody> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(hunk) = body.as_mut() {
            if !hunk.is_done() {
                let Some(file) = current.as_mut() else {
                    return Err(TestscopeError::Internal("hunk without file".to_string()));
                };
                if line.starts_with('+') {
                    hunk.added();
                } else if line.starts_with('-') {
                    hunk.removed();
                } else if line.starts_with(' ') || line.is_empty() {
                    hunk.context(&mut file.hunks);
                } else if line.starts_with('\\') {
                    // "\ No newline at end of file"
                } else {
                    return Err(TestscopeError::Diff {
                        line: line_no,
                        message: format!("unexpected line inside hunk: {}", line),
                    });
                }
                if hunk.is_done() {
                    hunk.close_run(&mut file.hunks);
                }
                continue;
            }
        }
        if line.starts_with('\\') {
            continue;
        }
        body = None;

        if line.starts_with("diff --git ") {
            if let Some(done) = current.take() {
                done.finish(&mut files);
            }
            let mut pending = PendingFile::default();
            if let Some(caps) = DIFF_GIT_RE.captures(line) {
                pending.old_path = Some(caps[1].to_string());
                pending.new_path = Some(caps[2].to_string());
            }
            current = Some(pending);
            continue;
        }

        if line.starts_with("@@") {
            let Some(header) = parse_hunk_header(line) else {
                return Err(TestscopeError::Diff {
                    line: line_no,
                    message: format!("malformed hunk header: {}", line),
                });
            };
            if current.is_none() {
                return Err(TestscopeError::Diff {
                    line: line_no,
                    message: "hunk before any file header".to_string(),
                });
            }
            let hunk = HunkBody::new(header);
            if hunk.is_done() {
                continue;
            }
            body = Some(hunk);
            continue;
        }

        let Some(file) = current.as_mut() else {
            // Preamble (e.g. commit headers) before the first file.
            continue;
        };

        if line.starts_with("new file mode") {
            file.status = Some(ChangeStatus::Added);
        } else if line.starts_with("deleted file mode") {
            file.status = Some(ChangeStatus::Deleted);
        } else if let Some(path) = line.strip_prefix("rename from ") {
            file.rename = true;
            file.old_path = Some(path.to_string());
        } else if let Some(path) = line.strip_prefix("rename to ") {
            file.rename = true;
            file.new_path = Some(path.to_string());
        } else if let Some(path) = line.strip_prefix("--- ") {
            if path == "/dev/null" {
                file.status = Some(ChangeStatus::Added);
            } else {
                file.old_path = Some(strip_side_prefix(path, "a/").to_string());
            }
        } else if let Some(path) = line.strip_prefix("+++ ") {
            if path == "/dev/null" {
                file.status = Some(ChangeStatus::Deleted);
            } else {
                file.new_path = Some(strip_side_prefix(path, "b/").to_string());
            }
        } else if line.starts_with("Binary files") {
            // No line data; the mapper treats the file as changed whole.
            file.hunks.clear();
        }
    }

    if let Some(done) = current.take() {
        done.finish(&mut files);
    }

    Ok(ChangeSet::new(files))
}
