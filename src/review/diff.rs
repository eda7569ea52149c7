use std::collections::BTreeSet;
use std::sync::OnceLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::error::{AppError, Result};

/// Extension of the files the checker understands.
pub const SOURCE_EXTENSION: &str = ".py";

/// Added line numbers per file, in the order files appear in the diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChangeSet {
    files: Vec<(String, BTreeSet<u32>)>,
}

fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk regex")
    })
}

fn git_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").expect("valid header regex"))
}

/// One file entry while it is being parsed.
struct Entry {
    target: Option<String>,
    saw_target_header: bool,
    added: BTreeSet<u32>,
}

impl Entry {
    fn new(target: Option<String>) -> Self {
        Self {
            target,
            saw_target_header: false,
            added: BTreeSet::new(),
        }
    }
}

/// Remaining line budget of the hunk being walked.
struct Hunk {
    old_remaining: u32,
    new_remaining: u32,
    next_new_line: u32,
}

impl Hunk {
    fn is_done(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }
}

/// Strip the `b/` marker and any trailing timestamp from a `+++` path.
/// `/dev/null` means the file was deleted and has no target.
fn target_path(raw: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    if raw == "/dev/null" {
        return None;
    }
    Some(raw.strip_prefix("b/").unwrap_or(raw).to_string())
}

fn parse_count(value: Option<regex::Match<'_>>) -> Result<u32> {
    match value {
        Some(m) => m
            .as_str()
            .parse()
            .map_err(|e| AppError::DiffParse(format!("bad hunk count {:?}: {e}", m.as_str()))),
        None => Ok(1),
    }
}

impl FileChangeSet {
    /// Parse a unified diff into the lines each file gains.
    ///
    /// Binary and rename-only entries are kept with an empty line set;
    /// deleted files are dropped. Any structural inconsistency fails the
    /// whole parse so that no partial result is ever used.
    pub fn parse(diff: &str) -> Result<Self> {
        let mut set = FileChangeSet::default();
        let mut current: Option<Entry> = None;
        let mut hunk: Option<Hunk> = None;

        for (index, line) in diff.lines().enumerate() {
            let line_no = index + 1;

            if let Some(h) = hunk.as_mut() {
                match line.chars().next() {
                    Some('+') => {
                        if h.new_remaining == 0 {
                            return Err(AppError::DiffParse(format!(
                                "line {line_no}: added line exceeds hunk length"
                            )));
                        }
                        if let Some(entry) = current.as_mut() {
                            entry.added.insert(h.next_new_line);
                        }
                        h.next_new_line += 1;
                        h.new_remaining -= 1;
                    }
                    Some('-') => {
                        if h.old_remaining == 0 {
                            return Err(AppError::DiffParse(format!(
                                "line {line_no}: removed line exceeds hunk length"
                            )));
                        }
                        h.old_remaining -= 1;
                    }
                    Some(' ') | None => {
                        if h.old_remaining == 0 || h.new_remaining == 0 {
                            return Err(AppError::DiffParse(format!(
                                "line {line_no}: context line exceeds hunk length"
                            )));
                        }
                        h.next_new_line += 1;
                        h.old_remaining -= 1;
                        h.new_remaining -= 1;
                    }
                    // "\ No newline at end of file"
                    Some('\\') => {}
                    Some(_) => {
                        return Err(AppError::DiffParse(format!(
                            "line {line_no}: hunk ended early, {} old and {} new lines missing",
                            h.old_remaining, h.new_remaining
                        )));
                    }
                }
                if h.is_done() {
                    hunk = None;
                }
                continue;
            }

            if let Some(caps) = git_header_re().captures(line) {
                set.finish(current.take());
                current = Some(Entry::new(Some(caps[2].to_string())));
            } else if line.starts_with("--- ") {
                let needs_new_entry = current.as_ref().map_or(true, |e| e.saw_target_header);
                if needs_new_entry {
                    set.finish(current.take());
                    current = Some(Entry::new(None));
                }
            } else if let Some(raw) = line.strip_prefix("+++ ") {
                let entry = current.as_mut().ok_or_else(|| {
                    AppError::DiffParse(format!("line {line_no}: '+++' header outside a file entry"))
                })?;
                entry.target = target_path(raw);
                entry.saw_target_header = true;
            } else if line.starts_with("@@") {
                let entry = current.as_ref().ok_or_else(|| {
                    AppError::DiffParse(format!("line {line_no}: hunk outside a file entry"))
                })?;
                if !entry.saw_target_header {
                    return Err(AppError::DiffParse(format!(
                        "line {line_no}: hunk before the file's '+++' header"
                    )));
                }
                let caps = hunk_header_re().captures(line).ok_or_else(|| {
                    AppError::DiffParse(format!("line {line_no}: malformed hunk header {line:?}"))
                })?;
                let new_start: u32 = caps[3]
                    .parse()
                    .map_err(|e| AppError::DiffParse(format!("line {line_no}: {e}")))?;
                let h = Hunk {
                    old_remaining: parse_count(caps.get(2))?,
                    new_remaining: parse_count(caps.get(4))?,
                    next_new_line: new_start,
                };
                if !h.is_done() {
                    hunk = Some(h);
                }
            }
            // Everything else (index, mode, rename, similarity, binary
            // markers, preamble) carries no line information.
        }

        if let Some(h) = hunk {
            return Err(AppError::DiffParse(format!(
                "diff ended inside a hunk, {} old and {} new lines missing",
                h.old_remaining, h.new_remaining
            )));
        }
        set.finish(current);

        Ok(set)
    }

    fn finish(&mut self, entry: Option<Entry>) {
        let Some(entry) = entry else { return };
        let Some(target) = entry.target else { return };
        match self.files.iter_mut().find(|(path, _)| *path == target) {
            Some((_, lines)) => lines.extend(entry.added),
            None => self.files.push((target, entry.added)),
        }
    }

    /// View restricted to checkable source files that no exclusion matches.
    pub fn source_files_only(&self, exclusions: &Exclusions) -> FileChangeSet {
        FileChangeSet {
            files: self
                .files
                .iter()
                .filter(|(path, _)| path.ends_with(SOURCE_EXTENSION) && !exclusions.is_match(path))
                .cloned()
                .collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&BTreeSet<u32>> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, lines)| lines)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<u32>)> {
        self.files.iter().map(|(path, lines)| (path.as_str(), lines))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(path, _)| path.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Case-sensitive exclusion globs matched against the full relative path.
/// `*` also crosses directory separators.
#[derive(Debug, Clone)]
pub struct Exclusions {
    set: GlobSet,
}

impl Exclusions {
    /// Build the matcher. Patterns that do not compile are skipped with a
    /// warning rather than failing the review.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match GlobBuilder::new(pattern).literal_separator(false).build() {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Ignoring invalid exclude pattern");
                }
            }
        }
        let set = builder.build().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build exclude globset, excluding nothing");
            GlobSet::empty()
        });
        Self { set }
    }

    pub fn none() -> Self {
        Self {
            set: GlobSet::empty(),
        }
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.set.is_match(path)
    }
}
