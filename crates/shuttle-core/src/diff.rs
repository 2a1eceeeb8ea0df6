//! Minimal change ranges between two versions of a document.
//!
//! Editors that keep state keyed to offsets (collaborator cursors, undo
//! history) must be updated with small edits rather than a full replace.
//! `compute_changes` runs a character diff with a time budget and turns the
//! hunks into `DiffChange`s expressed against the *original* document's
//! UTF-16 offsets, which is what CodeMirror 6 transactions and Monaco edit
//! operations expect.
//!
//! # Coarse diffs
//!
//! A diff cut short by its deadline tends to degrade into "delete everything,
//! insert everything". Such a diff is retried once with the same budget; if it
//! is still coarse and the document is below the size ceiling an exact second
//! pass is accepted, otherwise the whole document is replaced in one change.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffTag, TextDiff};
use web_time::Instant;

use crate::error::{Result, SyncError};
use crate::settings::Settings;
use crate::text::utf16_len;

/// One replace range over the original document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChange {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

impl DiffChange {
    pub fn new(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: insert.into(),
        }
    }
}

/// Tuning for `compute_changes`.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffOptions {
    /// Time budget for a single diff pass.
    pub timeout: Duration,
    /// Documents at or above this many UTF-16 units skip the exact second pass.
    pub size_ceiling: usize,
    /// Changed-character fraction above which a diff counts as coarse.
    pub coarse_fraction: f64,
    /// Fraction of the old text a lone delete+insert pair must cover to count
    /// as a rewrite.
    pub rewrite_fraction: f64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(1000),
            size_ceiling: 200_000,
            coarse_fraction: 0.6,
            rewrite_fraction: 0.9,
        }
    }
}

impl From<&Settings> for DiffOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: Duration::from_millis(u64::from(settings.diff_timeout_ms)),
            size_ceiling: settings.diff_size_ceiling,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Hunk {
    /// Unchanged run, length in UTF-16 units.
    Equal(usize),
    /// Removed run, length in UTF-16 units of the old text.
    Delete(usize),
    Insert(String),
}

#[derive(Default)]
struct HunkStats {
    equal: usize,
    deleted: usize,
    inserted: usize,
    delete_hunks: usize,
    insert_hunks: usize,
}

impl HunkStats {
    fn of(hunks: &[Hunk]) -> Self {
        let mut stats = Self::default();
        for hunk in hunks {
            match hunk {
                Hunk::Equal(n) => stats.equal += n,
                Hunk::Delete(n) => {
                    stats.deleted += n;
                    stats.delete_hunks += 1;
                }
                Hunk::Insert(s) => {
                    stats.inserted += utf16_len(s);
                    stats.insert_hunks += 1;
                }
            }
        }
        stats
    }

    fn has_changes(&self) -> bool {
        self.delete_hunks + self.insert_hunks > 0
    }
}

fn push_hunk(hunks: &mut Vec<Hunk>, hunk: Hunk) {
    let empty = match &hunk {
        Hunk::Equal(n) | Hunk::Delete(n) => *n == 0,
        Hunk::Insert(s) => s.is_empty(),
    };
    if empty {
        return;
    }

    if let Some(last) = hunks.last_mut() {
        match (last, &hunk) {
            (Hunk::Equal(a), Hunk::Equal(b)) | (Hunk::Delete(a), Hunk::Delete(b)) => {
                *a += *b;
                return;
            }
            (Hunk::Insert(a), Hunk::Insert(b)) => {
                a.push_str(b);
                return;
            }
            _ => {}
        }
    }
    hunks.push(hunk);
}

fn run_diff(old: &str, new: &str, timeout: Option<Duration>) -> Vec<Hunk> {
    let mut config = TextDiff::configure();
    config.algorithm(Algorithm::Myers);
    if let Some(timeout) = timeout {
        config.timeout(timeout);
    }
    let diff = config.diff_chars(old, new);
    let old_slices = diff.old_slices();
    let new_slices = diff.new_slices();

    let old_len = |range: std::ops::Range<usize>| -> usize {
        old_slices[range].iter().map(|s| utf16_len(s)).sum()
    };
    let new_text = |range: std::ops::Range<usize>| -> String { new_slices[range].concat() };

    let mut hunks = Vec::new();
    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => push_hunk(&mut hunks, Hunk::Equal(old_len(old_range))),
            DiffTag::Delete => push_hunk(&mut hunks, Hunk::Delete(old_len(old_range))),
            DiffTag::Insert => push_hunk(&mut hunks, Hunk::Insert(new_text(new_range))),
            DiffTag::Replace => {
                push_hunk(&mut hunks, Hunk::Delete(old_len(old_range)));
                push_hunk(&mut hunks, Hunk::Insert(new_text(new_range)));
            }
        }
    }
    hunks
}

fn is_coarse(hunks: &[Hunk], opts: &DiffOptions) -> bool {
    let stats = HunkStats::of(hunks);
    // Equal runs exist in both documents.
    let total = 2 * stats.equal + stats.deleted + stats.inserted;
    if total == 0 {
        return false;
    }
    let changed = (stats.deleted + stats.inserted) as f64 / total as f64;
    if changed > opts.coarse_fraction {
        return true;
    }

    let old_len = stats.equal + stats.deleted;
    stats.delete_hunks == 1
        && stats.insert_hunks == 1
        && old_len > 0
        && stats.deleted as f64 / old_len as f64 >= opts.rewrite_fraction
}

fn hunks_to_changes(hunks: &[Hunk]) -> Vec<DiffChange> {
    let mut changes = Vec::new();
    let mut cursor = 0;
    let mut pending: Option<DiffChange> = None;

    for hunk in hunks {
        match hunk {
            Hunk::Equal(n) => {
                if let Some(change) = pending.take() {
                    changes.push(change);
                }
                cursor += n;
            }
            Hunk::Delete(n) => {
                let change = pending.get_or_insert_with(|| DiffChange::new(cursor, cursor, ""));
                change.to += n;
                cursor += n;
            }
            Hunk::Insert(text) => {
                let change = pending.get_or_insert_with(|| DiffChange::new(cursor, cursor, ""));
                change.insert.push_str(text);
            }
        }
    }
    changes.extend(pending);
    changes
}

/// Compute the change ranges turning `old` into `new`.
///
/// Identical inputs yield no changes. Offsets are UTF-16 units into `old`
/// and are not shifted by earlier changes.
pub fn compute_changes(old: &str, new: &str, opts: &DiffOptions) -> Vec<DiffChange> {
    if old == new {
        return Vec::new();
    }

    let start = Instant::now();
    let mut hunks = run_diff(old, new, Some(opts.timeout));
    if !HunkStats::of(&hunks).has_changes() {
        return Vec::new();
    }

    if is_coarse(&hunks, opts) {
        tracing::debug!(target: "shuttle::diff", "coarse diff, retrying");
        hunks = run_diff(old, new, Some(opts.timeout));

        if is_coarse(&hunks, opts) {
            let size = utf16_len(old).max(utf16_len(new));
            if size < opts.size_ceiling {
                hunks = run_diff(old, new, None);
            } else {
                tracing::debug!(
                    target: "shuttle::diff",
                    size,
                    ceiling = opts.size_ceiling,
                    "coarse diff above size ceiling, replacing whole document"
                );
                return vec![DiffChange::new(0, utf16_len(old), new)];
            }
        }
    }

    let changes = hunks_to_changes(&hunks);
    tracing::trace!(
        target: "shuttle::diff",
        changes = changes.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "diff computed"
    );
    changes
}

/// Apply changes computed against `old`.
///
/// Changes must be ascending and non-overlapping; every offset refers to `old`.
pub fn apply_changes(old: &str, changes: &[DiffChange]) -> Result<String> {
    let units: Vec<u16> = old.encode_utf16().collect();
    let mut out: Vec<u16> = Vec::with_capacity(units.len());
    let mut last = 0;

    for change in changes {
        if change.from < last || change.to < change.from || change.to > units.len() {
            return Err(SyncError::Protocol(format!(
                "change {}..{} out of order or out of range",
                change.from, change.to
            )));
        }
        out.extend_from_slice(&units[last..change.from]);
        out.extend(change.insert.encode_utf16());
        last = change.to;
    }
    out.extend_from_slice(&units[last..]);

    String::from_utf16(&out)
        .map_err(|_| SyncError::Protocol("change splits a surrogate pair".to_string()))
}
