//! Folding classified file changes into per-category totals.

use log::debug;

use crate::classifier::classify;
use crate::domain::{ChangedFile, Ecosystem, FileRecord, FixStats};

/// Fold file records into per-category buckets, skipping unclassified files.
pub fn accumulate<'a, I>(records: I) -> FixStats
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let mut stats = FixStats::default();
    for record in records {
        let category = classify(record.ecosystem, &record.path);
        let Some(bucket) = stats.bucket_mut(category) else {
            debug!("skipping {} ({})", record.path, record.ecosystem);
            continue;
        };
        bucket.files += 1;
        bucket.lines_added += record.lines_added;
        bucket.lines_removed += record.lines_removed;
    }
    stats
}

/// Fold the changed files of a fix made in a repository of `ecosystem`.
pub fn accumulate_changes(ecosystem: Ecosystem, files: &[ChangedFile]) -> FixStats {
    let records: Vec<FileRecord> = files
        .iter()
        .map(|file| FileRecord::from_changed(ecosystem, file))
        .collect();
    accumulate(&records)
}
