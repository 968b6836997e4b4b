//! Size-bounded shard writer
//!
//! Records stream into numbered shard files whose names embed the inclusive
//! 1-based start/end record indices. The end index of a shard is unknown
//! until the shard closes, so an open shard carries a provisional name with
//! `?` placeholders and is renamed once its range is final. A writer dropped
//! without `finish()` leaves the provisional name in place; downstream
//! consumers must treat `?`-named shards as invalid.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const MIB: u64 = 1024 * 1024;

pub struct ShardWriter {
    output_dir: PathBuf,
    basename: String,
    expected_count: u64,
    max_bytes: u64,
    file: Option<BufWriter<File>>,
    file_path: Option<PathBuf>,
    cur_start: u64,
    cur_size: u64,
    written: u64,
}

impl ShardWriter {
    /// `max_file_size_mb` caps each shard, with a 1 MiB safety margin
    /// subtracted so the framework reading the shard has headroom; 0
    /// disables the cap entirely.
    pub fn new(output_dir: &Path, basename: &str, expected_count: u64, max_file_size_mb: u64) -> Self {
        ShardWriter {
            output_dir: output_dir.to_path_buf(),
            basename: basename.to_string(),
            expected_count,
            max_bytes: max_file_size_mb.saturating_sub(1) * MIB,
            file: None,
            file_path: None,
            cur_start: 0,
            cur_size: 0,
            written: 0,
        }
    }

    /// Append one encoded record, rolling to a new shard first when the
    /// current one is full. The cap is checked against already-accumulated
    /// bytes only, so a single oversized record still lands alone in its
    /// own shard.
    pub fn write(&mut self, record: &[u8]) -> Result<()> {
        if self.file.is_none() || self.next_too_big(record.len() as u64) {
            self.roll()?;
        }
        let path = self.display_path();
        let file = self.file.as_mut().expect("shard open after roll");
        file.write_all(record).with_context(|| format!("writing record to {}", path))?;
        self.written += 1;
        self.cur_size += record.len() as u64;
        Ok(())
    }

    /// Total records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Close the writer, renaming the open shard to its final name. Must be
    /// called on the success path; errors or early drops intentionally skip
    /// the rename.
    pub fn finish(mut self) -> Result<()> {
        self.finalize_open_shard()
    }

    fn next_too_big(&self, next_len: u64) -> bool {
        self.max_bytes > 0 && self.cur_size + next_len > self.max_bytes
    }

    fn roll(&mut self) -> Result<()> {
        self.finalize_open_shard()?;
        self.cur_start = self.written + 1;
        let path = self.output_dir.join(self.provisional_name());
        let file = File::create(&path)
            .with_context(|| format!("creating shard {}", path.display()))?;
        self.file = Some(BufWriter::new(file));
        self.file_path = Some(path);
        Ok(())
    }

    fn finalize_open_shard(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        let provisional = self.file_path.take().expect("open shard has a path");
        file.flush()
            .with_context(|| format!("flushing shard {}", provisional.display()))?;
        drop(file);

        let final_path = self.output_dir.join(self.final_name());
        // Renaming onto the provisional path means the index bookkeeping is
        // broken; that is a bug, not a runtime condition.
        assert_ne!(final_path, provisional, "shard rename would not change {}", provisional.display());
        fs::rename(&provisional, &final_path).with_context(|| {
            format!("renaming shard {} to {}", provisional.display(), final_path.display())
        })?;
        self.cur_size = 0;
        Ok(())
    }

    fn provisional_name(&self) -> String {
        let digits = digits_needed(self.expected_count);
        format!(
            "{}-{:0width$}-{}.record",
            self.basename,
            self.cur_start,
            "?".repeat(digits),
            width = digits
        )
    }

    fn final_name(&self) -> String {
        let digits = digits_needed(self.expected_count);
        format!(
            "{}-{:0width$}-{:0width$}.record",
            self.basename,
            self.cur_start,
            self.written,
            width = digits
        )
    }

    fn display_path(&self) -> String {
        self.file_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<closed>".to_string())
    }
}

/// Zero-pad width for shard indices: the decimal width of the expected
/// total, so shard names sort lexicographically in index order.
fn digits_needed(n: u64) -> usize {
    n.max(1).to_string().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shard_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_zero_records_no_files() {
        let tmp = TempDir::new().expect("tmp");
        let writer = ShardWriter::new(tmp.path(), "train", 100, 100);
        writer.finish().expect("finish");
        assert!(shard_names(tmp.path()).is_empty());
    }

    #[test]
    fn test_single_shard_when_under_cap() {
        let tmp = TempDir::new().expect("tmp");
        let mut writer = ShardWriter::new(tmp.path(), "train", 10, 100);
        for _ in 0..10 {
            writer.write(&[0u8; 64]).expect("write");
        }
        writer.finish().expect("finish");
        assert_eq!(shard_names(tmp.path()), vec!["train-01-10.record"]);
    }

    #[test]
    fn test_shards_roll_at_cap_with_contiguous_ranges() {
        let tmp = TempDir::new().expect("tmp");
        // Cap resolves to (3-1) MiB; records of 1 MiB fit two per shard.
        let mut writer = ShardWriter::new(tmp.path(), "train", 5, 3);
        let record = vec![7u8; MIB as usize];
        for _ in 0..5 {
            writer.write(&record).expect("write");
        }
        writer.finish().expect("finish");
        assert_eq!(
            shard_names(tmp.path()),
            vec!["train-1-2.record", "train-3-4.record", "train-5-5.record"]
        );
    }

    #[test]
    fn test_oversized_record_gets_own_shard() {
        let tmp = TempDir::new().expect("tmp");
        let mut writer = ShardWriter::new(tmp.path(), "train", 3, 2);
        // Cap is (2-1) MiB = 1 MiB; this record alone exceeds it.
        writer.write(&vec![1u8; 2 * MIB as usize]).expect("oversized write");
        writer.write(&[2u8; 16]).expect("small write");
        writer.finish().expect("finish");
        let names = shard_names(tmp.path());
        assert_eq!(names, vec!["train-1-1.record", "train-2-2.record"]);

        let oversized = fs::metadata(tmp.path().join("train-1-1.record")).expect("meta");
        assert_eq!(oversized.len(), 2 * MIB);
    }

    #[test]
    fn test_cap_disabled_with_zero() {
        let tmp = TempDir::new().expect("tmp");
        let mut writer = ShardWriter::new(tmp.path(), "train", 4, 0);
        let record = vec![0u8; MIB as usize];
        for _ in 0..4 {
            writer.write(&record).expect("write");
        }
        writer.finish().expect("finish");
        assert_eq!(shard_names(tmp.path()), vec!["train-1-4.record"]);
    }

    #[test]
    fn test_index_width_follows_expected_count() {
        let tmp = TempDir::new().expect("tmp");
        let mut writer = ShardWriter::new(tmp.path(), "val", 1000, 100);
        writer.write(&[0u8; 8]).expect("write");
        writer.finish().expect("finish");
        assert_eq!(shard_names(tmp.path()), vec!["val-0001-0001.record"]);
    }

    #[test]
    fn test_drop_without_finish_leaves_provisional_name() {
        let tmp = TempDir::new().expect("tmp");
        {
            let mut writer = ShardWriter::new(tmp.path(), "train", 10, 100);
            writer.write(&[0u8; 8]).expect("write");
            // Simulates an aborted run: the writer goes out of scope
            // without finish().
        }
        assert_eq!(shard_names(tmp.path()), vec!["train-01-??.record"]);
    }

    #[test]
    fn test_record_bytes_concatenated_in_order() {
        let tmp = TempDir::new().expect("tmp");
        let mut writer = ShardWriter::new(tmp.path(), "train", 2, 100);
        writer.write(b"abc").expect("write");
        writer.write(b"def").expect("write");
        writer.finish().expect("finish");
        let content = fs::read(tmp.path().join("train-1-2.record")).expect("read shard");
        assert_eq!(content, b"abcdef");
    }

    #[test]
    fn test_digits_needed() {
        assert_eq!(digits_needed(0), 1);
        assert_eq!(digits_needed(9), 1);
        assert_eq!(digits_needed(10), 2);
        assert_eq!(digits_needed(100), 3);
        assert_eq!(digits_needed(99_999), 5);
    }
}
