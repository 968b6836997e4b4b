//! Record stream fan-out with progress and class weights

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::records::shard::ShardWriter;

/// Drive a stream of `(label, record)` pairs through a [`ShardWriter`].
///
/// `examples_count` sizes both the progress bar and the shard index width.
/// With `write_weights`, a `{prefix}{basename}-weights.txt` file of balanced
/// class weights is written next to the shards.
#[allow(clippy::too_many_arguments)]
pub fn write_records<I>(
    basename: &str,
    examples: I,
    examples_count: u64,
    output_dir: &Path,
    output_prefix: &str,
    max_file_size_mb: u64,
    write_weights: bool,
    type_desc: &str,
) -> Result<u64>
where
    I: IntoIterator<Item = Result<(String, Vec<u8>)>>,
{
    let prefixed = format!("{}{}", output_prefix, basename);
    let mut writer = ShardWriter::new(output_dir, &prefixed, examples_count, max_file_size_mb);
    let mut label_counts: BTreeMap<String, u64> = BTreeMap::new();

    info!(
        "writing {} {} records {}",
        examples_count,
        type_desc,
        output_dir.join(format!("{}-*.record", prefixed)).display()
    );

    let bar = ProgressBar::new(examples_count);
    bar.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .expect("valid progress template"),
    );
    bar.set_message(type_desc.to_string());

    for example in examples {
        let (label, record) = example?;
        writer.write(&record)?;
        if write_weights {
            *label_counts.entry(label).or_insert(0) += 1;
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let written = writer.written();
    writer.finish()?;

    if write_weights {
        write_weights_file(basename, &label_counts, output_dir, output_prefix)?;
    }
    Ok(written)
}

/// Inverse-frequency weights normalized so a perfectly balanced dataset
/// weighs every class 1.0: `total / (classes * count)`.
pub fn balanced_label_weights(counts: &BTreeMap<String, u64>) -> BTreeMap<String, f64> {
    let class_count = counts.len() as f64;
    let total_count: u64 = counts.values().sum();
    counts
        .iter()
        .map(|(name, count)| {
            (name.clone(), total_count as f64 / (class_count * *count as f64))
        })
        .collect()
}

fn write_weights_file(
    basename: &str,
    label_counts: &BTreeMap<String, u64>,
    output_dir: &Path,
    output_prefix: &str,
) -> Result<()> {
    let weights = balanced_label_weights(label_counts);
    let path = output_dir.join(format!("{}{}-weights.txt", output_prefix, basename));
    info!("writing class weights {}", path.display());

    let mut out = Vec::new();
    for (name, weight) in &weights {
        writeln!(out, "{}:{:.6}", name, weight).expect("write to vec");
    }
    fs::write(&path, out).with_context(|| format!("writing weights file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_balanced_weights_even_classes() {
        let weights = balanced_label_weights(&counts(&[("cat", 10), ("dog", 10)]));
        assert_eq!(weights["cat"], 1.0);
        assert_eq!(weights["dog"], 1.0);
    }

    #[test]
    fn test_balanced_weights_skewed_classes() {
        let weights = balanced_label_weights(&counts(&[("cat", 30), ("dog", 10)]));
        // 40 / (2 * 30) and 40 / (2 * 10)
        assert!((weights["cat"] - 0.666_666).abs() < 1e-3);
        assert!((weights["dog"] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_write_records_produces_shards_and_weights() {
        let tmp = TempDir::new().expect("tmp");
        let examples: Vec<Result<(String, Vec<u8>)>> = vec![
            Ok(("cat".to_string(), vec![0u8; 16])),
            Ok(("dog".to_string(), vec![1u8; 16])),
            Ok(("cat".to_string(), vec![2u8; 16])),
        ];
        let written =
            write_records("train", examples, 3, tmp.path(), "pets-", 100, true, "train")
                .expect("write records");
        assert_eq!(written, 3);
        assert!(tmp.path().join("pets-train-1-3.record").exists());

        let weights = fs::read_to_string(tmp.path().join("pets-train-weights.txt"))
            .expect("weights file");
        assert_eq!(weights, "cat:0.750000\ndog:1.500000\n");
    }

    #[test]
    fn test_write_records_error_aborts() {
        let tmp = TempDir::new().expect("tmp");
        let examples: Vec<Result<(String, Vec<u8>)>> = vec![
            Ok(("cat".to_string(), vec![0u8; 16])),
            Err(anyhow::anyhow!("unreadable image")),
        ];
        let result = write_records("train", examples, 2, tmp.path(), "", 100, false, "train");
        assert!(result.is_err());
        // The aborted shard keeps its provisional name.
        assert!(tmp.path().join("train-1-?.record").exists());
    }
}
