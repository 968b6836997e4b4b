//! Labeled image dataset preparation
//!
//! An images directory contains one subdirectory per class; every image file
//! inside is an example of that class. Examples are shuffled and split into
//! train/validation sets before being written out as sharded records.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSetBuilder};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::warn;
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// One example: an image file and the class label taken from its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledImage {
    pub path: PathBuf,
    pub label: String,
}

/// Discover labeled images under `images_dir`. Files directly in the root
/// (with no class directory) and non-image files are skipped.
pub fn scan_images(images_dir: &Path) -> Result<Vec<LabeledImage>> {
    if !images_dir.is_dir() {
        bail!("images directory {} does not exist", images_dir.display());
    }
    let mut images = Vec::new();
    // Depth 2 only: class directories contain files, not further nesting.
    for entry in WalkDir::new(images_dir).min_depth(2).max_depth(2).sort_by_file_name() {
        let entry = entry.with_context(|| format!("scanning {}", images_dir.display()))?;
        let name = entry.file_name().to_string_lossy();
        let parent = entry.path().parent().unwrap_or(images_dir).display();
        if entry.file_type().is_dir() {
            warn!("ignoring directory {} in {}", name, parent);
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        if !is_image(entry.path()) {
            warn!("ignoring file {} in {} (unsupported extension)", name, parent);
            continue;
        }
        let label = entry
            .path()
            .strip_prefix(images_dir)
            .expect("entry under images dir")
            .components()
            .next()
            .expect("min_depth 2 guarantees a class component")
            .as_os_str()
            .to_string_lossy()
            .into_owned();
        images.push(LabeledImage {
            path: entry.path().to_path_buf(),
            label,
        });
    }
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sorted unique class labels; a label's position is its id.
pub fn label_names(images: &[LabeledImage]) -> Vec<String> {
    let unique: BTreeSet<&str> = images.iter().map(|img| img.label.as_str()).collect();
    unique.into_iter().map(str::to_string).collect()
}

/// Shuffle and split examples; the first `val_split` percent go to
/// validation, the rest to training. Without a seed the shuffle uses OS
/// randomness.
pub fn split_examples(
    mut images: Vec<LabeledImage>,
    val_split: u32,
    seed: Option<u64>,
) -> (Vec<LabeledImage>, Vec<LabeledImage>) {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    images.shuffle(&mut rng);
    let val_count = images.len() * val_split.min(100) as usize / 100;
    let train = images.split_off(val_count);
    (train, images)
}

/// Refuse to overwrite a previous run: fail if any generated file matching
/// this prefix already exists. The check runs once, before any output is
/// opened.
pub fn check_existing_output(output_dir: &Path, output_prefix: &str) -> Result<()> {
    let patterns = [
        format!("{}train-*.record", output_prefix),
        format!("{}val-*.record", output_prefix),
        format!("{}labels.txt", output_prefix),
    ];
    let mut builder = GlobSetBuilder::new();
    for pattern in &patterns {
        builder.add(Glob::new(pattern).context("building output glob")?);
    }
    let globs = builder.build().context("building output globset")?;

    let mut matches = Vec::new();
    if output_dir.is_dir() {
        for entry in fs::read_dir(output_dir)
            .with_context(|| format!("reading output dir {}", output_dir.display()))?
        {
            let name = entry?.file_name();
            if globs.is_match(Path::new(&name)) {
                matches.push(name.to_string_lossy().into_owned());
            }
        }
    }
    if !matches.is_empty() {
        matches.sort();
        bail!(
            "the following record files already exist in {}: {}",
            output_dir.display(),
            matches.join(", ")
        );
    }
    Ok(())
}

/// Write `labels.txt`: one class name per line, in id order.
pub fn write_labels(labels: &[String], output_dir: &Path, output_prefix: &str) -> Result<()> {
    let path = output_dir.join(format!("{}labels.txt", output_prefix));
    let mut body = labels.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    fs::write(&path, body).with_context(|| format!("writing labels file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_images(tmp: &TempDir, classes: &[(&str, usize)]) {
        for (label, count) in classes {
            let dir = tmp.path().join(label);
            fs::create_dir_all(&dir).expect("class dir");
            for i in 0..*count {
                fs::write(dir.join(format!("img{}.jpg", i)), b"fake").expect("image");
            }
        }
    }

    #[test]
    fn test_scan_finds_labeled_images() {
        let tmp = TempDir::new().expect("tmp");
        make_images(&tmp, &[("cat", 2), ("dog", 3)]);
        // Noise that must be skipped.
        fs::write(tmp.path().join("stray.jpg"), b"x").expect("stray");
        fs::write(tmp.path().join("cat").join("notes.txt"), b"x").expect("notes");

        let images = scan_images(tmp.path()).expect("scan");
        assert_eq!(images.len(), 5);
        assert!(images.iter().all(|img| img.label == "cat" || img.label == "dog"));
    }

    #[test]
    fn test_scan_ignores_directories_nested_in_classes() {
        let tmp = TempDir::new().expect("tmp");
        make_images(&tmp, &[("cat", 2)]);
        // Images inside a nested directory belong to no class and must not
        // be ingested under the top-level label.
        let nested = tmp.path().join("cat").join("thumbnails");
        fs::create_dir_all(&nested).expect("nested dir");
        fs::write(nested.join("small.jpg"), b"fake").expect("nested image");

        let images = scan_images(tmp.path()).expect("scan");
        assert_eq!(images.len(), 2);
        assert!(images.iter().all(|img| img.path.parent() != Some(nested.as_path())));
    }

    #[test]
    fn test_scan_missing_dir_fails() {
        let tmp = TempDir::new().expect("tmp");
        assert!(scan_images(&tmp.path().join("absent")).is_err());
    }

    #[test]
    fn test_label_names_sorted_unique() {
        let images = vec![
            LabeledImage { path: "b/1.jpg".into(), label: "b".into() },
            LabeledImage { path: "a/1.jpg".into(), label: "a".into() },
            LabeledImage { path: "b/2.jpg".into(), label: "b".into() },
        ];
        assert_eq!(label_names(&images), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_split_proportions() {
        let images: Vec<LabeledImage> = (0..10)
            .map(|i| LabeledImage { path: format!("c/{}.jpg", i).into(), label: "c".into() })
            .collect();
        let (train, val) = split_examples(images, 30, Some(42));
        assert_eq!(train.len(), 7);
        assert_eq!(val.len(), 3);
    }

    #[test]
    fn test_split_deterministic_with_seed() {
        let images: Vec<LabeledImage> = (0..20)
            .map(|i| LabeledImage { path: format!("c/{}.jpg", i).into(), label: "c".into() })
            .collect();
        let (train_a, val_a) = split_examples(images.clone(), 25, Some(7));
        let (train_b, val_b) = split_examples(images, 25, Some(7));
        assert_eq!(train_a, train_b);
        assert_eq!(val_a, val_b);
    }

    #[test]
    fn test_check_existing_output_detects_leftovers() {
        let tmp = TempDir::new().expect("tmp");
        assert!(check_existing_output(tmp.path(), "pets-").is_ok());

        fs::write(tmp.path().join("pets-train-1-9.record"), b"x").expect("leftover");
        let err = check_existing_output(tmp.path(), "pets-").unwrap_err();
        assert!(err.to_string().contains("pets-train-1-9.record"));

        // A different prefix is unaffected.
        assert!(check_existing_output(tmp.path(), "other-").is_ok());
    }

    #[test]
    fn test_write_labels() {
        let tmp = TempDir::new().expect("tmp");
        let labels = vec!["cat".to_string(), "dog".to_string()];
        write_labels(&labels, tmp.path(), "").expect("write labels");
        let content = fs::read_to_string(tmp.path().join("labels.txt")).expect("read");
        assert_eq!(content, "cat\ndog\n");
    }
}
