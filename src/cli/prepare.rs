//! Dataset prepare command implementation

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use crate::dataset::{
    check_existing_output, label_names, scan_images, split_examples, write_labels, LabeledImage,
};
use crate::records::{encode_example, write_records};

#[derive(Args)]
pub struct PrepareArgs {
    /// Directory containing images to prepare (one subdirectory per class)
    #[arg(short, long, value_name = "DIR")]
    pub images_dir: PathBuf,

    /// Percent of examples reserved for validation
    #[arg(short = 's', long, value_name = "N", default_value_t = 30)]
    pub val_split: u32,

    /// Optional prefix for generated dataset files
    #[arg(short = 'p', long, value_name = "PREFIX", default_value = "")]
    pub output_prefix: String,

    /// Directory to write generated dataset files into
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Seed used to randomly split training and validation images
    #[arg(short = 'r', long, value_name = "N")]
    pub random_seed: Option<u64>,

    /// Max size per record file in MB; use 0 to disable
    #[arg(short = 'm', long, value_name = "MB", default_value_t = 100)]
    pub max_file_size: u64,
}

pub fn run(args: PrepareArgs) -> Result<()> {
    if args.val_split > 100 {
        bail!("--val-split must be between 0 and 100");
    }
    check_existing_output(&args.output_dir, &args.output_prefix)?;

    let images = scan_images(&args.images_dir)?;
    if images.is_empty() {
        bail!("no images found in {}", args.images_dir.display());
    }
    let labels = label_names(&images);
    info!("found {} examples of {} classes", images.len(), labels.len());

    let label_ids: BTreeMap<String, u32> =
        labels.iter().enumerate().map(|(id, name)| (name.clone(), id as u32)).collect();

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output dir {}", args.output_dir.display()))?;

    let (train, val) = split_examples(images, args.val_split, args.random_seed);
    if train.is_empty() || val.is_empty() {
        bail!("not enough examples to generate train and validation datasets");
    }

    write_records(
        "train",
        examples(&train, &label_ids),
        train.len() as u64,
        &args.output_dir,
        &args.output_prefix,
        args.max_file_size,
        true,
        "train",
    )?;
    write_records(
        "val",
        examples(&val, &label_ids),
        val.len() as u64,
        &args.output_dir,
        &args.output_prefix,
        args.max_file_size,
        false,
        "validation",
    )?;

    write_labels(&labels, &args.output_dir, &args.output_prefix)
}

/// Lazily read and encode each image so at most one is in memory at a time.
fn examples<'a>(
    images: &'a [LabeledImage],
    label_ids: &'a BTreeMap<String, u32>,
) -> impl Iterator<Item = Result<(String, Vec<u8>)>> + 'a {
    images.iter().map(move |img| {
        let label_id = *label_ids.get(&img.label).expect("label seen during scan");
        let bytes = fs::read(&img.path)
            .with_context(|| format!("reading image {}", img.path.display()))?;
        Ok((img.label.clone(), encode_example(label_id, &bytes)))
    })
}
