use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::MergeConfig;
use crate::dataset::{file_name_of, prepare_output_dir, PairedFiles};
use crate::report::{BatchStats, ItemOutcome};

/// Copy every complete image/label pair found in `config.sources` into
/// `dest/images` and `dest/labels`
pub fn merge_pairs(config: &MergeConfig) -> Result<BatchStats> {
    let images_dir = config.dest.join("images");
    let labels_dir = config.dest.join("labels");
    prepare_output_dir(&images_dir)?;
    prepare_output_dir(&labels_dir)?;

    let paired = PairedFiles::collect(&config.sources)?;
    let mut stats = BatchStats::new();

    for (basename, pair) in paired.iter() {
        let outcome = match pair.complete() {
            Some((image, label)) => copy_pair(image, label, &images_dir, &labels_dir),
            None if pair.image.is_some() => ItemOutcome::Skipped("no label file".to_string()),
            None => ItemOutcome::Skipped("no image file".to_string()),
        };
        match &outcome {
            ItemOutcome::Skipped(reason) => log::debug!("'{}' {}", basename, reason),
            ItemOutcome::Failed(reason) => log::error!("'{}' {}", basename, reason),
            _ => {}
        }
        stats.record(&outcome);
    }

    log::info!(
        "Copied {} image/label pairs into {:?} and {:?}",
        stats.copied,
        images_dir,
        labels_dir
    );
    Ok(stats)
}

fn copy_pair(image: &Path, label: &Path, images_dir: &Path, labels_dir: &Path) -> ItemOutcome {
    let copied = fs::copy(image, images_dir.join(file_name_of(image)))
        .and_then(|_| fs::copy(label, labels_dir.join(file_name_of(label))));
    match copied {
        Ok(_) => ItemOutcome::Copied,
        Err(e) => ItemOutcome::Failed(format!("copy failed: {}", e)),
    }
}
