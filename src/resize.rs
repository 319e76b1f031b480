use anyhow::Result;
use image::DynamicImage;
use std::fs;
use std::path::Path;

use crate::config::{LabeledResizeConfig, LetterboxConfig, ResizeConfig};
use crate::dataset::{
    file_name_of, label_path_for, list_files_with_extensions, prepare_output_dir, require_dir,
    stem_of, IMAGE_EXTENSIONS,
};
use crate::label::{read_label_file, write_label_file};
use crate::report::{log_outcome, BatchStats, ItemOutcome};
use crate::transform::{letterbox, open_image};

/// Letterbox every image of `config.source` into `config.dest`
pub fn resize_images(config: &ResizeConfig) -> Result<BatchStats> {
    require_dir(&config.source)?;
    prepare_output_dir(&config.dest)?;

    let mut stats = BatchStats::new();
    for img_path in list_files_with_extensions(&config.source, IMAGE_EXTENSIONS)? {
        let name = file_name_of(&img_path);
        let outcome = resize_image_file(&img_path, &config.dest.join(&name), &config.letterbox);
        log_outcome(&name, &outcome);
        stats.record(&outcome);
    }

    log::info!("Results written to {:?}", config.dest);
    Ok(stats)
}

/// Letterbox one image; an image already at the target size is copied byte for byte
pub fn resize_image_file(src: &Path, dst: &Path, letterbox_cfg: &LetterboxConfig) -> ItemOutcome {
    let img = match open_image(src) {
        Ok(img) => img,
        Err(e) => return ItemOutcome::Skipped(format!("not a readable image ({:#})", e)),
    };

    let target = letterbox_cfg.target;
    if (img.width(), img.height()) == (target, target) {
        return match fs::copy(src, dst) {
            Ok(_) => ItemOutcome::Copied,
            Err(e) => ItemOutcome::Failed(format!("copy to {:?} failed: {}", dst, e)),
        };
    }

    write_letterboxed(&img, dst, letterbox_cfg).map_or_else(
        |e| ItemOutcome::Failed(format!("{:#}", e)),
        |_| ItemOutcome::Processed,
    )
}

fn write_letterboxed(
    img: &DynamicImage,
    dst: &Path,
    letterbox_cfg: &LetterboxConfig,
) -> Result<()> {
    let boxed = letterbox(img, letterbox_cfg.target, letterbox_cfg.pad)?;
    boxed.image.save(dst)?;
    log::debug!(
        "{:?}: {}x{} -> {}x{} (scale {:.4}, pad top {}, left {})",
        dst,
        img.width(),
        img.height(),
        boxed.image.width(),
        boxed.image.height(),
        boxed.scale(),
        boxed.geometry.pad_top,
        boxed.geometry.pad_left
    );
    Ok(())
}

/// Letterbox images and remap their paired label files
pub fn resize_dataset(config: &LabeledResizeConfig) -> Result<BatchStats> {
    require_dir(&config.images)?;
    require_dir(&config.labels)?;
    prepare_output_dir(&config.images_out)?;
    prepare_output_dir(&config.labels_out)?;

    let mut stats = BatchStats::new();
    for img_path in list_files_with_extensions(&config.images, IMAGE_EXTENSIONS)? {
        let name = file_name_of(&img_path);
        let outcome = resize_pair(&img_path, config, &mut stats);
        log_outcome(&name, &outcome);
        stats.record(&outcome);
    }

    log::info!(
        "Results written to {:?} and {:?}",
        config.images_out,
        config.labels_out
    );
    Ok(stats)
}

fn resize_pair(img_path: &Path, config: &LabeledResizeConfig, stats: &mut BatchStats) -> ItemOutcome {
    let stem = stem_of(img_path);
    let label_src = label_path_for(&config.labels, &stem);
    if !label_src.is_file() {
        return ItemOutcome::Skipped(format!("label file '{}.txt' not found", stem));
    }

    let img = match open_image(img_path) {
        Ok(img) => img,
        Err(e) => return ItemOutcome::Skipped(format!("not a readable image ({:#})", e)),
    };

    let img_dst = config.images_out.join(file_name_of(img_path));
    let label_dst = label_path_for(&config.labels_out, &stem);
    let target = config.letterbox.target;
    let original_size = (img.width(), img.height());

    if original_size == (target, target) {
        if let Err(e) = fs::copy(img_path, &img_dst).and_then(|_| fs::copy(&label_src, &label_dst)) {
            return ItemOutcome::Failed(format!("copy failed: {}", e));
        }
        return ItemOutcome::Copied;
    }

    let labels = match read_label_file(&label_src) {
        Ok(labels) => labels,
        Err(e) => return ItemOutcome::Failed(format!("cannot read {:?}: {}", label_src, e)),
    };
    for rejected in &labels.rejected {
        log::warn!(
            "{:?} line {}: {} ({})",
            label_src,
            rejected.line_no,
            rejected.error,
            rejected.text
        );
    }
    stats.dropped_entries += labels.rejected.len();

    let boxed = match letterbox(&img, target, config.letterbox.pad) {
        Ok(boxed) => boxed,
        Err(e) => return ItemOutcome::Failed(format!("{:#}", e)),
    };
    let remapped: Vec<_> = labels
        .boxes
        .iter()
        .map(|bbox| boxed.geometry.remap(bbox, original_size))
        .collect();

    // Label before image; a failed image save takes the label back out
    if let Err(e) = write_label_file(&label_dst, &remapped) {
        return ItemOutcome::Failed(format!("cannot write {:?}: {}", label_dst, e));
    }
    if let Err(e) = boxed.image.save(&img_dst) {
        if let Err(rm) = fs::remove_file(&label_dst) {
            log::error!("Failed to remove {:?}: {}", label_dst, rm);
        }
        return ItemOutcome::Failed(format!("cannot save {:?}: {}", img_dst, e));
    }
    ItemOutcome::Processed
}
