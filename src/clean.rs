//! Removal of label files (and their images) that should not reach training.

use anyhow::Result;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{CleanClassesConfig, CleanEmptyConfig};
use crate::dataset::{
    file_name_of, list_files, list_files_with_extensions, require_dir, stem_of,
    CLEANUP_EXTENSIONS, LABEL_EXTENSION,
};

/// Default class ids kept by `clean-classes`
pub const DEFAULT_ALLOWED_CLASSES: &[u32] = &[0, 1, 2, 3, 7];

/// Deletion counters for a cleanup run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupStats {
    pub labels_removed: usize,
    pub images_removed: usize,
    pub failures: usize,
}

impl CleanupStats {
    pub fn log_summary(&self) {
        log::info!("Label files removed: {}", self.labels_removed);
        log::info!("Image files removed: {}", self.images_removed);
        if self.failures > 0 {
            log::error!("Failures: {}", self.failures);
        }
    }
}

/// True if any non-blank line starts with a token outside `allowed`.
///
/// Tokens are compared as text, so `"07"` does not match class `7`.
pub fn has_disallowed_class(text: &str, allowed: &BTreeSet<String>) -> bool {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|token| !allowed.contains(token))
}

fn remove_file(path: &Path, counter: &mut usize, failures: &mut usize) {
    match fs::remove_file(path) {
        Ok(()) => {
            *counter += 1;
            log::info!("Removed {:?}", path);
        }
        Err(e) => {
            *failures += 1;
            log::error!("Failed to remove {:?}: {}", path, e);
        }
    }
}

/// Delete a label and every listed image sharing its stem.
///
/// `images` is listed once per run; an image that disappeared since then
/// counts as a failure.
fn remove_labeled_pair(label_path: &Path, images: &[PathBuf], stats: &mut CleanupStats) {
    let stem = stem_of(label_path);
    remove_file(label_path, &mut stats.labels_removed, &mut stats.failures);
    for img_path in images
        .iter()
        .filter(|path| path.as_path() != label_path && stem_of(path) == stem)
    {
        remove_file(img_path, &mut stats.images_removed, &mut stats.failures);
    }
}

/// Delete label files that use a class id outside `config.allowed`, and every
/// image in `config.images` sharing their stem
pub fn remove_disallowed_classes(config: &CleanClassesConfig) -> Result<CleanupStats> {
    require_dir(&config.labels)?;
    require_dir(&config.images)?;

    let allowed: BTreeSet<String> = config.allowed.iter().map(|id| id.to_string()).collect();
    let images = list_files(&config.images)?;
    let mut stats = CleanupStats::default();

    for label_path in list_files_with_extensions(&config.labels, &[LABEL_EXTENSION])? {
        let text = match fs::read_to_string(&label_path) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to read '{}': {}", file_name_of(&label_path), e);
                stats.failures += 1;
                continue;
            }
        };
        if !has_disallowed_class(&text, &allowed) {
            continue;
        }

        remove_labeled_pair(&label_path, &images, &mut stats);
    }

    Ok(stats)
}

/// Images in `images_dir` named `<stem>.<ext>` for one of the cleanup extensions
pub fn matching_images(images_dir: &Path, stem: &str) -> Vec<PathBuf> {
    CLEANUP_EXTENSIONS
        .iter()
        .map(|ext| images_dir.join(format!("{}.{}", stem, ext)))
        .filter(|path| path.is_file())
        .collect()
}

/// Delete zero-byte label files and their matching images
pub fn remove_empty_labels(config: &CleanEmptyConfig) -> Result<CleanupStats> {
    require_dir(&config.labels)?;
    require_dir(&config.images)?;

    let mut stats = CleanupStats::default();
    for label_path in list_files_with_extensions(&config.labels, &[LABEL_EXTENSION])? {
        let is_empty = match fs::metadata(&label_path) {
            Ok(meta) => meta.len() == 0,
            Err(e) => {
                log::error!("Failed to stat {:?}: {}", label_path, e);
                stats.failures += 1;
                continue;
            }
        };
        if !is_empty {
            continue;
        }

        let images = matching_images(&config.images, &stem_of(&label_path));
        let before = stats.labels_removed;
        remove_file(&label_path, &mut stats.labels_removed, &mut stats.failures);
        if stats.labels_removed == before {
            // Label still there, keep its image too
            continue;
        }
        for img_path in images {
            remove_file(&img_path, &mut stats.images_removed, &mut stats.failures);
        }
    }

    Ok(stats)
}
