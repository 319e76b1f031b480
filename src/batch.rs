use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::BatchConfig;
use crate::dataset::{file_name_of, list_files_with_extensions, require_dir, BATCH_EXTENSIONS};
use crate::report::{BatchStats, ItemOutcome};

/// Folder for the `index`-th batch (0-based), created next to the source folder
pub fn batch_folder(source: &Path, prefix: &str, index: usize) -> PathBuf {
    let parent = source.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}-{}", prefix, index + 1))
}

/// Copy the sorted images of `config.source` into folders of at most `batch_size` files
pub fn split_into_batches(config: &BatchConfig) -> Result<BatchStats> {
    require_dir(&config.source)?;
    if config.batch_size == 0 {
        bail!("Batch size must be at least 1");
    }

    let images = list_files_with_extensions(&config.source, BATCH_EXTENSIONS)?;
    let mut stats = BatchStats::new();
    if images.is_empty() {
        log::info!("No image files in {:?}", config.source);
        return Ok(stats);
    }

    let num_folders = images.len().div_ceil(config.batch_size);
    log::info!(
        "Splitting {} images into {} folders of up to {}",
        images.len(),
        num_folders,
        config.batch_size
    );

    for (index, chunk) in images.chunks(config.batch_size).enumerate() {
        let folder = batch_folder(&config.source, &config.prefix, index);
        if folder.exists() {
            log::warn!(
                "Folder {:?} already exists, existing files may be overwritten",
                folder
            );
        } else {
            fs::create_dir_all(&folder)?;
            log::info!("Created folder {:?}", folder);
        }

        let mut copied = 0;
        for src in chunk {
            let name = file_name_of(src);
            let outcome = match fs::copy(src, folder.join(&name)) {
                Ok(_) => {
                    copied += 1;
                    ItemOutcome::Copied
                }
                Err(e) => {
                    log::error!("Failed to copy '{}': {}", name, e);
                    ItemOutcome::Failed(e.to_string())
                }
            };
            stats.record(&outcome);
        }
        log::info!("Copied {} files into {:?}", copied, folder);
    }

    Ok(stats)
}
