use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{SplitConfig, SplitRatios};
use crate::dataset::{file_name_of, label_path_for, list_files, require_dir, stem_of};

pub const SUBSETS: [&str; 3] = ["train", "valid", "test"];

/// Files assigned to each subset
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SplitData {
    pub train: Vec<PathBuf>,
    pub valid: Vec<PathBuf>,
    pub test: Vec<PathBuf>,
}

impl SplitData {
    fn subsets(&self) -> [(&'static str, &[PathBuf]); 3] {
        [
            (SUBSETS[0], &self.train),
            (SUBSETS[1], &self.valid),
            (SUBSETS[2], &self.test),
        ]
    }
}

/// Number of files in the train and valid subsets; test takes the remainder
pub fn split_sizes(total: usize, ratios: &SplitRatios) -> (usize, usize) {
    let train = ((total as f64 * ratios.train) as usize).min(total);
    let valid = ((total as f64 * ratios.valid) as usize).min(total - train);
    (train, valid)
}

/// Shuffle and cut a file list by the configured ratios
pub fn split_files(mut files: Vec<PathBuf>, ratios: &SplitRatios, rng: &mut StdRng) -> SplitData {
    files.shuffle(rng);
    let (train_len, valid_len) = split_sizes(files.len(), ratios);

    let test = files.split_off(train_len + valid_len);
    let valid = files.split_off(train_len);
    SplitData {
        train: files,
        valid,
        test,
    }
}

/// Randomly divide a dataset into `train`/`valid`/`test` folders under the
/// image and label folders.
///
/// A missing label file aborts the run.
pub fn split_dataset(config: &SplitConfig) -> Result<SplitData> {
    require_dir(&config.images)?;
    require_dir(&config.labels)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let files = list_files(&config.images)?;
    let split = split_files(files, &config.ratios, &mut rng);

    for (subset, files) in split.subsets() {
        copy_subset(files, subset, &config.images, &config.labels)?;
    }

    log::info!("Split complete:");
    log::info!("  - train: {} files", split.train.len());
    log::info!("  - valid: {} files", split.valid.len());
    log::info!("  - test: {} files", split.test.len());
    Ok(split)
}

fn copy_subset(files: &[PathBuf], subset: &str, images_dir: &Path, labels_dir: &Path) -> Result<()> {
    let img_target = images_dir.join(subset);
    let label_target = labels_dir.join(subset);
    fs::create_dir_all(&img_target).with_context(|| format!("Failed to create {:?}", img_target))?;
    fs::create_dir_all(&label_target)
        .with_context(|| format!("Failed to create {:?}", label_target))?;

    for img_src in files {
        let name = file_name_of(img_src);
        fs::copy(img_src, img_target.join(&name))
            .with_context(|| format!("Failed to copy {:?}", img_src))?;

        let stem = stem_of(img_src);
        let label_src = label_path_for(labels_dir, &stem);
        if !label_src.is_file() {
            bail!("Label file {:?} not found", label_src);
        }
        fs::copy(&label_src, label_path_for(&label_target, &stem))
            .with_context(|| format!("Failed to copy {:?}", label_src))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("img{}.jpg", i))).collect()
    }

    #[test]
    fn test_split_sizes() {
        let ratios = SplitRatios::default();
        assert_eq!(split_sizes(10, &ratios), (7, 2));
        assert_eq!(split_sizes(0, &ratios), (0, 0));
        assert_eq!(split_sizes(3, &ratios), (2, 0));
    }

    #[test]
    fn test_split_files_partitions_everything() {
        let mut rng = StdRng::seed_from_u64(42);
        let split = split_files(names(10), &SplitRatios::default(), &mut rng);
        assert_eq!(split.train.len(), 7);
        assert_eq!(split.valid.len(), 2);
        assert_eq!(split.test.len(), 1);

        let mut all: Vec<_> = split
            .train
            .iter()
            .chain(&split.valid)
            .chain(&split.test)
            .cloned()
            .collect();
        all.sort();
        let mut expected = names(10);
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_seeded_split_is_reproducible() {
        let ratios = SplitRatios::default();
        let a = split_files(names(20), &ratios, &mut StdRng::seed_from_u64(3));
        let b = split_files(names(20), &ratios, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
