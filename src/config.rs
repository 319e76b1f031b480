//! Explicit per-operation configuration, built from the command line in `cli.rs`.

use anyhow::{bail, Result};
use image::Rgb;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::transform::{DEFAULT_PAD, DEFAULT_TARGET};

/// Canvas size and padding color for the letterbox transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxConfig {
    pub target: u32,
    pub pad: Rgb<u8>,
}

impl Default for LetterboxConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET,
            pad: DEFAULT_PAD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResizeConfig {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub letterbox: LetterboxConfig,
}

#[derive(Debug, Clone)]
pub struct LabeledResizeConfig {
    pub images: PathBuf,
    pub labels: PathBuf,
    pub images_out: PathBuf,
    pub labels_out: PathBuf,
    pub letterbox: LetterboxConfig,
}

#[derive(Debug, Clone)]
pub struct VisualizeConfig {
    pub images: PathBuf,
    pub labels: PathBuf,
    pub output: PathBuf,
    pub num_samples: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub source: PathBuf,
    pub prefix: String,
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub sources: Vec<PathBuf>,
    pub dest: PathBuf,
}

#[derive(Debug, Clone)]
pub struct XmlConvertConfig {
    pub dir: PathBuf,
    /// Class names in id order
    pub classes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ChangeClassConfig {
    pub dir: PathBuf,
    pub target_class: u32,
}

/// Train/valid/test proportions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f64,
    pub valid: f64,
    pub test: f64,
}

impl SplitRatios {
    pub fn new(train: f64, valid: f64, test: f64) -> Result<Self> {
        for (name, value) in [("train", train), ("valid", valid), ("test", test)] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{} ratio must be between 0 and 1, got {}", name, value);
            }
        }
        let sum = train + valid + test;
        if (sum - 1.0).abs() >= 0.001 {
            bail!("Split ratios must sum to 1, got {:.3}", sum);
        }
        Ok(Self { train, valid, test })
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.7,
            valid: 0.2,
            test: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub images: PathBuf,
    pub labels: PathBuf,
    pub ratios: SplitRatios,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CleanClassesConfig {
    pub labels: PathBuf,
    pub images: PathBuf,
    pub allowed: BTreeSet<u32>,
}

#[derive(Debug, Clone)]
pub struct CleanEmptyConfig {
    pub labels: PathBuf,
    pub images: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ratios() {
        assert!(SplitRatios::new(0.7, 0.2, 0.1).is_ok());
        assert!(SplitRatios::new(0.8, 0.2, 0.0).is_ok());
        assert!(SplitRatios::new(0.7, 0.2, 0.2).is_err());
        assert!(SplitRatios::new(1.5, -0.5, 0.0).is_err());
    }
}
