use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use image::Rgb;
use std::path::PathBuf;

use crate::clean::DEFAULT_ALLOWED_CLASSES;
use crate::config::{
    BatchConfig, ChangeClassConfig, CleanClassesConfig, CleanEmptyConfig, LabeledResizeConfig,
    LetterboxConfig, MergeConfig, ResizeConfig, SplitConfig, SplitRatios, VisualizeConfig,
    XmlConvertConfig,
};
use crate::dataset::default_result_dir;
use crate::transform::DEFAULT_TARGET;

#[derive(Parser, Debug)]
#[command(name = "yolo-prep")]
#[command(version, about = "Prepare YOLO object-detection datasets for training")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Letterbox every image of a folder to a square canvas
    Resize(ResizeArgs),
    /// Letterbox images and remap their YOLO labels
    ResizeLabeled(ResizeLabeledArgs),
    /// Draw the boxes of a sample of images into PNG files
    Visualize(VisualizeArgs),
    /// Copy images into numbered folders of at most BATCH_SIZE files
    Batch(BatchArgs),
    /// Gather image/label pairs from several folders into DEST/images and DEST/labels
    Merge(MergeArgs),
    /// Convert Pascal-VOC XML files into YOLO label files next to them
    Xml2yolo(XmlArgs),
    /// Set the class id of every label line to TARGET
    ChangeClass(ChangeClassArgs),
    /// Randomly divide images and labels into train/valid/test folders
    Split(SplitArgs),
    /// Delete labels using a class id outside ALLOWED, with their images
    CleanClasses(CleanClassesArgs),
    /// Delete empty label files and their matching images
    CleanEmpty(CleanEmptyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LetterboxArgs {
    /// Side of the square output canvas in pixels
    #[arg(long, default_value_t = DEFAULT_TARGET, value_parser = parse_positive::<u32>)]
    pub size: u32,

    /// Padding color as "R,G,B" or a single gray value
    #[arg(long, default_value = "114,114,114", value_parser = parse_pad)]
    pub pad: Rgb<u8>,
}

impl LetterboxArgs {
    pub fn to_config(&self) -> LetterboxConfig {
        LetterboxConfig {
            target: self.size,
            pad: self.pad,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ResizeArgs {
    /// Folder with the source images
    pub source: PathBuf,
    /// Output folder [default: <source>_result]
    pub dest: Option<PathBuf>,
    #[command(flatten)]
    pub letterbox: LetterboxArgs,
}

impl ResizeArgs {
    pub fn to_config(&self) -> ResizeConfig {
        ResizeConfig {
            source: self.source.clone(),
            dest: self
                .dest
                .clone()
                .unwrap_or_else(|| default_result_dir(&self.source)),
            letterbox: self.letterbox.to_config(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ResizeLabeledArgs {
    /// Folder with the source images
    pub images: PathBuf,
    /// Folder with the YOLO label files
    pub labels: PathBuf,
    /// Output image folder [default: <images>_result]
    pub images_out: Option<PathBuf>,
    /// Output label folder [default: <labels>_result]
    pub labels_out: Option<PathBuf>,
    #[command(flatten)]
    pub letterbox: LetterboxArgs,
}

impl ResizeLabeledArgs {
    pub fn to_config(&self) -> LabeledResizeConfig {
        LabeledResizeConfig {
            images: self.images.clone(),
            labels: self.labels.clone(),
            images_out: self
                .images_out
                .clone()
                .unwrap_or_else(|| default_result_dir(&self.images)),
            labels_out: self
                .labels_out
                .clone()
                .unwrap_or_else(|| default_result_dir(&self.labels)),
            letterbox: self.letterbox.to_config(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct VisualizeArgs {
    /// Folder with letterboxed images
    pub images: PathBuf,
    /// Folder with their label files
    pub labels: PathBuf,
    /// Folder receiving bbox_<name>.png files
    pub output: PathBuf,
    /// Number of images to draw
    #[arg(default_value_t = 10)]
    pub num_samples: usize,
    /// Seed for sampling and class colors
    #[arg(long)]
    pub seed: Option<u64>,
}

impl VisualizeArgs {
    pub fn to_config(&self) -> VisualizeConfig {
        VisualizeConfig {
            images: self.images.clone(),
            labels: self.labels.clone(),
            output: self.output.clone(),
            num_samples: self.num_samples,
            seed: self.seed,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Folder with the images to distribute
    pub source: PathBuf,
    /// Folder name prefix, folders are named <prefix>-1, <prefix>-2, ...
    pub prefix: String,
    /// Maximum number of files per folder
    #[arg(value_parser = parse_positive::<usize>)]
    pub batch_size: usize,
}

impl BatchArgs {
    pub fn to_config(&self) -> BatchConfig {
        BatchConfig {
            source: self.source.clone(),
            prefix: self.prefix.clone(),
            batch_size: self.batch_size,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// Dataset root receiving images/ and labels/
    pub dest: PathBuf,
    /// Folders holding mixed image and label files
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,
}

impl MergeArgs {
    pub fn to_config(&self) -> MergeConfig {
        MergeConfig {
            sources: self.sources.clone(),
            dest: self.dest.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct XmlArgs {
    /// Folder with the XML annotations
    pub dir: PathBuf,
    /// Class names in id order [default: tree]
    pub classes: Vec<String>,
}

impl XmlArgs {
    pub fn to_config(&self) -> XmlConvertConfig {
        let classes = if self.classes.is_empty() {
            vec!["tree".to_string()]
        } else {
            self.classes.clone()
        };
        XmlConvertConfig {
            dir: self.dir.clone(),
            classes,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ChangeClassArgs {
    /// Folder with the label files, rewritten in place
    pub dir: PathBuf,
    /// Class id written on every line
    #[arg(default_value_t = 0)]
    pub target: u32,
}

impl ChangeClassArgs {
    pub fn to_config(&self) -> ChangeClassConfig {
        ChangeClassConfig {
            dir: self.dir.clone(),
            target_class: self.target,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    pub images: PathBuf,
    pub labels: PathBuf,
    #[arg(default_value_t = 0.7)]
    pub train: f64,
    #[arg(default_value_t = 0.2)]
    pub valid: f64,
    #[arg(default_value_t = 0.1)]
    pub test: f64,
    /// Seed for shuffling
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SplitArgs {
    pub fn to_config(&self) -> Result<SplitConfig> {
        Ok(SplitConfig {
            images: self.images.clone(),
            labels: self.labels.clone(),
            ratios: SplitRatios::new(self.train, self.valid, self.test)?,
            seed: self.seed,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct CleanClassesArgs {
    pub labels: PathBuf,
    pub images: PathBuf,
    /// Allowed class ids [default: 0 1 2 3 7]
    pub allowed: Vec<u32>,
}

impl CleanClassesArgs {
    pub fn to_config(&self) -> CleanClassesConfig {
        let allowed = if self.allowed.is_empty() {
            DEFAULT_ALLOWED_CLASSES.iter().copied().collect()
        } else {
            self.allowed.iter().copied().collect()
        };
        CleanClassesConfig {
            labels: self.labels.clone(),
            images: self.images.clone(),
            allowed,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CleanEmptyArgs {
    pub labels: PathBuf,
    pub images: PathBuf,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl CleanEmptyArgs {
    pub fn to_config(&self) -> CleanEmptyConfig {
        CleanEmptyConfig {
            labels: self.labels.clone(),
            images: self.images.clone(),
        }
    }
}

fn parse_positive<T>(s: &str) -> Result<T, String>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match s.parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(format!("Invalid value '{}', expected a positive integer", s)),
    }
}

fn parse_pad(s: &str) -> Result<Rgb<u8>, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let channel = |part: &str| {
        part.parse::<u8>()
            .map_err(|_| format!("Invalid color channel '{}', expected 0-255", part))
    };

    match parts.as_slice() {
        [gray] => {
            let v = channel(gray)?;
            Ok(Rgb([v, v, v]))
        }
        [r, g, b] => Ok(Rgb([channel(r)?, channel(g)?, channel(b)?])),
        _ => Err(format!("Invalid color '{}', expected R,G,B", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pad() {
        assert_eq!(parse_pad("114,114,114"), Ok(Rgb([114, 114, 114])));
        assert_eq!(parse_pad("0, 10 ,255"), Ok(Rgb([0, 10, 255])));
        assert_eq!(parse_pad("7"), Ok(Rgb([7, 7, 7])));
        assert!(parse_pad("1,2").is_err());
        assert!(parse_pad("256,0,0").is_err());
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive::<usize>("5"), Ok(5));
        assert!(parse_positive::<usize>("0").is_err());
        assert!(parse_positive::<usize>("-1").is_err());
    }

    #[test]
    fn test_resize_defaults() {
        let cli = Cli::try_parse_from(["yolo-prep", "resize", "data/cups"]).unwrap();
        let Command::Resize(args) = cli.command else {
            panic!("expected resize");
        };
        let config = args.to_config();
        assert_eq!(config.dest, PathBuf::from("cups_result"));
        assert_eq!(config.letterbox, LetterboxConfig::default());
    }

    #[test]
    fn test_letterbox_options() {
        let cli = Cli::try_parse_from([
            "yolo-prep", "resize-labeled", "imgs", "lbls", "--size", "320", "--pad", "0",
        ])
        .unwrap();
        let Command::ResizeLabeled(args) = cli.command else {
            panic!("expected resize-labeled");
        };
        let config = args.to_config();
        assert_eq!(config.letterbox.target, 320);
        assert_eq!(config.letterbox.pad, Rgb([0, 0, 0]));
        assert_eq!(config.images_out, PathBuf::from("imgs_result"));
        assert_eq!(config.labels_out, PathBuf::from("lbls_result"));
    }

    #[test]
    fn test_split_positional_ratios() {
        let cli =
            Cli::try_parse_from(["yolo-prep", "split", "images", "labels", "0.8", "0.1", "0.1"])
                .unwrap();
        let Command::Split(args) = cli.command else {
            panic!("expected split");
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.ratios, SplitRatios::new(0.8, 0.1, 0.1).unwrap());
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_defaults_for_class_lists() {
        let cli = Cli::try_parse_from(["yolo-prep", "xml2yolo", "labels"]).unwrap();
        let Command::Xml2yolo(args) = cli.command else {
            panic!("expected xml2yolo");
        };
        assert_eq!(args.to_config().classes, vec!["tree".to_string()]);

        let cli = Cli::try_parse_from(["yolo-prep", "clean-classes", "labels", "images"]).unwrap();
        let Command::CleanClasses(args) = cli.command else {
            panic!("expected clean-classes");
        };
        let allowed: Vec<u32> = args.to_config().allowed.into_iter().collect();
        assert_eq!(allowed, vec![0, 1, 2, 3, 7]);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(Cli::try_parse_from(["yolo-prep", "batch", "images", "tree", "0"]).is_err());
    }
}
