//! Directory enumeration and basename pairing shared by every subcommand.

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Formats the letterbox and visualization steps decode
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Formats batching copies without decoding
pub const BATCH_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

/// Image extensions probed when removing the image behind an empty label
pub const CLEANUP_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff"];

/// Extensions treated as annotations when pairing files
pub const LABEL_EXTENSIONS: &[&str] = &["txt", "xml"];

pub const LABEL_EXTENSION: &str = "txt";

/// Fail with a readable message if a required input folder is missing
pub fn require_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("Folder '{}' does not exist", path.display());
    }
    Ok(())
}

pub fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

/// Regular files directly inside `dir`, sorted by name
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Regular files directly inside `dir` whose extension is in `extensions`, sorted by name
pub fn list_files_with_extensions(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    Ok(list_files(dir)?
        .into_iter()
        .filter(|path| has_extension(path, extensions))
        .collect())
}

/// File name without its extension, as an owned string
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

/// `<dir>/<stem>.txt`
pub fn label_path_for(labels_dir: &Path, stem: &str) -> PathBuf {
    labels_dir.join(format!("{}.{}", stem, LABEL_EXTENSION))
}

/// Default output folder for a source folder: `<basename>_result` in the working directory
pub fn default_result_dir(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    PathBuf::from(format!("{}_result", name))
}

/// Create an output folder, warning when it already exists.
///
/// Existing content is kept and same-named files are overwritten.
pub fn prepare_output_dir(path: &Path) -> Result<()> {
    if path.exists() {
        log::warn!(
            "Output folder {:?} already exists, files with the same name will be overwritten",
            path
        );
    }
    fs::create_dir_all(path).with_context(|| format!("Failed to create {:?}", path))
}

/// Image and label found for one basename
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub image: Option<PathBuf>,
    pub label: Option<PathBuf>,
}

impl FilePair {
    /// Both sides present
    pub fn complete(&self) -> Option<(&Path, &Path)> {
        match (&self.image, &self.label) {
            (Some(image), Some(label)) => Some((image.as_path(), label.as_path())),
            _ => None,
        }
    }
}

/// Files grouped by basename across one or more folders
#[derive(Debug, Default)]
pub struct PairedFiles {
    pairs: BTreeMap<String, FilePair>,
}

impl PairedFiles {
    /// Group every regular file of `folders` by stem.
    ///
    /// `.txt`/`.xml` files are labels, anything else is an image. When two
    /// folders hold the same stem, the later folder wins. Missing folders are
    /// skipped with a warning.
    pub fn collect<P: AsRef<Path>>(folders: &[P]) -> Result<Self> {
        let mut paired = Self::default();
        for folder in folders {
            let folder = folder.as_ref();
            if !folder.is_dir() {
                log::warn!("Folder {:?} does not exist, skipping", folder);
                continue;
            }
            for path in list_files(folder)? {
                paired.insert(path);
            }
        }
        Ok(paired)
    }

    pub fn insert(&mut self, path: PathBuf) {
        let entry = self.pairs.entry(stem_of(&path)).or_default();
        if has_extension(&path, LABEL_EXTENSIONS) {
            entry.label = Some(path);
        } else {
            entry.image = Some(path);
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilePair)> {
        self.pairs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_extension_case_insensitive() {
        assert!(has_extension(Path::new("a/b.JPG"), IMAGE_EXTENSIONS));
        assert!(has_extension(Path::new("b.png"), IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("b.txt"), IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("noext"), IMAGE_EXTENSIONS));
    }

    #[test]
    fn test_default_result_dir() {
        assert_eq!(
            default_result_dir(Path::new("data/cups")),
            PathBuf::from("cups_result")
        );
    }

    #[test]
    fn test_pairing_requires_both_sides() {
        let mut paired = PairedFiles::default();
        paired.insert(PathBuf::from("a/img1.jpg"));
        paired.insert(PathBuf::from("a/img1.txt"));
        paired.insert(PathBuf::from("a/img2.png"));
        paired.insert(PathBuf::from("b/img3.xml"));

        assert_eq!(paired.len(), 3);
        let complete: Vec<_> = paired
            .iter()
            .filter_map(|(name, pair)| pair.complete().map(|_| name.clone()))
            .collect();
        assert_eq!(complete, vec!["img1".to_string()]);
    }

    #[test]
    fn test_label_path_for() {
        assert_eq!(
            label_path_for(Path::new("labels"), "img1"),
            PathBuf::from("labels/img1.txt")
        );
    }
}
