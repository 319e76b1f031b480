//! YOLO label text format: one `class_id cx cy bw bh` line per object.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// A box normalized to the width/height of the image it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub class_id: u32,
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(class_id: u32, cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            class_id,
            cx,
            cy,
            width,
            height,
        }
    }

    /// Pixel-space corners `(x1, y1, x2, y2)` on an image of the given size
    pub fn to_pixel_corners(&self, img_width: u32, img_height: u32) -> (f64, f64, f64, f64) {
        let (w, h) = (img_width as f64, img_height as f64);
        let half_w = self.width * w / 2.0;
        let half_h = self.height * h / 2.0;
        (
            self.cx * w - half_w,
            self.cy * h - half_h,
            self.cx * w + half_w,
            self.cy * h + half_h,
        )
    }
}

/// Why a single label line was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LabelLineError {
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),
    #[error("non-numeric field '{0}'")]
    NotNumeric(String),
    #[error("invalid class id '{0}'")]
    InvalidClass(String),
}

/// A label line that could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedLine {
    /// 1-based line number within the file
    pub line_no: usize,
    pub text: String,
    pub error: LabelLineError,
}

/// Parsed content of one label file
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LabelFile {
    pub boxes: Vec<BoundingBox>,
    pub rejected: Vec<RejectedLine>,
}

/// Parse one non-blank label line
pub fn parse_line(line: &str) -> Result<BoundingBox, LabelLineError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(LabelLineError::FieldCount(fields.len()));
    }

    let mut values = [0.0f64; 5];
    for (value, field) in values.iter_mut().zip(&fields) {
        *value = field
            .parse::<f64>()
            .map_err(|_| LabelLineError::NotNumeric(field.to_string()))?;
    }

    let class = values[0];
    if !class.is_finite() || class < 0.0 || class > u32::MAX as f64 {
        return Err(LabelLineError::InvalidClass(fields[0].to_string()));
    }

    Ok(BoundingBox::new(
        class.trunc() as u32,
        values[1],
        values[2],
        values[3],
        values[4],
    ))
}

/// Parse the whole text of a label file, collecting rejected lines instead of failing
pub fn parse_label_text(text: &str) -> LabelFile {
    let mut parsed = LabelFile::default();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(bbox) => parsed.boxes.push(bbox),
            Err(error) => parsed.rejected.push(RejectedLine {
                line_no: idx + 1,
                text: line.to_string(),
                error,
            }),
        }
    }

    parsed
}

pub fn read_label_file(path: &Path) -> std::io::Result<LabelFile> {
    let text = fs::read_to_string(path)?;
    Ok(parse_label_text(&text))
}

/// Format a box the way YOLO tooling expects: integer class, six decimals
pub fn format_box(bbox: &BoundingBox) -> String {
    format!(
        "{} {:.6} {:.6} {:.6} {:.6}",
        bbox.class_id, bbox.cx, bbox.cy, bbox.width, bbox.height
    )
}

pub fn format_label_text(boxes: &[BoundingBox]) -> String {
    let mut text = String::new();
    for bbox in boxes {
        let _ = writeln!(text, "{}", format_box(bbox));
    }
    text
}

/// Write boxes one per line; an empty slice produces an empty file
pub fn write_label_file(path: &Path, boxes: &[BoundingBox]) -> std::io::Result<()> {
    fs::write(path, format_label_text(boxes))
}
