use anyhow::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::path::Path;

use crate::config::VisualizeConfig;
use crate::dataset::{
    file_name_of, label_path_for, list_files_with_extensions, prepare_output_dir, require_dir,
    stem_of, IMAGE_EXTENSIONS,
};
use crate::label::{read_label_file, BoundingBox};
use crate::report::{log_outcome, BatchStats, ItemOutcome};
use crate::transform::open_image;

/// Stroke width of drawn boxes in pixels
const LINE_THICKNESS: i32 = 2;

/// One random color per class id, stable for the whole run
#[derive(Debug)]
pub struct ClassPalette<R: Rng> {
    rng: R,
    colors: HashMap<u32, Rgb<u8>>,
}

impl<R: Rng> ClassPalette<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            colors: HashMap::new(),
        }
    }

    pub fn color(&mut self, class_id: u32) -> Rgb<u8> {
        let rng = &mut self.rng;
        *self
            .colors
            .entry(class_id)
            .or_insert_with(|| Rgb([rng.gen(), rng.gen(), rng.gen()]))
    }

    pub fn colors(&self) -> &HashMap<u32, Rgb<u8>> {
        &self.colors
    }
}

/// Round pixel corners and clamp them to one pixel beyond each image edge.
///
/// `None` when the box does not overlap the image or a corner is NaN.
fn clip_corners(
    (x1, y1, x2, y2): (f64, f64, f64, f64),
    width: u32,
    height: u32,
) -> Option<(i32, i32, i32, i32)> {
    if [x1, y1, x2, y2].iter().any(|v| v.is_nan()) {
        return None;
    }
    let (w, h) = (width as f64, height as f64);
    if x2 < 0.0 || y2 < 0.0 || x1 >= w || y1 >= h {
        return None;
    }
    let clip = |v: f64, max: f64| v.round().clamp(-1.0, max) as i32;
    Some((clip(x1, w), clip(y1, h), clip(x2, w), clip(y2, h)))
}

/// Draw each box as a hollow rectangle in its class color
pub fn draw_boxes<R: Rng>(img: &mut RgbImage, boxes: &[BoundingBox], palette: &mut ClassPalette<R>) {
    let (width, height) = img.dimensions();
    for bbox in boxes {
        let color = palette.color(bbox.class_id);
        let Some((x1, y1, x2, y2)) = clip_corners(bbox.to_pixel_corners(width, height), width, height)
        else {
            log::debug!("Box of class {} lies outside the image, not drawn", bbox.class_id);
            continue;
        };
        let box_w = (x2 - x1).max(1);
        let box_h = (y2 - y1).max(1);

        for inset in 0..LINE_THICKNESS {
            let w = box_w - 2 * inset;
            let h = box_h - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(img, rect, color);
        }
    }
}

/// Draw the labels of a random sample of images into `bbox_<stem>.png` files
pub fn visualize(config: &VisualizeConfig) -> Result<BatchStats> {
    require_dir(&config.images)?;
    require_dir(&config.labels)?;
    prepare_output_dir(&config.output)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut images = list_files_with_extensions(&config.images, IMAGE_EXTENSIONS)?;
    if images.len() > config.num_samples {
        images = images
            .choose_multiple(&mut rng, config.num_samples)
            .cloned()
            .collect();
    }
    log::info!("Drawing bounding boxes for {} images", images.len());

    let mut palette = ClassPalette::new(rng);
    let mut stats = BatchStats::new();
    for img_path in &images {
        let outcome = visualize_one(img_path, config, &mut palette, &mut stats);
        log_outcome(&file_name_of(img_path), &outcome);
        stats.record(&outcome);
    }

    let mut classes: Vec<_> = palette.colors().iter().collect();
    classes.sort_by_key(|(id, _)| **id);
    for (class_id, color) in classes {
        log::info!("Class {}: RGB{:?}", class_id, color.0);
    }
    log::info!("Visualizations written to {:?}", config.output);
    Ok(stats)
}

fn visualize_one<R: Rng>(
    img_path: &Path,
    config: &VisualizeConfig,
    palette: &mut ClassPalette<R>,
    stats: &mut BatchStats,
) -> ItemOutcome {
    let stem = stem_of(img_path);
    let label_path = label_path_for(&config.labels, &stem);
    if !label_path.is_file() {
        return ItemOutcome::Skipped(format!("label file '{}.txt' not found", stem));
    }

    let mut img = match open_image(img_path) {
        Ok(img) => img.to_rgb8(),
        Err(e) => return ItemOutcome::Skipped(format!("cannot read image ({:#})", e)),
    };

    let labels = match read_label_file(&label_path) {
        Ok(labels) => labels,
        Err(e) => return ItemOutcome::Failed(format!("cannot read {:?}: {}", label_path, e)),
    };
    for rejected in &labels.rejected {
        log::warn!(
            "'{}.txt' has a malformed line {}: {}",
            stem,
            rejected.line_no,
            rejected.text
        );
    }
    stats.dropped_entries += labels.rejected.len();

    draw_boxes(&mut img, &labels.boxes, palette);

    let out_path = config.output.join(format!("bbox_{}.png", stem));
    match img.save(&out_path) {
        Ok(()) => ItemOutcome::Processed,
        Err(e) => ItemOutcome::Failed(format!("cannot save {:?}: {}", out_path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::parse_line;

    #[test]
    fn test_palette_is_stable_per_class() {
        let mut palette = ClassPalette::new(StdRng::seed_from_u64(7));
        let first = palette.color(3);
        let _ = palette.color(1);
        assert_eq!(palette.color(3), first);
        assert_eq!(palette.colors().len(), 2);
    }

    #[test]
    fn test_draw_box_outline() {
        let mut img = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let mut palette = ClassPalette::new(StdRng::seed_from_u64(1));
        let color = palette.color(0);
        let boxes = [BoundingBox::new(0, 0.5, 0.5, 0.4, 0.4)];
        draw_boxes(&mut img, &boxes, &mut palette);

        // Box spans 30..70 on both axes
        assert_eq!(*img.get_pixel(30, 50), color);
        assert_eq!(*img.get_pixel(31, 50), color);
        assert_eq!(*img.get_pixel(69, 50), color);
        assert_eq!(*img.get_pixel(50, 50), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_far_out_of_range_box_is_skipped() {
        let mut img = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
        let untouched = img.clone();
        let mut palette = ClassPalette::new(StdRng::seed_from_u64(1));
        let boxes = [parse_line("0 1e8 0.5 1e8 0.1").unwrap()];
        draw_boxes(&mut img, &boxes, &mut palette);
        assert_eq!(img, untouched);
    }

    #[test]
    fn test_oversized_box_is_clamped_to_image() {
        let mut img = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
        let mut palette = ClassPalette::new(StdRng::seed_from_u64(1));
        let color = palette.color(0);
        let boxes = [
            parse_line("0 0.5 0.5 1e8 1e8").unwrap(),
            parse_line("0 1.0 0.5 0.5 0.2").unwrap(),
        ];
        draw_boxes(&mut img, &boxes, &mut palette);

        // Second stroke of the huge box lands on the first column
        assert_eq!(*img.get_pixel(0, 10), color);
        // Box hanging off the right edge keeps its left side
        assert_eq!(*img.get_pixel(48, 32), color);
        assert_eq!(*img.get_pixel(40, 32), Rgb([0, 0, 0]));
    }
}
