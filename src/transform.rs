use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use std::path::Path;

use crate::geometry::LetterboxGeometry;

/// Default letterbox canvas side
pub const DEFAULT_TARGET: u32 = 640;

/// Default padding color (YOLO gray)
pub const DEFAULT_PAD: Rgb<u8> = Rgb([114, 114, 114]);

/// Decode an image, guessing the format from its content when the extension lies
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    let img = ImageReader::open(path)
        .with_context(|| format!("Failed to open {:?}", path))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("Failed to decode {:?}", path))?;
    Ok(img)
}

/// A letterboxed image together with the geometry used to produce it
#[derive(Debug)]
pub struct Letterboxed {
    pub image: RgbImage,
    pub geometry: LetterboxGeometry,
}

impl Letterboxed {
    pub fn scale(&self) -> f64 {
        self.geometry.scale
    }

    /// `(top, left)` padding, the offset needed to remap coordinates
    pub fn padding(&self) -> (u32, u32) {
        (self.geometry.pad_top, self.geometry.pad_left)
    }
}

/// Resize an image into a `target`x`target` canvas, preserving aspect ratio.
///
/// The image is scaled uniformly with bilinear filtering and centered; the
/// remaining border is filled with `pad`.
pub fn letterbox(img: &DynamicImage, target: u32, pad: Rgb<u8>) -> Result<Letterboxed> {
    let (width, height) = (img.width(), img.height());
    let geometry = LetterboxGeometry::compute(width, height, target)
        .with_context(|| format!("Cannot letterbox a {}x{} image to {}", width, height, target))?;

    let rgb = img.to_rgb8();
    let resized = if (geometry.new_width, geometry.new_height) == (width, height) {
        rgb
    } else {
        imageops::resize(
            &rgb,
            geometry.new_width,
            geometry.new_height,
            FilterType::Triangle,
        )
    };

    let mut canvas = RgbImage::from_pixel(target, target, pad);
    imageops::replace(
        &mut canvas,
        &resized,
        geometry.pad_left as i64,
        geometry.pad_top as i64,
    );

    Ok(Letterboxed {
        image: canvas,
        geometry,
    })
}
