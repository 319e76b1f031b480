use nalgebra::{Matrix3, Vector3};

use crate::label::BoundingBox;

/// Placement of a uniformly scaled image inside a square letterbox canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxGeometry {
    /// Side of the square canvas in pixels
    pub target: u32,
    /// Uniform scale applied to the source image
    pub scale: f64,
    pub new_width: u32,
    pub new_height: u32,
    pub pad_top: u32,
    pub pad_bottom: u32,
    pub pad_left: u32,
    pub pad_right: u32,
}

impl LetterboxGeometry {
    /// Compute scale and padding for a `width`x`height` image on a `target`x`target` canvas.
    ///
    /// Returns `None` for zero-area input or a zero-sized canvas.
    pub fn compute(width: u32, height: u32, target: u32) -> Option<Self> {
        if width == 0 || height == 0 || target == 0 {
            return None;
        }

        let side = target as f64;
        let scale = (side / height as f64).min(side / width as f64);

        let new_width = scaled_side(width, scale, target);
        let new_height = scaled_side(height, scale, target);

        // Odd padding puts the extra pixel on the bottom/right
        let pad_w = target - new_width;
        let pad_h = target - new_height;
        let pad_top = pad_h / 2;
        let pad_left = pad_w / 2;

        Some(Self {
            target,
            scale,
            new_width,
            new_height,
            pad_top,
            pad_bottom: pad_h - pad_top,
            pad_left,
            pad_right: pad_w - pad_left,
        })
    }

    /// Affine matrix mapping source pixel coordinates to canvas pixel coordinates
    pub fn forward_matrix(&self) -> Matrix3<f64> {
        letterbox_matrix(self.scale, self.pad_top, self.pad_left)
    }

    /// Map a box normalized to the source image onto this canvas
    pub fn remap(&self, bbox: &BoundingBox, original_size: (u32, u32)) -> BoundingBox {
        map_box(&self.forward_matrix(), bbox, original_size, self.target)
    }
}

fn scaled_side(side: u32, scale: f64, target: u32) -> u32 {
    ((side as f64 * scale).round() as u32).clamp(1, target)
}

/// Scale about the origin, then shift by the top/left padding
pub fn letterbox_matrix(scale: f64, pad_top: u32, pad_left: u32) -> Matrix3<f64> {
    #[rustfmt::skip]
    let matrix = Matrix3::new(
        scale, 0.0,   pad_left as f64,
        0.0,   scale, pad_top as f64,
        0.0,   0.0,   1.0,
    );
    matrix
}

/// Transform a point using the affine matrix
pub fn transform_point(matrix: &Matrix3<f64>, x: f64, y: f64) -> (f64, f64) {
    let p = Vector3::new(x, y, 1.0);
    let result = matrix * p;
    (result.x / result.z, result.y / result.z)
}

/// Forward-map a YOLO box through a letterbox transform.
///
/// The center goes through scale and padding, the size through scale only.
/// Every output field is clamped to `[0, 1]`, so boxes hanging off the canvas
/// are truncated at its edge rather than dropped.
pub fn remap_box(
    bbox: &BoundingBox,
    original_size: (u32, u32),
    scale: f64,
    pad_top: u32,
    pad_left: u32,
    target: u32,
) -> BoundingBox {
    let matrix = letterbox_matrix(scale, pad_top, pad_left);
    map_box(&matrix, bbox, original_size, target)
}

/// Sizes go through the linear part of `matrix` only
fn map_box(
    matrix: &Matrix3<f64>,
    bbox: &BoundingBox,
    original_size: (u32, u32),
    target: u32,
) -> BoundingBox {
    let (orig_w, orig_h) = (original_size.0 as f64, original_size.1 as f64);
    let side = target as f64;

    let (cx_px, cy_px) = transform_point(matrix, bbox.cx * orig_w, bbox.cy * orig_h);
    let width_px = bbox.width * orig_w * matrix[(0, 0)];
    let height_px = bbox.height * orig_h * matrix[(1, 1)];

    BoundingBox {
        class_id: bbox.class_id,
        cx: clamp_unit(cx_px / side),
        cy: clamp_unit(cy_px / side),
        width: clamp_unit(width_px / side),
        height: clamp_unit(height_px / side),
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_landscape_geometry() {
        let geom = LetterboxGeometry::compute(1280, 720, 640).unwrap();
        assert!(close(geom.scale, 0.5));
        assert_eq!((geom.new_width, geom.new_height), (640, 360));
        assert_eq!((geom.pad_top, geom.pad_bottom), (140, 140));
        assert_eq!((geom.pad_left, geom.pad_right), (0, 0));
    }

    #[test]
    fn test_odd_padding_goes_to_trailing_side() {
        // 100x67 on 100: height stays 67, pad 33 -> 16 top, 17 bottom
        let geom = LetterboxGeometry::compute(100, 67, 100).unwrap();
        assert_eq!(geom.new_height, 67);
        assert_eq!((geom.pad_top, geom.pad_bottom), (16, 17));
    }

    #[test]
    fn test_geometry_invariants() {
        let sizes = [(1, 1), (1, 1000), (1000, 1), (333, 777), (641, 640), (639, 1280)];
        for &(w, h) in &sizes {
            for &target in &[1u32, 32, 640] {
                let geom = LetterboxGeometry::compute(w, h, target).unwrap();
                let expected = (target as f64 / h as f64).min(target as f64 / w as f64);
                assert!(close(geom.scale, expected));
                assert!(geom.new_width <= target && geom.new_height <= target);
                assert_eq!(geom.pad_top + geom.pad_bottom, target - geom.new_height);
                assert_eq!(geom.pad_left + geom.pad_right, target - geom.new_width);
                assert!(geom.pad_top <= geom.pad_bottom);
                assert!(geom.pad_left <= geom.pad_right);
            }
        }
    }

    #[test]
    fn test_zero_area_rejected() {
        assert!(LetterboxGeometry::compute(0, 10, 640).is_none());
        assert!(LetterboxGeometry::compute(10, 0, 640).is_none());
        assert!(LetterboxGeometry::compute(10, 10, 0).is_none());
    }

    #[test]
    fn test_remap_landscape_center() {
        let geom = LetterboxGeometry::compute(1280, 720, 640).unwrap();
        let bbox = BoundingBox::new(0, 0.5, 0.5, 0.2, 0.2);
        let out = geom.remap(&bbox, (1280, 720));
        assert_eq!(out.class_id, 0);
        assert!(close(out.cx, 0.5));
        assert!(close(out.cy, 0.5));
        assert!(close(out.width, 0.2));
        assert!(close(out.height, 0.1125));
    }

    #[test]
    fn test_remap_identity_for_square_target() {
        let geom = LetterboxGeometry::compute(640, 640, 640).unwrap();
        let bbox = BoundingBox::new(3, 0.5, 0.5, 0.25, 0.4);
        let out = geom.remap(&bbox, (640, 640));
        assert_eq!(out, bbox);
    }

    #[test]
    fn test_remap_clamps_out_of_range() {
        let geom = LetterboxGeometry::compute(100, 50, 640).unwrap();
        let bbox = BoundingBox::new(1, 1.4, -0.3, 2.5, 0.1);
        let out = geom.remap(&bbox, (100, 50));
        for v in [out.cx, out.cy, out.width, out.height] {
            assert!((0.0..=1.0).contains(&v));
        }
        assert!(close(out.cx, 1.0));
        assert!(close(out.width, 1.0));
    }

    #[test]
    fn test_forward_matrix_maps_image_corners() {
        let geom = LetterboxGeometry::compute(1280, 720, 640).unwrap();
        let matrix = geom.forward_matrix();
        assert_eq!(transform_point(&matrix, 0.0, 0.0), (0.0, 140.0));
        assert_eq!(transform_point(&matrix, 1280.0, 720.0), (640.0, 500.0));
    }

    #[test]
    fn test_remap_matches_free_function() {
        let geom = LetterboxGeometry::compute(333, 777, 640).unwrap();
        let bbox = BoundingBox::new(2, 0.3, 0.7, 0.2, 0.1);
        let free = remap_box(&bbox, (333, 777), geom.scale, geom.pad_top, geom.pad_left, 640);
        assert_eq!(geom.remap(&bbox, (333, 777)), free);
    }

    #[test]
    fn test_transform_point_matches_matrix() {
        let matrix = letterbox_matrix(0.5, 140, 0);
        let (x, y) = transform_point(&matrix, 640.0, 360.0);
        assert!(close(x, 320.0));
        assert!(close(y, 320.0));
    }
}
