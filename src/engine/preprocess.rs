//! Image preprocessing shared by the inference and similarity pipelines

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use ndarray::Array4;
use anyhow::Result;

use super::detector::BoundingBox;

/// Input size of the SSD face detector
pub const DETECTOR_INPUT_SIZE: (u32, u32) = (300, 300);

/// Per-channel means (B, G, R) subtracted before face detection
pub const DETECTOR_MEAN: [f32; 3] = [104.0, 117.0, 123.0];

/// Input size of the age classifier
pub const AGE_INPUT_SIZE: (u32, u32) = (227, 227);

/// Per-channel means (B, G, R) subtracted before age classification
pub const AGE_MEAN: [f32; 3] = [78.426_34, 87.768_91, 114.895_85];

/// Build an NCHW blob from an image.
///
/// The image is resized to `size` with bilinear filtering and laid out in
/// BGR channel order with `mean` subtracted per channel. No scaling is
/// applied.
pub fn blob_from_image(image: &DynamicImage, size: (u32, u32), mean: [f32; 3]) -> Array4<f32> {
    let (target_w, target_h) = size;
    let resized = image.resize_exact(target_w, target_h, FilterType::Triangle);
    let rgb = resized.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (r, g, b) = (pixel[0] as f32, pixel[1] as f32, pixel[2] as f32);
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = b - mean[0];
        tensor[[0, 1, y, x]] = g - mean[1];
        tensor[[0, 2, y, x]] = r - mean[2];
    }

    tensor
}

/// Pixel region `(x, y, width, height)` of a face box grown by `padding`.
///
/// The start is clamped at zero and the exclusive end at `dimension - 1`, so
/// the region never indexes outside the image. Returns `None` when nothing
/// is left.
pub fn padded_crop_bounds(
    bbox: &BoundingBox,
    padding: u32,
    dimensions: (u32, u32),
) -> Option<(u32, u32, u32, u32)> {
    let (img_w, img_h) = (dimensions.0 as i64, dimensions.1 as i64);
    let pad = padding as i64;

    let x_start = (bbox.x1 as i64 - pad).max(0);
    let y_start = (bbox.y1 as i64 - pad).max(0);
    let x_end = (bbox.x2 as i64 + pad).min(img_w - 1);
    let y_end = (bbox.y2 as i64 + pad).min(img_h - 1);

    if x_end <= x_start || y_end <= y_start {
        return None;
    }

    Some((
        x_start as u32,
        y_start as u32,
        (x_end - x_start) as u32,
        (y_end - y_start) as u32,
    ))
}

/// Resize to a `size` x `size` canvas, ignoring aspect ratio, and convert to
/// 8-bit luma.
pub fn resize_to_canvas(image: &DynamicImage, size: u32) -> GrayImage {
    image.resize_exact(size, size, FilterType::Triangle).to_luma8()
}

/// Decode image from bytes with EXIF orientation handling
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(data)?;
    Ok(apply_exif_orientation(data, image))
}

/// Apply EXIF orientation to correct image rotation
fn apply_exif_orientation(data: &[u8], image: DynamicImage) -> DynamicImage {
    use std::io::Cursor;

    let orientation = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif_data) => exif_data
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .unwrap_or(1),
        Err(_) => 1,
    };

    // See https://exiftool.org/TagNames/EXIF.html (Orientation)
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}
