//! Structural Similarity Scorer
//!
//! Mean structural similarity (SSIM) between two grayscale images using the
//! customary defaults: a 7x7 uniform window, K1 = 0.01, K2 = 0.03, a data
//! range of 255 and sample covariance. The mean is taken over the windows
//! that fit entirely inside the image.

use image::{DynamicImage, GrayImage};
use anyhow::Result;

use super::preprocess::resize_to_canvas;
use crate::utils::math::mean;

/// Side of the square averaging window
pub const WINDOW_SIZE: usize = 7;

const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// Scores image pairs after normalizing both to a square canvas
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer {
    canvas_size: u32,
}

impl SimilarityScorer {
    pub fn new(canvas_size: u32) -> Self {
        Self { canvas_size }
    }

    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    /// SSIM between two images of arbitrary, possibly different, sizes.
    ///
    /// Both are stretched to the canvas (aspect ratio is not kept) and
    /// converted to luma first.
    pub fn score(&self, a: &DynamicImage, b: &DynamicImage) -> Result<f64> {
        let a = resize_to_canvas(a, self.canvas_size);
        let b = resize_to_canvas(b, self.canvas_size);
        structural_similarity(&a, &b)
    }
}

/// Mean SSIM of two equally sized grayscale images, in [-1, 1].
pub fn structural_similarity(a: &GrayImage, b: &GrayImage) -> Result<f64> {
    if a.dimensions() != b.dimensions() {
        anyhow::bail!(
            "Images must share dimensions, got {:?} and {:?}",
            a.dimensions(),
            b.dimensions()
        );
    }

    let (width, height) = (a.width() as usize, a.height() as usize);
    if width < WINDOW_SIZE || height < WINDOW_SIZE {
        anyhow::bail!(
            "Images of {}x{} are smaller than the {}x{} window",
            width,
            height,
            WINDOW_SIZE,
            WINDOW_SIZE
        );
    }

    let tables = SummedAreaTables::new(a, b);

    let np = (WINDOW_SIZE * WINDOW_SIZE) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let mut ssim_map = Vec::with_capacity((width - WINDOW_SIZE + 1) * (height - WINDOW_SIZE + 1));

    for top in 0..=(height - WINDOW_SIZE) {
        for left in 0..=(width - WINDOW_SIZE) {
            let sums = tables.window(top, left);

            let ux = sums.x / np;
            let uy = sums.y / np;
            let uxx = sums.xx / np;
            let uyy = sums.yy / np;
            let uxy = sums.xy / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            ssim_map.push(numerator / denominator);
        }
    }

    mean(&ssim_map).ok_or_else(|| anyhow::anyhow!("No complete window fits the images"))
}

/// Window totals of x, y, x², y² and xy
struct WindowSums {
    x: f64,
    y: f64,
    xx: f64,
    yy: f64,
    xy: f64,
}

/// Integral images over both inputs, kept in integers so window sums are exact
struct SummedAreaTables {
    stride: usize,
    x: Vec<u64>,
    y: Vec<u64>,
    xx: Vec<u64>,
    yy: Vec<u64>,
    xy: Vec<u64>,
}

impl SummedAreaTables {
    fn new(a: &GrayImage, b: &GrayImage) -> Self {
        let (width, height) = (a.width() as usize, a.height() as usize);
        let stride = width + 1;
        let len = stride * (height + 1);

        let mut tables = Self {
            stride,
            x: vec![0; len],
            y: vec![0; len],
            xx: vec![0; len],
            yy: vec![0; len],
            xy: vec![0; len],
        };

        let (pa, pb) = (a.as_raw(), b.as_raw());
        for row in 0..height {
            let (mut rx, mut ry, mut rxx, mut ryy, mut rxy) = (0u64, 0u64, 0u64, 0u64, 0u64);
            for col in 0..width {
                let va = pa[row * width + col] as u64;
                let vb = pb[row * width + col] as u64;
                rx += va;
                ry += vb;
                rxx += va * va;
                ryy += vb * vb;
                rxy += va * vb;

                let here = (row + 1) * stride + col + 1;
                let above = row * stride + col + 1;
                tables.x[here] = tables.x[above] + rx;
                tables.y[here] = tables.y[above] + ry;
                tables.xx[here] = tables.xx[above] + rxx;
                tables.yy[here] = tables.yy[above] + ryy;
                tables.xy[here] = tables.xy[above] + rxy;
            }
        }

        tables
    }

    fn window(&self, top: usize, left: usize) -> WindowSums {
        let (bottom, right) = (top + WINDOW_SIZE, left + WINDOW_SIZE);
        let sum = |table: &[u64]| -> f64 {
            let total = table[bottom * self.stride + right] + table[top * self.stride + left]
                - table[top * self.stride + right]
                - table[bottom * self.stride + left];
            total as f64
        };

        WindowSums {
            x: sum(&self.x),
            y: sum(&self.y),
            xx: sum(&self.xx),
            yy: sum(&self.yy),
            xy: sum(&self.xy),
        }
    }
}
