//! Same-size 2D convolution for matched-filter detection.
//!
//! Detection compares the smoothed image against the sigma of the smoothed
//! noise, so alongside the plain convolution this module provides the exact
//! standard deviation of the convolved noise field: for independent pixels,
//! `Var[conv(img, k)] = conv(Var[img], k * k)` elementwise in the kernel.

use ndarray::{Array2, ArrayView2};

/// Convolve an image with a kernel, producing an output of the same shape.
///
/// Contributions from outside the image are treated as zero, so values taper
/// toward the borders. The kernel must have odd dimensions so it centers on
/// each pixel.
///
/// # Arguments
/// * `image` - Input image
/// * `kernel` - Convolution kernel with odd dimensions
///
/// # Returns
/// Convolved image, same shape as the input
pub fn convolve2d(image: &ArrayView2<f64>, kernel: &ArrayView2<f64>) -> Array2<f64> {
    let (rows, cols) = image.dim();
    let (krows, kcols) = kernel.dim();
    debug_assert!(
        krows % 2 == 1 && kcols % 2 == 1,
        "kernel dimensions must be odd, got {krows}x{kcols}"
    );

    let half_r = (krows / 2) as isize;
    let half_c = (kcols / 2) as isize;
    let mut out = Array2::zeros((rows, cols));

    for i in 0..rows {
        for j in 0..cols {
            let mut acc = 0.0;
            for ki in 0..krows {
                let src_r = i as isize + ki as isize - half_r;
                if src_r < 0 || src_r >= rows as isize {
                    continue;
                }
                for kj in 0..kcols {
                    let src_c = j as isize + kj as isize - half_c;
                    if src_c < 0 || src_c >= cols as isize {
                        continue;
                    }
                    acc += kernel[[ki, kj]] * image[[src_r as usize, src_c as usize]];
                }
            }
            out[[i, j]] = acc;
        }
    }

    out
}

/// Per-pixel standard deviation of the convolved noise field.
///
/// # Arguments
/// * `variance` - Per-pixel noise variance of the unfiltered image
/// * `kernel` - The same kernel applied to the image
///
/// # Returns
/// `sqrt(conv(variance, kernel^2))`, same shape as the input
pub fn convolved_noise_sigma(variance: &ArrayView2<f64>, kernel: &ArrayView2<f64>) -> Array2<f64> {
    let kernel_sq = kernel.mapv(|k| k * k);
    convolve2d(variance, &kernel_sq.view()).mapv(f64::sqrt)
}
