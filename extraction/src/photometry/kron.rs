//! Kron radius: the flux-weighted mean ellipse distance of an object.

use ndarray::ArrayView2;

use crate::flags::{APER_NONPOSITIVE, APER_TRUNC};
use crate::photometry::ellipse::{scan_window, EllipseCoeffs};

/// Compute the Kron radius of one object.
///
/// Integrates over the elliptical region of ellipse distance `r` around
/// (x, y): `kron = sum(f * e) / sum(f)` with e the ellipse distance of each
/// pixel. The result is in units of the (a, b) shape ellipse, matching the
/// radius argument of the elliptical aperture sum.
///
/// # Arguments
/// * `image` - Image to integrate
/// * `x`, `y` - Object centroid
/// * `a`, `b`, `theta` - Shape ellipse
/// * `r` - Integration extent in ellipse-distance units
///
/// # Returns
/// `(kron_radius, flag_bits)`. A degenerate shape or non-positive flux sum
/// yields radius 0.0 with the non-positive bit set; a window clipped by the
/// image boundary sets the truncation bit.
pub fn kron_radius(
    image: &ArrayView2<f64>,
    x: f64,
    y: f64,
    a: f64,
    b: f64,
    theta: f64,
    r: f64,
) -> (f64, u32) {
    let coeffs = match EllipseCoeffs::from_shape(a, b, theta) {
        Some(coeffs) => coeffs,
        None => return (0.0, APER_NONPOSITIVE),
    };

    let half = r * a.max(b);
    let (ys, xs, truncated) = match scan_window(image.dim(), x, y, half) {
        Some(window) => window,
        None => return (0.0, APER_NONPOSITIVE | APER_TRUNC),
    };

    let mut flag = if truncated { APER_TRUNC } else { 0 };
    let r_sq = r * r;
    let mut weighted = 0.0;
    let mut total = 0.0;

    for row in ys {
        for col in xs.clone() {
            let dx = col as f64 - x;
            let dy = row as f64 - y;
            let d_sq = coeffs.dist_sq(dx, dy);
            if d_sq <= r_sq {
                let value = image[[row, col]];
                weighted += value * d_sq.sqrt();
                total += value;
            }
        }
    }

    if total <= 0.0 {
        flag |= APER_NONPOSITIVE;
        return (0.0, flag);
    }

    (weighted / total, flag)
}
