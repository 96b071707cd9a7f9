//! Aperture sums: elliptical flux integration and the half-light radius
//! search.

use ndarray::ArrayView2;

use crate::flags::{APER_NONPOSITIVE, APER_TRUNC};
use crate::photometry::ellipse::{scan_window, EllipseCoeffs};

/// Sum the flux inside an elliptical aperture.
///
/// The aperture is the object's (a, b, theta) ellipse scaled to ellipse
/// distance `r`. With `subpix <= 1` a pixel contributes fully when its
/// center lies inside; larger values sample each pixel on a subpix x subpix
/// grid and weight it by the covered fraction.
///
/// The error channel is only populated when a variance map is supplied;
/// callers that do not thread one through receive 0.0, not an estimate.
///
/// # Arguments
/// * `image` - Image to integrate
/// * `x`, `y` - Aperture center
/// * `a`, `b`, `theta` - Shape ellipse
/// * `r` - Aperture scale in ellipse-distance units
/// * `subpix` - Sub-pixel sampling factor
/// * `variance` - Optional per-pixel variance map for the error channel
///
/// # Returns
/// `(flux, flux_error, flag_bits)`
pub fn sum_ellipse(
    image: &ArrayView2<f64>,
    x: f64,
    y: f64,
    a: f64,
    b: f64,
    theta: f64,
    r: f64,
    subpix: usize,
    variance: Option<&ArrayView2<f64>>,
) -> (f64, f64, u32) {
    let coeffs = match EllipseCoeffs::from_shape(a, b, theta) {
        Some(coeffs) => coeffs,
        None => return (0.0, 0.0, APER_NONPOSITIVE),
    };
    if r <= 0.0 {
        return (0.0, 0.0, APER_NONPOSITIVE);
    }

    let half = r * a.max(b);
    let (ys, xs, truncated) = match scan_window(image.dim(), x, y, half) {
        Some(window) => window,
        None => return (0.0, 0.0, APER_NONPOSITIVE | APER_TRUNC),
    };

    let flag = if truncated { APER_TRUNC } else { 0 };
    let r_sq = r * r;
    let mut flux = 0.0;
    let mut var_sum = 0.0;

    for row in ys {
        for col in xs.clone() {
            let weight = pixel_weight(&coeffs, col as f64 - x, row as f64 - y, r_sq, subpix);
            if weight > 0.0 {
                flux += weight * image[[row, col]];
                if let Some(variance) = variance {
                    var_sum += weight * variance[[row, col]];
                }
            }
        }
    }

    (flux, var_sum.sqrt(), flag)
}

/// Fraction of a pixel inside the aperture.
fn pixel_weight(coeffs: &EllipseCoeffs, dx: f64, dy: f64, r_sq: f64, subpix: usize) -> f64 {
    if subpix <= 1 {
        return if coeffs.dist_sq(dx, dy) <= r_sq {
            1.0
        } else {
            0.0
        };
    }

    let n = subpix as f64;
    let mut inside = 0usize;
    for i in 0..subpix {
        let sy = dy - 0.5 + (i as f64 + 0.5) / n;
        for j in 0..subpix {
            let sx = dx - 0.5 + (j as f64 + 0.5) / n;
            if coeffs.dist_sq(sx, sy) <= r_sq {
                inside += 1;
            }
        }
    }
    inside as f64 / (n * n)
}

/// Search for the circular radius enclosing `frac` of a reference flux.
///
/// Accumulates flux into radial bins of width `1/subpix` out to `rmax`, then
/// interpolates within the bin where the cumulative sum crosses
/// `frac * normflux`. When the target is never reached the search gives up
/// and returns `rmax`.
///
/// # Arguments
/// * `image` - Image to integrate
/// * `x`, `y` - Search center
/// * `rmax` - Maximum radius in pixels
/// * `frac` - Target flux fraction
/// * `normflux` - Reference flux the fraction applies to
/// * `subpix` - Sub-pixel sampling factor (radial bin resolution)
///
/// # Returns
/// `(radius, flag_bits)`. A non-positive reference flux or degenerate
/// search bound yields radius 0.0 with the non-positive bit set.
pub fn flux_radius(
    image: &ArrayView2<f64>,
    x: f64,
    y: f64,
    rmax: f64,
    frac: f64,
    normflux: f64,
    subpix: usize,
) -> (f64, u32) {
    if normflux <= 0.0 || rmax <= 0.0 {
        return (0.0, APER_NONPOSITIVE);
    }

    let (ys, xs, truncated) = match scan_window(image.dim(), x, y, rmax) {
        Some(window) => window,
        None => return (0.0, APER_NONPOSITIVE | APER_TRUNC),
    };
    let flag = if truncated { APER_TRUNC } else { 0 };

    let scale = subpix.max(1) as f64;
    let nbins = (rmax * scale).ceil() as usize + 1;
    let mut bins = vec![0.0; nbins];

    for row in ys {
        for col in xs.clone() {
            let dx = col as f64 - x;
            let dy = row as f64 - y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist <= rmax {
                let bin = ((dist * scale) as usize).min(nbins - 1);
                bins[bin] += image[[row, col]];
            }
        }
    }

    let target = frac * normflux;
    let mut cumulative = 0.0;
    for (bin, &bin_flux) in bins.iter().enumerate() {
        if cumulative + bin_flux >= target {
            let within = if bin_flux > 0.0 {
                (target - cumulative) / bin_flux
            } else {
                0.0
            };
            let radius = (bin as f64 + within) / scale;
            return (radius.min(rmax), flag);
        }
        cumulative += bin_flux;
    }

    (rmax, flag)
}
