//! Moment-based measurement of detected objects.
//!
//! Each object's position and shape ellipse come from intensity-weighted
//! image moments over its member pixels: the centroid from first moments,
//! and the semi-axes and position angle from the eigenvalues of the central
//! second-moment matrix. Measurement runs on the unfiltered image so fluxes
//! stay in native pixel units; the filtered image only decides membership.

use serde::{Deserialize, Serialize};

use ndarray::ArrayView2;

use crate::flags::{OBJ_MERGED, OBJ_SINGU, OBJ_TRUNC};
use crate::image_proc::segment::Pixel;

/// One detected source as produced by the detection stage.
///
/// Immutable once produced; photometry stages report additional flag bits
/// separately and the catalog assembly merges them with bitwise OR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawObject {
    /// Centroid x-coordinate (column) with sub-pixel precision
    pub x: f64,
    /// Centroid y-coordinate (row) with sub-pixel precision
    pub y: f64,
    /// Semi-major axis from second moments, in pixels
    pub a: f64,
    /// Semi-minor axis from second moments, in pixels
    pub b: f64,
    /// Ellipse position angle in radians, counter-clockwise from +x,
    /// in [-pi/2, pi/2]
    pub theta: f64,
    /// Isophotal flux: sum of member pixel values
    pub flux: f64,
    /// Brightest member pixel value
    pub peak: f64,
    /// Number of member pixels
    pub npix: u32,
    /// Bounding box, inclusive pixel coordinates
    pub xmin: usize,
    pub xmax: usize,
    pub ymin: usize,
    pub ymax: usize,
    /// Absolute detection threshold at the object's peak pixel
    pub thresh: f64,
    /// Processing-flag bitmask
    pub flag: u32,
}

/// Measure one object from its member pixels.
///
/// # Arguments
/// * `image` - Unfiltered image the flux and moments are measured on
/// * `pixels` - Member pixels of the object
/// * `thresh` - Absolute detection threshold at the object's peak pixel
/// * `merged` - Whether the object came out of a deblending split
pub fn measure_object(
    image: &ArrayView2<f64>,
    pixels: &[Pixel],
    thresh: f64,
    merged: bool,
) -> RawObject {
    let (rows, cols) = image.dim();

    let mut m00 = 0.0;
    let mut m10 = 0.0;
    let mut m01 = 0.0;
    let mut m20 = 0.0;
    let mut m02 = 0.0;
    let mut m11 = 0.0;
    let mut peak = f64::NEG_INFINITY;

    let mut ymin = rows;
    let mut ymax = 0;
    let mut xmin = cols;
    let mut xmax = 0;

    for &(y, x) in pixels {
        let value = image[[y, x]];
        peak = peak.max(value);
        ymin = ymin.min(y);
        ymax = ymax.max(y);
        xmin = xmin.min(x);
        xmax = xmax.max(x);

        m00 += value;
        m10 += x as f64 * value;
        m01 += y as f64 * value;
        m20 += (x as f64).powi(2) * value;
        m02 += (y as f64).powi(2) * value;
        m11 += (x as f64) * (y as f64) * value;
    }

    let mut flag = if merged { OBJ_MERGED } else { 0 };
    if ymin == 0 || xmin == 0 || ymax + 1 == rows || xmax + 1 == cols {
        flag |= OBJ_TRUNC;
    }

    if m00 <= f64::EPSILON {
        // Degenerate weights: fall back to the unweighted pixel centroid
        let n = pixels.len() as f64;
        let x = pixels.iter().map(|&(_, x)| x as f64).sum::<f64>() / n;
        let y = pixels.iter().map(|&(y, _)| y as f64).sum::<f64>() / n;
        return RawObject {
            x,
            y,
            a: 0.0,
            b: 0.0,
            theta: 0.0,
            flux: m00,
            peak,
            npix: pixels.len() as u32,
            xmin,
            xmax,
            ymin,
            ymax,
            thresh,
            flag: flag | OBJ_SINGU,
        };
    }

    let x = m10 / m00;
    let y = m01 / m00;

    // Central second moments
    let mxx = m20 / m00 - x * x;
    let myy = m02 / m00 - y * y;
    let mxy = m11 / m00 - x * y;

    // Ellipse axes from the eigenvalues of the moment matrix
    let sum = mxx + myy;
    let diff = mxx - myy;
    let discriminant = (diff * diff + 4.0 * mxy * mxy).sqrt();
    let lambda1 = (sum + discriminant) / 2.0;
    let lambda2 = (sum - discriminant) / 2.0;

    let a = lambda1.max(0.0).sqrt();
    let b = lambda2.max(0.0).sqrt();
    let theta = 0.5 * (2.0 * mxy).atan2(diff);

    RawObject {
        x,
        y,
        a,
        b,
        theta,
        flux: m00,
        peak,
        npix: pixels.len() as u32,
        xmin,
        xmax,
        ymin,
        ymax,
        thresh,
        flag,
    }
}
