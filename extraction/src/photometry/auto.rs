//! Kron-aperture ("auto") photometry over a detection list.
//!
//! Runs three ordered sub-steps over the shape-valid subset of objects:
//! Kron radius, elliptical auto flux at 2.5 Kron radii, and the circular
//! half-light radius of that flux. Each sub-step yields values plus flag
//! bits per object; the bits fold into a running accumulator with bitwise
//! OR so a later failure never erases an earlier one. Values scatter back
//! into full-length arrays with a sentinel for objects the validity filter
//! excluded.

use log::debug;
use ndarray::ArrayView2;

use crate::image_proc::moments::RawObject;
use crate::photometry::aperture::{flux_radius, sum_ellipse};
use crate::photometry::kron::kron_radius;

/// Flux fraction enclosed by the half-light radius.
pub const PHOT_FLUXFRAC: f64 = 0.5;

/// Kron integration extent, in units of the shape ellipse.
pub const KRON_RADIUS_SCALE: f64 = 6.0;

/// Auto aperture scale: the flux aperture is this many Kron radii.
pub const KRON_APERTURE_FACTOR: f64 = 2.5;

/// Half-light search bound, in units of the semi-major axis.
pub const FLUX_RADIUS_SCALE: f64 = 6.0;

/// Sub-pixel sampling for the auto flux aperture.
pub const FLUX_AUTO_SUBPIX: usize = 1;

/// Sub-pixel sampling for the half-light radius search.
pub const FLUX_RADIUS_SUBPIX: usize = 5;

/// Marker for derived quantities that were never computed.
pub const SENTINEL: f64 = -9999.0;

/// Full-length derived-quantity arrays, one entry per detected object.
///
/// Objects outside the valid subset hold [`SENTINEL`] in every value array
/// and zero in `flag_bits` (their flags are untouched by this stage).
#[derive(Debug, Clone)]
pub struct AutoPhotometry {
    pub kron_radius: Vec<f64>,
    pub flux_auto: Vec<f64>,
    pub fluxerr_auto: Vec<f64>,
    pub flux_radius: Vec<f64>,
    /// Flag bits contributed by this stage, to be OR-merged into each
    /// object's flag by catalog assembly.
    pub flag_bits: Vec<u32>,
}

/// Shape-validity predicate: non-negative axes and a position angle within
/// [-pi/2, pi/2].
pub fn shape_is_valid(object: &RawObject) -> bool {
    object.a >= 0.0
        && object.b >= 0.0
        && object.theta >= -std::f64::consts::FRAC_PI_2
        && object.theta <= std::f64::consts::FRAC_PI_2
}

/// Indices of the objects passing the shape-validity filter, in detection
/// order.
pub fn valid_indices(objects: &[RawObject]) -> Vec<usize> {
    objects
        .iter()
        .enumerate()
        .filter(|(_, object)| shape_is_valid(object))
        .map(|(index, _)| index)
        .collect()
}

/// Scatter subset values back into a full-length array.
///
/// `values[j]` lands at `indices[j]`; every other slot holds `fill`.
pub fn scatter(len: usize, indices: &[usize], values: &[f64], fill: f64) -> Vec<f64> {
    debug_assert_eq!(indices.len(), values.len());
    let mut dense = vec![fill; len];
    for (&index, &value) in indices.iter().zip(values) {
        dense[index] = value;
    }
    dense
}

/// OR-fold one sub-step's flag bits into the running accumulator.
pub fn fold_flags(accumulated: &[u32], step_bits: &[u32]) -> Vec<u32> {
    debug_assert_eq!(accumulated.len(), step_bits.len());
    accumulated
        .iter()
        .zip(step_bits)
        .map(|(acc, bits)| acc | bits)
        .collect()
}

/// Compute auto photometry for a detection list.
///
/// # Arguments
/// * `image` - The image the objects were detected on
/// * `objects` - Raw detections in catalog order
///
/// # Returns
/// Full-length derived-quantity arrays; see [`AutoPhotometry`].
pub fn compute_auto_photometry(image: &ArrayView2<f64>, objects: &[RawObject]) -> AutoPhotometry {
    let len = objects.len();
    let valid = valid_indices(objects);
    debug!("{} of {} objects pass the shape filter", valid.len(), len);

    // Nothing valid: the radius and flux kernels never see zero-length input
    if valid.is_empty() {
        return AutoPhotometry {
            kron_radius: vec![SENTINEL; len],
            flux_auto: vec![SENTINEL; len],
            fluxerr_auto: vec![SENTINEL; len],
            flux_radius: vec![SENTINEL; len],
            flag_bits: vec![0; len],
        };
    }

    let mut flags = vec![0u32; valid.len()];

    // Step 1: Kron radius over each object's shape ellipse
    let mut kron = Vec::with_capacity(valid.len());
    let mut step_bits = Vec::with_capacity(valid.len());
    for &index in &valid {
        let object = &objects[index];
        let (radius, bits) = kron_radius(
            image,
            object.x,
            object.y,
            object.a,
            object.b,
            object.theta,
            KRON_RADIUS_SCALE,
        );
        kron.push(radius);
        step_bits.push(bits);
    }
    flags = fold_flags(&flags, &step_bits);

    // Step 2: elliptical flux at 2.5 Kron radii. No variance map is threaded
    // through this call, so the error channel reads back zero; downstream
    // consumers of fluxerr_auto rely on that exact behavior.
    let mut flux = Vec::with_capacity(valid.len());
    let mut fluxerr = Vec::with_capacity(valid.len());
    let mut step_bits = Vec::with_capacity(valid.len());
    for (j, &index) in valid.iter().enumerate() {
        let object = &objects[index];
        let (value, error, bits) = sum_ellipse(
            image,
            object.x,
            object.y,
            object.a,
            object.b,
            object.theta,
            KRON_APERTURE_FACTOR * kron[j],
            FLUX_AUTO_SUBPIX,
            None,
        );
        flux.push(value);
        fluxerr.push(error);
        step_bits.push(bits);
    }
    flags = fold_flags(&flags, &step_bits);

    // Step 3: half-light radius of the auto flux
    let mut half_light = Vec::with_capacity(valid.len());
    let mut step_bits = Vec::with_capacity(valid.len());
    for (j, &index) in valid.iter().enumerate() {
        let object = &objects[index];
        let (radius, bits) = flux_radius(
            image,
            object.x,
            object.y,
            FLUX_RADIUS_SCALE * object.a,
            PHOT_FLUXFRAC,
            flux[j],
            FLUX_RADIUS_SUBPIX,
        );
        half_light.push(radius);
        step_bits.push(bits);
    }
    flags = fold_flags(&flags, &step_bits);

    AutoPhotometry {
        kron_radius: scatter(len, &valid, &kron, SENTINEL),
        flux_auto: scatter(len, &valid, &flux, SENTINEL),
        fluxerr_auto: scatter(len, &valid, &fluxerr, SENTINEL),
        flux_radius: scatter(len, &valid, &half_light, SENTINEL),
        flag_bits: {
            let mut dense = vec![0u32; len];
            for (&index, &bits) in valid.iter().zip(&flags) {
                dense[index] = bits;
            }
            dense
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::APER_NONPOSITIVE;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn object(x: f64, y: f64, a: f64, b: f64, theta: f64) -> RawObject {
        RawObject {
            x,
            y,
            a,
            b,
            theta,
            flux: 1.0,
            peak: 1.0,
            npix: 9,
            xmin: 0,
            xmax: 1,
            ymin: 0,
            ymax: 1,
            thresh: 0.1,
            flag: 0,
        }
    }

    fn gaussian(dim: (usize, usize), cy: f64, cx: f64, amp: f64, sigma: f64) -> Array2<f64> {
        Array2::from_shape_fn(dim, |(y, x)| {
            let dy = y as f64 - cy;
            let dx = x as f64 - cx;
            amp * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
        })
    }

    #[test]
    fn test_scatter_sparse_to_dense() {
        let dense = scatter(5, &[1, 3], &[10.0, 20.0], SENTINEL);
        assert_eq!(dense, vec![SENTINEL, 10.0, SENTINEL, 20.0, SENTINEL]);
    }

    #[test]
    fn test_scatter_empty_subset() {
        let dense = scatter(3, &[], &[], SENTINEL);
        assert_eq!(dense, vec![SENTINEL; 3]);
    }

    #[test]
    fn test_fold_flags_is_cumulative() {
        let acc = fold_flags(&[0x1, 0x0], &[0x10, 0x80]);
        assert_eq!(acc, vec![0x11, 0x80]);
        // A later zero contribution never erases earlier bits
        let acc = fold_flags(&acc, &[0x0, 0x0]);
        assert_eq!(acc, vec![0x11, 0x80]);
    }

    #[test]
    fn test_validity_filter() {
        let objects = vec![
            object(4.0, 4.0, 2.0, 1.0, 0.0),
            object(4.0, 4.0, -1.0, 1.0, 0.0),
            object(4.0, 4.0, 2.0, 1.0, 2.0),
            object(4.0, 4.0, 2.0, -0.5, 0.0),
        ];
        assert_eq!(valid_indices(&objects), vec![0]);
    }

    #[test]
    fn test_invalid_objects_keep_sentinels_and_flags() {
        let image = gaussian((32, 32), 16.0, 16.0, 10.0, 2.0);
        let objects = vec![
            object(16.0, 16.0, 2.0, 2.0, 0.0),
            object(16.0, 16.0, -1.0, 2.0, 0.0),
        ];

        let auto = compute_auto_photometry(&image.view(), &objects);

        assert!(auto.kron_radius[0] > 0.0);
        assert!(auto.flux_auto[0] > 0.0);
        assert_eq!(auto.kron_radius[1], SENTINEL);
        assert_eq!(auto.flux_auto[1], SENTINEL);
        assert_eq!(auto.fluxerr_auto[1], SENTINEL);
        assert_eq!(auto.flux_radius[1], SENTINEL);
        assert_eq!(auto.flag_bits[1], 0);
    }

    #[test]
    fn test_empty_valid_subset() {
        let image = Array2::<f64>::zeros((8, 8));
        let objects = vec![object(4.0, 4.0, -1.0, 1.0, 0.0)];

        let auto = compute_auto_photometry(&image.view(), &objects);
        assert_eq!(auto.kron_radius, vec![SENTINEL]);
        assert_eq!(auto.flag_bits, vec![0]);
    }

    #[test]
    fn test_empty_detection_list() {
        let image = Array2::<f64>::zeros((8, 8));
        let auto = compute_auto_photometry(&image.view(), &[]);
        assert!(auto.kron_radius.is_empty());
        assert!(auto.flag_bits.is_empty());
    }

    #[test]
    fn test_fluxerr_auto_reads_zero() {
        let image = gaussian((32, 32), 16.0, 16.0, 10.0, 2.0);
        let objects = vec![object(16.0, 16.0, 2.0, 2.0, 0.0)];

        let auto = compute_auto_photometry(&image.view(), &objects);
        assert_eq!(auto.fluxerr_auto[0], 0.0);
    }

    #[test]
    fn test_gaussian_recovers_most_flux() {
        let sigma = 2.0;
        let image = gaussian((64, 64), 32.0, 32.0, 10.0, sigma);
        let total: f64 = image.iter().sum();
        let objects = vec![object(32.0, 32.0, sigma, sigma, 0.0)];

        let auto = compute_auto_photometry(&image.view(), &objects);

        // 2.5 Kron radii on a Gaussian encloses ~96% of the total flux
        assert!(auto.flux_auto[0] / total > 0.9, "{}", auto.flux_auto[0]);
        assert!(auto.kron_radius[0] > 1.0);

        let expected_half_light = sigma * (2.0 * (2.0_f64).ln()).sqrt();
        assert_relative_eq!(auto.flux_radius[0], expected_half_light, epsilon = 0.3);
    }

    #[test]
    fn test_degenerate_axis_flagged_not_raised() {
        let image = gaussian((32, 32), 16.0, 16.0, 10.0, 2.0);
        // a == 0 passes the validity filter but every kernel degenerates
        let objects = vec![object(16.0, 16.0, 0.0, 0.0, 0.0)];

        let auto = compute_auto_photometry(&image.view(), &objects);
        assert_eq!(auto.kron_radius[0], 0.0);
        assert_eq!(auto.flux_auto[0], 0.0);
        assert_eq!(auto.flux_radius[0], 0.0);
        assert_ne!(auto.flag_bits[0] & APER_NONPOSITIVE, 0);
    }
}
