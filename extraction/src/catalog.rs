//! Catalog assembly: the run's fixed-schema output records.
//!
//! One row per raw detection, in detection order: the raw object's native
//! fields copied verbatim, the derived photometry (sentinels included), and
//! the isophotal area and radius measured from the segmentation map.

use serde::{Deserialize, Serialize};

use ndarray::{Array2, ArrayView2};

use crate::image_proc::moments::RawObject;
use crate::photometry::auto::AutoPhotometry;

/// One catalog row. Immutable after assembly; `number` is the 1-based
/// sequential index in original detection order, independent of any later
/// sorting by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRow {
    /// 1-based sequential object number in detection order
    pub number: u32,
    /// Centroid x-coordinate (column)
    pub x: f64,
    /// Centroid y-coordinate (row)
    pub y: f64,
    /// Semi-major axis, pixels
    pub a: f64,
    /// Semi-minor axis, pixels
    pub b: f64,
    /// Ellipse position angle, radians in [-pi/2, pi/2]
    pub theta: f64,
    /// Isophotal flux
    pub flux: f64,
    /// Brightest member pixel value
    pub peak: f64,
    /// Member pixel count from detection
    pub npix: u32,
    /// Bounding box, inclusive pixel coordinates
    pub xmin: usize,
    pub xmax: usize,
    pub ymin: usize,
    pub ymax: usize,
    /// Absolute detection threshold at the object's peak pixel
    pub thresh: f64,
    /// Merged processing flags: detection bits OR photometry bits
    pub flag: u32,
    /// Kron radius in shape-ellipse units; -9999.0 when not computed
    pub kron_radius: f64,
    /// Flux inside the 2.5 Kron-radius ellipse; -9999.0 when not computed
    pub flux_auto: f64,
    /// Error on `flux_auto`; -9999.0 when not computed
    pub fluxerr_auto: f64,
    /// Half-light radius of `flux_auto`, pixels; -9999.0 when not computed
    pub flux_radius: f64,
    /// Pixel count owned by this object in the segmentation map
    pub isoarea_image: u32,
    /// Equivalent circular radius of the isophotal area, pixels
    pub iso_radius: f64,
}

/// The two results of one extraction run.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Catalog rows in detection order
    pub catalog: Vec<CatalogRow>,
    /// Segmentation map: 0 = background, i = pixel owned by catalog row
    /// `number == i`
    pub segmentation: Array2<u32>,
}

/// Count pixels per object label in one pass over the segmentation map.
///
/// Bin `i` holds the count of pixels equal to `i + 1`; labels outside
/// `1..=count` are ignored.
pub fn isophotal_areas(segmentation: &ArrayView2<u32>, count: usize) -> Vec<u32> {
    let mut areas = vec![0u32; count];
    for &label in segmentation.iter() {
        if label >= 1 && (label as usize) <= count {
            areas[label as usize - 1] += 1;
        }
    }
    areas
}

/// Equivalent circular radius of an isophotal area.
///
/// The area is clamped to at least one pixel so a zero-area object still
/// gets a finite radius.
pub fn iso_radius(isoarea: u32) -> f64 {
    (isoarea.max(1) as f64 / std::f64::consts::PI).sqrt()
}

/// Assemble the final catalog from the three stages' outputs.
///
/// # Arguments
/// * `objects` - Raw detections in detection order
/// * `auto` - Full-length derived-quantity arrays
/// * `segmentation` - 1-based segmentation map from detection
pub fn assemble_catalog(
    objects: &[RawObject],
    auto: &AutoPhotometry,
    segmentation: &ArrayView2<u32>,
) -> Vec<CatalogRow> {
    let areas = isophotal_areas(segmentation, objects.len());

    objects
        .iter()
        .enumerate()
        .map(|(i, object)| CatalogRow {
            number: (i + 1) as u32,
            x: object.x,
            y: object.y,
            a: object.a,
            b: object.b,
            theta: object.theta,
            flux: object.flux,
            peak: object.peak,
            npix: object.npix,
            xmin: object.xmin,
            xmax: object.xmax,
            ymin: object.ymin,
            ymax: object.ymax,
            thresh: object.thresh,
            flag: object.flag | auto.flag_bits[i],
            kron_radius: auto.kron_radius[i],
            flux_auto: auto.flux_auto[i],
            fluxerr_auto: auto.fluxerr_auto[i],
            flux_radius: auto.flux_radius[i],
            isoarea_image: areas[i],
            iso_radius: iso_radius(areas[i]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::auto::SENTINEL;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    fn raw(x: f64, y: f64, flag: u32) -> RawObject {
        RawObject {
            x,
            y,
            a: 1.0,
            b: 1.0,
            theta: 0.0,
            flux: 5.0,
            peak: 2.0,
            npix: 3,
            xmin: 0,
            xmax: 2,
            ymin: 0,
            ymax: 2,
            thresh: 0.1,
            flag,
        }
    }

    fn auto_for(n: usize) -> AutoPhotometry {
        AutoPhotometry {
            kron_radius: vec![SENTINEL; n],
            flux_auto: vec![SENTINEL; n],
            fluxerr_auto: vec![SENTINEL; n],
            flux_radius: vec![SENTINEL; n],
            flag_bits: vec![0; n],
        }
    }

    #[test]
    fn test_isophotal_areas_histogram() {
        let seg = arr2(&[[0, 1, 1], [2, 2, 2], [0, 0, 1]]);
        let areas = isophotal_areas(&seg.view(), 2);
        assert_eq!(areas, vec![3, 3]);
    }

    #[test]
    fn test_isophotal_areas_ignores_unknown_labels() {
        let seg = arr2(&[[7, 1], [0, 0]]);
        let areas = isophotal_areas(&seg.view(), 1);
        assert_eq!(areas, vec![1]);
    }

    #[test]
    fn test_iso_radius_clamps_zero_area() {
        assert_relative_eq!(
            iso_radius(0),
            (1.0 / std::f64::consts::PI).sqrt(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            iso_radius(10),
            (10.0 / std::f64::consts::PI).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_numbers_are_sequential() {
        let objects = vec![raw(1.0, 1.0, 0), raw(2.0, 2.0, 0), raw(3.0, 3.0, 0)];
        let seg = Array2::<u32>::zeros((4, 4));
        let catalog = assemble_catalog(&objects, &auto_for(3), &seg.view());

        assert_eq!(catalog.len(), 3);
        for (i, row) in catalog.iter().enumerate() {
            assert_eq!(row.number, (i + 1) as u32);
        }
    }

    #[test]
    fn test_flags_merge_detection_and_photometry_bits() {
        let objects = vec![raw(1.0, 1.0, 0x2)];
        let mut auto = auto_for(1);
        auto.flag_bits[0] = 0x10;
        let seg = Array2::<u32>::zeros((4, 4));

        let catalog = assemble_catalog(&objects, &auto, &seg.view());
        assert_eq!(catalog[0].flag, 0x12);
    }

    #[test]
    fn test_native_and_derived_fields_copied() {
        let objects = vec![raw(3.5, 4.5, 0)];
        let mut auto = auto_for(1);
        auto.kron_radius[0] = 1.25;
        auto.flux_auto[0] = 42.0;
        auto.flux_radius[0] = 2.0;
        let seg = arr2(&[[1, 1], [1, 0]]);

        let catalog = assemble_catalog(&objects, &auto, &seg.view());
        let row = &catalog[0];

        assert_eq!(row.x, 3.5);
        assert_eq!(row.flux, 5.0);
        assert_eq!(row.kron_radius, 1.25);
        assert_eq!(row.flux_auto, 42.0);
        assert_eq!(row.fluxerr_auto, SENTINEL);
        assert_eq!(row.isoarea_image, 3);
        assert_relative_eq!(
            row.iso_radius,
            (3.0 / std::f64::consts::PI).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_catalog_row_schema() {
        let objects = vec![raw(1.0, 1.0, 0)];
        let seg = Array2::<u32>::zeros((2, 2));
        let catalog = assemble_catalog(&objects, &auto_for(1), &seg.view());

        let value = serde_json::to_value(&catalog[0]).unwrap();
        for field in [
            "number",
            "x",
            "y",
            "a",
            "b",
            "theta",
            "flux",
            "flag",
            "kron_radius",
            "flux_auto",
            "fluxerr_auto",
            "flux_radius",
            "isoarea_image",
            "iso_radius",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
    }
}
