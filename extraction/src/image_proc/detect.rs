//! The detection primitive: filter, threshold, label, deblend, measure.
//!
//! One call produces the raw object list and the matching 1-based
//! segmentation map. Detection order is raster-scan order of each object's
//! first pixel, with deblended children replacing their parent in place, so
//! repeated runs on identical inputs yield identical catalogs.

use log::debug;
use ndarray::{Array2, ArrayView2};

use crate::config::{ExtractionConfig, FilterType};
use crate::error::ExtractionError;
use crate::image_proc::convolve::{convolve2d, convolved_noise_sigma};
use crate::image_proc::deblend::deblend;
use crate::image_proc::moments::{measure_object, RawObject};
use crate::image_proc::segment::{
    connected_components, detection_mask, segmentation_map, Pixel,
};
use crate::noise::NoiseModel;

/// Detect sources in an image.
///
/// # Arguments
/// * `image` - Input image
/// * `noise` - Per-pixel noise standard deviation (scalar or map)
/// * `config` - Extraction parameter bundle
/// * `thresh` - Detection significance threshold in sigma units
/// * `mask` - Optional exclusion mask (`true` = ignore pixel); its shape
///   must match the image
///
/// # Returns
/// Raw objects in detection order plus the segmentation map labeling each
/// pixel with its owner's 1-based index (0 = background). A fully masked
/// image yields an empty list and an all-zero map.
pub fn detect_sources(
    image: &ArrayView2<f64>,
    noise: &NoiseModel,
    config: &ExtractionConfig,
    thresh: f64,
    mask: Option<&ArrayView2<bool>>,
) -> Result<(Vec<RawObject>, Array2<u32>), ExtractionError> {
    let dim = image.dim();

    if let Some(mask) = mask {
        if mask.dim() != dim {
            return Err(ExtractionError::InvalidDimensions {
                expected: dim,
                actual: mask.dim(),
            });
        }
    }

    let variance = noise.variance_map(dim)?;

    let (filtered, sigma) = match config.filter_type {
        FilterType::Convolution => {
            let kernel = config.filter_kernel.view();
            let (krows, kcols) = kernel.dim();
            if krows % 2 == 0 || kcols % 2 == 0 {
                return Err(ExtractionError::EvenKernel(krows, kcols));
            }
            (
                convolve2d(image, &kernel),
                convolved_noise_sigma(&variance.view(), &kernel),
            )
        }
        FilterType::None => (image.to_owned(), variance.mapv(f64::sqrt)),
    };

    let threshold_map = sigma.mapv(|s| s * thresh);
    let detected = detection_mask(&filtered.view(), &threshold_map.view(), mask);

    let mut components = connected_components(&detected.view());
    components.retain(|pixels| pixels.len() >= config.minarea);
    debug!("{} components above threshold", components.len());

    // Deblend each component; children replace their parent in place
    let mut final_objects: Vec<(Vec<Pixel>, bool)> = Vec::new();
    for pixels in components {
        let floor = pixels
            .iter()
            .map(|&(y, x)| threshold_map[[y, x]])
            .fold(f64::INFINITY, f64::min);
        let children = deblend(
            pixels,
            &filtered.view(),
            floor,
            config.deblend_nthresh,
            config.deblend_cont,
            config.minarea,
        );
        let merged = children.len() > 1;
        for child in children {
            final_objects.push((child, merged));
        }
    }

    let objects: Vec<RawObject> = final_objects
        .iter()
        .map(|(pixels, merged)| {
            let peak_pixel = pixels
                .iter()
                .max_by(|&&(ay, ax), &&(by, bx)| {
                    filtered[[ay, ax]]
                        .partial_cmp(&filtered[[by, bx]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .expect("components are non-empty");
            let thresh_abs = threshold_map[[peak_pixel.0, peak_pixel.1]];
            measure_object(image, pixels, thresh_abs, *merged)
        })
        .collect();

    let pixel_lists: Vec<Vec<Pixel>> = final_objects.into_iter().map(|(p, _)| p).collect();
    let seg = segmentation_map(dim, &pixel_lists);
    debug!("{} objects after deblending", objects.len());

    Ok((objects, seg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gaussian_field(dim: (usize, usize), sources: &[(f64, f64, f64)]) -> Array2<f64> {
        let mut image = Array2::zeros(dim);
        for &(cy, cx, amp) in sources {
            for ((y, x), value) in image.indexed_iter_mut() {
                let dy = y as f64 - cy;
                let dx = x as f64 - cx;
                *value += amp * (-(dx * dx + dy * dy) / (2.0 * 2.25)).exp();
            }
        }
        image
    }

    #[test]
    fn test_single_source_detected() {
        let image = gaussian_field((32, 32), &[(15.0, 17.0, 10.0)]);
        let config = ExtractionConfig::default();

        let (objects, seg) = detect_sources(
            &image.view(),
            &NoiseModel::Uniform(0.01),
            &config,
            5.0,
            None,
        )
        .unwrap();

        assert_eq!(objects.len(), 1);
        assert_relative_eq!(objects[0].x, 17.0, epsilon = 0.1);
        assert_relative_eq!(objects[0].y, 15.0, epsilon = 0.1);
        assert!(objects[0].a >= objects[0].b);
        assert_eq!(
            seg.iter().filter(|&&v| v == 1).count(),
            objects[0].npix as usize
        );
    }

    #[test]
    fn test_mask_shape_mismatch() {
        let image = Array2::<f64>::zeros((8, 8));
        let mask = Array2::from_elem((4, 4), false);
        let result = detect_sources(
            &image.view(),
            &NoiseModel::Uniform(1.0),
            &ExtractionConfig::default(),
            0.8,
            Some(&mask.view()),
        );
        assert!(matches!(
            result,
            Err(ExtractionError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_fully_masked_image() {
        let image = gaussian_field((16, 16), &[(8.0, 8.0, 50.0)]);
        let mask = Array2::from_elem((16, 16), true);
        let (objects, seg) = detect_sources(
            &image.view(),
            &NoiseModel::Uniform(0.1),
            &ExtractionConfig::default(),
            0.8,
            Some(&mask.view()),
        )
        .unwrap();

        assert!(objects.is_empty());
        assert!(seg.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_two_sources_two_labels() {
        let image = gaussian_field((32, 32), &[(8.0, 8.0, 10.0), (24.0, 24.0, 8.0)]);
        let (objects, seg) = detect_sources(
            &image.view(),
            &NoiseModel::Uniform(0.01),
            &ExtractionConfig::default(),
            5.0,
            None,
        )
        .unwrap();

        assert_eq!(objects.len(), 2);
        for (i, obj) in objects.iter().enumerate() {
            let label = (i + 1) as u32;
            assert_eq!(
                seg.iter().filter(|&&v| v == label).count(),
                obj.npix as usize
            );
        }
    }

    #[test]
    fn test_even_kernel_rejected() {
        let image = Array2::<f64>::zeros((8, 8));
        let config = ExtractionConfig {
            filter_kernel: Array2::from_elem((2, 2), 0.25),
            ..Default::default()
        };
        let result = detect_sources(
            &image.view(),
            &NoiseModel::Uniform(1.0),
            &config,
            0.8,
            None,
        );
        assert!(matches!(result, Err(ExtractionError::EvenKernel(2, 2))));
    }

    #[test]
    fn test_unfiltered_detection() {
        let image = gaussian_field((32, 32), &[(16.0, 16.0, 10.0)]);
        let config = ExtractionConfig {
            filter_type: FilterType::None,
            ..Default::default()
        };
        let (objects, _) = detect_sources(
            &image.view(),
            &NoiseModel::Uniform(0.01),
            &config,
            5.0,
            None,
        )
        .unwrap();

        assert_eq!(objects.len(), 1);
        assert_relative_eq!(objects[0].x, 16.0, epsilon = 0.1);
    }
}
