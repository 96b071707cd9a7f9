//! The extraction pipeline: detect, derive, assemble.
//!
//! One `run` processes one image to completion, single-threaded, and returns
//! the catalog together with its segmentation map. The configuration is
//! built once and threaded through every call; callers wanting throughput
//! over many images parallelize across independent runs, since nothing here
//! is shared between invocations.

use log::debug;
use ndarray::ArrayView2;

use crate::catalog::{assemble_catalog, Extraction};
use crate::config::{ExtractionConfig, DETECT_THRESH};
use crate::error::ExtractionError;
use crate::image_proc::detect::detect_sources;
use crate::noise::NoiseModel;
use crate::photometry::auto::compute_auto_photometry;

/// A configured extraction run, ready to process images.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    config: ExtractionConfig,
    thresh: f64,
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self {
            config: ExtractionConfig::default(),
            thresh: DETECT_THRESH,
        }
    }
}

impl ExtractionPipeline {
    /// Build a pipeline from a full parameter bundle and threshold.
    pub fn new(config: ExtractionConfig, thresh: f64) -> Self {
        Self { config, thresh }
    }

    /// Survey defaults with only the detection threshold overridden.
    pub fn with_threshold(thresh: f64) -> Self {
        Self {
            config: ExtractionConfig::default(),
            thresh,
        }
    }

    /// Detection significance threshold in sigma units.
    pub fn thresh(&self) -> f64 {
        self.thresh
    }

    /// The parameter bundle this pipeline runs with.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run the full pipeline on one image.
    ///
    /// # Arguments
    /// * `image` - Input image
    /// * `noise` - Per-pixel noise standard deviation (scalar or map)
    /// * `mask` - Optional exclusion mask (`true` = ignore pixel); its
    ///   shape must match the image
    ///
    /// # Returns
    /// The catalog and segmentation map. Always the same catalog length as
    /// raw detections: per-object numerical failures are reported through
    /// flag bits and sentinel values, never as errors.
    pub fn run(
        &self,
        image: &ArrayView2<f64>,
        noise: &NoiseModel,
        mask: Option<&ArrayView2<bool>>,
    ) -> Result<Extraction, ExtractionError> {
        let (objects, segmentation) =
            detect_sources(image, noise, &self.config, self.thresh, mask)?;
        debug!("detected {} objects", objects.len());

        let auto = compute_auto_photometry(image, &objects);
        let catalog = assemble_catalog(&objects, &auto, &segmentation.view());

        Ok(Extraction {
            catalog,
            segmentation,
        })
    }
}

/// Run one image through the survey-default pipeline.
///
/// # Arguments
/// * `image` - Input image
/// * `noise` - Per-pixel noise standard deviation (scalar or map)
///
/// # Returns
/// The catalog and segmentation map.
pub fn extract_default(
    image: &ArrayView2<f64>,
    noise: &NoiseModel,
) -> Result<Extraction, ExtractionError> {
    ExtractionPipeline::default().run(image, noise, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::auto::SENTINEL;
    use ndarray::Array2;

    fn single_source_image() -> Array2<f64> {
        Array2::from_shape_fn((32, 32), |(y, x)| {
            let dy = y as f64 - 15.3;
            let dx = x as f64 - 16.1;
            4.0 * (-(dx * dx + dy * dy) / (2.0 * 4.0)).exp()
        })
    }

    #[test]
    fn test_default_pipeline_finds_source() {
        let image = single_source_image();
        let result = extract_default(&image.view(), &NoiseModel::Uniform(0.1)).unwrap();

        assert!(!result.catalog.is_empty());
        let brightest = result
            .catalog
            .iter()
            .max_by(|a, b| a.flux.partial_cmp(&b.flux).unwrap())
            .unwrap();
        assert!((brightest.x - 16.1).abs() < 1.0);
        assert!((brightest.y - 15.3).abs() < 1.0);
        assert!(brightest.flux_auto > 0.0);
        assert_ne!(brightest.kron_radius, SENTINEL);
    }

    #[test]
    fn test_threshold_override() {
        let pipeline = ExtractionPipeline::with_threshold(5.0);
        assert_eq!(pipeline.thresh(), 5.0);
        assert_eq!(pipeline.config().minarea, 4);
    }

    #[test]
    fn test_catalog_matches_segmentation_length() {
        let image = single_source_image();
        let result = ExtractionPipeline::default()
            .run(&image.view(), &NoiseModel::Uniform(0.1), None)
            .unwrap();

        let max_label = result.segmentation.iter().copied().max().unwrap_or(0);
        assert_eq!(result.catalog.len(), max_label as usize);
    }
}
